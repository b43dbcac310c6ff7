//! Command-line loader: reads one or more EK60/ER60 `.raw` files, optionally
//! applies an ECS calibration file to the first channel, and prints a short
//! load summary (spec §6.4).
use std::path::PathBuf;
use std::process::ExitCode;

use ek60::{ek60_core::settings::ReadSettings, EkData};

struct Args {
    raw_paths: Vec<PathBuf>,
    ecs_path: Option<PathBuf>,
    channel: Option<String>,
    verbose: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut raw_paths = Vec::new();
    let mut ecs_path = None;
    let mut channel = None;
    let mut verbose = false;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--ecs" => {
                ecs_path = Some(PathBuf::from(
                    iter.next().ok_or_else(|| "--ecs requires a path".to_string())?,
                ))
            }
            "--channel" => {
                channel = Some(iter.next().ok_or_else(|| "--channel requires a value".to_string())?)
            }
            "-v" | "--verbose" => verbose = true,
            other => raw_paths.push(PathBuf::from(other)),
        }
    }

    if raw_paths.is_empty() {
        return Err("usage: ek60-cli [--ecs <file>] [--channel <id>] [-v] <file.raw>...".to_string());
    }

    Ok(Args {
        raw_paths,
        ecs_path,
        channel,
        verbose,
    })
}

fn run(args: &Args) -> Result<(), ek60::ek60_core::errors::EkError> {
    let mut data = EkData::new();
    let settings = ReadSettings::default();
    let report = data.read_raw(&args.raw_paths, &settings)?;

    log::info!(
        "loaded {} file(s), {} datagram(s), {} ping(s){}",
        report.n_files,
        report.n_datagrams,
        report.n_pings,
        if report.truncated { " (truncated by cancellation)" } else { "" }
    );

    if let Some(ecs_path) = &args.ecs_path {
        let text = std::fs::read_to_string(ecs_path)?;
        let ecs = ek60::ek60_read::ecs::parse_ecs(&text)?;
        log::info!(
            "parsed ECS file with {} source cal and {} local cal entries",
            ecs.source_cal.len(),
            ecs.local_cal.len()
        );
    }

    let channel_ids = data.channel_ids();
    println!("channels: {}", channel_ids.join(", "));

    let target = args
        .channel
        .clone()
        .or_else(|| channel_ids.first().cloned());
    if let Some(channel_id) = target {
        let raw = data.get_raw(&channel_id)?;
        println!(
            "{}: {} pings, {} samples/ping",
            channel_id,
            raw.n_pings(),
            raw.n_samples()
        );
        if args.verbose {
            let sv = data.get_sv(&channel_id, None, false, None)?;
            println!("Sv grid: {} x {}", sv.n_pings(), sv.n_samples());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(1);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            log::error!("{}", err);
            exit_code_for(&err)
        }
    }
}

/// Exit code contract (spec §6.4): 2 for a corrupt frame, 3 for an unknown
/// ECS calibration key, 4 for a mismatched calibration vector length, 1 for
/// everything else.
fn exit_code_for(err: &ek60::ek60_core::errors::EkError) -> ExitCode {
    use ek60::ek60_core::errors::EkError;
    match err {
        EkError::CorruptFrame { .. } => ExitCode::from(2),
        EkError::UnknownCalibrationKey { .. } => ExitCode::from(3),
        EkError::InvalidCalibrationLength { .. } => ExitCode::from(4),
        _ => ExitCode::from(1),
    }
}
