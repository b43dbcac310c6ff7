//! Calibration resolution and the acoustic transforms built on top of it:
//! absorption models, the Sv/Sp sonar equation, angle decode, vertical
//! alignment/resampling, and ancillary-series interpolation.
extern crate ek60_core;

pub mod absorption;
pub mod angles;
pub mod grid;
pub mod interpolate;
pub mod power;
pub mod resolve;

pub use absorption::{absorption_db_per_m, ainslie_mccolm, francois_garrison};
pub use angles::{decode_electrical_angle, electrical_angle_row, physical_angle, physical_angle_row, DecodedAngle};
pub use grid::{align, resample, resample_mode, to_grid, AlignedGrid, Resample, ToGridInput};
pub use interpolate::{
    cumulative_distance_nm, interpolate_linear, interpolate_linear_with_backfill, reconstruct_midnight_crossing,
    reject_position_outliers,
};
pub use power::{db_to_linear, meters_per_sample, power_row_to_db, power_to_db, range_vector, sp_row, sv_row, SonarEquationParams};
pub use resolve::resolve;
