//! # offsite-core
//!
//! Core library for offsite providing:
//! - The error taxonomy shared by every crate
//! - General, working-directory and database configuration files
//! - An injectable clock for timestamping backups and ledger records
//! - Duration span parsing (`24h`, `1h30m`)

pub mod clock;
pub mod config;
pub mod error;
pub mod span;
pub mod utils;

pub use clock::{system_clock, Clock, ManualClock, SystemClock};
pub use config::{ConfigDir, GeneralConfig};
pub use error::{Error, Result};
pub use utils::get_home_dir;
