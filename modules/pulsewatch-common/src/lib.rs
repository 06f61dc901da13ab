pub mod config;
pub mod error;
pub mod file_config;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::PulseWatchError;
pub use file_config::FileConfig;
pub use types::*;
