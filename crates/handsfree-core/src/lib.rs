pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::HandsFreeConfig;
pub use error::{HandsFreeError, Result};
pub use events::{SessionEvent, StopReason};
pub use types::*;
