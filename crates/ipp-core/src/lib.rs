pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod reconciler;
pub mod report;

pub use command::*;
pub use config::{ConfigLoader, DEFAULT_CONFIG_PATH, load_str};
pub use error::*;
pub use executor::*;
pub use model::*;
pub use reconciler::*;
pub use report::*;
