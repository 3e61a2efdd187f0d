pub mod config;
pub mod error;
pub mod notification;
pub mod record;

pub use config::Config;
pub use error::*;
pub use notification::*;
pub use record::*;
