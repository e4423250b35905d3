pub mod args;
pub mod config;
pub mod driver;
pub mod logging;
pub mod session;

pub use config::Config;
pub use session::{ConsoleRecord, InspectionSession, SessionError};
