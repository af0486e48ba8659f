//! Progress reporting for build invocations

mod handler;
mod logging;

pub use handler::{BuildEvent, NoOpHandler, ProgressHandler};
pub use logging::LoggingHandler;
