//! Routing of classified log lines to handlers.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::Dispatcher;
pub use handler::LogHandler;
