//! Game log reading and classification.

pub mod classifier;
pub mod tailer;

pub use classifier::LineClassifier;
pub use tailer::LogTailer;
