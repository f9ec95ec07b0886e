//! Exec Brief: turns a batch of emails into a ranked executive brief.

pub mod brief;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod pipeline;
pub mod synthesis;

pub use brief::Brief;
pub use config::BriefConfig;
pub use pipeline::runner::BriefPipeline;
pub use pipeline::types::{RawMessage, Sender};
