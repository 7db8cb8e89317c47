pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod observer;
pub mod storage;
pub mod system;
pub mod types;
pub mod validation;

pub use error::PipelineError;
pub use system::System;

#[cfg(test)]
pub mod testing;
