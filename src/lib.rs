pub mod config;
pub mod correlate;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod search;
