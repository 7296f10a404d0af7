pub mod combiner;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod judge;
pub mod llm_client;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod services;
pub mod stage;

pub use config::{Config, PipelineConfig};
pub use errors::{ConfigError, PipelineError};
pub use pipeline::{Pipeline, PipelineState, RunReport, Services};
