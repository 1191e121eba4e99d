use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("{0} consumer stopped")]
    ConsumerClosed(&'static str),
}
