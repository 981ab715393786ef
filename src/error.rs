use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageGenError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Task {task_id} succeeded but returned no images")]
    EmptyResult { task_id: String },

    #[error("Image generation failed: {reason}")]
    GenerationFailed { task_id: String, reason: String },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task {task_id} still pending after {attempts} polls")]
    PollLimitExceeded { task_id: String, attempts: u32 },
}

impl ImageGenError {
    /// Errors returned by the remote service, as opposed to transport or local failures.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ImageGenError::Submission(_)
                | ImageGenError::EmptyResult { .. }
                | ImageGenError::GenerationFailed { .. }
        )
    }
}

impl From<serde_json::Error> for ImageGenError {
    fn from(err: serde_json::Error) -> Self {
        ImageGenError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImageGenError>;
