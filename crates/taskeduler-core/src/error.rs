use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unsupported frequency '{value}'. Valid frequencies are: {}", .valid.join(", "))]
    UnsupportedFrequency {
        value: String,
        valid: Vec<&'static str>,
    },

    #[error("Invalid execution rule: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Task '{0}' already exists. Use override to replace it.")]
    TaskAlreadyExists(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("No job registered for entrypoint '{0}'")]
    JobNotFound(String),

    #[error("No compliant execution could be found: {0}")]
    NoCompliantExecution(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
