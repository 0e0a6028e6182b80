use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backend rejected request ({status}): {message}")]
    BackendError { status: u16, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("No loan found for account {account_no}")]
    NotFoundError { account_no: i64 },

    #[error("Unexpected backend response: {message}")]
    UnexpectedResponseError { message: String },

    #[error("Not logged in")]
    NotLoggedInError,
}

pub type Result<T> = std::result::Result<T, LoanError>;
