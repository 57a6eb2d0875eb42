use thiserror::Error;

/// Startup failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("environment variable {name} has an invalid value {value:?}: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read question bank {path}: {source}")]
    BankRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON format in question bank: {0}")]
    BankFormat(#[from] serde_json::Error),

    #[error("question bank record {index} is invalid: {reason}")]
    BankRecord { index: usize, reason: String },

    #[error("failed to create completion client: {0}")]
    Client(#[from] chatgpt::err::Error),
}

/// Failure talking to the completion backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("completion backend error: {0}")]
    Backend(#[from] chatgpt::err::Error),

    #[error("completion timed out after {0} seconds")]
    Timeout(u64),

    #[error("completion backend returned no choices")]
    EmptyResponse,
}

/// The model's answer could not be turned into a usable question.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no trailing JSON object in response")]
    NoJsonObject,

    #[error("failed to decode JSON object: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("required field `{0}` is missing or empty")]
    MissingField(&'static str),

    #[error("correctAnswerIndex {index} is out of range for {options} options")]
    AnswerIndexOutOfRange { index: i64, options: usize },

    #[error("self-audit flagged the question as unusable")]
    Rejected,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("gave up after {attempts} attempts, last failure: {last}")]
    Exhausted { attempts: usize, last: ParseError },
}
