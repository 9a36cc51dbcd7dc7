use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Invalid analysis level selector: {0}")]
    InvalidSelector(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Compilation failed: {0}")]
    Compile(String),

    #[error("Instrumentation rejected unit '{name}': {reason}")]
    Instrumentation { name: String, reason: String },

    #[error("No compiled test unit matches the requested patterns")]
    NoMatchingTests,

    #[error("Counter session misuse: {0}")]
    Session(String),

    #[error("Malformed unit '{name}': {reason}")]
    MalformedUnit { name: String, reason: String },
}
