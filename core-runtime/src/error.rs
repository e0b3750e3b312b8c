use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid setting, or a logging setup failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host capability was neither injected nor available as a
    /// default
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
