pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("unsupported priority: {0}")]
    UnsupportedPriority(String),

    #[error("scheduler registry not initialized")]
    NotInitialized,

    #[error("scheduler registry already initialized")]
    AlreadyInitialized,

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("task cancelled before it started")]
    Cancelled,

    #[error("timed out waiting for task result")]
    Timeout,

    #[error("telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn telemetry<S: Into<String>>(msg: S) -> Self {
        Error::Telemetry(msg.into())
    }

    pub fn unsupported_priority<S: Into<String>>(name: S) -> Self {
        Error::UnsupportedPriority(name.into())
    }
}
