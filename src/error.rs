use thiserror::Error;

/// Errors raised while solving a Markov decision process.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A state, action or successor index fell outside the declared spaces.
    #[error("invalid index: {0}")]
    InvalidIndex(String),

    /// An environment reported a transition that is not a probability distribution.
    #[error("malformed transition for state {state}, action {action}: {reason}")]
    MalformedTransition {
        state: String,
        action: usize,
        reason: String,
    },

    /// Solver parameters out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A value table could not be viewed with the requested shape.
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// A shared stateful environment could not be accessed.
    #[error("environment unavailable: {0}")]
    OracleUnavailable(String),
}

impl Error {
    pub fn invalid_index<S: Into<String>>(msg: S) -> Self {
        Error::InvalidIndex(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfig(msg.into())
    }

    pub fn malformed<D, S>(state: D, action: usize, reason: S) -> Self
    where
        D: std::fmt::Debug,
        S: Into<String>,
    {
        Error::MalformedTransition {
            state: format!("{state:?}"),
            action,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
