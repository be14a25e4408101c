use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// Every policy violation found in a submission, in check order.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SignalError {
    pub fn violations(&self) -> &[String] {
        match self {
            SignalError::Validation(messages) => messages,
            SignalError::InvalidArgument(_) => &[],
        }
    }
}
