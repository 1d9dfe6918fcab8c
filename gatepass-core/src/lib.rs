pub mod token;
pub mod ticket;
pub mod repository;

pub use ticket::{Ticket, TicketStatus};
pub use token::{TicketToken, TokenError};
pub use repository::{MarkUsed, TicketRegistry};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    /// `insert` found the token already registered.
    #[error("Duplicate ticket token: {0}")]
    DuplicateToken(String),
    /// Backing store unreachable or returned garbage. Never a domain outcome.
    #[error("Storage failure: {0}")]
    StorageError(String),
}

impl From<TokenError> for CoreError {
    fn from(err: TokenError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
