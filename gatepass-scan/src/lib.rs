pub mod registry;
pub mod outcome;
pub mod session;

pub use registry::InMemoryRegistry;
pub use outcome::{AlreadyUsedReason, ScanOutcome, ScanRejection};
pub use session::{validate, ScanSession, SessionError, SessionState, SessionStats, Submission};
