use async_trait::async_trait;

use crate::ticket::Ticket;
use crate::CoreResult;

/// Result of the atomic "valid -> used" check-and-set.
#[derive(Debug, Clone)]
pub enum MarkUsed {
    /// Status was `valid` and is now `used`. Carries the post-transition snapshot.
    Marked(Ticket),
    NotFound,
    /// Already consumed, by this scanner or a concurrent one.
    AlreadyUsed(Ticket),
    /// `expired` or `invalid`; never transitions.
    NotUsable(Ticket),
}

/// Authoritative store of tickets, shared by every scan session.
///
/// An unknown token is `Ok(None)` / `MarkUsed::NotFound`, not an error.
/// `Err` means the backing store itself failed.
#[async_trait]
pub trait TicketRegistry: Send + Sync {
    async fn lookup(&self, token: &str) -> CoreResult<Option<Ticket>>;

    /// Must be atomic: two callers racing on one valid token get exactly one `Marked`.
    async fn mark_used(&self, token: &str) -> CoreResult<MarkUsed>;

    /// True once `mark_used` has succeeded for `token` in this registry.
    async fn is_recorded_as_scanned(&self, token: &str) -> CoreResult<bool>;

    /// Register a ticket issued elsewhere. Malformed tokens are `ValidationError`,
    /// an already registered token is `DuplicateToken`.
    async fn insert(&self, ticket: Ticket) -> CoreResult<()>;

    async fn len(&self) -> CoreResult<usize>;
}
