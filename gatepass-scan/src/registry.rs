use async_trait::async_trait;
use gatepass_core::{CoreError, CoreResult, MarkUsed, Ticket, TicketRegistry, TicketStatus};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    tickets: HashMap<String, Ticket>,
    scanned: HashSet<String>,
}

/// Process-local registry. One write lock covers both the ticket map and the
/// scanned-token set, so `mark_used` is a single critical section.
#[derive(Default)]
pub struct InMemoryRegistry {
    inner: RwLock<Inner>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_tickets(tickets: impl IntoIterator<Item = Ticket>) -> CoreResult<Self> {
        let registry = Self::new();
        for ticket in tickets {
            registry.insert(ticket).await?;
        }
        Ok(registry)
    }
}

#[async_trait]
impl TicketRegistry for InMemoryRegistry {
    async fn lookup(&self, token: &str) -> CoreResult<Option<Ticket>> {
        Ok(self.inner.read().await.tickets.get(token).cloned())
    }

    async fn mark_used(&self, token: &str) -> CoreResult<MarkUsed> {
        let mut inner = self.inner.write().await;

        let Some(ticket) = inner.tickets.get_mut(token) else {
            return Ok(MarkUsed::NotFound);
        };

        if !ticket.status.can_transition_to(TicketStatus::Used) {
            return Ok(match ticket.status {
                TicketStatus::Used => MarkUsed::AlreadyUsed(ticket.clone()),
                _ => MarkUsed::NotUsable(ticket.clone()),
            });
        }

        ticket.status = TicketStatus::Used;
        let result = MarkUsed::Marked(ticket.clone());

        inner.scanned.insert(token.to_string());
        debug!(token, "Ticket marked used");
        Ok(result)
    }

    async fn is_recorded_as_scanned(&self, token: &str) -> CoreResult<bool> {
        Ok(self.inner.read().await.scanned.contains(token))
    }

    async fn insert(&self, ticket: Ticket) -> CoreResult<()> {
        ticket.check_token()?;

        let mut inner = self.inner.write().await;
        if inner.tickets.contains_key(&ticket.token) {
            return Err(CoreError::DuplicateToken(ticket.token));
        }
        inner.tickets.insert(ticket.token.clone(), ticket);
        Ok(())
    }

    async fn len(&self) -> CoreResult<usize> {
        Ok(self.inner.read().await.tickets.len())
    }
}
