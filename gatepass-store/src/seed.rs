use gatepass_core::{CoreError, Ticket, TicketRegistry};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Seed file is not a ticket list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Ticket {token} belongs to namespace {found}, expected {expected}")]
    ForeignNamespace {
        token: String,
        found: String,
        expected: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Read a JSON array of tickets.
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<Ticket>, SeedError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_seed(&raw)
}

pub fn parse_seed(raw: &str) -> Result<Vec<Ticket>, SeedError> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    /// Tokens another process (or an earlier run) had already registered.
    pub already_present: usize,
}

/// Insert every ticket, refusing the whole batch up front if any token is
/// outside `namespace`.
///
/// Tokens that are already registered are skipped, so gate processes sharing
/// one registry can all seed it at startup.
pub async fn seed_registry(
    registry: &dyn TicketRegistry,
    tickets: Vec<Ticket>,
    namespace: &str,
) -> Result<SeedSummary, SeedError> {
    for ticket in &tickets {
        let token = ticket.parsed_token().map_err(CoreError::from)?;
        if token.namespace() != namespace {
            return Err(SeedError::ForeignNamespace {
                token: ticket.token.clone(),
                found: token.namespace().to_string(),
                expected: namespace.to_string(),
            });
        }
    }

    let mut summary = SeedSummary::default();
    for ticket in tickets {
        match registry.insert(ticket).await {
            Ok(()) => summary.inserted += 1,
            Err(CoreError::DuplicateToken(token)) => {
                debug!("Ticket {} already registered, skipping", token);
                summary.already_present += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        "Seeded registry: {} inserted, {} already present",
        summary.inserted, summary.already_present
    );
    Ok(summary)
}
