use std::sync::Arc;

use chrono::{DateTime, Utc};
use gatepass_core::{CoreError, CoreResult, MarkUsed, TicketRegistry, TicketStatus};
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::outcome::{AlreadyUsedReason, ScanOutcome, ScanRejection};

/// Where a scanner is in its decode -> outcome -> acknowledge cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Idle,
    Processing,
    ShowingOutcome(ScanOutcome),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }
}

/// What happened to a submitted token.
#[derive(Debug, Clone)]
pub enum Submission {
    Processed(ScanOutcome),
    /// Session was not idle; the token was dropped without a lookup.
    Ignored,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SessionStats {
    pub accepted: u64,
    pub already_used: u64,
    pub race_lost: u64,
    pub expired: u64,
    pub invalid: u64,
    pub ignored: u64,
}

impl SessionStats {
    fn record(&mut self, outcome: &ScanOutcome) {
        match outcome.rejection() {
            None => self.accepted += 1,
            Some(ScanRejection::AlreadyUsed) => self.already_used += 1,
            Some(ScanRejection::RaceLost) => self.race_lost += 1,
            Some(ScanRejection::Expired) => self.expired += 1,
            Some(ScanRejection::NotFound) => self.invalid += 1,
        }
    }

    pub fn processed(&self) -> u64 {
        self.accepted + self.already_used + self.race_lost + self.expired + self.invalid
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No scan outcome is waiting for acknowledgement")]
    NothingToAcknowledge,

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Validate one token against `registry` and consume it if it is valid.
///
/// Order matters: the scanned-token record is consulted before the status so
/// a duplicate presentation is caught even while another scanner is still
/// between its lookup and its `mark_used`.
pub async fn validate(registry: &dyn TicketRegistry, token: &str) -> CoreResult<ScanOutcome> {
    if registry.is_recorded_as_scanned(token).await? {
        return Ok(match registry.lookup(token).await? {
            Some(ticket) => ScanOutcome::RejectedAlreadyUsed {
                ticket,
                reason: AlreadyUsedReason::PreviouslyScanned,
            },
            None => ScanOutcome::RejectedInvalid { token: token.to_string() },
        });
    }

    let Some(ticket) = registry.lookup(token).await? else {
        return Ok(ScanOutcome::RejectedInvalid { token: token.to_string() });
    };

    let outcome = match ticket.status {
        TicketStatus::Used => ScanOutcome::RejectedAlreadyUsed {
            ticket,
            reason: AlreadyUsedReason::StatusUsed,
        },
        TicketStatus::Expired => ScanOutcome::RejectedExpired { ticket },
        TicketStatus::Invalid => ScanOutcome::RejectedInvalid { token: token.to_string() },
        TicketStatus::Valid => match registry.mark_used(token).await? {
            MarkUsed::Marked(ticket) => ScanOutcome::Accepted { ticket },
            MarkUsed::AlreadyUsed(current) | MarkUsed::NotUsable(current) => {
                ScanOutcome::RejectedAlreadyUsed {
                    ticket: current,
                    reason: AlreadyUsedReason::RaceLost,
                }
            }
            // Removed between lookup and mark; report what we saw.
            MarkUsed::NotFound => ScanOutcome::RejectedAlreadyUsed {
                ticket,
                reason: AlreadyUsedReason::RaceLost,
            },
        },
    };

    Ok(outcome)
}

/// One operator's scanner.
///
/// After a token is processed the session holds the outcome until the
/// operator acknowledges it; tokens arriving in the meantime (repeated camera
/// frames of the same code) are ignored.
///
/// Validation runs on its own task. If the caller of `submit` goes away
/// mid-scan the task still completes, and the next call on the session
/// (`settle`, `submit`, `reset`) picks its outcome up, so a consumed ticket is
/// always reported.
pub struct ScanSession {
    id: Uuid,
    operator: String,
    registry: Arc<dyn TicketRegistry>,
    state: SessionState,
    stats: SessionStats,
    opened_at: DateTime<Utc>,
    in_flight: Option<JoinHandle<CoreResult<ScanOutcome>>>,
}

impl ScanSession {
    pub fn new(operator: impl Into<String>, registry: Arc<dyn TicketRegistry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operator: operator.into(),
            registry,
            state: SessionState::Idle,
            stats: SessionStats::default(),
            opened_at: Utc::now(),
            in_flight: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Idle -> Processing -> ShowingOutcome. Any other starting state ignores the token.
    pub async fn submit(&mut self, token: &str) -> Result<Submission, SessionError> {
        if let Err(e) = self.settle().await {
            warn!(session_id = %self.id, "Abandoned scan did not complete: {}", e);
        }

        if !self.state.is_idle() {
            self.stats.ignored += 1;
            debug!(session_id = %self.id, "Scanner busy, token ignored");
            return Ok(Submission::Ignored);
        }

        self.state = SessionState::Processing;

        let registry = Arc::clone(&self.registry);
        let token = token.to_string();
        let handle = self.in_flight.insert(tokio::spawn(async move {
            validate(registry.as_ref(), &token).await
        }));
        let joined = handle.await;
        self.in_flight = None;

        self.conclude(joined).map(Submission::Processed)
    }

    /// Finish a scan whose `submit` was dropped before it completed.
    /// Returns its outcome, which is now the one being shown.
    pub async fn settle(&mut self) -> Result<Option<ScanOutcome>, SessionError> {
        let Some(handle) = self.in_flight.as_mut() else {
            return Ok(None);
        };
        let joined = handle.await;
        self.in_flight = None;

        self.conclude(joined).map(Some)
    }

    /// Processing -> ShowingOutcome, or back to Idle if the registry failed.
    fn conclude(
        &mut self,
        joined: Result<CoreResult<ScanOutcome>, JoinError>,
    ) -> Result<ScanOutcome, SessionError> {
        let result = joined.unwrap_or_else(|e| {
            Err(CoreError::StorageError(format!("Validation task failed: {}", e)))
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = SessionState::Idle;
                error!(session_id = %self.id, "Ticket validation failed: {}", e);
                return Err(e.into());
            }
        };

        self.stats.record(&outcome);
        match outcome.rejection() {
            None => info!(
                session_id = %self.id,
                operator = %self.operator,
                "Ticket accepted: {}",
                outcome.token()
            ),
            Some(rejection) => warn!(
                session_id = %self.id,
                operator = %self.operator,
                ?rejection,
                "Ticket rejected: {}",
                outcome.token()
            ),
        }

        self.state = SessionState::ShowingOutcome(outcome.clone());
        Ok(outcome)
    }

    /// ShowingOutcome -> Idle. Returns the outcome being dismissed.
    pub fn acknowledge(&mut self) -> Result<ScanOutcome, SessionError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::ShowingOutcome(outcome) => Ok(outcome),
            other => {
                self.state = other;
                Err(SessionError::NothingToAcknowledge)
            }
        }
    }

    /// Back to Idle from anywhere. A scan still in flight is finished first
    /// and its outcome returned, since it may already have consumed a ticket.
    pub async fn reset(&mut self) -> Result<Option<ScanOutcome>, SessionError> {
        let settled = self.settle().await;
        self.state = SessionState::Idle;
        settled
    }
}
