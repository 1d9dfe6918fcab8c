use gatepass_core::Ticket;
use serde::{Deserialize, Serialize};

/// Why a ticket was turned away as already used.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlreadyUsedReason {
    /// Token was already recorded as scanned in this registry.
    PreviouslyScanned,
    /// Ticket status was `used` before this scan.
    StatusUsed,
    /// Ticket looked valid but another scanner consumed it first.
    RaceLost,
}

/// Rejection taxonomy shown to the operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanRejection {
    NotFound,
    AlreadyUsed,
    Expired,
    RaceLost,
}

/// Result of one scan attempt. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanOutcome {
    /// Snapshot already shows `used`.
    Accepted { ticket: Ticket },
    RejectedAlreadyUsed { ticket: Ticket, reason: AlreadyUsedReason },
    RejectedExpired { ticket: Ticket },
    RejectedInvalid { token: String },
}

impl ScanOutcome {
    pub fn rejection(&self) -> Option<ScanRejection> {
        match self {
            ScanOutcome::Accepted { .. } => None,
            ScanOutcome::RejectedAlreadyUsed { reason: AlreadyUsedReason::RaceLost, .. } => {
                Some(ScanRejection::RaceLost)
            }
            ScanOutcome::RejectedAlreadyUsed { .. } => Some(ScanRejection::AlreadyUsed),
            ScanOutcome::RejectedExpired { .. } => Some(ScanRejection::Expired),
            ScanOutcome::RejectedInvalid { .. } => Some(ScanRejection::NotFound),
        }
    }

    pub fn ticket(&self) -> Option<&Ticket> {
        match self {
            ScanOutcome::Accepted { ticket }
            | ScanOutcome::RejectedAlreadyUsed { ticket, .. }
            | ScanOutcome::RejectedExpired { ticket } => Some(ticket),
            ScanOutcome::RejectedInvalid { .. } => None,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            ScanOutcome::RejectedInvalid { token } => token,
            _ => self.ticket().map(|t| t.token.as_str()).unwrap_or_default(),
        }
    }

    /// Short code used in scan events and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ScanOutcome::Accepted { .. } => "ACCEPTED",
            ScanOutcome::RejectedAlreadyUsed { .. } => "ALREADY_USED",
            ScanOutcome::RejectedExpired { .. } => "EXPIRED",
            ScanOutcome::RejectedInvalid { .. } => "INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ticket;
    use gatepass_core::TicketStatus;

    const TOKEN: &str = "MI3AD-TICKET-MF240003-user3-3";

    #[test]
    fn test_race_lost_is_its_own_rejection() {
        let outcome = ScanOutcome::RejectedAlreadyUsed {
            ticket: ticket(TOKEN, TicketStatus::Used),
            reason: AlreadyUsedReason::RaceLost,
        };
        assert_eq!(outcome.rejection(), Some(ScanRejection::RaceLost));
        assert_eq!(outcome.code(), "ALREADY_USED");
        assert_eq!(outcome.token(), TOKEN);
    }

    #[test]
    fn test_invalid_has_no_ticket() {
        let outcome = ScanOutcome::RejectedInvalid { token: "junk".to_string() };
        assert!(outcome.ticket().is_none());
        assert_eq!(outcome.token(), "junk");
        assert_eq!(outcome.rejection(), Some(ScanRejection::NotFound));
    }

    #[test]
    fn test_json_is_tagged() {
        let outcome = ScanOutcome::Accepted { ticket: ticket(TOKEN, TicketStatus::Used) };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["result"], "ACCEPTED");
        assert_eq!(value["ticket"]["status"], "used");
        assert_eq!(value["ticket"]["holder_email"], "omar.hassan@email.com");
    }
}
