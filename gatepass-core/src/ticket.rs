use chrono::{DateTime, NaiveDate, Utc};
use gatepass_shared::pii::Masked;
use serde::{Deserialize, Serialize};

use crate::token::{TicketToken, TokenError};

/// Ticket status as seen at the gate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Valid,
    Used,
    Expired,
    Invalid,
}

impl TicketStatus {
    /// Only `Valid -> Used` exists. Everything else is terminal.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        matches!((self, next), (TicketStatus::Valid, TicketStatus::Used))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Used => "used",
            TicketStatus::Expired => "expired",
            TicketStatus::Invalid => "invalid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "valid" => Some(TicketStatus::Valid),
            "used" => Some(TicketStatus::Used),
            "expired" => Some(TicketStatus::Expired),
            "invalid" => Some(TicketStatus::Invalid),
            _ => None,
        }
    }
}

/// One purchased admission right.
///
/// Everything except `status` is a snapshot taken at booking time. Registries
/// hand out clones; the status changes only through `TicketRegistry::mark_used`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub token: String,
    pub ticket_number: String,
    pub event_id: String,
    pub event_title: String,
    #[serde(default)]
    pub event_title_localized: Option<String>,
    pub holder_name: String,
    pub holder_phone: Masked<String>,
    pub holder_email: Masked<String>,
    pub event_date: NaiveDate,
    pub event_time: String,
    pub location: String,
    #[serde(default)]
    pub location_localized: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub organizer_localized: Option<String>,
    pub price: u32,
    pub status: TicketStatus,
    pub booking_date: DateTime<Utc>,
    #[serde(default)]
    pub seat_number: Option<String>,
}

impl Ticket {
    pub fn parsed_token(&self) -> Result<TicketToken, TokenError> {
        TicketToken::parse(&self.token)
    }

    /// Token must parse and agree with the ticket's own number and event.
    pub fn check_token(&self) -> Result<(), crate::CoreError> {
        let token = self.parsed_token()?;
        if token.ticket_number() != self.ticket_number {
            return Err(crate::CoreError::ValidationError(format!(
                "token {} does not carry ticket number {}",
                self.token, self.ticket_number
            )));
        }
        if token.event_id() != self.event_id {
            return Err(crate::CoreError::ValidationError(format!(
                "token {} does not carry event id {}",
                self.token, self.event_id
            )));
        }
        Ok(())
    }

    /// Copy of this ticket with `status` replaced. Used to build the snapshot
    /// returned after a successful `mark_used`.
    pub fn with_status(&self, status: TicketStatus) -> Ticket {
        Ticket {
            status,
            ..self.clone()
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn ticket(token: &str, status: TicketStatus) -> Ticket {
        let parsed = TicketToken::parse(token).unwrap();
        Ticket {
            token: token.to_string(),
            ticket_number: parsed.ticket_number().to_string(),
            event_id: parsed.event_id().to_string(),
            event_title: "Tech Conference 2024".to_string(),
            event_title_localized: None,
            holder_name: "Ahmed Ali Mohammed".to_string(),
            holder_phone: Masked("+218 91 234 5678".to_string()),
            holder_email: Masked("ahmed.ali@email.com".to_string()),
            event_date: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            event_time: "09:00 AM".to_string(),
            location: "Dubai Convention Center".to_string(),
            location_localized: None,
            organizer: Some("Tech Dubai".to_string()),
            organizer_localized: None,
            price: 0,
            status,
            booking_date: Utc::now(),
            seat_number: Some("A-15".to_string()),
        }
    }
}
