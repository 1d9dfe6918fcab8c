use std::fmt;
use std::str::FromStr;

pub const DEFAULT_NAMESPACE: &str = "MI3AD";
const KIND: &str = "TICKET";
const SEPARATOR: char = '-';

/// Structured form of the string embedded in a ticket's QR code:
/// `<namespace>-TICKET-<ticket_number>-<holder_id>-<event_id>`.
///
/// The registry is keyed by the full string; this type exists to build
/// tokens and to validate them on registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketToken {
    namespace: String,
    ticket_number: String,
    holder_id: String,
    event_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("expected 5 hyphen-separated segments, found {0}")]
    SegmentCount(usize),
    #[error("second segment must be TICKET, found {0:?}")]
    WrongKind(String),
    #[error("segment {0} is empty")]
    EmptySegment(&'static str),
    #[error("segment {0} contains a hyphen")]
    EmbeddedSeparator(&'static str),
}

impl TicketToken {
    pub fn new(
        namespace: impl Into<String>,
        ticket_number: impl Into<String>,
        holder_id: impl Into<String>,
        event_id: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let token = Self {
            namespace: namespace.into(),
            ticket_number: ticket_number.into(),
            holder_id: holder_id.into(),
            event_id: event_id.into(),
        };

        for (name, value) in token.segments() {
            if value.is_empty() {
                return Err(TokenError::EmptySegment(name));
            }
            if value.contains(SEPARATOR) {
                return Err(TokenError::EmbeddedSeparator(name));
            }
        }

        Ok(token)
    }

    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let parts: Vec<&str> = raw.split(SEPARATOR).collect();
        if parts.len() != 5 {
            return Err(TokenError::SegmentCount(parts.len()));
        }
        if parts[1] != KIND {
            return Err(TokenError::WrongKind(parts[1].to_string()));
        }

        Self::new(parts[0], parts[2], parts[3], parts[4])
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ticket_number(&self) -> &str {
        &self.ticket_number
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    fn segments(&self) -> [(&'static str, &str); 4] {
        [
            ("namespace", &self.namespace),
            ("ticket_number", &self.ticket_number),
            ("holder_id", &self.holder_id),
            ("event_id", &self.event_id),
        ]
    }
}

impl fmt::Display for TicketToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.namespace, KIND, self.ticket_number, self.holder_id, self.event_id
        )
    }
}

impl FromStr for TicketToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
