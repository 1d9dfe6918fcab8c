use uuid::Uuid;

/// Published once per processed scan, whatever the outcome.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct TicketScannedEvent {
    pub session_id: Uuid,
    pub operator: String,
    pub token: String,
    pub ticket_number: Option<String>,
    pub event_id: Option<String>,
    pub outcome: String, // ACCEPTED, ALREADY_USED, EXPIRED, INVALID
    pub scanned_at: i64,
}

impl TicketScannedEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
