use async_trait::async_trait;
use gatepass_core::{CoreError, CoreResult, MarkUsed, Ticket, TicketRegistry, TicketStatus};
use redis::AsyncCommands;
use tracing::{debug, error, info};

/// Registry shared through Redis so every gate process sees the same tickets.
///
/// Layout under `{prefix}`:
/// - `{prefix}:ticket:{token}` hash with `data` (JSON snapshot) and `status`
/// - `{prefix}:tickets` set of registered tokens
/// - `{prefix}:scanned` set of tokens consumed through `mark_used`
///
/// Status lives in its own hash field so the check-and-set script never has
/// to decode JSON. The script hands back the snapshot from the same EVAL, so
/// nothing is awaited after the status has been committed.
#[derive(Clone)]
pub struct RedisTicketRegistry {
    client: redis::Client,
    prefix: String,
}

// KEYS[1] ticket hash, KEYS[2] scanned set, ARGV[1] token
// Returns {result, status, data}; result is "missing", "unchanged" or "marked".
const MARK_USED_SCRIPT: &str = r#"
    local status = redis.call("HGET", KEYS[1], "status")
    if not status then
        return {"missing", false, false}
    end
    local data = redis.call("HGET", KEYS[1], "data")
    if status ~= "valid" then
        return {"unchanged", status, data}
    end
    redis.call("HSET", KEYS[1], "status", "used")
    redis.call("SADD", KEYS[2], ARGV[1])
    return {"marked", "used", data}
"#;

// KEYS[1] ticket hash, KEYS[2] token set, ARGV[1] token, ARGV[2] data, ARGV[3] status
const INSERT_SCRIPT: &str = r#"
    if redis.call("EXISTS", KEYS[1]) == 1 then
        return 0
    end
    redis.call("HSET", KEYS[1], "data", ARGV[2], "status", ARGV[3])
    redis.call("SADD", KEYS[2], ARGV[1])
    return 1
"#;

fn storage(err: redis::RedisError) -> CoreError {
    error!("Redis registry failure: {}", err);
    CoreError::StorageError(err.to_string())
}

impl RedisTicketRegistry {
    pub async fn new(connection_string: &str, prefix: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        info!("Redis ticket registry using prefix {}", prefix);
        Ok(Self {
            client,
            prefix: prefix.to_string(),
        })
    }

    fn ticket_key(&self, token: &str) -> String {
        format!("{}:ticket:{}", self.prefix, token)
    }

    fn tickets_key(&self) -> String {
        format!("{}:tickets", self.prefix)
    }

    fn scanned_key(&self) -> String {
        format!("{}:scanned", self.prefix)
    }

    async fn connection(&self) -> CoreResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(storage)
    }
}

/// Rebuild a ticket from its hash fields; `status` wins over the snapshot.
fn decode(data: Option<String>, status: Option<String>) -> CoreResult<Option<Ticket>> {
    let (Some(data), Some(status)) = (data, status) else {
        return Ok(None);
    };

    let mut ticket: Ticket = serde_json::from_str(&data)
        .map_err(|e| CoreError::StorageError(format!("Corrupt ticket snapshot: {}", e)))?;
    ticket.status = TicketStatus::parse(&status)
        .ok_or_else(|| CoreError::StorageError(format!("Unknown ticket status: {}", status)))?;

    Ok(Some(ticket))
}

#[async_trait]
impl TicketRegistry for RedisTicketRegistry {
    async fn lookup(&self, token: &str) -> CoreResult<Option<Ticket>> {
        let mut conn = self.connection().await?;
        let (data, status): (Option<String>, Option<String>) = redis::cmd("HMGET")
            .arg(self.ticket_key(token))
            .arg("data")
            .arg("status")
            .query_async(&mut conn)
            .await
            .map_err(storage)?;

        decode(data, status)
    }

    async fn mark_used(&self, token: &str) -> CoreResult<MarkUsed> {
        let mut conn = self.connection().await?;
        let script = redis::Script::new(MARK_USED_SCRIPT);
        let (result, status, data): (String, Option<String>, Option<String>) = script
            .key(self.ticket_key(token))
            .key(self.scanned_key())
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(storage)?;

        if result == "missing" {
            return Ok(MarkUsed::NotFound);
        }

        let ticket = decode(data, status)?.ok_or_else(|| {
            CoreError::StorageError(format!("Ticket {} has a status but no snapshot", token))
        })?;

        debug!(token, result = %result, "mark_used script finished");
        Ok(match (result.as_str(), ticket.status) {
            ("marked", _) => MarkUsed::Marked(ticket),
            (_, TicketStatus::Used) => MarkUsed::AlreadyUsed(ticket),
            _ => MarkUsed::NotUsable(ticket),
        })
    }

    async fn is_recorded_as_scanned(&self, token: &str) -> CoreResult<bool> {
        let mut conn = self.connection().await?;
        conn.sismember(self.scanned_key(), token)
            .await
            .map_err(storage)
    }

    async fn insert(&self, ticket: Ticket) -> CoreResult<()> {
        ticket.check_token()?;

        let data = serde_json::to_string(&ticket)
            .map_err(|e| CoreError::ValidationError(format!("Unserializable ticket: {}", e)))?;

        let mut conn = self.connection().await?;
        let inserted: i32 = redis::Script::new(INSERT_SCRIPT)
            .key(self.ticket_key(&ticket.token))
            .key(self.tickets_key())
            .arg(&ticket.token)
            .arg(data)
            .arg(ticket.status.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(storage)?;

        if inserted == 0 {
            return Err(CoreError::DuplicateToken(ticket.token));
        }
        Ok(())
    }

    async fn len(&self) -> CoreResult<usize> {
        let mut conn = self.connection().await?;
        conn.scard(self.tickets_key()).await.map_err(storage)
    }
}
