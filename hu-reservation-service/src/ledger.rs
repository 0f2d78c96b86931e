use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use shared::{Command, CommandReply};
use uuid::Uuid;

use crate::models::ProcessedCommand;

/// Commands already answered, keyed by idempotency key.
#[async_trait]
pub trait ProcessedCommandLedger: Send + Sync {
    async fn check_idempotency(&self, idempotency_key: &str) -> Result<Option<ProcessedCommand>>;

    async fn store_processed_command(&self, command: &Command, reply: &CommandReply) -> Result<()>;
}

/// Ledger entry holding the full reply, so a replay can answer exactly as the
/// first run did.
pub fn processed_command(command: &Command, reply: &CommandReply) -> Result<ProcessedCommand> {
    Ok(ProcessedCommand {
        idempotency_key: command.idempotency_key.clone(),
        command_id: command.id,
        result: Some(serde_json::to_value(reply)?),
        processed_at: Some(Utc::now()),
    })
}

/// Reply for a command that was already processed: the stored reply under a
/// fresh id and timestamp. Entries without a stored reply answer `Success`.
pub fn replay(command: &Command, existing: ProcessedCommand) -> Result<CommandReply> {
    let mut reply = match existing.result {
        Some(cached) => serde_json::from_value::<CommandReply>(cached)?,
        None => CommandReply::success(command.id, command.correlation_id, None),
    };
    reply.id = Uuid::new_v4();
    reply.created_at = Utc::now();
    Ok(reply)
}
