use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use shared::{Command, CommandReply};

use super::DbPool;
use crate::ledger::{processed_command, ProcessedCommandLedger};
use crate::models::ProcessedCommand;
use crate::schema::processed_commands;

/// Idempotency ledger in the `processed_commands` table.
#[derive(Clone)]
pub struct PgProcessedCommandLedger {
    pool: DbPool,
}

impl PgProcessedCommandLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedCommandLedger for PgProcessedCommandLedger {
    async fn check_idempotency(&self, idempotency_key: &str) -> Result<Option<ProcessedCommand>> {
        let mut conn = self.pool.get().await?;
        let result = processed_commands::table
            .filter(processed_commands::idempotency_key.eq(idempotency_key))
            .first::<ProcessedCommand>(&mut conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn store_processed_command(&self, command: &Command, reply: &CommandReply) -> Result<()> {
        let mut conn = self.pool.get().await?;
        diesel::insert_into(processed_commands::table)
            .values(&processed_command(command, reply)?)
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}
