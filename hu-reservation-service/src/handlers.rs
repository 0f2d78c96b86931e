use anyhow::Result;
use futures::StreamExt;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::Message;
use serde::de::DeserializeOwned;
use shared::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::ReservationError;
use crate::hu::{HuStatusMutator, HuStorage, HuTransformService};
use crate::ledger::{replay, ProcessedCommandLedger};
use crate::postgres::{PgHuReservationService, PgProcessedCommandLedger};
use crate::repository::HuReservationStore;
use crate::service::HuReservationService;
use crate::trx::TrxManager;

/// Runs one command against the service and turns the outcome into a reply.
///
/// Business-rule failures and unreadable payloads become `Failed` replies;
/// infrastructure failures are returned as errors.
pub async fn dispatch<M, R, H>(service: &HuReservationService<M, R, H>, command: &Command) -> Result<CommandReply>
where
    M: TrxManager,
    R: HuReservationStore<M::Trx>,
    H: HuTransformService<M::Trx> + HuStorage<M::Trx> + HuStatusMutator<M::Trx>,
{
    let outcome = match command.command_type {
        CommandType::ReserveHandlingUnits => match parse_payload::<HuReservationData>(command) {
            Ok(data) => service
                .make_reservation(data.into())
                .await
                .map(|reservation| Some(reservation.to_summary())),
            Err(e) => Err(e),
        },
        CommandType::QueryHuReservation => match parse_payload::<OrderLineData>(command) {
            Ok(data) => service
                .get_reservation(data.sales_order_line_id)
                .await
                .map(|reservation| Some(reservation.to_summary())),
            Err(e) => Err(e),
        },
        CommandType::DeleteHuReservation => parse_payload::<DeleteHuReservationData>(command)
            .and_then(|data| service.delete_reservation(data.reservation_id))
            .map(|()| None),
    };

    match outcome {
        Ok(summary) => {
            let result = summary.map(serde_json::to_value).transpose()?;
            Ok(CommandReply::success(command.id, command.correlation_id, result))
        }
        Err(e) if e.is_business_rule_violation() => {
            warn!("{:?} command {} rejected: {}", command.command_type, command.id, e);
            Ok(CommandReply::failed(command.id, command.correlation_id, e.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_payload<T: DeserializeOwned>(command: &Command) -> Result<T, ReservationError> {
    serde_json::from_value(command.payload.clone())
        .map_err(|e| ReservationError::InvalidRequest(format!("invalid {:?} payload: {}", command.command_type, e)))
}

/// Answers a command at most once per idempotency key: a repeated key gets the
/// stored reply back without touching the service again.
pub async fn process_command<M, R, H, L>(
    service: &HuReservationService<M, R, H>,
    ledger: &L,
    command: &Command,
) -> Result<CommandReply>
where
    M: TrxManager,
    R: HuReservationStore<M::Trx>,
    H: HuTransformService<M::Trx> + HuStorage<M::Trx> + HuStatusMutator<M::Trx>,
    L: ProcessedCommandLedger,
{
    if let Some(existing) = ledger.check_idempotency(&command.idempotency_key).await? {
        info!("Command already processed, returning cached result");
        return replay(command, existing);
    }

    let reply = dispatch(service, command).await?;
    ledger.store_processed_command(command, &reply).await?;
    Ok(reply)
}

pub struct CommandHandler {
    service: Arc<PgHuReservationService>,
    ledger: PgProcessedCommandLedger,
    producer: FutureProducer,
    reply_topic: String,
}

impl CommandHandler {
    pub fn new(
        service: Arc<PgHuReservationService>,
        ledger: PgProcessedCommandLedger,
        producer: FutureProducer,
        reply_topic: String,
    ) -> Self {
        Self { service, ledger, producer, reply_topic }
    }

    pub async fn run(&self, consumer: StreamConsumer) {
        let mut message_stream = consumer.stream();

        while let Some(message) = message_stream.next().await {
            match message {
                Ok(m) => {
                    if let Some(payload) = m.payload_view::<str>() {
                        match payload {
                            Ok(json_str) => match serde_json::from_str::<Command>(json_str) {
                                Ok(command) => {
                                    if let Err(e) = self.handle_command(command).await {
                                        error!("Error handling command: {}", e);
                                    }
                                }
                                Err(e) => warn!("Skipping message that is not a command: {}", e),
                            },
                            Err(e) => error!("Error parsing payload: {}", e),
                        }
                    }
                    if let Err(e) = consumer.commit_message(&m, rdkafka::consumer::CommitMode::Async) {
                        error!("Error committing message: {}", e);
                    }
                }
                Err(e) => error!("Error receiving message: {}", e),
            }
        }
    }

    async fn handle_command(&self, command: Command) -> Result<()> {
        let reply = process_command(&*self.service, &self.ledger, &command).await?;
        self.send_reply(reply).await
    }

    async fn send_reply(&self, reply: CommandReply) -> Result<()> {
        let json = serde_json::to_string(&reply)?;
        let key = reply.correlation_id.to_string();
        let record = FutureRecord::to(&self.reply_topic)
            .payload(&json)
            .key(&key);

        self.producer.send(record, Duration::from_secs(5)).await
            .map_err(|(e, _)| anyhow::anyhow!("Failed to send reply: {}", e))?;

        Ok(())
    }
}
