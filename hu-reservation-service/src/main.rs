use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use diesel::Connection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::FutureProducer;
use tracing::info;

use hu_reservation_service::config::Args;
use hu_reservation_service::handlers::CommandHandler;
use hu_reservation_service::logging;
use hu_reservation_service::postgres::{DbPool, PgHuReservationService, PgProcessedCommandLedger};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn run_migrations(database_url: &str) -> Result<()> {
    let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(database_url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    info!("Running database migrations...");
    let database_url = args.database_url.clone();
    tokio::task::spawn_blocking(move || run_migrations(&database_url)).await??;
    info!("Migrations completed successfully");

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&args.database_url);
    let pool: DbPool = DbPool::builder().build(config).await?;

    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", &args.kafka_brokers)
        .set("message.timeout.ms", "5000")
        .create()?;

    let consumer: StreamConsumer = ClientConfig::new()
        .set("group.id", &args.group_id)
        .set("bootstrap.servers", &args.kafka_brokers)
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .set("enable.auto.commit", "true")
        .create()?;

    consumer.subscribe(&[&args.command_topic])?;

    let service = Arc::new(PgHuReservationService::postgres(pool.clone()));
    let ledger = PgProcessedCommandLedger::new(pool);
    let command_handler = CommandHandler::new(service, ledger, producer, args.reply_topic.clone());

    info!(
        "HU reservation service consuming {} and replying on {}",
        args.command_topic, args.reply_topic
    );
    command_handler.run(consumer).await;

    Ok(())
}
