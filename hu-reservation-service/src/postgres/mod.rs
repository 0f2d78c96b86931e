//! Postgres backend: diesel-async over a bb8 pool.

mod handling_units;
mod ledger;
mod repository;

pub use handling_units::PgHandlingUnits;
pub use ledger::PgProcessedCommandLedger;
pub use repository::PgHuReservationRepository;

use async_trait::async_trait;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, TransactionManager};

use crate::error::{ReservationError, Result};
use crate::service::HuReservationService;
use crate::trx::TrxManager;

pub type DbPool = Pool<AsyncPgConnection>;

pub type PgHuReservationService =
    HuReservationService<PgTrxManager, PgHuReservationRepository, PgHandlingUnits>;

/// A pooled connection with an open transaction.
pub struct PgTrx {
    conn: bb8::PooledConnection<'static, AsyncDieselConnectionManager<AsyncPgConnection>>,
}

impl PgTrx {
    pub fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }
}

#[derive(Clone)]
pub struct PgTrxManager {
    pool: DbPool,
}

impl PgTrxManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrxManager for PgTrxManager {
    type Trx = PgTrx;

    async fn begin(&self) -> Result<PgTrx> {
        let mut conn = self
            .pool
            .get_owned()
            .await
            .map_err(|e| ReservationError::Pool(e.to_string()))?;
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::begin_transaction(&mut *conn).await?;
        Ok(PgTrx { conn })
    }

    async fn commit(&self, mut trx: PgTrx) -> Result<()> {
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::commit_transaction(trx.conn())
            .await
            .map_err(|e| ReservationError::Transaction(format!("commit failed: {}", e)))
    }

    async fn rollback(&self, mut trx: PgTrx) -> Result<()> {
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::rollback_transaction(trx.conn())
            .await
            .map_err(|e| ReservationError::Transaction(format!("rollback failed: {}", e)))
    }
}

impl PgHuReservationService {
    pub fn postgres(pool: DbPool) -> Self {
        HuReservationService::new(PgTrxManager::new(pool), PgHuReservationRepository, PgHandlingUnits)
    }
}
