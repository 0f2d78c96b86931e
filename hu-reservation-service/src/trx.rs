use async_trait::async_trait;

use crate::error::Result;

/// Opens, commits and rolls back units of work.
///
/// Every collaborator of the reservation service takes the open transaction as
/// `&mut Self::Trx`, so all reads and writes of one reservation attempt see the
/// same transaction and become visible together on [`TrxManager::commit`].
#[async_trait]
pub trait TrxManager: Send + Sync {
    type Trx: Send;

    async fn begin(&self) -> Result<Self::Trx>;

    async fn commit(&self, trx: Self::Trx) -> Result<()>;

    async fn rollback(&self, trx: Self::Trx) -> Result<()>;
}
