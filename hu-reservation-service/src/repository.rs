use async_trait::async_trait;
use shared::OrderLineId;

use crate::error::Result;
use crate::reservation::HuReservation;

/// Persists reservation lines, one row per reserved virtual HU.
#[async_trait]
pub trait HuReservationStore<Trx: Send>: Send + Sync {
    /// Loads all active lines for the order line. No lines gives an empty
    /// reservation without a sum.
    async fn get_by_sales_order_line_id(&self, trx: &mut Trx, id: OrderLineId) -> Result<HuReservation>;

    /// Inserts one row per line. Existing rows are never updated.
    async fn save(&self, trx: &mut Trx, reservation: &HuReservation) -> Result<()>;
}
