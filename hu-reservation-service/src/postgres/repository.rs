use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use shared::OrderLineId;

use super::PgTrx;
use crate::error::Result;
use crate::models::{HuReservationRecord, NewHuReservation};
use crate::repository::HuReservationStore;
use crate::reservation::HuReservation;
use crate::schema::hu_reservations;

#[derive(Debug, Clone, Copy, Default)]
pub struct PgHuReservationRepository;

#[async_trait]
impl HuReservationStore<PgTrx> for PgHuReservationRepository {
    async fn get_by_sales_order_line_id(&self, trx: &mut PgTrx, id: OrderLineId) -> Result<HuReservation> {
        let records = hu_reservations::table
            .filter(hu_reservations::is_active.eq(true))
            .filter(hu_reservations::sales_order_line_id.eq(id.as_uuid()))
            .order(hu_reservations::created_at.asc())
            .load::<HuReservationRecord>(trx.conn())
            .await?;

        let lines = records
            .iter()
            .map(HuReservationRecord::to_line)
            .collect::<Result<Vec<_>>>()?;

        HuReservation::from_lines(id, lines)
    }

    async fn save(&self, trx: &mut PgTrx, reservation: &HuReservation) -> Result<()> {
        let rows: Vec<NewHuReservation> = reservation
            .lines()
            .map(|(vhu_id, qty)| NewHuReservation::new(reservation.sales_order_line_id(), vhu_id, qty))
            .collect();
        if rows.is_empty() {
            return Ok(());
        }

        diesel::insert_into(hu_reservations::table)
            .values(&rows)
            .execute(trx.conn())
            .await?;

        Ok(())
    }
}
