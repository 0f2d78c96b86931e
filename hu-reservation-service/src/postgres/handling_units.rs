use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::QueryFragment;
use diesel_async::methods::LoadQuery;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::{HuId, HuStatus, ProductId, Quantity, Uom};
use uuid::Uuid;

use super::PgTrx;
use crate::error::{ReservationError, Result};
use crate::hu::split::plan_split;
use crate::hu::{
    collect_sources, ensure_convertible, HandlingUnit, HuStatusMutator, HuStorage, HuTransformService,
    HusToNewCusRequest,
};
use crate::models::{HandlingUnitRecord, HuStorageRecord, NewHandlingUnit};
use crate::schema::{handling_units, hu_storage};

#[derive(Debug, Clone, Copy, Default)]
pub struct PgHandlingUnits;

/// Candidate HUs locked in id order, so overlapping reservations queue up
/// behind each other without deadlocking.
fn candidates_for_update(
    source_ids: Vec<Uuid>,
) -> impl LoadQuery<'static, AsyncPgConnection, HandlingUnitRecord> + QueryFragment<Pg> + Send + 'static {
    handling_units::table
        .filter(handling_units::id.eq_any(source_ids))
        .order(handling_units::id)
        .for_update()
}

impl PgHandlingUnits {
    async fn update_status(conn: &mut AsyncPgConnection, hu_id: HuId, status: HuStatus) -> Result<usize> {
        let updated = diesel::update(handling_units::table.find(hu_id.as_uuid()))
            .set((
                handling_units::hu_status.eq(status.as_str()),
                handling_units::is_active.eq(status.is_active_flag()),
                handling_units::updated_at.eq(Some(Utc::now())),
            ))
            .execute(conn)
            .await?;
        Ok(updated)
    }
}

#[async_trait]
impl HuTransformService<PgTrx> for PgHandlingUnits {
    async fn hus_to_new_cus(&self, trx: &mut PgTrx, request: &HusToNewCusRequest) -> Result<Vec<HuId>> {
        let product_id = request.product_id.as_uuid();
        let source_ids: Vec<Uuid> = request.source_hu_ids.iter().map(HuId::as_uuid).collect();

        let hus = candidates_for_update(source_ids.clone())
            .load::<HandlingUnitRecord>(trx.conn())
            .await?
            .iter()
            .map(|record| record.to_handling_unit().map(|hu| (hu.id, hu)))
            .collect::<Result<HashMap<HuId, HandlingUnit>>>()?;

        let stock: HashMap<HuId, Quantity> = hu_storage::table
            .filter(hu_storage::hu_id.eq_any(source_ids))
            .filter(hu_storage::product_id.eq(product_id))
            .load::<HuStorageRecord>(trx.conn())
            .await?
            .into_iter()
            .map(|record| (HuId::from_uuid(record.hu_id), record.quantity()))
            .collect();

        let sources = collect_sources(request, |hu_id| hus.get(&hu_id), |hu_id| stock.get(&hu_id))?;
        let steps = plan_split(&sources, &request.qty_cu)?;

        let mut new_cus = Vec::with_capacity(steps.len());
        for step in steps {
            let new_cu = HuId::new();
            diesel::insert_into(handling_units::table)
                .values(&NewHandlingUnit {
                    id: new_cu.as_uuid(),
                    parent_hu_id: step
                        .new_cu_parent(request.keep_new_cus_under_same_parent)
                        .map(|parent| parent.as_uuid()),
                    hu_status: HuStatus::Active.as_str().to_string(),
                    is_active: true,
                })
                .execute(trx.conn())
                .await?;

            let (qty, uom) = step.qty.clone().into_parts();
            diesel::insert_into(hu_storage::table)
                .values(&HuStorageRecord {
                    hu_id: new_cu.as_uuid(),
                    product_id,
                    qty,
                    uom: uom.code().to_string(),
                })
                .execute(trx.conn())
                .await?;

            let source_storage = hu_storage::table
                .filter(hu_storage::hu_id.eq(step.source_hu_id.as_uuid()))
                .filter(hu_storage::product_id.eq(product_id));

            if step.drains_source() {
                diesel::delete(source_storage).execute(trx.conn()).await?;

                let left: i64 = hu_storage::table
                    .filter(hu_storage::hu_id.eq(step.source_hu_id.as_uuid()))
                    .count()
                    .get_result(trx.conn())
                    .await?;
                if left == 0 {
                    Self::update_status(trx.conn(), step.source_hu_id, HuStatus::Destroyed).await?;
                }
            } else {
                diesel::update(source_storage)
                    .set(hu_storage::qty.eq(step.source_remaining.qty().clone()))
                    .execute(trx.conn())
                    .await?;
            }

            new_cus.push(new_cu);
        }

        Ok(new_cus)
    }
}

#[async_trait]
impl HuStorage<PgTrx> for PgHandlingUnits {
    async fn get_quantity(&self, trx: &mut PgTrx, hu_id: HuId, product_id: ProductId, uom: &Uom) -> Result<Quantity> {
        let record = hu_storage::table
            .filter(hu_storage::hu_id.eq(hu_id.as_uuid()))
            .filter(hu_storage::product_id.eq(product_id.as_uuid()))
            .first::<HuStorageRecord>(trx.conn())
            .await
            .optional()?;

        match record {
            Some(record) => {
                let qty = record.quantity();
                ensure_convertible(hu_id, &qty, uom)?;
                Ok(qty)
            }
            None => Ok(Quantity::zero(uom.clone())),
        }
    }
}

#[async_trait]
impl HuStatusMutator<PgTrx> for PgHandlingUnits {
    async fn set_hu_status(&self, trx: &mut PgTrx, hu_id: HuId, status: HuStatus) -> Result<()> {
        let updated = Self::update_status(trx.conn(), hu_id, status).await?;
        if updated == 0 {
            return Err(ReservationError::HuNotFound(hu_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_are_locked_in_id_order() {
        let query = candidates_for_update(vec![Uuid::new_v4(), Uuid::new_v4()]);
        let sql = diesel::debug_query::<Pg, _>(&query).to_string();

        let order_by = sql.find(r#"ORDER BY "handling_units"."id""#).unwrap();
        let for_update = sql.find("FOR UPDATE").unwrap();
        assert!(order_by < for_update, "{sql}");
    }
}
