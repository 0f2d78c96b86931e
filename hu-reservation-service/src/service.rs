use std::collections::BTreeSet;

use shared::{DocStatus, HuId, HuReservationId, HuStatus, OrderLineId, Quantity};
use tracing::{debug, error, info, warn};

use crate::error::{ReservationError, Result};
use crate::hu::{HuStatusMutator, HuStorage, HuTransformService, HusToNewCusRequest};
use crate::repository::HuReservationStore;
use crate::reservation::{HuReservation, HuReservationRequest, ReservationLine};
use crate::trx::TrxManager;

const DOC_STATUSES_ALLOWING_RESERVATION: [DocStatus; 4] = [
    DocStatus::Drafted,
    DocStatus::InProgress,
    DocStatus::WaitingPayment,
    DocStatus::Completed,
];

pub struct HuReservationService<M, R, H> {
    trx_manager: M,
    repository: R,
    handling_units: H,
}

impl<M, R, H> HuReservationService<M, R, H>
where
    M: TrxManager,
    R: HuReservationStore<M::Trx>,
    H: HuTransformService<M::Trx> + HuStorage<M::Trx> + HuStatusMutator<M::Trx>,
{
    pub fn new(trx_manager: M, repository: R, handling_units: H) -> Self {
        Self {
            trx_manager,
            repository,
            handling_units,
        }
    }

    /// Splits dedicated CUs off the requested HUs, flags them as reserved and
    /// stores one reservation line per CU.
    ///
    /// Runs as a single transaction: on any error nothing is split, flagged or
    /// stored. If the candidate HUs hold less than requested, what they hold is
    /// reserved.
    pub async fn make_reservation(&self, request: HuReservationRequest) -> Result<HuReservation> {
        request.validate()?;

        let mut trx = self.trx_manager.begin().await?;
        let outcome = self.make_and_save(&mut trx, &request).await;
        let reservation = self.finish(trx, outcome).await?;

        info!(
            "Reserved {} in {} CU(s) for order line {}",
            reservation
                .reserved_qty_sum()
                .map(ToString::to_string)
                .unwrap_or_default(),
            reservation.vhu_id_to_reserved_qty().len(),
            request.sales_order_line_id
        );
        Ok(reservation)
    }

    /// Loads what is currently reserved for the order line.
    pub async fn get_reservation(&self, sales_order_line_id: OrderLineId) -> Result<HuReservation> {
        let mut trx = self.trx_manager.begin().await?;
        let outcome = self
            .repository
            .get_by_sales_order_line_id(&mut trx, sales_order_line_id)
            .await;
        self.finish(trx, outcome).await
    }

    /// Deletes the reservation record. CUs split off for it would stay split.
    pub fn delete_reservation(&self, _reservation_id: HuReservationId) -> Result<()> {
        Err(ReservationError::NotImplemented("HuReservationService::delete_reservation"))
    }

    /// Narrows `hu_ids` to the HUs that are not reserved for an order line other
    /// than `order_line_id`.
    pub fn retain_available_hus_for_order_line(
        &self,
        _hu_ids: &[HuId],
        _order_line_id: OrderLineId,
    ) -> Result<Vec<HuId>> {
        // TODO: load the reservations of all given HUs with one query instead of one per HU.
        Err(ReservationError::NotImplemented(
            "HuReservationService::retain_available_hus_for_order_line",
        ))
    }

    pub fn get_docstatuses_that_allow_reservation(&self) -> BTreeSet<DocStatus> {
        DOC_STATUSES_ALLOWING_RESERVATION.into_iter().collect()
    }

    pub fn is_reservation_allowed(&self, doc_status: DocStatus) -> bool {
        DOC_STATUSES_ALLOWING_RESERVATION.contains(&doc_status)
    }

    async fn make_and_save(&self, trx: &mut M::Trx, request: &HuReservationRequest) -> Result<HuReservation> {
        let split_request = HusToNewCusRequest {
            source_hu_ids: request.hu_ids.clone(),
            product_id: request.product_id,
            qty_cu: request.qty_to_reserve.clone(),
            only_from_active_hus: true,
            keep_new_cus_under_same_parent: true,
        };
        let new_cus = self.handling_units.hus_to_new_cus(trx, &split_request).await?;
        debug!("Split {} new CU(s) off {} HU(s)", new_cus.len(), request.hu_ids.len());

        let uom = request.qty_to_reserve.uom();
        let mut lines = Vec::with_capacity(new_cus.len());
        for new_cu in new_cus {
            let qty = self
                .handling_units
                .get_quantity(trx, new_cu, request.product_id, uom)
                .await?;
            lines.push(ReservationLine::new(new_cu, qty)?);

            self.handling_units
                .set_hu_status(trx, new_cu, HuStatus::Reserved)
                .await?;
        }

        let reservation = HuReservation::fold(
            request.sales_order_line_id,
            Quantity::zero(uom.clone()),
            lines,
        )?;

        if reservation.reserved_qty_sum() != Some(&request.qty_to_reserve) {
            warn!(
                "Reserved {} of the requested {} for order line {}",
                reservation
                    .reserved_qty_sum()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                request.qty_to_reserve,
                request.sales_order_line_id
            );
        }

        self.repository.save(trx, &reservation).await?;
        Ok(reservation)
    }

    async fn finish<T>(&self, trx: M::Trx, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.trx_manager.commit(trx).await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self.trx_manager.rollback(trx).await {
                    error!("Rollback failed after {}: {}", e, rollback_error);
                }
                Err(e)
            }
        }
    }
}
