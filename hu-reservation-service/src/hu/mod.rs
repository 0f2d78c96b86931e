//! Handling-unit collaborators used by the reservation service.
//!
//! The service only talks to these traits. [`crate::postgres`] and
//! [`crate::memory`] implement all three on one backend type and share the
//! split planning in [`split`].

pub mod split;

use async_trait::async_trait;
use shared::{HuId, HuStatus, ProductId, Quantity, Uom};
use tracing::debug;

use crate::error::{ReservationError, Result};
use split::SourceStock;

/// Split new CUs carrying `qty_cu` of `product_id` off `source_hu_ids`.
#[derive(Debug, Clone)]
pub struct HusToNewCusRequest {
    pub source_hu_ids: Vec<HuId>,
    pub product_id: ProductId,
    pub qty_cu: Quantity,
    pub only_from_active_hus: bool,
    pub keep_new_cus_under_same_parent: bool,
}

/// A handling unit as the HU backends store it.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlingUnit {
    pub id: HuId,
    pub parent_hu_id: Option<HuId>,
    pub status: HuStatus,
    pub is_active: bool,
}

impl HandlingUnit {
    pub fn is_eligible_source(&self, only_from_active_hus: bool) -> bool {
        !only_from_active_hus || (self.is_active && self.status == HuStatus::Active)
    }
}

#[async_trait]
pub trait HuTransformService<Trx: Send>: Send + Sync {
    /// Returns the ids of the newly created CUs.
    async fn hus_to_new_cus(&self, trx: &mut Trx, request: &HusToNewCusRequest) -> Result<Vec<HuId>>;
}

#[async_trait]
pub trait HuStorage<Trx: Send>: Send + Sync {
    /// Quantity of `product_id` held by `hu_id`, expressed in `uom`.
    async fn get_quantity(&self, trx: &mut Trx, hu_id: HuId, product_id: ProductId, uom: &Uom) -> Result<Quantity>;
}

#[async_trait]
pub trait HuStatusMutator<Trx: Send>: Send + Sync {
    async fn set_hu_status(&self, trx: &mut Trx, hu_id: HuId, status: HuStatus) -> Result<()>;
}

/// Resolves the candidate HUs of `request` into split sources, in request order.
///
/// Unknown ids fail; ineligible HUs and HUs without stock of the product are skipped.
pub(crate) fn collect_sources<'a>(
    request: &HusToNewCusRequest,
    hu: impl Fn(HuId) -> Option<&'a HandlingUnit>,
    stock: impl Fn(HuId) -> Option<&'a Quantity>,
) -> Result<Vec<SourceStock>> {
    let mut sources = Vec::new();
    for hu_id in dedup_preserving_order(&request.source_hu_ids) {
        let unit = hu(hu_id).ok_or(ReservationError::HuNotFound(hu_id))?;
        if !unit.is_eligible_source(request.only_from_active_hus) {
            debug!("Skipping HU {} in status {}", hu_id, unit.status);
            continue;
        }
        let Some(qty) = stock(hu_id) else {
            continue;
        };
        ensure_convertible(hu_id, qty, request.qty_cu.uom())?;
        sources.push(SourceStock {
            hu_id,
            parent_hu_id: unit.parent_hu_id,
            qty: qty.clone(),
        });
    }
    Ok(sources)
}

/// Quantities are only ever expressed in their own UOM; any other target UOM
/// has no conversion.
pub(crate) fn ensure_convertible(hu_id: HuId, qty: &Quantity, uom: &Uom) -> Result<()> {
    if qty.uom() != uom {
        return Err(ReservationError::UomConversion {
            hu_id,
            from: qty.uom().clone(),
            to: uom.clone(),
        });
    }
    Ok(())
}

pub(crate) fn dedup_preserving_order(ids: &[HuId]) -> Vec<HuId> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
