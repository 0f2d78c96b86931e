use std::collections::BTreeMap;

use shared::{
    HuId, HuReservationData, HuReservationSummary, OrderLineId, ProductId, Quantity, ReservedHuLine,
};

use crate::error::{ReservationError, Result};

/// One reserved virtual HU and the quantity it holds for the order line.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationLine {
    vhu_id: HuId,
    qty_reserved: Quantity,
}

impl ReservationLine {
    pub fn new(vhu_id: HuId, qty_reserved: Quantity) -> Result<Self> {
        if !qty_reserved.is_positive() {
            return Err(ReservationError::NonPositiveQuantity {
                vhu_id,
                qty: qty_reserved,
            });
        }
        Ok(Self { vhu_id, qty_reserved })
    }

    pub fn vhu_id(&self) -> HuId {
        self.vhu_id
    }

    pub fn qty_reserved(&self) -> &Quantity {
        &self.qty_reserved
    }
}

/// All reserved quantities held by virtual HUs for one sales order line.
///
/// `reserved_qty_sum` is `None` only for an aggregate that was loaded with no
/// lines at all; a freshly made reservation always carries a sum, possibly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct HuReservation {
    sales_order_line_id: OrderLineId,
    vhu_id_to_reserved_qty: BTreeMap<HuId, Quantity>,
    reserved_qty_sum: Option<Quantity>,
}

impl HuReservation {
    pub fn empty(sales_order_line_id: OrderLineId) -> Self {
        Self {
            sales_order_line_id,
            vhu_id_to_reserved_qty: BTreeMap::new(),
            reserved_qty_sum: None,
        }
    }

    /// Folds `lines` into an aggregate whose sum starts at `seed`.
    ///
    /// Every line must be in the seed's UOM. Lines for the same HU are merged.
    pub fn fold(
        sales_order_line_id: OrderLineId,
        seed: Quantity,
        lines: impl IntoIterator<Item = ReservationLine>,
    ) -> Result<Self> {
        let (vhu_id_to_reserved_qty, sum) = lines.into_iter().try_fold(
            (BTreeMap::<HuId, Quantity>::new(), seed),
            |(mut map, sum), line| -> Result<_> {
                let sum = sum.add(&line.qty_reserved)?;
                let merged = match map.remove(&line.vhu_id) {
                    Some(existing) => existing.add(&line.qty_reserved)?,
                    None => line.qty_reserved,
                };
                map.insert(line.vhu_id, merged);
                Ok((map, sum))
            },
        )?;

        Ok(Self {
            sales_order_line_id,
            vhu_id_to_reserved_qty,
            reserved_qty_sum: Some(sum),
        })
    }

    /// Rebuilds an aggregate from stored lines. The first line's UOM seeds the sum.
    pub fn from_lines(sales_order_line_id: OrderLineId, lines: Vec<ReservationLine>) -> Result<Self> {
        let Some(first) = lines.first() else {
            return Ok(Self::empty(sales_order_line_id));
        };
        let seed = Quantity::zero(first.qty_reserved.uom().clone());
        Self::fold(sales_order_line_id, seed, lines)
    }

    pub fn sales_order_line_id(&self) -> OrderLineId {
        self.sales_order_line_id
    }

    pub fn vhu_id_to_reserved_qty(&self) -> &BTreeMap<HuId, Quantity> {
        &self.vhu_id_to_reserved_qty
    }

    pub fn reserved_qty_sum(&self) -> Option<&Quantity> {
        self.reserved_qty_sum.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.vhu_id_to_reserved_qty.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = (HuId, &Quantity)> + '_ {
        self.vhu_id_to_reserved_qty.iter().map(|(id, qty)| (*id, qty))
    }

    pub fn to_summary(&self) -> HuReservationSummary {
        HuReservationSummary {
            sales_order_line_id: self.sales_order_line_id,
            lines: self
                .lines()
                .map(|(vhu_id, qty)| ReservedHuLine {
                    vhu_id,
                    qty_reserved: qty.clone(),
                })
                .collect(),
            reserved_qty_sum: self.reserved_qty_sum.clone(),
        }
    }
}

/// What a caller wants reserved. Consumed by [`crate::service::HuReservationService::make_reservation`].
#[derive(Debug, Clone)]
pub struct HuReservationRequest {
    pub sales_order_line_id: OrderLineId,
    pub hu_ids: Vec<HuId>,
    pub product_id: ProductId,
    pub qty_to_reserve: Quantity,
}

impl HuReservationRequest {
    pub fn validate(&self) -> Result<()> {
        if self.hu_ids.is_empty() {
            return Err(ReservationError::InvalidRequest(format!(
                "the given request needs to have hu_ids; request={:?}",
                self
            )));
        }
        if !self.qty_to_reserve.is_positive() {
            return Err(ReservationError::InvalidRequest(format!(
                "qty_to_reserve must be positive, got {}",
                self.qty_to_reserve
            )));
        }
        Ok(())
    }
}

impl From<HuReservationData> for HuReservationRequest {
    fn from(data: HuReservationData) -> Self {
        Self {
            sales_order_line_id: data.sales_order_line_id,
            hu_ids: data.hu_ids,
            product_id: data.product_id,
            qty_to_reserve: Quantity::of(data.qty_to_reserve, data.uom),
        }
    }
}
