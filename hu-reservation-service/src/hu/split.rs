use shared::{HuId, Quantity, QuantityError};

/// Stock of the requested product held by one candidate HU, in the target UOM.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStock {
    pub hu_id: HuId,
    pub parent_hu_id: Option<HuId>,
    pub qty: Quantity,
}

/// Take `qty` out of `source_hu_id` into a new CU; the source keeps `source_remaining`.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitStep {
    pub source_hu_id: HuId,
    pub source_parent_hu_id: Option<HuId>,
    pub qty: Quantity,
    pub source_remaining: Quantity,
}

impl SplitStep {
    pub fn drains_source(&self) -> bool {
        self.source_remaining.is_zero()
    }

    /// Parent of the CU created by this step.
    pub fn new_cu_parent(&self, keep_new_cus_under_same_parent: bool) -> Option<HuId> {
        if keep_new_cus_under_same_parent {
            self.source_parent_hu_id
        } else {
            None
        }
    }
}

/// Plans which sources give how much to cover `qty_cu`.
///
/// Sources are consumed greedily in the given order and sources without
/// positive stock are skipped. When the sources together hold less than
/// `qty_cu` the plan covers only what is there.
pub fn plan_split(sources: &[SourceStock], qty_cu: &Quantity) -> Result<Vec<SplitStep>, QuantityError> {
    let mut remaining = qty_cu.clone();
    let mut steps = Vec::new();

    for source in sources {
        if !remaining.is_positive() {
            break;
        }
        if !source.qty.is_positive() {
            continue;
        }

        let take = remaining.min(&source.qty)?;
        remaining = remaining.subtract(&take)?;
        steps.push(SplitStep {
            source_hu_id: source.hu_id,
            source_parent_hu_id: source.parent_hu_id,
            source_remaining: source.qty.subtract(&take)?,
            qty: take,
        });
    }

    Ok(steps)
}
