//! Determinism utilities: stable ordering and keyed indexing by map unit.
//!
//! This module is **I/O-free**. Every table the engine emits is ordered by
//! ascending `MapUnitId` (lexicographic), independent of input row order.

use std::collections::BTreeMap;

use crate::entities::{
    AttributeRow, LocalScaleRow, MapUnit, ProjectedValue, ReserveAccountRow, StandardBaselineRow,
};
use crate::ids::MapUnitId;
use crate::results::{CreditRow, FacreRow, SeasonScores, SiteScaleScore};

/// Rows keyed by a map unit.
pub trait Keyed {
    fn map_unit_id(&self) -> &MapUnitId;
}

macro_rules! impl_keyed {
    ($($t:ty),+ $(,)?) => {
        $(impl Keyed for $t {
            #[inline]
            fn map_unit_id(&self) -> &MapUnitId { &self.map_unit_id }
        })+
    };
}

impl_keyed!(
    MapUnit,
    AttributeRow,
    LocalScaleRow,
    StandardBaselineRow,
    ReserveAccountRow,
    ProjectedValue,
    SeasonScores,
    SiteScaleScore,
    FacreRow,
    CreditRow,
);

impl<T: Keyed + ?Sized> Keyed for &T {
    #[inline]
    fn map_unit_id(&self) -> &MapUnitId {
        (**self).map_unit_id()
    }
}

/// Joined rows keep the key of their left side.
impl<A: Keyed, B> Keyed for (A, B) {
    #[inline]
    fn map_unit_id(&self) -> &MapUnitId {
        self.0.map_unit_id()
    }
}

/// Sort rows **in place** by ascending map unit id.
#[inline]
pub fn sort_by_map_unit<T: Keyed>(xs: &mut [T]) {
    xs.sort_by(|a, b| a.map_unit_id().cmp(b.map_unit_id()));
}

/// Index rows by map unit; `Err` carries the first repeated id.
pub fn index_unique<T: Keyed>(rows: &[T]) -> Result<BTreeMap<&MapUnitId, &T>, MapUnitId> {
    let mut out = BTreeMap::new();
    for r in rows {
        if out.insert(r.map_unit_id(), r).is_some() {
            return Err(r.map_unit_id().clone());
        }
    }
    Ok(out)
}
