//! Explicit join policy for tables keyed by map unit.
//!
//! `Inner` drops map units missing from either side and logs each drop at
//! `warn`. `Strict` fails on the first unmatched map unit. Repeated map units
//! within one table are always an error.

use std::collections::{BTreeMap, BTreeSet};

use ccs_core::determinism::{index_unique, Keyed};
use ccs_core::{JoinPolicy, MapUnitId};

use crate::{CalcError, CalcResult, InputError, Stage};

/// Index a table by map unit, rejecting repeats.
pub fn index_table<'a, T: Keyed>(
    stage: Stage,
    table: &'static str,
    rows: &'a [T],
) -> CalcResult<BTreeMap<&'a MapUnitId, &'a T>> {
    index_unique(rows).map_err(|id| CalcError::input(stage, &id, InputError::DuplicateRow { table }))
}

/// Align two tables on map unit. Output is ordered by map unit id.
pub fn pair_up<'a, L: Keyed, R: Keyed>(
    stage: Stage,
    policy: JoinPolicy,
    left_table: &'static str,
    left: &'a [L],
    right_table: &'static str,
    right: &'a [R],
) -> CalcResult<Vec<(&'a L, &'a R)>> {
    let li = index_table(stage, left_table, left)?;
    let ri = index_table(stage, right_table, right)?;

    let keys: BTreeSet<&MapUnitId> = li.keys().chain(ri.keys()).copied().collect();
    let mut out = Vec::with_capacity(li.len().min(ri.len()));
    for id in keys {
        match (li.get(id), ri.get(id)) {
            (Some(l), Some(r)) => out.push((*l, *r)),
            (Some(_), None) => unmatched(stage, policy, id, right_table)?,
            (None, Some(_)) => unmatched(stage, policy, id, left_table)?,
            (None, None) => {}
        }
    }
    Ok(out)
}

/// Look up one map unit in an indexed table under the join policy.
pub fn lookup<'a, T>(
    stage: Stage,
    policy: JoinPolicy,
    table: &'static str,
    index: &BTreeMap<&MapUnitId, &'a T>,
    id: &MapUnitId,
) -> CalcResult<Option<&'a T>> {
    match index.get(id) {
        Some(r) => Ok(Some(*r)),
        None => unmatched(stage, policy, id, table).map(|_| None),
    }
}

fn unmatched(stage: Stage, policy: JoinPolicy, id: &MapUnitId, missing_from: &'static str) -> CalcResult<()> {
    match policy {
        JoinPolicy::Inner => {
            tracing::warn!(stage = %stage, map_unit = %id, table = missing_from, "dropping map unit missing from table");
            Ok(())
        }
        JoinPolicy::Strict => Err(CalcError::Join { stage, map_unit: id.clone(), missing_from }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccs_core::entities::{LocalScaleRow, ReserveAccountRow};

    fn ls(id: &str) -> LocalScaleRow {
        LocalScaleRow { map_unit_id: id.parse().unwrap(), ls_breed: 1.0, ls_summer: 1.0, ls_winter: 1.0 }
    }
    fn rs(id: &str) -> ReserveAccountRow {
        ReserveAccountRow { map_unit_id: id.parse().unwrap(), total_contribution: 0.1 }
    }

    #[test]
    fn inner_drops_unmatched_and_orders_by_id() {
        let left = vec![ls("b"), ls("a"), ls("c")];
        let right = vec![rs("c"), rs("a"), rs("z")];
        let joined = pair_up(Stage::Credits, JoinPolicy::Inner, "l", &left, "r", &right).unwrap();
        let ids: Vec<&str> = joined.iter().map(|(l, _)| l.map_unit_id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn strict_names_unit_and_table() {
        let left = vec![ls("a"), ls("b")];
        let right = vec![rs("a")];
        let err = pair_up(Stage::Credits, JoinPolicy::Strict, "left", &left, "reserve_account", &right)
            .unwrap_err();
        assert_eq!(
            err,
            CalcError::Join { stage: Stage::Credits, map_unit: "b".parse().unwrap(), missing_from: "reserve_account" }
        );
    }

    #[test]
    fn repeated_rows_are_rejected() {
        let left = vec![ls("a"), ls("a")];
        let right = vec![rs("a")];
        let err = pair_up(Stage::FunctionalAcres, JoinPolicy::Inner, "ls", &left, "r", &right).unwrap_err();
        assert!(matches!(err, CalcError::Input { source: InputError::DuplicateRow { table: "ls" }, .. }));
    }
}
