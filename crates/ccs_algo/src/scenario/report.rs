//! Wide scenario report: one saleable-credit column per branch, outer-joined
//! on map unit.

use std::collections::BTreeMap;

use ccs_core::entities::MapUnit;
use ccs_core::results::{ScenarioReport, ScenarioRow};
use ccs_core::MapUnitId;

use super::projection::ScenarioCredits;

/// Outer-join branch credits into one table. Columns follow `branches` order;
/// rows are ordered by map unit. Identity columns come from the map units.
pub fn run_scenario_report(map_units: &[MapUnit], branches: &[ScenarioCredits]) -> ScenarioReport {
    let columns: Vec<String> = branches.iter().map(|b| b.key.clone()).collect();

    let mut cells: BTreeMap<&MapUnitId, Vec<Option<f64>>> = BTreeMap::new();
    for (col, branch) in branches.iter().enumerate() {
        for row in &branch.credits {
            let slot = cells.entry(&row.map_unit_id).or_insert_with(|| vec![None; columns.len()]);
            slot[col] = Some(row.saleable_credits);
        }
    }

    let units: BTreeMap<&MapUnitId, &MapUnit> = map_units.iter().map(|u| (&u.map_unit_id, u)).collect();
    let rows = cells
        .into_iter()
        .map(|(id, values)| {
            let unit = units.get(id);
            ScenarioRow {
                map_unit_id: id.clone(),
                map_unit_name: unit.map(|u| u.map_unit_name.clone()),
                meadow: unit.map(|u| u.meadow.clone()),
                map_unit_area: unit.map(|u| u.map_unit_area),
                values,
            }
        })
        .collect();

    ScenarioReport { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tests::{id, unit};
    use ccs_core::results::CreditRow;
    use ccs_core::{HabitatType, Meadow};

    fn credit(s: &str, saleable: f64) -> CreditRow {
        CreditRow {
            map_unit_id: id(s),
            map_unit_name: String::new(),
            meadow: Meadow::NoMeadow,
            map_unit_area: 0.0,
            breed_facres_pre: 0.0,
            summer_facres_pre: 0.0,
            winter_facres_pre: 0.0,
            breed_facres_post: 0.0,
            summer_facres_post: 0.0,
            winter_facres_post: 0.0,
            breed_delta: 0.0,
            summer_delta: 0.0,
            winter_delta: 0.0,
            mgmt_multiplier: 1.0,
            meadow_multiplier: 0.0,
            breed_credits: saleable,
            summer_credits: 0.0,
            winter_credits: 0.0,
            habitat_type: HabitatType::Breeding,
            credits: saleable,
            total_contribution: 0.0,
            reserve_credits: 0.0,
            saleable_credits: saleable,
        }
    }

    #[test]
    fn outer_join_keeps_every_unit_with_gaps() {
        let branches = vec![
            ScenarioCredits { key: "brotec_low".into(), credits: vec![credit("2", 5.0), credit("1", 3.0)] },
            ScenarioCredits { key: "conifer".into(), credits: vec![credit("3", 1.0)] },
        ];
        let report = run_scenario_report(&[unit("1"), unit("2")], &branches);
        assert_eq!(report.columns, ["brotec_low", "conifer"]);
        let ids: Vec<&str> = report.rows.iter().map(|r| r.map_unit_id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(report.value(&id("2"), "brotec_low"), Some(5.0));
        assert_eq!(report.value(&id("2"), "conifer"), None);
        assert_eq!(report.rows[0].map_unit_name.as_deref(), Some("unit 1"));
        // unit 3 has no static attributes
        assert_eq!(report.rows[2].map_unit_area, None);
    }
}
