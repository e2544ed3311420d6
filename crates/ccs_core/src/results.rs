//! crates/ccs_core/src/results.rs
//! Derived tables produced by the engine. Field order is the output column
//! order; downstream consumers rely on it.

#[cfg(feature = "serde")]
use serde::{ser::SerializeMap, ser::SerializeSeq, Deserialize, Serialize, Serializer};

use crate::domain::{Attribute, HabitatType, Meadow};
use crate::ids::MapUnitId;

/// Season scores of one map unit (current, baseline-corrected or projected).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeasonScores {
    pub map_unit_id: MapUnitId,
    pub breed: f64,
    pub summer: f64,
    pub winter: f64,
}

/// Per-attribute, per-function and per-season scores of one map unit.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiteScaleScore {
    pub map_unit_id: MapUnitId,
    pub b_trigger: bool,
    pub b_sage_cover: f64,
    pub b_shrub_cover: f64,
    pub b_forb_cover: f64,
    pub b_forb_rich: f64,
    pub s_forb_cover: f64,
    pub s_forb_rich: f64,
    pub s_grass_cover: f64,
    pub s_dist_sage: f64,
    pub w_sage_height: f64,
    pub w_sage_cover: f64,
    pub brotec_cover: f64,
    pub b_cover: f64,
    pub b_forage: f64,
    pub s_forage: f64,
    pub s_cover: f64,
    pub breed: f64,
    pub summer: f64,
    pub winter: f64,
}

impl SiteScaleScore {
    pub fn season_scores(&self) -> SeasonScores {
        SeasonScores {
            map_unit_id: self.map_unit_id.clone(),
            breed: self.breed,
            summer: self.summer,
            winter: self.winter,
        }
    }
}

/// Functional-acre report row.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FacreRow {
    pub map_unit_id: MapUnitId,
    pub map_unit_name: String,
    pub meadow: Meadow,
    pub map_unit_area: f64,
    pub breed: f64,
    pub ls_breed: f64,
    pub breed_overall: f64,
    pub breed_facres: f64,
    pub summer: f64,
    pub ls_summer: f64,
    pub summer_overall: f64,
    pub summer_facres: f64,
    pub winter: f64,
    pub ls_winter: f64,
    pub winter_overall: f64,
    pub winter_facres: f64,
}

/// Credit report row comparing a "pre" and a "post" functional-acre state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CreditRow {
    pub map_unit_id: MapUnitId,
    pub map_unit_name: String,
    pub meadow: Meadow,
    pub map_unit_area: f64,
    pub breed_facres_pre: f64,
    pub summer_facres_pre: f64,
    pub winter_facres_pre: f64,
    pub breed_facres_post: f64,
    pub summer_facres_post: f64,
    pub winter_facres_post: f64,
    pub breed_delta: f64,
    pub summer_delta: f64,
    pub winter_delta: f64,
    pub mgmt_multiplier: f64,
    pub meadow_multiplier: f64,
    pub breed_credits: f64,
    pub summer_credits: f64,
    pub winter_credits: f64,
    pub habitat_type: HabitatType,
    pub credits: f64,
    pub total_contribution: f64,
    pub reserve_credits: f64,
    pub saleable_credits: f64,
}

/// Projected duplicates for one (map unit, attribute) that did not agree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DivergentDuplicate {
    pub map_unit_id: MapUnitId,
    pub attribute: Attribute,
    pub values: Vec<f64>,
    pub mean: f64,
}

/// Wide scenario table: fixed identity columns then one saleable-credit
/// column per entry of `columns`. Missing cells are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioReport {
    pub columns: Vec<String>,
    pub rows: Vec<ScenarioRow>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioRow {
    pub map_unit_id: MapUnitId,
    pub map_unit_name: Option<String>,
    pub meadow: Option<Meadow>,
    pub map_unit_area: Option<f64>,
    pub values: Vec<Option<f64>>,
}

impl ScenarioReport {
    /// Index of a scenario column.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by map unit and column name.
    pub fn value(&self, map_unit_id: &MapUnitId, column: &str) -> Option<f64> {
        let idx = self.column(column)?;
        self.rows
            .iter()
            .find(|r| &r.map_unit_id == map_unit_id)
            .and_then(|r| r.values.get(idx).copied().flatten())
    }
}

#[cfg(feature = "serde")]
impl Serialize for ScenarioReport {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        struct RowView<'a>(&'a [String], &'a ScenarioRow);

        impl Serialize for RowView<'_> {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                let (cols, row) = (self.0, self.1);
                let mut m = s.serialize_map(Some(4 + cols.len()))?;
                m.serialize_entry("map_unit_id", &row.map_unit_id)?;
                m.serialize_entry("map_unit_name", &row.map_unit_name)?;
                m.serialize_entry("meadow", &row.meadow)?;
                m.serialize_entry("map_unit_area", &row.map_unit_area)?;
                for (c, v) in cols.iter().zip(row.values.iter()) {
                    m.serialize_entry(c, v)?;
                }
                m.end()
            }
        }

        let mut seq = s.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowView(&self.columns, row))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_lookup_by_column() {
        let id: MapUnitId = "7".parse().unwrap();
        let rep = ScenarioReport {
            columns: vec!["brotec_low".into(), "conifer".into()],
            rows: vec![ScenarioRow {
                map_unit_id: id.clone(),
                map_unit_name: Some("A".into()),
                meadow: Some(Meadow::NoMeadow),
                map_unit_area: Some(1.0),
                values: vec![Some(2.5), None],
            }],
        };
        assert_eq!(rep.value(&id, "brotec_low"), Some(2.5));
        assert_eq!(rep.value(&id, "conifer"), None);
        assert_eq!(rep.value(&id, "shrub_low"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn scenario_rows_serialize_in_column_order() {
        let rep = ScenarioReport {
            columns: vec!["z_first".into(), "a_second".into()],
            rows: vec![ScenarioRow {
                map_unit_id: "1".parse().unwrap(),
                map_unit_name: None,
                meadow: None,
                map_unit_area: None,
                values: vec![Some(1.0), None],
            }],
        };
        let s = serde_json::to_string(&rep).unwrap();
        assert_eq!(
            s,
            r#"[{"map_unit_id":"1","map_unit_name":null,"meadow":null,"map_unit_area":null,"z_first":1.0,"a_second":null}]"#
        );
    }
}
