//! crates/ccs_core/src/entities.rs
//! Input rows handed to the engine. All rows are immutable snapshots; the
//! engine never mutates them and every derived table is freshly allocated.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::domain::{Attribute, ConiferPhase, Meadow, MgmtCategory, SageSpecies, Season};
use crate::ids::MapUnitId;

/// Static (desktop) attributes of a map unit.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct MapUnit {
    pub map_unit_id: MapUnitId,
    pub map_unit_name: String,
    /// Acres.
    pub map_unit_area: f64,
    pub meadow: Meadow,
    #[cfg_attr(feature = "serde", serde(default))]
    pub conifer_phase: ConiferPhase,
    #[cfg_attr(feature = "serde", serde(default))]
    pub indirect_benefits_area: bool,
    pub phma: f64,
    pub ghma: f64,
    pub ohma: f64,
    pub sage_species: SageSpecies,
}

impl MapUnit {
    /// Area fraction falling in a management category.
    #[inline]
    pub fn mgmt_fraction(&self, cat: MgmtCategory) -> f64 {
        match cat {
            MgmtCategory::Phma => self.phma,
            MgmtCategory::Ghma => self.ghma,
            MgmtCategory::Ohma => self.ohma,
        }
    }
}

/// One row of a site-scale attribute snapshot (current, projected or a
/// scenario effort). Missing measurements are `None`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct AttributeRow {
    pub map_unit_id: MapUnitId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sage_cover: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub sage_height: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub shrub_cover: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub forb_cover: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub forb_rich: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub grass_cover: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub brotec_cover: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub dist_sage: Option<f64>,
    /// Precipitation-zone weights; required (and summing to 1) for non-meadow units.
    #[cfg_attr(feature = "serde", serde(default))]
    pub arid: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mesic: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spring_hsi: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub summer_hsi: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub winter_hsi: Option<f64>,
}

impl AttributeRow {
    pub fn new(map_unit_id: MapUnitId) -> Self {
        AttributeRow {
            map_unit_id,
            sage_cover: None,
            sage_height: None,
            shrub_cover: None,
            forb_cover: None,
            forb_rich: None,
            grass_cover: None,
            brotec_cover: None,
            dist_sage: None,
            arid: None,
            mesic: None,
            spring_hsi: None,
            summer_hsi: None,
            winter_hsi: None,
        }
    }

    #[inline]
    pub fn get(&self, attr: Attribute) -> Option<f64> {
        match attr {
            Attribute::SageCover => self.sage_cover,
            Attribute::SageHeight => self.sage_height,
            Attribute::ShrubCover => self.shrub_cover,
            Attribute::ForbCover => self.forb_cover,
            Attribute::ForbRich => self.forb_rich,
            Attribute::GrassCover => self.grass_cover,
            Attribute::BrotecCover => self.brotec_cover,
            Attribute::DistSage => self.dist_sage,
        }
    }

    /// Copy of this row with one attribute replaced.
    pub fn with(&self, attr: Attribute, value: Option<f64>) -> Self {
        let mut out = self.clone();
        let slot = match attr {
            Attribute::SageCover => &mut out.sage_cover,
            Attribute::SageHeight => &mut out.sage_height,
            Attribute::ShrubCover => &mut out.shrub_cover,
            Attribute::ForbCover => &mut out.forb_cover,
            Attribute::ForbRich => &mut out.forb_rich,
            Attribute::GrassCover => &mut out.grass_cover,
            Attribute::BrotecCover => &mut out.brotec_cover,
            Attribute::DistSage => &mut out.dist_sage,
        };
        *slot = value;
        out
    }

    /// Habitat-suitability override for a season.
    #[inline]
    pub fn hsi(&self, season: Season) -> Option<f64> {
        match season {
            Season::Breed => self.spring_hsi,
            Season::Summer => self.summer_hsi,
            Season::Winter => self.winter_hsi,
        }
    }
}

/// Named scoring curves: curve name → scores for percent buckets 0..=100.
/// Shape (exactly 101 finite, non-negative entries) is checked when the
/// engine builds its curve book.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ScoringCurves(pub BTreeMap<String, Vec<f64>>);

/// Score key → attribute column the score reads.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CurveLookup(pub BTreeMap<String, Attribute>);

impl Default for CurveLookup {
    fn default() -> Self {
        let pairs = [
            ("b_sage_cover", Attribute::SageCover),
            ("b_shrub_cover", Attribute::ShrubCover),
            ("b_forb_cover", Attribute::ForbCover),
            ("b_forb_rich", Attribute::ForbRich),
            ("s_forb_cover", Attribute::ForbCover),
            ("s_forb_rich", Attribute::ForbRich),
            ("s_grass_cover", Attribute::GrassCover),
            ("s_dist_sage", Attribute::DistSage),
            ("w_sage_height", Attribute::SageHeight),
            ("w_sage_cover", Attribute::SageCover),
            ("brotec_cover", Attribute::BrotecCover),
        ];
        CurveLookup(pairs.into_iter().map(|(k, a)| (k.to_owned(), a)).collect())
    }
}

impl CurveLookup {
    #[inline]
    pub fn attribute(&self, score: &str) -> Option<Attribute> {
        self.0.get(score).copied()
    }
}

/// One scoring weight: attribute `hab_attr` contributes `score_weight` to
/// function `hab_function` in `season`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ScoringWeightRow {
    pub season: Season,
    pub hab_function: String,
    pub hab_attr: String,
    pub score_weight: f64,
}

/// Local-scale condition multipliers in [0,1], one per season.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct LocalScaleRow {
    pub map_unit_id: MapUnitId,
    pub ls_breed: f64,
    pub ls_summer: f64,
    pub ls_winter: f64,
}

impl LocalScaleRow {
    #[inline]
    pub fn get(&self, season: Season) -> f64 {
        match season {
            Season::Breed => self.ls_breed,
            Season::Summer => self.ls_summer,
            Season::Winter => self.ls_winter,
        }
    }
}

/// Regional default score for one (map unit, season).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct StandardBaselineRow {
    pub map_unit_id: MapUnitId,
    pub season: Season,
    pub value: f64,
}

/// Reserve-account contribution fraction in [0,1].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ReserveAccountRow {
    pub map_unit_id: MapUnitId,
    pub total_contribution: f64,
}

/// Policy multipliers: one per management category plus the meadow constant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct CreditPolicy {
    pub meadow_multiplier: f64,
    pub mgmt_multipliers: BTreeMap<MgmtCategory, f64>,
}

/// Tidy projected attribute override: (map unit, attribute column, value).
/// `hab_attr` may carry a season prefix (`b_forb_cover`); it is matched by suffix.
/// A `null` value keeps the map unit in the projection without overriding
/// the attribute.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ProjectedValue {
    pub map_unit_id: MapUnitId,
    pub hab_attr: String,
    pub attr_value: Option<f64>,
}

/// Everything a project hands the engine, already loaded and validated.
#[derive(Clone, Debug, Default)]
pub struct ProjectInputs {
    pub map_units: Vec<MapUnit>,
    pub site_scale_values: Vec<AttributeRow>,
    pub curves: ScoringCurves,
    pub curve_lookup: CurveLookup,
    pub scoring_weights: Vec<ScoringWeightRow>,
    pub current_ls: Vec<LocalScaleRow>,
    pub projected_ls: Vec<LocalScaleRow>,
    pub standard_baseline: Vec<StandardBaselineRow>,
    pub reserve_account: Vec<ReserveAccountRow>,
    pub credit_policy: CreditPolicy,
    /// Stored projected-values table (used unless an override is supplied).
    pub projected_values: Vec<ProjectedValue>,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        CreditPolicy { meadow_multiplier: 0.0, mgmt_multipliers: BTreeMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> MapUnitId {
        s.parse().unwrap()
    }

    #[test]
    fn with_replaces_one_column_only() {
        let mut row = AttributeRow::new(id("1"));
        row.sage_cover = Some(0.2);
        row.forb_rich = Some(4.0);
        let next = row.with(Attribute::SageCover, Some(0.3));
        assert_eq!(next.sage_cover, Some(0.3));
        assert_eq!(next.forb_rich, Some(4.0));
        assert_eq!(row.sage_cover, Some(0.2));
    }

    #[test]
    fn default_lookup_wires_every_score() {
        let lk = CurveLookup::default();
        assert_eq!(lk.attribute("w_sage_cover"), Some(Attribute::SageCover));
        assert_eq!(lk.attribute("s_dist_sage"), Some(Attribute::DistSage));
        assert_eq!(lk.0.len(), 11);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn map_unit_defaults_optional_flags() {
        let mu: MapUnit = serde_json::from_str(
            r#"{"map_unit_id":1,"map_unit_name":"North","map_unit_area":10.0,
                "meadow":"No Meadow","phma":1.0,"ghma":0.0,"ohma":0.0,
                "sage_species":"Big Sagebrush"}"#,
        )
        .unwrap();
        assert_eq!(mu.conifer_phase, ConiferPhase::None);
        assert!(!mu.indirect_benefits_area);
    }
}
