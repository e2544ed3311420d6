//! Scoring weights.
//!
//! A single weights source (rows of season, function, attribute, weight)
//! yields two lookup tables: attribute weights keyed by (season, attribute)
//! and function weights keyed by (season, function), where a function weight
//! is the sum of its attributes' weights.

use std::collections::BTreeMap;

use ccs_core::entities::ScoringWeightRow;
use ccs_core::Season;

use crate::ConfigurationError;

pub const FN_COVER: &str = "cover";
pub const FN_FORAGE: &str = "forage";

/// Sum attribute weights per (season, function). Deterministic (BTreeMap order).
pub fn aggregate_function_weights(rows: &[ScoringWeightRow]) -> BTreeMap<(Season, String), f64> {
    let mut out: BTreeMap<(Season, String), f64> = BTreeMap::new();
    for r in rows {
        *out.entry((r.season, r.hab_function.clone())).or_insert(0.0) += r.score_weight;
    }
    out
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoringWeights {
    attr: BTreeMap<(Season, String), f64>,
    func: BTreeMap<(Season, String), f64>,
}

impl ScoringWeights {
    pub fn from_rows(rows: &[ScoringWeightRow]) -> Result<Self, ConfigurationError> {
        let mut attr = BTreeMap::new();
        for r in rows {
            if !r.score_weight.is_finite() || r.score_weight < 0.0 {
                return Err(ConfigurationError::InvalidWeight {
                    season: r.season,
                    attribute: r.hab_attr.clone(),
                    value: r.score_weight,
                });
            }
            if attr.insert((r.season, r.hab_attr.clone()), r.score_weight).is_some() {
                return Err(ConfigurationError::DuplicateWeight {
                    season: r.season,
                    attribute: r.hab_attr.clone(),
                });
            }
        }
        Ok(ScoringWeights { attr, func: aggregate_function_weights(rows) })
    }

    pub fn attr(&self, season: Season, attribute: &str) -> Result<f64, ConfigurationError> {
        self.attr
            .get(&(season, attribute.to_owned()))
            .copied()
            .ok_or_else(|| ConfigurationError::MissingWeight { season, attribute: attribute.to_owned() })
    }

    pub fn function(&self, season: Season, function: &str) -> Result<f64, ConfigurationError> {
        self.func
            .get(&(season, function.to_owned()))
            .copied()
            .ok_or_else(|| ConfigurationError::MissingFunctionWeight { season, function: function.to_owned() })
    }

    /// A function weight that is used as a divisor; zero is a configuration error.
    pub fn divisor(&self, season: Season, function: &str) -> Result<f64, ConfigurationError> {
        let w = self.function(season, function)?;
        if w == 0.0 {
            return Err(ConfigurationError::ZeroFunctionWeight { season, function: function.to_owned() });
        }
        Ok(w)
    }

    /// Extract every weight the season formulas use.
    pub fn resolve(&self) -> Result<ResolvedWeights, ConfigurationError> {
        use Season::*;
        Ok(ResolvedWeights {
            breed_sage_cover: self.attr(Breed, "sage_cover")?,
            breed_shrub_cover: self.attr(Breed, "shrub_cover")?,
            breed_forb_cover: self.attr(Breed, "forb_cover")?,
            breed_forb_rich: self.attr(Breed, "forb_rich")?,
            summer_forb_cover: self.attr(Summer, "forb_cover")?,
            summer_forb_rich: self.attr(Summer, "forb_rich")?,
            winter_sage_height: self.attr(Winter, "sage_height")?,
            winter_sage_cover: self.attr(Winter, "sage_cover")?,
            fw_breed_cover: self.divisor(Breed, FN_COVER)?,
            fw_breed_forage: self.divisor(Breed, FN_FORAGE)?,
            fw_summer_forage: self.divisor(Summer, FN_FORAGE)?,
            fw_summer_cover: self.function(Summer, FN_COVER)?,
        })
    }
}

/// The weights consumed by the season formulas, resolved once per run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedWeights {
    pub breed_sage_cover: f64,
    pub breed_shrub_cover: f64,
    pub breed_forb_cover: f64,
    pub breed_forb_rich: f64,
    pub summer_forb_cover: f64,
    pub summer_forb_rich: f64,
    pub winter_sage_height: f64,
    pub winter_sage_cover: f64,
    pub fw_breed_cover: f64,
    pub fw_breed_forage: f64,
    pub fw_summer_forage: f64,
    pub fw_summer_cover: f64,
}
