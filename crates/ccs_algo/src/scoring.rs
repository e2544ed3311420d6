//! ScoringEngine: raw site-scale attributes → attribute, function and season scores.
//!
//! Per map unit the engine
//! 1. evaluates the breeding trigger (shrub + grass cover > 0.3, missing = 0),
//! 2. scores each attribute on its curve (direct, precipitation-blended,
//!    meadow-gated or species-gated),
//! 3. aggregates function and season scores with the project weights,
//! 4. applies the override rules in `OVERRIDE_ORDER`.
//!
//! Scoring is a pure function of its inputs: re-running it on an unchanged
//! snapshot yields bit-identical scores.

use ccs_core::entities::{AttributeRow, CurveLookup, MapUnit};
use ccs_core::results::{SeasonScores, SiteScaleScore};
use ccs_core::{Attribute, JoinPolicy, Meadow, SageSpecies, Season, FRACTION_SUM_TOLERANCE};

use crate::curves::{CurveBook, COVER_SCALE, UNSCALED};
use crate::join::pair_up;
use crate::weights::{ResolvedWeights, ScoringWeights};
use crate::{CalcResult, ConfigurationError, InputError, Stage, UnitError};

/// Shrub + grass cover must exceed this for breeding habitat to count.
pub const BREEDING_TRIGGER: f64 = 0.3;

/// Score keys wired to attribute columns through the curve lookup.
pub const SCORE_KEYS: [&str; 11] = [
    "b_sage_cover",
    "b_shrub_cover",
    "b_forb_cover",
    "b_forb_rich",
    "s_forb_cover",
    "s_forb_rich",
    "s_grass_cover",
    "s_dist_sage",
    "w_sage_height",
    "w_sage_cover",
    "brotec_cover",
];

/// Curves the formulas read.
pub const REQUIRED_CURVES: [&str; 21] = [
    "b_sage_cover",
    "b_shrub_cover",
    "brotec_cover",
    "b_forb_cover_arid",
    "b_forb_cover_mesic",
    "b_forb_rich_arid",
    "b_forb_rich_mesic",
    "s_forb_cover_arid",
    "s_forb_cover_mesic",
    "s_forb_cover_meadow",
    "s_forb_rich_arid",
    "s_forb_rich_mesic",
    "s_grass_cover_arid",
    "s_grass_cover_mesic",
    "s_grass_cover_meadow",
    "s_dist_sage_altered",
    "s_dist_sage_unaltered",
    "w_sage_height_big",
    "w_sage_height_low",
    "w_sage_cover_big",
    "w_sage_cover_low",
];

// ----- Overrides -----

/// Post-formula season overrides, applied in `OVERRIDE_ORDER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverrideRule {
    /// Breeding score is 0 when the breeding trigger is false.
    TriggerZero,
    /// Indirect-benefit units take the season's HSI instead of the formula.
    HsiSubstitution,
    /// Phase III conifer zeroes every season; last, so it wins over HSI.
    ConiferPhaseZero,
}

pub const OVERRIDE_ORDER: [OverrideRule; 3] =
    [OverrideRule::TriggerZero, OverrideRule::HsiSubstitution, OverrideRule::ConiferPhaseZero];

/// What the override rules may look at.
#[derive(Clone, Copy, Debug)]
pub struct OverrideContext<'a> {
    pub b_trigger: bool,
    pub unit: &'a MapUnit,
    pub row: &'a AttributeRow,
}

impl OverrideRule {
    pub fn apply(self, season: Season, score: f64, ctx: &OverrideContext<'_>) -> Result<f64, InputError> {
        match self {
            OverrideRule::TriggerZero => {
                Ok(if season == Season::Breed && !ctx.b_trigger { 0.0 } else { score })
            }
            OverrideRule::HsiSubstitution => {
                // Phase III units are zeroed by the next rule; their HSI is never read.
                if !ctx.unit.indirect_benefits_area || ctx.unit.conifer_phase.is_phase_iii() {
                    return Ok(score);
                }
                match ctx.row.hsi(season) {
                    Some(h) if h.is_finite() => Ok(h),
                    Some(_) => Err(InputError::NonFinite("hsi")),
                    None => Err(InputError::MissingHsi(season)),
                }
            }
            OverrideRule::ConiferPhaseZero => {
                Ok(if ctx.unit.conifer_phase.is_phase_iii() { 0.0 } else { score })
            }
        }
    }
}

/// Fold a base season score through every rule in order.
pub fn apply_overrides(season: Season, base: f64, ctx: &OverrideContext<'_>) -> Result<f64, InputError> {
    OVERRIDE_ORDER.iter().try_fold(base, |s, rule| rule.apply(season, s, ctx))
}

// ----- Engine -----

/// Attribute column read by each score key.
#[derive(Clone, Copy, Debug)]
struct Wiring {
    b_sage_cover: Attribute,
    b_shrub_cover: Attribute,
    b_forb_cover: Attribute,
    b_forb_rich: Attribute,
    s_forb_cover: Attribute,
    s_forb_rich: Attribute,
    s_grass_cover: Attribute,
    s_dist_sage: Attribute,
    w_sage_height: Attribute,
    w_sage_cover: Attribute,
    brotec_cover: Attribute,
}

impl Wiring {
    fn from_lookup(lookup: &CurveLookup) -> Result<Self, ConfigurationError> {
        let get = |k: &str| lookup.attribute(k).ok_or_else(|| ConfigurationError::MissingLookup(k.to_owned()));
        Ok(Wiring {
            b_sage_cover: get("b_sage_cover")?,
            b_shrub_cover: get("b_shrub_cover")?,
            b_forb_cover: get("b_forb_cover")?,
            b_forb_rich: get("b_forb_rich")?,
            s_forb_cover: get("s_forb_cover")?,
            s_forb_rich: get("s_forb_rich")?,
            s_grass_cover: get("s_grass_cover")?,
            s_dist_sage: get("s_dist_sage")?,
            w_sage_height: get("w_sage_height")?,
            w_sage_cover: get("w_sage_cover")?,
            brotec_cover: get("brotec_cover")?,
        })
    }
}

/// Curves and weights bound once per project; scoring borrows them.
#[derive(Clone, Debug)]
pub struct ScoringEngine<'a> {
    curves: &'a CurveBook,
    wiring: Wiring,
    weights: ResolvedWeights,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(
        curves: &'a CurveBook,
        lookup: &CurveLookup,
        weights: &ScoringWeights,
    ) -> Result<Self, ConfigurationError> {
        curves.require(REQUIRED_CURVES)?;
        Ok(ScoringEngine { curves, wiring: Wiring::from_lookup(lookup)?, weights: weights.resolve()? })
    }

    /// Score a snapshot. Attribute rows are joined to static map units under `join`;
    /// the output is ordered by map unit id.
    pub fn score_site_scale(
        &self,
        map_units: &[MapUnit],
        rows: &[AttributeRow],
        join: JoinPolicy,
    ) -> CalcResult<Vec<SiteScaleScore>> {
        let pairs = pair_up(Stage::Scoring, join, "site_scale_values", rows, "map_units", map_units)?;
        let out = pairs
            .into_iter()
            .map(|(row, unit)| self.score_unit(unit, row).map_err(|e| e.at(Stage::Scoring, &row.map_unit_id)))
            .collect::<CalcResult<Vec<_>>>()?;
        tracing::debug!(units = out.len(), "scored site-scale snapshot");
        Ok(out)
    }

    /// Score one map unit.
    pub fn score_unit(&self, unit: &MapUnit, row: &AttributeRow) -> Result<SiteScaleScore, UnitError> {
        let w = &self.weights;
        let wr = &self.wiring;
        let c = self.curves;

        let b_trigger =
            row.shrub_cover.unwrap_or(0.0) + row.grass_cover.unwrap_or(0.0) > BREEDING_TRIGGER;
        let precip = if unit.meadow.is_meadow() { None } else { Some(precip_weights(row)?) };

        // Direct curves.
        let b_sage_cover = c.score("b_sage_cover", row.get(wr.b_sage_cover), COVER_SCALE)?;
        let b_shrub_cover = c.score("b_shrub_cover", row.get(wr.b_shrub_cover), COVER_SCALE)?;
        let brotec_cover = c.score("brotec_cover", row.get(wr.brotec_cover), COVER_SCALE)?;

        // Precipitation-blended curves.
        let blend = |meadow_curve: &str, stem: &str, value: Option<f64>, scale: f64| -> Result<f64, UnitError> {
            match precip {
                None => Ok(c.score(meadow_curve, value, scale)?),
                Some((arid, mesic)) => {
                    let a = c.score(&format!("{stem}_arid"), value, scale)?;
                    let m = c.score(&format!("{stem}_mesic"), value, scale)?;
                    Ok(a * arid + m * mesic)
                }
            }
        };
        let b_forb_cover = blend("b_forb_cover_mesic", "b_forb_cover", row.get(wr.b_forb_cover), COVER_SCALE)?;
        let b_forb_rich = blend("b_forb_rich_mesic", "b_forb_rich", row.get(wr.b_forb_rich), UNSCALED)?;
        let s_forb_cover = blend("s_forb_cover_meadow", "s_forb_cover", row.get(wr.s_forb_cover), COVER_SCALE)?;
        let s_forb_rich = blend("s_forb_rich_mesic", "s_forb_rich", row.get(wr.s_forb_rich), UNSCALED)?;
        let s_grass_cover =
            blend("s_grass_cover_meadow", "s_grass_cover", row.get(wr.s_grass_cover), COVER_SCALE)?;

        // Meadow-gated distance to sagebrush.
        let dist = row.get(wr.s_dist_sage);
        let s_dist_sage = match &unit.meadow {
            Meadow::NoMeadow => 1.0,
            Meadow::Altered => c.score("s_dist_sage_altered", dist, UNSCALED)?,
            Meadow::Unaltered => c.score("s_dist_sage_unaltered", dist, UNSCALED)?,
            Meadow::Other(_) => 0.0,
        };

        // Species-gated winter curves.
        let (w_sage_height, w_sage_cover) = match unit.sage_species {
            SageSpecies::Big => (
                c.score("w_sage_height_big", row.get(wr.w_sage_height), UNSCALED)?,
                c.score("w_sage_cover_big", row.get(wr.w_sage_cover), COVER_SCALE)?,
            ),
            SageSpecies::LowOrBlack => (
                c.score("w_sage_height_low", row.get(wr.w_sage_height), UNSCALED)?,
                c.score("w_sage_cover_low", row.get(wr.w_sage_cover), COVER_SCALE)?,
            ),
            SageSpecies::None => (0.0, 0.0),
        };

        // Functions.
        let trigger = if b_trigger { 1.0 } else { 0.0 };
        let b_cover = (b_sage_cover * w.breed_sage_cover + b_shrub_cover * w.breed_shrub_cover) * trigger
            / w.fw_breed_cover;
        let b_forage = (b_forb_cover * w.breed_forb_cover + b_forb_rich * w.breed_forb_rich) / w.fw_breed_forage;
        let s_forage =
            (s_forb_cover * w.summer_forb_cover + s_forb_rich * w.summer_forb_rich) / w.fw_summer_forage;
        let s_cover = s_grass_cover;

        // Seasons.
        let breed = (b_cover * w.fw_breed_cover + b_forage * w.fw_breed_forage) * brotec_cover;
        let summer = (s_forage * w.fw_summer_forage + s_cover * w.fw_summer_cover) * brotec_cover * s_dist_sage;
        let winter = w_sage_height * w.winter_sage_height + w_sage_cover * w.winter_sage_cover;

        let ctx = OverrideContext { b_trigger, unit, row };
        Ok(SiteScaleScore {
            map_unit_id: row.map_unit_id.clone(),
            b_trigger,
            b_sage_cover,
            b_shrub_cover,
            b_forb_cover,
            b_forb_rich,
            s_forb_cover,
            s_forb_rich,
            s_grass_cover,
            s_dist_sage,
            w_sage_height,
            w_sage_cover,
            brotec_cover,
            b_cover,
            b_forage,
            s_forage,
            s_cover,
            breed: apply_overrides(Season::Breed, breed, &ctx)?,
            summer: apply_overrides(Season::Summer, summer, &ctx)?,
            winter: apply_overrides(Season::Winter, winter, &ctx)?,
        })
    }
}

/// Arid/mesic weights of a non-meadow unit; both present and summing to 1.
fn precip_weights(row: &AttributeRow) -> Result<(f64, f64), InputError> {
    match (row.arid, row.mesic) {
        (Some(arid), Some(mesic)) => {
            if !arid.is_finite() || !mesic.is_finite() || (arid + mesic - 1.0).abs() > FRACTION_SUM_TOLERANCE {
                return Err(InputError::PrecipWeightsSum { arid, mesic });
            }
            Ok((arid, mesic))
        }
        _ => Err(InputError::MissingPrecipWeights),
    }
}

/// Season columns of a scored table.
pub fn season_scores(scores: &[SiteScaleScore]) -> Vec<SeasonScores> {
    scores.iter().map(SiteScaleScore::season_scores).collect()
}
