//! CreditCalculator: compare a "pre" and a "post" functional-acre report.

use ccs_core::entities::{CreditPolicy, MapUnit, ReserveAccountRow};
use ccs_core::results::{CreditRow, FacreRow};
use ccs_core::{HabitatType, JoinPolicy, MgmtCategory, Season};

use crate::join::{index_table, lookup, pair_up};
use crate::{CalcError, CalcResult, ConfigurationError, Stage};

/// Σ over management categories of (area fraction × policy multiplier).
pub fn mgmt_multiplier(unit: &MapUnit, policy: &CreditPolicy) -> Result<f64, ConfigurationError> {
    MgmtCategory::ALL.iter().try_fold(0.0, |acc, &cat| -> Result<f64, ConfigurationError> {
        let m = policy
            .mgmt_multipliers
            .get(&cat)
            .copied()
            .ok_or(ConfigurationError::MissingMultiplier(cat))?;
        Ok(acc + unit.mgmt_fraction(cat) * m)
    })
}

/// The policy meadow constant, or 0 for "No Meadow" units.
#[inline]
pub fn meadow_multiplier(unit: &MapUnit, policy: &CreditPolicy) -> f64 {
    if unit.meadow.is_meadow() {
        policy.meadow_multiplier
    } else {
        0.0
    }
}

/// First maximal season in breed → summer → winter order, and its value.
/// Zero credits classify as `HabitatType::None`.
pub fn classify_habitat(breed: f64, summer: f64, winter: f64) -> (HabitatType, f64) {
    let mut best = (Season::Breed, breed);
    for (season, v) in [(Season::Summer, summer), (Season::Winter, winter)] {
        if v > best.1 {
            best = (season, v);
        }
    }
    let (season, credits) = best;
    if credits == 0.0 {
        (HabitatType::None, credits)
    } else {
        (season.habitat_type(), credits)
    }
}

/// Derive the credit report from two functional-acre snapshots of the same
/// map units. Output is ordered by map unit.
pub fn calc_credits(
    pre: &[FacreRow],
    post: &[FacreRow],
    map_units: &[MapUnit],
    reserve: &[ReserveAccountRow],
    policy: &CreditPolicy,
    join: JoinPolicy,
) -> CalcResult<Vec<CreditRow>> {
    let stage = Stage::Credits;
    let pairs = pair_up(stage, join, "pre_facres", pre, "post_facres", post)?;
    let units = index_table(stage, "map_units", map_units)?;
    let reserves = index_table(stage, "reserve_account", reserve)?;

    let mut out = Vec::with_capacity(pairs.len());
    for (pre, post) in pairs {
        let id = &pre.map_unit_id;
        let Some(unit) = lookup(stage, join, "map_units", &units, id)? else { continue };
        let Some(res) = lookup(stage, join, "reserve_account", &reserves, id)? else { continue };

        let mgmt = mgmt_multiplier(unit, policy).map_err(|e| CalcError::config(stage, e))?;
        let meadow = meadow_multiplier(unit, policy);

        let breed_delta = post.breed_facres - pre.breed_facres;
        let summer_delta = post.summer_facres - pre.summer_facres;
        let winter_delta = post.winter_facres - pre.winter_facres;
        let breed_credits = breed_delta * mgmt;
        let summer_credits = summer_delta * (mgmt + meadow);
        let winter_credits = winter_delta * mgmt;

        let (habitat_type, credits) = classify_habitat(breed_credits, summer_credits, winter_credits);
        let reserve_credits = credits * res.total_contribution;

        out.push(CreditRow {
            map_unit_id: id.clone(),
            map_unit_name: unit.map_unit_name.clone(),
            meadow: unit.meadow.clone(),
            map_unit_area: unit.map_unit_area,
            breed_facres_pre: pre.breed_facres,
            summer_facres_pre: pre.summer_facres,
            winter_facres_pre: pre.winter_facres,
            breed_facres_post: post.breed_facres,
            summer_facres_post: post.summer_facres,
            winter_facres_post: post.winter_facres,
            breed_delta,
            summer_delta,
            winter_delta,
            mgmt_multiplier: mgmt,
            meadow_multiplier: meadow,
            breed_credits,
            summer_credits,
            winter_credits,
            habitat_type,
            credits,
            total_contribution: res.total_contribution,
            reserve_credits,
            saleable_credits: credits - reserve_credits,
        });
    }
    tracing::debug!(units = out.len(), "derived credits");
    Ok(out)
}
