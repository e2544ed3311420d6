//! Projection: substitute tidy projected values into a snapshot, then score
//! projected branches against the current functional acres.

use std::collections::BTreeMap;

use ccs_core::entities::{AttributeRow, CreditPolicy, LocalScaleRow, MapUnit, ProjectedValue, ReserveAccountRow};
use ccs_core::results::{CreditRow, DivergentDuplicate, FacreRow, SeasonScores};
use ccs_core::{Attribute, CalcOptions, DuplicatePolicy, JoinPolicy, MapUnitId};

use super::improvement::ScenarioRun;
use crate::credits::calc_credits;
use crate::facres::calc_facres;
use crate::join::index_table;
use crate::scoring::{season_scores, ScoringEngine};
use crate::{CalcError, CalcResult, InputError, Stage};

/// Duplicates further apart than this are reported as divergent.
pub const DUPLICATE_SPREAD: f64 = 1e-9;

/// A projected snapshot plus the divergent duplicates that were averaged into it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection {
    pub rows: Vec<AttributeRow>,
    pub divergent: Vec<DivergentDuplicate>,
}

/// Substitute projected values into `snapshot`.
///
/// Attribute names are matched by suffix against the projectable attributes;
/// season-specific duplicates for one (map unit, attribute) are averaged.
/// Attributes without a projected value keep their snapshot value. Snapshot
/// units with no projected row are handled by the join policy.
pub fn project_attributes(
    snapshot: &[AttributeRow],
    projected: &[ProjectedValue],
    options: &CalcOptions,
) -> CalcResult<Projection> {
    let stage = Stage::Scenario;
    let base = index_table(stage, "site_scale_values", snapshot)?;

    let mut groups: BTreeMap<&MapUnitId, BTreeMap<Attribute, Vec<f64>>> = BTreeMap::new();
    for pv in projected {
        let Some(attr) = Attribute::projectable_suffix_of(&pv.hab_attr) else {
            tracing::debug!(map_unit = %pv.map_unit_id, attribute = %pv.hab_attr, "ignoring unknown projected attribute");
            continue;
        };
        if !base.contains_key(&pv.map_unit_id) {
            tracing::debug!(map_unit = %pv.map_unit_id, "ignoring projected value for unknown map unit");
            continue;
        }
        let values = groups.entry(&pv.map_unit_id).or_default().entry(attr).or_default();
        if let Some(v) = pv.attr_value {
            if !v.is_finite() {
                return Err(CalcError::input(stage, &pv.map_unit_id, InputError::NonFinite("attr_value")));
            }
            values.push(v);
        }
    }

    let mut out = Projection::default();
    for (id, row) in &base {
        let Some(attrs) = groups.get(id) else {
            match options.join_policy {
                JoinPolicy::Inner => {
                    tracing::warn!(stage = %stage, map_unit = %id, table = "projected_values", "dropping map unit missing from table");
                    continue;
                }
                JoinPolicy::Strict => {
                    return Err(CalcError::Join { stage, map_unit: (*id).clone(), missing_from: "projected_values" });
                }
            }
        };

        let mut projected_row = (*row).clone();
        for (&attr, values) in attrs {
            let Some(mean) = mean_of(values) else { continue };
            if spread(values) > DUPLICATE_SPREAD {
                if options.duplicate_policy == DuplicatePolicy::Reject {
                    return Err(CalcError::input(
                        stage,
                        id,
                        InputError::DivergentDuplicate { attribute: attr, values: values.clone() },
                    ));
                }
                tracing::warn!(map_unit = %id, attribute = %attr, ?values, mean, "averaging divergent projected duplicates");
                out.divergent.push(DivergentDuplicate {
                    map_unit_id: (*id).clone(),
                    attribute: attr,
                    values: values.clone(),
                    mean,
                });
            }
            projected_row = projected_row.with(attr, Some(mean));
        }
        out.rows.push(projected_row);
    }
    Ok(out)
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn spread(values: &[f64]) -> f64 {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    hi - lo
}

/// Read-only inputs shared by every scenario branch.
#[derive(Clone, Copy, Debug)]
pub struct ScenarioContext<'a> {
    pub engine: &'a ScoringEngine<'a>,
    pub map_units: &'a [MapUnit],
    pub snapshot: &'a [AttributeRow],
    pub projected_ls: &'a [LocalScaleRow],
    pub reserve_account: &'a [ReserveAccountRow],
    pub credit_policy: &'a CreditPolicy,
    pub options: CalcOptions,
}

/// Credits of one scenario branch (or the conifer comparison), keyed by
/// report column name.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioCredits {
    pub key: String,
    pub credits: Vec<CreditRow>,
}

impl<'a> ScenarioContext<'a> {
    /// Project, score and credit one branch against the current facres.
    pub fn branch_credits(&self, run: &ScenarioRun, current_facres: &[FacreRow]) -> CalcResult<ScenarioCredits> {
        let key = run.key();
        let wrap = |e: CalcError| CalcError::Scenario { scenario: key.clone(), source: Box::new(e) };
        let join = self.options.join_policy;

        let projection = project_attributes(self.snapshot, &run.values, &self.options).map_err(wrap)?;
        let scores = self.engine.score_site_scale(self.map_units, &projection.rows, join).map_err(wrap)?;
        let facres =
            calc_facres(&season_scores(&scores), self.map_units, self.projected_ls, join).map_err(wrap)?;
        let credits = calc_credits(
            current_facres,
            &facres,
            self.map_units,
            self.reserve_account,
            self.credit_policy,
            join,
        )
        .map_err(wrap)?;
        tracing::debug!(scenario = %key, units = credits.len(), "scenario branch credited");
        Ok(ScenarioCredits { key, credits })
    }
}

/// Credit every branch. Pre is always the current functional-acre report.
pub fn calc_scenario_credits(
    ctx: &ScenarioContext<'_>,
    runs: &[ScenarioRun],
    current_facres: &[FacreRow],
) -> CalcResult<Vec<ScenarioCredits>> {
    runs.iter().map(|run| ctx.branch_credits(run, current_facres)).collect()
}

/// Uplift from local-scale management alone: current scores under projected
/// local-scale factors, compared to current facres.
pub fn calc_conifer_credits(
    ctx: &ScenarioContext<'_>,
    current_scores: &[SeasonScores],
    current_facres: &[FacreRow],
) -> CalcResult<ScenarioCredits> {
    let key = CONIFER_KEY.to_owned();
    let wrap = |e: CalcError| CalcError::Scenario { scenario: CONIFER_KEY.to_owned(), source: Box::new(e) };
    let join = ctx.options.join_policy;
    let facres = calc_facres(current_scores, ctx.map_units, ctx.projected_ls, join).map_err(wrap)?;
    let credits =
        calc_credits(current_facres, &facres, ctx.map_units, ctx.reserve_account, ctx.credit_policy, join)
            .map_err(wrap)?;
    Ok(ScenarioCredits { key, credits })
}

pub const CONIFER_KEY: &str = "conifer";
