//! Scenario report: base effort families plus the conifer (local-scale only)
//! branch, each credited against the current functional acres.

use ccs_algo::scenario::{self, calc_conifer_credits, calc_scenario_credits, run_base_scenarios, ScenarioContext, ScenarioCredits};
use ccs_algo::{season_scores, CalcResult};
use ccs_core::entities::ProjectInputs;
use ccs_core::results::ScenarioReport;
use ccs_core::CalcOptions;

use crate::calculator::{Calibration, CalculatorRun};

/// Wide report plus the per-branch credit tables it was assembled from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenarioOutputs {
    pub report: ScenarioReport,
    pub branches: Vec<ScenarioCredits>,
}

/// Run every base scenario and the conifer branch, reusing the current run.
pub fn run_scenario_report(
    inputs: &ProjectInputs,
    options: CalcOptions,
    current: &CalculatorRun,
) -> CalcResult<ScenarioOutputs> {
    let calibration = Calibration::resolve(inputs, options)?;
    let engine = calibration.engine(inputs)?;
    let ctx = ScenarioContext {
        engine: &engine,
        map_units: &inputs.map_units,
        snapshot: &inputs.site_scale_values,
        projected_ls: &inputs.projected_ls,
        reserve_account: &inputs.reserve_account,
        credit_policy: &inputs.credit_policy,
        options,
    };

    let runs = run_base_scenarios(&inputs.site_scale_values);
    let mut branches = calc_scenario_credits(&ctx, &runs, &current.current_facres)?;
    branches.push(calc_conifer_credits(
        &ctx,
        &season_scores(&current.current_scores),
        &current.current_facres,
    )?);

    let report = scenario::run_scenario_report(&inputs.map_units, &branches);
    tracing::debug!(branches = branches.len(), rows = report.rows.len(), "scenario report");
    Ok(ScenarioOutputs { report, branches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::run_calculator;
    use crate::calculator::tests::project;
    use approx::assert_relative_eq;

    #[test]
    fn report_has_one_column_per_branch() {
        let inputs = project();
        let current = run_calculator(&inputs, CalcOptions::default(), None).unwrap();
        let out = run_scenario_report(&inputs, CalcOptions::default(), &current).unwrap();
        assert_eq!(out.branches.len(), 10);
        assert_eq!(out.report.rows.len(), 2);
        for col in ["brotec_low", "forb_grass_high", "shrub_med", "conifer"] {
            assert!(out.report.column(col).is_some(), "missing {col}");
        }
    }

    #[test]
    fn conifer_branch_isolates_local_scale_uplift() {
        let inputs = project();
        let current = run_calculator(&inputs, CalcOptions::default(), None).unwrap();
        let out = run_scenario_report(&inputs, CalcOptions::default(), &current).unwrap();
        let a = "a".parse().unwrap();
        // unchanged scores, local scale 0.5 → 1.0; winter 0.5 × 0.5 × 10 = 2.5 acres gained
        assert_relative_eq!(out.report.value(&a, "conifer").unwrap(), 2.5 * 0.9, epsilon = 1e-12);
    }
}
