//! Current and projected credit runs.
//!
//! Steps, in order:
//! 1. current scores
//! 2. current facres (current local scale)
//! 3. corrected baseline
//! 4. baseline facres (current local scale)
//! 5. current credits (baseline → current)
//! 6. projected snapshot (override, else the stored projected table)
//! 7. projected scores
//! 8. projected facres (projected local scale)
//! 9. projected credits (current → projected)

use ccs_algo::scenario::project_attributes;
use ccs_algo::{
    calc_credits, calc_facres, correct_baseline, season_scores, CalcError, CalcResult, CurveBook,
    ScoringEngine, ScoringWeights, Stage,
};
use ccs_core::entities::{ProjectInputs, ProjectedValue};
use ccs_core::results::{CreditRow, DivergentDuplicate, FacreRow, SeasonScores, SiteScaleScore};
use ccs_core::CalcOptions;

/// Curves and weights resolved once per project.
#[derive(Clone, Debug)]
pub struct Calibration {
    pub curves: CurveBook,
    pub weights: ScoringWeights,
}

impl Calibration {
    pub fn resolve(inputs: &ProjectInputs, options: CalcOptions) -> CalcResult<Self> {
        let config = |source| CalcError::Configuration { stage: Stage::Scoring, source };
        let curves = CurveBook::from_curves(&inputs.curves, options.bucket_policy).map_err(config)?;
        let weights = ScoringWeights::from_rows(&inputs.scoring_weights).map_err(config)?;
        Ok(Calibration { curves, weights })
    }

    /// Bind the curves and weights through the project's curve lookup.
    pub fn engine(&self, inputs: &ProjectInputs) -> CalcResult<ScoringEngine<'_>> {
        ScoringEngine::new(&self.curves, &inputs.curve_lookup, &self.weights)
            .map_err(|source| CalcError::Configuration { stage: Stage::Scoring, source })
    }
}

/// Every table the calculator derives, in step order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalculatorRun {
    pub current_scores: Vec<SiteScaleScore>,
    pub current_facres: Vec<FacreRow>,
    pub baseline_scores: Vec<SeasonScores>,
    pub baseline_facres: Vec<FacreRow>,
    pub current_credits: Vec<CreditRow>,
    pub projected_scores: Vec<SiteScaleScore>,
    pub projected_facres: Vec<FacreRow>,
    pub projected_credits: Vec<CreditRow>,
    /// Projected duplicates that disagreed and were averaged.
    pub divergent: Vec<DivergentDuplicate>,
}

/// Run the current and projected pipelines. `projected_override` replaces the
/// stored projected-values table when given.
pub fn run_calculator(
    inputs: &ProjectInputs,
    options: CalcOptions,
    projected_override: Option<&[ProjectedValue]>,
) -> CalcResult<CalculatorRun> {
    let calibration = Calibration::resolve(inputs, options)?;
    let engine = calibration.engine(inputs)?;
    let join = options.join_policy;
    let units = &inputs.map_units;

    let current_scores = engine.score_site_scale(units, &inputs.site_scale_values, join)?;
    let current_seasons = season_scores(&current_scores);
    let current_facres = calc_facres(&current_seasons, units, &inputs.current_ls, join)?;

    let baseline_scores = correct_baseline(&inputs.standard_baseline, &current_seasons, join)?;
    let baseline_facres = calc_facres(&baseline_scores, units, &inputs.current_ls, join)?;
    let current_credits = calc_credits(
        &baseline_facres,
        &current_facres,
        units,
        &inputs.reserve_account,
        &inputs.credit_policy,
        join,
    )?;
    tracing::debug!(units = current_credits.len(), "current credits");

    let projected = projected_override.unwrap_or(&inputs.projected_values);
    let projection = project_attributes(&inputs.site_scale_values, projected, &options)?;
    let projected_scores = engine.score_site_scale(units, &projection.rows, join)?;
    let projected_facres = calc_facres(&season_scores(&projected_scores), units, &inputs.projected_ls, join)?;
    let projected_credits = calc_credits(
        &current_facres,
        &projected_facres,
        units,
        &inputs.reserve_account,
        &inputs.credit_policy,
        join,
    )?;
    tracing::debug!(
        units = projected_credits.len(),
        override_used = projected_override.is_some(),
        "projected credits"
    );

    Ok(CalculatorRun {
        current_scores,
        current_facres,
        baseline_scores,
        baseline_facres,
        current_credits,
        projected_scores,
        projected_facres,
        projected_credits,
        divergent: projection.divergent,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ccs_core::entities::{
        AttributeRow, CreditPolicy, LocalScaleRow, MapUnit, ReserveAccountRow, ScoringCurves, ScoringWeightRow,
        StandardBaselineRow,
    };
    use ccs_core::{ConiferPhase, HabitatType, JoinPolicy, Meadow, MgmtCategory, SageSpecies, Season};
    use std::collections::BTreeMap;

    const CURVES: [&str; 21] = [
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

    fn weight(season: Season, function: &str, attr: &str, w: f64) -> ScoringWeightRow {
        ScoringWeightRow { season, hab_function: function.into(), hab_attr: attr.into(), score_weight: w }
    }

    /// Two non-meadow units on flat curves (every bucket scores 0.5).
    pub(crate) fn project() -> ProjectInputs {
        let flat = vec![0.5; 101];
        let curves = ScoringCurves(CURVES.iter().map(|c| (c.to_string(), flat.clone())).collect());
        let unit = |id: &str| MapUnit {
            map_unit_id: id.parse().unwrap(),
            map_unit_name: format!("unit {id}"),
            map_unit_area: 10.0,
            meadow: Meadow::NoMeadow,
            conifer_phase: ConiferPhase::None,
            indirect_benefits_area: false,
            phma: 1.0,
            ghma: 0.0,
            ohma: 0.0,
            sage_species: SageSpecies::Big,
        };
        let attrs = |id: &str| {
            let mut r = AttributeRow::new(id.parse().unwrap());
            r.shrub_cover = Some(0.2);
            r.grass_cover = Some(0.2);
            r.sage_cover = Some(0.1);
            r.sage_height = Some(30.0);
            r.brotec_cover = Some(0.05);
            r.arid = Some(0.5);
            r.mesic = Some(0.5);
            r
        };
        let ls = |id: &str, v: f64| LocalScaleRow { map_unit_id: id.parse().unwrap(), ls_breed: v, ls_summer: v, ls_winter: v };
        let mut baseline = Vec::new();
        for id in ["a", "b"] {
            for season in Season::ALL {
                baseline.push(StandardBaselineRow { map_unit_id: id.parse().unwrap(), season: *season, value: 0.1 });
            }
        }
        use Season::*;
        ProjectInputs {
            map_units: vec![unit("a"), unit("b")],
            site_scale_values: vec![attrs("a"), attrs("b")],
            curves,
            scoring_weights: vec![
                weight(Breed, "cover", "sage_cover", 0.5),
                weight(Breed, "cover", "shrub_cover", 0.5),
                weight(Breed, "forage", "forb_cover", 0.5),
                weight(Breed, "forage", "forb_rich", 0.5),
                weight(Summer, "forage", "forb_cover", 0.5),
                weight(Summer, "forage", "forb_rich", 0.5),
                weight(Summer, "cover", "grass_cover", 1.0),
                weight(Winter, "cover", "sage_cover", 0.5),
                weight(Winter, "height", "sage_height", 0.5),
            ],
            current_ls: vec![ls("a", 0.5), ls("b", 0.5)],
            projected_ls: vec![ls("a", 1.0), ls("b", 1.0)],
            standard_baseline: baseline,
            reserve_account: vec![
                ReserveAccountRow { map_unit_id: "a".parse().unwrap(), total_contribution: 0.1 },
                ReserveAccountRow { map_unit_id: "b".parse().unwrap(), total_contribution: 0.0 },
            ],
            credit_policy: CreditPolicy {
                meadow_multiplier: 0.5,
                mgmt_multipliers: BTreeMap::from([
                    (MgmtCategory::Phma, 1.0),
                    (MgmtCategory::Ghma, 1.0),
                    (MgmtCategory::Ohma, 1.0),
                ]),
            },
            projected_values: vec![ProjectedValue {
                map_unit_id: "a".parse().unwrap(),
                hab_attr: "b_forb_cover".into(),
                attr_value: Some(0.3),
            }],
            ..ProjectInputs::default()
        }
    }

    #[test]
    fn current_credits_measure_uplift_over_corrected_baseline() {
        let run = run_calculator(&project(), CalcOptions::default(), None).unwrap();
        // flat curves, no forbs: breed = cover 0.5 × brotec 0.5; summer = grass 0.5 × brotec 0.5;
        // winter = 0.5 height + 0.5 cover halves
        let a = &run.current_scores[0];
        assert_relative_eq!(a.breed, 0.25);
        assert_relative_eq!(a.summer, 0.25);
        assert_relative_eq!(a.winter, 0.5);
        assert!(run.baseline_scores.iter().all(|b| b.breed <= 0.25 && b.winter <= 0.5));

        let c = &run.current_credits[0];
        // (score - 0.1 baseline) × 0.5 ls × 10 acres; winter wins
        assert_relative_eq!(c.breed_delta, 0.75, epsilon = 1e-12);
        assert_relative_eq!(c.summer_delta, 0.75, epsilon = 1e-12);
        assert_relative_eq!(c.winter_delta, 2.0, epsilon = 1e-12);
        assert_eq!(c.habitat_type, HabitatType::Winter);
        assert_relative_eq!(c.credits, 2.0, epsilon = 1e-12);
        assert_relative_eq!(c.reserve_credits, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn missing_brotec_cover_zeroes_breed_and_summer() {
        let mut inputs = project();
        inputs.site_scale_values[0].brotec_cover = None;
        let run = run_calculator(&inputs, CalcOptions::default(), None).unwrap();
        let a = &run.current_scores[0];
        assert_eq!(a.brotec_cover, 0.0);
        assert_eq!(a.breed, 0.0);
        assert_eq!(a.summer, 0.0);
        assert_relative_eq!(a.winter, 0.5);
    }

    #[test]
    fn projected_credits_compare_against_current_facres() {
        let run = run_calculator(&project(), CalcOptions::default(), None).unwrap();
        // only "a" has stored projected values; "b" is dropped under inner join
        assert_eq!(run.projected_credits.len(), 1);
        let p = &run.projected_credits[0];
        assert_eq!(p.breed_facres_pre, run.current_facres[0].breed_facres);
        // same scores, local scale 0.5 → 1.0 doubles facres
        assert_relative_eq!(p.winter_delta, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn override_replaces_the_stored_projection() {
        let over = vec![
            ProjectedValue { map_unit_id: "a".parse().unwrap(), hab_attr: "sage_cover".into(), attr_value: None },
            ProjectedValue { map_unit_id: "b".parse().unwrap(), hab_attr: "sage_cover".into(), attr_value: None },
        ];
        let run = run_calculator(&project(), CalcOptions::default(), Some(&over)).unwrap();
        assert_eq!(run.projected_credits.len(), 2);
    }

    #[test]
    fn strict_join_surfaces_the_missing_projection() {
        let options = CalcOptions { join_policy: JoinPolicy::Strict, ..CalcOptions::default() };
        let err = run_calculator(&project(), options, None).unwrap_err();
        assert_eq!(err.stage(), Stage::Scenario);
        assert_eq!(err.map_unit().map(|m| m.as_str()), Some("b"));
    }

    #[test]
    fn configuration_errors_are_raised_before_scoring() {
        let mut inputs = project();
        inputs.curves.0.remove("w_sage_cover_low");
        let err = run_calculator(&inputs, CalcOptions::default(), None).unwrap_err();
        assert!(matches!(err, CalcError::Configuration { stage: Stage::Scoring, .. }));
    }
}
