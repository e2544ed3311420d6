//! Improvement families: multiplicative what-if changes to attribute columns,
//! each at three effort levels.

use ccs_core::entities::{AttributeRow, ProjectedValue};
use ccs_core::{Attribute, Effort};

/// One effort level: `value × factor`, then clamped to the optional bounds.
/// A missing bound leaves that side unclamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Improvement {
    pub factor: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Improvement {
    pub const fn new(factor: f64, lower: Option<f64>, upper: Option<f64>) -> Self {
        Improvement { factor, lower, upper }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffortLevels {
    pub low: Improvement,
    pub med: Improvement,
    pub high: Improvement,
}

impl EffortLevels {
    #[inline]
    pub fn get(&self, effort: Effort) -> Improvement {
        match effort {
            Effort::Low => self.low,
            Effort::Med => self.med,
            Effort::High => self.high,
        }
    }

    /// Three factors sharing the same bounds.
    pub const fn with_bounds(factors: [f64; 3], lower: Option<f64>, upper: Option<f64>) -> Self {
        EffortLevels {
            low: Improvement::new(factors[0], lower, upper),
            med: Improvement::new(factors[1], lower, upper),
            high: Improvement::new(factors[2], lower, upper),
        }
    }
}

/// A named family: attribute key → effort levels. Keys match every attribute
/// column whose name ends with the key.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioFamily {
    pub name: String,
    pub attributes: Vec<(String, EffortLevels)>,
}

/// Projected values of one (family, effort) branch.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioRun {
    pub family: String,
    pub effort: Effort,
    pub values: Vec<ProjectedValue>,
}

impl ScenarioRun {
    /// Report column / branch key, e.g. `brotec_low`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.family, self.effort)
    }
}

/// Multiply, then clamp at the upper bound, then at the lower bound.
pub fn apply_improvement(value: f64, imp: &Improvement) -> f64 {
    let mut v = value * imp.factor;
    if let Some(upper) = imp.upper {
        if v >= upper {
            v = upper;
        }
    }
    if let Some(lower) = imp.lower {
        if v <= lower {
            v = lower;
        }
    }
    v
}

/// The three canonical families: invasive-grass suppression, forb/grass
/// enhancement and shrub enhancement.
pub fn base_families() -> Vec<ScenarioFamily> {
    let cover = |f: [f64; 3]| EffortLevels::with_bounds(f, Some(0.0), Some(1.0));
    vec![
        ScenarioFamily {
            name: "brotec".into(),
            attributes: vec![("brotec_cover".into(), cover([0.5, 0.25, 0.1]))],
        },
        ScenarioFamily {
            name: "forb_grass".into(),
            attributes: vec![
                ("forb_cover".into(), cover([1.1, 1.25, 1.5])),
                ("forb_rich".into(), EffortLevels::with_bounds([1.0, 2.0, 3.0], Some(0.0), None)),
                ("grass_cover".into(), cover([1.1, 1.25, 1.5])),
            ],
        },
        ScenarioFamily {
            name: "shrub".into(),
            attributes: vec![
                ("sage_cover".into(), cover([1.1, 1.2, 1.3])),
                ("shrub_cover".into(), cover([1.1, 1.2, 1.3])),
            ],
        },
    ]
}

/// Apply one family to a snapshot: one tidy projected-values table per effort
/// level, in low → med → high order. Units with a missing value stay in the
/// table with a `None` value.
pub fn run_scenario(snapshot: &[AttributeRow], family: &ScenarioFamily) -> Vec<ScenarioRun> {
    Effort::ALL
        .iter()
        .map(|&effort| {
            let mut values = Vec::new();
            for (key, levels) in &family.attributes {
                let imp = levels.get(effort);
                for &attr in Attribute::ALL.iter().filter(|a| a.as_str().ends_with(key.as_str())) {
                    values.extend(snapshot.iter().map(|row| ProjectedValue {
                        map_unit_id: row.map_unit_id.clone(),
                        hab_attr: attr.as_str().to_owned(),
                        attr_value: row.get(attr).map(|v| apply_improvement(v, &imp)),
                    }));
                }
            }
            ScenarioRun { family: family.name.clone(), effort, values }
        })
        .collect()
}

/// Run every canonical family; family order then effort order.
pub fn run_base_scenarios(snapshot: &[AttributeRow]) -> Vec<ScenarioRun> {
    base_families().iter().flat_map(|f| run_scenario(snapshot, f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::tests::attrs;
    use proptest::prelude::*;

    #[test]
    fn brotec_low_halves_cover() {
        let runs = run_base_scenarios(&[attrs("1")]);
        let low = &runs[0];
        assert_eq!(low.key(), "brotec_low");
        assert_eq!(low.values.len(), 1);
        assert_eq!(low.values[0].hab_attr, "brotec_cover");
        assert_eq!(low.values[0].attr_value, Some(0.4));
    }

    #[test]
    fn branch_keys_in_report_order() {
        let keys: Vec<String> = run_base_scenarios(&[attrs("1")]).iter().map(ScenarioRun::key).collect();
        assert_eq!(
            keys,
            [
                "brotec_low",
                "brotec_med",
                "brotec_high",
                "forb_grass_low",
                "forb_grass_med",
                "forb_grass_high",
                "shrub_low",
                "shrub_med",
                "shrub_high",
            ]
        );
    }

    #[test]
    fn richness_is_unbounded_above() {
        let mut r = attrs("1");
        r.forb_rich = Some(40.0);
        r.forb_cover = Some(0.9);
        let runs = run_base_scenarios(&[r]);
        let high = runs.iter().find(|r| r.key() == "forb_grass_high").unwrap();
        let get = |a: &str| high.values.iter().find(|v| v.hab_attr == a).unwrap().attr_value;
        assert_eq!(get("forb_rich"), Some(120.0));
        assert_eq!(get("forb_cover"), Some(1.0));
    }

    #[test]
    fn missing_values_are_carried_as_none() {
        let mut r = attrs("1");
        r.shrub_cover = None;
        let runs = run_base_scenarios(&[r]);
        let shrub = runs.iter().find(|r| r.key() == "shrub_med").unwrap();
        let v = shrub.values.iter().find(|v| v.hab_attr == "shrub_cover").unwrap();
        assert_eq!(v.attr_value, None);
    }

    #[test]
    fn absent_bound_does_not_clamp() {
        let imp = Improvement::new(2.0, None, None);
        assert_eq!(apply_improvement(-3.0, &imp), -6.0);
        assert_eq!(apply_improvement(0.75, &imp), 1.5);
    }

    proptest! {
        #[test]
        fn clamp_law(
            value in -10.0f64..10.0,
            factor in 0.0f64..5.0,
            lower in -1.0f64..0.5,
            width in 0.0f64..2.0,
        ) {
            let upper = lower + width;
            let bounded = apply_improvement(value, &Improvement::new(factor, Some(lower), Some(upper)));
            prop_assert!(bounded >= lower && bounded <= upper);
            let raw = apply_improvement(value, &Improvement::new(factor, None, None));
            prop_assert_eq!(raw, value * factor);
        }
    }
}
