//! Scoring curves: curve name → 101 scores indexed by percent bucket.
//!
//! Lookup rule: a missing value scores 0; a present value is scaled,
//! floored, and used as the bucket index. Buckets outside 0..=100 are
//! rejected or clamped according to `BucketPolicy`.

use std::collections::BTreeMap;

use ccs_core::entities::ScoringCurves;
use ccs_core::BucketPolicy;

use crate::{ConfigurationError, ScoringError};

pub const CURVE_LEN: usize = 101;

/// Cover attributes are fractions; their curves are indexed by percent.
pub const COVER_SCALE: f64 = 100.0;
/// Richness, height and distance are looked up unscaled.
pub const UNSCALED: f64 = 1.0;

#[derive(Clone, Debug)]
pub struct CurveBook {
    curves: BTreeMap<String, [f64; CURVE_LEN]>,
    policy: BucketPolicy,
}

impl CurveBook {
    /// Validate and freeze a project's curves.
    pub fn from_curves(raw: &ScoringCurves, policy: BucketPolicy) -> Result<Self, ConfigurationError> {
        let mut curves = BTreeMap::new();
        for (name, scores) in &raw.0 {
            let arr: [f64; CURVE_LEN] = scores.as_slice().try_into().map_err(|_| {
                ConfigurationError::CurveShape { curve: name.clone(), len: scores.len() }
            })?;
            if let Some((bucket, &value)) =
                arr.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(ConfigurationError::CurveValue { curve: name.clone(), bucket, value });
            }
            curves.insert(name.clone(), arr);
        }
        Ok(CurveBook { curves, policy })
    }

    #[inline]
    pub fn policy(&self) -> BucketPolicy {
        self.policy
    }

    pub fn contains(&self, curve: &str) -> bool {
        self.curves.contains_key(curve)
    }

    /// Fail on the first curve name that is not defined.
    pub fn require<'a, I>(&self, names: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for n in names {
            if !self.contains(n) {
                return Err(ConfigurationError::UnknownCurve(n.to_owned()));
            }
        }
        Ok(())
    }

    /// Score `value × scale` on `curve`.
    pub fn score(&self, curve: &str, value: Option<f64>, scale: f64) -> Result<f64, ScoringError> {
        let Some(v) = value else {
            return Ok(0.0);
        };
        let table = self
            .curves
            .get(curve)
            .ok_or_else(|| ScoringError::UnknownCurve(curve.to_owned()))?;
        if !v.is_finite() {
            return Err(ScoringError::NonNumeric { curve: curve.to_owned(), value: v });
        }
        let bucket = (v * scale).floor();
        let idx = if (0.0..=100.0).contains(&bucket) {
            bucket as usize
        } else {
            match self.policy {
                BucketPolicy::Reject => {
                    return Err(ScoringError::OutOfRange { curve: curve.to_owned(), value: v, bucket });
                }
                BucketPolicy::Clamp => bucket.clamp(0.0, 100.0) as usize,
            }
        };
        Ok(table[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ScoringCurves {
        // score = bucket / 100
        let mut m = BTreeMap::new();
        m.insert("ramp".to_string(), (0..CURVE_LEN).map(|i| i as f64 / 100.0).collect());
        ScoringCurves(m)
    }

    #[test]
    fn missing_value_scores_zero() {
        let book = CurveBook::from_curves(&ramp(), BucketPolicy::Reject).unwrap();
        assert_eq!(book.score("ramp", None, COVER_SCALE).unwrap(), 0.0);
    }

    #[test]
    fn value_is_scaled_then_floored() {
        let book = CurveBook::from_curves(&ramp(), BucketPolicy::Reject).unwrap();
        assert_eq!(book.score("ramp", Some(0.257), COVER_SCALE).unwrap(), 0.25);
        assert_eq!(book.score("ramp", Some(7.9), UNSCALED).unwrap(), 0.07);
        assert_eq!(book.score("ramp", Some(1.0), COVER_SCALE).unwrap(), 1.0);
    }

    #[test]
    fn out_of_range_rejected_or_clamped() {
        let strict = CurveBook::from_curves(&ramp(), BucketPolicy::Reject).unwrap();
        assert!(matches!(
            strict.score("ramp", Some(1.2), COVER_SCALE),
            Err(ScoringError::OutOfRange { .. })
        ));
        assert!(matches!(
            strict.score("ramp", Some(-0.01), COVER_SCALE),
            Err(ScoringError::OutOfRange { .. })
        ));

        let lenient = CurveBook::from_curves(&ramp(), BucketPolicy::Clamp).unwrap();
        assert_eq!(lenient.score("ramp", Some(1.2), COVER_SCALE).unwrap(), 1.0);
        assert_eq!(lenient.score("ramp", Some(-3.0), UNSCALED).unwrap(), 0.0);
    }

    #[test]
    fn non_numeric_fails() {
        let book = CurveBook::from_curves(&ramp(), BucketPolicy::Clamp).unwrap();
        assert!(matches!(
            book.score("ramp", Some(f64::NAN), COVER_SCALE),
            Err(ScoringError::NonNumeric { .. })
        ));
    }

    #[test]
    fn shape_is_checked() {
        let mut m = BTreeMap::new();
        m.insert("short".to_string(), vec![0.0; 100]);
        let err = CurveBook::from_curves(&ScoringCurves(m), BucketPolicy::Reject).unwrap_err();
        assert_eq!(err, ConfigurationError::CurveShape { curve: "short".into(), len: 100 });

        let mut m = BTreeMap::new();
        let mut v = vec![0.0; CURVE_LEN];
        v[3] = -0.5;
        m.insert("neg".to_string(), v);
        assert!(matches!(
            CurveBook::from_curves(&ScoringCurves(m), BucketPolicy::Reject),
            Err(ConfigurationError::CurveValue { bucket: 3, .. })
        ));
    }

    #[test]
    fn require_names_the_missing_curve() {
        let book = CurveBook::from_curves(&ramp(), BucketPolicy::Reject).unwrap();
        assert_eq!(
            book.require(["ramp", "b_sage_cover"]).unwrap_err(),
            ConfigurationError::UnknownCurve("b_sage_cover".into())
        );
    }
}
