//! Baseline correction: the regional default may never exceed what a parcel
//! currently demonstrates.

use std::collections::BTreeMap;

use ccs_core::entities::StandardBaselineRow;
use ccs_core::results::SeasonScores;
use ccs_core::{JoinPolicy, MapUnitId, Season};

use crate::join::pair_up;
use crate::{CalcError, CalcResult, InputError, Stage};

/// Pivot long (map unit, season, value) rows into one row per map unit.
/// Every unit must carry each season exactly once.
pub fn pivot_baseline(rows: &[StandardBaselineRow]) -> CalcResult<Vec<SeasonScores>> {
    let mut by_unit: BTreeMap<&MapUnitId, [Option<f64>; 3]> = BTreeMap::new();
    for r in rows {
        if !r.value.is_finite() {
            return Err(CalcError::input(Stage::BaselineCorrection, &r.map_unit_id, InputError::NonFinite("value")));
        }
        let slot = &mut by_unit.entry(&r.map_unit_id).or_default()[season_index(r.season)];
        if slot.replace(r.value).is_some() {
            return Err(CalcError::input(
                Stage::BaselineCorrection,
                &r.map_unit_id,
                InputError::DuplicateRow { table: "standard_baseline" },
            ));
        }
    }

    by_unit
        .into_iter()
        .map(|(id, seasons)| {
            let get = |s: Season| {
                seasons[season_index(s)]
                    .ok_or_else(|| CalcError::input(Stage::BaselineCorrection, id, InputError::MissingBaselineSeason(s)))
            };
            Ok(SeasonScores {
                map_unit_id: id.clone(),
                breed: get(Season::Breed)?,
                summer: get(Season::Summer)?,
                winter: get(Season::Winter)?,
            })
        })
        .collect()
}

/// `baseline = min(standard, current)` per season for units present in both tables.
pub fn correct_baseline(
    standard: &[StandardBaselineRow],
    current: &[SeasonScores],
    join: JoinPolicy,
) -> CalcResult<Vec<SeasonScores>> {
    let standard = pivot_baseline(standard)?;
    let pairs = pair_up(Stage::BaselineCorrection, join, "current_scores", current, "standard_baseline", &standard)?;
    Ok(pairs
        .into_iter()
        .map(|(cur, base)| SeasonScores {
            map_unit_id: cur.map_unit_id.clone(),
            breed: base.breed.min(cur.breed),
            summer: base.summer.min(cur.summer),
            winter: base.winter.min(cur.winter),
        })
        .collect())
}

#[inline]
fn season_index(s: Season) -> usize {
    match s {
        Season::Breed => 0,
        Season::Summer => 1,
        Season::Winter => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn long(id: &str, b: f64, s: f64, w: f64) -> Vec<StandardBaselineRow> {
        [(Season::Breed, b), (Season::Summer, s), (Season::Winter, w)]
            .into_iter()
            .map(|(season, value)| StandardBaselineRow { map_unit_id: id.parse().unwrap(), season, value })
            .collect()
    }

    fn scores(id: &str, b: f64, s: f64, w: f64) -> SeasonScores {
        SeasonScores { map_unit_id: id.parse().unwrap(), breed: b, summer: s, winter: w }
    }

    #[test]
    fn takes_seasonwise_minimum() {
        let base = long("1", 0.5, 0.2, 0.9);
        let cur = vec![scores("1", 0.3, 0.4, 0.9)];
        let out = correct_baseline(&base, &cur, JoinPolicy::Inner).unwrap();
        assert_eq!(out, vec![scores("1", 0.3, 0.2, 0.9)]);
    }

    #[test]
    fn missing_season_names_unit_and_season() {
        let mut base = long("4", 0.5, 0.2, 0.9);
        base.retain(|r| r.season != Season::Summer);
        let err = pivot_baseline(&base).unwrap_err();
        assert_eq!(
            err,
            CalcError::Input {
                stage: Stage::BaselineCorrection,
                map_unit: "4".parse().unwrap(),
                source: InputError::MissingBaselineSeason(Season::Summer),
            }
        );
    }

    #[test]
    fn repeated_season_is_rejected() {
        let mut base = long("4", 0.5, 0.2, 0.9);
        base.push(StandardBaselineRow { map_unit_id: "4".parse().unwrap(), season: Season::Winter, value: 0.1 });
        assert!(matches!(
            pivot_baseline(&base),
            Err(CalcError::Input { source: InputError::DuplicateRow { .. }, .. })
        ));
    }

    #[test]
    fn units_missing_from_either_side_follow_join_policy() {
        let mut base = long("1", 0.5, 0.5, 0.5);
        base.extend(long("2", 0.5, 0.5, 0.5));
        let cur = vec![scores("1", 0.1, 0.1, 0.1)];
        let out = correct_baseline(&base, &cur, JoinPolicy::Inner).unwrap();
        assert_eq!(out.len(), 1);
        assert!(matches!(
            correct_baseline(&base, &cur, JoinPolicy::Strict),
            Err(CalcError::Join { missing_from: "current_scores", .. })
        ));
    }

    proptest! {
        #[test]
        fn corrected_never_exceeds_current(
            base in prop::array::uniform3(0.0f64..1.0),
            cur in prop::array::uniform3(0.0f64..1.0),
        ) {
            let out = correct_baseline(
                &long("9", base[0], base[1], base[2]),
                &[scores("9", cur[0], cur[1], cur[2])],
                JoinPolicy::Strict,
            ).unwrap();
            prop_assert!(out[0].breed <= cur[0]);
            prop_assert!(out[0].summer <= cur[1]);
            prop_assert!(out[0].winter <= cur[2]);
        }
    }
}
