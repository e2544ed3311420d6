//! Functional acres: season score × local-scale factor × area.

use ccs_core::entities::{LocalScaleRow, MapUnit};
use ccs_core::results::{FacreRow, SeasonScores};
use ccs_core::JoinPolicy;

use crate::join::pair_up;
use crate::{CalcResult, Stage};

/// Build the functional-acre report for a season-score table. The caller picks
/// current or projected local-scale factors. Rows are ordered by map unit.
pub fn calc_facres(
    scores: &[SeasonScores],
    map_units: &[MapUnit],
    local_scale: &[LocalScaleRow],
    join: JoinPolicy,
) -> CalcResult<Vec<FacreRow>> {
    let stage = Stage::FunctionalAcres;
    let with_units = pair_up(stage, join, "scores", scores, "map_units", map_units)?;
    let joined = pair_up(stage, join, "scores", &with_units, "local_scale", local_scale)?;

    Ok(joined
        .into_iter()
        .map(|((s, unit), ls)| {
            let area = unit.map_unit_area;
            let (breed_overall, summer_overall, winter_overall) =
                (s.breed * ls.ls_breed, s.summer * ls.ls_summer, s.winter * ls.ls_winter);
            FacreRow {
                map_unit_id: s.map_unit_id.clone(),
                map_unit_name: unit.map_unit_name.clone(),
                meadow: unit.meadow.clone(),
                map_unit_area: area,
                breed: s.breed,
                ls_breed: ls.ls_breed,
                breed_overall,
                breed_facres: breed_overall * area,
                summer: s.summer,
                ls_summer: ls.ls_summer,
                summer_overall,
                summer_facres: summer_overall * area,
                winter: s.winter,
                ls_winter: ls.ls_winter,
                winter_overall,
                winter_facres: winter_overall * area,
            }
        })
        .collect())
}
