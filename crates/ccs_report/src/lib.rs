//! ccs_report: credit summary model + renderers (JSON/HTML).
//!
//! Pure and offline: the summary is built from an in-memory `PipelineOutputs`,
//! nothing is recomputed and nothing is read from disk. Section and field
//! order is fixed by struct layout.

#![deny(unsafe_code)]

use std::fmt;

use ccs_core::results::{CreditRow, ScenarioReport};
use ccs_core::HabitatType;
use ccs_pipeline::PipelineOutputs;
use serde::Serialize;

// ===== Errors =====
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    Template(&'static str),
    Inconsistent(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Template(s) => write!(f, "template: {s}"),
            ReportError::Inconsistent(s) => write!(f, "inconsistent outputs: {s}"),
        }
    }
}

impl std::error::Error for ReportError {}

// ===== Model =====
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreditSummary {
    pub title: String,
    pub project: Option<String>,
    pub integrity: SectionIntegrity,
    pub current: CreditTotals,
    pub projected: CreditTotals,
    pub habitat_types: Vec<HabitatCount>,
    /// One entry per scenario column, in report order.
    pub scenarios: Vec<ScenarioTotal>,
    pub divergent_duplicates: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SectionIntegrity {
    pub run_id: String,
    pub engine_name: String,
    pub engine_version: String,
}

/// Column sums over one credit table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreditTotals {
    pub map_units: usize,
    pub area: f64,
    pub credits: f64,
    pub reserve_credits: f64,
    pub saleable_credits: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HabitatCount {
    pub habitat_type: HabitatType,
    pub current: usize,
    pub projected: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioTotal {
    pub key: String,
    /// Map units with a value in this column.
    pub map_units: usize,
    pub saleable_credits: f64,
}

// ===== API =====

/// Build the summary of one run.
pub fn build_summary(out: &PipelineOutputs) -> Result<CreditSummary, ReportError> {
    let current = totals("current_credits", &out.current_credits)?;
    let projected = totals("projected_credits", &out.projected_credits)?;

    let habitat_types = HabitatType::ALL
        .iter()
        .map(|&h| HabitatCount {
            habitat_type: h,
            current: out.current_credits.iter().filter(|c| c.habitat_type == h).count(),
            projected: out.projected_credits.iter().filter(|c| c.habitat_type == h).count(),
        })
        .collect();

    let scenarios = match out.scenario_report() {
        Some(report) => scenario_totals(report)?,
        None => Vec::new(),
    };

    let rec = &out.run_record;
    Ok(CreditSummary {
        title: "Habitat Credit Summary".to_string(),
        project: rec.project.clone(),
        integrity: SectionIntegrity {
            run_id: rec.id.clone(),
            engine_name: rec.engine.name.clone(),
            engine_version: rec.engine.version.clone(),
        },
        current,
        projected,
        habitat_types,
        scenarios,
        divergent_duplicates: rec.divergent_duplicates.len(),
    })
}

fn totals(table: &str, rows: &[CreditRow]) -> Result<CreditTotals, ReportError> {
    let mut t = CreditTotals { map_units: rows.len(), ..CreditTotals::default() };
    for r in rows {
        t.area += r.map_unit_area;
        t.credits += r.credits;
        t.reserve_credits += r.reserve_credits;
        t.saleable_credits += r.saleable_credits;
    }
    for (name, v) in [("area", t.area), ("credits", t.credits), ("saleable_credits", t.saleable_credits)] {
        if !v.is_finite() {
            return Err(ReportError::Inconsistent(format!("{table}: {name} total is not finite")));
        }
    }
    Ok(t)
}

fn scenario_totals(report: &ScenarioReport) -> Result<Vec<ScenarioTotal>, ReportError> {
    let mut out: Vec<ScenarioTotal> = report
        .columns
        .iter()
        .map(|c| ScenarioTotal { key: c.clone(), map_units: 0, saleable_credits: 0.0 })
        .collect();
    for row in &report.rows {
        if row.values.len() != report.columns.len() {
            return Err(ReportError::Inconsistent(format!(
                "scenario row {} has {} values for {} columns",
                row.map_unit_id,
                row.values.len(),
                report.columns.len()
            )));
        }
        for (total, v) in out.iter_mut().zip(&row.values) {
            if let Some(v) = v {
                total.map_units += 1;
                total.saleable_credits += v;
            }
        }
    }
    Ok(out)
}

// ===== Renderers =====

/// Pretty JSON, trailing newline.
#[cfg(feature = "render_json")]
pub fn render_json(model: &CreditSummary) -> Result<String, ReportError> {
    let mut s = serde_json::to_string_pretty(model).map_err(|_| ReportError::Template("json_serialize"))?;
    s.push('\n');
    Ok(s)
}

/// Self-contained HTML page (no external assets).
#[cfg(feature = "render_html")]
pub fn render_html(model: &CreditSummary) -> Result<String, ReportError> {
    use minijinja::{context, Environment};

    static TEMPLATE: &str = r#"<!doctype html>
<html lang="en"><meta charset="utf-8">
<title>{{ title }}{% if project %}: {{ project }}{% endif %}</title>
<h1>{{ title }}</h1>
{% if project %}<p><strong>Project:</strong> {{ project }}</p>{% endif %}

<h2>Credits</h2>
<table>
  <tr><th></th><th>Map units</th><th>Acres</th><th>Credits</th><th>Reserve</th><th>Saleable</th></tr>
  {% for t in totals %}
  <tr><th>{{ t.label }}</th><td>{{ t.map_units }}</td><td>{{ t.area }}</td><td>{{ t.credits }}</td><td>{{ t.reserve }}</td><td>{{ t.saleable }}</td></tr>
  {% endfor %}
</table>

<h2>Habitat types</h2>
<table>
  <tr><th>Habitat type</th><th>Current</th><th>Projected</th></tr>
  {% for h in habitat %}
  <tr><td>{{ h.habitat_type }}</td><td>{{ h.current }}</td><td>{{ h.projected }}</td></tr>
  {% endfor %}
</table>

{% if scenarios %}
<h2>Scenarios</h2>
<table>
  <tr><th>Scenario</th><th>Map units</th><th>Saleable credits</th></tr>
  {% for s in scenarios %}
  <tr><td>{{ s.key }}</td><td>{{ s.map_units }}</td><td>{{ s.saleable }}</td></tr>
  {% endfor %}
</table>
{% endif %}

{% if divergent %}<p>Divergent projected duplicates averaged: {{ divergent }}</p>{% endif %}

<h2>Integrity</h2>
<p>Engine: {{ eng.name }} v{{ eng.version }}</p>
<p>Run: {{ eng.run_id }}</p>
</html>
"#;

    #[derive(Serialize)]
    struct TotalsRow<'a> {
        label: &'a str,
        map_units: usize,
        area: String,
        credits: String,
        reserve: String,
        saleable: String,
    }

    #[derive(Serialize)]
    struct ScenarioRow<'a> {
        key: &'a str,
        map_units: usize,
        saleable: String,
    }

    fn row<'a>(label: &'a str, t: &CreditTotals) -> TotalsRow<'a> {
        TotalsRow {
            label,
            map_units: t.map_units,
            area: fixed2(t.area),
            credits: fixed2(t.credits),
            reserve: fixed2(t.reserve_credits),
            saleable: fixed2(t.saleable_credits),
        }
    }

    let mut env = Environment::new();
    env.add_template("summary.html", TEMPLATE).map_err(|_| ReportError::Template("add_template"))?;
    let tmpl = env.get_template("summary.html").map_err(|_| ReportError::Template("get_template"))?;

    let scenarios: Vec<ScenarioRow<'_>> = model
        .scenarios
        .iter()
        .map(|s| ScenarioRow { key: &s.key, map_units: s.map_units, saleable: fixed2(s.saleable_credits) })
        .collect();

    let ctx = context! {
        title => &model.title,
        project => &model.project,
        totals => vec![row("Current", &model.current), row("Projected", &model.projected)],
        habitat => &model.habitat_types,
        scenarios => scenarios,
        divergent => model.divergent_duplicates,
        eng => context! {
            name => &model.integrity.engine_name,
            version => &model.integrity.engine_version,
            run_id => &model.integrity.run_id,
        },
    };

    tmpl.render(ctx).map_err(|_| ReportError::Template("render_html"))
}

// ===== Helpers =====

/// Two-decimal display; negative zero prints as zero.
#[cfg_attr(not(feature = "render_html"), allow(dead_code))]
fn fixed2(v: f64) -> String {
    let s = format!("{v:.2}");
    if s == "-0.00" {
        "0.00".to_string()
    } else {
        s
    }
}
