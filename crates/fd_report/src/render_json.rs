//! render_json.rs: report JSON in a fixed section order:
//! summary → allocation → properties → envy → integrity.
//!
//! Key order inside each object is insertion order (`preserve_order`).

use serde_json::{Map as JsonMap, Value};

use crate::{AllocationBlock, EnvyBlock, IntegrityBlock, PropertyLine, ReportError, ReportModel, SummaryBlock};

fn obj() -> JsonMap<String, Value> {
    JsonMap::new()
}

pub fn render_json(m: &ReportModel) -> Value {
    let mut root = obj();
    root.insert("summary".into(), summary_json(&m.summary));
    root.insert("allocation".into(), allocation_json(&m.allocation));
    root.insert("properties".into(), Value::Array(m.properties.iter().map(property_json).collect()));
    root.insert("envy".into(), envy_json(&m.envy));
    root.insert("integrity".into(), integrity_json(&m.integrity));
    Value::Object(root)
}

/// Pretty-printed, newline-terminated.
pub fn render_json_string(m: &ReportModel) -> Result<String, ReportError> {
    let mut s = serde_json::to_string_pretty(&render_json(m)).map_err(|e| ReportError::Render(e.to_string()))?;
    s.push('\n');
    Ok(s)
}

fn summary_json(s: &SummaryBlock) -> Value {
    let mut o = obj();
    o.insert("algorithm".into(), Value::String(s.algorithm.clone()));
    o.insert("algorithm_name".into(), Value::String(s.algorithm_name.clone()));
    o.insert("player_count".into(), Value::from(s.player_count));
    o.insert("verdict".into(), Value::String(s.verdict.label().into()));
    o.insert("score".into(), Value::String(s.score_pct_1dp.clone()));
    Value::Object(o)
}

fn allocation_json(a: &AllocationBlock) -> Value {
    let rows = a
        .rows
        .iter()
        .map(|r| {
            let mut o = obj();
            o.insert("player".into(), Value::String(r.player.clone()));
            o.insert("share".into(), Value::String(r.share.clone()));
            o.insert("own_value".into(), Value::String(r.own_value_1dp.clone()));
            o.insert("proportional".into(), Value::Bool(r.proportional));
            Value::Object(o)
        })
        .collect();
    let mut o = obj();
    o.insert("rows".into(), Value::Array(rows));
    // omit when nothing is left over
    if let Some(l) = &a.leftover {
        o.insert("leftover".into(), Value::String(l.clone()));
    }
    Value::Object(o)
}

fn property_json(p: &PropertyLine) -> Value {
    let mut o = obj();
    o.insert("name".into(), Value::String(p.name.into()));
    o.insert("pass".into(), Value::Bool(p.pass));
    o.insert("detail".into(), Value::String(p.detail.clone()));
    Value::Object(o)
}

fn envy_json(e: &EnvyBlock) -> Value {
    let rows = e
        .rows
        .iter()
        .map(|r| {
            let cells = r
                .cells
                .iter()
                .map(|c| {
                    let mut o = obj();
                    o.insert("owner".into(), Value::String(c.owner.clone()));
                    o.insert("value".into(), Value::String(c.value_1dp.clone()));
                    o.insert("envies".into(), Value::Bool(c.envies));
                    Value::Object(o)
                })
                .collect();
            let mut o = obj();
            o.insert("evaluator".into(), Value::String(r.evaluator.clone()));
            o.insert("cells".into(), Value::Array(cells));
            Value::Object(o)
        })
        .collect();
    let mut o = obj();
    o.insert("players".into(), Value::Array(e.players.iter().cloned().map(Value::String).collect()));
    o.insert("rows".into(), Value::Array(rows));
    Value::Object(o)
}

fn integrity_json(i: &IntegrityBlock) -> Value {
    let mut o = obj();
    o.insert("result_id".into(), Value::String(i.result_id.clone()));
    o.insert("started_at".into(), Value::String(i.started_at.clone()));
    o.insert("finished_at".into(), Value::String(i.finished_at.clone()));
    o.insert("steps_entered".into(), Value::from(i.steps_entered));
    Value::Object(o)
}
