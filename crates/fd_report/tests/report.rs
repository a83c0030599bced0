// crates/fd_report/tests/report.rs
//! Report model and both renderers over real autoplayed runs.

use chrono::{TimeZone, Utc};
use fd_io::scenario::parse_scenario;
use fd_pipeline::{run_scenario_with_clock, AlgorithmRegistry, FixedClock, RunResult};
use fd_report::{build_model, render_json, render_json_string, render_text, ReportError, Verdict};

const SCENARIO_A: &str = r#"{
    "algorithm": "divide-and-choose",
    "player_count": 2,
    "regions": [
        {"id": "blue",   "shape": {"kind": "span", "start": 0,   "end": 600}},
        {"id": "red",    "shape": {"kind": "span", "start": 600, "end": 800}},
        {"id": "green",  "shape": {"kind": "span", "start": 150, "end": 600}},
        {"id": "orange", "shape": {"kind": "span", "start": 600, "end": 800}},
        {"id": "pink",   "shape": {"kind": "span", "start": 0,   "end": 150}},
        {"id": "purple", "shape": {"kind": "span", "start": 150, "end": 800}}
    ],
    "players": {
        "P1": {"blue": 20, "red": 15, "green": 25, "orange": 10, "pink": 15, "purple": 15},
        "P2": {"blue": 20, "red": 15, "green": 25, "orange": 10, "pink": 15, "purple": 15}
    }
}"#;

const KNASTER: &str = r#"{
    "algorithm": "knaster-sealed-bids",
    "player_count": 2,
    "regions": [
        {"id": "a", "shape": {"kind": "span", "start": 0,   "end": 400}},
        {"id": "b", "shape": {"kind": "span", "start": 400, "end": 800}}
    ],
    "players": {
        "P1": {"a": 60, "b": 40},
        "P2": {"a": 30, "b": 70}
    }
}"#;

fn run(json: &str) -> RunResult {
    let scenario = parse_scenario(json.as_bytes()).unwrap();
    let registry = AlgorithmRegistry::standard().unwrap();
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 5, 4, 8, 0, 0).unwrap());
    run_scenario_with_clock(&scenario, &registry, clock).unwrap().result
}

#[test]
fn balanced_division_is_reported_fair() {
    let m = build_model(&run(SCENARIO_A)).unwrap();
    assert_eq!(m.summary.verdict, Verdict::Fair);
    assert_eq!(m.summary.score_pct_1dp, "87.5%");
    assert_eq!(m.allocation.rows.len(), 2);
    assert!(m.allocation.rows.iter().all(|r| r.own_value_1dp == "50.0" && r.proportional));
    assert_eq!(m.allocation.leftover, None);

    let names: Vec<&str> = m.properties.iter().map(|p| p.name).collect();
    assert_eq!(names, ["proportional", "envy_free", "equitable", "efficient"]);
    assert!(!m.properties[3].pass);
    assert_eq!(m.properties[3].detail, "100.0 of 200.0 total utility (50.0%)");
    assert_eq!(m.integrity.started_at, "2025-05-04T08:00:00Z");
    assert_eq!(m.integrity.steps_entered, 3);
}

#[test]
fn envy_is_spelled_out() {
    let json = SCENARIO_A.replacen("\"players\"", "\"cuts\": [400], \"players\"", 1);
    let m = build_model(&run(&json)).unwrap();
    assert_eq!(m.summary.verdict, Verdict::Unfair);
    assert_eq!(m.properties[1].detail, "P1 envies P2 by 4.0");
    assert_eq!(m.envy.players, ["P1", "P2"]);
    assert_eq!(m.envy.rows[0].cells[0].value_1dp, "48.0");
    assert!(m.envy.rows[0].cells[1].envies);
    assert!(!m.envy.rows[1].cells[0].envies);

    let text = render_text(&m);
    assert!(text.contains("52.0!"));
    assert!(text.contains("envy_free     no "));
}

#[test]
fn bundles_show_items_and_cash() {
    let m = build_model(&run(KNASTER)).unwrap();
    assert_eq!(m.allocation.rows[0].share, "items a; cash +5.00");
    assert_eq!(m.allocation.rows[1].share, "items b; cash -5.00");
    assert_eq!(m.allocation.rows[0].own_value_1dp, "65.0");
    assert_eq!(m.properties[3].detail, "130.0 of 200.0 total utility (65.0%)");
}

#[test]
fn json_sections_keep_their_order() {
    let result = run(SCENARIO_A);
    let m = build_model(&result).unwrap();
    let v = render_json(&m);
    let keys: Vec<&str> = v.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, ["summary", "allocation", "properties", "envy", "integrity"]);
    assert_eq!(v["summary"]["verdict"], "fair");
    assert_eq!(v["integrity"]["result_id"], result.id.as_str());
    assert!(v["allocation"].get("leftover").is_none());

    let s = render_json_string(&m).unwrap();
    assert!(s.ends_with("}\n"));
    let back: serde_json::Value = serde_json::from_str(&s).unwrap();
    assert_eq!(back, v);
}

#[test]
fn text_report_leads_with_the_summary() {
    let m = build_model(&run(SCENARIO_A)).unwrap();
    let text = render_text(&m);
    let first = text.lines().next().unwrap();
    assert_eq!(first, "Divide and Choose (divide-and-choose), 2 players: fair, score 87.5%");
    assert!(text.contains("Allocation"));
    assert!(text.contains("Envy matrix"));
    assert!(text.contains(&format!("result {}", m.integrity.result_id)));
}

#[test]
fn model_refuses_a_result_without_id() {
    let mut result = run(SCENARIO_A);
    result.id.clear();
    assert_eq!(build_model(&result), Err(ReportError::MissingField("id")));
}
