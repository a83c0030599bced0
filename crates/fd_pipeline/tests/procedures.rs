// crates/fd_pipeline/tests/procedures.rs
//! Every built-in procedure autoplayed to completion through `run_scenario`.

use chrono::{TimeZone, Utc};
use fd_core::{PlayerId, Share, Span};
use fd_io::scenario::parse_scenario;
use fd_pipeline::{run_scenario_with_clock, AlgorithmRegistry, DriverError, DriverEvent, FixedClock, RunOutcome};

const EPS: f64 = 1e-6;

fn run(json: &str) -> Result<RunOutcome, DriverError> {
    let scenario = parse_scenario(json.as_bytes()).unwrap();
    let registry = AlgorithmRegistry::standard().unwrap();
    run_scenario_with_clock(&scenario, &registry, FixedClock(Utc.with_ymd_and_hms(2025, 5, 4, 8, 0, 0).unwrap()))
}

fn own_value(outcome: &RunOutcome, n: usize) -> f64 {
    let p = PlayerId::numbered(n);
    outcome.result.values[&p][&p]
}

fn notices(outcome: &RunOutcome) -> Vec<&str> {
    outcome
        .events
        .iter()
        .filter_map(|e| match e {
            DriverEvent::Notice { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

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

#[test]
fn divide_and_choose_splits_identical_valuations_equally() {
    let out = run(SCENARIO_A).unwrap();
    let f = &out.result.fairness;
    assert!((own_value(&out, 1) - 50.0).abs() < EPS);
    assert!((own_value(&out, 2) - 50.0).abs() < EPS);
    assert!(f.proportional.satisfied);
    assert!(f.envy_free.satisfied);
    assert!(f.equitable.satisfied);
    assert!((f.efficiency.percent - 50.0).abs() < EPS);
    assert!((f.score - 87.5).abs() < EPS);
    assert!(out.result.id.starts_with("RES:"));
}

#[test]
fn preset_cut_is_used_by_the_divider() {
    let json = SCENARIO_A.replacen("\"players\"", "\"cuts\": [400], \"players\"", 1);
    let out = run(&json).unwrap();
    let p1 = PlayerId::numbered(1);
    let p2 = PlayerId::numbered(2);
    // At x=400 the right piece is worth slightly more, so P2 takes it.
    assert_eq!(out.result.allocation.share(&p1), Some(&Share::piece(Span { start: 0.0, end: 400.0 })));
    assert_eq!(out.result.allocation.share(&p2), Some(&Share::piece(Span { start: 400.0, end: 800.0 })));
    assert!(own_value(&out, 2) > own_value(&out, 1));
    assert!(out.result.fairness.envy_free.violations.iter().all(|v| v.evaluator == p1));
}

#[test]
fn steinhaus_case_a_gives_everyone_a_third() {
    let json = r#"{
        "algorithm": "steinhaus-lone-divider",
        "player_count": 3,
        "regions": [
            {"id": "l", "shape": {"kind": "span", "start": 0,   "end": 300}},
            {"id": "m", "shape": {"kind": "span", "start": 300, "end": 600}},
            {"id": "r", "shape": {"kind": "span", "start": 600, "end": 900}}
        ],
        "players": {
            "P1": {"l": 34, "m": 33, "r": 33},
            "P2": {"l": 60, "m": 20, "r": 20},
            "P3": {"l": 20, "m": 20, "r": 60}
        },
        "params": {"axis_length": 900}
    }"#;
    let out = run(json).unwrap();
    assert!(notices(&out).iter().any(|n| n.starts_with("case A")));
    assert!(out.result.fairness.proportional.satisfied);
    assert_eq!(out.result.allocation.len(), 3);
    assert!(own_value(&out, 2) > 50.0);
    assert!(own_value(&out, 3) > 50.0);
}

#[test]
fn steinhaus_case_b_redivides_the_contested_part() {
    let json = r#"{
        "algorithm": "steinhaus-lone-divider",
        "player_count": 3,
        "regions": [
            {"id": "l", "shape": {"kind": "span", "start": 0,   "end": 300}},
            {"id": "m", "shape": {"kind": "span", "start": 300, "end": 600}},
            {"id": "r", "shape": {"kind": "span", "start": 600, "end": 900}}
        ],
        "players": {
            "P1": {"l": 30, "m": 40, "r": 30},
            "P2": {"l": 10, "m": 80, "r": 10},
            "P3": {"l": 10, "m": 80, "r": 10}
        },
        "params": {"axis_length": 900}
    }"#;
    let out = run(json).unwrap();
    assert!(notices(&out).iter().any(|n| n.starts_with("case B")));

    let p1 = PlayerId::numbered(1);
    match out.result.allocation.share(&p1) {
        Some(Share::Segments { pieces }) => {
            assert_eq!(pieces.len(), 1);
            assert_eq!(pieces[0].start, 0.0);
            assert!((pieces[0].end - 325.0).abs() < EPS);
        }
        other => panic!("unexpected share for P1: {other:?}"),
    }
    assert!((own_value(&out, 1) - 100.0 / 3.0).abs() < EPS);
    assert!((own_value(&out, 2) - 125.0 / 3.0).abs() < EPS);
    assert!((own_value(&out, 3) - 125.0 / 3.0).abs() < EPS);
    assert!(out.result.fairness.proportional.satisfied);
}

#[test]
fn moving_knife_gives_both_players_half() {
    let json = r#"{
        "algorithm": "austin-moving-knife",
        "player_count": 2,
        "regions": [
            {"id": "a", "shape": {"kind": "span", "start": 0,   "end": 400}},
            {"id": "b", "shape": {"kind": "span", "start": 400, "end": 800}}
        ],
        "players": {
            "P1": {"a": 50, "b": 50},
            "P2": {"a": 80, "b": 20}
        }
    }"#;
    let out = run(json).unwrap();
    assert!((own_value(&out, 1) - 50.0).abs() < EPS);
    assert!((own_value(&out, 2) - 50.0).abs() < EPS);
    assert!(out.result.fairness.equitable.satisfied);
    assert!(out.result.fairness.envy_free.satisfied);
}

#[test]
fn lucas_markers_with_identical_players_hands_out_thirds() {
    let json = r#"{
        "algorithm": "lucas-markers",
        "player_count": 3,
        "regions": [{"id": "all", "shape": {"kind": "span", "start": 0, "end": 900}}],
        "players": {"P1": {"all": 100}, "P2": {"all": 100}, "P3": {"all": 100}},
        "params": {"axis_length": 900}
    }"#;
    let out = run(json).unwrap();
    for (n, start) in [(1, 0.0), (2, 300.0), (3, 600.0)] {
        match out.result.allocation.share(&PlayerId::numbered(n)) {
            Some(Share::Segments { pieces }) => {
                assert!((pieces[0].start - start).abs() < EPS);
                assert!((pieces[0].end - (start + 300.0)).abs() < EPS);
            }
            other => panic!("unexpected share: {other:?}"),
        }
        assert!((own_value(&out, n) - 100.0 / 3.0).abs() < EPS);
    }
    assert!(out.result.fairness.proportional.satisfied);
}

#[test]
fn knaster_settles_with_cash() {
    let json = r#"{
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
    let out = run(json).unwrap();
    let f = &out.result.fairness;
    assert!((own_value(&out, 1) - 65.0).abs() < EPS);
    assert!((own_value(&out, 2) - 65.0).abs() < EPS);
    assert!(f.envy_free.satisfied);
    assert!((f.efficiency.percent - 65.0).abs() < EPS);
    assert!((f.score - 91.25).abs() < EPS);
}

#[test]
fn wrong_player_count_is_a_configuration_error() {
    let json = SCENARIO_A.replace("\"player_count\": 2", "\"player_count\": 3");
    assert!(matches!(run(&json), Err(DriverError::Configuration(_))));
}

#[test]
fn completion_is_the_last_event() {
    let out = run(SCENARIO_A).unwrap();
    match out.events.last() {
        Some(DriverEvent::Completed { result_id, .. }) => assert_eq!(result_id.as_deref(), Some(out.result.id.as_str())),
        other => panic!("unexpected last event: {other:?}"),
    }
    let entered = out.events.iter().filter(|e| matches!(e, DriverEvent::StepEntered { .. })).count();
    assert_eq!(entered, 3);
}
