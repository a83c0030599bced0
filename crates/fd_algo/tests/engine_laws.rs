//! Engine laws (property tests) and the reference demo scenarios.

use proptest::prelude::*;

use fd_algo::{
    analyze_fairness, cut_to_pieces, piece_value, player_value, region_distribution,
    region_overlap_percent, split_point, CalculationEngine,
};
use fd_core::{Allocation, Params, PlayerId, Region, RegionId, RegionSet, Share, Span, Valuation, Valuations};

const AXIS: f64 = 800.0;

fn rid(s: &str) -> RegionId { s.parse().unwrap() }

/// The six-colour demo board.
fn demo_regions() -> RegionSet {
    let spans = [
        ("blue", 0.0, 600.0),
        ("red", 600.0, 800.0),
        ("green", 150.0, 600.0),
        ("orange", 600.0, 800.0),
        ("pink", 0.0, 150.0),
        ("purple", 150.0, 800.0),
    ];
    RegionSet::new(spans.iter().map(|(id, s, e)| Region::span(rid(id), *s, *e).unwrap()).collect()).unwrap()
}

fn demo_valuation() -> Valuation {
    Valuation::from_points([
        (rid("blue"), 20.0),
        (rid("red"), 15.0),
        (rid("green"), 25.0),
        (rid("orange"), 10.0),
        (rid("pink"), 15.0),
        (rid("purple"), 15.0),
    ])
}

fn region_strategy() -> impl Strategy<Value = (f64, f64)> {
    (0u32..800).prop_flat_map(|a| (Just(a as f64), ((a + 1)..=800).prop_map(|b| b as f64)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn pieces_cover_the_axis(cuts in prop::collection::vec(0u32..=800, 0..6)) {
        let cuts: Vec<f64> = cuts.into_iter().map(f64::from).collect();
        let pieces = cut_to_pieces(&cuts, AXIS).unwrap();
        prop_assert_eq!(pieces.len(), cuts.len() + 1);
        let total: f64 = pieces.iter().map(|p| p.width()).sum();
        prop_assert_eq!(total, AXIS);
        for w in pieces.windows(2) {
            prop_assert_eq!(w[0].end, w[1].start);
        }
    }

    #[test]
    fn whole_piece_covers_every_region((a, b) in region_strategy()) {
        let region = Region::span(rid("r"), a, b).unwrap();
        let whole = Span::new(0.0, AXIS).unwrap();
        prop_assert_eq!(region_overlap_percent(&whole, &region).unwrap(), 100.0);
    }

    #[test]
    fn one_cut_partitions_each_region((a, b) in region_strategy(), cut in 0u32..=800) {
        let regions = RegionSet::new(vec![Region::span(rid("r"), a, b).unwrap()]).unwrap();
        let pieces = cut_to_pieces(&[f64::from(cut)], AXIS).unwrap();
        let left = region_distribution(&pieces[0], &regions).unwrap();
        let right = region_distribution(&pieces[1], &regions).unwrap();
        let sum = left[&rid("r")] + right[&rid("r")];
        prop_assert!((sum - 100.0).abs() < 1e-9, "sum = {}", sum);
    }

    #[test]
    fn player_value_is_linear(start in 0u32..800, len in 0u32..800, k in 0.1f64..10.0) {
        let end = (start + len).min(800);
        let piece = Span::new(f64::from(start), f64::from(end)).unwrap();
        let regions = demo_regions();
        let dist = region_distribution(&piece, &regions).unwrap();
        let v = demo_valuation();
        let base = player_value(&dist, &v);
        let scaled = player_value(&dist, &v.scaled(k));
        prop_assert!((scaled - k * base).abs() < 1e-9 * (1.0 + k * base.abs()));
    }

    #[test]
    fn fairness_analysis_is_idempotent(cut in 1u32..800) {
        let mut engine = CalculationEngine::new(demo_regions(), Params::default());
        let pieces = engine.cut_to_pieces(&[f64::from(cut)]).unwrap();
        let p1 = PlayerId::numbered(1);
        let p2 = PlayerId::numbered(2);
        let alloc: Allocation = [
            (p1.clone(), Share::piece(pieces[0])),
            (p2.clone(), Share::piece(pieces[1])),
        ].into_iter().collect();
        let vals: Valuations = [(p1, demo_valuation()), (p2, demo_valuation())].into_iter().collect();

        let first = engine.analyze(&alloc, &vals, 2).unwrap();
        let second = engine.analyze(&alloc, &vals, 2).unwrap();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn midpoint_cut_on_demo_board() {
    let regions = demo_regions();
    let v = demo_valuation();
    let pieces = cut_to_pieces(&[400.0], AXIS).unwrap();
    let left = piece_value(&pieces[0], &regions, &v).unwrap();
    let right = piece_value(&pieces[1], &regions, &v).unwrap();

    let expected_left = 20.0 * 400.0 / 600.0 + 25.0 * 250.0 / 450.0 + 15.0 + 15.0 * 250.0 / 650.0;
    assert!((left - expected_left).abs() < 1e-9);
    assert!((left + right - 100.0).abs() < 1e-9);
}

#[test]
fn balanced_cut_is_equitable_for_identical_players() {
    let regions = demo_regions();
    let v = demo_valuation();
    let whole = [Span::new(0.0, AXIS).unwrap()];
    let cut = split_point(&whole, &regions, &v, 50.0).unwrap().position;
    assert!(cut > 400.0 && cut < 450.0, "cut = {cut}");

    let pieces = cut_to_pieces(&[cut], AXIS).unwrap();
    let left = piece_value(&pieces[0], &regions, &v).unwrap();
    let right = piece_value(&pieces[1], &regions, &v).unwrap();
    assert!((left - right).abs() < Params::default().envy_tolerance);

    let p1 = PlayerId::numbered(1);
    let p2 = PlayerId::numbered(2);
    let alloc: Allocation = [
        (p1.clone(), Share::piece(pieces[0])),
        (p2.clone(), Share::piece(pieces[1])),
    ]
    .into_iter()
    .collect();
    let vals: Valuations = [(p1, v.clone()), (p2, v)].into_iter().collect();
    let mut engine = CalculationEngine::new(regions, Params::default());
    let matrix = engine.value_matrix(&alloc, &vals).unwrap();
    let report = analyze_fairness(&alloc, &matrix, 2, &Params::default()).unwrap();
    assert!(report.equitable.satisfied);
    assert!(report.proportional.satisfied);
    assert!(report.envy_free.satisfied);
}

#[test]
fn duplicate_cuts_give_a_worthless_piece() {
    let regions = demo_regions();
    let pieces = cut_to_pieces(&[400.0, 400.0], AXIS).unwrap();
    assert_eq!(pieces.len(), 3);
    let zero = pieces.iter().find(|p| p.width() == 0.0).unwrap();

    let dist = region_distribution(zero, &regions).unwrap();
    assert_eq!(player_value(&dist, &demo_valuation()), 0.0);
    let lopsided = Valuation::from_points([(rid("blue"), 100.0)]);
    assert_eq!(player_value(&dist, &lopsided), 0.0);
}
