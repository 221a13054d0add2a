//! Strategy contracts on small hand-built training sets.

use super::solution::{distortion, has_converged, Solution};
use super::*;
use crate::errors::VqErrorCode;
use crate::vector::{kahan_mean, Vector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const EPS: f64 = 1e-6;

fn v1(x: f32) -> Vector {
    Vector::from_vec(vec![x])
}

/// Four tight 1-D clusters around 10, 20, 30, 40.
fn four_clusters() -> Vec<Vector> {
    [10.0, 20.0, 30.0, 40.0]
        .iter()
        .flat_map(|c| [-0.1, 0.0, 0.1].map(|d| v1(c + d)))
        .collect()
}

fn random_set(seed: u64, n: usize, dim: usize) -> Vec<Vector> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| Vector::from_vec((0..dim).map(|_| rng.gen_range(0.0..1.0)).collect()))
        .collect()
}

fn mean_distortion(ts: &[Vector]) -> f64 {
    let mean = kahan_mean(ts[0].dim(), ts).unwrap();
    distortion(ts, &[mean], &vec![0; ts.len()])
}

fn all_strategies() -> Vec<Box<dyn Quantizer>> {
    let bee = BeeColonyParams {
        colony_size: 4,
        cycles: 3,
        ..Default::default()
    };
    QuantizerKind::ALL
        .iter()
        .map(|k| k.build(RefineOptions::default(), bee))
        .collect()
}

// ------------------------------------------------------------------
// Shared contract
// ------------------------------------------------------------------

#[test]
fn every_strategy_respects_shape_contract() {
    let ts = random_set(1, 300, 12);
    for q in all_strategies() {
        for bits in [0, 1, 3] {
            let out = q.quantize(&ts, bits, EPS).unwrap();
            assert!(out.codebook.len() <= 1 << bits);
            assert_eq!(out.assignment.len(), ts.len());
            assert!(out.assignment.iter().all(|&a| a < out.codebook.len()));
            assert!(out.codebook.iter().all(|c| c.dim() == 12));
            assert!(out.distortion >= 0.0);
        }
    }
}

#[test]
fn reported_distortion_matches_assignment() {
    let ts = random_set(2, 200, 6);
    for q in all_strategies() {
        let out = q.quantize(&ts, 2, EPS).unwrap();
        let recomputed = distortion(&ts, &out.codebook, &out.assignment);
        assert!((out.distortion - recomputed).abs() < 1e-9);
    }
}

#[test]
fn lbg_family_fills_power_of_two_codebook() {
    let ts = random_set(3, 120, 3);
    let opts = RefineOptions::default();
    for bits in 0..5 {
        assert_eq!(Lbg::new(opts.clone()).quantize(&ts, bits, EPS).unwrap().codebook.len(), 1 << bits);
        assert_eq!(
            LbgMedianCut::new(opts.clone()).quantize(&ts, bits, EPS).unwrap().codebook.len(),
            1 << bits
        );
    }
}

#[test]
fn lbg_keeps_size_with_fewer_vectors_than_codewords() {
    let ts = vec![v1(0.0), v1(10.0), v1(20.0)];
    let out = Lbg::default().quantize(&ts, 3, EPS).unwrap();
    assert_eq!(out.codebook.len(), 8);
    assert_eq!(out.assignment.len(), 3);

    let seeded = LbgMedianCut::default().quantize(&ts, 3, EPS).unwrap();
    assert_eq!(seeded.codebook.len(), 8);
}

// ------------------------------------------------------------------
// Preconditions
// ------------------------------------------------------------------

#[test]
fn tiny_training_sets_are_rejected() {
    for q in all_strategies() {
        let err = q.quantize(&[], 1, EPS).unwrap_err();
        assert_eq!(err.code(), VqErrorCode::Precondition);
        let err = q.quantize(&[v1(1.0)], 1, EPS).unwrap_err();
        assert_eq!(err.code(), VqErrorCode::Precondition);
    }
}

#[test]
fn mismatched_dimensions_are_rejected() {
    let ts = vec![v1(1.0), Vector::from_vec(vec![1.0, 2.0])];
    for q in all_strategies() {
        assert_eq!(q.quantize(&ts, 1, EPS).unwrap_err().code(), VqErrorCode::Precondition);
    }
}

#[test]
fn oversized_exponent_is_rejected() {
    let ts = four_clusters();
    let err = Lbg::default().quantize(&ts, MAX_BITS + 1, EPS).unwrap_err();
    assert_eq!(err.code(), VqErrorCode::Precondition);
}

// ------------------------------------------------------------------
// LBG
// ------------------------------------------------------------------

#[test]
fn lbg_separates_clusters() {
    let ts = four_clusters();
    let out = Lbg::default().quantize(&ts, 2, EPS).unwrap();
    assert!(out.distortion < 0.01, "distortion {}", out.distortion);
    let mut centres: Vec<f32> = out.codebook.iter().map(|c| c[0]).collect();
    centres.sort_by(f32::total_cmp);
    for (got, want) in centres.iter().zip([10.0, 20.0, 30.0, 40.0]) {
        assert!((got - want).abs() < 1e-3);
    }
}

#[test]
fn refinement_never_increases_distortion() {
    let ts = random_set(4, 400, 4);
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let start: Vec<Vector> = ts.iter().take(8).cloned().collect();
    let mut solution = Solution::new(&ts, start);
    let opts = RefineOptions::default().max_iterations(50);
    let trace = solution.refine(&opts, 0.0, &mut rng).unwrap();

    assert!(trace.iterations() >= 1);
    for pair in trace.distortions.windows(2) {
        assert!(pair[1] <= pair[0] * (1.0 + 1e-6), "{} -> {}", pair[0], pair[1]);
    }
}

#[test]
fn empty_clusters_are_reseeded() {
    let ts = four_clusters();
    let mut solution = Solution::new(&ts, vec![v1(25.0), v1(1000.0)]);
    solution.assign().unwrap();
    assert!(solution.assignment.iter().all(|&a| a == 0));

    let mut rng = ChaCha8Rng::seed_from_u64(5);
    assert_eq!(solution.update_centroids(&mut rng), 1);
    assert_eq!(solution.codebook.len(), 2);
    assert!(ts.contains(&solution.codebook[1]));
}

#[test]
fn iteration_cap_is_a_normal_stop() {
    let ts = random_set(6, 200, 3);
    let opts = RefineOptions::default().max_iterations(1);
    let out = Lbg::new(opts).quantize(&ts, 3, 0.0).unwrap();
    assert_eq!(out.codebook.len(), 8);
}

#[test]
fn zero_distortion_counts_as_converged() {
    assert!(has_converged(0.0, 0.0, EPS));
    assert!(has_converged(10.0, 10.0, EPS));
    assert!(!has_converged(10.0, 5.0, EPS));
    assert!(has_converged(10.0, 9.999_999_99, EPS));
}

// ------------------------------------------------------------------
// Median Cut
// ------------------------------------------------------------------

#[test]
fn median_cut_emits_leaf_means() {
    let ts: Vec<Vector> = (0..8).rev().map(|i| v1(i as f32)).collect();
    let out = MedianCut::new().quantize(&ts, 2, EPS).unwrap();
    let centres: Vec<f32> = out.codebook.iter().map(|c| c[0]).collect();
    assert_eq!(centres, vec![0.5, 2.5, 4.5, 6.5]);
    assert!((out.distortion - 0.25).abs() < 1e-9);
}

#[test]
fn median_cut_splits_widest_axis() {
    // spread along axis 1 only
    let ts: Vec<Vector> = (0..4)
        .map(|i| Vector::from_vec(vec![1.0, i as f32 * 10.0]))
        .collect();
    let out = MedianCut::new().quantize(&ts, 1, EPS).unwrap();
    assert_eq!(out.codebook[0].as_slice(), &[1.0, 5.0]);
    assert_eq!(out.codebook[1].as_slice(), &[1.0, 25.0]);
}

#[test]
fn median_cut_stops_on_singletons() {
    let ts = vec![v1(0.0), v1(1.0), v1(2.0)];
    let out = MedianCut::new().quantize(&ts, 3, EPS).unwrap();
    assert_eq!(out.codebook.len(), 3);
    assert_eq!(out.distortion, 0.0);
}

#[test]
fn seeded_lbg_starts_from_median_cut() {
    let ts = four_clusters();
    let out = LbgMedianCut::default().quantize(&ts, 2, EPS).unwrap();
    assert!(out.distortion < 0.01);
}

// ------------------------------------------------------------------
// Bee colony
// ------------------------------------------------------------------

#[test]
fn bee_colony_beats_single_mean() {
    let ts = random_set(7, 150, 3);
    let params = BeeColonyParams {
        colony_size: 6,
        cycles: 5,
        ..Default::default()
    };
    let out = BeeColony::new(RefineOptions::default(), params)
        .quantize(&ts, 2, EPS)
        .unwrap();
    assert_eq!(out.codebook.len(), 4);
    assert!(out.distortion <= mean_distortion(&ts));
}

#[test]
fn bee_colony_needs_a_population() {
    let params = BeeColonyParams {
        colony_size: 0,
        ..Default::default()
    };
    let err = BeeColony::new(RefineOptions::default(), params)
        .quantize(&four_clusters(), 1, EPS)
        .unwrap_err();
    assert_eq!(err.code(), VqErrorCode::Precondition);
}

#[test]
fn partner_differs_from_self() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for own in 0..5 {
        for _ in 0..50 {
            let p = super::bee_colony::pick_partner(own, 5, &mut rng);
            assert_ne!(p, own);
            assert!(p < 5);
        }
    }
    assert_eq!(super::bee_colony::pick_partner(0, 1, &mut rng), 0);
}

// ------------------------------------------------------------------
// Determinism and cancellation
// ------------------------------------------------------------------

#[test]
fn same_seed_same_result() {
    let ts = random_set(8, 250, 6);
    for kind in QuantizerKind::ALL {
        let opts = RefineOptions::default().seed(77);
        let bee = BeeColonyParams {
            colony_size: 4,
            cycles: 3,
            ..Default::default()
        };
        let a = kind.build(opts.clone(), bee).quantize(&ts, 3, EPS).unwrap();
        let b = kind.build(opts, bee).quantize(&ts, 3, EPS).unwrap();
        assert_eq!(a, b, "{kind} is not reproducible");
    }
}

#[test]
fn cancelled_token_aborts_iterative_strategies() {
    let ts = random_set(9, 100, 3);
    let token = CancelToken::new();
    token.cancel();
    let opts = RefineOptions::default().cancel(token);
    for kind in [QuantizerKind::Lbg, QuantizerKind::LbgMedianCut, QuantizerKind::BeeColony] {
        let err = kind
            .build(opts.clone(), BeeColonyParams::default())
            .quantize(&ts, 2, EPS)
            .unwrap_err();
        assert_eq!(err.code(), VqErrorCode::Cancelled);
    }
}

// ------------------------------------------------------------------
// Kind parsing
// ------------------------------------------------------------------

#[test]
fn kinds_parse_by_name_and_id() {
    for kind in QuantizerKind::ALL {
        assert_eq!(kind.name().parse::<QuantizerKind>().unwrap(), kind);
        assert_eq!(kind.id().to_string().parse::<QuantizerKind>().unwrap(), kind);
    }
    assert_eq!("ABC".parse::<QuantizerKind>().unwrap(), QuantizerKind::BeeColony);
    assert_eq!("lbg_median_cut".parse::<QuantizerKind>().unwrap(), QuantizerKind::LbgMedianCut);
    assert_eq!(
        "kmeans".parse::<QuantizerKind>().unwrap_err().code(),
        VqErrorCode::InvalidConfig
    );
}
