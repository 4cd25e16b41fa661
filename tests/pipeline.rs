//! End-to-end runs through the `D8Accumulator` facade.

use downstream::{
    AccumulatorConfig, CodePolicy, D8Accumulator, D8Convention, FlowError, GeoTransform, ImpactConfig,
    PointSource,
};
use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Eight cells draining into the bottom-centre sink.
fn funnel() -> Array2<u8> {
    array![[4, 4, 4], [2, 4, 8], [1, 0, 16]]
}

/// Two headwaters joining at (1, 2) and running south to (3, 2).
fn y_river() -> Array2<u8> {
    array![
        [0, 2, 0, 8, 0],
        [0, 0, 4, 0, 0],
        [0, 0, 4, 0, 0],
        [0, 0, 0, 0, 0],
    ]
}

fn georeferenced_y_river() -> D8Accumulator {
    let gt = GeoTransform::new(0.0, 40.0, 10.0, -10.0).unwrap();
    D8Accumulator::with_geotransform(&y_river(), gt, AccumulatorConfig::default()).unwrap()
}

/// Every cell drains S, SE or SW, so the network is acyclic and the bottom row
/// is the only set of outlets.
fn random_southward(rows: usize, cols: usize, seed: u64) -> Array2<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| [2u8, 4, 8][rng.gen_range(0..3)])
}

#[test]
fn test_funnel_single_outlet() {
    let acc = D8Accumulator::from_array(&funnel(), AccumulatorConfig::default()).unwrap();
    assert_eq!(acc.baselevel_nodes(), &[7]);
    assert_eq!(acc.order()[0], 7);
    assert_eq!(acc.order().len(), 9);

    let counts = acc.accumulate(None).unwrap();
    assert_eq!(counts[[2, 1]], 9.0);
    assert_eq!(counts[[1, 1]], 2.0);
    assert_eq!(counts[[0, 0]], 1.0);
}

#[test]
fn test_whitebox_funnel_matches_esri() {
    let whitebox = array![[8u8, 8, 8], [4, 8, 16], [2, 0, 32]];
    let cfg = AccumulatorConfig { convention: D8Convention::Whitebox, ..Default::default() };
    let wb = D8Accumulator::from_array(&whitebox, cfg).unwrap();
    let esri = D8Accumulator::from_array(&funnel(), AccumulatorConfig::default()).unwrap();
    assert_eq!(wb.receivers(), esri.receivers());
    assert_eq!(wb.accumulate(None).unwrap(), esri.accumulate(None).unwrap());
}

#[test]
fn test_random_grid_conserves_weight() {
    let (rows, cols) = (40, 25);
    let acc = D8Accumulator::from_array(&random_southward(rows, cols, 7), AccumulatorConfig::default()).unwrap();
    assert_eq!(acc.baselevel_nodes().len(), cols);

    let mut rng = StdRng::seed_from_u64(11);
    let weights = Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0.0..5.0));
    let total: f64 = weights.sum();
    let out = acc.accumulate(Some(weights.view())).unwrap();

    let at_outlets: f64 = acc
        .baselevel_nodes()
        .iter()
        .map(|&n| {
            let (r, c) = acc.node_to_rowcol(n).unwrap();
            out[[r, c]]
        })
        .sum();
    assert!((at_outlets - total).abs() < 1e-6 * total);

    // Nothing holds less than it receives locally.
    for (o, w) in out.iter().zip(weights.iter()) {
        assert!(o >= w);
    }
}

#[test]
fn test_rebuild_is_deterministic() {
    let codes = random_southward(30, 30, 3);
    let a = D8Accumulator::from_array(&codes, AccumulatorConfig::default()).unwrap();
    let b = D8Accumulator::from_array(&codes, AccumulatorConfig::default()).unwrap();
    assert_eq!(a.order(), b.order());
    assert_eq!(a.accumulate(None).unwrap(), b.accumulate(None).unwrap());
}

#[test]
fn test_invalid_codes_by_policy() {
    let codes = array![[0i32, 3], [0, 0]];
    assert!(matches!(
        D8Accumulator::from_array(&codes, AccumulatorConfig::default()),
        Err(FlowError::InvalidDirectionCode { row: 0, col: 1, code: 3 })
    ));

    let acc = D8Accumulator::from_array(&codes, AccumulatorConfig::lenient()).unwrap();
    assert_eq!(acc.config.code_policy, CodePolicy::Lenient);
    assert_eq!(acc.codes()[[0, 1]], 0);
    assert_eq!(acc.baselevel_nodes().len(), 4);
}

#[test]
fn test_facing_neighbours_are_rejected() {
    // (1, 1) points E and (1, 2) points W: valid codes, no outlet between them.
    let codes = array![[0u8, 0, 0, 0], [0, 1, 16, 0], [0, 0, 0, 0]];
    assert!(matches!(
        D8Accumulator::from_array(&codes, AccumulatorConfig::default()),
        Err(FlowError::CyclicReceivers { unvisited: 2 })
    ));

    let mut acc = D8Accumulator::from_array(&funnel(), AccumulatorConfig::default()).unwrap();
    assert!(acc.set_codes(&codes).is_err());
    assert_eq!(acc.baselevel_nodes(), &[7]);
}

#[test]
fn test_set_codes_replaces_network_and_drops_georef() {
    let mut acc = georeferenced_y_river();
    assert!(acc.transform().is_some());

    // A failed replace leaves everything as it was.
    assert!(acc.set_codes(&array![[5u8]]).is_err());
    assert_eq!(acc.shape(), (4, 5));
    assert!(acc.transform().is_some());

    acc.set_codes(&funnel()).unwrap();
    assert_eq!(acc.shape(), (3, 3));
    assert_eq!(acc.baselevel_nodes(), &[7]);
    assert!(acc.transform().is_none());
    assert!(matches!(acc.dx(), Err(FlowError::MissingGeoTransform)));
}

#[test]
fn test_source_impact_end_to_end() {
    let acc = georeferenced_y_river();
    let sources = vec![
        PointSource::new("west", 15.0, 35.0),
        PointSource::new("east", 35.0, 35.0),
    ];

    let impact = acc.downstream_impact(&sources).unwrap();
    assert_eq!(impact[[0, 1]], 1.0);
    assert_eq!(impact[[1, 2]], 2.0);
    assert_eq!(impact[[3, 2]], 2.0);
    assert_eq!(impact.sum(), 1.0 + 1.0 + 2.0 + 2.0 + 2.0);

    let segments = acc.impacted_segments(&sources, &ImpactConfig::default()).unwrap();
    assert_eq!(segments, vec![vec![17, 12, 7], vec![7, 1], vec![7, 3]]);

    let reaches = acc.impacted_channels(&sources, &ImpactConfig::default()).unwrap();
    assert_eq!(
        reaches,
        vec![
            vec![(25.0, 5.0), (25.0, 15.0), (25.0, 25.0)],
            vec![(25.0, 25.0), (15.0, 35.0)],
            vec![(25.0, 25.0), (35.0, 35.0)],
        ]
    );

    let (count, _) = acc.count_upstream_sources(&sources, 25.0, 5.0).unwrap();
    assert_eq!(count, 2);
    let upstream = acc.upstream_sources(&sources, 15.0, 35.0).unwrap();
    assert_eq!(upstream.len(), 1);
    assert_eq!(upstream[0].name, "west");
}

#[test]
fn test_profile_to_outlet() {
    let acc = georeferenced_y_river();
    let start = acc.coord_to_node(15.0, 35.0).unwrap();
    let profile = acc.profile(start).unwrap();
    assert_eq!(profile.nodes, vec![1, 7, 12, 17]);
    assert_eq!(profile.mouth(), Some(17));
    let expected = 2.0_f64.sqrt() * 10.0 + 20.0;
    assert!((profile.length() - expected).abs() < 1e-9);
    assert_eq!(*profile.distance.last().unwrap(), 0.0);
}
