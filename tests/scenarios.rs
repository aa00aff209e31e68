use approx::assert_relative_eq;
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Contains, EuclideanDistance};
use geo_makevalid::{make_valid, Classifier, Classify, Label, MakeValid, Pt};
use geo_types::{Coord, Line, LineString, MultiPolygon, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn pt(x: f64, y: f64) -> Pt {
    Coord { x, y }
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Pt> {
    vec![pt(x0, y0), pt(x1, y0), pt(x1, y1), pt(x0, y1)]
}

fn overlapping_squares() -> (Classifier, Vec<LineString<f64>>) {
    let a = rect(0.0, 0.0, 4.0, 4.0);
    let b = rect(2.0, 2.0, 6.0, 6.0);
    let classifier = Classifier::new().with_ring(Label::Inside, &a).with_ring(Label::Inside, &b);
    (classifier, vec![LineString::from(a), LineString::from(b)])
}

fn number_eight() -> (Classifier, Vec<LineString<f64>>) {
    let rings = vec![rect(0.0, 0.0, 10.0, 6.0), rect(2.0, 2.0, 4.0, 4.0), rect(6.0, 2.0, 8.0, 4.0)];
    let classifier = Classifier::from_rings(&rings);
    (classifier, rings.into_iter().map(LineString::from).collect())
}

fn ring_lines(mp: &MultiPolygon<f64>) -> Vec<Line<f64>> {
    mp.iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .flat_map(|ls| ls.lines())
        .collect()
}

fn signed(ls: &LineString<f64>) -> f64 {
    geo_types::Polygon::new(ls.clone(), vec![]).signed_area()
}

/// Shared structural checks: closed rings, no repeated neighbours, consistent winding,
/// no proper crossings anywhere.
fn assert_well_formed(mp: &MultiPolygon<f64>) {
    for poly in mp.iter() {
        assert!(signed(poly.exterior()) > 0.0, "exterior must be counter-clockwise");
        for hole in poly.interiors() {
            assert!(signed(hole) < 0.0, "holes must be clockwise");
        }
        for ls in std::iter::once(poly.exterior()).chain(poly.interiors()) {
            assert!(ls.is_closed());
            assert!(ls.0.len() >= 4);
            for w in ls.0.windows(2) {
                assert_ne!(w[0], w[1]);
            }
        }
    }

    let lines = ring_lines(mp);
    for (i, a) in lines.iter().enumerate() {
        for b in &lines[i + 1..] {
            if let Some(LineIntersection::SinglePoint {
                is_proper: true,
                intersection,
            }) = line_intersection(*a, *b)
            {
                panic!("edges {:?} and {:?} cross at {:?}", a, b, intersection);
            }
        }
    }
}

/// Half-integer points never fall on the integer edges used here.
fn assert_preserves_labels(classifier: &Classifier, mp: &MultiPolygon<f64>, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..400 {
        let x = rng.gen_range(-4..14) as f64 + 0.5;
        let y = rng.gen_range(-4..10) as f64 + 0.5;
        let expected = classifier.label_for(pt(x, y)) == Label::Inside;
        assert_eq!(mp.contains(&Point::new(x, y)), expected, "label mismatch at ({}, {})", x, y);
    }
}

#[test]
fn test_simple_square() {
    let square = rect(0.0, 0.0, 4.0, 4.0);
    let classifier = Classifier::new().with_ring(Label::Inside, &square);
    let mp = make_valid(&classifier, None, &[LineString::from(square.clone())]).unwrap();

    assert_eq!(mp.0.len(), 1);
    let mut expected = square;
    expected.push(pt(0.0, 0.0));
    assert_eq!(mp.0[0].exterior().0, expected);
    assert_well_formed(&mp);
    assert_preserves_labels(&classifier, &mp, 1);
}

#[test]
fn test_overlapping_squares_union() {
    let (classifier, fragments) = overlapping_squares();
    let mp = make_valid(&classifier, None, &fragments).unwrap();

    assert_eq!(mp.0.len(), 1);
    let poly = &mp.0[0];
    assert!(poly.interiors().is_empty());
    assert_eq!(
        poly.exterior().0,
        vec![
            pt(0.0, 0.0),
            pt(4.0, 0.0),
            pt(4.0, 2.0),
            pt(6.0, 2.0),
            pt(6.0, 6.0),
            pt(2.0, 6.0),
            pt(2.0, 4.0),
            pt(0.0, 4.0),
            pt(0.0, 0.0),
        ]
    );
    assert_relative_eq!(mp.unsigned_area(), 28.0);
    assert_well_formed(&mp);
    assert_preserves_labels(&classifier, &mp, 2);
}

#[test]
fn test_number_eight_has_two_holes() {
    let (classifier, fragments) = number_eight();
    let mp = make_valid(&classifier, None, &fragments).unwrap();

    assert_eq!(mp.0.len(), 1);
    let poly = &mp.0[0];
    assert_eq!(poly.interiors().len(), 2);
    assert_eq!(poly.exterior().0[0], pt(0.0, 0.0));
    let mut firsts: Vec<Pt> = poly.interiors().iter().map(|h| h.0[0]).collect();
    firsts.sort_by(|a, b| a.x.total_cmp(&b.x));
    assert_eq!(firsts, vec![pt(2.0, 2.0), pt(6.0, 2.0)]);
    assert_relative_eq!(mp.unsigned_area(), 52.0);
    assert_well_formed(&mp);
    assert_preserves_labels(&classifier, &mp, 3);
}

#[test]
fn test_lone_segment_yields_nothing() {
    let seg = vec![pt(0.0, 0.0), pt(3.0, 2.0)];
    let classifier = Classifier::new().with_ring(Label::Inside, &seg);
    let mp = make_valid(&classifier, None, &[LineString::from(seg)]).unwrap();
    assert!(mp.0.is_empty());
}

#[test]
fn test_repair_is_idempotent() {
    let (classifier, fragments) = overlapping_squares();
    let first = make_valid(&classifier, None, &fragments).unwrap();

    let reclassifier = Classifier::from_multi_polygon(&first);
    let refragments: Vec<LineString<f64>> = first
        .iter()
        .flat_map(|p| std::iter::once(p.exterior().clone()).chain(p.interiors().iter().cloned()))
        .collect();
    let second = make_valid(&reclassifier, None, &refragments).unwrap();

    assert_eq!(second.0.len(), first.0.len());
    assert_relative_eq!(second.unsigned_area(), first.unsigned_area());
    let sorted = |mp: &MultiPolygon<f64>| {
        let mut v: Vec<(f64, f64)> = mp
            .iter()
            .flat_map(|p| p.exterior().0.iter().map(|c| (c.x, c.y)))
            .collect();
        v.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        v.dedup();
        v
    };
    assert_eq!(sorted(&second), sorted(&first));
}

#[test]
fn test_parallelism_does_not_change_output() {
    let (classifier, fragments) = number_eight();
    let run = |threads| {
        MakeValid::new()
            .with_parallelism(threads)
            .make_valid(&classifier, None, &fragments)
            .unwrap()
    };
    let single = run(1);
    let many = run(4);
    let default = make_valid(&classifier, None, &fragments).unwrap();
    assert_eq!(single, many);
    assert_eq!(single, default);
}

#[test]
fn test_extent_and_margin_do_not_change_shape() {
    let (classifier, fragments) = overlapping_squares();
    let base = make_valid(&classifier, None, &fragments).unwrap();
    let extent = geo_types::Rect::new(pt(-50.0, -50.0), pt(50.0, 50.0));
    let wide = MakeValid::new()
        .with_margin(3.0)
        .make_valid(&classifier, Some(extent), &fragments)
        .unwrap();
    assert_eq!(base, wide);
}

const TILE: i32 = 4096;

fn closed_lines(rings: &[Vec<Pt>]) -> Vec<Line<f64>> {
    rings
        .iter()
        .flat_map(|r| (0..r.len()).map(move |i| Line::new(r[i], r[(i + 1) % r.len()])))
        .collect()
}

/// Samples the tile and its surroundings, skipping points close enough to an input edge
/// for grid snapping to move the boundary across them.
fn assert_labels_away_from_edges(
    classifier: &Classifier,
    rings: &[Vec<Pt>],
    mp: &MultiPolygon<f64>,
    rng: &mut StdRng,
) {
    let edges = closed_lines(rings);
    let mut checked = 0;
    for _ in 0..300 {
        let p = Point::new(
            rng.gen_range(-64..TILE + 64) as f64 + 0.5,
            rng.gen_range(-64..TILE + 64) as f64 + 0.5,
        );
        if edges.iter().any(|e| p.euclidean_distance(e) < 4.0) {
            continue;
        }
        checked += 1;
        let expected = classifier.label_for(p.0) == Label::Inside;
        assert_eq!(mp.contains(&p), expected, "label mismatch at {:?}", p);
    }
    assert!(checked > 0);
}

fn random_ring(rng: &mut StdRng) -> Vec<Pt> {
    let n = rng.gen_range(3..8);
    (0..n)
        .map(|_| pt(rng.gen_range(0..=TILE) as f64, rng.gen_range(0..=TILE) as f64))
        .collect()
}

fn tile_extent() -> geo_types::Rect<f64> {
    geo_types::Rect::new(pt(0.0, 0.0), pt(TILE as f64, TILE as f64))
}

#[test]
fn test_bowtie_splits_into_two_triangles() {
    let bowtie = vec![pt(0.0, 0.0), pt(4096.0, 4096.0), pt(4096.0, 0.0), pt(0.0, 4096.0)];
    let classifier = Classifier::new().with_ring(Label::Inside, &bowtie);
    let mp = make_valid(&classifier, Some(tile_extent()), &[LineString::from(bowtie.clone())])
        .unwrap();

    assert_eq!(mp.0.len(), 2);
    assert!(mp.iter().all(|p| p.interiors().is_empty()));
    assert_relative_eq!(mp.unsigned_area(), 2.0 * 4096.0 * 2048.0 / 2.0);
    assert_well_formed(&mp);
    let mut rng = StdRng::seed_from_u64(4);
    assert_labels_away_from_edges(&classifier, &[bowtie], &mp, &mut rng);
}

#[test]
fn test_hole_crossing_the_shell_cuts_a_notch() {
    let rings = vec![rect(0.0, 0.0, 4096.0, 2048.0), rect(1024.0, 1024.0, 3072.0, 3072.0)];
    let classifier = Classifier::from_rings(&rings);
    let fragments: Vec<LineString<f64>> = rings.iter().cloned().map(LineString::from).collect();
    let mp = make_valid(&classifier, Some(tile_extent()), &fragments).unwrap();

    assert_eq!(mp.0.len(), 1);
    assert!(mp.0[0].interiors().is_empty());
    assert_relative_eq!(mp.unsigned_area(), 4096.0 * 2048.0 - 2048.0 * 1024.0);
    assert_well_formed(&mp);
    let mut rng = StdRng::seed_from_u64(5);
    assert_labels_away_from_edges(&classifier, &rings, &mp, &mut rng);
}

#[test]
fn test_random_tile_polygons() {
    let mut rng = StdRng::seed_from_u64(42);
    for round in 0..40 {
        // Even rounds repair one self-intersecting ring, odd rounds a shell with holes.
        let rings: Vec<Vec<Pt>> = if round % 2 == 0 {
            vec![random_ring(&mut rng)]
        } else {
            let count = rng.gen_range(2..4);
            (0..count).map(|_| random_ring(&mut rng)).collect()
        };
        let classifier = Classifier::from_rings(&rings);
        let fragments: Vec<LineString<f64>> = rings.iter().cloned().map(LineString::from).collect();

        let mp = make_valid(&classifier, Some(tile_extent()), &fragments)
            .unwrap_or_else(|e| panic!("round {} failed on {:?}: {}", round, rings, e));
        assert_well_formed(&mp);
        assert_labels_away_from_edges(&classifier, &rings, &mp, &mut rng);
    }
}
