use super::*;
use crate::classifier::{AlwaysInside, Classifier, Classify};
use crate::column::{build_ring_col, MaxPartnerY, RingDesc, YEdge};
use geo_types::Coord;

fn pt(x: f64, y: f64) -> Pt {
    Coord { x, y }
}

fn col(x: f64, ys: &[f64]) -> Vec<Pt> {
    ys.iter().map(|&y| pt(x, y)).collect()
}

fn pts(xys: &[(f64, f64)]) -> Vec<Pt> {
    xys.iter().map(|&(x, y)| pt(x, y)).collect()
}

fn edge(y: f64, descs: &[(usize, usize, Label)]) -> YEdge {
    YEdge {
        y,
        descs: descs.iter().map(|&(idx, pt_idx, label)| RingDesc { idx, pt_idx, label }).collect(),
    }
}

/// Unit-height rectangle spanning `x1..=x2`, counter-clockwise from the lower left.
fn rect(x1: f64, x2: f64) -> Vec<Pt> {
    pts(&[(x1, 0.0), (x2, 0.0), (x2, 1.0), (x1, 1.0)])
}

/// A one-wide column holding a single Inside rectangle.
fn unit_col(x: f64) -> RingCol {
    ring_col(&AlwaysInside, col(x, &[0.0, 1.0]), col(x + 1.0, &[0.0, 1.0]), &[(pt(x, 0.0), 100)])
}

fn ring_col<C: Classify>(classifier: &C, c1: Vec<Pt>, c2: Vec<Pt>, maxy: &[(Pt, i64)]) -> RingCol {
    let mut pt2maxy = MaxPartnerY::new();
    for &(p, y) in maxy {
        pt2maxy.insert(p, y);
    }
    build_ring_col(classifier, &c1, &c2, &pt2maxy, None).unwrap()
}

#[test]
fn test_merge_two_rectangles() {
    let left = unit_col(0.0);
    let right = unit_col(1.0);

    let merged = merge_adjacent(&left, &right).unwrap();
    assert_eq!((merged.x1, merged.x2), (0.0, 2.0));
    assert_eq!(merged.rings, vec![Ring::new(Label::Inside, rect(0.0, 2.0))]);
    assert_eq!(
        merged.y1s,
        vec![edge(0.0, &[(0, 0, Label::Inside)]), edge(1.0, &[(0, 3, Label::Inside)])]
    );
    assert_eq!(
        merged.y2s,
        vec![edge(0.0, &[(0, 1, Label::Inside)]), edge(1.0, &[(0, 2, Label::Inside)])]
    );
}

#[test]
fn test_merge_pacman() {
    let classifier = Classifier::new()
        .with_ring(Label::Inside, &pts(&[(0.0, 1.0), (1.0, 1.0), (1.0, 2.0)]))
        .with_ring(Label::Inside, &pts(&[(0.0, 3.0), (1.0, 2.0), (2.0, 3.0)]));

    let left = ring_col(
        &classifier,
        col(0.0, &[0.0, 1.0, 3.0]),
        col(1.0, &[0.0, 1.0, 2.0, 3.0]),
        &[(pt(0.0, 1.0), 200)],
    );
    let right = ring_col(
        &classifier,
        col(1.0, &[0.0, 1.0, 2.0, 3.0]),
        col(2.0, &[0.0, 3.0]),
        &[(pt(1.0, 2.0), 300)],
    );

    let merged = merge_adjacent(&left, &right).unwrap();
    let expected = vec![
        Ring::new(
            Label::Outside,
            pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 3.0), (1.0, 2.0), (1.0, 1.0), (0.0, 1.0)]),
        ),
        Ring::new(Label::Inside, pts(&[(0.0, 1.0), (1.0, 1.0), (1.0, 2.0)])),
        Ring::new(Label::Outside, pts(&[(0.0, 1.0), (1.0, 2.0), (0.0, 3.0)])),
        Ring::new(Label::Inside, pts(&[(0.0, 3.0), (1.0, 2.0), (2.0, 3.0)])),
    ];
    assert_eq!(merged.rings, expected);

    use Label::{Inside as In, Outside as Out};
    assert_eq!(
        merged.y1s,
        vec![
            edge(0.0, &[(0, 0, Out)]),
            edge(1.0, &[(0, 5, Out), (1, 0, In), (2, 0, Out)]),
            edge(3.0, &[(2, 2, Out), (3, 0, In)]),
        ]
    );
    assert_eq!(
        merged.y2s,
        vec![edge(0.0, &[(0, 1, Out)]), edge(3.0, &[(0, 2, Out), (3, 2, In)])]
    );
}

#[test]
fn test_merge_cols_folds_left_to_right() {
    let cols: Vec<RingCol> = (0..3).map(|i| unit_col(i as f64)).collect();

    let merged = merge_cols(&cols).unwrap();
    assert_eq!((merged.x1, merged.x2), (0.0, 3.0));
    assert_eq!(merged.rings, vec![Ring::new(Label::Inside, rect(0.0, 3.0))]);

    assert!(merge_cols(&[]).unwrap().is_empty());
    assert_eq!(merge_cols(&cols[..1]).unwrap(), cols[0]);
}

#[test]
fn test_merge_keeps_rings_that_do_not_cross() {
    // Two separated squares on either side of the seam.
    let mut left = RingCol::new(0.0, 2.0);
    left.push_ring(Ring::new(Label::Inside, rect(0.0, 1.0)));
    left.rebuild_index();
    let mut right = RingCol::new(2.0, 4.0);
    right.push_ring(Ring::new(Label::Inside, rect(3.0, 4.0)));
    right.rebuild_index();

    let merged = merge_adjacent(&left, &right).unwrap();
    assert_eq!(merged.rings.len(), 2);
    assert_eq!(merged.rings[0].points, left.rings[0].points);
    assert_eq!(merged.rings[1].points, right.rings[0].points);
    assert_eq!(merged.y1s.len(), 2);
    assert_eq!(merged.y2s.len(), 2);
}

#[test]
fn test_merge_degenerate_ring_is_an_error() {
    let mut left = RingCol::new(0.0, 1.0);
    left.push_ring(Ring::new(Label::Inside, pts(&[(0.0, 0.0), (1.0, 0.0)])));
    left.rebuild_index();
    let right = RingCol::new(1.0, 2.0);

    let err = merge_adjacent(&left, &right).unwrap_err();
    assert_eq!(err.kind, StitchErrorKind::DegenerateRing { points: 2 });
    assert_eq!((err.left_x1, err.seam_x, err.right_x2), (0.0, 1.0, 2.0));
    assert_eq!(err.walked, pts(&[(0.0, 0.0), (1.0, 0.0)]));
}

#[test]
fn test_merge_walk_that_never_closes_is_an_error() {
    use Label::Inside as In;
    // The right boundary index of the left column drops the square's y = 0 entry, so the
    // walk loops between the right column and the strip at x = 0.5 without getting home.
    let mut left = RingCol::new(0.0, 1.0);
    left.push_ring(Ring::new(In, pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])));
    left.push_ring(Ring::new(In, pts(&[(0.5, 1.0), (1.0, 1.0), (1.0, 2.0), (0.5, 2.0)])));
    left.rebuild_index();
    left.y2s = vec![edge(1.0, &[(0, 2, In), (1, 1, In)]), edge(2.0, &[(1, 2, In)])];

    let mut right = RingCol::new(1.0, 2.0);
    let notched = pts(&[(1.0, 0.0), (2.0, 0.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)]);
    right.push_ring(Ring::new(In, notched));
    right.rebuild_index();

    let err = merge_adjacent(&left, &right).unwrap_err();
    let limit = 2 * (4 + 4 + 5) + 8;
    assert_eq!(err.kind, StitchErrorKind::Unclosed { steps: limit + 1 });
    assert_eq!((err.left_x1, err.seam_x, err.right_x2), (0.0, 1.0, 2.0));
    assert_eq!(err.last_seam, Some((2.0, 1.0)));
    assert_eq!(err.walked.first(), Some(&pt(0.0, 0.0)));
    assert!(!err.walked.contains(&pt(0.0, 1.0)));

    let wrapped = merge_cols(&[left, right]).unwrap_err();
    assert!(matches!(wrapped.kind, StitchErrorKind::Unclosed { .. }));
}
