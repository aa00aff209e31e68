use super::sweep::{find_intersects, ArrayActiveSet};
use crate::primitives::{sort_unique, truncate, xy_order, Pt, Segment};
use geo_types::Coord;
use log::trace;
use std::cmp::Ordering;

/// Intersection of the lines through `a` and `b`, snapped to the grid by truncation.
///
/// An exactly vertical segment keeps its own x and an exactly horizontal one its own y,
/// so points split onto a column boundary stay on it. Parallel lines give `None`.
pub fn intersect(a: &Segment, b: &Segment) -> Option<Pt> {
    let (p1, p2, p3, p4) = (a.start(), a.end(), b.start(), b.end());
    let denom = (p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x);
    if denom == 0.0 {
        return None;
    }
    let t1 = p1.x * p2.y - p1.y * p2.x;
    let t2 = p3.x * p4.y - p3.y * p4.x;
    let x = (t1 * (p3.x - p4.x) - (p1.x - p2.x) * t2) / denom;
    let y = (t1 * (p3.y - p4.y) - (p1.y - p2.y) * t2) / denom;

    let mut pt = truncate(Coord { x, y });
    if a.is_vertical() {
        pt.x = p1.x;
    } else if b.is_vertical() {
        pt.x = p3.x;
    }
    if a.is_horizontal() {
        pt.y = p1.y;
    } else if b.is_horizontal() {
        pt.y = p3.y;
    }
    Some(pt)
}

// Endpoints of `other` lying strictly inside `seg`, for collinear overlapping pairs.
fn overlap_points(seg: &Segment, other: &Segment) -> impl Iterator<Item = Pt> {
    let (s, e) = (seg.start(), seg.end());
    [other.start(), other.end()].into_iter().filter(move |p| {
        let cross = (e.x - s.x) * (p.y - s.y) - (e.y - s.y) * (p.x - s.x);
        cross == 0.0 && xy_order(s, *p) == Ordering::Less && xy_order(*p, e) == Ordering::Less
    })
}

/// For each segment: its endpoints plus every split point, sorted by `xy_order` and unique.
pub fn split_points(segments: &[Segment]) -> Vec<Vec<Pt>> {
    let mut pts: Vec<Vec<Pt>> = segments.iter().map(|s| vec![s.start(), s.end()]).collect();
    let mut active = ArrayActiveSet::with_capacity(segments.len());
    let mut hits = 0usize;

    find_intersects(segments, &mut active, |_, _| false, |i, j| {
        hits += 1;
        let (a, b) = (&segments[i], &segments[j]);
        match intersect(a, b) {
            Some(p) => {
                pts[i].push(p);
                pts[j].push(p);
            }
            None => {
                pts[i].extend(overlap_points(a, b));
                pts[j].extend(overlap_points(b, a));
            }
        }
    });
    trace!("split_points: {} segments, {} intersecting pairs", segments.len(), hits);

    for list in &mut pts {
        sort_unique(list);
    }
    pts
}

/// Splits every segment at its split points; sub-segments come out in input order.
pub fn split_segments(segments: &[Segment]) -> Vec<Segment> {
    split_points(segments)
        .iter()
        .flat_map(|pts| pts.windows(2).filter_map(|w| Segment::new(w[0], w[1])))
        .collect()
}

/// Planar subdivision of the input: no two output segments cross in their interiors.
pub fn planarize(segments: &[Segment]) -> Vec<Segment> {
    split_segments(segments)
}
