//! Reassembly of closed rings from an unordered set of boundary lines.

use crate::primitives::{bbox, rect_area, rotate_to_lowest_first, truncate, xy_order, Pt};
use geo::Winding;
use geo_types::{Line, LineString};
use log::debug;

struct Chain {
    pts: Vec<Pt>,
    closed: bool,
}

impl Chain {
    fn new(pts: Vec<Pt>) -> Self {
        Chain { pts, closed: false }
    }

    /// Attaches `other` at whichever end it meets. Meeting at both ends closes the chain.
    fn join(&mut self, other: &[Pt]) -> bool {
        let n = other.len();
        if self.closed || n < 2 || self.pts.is_empty() {
            return false;
        }
        let (s, e) = (self.pts[0], self.pts[self.pts.len() - 1]);
        let (os, oe) = (other[0], other[n - 1]);

        if s == os && e == oe {
            self.pts.extend(other[1..n - 1].iter().rev());
            self.closed = true;
        } else if e == os && s == oe {
            self.pts.extend_from_slice(&other[1..n - 1]);
            self.closed = true;
        } else if e == os {
            self.pts.extend_from_slice(&other[1..]);
        } else if e == oe {
            self.pts.extend(other[..n - 1].iter().rev());
        } else if s == oe {
            self.pts.splice(0..0, other[..n - 1].iter().copied());
        } else if s == os {
            self.pts.splice(0..0, other[1..].iter().rev().copied());
        } else {
            return false;
        }
        true
    }
}

fn cross(a: Pt, b: Pt, c: Pt) -> f64 {
    (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x)
}

/// Drops vertices lying on the line through their neighbours, spikes included.
fn remove_collinear(pts: &mut Vec<Pt>) {
    let mut i = 0;
    while pts.len() > 3 && i < pts.len() {
        let n = pts.len();
        let (a, b, c) = (pts[(i + n - 1) % n], pts[i], pts[(i + 1) % n]);
        if cross(a, b, c) == 0.0 {
            pts.remove(i);
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
}

/// Builds closed rings out of `lines`.
///
/// Endpoints are snapped to the integer grid first. Chains that never close are
/// dropped. Rings come back without a repeated closing point, lowest point first,
/// ordered by ascending bounding-box area.
pub fn rings_from_lines(lines: &[Line<f64>]) -> Vec<Vec<Pt>> {
    let mut snapped: Vec<(Pt, Pt)> = lines
        .iter()
        .filter_map(|l| {
            let (a, b) = (truncate(l.start), truncate(l.end));
            match xy_order(a, b) {
                std::cmp::Ordering::Less => Some((a, b)),
                std::cmp::Ordering::Greater => Some((b, a)),
                std::cmp::Ordering::Equal => None,
            }
        })
        .collect();
    snapped.sort_by(|l, r| xy_order(l.0, r.0).then_with(|| xy_order(l.1, r.1)));

    let mut chains: Vec<Chain> = Vec::new();
    for (a, b) in snapped {
        let seg = [a, b];
        if !chains.iter_mut().any(|c| c.join(&seg)) {
            chains.push(Chain::new(seg.to_vec()));
        }
    }

    // Open chains may still connect to each other.
    let mut progress = true;
    while progress {
        progress = false;
        for i in 0..chains.len() {
            if chains[i].closed || chains[i].pts.is_empty() {
                continue;
            }
            for j in i + 1..chains.len() {
                if chains[j].closed || chains[j].pts.is_empty() {
                    continue;
                }
                let other = std::mem::take(&mut chains[j].pts);
                if chains[i].join(&other) {
                    progress = true;
                    if chains[i].closed {
                        break;
                    }
                } else {
                    chains[j].pts = other;
                }
            }
        }
    }

    let open = chains.iter().filter(|c| !c.closed && !c.pts.is_empty()).count();
    if open > 0 {
        debug!("rings_from_lines: dropping {} open chains", open);
    }

    let mut rings: Vec<(f64, Vec<Pt>)> = chains
        .into_iter()
        .filter(|c| c.closed)
        .filter_map(|c| {
            let mut pts = c.pts;
            remove_collinear(&mut pts);
            if pts.len() < 3 {
                return None;
            }
            rotate_to_lowest_first(&mut pts);
            let area = bbox(&pts).map_or(0.0, |r| rect_area(&r));
            Some((area, pts))
        })
        .collect();
    rings.sort_by(|a, b| a.0.total_cmp(&b.0));
    rings.into_iter().map(|(_, pts)| pts).collect()
}

/// Orients the first ring counter-clockwise (positive area) and the rest clockwise.
pub fn fix_winding(rings: &mut [Vec<Pt>]) {
    for (i, ring) in rings.iter_mut().enumerate() {
        if ring.len() < 3 {
            continue;
        }
        let mut ls = LineString::from(std::mem::take(ring));
        ls.close();
        if i == 0 {
            ls.make_ccw_winding();
        } else {
            ls.make_cw_winding();
        }
        ls.0.pop();
        *ring = ls.0;
    }
}
