use crate::column::{slope_check, EdgeHit, Ring, RingCol, Side};
use crate::error::{StitchError, StitchErrorKind};
use crate::primitives::{rotate_to_lowest_first, Label, Pt, PtKey};
use log::trace;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    Copied,
    Pending,
    Consumed,
}

/// Search target while walking: rings of column `side` meeting the seam.
fn seam_side(col: usize) -> Side {
    // The left column meets the seam with its right boundary and vice versa.
    if col == 0 {
        Side::Right
    } else {
        Side::Left
    }
}

struct Walk<'a> {
    cols: [&'a RingCol; 2],
    seam: f64,
    marks: [Vec<Mark>; 2],
    limit: usize,
    last_seam: Option<(f64, f64)>,
}

impl<'a> Walk<'a> {
    fn ring(&self, col: usize, ring: usize) -> &'a [Pt] {
        &self.cols[col].rings[ring].points
    }

    fn error(&self, walked: Vec<Pt>, kind: StitchErrorKind) -> StitchError {
        StitchError {
            left_x1: self.cols[0].x1,
            seam_x: self.seam,
            right_x2: self.cols[1].x2,
            last_seam: self.last_seam,
            walked,
            kind,
        }
    }

    fn jump(
        &mut self,
        from_col: usize,
        y1: f64,
        y2: f64,
        label: Label,
        exclude: Option<usize>,
    ) -> Option<EdgeHit> {
        let to = 1 - from_col;
        self.last_seam = Some((y1, y2));
        self.cols[to].find_edge(seam_side(to), y1, y2, |hit| {
            hit.label == label && Some(hit.ring) != exclude
        })
    }

    /// Traces the outline of the region containing ring `start` of column `col`,
    /// crossing the seam wherever a same-label ring continues on the other side.
    fn trace(&mut self, col: usize, start: usize) -> Result<Ring, StitchError> {
        let label = self.cols[col].rings[start].label;
        let mut ccol = col;
        let mut cring = start;
        let mut ptid = 0usize;
        let mut pts = self.ring(ccol, cring);
        let mut nptid = 1 % pts.len();

        let mut nring: Vec<Pt> = Vec::new();
        let mut seen: HashMap<PtKey, usize> = HashMap::new();
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps > self.limit {
                return Err(self.error(nring, StitchErrorKind::Unclosed { steps }));
            }

            let pt = pts[ptid];
            let npt = pts[nptid];

            // Revisiting a point closes a bubble; drop it.
            if let Some(&idx) = seen.get(&PtKey::from(pt)) {
                for p in nring.drain(idx..) {
                    seen.remove(&PtKey::from(p));
                }
            }
            let n = nring.len();
            if n > 1 && slope_check(nring[n - 2], nring[n - 1], pt, self.seam, self.seam) {
                seen.remove(&PtKey::from(nring[n - 1]));
                nring[n - 1] = pt;
            } else {
                nring.push(pt);
            }
            seen.insert(PtKey::from(pt), nring.len() - 1);

            if pt.x == self.seam && npt.x == self.seam {
                if let Some(hit) = self.jump(ccol, pt.y, npt.y, label, None) {
                    let prev_ring = cring;
                    ccol = 1 - ccol;
                    cring = hit.ring;
                    ptid = hit.pt_idx;
                    self.marks[ccol][cring] = Mark::Consumed;
                    pts = self.ring(ccol, cring);
                    nptid = (ptid + 1) % pts.len();

                    let (jpt, jnpt) = (pts[ptid], pts[nptid]);
                    if jpt.x == jnpt.x {
                        if let Some(hit) = self.jump(ccol, jpt.y, jnpt.y, label, Some(prev_ring)) {
                            ccol = 1 - ccol;
                            cring = hit.ring;
                            ptid = hit.pt_idx;
                            self.marks[ccol][cring] = Mark::Consumed;
                            pts = self.ring(ccol, cring);
                            nptid = (ptid + 1) % pts.len();
                        }
                    }
                }
            }

            ptid = nptid;
            nptid = (ptid + 1) % pts.len();
            if Some(&pts[ptid]) == nring.first() {
                break;
            }
        }

        if nring.len() < 3 {
            let points = nring.len();
            return Err(self.error(nring, StitchErrorKind::DegenerateRing { points }));
        }
        Ok(Ring::new(label, nring))
    }
}

/// Merges two adjacent columns (`c1.x2 == c2.x1`) into one spanning `c1.x1..=c2.x2`.
///
/// Rings touching the shared boundary are walked across it and fused with their
/// same-label neighbours; all other rings are carried over unchanged.
pub fn merge_adjacent(c1: &RingCol, c2: &RingCol) -> Result<RingCol, StitchError> {
    let cols = [c1, c2];
    let mut out = RingCol::new(c1.x1, c2.x2);
    let mut marks = [vec![Mark::Unseen; c1.rings.len()], vec![Mark::Unseen; c2.rings.len()]];
    let mut pending: Vec<(usize, usize)> = Vec::new();

    // Column 0 meets the seam on its right, column 1 on its left.
    for (ci, col) in cols.iter().enumerate() {
        let (seam_edges, far_edges) = if ci == 0 {
            (&col.y2s, &col.y1s)
        } else {
            (&col.y1s, &col.y2s)
        };
        for edge in seam_edges {
            for d in &edge.descs {
                if marks[ci][d.idx] == Mark::Unseen {
                    marks[ci][d.idx] = Mark::Pending;
                    pending.push((ci, d.idx));
                }
            }
        }
        for edge in far_edges {
            for d in &edge.descs {
                if marks[ci][d.idx] == Mark::Unseen {
                    marks[ci][d.idx] = Mark::Copied;
                    out.push_ring(col.rings[d.idx].clone());
                }
            }
        }
        for (ri, ring) in col.rings.iter().enumerate() {
            if marks[ci][ri] == Mark::Unseen {
                marks[ci][ri] = Mark::Copied;
                out.push_ring(ring.clone());
            }
        }
    }

    let total_points: usize = c1.rings.iter().chain(&c2.rings).map(|r| r.points.len()).sum();
    let mut walk = Walk {
        cols,
        seam: c1.x2,
        marks,
        limit: 2 * total_points + 8,
        last_seam: None,
    };

    for (ci, ri) in pending {
        if walk.marks[ci][ri] == Mark::Consumed {
            continue;
        }
        walk.marks[ci][ri] = Mark::Consumed;
        let mut ring = walk.trace(ci, ri)?;

        let n = ring.points.len();
        if n > 3 {
            let p = &ring.points;
            if slope_check(p[n - 2], p[n - 1], p[0], out.x1, out.x2) {
                ring.points.pop();
            } else if slope_check(p[n - 1], p[0], p[1], out.x1, out.x2) {
                ring.points.remove(0);
            }
        }
        rotate_to_lowest_first(&mut ring.points);
        out.push_ring(ring);
    }

    out.rebuild_index();
    trace!(
        "merged [{}, {}] + [{}, {}]: {} + {} rings -> {}",
        c1.x1,
        c1.x2,
        c2.x1,
        c2.x2,
        c1.rings.len(),
        c2.rings.len(),
        out.rings.len()
    );
    Ok(out)
}

/// Folds a left-to-right run of adjacent columns into one.
pub fn merge_cols(cols: &[RingCol]) -> Result<RingCol, StitchError> {
    let Some((first, rest)) = cols.split_first() else {
        return Ok(RingCol::default());
    };
    let mut acc = first.clone();
    for col in rest {
        acc = merge_adjacent(&acc, col)?;
    }
    Ok(acc)
}

#[cfg(test)]
#[path = "stitch_tests.rs"]
mod tests;
