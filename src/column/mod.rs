pub mod builder;
pub mod triangles;

pub use builder::{slope_check, BuiltRing, Builder, YPart};
pub use triangles::{get_triangles, triangles_for_col, MaxPartnerY, Tri};

use crate::classifier::Classify;
use crate::error::Result;
use crate::primitives::{bbox, rotate_to_lowest_first, Label, Pt};
use geo::Area;
use geo_types::{LineString, Polygon, Rect};
use log::trace;
use smallvec::SmallVec;
use std::sync::atomic::AtomicBool;


/// A closed ring without the repeated closing point.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub points: Vec<Pt>,
    pub label: Label,
}

impl Ring {
    pub fn new(label: Label, points: Vec<Pt>) -> Self {
        Ring { points, label }
    }

    pub fn extent(&self) -> Option<Rect<f64>> {
        bbox(&self.points)
    }

    /// Absolute shoelace area.
    pub fn area(&self) -> f64 {
        Polygon::new(LineString::from(self.points.clone()), vec![]).unsigned_area()
    }

    /// Copy of the points oriented for output, lowest point first.
    ///
    /// Inside rings get a positive signed area, all other rings a negative one.
    pub fn line_ring(&self) -> Vec<Pt> {
        let mut pts = self.points.clone();
        let signed = Polygon::new(LineString::from(pts.clone()), vec![]).signed_area();
        let want_positive = self.label == Label::Inside;
        if (want_positive && signed < 0.0) || (!want_positive && signed > 0.0) {
            pts.reverse();
        }
        rotate_to_lowest_first(&mut pts);
        pts
    }
}

/// A ring point lying on one of the column's boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingDesc {
    pub idx: usize,
    pub pt_idx: usize,
    pub label: Label,
}

/// All boundary points at one y value.
#[derive(Debug, Clone, PartialEq)]
pub struct YEdge {
    pub y: f64,
    pub descs: SmallVec<[RingDesc; 2]>,
}

/// Which boundary of a column to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A ring in a neighbouring column sharing a vertical boundary edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeHit {
    pub ring: usize,
    pub pt_idx: usize,
    pub label: Label,
}

/// The labelled rings covering the strip `x1..=x2`, with their boundary points indexed by y.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingCol {
    pub rings: Vec<Ring>,
    pub x1: f64,
    pub x2: f64,
    pub y1s: Vec<YEdge>,
    pub y2s: Vec<YEdge>,
    found_inside: bool,
}

fn append_to_y(edges: &mut Vec<YEdge>, ridx: usize, label: Label, ys: &[YPart]) {
    for part in ys {
        let desc = RingDesc { idx: ridx, pt_idx: part.idx, label };
        match edges.iter_mut().find(|e| e.y == part.y) {
            Some(edge) => edge.descs.push(desc),
            None => edges.push(YEdge { y: part.y, descs: smallvec::smallvec![desc] }),
        }
    }
}

fn sort_edges(edges: &mut [YEdge]) {
    edges.sort_by(|a, b| a.y.total_cmp(&b.y));
}

impl RingCol {
    pub fn new(x1: f64, x2: f64) -> Self {
        RingCol { x1, x2, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn has_inside(&self) -> bool {
        self.found_inside
    }

    fn push_built(&mut self, built: BuiltRing) {
        let ridx = self.rings.len();
        let label = built.ring.label;
        append_to_y(&mut self.y1s, ridx, label, &built.y1s);
        append_to_y(&mut self.y2s, ridx, label, &built.y2s);
        self.found_inside |= label == Label::Inside;
        self.rings.push(built.ring);
    }

    /// Pushes a ring whose boundary entries will be produced by [`RingCol::rebuild_index`].
    pub(crate) fn push_ring(&mut self, ring: Ring) {
        self.found_inside |= ring.label == Label::Inside;
        self.rings.push(ring);
    }

    /// Rebuilds both boundary indexes from the ring points.
    pub(crate) fn rebuild_index(&mut self) {
        self.y1s.clear();
        self.y2s.clear();
        for (ridx, ring) in self.rings.iter().enumerate() {
            for (pt_idx, p) in ring.points.iter().enumerate() {
                let desc = RingDesc { idx: ridx, pt_idx, label: ring.label };
                let edges = if p.x == self.x1 {
                    &mut self.y1s
                } else if p.x == self.x2 {
                    &mut self.y2s
                } else {
                    continue;
                };
                match edges.iter_mut().find(|e| e.y == p.y) {
                    Some(edge) => edge.descs.push(desc),
                    None => edges.push(YEdge { y: p.y, descs: smallvec::smallvec![desc] }),
                }
            }
        }
        sort_edges(&mut self.y1s);
        sort_edges(&mut self.y2s);
    }

    pub fn edges(&self, side: Side) -> &[YEdge] {
        match side {
            Side::Left => &self.y1s,
            Side::Right => &self.y2s,
        }
    }

    /// Finds the first ring with a vertical boundary edge `y1 -> y2` that `accept` takes.
    ///
    /// The returned `pt_idx` is the ring's point at `y1`, so a walk arriving along the
    /// edge can continue from it.
    pub fn find_edge<F>(&self, side: Side, y1: f64, y2: f64, mut accept: F) -> Option<EdgeHit>
    where
        F: FnMut(&EdgeHit) -> bool,
    {
        let (lo, hi, want_neighbour) = if y1 > y2 { (y2, y1, true) } else { (y1, y2, false) };
        for edge in self.edges(side) {
            if lo < edge.y {
                return None;
            }
            if lo != edge.y {
                continue;
            }
            for desc in &edge.descs {
                let pts = &self.rings[desc.idx].points;
                let px = pts[desc.pt_idx].x;
                let prev = if desc.pt_idx == 0 { pts.len() - 1 } else { desc.pt_idx - 1 };
                let next = if desc.pt_idx + 1 >= pts.len() { 0 } else { desc.pt_idx + 1 };
                for nb in [prev, next] {
                    let np = pts[nb];
                    if np.x != px || np.y != hi {
                        continue;
                    }
                    let hit = EdgeHit {
                        ring: desc.idx,
                        pt_idx: if want_neighbour { nb } else { desc.pt_idx },
                        label: desc.label,
                    };
                    if accept(&hit) {
                        return Some(hit);
                    }
                }
            }
        }
        None
    }
}

/// Triangulates the strip between `col1` and `col2`, labels every cell and gathers the
/// same-label runs into rings.
///
/// Both columns must be sorted by y. A column with no Inside cell comes back empty.
pub fn build_ring_col<C>(
    classifier: &C,
    col1: &[Pt],
    col2: &[Pt],
    pt2maxy: &MaxPartnerY,
    cancel: Option<&AtomicBool>,
) -> Result<RingCol>
where
    C: Classify + ?Sized,
{
    let x1 = col1.first().map_or(0.0, |p| p.x);
    let x2 = col2.first().map_or(0.0, |p| p.x);
    let mut col = RingCol::new(x1, x2);

    let tris = triangles_for_col(pt2maxy, col1, col2, cancel)?;
    let mut builder = Builder::new();
    for t in &tris {
        let pts1 = &col1[t[0]..t[0] + t[1]];
        let pts2 = &col2[t[2]..t[2] + t[3]];
        let cell: Vec<Pt> = pts1.iter().chain(pts2).copied().collect();
        let centroid = Pt {
            x: (cell[0].x + cell[1].x + cell[2].x) / 3.0,
            y: (cell[0].y + cell[1].y + cell[2].y) / 3.0,
        };
        if let Some(built) = builder.add_pts(classifier.label_for(centroid), pts1, pts2) {
            col.push_built(built);
        }
    }
    if let Some(built) = builder.current_ring() {
        col.push_built(built);
    }

    if !col.found_inside {
        col.rings.clear();
        col.y1s.clear();
        col.y2s.clear();
    }
    sort_edges(&mut col.y1s);
    sort_edges(&mut col.y2s);
    trace!("column [{}, {}]: {} cells, {} rings", x1, x2, tris.len(), col.rings.len());
    Ok(col)
}
