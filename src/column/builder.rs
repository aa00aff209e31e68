use super::Ring;
use crate::primitives::{slope_intercept, Label, Pt};

/// Position of a boundary point inside a ring, keyed by its y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YPart {
    pub y: f64,
    pub idx: usize,
}

/// A finished builder ring together with its left and right boundary points.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRing {
    pub ring: Ring,
    pub x1: f64,
    pub y1s: Vec<YPart>,
    pub x2: f64,
    pub y2s: Vec<YPart>,
}

/// True when `p3` continues the direction `p1 -> p2`, so `p2` can be dropped.
///
/// A run up the right boundary starting from the left one is never collapsed.
pub fn slope_check(p1: Pt, p2: Pt, p3: Pt, x1: f64, x2: f64) -> bool {
    if p1.x == x1 && p2.x == x2 && p3.x == x2 {
        return false;
    }
    if p1.y == p2.y && p1.y == p3.y {
        return true;
    }
    let (m1, _, d1) = slope_intercept(p1, p2);
    let (m2, _, d2) = slope_intercept(p1, p3);
    d1 && d2 && m1 == m2
}

/// Accumulates consecutive same-label triangles of a column into rings.
///
/// `parts[0]` collects the left-boundary chain and `parts[1]` the right one.
#[derive(Debug, Default)]
pub struct Builder {
    parts: [Vec<Pt>; 2],
    label: Option<Label>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next triangle. Returns the completed ring when the label changes.
    pub fn add_pts(&mut self, label: Label, pts1: &[Pt], pts2: &[Pt]) -> Option<BuiltRing> {
        if self.label == Some(label) {
            for (part, pts) in self.parts.iter_mut().zip([pts1, pts2]) {
                if pts.len() > 1 && part.last() != Some(&pts[1]) {
                    part.push(pts[1]);
                }
            }
            return None;
        }

        let done = if !self.parts[0].is_empty() && !self.parts[1].is_empty() {
            self.current_ring()
        } else {
            None
        };
        self.label = Some(label);
        self.parts = [pts1.to_vec(), pts2.to_vec()];
        done
    }

    /// The ring under construction: the left chain top-down, closed by the right chain.
    pub fn current_ring(&self) -> Option<BuiltRing> {
        let label = self.label?;
        let (left, right) = (&self.parts[0], &self.parts[1]);
        let (first, rest) = left.split_first()?;
        let x1 = first.x;
        let x2 = right.first()?.x;

        let mut points = Vec::with_capacity(left.len() + right.len());
        points.push(*first);
        points.extend_from_slice(right);
        points.extend(rest.iter().rev());

        let n = points.len();
        if n > 3 {
            if slope_check(points[n - 2], points[n - 1], points[0], x1, x2) {
                points.pop();
            } else if slope_check(points[n - 1], points[0], points[1], x1, x2) {
                points.remove(0);
            }
        }

        let mut y1s = Vec::new();
        let mut y2s = Vec::new();
        for (idx, p) in points.iter().enumerate() {
            if p.x == x1 {
                y1s.push(YPart { y: p.y, idx });
            } else if p.x == x2 {
                y2s.push(YPart { y: p.y, idx });
            }
        }
        y1s.sort_by(|a, b| a.y.total_cmp(&b.y));
        y2s.sort_by(|a, b| a.y.total_cmp(&b.y));

        Some(BuiltRing { ring: Ring { points, label }, x1, y1s, x2, y2s })
    }
}
