use geo_types::{Coord, Line, Rect};
use std::cmp::Ordering;

pub type Pt = Coord<f64>;

/// Classification of a region relative to the caller's polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Outside,
    Inside,
}

/// Hashable identity of a point: its exact bit pattern, with `-0.0` folded into `0.0`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct PtKey(u64, u64);

impl From<Pt> for PtKey {
    fn from(c: Pt) -> Self {
        PtKey((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
    }
}

/// Total order on points: by x, then by y.
#[inline]
pub fn xy_order(a: Pt, b: Pt) -> Ordering {
    a.x.partial_cmp(&b.x)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
}

/// Slope and intercept of the line through `a` and `b`.
///
/// Horizontal and vertical lines both report a slope of 0 and the intercept `a.y`;
/// only the vertical case reports `defined == false`.
pub fn slope_intercept(a: Pt, b: Pt) -> (f64, f64, bool) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx == 0.0 || dy == 0.0 {
        return (0.0, a.y, dx != 0.0);
    }
    let m = dy / dx;
    (m, a.y - m * a.x, true)
}

/// y scaled to hundredths and truncated toward zero.
#[inline]
pub fn scaled_y(y: f64) -> i64 {
    (y * 100.0) as i64
}

/// Snaps a point to the integer grid by truncation toward zero.
#[inline]
pub fn truncate(pt: Pt) -> Pt {
    Coord { x: pt.x.trunc(), y: pt.y.trunc() }
}

/// Sorts by `xy_order` and removes exact duplicates.
pub fn sort_unique(pts: &mut Vec<Pt>) {
    pts.sort_by(|a, b| xy_order(*a, *b));
    pts.dedup();
}

/// Rotates the ring so that its lowest point in `xy_order` comes first.
pub fn rotate_to_lowest_first(pts: &mut [Pt]) {
    let lowest = pts
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| xy_order(**a, **b))
        .map(|(i, _)| i);
    if let Some(i) = lowest {
        pts.rotate_left(i);
    }
}

/// Bounding rectangle of a point list, `None` when empty.
pub fn bbox(pts: &[Pt]) -> Option<Rect<f64>> {
    let first = *pts.first()?;
    let (min, max) = pts.iter().fold((first, first), |(mut min, mut max), p| {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        (min, max)
    });
    Some(Rect::new(min, max))
}

pub(crate) fn rect_area(r: &Rect<f64>) -> f64 {
    r.width() * r.height()
}

pub(crate) fn rect_contains_rect(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    outer.min().x <= inner.min().x
        && outer.min().y <= inner.min().y
        && outer.max().x >= inner.max().x
        && outer.max().y >= inner.max().y
}

/// A non-degenerate segment stored left-to-right: `start` precedes `end` in `xy_order`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    start: Pt,
    end: Pt,
}

impl Segment {
    /// Returns `None` for zero-length input.
    pub fn new(a: Pt, b: Pt) -> Option<Self> {
        match xy_order(a, b) {
            Ordering::Less => Some(Segment { start: a, end: b }),
            Ordering::Greater => Some(Segment { start: b, end: a }),
            Ordering::Equal => None,
        }
    }

    pub fn from_line(line: Line<f64>) -> Option<Self> {
        Self::new(line.start, line.end)
    }

    #[inline]
    pub fn start(&self) -> Pt {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Pt {
        self.end
    }

    pub fn line(&self) -> Line<f64> {
        Line::new(self.start, self.end)
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn key(&self) -> (PtKey, PtKey) {
        (self.start.into(), self.end.into())
    }

    pub(crate) fn shares_endpoint(&self, other: &Segment) -> bool {
        self.start == other.start
            || self.start == other.end
            || self.end == other.start
            || self.end == other.end
    }
}

impl From<Segment> for Line<f64> {
    fn from(s: Segment) -> Self {
        s.line()
    }
}
