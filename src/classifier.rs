use crate::primitives::{bbox, scaled_y, slope_intercept, Label, Pt};
use geo_types::{Line, MultiPolygon, Polygon, Rect};
use log::warn;

/// Point-in-region oracle used to label every reconstructed cell.
pub trait Classify {
    fn label_for(&self, pt: Pt) -> Label;
}

/// Classifies every point as Inside.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysInside;

impl Classify for AlwaysInside {
    fn label_for(&self, _pt: Pt) -> Label {
        Label::Inside
    }
}

/// One edge of a segment set, stored left-to-right with y in hundredths.
#[derive(Debug, Clone, Copy)]
struct SegEvent {
    x1: f64,
    y1: i64,
    x2: f64,
    y2: i64,
    m: f64,
    b: f64,
    slope_defined: bool,
}

impl SegEvent {
    fn new(a: Pt, b: Pt) -> Option<Self> {
        if a == b {
            return None;
        }
        let (l, r) = if (a.x == b.x && a.y > b.y) || a.x < b.x { (a, b) } else { (b, a) };
        let (m, intercept, slope_defined) = slope_intercept(a, b);
        Some(SegEvent {
            x1: l.x,
            y1: scaled_y(l.y),
            x2: r.x,
            y2: scaled_y(r.y),
            m,
            b: intercept,
            slope_defined,
        })
    }
}

/// A closed ring (or line set) with a label, answering containment by ray casting.
///
/// Points on the boundary are contained.
#[derive(Debug, Clone)]
pub struct RingSegments {
    bbox: Option<Rect<f64>>,
    label: Label,
    events: Vec<SegEvent>,
}

impl RingSegments {
    /// Builds the set from the implicit closed ring `ring[n-1] -> ring[0] -> ... -> ring[n-1]`.
    pub fn from_ring(label: Label, ring: &[Pt]) -> Self {
        let mut events = Vec::with_capacity(ring.len());
        if let Some(&last) = ring.last() {
            let mut prev = last;
            for &p in ring {
                events.extend(SegEvent::new(prev, p));
                prev = p;
            }
        }
        Self::with_events(label, bbox(ring), events)
    }

    pub fn from_lines(label: Label, lines: &[Line<f64>]) -> Self {
        let pts: Vec<Pt> = lines.iter().flat_map(|l| [l.start, l.end]).collect();
        let events = lines.iter().filter_map(|l| SegEvent::new(l.start, l.end)).collect();
        Self::with_events(label, bbox(&pts), events)
    }

    fn with_events(label: Label, bbox: Option<Rect<f64>>, mut events: Vec<SegEvent>) -> Self {
        events.sort_by(|a, b| {
            a.x1.partial_cmp(&b.x1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.y1.cmp(&b.y1))
        });
        RingSegments { bbox, label, events }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn contains(&self, pt: Pt) -> bool {
        match self.bbox {
            Some(b)
                if pt.x >= b.min().x
                    && pt.y >= b.min().y
                    && pt.x <= b.max().x
                    && pt.y <= b.max().y =>
            {
                self.cast(pt)
            }
            _ => false,
        }
    }

    fn cast(&self, pt: Pt) -> bool {
        let y100 = scaled_y(pt.y);
        let mut count = 0usize;
        for ev in self.events.iter().take_while(|ev| ev.x1 <= pt.x) {
            let (lo, hi) = if ev.y1 <= ev.y2 { (ev.y1, ev.y2) } else { (ev.y2, ev.y1) };
            if y100 < lo || y100 > hi {
                continue;
            }

            if ev.y1 == ev.y2 {
                if y100 == ev.y1 {
                    if ev.x1 <= pt.x && pt.x <= ev.x2 {
                        return true;
                    }
                    continue;
                }
            }

            // Passing through a vertex: count it for one of its two edges only.
            if y100 == ev.y1 && ev.x1 < pt.x {
                if ev.y2 <= y100 {
                    count += 1;
                }
                continue;
            }
            if y100 == ev.y2 && ev.x2 < pt.x {
                if ev.y1 <= y100 {
                    count += 1;
                }
                continue;
            }

            if !ev.slope_defined && pt.x == ev.x1 {
                return true;
            }

            if pt.x > ev.x2 {
                count += 1;
                continue;
            }

            let y = ((ev.m * pt.x + ev.b) * 100.0) as i64;
            if y == y100 {
                return true;
            }
            if (ev.m < 0.0 && y < y100) || (ev.m > 0.0 && y > y100) {
                count += 1;
            }
        }
        count % 2 != 0
    }
}

/// Ordered collection of labelled segment sets.
///
/// Lookups walk the sets from the most recently registered to the first, so a later
/// set shadows an earlier one wherever they overlap.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    sets: Vec<RingSegments>,
    clip: Option<Rect<f64>>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, set: RingSegments) -> &mut Self {
        self.sets.push(set);
        self
    }

    pub fn with_ring(mut self, label: Label, ring: &[Pt]) -> Self {
        if ring.len() < 2 {
            warn!("Classifier ring with {} points skipped", ring.len());
            return self;
        }
        self.sets.push(RingSegments::from_ring(label, ring));
        self
    }

    /// Restricts Inside answers to points within `clip`.
    pub fn with_clip(mut self, clip: Rect<f64>) -> Self {
        self.clip = Some(clip);
        self
    }

    /// First ring Inside, every other ring Outside.
    pub fn from_rings(rings: &[Vec<Pt>]) -> Self {
        let mut classifier = Self::new();
        for (i, ring) in rings.iter().enumerate() {
            let label = if i == 0 { Label::Inside } else { Label::Outside };
            classifier = classifier.with_ring(label, ring);
        }
        classifier
    }

    pub fn from_polygon(polygon: &Polygon<f64>) -> Self {
        let mut classifier = Self::new();
        classifier.extend_polygon(polygon);
        classifier
    }

    pub fn from_multi_polygon(mp: &MultiPolygon<f64>) -> Self {
        let mut classifier = Self::new();
        for polygon in mp {
            classifier.extend_polygon(polygon);
        }
        classifier
    }

    fn extend_polygon(&mut self, polygon: &Polygon<f64>) {
        let exterior = open_ring(&polygon.exterior().0);
        self.sets.push(RingSegments::from_ring(Label::Inside, exterior));
        for hole in polygon.interiors() {
            self.sets.push(RingSegments::from_ring(Label::Outside, open_ring(&hole.0)));
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

// Closed linestrings repeat their first point; the ring walk closes implicitly.
fn open_ring(pts: &[Pt]) -> &[Pt] {
    match pts {
        [first, .., last] if first == last => &pts[..pts.len() - 1],
        _ => pts,
    }
}

impl Classify for Classifier {
    fn label_for(&self, pt: Pt) -> Label {
        if let Some(clip) = &self.clip {
            let (min, max) = (clip.min(), clip.max());
            if pt.x < min.x || pt.y < min.y || pt.x > max.x || pt.y > max.y {
                return Label::Outside;
            }
        }
        self.sets
            .iter()
            .rev()
            .find(|s| s.contains(pt))
            .map(|s| s.label())
            .unwrap_or(Label::Outside)
    }
}

impl<C: Classify + ?Sized> Classify for &C {
    fn label_for(&self, pt: Pt) -> Label {
        (**self).label_for(pt)
    }
}
