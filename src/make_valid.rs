use crate::classifier::Classify;
use crate::column::{build_ring_col, MaxPartnerY, RingCol};
use crate::error::{MakeValidError, Result};
use crate::noding::{split_points, split_segments};
use crate::primitives::{bbox, scaled_y, sort_unique, xy_order, Pt, Segment};
use crate::stitch::merge_cols;
use crate::utils::parallel::{guarded, try_map_ordered, with_pool};
use geo_types::{Coord, Line, LineString, MultiPolygon, Polygon, Rect};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Envelope inflation, in input units, used when none is configured.
pub const DEFAULT_MARGIN: f64 = 10.0;

/// Rebuilds a valid multipolygon from ring fragments, labelling regions with a classifier
/// built from the original geometry.
#[derive(Debug, Clone)]
pub struct MakeValid {
    /// Distance the working envelope extends past the extent and the data.
    pub margin: f64,
    /// Worker threads; `None` runs on the global rayon pool.
    pub parallelism: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for MakeValid {
    fn default() -> Self {
        Self {
            margin: DEFAULT_MARGIN,
            parallelism: None,
            cancel: None,
        }
    }
}

impl MakeValid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Setting the flag makes a running call return [`MakeValidError::Cancelled`]
    /// at the next column or merge boundary.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn check_cancel(&self) -> Result<()> {
        check_cancel(self.cancel.as_deref())
    }

    /// Runs the full repair.
    ///
    /// `fragments` are the rings (open or closed) to rebuild and `extent` is the area of
    /// interest, typically the tile bounds. The result has counter-clockwise exteriors and
    /// clockwise holes, each ring starting at its lowest point.
    pub fn make_valid<C>(
        &self,
        classifier: &C,
        extent: Option<Rect<f64>>,
        fragments: &[LineString<f64>],
    ) -> Result<MultiPolygon<f64>>
    where
        C: Classify + Sync + ?Sized,
    {
        with_pool(self.parallelism, || self.run(classifier, extent, fragments))?
    }

    fn run<C>(
        &self,
        classifier: &C,
        extent: Option<Rect<f64>>,
        fragments: &[LineString<f64>],
    ) -> Result<MultiPolygon<f64>>
    where
        C: Classify + Sync + ?Sized,
    {
        let empty = || MultiPolygon::new(Vec::new());
        // A negative margin would clip the data.
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(MakeValidError::InvalidGeometry(format!(
                "margin must be finite and non-negative, got {}",
                self.margin
            )));
        }
        let non_finite = fragments
            .iter()
            .flat_map(|ls| ls.0.iter())
            .find(|c| !c.x.is_finite() || !c.y.is_finite());
        if let Some(c) = non_finite {
            return Err(MakeValidError::InvalidGeometry(format!(
                "non-finite coordinate ({}, {})",
                c.x, c.y
            )));
        }

        let polygons = insure_connected(fragments);
        let Some(env) = adjust_envelope(extent, &polygons, self.margin) else {
            debug!("make_valid: degenerate envelope, nothing to do");
            return Ok(empty());
        };
        let segments = destructure(&polygons, env);
        if segments.is_empty() {
            debug!("make_valid: not enough segments");
            return Ok(empty());
        }
        self.check_cancel()?;

        let mut lines = split_segments(&segments);
        let mut xs: Vec<f64> = lines.iter().flat_map(|s| [s.start().x, s.end().x]).collect();
        xs.sort_by(|a, b| a.total_cmp(b));
        xs.dedup();
        debug!(
            "make_valid: {} segments planarized into {} across {} columns",
            segments.len(),
            lines.len(),
            xs.len().saturating_sub(1)
        );
        if xs.len() < 2 {
            return Ok(empty());
        }

        let (bottom, top) = (env.min().y, env.max().y);
        lines.extend(
            xs.iter()
                .filter_map(|&x| Segment::new(Coord { x, y: bottom }, Coord { x, y: top })),
        );
        self.check_cancel()?;
        let split = split_points(&lines);
        let (x2pts, pt2maxy) = index_columns(&split, &xs, env.max().y);
        self.check_cancel()?;

        let cancel = self.cancel.as_deref();
        let cols = try_map_ordered(&xs[..xs.len() - 1], |i, &x1| {
            guarded(
                || format!("column {} [{}, {}]", i, x1, xs[i + 1]),
                || {
                    check_cancel(cancel)?;
                    build_ring_col(classifier, &x2pts[i], &x2pts[i + 1], &pt2maxy, cancel)
                },
            )
        })?;
        debug!(
            "make_valid: {} of {} columns hold rings",
            cols.iter().filter(|c| !c.is_empty()).count(),
            cols.len()
        );

        let polygons = generate_runs(&cols, cancel)?;
        debug!("make_valid: {} polygons", polygons.len());
        Ok(MultiPolygon::new(polygons))
    }
}

/// Runs [`MakeValid`] with default settings.
pub fn make_valid<C>(
    classifier: &C,
    extent: Option<Rect<f64>>,
    fragments: &[LineString<f64>],
) -> Result<MultiPolygon<f64>>
where
    C: Classify + Sync + ?Sized,
{
    MakeValid::new().make_valid(classifier, extent, fragments)
}

fn check_cancel(cancel: Option<&AtomicBool>) -> Result<()> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(MakeValidError::Cancelled),
        _ => Ok(()),
    }
}

/// Splits each fragment into lines, closing it with one extra line when its ends differ.
///
/// Fragments of a single line stay open.
pub fn insure_connected(fragments: &[LineString<f64>]) -> Vec<Vec<Line<f64>>> {
    fragments
        .iter()
        .map(|ls| {
            let mut lines: Vec<Line<f64>> = ls.lines().collect();
            if lines.len() > 1 {
                let (first, last) = (lines[0].start, lines[lines.len() - 1].end);
                if first != last {
                    lines.push(Line::new(last, first));
                }
            }
            lines
        })
        .collect()
}

/// Union of `extent` and the data bounds, grown by `margin` on every side.
///
/// `None` when there is nothing to bound or the result has no area.
pub fn adjust_envelope(
    extent: Option<Rect<f64>>,
    polygons: &[Vec<Line<f64>>],
    margin: f64,
) -> Option<Rect<f64>> {
    let pts: Vec<Pt> = polygons.iter().flatten().flat_map(|l| [l.start, l.end]).collect();
    let data = bbox(&pts);
    let (min, max) = match (extent, data) {
        (Some(e), Some(d)) => (
            Coord { x: e.min().x.min(d.min().x), y: e.min().y.min(d.min().y) },
            Coord { x: e.max().x.max(d.max().x), y: e.max().y.max(d.max().y) },
        ),
        (Some(r), None) | (None, Some(r)) => (r.min(), r.max()),
        (None, None) => return None,
    };
    let env = Rect::new(
        Coord { x: min.x - margin, y: min.y - margin },
        Coord { x: max.x + margin, y: max.y + margin },
    );
    if env.width() <= 0.0 || env.height() <= 0.0 {
        return None;
    }
    Some(env)
}

/// Flattens the fragments into unique canonical segments, plus the envelope's edges and
/// two anchors tying its lower-left and upper-right corners to the data.
///
/// Returns nothing when fewer than two segments result.
pub fn destructure(polygons: &[Vec<Line<f64>>], env: Rect<f64>) -> Vec<Segment> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut push = |seg: Option<Segment>, out: &mut Vec<Segment>| {
        if let Some(s) = seg {
            if seen.insert(s.key()) {
                out.push(s);
            }
        }
    };

    for line in polygons.iter().flatten() {
        push(Segment::from_line(*line), &mut out);
    }
    let data_min = out.iter().map(|s| s.start()).min_by(|a, b| xy_order(*a, *b));
    let data_max = out.iter().map(|s| s.end()).max_by(|a, b| xy_order(*a, *b));

    let (min, max) = (env.min(), env.max());
    let corners = [min, Coord { x: max.x, y: min.y }, max, Coord { x: min.x, y: max.y }];
    for i in 0..4 {
        push(Segment::new(corners[i], corners[(i + 1) % 4]), &mut out);
    }
    if let (Some(lo), Some(hi)) = (data_min, data_max) {
        push(Segment::new(min, lo), &mut out);
        push(Segment::new(max, hi), &mut out);
    }

    if out.len() <= 1 {
        return Vec::new();
    }
    out
}

/// Groups split points by column boundary and records, for each point, the highest
/// right-hand neighbour it is joined to, capped at `max_y`.
pub fn index_columns(split: &[Vec<Pt>], xs: &[f64], max_y: f64) -> (Vec<Vec<Pt>>, MaxPartnerY) {
    let slots: HashMap<u64, usize> = xs
        .iter()
        .enumerate()
        .map(|(i, x)| ((x + 0.0).to_bits(), i))
        .collect();
    let mut x2pts: Vec<Vec<Pt>> = vec![Vec::new(); xs.len()];
    let mut pt2maxy = MaxPartnerY::new();
    let cap = scaled_y(max_y);
    let mut stray = 0usize;

    let mut add = |p: Pt, x2pts: &mut Vec<Vec<Pt>>| match slots.get(&(p.x + 0.0).to_bits()) {
        Some(&i) => x2pts[i].push(p),
        None => stray += 1,
    };
    for pts in split {
        for w in pts.windows(2) {
            let (p1, p2) = (w[0], w[1]);
            add(p1, &mut x2pts);
            add(p2, &mut x2pts);
            if p1.x != p2.x {
                let y = if p2.y < max_y { scaled_y(p2.y) } else { cap };
                pt2maxy.record(p1, y);
            }
        }
    }
    if stray > 0 {
        trace!("index_columns: {} points off every column boundary", stray);
    }

    for col in &mut x2pts {
        sort_unique(col);
    }
    (x2pts, pt2maxy)
}

/// Maximal runs of consecutive columns that hold rings.
pub(crate) fn column_runs(cols: &[RingCol]) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, col) in cols.iter().enumerate() {
        match (col.is_empty(), start) {
            (true, Some(s)) => {
                out.push(s..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(s..cols.len());
    }
    out
}

/// Merges every run of adjacent non-empty columns and assembles the polygons, run by run.
pub fn generate_multi_polygon(cols: &[RingCol]) -> Result<Vec<Polygon<f64>>> {
    generate_runs(cols, None)
}

fn generate_runs(cols: &[RingCol], cancel: Option<&AtomicBool>) -> Result<Vec<Polygon<f64>>> {
    let runs = column_runs(cols);
    trace!("generate_multi_polygon: {} runs over {} columns", runs.len(), cols.len());
    let per_run = try_map_ordered(&runs, |i, run| {
        guarded(
            || format!("merge run {} (columns {}..{})", i, run.start, run.end),
            || {
                check_cancel(cancel)?;
                let merged = merge_cols(&cols[run.clone()])?;
                Ok(merged.multi_polygon())
            },
        )
    })?;
    Ok(per_run.into_iter().flatten().collect())
}
