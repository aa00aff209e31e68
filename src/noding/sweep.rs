use crate::primitives::{xy_order, Pt, Segment};

/// The set of segments currently crossed by the sweep line.
pub trait ActiveSet {
    fn insert(&mut self, idx: usize);
    fn remove(&mut self, idx: usize);
    fn contains(&self, idx: usize) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Calls `f` for every active index, in ascending order.
    fn visit(&self, f: &mut dyn FnMut(usize));
}

/// Flag-per-segment active set; membership is O(1), enumeration scans all flags.
#[derive(Debug, Clone)]
pub struct ArrayActiveSet {
    flags: Vec<bool>,
    count: usize,
}

impl ArrayActiveSet {
    pub fn with_capacity(n: usize) -> Self {
        Self { flags: vec![false; n], count: 0 }
    }
}

impl ActiveSet for ArrayActiveSet {
    fn insert(&mut self, idx: usize) {
        if !self.flags[idx] {
            self.flags[idx] = true;
            self.count += 1;
        }
    }

    fn remove(&mut self, idx: usize) {
        if self.flags[idx] {
            self.flags[idx] = false;
            self.count -= 1;
        }
    }

    fn contains(&self, idx: usize) -> bool {
        self.flags[idx]
    }

    fn len(&self) -> usize {
        self.count
    }

    fn visit(&self, f: &mut dyn FnMut(usize)) {
        for (i, &on) in self.flags.iter().enumerate() {
            if on {
                f(i);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Event {
    pt: Pt,
    edge: usize,
}

/// Quick rejection: true when one segment lies strictly on one side of the other's line.
///
/// Collinear and touching pairs are not rejected.
pub fn does_not_intersect(a: (Pt, Pt), b: (Pt, Pt)) -> bool {
    let order = |(p, q): (Pt, Pt)| {
        if p.x > q.x || (p.x == q.x && p.y > q.y) {
            (q, p)
        } else {
            (p, q)
        }
    };
    let (a0, a1) = order(a);
    let (b0, b1) = order(b);

    let side = |o: Pt, d: Pt, p: Pt| (d.x - o.x) * (p.y - o.y) - (d.y - o.y) * (p.x - o.x);

    if side(a0, a1, b0) * side(a0, a1, b1) > 0.0 {
        return true;
    }
    side(b0, b1, a0) * side(b0, b1, a1) > 0.0
}

/// Sweeps the segments left to right and reports every candidate intersecting pair.
///
/// A pair is tested when the later-ending segment closes: pairs sharing an endpoint and
/// pairs rejected by [`does_not_intersect`] are not reported, nor are pairs for which
/// `skip(closing, active)` returns true. `on_hit(closing, active)` receives the rest.
pub fn find_intersects<A, S, F>(segments: &[Segment], active: &mut A, mut skip: S, mut on_hit: F)
where
    A: ActiveSet,
    S: FnMut(usize, usize) -> bool,
    F: FnMut(usize, usize),
{
    let mut events: Vec<Event> = segments
        .iter()
        .enumerate()
        .flat_map(|(i, s)| [Event { pt: s.start(), edge: i }, Event { pt: s.end(), edge: i }])
        .collect();
    events.sort_by(|a, b| xy_order(a.pt, b.pt));

    let mut candidates = Vec::new();
    for ev in &events {
        let idx = ev.edge;
        if !active.contains(idx) {
            active.insert(idx);
            continue;
        }
        active.remove(idx);
        if active.is_empty() {
            continue;
        }

        candidates.clear();
        active.visit(&mut |s| candidates.push(s));
        let seg = &segments[idx];
        for &s in &candidates {
            if skip(idx, s) {
                continue;
            }
            let other = &segments[s];
            if seg.shares_endpoint(other) {
                continue;
            }
            if does_not_intersect((seg.start(), seg.end()), (other.start(), other.end())) {
                continue;
            }
            on_hit(idx, s);
        }
    }
}

/// Marks the candidate edges that cross at least one constraint edge.
///
/// Candidates are only ever tested against constraints, never against each other.
pub fn crossing_candidates(candidates: &[Segment], constraints: &[Segment]) -> Vec<bool> {
    let offset = candidates.len();
    let all: Vec<Segment> = candidates.iter().chain(constraints).copied().collect();
    let mut crosses = vec![false; offset];
    let mut active = ArrayActiveSet::with_capacity(all.len());

    find_intersects(
        &all,
        &mut active,
        |a, b| (a < offset) == (b < offset),
        |a, b| {
            if a < offset {
                crosses[a] = true;
            } else {
                crosses[b] = true;
            }
        },
    );
    crosses
}
