use crate::error::{MakeValidError, Result};
use crate::primitives::{scaled_y, Pt, PtKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A triangle (or degenerate cell) of a column: `[col1_start, col1_len, col2_start, col2_len]`.
///
/// The lengths always sum to three.
pub type Tri = [usize; 4];

/// For each left column point, the highest scaled y of a right-hand point it is joined to.
#[derive(Debug, Clone, Default)]
pub struct MaxPartnerY {
    map: HashMap<PtKey, i64>,
}

impl MaxPartnerY {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pt: Pt) -> Option<i64> {
        self.map.get(&pt.into()).copied()
    }

    /// Records `partner_y` (already scaled) for `pt`, keeping the maximum.
    pub fn record(&mut self, pt: Pt, partner_y: i64) {
        self.map
            .entry(pt.into())
            .and_modify(|y| *y = (*y).max(partner_y))
            .or_insert(partner_y);
    }

    pub fn insert(&mut self, pt: Pt, y: i64) {
        self.map.insert(pt.into(), y);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Triangles for the start of the remaining columns, plus how far to advance each side.
///
/// The diagonal from `col1[0]` never rises above its recorded partner, so every planarized
/// edge leaving the left boundary is reproduced by some triangle side.
pub fn get_triangles(
    pt2maxy: &MaxPartnerY,
    col1: &[Pt],
    col2: &[Pt],
) -> Result<(Vec<Tri>, usize, usize)> {
    let (len1, len2) = (col1.len(), col2.len());
    if len1 == 0 || len2 == 0 || (len1 < 2 && len2 < 2) {
        return Err(MakeValidError::ColumnTooShort { left: len1, right: len2 });
    }
    if len1 == 1 {
        return Ok((vec![[0, 1, 0, 2]], 0, 1));
    }
    if len2 == 1 {
        return Ok((vec![[0, 2, 0, 1]], 1, 0));
    }

    match pt2maxy.get(col1[0]) {
        Some(maxy) if maxy > scaled_y(col2[0].y) => {
            let mut tris = Vec::new();
            let mut idx = 1;
            while idx < len2 - 1 && scaled_y(col2[idx].y) < maxy {
                tris.push([0, 1, idx - 1, 2]);
                idx += 1;
            }
            tris.push([0, 1, idx - 1, 2]);
            tris.push([0, 2, idx, 1]);
            Ok((tris, 1, idx))
        }
        _ => {
            let mut tris = vec![[0, 2, 0, 1]];
            let mut idx = 0;
            if scaled_y(col2[1].y) <= scaled_y(col1[1].y) {
                tris.push([1, 1, 0, 2]);
                idx = 1;
            }
            Ok((tris, 1, idx))
        }
    }
}

/// Covers the strip between two sorted boundary columns with triangles.
pub fn triangles_for_col(
    pt2maxy: &MaxPartnerY,
    col1: &[Pt],
    col2: &[Pt],
    cancel: Option<&AtomicBool>,
) -> Result<Vec<Tri>> {
    let (len1, len2) = (col1.len(), col2.len());
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    loop {
        if cancel.map_or(false, |c| c.load(Ordering::Relaxed)) {
            return Err(MakeValidError::Cancelled);
        }
        let (tris, di, dj) = get_triangles(pt2maxy, &col1[i..], &col2[j..])?;
        out.extend(tris.into_iter().map(|t| [t[0] + i, t[1], t[2] + j, t[3]]));
        i += di;
        j += dj;
        if i >= len1 - 1 && j >= len2 - 1 {
            return Ok(out);
        }
    }
}
