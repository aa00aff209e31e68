use crate::classifier::RingSegments;
use crate::column::RingCol;
use crate::primitives::{rect_area, rect_contains_rect, Label, Pt};
use geo_types::{LineString, Polygon, Rect};
use log::{trace, warn};
use rstar::{RTree, RTreeObject, AABB};

struct IndexedRing(Rect<f64>, usize);

impl RTreeObject for IndexedRing {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        aabb(&self.0)
    }
}

fn aabb(r: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y])
}

struct Shell {
    exterior: Vec<Pt>,
    extent: Rect<f64>,
    area: f64,
    segments: RingSegments,
    holes: Vec<LineString<f64>>,
}

impl RingCol {
    /// Turns the labelled rings of a merged column into polygons.
    ///
    /// Inside rings become exteriors. Outside rings become holes of the smallest Inside
    /// ring enclosing them, unless they touch the column's boundary indexes or its
    /// top or bottom, in which case they are the space around the data and are dropped.
    pub fn multi_polygon(&self) -> Vec<Polygon<f64>> {
        if self.rings.is_empty() {
            return Vec::new();
        }

        let mut discard = vec![false; self.rings.len()];
        let mut ys = self.y1s.iter().chain(&self.y2s).map(|e| e.y);
        let (miny, maxy) = match ys.next() {
            Some(first) => ys.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))),
            None => (0.0, 0.0),
        };
        for edge in self.y1s.iter().chain(&self.y2s) {
            for desc in &edge.descs {
                if desc.label == Label::Outside {
                    discard[desc.idx] = true;
                }
            }
        }

        let mut shells = Vec::new();
        let mut holes = Vec::new();
        for (i, ring) in self.rings.iter().enumerate() {
            if discard[i] {
                continue;
            }
            let Some(extent) = ring.extent() else {
                continue;
            };
            match ring.label {
                Label::Outside => {
                    if extent.min().y == miny || extent.max().y == maxy {
                        continue;
                    }
                    holes.push((ring.line_ring(), extent));
                }
                Label::Inside => shells.push(Shell {
                    exterior: ring.line_ring(),
                    extent,
                    area: ring.area(),
                    segments: RingSegments::from_ring(Label::Inside, &ring.points),
                    holes: Vec::new(),
                }),
            }
        }

        let tree = RTree::bulk_load(
            shells
                .iter()
                .enumerate()
                .map(|(i, s)| IndexedRing(s.extent, i))
                .collect(),
        );

        for (hole, extent) in holes {
            let Some(&first) = hole.first() else {
                continue;
            };
            let hole_area = rect_area(&extent);
            let best = tree
                .locate_in_envelope_intersecting(&aabb(&extent))
                .map(|cand| cand.1)
                .filter(|&i| {
                    let shell = &shells[i];
                    rect_area(&shell.extent) > hole_area
                        && rect_contains_rect(&shell.extent, &extent)
                        && shell.segments.contains(first)
                })
                .min_by(|&a, &b| shells[a].area.total_cmp(&shells[b].area).then(a.cmp(&b)));

            match best {
                Some(i) => shells[i].holes.push(LineString::from(hole)),
                None => warn!(
                    "dropping hole at ({}, {}) in column [{}, {}]: no enclosing ring",
                    first.x, first.y, self.x1, self.x2
                ),
            }
        }

        trace!("column [{}, {}] assembled into {} polygons", self.x1, self.x2, shells.len());
        shells
            .into_iter()
            .map(|s| Polygon::new(LineString::from(s.exterior), s.holes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::column::{Ring, RingCol};
    use crate::primitives::{Label, Pt};
    use approx::assert_relative_eq;
    use geo::Area;
    use geo_types::{Coord, LineString, Polygon};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Pt> {
        vec![
            Coord { x: x0, y: y0 },
            Coord { x: x1, y: y0 },
            Coord { x: x1, y: y1 },
            Coord { x: x0, y: y1 },
        ]
    }

    fn col(x1: f64, x2: f64, rings: Vec<(Label, Vec<Pt>)>) -> RingCol {
        let mut col = RingCol::new(x1, x2);
        for (label, points) in rings {
            col.push_ring(Ring::new(label, points));
        }
        col.rebuild_index();
        col
    }

    fn signed(ls: &LineString<f64>) -> f64 {
        Polygon::new(ls.clone(), vec![]).signed_area()
    }

    #[test]
    fn test_hole_and_orientation() {
        let rc = col(
            0.0,
            30.0,
            vec![
                (Label::Inside, square(0.0, 0.0, 10.0, 6.0)),
                (Label::Outside, square(2.0, 2.0, 4.0, 4.0)),
                // Nothing encloses this one.
                (Label::Outside, square(20.0, 2.0, 22.0, 4.0)),
            ],
        );

        let polys = rc.multi_polygon();
        assert_eq!(polys.len(), 1);
        let poly = &polys[0];
        assert_eq!(poly.interiors().len(), 1);
        assert!(signed(poly.exterior()) > 0.0);
        assert!(signed(&poly.interiors()[0]) < 0.0);
        assert_eq!(poly.exterior().0[0], Coord { x: 0.0, y: 0.0 });
        assert_eq!(poly.interiors()[0].0[0], Coord { x: 2.0, y: 2.0 });
        assert!(poly.exterior().is_closed());
        assert_relative_eq!(poly.unsigned_area(), 56.0);
    }

    #[test]
    fn test_hole_goes_to_smallest_container() {
        let rc = col(
            0.0,
            10.0,
            vec![
                (Label::Inside, square(0.0, 0.0, 10.0, 10.0)),
                (Label::Outside, square(1.0, 1.0, 9.0, 9.0)),
                (Label::Inside, square(2.0, 2.0, 8.0, 8.0)),
                (Label::Outside, square(3.0, 3.0, 5.0, 5.0)),
            ],
        );

        let polys = rc.multi_polygon();
        assert_eq!(polys.len(), 2);
        assert_eq!(polys[0].interiors().len(), 1);
        assert_eq!(polys[0].interiors()[0].0[0], Coord { x: 1.0, y: 1.0 });
        assert_eq!(polys[1].interiors().len(), 1);
        assert_eq!(polys[1].interiors()[0].0[0], Coord { x: 3.0, y: 3.0 });
        let area = polys[0].unsigned_area() + polys[1].unsigned_area();
        assert_relative_eq!(area, 100.0 - 64.0 + 36.0 - 4.0);
    }

    #[test]
    fn test_outside_rings_on_the_border_are_dropped() {
        let rc = col(
            0.0,
            4.0,
            vec![
                (
                    Label::Outside,
                    vec![
                        Coord { x: 0.0, y: 0.0 },
                        Coord { x: 4.0, y: 0.0 },
                        Coord { x: 2.0, y: 1.0 },
                    ],
                ),
                (Label::Inside, square(1.0, 1.0, 3.0, 3.0)),
            ],
        );
        let polys = rc.multi_polygon();
        assert_eq!(polys.len(), 1);
        assert!(polys[0].interiors().is_empty());

        assert!(RingCol::default().multi_polygon().is_empty());
    }
}
