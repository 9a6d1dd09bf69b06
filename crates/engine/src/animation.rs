// SPDX-License-Identifier: MIT

//!
//! Morphing one feature's shape, style, and label into another's
//!
//! A [`MorphPlan`] is prepared once, at load time, for each feature that
//! animates to another.  Preparing it works out which vertices actually move
//! so that each frame only touches those.
//!

use crate::{Feature, LabelHints};
use geo::{Coord, LineString, Point, Polygon};
use open_atlas_core::{FeatureId, GeometryKind, Instant, Shape, Style, clamp_ratio, lerp};
use thiserror::Error;

/// An absent label arc is treated as this (a nearly flat arc) so that arcs
/// ease in and out instead of jumping
pub const FLAT_ARC: f64 = 500.0;

/// Errors that can arise when preparing a morph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    /// Every vertex of a ring needs a partner
    #[error("ring {ring} has {from} vertices but its target ring has {to}")]
    LengthMismatch { ring: usize, from: usize, to: usize },

    /// A line can only grow
    #[error("line has {from} vertices but its target has only {to}")]
    UnsupportedShrink { from: usize, to: usize },

    #[error("a {from} cannot morph into a {to}")]
    IncompatibleMorph {
        from: GeometryKind,
        to: GeometryKind,
    },
}

/// One outer ring's (or one line's) moving vertices
#[derive(Debug, Clone, PartialEq)]
pub struct RingDiff {
    /// Which polygon the ring is the exterior of
    polygon: usize,

    /// `(vertex index, from, to)` for each vertex that moves
    moves: Vec<(usize, Coord, Coord)>,
}

/// How to grow a line into a longer one
#[derive(Debug, Clone, PartialEq)]
pub struct LineGrowth {
    /// The new vertices, in order
    added: Vec<Coord>,

    /// Path length from the source's last vertex to each added vertex
    cumulative: Vec<f64>,

    /// Path length to the last added vertex
    total: f64,
}

/// What changes between a source and a target geometry
#[derive(Debug, Clone, PartialEq)]
pub enum DiffPlan {
    Point { from: Point, to: Point },
    Rings(Vec<RingDiff>),
    Grow(LineGrowth),
}

impl DiffPlan {
    /// Work out what moves between two shapes
    pub fn prepare(from: &Shape, to: &Shape) -> Result<Self, AnimationError> {
        match (from, to) {
            (Shape::Point(from), Shape::Point(to)) => Ok(DiffPlan::Point {
                from: *from,
                to: *to,
            }),
            (Shape::Polygon(from), Shape::Polygon(to)) => {
                Ok(DiffPlan::Rings(diff_rings(&[from], &[to])?))
            }
            (Shape::MultiPolygon(from), Shape::MultiPolygon(to)) => {
                let from: Vec<&Polygon> = from.iter().collect();
                let to: Vec<&Polygon> = to.iter().collect();
                Ok(DiffPlan::Rings(diff_rings(&from, &to)?))
            }
            (Shape::LineString(from), Shape::LineString(to)) => prepare_line(from, to),
            _ => Err(AnimationError::IncompatibleMorph {
                from: from.kind(),
                to: to.kind(),
            }),
        }
    }

    /// The shape at `ratio` (0.0 is `source`).  `source` must be the shape
    /// the plan was prepared from.  Vertices that don't move are left exactly
    /// as they are in `source`.
    pub fn interpolate(&self, source: &Shape, ratio: f64) -> Shape {
        let ratio = clamp_ratio(ratio);
        match (self, source) {
            (DiffPlan::Point { from, to }, _) => Shape::Point(Point::new(
                lerp(from.x(), to.x(), ratio),
                lerp(from.y(), to.y(), ratio),
            )),
            (DiffPlan::Rings(rings), Shape::Polygon(polygon)) => {
                let mut polygon = polygon.clone();
                for ring in rings.iter().filter(|ring| ring.polygon == 0) {
                    move_vertices(&mut polygon, &ring.moves, ratio);
                }
                Shape::Polygon(polygon)
            }
            (DiffPlan::Rings(rings), Shape::MultiPolygon(polygons)) => {
                let mut polygons = polygons.clone();
                for ring in rings {
                    if let Some(polygon) = polygons.0.get_mut(ring.polygon) {
                        move_vertices(polygon, &ring.moves, ratio);
                    }
                }
                Shape::MultiPolygon(polygons)
            }
            (DiffPlan::Rings(rings), Shape::LineString(line)) => {
                let mut line = line.clone();
                for ring in rings {
                    move_coords(&mut line.0, &ring.moves, ratio);
                }
                Shape::LineString(line)
            }
            (DiffPlan::Grow(growth), Shape::LineString(line)) => {
                Shape::LineString(grow_line(line, growth, ratio))
            }
            // Not the shape the plan was prepared from
            (_, source) => source.clone(),
        }
    }
}

/// Pair up outer rings (as many as both sides have) and record the vertices
/// that differ
fn diff_rings(from: &[&Polygon], to: &[&Polygon]) -> Result<Vec<RingDiff>, AnimationError> {
    from.iter()
        .zip(to.iter())
        .enumerate()
        .map(|(polygon, (from, to))| {
            let from = &from.exterior().0;
            let to = &to.exterior().0;
            if from.len() != to.len() {
                return Err(AnimationError::LengthMismatch {
                    ring: polygon,
                    from: from.len(),
                    to: to.len(),
                });
            }
            let moves = from
                .iter()
                .zip(to.iter())
                .enumerate()
                .filter(|(_, (from, to))| from.x != to.x || from.y != to.y)
                .map(|(index, (from, to))| (index, *from, *to))
                .collect();
            Ok(RingDiff { polygon, moves })
        })
        .collect()
}

fn move_vertices(polygon: &mut Polygon, moves: &[(usize, Coord, Coord)], ratio: f64) {
    polygon.exterior_mut(|ring| move_coords(&mut ring.0, moves, ratio));
}

fn move_coords(coords: &mut [Coord], moves: &[(usize, Coord, Coord)], ratio: f64) {
    for (index, from, to) in moves {
        if let Some(coord) = coords.get_mut(*index) {
            *coord = Coord {
                x: lerp(from.x, to.x, ratio),
                y: lerp(from.y, to.y, ratio),
            };
        }
    }
}

/// Lines of equal length morph vertex by vertex, like rings.  Longer targets
/// grow from the end of the source.
fn prepare_line(from: &LineString, to: &LineString) -> Result<DiffPlan, AnimationError> {
    let (from_len, to_len) = (from.0.len(), to.0.len());
    if to_len < from_len {
        return Err(AnimationError::UnsupportedShrink {
            from: from_len,
            to: to_len,
        });
    }
    if to_len == from_len {
        let moves = from
            .0
            .iter()
            .zip(to.0.iter())
            .enumerate()
            .filter(|(_, (from, to))| from.x != to.x || from.y != to.y)
            .map(|(index, (from, to))| (index, *from, *to))
            .collect();
        return Ok(DiffPlan::Rings(vec![RingDiff { polygon: 0, moves }]));
    }

    let added: Vec<Coord> = to.0[from_len..].to_vec();
    let mut cumulative = Vec::with_capacity(added.len());
    let mut total = 0.0;
    let mut previous = from.0.last().copied();
    for coord in &added {
        if let Some(previous) = previous {
            total += (coord.x - previous.x).hypot(coord.y - previous.y);
        }
        cumulative.push(total);
        previous = Some(*coord);
    }
    Ok(DiffPlan::Grow(LineGrowth {
        added,
        cumulative,
        total,
    }))
}

fn grow_line(source: &LineString, growth: &LineGrowth, ratio: f64) -> LineString {
    let mut coords = source.0.clone();
    if ratio <= 0.0 {
        return LineString(coords);
    }
    if ratio >= 1.0 {
        coords.extend_from_slice(&growth.added);
        return LineString(coords);
    }

    let Some(&last) = coords.last() else {
        coords.extend_from_slice(&growth.added);
        return LineString(coords);
    };

    // Growing by one vertex just slides it out from the end
    if let [only] = growth.added.as_slice() {
        coords.push(Coord {
            x: lerp(last.x, only.x, ratio),
            y: lerp(last.y, only.y, ratio),
        });
        return LineString(coords);
    }

    let reach = ratio * growth.total;
    let mut previous = (last, 0.0);
    for (coord, length) in growth.added.iter().zip(growth.cumulative.iter()) {
        if *length < reach {
            coords.push(*coord);
            previous = (*coord, *length);
            continue;
        }

        // This vertex straddles the reach, so only part of the segment shows
        let (previous_coord, previous_length) = previous;
        let segment = length - previous_length;
        let part = if segment > 0.0 {
            (reach - previous_length) / segment
        } else {
            1.0
        };
        coords.push(Coord {
            x: lerp(previous_coord.x, coord.x, part),
            y: lerp(previous_coord.y, coord.y, part),
        });
        break;
    }
    LineString(coords)
}

/// A prepared morph from one feature into another
#[derive(Debug, Clone, PartialEq)]
pub struct MorphPlan {
    target: FeatureId,
    from_start: Instant,
    to_start: Instant,
    geometry: DiffPlan,
}

impl MorphPlan {
    /// Prepare the morph from `from` into `to`
    pub fn prepare(from: &Feature, to: &Feature) -> Result<Self, AnimationError> {
        Ok(MorphPlan {
            target: to.id().clone(),
            from_start: from.start(),
            to_start: to.start(),
            geometry: DiffPlan::prepare(from.shape(), to.shape())?,
        })
    }

    /// The feature being morphed into
    pub fn target(&self) -> &FeatureId {
        &self.target
    }

    pub fn geometry(&self) -> &DiffPlan {
        &self.geometry
    }

    /// How far through the morph the instant is: from the source's start
    /// (0.0) to the target's start (1.0), clamped
    pub fn ratio_at(&self, instant: Instant) -> f64 {
        let span = self.to_start.millis_since(self.from_start);
        if span <= 0 {
            return 1.0;
        }
        clamp_ratio(instant.millis_since(self.from_start) as f64 / span as f64)
    }
}

/// Blend the colours and numeric fields of two styles.  Everything else is
/// kept from `from`.
pub fn interpolate_style(from: &Style, to: &Style, ratio: f64) -> Style {
    let ratio = clamp_ratio(ratio);
    Style {
        stroke_colour: from.stroke_colour.blend(to.stroke_colour, ratio),
        stroke_weight: lerp(from.stroke_weight, to.stroke_weight, ratio),
        stroke_opacity: lerp(from.stroke_opacity, to.stroke_opacity, ratio),
        fill_colour: from.fill_colour.blend(to.fill_colour, ratio),
        fill_opacity: lerp(from.fill_opacity, to.fill_opacity, ratio),
        font_colour: from.font_colour.blend(to.font_colour, ratio),
        ..from.clone()
    }
}

/// Blend the numeric label hints of two features.  A hint only one side has
/// blends from (or to) its neutral value.
pub fn interpolate_hints(from: &LabelHints, to: &LabelHints, ratio: f64) -> LabelHints {
    let ratio = clamp_ratio(ratio);
    let blend = |from: Option<f64>, to: Option<f64>, neutral: f64| match (from, to) {
        (None, None) => None,
        (from, to) => Some(lerp(from.unwrap_or(neutral), to.unwrap_or(neutral), ratio)),
    };

    // A missing arc is "flat", bending the same way as the arc it meets
    let arc = match (from.arc, to.arc) {
        (None, None) => None,
        (Some(from), None) => Some(lerp(from, FLAT_ARC.copysign(from), ratio)),
        (None, Some(to)) => Some(lerp(FLAT_ARC.copysign(to), to, ratio)),
        (Some(from), Some(to)) => Some(lerp(from, to, ratio)),
    };

    LabelHints {
        x: blend(from.x, to.x, 0.0),
        y: blend(from.y, to.y, 0.0),
        rotate: blend(from.rotate, to.rotate, 0.0),
        scale: blend(from.scale, to.scale, 1.0),
        arc,
        ..from.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feature::test::square_feature;
    use open_atlas_core::Colour;
    use serde_json::json;

    fn shape(kind: GeometryKind, coordinates: serde_json::Value) -> Shape {
        Shape::from_coordinates(kind, coordinates).unwrap()
    }

    fn square() -> Shape {
        shape(
            GeometryKind::Polygon,
            json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]),
        )
    }

    fn stretched_square() -> Shape {
        shape(
            GeometryKind::Polygon,
            json!([[[0.0, 0.0], [3.0, 0.0], [3.0, 2.0], [0.0, 1.0], [0.0, 0.0]]]),
        )
    }

    #[test]
    fn polygon_endpoints() {
        let from = square();
        let to = stretched_square();
        let plan = DiffPlan::prepare(&from, &to).unwrap();

        let DiffPlan::Rings(rings) = &plan else {
            panic!("expected rings");
        };
        let moved: Vec<usize> = rings[0].moves.iter().map(|(index, _, _)| *index).collect();
        assert_eq!(moved, vec![1, 2]);

        assert_eq!(plan.interpolate(&from, 0.0), from);
        assert_eq!(plan.interpolate(&from, 1.0), to);
    }

    #[test]
    fn unmoved_vertices_are_untouched() {
        let from = square();
        let plan = DiffPlan::prepare(&from, &stretched_square()).unwrap();
        for ratio in [0.1, 0.25, 0.5, 0.9] {
            let Shape::Polygon(polygon) = plan.interpolate(&from, ratio) else {
                panic!("expected a polygon");
            };
            let Shape::Polygon(source) = &from else {
                panic!("expected a polygon");
            };
            for index in [0, 3, 4] {
                let got = polygon.exterior().0[index];
                let want = source.exterior().0[index];
                assert_eq!(got.x.to_bits(), want.x.to_bits());
                assert_eq!(got.y.to_bits(), want.y.to_bits());
            }
            let moved = polygon.exterior().0[1];
            assert_eq!(moved, Coord { x: 1.0 + 2.0 * ratio, y: 0.0 });
        }
    }

    #[test]
    fn ring_length_mismatch() {
        let triangle = shape(
            GeometryKind::Polygon,
            json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]),
        );
        assert_eq!(
            DiffPlan::prepare(&square(), &triangle),
            Err(AnimationError::LengthMismatch {
                ring: 0,
                from: 5,
                to: 4
            })
        );
    }

    #[test]
    fn multipolygons_pair_up_rings() {
        let from = shape(
            GeometryKind::MultiPolygon,
            json!([
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
            ]),
        );
        let to = shape(
            GeometryKind::MultiPolygon,
            json!([[[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 0.0]]]]),
        );
        let plan = DiffPlan::prepare(&from, &to).unwrap();
        let Shape::MultiPolygon(half) = plan.interpolate(&from, 0.5) else {
            panic!("expected a multipolygon");
        };
        assert_eq!(half.0.len(), 2);
        assert_eq!(half.0[0].exterior().0[1], Coord { x: 1.5, y: 0.0 });
        assert_eq!(half.0[1], {
            let Shape::MultiPolygon(from) = &from else {
                panic!("expected a multipolygon");
            };
            from.0[1].clone()
        });
    }

    #[test]
    fn incompatible_kinds() {
        let point = Shape::Point(Point::new(0.0, 0.0));
        assert_eq!(
            DiffPlan::prepare(&point, &square()),
            Err(AnimationError::IncompatibleMorph {
                from: GeometryKind::Point,
                to: GeometryKind::Polygon
            })
        );
    }

    #[test]
    fn points_slide() {
        let from = Shape::Point(Point::new(0.0, 10.0));
        let to = Shape::Point(Point::new(4.0, 2.0));
        let plan = DiffPlan::prepare(&from, &to).unwrap();
        assert_eq!(plan.interpolate(&from, 0.25), Shape::Point(Point::new(1.0, 8.0)));
        assert_eq!(plan.interpolate(&from, 1.0), to);
    }

    #[test]
    fn lines_cannot_shrink() {
        let long = shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]));
        let short = shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 0.0]]));
        assert_eq!(
            DiffPlan::prepare(&long, &short),
            Err(AnimationError::UnsupportedShrink { from: 3, to: 2 })
        );
    }

    #[test]
    fn equal_length_lines_morph_vertices() {
        let from = shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 0.0]]));
        let to = shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 2.0]]));
        let plan = DiffPlan::prepare(&from, &to).unwrap();
        assert_eq!(
            plan.interpolate(&from, 0.5),
            shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 1.0]]))
        );
        assert_eq!(plan.interpolate(&from, 1.0), to);
    }

    #[test]
    fn line_grows_by_one() {
        let from = shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 0.0]]));
        let to = shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 0.0], [1.0, 4.0]]));
        let plan = DiffPlan::prepare(&from, &to).unwrap();
        assert_eq!(
            plan.interpolate(&from, 0.5),
            shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 0.0], [1.0, 2.0]]))
        );
        assert_eq!(plan.interpolate(&from, 0.0), from);
        assert_eq!(plan.interpolate(&from, 1.0), to);
    }

    #[test]
    fn line_grows_along_its_path() {
        let from = shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 0.0]]));
        let to = shape(
            GeometryKind::LineString,
            json!([[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [2.0, 3.0]]),
        );
        let plan = DiffPlan::prepare(&from, &to).unwrap();

        // Total growth is 1 + 3 = 4, so half way is 1 along the second segment
        assert_eq!(
            plan.interpolate(&from, 0.5),
            shape(
                GeometryKind::LineString,
                json!([[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [2.0, 1.0]])
            )
        );

        // A quarter of the way reaches exactly the first new vertex
        assert_eq!(
            plan.interpolate(&from, 0.25),
            shape(GeometryKind::LineString, json!([[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]))
        );

        assert_eq!(plan.interpolate(&from, 0.0), from);
        assert_eq!(plan.interpolate(&from, 1.0), to);
    }

    #[test]
    fn ratio() {
        let from = square_feature("1", "1700", "1799");
        let to = square_feature("2", "1800", "1899");
        let plan = MorphPlan::prepare(&from, &to).unwrap();
        assert_eq!(plan.target(), &FeatureId::from("2"));
        assert_eq!(plan.ratio_at(from.start()), 0.0);
        assert_eq!(plan.ratio_at(to.start()), 1.0);
        assert_eq!(plan.ratio_at(to.end()), 1.0);

        let backwards = MorphPlan::prepare(&to, &from).unwrap();
        assert_eq!(backwards.ratio_at(from.start()), 1.0);
    }

    #[test]
    fn styles_blend() {
        let from = Style {
            fill_colour: Colour::from_rgb(0, 0, 0),
            stroke_weight: 1.0,
            ..Style::default()
        };
        let to = Style {
            fill_colour: Colour::from_rgb(0xff, 0xff, 0xff),
            stroke_weight: 3.0,
            stroke_dash: String::from("1"),
            ..Style::default()
        };
        let half = interpolate_style(&from, &to, 0.5);
        assert_eq!(half.fill_colour.to_hex(), "#808080");
        assert_eq!(half.stroke_weight, 2.0);
        assert_eq!(half.stroke_dash, "3");
        assert_eq!(interpolate_style(&from, &to, 1.0).fill_colour, to.fill_colour);
    }

    #[test]
    fn hints_blend() {
        let from = LabelHints {
            x: Some(10.0),
            arc: Some(50.0),
            ..LabelHints::default()
        };
        let to = LabelHints {
            scale: Some(3.0),
            ..LabelHints::default()
        };
        let half = interpolate_hints(&from, &to, 0.5);
        assert_eq!(half.x, Some(5.0));
        assert_eq!(half.scale, Some(2.0));
        assert_eq!(half.y, None);
        assert_eq!(half.arc, Some(275.0));

        let negative = LabelHints {
            arc: Some(-100.0),
            ..LabelHints::default()
        };
        let half = interpolate_hints(&LabelHints::default(), &negative, 0.5);
        assert_eq!(half.arc, Some(-300.0));
    }
}
