// SPDX-License-Identifier: MIT

//!
//! Feature geometry.  Coordinates are GeoJSON `[lon, lat]` pairs held as
//! `geo` types.
//!

use geo::{BoundingRect, Coord, Intersects, LineString, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Errors that can arise when reading feature coordinates
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("coordinates are not valid JSON for a {kind}: {error}")]
    Json {
        kind: GeometryKind,
        error: serde_json::Error,
    },

    #[error("coordinates are not valid for a {kind}: {error}")]
    GeoJson {
        kind: GeometryKind,
        error: geojson::Error,
    },

    #[error("expected {kind} coordinates")]
    KindMismatch { kind: GeometryKind },
}

/// The geometry kinds the atlas can draw
#[rustfmt::skip]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(derive_more::Display, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
}

impl GeometryKind {
    /// Look up a GeoJSON geometry `type` name.  Returns `None` for kinds the
    /// atlas doesn't draw (e.g. `GeometryCollection`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(GeometryKind::Point),
            "LineString" => Some(GeometryKind::LineString),
            "Polygon" => Some(GeometryKind::Polygon),
            "MultiPolygon" => Some(GeometryKind::MultiPolygon),
            _ => None,
        }
    }

    /// The GeoJSON geometry `type` name
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
        }
    }
}

/// A feature's geometry
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Point(Point),
    LineString(LineString),
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Shape {
    /// Read the GeoJSON `coordinates` member of a geometry of the given kind
    pub fn from_coordinates(
        kind: GeometryKind,
        coordinates: serde_json::Value,
    ) -> Result<Self, ShapeError> {
        let value = serde_json::json!({ "type": kind.name(), "coordinates": coordinates });
        let geometry: geojson::Geometry =
            serde_json::from_value(value).map_err(|error| ShapeError::Json { kind, error })?;
        let geometry: geo::Geometry = geometry
            .value
            .try_into()
            .map_err(|error| ShapeError::GeoJson { kind, error })?;

        match (kind, geometry) {
            (GeometryKind::Point, geo::Geometry::Point(point)) => Ok(Shape::Point(point)),
            (GeometryKind::LineString, geo::Geometry::LineString(line)) => {
                Ok(Shape::LineString(line))
            }
            (GeometryKind::Polygon, geo::Geometry::Polygon(polygon)) => {
                Ok(Shape::Polygon(polygon))
            }
            (GeometryKind::MultiPolygon, geo::Geometry::MultiPolygon(polygons)) => {
                Ok(Shape::MultiPolygon(polygons))
            }
            _ => Err(ShapeError::KindMismatch { kind }),
        }
    }

    /// The kind of geometry
    pub fn kind(&self) -> GeometryKind {
        match self {
            Shape::Point(_) => GeometryKind::Point,
            Shape::LineString(_) => GeometryKind::LineString,
            Shape::Polygon(_) => GeometryKind::Polygon,
            Shape::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }

    /// The polygons of a `Polygon` or `MultiPolygon` (for aggregating several
    /// shapes into one `MultiPolygon`)
    pub fn polygons(&self) -> Option<Vec<Polygon>> {
        match self {
            Shape::Polygon(polygon) => Some(vec![polygon.clone()]),
            Shape::MultiPolygon(polygons) => Some(polygons.0.clone()),
            Shape::Point(_) | Shape::LineString(_) => None,
        }
    }

    /// The bounding rectangle (`None` only for empty geometry)
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Shape::Point(point) => Some(point.bounding_rect()),
            Shape::LineString(line) => line.bounding_rect(),
            Shape::Polygon(polygon) => polygon.bounding_rect(),
            Shape::MultiPolygon(polygons) => polygons.bounding_rect(),
        }
    }

    /// Convert to the general `geo` geometry type
    pub fn to_geo(&self) -> geo::Geometry {
        match self {
            Shape::Point(point) => geo::Geometry::Point(*point),
            Shape::LineString(line) => geo::Geometry::LineString(line.clone()),
            Shape::Polygon(polygon) => geo::Geometry::Polygon(polygon.clone()),
            Shape::MultiPolygon(polygons) => geo::Geometry::MultiPolygon(polygons.clone()),
        }
    }
}

/// Shapes are written out as GeoJSON geometry objects
impl Serialize for Shape {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        geojson::Geometry::new(geojson::Value::from(&self.to_geo())).serialize(serializer)
    }
}

/// A square box, `size` degrees wide, centred on a point
pub fn box_around(point: Point, size: f64) -> Rect {
    let half = size / 2.0;
    Rect::new(
        Coord {
            x: point.x() - half,
            y: point.y() - half,
        },
        Coord {
            x: point.x() + half,
            y: point.y() + half,
        },
    )
}

/// Whether two bounding rectangles overlap (touching counts)
pub fn bounds_intersect(a: &Rect, b: &Rect) -> bool {
    a.intersects(b)
}
