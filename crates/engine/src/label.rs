// SPDX-License-Identifier: MIT

//!
//! Label layout
//!
//! A label is drawn in its own box stretched over the feature's bounds.  The
//! box is 100 units wide and as tall as the bounds' aspect ratio makes it, and
//! everything here is in those units.
//!

use crate::{Feature, LabelHints};
use geo::{Point, Rect};
use open_atlas_core::{Colour, GeometryKind, Style, box_around};
use serde::{Deserialize, Serialize};

/// The width of every label box
pub const LABEL_BOX_WIDTH: f64 = 100.0;

/// Points have no extent, so their labels get a box this many degrees wide
pub const POINT_LABEL_BOX_DEGREES: f64 = 1.0;

/// Each line of a label is this much smaller than the one above
const LINE_SHRINK: f64 = 0.2;

/// No line is smaller than this fraction of the first
const MIN_LINE_FRACTION: f64 = 0.2;

/// Point labels are sized as if they were this many characters long
const POINT_LABEL_CHARS: f64 = 25.0;

/// Font families and how many units of box width a line of text one character
/// long takes (some fonts are wider than others)
const FONT_SCALES: [(&str, f64); 9] = [
    ("Rubik", 81.0),
    ("Cabin Sketch", 87.0),
    ("Corben", 77.0),
    ("New Tegomin", 84.0),
    ("Special Elite", 81.0),
    ("Fredericka the Great", 81.0),
    ("Rye", 73.0),
    ("Akaya Telivigala", 94.0),
    ("MedievalSharp", 85.0),
];

const DEFAULT_FONT_SCALE: f64 = 85.0;

/// Where a label sits in its box
#[rustfmt::skip]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    #[display("above")]
    Above,
    #[display("below")]
    Below,
    #[display("left")]
    Left,
    #[display("right")]
    Right,
    #[display("middle")]
    Middle,
}

impl Justify {
    /// The anchor and the `(x, y)` position, as fractions of the box
    fn anchor_and_position(&self) -> (TextAnchor, f64, f64) {
        match self {
            Justify::Above => (TextAnchor::Middle, 0.50, 0.48),
            Justify::Below => (TextAnchor::Middle, 0.50, 0.54),
            Justify::Right => (TextAnchor::End, 0.48, 0.51),
            Justify::Left => (TextAnchor::Start, 0.52, 0.51),
            Justify::Middle => (TextAnchor::Middle, 0.5, 0.5),
        }
    }
}

/// Which end of the text sits at its `x` position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// A circular path for a line of text to follow.  The circle touches
/// `(start_x, start_y)` and lies below the text for positive label arcs and
/// above it for negative ones.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ArcPath {
    pub start_x: f64,
    pub start_y: f64,
    pub radius: f64,
    pub clockwise: bool,
}

/// One line of a label
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelLine {
    pub text: String,
    pub font_size: f64,
    pub x: f64,
    pub y: f64,

    /// If set, the text follows the arc (centred on it) instead of sitting at
    /// `(x, y)`
    pub arc: Option<ArcPath>,
}

/// Everything the render surface needs to draw a label
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelLayout {
    /// Geographic bounds the label box is stretched over
    pub bounds: Rect,
    pub width: f64,
    pub height: f64,
    pub anchor: TextAnchor,
    pub font_family: String,
    pub font_colour: Colour,

    /// Degrees, about the centre of the box
    pub rotate: Option<f64>,

    /// Applied after rotating
    pub translate: Option<(f64, f64)>,

    pub lines: Vec<LabelLine>,
}

/// How wide the given font family's text is
pub fn font_scale(family: &str) -> f64 {
    FONT_SCALES
        .iter()
        .find(|(name, _)| *name == family)
        .map_or(DEFAULT_FONT_SCALE, |(_, scale)| *scale)
}

/// The box a feature's label is stretched over.  Points get a fixed size box
/// centred on them.
pub fn label_bounds(kind: GeometryKind, shape_bounds: Rect) -> Rect {
    match kind {
        GeometryKind::Point => {
            box_around(Point::from(shape_bounds.center()), POINT_LABEL_BOX_DEGREES)
        }
        _ => shape_bounds,
    }
}

/// Lay out a feature's label.  Returns `None` if the feature has no label or
/// no bounds.
pub fn layout_feature_label(
    feature: &Feature,
    kind: GeometryKind,
    shape_bounds: Option<Rect>,
    hints: &LabelHints,
    style: &Style,
) -> Option<LabelLayout> {
    let text = feature.label_text()?;
    let bounds = label_bounds(kind, shape_bounds?);
    Some(layout_label(&text, kind, bounds, hints, style))
}

/// Lay out label text in a box stretched over `bounds`
pub fn layout_label(
    text: &str,
    kind: GeometryKind,
    bounds: Rect,
    hints: &LabelHints,
    style: &Style,
) -> LabelLayout {
    let width = LABEL_BOX_WIDTH;
    let height = if bounds.width() > 0.0 {
        width * bounds.height() / bounds.width()
    } else {
        width
    };

    let segments: Vec<&str> = text.split('\n').collect();
    let longest = segments
        .iter()
        .map(|segment| segment.chars().count())
        .max()
        .unwrap_or(0)
        .max(1) as f64;

    let scale = font_scale(&style.font_family);
    let mut base_size = match kind {
        GeometryKind::Point => scale / POINT_LABEL_CHARS,
        _ => scale / longest,
    };
    if let Some(label_scale) = hints.scale {
        base_size *= label_scale;
    }

    let justify = hints.justify.unwrap_or(match kind {
        GeometryKind::Point => Justify::Left,
        _ => Justify::Middle,
    });
    let (anchor, x_fraction, y_fraction) = justify.anchor_and_position();
    let (tx, ty) = (width * x_fraction, height * y_fraction);

    let lines = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let font_size = base_size * (1.0 - LINE_SHRINK * i as f64).max(MIN_LINE_FRACTION);
            let arc = hints.arc.map(|arc| ArcPath {
                start_x: width / 2.0,
                start_y: height / 2.0 + 2.0 * arc + i as f64 * font_size,
                radius: arc.abs(),
                clockwise: arc >= 0.0,
            });
            LabelLine {
                text: segment.to_string(),
                font_size,
                x: tx,
                y: ty + i as f64 * font_size,
                arc,
            }
        })
        .collect();

    let translate = match (hints.x, hints.y) {
        (None, None) => None,
        (x, y) => Some((x.unwrap_or(0.0), y.unwrap_or(0.0))),
    };

    LabelLayout {
        bounds,
        width,
        height,
        anchor,
        font_family: style.font_family.clone(),
        font_colour: style.font_colour,
        rotate: hints.rotate,
        translate,
        lines,
    }
}
