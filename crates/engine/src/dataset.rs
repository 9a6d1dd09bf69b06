// SPDX-License-Identifier: MIT

//!
//! The raw dataset, exactly as written: a GeoJSON `FeatureCollection`
//! extended with viewpoint defaults, style rules, and extra feature
//! properties.  Nothing here is validated beyond JSON shape; that's the job
//! of [`crate::normalize`].
//!

use open_atlas_core::{FeatureId, GeometryKind, StylePatch};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A whole dataset
#[derive(Debug, Clone, Deserialize)]
pub struct RawDataset {
    /// Must be `FeatureCollection`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub features: Option<Vec<RawFeature>>,

    #[serde(default)]
    pub viewpoint: Option<Viewpoint>,

    /// Applied in order, so later rules win
    #[serde(default)]
    pub styles: Vec<StyleRule>,

    /// Pop-up text for the host's info panels (carried, never interpreted)
    #[serde(default)]
    pub popups: Option<Value>,
}

/// A single feature
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeature {
    /// Must be `Feature`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub id: Option<FeatureId>,

    #[serde(default)]
    pub properties: Option<Map<String, Value>>,

    #[serde(default)]
    pub geometry: Option<RawGeometry>,
}

/// A feature's geometry, given either as coordinates or as a reference to
/// other features' geometry
#[derive(Debug, Clone, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub coordinates: Option<Value>,

    #[serde(default, rename = "copyFrom")]
    pub copy_from: Option<CopyFrom>,
}

/// Where to copy a feature's coordinates from
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CopyFrom {
    /// Copy one feature's geometry as is
    One(FeatureId),

    /// Aggregate several features' polygons into one `MultiPolygon`
    Many(Vec<FeatureId>),
}

/// The initial view a dataset asks for.  Anything given here is overridden
/// by a bookmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    /// `[lat, lon]`
    #[serde(default)]
    pub center: Option<[f64; 2]>,

    #[serde(default)]
    pub zoom: Option<f64>,

    #[serde(default)]
    pub startdatestr: Option<String>,

    #[serde(default)]
    pub enddatestr: Option<String>,

    #[serde(default)]
    pub curdatestr: Option<String>,
}

/// A style rule
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StyleRule {
    /// Applies to every feature
    Default { style: StylePatch },

    /// Applies to features that match everything given
    Match {
        #[serde(default, rename = "geometryType")]
        geometry_type: Option<GeometryKind>,

        #[serde(default)]
        properties: Map<String, Value>,

        style: StylePatch,
    },
}

impl StyleRule {
    /// Whether the rule applies to a feature with the given geometry and
    /// properties
    pub fn matches(&self, kind: GeometryKind, properties: &Map<String, Value>) -> bool {
        match self {
            StyleRule::Default { .. } => true,
            StyleRule::Match {
                geometry_type,
                properties: wanted,
                ..
            } => {
                geometry_type.is_none_or(|wanted_kind| wanted_kind == kind)
                    && wanted
                        .iter()
                        .all(|(key, value)| properties.get(key) == Some(value))
            }
        }
    }

    /// The style the rule lays over its features
    pub fn style(&self) -> &StylePatch {
        match self {
            StyleRule::Default { style } | StyleRule::Match { style, .. } => style,
        }
    }
}

impl RawDataset {
    /// Parse a dataset.  The file may be plain JSON or a JS assignment like
    /// `dataNA = { ... };`
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(strip_js_assignment(text))
    }
}

/// Strip a `name = ... ;` wrapper, if there is one
pub fn strip_js_assignment(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with(['{', '[']) {
        return trimmed;
    }
    let Some((name, rest)) = trimmed.split_once('=') else {
        return trimmed;
    };
    let name = name.trim();
    let name = name
        .strip_prefix("var ")
        .or_else(|| name.strip_prefix("let "))
        .or_else(|| name.strip_prefix("const "))
        .unwrap_or(name)
        .trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return trimmed;
    }
    let rest = rest.trim();
    rest.strip_suffix(';').unwrap_or(rest).trim_end()
}
