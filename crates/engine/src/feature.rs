// SPDX-License-Identifier: MIT

//!
//! Normalized features
//!

use crate::Justify;
use open_atlas_core::{FeatureId, GeometryKind, Instant, Shape, Style};
use serde::{Deserialize, Serialize};

/// Optional label layout hints, as given in a feature's properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelHints {
    #[serde(default, rename = "labelX", skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    #[serde(default, rename = "labelY", skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    /// Degrees
    #[serde(default, rename = "labelRotate", skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,

    /// Radius of the arc the text follows.  Positive arcs curve one way,
    /// negative the other.
    #[serde(default, rename = "labelArc", skip_serializing_if = "Option::is_none")]
    pub arc: Option<f64>,

    #[serde(default, rename = "labelJustify", skip_serializing_if = "Option::is_none")]
    pub justify: Option<Justify>,

    #[serde(default, rename = "labelScale", skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,

    /// Extra text drawn beneath the label
    #[serde(default, rename = "labelSub", skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, rename = "noLabel")]
    pub no_label: bool,
}

/// A validated feature with its derived instants and resolved style and
/// geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub(crate) id: FeatureId,
    pub(crate) entity1_type: String,
    pub(crate) entity1_name: String,
    pub(crate) entity2_type: Option<String>,
    pub(crate) entity2_name: Option<String>,

    /// 1 (lowest) to 5 (highest)
    pub(crate) fidelity: u8,

    pub(crate) start_literal: String,
    pub(crate) end_literal: String,
    pub(crate) start: Instant,
    pub(crate) end: Instant,

    /// Citation URLs, in `source`, `source1`, `source2`, ... order
    pub(crate) sources: Vec<String>,

    pub(crate) shape: Shape,
    pub(crate) style: Style,

    /// The feature this one morphs into over its active window
    pub(crate) morph_target: Option<FeatureId>,

    pub(crate) label: LabelHints,
}

impl Feature {
    pub fn id(&self) -> &FeatureId {
        &self.id
    }

    pub fn entity1_type(&self) -> &str {
        &self.entity1_type
    }

    pub fn entity1_name(&self) -> &str {
        &self.entity1_name
    }

    pub fn entity2_type(&self) -> Option<&str> {
        self.entity2_type.as_deref()
    }

    pub fn entity2_name(&self) -> Option<&str> {
        self.entity2_name.as_deref()
    }

    pub fn fidelity(&self) -> u8 {
        self.fidelity
    }

    /// The date literal as written (e.g. `1776:07`)
    pub fn start_literal(&self) -> &str {
        &self.start_literal
    }

    /// The date literal as written (e.g. `present`)
    pub fn end_literal(&self) -> &str {
        &self.end_literal
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> GeometryKind {
        self.shape.kind()
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn morph_target(&self) -> Option<&FeatureId> {
        self.morph_target.as_ref()
    }

    pub fn label_hints(&self) -> &LabelHints {
        &self.label
    }

    /// Whether the feature is active at the instant (both ends inclusive)
    pub fn is_active_at(&self, instant: Instant) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// The label text (one line per `\n`, then any sub-label lines), or
    /// `None` if the feature isn't labelled
    pub fn label_text(&self) -> Option<String> {
        if self.label.no_label {
            return None;
        }
        let main = self.entity2_name.as_deref().unwrap_or(&self.entity1_name);
        let text = match &self.label.sub {
            Some(sub) => format!("{main}\n{sub}"),
            None => main.to_string(),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
