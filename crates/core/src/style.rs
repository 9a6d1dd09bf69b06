// SPDX-License-Identifier: MIT

//!
//! Feature styles
//!
//! A dataset never states a whole [`Style`].  It gives partial
//! [`StylePatch`]es (in style rules, and inline in a feature's properties)
//! which are laid over one another and then over the defaults.
//!

use crate::Colour;
use serde::{Deserialize, Serialize};

/// Stroke colour used to highlight the pinned feature
const HIGHLIGHT_STROKE: Colour = Colour::from_rgb(0x66, 0x66, 0x66);

/// Where a feature's layer is drawn relative to the others
#[rustfmt::skip]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[derive(derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZOrder {
    #[display("front")]
    Front,

    #[display("back")]
    Back,

    #[default]
    #[display("default")]
    Default,
}

/// Any subset of the style fields, as written in a dataset
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    #[serde(default, rename = "stroke", skip_serializing_if = "Option::is_none")]
    pub stroke_on: Option<bool>,

    #[serde(default, rename = "strokeColor", skip_serializing_if = "Option::is_none")]
    pub stroke_colour: Option<Colour>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_dash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,

    #[serde(default, rename = "fill", skip_serializing_if = "Option::is_none")]
    pub fill_on: Option<bool>,

    #[serde(default, rename = "fillColor", skip_serializing_if = "Option::is_none")]
    pub fill_colour: Option<Colour>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borderless: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,

    #[serde(default, rename = "fontColor", skip_serializing_if = "Option::is_none")]
    pub font_colour: Option<Colour>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_order: Option<ZOrder>,
}

impl StylePatch {
    /// Whether the patch sets nothing
    pub fn is_empty(&self) -> bool {
        *self == StylePatch::default()
    }

    /// Lay `other` over this patch: every field `other` sets wins
    pub fn overlay(&mut self, other: &StylePatch) {
        fn take<T: Clone>(field: &mut Option<T>, other: &Option<T>) {
            if let Some(value) = other {
                *field = Some(value.clone());
            }
        }
        take(&mut self.stroke_on, &other.stroke_on);
        take(&mut self.stroke_colour, &other.stroke_colour);
        take(&mut self.stroke_weight, &other.stroke_weight);
        take(&mut self.stroke_dash, &other.stroke_dash);
        take(&mut self.stroke_opacity, &other.stroke_opacity);
        take(&mut self.fill_on, &other.fill_on);
        take(&mut self.fill_colour, &other.fill_colour);
        take(&mut self.fill_opacity, &other.fill_opacity);
        take(&mut self.borderless, &other.borderless);
        take(&mut self.font_family, &other.font_family);
        take(&mut self.font_colour, &other.font_colour);
        take(&mut self.z_order, &other.z_order);
    }
}

/// A fully resolved feature style
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    #[serde(rename = "stroke")]
    pub stroke_on: bool,
    #[serde(rename = "strokeColor")]
    pub stroke_colour: Colour,
    pub stroke_weight: f64,
    pub stroke_dash: String,
    pub stroke_opacity: f64,
    #[serde(rename = "fill")]
    pub fill_on: bool,
    #[serde(rename = "fillColor")]
    pub fill_colour: Colour,
    pub fill_opacity: f64,
    pub borderless: bool,
    pub font_family: String,
    #[serde(rename = "fontColor")]
    pub font_colour: Colour,
    pub z_order: ZOrder,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_on: true,
            stroke_colour: Colour::from_rgb(0xff, 0xff, 0xff),
            stroke_weight: 2.0,
            stroke_dash: String::from("3"),
            stroke_opacity: 1.0,
            fill_on: true,
            fill_colour: Colour::from_rgb(0xc0, 0xc0, 0xc0),
            fill_opacity: fidelity_fill_opacity(4),
            borderless: false,
            font_family: String::from("Cabin Sketch"),
            font_colour: Colour::from_rgb(0x00, 0x00, 0x00),
            z_order: ZOrder::Default,
        }
    }
}

impl Style {
    /// The defaults with `patch` laid over them.  `fill_opacity` is used
    /// unless the patch sets one.
    pub fn resolve(patch: &StylePatch, fill_opacity: f64) -> Self {
        let defaults = Style {
            fill_opacity,
            ..Style::default()
        };
        Style {
            stroke_on: patch.stroke_on.unwrap_or(defaults.stroke_on),
            stroke_colour: patch.stroke_colour.unwrap_or(defaults.stroke_colour),
            stroke_weight: patch.stroke_weight.unwrap_or(defaults.stroke_weight),
            stroke_dash: patch.stroke_dash.clone().unwrap_or(defaults.stroke_dash),
            stroke_opacity: patch.stroke_opacity.unwrap_or(defaults.stroke_opacity),
            fill_on: patch.fill_on.unwrap_or(defaults.fill_on),
            fill_colour: patch.fill_colour.unwrap_or(defaults.fill_colour),
            fill_opacity: patch.fill_opacity.unwrap_or(defaults.fill_opacity),
            borderless: patch.borderless.unwrap_or(defaults.borderless),
            font_family: patch.font_family.clone().unwrap_or(defaults.font_family),
            font_colour: patch.font_colour.unwrap_or(defaults.font_colour),
            z_order: patch.z_order.unwrap_or(defaults.z_order),
        }
    }

    /// The style of the pinned (selected) feature.  Borderless features stay
    /// selectable but get no fill.
    pub fn highlighted(&self) -> Self {
        Style {
            stroke_weight: 5.0,
            stroke_colour: HIGHLIGHT_STROKE,
            stroke_dash: String::new(),
            fill_opacity: if self.borderless { 0.0 } else { 0.7 },
            z_order: ZOrder::Front,
            ..self.clone()
        }
    }
}

/// Lower fidelity features are drawn fainter
pub fn fidelity_fill_opacity(fidelity: u8) -> f64 {
    0.1 + 0.1 * f64::from(fidelity)
}
