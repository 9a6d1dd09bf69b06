// SPDX-License-Identifier: MIT

//!
//! What to draw at the query instant
//!

use crate::{
    Atlas, Feature, LabelLayout, MapSessionState, MorphPlan, interpolate_hints,
    interpolate_style, layout_feature_label,
};
use log::{error, trace};
use open_atlas_core::{FeatureId, GeometryKind, Instant, Shape, Style, ZOrder};
use serde::Serialize;

/// How one feature should be drawn (or not drawn)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerState {
    pub id: FeatureId,
    pub visible: bool,
    pub kind: GeometryKind,

    /// Only set for visible features
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Shape>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelLayout>,

    pub z_order: ZOrder,

    /// How far through its morph the feature is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
}

impl LayerState {
    fn hidden(feature: &Feature) -> Self {
        LayerState {
            id: feature.id().clone(),
            visible: false,
            kind: feature.kind(),
            geometry: None,
            style: None,
            label: None,
            z_order: feature.style().z_order,
            ratio: None,
        }
    }
}

impl Atlas {
    /// The state of every feature, in dataset order, at the session's query
    /// instant
    pub fn evaluate(&self, session: &MapSessionState) -> Vec<LayerState> {
        let query = session.query();
        let layers: Vec<LayerState> = self
            .features()
            .iter()
            .map(|feature| self.evaluate_feature(feature, query, session.pinned()))
            .collect();
        trace!(
            "Evaluated {}: {} of {} visible",
            query.as_long_date_format(),
            layers.iter().filter(|layer| layer.visible).count(),
            layers.len()
        );
        layers
    }

    /// Just the visible layers
    pub fn evaluate_visible(&self, session: &MapSessionState) -> Vec<LayerState> {
        let mut layers = self.evaluate(session);
        layers.retain(|layer| layer.visible);
        layers
    }

    fn evaluate_feature(
        &self,
        feature: &Feature,
        query: Instant,
        pinned: Option<&FeatureId>,
    ) -> LayerState {
        if !feature.is_active_at(query) {
            return LayerState::hidden(feature);
        }

        let kind = feature.kind();
        let morph = feature.morph_target().and_then(|_| self.morph_of(feature));
        let (geometry, style, label, ratio) = match morph {
            Some((plan, target)) => {
                let ratio = plan.ratio_at(query);
                let geometry = plan.geometry().interpolate(feature.shape(), ratio);
                let style = interpolate_style(feature.style(), target.style(), ratio);
                let hints = interpolate_hints(feature.label_hints(), target.label_hints(), ratio);
                let label = layout_feature_label(feature, kind, geometry.bounds(), &hints, &style);
                (geometry, style, label, Some(ratio))
            }
            None => {
                let label = layout_feature_label(
                    feature,
                    kind,
                    self.bounds_of(feature.id()).copied(),
                    feature.label_hints(),
                    feature.style(),
                );
                (feature.shape().clone(), feature.style().clone(), label, None)
            }
        };

        let style = match pinned {
            Some(id) if id == feature.id() && kind != GeometryKind::Point => style.highlighted(),
            _ => style,
        };

        LayerState {
            id: feature.id().clone(),
            visible: true,
            kind,
            geometry: Some(geometry),
            z_order: style.z_order,
            style: Some(style),
            label,
            ratio,
        }
    }

    /// The prepared morph of a feature that has a morph target, and the
    /// target.  Both were checked at load, so a miss here is a bug.
    fn morph_of(&self, feature: &Feature) -> Option<(&MorphPlan, &Feature)> {
        let Some(plan) = self.morph(feature.id()) else {
            error!("Feature `{}` has no prepared morph", feature.id());
            return None;
        };
        let Some(target) = self.feature(plan.target()) else {
            error!(
                "Feature `{}` morphs to `{}`, which isn't loaded",
                feature.id(),
                plan.target()
            );
            return None;
        };
        Some((plan, target))
    }
}
