// SPDX-License-Identifier: MIT

//!
//! A loaded atlas
//!
//! Everything here is derived once, when the dataset is loaded, and never
//! changes afterwards.  The only thing that changes during a session is the
//! [`MapSessionState`].
//!

use crate::{
    AtlasConfig, Bookmark, DerivedDefaults, Feature, InterestDateIndex, LoadError, LoadOptions,
    MapSessionState, MorphPlan, RawDataset, TimeRange, Viewport, normalize,
};
use geo::Rect;
use log::info;
use open_atlas_core::{DateError, FeatureId, Instant, Rounding};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Atlas {
    /// In dataset order
    features: Vec<Feature>,

    /// Feature ID to position in `features`
    positions: HashMap<FeatureId, usize>,

    /// Keyed by the ID of the feature that morphs
    morphs: HashMap<FeatureId, MorphPlan>,

    index: InterestDateIndex,

    /// Feature ID to the bounds of its static geometry
    bounds: HashMap<FeatureId, Rect>,

    defaults: DerivedDefaults,

    /// The features left out of this load
    excluded: Vec<FeatureId>,

    /// Pop-up text, passed through untouched
    popups: Option<Value>,

    /// What `present` meant when loading
    now: Instant,
}

impl Atlas {
    /// Validate a dataset and build everything derived from it
    pub fn load(raw: &RawDataset, options: &LoadOptions) -> Result<Self, LoadError> {
        let dataset = normalize(raw, options)?;

        let positions = dataset
            .features
            .iter()
            .enumerate()
            .map(|(position, feature)| (feature.id().clone(), position))
            .collect();
        let bounds = dataset
            .features
            .iter()
            .filter_map(|feature| Some((feature.id().clone(), feature.shape().bounds()?)))
            .collect();
        let index = InterestDateIndex::build(&dataset.features, options.now);

        info!(
            "Loaded {} features ({} excluded, {} morphs, {} interest dates)",
            dataset.features.len(),
            dataset.excluded.len(),
            dataset.morphs.len(),
            index.len()
        );

        Ok(Atlas {
            features: dataset.features,
            positions,
            morphs: dataset.morphs,
            index,
            bounds,
            defaults: dataset.defaults,
            excluded: dataset.excluded,
            popups: raw.popups.clone(),
            now: options.now,
        })
    }

    /// Load a dataset from JSON text (optionally wrapped in a JS assignment)
    pub fn from_json_str(text: &str, options: &LoadOptions) -> Result<Self, LoadError> {
        let raw = RawDataset::from_json_str(text)?;
        Atlas::load(&raw, options)
    }

    /// Load a dataset file
    pub fn from_path(path: &Path, options: &LoadOptions) -> Result<Self, LoadError> {
        info!("Loading dataset from {}", path.display());
        let text = fs::read_to_string(path)?;
        Atlas::from_json_str(&text, options)
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, id: &FeatureId) -> Option<&Feature> {
        self.position(id).and_then(|position| self.features.get(position))
    }

    pub fn feature_at(&self, position: usize) -> Option<&Feature> {
        self.features.get(position)
    }

    pub fn position(&self, id: &FeatureId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// The morph for the feature with the given ID, if it has one
    pub fn morph(&self, id: &FeatureId) -> Option<&MorphPlan> {
        self.morphs.get(id)
    }

    pub fn index(&self) -> &InterestDateIndex {
        &self.index
    }

    /// The bounds of every feature's static geometry
    pub fn bounds(&self) -> &HashMap<FeatureId, Rect> {
        &self.bounds
    }

    pub fn bounds_of(&self, id: &FeatureId) -> Option<&Rect> {
        self.bounds.get(id)
    }

    /// The bounds of the feature at the given position
    pub fn bounds_at(&self, position: usize) -> Option<&Rect> {
        self.feature_at(position)
            .and_then(|feature| self.bounds_of(feature.id()))
    }

    pub fn defaults(&self) -> &DerivedDefaults {
        &self.defaults
    }

    pub fn excluded(&self) -> &[FeatureId] {
        &self.excluded
    }

    pub fn popups(&self) -> Option<&Value> {
        self.popups.as_ref()
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Start a session.  Bookmark values win over the dataset's viewpoint,
    /// which wins over the config.
    pub fn start_session(
        &self,
        config: &AtlasConfig,
        bookmark: &Bookmark,
    ) -> Result<MapSessionState, DateError> {
        let viewpoint = self.defaults.viewpoint.as_ref();
        let viewpoint_date = |literal: Option<&String>, rounding| {
            literal
                .map(|literal| Instant::parse(literal, rounding))
                .transpose()
        };

        let start = match bookmark.start {
            Some(start) => Some(start),
            None => viewpoint_date(
                viewpoint.and_then(|viewpoint| viewpoint.startdatestr.as_ref()),
                Rounding::Start,
            )?,
        };
        let end = match bookmark.end {
            Some(end) => Some(end),
            None => viewpoint_date(
                viewpoint.and_then(|viewpoint| viewpoint.enddatestr.as_ref()),
                Rounding::End,
            )?,
        };
        let range = TimeRange::derive(start, end, &self.defaults, self.now);

        let current = match bookmark.current {
            Some(current) => current,
            None => match viewpoint_date(
                viewpoint.and_then(|viewpoint| viewpoint.curdatestr.as_ref()),
                Rounding::Start,
            )? {
                Some(current) => current,
                None => config.start_instant()?,
            },
        };

        let viewport = Viewport::initial(config, viewpoint, bookmark);
        let smart_step = bookmark.smart_step.unwrap_or(config.smart_step);
        Ok(MapSessionState::new(
            range.clamp(current),
            range,
            viewport,
            smart_step,
        ))
    }
}
