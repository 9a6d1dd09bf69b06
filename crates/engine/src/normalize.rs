// SPDX-License-Identifier: MIT

//!
//! Validate and normalize a raw dataset
//!
//! Loading is all or nothing: the first problem found rejects the whole
//! dataset.  It runs in two passes.  The first checks the collection's shape
//! and builds the ID table; the second validates each feature, resolving
//! copied coordinates through the table so declaration order never matters.
//!

use crate::{
    AnimationError, Exclusion, Feature, LabelHints, MorphPlan, RawDataset, RawFeature, StyleRule,
    Viewpoint,
    dataset::CopyFrom,
};
use geo::MultiPolygon;
use log::{debug, warn};
use open_atlas_core::{
    DateError, FeatureId, GeometryKind, Instant, Rounding, Shape, ShapeError, Style, StylePatch,
    fidelity_fill_opacity,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Properties every feature must have (as well as a source)
const REQUIRED_PROPERTIES: [&str; 5] = [
    "entity1type",
    "entity1name",
    "fidelity",
    "startdatestr",
    "enddatestr",
];

const SOURCE_PREFIX: &str = "source";

const MIN_FIDELITY: i64 = 1;
const MAX_FIDELITY: i64 = 5;

/// Errors that can arise when loading a dataset.  Each names the feature and
/// the rule it breaks.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unable to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Dataset is malformed: {0}")]
    Schema(String),

    #[error("Feature ID `{0}` is used more than once")]
    DuplicateId(FeatureId),

    #[error("Feature `{id}` is missing required property `{field}`")]
    MissingField { id: FeatureId, field: &'static str },

    #[error("Feature `{id}` has {field} `{value}` ({rule})")]
    InvalidRange {
        id: FeatureId,
        field: &'static str,
        value: String,
        rule: &'static str,
    },

    #[error(
        "Feature `{id}` has geometry type `{kind}` (must be Point, LineString, Polygon or MultiPolygon)"
    )]
    UnsupportedGeometry { id: FeatureId, kind: String },

    #[error("Feature `{id}` has invalid geometry: {error}")]
    Geometry { id: FeatureId, error: ShapeError },

    #[error("Feature `{id}` cannot copy coordinates: {reason}")]
    CoordinateAlias { id: FeatureId, reason: String },

    #[error("Feature `{id}` refers to unknown feature `{target}` in `{field}`")]
    UnknownReference {
        id: FeatureId,
        field: &'static str,
        target: FeatureId,
    },

    #[error("Feature `{id}` has an invalid property: {error}")]
    InvalidProperty {
        id: FeatureId,
        error: serde_json::Error,
    },

    #[error("Feature `{id}` has a malformed {field}: {error}")]
    Date {
        id: FeatureId,
        field: &'static str,
        error: DateError,
    },

    #[error("Feature `{from}` cannot animate to `{to}`: {error}")]
    Animation {
        from: FeatureId,
        to: FeatureId,
        error: AnimationError,
    },
}

/// What a load depends on besides the dataset itself
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// What `present` means
    pub now: Instant,

    /// Features to leave out entirely
    pub exclusions: Vec<Exclusion>,
}

impl LoadOptions {
    pub fn new(now: Instant) -> Self {
        Self {
            now,
            exclusions: Vec::new(),
        }
    }
}

/// Fallback range and view values gathered while loading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedDefaults {
    /// The earliest end instant of any feature
    pub min_end: Option<Instant>,

    /// The latest start instant of any feature
    pub max_start: Option<Instant>,

    /// The earliest start instant of any feature
    pub earliest_start: Option<Instant>,

    pub viewpoint: Option<Viewpoint>,
}

impl DerivedDefaults {
    fn include(&mut self, feature: &Feature) {
        let (start, end) = (feature.start(), feature.end());
        self.min_end = Some(self.min_end.map_or(end, |min| min.min(end)));
        self.max_start = Some(self.max_start.map_or(start, |max| max.max(start)));
        self.earliest_start = Some(self.earliest_start.map_or(start, |min| min.min(start)));
    }
}

/// The result of a successful load
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    /// In dataset order, without excluded features
    pub features: Vec<Feature>,

    /// Keyed by the ID of the feature that morphs
    pub morphs: HashMap<FeatureId, MorphPlan>,

    pub defaults: DerivedDefaults,

    /// The IDs of the features that were left out
    pub excluded: Vec<FeatureId>,
}

/// The typed subset of a feature's properties (layout hints and inline
/// styles are read separately)
#[derive(Deserialize)]
struct FeatureProperties {
    entity1type: String,
    entity1name: String,
    #[serde(default)]
    entity2type: Option<String>,
    #[serde(default)]
    entity2name: Option<String>,
    fidelity: Value,
    startdatestr: String,
    enddatestr: String,
    #[serde(default, rename = "animateTo")]
    animate_to: Option<FeatureId>,
}

/// Validate and normalize a dataset
pub fn normalize(raw: &RawDataset, options: &LoadOptions) -> Result<NormalizedDataset, LoadError> {
    if raw.kind != "FeatureCollection" {
        return Err(LoadError::Schema(format!(
            "expected type `FeatureCollection`, got `{}`",
            raw.kind
        )));
    }
    let raw_features = match &raw.features {
        Some(features) if !features.is_empty() => features.as_slice(),
        _ => return Err(LoadError::Schema(String::from("dataset has no features"))),
    };

    // First pass: collection shape and the ID table
    let mut ids = Vec::with_capacity(raw_features.len());
    let mut table = HashMap::with_capacity(raw_features.len());
    for (position, feature) in raw_features.iter().enumerate() {
        if feature.kind != "Feature" {
            return Err(LoadError::Schema(format!(
                "feature #{position} has type `{}` (must be `Feature`)",
                feature.kind
            )));
        }
        let Some(id) = &feature.id else {
            return Err(LoadError::Schema(format!("feature #{position} has no id")));
        };
        if table.insert(id.clone(), position).is_some() {
            return Err(LoadError::DuplicateId(id.clone()));
        }
        ids.push(id.clone());
    }

    // Second pass: every feature, excluded or not, must be valid
    let mut resolver = GeometryResolver {
        features: raw_features,
        ids: &ids,
        table: &table,
        resolved: HashMap::new(),
    };
    let mut features = Vec::with_capacity(raw_features.len());
    let mut excluded = Vec::new();
    for (position, raw_feature) in raw_features.iter().enumerate() {
        let feature = validate_feature(position, raw_feature, &mut resolver, &raw.styles, options)?;
        let properties = raw_feature.properties.as_ref();
        let exclusion = properties.and_then(|properties| {
            options
                .exclusions
                .iter()
                .find(|exclusion| exclusion.matches(properties))
        });
        match exclusion {
            Some(exclusion) => {
                debug!(
                    "Excluding feature `{}` ({} = {})",
                    feature.id(),
                    exclusion.field,
                    exclusion.value
                );
                excluded.push(feature.id);
            }
            None => features.push(feature),
        }
    }

    let morphs = prepare_morphs(&mut features, &table, &excluded)?;

    let mut defaults = DerivedDefaults {
        viewpoint: raw.viewpoint.clone(),
        ..DerivedDefaults::default()
    };
    for feature in &features {
        defaults.include(feature);
    }

    Ok(NormalizedDataset {
        features,
        morphs,
        defaults,
        excluded,
    })
}

fn validate_feature(
    position: usize,
    raw: &RawFeature,
    resolver: &mut GeometryResolver,
    rules: &[StyleRule],
    options: &LoadOptions,
) -> Result<Feature, LoadError> {
    let id = resolver.id(position)?.clone();
    let missing = |field: &'static str| LoadError::MissingField {
        id: id.clone(),
        field,
    };

    let properties = raw.properties.as_ref().ok_or_else(|| missing("properties"))?;
    for field in REQUIRED_PROPERTIES {
        if !properties.contains_key(field) {
            return Err(missing(field));
        }
    }
    let sources = sources(properties);
    if sources.is_empty() {
        return Err(missing(SOURCE_PREFIX));
    }

    let geometry = raw.geometry.as_ref().ok_or_else(|| missing("geometry"))?;
    let kind =
        GeometryKind::from_name(&geometry.kind).ok_or_else(|| LoadError::UnsupportedGeometry {
            id: id.clone(),
            kind: geometry.kind.clone(),
        })?;

    let typed: FeatureProperties = read_properties(&id, properties)?;
    let label: LabelHints = read_properties(&id, properties)?;
    let inline_style: StylePatch = read_properties(&id, properties)?;

    let fidelity = typed
        .fidelity
        .as_i64()
        .filter(|fidelity| (MIN_FIDELITY..=MAX_FIDELITY).contains(fidelity))
        .and_then(|fidelity| u8::try_from(fidelity).ok())
        .ok_or_else(|| LoadError::InvalidRange {
            id: id.clone(),
            field: "fidelity",
            value: typed.fidelity.to_string(),
            rule: "must be an integer from 1 (lowest) to 5 (highest)",
        })?;

    let start = Instant::parse(&typed.startdatestr, Rounding::Start).map_err(|error| {
        LoadError::Date {
            id: id.clone(),
            field: "startdatestr",
            error,
        }
    })?;
    let end = Instant::parse_end(&typed.enddatestr, options.now).map_err(|error| {
        LoadError::Date {
            id: id.clone(),
            field: "enddatestr",
            error,
        }
    })?;
    if end < start {
        return Err(LoadError::InvalidRange {
            id,
            field: "enddatestr",
            value: typed.enddatestr,
            rule: "must not be before startdatestr",
        });
    }

    // Rules in order, then the feature's own style on top
    let mut patch = StylePatch::default();
    for rule in rules.iter().filter(|rule| rule.matches(kind, properties)) {
        patch.overlay(rule.style());
    }
    patch.overlay(&inline_style);
    let style = Style::resolve(&patch, fidelity_fill_opacity(fidelity));

    let shape = resolver.resolve(position)?;

    Ok(Feature {
        id,
        entity1_type: typed.entity1type,
        entity1_name: typed.entity1name,
        entity2_type: typed.entity2type,
        entity2_name: typed.entity2name,
        fidelity,
        start_literal: typed.startdatestr,
        end_literal: typed.enddatestr,
        start,
        end,
        sources,
        shape,
        style,
        morph_target: typed.animate_to,
        label,
    })
}

/// Read part of a feature's properties into a typed struct
fn read_properties<T>(id: &FeatureId, properties: &Map<String, Value>) -> Result<T, LoadError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(Value::Object(properties.clone())).map_err(|error| {
        LoadError::InvalidProperty {
            id: id.clone(),
            error,
        }
    })
}

/// The `source`, `source1`, `source2`, ... properties, in that order
fn sources(properties: &Map<String, Value>) -> Vec<String> {
    let mut sources: Vec<(u32, String)> = properties
        .iter()
        .filter_map(|(key, value)| {
            let suffix = key.strip_prefix(SOURCE_PREFIX)?;
            let number = if suffix.is_empty() {
                0
            } else {
                suffix.parse::<u32>().ok()?
            };
            let source = value.as_str()?.trim();
            (!source.is_empty()).then(|| (number, source.to_string()))
        })
        .collect();
    sources.sort_by_key(|(number, _)| *number);
    sources.into_iter().map(|(_, source)| source).collect()
}

/// Check each morph's target, and prepare the morph.  Morphs into excluded
/// features are dropped.
fn prepare_morphs(
    features: &mut [Feature],
    table: &HashMap<FeatureId, usize>,
    excluded: &[FeatureId],
) -> Result<HashMap<FeatureId, MorphPlan>, LoadError> {
    let excluded: HashSet<&FeatureId> = excluded.iter().collect();
    let mut plans = Vec::new();
    for feature in features.iter_mut() {
        let Some(target) = feature.morph_target.clone() else {
            continue;
        };
        if target == feature.id {
            return Err(LoadError::Schema(format!(
                "feature `{}` animates to itself",
                feature.id
            )));
        }
        if !table.contains_key(&target) {
            return Err(LoadError::UnknownReference {
                id: feature.id.clone(),
                field: "animateTo",
                target,
            });
        }
        if excluded.contains(&target) {
            warn!(
                "Feature `{}` animates to excluded feature `{target}`; drawing it without animation",
                feature.id
            );
            feature.morph_target = None;
            continue;
        }
        plans.push((feature.id.clone(), target));
    }

    let positions: HashMap<&FeatureId, &Feature> =
        features.iter().map(|feature| (feature.id(), &*feature)).collect();
    let mut morphs = HashMap::with_capacity(plans.len());
    for (from, to) in plans {
        let (Some(source), Some(target)) = (positions.get(&from), positions.get(&to)) else {
            continue;
        };
        let plan = MorphPlan::prepare(source, target).map_err(|error| LoadError::Animation {
            from: from.clone(),
            to: to.clone(),
            error,
        })?;
        morphs.insert(from, plan);
    }
    Ok(morphs)
}

/// Resolves each feature's geometry, following `copyFrom` references through
/// the ID table.  Each geometry is resolved once.
struct GeometryResolver<'a> {
    features: &'a [RawFeature],
    ids: &'a [FeatureId],
    table: &'a HashMap<FeatureId, usize>,
    resolved: HashMap<usize, Shape>,
}

impl GeometryResolver<'_> {
    fn id(&self, position: usize) -> Result<&FeatureId, LoadError> {
        self.ids
            .get(position)
            .ok_or_else(|| LoadError::Schema(format!("feature #{position} has no id")))
    }

    fn resolve(&mut self, position: usize) -> Result<Shape, LoadError> {
        let mut chain = Vec::new();
        self.resolve_in_chain(position, &mut chain)
    }

    /// `chain` holds the features whose geometry is being resolved, to catch
    /// cycles
    fn resolve_in_chain(
        &mut self,
        position: usize,
        chain: &mut Vec<usize>,
    ) -> Result<Shape, LoadError> {
        if let Some(shape) = self.resolved.get(&position) {
            return Ok(shape.clone());
        }

        let id = self.id(position)?.clone();
        let features = self.features;
        let geometry = features
            .get(position)
            .and_then(|feature| feature.geometry.as_ref())
            .ok_or_else(|| LoadError::MissingField {
                id: id.clone(),
                field: "geometry",
            })?;
        let kind =
            GeometryKind::from_name(&geometry.kind).ok_or_else(|| LoadError::UnsupportedGeometry {
                id: id.clone(),
                kind: geometry.kind.clone(),
            })?;

        chain.push(position);
        let shape = match (&geometry.coordinates, &geometry.copy_from) {
            (Some(_), Some(_)) => Err(alias_error(&id, "has both coordinates and copyFrom")),
            (None, None) => Err(LoadError::MissingField {
                id: id.clone(),
                field: "coordinates",
            }),
            (Some(coordinates), None) => Shape::from_coordinates(kind, coordinates.clone())
                .map_err(|error| LoadError::Geometry {
                    id: id.clone(),
                    error,
                }),
            (None, Some(CopyFrom::One(source))) => {
                self.copy_one(&id, kind, source, chain)
            }
            (None, Some(CopyFrom::Many(sources))) => {
                self.copy_many(&id, kind, sources, chain)
            }
        };
        chain.pop();

        let shape = shape?;
        self.resolved.insert(position, shape.clone());
        Ok(shape)
    }

    /// Copy a single feature's geometry, which must be the same kind
    fn copy_one(
        &mut self,
        id: &FeatureId,
        kind: GeometryKind,
        source: &FeatureId,
        chain: &mut Vec<usize>,
    ) -> Result<Shape, LoadError> {
        let shape = self.source_shape(id, source, chain)?;
        if shape.kind() != kind {
            return Err(alias_error(
                id,
                &format!("is a {kind} but `{source}` is a {}", shape.kind()),
            ));
        }
        Ok(shape)
    }

    /// Gather the polygons of several features into one `MultiPolygon`
    fn copy_many(
        &mut self,
        id: &FeatureId,
        kind: GeometryKind,
        sources: &[FeatureId],
        chain: &mut Vec<usize>,
    ) -> Result<Shape, LoadError> {
        if kind != GeometryKind::MultiPolygon {
            return Err(alias_error(
                id,
                &format!("only a MultiPolygon can copy from several features, not a {kind}"),
            ));
        }
        if sources.is_empty() {
            return Err(alias_error(id, "copyFrom lists no features"));
        }
        let mut polygons = Vec::new();
        for source in sources {
            let shape = self.source_shape(id, source, chain)?;
            let Some(source_polygons) = shape.polygons() else {
                return Err(alias_error(
                    id,
                    &format!("`{source}` is a {}, not a Polygon or MultiPolygon", shape.kind()),
                ));
            };
            polygons.extend(source_polygons);
        }
        Ok(Shape::MultiPolygon(MultiPolygon::new(polygons)))
    }

    fn source_shape(
        &mut self,
        id: &FeatureId,
        source: &FeatureId,
        chain: &mut Vec<usize>,
    ) -> Result<Shape, LoadError> {
        if source == id {
            return Err(alias_error(id, "copies from itself"));
        }
        let position = *self
            .table
            .get(source)
            .ok_or_else(|| LoadError::UnknownReference {
                id: id.clone(),
                field: "copyFrom",
                target: source.clone(),
            })?;
        if chain.contains(&position) {
            return Err(alias_error(id, &format!("copying from `{source}` is circular")));
        }
        self.resolve_in_chain(position, chain)
    }
}

fn alias_error(id: &FeatureId, reason: &str) -> LoadError {
    LoadError::CoordinateAlias {
        id: id.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ClassificationField;
    use open_atlas_core::{Colour, ZOrder, parse_date};
    use serde_json::json;

    fn now() -> Instant {
        Instant::from_ymd(2025, 6, 1).unwrap()
    }

    fn feature(id: Value, start: &str, end: &str) -> Value {
        json!({
            "type": "Feature",
            "id": id,
            "properties": {
                "entity1type": "nation",
                "entity1name": "USA",
                "fidelity": 3,
                "startdatestr": start,
                "enddatestr": end,
                "source": "https://example.org/usa"
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }
        })
    }

    fn collection(features: Vec<Value>) -> Value {
        json!({ "type": "FeatureCollection", "features": features })
    }

    fn load(dataset: Value) -> Result<NormalizedDataset, LoadError> {
        let raw: RawDataset = serde_json::from_value(dataset)?;
        normalize(&raw, &LoadOptions::new(now()))
    }

    fn load_with(dataset: Value, options: &LoadOptions) -> Result<NormalizedDataset, LoadError> {
        let raw: RawDataset = serde_json::from_value(dataset)?;
        normalize(&raw, options)
    }

    #[test]
    fn valid_dataset() {
        let dataset = load(collection(vec![
            feature(json!(1), "1776", "1783"),
            feature(json!(2), "1783", "present"),
        ]))
        .unwrap();
        assert_eq!(dataset.features.len(), 2);

        let first = &dataset.features[0];
        assert_eq!(first.id(), &FeatureId::from(1));
        assert_eq!(first.start(), parse_date("1776", Rounding::Start).unwrap());
        assert_eq!(first.end(), parse_date("1783", Rounding::End).unwrap());
        assert_eq!(dataset.features[1].end(), now());
        assert_eq!(first.sources(), ["https://example.org/usa"]);
        assert!((first.style().fill_opacity - 0.4).abs() < 1e-9);

        for feature in &dataset.features {
            assert!(feature.start() <= feature.end());
        }

        // Running aggregates
        assert_eq!(dataset.defaults.min_end, Some(first.end()));
        assert_eq!(
            dataset.defaults.max_start,
            Some(parse_date("1783", Rounding::Start).unwrap())
        );
        assert_eq!(dataset.defaults.earliest_start, Some(first.start()));
    }

    #[test]
    fn collection_shape() {
        assert!(matches!(
            load(json!({ "type": "Feature", "features": [] })),
            Err(LoadError::Schema(_))
        ));
        assert!(matches!(
            load(json!({ "type": "FeatureCollection", "features": [] })),
            Err(LoadError::Schema(_))
        ));
        assert!(matches!(
            load(json!({ "type": "FeatureCollection" })),
            Err(LoadError::Schema(_))
        ));

        let mut not_a_feature = feature(json!(1), "1776", "1783");
        not_a_feature["type"] = json!("Thing");
        assert!(matches!(
            load(collection(vec![not_a_feature])),
            Err(LoadError::Schema(_))
        ));
    }

    #[test]
    fn duplicate_ids_come_first() {
        // The second feature is also broken, but the duplicate is found first
        let mut broken = feature(json!("1"), "1776:13", "1783");
        broken["properties"]["fidelity"] = json!(9);
        let result = load(collection(vec![feature(json!(1), "1776", "1783"), broken]));
        assert!(matches!(result, Err(LoadError::DuplicateId(id)) if id.as_str() == "1"));
    }

    #[test]
    fn missing_fields() {
        for field in REQUIRED_PROPERTIES {
            let mut incomplete = feature(json!(1), "1776", "1783");
            incomplete["properties"]
                .as_object_mut()
                .unwrap()
                .remove(field);
            let error = load(collection(vec![incomplete])).unwrap_err();
            assert!(
                matches!(&error, LoadError::MissingField { field: missing, .. } if *missing == field)
            );
            assert!(error.to_string().contains('1'));
        }

        let mut unsourced = feature(json!(1), "1776", "1783");
        unsourced["properties"]
            .as_object_mut()
            .unwrap()
            .remove("source");
        assert!(matches!(
            load(collection(vec![unsourced])),
            Err(LoadError::MissingField { field: "source", .. })
        ));
    }

    #[test]
    fn numbered_sources() {
        let mut sourced = feature(json!(1), "1776", "1783");
        let properties = sourced["properties"].as_object_mut().unwrap();
        properties.remove("source");
        properties.insert(String::from("source2"), json!("b"));
        properties.insert(String::from("source10"), json!("c"));
        properties.insert(String::from("source1"), json!("a"));
        properties.insert(String::from("sourcematerial"), json!("ignored"));
        let dataset = load(collection(vec![sourced])).unwrap();
        assert_eq!(dataset.features[0].sources(), ["a", "b", "c"]);
    }

    #[test]
    fn fidelity_range() {
        for fidelity in [json!(0), json!(6), json!(2.5), json!("3")] {
            let mut feature = feature(json!(1), "1776", "1783");
            feature["properties"]["fidelity"] = fidelity;
            assert!(matches!(
                load(collection(vec![feature])),
                Err(LoadError::InvalidRange {
                    field: "fidelity",
                    ..
                })
            ));
        }
    }

    #[test]
    fn dates() {
        let bad_month = feature(json!(1), "1776:13", "1783");
        assert!(matches!(
            load(collection(vec![bad_month])),
            Err(LoadError::Date {
                field: "startdatestr",
                ..
            })
        ));

        let backwards = feature(json!(1), "1783", "1776");
        assert!(matches!(
            load(collection(vec![backwards])),
            Err(LoadError::InvalidRange {
                field: "enddatestr",
                ..
            })
        ));

        // A single day is fine
        let one_day = feature(json!(1), "1776:07:04", "1776:07:04");
        assert!(load(collection(vec![one_day])).is_ok());
    }

    #[test]
    fn unsupported_geometry() {
        let mut collection_geometry = feature(json!(1), "1776", "1783");
        collection_geometry["geometry"] = json!({ "type": "GeometryCollection", "geometries": [] });
        assert!(matches!(
            load(collection(vec![collection_geometry])),
            Err(LoadError::UnsupportedGeometry { .. })
        ));

        let mut wrong_coordinates = feature(json!(1), "1776", "1783");
        wrong_coordinates["geometry"]["type"] = json!("Point");
        assert!(matches!(
            load(collection(vec![wrong_coordinates])),
            Err(LoadError::Geometry { .. })
        ));
    }

    fn copying(id: &str, kind: &str, copy_from: Value) -> Value {
        let mut copy = feature(json!(id), "1776", "1783");
        copy["geometry"] = json!({ "type": kind, "copyFrom": copy_from });
        copy
    }

    #[test]
    fn copied_coordinates() {
        // Declared before the feature it copies from
        let dataset = load(collection(vec![
            copying("copy", "Polygon", json!("a")),
            feature(json!("a"), "1776", "1783"),
            copying("chained", "Polygon", json!("copy")),
        ]))
        .unwrap();
        assert_eq!(dataset.features[0].shape(), dataset.features[1].shape());
        assert_eq!(dataset.features[2].shape(), dataset.features[1].shape());
    }

    #[test]
    fn aggregated_coordinates() {
        let dataset = load(collection(vec![
            feature(json!("a"), "1776", "1783"),
            feature(json!("b"), "1776", "1783"),
            copying("both", "MultiPolygon", json!(["a", "b"])),
        ]))
        .unwrap();
        let Shape::MultiPolygon(polygons) = dataset.features[2].shape() else {
            panic!("expected a multipolygon");
        };
        assert_eq!(polygons.0.len(), 2);

        // Only MultiPolygons aggregate
        assert!(matches!(
            load(collection(vec![
                feature(json!("a"), "1776", "1783"),
                copying("both", "Polygon", json!(["a"])),
            ])),
            Err(LoadError::CoordinateAlias { .. })
        ));
    }

    #[test]
    fn bad_copies() {
        // Itself
        assert!(matches!(
            load(collection(vec![copying("a", "Polygon", json!("a"))])),
            Err(LoadError::CoordinateAlias { .. })
        ));

        // Unknown
        assert!(matches!(
            load(collection(vec![copying("a", "Polygon", json!("zzz"))])),
            Err(LoadError::UnknownReference {
                field: "copyFrom",
                ..
            })
        ));

        // Circular
        assert!(matches!(
            load(collection(vec![
                copying("a", "Polygon", json!("b")),
                copying("b", "Polygon", json!("a")),
            ])),
            Err(LoadError::CoordinateAlias { .. })
        ));

        // Different kind
        assert!(matches!(
            load(collection(vec![
                feature(json!("a"), "1776", "1783"),
                copying("b", "MultiPolygon", json!("a")),
            ])),
            Err(LoadError::CoordinateAlias { .. })
        ));

        // Both coordinates and a copy
        let mut both = feature(json!("b"), "1776", "1783");
        both["geometry"]["copyFrom"] = json!("a");
        assert!(matches!(
            load(collection(vec![feature(json!("a"), "1776", "1783"), both])),
            Err(LoadError::CoordinateAlias { .. })
        ));
    }

    #[test]
    fn style_rules() {
        let mut colony = feature(json!("colony"), "1776", "1783");
        colony["properties"]["entity2type"] = json!("colony");
        colony["properties"]["strokeWeight"] = json!(4);

        let mut dataset = collection(vec![colony, feature(json!("other"), "1776", "1783")]);
        dataset["styles"] = json!([
            { "kind": "default", "style": { "strokeColor": "#010101", "strokeWeight": 1 } },
            {
                "kind": "match",
                "properties": { "entity2type": "colony" },
                "style": { "strokeColor": "#a00000", "strokeWeight": 1.5, "zOrder": "back" }
            },
            { "kind": "match", "geometryType": "Point", "style": { "strokeColor": "#00ff00" } }
        ]);
        let dataset = load(dataset).unwrap();

        let colony = dataset.features[0].style();
        assert_eq!(colony.stroke_colour, Colour::from_rgb(0xa0, 0, 0));
        assert_eq!(colony.z_order, ZOrder::Back);
        // Inline beats every rule
        assert_eq!(colony.stroke_weight, 4.0);

        let other = dataset.features[1].style();
        assert_eq!(other.stroke_colour, Colour::from_rgb(1, 1, 1));
        assert_eq!(other.stroke_weight, 1.0);
        assert_eq!(other.z_order, ZOrder::Default);
    }

    #[test]
    fn invalid_inline_style() {
        let mut feature = feature(json!(1), "1776", "1783");
        feature["properties"]["fillColor"] = json!("#zzzzzz");
        assert!(matches!(
            load(collection(vec![feature])),
            Err(LoadError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn exclusions() {
        let mut placeholder = feature(json!("p"), "1700", "1900");
        placeholder["properties"]["entity1name"] = json!("Placeholder");
        let options = LoadOptions {
            now: now(),
            exclusions: vec![Exclusion {
                field: ClassificationField::Entity1Name,
                value: String::from("Placeholder"),
            }],
        };
        let dataset = load_with(
            collection(vec![placeholder, feature(json!("kept"), "1776", "1783")]),
            &options,
        )
        .unwrap();
        assert_eq!(dataset.features.len(), 1);
        assert_eq!(dataset.excluded, vec![FeatureId::from("p")]);

        // Excluded features don't count towards the aggregates
        assert_eq!(
            dataset.defaults.earliest_start,
            Some(parse_date("1776", Rounding::Start).unwrap())
        );
    }

    #[test]
    fn copying_from_excluded_feature() {
        let mut placeholder = feature(json!("p"), "1700", "1900");
        placeholder["properties"]["entity1name"] = json!("Placeholder");
        let options = LoadOptions {
            now: now(),
            exclusions: vec![Exclusion {
                field: ClassificationField::Entity1Name,
                value: String::from("Placeholder"),
            }],
        };
        let dataset =
            load_with(collection(vec![placeholder, copying("c", "Polygon", json!("p"))]), &options)
                .unwrap();
        assert_eq!(dataset.features.len(), 1);
    }

    fn morphing(id: &str, target: &str, start: &str, end: &str) -> Value {
        let mut feature = feature(json!(id), start, end);
        feature["properties"]["animateTo"] = json!(target);
        feature
    }

    #[test]
    fn morphs() {
        let mut target = feature(json!("b"), "1800", "1850");
        target["geometry"]["coordinates"] =
            json!([[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 1.0], [0.0, 0.0]]]);
        let dataset = load(collection(vec![
            morphing("a", "b", "1776", "1799"),
            target,
        ]))
        .unwrap();
        let plan = &dataset.morphs[&FeatureId::from("a")];
        assert_eq!(plan.target(), &FeatureId::from("b"));

        assert!(matches!(
            load(collection(vec![morphing("a", "nowhere", "1776", "1799")])),
            Err(LoadError::UnknownReference {
                field: "animateTo",
                ..
            })
        ));

        assert!(matches!(
            load(collection(vec![morphing("a", "a", "1776", "1799")])),
            Err(LoadError::Schema(_))
        ));
    }

    #[test]
    fn morph_errors_surface_at_load() {
        let mut triangle = feature(json!("b"), "1800", "1850");
        triangle["geometry"]["coordinates"] =
            json!([[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 0.0]]]);
        let result = load(collection(vec![morphing("a", "b", "1776", "1799"), triangle]));
        assert!(matches!(
            result,
            Err(LoadError::Animation {
                error: AnimationError::LengthMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn morph_to_excluded_feature_is_dropped() {
        let mut placeholder = feature(json!("p"), "1800", "1900");
        placeholder["properties"]["entity1name"] = json!("Placeholder");
        let options = LoadOptions {
            now: now(),
            exclusions: vec![Exclusion {
                field: ClassificationField::Entity1Name,
                value: String::from("Placeholder"),
            }],
        };
        let dataset = load_with(
            collection(vec![morphing("a", "p", "1776", "1799"), placeholder]),
            &options,
        )
        .unwrap();
        assert!(dataset.morphs.is_empty());
        assert_eq!(dataset.features[0].morph_target(), None);
    }
}
