// SPDX-License-Identifier: MIT

//!
//! OpenAtlas config, and bookmarks
//!

use crate::MapSessionState;
use log::info;
use open_atlas_core::{DateError, Instant, Rounding};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can arise when loading the config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config default date is invalid: {0}")]
    Date(#[from] DateError),
}

/// The feature properties a dataset can be filtered on
#[rustfmt::skip]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[derive(derive_more::Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationField {
    #[display("entity1type")]
    Entity1Type,
    #[display("entity1name")]
    Entity1Name,
    #[display("entity2type")]
    Entity2Type,
    #[display("entity2name")]
    Entity2Name,
}

/// Drop every feature whose `field` property is `value` (e.g. placeholder
/// features superseded by a richer dataset)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub field: ClassificationField,
    pub value: String,
}

impl Exclusion {
    /// Whether a feature with these properties is excluded
    pub fn matches(&self, properties: &Map<String, Value>) -> bool {
        properties
            .get(&self.field.to_string())
            .and_then(Value::as_str)
            .is_some_and(|value| value == self.value)
    }
}

/// The config that's read from disk.  Anything missing from the file takes
/// its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,

    /// Initial viewport, unless the dataset or a bookmark says otherwise
    pub start_lat: f64,
    pub start_lon: f64,
    pub start_zoom: f64,

    /// Initial date literal, unless the dataset or a bookmark says otherwise
    pub start_date: String,

    /// Playing advances the date by 1/`play_steps` of the range per tick
    pub play_steps: u32,

    /// Time between ticks when playing (for the host's timer)
    pub play_interval_ms: u64,

    /// Only step to dates where something in view changes
    pub smart_step: bool,

    pub exclusions: Vec<Exclusion>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            lat_min: -90.0,
            lat_max: 90.0,
            lon_min: -180.0,
            lon_max: 180.0,
            zoom_min: 2.5,
            zoom_max: 15.0,
            start_lat: 38.5,
            start_lon: -98.0,
            start_zoom: 4.5,
            start_date: String::from("1776:07:04"),
            play_steps: 240,
            play_interval_ms: 250,
            smart_step: true,
            exclusions: Vec::new(),
        }
    }
}

impl AtlasConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let data = fs::read_to_string(path)?;
        let config: AtlasConfig = serde_json::from_str(&data)?;
        config.start_instant()?;
        info!("Config loaded = {config:?}");
        Ok(config)
    }

    /// The default current date
    pub fn start_instant(&self) -> Result<Instant, DateError> {
        Instant::parse(&self.start_date, Rounding::Start)
    }

    pub fn lat_in_range(&self, lat: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat)
    }

    pub fn lon_in_range(&self, lon: f64) -> bool {
        (self.lon_min..=self.lon_max).contains(&lon)
    }

    pub fn zoom_in_range(&self, zoom: f64) -> bool {
        (self.zoom_min..=self.zoom_max).contains(&zoom)
    }
}

/// The typed values of a bookmark (the URL itself is parsed elsewhere)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bookmark {
    /// Overrides the start of the time range
    pub start: Option<Instant>,

    /// Overrides the end of the time range
    pub end: Option<Instant>,

    pub current: Option<Instant>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub zoom: Option<f64>,
    pub smart_step: Option<bool>,
}

impl Bookmark {
    /// Build a bookmark from its date literals (`startdatestr`, `enddatestr`,
    /// `curdatestr`).  The end literal names the end of its period.
    pub fn from_literals(
        start: Option<&str>,
        end: Option<&str>,
        current: Option<&str>,
    ) -> Result<Self, DateError> {
        Ok(Bookmark {
            start: start
                .map(|literal| Instant::parse(literal, Rounding::Start))
                .transpose()?,
            end: end
                .map(|literal| Instant::parse(literal, Rounding::End))
                .transpose()?,
            current: current
                .map(|literal| Instant::parse(literal, Rounding::Start))
                .transpose()?,
            ..Bookmark::default()
        })
    }

    /// A bookmark that restores the session as it is now
    pub fn from_session(session: &MapSessionState) -> Self {
        let viewport = session.viewport();
        Bookmark {
            start: Some(session.range().start),
            end: Some(session.range().end),
            current: Some(session.query()),
            lat: Some(viewport.lat),
            lon: Some(viewport.lon),
            zoom: Some(viewport.zoom),
            smart_step: Some(session.smart_step()),
        }
    }

    /// e.g. `startdatestr=1776:01:01&enddatestr=1783:12:31&curdatestr=1780:06:01&lat=38.50&lon=-98.00&z=4.5`
    pub fn to_query_string(&self) -> String {
        let mut parameters = Vec::new();
        if let Some(start) = self.start {
            parameters.push(format!("startdatestr={}", start.to_literal()));
        }
        if let Some(end) = self.end {
            parameters.push(format!("enddatestr={}", end.to_literal()));
        }
        if let Some(current) = self.current {
            parameters.push(format!("curdatestr={}", current.to_literal()));
        }
        if let Some(lat) = self.lat {
            parameters.push(format!("lat={lat:.2}"));
        }
        if let Some(lon) = self.lon {
            parameters.push(format!("lon={lon:.2}"));
        }
        if let Some(zoom) = self.zoom {
            parameters.push(format!("z={zoom:.1}"));
        }
        parameters.join("&")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use open_atlas_core::parse_date;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config = AtlasConfig::default();
        assert_eq!(config.play_steps, 240);
        assert!(config.smart_step);
        assert_eq!(config.start_instant().unwrap().to_literal(), "1776:07:04");
        assert!(config.zoom_in_range(2.5));
        assert!(!config.zoom_in_range(16.0));
        assert!(!config.lat_in_range(-90.5));
        assert!(config.lon_in_range(-180.0));
    }

    #[test]
    fn partial_config() {
        let config: AtlasConfig = serde_json::from_value(json!({
            "play_steps": 10,
            "exclusions": [{ "field": "entity1name", "value": "Placeholder" }]
        }))
        .unwrap();
        assert_eq!(config.play_steps, 10);
        assert_eq!(config.start_lat, 38.5);
        assert_eq!(config.exclusions[0].field, ClassificationField::Entity1Name);
    }

    #[test]
    fn load_missing_file() {
        assert!(matches!(
            AtlasConfig::load(Path::new("/no/such/atlas-config.json")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn exclusions() {
        let exclusion = Exclusion {
            field: ClassificationField::Entity2Type,
            value: String::from("placeholder"),
        };
        let excluded = json!({ "entity2type": "placeholder" });
        let kept = json!({ "entity2type": "colony", "entity1type": "placeholder" });
        assert!(exclusion.matches(excluded.as_object().unwrap()));
        assert!(!exclusion.matches(kept.as_object().unwrap()));
    }

    #[test]
    fn query_string() {
        let bookmark = Bookmark {
            lat: Some(38.5),
            lon: Some(-98.0),
            zoom: Some(4.5),
            ..Bookmark::from_literals(Some("1776"), Some("1783"), Some("44:03:15BC")).unwrap()
        };
        assert_eq!(
            bookmark.to_query_string(),
            "startdatestr=1776:01:01&enddatestr=1783:12:31&curdatestr=0044:03:15BC&lat=38.50&lon=-98.00&z=4.5"
        );
        assert_eq!(Bookmark::default().to_query_string(), "");
        assert_eq!(
            bookmark.end,
            Some(parse_date("1783:12:31", Rounding::End).unwrap())
        );
        assert!(Bookmark::from_literals(Some("1776:13"), None, None).is_err());
    }
}
