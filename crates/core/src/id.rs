// SPDX-License-Identifier: MIT

//!
//! Feature IDs
//!

use serde::{Deserialize, Deserializer, Serialize};

/// The ID of a feature within a dataset.  Datasets write these as either JSON
/// strings or integers; both are held as text.
#[rustfmt::skip]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(derive_more::Display, Serialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    /// Create a `FeatureId`
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Get the underlying `&str`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId::new(value)
    }
}

impl From<i64> for FeatureId {
    fn from(value: i64) -> Self {
        FeatureId(value.to_string())
    }
}

/// Used only by the custom deserialiser
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFeatureId {
    Text(String),
    Integer(i64),
}

impl<'de> Deserialize<'de> for FeatureId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawFeatureId::deserialize(deserializer)? {
            RawFeatureId::Text(text) if text.trim().is_empty() => {
                Err(serde::de::Error::custom("feature ID cannot be empty"))
            }
            RawFeatureId::Text(text) => Ok(FeatureId(text)),
            RawFeatureId::Integer(integer) => Ok(FeatureId::from(integer)),
        }
    }
}
