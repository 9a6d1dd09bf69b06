// SPDX-License-Identifier: MIT

//!
//! *Part of the wider OpenAtlas project*
//!
//! The temporal feature-state engine.  It loads an annotated GeoJSON dataset
//! (validating all of it up front), works out the dates at which the set of
//! visible features changes, and answers "what should the map show at this
//! instant", morphing features into one another where the dataset asks.
//!
//! ```text
//! RawDataset -> normalize -> Atlas (features, morphs, interest dates, bounds)
//!                              |
//!        TransportControl -> MapSessionState -> Atlas::evaluate -> LayerState[]
//! ```
//!

mod animation;
mod atlas;
mod config;
mod dataset;
mod evaluate;
mod feature;
mod index;
mod label;
mod normalize;
mod session;
mod transport;

pub use animation::*;
pub use atlas::*;
pub use config::*;
pub use dataset::*;
pub use evaluate::*;
pub use feature::*;
pub use index::*;
pub use label::*;
pub use normalize::*;
pub use session::*;
pub use transport::*;
