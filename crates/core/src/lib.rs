// SPDX-License-Identifier: MIT

//!
//! *Part of the wider OpenAtlas project*
//!
//! This crate defines the basic datatypes used across the OpenAtlas project
//! (the feature-state engine and the `atlas` command-line tool): instants and
//! the date literal parser, feature IDs, geometry, colours, and styles.
//!
//! This crate aims to provide APIs for each type so that if a type is
//! instantiated, the developer can be sure it's valid.
//!

mod colour;
mod date;
mod geometry;
mod helpers;
mod id;
mod style;

pub use colour::*;
pub use date::*;
pub use geometry::*;
pub use helpers::*;
pub use id::*;
pub use style::*;
