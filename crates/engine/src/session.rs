// SPDX-License-Identifier: MIT

//!
//! Map session state
//!
//! The few things that change while an atlas is on screen: the query instant,
//! the pinned feature, and the viewport.  Evaluation reads this; only the
//! transport control moves the query instant.
//!

use crate::{AtlasConfig, Bookmark, DerivedDefaults, Viewpoint};
use geo::Rect;
use open_atlas_core::{FeatureId, Instant};

/// The span of time the transport moves through (both ends inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Instant,
    pub end: Instant,
}

impl TimeRange {
    /// Overrides win.  Otherwise the range runs from the earliest end
    /// instant seen to the latest start instant seen, and if that's empty or
    /// backwards, from the earliest start instant to now.
    pub fn derive(
        start_override: Option<Instant>,
        end_override: Option<Instant>,
        defaults: &DerivedDefaults,
        now: Instant,
    ) -> Self {
        let start = start_override.or(defaults.min_end).unwrap_or(now);
        let end = end_override.or(defaults.max_start).unwrap_or(now);
        if start < end {
            return TimeRange { start, end };
        }
        let earliest = defaults.earliest_start.unwrap_or(now).min(now);
        TimeRange {
            start: earliest,
            end: now,
        }
    }

    pub fn contains(&self, instant: Instant) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// The nearest instant inside the range
    pub fn clamp(&self, instant: Instant) -> Instant {
        instant.max(self.start).min(self.end)
    }

    pub fn span_millis(&self) -> i64 {
        self.end.millis_since(self.start)
    }
}

/// Where the map is looking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
}

impl Viewport {
    /// Each value comes from the bookmark if it's there and in range, then
    /// the dataset's viewpoint, then the config
    pub fn initial(config: &AtlasConfig, viewpoint: Option<&Viewpoint>, bookmark: &Bookmark) -> Self {
        let center = viewpoint.and_then(|viewpoint| viewpoint.center);
        let zoom = viewpoint.and_then(|viewpoint| viewpoint.zoom);
        Viewport {
            lat: bookmark
                .lat
                .filter(|lat| config.lat_in_range(*lat))
                .or(center.map(|[lat, _]| lat))
                .unwrap_or(config.start_lat),
            lon: bookmark
                .lon
                .filter(|lon| config.lon_in_range(*lon))
                .or(center.map(|[_, lon]| lon))
                .unwrap_or(config.start_lon),
            zoom: bookmark
                .zoom
                .filter(|zoom| config.zoom_in_range(*zoom))
                .or(zoom)
                .unwrap_or(config.start_zoom),
        }
    }
}

/// The mutable state of one session
#[derive(Debug, Clone, PartialEq)]
pub struct MapSessionState {
    query: Instant,
    range: TimeRange,

    /// The feature whose info is pinned (drawn highlighted)
    pinned: Option<FeatureId>,

    viewport: Viewport,

    /// The visible region, as reported by the map.  Smart stepping needs it.
    view_bounds: Option<Rect>,

    playing: bool,
    smart_step: bool,
}

impl MapSessionState {
    pub fn new(query: Instant, range: TimeRange, viewport: Viewport, smart_step: bool) -> Self {
        Self {
            query,
            range,
            pinned: None,
            viewport,
            view_bounds: None,
            playing: false,
            smart_step,
        }
    }

    /// The instant being shown
    pub fn query(&self) -> Instant {
        self.query
    }

    pub(crate) fn set_query(&mut self, query: Instant) {
        self.query = query;
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn pinned(&self) -> Option<&FeatureId> {
        self.pinned.as_ref()
    }

    /// Pin a feature's info (or unpin, with `None`)
    pub fn set_pinned(&mut self, pinned: Option<FeatureId>) {
        self.pinned = pinned;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn view_bounds(&self) -> Option<&Rect> {
        self.view_bounds.as_ref()
    }

    pub fn set_view_bounds(&mut self, view_bounds: Option<Rect>) {
        self.view_bounds = view_bounds;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub(crate) fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn smart_step(&self) -> bool {
        self.smart_step
    }

    pub fn set_smart_step(&mut self, smart_step: bool) {
        self.smart_step = smart_step;
    }
}
