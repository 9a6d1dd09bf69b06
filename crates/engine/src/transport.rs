// SPDX-License-Identifier: MIT

//!
//! The transport control (slider, play/stop, and step buttons)
//!
//! It's the only thing that moves a session's query instant.  Every method
//! returns the new query instant, which the host then evaluates.
//!

use crate::{Atlas, AtlasConfig, MapSessionState};
use log::debug;
use open_atlas_core::{Instant, bounds_intersect};

/// Something the user did to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// The slider was moved
    SetQuery(Instant),

    /// A play timer tick
    Advance,

    StepForward,
    StepBackward,
    Play,
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub struct TransportControl<'a> {
    atlas: &'a Atlas,

    /// Each tick advances by 1/`play_steps` of the range
    play_steps: u32,
}

impl<'a> TransportControl<'a> {
    pub fn new(atlas: &'a Atlas, play_steps: u32) -> Self {
        Self {
            atlas,
            play_steps: play_steps.max(1),
        }
    }

    pub fn from_config(atlas: &'a Atlas, config: &AtlasConfig) -> Self {
        Self::new(atlas, config.play_steps)
    }

    pub fn handle(&self, session: &mut MapSessionState, event: TransportEvent) -> Instant {
        match event {
            TransportEvent::SetQuery(instant) => self.on_query_change(session, instant),
            TransportEvent::Advance => self.on_advance(session),
            TransportEvent::StepForward => self.on_step_forward(session),
            TransportEvent::StepBackward => self.on_step_backward(session),
            TransportEvent::Play => self.play(session),
            TransportEvent::Stop => self.stop(session),
        }
    }

    /// Move to the given instant, clamped to the range
    pub fn on_query_change(&self, session: &mut MapSessionState, instant: Instant) -> Instant {
        let query = session.range().clamp(instant);
        debug!("Query changed to {query}");
        session.set_query(query);
        query
    }

    /// Move on by one play step.  Reaching the end of the range stops
    /// playing.
    pub fn on_advance(&self, session: &mut MapSessionState) -> Instant {
        let range = session.range();
        let step = range.span_millis() / i64::from(self.play_steps);
        let next = session
            .query()
            .checked_add_millis(step)
            .map_or(range.end, |next| next.min(range.end));
        if next >= range.end && session.is_playing() {
            debug!("Reached the end of the range; stopping");
            session.set_playing(false);
        }
        session.set_query(next);
        next
    }

    /// Move to the next interest date (with smart stepping, the next one
    /// where something in view changes)
    pub fn on_step_forward(&self, session: &mut MapSessionState) -> Instant {
        let index = self.atlas.index();
        let query = session.query();
        let Some(first) = index.next_after(query) else {
            debug!("No interest date after {query}");
            return query;
        };
        let Some(i) = (first..index.len()).find(|i| self.changes_in_view(session, *i)) else {
            debug!("Nothing changes in view after {query}");
            return query;
        };
        let Some(date) = index.date(i) else {
            return query;
        };
        let next = date.min(session.range().end);
        debug!("Stepped forward to {next}");
        session.set_query(next);
        next
    }

    /// Move to the previous interest date (with smart stepping, the previous
    /// one where something in view changes)
    pub fn on_step_backward(&self, session: &mut MapSessionState) -> Instant {
        let index = self.atlas.index();
        let query = session.query();
        let Some(last) = index.previous_before(query) else {
            debug!("No interest date before {query}");
            return query;
        };

        // Stepping back to date i undoes the changes made at i + 1
        let found = (0..=last).rev().find(|i| {
            let undone = i + 1;
            undone >= index.len() || self.changes_in_view(session, undone)
        });
        let Some(date) = found.and_then(|i| index.date(i)) else {
            debug!("Nothing changes in view before {query}");
            return query;
        };
        let previous = date.max(session.range().start);
        debug!("Stepped back to {previous}");
        session.set_query(previous);
        previous
    }

    pub fn play(&self, session: &mut MapSessionState) -> Instant {
        debug!("Playing from {}", session.query());
        session.set_playing(true);
        session.query()
    }

    pub fn stop(&self, session: &mut MapSessionState) -> Instant {
        debug!("Stopped at {}", session.query());
        session.set_playing(false);
        session.query()
    }

    /// Whether any feature added or removed at date `i` is in view.  Without
    /// smart stepping (or a known view) everything counts.
    fn changes_in_view(&self, session: &MapSessionState, i: usize) -> bool {
        if !session.smart_step() {
            return true;
        }
        let Some(view) = session.view_bounds() else {
            return true;
        };
        let index = self.atlas.index();
        index
            .adds(i)
            .iter()
            .chain(index.removes(i))
            .any(|position| {
                self.atlas
                    .bounds_at(*position)
                    .is_some_and(|bounds| bounds_intersect(bounds, view))
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{LoadOptions, TimeRange, Viewport};
    use geo::{Coord, Rect};
    use open_atlas_core::{Rounding, parse_date};
    use serde_json::json;

    fn now() -> Instant {
        Instant::from_ymd(2025, 6, 1).unwrap()
    }

    fn date(literal: &str) -> Instant {
        parse_date(literal, Rounding::Start).unwrap()
    }

    fn square(id: &str, start: &str, end: &str, west: f64) -> serde_json::Value {
        json!({
            "type": "Feature",
            "id": id,
            "properties": {
                "entity1type": "nation",
                "entity1name": id,
                "fidelity": 3,
                "startdatestr": start,
                "enddatestr": end,
                "source": "https://example.org"
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [west, 0.0], [west + 1.0, 0.0], [west + 1.0, 1.0], [west, 1.0], [west, 0.0]
                ]]
            }
        })
    }

    /// `east` is far away from the other two
    fn atlas() -> Atlas {
        let dataset = json!({
            "type": "FeatureCollection",
            "features": [
                square("west", "1700", "1750", 0.0),
                square("east", "1720", "1730", 100.0),
                square("later", "1760", "1800", 0.0)
            ]
        });
        Atlas::from_json_str(&dataset.to_string(), &LoadOptions::new(now())).unwrap()
    }

    fn session(query: Instant, smart_step: bool) -> MapSessionState {
        MapSessionState::new(
            query,
            TimeRange { start: date("1700"), end: date("1800") },
            Viewport { lat: 0.0, lon: 0.0, zoom: 4.0 },
            smart_step,
        )
    }

    fn view_of_west() -> Option<Rect> {
        Some(Rect::new(Coord { x: -5.0, y: -5.0 }, Coord { x: 5.0, y: 5.0 }))
    }

    #[test]
    fn query_change_clamps() {
        let atlas = atlas();
        let transport = TransportControl::new(&atlas, 240);
        let mut session = session(date("1750"), true);
        assert_eq!(transport.on_query_change(&mut session, date("1600")), date("1700"));
        assert_eq!(
            transport.handle(&mut session, TransportEvent::SetQuery(date("1900"))),
            date("1800")
        );
        assert_eq!(session.query(), date("1800"));
    }

    #[test]
    fn advance_stops_at_the_end() {
        let atlas = atlas();
        let transport = TransportControl::new(&atlas, 4);
        let mut session = session(date("1700"), true);
        transport.handle(&mut session, TransportEvent::Play);
        assert!(session.is_playing());

        let first = transport.on_advance(&mut session);
        assert!(first > date("1724") && first < date("1726"));
        assert!(session.is_playing());

        for _ in 0..3 {
            transport.on_advance(&mut session);
        }
        assert_eq!(session.query(), date("1800"));
        assert!(!session.is_playing());

        // Stays put
        assert_eq!(transport.on_advance(&mut session), date("1800"));
    }

    #[test]
    fn plain_steps() {
        let atlas = atlas();
        let transport = TransportControl::new(&atlas, 240);
        let mut session = session(date("1700"), false);
        assert_eq!(transport.on_step_forward(&mut session), date("1720"));
        assert_eq!(transport.on_step_forward(&mut session), date("1760"));

        // The next date is now, which is after the range
        assert_eq!(transport.on_step_forward(&mut session), date("1800"));

        assert_eq!(transport.on_step_backward(&mut session), date("1760"));
        assert_eq!(transport.on_step_backward(&mut session), date("1720"));
        assert_eq!(transport.on_step_backward(&mut session), date("1700"));
        assert_eq!(transport.on_step_backward(&mut session), date("1700"));
    }

    #[test]
    fn smart_steps_skip_changes_out_of_view() {
        let atlas = atlas();
        let transport = TransportControl::new(&atlas, 240);
        let mut session = session(date("1700"), true);
        session.set_view_bounds(view_of_west());

        // 1720 only adds `east`, which is out of view
        assert_eq!(transport.on_step_forward(&mut session), date("1760"));

        // Stepping back to 1720 would only undo the 1760 changes, which are in
        // view; stepping back to 1700 would undo `east`, which isn't
        assert_eq!(transport.on_step_backward(&mut session), date("1720"));
        assert_eq!(transport.on_step_backward(&mut session), date("1720"));
    }

    #[test]
    fn smart_step_needs_a_view() {
        let atlas = atlas();
        let transport = TransportControl::from_config(&atlas, &AtlasConfig::default());
        let mut session = session(date("1700"), true);
        assert_eq!(transport.on_step_forward(&mut session), date("1720"));
        transport.handle(&mut session, TransportEvent::Stop);
        assert!(!session.is_playing());
    }
}
