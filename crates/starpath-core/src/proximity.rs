//! Waypoint selection with hysteresis, visit tracking and the sector label.

use std::collections::BTreeSet;

use glam::Vec3;

use crate::config::Tuning;
use crate::events::SceneEvent;
use crate::navigation::{Mode, NavigationState, TravelState};
use crate::waypoint::WaypointSet;

pub const SECTOR_TRAVELING: &str = "Traveling";
pub const SECTOR_DEEP_SPACE: &str = "Deep Space";
pub const SECTOR_FREE_ROAM: &str = "Free Roam";

/// The closest waypoint by surface distance.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestInfo {
    pub index: usize,
    pub name: String,
    /// Distance to the surface, rounded to whole units.
    pub distance: f32,
    /// Unit vector from the entity toward the waypoint center.
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityState {
    pub selected_waypoint: Option<usize>,
    pub nearest: Option<NearestInfo>,
    /// Append-only for the session; always holds the first waypoint.
    pub visited: BTreeSet<usize>,
    pub sector_label: String,
    /// Direction indicator visible: nothing within range and at rest in Tour.
    pub show_indicator: bool,
}

impl Default for ProximityState {
    fn default() -> Self {
        Self {
            selected_waypoint: None,
            nearest: None,
            visited: BTreeSet::from([0]),
            sector_label: SECTOR_DEEP_SPACE.to_string(),
            show_indicator: false,
        }
    }
}

/// What the driver has to pass on after a proximity pass.
#[derive(Debug, Default, PartialEq)]
pub struct ProximityUpdate {
    /// Waypoint the navigator should settle into orbit around.
    pub settle_at: Option<usize>,
    pub events: Vec<SceneEvent>,
}

pub struct ProximityTracker {
    trigger_radius: f32,
    exit_radius: f32,
    indicator_range: f32,
    state: ProximityState,
}

impl ProximityTracker {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            trigger_radius: tuning.trigger_radius,
            exit_radius: tuning.exit_radius(),
            indicator_range: tuning.indicator_range,
            state: ProximityState::default(),
        }
    }

    pub fn state(&self) -> &ProximityState {
        &self.state
    }

    /// One pass per frame. `nav_events` are the navigator events of the
    /// same tick; arrivals and resets are folded in before distances.
    pub fn update(
        &mut self,
        nav: &NavigationState,
        waypoints: &WaypointSet,
        nav_events: &[SceneEvent],
    ) -> ProximityUpdate {
        let mut out = ProximityUpdate::default();

        for event in nav_events {
            match event {
                SceneEvent::Reset => {
                    if let Some(prev) = self.state.selected_waypoint.take() {
                        out.events.push(SceneEvent::WaypointDeselected { waypoint: prev });
                    }
                    self.state.visited = BTreeSet::from([0]);
                }
                SceneEvent::Arrived { waypoint } => {
                    self.select(*waypoint, &mut out.events);
                }
                _ => {}
            }
        }

        let mut nearest: Option<(usize, f32)> = None;
        for wp in waypoints.iter() {
            let distance = wp.surface_distance(nav.position);
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((wp.index, distance));
            }

            if distance < self.trigger_radius && self.state.selected_waypoint != Some(wp.index) {
                self.select(wp.index, &mut out.events);
                if nav.mode() == Mode::Tour && out.settle_at.is_none() {
                    out.settle_at = Some(wp.index);
                }
            }

            if self.state.selected_waypoint == Some(wp.index) && distance > self.exit_radius {
                self.state.selected_waypoint = None;
                out.events.push(SceneEvent::WaypointDeselected { waypoint: wp.index });
            }
        }

        self.state.nearest = nearest.and_then(|(index, distance)| {
            let wp = waypoints.get(index)?;
            Some(NearestInfo {
                index,
                name: wp.name.clone(),
                distance: distance.round(),
                direction: (wp.position - nav.position).normalize_or_zero(),
            })
        });

        let closest = nearest.map(|(_, d)| d).unwrap_or(f32::INFINITY);
        let traveling = nav.travel_state() == TravelState::Traveling;
        self.state.show_indicator =
            nav.mode() == Mode::Tour && closest > self.indicator_range && !nav.is_moving();

        let label = self.sector_label(nav.mode(), traveling, closest, waypoints);
        if label != self.state.sector_label {
            out.events.push(SceneEvent::SectorChanged {
                label: label.clone(),
            });
            self.state.sector_label = label;
        }

        out
    }

    fn select(&mut self, index: usize, events: &mut Vec<SceneEvent>) {
        if self.state.selected_waypoint == Some(index) {
            return;
        }
        if let Some(prev) = self.state.selected_waypoint.replace(index) {
            events.push(SceneEvent::WaypointDeselected { waypoint: prev });
        }
        events.push(SceneEvent::WaypointSelected { waypoint: index });
        if self.state.visited.insert(index) {
            events.push(SceneEvent::WaypointVisited { waypoint: index });
        }
    }

    fn sector_label(
        &self,
        mode: Mode,
        traveling: bool,
        closest: f32,
        waypoints: &WaypointSet,
    ) -> String {
        if traveling {
            return SECTOR_TRAVELING.to_string();
        }
        let named = self
            .state
            .selected_waypoint
            .or_else(|| {
                self.state
                    .nearest
                    .as_ref()
                    .filter(|_| closest <= self.indicator_range)
                    .map(|n| n.index)
            })
            .and_then(|index| waypoints.get(index));
        match (named, mode) {
            (Some(wp), _) => wp.name.clone(),
            (None, Mode::Tour) => SECTOR_DEEP_SPACE.to_string(),
            (None, Mode::FreeRoam) => SECTOR_FREE_ROAM.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::intent::Intent;
    use crate::navigation::Navigator;
    use std::sync::Arc;

    const STEP: f32 = 1.0 / 64.0;

    struct Rig {
        nav: Navigator,
        tracker: ProximityTracker,
        waypoints: Arc<crate::waypoint::WaypointSet>,
    }

    impl Rig {
        fn new() -> Self {
            let config = SceneConfig::default();
            let waypoints = Arc::new(config.waypoint_set().unwrap());
            Self {
                nav: Navigator::new(waypoints.clone(), config.tuning).unwrap(),
                tracker: ProximityTracker::new(&config.tuning),
                waypoints,
            }
        }

        fn tick(&mut self, intent: &Intent) -> Vec<SceneEvent> {
            let mut events = self.nav.update(intent, STEP);
            let update = self.tracker.update(self.nav.state(), &self.waypoints, &events);
            if let Some(index) = update.settle_at {
                self.nav.settle_at(index);
                events.extend(self.nav.update(&Intent::default(), 0.0));
            }
            events.extend(update.events);
            events
        }

        fn run(&mut self, intent: &Intent, frames: usize) -> Vec<SceneEvent> {
            (0..frames).flat_map(|_| self.tick(intent)).collect()
        }
    }

    #[test]
    fn test_initial_state_has_home_visited() {
        let tracker = ProximityTracker::new(&Tuning::default());
        assert_eq!(tracker.state().visited, BTreeSet::from([0]));
        assert_eq!(tracker.state().selected_waypoint, None);
    }

    #[test]
    fn test_first_pass_selects_home_and_settles() {
        let mut rig = Rig::new();
        let events = rig.tick(&Intent::default());
        assert!(events.contains(&SceneEvent::WaypointSelected { waypoint: 0 }));
        assert!(events.contains(&SceneEvent::Settled { waypoint: 0 }));
        // Home is visited from the start, so no visit event.
        assert!(!events.contains(&SceneEvent::WaypointVisited { waypoint: 0 }));
        assert_eq!(rig.tracker.state().selected_waypoint, Some(0));
        assert_eq!(rig.tracker.state().sector_label, "SUN");
        assert_eq!(rig.nav.state().travel_state(), TravelState::Orbiting);
    }

    #[test]
    fn test_arrival_marks_visited() {
        let mut rig = Rig::new();
        rig.tick(&Intent::default());
        rig.nav.travel_to(3);
        let events = rig.run(&Intent::default(), 256);
        assert!(events.contains(&SceneEvent::WaypointVisited { waypoint: 3 }));
        let state = rig.tracker.state();
        assert_eq!(state.selected_waypoint, Some(3));
        assert!(state.visited.contains(&3));
        assert_eq!(state.sector_label, "EARTH");
    }

    #[test]
    fn test_sector_label_while_traveling() {
        let mut rig = Rig::new();
        rig.tick(&Intent::default());
        rig.nav.travel_to(5);
        rig.run(&Intent::default(), 64);
        assert_eq!(rig.tracker.state().sector_label, SECTOR_TRAVELING);
        assert!(!rig.tracker.state().show_indicator);
    }

    #[test]
    fn test_selection_hysteresis() {
        let config = SceneConfig::default();
        let waypoints = config.waypoint_set().unwrap();
        let mut tracker = ProximityTracker::new(&config.tuning);
        let nav = Navigator::new(Arc::new(waypoints.clone()), config.tuning).unwrap();
        let mut state = nav.state().clone();
        let sun = waypoints.get(0).unwrap().clone();

        state.position = sun.position + Vec3::new(0.0, sun.radius + 20.0, 0.0);
        tracker.update(&state, &waypoints, &[]);
        assert_eq!(tracker.state().selected_waypoint, Some(0));

        // Between trigger and exit radius: still selected.
        state.position = sun.position + Vec3::new(0.0, sun.radius + 45.0, 0.0);
        tracker.update(&state, &waypoints, &[]);
        assert_eq!(tracker.state().selected_waypoint, Some(0));

        // Past the exit radius: dropped.
        state.position = sun.position + Vec3::new(0.0, sun.radius + 65.0, 0.0);
        let update = tracker.update(&state, &waypoints, &[]);
        assert_eq!(tracker.state().selected_waypoint, None);
        assert!(update
            .events
            .contains(&SceneEvent::WaypointDeselected { waypoint: 0 }));

        // Back inside the exit radius does not reselect.
        state.position = sun.position + Vec3::new(0.0, sun.radius + 45.0, 0.0);
        tracker.update(&state, &waypoints, &[]);
        assert_eq!(tracker.state().selected_waypoint, None);
    }

    #[test]
    fn test_indicator_and_deep_space() {
        let config = SceneConfig::default();
        let waypoints = config.waypoint_set().unwrap();
        let mut tracker = ProximityTracker::new(&config.tuning);
        let nav = Navigator::new(Arc::new(waypoints.clone()), config.tuning).unwrap();
        let mut state = nav.state().clone();

        state.position = Vec3::new(-300.0, 0.0, 0.0);
        let update = tracker.update(&state, &waypoints, &[]);
        assert!(update.settle_at.is_none());
        let proximity = tracker.state();
        assert!(proximity.show_indicator);
        assert_eq!(proximity.sector_label, SECTOR_DEEP_SPACE);
        let nearest = proximity.nearest.as_ref().unwrap();
        assert_eq!(nearest.index, 0);
        assert_eq!(nearest.distance, 285.0);
        assert!((nearest.direction - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_free_roam_labels() {
        let mut rig = Rig::new();
        rig.tick(&Intent::default());
        rig.nav.toggle_mode();
        let climb = Intent {
            vertical: 1.0,
            boost: true,
            ..Default::default()
        };
        rig.run(&climb, 200);
        let state = rig.tracker.state();
        assert_eq!(state.sector_label, SECTOR_FREE_ROAM);
        assert!(!state.show_indicator);
        assert_eq!(state.selected_waypoint, None);
    }

    #[test]
    fn test_free_roam_selection_does_not_settle() {
        let mut rig = Rig::new();
        rig.nav.toggle_mode();
        rig.tick(&Intent::default());
        assert_eq!(rig.tracker.state().selected_waypoint, Some(0));
        assert_eq!(rig.nav.state().mode(), Mode::FreeRoam);
    }

    #[test]
    fn test_visited_grows_and_reset_restores_home_only() {
        let mut rig = Rig::new();
        rig.tick(&Intent::default());
        rig.nav.travel_to(1);
        rig.run(&Intent::default(), 256);
        rig.nav.travel_to(2);
        rig.run(&Intent::default(), 256);
        let visited = rig.tracker.state().visited.clone();
        assert!(visited.is_superset(&BTreeSet::from([0, 1, 2])));

        rig.nav.reset_to_start();
        rig.tick(&Intent::default());
        assert_eq!(rig.tracker.state().visited, BTreeSet::from([0]));
        assert_eq!(rig.tracker.state().selected_waypoint, Some(0));
    }
}
