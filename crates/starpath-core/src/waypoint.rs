use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// Identifies one procedural ambient soundscape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundscapeId {
    /// Deep-space fallback ambience.
    Space,
    Sun,
    Rocky,
    Atmospheric,
    Earth,
    Storm,
    Gas,
    Rings,
    Ice,
}

impl SoundscapeId {
    pub const ALL: [SoundscapeId; 9] = [
        SoundscapeId::Space,
        SoundscapeId::Sun,
        SoundscapeId::Rocky,
        SoundscapeId::Atmospheric,
        SoundscapeId::Earth,
        SoundscapeId::Storm,
        SoundscapeId::Gas,
        SoundscapeId::Rings,
        SoundscapeId::Ice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundscapeId::Space => "space",
            SoundscapeId::Sun => "sun",
            SoundscapeId::Rocky => "rocky",
            SoundscapeId::Atmospheric => "atmospheric",
            SoundscapeId::Earth => "earth",
            SoundscapeId::Storm => "storm",
            SoundscapeId::Gas => "gas",
            SoundscapeId::Rings => "rings",
            SoundscapeId::Ice => "ice",
        }
    }
}

impl std::fmt::Display for SoundscapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A planet on the tour. Immutable once the tour is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub index: usize,
    pub name: String,
    pub position: Vec3,
    pub radius: f32,
    pub soundscape: SoundscapeId,
    /// Short caption shown by the presentation layer.
    pub label: String,
    pub info: String,
}

impl Waypoint {
    /// Distance from `pos` to the surface (center distance minus radius).
    pub fn surface_distance(&self, pos: Vec3) -> f32 {
        pos.distance(self.position) - self.radius
    }
}

/// The ordered, cyclic list of waypoints. The successor of the last
/// waypoint is the first.
#[derive(Debug, Clone)]
pub struct WaypointSet {
    waypoints: Vec<Waypoint>,
}

impl WaypointSet {
    /// Validates and indexes the list. Fails on fewer than two entries or
    /// a non-positive radius.
    pub fn new(mut waypoints: Vec<Waypoint>) -> Result<Self, SceneError> {
        if waypoints.len() < 2 {
            return Err(SceneError::TooFewWaypoints(waypoints.len()));
        }
        for (i, wp) in waypoints.iter_mut().enumerate() {
            if !(wp.radius > 0.0) {
                return Err(SceneError::InvalidRadius {
                    name: wp.name.clone(),
                    radius: wp.radius,
                });
            }
            wp.index = i;
        }
        Ok(Self { waypoints })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn checked(&self, index: usize) -> Result<&Waypoint, SceneError> {
        self.waypoints.get(index).ok_or(SceneError::IndexOutOfRange {
            index,
            len: self.waypoints.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.waypoints.iter().map(|wp| wp.position).collect()
    }

    pub fn successor(&self, index: usize) -> usize {
        (index + 1) % self.waypoints.len()
    }

    pub fn predecessor(&self, index: usize) -> usize {
        (index + self.waypoints.len() - 1) % self.waypoints.len()
    }

    /// Waypoint whose center is closest to `pos`, with that center distance.
    pub fn nearest_center(&self, pos: Vec3) -> (usize, f32) {
        let mut best = (0, f32::INFINITY);
        for wp in &self.waypoints {
            let d = pos.distance(wp.position);
            if d < best.1 {
                best = (wp.index, d);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(name: &str, x: f32, radius: f32) -> Waypoint {
        Waypoint {
            index: 99,
            name: name.into(),
            position: Vec3::new(x, 0.0, 0.0),
            radius,
            soundscape: SoundscapeId::Space,
            label: String::new(),
            info: String::new(),
        }
    }

    #[test]
    fn test_rejects_single_waypoint() {
        let err = WaypointSet::new(vec![wp("A", 0.0, 1.0)]).unwrap_err();
        assert_eq!(err, SceneError::TooFewWaypoints(1));
    }

    #[test]
    fn test_rejects_zero_radius() {
        let err = WaypointSet::new(vec![wp("A", 0.0, 1.0), wp("B", 10.0, 0.0)]).unwrap_err();
        assert!(matches!(err, SceneError::InvalidRadius { .. }));
    }

    #[test]
    fn test_indices_assigned_and_cyclic() {
        let set = WaypointSet::new(vec![
            wp("A", 0.0, 1.0),
            wp("B", 10.0, 1.0),
            wp("C", 20.0, 1.0),
        ])
        .unwrap();
        assert_eq!(set.get(2).unwrap().index, 2);
        assert_eq!(set.successor(2), 0);
        assert_eq!(set.predecessor(0), 2);
    }

    #[test]
    fn test_checked_reports_out_of_range() {
        let set = WaypointSet::new(vec![wp("A", 0.0, 1.0), wp("B", 10.0, 1.0)]).unwrap();
        assert_eq!(set.checked(1).unwrap().name, "B");
        assert_eq!(
            set.checked(2).unwrap_err(),
            SceneError::IndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn test_nearest_center() {
        let set = WaypointSet::new(vec![wp("A", 0.0, 1.0), wp("B", 100.0, 5.0)]).unwrap();
        let (idx, dist) = set.nearest_center(Vec3::new(80.0, 0.0, 0.0));
        assert_eq!(idx, 1);
        assert!((dist - 20.0).abs() < 1e-4);
        let b = set.get(1).unwrap();
        assert!((b.surface_distance(Vec3::new(80.0, 0.0, 0.0)) - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_soundscape_names_roundtrip_through_yaml() {
        for id in SoundscapeId::ALL {
            let yaml = serde_yaml::to_string(&id).unwrap();
            assert_eq!(yaml.trim(), id.as_str());
        }
    }
}
