//! starpath.yaml scene configuration.
//!
//! Every field is optional; a missing file or section falls back to the
//! built-in eight-planet tour and the stock tuning.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::waypoint::{SoundscapeId, Waypoint, WaypointSet};

pub const CONFIG_FILE_NAME: &str = "starpath.yaml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_waypoints")]
    pub waypoints: Vec<WaypointConfig>,
    #[serde(default)]
    pub tuning: Tuning,
    #[serde(default)]
    pub audio: AudioConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            waypoints: default_waypoints(),
            tuning: Tuning::default(),
            audio: AudioConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaypointConfig {
    pub name: String,
    pub position: [f32; 3],
    pub radius: f32,
    #[serde(default = "default_soundscape")]
    pub soundscape: SoundscapeId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub info: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_volume")]
    pub volume: u8,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: default_volume(),
        }
    }
}

/// Engine constants. Distances are world units, times are seconds, and
/// the free-roam values are applied once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Tuning {
    pub travel_duration: f32,
    pub travel_boost: f32,
    pub orbit_offset: f32,
    pub orbit_speed: f32,
    pub start_hover: f32,
    pub trigger_radius: f32,
    pub exit_factor: f32,
    pub indicator_range: f32,
    pub move_speed: f32,
    pub free_roam_boost: f32,
    pub damping: f32,
    pub clearance: f32,
    pub collision_damping: f32,
    pub barrel_roll_duration: f32,
    pub barrel_roll_cooldown: f32,
    pub barrel_roll_banner: f32,
    pub look_sensitivity: f32,
    pub orbit_camera_lerp: f32,
    pub chase_camera_lerp: f32,
    pub chase_rotate_speed: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            travel_duration: 4.0,
            travel_boost: 1.5,
            orbit_offset: 25.0,
            orbit_speed: 0.3,
            start_hover: 20.0,
            trigger_radius: 30.0,
            exit_factor: 2.0,
            indicator_range: 100.0,
            move_speed: 0.3,
            free_roam_boost: 2.0,
            damping: 0.92,
            clearance: 8.0,
            collision_damping: 0.5,
            barrel_roll_duration: 1.0,
            barrel_roll_cooldown: 3.0,
            barrel_roll_banner: 1.5,
            look_sensitivity: 0.002,
            orbit_camera_lerp: 0.05,
            chase_camera_lerp: 0.1,
            chase_rotate_speed: 0.02,
        }
    }
}

impl Tuning {
    pub fn exit_radius(&self) -> f32 {
        self.trigger_radius * self.exit_factor
    }
}

impl SceneConfig {
    /// Build the validated waypoint list.
    pub fn waypoint_set(&self) -> Result<WaypointSet, ConfigError> {
        let waypoints = self
            .waypoints
            .iter()
            .enumerate()
            .map(|(index, wp)| Waypoint {
                index,
                name: wp.name.clone(),
                position: glam::Vec3::from_array(wp.position),
                radius: wp.radius,
                soundscape: wp.soundscape,
                label: wp.label.clone(),
                info: wp.info.clone(),
            })
            .collect();
        Ok(WaypointSet::new(waypoints)?)
    }
}

/// Walk up from `start_dir` looking for `starpath.yaml`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<SceneConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    // Fail fast on a layout the engine cannot run.
    config.waypoint_set()?;
    tracing::info!(
        "Loaded scene '{}' from {:?}: {} waypoints",
        config.name,
        path,
        config.waypoints.len()
    );
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<SceneConfig, serde_yaml::Error> {
    serde_yaml::from_str(contents)
}

fn default_name() -> String {
    "Cosmic Canvas".to_string()
}

fn default_soundscape() -> SoundscapeId {
    SoundscapeId::Space
}

fn default_volume() -> u8 {
    50
}

fn planet(
    name: &str,
    position: [f32; 3],
    radius: f32,
    soundscape: SoundscapeId,
    label: &str,
    info: &str,
) -> WaypointConfig {
    WaypointConfig {
        name: name.to_string(),
        position,
        radius,
        soundscape,
        label: label.to_string(),
        info: info.to_string(),
    }
}

/// The stock tour: eight planets strung out along +X.
pub fn default_waypoints() -> Vec<WaypointConfig> {
    vec![
        planet(
            "SUN",
            [0.0, 0.0, 0.0],
            15.0,
            SoundscapeId::Sun,
            "Home Base",
            "Welcome! Start your journey through space.",
        ),
        planet(
            "MERCURY",
            [80.0, 20.0, 30.0],
            4.0,
            SoundscapeId::Rocky,
            "About Me",
            "Background, interests, and what drives me.",
        ),
        planet(
            "VENUS",
            [120.0, 40.0, -40.0],
            6.0,
            SoundscapeId::Atmospheric,
            "Contact Information",
            "Email, profiles, and how to get in touch.",
        ),
        planet(
            "EARTH",
            [180.0, 10.0, -20.0],
            7.0,
            SoundscapeId::Earth,
            "Education",
            "Academic journey and achievements.",
        ),
        planet(
            "MARS",
            [240.0, -20.0, 60.0],
            5.0,
            SoundscapeId::Storm,
            "Work Experience",
            "Professional experience and career highlights.",
        ),
        planet(
            "JUPITER",
            [320.0, 0.0, 40.0],
            14.0,
            SoundscapeId::Gas,
            "Technical Skills",
            "Tools and technologies.",
        ),
        planet(
            "SATURN",
            [400.0, 30.0, -50.0],
            12.0,
            SoundscapeId::Rings,
            "Projects",
            "Showcase of projects and creative work.",
        ),
        planet(
            "NEPTUNE",
            [480.0, -10.0, -20.0],
            8.0,
            SoundscapeId::Ice,
            "Achievements & Certifications",
            "Awards and notable achievements.",
        ),
    ]
}
