//! Simulation core for the Starpath rocket tour: waypoints, the closed tour
//! path, the navigation state machine, proximity tracking, the camera rig
//! and the scene event bus. No windowing or audio device code lives here.

pub mod camera;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod intent;
pub mod navigation;
pub mod path;
pub mod proximity;
pub mod tween;
pub mod waypoint;

pub use camera::CameraRig;
pub use config::{SceneConfig, Tuning};
pub use device::DeviceClass;
pub use error::{ConfigError, SceneError};
pub use events::{EventBus, SceneEvent, TimedEvent};
pub use intent::Intent;
pub use navigation::{Mode, NavigationState, Navigator, TravelDirection, TravelState};
pub use path::PathCurve;
pub use proximity::{ProximityState, ProximityTracker};
pub use waypoint::{SoundscapeId, Waypoint, WaypointSet};
