//! Locomotion state machine for the rocket.
//!
//! Tour mode moves between waypoints along the closed path and circles the
//! current one on arrival. FreeRoam flies with damped velocity and pushes
//! out of planets. The barrel roll is a visual overlay on top of either.

use std::f32::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

use glam::{Quat, Vec3};
use serde::Serialize;

use crate::config::Tuning;
use crate::error::SceneError;
use crate::events::SceneEvent;
use crate::intent::Intent;
use crate::path::PathCurve;
use crate::tween::{Easing, Timer};
use crate::waypoint::WaypointSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Tour,
    FreeRoam,
}

/// Coarse locomotion state reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelState {
    Idle,
    Orbiting,
    Traveling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelDirection {
    Forward,
    Backward,
}

/// An in-flight hop between two waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Travel {
    pub from: usize,
    pub to: usize,
    /// Session time the hop began, in seconds.
    pub started_at: f64,
    /// Eased, boost-adjusted completion in [0, 1].
    pub progress: f32,
    start_t: f32,
    delta_t: f32,
}

impl Travel {
    pub fn direction(&self) -> TravelDirection {
        if self.delta_t < 0.0 {
            TravelDirection::Backward
        } else {
            TravelDirection::Forward
        }
    }

    /// Current normalized path parameter (unwrapped).
    pub fn path_param(&self) -> f32 {
        self.start_t + self.delta_t * self.progress
    }
}

/// Mode and travel state as one tagged value.
#[derive(Debug, Clone, PartialEq)]
pub enum Locomotion {
    /// Hovering near a waypoint without orbiting; the start and reset pose.
    Idle { waypoint: usize },
    Orbiting { waypoint: usize, angle: f32 },
    Traveling(Travel),
    FreeRoam { velocity: Vec3 },
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    pub locomotion: Locomotion,
    pub current_waypoint: usize,
    pub position: Vec3,
    pub orientation: Quat,
    pub camera_yaw: f32,
    pub camera_pitch: f32,
    pub boost_active: bool,
    pub barrel_roll: Option<Timer>,
    pub roll_cooldown: Timer,
    /// Seconds since the session started.
    pub clock: f64,
    /// Unscaled speed readout.
    pub speed: f32,
}

impl NavigationState {
    fn at_start(waypoints: &WaypointSet, tuning: &Tuning, clock: f64) -> Self {
        let home = waypoints.get(0).map(|wp| (wp.position, wp.radius));
        let (center, radius) = home.unwrap_or((Vec3::ZERO, 0.0));
        Self {
            locomotion: Locomotion::Idle { waypoint: 0 },
            current_waypoint: 0,
            position: center + Vec3::new(0.0, radius + tuning.start_hover, 0.0),
            orientation: Quat::IDENTITY,
            camera_yaw: 0.0,
            camera_pitch: 0.0,
            boost_active: false,
            barrel_roll: None,
            roll_cooldown: Timer::expired(),
            clock,
            speed: 0.0,
        }
    }

    pub fn mode(&self) -> Mode {
        match self.locomotion {
            Locomotion::FreeRoam { .. } => Mode::FreeRoam,
            _ => Mode::Tour,
        }
    }

    pub fn travel_state(&self) -> TravelState {
        match self.locomotion {
            Locomotion::Orbiting { .. } => TravelState::Orbiting,
            Locomotion::Traveling(_) => TravelState::Traveling,
            Locomotion::Idle { .. } | Locomotion::FreeRoam { .. } => TravelState::Idle,
        }
    }

    pub fn travel(&self) -> Option<&Travel> {
        match &self.locomotion {
            Locomotion::Traveling(travel) => Some(travel),
            _ => None,
        }
    }

    pub fn target_waypoint(&self) -> Option<usize> {
        self.travel().map(|t| t.to)
    }

    pub fn travel_start_time(&self) -> Option<f64> {
        self.travel().map(|t| t.started_at)
    }

    pub fn velocity(&self) -> Vec3 {
        match self.locomotion {
            Locomotion::FreeRoam { velocity } => velocity,
            _ => Vec3::ZERO,
        }
    }

    pub fn is_traveling(&self) -> bool {
        matches!(self.locomotion, Locomotion::Traveling(_))
    }

    /// Traveling in Tour mode, or drifting noticeably in FreeRoam.
    pub fn is_moving(&self) -> bool {
        match self.locomotion {
            Locomotion::Traveling(_) => true,
            Locomotion::FreeRoam { velocity } => velocity.length() > 0.05,
            _ => false,
        }
    }

    pub fn path_progress(&self) -> f32 {
        self.travel().map(|t| t.progress).unwrap_or(0.0)
    }

    pub fn barrel_roll_progress(&self) -> Option<f32> {
        self.barrel_roll.map(|timer| timer.fraction())
    }

    /// Free-roam look direction from yaw and pitch.
    pub fn look_direction(&self) -> Vec3 {
        look_direction(self.camera_yaw, self.camera_pitch)
    }
}

pub fn look_direction(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(
        -yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
    .normalize_or_zero()
}

/// Signed parameter distance from `start` to `target` around the unit loop.
/// Differences up to half the loop go the direct way, ties included;
/// longer ones wrap round the other side.
pub fn shortest_arc(start: f32, target: f32) -> f32 {
    let diff = target - start;
    if diff.abs() <= 0.5 {
        diff
    } else if diff > 0.0 {
        diff - 1.0
    } else {
        diff + 1.0
    }
}

/// Orientation whose -Z axis points along `dir`.
fn facing(dir: Vec3) -> Quat {
    let dir = dir.normalize_or_zero();
    if dir == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::NEG_Z, dir)
    }
}

pub struct Navigator {
    waypoints: Arc<WaypointSet>,
    path: PathCurve,
    tuning: Tuning,
    state: NavigationState,
    /// Orientation before the barrel-roll overlay.
    base_orientation: Quat,
    pending: Vec<SceneEvent>,
}

impl Navigator {
    pub fn new(waypoints: Arc<WaypointSet>, tuning: Tuning) -> Result<Self, SceneError> {
        let path = PathCurve::through(&waypoints.positions())?;
        let state = NavigationState::at_start(&waypoints, &tuning, 0.0);
        Ok(Self {
            waypoints,
            path,
            tuning,
            state,
            base_orientation: Quat::IDENTITY,
            pending: Vec::new(),
        })
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn path(&self) -> &PathCurve {
        &self.path
    }

    pub fn waypoints(&self) -> &WaypointSet {
        &self.waypoints
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Start a Tour hop to `target`. Ignored outside Tour mode, while
    /// already traveling, or when `target` is the current waypoint.
    pub fn travel_to(&mut self, target: usize) -> bool {
        if self.state.mode() != Mode::Tour {
            tracing::debug!("travel_to({}) ignored in free roam", target);
            return false;
        }
        if let Err(e) = self.waypoints.checked(target) {
            tracing::warn!("travel_to ignored: {}", e);
            return false;
        }
        if let Some(travel) = self.state.travel() {
            tracing::debug!(
                "travel_to({}) ignored: already traveling to {}",
                target,
                travel.to
            );
            return false;
        }
        let from = self.state.current_waypoint;
        if target == from {
            return false;
        }

        let n = self.waypoints.len() as f32;
        let start_t = from as f32 / n;
        let delta_t = shortest_arc(start_t, target as f32 / n);
        let travel = Travel {
            from,
            to: target,
            started_at: self.state.clock,
            progress: 0.0,
            start_t,
            delta_t,
        };
        let direction = travel.direction();
        tracing::info!("Departing waypoint {} for {} ({:?})", from, target, direction);
        self.state.locomotion = Locomotion::Traveling(travel);
        self.pending.push(SceneEvent::TravelStarted {
            from,
            to: target,
            direction,
        });
        true
    }

    pub fn travel_next(&mut self) -> bool {
        let next = self.waypoints.successor(self.state.current_waypoint);
        self.travel_to(next)
    }

    pub fn travel_previous(&mut self) -> bool {
        let prev = self.waypoints.predecessor(self.state.current_waypoint);
        self.travel_to(prev)
    }

    /// Cut the current hop short and orbit whichever waypoint is closest.
    pub fn stop_at_nearest(&mut self) -> bool {
        if !self.state.is_traveling() {
            return false;
        }
        let (nearest, _) = self.waypoints.nearest_center(self.state.position);
        self.arrive(nearest);
        true
    }

    pub fn trigger_barrel_roll(&mut self) -> bool {
        if !self.state.roll_cooldown.finished() {
            return false;
        }
        self.state.barrel_roll = Some(Timer::new(self.tuning.barrel_roll_duration));
        self.state.roll_cooldown = Timer::new(self.tuning.barrel_roll_cooldown);
        self.pending.push(SceneEvent::BarrelRoll);
        true
    }

    /// Switch between Tour and FreeRoam. Leaving FreeRoam drops the rocket
    /// into orbit around the nearest waypoint.
    pub fn toggle_mode(&mut self) -> Mode {
        match self.state.mode() {
            Mode::Tour => {
                self.state.locomotion = Locomotion::FreeRoam {
                    velocity: Vec3::ZERO,
                };
                self.state.camera_yaw = 0.0;
                self.state.camera_pitch = 0.0;
                self.state.boost_active = false;
                tracing::info!("Entering free roam");
                self.pending.push(SceneEvent::ModeChanged {
                    mode: Mode::FreeRoam,
                });
            }
            Mode::FreeRoam => {
                tracing::info!("Leaving free roam");
                self.pending.push(SceneEvent::ModeChanged { mode: Mode::Tour });
                let (nearest, _) = self.waypoints.nearest_center(self.state.position);
                self.arrive(nearest);
            }
        }
        self.state.mode()
    }

    /// Begin orbiting `index` from rest. Only applies while Idle in Tour mode.
    pub fn settle_at(&mut self, index: usize) -> bool {
        if !matches!(self.state.locomotion, Locomotion::Idle { .. }) {
            return false;
        }
        let Some(wp) = self.waypoints.get(index) else {
            return false;
        };
        let offset = self.state.position - wp.position;
        let angle = offset.z.atan2(offset.x);
        self.state.current_waypoint = index;
        self.state.locomotion = Locomotion::Orbiting {
            waypoint: index,
            angle,
        };
        self.pending.push(SceneEvent::Settled { waypoint: index });
        true
    }

    /// Back to the opening pose above the first waypoint, in Tour mode.
    pub fn reset_to_start(&mut self) {
        if self.state.mode() == Mode::FreeRoam {
            self.pending.push(SceneEvent::ModeChanged { mode: Mode::Tour });
        }
        self.state = NavigationState::at_start(&self.waypoints, &self.tuning, self.state.clock);
        self.base_orientation = Quat::IDENTITY;
        self.pending.push(SceneEvent::Reset);
        tracing::info!("Reset to start");
    }

    /// Advance one frame. Returns the events produced since the last call,
    /// including those from commands issued between frames.
    pub fn update(&mut self, intent: &Intent, dt: f32) -> Vec<SceneEvent> {
        self.state.clock += dt as f64;
        self.apply_actions(intent);
        self.state.boost_active = intent.boost;

        match self.state.mode() {
            Mode::Tour => self.update_tour(intent, dt),
            Mode::FreeRoam => self.update_free_roam(intent),
        }
        self.update_barrel_roll(dt);

        std::mem::take(&mut self.pending)
    }

    fn apply_actions(&mut self, intent: &Intent) {
        match self.state.mode() {
            Mode::Tour => {
                if intent.toggle_mode {
                    self.toggle_mode();
                    return;
                }
                if !self.state.is_traveling() {
                    if intent.travel_next {
                        self.travel_next();
                    } else if intent.travel_previous {
                        self.travel_previous();
                    }
                } else if intent.stop {
                    self.stop_at_nearest();
                }
                if intent.barrel_roll {
                    self.trigger_barrel_roll();
                }
            }
            Mode::FreeRoam => {
                if intent.exit_free_roam || intent.toggle_mode {
                    self.toggle_mode();
                }
            }
        }
    }

    fn update_tour(&mut self, intent: &Intent, dt: f32) {
        let tuning = self.tuning;
        let mut arrived_at = None;

        match &mut self.state.locomotion {
            Locomotion::Idle { .. } => {
                self.state.speed = 0.0;
            }
            Locomotion::Orbiting { waypoint, angle } => {
                if let Some(wp) = self.waypoints.get(*waypoint) {
                    *angle = (*angle + tuning.orbit_speed * dt) % TAU;
                    let r = wp.radius + tuning.orbit_offset;
                    self.state.position =
                        wp.position + Vec3::new(angle.cos() * r, 0.0, angle.sin() * r);
                    self.base_orientation = facing(wp.position - self.state.position);
                    self.state.speed = tuning.orbit_speed * r * 0.1;
                }
            }
            Locomotion::Traveling(travel) => {
                let elapsed = (self.state.clock - travel.started_at) as f32;
                let raw = if tuning.travel_duration > 0.0 {
                    (elapsed / tuning.travel_duration).min(1.0)
                } else {
                    1.0
                };
                let eased = Easing::EaseInOutCubic.apply(raw);
                let multiplier = if intent.boost { tuning.travel_boost } else { 1.0 };
                travel.progress = (eased * multiplier).min(1.0);

                let t = travel.path_param();
                self.state.position = self.path.position_at(t);
                let tangent = self.path.tangent_at(t);
                let heading = match travel.direction() {
                    TravelDirection::Forward => tangent,
                    TravelDirection::Backward => -tangent,
                };
                self.base_orientation = facing(heading);
                self.state.speed = if intent.boost { 3.0 } else { 1.5 };

                if travel.progress >= 1.0 {
                    arrived_at = Some(travel.to);
                }
            }
            Locomotion::FreeRoam { .. } => {}
        }

        if let Some(index) = arrived_at {
            self.arrive(index);
        }
    }

    fn update_free_roam(&mut self, intent: &Intent) {
        let tuning = self.tuning;
        let state = &mut self.state;

        state.camera_yaw += intent.look_delta_yaw;
        state.camera_pitch =
            (state.camera_pitch + intent.look_delta_pitch).clamp(-FRAC_PI_2, FRAC_PI_2);

        let forward = look_direction(state.camera_yaw, state.camera_pitch);
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let boost = if intent.boost { tuning.free_roam_boost } else { 1.0 };
        let thrust = tuning.move_speed * boost;
        let acceleration = forward * (intent.forward * thrust)
            + right * (intent.strafe * thrust)
            + Vec3::Y * (intent.vertical * thrust);

        let Locomotion::FreeRoam { velocity } = &mut state.locomotion else {
            return;
        };
        *velocity += acceleration;
        *velocity *= tuning.damping;

        let mut next = state.position + *velocity;
        for wp in self.waypoints.iter() {
            let safe = wp.radius + tuning.clearance;
            let offset = next - wp.position;
            let distance = offset.length();
            if distance < safe {
                let push = if distance > 1e-5 { offset / distance } else { -forward };
                next = wp.position + push * safe;
                *velocity *= tuning.collision_damping;
            }
        }

        state.position = next;
        state.speed = velocity.length() * 100.0;
        self.base_orientation = facing(forward);
    }

    fn update_barrel_roll(&mut self, dt: f32) {
        self.state.roll_cooldown.advance(dt);
        let mut roll = Quat::IDENTITY;
        let done = match &mut self.state.barrel_roll {
            Some(timer) => {
                timer.advance(dt);
                roll = Quat::from_rotation_z(timer.eased(Easing::Linear) * TAU);
                timer.finished()
            }
            None => false,
        };
        if done {
            self.state.barrel_roll = None;
            roll = Quat::IDENTITY;
        }
        self.state.orientation = self.base_orientation * roll;
    }

    fn arrive(&mut self, index: usize) {
        let Some(wp) = self.waypoints.get(index) else {
            return;
        };
        let r = wp.radius + self.tuning.orbit_offset;
        self.state.current_waypoint = index;
        self.state.locomotion = Locomotion::Orbiting {
            waypoint: index,
            angle: 0.0,
        };
        self.state.position = wp.position + Vec3::new(r, 0.0, 0.0);
        self.state.speed = self.tuning.orbit_speed * r * 0.1;
        self.base_orientation = facing(wp.position - self.state.position);
        self.state.orientation = self.base_orientation;
        tracing::info!("Arrived at {} (waypoint {})", wp.name, index);
        self.pending.push(SceneEvent::Arrived { waypoint: index });
    }
}
