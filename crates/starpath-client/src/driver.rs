//! The per-frame driver: sample input, advance navigation, track
//! proximity, place the camera, pick the soundscape, then draw.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use serde::Serialize;
use winit::event::{DeviceEvent, WindowEvent};

use starpath_core::navigation::TravelState;
use starpath_core::tween::Timer;
use starpath_core::{
    CameraRig, DeviceClass, EventBus, Mode, NavigationState, Navigator, ProximityState,
    ProximityTracker, SceneError, SceneEvent, SoundscapeId, Tuning, WaypointSet,
};

use crate::audio::AudioDirector;
use crate::input::InputSource;

/// Scene events kept in memory for inspection.
const EVENT_LOG_CAPACITY: usize = 256;

/// Where frames go. Drawing itself is up to the implementation.
pub trait Surface {
    /// False once the surface has been disposed; ticks are skipped then.
    fn is_alive(&self) -> bool;
    fn size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, frame: &Frame<'_>);
    fn release(&mut self);
}

/// Everything a surface needs to draw one frame.
pub struct Frame<'a> {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub rocket_position: Vec3,
    pub rocket_orientation: Quat,
    pub waypoints: &'a WaypointSet,
    /// `None` while the HUD is hidden.
    pub hud: Option<&'a HudSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestSnapshot {
    pub index: usize,
    pub name: String,
    pub distance: f32,
    pub direction: [f32; 3],
}

/// Read-only view of the scene for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub mode: Mode,
    pub travel_state: TravelState,
    pub current_waypoint: usize,
    pub current_waypoint_name: String,
    pub selected_waypoint: Option<usize>,
    pub sector_label: String,
    /// Speed readout, already scaled for display.
    pub speed: u32,
    pub boost_active: bool,
    pub path_progress_percent: u32,
    pub visited: Vec<usize>,
    pub waypoint_count: usize,
    pub nearest: Option<NearestSnapshot>,
    pub show_indicator: bool,
    pub barrel_roll_banner: bool,
    pub pointer_captured: bool,
    pub audio_enabled: bool,
    pub volume: u8,
    pub soundscape: Option<SoundscapeId>,
}

impl HudSnapshot {
    /// One-line summary for a title bar or log.
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "{} | {:?} | speed {} | visited {}/{}",
            self.sector_label,
            self.travel_state,
            self.speed,
            self.visited.len(),
            self.waypoint_count
        );
        if self.travel_state == TravelState::Traveling {
            line.push_str(&format!(" | {}%", self.path_progress_percent));
        }
        if self.boost_active {
            line.push_str(" | BOOST");
        }
        if self.barrel_roll_banner {
            line.push_str(" | BARREL ROLL!");
        }
        if self.mode == Mode::FreeRoam && !self.pointer_captured {
            line.push_str(" | click to look");
        }
        line
    }
}

pub struct FrameDriver {
    waypoints: Arc<WaypointSet>,
    tuning: Tuning,
    input: Box<dyn InputSource>,
    navigator: Navigator,
    tracker: ProximityTracker,
    audio: AudioDirector,
    camera: CameraRig,
    events: EventBus,
    surface: Option<Box<dyn Surface>>,
    running: bool,
    hud_visible: bool,
    banner: Option<Timer>,
    hud: HudSnapshot,
    /// Events raised by commands between ticks.
    pending: Vec<SceneEvent>,
    frame_count: u64,
}

impl FrameDriver {
    pub fn new(
        waypoints: Arc<WaypointSet>,
        tuning: Tuning,
        device: DeviceClass,
        input: Box<dyn InputSource>,
        audio: AudioDirector,
        surface: Box<dyn Surface>,
    ) -> Result<Self, SceneError> {
        let navigator = Navigator::new(waypoints.clone(), tuning)?;
        let tracker = ProximityTracker::new(&tuning);
        let (width, height) = surface.size();
        let camera = CameraRig::new(device, &tuning, width, height);
        let hud = snapshot(
            navigator.state(),
            tracker.state(),
            &waypoints,
            &audio,
            false,
            false,
        );
        Ok(Self {
            waypoints,
            tuning,
            input,
            navigator,
            tracker,
            audio,
            camera,
            events: EventBus::new(EVENT_LOG_CAPACITY),
            surface: Some(surface),
            running: false,
            hud_visible: true,
            banner: None,
            hud,
            pending: Vec::new(),
            frame_count: 0,
        })
    }

    pub fn start(&mut self) {
        if !self.running {
            tracing::info!("Frame driver started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::info!("Frame driver stopped after {} frames", self.frame_count);
        }
        self.running = false;
    }

    /// Stop ticking, silence audio and give up the surface.
    pub fn teardown(&mut self) {
        self.stop();
        self.audio.teardown();
        if let Some(mut surface) = self.surface.take() {
            surface.release();
        }
        self.events.flush();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn surface_alive(&self) -> bool {
        self.surface.as_ref().is_some_and(|s| s.is_alive())
    }

    /// Run one frame with `dt` seconds of wall-clock time. Returns false
    /// when the tick was skipped.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.running || !self.surface_alive() {
            return false;
        }

        let intent = self.input.sample(self.navigator.state().mode());
        if intent.toggle_hud {
            self.toggle_hud();
        }

        let nav_events = self.navigator.update(&intent, dt);
        if !self.surface_alive() {
            return false;
        }

        let proximity = self
            .tracker
            .update(self.navigator.state(), &self.waypoints, &nav_events);
        if let Some(index) = proximity.settle_at {
            self.navigator.settle_at(index);
        }
        if !self.surface_alive() {
            return false;
        }

        self.camera.update(
            self.navigator.state(),
            &self.waypoints,
            intent.rotate_camera,
            &nav_events,
        );
        if !self.wants_pointer_capture() && self.input.pointer_captured() {
            self.input.set_pointer_captured(false);
        }

        let soundscape_event =
            self.audio
                .update(self.navigator.state(), self.tracker.state(), &self.waypoints);
        if !self.surface_alive() {
            return false;
        }

        if nav_events.contains(&SceneEvent::BarrelRoll) {
            self.banner = Some(Timer::new(self.tuning.barrel_roll_banner));
        } else if let Some(banner) = self.banner.as_mut() {
            banner.advance(dt);
            if banner.finished() {
                self.banner = None;
            }
        }

        self.events.tick(dt as f64);
        self.events.emit_all(self.pending.drain(..));
        self.events.emit_all(nav_events);
        self.events.emit_all(proximity.events);
        self.events.emit_all(soundscape_event);
        self.events.flush();

        self.hud = snapshot(
            self.navigator.state(),
            self.tracker.state(),
            &self.waypoints,
            &self.audio,
            self.banner.is_some(),
            self.input.pointer_captured(),
        );

        let nav = self.navigator.state();
        let frame = Frame {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            camera_position: self.camera.position,
            rocket_position: nav.position,
            rocket_orientation: nav.orientation,
            waypoints: &self.waypoints,
            hud: self.hud_visible.then_some(&self.hud),
        };
        match self.surface.as_mut() {
            Some(surface) if surface.is_alive() => surface.draw(&frame),
            _ => return false,
        }

        self.frame_count += 1;
        true
    }

    /// Only projection depends on the surface size; simulation is untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.resize(width, height);
        self.input.resize(width, height);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }
    }

    /// Layout class changed (viewport crossed a breakpoint).
    pub fn set_device(&mut self, device: DeviceClass) {
        self.camera.set_device(device);
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        self.input.handle_window_event(event);
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        self.input.handle_device_event(event);
    }

    // Commands from UI chrome.

    pub fn travel_to_waypoint(&mut self, index: usize) -> bool {
        self.navigator.travel_to(index)
    }

    pub fn travel_next(&mut self) -> bool {
        self.navigator.travel_next()
    }

    pub fn travel_previous(&mut self) -> bool {
        self.navigator.travel_previous()
    }

    pub fn stop_at_nearest(&mut self) -> bool {
        self.navigator.stop_at_nearest()
    }

    pub fn trigger_barrel_roll(&mut self) -> bool {
        let rolled = self.navigator.trigger_barrel_roll();
        if rolled {
            self.banner = Some(Timer::new(self.tuning.barrel_roll_banner));
        }
        rolled
    }

    pub fn toggle_mode(&mut self) -> Mode {
        let mode = self.navigator.toggle_mode();
        if mode == Mode::Tour {
            self.input.set_pointer_captured(false);
        }
        mode
    }

    pub fn set_boost(&mut self, held: bool) {
        self.input.set_boost(held);
    }

    pub fn set_look_delta(&mut self, dx: f32, dy: f32) {
        self.input.inject_look_delta(dx, dy);
    }

    pub fn set_joystick(&mut self, x: f32, y: f32) {
        self.input.set_joystick(x, y);
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.pending.extend(self.audio.set_enabled(enabled));
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.audio.set_volume(volume);
    }

    pub fn reset_to_start(&mut self) {
        self.navigator.reset_to_start();
        self.banner = None;
    }

    pub fn toggle_hud(&mut self) {
        self.hud_visible = !self.hud_visible;
    }

    pub fn set_hud_visible(&mut self, visible: bool) {
        self.hud_visible = visible;
    }

    pub fn hud_visible(&self) -> bool {
        self.hud_visible
    }

    /// Pointer capture is only wanted for mouse look in free roam.
    pub fn wants_pointer_capture(&self) -> bool {
        self.input.needs_pointer_capture() && self.navigator.state().mode() == Mode::FreeRoam
    }

    /// Report the platform's capture state. Grants outside free roam are refused.
    pub fn set_pointer_captured(&mut self, captured: bool) {
        self.input
            .set_pointer_captured(captured && self.wants_pointer_capture());
    }

    pub fn pointer_captured(&self) -> bool {
        self.input.pointer_captured()
    }

    pub fn hud(&self) -> &HudSnapshot {
        &self.hud
    }

    pub fn navigation(&self) -> &NavigationState {
        self.navigator.state()
    }

    pub fn proximity(&self) -> &ProximityState {
        self.tracker.state()
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn audio(&self) -> &AudioDirector {
        &self.audio
    }

    pub fn waypoints(&self) -> &WaypointSet {
        &self.waypoints
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

fn snapshot(
    nav: &NavigationState,
    proximity: &ProximityState,
    waypoints: &WaypointSet,
    audio: &AudioDirector,
    banner: bool,
    pointer_captured: bool,
) -> HudSnapshot {
    HudSnapshot {
        mode: nav.mode(),
        travel_state: nav.travel_state(),
        current_waypoint: nav.current_waypoint,
        current_waypoint_name: waypoints
            .get(nav.current_waypoint)
            .map(|wp| wp.name.clone())
            .unwrap_or_default(),
        selected_waypoint: proximity.selected_waypoint,
        sector_label: proximity.sector_label.clone(),
        speed: (nav.speed * 100.0).round() as u32,
        boost_active: nav.boost_active,
        path_progress_percent: (nav.path_progress() * 100.0).round() as u32,
        visited: proximity.visited.iter().copied().collect(),
        waypoint_count: waypoints.len(),
        nearest: proximity.nearest.as_ref().map(|n| NearestSnapshot {
            index: n.index,
            name: n.name.clone(),
            distance: n.distance,
            direction: n.direction.to_array(),
        }),
        show_indicator: proximity.show_indicator,
        barrel_roll_banner: banner,
        pointer_captured,
        audio_enabled: audio.enabled(),
        volume: audio.volume(),
        soundscape: audio.active(),
    }
}
