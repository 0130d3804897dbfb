use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use winit::event::{DeviceEvent, ElementState, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use starpath_core::{DeviceClass, Intent, Mode};

/// Joystick base radius in pixels; the knob saturates at this distance.
pub const JOYSTICK_RADIUS: f32 = 64.0;
/// Distance of the joystick center from the bottom-left corner.
pub const JOYSTICK_INSET: f32 = 72.0;
pub const BOOST_BUTTON_RADIUS: f32 = 48.0;
/// Joystick y beyond which Tour mode requests the next/previous waypoint.
pub const JOYSTICK_TRAVEL_THRESHOLD: f32 = 0.5;

/// Semantic action names mapped to key names via bindings.yaml.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputBindings {
    #[serde(default)]
    pub actions: HashMap<String, Vec<String>>,
}

impl Default for InputBindings {
    fn default() -> Self {
        let mut actions = HashMap::new();
        let mut bind = |action: &str, keys: &[&str]| {
            actions.insert(
                action.to_string(),
                keys.iter().map(|k| k.to_string()).collect(),
            );
        };
        bind("forward", &["W", "ArrowUp"]);
        bind("backward", &["S", "ArrowDown"]);
        bind("left", &["A", "ArrowLeft"]);
        bind("right", &["D", "ArrowRight"]);
        bind("up", &["E"]);
        bind("down", &["Q"]);
        bind("boost", &["ShiftLeft", "ShiftRight"]);
        bind("barrel_roll", &["E"]);
        bind("stop", &["Space"]);
        bind("toggle_hud", &["H"]);
        bind("toggle_mode", &["F"]);
        bind("exit", &["Escape"]);
        Self { actions }
    }
}

/// Load `input/bindings.yaml` under `root`, with defaults as fallback.
/// Actions missing from the file keep their default keys.
pub fn load_bindings(root: &Path) -> InputBindings {
    let path = root.join("input/bindings.yaml");
    let mut bindings = InputBindings::default();
    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_yaml::from_str::<InputBindings>(&contents) {
                Ok(custom) => {
                    tracing::info!("Loaded input bindings from {:?}", path);
                    bindings.actions.extend(custom.actions);
                    return bindings;
                }
                Err(e) => tracing::warn!("Failed to parse bindings.yaml: {}", e),
            },
            Err(e) => tracing::warn!("Failed to read bindings.yaml: {}", e),
        }
    }
    tracing::info!("Using default input bindings");
    bindings
}

fn key_name_to_code(name: &str) -> Option<KeyCode> {
    match name {
        "A" => Some(KeyCode::KeyA),
        "B" => Some(KeyCode::KeyB),
        "C" => Some(KeyCode::KeyC),
        "D" => Some(KeyCode::KeyD),
        "E" => Some(KeyCode::KeyE),
        "F" => Some(KeyCode::KeyF),
        "G" => Some(KeyCode::KeyG),
        "H" => Some(KeyCode::KeyH),
        "I" => Some(KeyCode::KeyI),
        "J" => Some(KeyCode::KeyJ),
        "K" => Some(KeyCode::KeyK),
        "L" => Some(KeyCode::KeyL),
        "M" => Some(KeyCode::KeyM),
        "N" => Some(KeyCode::KeyN),
        "O" => Some(KeyCode::KeyO),
        "P" => Some(KeyCode::KeyP),
        "Q" => Some(KeyCode::KeyQ),
        "R" => Some(KeyCode::KeyR),
        "S" => Some(KeyCode::KeyS),
        "T" => Some(KeyCode::KeyT),
        "U" => Some(KeyCode::KeyU),
        "V" => Some(KeyCode::KeyV),
        "W" => Some(KeyCode::KeyW),
        "X" => Some(KeyCode::KeyX),
        "Y" => Some(KeyCode::KeyY),
        "Z" => Some(KeyCode::KeyZ),
        "Space" => Some(KeyCode::Space),
        "ShiftLeft" => Some(KeyCode::ShiftLeft),
        "ShiftRight" => Some(KeyCode::ShiftRight),
        "ControlLeft" => Some(KeyCode::ControlLeft),
        "ControlRight" => Some(KeyCode::ControlRight),
        "Escape" => Some(KeyCode::Escape),
        "Enter" => Some(KeyCode::Enter),
        "Tab" => Some(KeyCode::Tab),
        "ArrowUp" => Some(KeyCode::ArrowUp),
        "ArrowDown" => Some(KeyCode::ArrowDown),
        "ArrowLeft" => Some(KeyCode::ArrowLeft),
        "ArrowRight" => Some(KeyCode::ArrowRight),
        _ => None,
    }
}

/// One family of input devices, producing a per-frame [`Intent`].
///
/// Platform events mutate the source as they arrive; `sample` consumes
/// whatever accumulated since the previous frame.
pub trait InputSource {
    fn handle_window_event(&mut self, event: &WindowEvent);
    fn handle_device_event(&mut self, event: &DeviceEvent);

    /// Build this frame's intent and clear edge-triggered state.
    fn sample(&mut self, mode: Mode) -> Intent;

    fn set_pointer_captured(&mut self, captured: bool);
    fn pointer_captured(&self) -> bool;
    /// Whether look input needs exclusive pointer capture first.
    fn needs_pointer_capture(&self) -> bool;

    /// Look movement in pixels, as if the pointer had moved.
    fn inject_look_delta(&mut self, dx: f32, dy: f32);
    fn set_joystick(&mut self, x: f32, y: f32);
    fn set_boost(&mut self, held: bool);
    fn resize(&mut self, width: u32, height: u32);
    /// Drop everything held, e.g. after focus loss.
    fn reset(&mut self);
}

/// Pick the input family for a device class. Touch layouts never read
/// the keyboard, desktop never reads the joystick.
pub fn input_source_for(
    device: DeviceClass,
    bindings: InputBindings,
    look_sensitivity: f32,
    width: u32,
    height: u32,
) -> Box<dyn InputSource> {
    if device.is_touch() {
        tracing::info!("Using touch input ({:?})", device);
        Box::new(TouchSource::new(look_sensitivity, width, height))
    } else {
        tracing::info!("Using keyboard and mouse input");
        Box::new(KeyboardMouseSource::new(bindings, look_sensitivity))
    }
}

/// Desktop input: held keys plus relative mouse motion.
pub struct KeyboardMouseSource {
    bindings: InputBindings,
    keys_held: HashSet<KeyCode>,
    keys_just_pressed: HashSet<KeyCode>,
    /// Mouse motion accumulated since the last sample.
    mouse_delta: Vec2,
    pointer_captured: bool,
    boost_override: bool,
    sensitivity: f32,
}

impl KeyboardMouseSource {
    pub fn new(bindings: InputBindings, sensitivity: f32) -> Self {
        Self {
            bindings,
            keys_held: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            mouse_delta: Vec2::ZERO,
            pointer_captured: false,
            boost_override: false,
            sensitivity,
        }
    }

    fn key_down(&mut self, code: KeyCode) {
        if self.keys_held.insert(code) {
            self.keys_just_pressed.insert(code);
        }
    }

    fn key_up(&mut self, code: KeyCode) {
        self.keys_held.remove(&code);
    }

    /// Press a key by binding name (headless autopilot and tests).
    pub fn inject_key_press(&mut self, key_name: &str) {
        if let Some(code) = key_name_to_code(key_name) {
            self.key_down(code);
        }
    }

    pub fn inject_key_release(&mut self, key_name: &str) {
        if let Some(code) = key_name_to_code(key_name) {
            self.key_up(code);
        }
    }

    fn codes<'a>(&'a self, action: &str) -> impl Iterator<Item = KeyCode> + 'a {
        self.bindings
            .actions
            .get(action)
            .into_iter()
            .flatten()
            .filter_map(|name| key_name_to_code(name))
    }

    pub fn pressed(&self, action: &str) -> bool {
        self.codes(action).any(|code| self.keys_held.contains(&code))
    }

    pub fn just_pressed(&self, action: &str) -> bool {
        self.codes(action)
            .any(|code| self.keys_just_pressed.contains(&code))
    }

    fn axis(&self, positive: &str, negative: &str, pos_scale: f32, neg_scale: f32) -> f32 {
        let mut value = 0.0;
        if self.pressed(positive) {
            value += pos_scale;
        }
        if self.pressed(negative) {
            value -= neg_scale;
        }
        value
    }
}

impl InputSource for KeyboardMouseSource {
    fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.key_down(code),
                        ElementState::Released => self.key_up(code),
                    }
                }
            }
            WindowEvent::Focused(false) => self.reset(),
            _ => {}
        }
    }

    fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.mouse_delta.x += delta.0 as f32;
            self.mouse_delta.y += delta.1 as f32;
        }
    }

    fn sample(&mut self, mode: Mode) -> Intent {
        let mut intent = Intent {
            boost: self.pressed("boost") || self.boost_override,
            toggle_hud: self.just_pressed("toggle_hud"),
            toggle_mode: self.just_pressed("toggle_mode"),
            ..Default::default()
        };

        match mode {
            Mode::Tour => {
                intent.travel_next = self.just_pressed("forward");
                intent.travel_previous = self.just_pressed("backward");
                intent.rotate_camera = self.axis("left", "right", 1.0, 1.0);
                intent.barrel_roll = self.just_pressed("barrel_roll");
                intent.stop = self.just_pressed("stop");
            }
            Mode::FreeRoam => {
                intent.forward = self.axis("forward", "backward", 1.0, 0.7);
                intent.strafe = self.axis("right", "left", 0.5, 0.5);
                intent.vertical = self.axis("up", "down", 0.5, 0.5);
                intent.exit_free_roam = self.just_pressed("exit");
                // Look input only counts while the pointer is ours.
                if self.pointer_captured {
                    intent.look_delta_yaw = -self.mouse_delta.x * self.sensitivity;
                    intent.look_delta_pitch = -self.mouse_delta.y * self.sensitivity;
                }
            }
        }

        self.keys_just_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        intent
    }

    fn set_pointer_captured(&mut self, captured: bool) {
        if self.pointer_captured != captured {
            tracing::debug!("Pointer capture {}", if captured { "acquired" } else { "released" });
        }
        self.pointer_captured = captured;
        self.mouse_delta = Vec2::ZERO;
    }

    fn pointer_captured(&self) -> bool {
        self.pointer_captured
    }

    fn needs_pointer_capture(&self) -> bool {
        true
    }

    fn inject_look_delta(&mut self, dx: f32, dy: f32) {
        self.mouse_delta.x += dx;
        self.mouse_delta.y += dy;
    }

    fn set_joystick(&mut self, _x: f32, _y: f32) {}

    fn set_boost(&mut self, held: bool) {
        self.boost_override = held;
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn reset(&mut self) {
        self.keys_held.clear();
        self.keys_just_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.boost_override = false;
    }
}

/// Offset from the joystick center to a normalized stick vector:
/// magnitude clamped to 1, y flipped so pushing up is positive.
pub fn joystick_vector(offset: Vec2, radius: f32) -> Vec2 {
    if radius <= 0.0 {
        return Vec2::ZERO;
    }
    let v = Vec2::new(offset.x, -offset.y) / radius;
    v.clamp_length_max(1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TouchRole {
    Joystick,
    Boost,
    Look { last: Vec2 },
}

/// Mobile and tablet input: an on-screen joystick bottom-left, a boost
/// button bottom-right, and drag-to-look anywhere else.
pub struct TouchSource {
    width: f32,
    height: f32,
    joystick: Vec2,
    boost: bool,
    boost_override: bool,
    look_delta: Vec2,
    touches: HashMap<u64, TouchRole>,
    sensitivity: f32,
    /// Stick push direction at the last sample (+1 up, -1 down, 0 neutral).
    last_push: i8,
}

impl TouchSource {
    pub fn new(sensitivity: f32, width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
            joystick: Vec2::ZERO,
            boost: false,
            boost_override: false,
            look_delta: Vec2::ZERO,
            touches: HashMap::new(),
            sensitivity,
            last_push: 0,
        }
    }

    pub fn joystick_center(&self) -> Vec2 {
        Vec2::new(JOYSTICK_INSET, self.height - JOYSTICK_INSET)
    }

    pub fn boost_center(&self) -> Vec2 {
        Vec2::new(self.width - JOYSTICK_INSET, self.height - JOYSTICK_INSET)
    }

    pub fn joystick(&self) -> Vec2 {
        self.joystick
    }

    pub fn touch_started(&mut self, id: u64, at: Vec2) {
        let role = if at.distance(self.joystick_center()) <= JOYSTICK_RADIUS {
            self.joystick = joystick_vector(at - self.joystick_center(), JOYSTICK_RADIUS);
            TouchRole::Joystick
        } else if at.distance(self.boost_center()) <= BOOST_BUTTON_RADIUS {
            self.boost = true;
            TouchRole::Boost
        } else {
            TouchRole::Look { last: at }
        };
        self.touches.insert(id, role);
    }

    pub fn touch_moved(&mut self, id: u64, at: Vec2) {
        let center = self.joystick_center();
        match self.touches.get_mut(&id) {
            Some(TouchRole::Joystick) => {
                self.joystick = joystick_vector(at - center, JOYSTICK_RADIUS);
            }
            Some(TouchRole::Look { last }) => {
                self.look_delta += at - *last;
                *last = at;
            }
            Some(TouchRole::Boost) | None => {}
        }
    }

    pub fn touch_ended(&mut self, id: u64) {
        match self.touches.remove(&id) {
            Some(TouchRole::Joystick) => self.joystick = Vec2::ZERO,
            Some(TouchRole::Boost) => self.boost = false,
            _ => {}
        }
    }
}

impl InputSource for TouchSource {
    fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Touch(touch) => {
                let at = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started => self.touch_started(touch.id, at),
                    TouchPhase::Moved => self.touch_moved(touch.id, at),
                    TouchPhase::Ended | TouchPhase::Cancelled => self.touch_ended(touch.id),
                }
            }
            WindowEvent::Focused(false) => self.reset(),
            _ => {}
        }
    }

    fn handle_device_event(&mut self, _event: &DeviceEvent) {}

    fn sample(&mut self, mode: Mode) -> Intent {
        let mut intent = Intent {
            boost: self.boost || self.boost_override,
            ..Default::default()
        };
        let push = if self.joystick.y > JOYSTICK_TRAVEL_THRESHOLD {
            1
        } else if self.joystick.y < -JOYSTICK_TRAVEL_THRESHOLD {
            -1
        } else {
            0
        };
        // Travel fires once per push; the stick must return before repeating.
        let fresh_push = push != self.last_push;
        self.last_push = push;
        match mode {
            Mode::Tour => {
                intent.travel_next = fresh_push && push == 1;
                intent.travel_previous = fresh_push && push == -1;
            }
            Mode::FreeRoam => {
                intent.forward = self.joystick.y;
                intent.strafe = self.joystick.x;
                intent.look_delta_yaw = -self.look_delta.x * self.sensitivity;
                intent.look_delta_pitch = -self.look_delta.y * self.sensitivity;
            }
        }
        self.look_delta = Vec2::ZERO;
        intent
    }

    fn set_pointer_captured(&mut self, _captured: bool) {}

    fn pointer_captured(&self) -> bool {
        false
    }

    fn needs_pointer_capture(&self) -> bool {
        false
    }

    fn inject_look_delta(&mut self, dx: f32, dy: f32) {
        self.look_delta += Vec2::new(dx, dy);
    }

    fn set_joystick(&mut self, x: f32, y: f32) {
        self.joystick = Vec2::new(x, y).clamp_length_max(1.0);
    }

    fn set_boost(&mut self, held: bool) {
        self.boost_override = held;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
    }

    fn reset(&mut self) {
        self.touches.clear();
        self.joystick = Vec2::ZERO;
        self.boost = false;
        self.boost_override = false;
        self.look_delta = Vec2::ZERO;
        self.last_push = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard() -> KeyboardMouseSource {
        KeyboardMouseSource::new(InputBindings::default(), 0.002)
    }

    #[test]
    fn test_key_name_mapping() {
        assert_eq!(key_name_to_code("W"), Some(KeyCode::KeyW));
        assert_eq!(key_name_to_code("Space"), Some(KeyCode::Space));
        assert_eq!(key_name_to_code("ShiftLeft"), Some(KeyCode::ShiftLeft));
        assert_eq!(key_name_to_code("Invalid"), None);
    }

    #[test]
    fn test_tour_keys_are_edge_triggered() {
        let mut input = keyboard();
        input.inject_key_press("W");
        let intent = input.sample(Mode::Tour);
        assert!(intent.travel_next);
        assert_eq!(intent.forward, 0.0);
        // Still held, but no new press.
        let intent = input.sample(Mode::Tour);
        assert!(!intent.travel_next);
    }

    #[test]
    fn test_tour_rotate_and_boost() {
        let mut input = keyboard();
        input.inject_key_press("A");
        input.inject_key_press("ShiftLeft");
        let intent = input.sample(Mode::Tour);
        assert_eq!(intent.rotate_camera, 1.0);
        assert!(intent.boost);
        input.inject_key_release("A");
        input.inject_key_press("D");
        assert_eq!(input.sample(Mode::Tour).rotate_camera, -1.0);
    }

    #[test]
    fn test_free_roam_axes() {
        let mut input = keyboard();
        input.inject_key_press("S");
        input.inject_key_press("A");
        input.inject_key_press("E");
        let intent = input.sample(Mode::FreeRoam);
        assert!((intent.forward + 0.7).abs() < 1e-6);
        assert!((intent.strafe + 0.5).abs() < 1e-6);
        assert!((intent.vertical - 0.5).abs() < 1e-6);
        assert!(!intent.barrel_roll);
    }

    #[test]
    fn test_mouse_look_requires_capture() {
        let mut input = keyboard();
        input.inject_look_delta(100.0, 50.0);
        let intent = input.sample(Mode::FreeRoam);
        assert_eq!(intent.look_delta_yaw, 0.0);

        input.set_pointer_captured(true);
        input.inject_look_delta(100.0, 50.0);
        let intent = input.sample(Mode::FreeRoam);
        assert!((intent.look_delta_yaw + 0.2).abs() < 1e-6);
        assert!((intent.look_delta_pitch + 0.1).abs() < 1e-6);

        // Not consumed in Tour mode either.
        input.inject_look_delta(100.0, 0.0);
        assert_eq!(input.sample(Mode::Tour).look_delta_yaw, 0.0);
    }

    #[test]
    fn test_reset_releases_keys() {
        let mut input = keyboard();
        input.inject_key_press("W");
        input.reset();
        assert_eq!(input.sample(Mode::FreeRoam).forward, 0.0);
    }

    #[test]
    fn test_joystick_vector() {
        let v = joystick_vector(Vec2::new(0.0, -32.0), 64.0);
        assert!((v - Vec2::new(0.0, 0.5)).length() < 1e-6);
        let v = joystick_vector(Vec2::new(300.0, 400.0), 64.0);
        assert!((v.length() - 1.0).abs() < 1e-5);
        assert!(v.y < 0.0);
    }

    #[test]
    fn test_touch_joystick_drives_free_roam() {
        let mut touch = TouchSource::new(0.002, 400, 800);
        let center = touch.joystick_center();
        touch.touch_started(1, center);
        touch.touch_moved(1, center + Vec2::new(0.0, -64.0));
        let intent = touch.sample(Mode::FreeRoam);
        assert!((intent.forward - 1.0).abs() < 1e-6);
        touch.touch_ended(1);
        assert_eq!(touch.sample(Mode::FreeRoam).forward, 0.0);
    }

    #[test]
    fn test_touch_joystick_requests_travel_in_tour() {
        let mut touch = TouchSource::new(0.002, 400, 800);
        touch.set_joystick(0.0, 0.8);
        assert!(touch.sample(Mode::Tour).travel_next);
        touch.set_joystick(0.0, -0.6);
        assert!(touch.sample(Mode::Tour).travel_previous);
        touch.set_joystick(0.0, 0.4);
        let intent = touch.sample(Mode::Tour);
        assert!(!intent.travel_next && !intent.travel_previous);
    }

    #[test]
    fn test_held_joystick_requests_travel_once() {
        let mut touch = TouchSource::new(0.002, 400, 800);
        touch.set_joystick(0.0, 0.9);
        assert!(touch.sample(Mode::Tour).travel_next);
        for _ in 0..300 {
            assert!(!touch.sample(Mode::Tour).travel_next);
        }
        touch.set_joystick(0.0, 0.0);
        assert!(!touch.sample(Mode::Tour).travel_next);
        touch.set_joystick(0.0, 0.9);
        assert!(touch.sample(Mode::Tour).travel_next);
    }

    #[test]
    fn test_stick_held_through_mode_switch_does_not_travel() {
        let mut touch = TouchSource::new(0.002, 400, 800);
        touch.set_joystick(0.0, 1.0);
        assert_eq!(touch.sample(Mode::FreeRoam).forward, 1.0);
        assert!(!touch.sample(Mode::Tour).travel_next);
    }

    #[test]
    fn test_touch_boost_button_and_look() {
        let mut touch = TouchSource::new(0.002, 400, 800);
        touch.touch_started(7, touch.boost_center());
        touch.touch_started(8, Vec2::new(200.0, 200.0));
        touch.touch_moved(8, Vec2::new(250.0, 200.0));
        let intent = touch.sample(Mode::FreeRoam);
        assert!(intent.boost);
        assert!((intent.look_delta_yaw + 0.1).abs() < 1e-6);
        touch.touch_ended(7);
        assert!(!touch.sample(Mode::FreeRoam).boost);
    }

    #[test]
    fn test_set_joystick_clamps() {
        let mut touch = TouchSource::new(0.002, 400, 800);
        touch.set_joystick(3.0, 4.0);
        assert!((touch.joystick().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_bindings_override_merges_with_defaults() {
        let custom: InputBindings =
            serde_yaml::from_str("actions:\n  stop: [Enter]\n").unwrap();
        let mut bindings = InputBindings::default();
        bindings.actions.extend(custom.actions);
        let mut input = KeyboardMouseSource::new(bindings, 0.002);
        input.inject_key_press("Enter");
        assert!(input.sample(Mode::Tour).stop);
        input.inject_key_press("W");
        assert!(input.sample(Mode::Tour).travel_next);
    }
}
