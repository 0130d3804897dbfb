use glam::{Mat4, Vec3};

use crate::config::Tuning;
use crate::device::DeviceClass;
use crate::events::SceneEvent;
use crate::navigation::{Mode, NavigationState, TravelState};
use crate::waypoint::WaypointSet;

/// Third-person camera that trails the rocket. Position is smoothed toward
/// a per-state target every frame; the look point is applied directly.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub position: Vec3,
    pub look_at: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
    /// Horizontal chase angle around the rocket, radians.
    chase_angle: f32,
    device: DeviceClass,
    orbit_lerp: f32,
    chase_lerp: f32,
    rotate_speed: f32,
}

impl CameraRig {
    pub fn new(device: DeviceClass, tuning: &Tuning, width: u32, height: u32) -> Self {
        Self {
            position: Vec3::new(0.0, 50.0, 100.0),
            look_at: Vec3::ZERO,
            fov_degrees: 45.0,
            near: 0.1,
            far: 2000.0,
            aspect: aspect_ratio(width, height),
            chase_angle: 0.0,
            device,
            orbit_lerp: tuning.orbit_camera_lerp,
            chase_lerp: tuning.chase_camera_lerp,
            rotate_speed: tuning.chase_rotate_speed,
        }
    }

    pub fn set_device(&mut self, device: DeviceClass) {
        self.device = device;
    }

    pub fn chase_angle(&self) -> f32 {
        self.chase_angle
    }

    /// Only projection depends on the surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn update(
        &mut self,
        nav: &NavigationState,
        waypoints: &WaypointSet,
        rotate: f32,
        events: &[SceneEvent],
    ) {
        let recentre = events.iter().any(|e| {
            matches!(
                e,
                SceneEvent::Reset | SceneEvent::ModeChanged { mode: Mode::Tour }
            )
        });
        if recentre {
            self.chase_angle = 0.0;
        }

        let touch = self.device.is_touch();
        let rocket = nav.position;

        if nav.mode() == Mode::FreeRoam {
            let forward = nav.look_direction();
            let mut offset = forward * -40.0;
            offset.y += 10.0;
            self.position = self.position.lerp(rocket + offset, self.chase_lerp);
            self.look_at = rocket + forward * 20.0;
            return;
        }

        let orbiting = nav.travel_state() == TravelState::Orbiting;
        if let (true, Some(planet)) = (orbiting, waypoints.get(nav.current_waypoint)) {
            let distance = if touch { 80.0 } else { 60.0 };
            let angle = (nav.clock * 0.1) as f32;
            let target = Vec3::new(
                planet.position.x + angle.cos() * distance,
                planet.position.y + 20.0,
                planet.position.z + angle.sin() * distance,
            );
            self.position = self.position.lerp(target, self.orbit_lerp);
            self.look_at = Vec3::new(
                (planet.position.x + rocket.x) / 2.0,
                planet.position.y,
                (planet.position.z + rocket.z) / 2.0,
            );
            return;
        }

        // Keyboard-only: touch layouts follow at a fixed angle.
        if !touch {
            self.chase_angle += rotate * self.rotate_speed;
        }
        let (distance, height) = if touch { (40.0, 15.0) } else { (30.0, 10.0) };
        let target = Vec3::new(
            rocket.x - self.chase_angle.sin() * distance,
            rocket.y + height,
            rocket.z - self.chase_angle.cos() * distance,
        );
        self.position = self.position.lerp(target, self.chase_lerp);
        self.look_at = rocket;
    }

    pub fn view_matrix(&self) -> Mat4 {
        let dir = (self.look_at - self.position).normalize_or_zero();
        if dir == Vec3::ZERO || dir.cross(Vec3::Y).length_squared() < 1e-8 {
            // Degenerate look: keep a level view toward -Z.
            return Mat4::look_to_rh(self.position, Vec3::NEG_Z, Vec3::Y);
        }
        Mat4::look_to_rh(self.position, dir, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
