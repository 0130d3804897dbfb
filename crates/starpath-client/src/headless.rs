//! Off-screen runs: the frame driver ticks at a fixed step against a
//! surface that only counts frames, while an autopilot flies the tour.

use serde::Serialize;

use starpath_core::{ConfigError, TravelState};

use crate::audio::AudioDirector;
use crate::driver::{Frame, FrameDriver, HudSnapshot, Surface};
use crate::session::Session;

/// Fixed step used off-screen.
pub const HEADLESS_DT: f32 = 1.0 / 60.0;
/// Seconds spent orbiting a waypoint before the autopilot moves on.
pub const AUTOPILOT_DWELL: f32 = 2.0;
const HEADLESS_SIZE: (u32, u32) = (1280, 720);

pub struct HeadlessSurface {
    width: u32,
    height: u32,
    alive: bool,
    frames_drawn: u64,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alive: true,
            frames_drawn: 0,
        }
    }
}

impl Surface for HeadlessSurface {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn draw(&mut self, frame: &Frame<'_>) {
        self.frames_drawn += 1;
        tracing::trace!(
            "frame {} rocket at {:?}",
            self.frames_drawn,
            frame.rocket_position
        );
    }

    fn release(&mut self) {
        self.alive = false;
    }
}

/// Hops to the next waypoint once the rocket has orbited for `dwell` seconds.
pub struct Autopilot {
    dwell: f32,
    orbit_time: f32,
}

impl Autopilot {
    pub fn new(dwell: f32) -> Self {
        Self {
            dwell,
            orbit_time: 0.0,
        }
    }

    /// Returns the new target when a hop was started.
    pub fn step(&mut self, driver: &mut FrameDriver, dt: f32) -> Option<usize> {
        if driver.navigation().travel_state() != TravelState::Orbiting {
            self.orbit_time = 0.0;
            return None;
        }
        self.orbit_time += dt;
        if self.orbit_time < self.dwell {
            return None;
        }
        self.orbit_time = 0.0;
        if driver.travel_next() {
            driver.navigation().target_waypoint()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadlessSummary {
    pub frames: u64,
    pub seconds: f64,
    pub hops: usize,
    pub hud: HudSnapshot,
}

/// Tick `driver` for `frames` frames, logging a HUD snapshot once a second.
pub fn run_frames(driver: &mut FrameDriver, frames: u64, autopilot: &mut Autopilot) -> HeadlessSummary {
    let log_every = (1.0 / HEADLESS_DT).round() as u64;
    let mut hops = 0;
    for frame in 0..frames {
        if let Some(target) = autopilot.step(driver, HEADLESS_DT) {
            tracing::debug!("Autopilot heading for waypoint {}", target);
            hops += 1;
        }
        if !driver.tick(HEADLESS_DT) {
            tracing::warn!("Surface gone after {} frames, stopping", frame);
            break;
        }
        if (frame + 1) % log_every == 0 {
            match serde_json::to_string(driver.hud()) {
                Ok(json) => tracing::info!("hud {}", json),
                Err(e) => tracing::warn!("Failed to serialize HUD: {}", e),
            }
        }
    }
    HeadlessSummary {
        frames: driver.frame_count(),
        seconds: driver.events().total_time(),
        hops,
        hud: driver.hud().clone(),
    }
}

/// Full headless session: build, run, tear down.
pub fn run_headless(session: &Session) -> Result<HeadlessSummary, ConfigError> {
    let (width, height) = HEADLESS_SIZE;
    let device = session.args.device.resolve(width as f64);
    let mut driver = session.build_driver(
        device,
        Box::new(HeadlessSurface::new(width, height)),
        AudioDirector::with_kira(),
    )?;
    tracing::info!("Running headless for {} frames", session.args.frames);
    let mut autopilot = Autopilot::new(AUTOPILOT_DWELL);
    let summary = run_frames(&mut driver, session.args.frames, &mut autopilot);
    driver.teardown();
    tracing::info!(
        "Headless run finished: {} frames, {} hops, visited {:?}",
        summary.frames,
        summary.hops,
        summary.hud.visited
    );
    Ok(summary)
}
