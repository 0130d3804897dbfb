use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::window::{CursorGrabMode, Window, WindowId};

use starpath_core::DeviceClass;

use crate::audio::AudioDirector;
use crate::driver::{Frame, FrameDriver, Surface};
use crate::session::Session;

const WINDOW_TITLE: &str = "Starpath";
/// Longest step fed to the simulation, so a stalled window does not jump.
const MAX_FRAME_DT: f32 = 0.1;

/// Presents frames in a winit window. The title bar carries the HUD line.
struct WindowSurface {
    window: Arc<Window>,
    alive: bool,
    title: String,
}

impl WindowSurface {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            alive: true,
            title: WINDOW_TITLE.to_string(),
        }
    }
}

impl Surface for WindowSurface {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width.max(1), size.height.max(1))
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn draw(&mut self, frame: &Frame<'_>) {
        let title = match frame.hud {
            Some(hud) => format!("{} | {}", WINDOW_TITLE, hud.status_line()),
            None => WINDOW_TITLE.to_string(),
        };
        if title != self.title {
            self.window.set_title(&title);
            self.title = title;
        }
    }

    fn release(&mut self) {
        self.alive = false;
    }
}

pub struct Engine {
    session: Session,
    window: Option<Arc<Window>>,
    driver: Option<FrameDriver>,
    device: DeviceClass,
    pointer_grabbed: bool,
    last_frame_time: Option<instant::Instant>,
}

impl Engine {
    pub fn new(session: Session) -> Self {
        let device = session.args.device.resolve(1280.0);
        Self {
            session,
            window: None,
            driver: None,
            device,
            pointer_grabbed: false,
            last_frame_time: None,
        }
    }

    fn logical_width(window: &Window) -> f64 {
        window
            .inner_size()
            .to_logical::<f64>(window.scale_factor())
            .width
    }

    fn capture_pointer(&mut self) {
        let (Some(window), Some(driver)) = (&self.window, &mut self.driver) else {
            return;
        };
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => {
                window.set_cursor_visible(false);
                driver.set_pointer_captured(true);
                self.pointer_grabbed = true;
                tracing::info!("Pointer captured for free-roam look");
            }
            Err(e) => tracing::warn!("Pointer capture denied: {}", e),
        }
    }

    fn release_pointer(&mut self) {
        if let Some(window) = &self.window {
            if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
                tracing::debug!("Cursor release failed: {}", e);
            }
            window.set_cursor_visible(true);
        }
        if let Some(driver) = &mut self.driver {
            driver.set_pointer_captured(false);
        }
        self.pointer_grabbed = false;
    }

    fn redraw(&mut self) {
        let now = instant::Instant::now();
        let dt = match self.last_frame_time {
            Some(last) => now.duration_since(last).as_secs_f32().min(MAX_FRAME_DT),
            None => 0.0,
        };
        self.last_frame_time = Some(now);

        let Some(driver) = &mut self.driver else {
            return;
        };
        driver.tick(dt);
        // Escape or a mode switch may have given up look mode.
        if self.pointer_grabbed && !driver.wants_pointer_capture() {
            self.release_pointer();
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for Engine {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        self.device = self.session.args.device.resolve(Self::logical_width(&window));
        let surface = Box::new(WindowSurface::new(Arc::clone(&window)));
        match self
            .session
            .build_driver(self.device, surface, AudioDirector::with_kira())
        {
            Ok(driver) => self.driver = Some(driver),
            Err(e) => {
                tracing::error!("Failed to start scene: {}", e);
                event_loop.exit();
                return;
            }
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(driver) = &mut self.driver {
            driver.handle_window_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                if let Some(driver) = &mut self.driver {
                    driver.teardown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width == 0 || new_size.height == 0 {
                    return;
                }
                let width = self.window.as_deref().map(Self::logical_width);
                if let Some(driver) = &mut self.driver {
                    driver.resize(new_size.width, new_size.height);
                    if let Some(width) = width {
                        let device = self.session.args.device.resolve(width);
                        if device != self.device {
                            tracing::info!("Layout changed to {:?}", device);
                            self.device = device;
                            driver.set_device(device);
                        }
                    }
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                ..
            } => {
                let wants = self
                    .driver
                    .as_ref()
                    .is_some_and(|d| d.wants_pointer_capture() && !d.pointer_captured());
                if wants {
                    self.capture_pointer();
                }
            }
            WindowEvent::Focused(false) => {
                if self.pointer_grabbed {
                    tracing::info!("Focus lost, releasing pointer");
                    self.release_pointer();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        if let Some(driver) = &mut self.driver {
            driver.handle_device_event(&event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(driver) = &mut self.driver {
            driver.teardown();
        }
    }
}
