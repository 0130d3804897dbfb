//! Platform side of Starpath: winit input sources, procedural soundscapes
//! played through kira, the per-frame driver and the window/headless
//! front ends.

pub mod audio;
pub mod audio_gen;
pub mod cli;
pub mod driver;
pub mod engine;
pub mod headless;
pub mod input;
pub mod session;

pub use audio::{AudioDirector, AudioError};
pub use cli::{CliArgs, OutputMode};
pub use driver::{Frame, FrameDriver, HudSnapshot, Surface};
pub use session::Session;
