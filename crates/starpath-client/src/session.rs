//! Startup wiring shared by the window and headless front ends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use starpath_core::config::{find_config, load_config};
use starpath_core::{ConfigError, DeviceClass, SceneConfig};

use crate::audio::AudioDirector;
use crate::cli::CliArgs;
use crate::driver::{FrameDriver, Surface};
use crate::input::{input_source_for, load_bindings};

/// A resolved scene configuration plus the CLI options it runs under.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: SceneConfig,
    /// Directory the config came from; bindings are looked up here.
    pub root: PathBuf,
    pub args: CliArgs,
}

impl Session {
    /// Use `--config` when given, otherwise search upward from `cwd`.
    /// A missing file falls back to the built-in tour; a broken one is an error.
    pub fn resolve(args: CliArgs, cwd: &Path) -> Result<Self, ConfigError> {
        let path = match &args.config {
            Some(path) => Some(path.clone()),
            None => find_config(cwd),
        };
        let (config, root) = match path {
            Some(path) => {
                let config = load_config(&path)?;
                let root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| cwd.to_path_buf());
                (config, root)
            }
            None => {
                tracing::info!("No starpath.yaml found, using the built-in tour");
                (SceneConfig::default(), cwd.to_path_buf())
            }
        };
        Ok(Self { config, root, args })
    }

    pub fn sound_enabled(&self) -> bool {
        self.args.sound || self.config.audio.enabled
    }

    pub fn volume(&self) -> u8 {
        self.args.volume.unwrap_or(self.config.audio.volume)
    }

    /// Build a running driver for `surface`.
    pub fn build_driver(
        &self,
        device: DeviceClass,
        surface: Box<dyn Surface>,
        mut audio: AudioDirector,
    ) -> Result<FrameDriver, ConfigError> {
        let waypoints = Arc::new(self.config.waypoint_set()?);
        let tuning = self.config.tuning;
        let (width, height) = surface.size();
        let input = input_source_for(
            device,
            load_bindings(&self.root),
            tuning.look_sensitivity,
            width,
            height,
        );

        audio.set_volume(self.volume());
        let mut driver = FrameDriver::new(waypoints, tuning, device, input, audio, surface)?;
        if self.sound_enabled() {
            driver.set_audio_enabled(true);
        }
        driver.set_hud_visible(self.args.hud);
        if let Some(path) = &self.args.event_log {
            driver.events_mut().enable_file_logging(path.clone());
        }
        tracing::info!(
            "Scene '{}' ready: {} waypoints, {:?} layout",
            self.config.name,
            driver.waypoints().len(),
            device
        );
        driver.start();
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::recording_director;
    use crate::headless::HeadlessSurface;
    use clap::Parser;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("starpath-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_config_uses_builtin_tour() {
        let dir = temp_dir("missing");
        let session = Session::resolve(CliArgs::parse_from(["starpath"]), &dir).unwrap();
        assert_eq!(session.config.waypoints.len(), 8);
        assert_eq!(session.root, dir);
    }

    #[test]
    fn test_config_found_upward() {
        let dir = temp_dir("upward");
        std::fs::write(dir.join("starpath.yaml"), "name: Test Tour\n").unwrap();
        let nested = dir.join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let session = Session::resolve(CliArgs::parse_from(["starpath"]), &nested).unwrap();
        assert_eq!(session.config.name, "Test Tour");
        assert_eq!(session.root, dir);
    }

    #[test]
    fn test_invalid_scene_is_an_error() {
        let dir = temp_dir("invalid");
        let path = dir.join("broken.yaml");
        std::fs::write(
            &path,
            "waypoints:\n  - name: ONLY\n    position: [0, 0, 0]\n    radius: 5\n",
        )
        .unwrap();
        let args = CliArgs::parse_from(["starpath", "--config", path.to_str().unwrap()]);
        assert!(matches!(
            Session::resolve(args, &dir),
            Err(ConfigError::Scene(_))
        ));
    }

    #[test]
    fn test_cli_overrides_audio_settings() {
        let dir = temp_dir("audio");
        let args = CliArgs::parse_from(["starpath", "--sound", "--volume", "30", "--hud", "false"]);
        let session = Session::resolve(args, &dir).unwrap();
        assert!(session.sound_enabled());
        assert_eq!(session.volume(), 30);

        let (audio, _rec) = recording_director();
        let driver = session
            .build_driver(
                DeviceClass::Desktop,
                Box::new(HeadlessSurface::new(1280, 720)),
                audio,
            )
            .unwrap();
        assert!(driver.audio().enabled());
        assert_eq!(driver.audio().volume(), 30);
        assert!(!driver.hud_visible());
        assert!(driver.is_running());
    }
}
