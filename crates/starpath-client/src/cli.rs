use std::path::PathBuf;

use clap::Parser;

use starpath_core::DeviceClass;

#[derive(Parser, Debug, Clone)]
#[command(name = "starpath", version, about = "Starpath - a rocket tour through a portfolio solar system")]
pub struct CliArgs {
    /// Path to the scene YAML file (default: search for starpath.yaml upward)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output mode: window or headless
    #[arg(long, default_value = "window")]
    pub output: OutputMode,

    /// Layout class; auto picks one from the window width
    #[arg(long, default_value = "auto")]
    pub device: DeviceOverride,

    /// Start with ambient sound enabled
    #[arg(long)]
    pub sound: bool,

    /// Master volume, 0-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume: Option<u8>,

    /// Frames to run in headless mode
    #[arg(long, default_value_t = 1800)]
    pub frames: u64,

    /// Append scene events as JSON lines to this file
    #[arg(long)]
    pub event_log: Option<PathBuf>,

    /// Show the HUD on startup
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub hud: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Window,
    Headless,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceOverride {
    Auto,
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceOverride {
    /// Resolve against the current viewport width in logical pixels.
    pub fn resolve(self, width: f64) -> DeviceClass {
        match self {
            DeviceOverride::Auto => DeviceClass::from_width(width),
            DeviceOverride::Mobile => DeviceClass::Mobile,
            DeviceOverride::Tablet => DeviceClass::Tablet,
            DeviceOverride::Desktop => DeviceClass::Desktop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["starpath"]);
        assert_eq!(args.output, OutputMode::Window);
        assert_eq!(args.device, DeviceOverride::Auto);
        assert!(!args.sound);
        assert!(args.volume.is_none());
        assert_eq!(args.frames, 1800);
        assert!(args.hud);
    }

    #[test]
    fn test_headless_flags() {
        let args = CliArgs::parse_from([
            "starpath",
            "--output",
            "headless",
            "--frames",
            "120",
            "--device",
            "mobile",
            "--sound",
            "--volume",
            "70",
            "--hud",
            "false",
        ]);
        assert_eq!(args.output, OutputMode::Headless);
        assert_eq!(args.frames, 120);
        assert_eq!(args.device.resolve(1920.0), DeviceClass::Mobile);
        assert_eq!(args.volume, Some(70));
        assert!(!args.hud);
    }

    #[test]
    fn test_volume_out_of_range_rejected() {
        assert!(CliArgs::try_parse_from(["starpath", "--volume", "150"]).is_err());
    }

    #[test]
    fn test_auto_device_follows_width() {
        assert_eq!(DeviceOverride::Auto.resolve(1280.0), DeviceClass::Desktop);
        assert_eq!(DeviceOverride::Auto.resolve(500.0), DeviceClass::Mobile);
    }
}
