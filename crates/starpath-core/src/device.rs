use serde::{Deserialize, Serialize};

/// Layout class derived from the viewport width in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub fn from_width(width: f64) -> Self {
        if width < 768.0 {
            DeviceClass::Mobile
        } else if width <= 1024.0 {
            DeviceClass::Tablet
        } else {
            DeviceClass::Desktop
        }
    }

    /// Touch layouts take joystick input; desktop takes keyboard and mouse.
    pub fn is_touch(&self) -> bool {
        !matches!(self, DeviceClass::Desktop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoints() {
        assert_eq!(DeviceClass::from_width(375.0), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_width(767.9), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_width(768.0), DeviceClass::Tablet);
        assert_eq!(DeviceClass::from_width(1024.0), DeviceClass::Tablet);
        assert_eq!(DeviceClass::from_width(1280.0), DeviceClass::Desktop);
        assert!(DeviceClass::Tablet.is_touch());
        assert!(!DeviceClass::Desktop.is_touch());
    }
}
