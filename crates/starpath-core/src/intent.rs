/// One frame's worth of player intent, merged from whichever input source
/// the device uses. Axis values are in [-1, 1]; look deltas are radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Intent {
    pub forward: f32,
    pub strafe: f32,
    pub vertical: f32,
    pub boost: bool,
    pub look_delta_yaw: f32,
    pub look_delta_pitch: f32,
    /// Tour chase-camera orbit direction (+1 left, -1 right).
    pub rotate_camera: f32,

    // Edge-triggered actions.
    pub travel_next: bool,
    pub travel_previous: bool,
    pub barrel_roll: bool,
    pub stop: bool,
    pub toggle_hud: bool,
    pub toggle_mode: bool,
    pub exit_free_roam: bool,
}
