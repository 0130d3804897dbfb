use std::collections::HashMap;
use std::io::Cursor;

use kira::manager::{AudioManager, AudioManagerSettings, DefaultBackend};
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::tween::Tween;

use starpath_core::{Mode, NavigationState, ProximityState, SceneEvent, SoundscapeId, WaypointSet};

use crate::audio_gen::{self, SoundscapeSpec};

/// Fade applied when a soundscape is stopped, so the cut does not click.
const STOP_FADE_SECS: f32 = 0.05;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio backend unavailable: {0}")]
    Backend(String),

    #[error("failed to decode soundscape '{id}': {reason}")]
    Decode { id: SoundscapeId, reason: String },

    #[error("failed to play soundscape '{id}': {reason}")]
    Playback { id: SoundscapeId, reason: String },
}

/// A playing soundscape loop.
pub trait Voice {
    fn set_volume(&mut self, volume: f64);
    /// Stop every generator of the loop and release it.
    fn stop(self: Box<Self>);
}

/// Something that can start soundscape loops.
pub trait AudioBackend {
    fn play(&mut self, spec: &SoundscapeSpec, volume: f64) -> Result<Box<dyn Voice>, AudioError>;
}

/// Lazily builds the backend; `None` means no audio on this machine.
pub type BackendFactory = Box<dyn FnMut() -> Option<Box<dyn AudioBackend>>>;

/// The one active soundscape.
pub struct SoundscapeHandle {
    pub id: SoundscapeId,
    voice: Box<dyn Voice>,
}

/// Kira-backed audio output. Soundscapes are rendered once and cached.
pub struct KiraBackend {
    manager: AudioManager,
    cache: HashMap<SoundscapeId, StaticSoundData>,
}

impl KiraBackend {
    pub fn new() -> Result<Self, AudioError> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| AudioError::Backend(e.to_string()))?;
        tracing::info!("Audio system initialized (Kira)");
        Ok(Self {
            manager,
            cache: HashMap::new(),
        })
    }

    fn sound_data(&mut self, id: SoundscapeId) -> Result<StaticSoundData, AudioError> {
        if let Some(data) = self.cache.get(&id) {
            return Ok(data.clone());
        }
        let wav = audio_gen::soundscape_wav(id, audio_gen::SAMPLE_RATE, audio_gen::LOOP_SECONDS);
        let data = StaticSoundData::from_cursor(Cursor::new(wav)).map_err(|e| {
            AudioError::Decode {
                id,
                reason: e.to_string(),
            }
        })?;
        tracing::debug!("Rendered soundscape '{}'", id);
        self.cache.insert(id, data.clone());
        Ok(data)
    }
}

impl AudioBackend for KiraBackend {
    fn play(&mut self, spec: &SoundscapeSpec, volume: f64) -> Result<Box<dyn Voice>, AudioError> {
        let data = self.sound_data(spec.id)?;
        let handle = self
            .manager
            .play(data.volume(volume).loop_region(..))
            .map_err(|e| AudioError::Playback {
                id: spec.id,
                reason: e.to_string(),
            })?;
        Ok(Box::new(KiraVoice { handle }))
    }
}

struct KiraVoice {
    handle: StaticSoundHandle,
}

impl Voice for KiraVoice {
    fn set_volume(&mut self, volume: f64) {
        self.handle.set_volume(volume, Tween::default());
    }

    fn stop(mut self: Box<Self>) {
        self.handle.stop(Tween {
            duration: std::time::Duration::from_secs_f32(STOP_FADE_SECS),
            ..Default::default()
        });
    }
}

/// Picks the ambient soundscape for the current scene and keeps exactly
/// one playing. Missing audio hardware turns every request into a no-op.
pub struct AudioDirector {
    enabled: bool,
    volume: u8,
    factory: BackendFactory,
    backend: Option<Box<dyn AudioBackend>>,
    /// Set when the factory came back empty; cleared on re-enable.
    unavailable: bool,
    active: Option<SoundscapeHandle>,
    /// Last soundscape that failed to start, to avoid retrying every frame.
    failed: Option<SoundscapeId>,
}

impl AudioDirector {
    pub fn new(factory: BackendFactory) -> Self {
        Self {
            enabled: false,
            volume: 50,
            factory,
            backend: None,
            unavailable: false,
            active: None,
            failed: None,
        }
    }

    /// Director that plays through the default output device.
    pub fn with_kira() -> Self {
        Self::new(Box::new(|| match KiraBackend::new() {
            Ok(backend) => Some(Box::new(backend) as Box<dyn AudioBackend>),
            Err(e) => {
                tracing::warn!("Failed to initialize audio: {}. Audio disabled.", e);
                None
            }
        }))
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn active(&self) -> Option<SoundscapeId> {
        self.active.as_ref().map(|h| h.id)
    }

    fn gain(&self) -> f64 {
        self.volume as f64 / 100.0
    }

    /// Turning audio off stops the active loop and releases the backend.
    pub fn set_enabled(&mut self, enabled: bool) -> Option<SceneEvent> {
        if enabled == self.enabled {
            return None;
        }
        self.enabled = enabled;
        if enabled {
            tracing::info!("Audio enabled");
            self.unavailable = false;
            self.failed = None;
            None
        } else {
            tracing::info!("Audio disabled");
            let event = self.stop_active();
            self.backend = None;
            event
        }
    }

    /// Master volume 0..=100, applied to the playing loop immediately.
    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        let gain = self.gain();
        if let Some(active) = self.active.as_mut() {
            active.voice.set_volume(gain);
        }
    }

    /// Soundscape wanted for this frame, or `None` to leave things as they are.
    pub fn desired(
        nav: &NavigationState,
        proximity: &ProximityState,
        waypoints: &WaypointSet,
    ) -> Option<SoundscapeId> {
        match nav.mode() {
            Mode::FreeRoam => Some(SoundscapeId::Space),
            Mode::Tour if nav.is_traveling() => None,
            Mode::Tour => Some(
                proximity
                    .selected_waypoint
                    .and_then(|i| waypoints.get(i))
                    .map(|wp| wp.soundscape)
                    .unwrap_or(SoundscapeId::Space),
            ),
        }
    }

    pub fn update(
        &mut self,
        nav: &NavigationState,
        proximity: &ProximityState,
        waypoints: &WaypointSet,
    ) -> Option<SceneEvent> {
        let id = Self::desired(nav, proximity, waypoints)?;
        self.request(id)
    }

    /// Make `id` the only playing soundscape.
    pub fn request(&mut self, id: SoundscapeId) -> Option<SceneEvent> {
        if !self.enabled || self.active() == Some(id) || self.failed == Some(id) {
            return None;
        }
        if self.backend.is_none() && !self.unavailable {
            self.backend = (self.factory)();
            self.unavailable = self.backend.is_none();
        }
        let backend = self.backend.as_mut()?;

        // Previous loop is fully stopped before the next one starts.
        let stopped = self.active.take().map(|old| {
            old.voice.stop();
            old.id
        });

        let gain = self.volume as f64 / 100.0;
        match backend.play(&audio_gen::soundscape_spec(id), gain) {
            Ok(voice) => {
                tracing::debug!("Soundscape -> {}", id);
                self.failed = None;
                self.active = Some(SoundscapeHandle { id, voice });
                Some(SceneEvent::SoundscapeChanged {
                    soundscape: Some(id),
                })
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.failed = Some(id);
                stopped.map(|_| SceneEvent::SoundscapeChanged { soundscape: None })
            }
        }
    }

    fn stop_active(&mut self) -> Option<SceneEvent> {
        let old = self.active.take()?;
        old.voice.stop();
        Some(SceneEvent::SoundscapeChanged { soundscape: None })
    }

    /// Stop everything and drop the backend.
    pub fn teardown(&mut self) {
        self.stop_active();
        self.backend = None;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::recording_director;
    use super::*;
    use starpath_core::{Navigator, ProximityTracker, SceneConfig};
    use std::sync::Arc;

    #[test]
    fn test_disabled_director_is_silent() {
        let (mut director, rec) = recording_director();
        assert_eq!(director.request(SoundscapeId::Sun), None);
        assert!(rec.borrow().log.is_empty());
        assert_eq!(rec.borrow().backends_built, 0);
    }

    #[test]
    fn test_switching_is_exclusive() {
        let (mut director, rec) = recording_director();
        director.set_enabled(true);
        director.request(SoundscapeId::Sun);
        let event = director.request(SoundscapeId::Ice);
        assert_eq!(
            event,
            Some(SceneEvent::SoundscapeChanged {
                soundscape: Some(SoundscapeId::Ice)
            })
        );
        let rec = rec.borrow();
        assert_eq!(rec.live, vec![SoundscapeId::Ice]);
        assert_eq!(rec.log, vec!["play sun", "stop sun", "play ice"]);
        assert_eq!(director.active(), Some(SoundscapeId::Ice));
    }

    #[test]
    fn test_same_soundscape_is_not_restarted() {
        let (mut director, rec) = recording_director();
        director.set_enabled(true);
        director.request(SoundscapeId::Earth);
        assert_eq!(director.request(SoundscapeId::Earth), None);
        assert_eq!(rec.borrow().log.len(), 1);
    }

    #[test]
    fn test_volume_applies_live() {
        let (mut director, rec) = recording_director();
        director.set_enabled(true);
        director.set_volume(80);
        director.request(SoundscapeId::Gas);
        director.set_volume(20);
        director.set_volume(250);
        let rec = rec.borrow();
        assert_eq!(rec.volumes, vec![0.8, 0.2, 1.0]);
        assert_eq!(rec.log, vec!["play gas"]);
    }

    #[test]
    fn test_disable_stops_and_reenable_rebuilds() {
        let (mut director, rec) = recording_director();
        director.set_enabled(true);
        director.request(SoundscapeId::Rings);
        let event = director.set_enabled(false);
        assert_eq!(event, Some(SceneEvent::SoundscapeChanged { soundscape: None }));
        assert!(rec.borrow().live.is_empty());
        assert_eq!(director.active(), None);

        director.set_enabled(true);
        director.request(SoundscapeId::Rings);
        assert_eq!(rec.borrow().backends_built, 2);
        assert_eq!(rec.borrow().live, vec![SoundscapeId::Rings]);
    }

    #[test]
    fn test_unavailable_backend_noops() {
        let mut director = AudioDirector::new(Box::new(|| None));
        director.set_enabled(true);
        assert_eq!(director.request(SoundscapeId::Sun), None);
        assert_eq!(director.active(), None);
    }

    #[test]
    fn test_desired_follows_scene() {
        let config = SceneConfig::default();
        let waypoints = Arc::new(config.waypoint_set().unwrap());
        let mut nav = Navigator::new(waypoints.clone(), config.tuning).unwrap();
        let mut tracker = ProximityTracker::new(&config.tuning);

        // Nothing selected yet: deep space.
        assert_eq!(
            AudioDirector::desired(nav.state(), tracker.state(), &waypoints),
            Some(SoundscapeId::Space)
        );

        tracker.update(nav.state(), &waypoints, &[]);
        assert_eq!(
            AudioDirector::desired(nav.state(), tracker.state(), &waypoints),
            Some(SoundscapeId::Sun)
        );

        // Traveling keeps whatever is playing.
        nav.travel_to(2);
        assert_eq!(
            AudioDirector::desired(nav.state(), tracker.state(), &waypoints),
            None
        );

        nav.toggle_mode();
        assert_eq!(
            AudioDirector::desired(nav.state(), tracker.state(), &waypoints),
            Some(SoundscapeId::Space)
        );
    }
}
