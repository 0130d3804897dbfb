use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use serde::Serialize;

use crate::navigation::{Mode, TravelDirection};
use crate::waypoint::SoundscapeId;

/// Something the presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneEvent {
    TravelStarted {
        from: usize,
        to: usize,
        direction: TravelDirection,
    },
    Arrived {
        waypoint: usize,
    },
    /// Entered orbit from rest because the tracker selected the waypoint.
    Settled {
        waypoint: usize,
    },
    ModeChanged {
        mode: Mode,
    },
    BarrelRoll,
    Reset,
    WaypointSelected {
        waypoint: usize,
    },
    WaypointDeselected {
        waypoint: usize,
    },
    WaypointVisited {
        waypoint: usize,
    },
    SectorChanged {
        label: String,
    },
    SoundscapeChanged {
        soundscape: Option<SoundscapeId>,
    },
}

impl SceneEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SceneEvent::TravelStarted { .. } => "travel_started",
            SceneEvent::Arrived { .. } => "arrived",
            SceneEvent::Settled { .. } => "settled",
            SceneEvent::ModeChanged { .. } => "mode_changed",
            SceneEvent::BarrelRoll => "barrel_roll",
            SceneEvent::Reset => "reset",
            SceneEvent::WaypointSelected { .. } => "waypoint_selected",
            SceneEvent::WaypointDeselected { .. } => "waypoint_deselected",
            SceneEvent::WaypointVisited { .. } => "waypoint_visited",
            SceneEvent::SectorChanged { .. } => "sector_changed",
            SceneEvent::SoundscapeChanged { .. } => "soundscape_changed",
        }
    }
}

/// An event stamped with session time in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedEvent {
    #[serde(flatten)]
    pub event: SceneEvent,
    pub timestamp: f64,
}

type Listener = Box<dyn Fn(&TimedEvent)>;

/// Per-tick event queue with ring buffer logging.
pub struct EventBus {
    /// Listeners keyed by event kind. Each listener gets an ID.
    listeners: HashMap<&'static str, Vec<(u64, Listener)>>,
    next_listener_id: u64,
    /// Ring buffer log of recent events.
    log: VecDeque<TimedEvent>,
    log_capacity: usize,
    /// File logger path (if enabled).
    log_file: Option<PathBuf>,
    total_time: f64,
    pending: Vec<TimedEvent>,
}

impl EventBus {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            listeners: HashMap::new(),
            next_listener_id: 0,
            log: VecDeque::with_capacity(log_capacity),
            log_capacity,
            log_file: None,
            total_time: 0.0,
            pending: Vec::new(),
        }
    }

    /// Append every flushed event to `path` as one JSON object per line.
    pub fn enable_file_logging(&mut self, path: PathBuf) {
        tracing::info!("Logging scene events to {:?}", path);
        self.log_file = Some(path);
    }

    /// Queue an event for the next flush.
    pub fn emit(&mut self, event: SceneEvent) {
        self.pending.push(TimedEvent {
            event,
            timestamp: self.total_time,
        });
    }

    pub fn emit_all(&mut self, events: impl IntoIterator<Item = SceneEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Register a listener for an event kind. Returns a listener ID for removal.
    pub fn listen<F>(&mut self, kind: &'static str, callback: F) -> u64
    where
        F: Fn(&TimedEvent) + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    pub fn remove_listener(&mut self, listener_id: u64) {
        for listeners in self.listeners.values_mut() {
            listeners.retain(|(id, _)| *id != listener_id);
        }
    }

    /// Notify listeners, log to the ring buffer and file. Returns the flushed events.
    pub fn flush(&mut self) -> Vec<TimedEvent> {
        let events: Vec<TimedEvent> = self.pending.drain(..).collect();

        for event in &events {
            if let Some(listeners) = self.listeners.get(event.event.kind()) {
                for (_id, callback) in listeners {
                    callback(event);
                }
            }

            if self.log.len() >= self.log_capacity {
                self.log.pop_front();
            }
            self.log.push_back(event.clone());

            if let Some(log_path) = &self.log_file {
                if let Ok(json) = serde_json::to_string(event) {
                    let written = std::fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(log_path)
                        .and_then(|mut f| {
                            use std::io::Write;
                            writeln!(f, "{}", json)
                        });
                    if let Err(e) = written {
                        tracing::warn!("Event log write failed, disabling file log: {}", e);
                        self.log_file = None;
                    }
                }
            }
        }

        events
    }

    pub fn tick(&mut self, dt: f64) {
        self.total_time += dt;
    }

    pub fn get_log(&self) -> &VecDeque<TimedEvent> {
        &self.log
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_event_bus_emit_and_flush() {
        let mut bus = EventBus::new(100);
        let received = Rc::new(RefCell::new(Vec::new()));

        let recv_clone = received.clone();
        bus.listen("arrived", move |event| {
            recv_clone.borrow_mut().push(event.clone());
        });

        bus.tick(1.5);
        bus.emit(SceneEvent::Arrived { waypoint: 3 });
        bus.emit(SceneEvent::BarrelRoll);
        let flushed = bus.flush();

        assert_eq!(flushed.len(), 2);
        let events = received.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, SceneEvent::Arrived { waypoint: 3 });
        assert_eq!(events[0].timestamp, 1.5);
    }

    #[test]
    fn test_ring_buffer_capacity() {
        let mut bus = EventBus::new(3);
        for i in 0..5 {
            bus.emit(SceneEvent::WaypointVisited { waypoint: i });
        }
        bus.flush();

        assert_eq!(bus.get_log().len(), 3);
        // Oldest dropped.
        assert_eq!(
            bus.get_log()[0].event,
            SceneEvent::WaypointVisited { waypoint: 2 }
        );
    }

    #[test]
    fn test_remove_listener() {
        let mut bus = EventBus::new(100);
        let received = Rc::new(RefCell::new(0));

        let recv_clone = received.clone();
        let id = bus.listen("reset", move |_| {
            *recv_clone.borrow_mut() += 1;
        });

        bus.emit(SceneEvent::Reset);
        bus.flush();
        assert_eq!(*received.borrow(), 1);

        bus.remove_listener(id);
        bus.emit(SceneEvent::Reset);
        bus.flush();
        assert_eq!(*received.borrow(), 1);
    }

    #[test]
    fn test_events_serialize_tagged() {
        let event = TimedEvent {
            event: SceneEvent::SectorChanged {
                label: "EARTH".into(),
            },
            timestamp: 2.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "sector_changed");
        assert_eq!(json["label"], "EARTH");
        assert_eq!(json["timestamp"], 2.0);
    }
}
