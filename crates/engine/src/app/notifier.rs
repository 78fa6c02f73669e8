use std::io;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::terrain::LocationData;

use super::collision::SurfaceId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationUpdate {
    Standing(LocationData),
    Airborne,
}

#[derive(Debug, Error)]
pub enum LocationSinkError {
    #[error("location sink is closed")]
    Closed,
    #[error("location sink i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode location update: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("location sink rejected update: {0}")]
    Rejected(String),
}

/// Receiver for "character now stands on X" events.
pub trait LocationSink: Send {
    fn deliver(&mut self, update: &LocationUpdate) -> Result<(), LocationSinkError>;
}

/// Reports ground changes through `tracing` only.
#[derive(Debug, Default)]
pub struct LogLocationSink;

impl LocationSink for LogLocationSink {
    fn deliver(&mut self, update: &LocationUpdate) -> Result<(), LocationSinkError> {
        match update {
            LocationUpdate::Standing(location) => info!(
                id = %location.id,
                name = location.name.as_str(),
                has_audio = location.audio_url.is_some(),
                "location_update"
            ),
            LocationUpdate::Airborne => info!("location_update_airborne"),
        }
        Ok(())
    }
}

/// Runs the wrapped sink on a worker thread so delivery never blocks a tick.
pub struct ThreadedLocationSink {
    sender: Option<Sender<LocationUpdate>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedLocationSink {
    pub fn spawn(name: &str, mut inner: Box<dyn LocationSink>) -> Result<Self, LocationSinkError> {
        let (sender, receiver) = mpsc::channel::<LocationUpdate>();
        let worker_name = name.to_string();
        let worker = thread::Builder::new()
            .name(worker_name.clone())
            .spawn(move || {
                for update in receiver {
                    if let Err(err) = inner.deliver(&update) {
                        warn!(
                            sink = worker_name.as_str(),
                            error = %err,
                            "location_delivery_failed"
                        );
                    }
                }
            })?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

impl LocationSink for ThreadedLocationSink {
    fn deliver(&mut self, update: &LocationUpdate) -> Result<(), LocationSinkError> {
        let sender = self.sender.as_ref().ok_or(LocationSinkError::Closed)?;
        sender
            .send(update.clone())
            .map_err(|_| LocationSinkError::Closed)
    }
}

impl Drop for ThreadedLocationSink {
    fn drop(&mut self) {
        // Closing the channel ends the worker's receive loop.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("location_worker_panicked");
            }
        }
    }
}

/// Edge-triggered ground identity tracker.
pub struct GroundChangeNotifier {
    sink: Box<dyn LocationSink>,
    current: Option<SurfaceId>,
    changes: u64,
}

impl GroundChangeNotifier {
    pub fn new(sink: Box<dyn LocationSink>) -> Self {
        Self {
            sink,
            current: None,
            changes: 0,
        }
    }

    pub fn current(&self) -> Option<&SurfaceId> {
        self.current.as_ref()
    }

    pub fn change_count(&self) -> u64 {
        self.changes
    }

    /// Delivers one update when `next` differs from the tracked surface.
    /// Sink failures are logged and the change still counts as emitted.
    pub fn notify_if_changed(
        &mut self,
        next: Option<SurfaceId>,
        describe: impl FnOnce() -> LocationUpdate,
    ) -> Option<LocationUpdate> {
        if next == self.current {
            return None;
        }
        self.current = next;
        self.changes = self.changes.saturating_add(1);

        let update = describe();
        if let Err(err) = self.sink.deliver(&update) {
            warn!(error = %err, "location_sink_failed");
        }
        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::terrain::PolygonId;

    #[derive(Clone, Default)]
    struct RecordingSink {
        updates: Arc<Mutex<Vec<LocationUpdate>>>,
    }

    impl LocationSink for RecordingSink {
        fn deliver(&mut self, update: &LocationUpdate) -> Result<(), LocationSinkError> {
            self.updates
                .lock()
                .expect("recording lock")
                .push(update.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl LocationSink for FailingSink {
        fn deliver(&mut self, _update: &LocationUpdate) -> Result<(), LocationSinkError> {
            Err(LocationSinkError::Rejected("offline".to_string()))
        }
    }

    fn standing(id: i64, name: &str) -> LocationUpdate {
        LocationUpdate::Standing(LocationData {
            id: PolygonId::Int(id),
            name: name.to_string(),
            bbox: None,
            audio_url: None,
            tts_text: None,
        })
    }

    fn surface(id: i64) -> Option<SurfaceId> {
        Some(SurfaceId::Polygon(PolygonId::Int(id)))
    }

    #[test]
    fn fires_once_per_change() {
        let sink = RecordingSink::default();
        let mut notifier = GroundChangeNotifier::new(Box::new(sink.clone()));

        assert!(notifier
            .notify_if_changed(surface(1), || standing(1, "A"))
            .is_some());
        assert!(notifier
            .notify_if_changed(surface(2), || standing(2, "B"))
            .is_some());
        for _ in 0..10 {
            assert!(notifier
                .notify_if_changed(surface(2), || standing(2, "B"))
                .is_none());
        }

        let updates = sink.updates.lock().expect("recording lock");
        assert_eq!(updates.as_slice(), &[standing(1, "A"), standing(2, "B")]);
        assert_eq!(notifier.change_count(), 2);
    }

    #[test]
    fn leaving_ground_is_a_change() {
        let sink = RecordingSink::default();
        let mut notifier = GroundChangeNotifier::new(Box::new(sink.clone()));
        notifier.notify_if_changed(surface(1), || standing(1, "A"));
        notifier.notify_if_changed(None, || LocationUpdate::Airborne);
        notifier.notify_if_changed(None, || LocationUpdate::Airborne);

        let updates = sink.updates.lock().expect("recording lock");
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1], LocationUpdate::Airborne);
    }

    #[test]
    fn describe_is_not_called_without_change() {
        let mut notifier = GroundChangeNotifier::new(Box::new(LogLocationSink));
        notifier.notify_if_changed(Some(SurfaceId::DefaultFloor), || LocationUpdate::Airborne);
        let result = notifier.notify_if_changed(Some(SurfaceId::DefaultFloor), || {
            panic!("describe must not run when nothing changed")
        });
        assert!(result.is_none());
    }

    #[test]
    fn sink_failure_is_swallowed() {
        let mut notifier = GroundChangeNotifier::new(Box::new(FailingSink));
        let update = notifier.notify_if_changed(surface(7), || standing(7, "Rock"));
        assert_eq!(update, Some(standing(7, "Rock")));
        assert_eq!(notifier.current(), surface(7).as_ref());
    }

    #[test]
    fn threaded_sink_delivers_in_order_before_drop_returns() {
        let recorder = RecordingSink::default();
        let mut threaded =
            ThreadedLocationSink::spawn("location-test", Box::new(recorder.clone()))
                .expect("spawn worker");
        threaded.deliver(&standing(1, "A")).expect("queue");
        threaded.deliver(&LocationUpdate::Airborne).expect("queue");
        drop(threaded);

        let updates = recorder.updates.lock().expect("recording lock");
        assert_eq!(updates.as_slice(), &[standing(1, "A"), LocationUpdate::Airborne]);
    }

    #[test]
    fn updates_serialize_with_kind_tag() {
        let json = serde_json::to_value(standing(3, "Table")).expect("serialize");
        assert_eq!(json["kind"], "standing");
        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "Table");

        let json = serde_json::to_value(LocationUpdate::Airborne).expect("serialize");
        assert_eq!(json, serde_json::json!({ "kind": "airborne" }));
    }
}
