use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{info, warn};

use crate::terrain::{load_scene_manifest, TerrainError, TerrainSet};

use super::rendering::{load_background, BackgroundImage};
use super::resources::ActionSprites;

/// Scene content arriving at runtime, applied by the host between frames.
/// The natural size only ever comes from a decoded background.
#[derive(Debug)]
pub enum SceneUpdate {
    Terrain(TerrainSet),
    Background(BackgroundImage),
    Sprites(ActionSprites),
}

#[derive(Debug, Clone)]
pub struct SceneSender(Sender<SceneUpdate>);

impl SceneSender {
    /// Returns false once the receiving side is gone.
    pub fn send(&self, update: SceneUpdate) -> bool {
        self.0.send(update).is_ok()
    }
}

#[derive(Debug)]
pub struct SceneFeed(Receiver<SceneUpdate>);

impl SceneFeed {
    /// Drains every queued update without blocking.
    pub fn drain(&self) -> Vec<SceneUpdate> {
        self.0.try_iter().collect()
    }
}

pub fn scene_feed() -> (SceneSender, SceneFeed) {
    let (sender, receiver) = mpsc::channel();
    (SceneSender(sender), SceneFeed(receiver))
}

/// Scene manifest on disk, re-readable on demand.
#[derive(Debug, Clone)]
pub struct SceneSource {
    manifest_path: PathBuf,
}

impl SceneSource {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Parses the manifest and queues terrain and sprites immediately. The
    /// background is decoded on a loader thread and queued when ready; without
    /// one the simulation has no scale and stays suspended.
    pub fn load(&self, sender: &SceneSender) -> Result<(), TerrainError> {
        let manifest = load_scene_manifest(&self.manifest_path)?;
        info!(
            path = %self.manifest_path.display(),
            polygons = manifest.terrain.len(),
            sprites = manifest.action_sprite_urls.len(),
            "scene_manifest_loaded"
        );

        sender.send(SceneUpdate::Terrain(manifest.terrain));
        sender.send(SceneUpdate::Sprites(ActionSprites::from_urls(
            &manifest.action_sprite_urls,
        )));

        match manifest.background_path {
            Some(path) => spawn_background_loader(path, sender.clone()),
            None => warn!(
                path = %self.manifest_path.display(),
                "scene_without_background_staying_suspended"
            ),
        }
        Ok(())
    }
}

fn spawn_background_loader(path: PathBuf, sender: SceneSender) {
    let spawned = thread::Builder::new()
        .name("background-loader".to_string())
        .spawn(move || match load_background(&path) {
            Ok(background) => {
                info!(
                    path = %path.display(),
                    width = background.width(),
                    height = background.height(),
                    "background_loaded"
                );
                sender.send(SceneUpdate::Background(background));
            }
            Err(err) => warn!(error = %err, "background_load_failed_staying_suspended"),
        });
    if let Err(err) = spawned {
        warn!(error = %err, "background_loader_spawn_failed_staying_suspended");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::app::input::InputSnapshot;
    use crate::app::notifier::LogLocationSink;
    use crate::app::simulation::{Simulation, TickOutcome};
    use crate::config::SimConfig;
    use tempfile::TempDir;

    fn wait_for(feed: &SceneFeed, count: usize, timeout: Duration) -> Vec<SceneUpdate> {
        let deadline = Instant::now() + timeout;
        let mut updates = Vec::new();
        while updates.len() < count && Instant::now() < deadline {
            updates.extend(feed.drain());
            thread::sleep(Duration::from_millis(5));
        }
        updates
    }

    fn write_manifest(temp: &TempDir, body: &str) -> PathBuf {
        let manifest = temp.path().join("scene.json");
        fs::write(&manifest, body).expect("write manifest");
        manifest
    }

    #[test]
    fn drain_returns_queued_updates_in_order() {
        let (sender, feed) = scene_feed();
        assert!(sender.send(SceneUpdate::Sprites(ActionSprites::default())));
        assert!(sender.send(SceneUpdate::Terrain(TerrainSet::empty())));
        let drained = feed.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], SceneUpdate::Sprites(_)));
        assert!(feed.drain().is_empty());
    }

    #[test]
    fn send_reports_closed_feed() {
        let (sender, feed) = scene_feed();
        drop(feed);
        assert!(!sender.send(SceneUpdate::Terrain(TerrainSet::empty())));
    }

    #[test]
    fn manifest_with_background_queues_decoded_image() {
        let temp = TempDir::new().expect("temp dir");
        image::RgbaImage::new(8, 6)
            .save(temp.path().join("bg.png"))
            .expect("write png");
        let manifest = write_manifest(
            &temp,
            r#"{
                "background_url": "bg.png",
                "detected_objects": [
                    { "id_polygon": 1, "name": "Desk", "polygon": [[0,4],[8,4],[8,6],[0,6]] }
                ],
                "action_gif_urls": ["idle.gif"]
            }"#,
        );

        let (sender, feed) = scene_feed();
        SceneSource::new(&manifest).load(&sender).expect("load");
        let updates = wait_for(&feed, 3, Duration::from_secs(5));

        assert!(matches!(&updates[0], SceneUpdate::Terrain(terrain) if terrain.len() == 1));
        assert!(matches!(&updates[1], SceneUpdate::Sprites(sprites) if !sprites.is_empty()));
        assert!(matches!(
            &updates[2],
            SceneUpdate::Background(background) if background.width() == 8
        ));
    }

    #[test]
    fn unusable_background_leaves_simulation_suspended() {
        let temp = TempDir::new().expect("temp dir");
        for body in [
            r#"{ "background_url": "absent.png" }"#,
            r#"{ "detected_objects": [
                { "id_polygon": 1, "name": "Sofa", "polygon": [[0,900],[1920,900],[1920,1080]] }
            ] }"#,
        ] {
            let manifest = write_manifest(&temp, body);
            let (sender, feed) = scene_feed();
            SceneSource::new(&manifest).load(&sender).expect("load");
            let updates = wait_for(&feed, 3, Duration::from_millis(300));
            assert_eq!(updates.len(), 2, "only terrain and sprites are queued");
            assert!(!updates
                .iter()
                .any(|update| matches!(update, SceneUpdate::Background(_))));

            let mut simulation =
                Simulation::new(SimConfig::default(), 800, 600, Box::new(LogLocationSink))
                    .expect("simulation");
            for update in updates {
                if let SceneUpdate::Terrain(terrain) = update {
                    simulation.replace_terrain(terrain);
                }
            }
            assert!(simulation.transform().is_none());
            assert_eq!(
                simulation.tick(&InputSnapshot::empty()),
                TickOutcome::Suspended
            );
        }
    }

    #[test]
    fn broken_manifest_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        let manifest = write_manifest(&temp, "{ not json");
        let (sender, _feed) = scene_feed();
        assert!(SceneSource::new(&manifest).load(&sender).is_err());
    }
}
