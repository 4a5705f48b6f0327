//! Chime playback through an on-demand playback surface.
//!
//! The surface is a dedicated worker thread with an inbox. It is created the
//! first time a chime is requested and reused afterwards; if it has died it
//! is created again on the next request.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};

/// Asset reference the surface resolves against its asset directory.
pub const CHIME_ASSET: &str = "assets/chime.mp3";

/// System sounds tried when the chime asset is missing.
const FALLBACK_SOUNDS: &[&str] = &[
    "/usr/share/sounds/freedesktop/stereo/complete.oga",
    "/usr/share/sounds/freedesktop/stereo/bell.oga",
    "/System/Library/Sounds/Glass.aiff",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play { asset: String },
}

pub trait SoundPlayer: Send + Sync {
    /// Make sure a playback surface exists and ask it to play the chime.
    fn play_chime(&self) -> Result<()>;
}

struct Surface {
    tx: mpsc::Sender<PlaybackCommand>,
    handle: JoinHandle<()>,
}

pub struct ChimePlayer {
    asset_dir: PathBuf,
    players: Vec<String>,
    surface: Mutex<Option<Surface>>,
    surfaces_created: AtomicUsize,
}

impl ChimePlayer {
    pub fn new(asset_dir: impl Into<PathBuf>, players: Vec<String>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            players,
            surface: Mutex::new(None),
            surfaces_created: AtomicUsize::new(0),
        }
    }

    /// How many surfaces this player has spawned so far.
    pub fn surfaces_created(&self) -> usize {
        self.surfaces_created.load(Ordering::SeqCst)
    }

    /// Check-then-create under the lock, returning the live surface's inbox.
    fn ensure_surface(&self) -> Result<mpsc::Sender<PlaybackCommand>> {
        let mut slot = self
            .surface
            .lock()
            .map_err(|_| CoreError::Playback("surface registry poisoned".into()))?;

        if let Some(surface) = slot.as_ref() {
            if !surface.handle.is_finished() {
                return Ok(surface.tx.clone());
            }
            debug!("playback surface exited; recreating");
        }

        let (tx, rx) = mpsc::channel();
        let asset_dir = self.asset_dir.clone();
        let players = self.players.clone();
        let handle = std::thread::Builder::new()
            .name("eyerest-playback".into())
            .spawn(move || run_surface(rx, &asset_dir, &players))
            .map_err(|e| CoreError::Playback(format!("cannot create playback surface: {e}")))?;

        self.surfaces_created.fetch_add(1, Ordering::SeqCst);
        info!("playback surface created");
        *slot = Some(Surface {
            tx: tx.clone(),
            handle,
        });
        Ok(tx)
    }
}

impl SoundPlayer for ChimePlayer {
    fn play_chime(&self) -> Result<()> {
        let tx = self.ensure_surface()?;
        tx.send(PlaybackCommand::Play {
            asset: CHIME_ASSET.into(),
        })
        .map_err(|_| CoreError::Playback("playback surface is gone".into()))
    }
}

fn run_surface(rx: mpsc::Receiver<PlaybackCommand>, asset_dir: &Path, players: &[String]) {
    while let Ok(command) = rx.recv() {
        match command {
            PlaybackCommand::Play { asset } => {
                let Some(path) = resolve_sound(asset_dir, &asset) else {
                    warn!(%asset, "no chime asset or system sound available");
                    continue;
                };
                if !play_with_first_player(players, &path) {
                    warn!(path = %path.display(), "no audio player could play the chime");
                }
            }
        }
    }
    debug!("playback surface shutting down");
}

fn resolve_sound(asset_dir: &Path, asset: &str) -> Option<PathBuf> {
    let primary = asset_dir.join(asset);
    if primary.exists() {
        return Some(primary);
    }
    FALLBACK_SOUNDS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn play_with_first_player(players: &[String], path: &Path) -> bool {
    for player in players {
        match Command::new(player)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => return true,
            Ok(status) => debug!(%player, ?status, "player exited unsuccessfully"),
            Err(e) => debug!(%player, error = %e, "player unavailable"),
        }
    }
    false
}
