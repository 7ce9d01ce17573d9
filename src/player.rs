//! Player state store.
//!
//! [`Player`] is the single owner of playback state for the session. Views
//! read it through [`Player::state`] and mutate it only through the named
//! commands below; the playback handle reports back through
//! [`Player::handle_event`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Recitation};
use crate::engine::{EngineEvent, PlaybackEngine, RequestId};
use crate::error::{EngineError, PlayerError};

pub const DEFAULT_VOLUME: f64 = 0.7;

// ── Repeat mode ────────────────────────────────────────────────────

/// What happens when the current recitation finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    None,
    Surah,
    Verse,
    Selection,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Surah,
            Self::Surah => Self::Verse,
            Self::Verse => Self::Selection,
            Self::Selection => Self::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "Off",
            Self::Surah => "Surah",
            Self::Verse => "Verse",
            Self::Selection => "Selection",
        }
    }

    pub fn localized(&self) -> &'static str {
        match self {
            Self::None => "لا تكرار",
            Self::Surah => "تكرار السورة",
            Self::Verse => "تكرار الآية",
            Self::Selection => "تكرار المقطع",
        }
    }
}

// ── State ──────────────────────────────────────────────────────────

/// Derived transport state, for rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    /// Catalog index of the current recitation.
    pub current: Option<usize>,
    pub is_playing: bool,
    pub current_time: f64,
    /// `None` until the handle reports metadata for the source.
    pub duration: Option<f64>,
    pub volume: f64,
    pub loading: bool,
    pub repeat_mode: RepeatMode,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current: None,
            is_playing: false,
            current_time: 0.0,
            duration: None,
            volume: DEFAULT_VOLUME,
            loading: false,
            repeat_mode: RepeatMode::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingPlay {
    request: RequestId,
    index: usize,
    /// The handle accepted the play request.
    acked: bool,
}

// ── Player ─────────────────────────────────────────────────────────

pub struct Player {
    catalog: Catalog,
    engine: Box<dyn PlaybackEngine>,
    state: PlayerState,
    pending: Option<PendingPlay>,
    last_request: RequestId,
    /// The current source played to its end and sits paused at EOF.
    at_end: bool,
    /// The handle no longer holds the current source (it failed, or was
    /// replaced by a selection that never started).
    source_lost: bool,
}

impl Player {
    pub fn new(
        catalog: Catalog,
        mut engine: Box<dyn PlaybackEngine>,
        volume: f64,
        repeat_mode: RepeatMode,
    ) -> Self {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            DEFAULT_VOLUME
        };
        engine.set_volume(volume);
        Self {
            catalog,
            engine,
            state: PlayerState {
                volume,
                repeat_mode,
                ..PlayerState::default()
            },
            pending: None,
            last_request: 0,
            at_end: false,
            source_lost: false,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn current(&self) -> Option<&Recitation> {
        self.state.current.and_then(|i| self.catalog.get(i))
    }

    /// Catalog index of a recitation that was selected but has not started.
    pub fn pending_selection(&self) -> Option<usize> {
        self.pending
            .filter(|p| Some(p.index) != self.state.current)
            .map(|p| p.index)
    }

    pub fn transport(&self) -> Transport {
        if self.state.loading {
            Transport::Loading
        } else if self.state.is_playing {
            Transport::Playing
        } else if self.state.current.is_some() {
            Transport::Paused
        } else {
            Transport::Idle
        }
    }

    fn next_request(&mut self) -> RequestId {
        self.last_request += 1;
        self.last_request
    }

    fn request_play(&mut self, index: usize) {
        let request = self.next_request();
        self.pending = Some(PendingPlay {
            request,
            index,
            acked: false,
        });
        self.engine.play(request);
    }

    // ── Commands ───────────────────────────────────────────────────

    pub fn select(&mut self, id: &str) -> Result<(), PlayerError> {
        let index = self
            .catalog
            .position(id)
            .ok_or_else(|| PlayerError::UnknownRecitation(id.to_string()))?;
        self.select_index(index);
        Ok(())
    }

    /// Load and play the recitation at `index`. Selecting the current
    /// recitation toggles play/pause instead of reloading it.
    pub fn select_index(&mut self, index: usize) {
        if self.state.current == Some(index) {
            self.toggle_play_pause();
            return;
        }
        let Some(recitation) = self.catalog.get(index) else {
            return;
        };
        info!(id = %recitation.id, url = %recitation.audio_url, "loading recitation");
        let url = recitation.audio_url.clone();
        self.engine.load(&url);
        self.state.loading = true;
        self.request_play(index);
    }

    /// Start the current recitation again after a pause. A source left at
    /// EOF restarts from 0; a source the handle lost is loaded again.
    fn resume(&mut self, index: usize) {
        if self.source_lost {
            let Some(recitation) = self.catalog.get(index) else {
                return;
            };
            info!(id = %recitation.id, "reloading recitation");
            let url = recitation.audio_url.clone();
            self.engine.load(&url);
            self.state.loading = true;
            self.state.current_time = 0.0;
            self.source_lost = false;
            self.at_end = false;
        } else if self.at_end {
            self.engine.seek(0.0);
            self.state.current_time = 0.0;
            self.at_end = false;
        }
        self.request_play(index);
        self.state.is_playing = true;
    }

    /// No-op without a current recitation or while another one is starting.
    pub fn toggle_play_pause(&mut self) {
        let Some(index) = self.state.current else {
            return;
        };
        if self.pending_selection().is_some() {
            debug!("toggle ignored while a selection is starting");
            return;
        }
        if self.state.is_playing {
            self.engine.pause();
            self.pending = None;
            self.state.is_playing = false;
        } else {
            self.resume(index);
        }
    }

    /// Pause and drop any selection that is still starting.
    pub fn stop(&mut self) {
        if let Some(pending) = self.pending.take() {
            if Some(pending.index) != self.state.current {
                // The handle already holds the abandoned source.
                self.source_lost = true;
                self.state.loading = false;
            }
        }
        self.engine.pause();
        self.state.is_playing = false;
    }

    pub fn seek_to(&mut self, time: f64) -> Result<(), PlayerError> {
        if !time.is_finite() {
            return Err(PlayerError::InvalidSeekPosition(time));
        }
        if self.state.loading {
            return Err(PlayerError::SeekWhileLoading);
        }
        if self.state.current.is_none() {
            return Err(PlayerError::NoTrackLoaded);
        }
        let mut time = time.max(0.0);
        if let Some(duration) = self.state.duration {
            time = time.min(duration);
        }
        self.engine.seek(time);
        self.state.current_time = time;
        self.at_end = false;
        Ok(())
    }

    pub fn seek_by(&mut self, delta: f64) -> Result<(), PlayerError> {
        self.seek_to(self.state.current_time + delta)
    }

    /// Select the following recitation. Returns false at the end of the
    /// catalog or without a current recitation.
    pub fn next(&mut self) -> bool {
        let Some(index) = self.state.current else {
            return false;
        };
        match self.catalog.next_after(index) {
            Some(next) => {
                self.select_index(next);
                true
            }
            None => false,
        }
    }

    /// Select the preceding recitation, or restart the first one.
    pub fn previous(&mut self) {
        let Some(index) = self.state.current else {
            return;
        };
        match self.catalog.previous_before(index) {
            Some(prev) => self.select_index(prev),
            None => {
                self.engine.seek(0.0);
                self.state.current_time = 0.0;
                self.at_end = false;
            }
        }
    }

    /// Restart the current recitation from the beginning and play it.
    pub fn replay(&mut self) -> Result<(), PlayerError> {
        let index = self.state.current.ok_or(PlayerError::NoTrackLoaded)?;
        if self.source_lost {
            self.resume(index);
            return Ok(());
        }
        self.engine.seek(0.0);
        self.state.current_time = 0.0;
        self.at_end = false;
        if !self.state.is_playing {
            self.request_play(index);
            self.state.is_playing = true;
        }
        Ok(())
    }

    /// Levels outside [0,1] are clamped; NaN is ignored.
    pub fn set_volume(&mut self, level: f64) {
        if level.is_nan() {
            return;
        }
        let level = level.clamp(0.0, 1.0);
        self.state.volume = level;
        self.engine.set_volume(level);
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.state.repeat_mode = self.state.repeat_mode.next();
        info!(mode = self.state.repeat_mode.label(), "repeat mode changed");
        self.state.repeat_mode
    }

    // ── Engine events ──────────────────────────────────────────────

    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::TimeUpdate { position } => {
                if position.is_finite() {
                    self.state.current_time = position.max(0.0);
                }
            }
            EngineEvent::MetadataReady { duration } => {
                if duration.is_finite() && duration >= 0.0 {
                    self.state.duration = Some(duration);
                }
                self.state.loading = false;
                self.commit_pending();
            }
            EngineEvent::LoadStarted => {
                self.state.loading = true;
                self.state.current_time = 0.0;
                self.state.duration = None;
            }
            EngineEvent::Ended => self.on_ended(),
            EngineEvent::PlayResolved { request, result } => self.resolve_play(request, result),
            EngineEvent::Failed { message } => {
                warn!(%message, "playback failed");
                // Whichever source failed, the handle holds nothing playable
                // for the current recitation any more.
                self.pending = None;
                self.source_lost = self.state.current.is_some();
                self.state.loading = false;
                self.state.is_playing = false;
            }
        }
    }

    fn resolve_play(&mut self, request: RequestId, result: Result<(), EngineError>) {
        let Some(pending) = self.pending.filter(|p| p.request == request) else {
            debug!(request, latest = self.last_request, "ignoring stale play resolution");
            return;
        };
        let switching = self.state.current != Some(pending.index);
        match result {
            Ok(()) if switching => {
                // The ack only means the handle unpaused; the new source
                // becomes current once its metadata has loaded too.
                self.pending = Some(PendingPlay {
                    acked: true,
                    ..pending
                });
                self.commit_pending();
            }
            Ok(()) => {
                self.pending = None;
                self.state.is_playing = true;
            }
            Err(e) => {
                warn!(error = %e, "error playing audio");
                self.pending = None;
                if switching && self.state.current.is_some() {
                    self.source_lost = true;
                }
                self.state.loading = false;
                self.state.is_playing = false;
            }
        }
    }

    /// Make an acknowledged selection current once its source is ready.
    fn commit_pending(&mut self) {
        let Some(pending) = self.pending else {
            return;
        };
        if !pending.acked || self.state.loading {
            return;
        }
        self.pending = None;
        if let Some(r) = self.catalog.get(pending.index) {
            info!(id = %r.id, "now playing");
        }
        self.state.current = Some(pending.index);
        self.state.is_playing = true;
        self.at_end = false;
        self.source_lost = false;
    }

    fn on_ended(&mut self) {
        let Some(index) = self.state.current else {
            self.state.is_playing = false;
            return;
        };
        match self.state.repeat_mode {
            RepeatMode::Surah => {
                debug!("repeating surah");
                self.engine.seek(0.0);
                self.state.current_time = 0.0;
                self.request_play(index);
            }
            RepeatMode::None => {
                if !self.next() {
                    self.at_end = true;
                    self.state.is_playing = false;
                }
            }
            // No verse-range tracking: these modes stop like a plain end.
            RepeatMode::Verse | RepeatMode::Selection => {
                self.at_end = true;
                self.state.is_playing = false;
            }
        }
    }
}
