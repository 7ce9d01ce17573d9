use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, warn};

use crate::actions;
use crate::config::{self, Config};
use crate::engine::EngineEvent;
use crate::error::PlayerError;
use crate::notice::{Notice, Notifier};
use crate::player::Player;
use crate::theme::{Theme, ThemeName};

const STATUS_TTL: Duration = Duration::from_secs(5);
const SEEK_STEP: f64 = 10.0;
const VOLUME_STEP: f64 = 0.05;

#[derive(Clone, Debug, PartialEq)]
pub enum Screen {
    Library,
    /// A recitation id that does not exist was requested.
    NotFound(String),
}

/// View-local state of the player bar; not part of the player store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarMode {
    Full,
    Minimized,
    Closed,
}

pub struct App {
    pub player: Player,
    pub config: Config,
    pub config_path: PathBuf,
    pub screen: Screen,
    pub list_state: ListState,
    pub bar: BarMode,
    pub show_help: bool,
    pub should_quit: bool,
    pub theme_name: ThemeName,
    pub theme: Theme,
    pub progress_bar_area: Option<Rect>,
    pub status: Option<(Notice, Instant)>,
    pre_mute_volume: f64,
    notifier: Notifier,
    notices: UnboundedReceiver<Notice>,
    engine_events: UnboundedReceiver<EngineEvent>,
}

impl App {
    pub fn new(
        player: Player,
        config: Config,
        config_path: PathBuf,
        engine_events: UnboundedReceiver<EngineEvent>,
    ) -> Self {
        let (notifier, notices) = mpsc::unbounded_channel();
        let theme_name = config.theme;
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            player,
            config,
            config_path,
            screen: Screen::Library,
            list_state,
            bar: BarMode::Full,
            show_help: false,
            should_quit: false,
            theme_name,
            theme: theme_name.theme(),
            progress_bar_area: None,
            status: None,
            pre_mute_volume: crate::player::DEFAULT_VOLUME,
            notifier,
            notices,
            engine_events,
        }
    }

    pub fn notify(&mut self, notice: Notice) {
        self.status = Some((notice, Instant::now()));
    }

    /// Apply everything the playback handle and background actions sent
    /// since the last tick.
    pub fn drain(&mut self) {
        while let Ok(event) = self.engine_events.try_recv() {
            self.player.handle_event(event);
        }
        while let Ok(notice) = self.notices.try_recv() {
            self.notify(notice);
        }
        if let Some((_, at)) = &self.status {
            if at.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    /// Select a recitation named on the command line.
    pub fn open(&mut self, id: &str) {
        match self.player.select(id) {
            Ok(()) => {
                if let Some(index) = self.player.catalog().position(id) {
                    self.list_state.select(Some(index));
                }
            }
            Err(PlayerError::UnknownRecitation(id)) => {
                error!(%id, "404: requested recitation does not exist");
                self.screen = Screen::NotFound(id);
            }
            Err(e) => warn!(error = %e, "could not open recitation"),
        }
    }

    pub fn back_to_library(&mut self) {
        self.screen = Screen::Library;
    }

    // ── List view ──────────────────────────────────────────────────

    pub fn move_selection(&mut self, delta: isize) {
        if self.player.catalog().is_empty() {
            return;
        }
        let len = self.player.catalog().len();
        let sel = self.list_state.selected().unwrap_or(0) as isize;
        let next = (sel + delta).clamp(0, len as isize - 1);
        self.list_state.select(Some(next as usize));
    }

    pub fn select_first(&mut self) {
        self.list_state.select(Some(0));
    }

    pub fn select_last(&mut self) {
        let len = self.player.catalog().len();
        self.list_state.select(Some(len.saturating_sub(1)));
    }

    pub fn play_highlighted(&mut self) {
        if let Some(index) = self.list_state.selected() {
            if self.bar == BarMode::Closed {
                self.bar = BarMode::Full;
            }
            self.player.select_index(index);
        }
    }

    // ── Player bar ─────────────────────────────────────────────────

    /// Disabled while the source is loading.
    pub fn toggle_play_pause(&mut self) {
        if self.player.state().loading {
            debug!("play/pause disabled while loading");
            return;
        }
        self.player.toggle_play_pause();
    }

    pub fn seek_by(&mut self, delta: f64) {
        if let Err(e) = self.player.seek_by(delta) {
            debug!(error = %e, "seek ignored");
        }
    }

    /// Seek to a fraction of the known duration (progress bar click).
    pub fn seek_ratio(&mut self, ratio: f64) {
        let Some(duration) = self.player.state().duration else {
            return;
        };
        let target = ratio.clamp(0.0, 1.0) * duration;
        match self.player.seek_to(target) {
            Ok(()) => self.notify(Notice::info(format!("Seek to {}", crate::ui::format_time(target)))),
            Err(e) => debug!(error = %e, "seek ignored"),
        }
    }

    pub fn next(&mut self) {
        self.player.next();
    }

    pub fn previous(&mut self) {
        self.player.previous();
    }

    pub fn replay(&mut self) {
        if let Err(e) = self.player.replay() {
            debug!(error = %e, "replay ignored");
        }
    }

    pub fn change_volume(&mut self, delta: f64) {
        let level = (self.player.state().volume + delta).clamp(0.0, 1.0);
        // Snap to the step grid so repeated presses land on round percentages.
        let level = (level / VOLUME_STEP).round() * VOLUME_STEP;
        self.player.set_volume(level);
        self.notify(Notice::info(format!("Volume {}%", (self.player.state().volume * 100.0).round())));
    }

    pub fn volume_up(&mut self) {
        self.change_volume(VOLUME_STEP);
    }

    pub fn volume_down(&mut self) {
        self.change_volume(-VOLUME_STEP);
    }

    pub fn toggle_mute(&mut self) {
        let volume = self.player.state().volume;
        if volume > 0.0 {
            self.pre_mute_volume = volume;
            self.player.set_volume(0.0);
            self.notify(Notice::info("Muted"));
        } else {
            self.player.set_volume(self.pre_mute_volume);
            self.notify(Notice::info("Unmuted"));
        }
    }

    pub fn cycle_repeat(&mut self) {
        let mode = self.player.cycle_repeat();
        self.notify(Notice::info(format!("Repeat: {} · {}", mode.label(), mode.localized())));
    }

    pub fn download(&mut self) {
        let Some(recitation) = self.player.current() else {
            return;
        };
        actions::spawn_download(recitation, self.config.download_dir(), self.notifier.clone());
    }

    pub fn share(&mut self) {
        let Some(recitation) = self.player.current() else {
            return;
        };
        actions::spawn_share(recitation, self.config.share_command.clone(), self.notifier.clone());
    }

    pub fn add_to_playlist(&mut self) {
        let Some(recitation) = self.player.current() else {
            return;
        };
        actions::add_to_playlist(recitation, &self.notifier);
    }

    /// Pause and hide the bar until something is selected again.
    pub fn close_bar(&mut self) {
        self.player.stop();
        self.bar = BarMode::Closed;
    }

    pub fn toggle_minimized(&mut self) {
        self.bar = match self.bar {
            BarMode::Full => BarMode::Minimized,
            BarMode::Minimized | BarMode::Closed => BarMode::Full,
        };
        self.notify(Notice::info(if self.bar == BarMode::Minimized {
            "Player minimized"
        } else {
            "Player expanded"
        }));
    }

    pub fn cycle_theme(&mut self) {
        self.theme_name = self.theme_name.next();
        self.theme = self.theme_name.theme();
        self.config.theme = self.theme_name;
        self.notify(Notice::info(format!("Theme: {}", self.theme_name.label())));
        if let Err(e) = config::save_theme(&self.config_path, self.theme_name) {
            warn!(error = %e, "could not save theme");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::tests::sample;
    use crate::engine::fake::{Call, FakeEngine};
    use crate::notice::Level;
    use crate::player::RepeatMode;
    use tokio::sync::mpsc::UnboundedSender;

    pub(crate) struct Harness {
        pub(crate) app: App,
        pub(crate) engine: FakeEngine,
        pub(crate) events: UnboundedSender<EngineEvent>,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        pub(crate) fn new(n: usize) -> Self {
            let engine = FakeEngine::default();
            let player = Player::new(sample(n), Box::new(engine.clone()), 0.7, RepeatMode::None);
            let dir = tempfile::tempdir().unwrap();
            let (events, rx) = mpsc::unbounded_channel();
            let app = App::new(player, Config::default(), dir.path().join("config.toml"), rx);
            engine.clear();
            Self {
                app,
                engine,
                events,
                _dir: dir,
            }
        }

        /// Resolve the latest play request and finish loading.
        pub(crate) fn settle(&mut self) {
            let request = self.engine.last_play().unwrap();
            self.events.send(EngineEvent::MetadataReady { duration: 200.0 }).unwrap();
            self.events
                .send(EngineEvent::PlayResolved {
                    request,
                    result: Ok(()),
                })
                .unwrap();
            self.app.drain();
        }
    }

    #[test]
    fn engine_events_reach_the_store() {
        let mut h = Harness::new(3);
        h.app.play_highlighted();
        h.settle();
        assert_eq!(h.app.player.state().current, Some(0));
        assert!(h.app.player.state().is_playing);

        h.events.send(EngineEvent::TimeUpdate { position: 12.0 }).unwrap();
        h.app.drain();
        assert_eq!(h.app.player.state().current_time, 12.0);
    }

    #[test]
    fn unknown_startup_id_shows_not_found() {
        let mut h = Harness::new(2);
        h.app.open("missing");
        assert_eq!(h.app.screen, Screen::NotFound("missing".into()));
        h.app.back_to_library();
        assert_eq!(h.app.screen, Screen::Library);

        h.app.open("t1");
        assert_eq!(h.app.list_state.selected(), Some(1));
        assert_eq!(h.engine.loads(), 1);
    }

    #[test]
    fn close_pauses_and_hides() {
        let mut h = Harness::new(2);
        h.app.play_highlighted();
        h.settle();
        h.app.close_bar();
        assert_eq!(h.app.bar, BarMode::Closed);
        assert!(!h.app.player.state().is_playing);

        h.app.move_selection(1);
        h.app.play_highlighted();
        assert_eq!(h.app.bar, BarMode::Full);
    }

    #[test]
    fn close_cancels_a_starting_selection() {
        let mut h = Harness::new(3);
        h.app.play_highlighted();
        h.settle();
        h.app.move_selection(1);
        h.app.play_highlighted();
        assert_eq!(h.app.player.pending_selection(), Some(1));

        h.app.close_bar();
        assert_eq!(h.app.player.pending_selection(), None);
        assert!(!h.app.player.state().is_playing);

        // The abandoned request resolving later does not start playback.
        h.settle();
        assert_eq!(h.app.player.state().current, Some(0));
        assert!(!h.app.player.state().is_playing);
        assert_eq!(h.app.bar, BarMode::Closed);
    }

    #[test]
    fn play_pause_disabled_while_loading() {
        let mut h = Harness::new(2);
        h.app.play_highlighted();
        let request = h.engine.last_play().unwrap();
        h.events
            .send(EngineEvent::PlayResolved {
                request,
                result: Ok(()),
            })
            .unwrap();
        h.app.drain();
        assert!(h.app.player.state().loading);
        h.engine.clear();
        h.app.toggle_play_pause();
        assert!(h.engine.calls().is_empty());
        assert_eq!(h.app.player.pending_selection(), Some(0));
    }

    #[test]
    fn volume_steps_and_mute() {
        let mut h = Harness::new(1);
        h.app.volume_up();
        assert!((h.app.player.state().volume - 0.75).abs() < 1e-9);
        h.app.toggle_mute();
        assert_eq!(h.app.player.state().volume, 0.0);
        h.app.toggle_mute();
        assert!((h.app.player.state().volume - 0.75).abs() < 1e-9);
        for _ in 0..30 {
            h.app.volume_up();
        }
        assert_eq!(h.app.player.state().volume, 1.0);
    }

    #[test]
    fn repeat_cycle_announces_mode() {
        let mut h = Harness::new(1);
        h.app.cycle_repeat();
        let (notice, _) = h.app.status.clone().unwrap();
        assert_eq!(notice.level, Level::Info);
        assert!(notice.text.contains("Surah"));
    }

    #[test]
    fn actions_need_a_current_recitation() {
        let mut h = Harness::new(1);
        h.app.add_to_playlist();
        h.app.drain();
        assert!(h.app.status.is_none());

        h.app.play_highlighted();
        h.settle();
        h.app.add_to_playlist();
        h.app.drain();
        assert_eq!(h.app.status.as_ref().unwrap().0.level, Level::Success);
    }

    #[test]
    fn progress_click_seeks() {
        let mut h = Harness::new(1);
        h.app.play_highlighted();
        h.settle();
        h.app.seek_ratio(0.5);
        assert_eq!(h.app.player.state().current_time, 100.0);
        assert_eq!(h.engine.calls().last(), Some(&Call::Seek(100.0)));
    }

    #[test]
    fn theme_is_persisted() {
        let mut h = Harness::new(1);
        h.app.cycle_theme();
        let saved = Config::load(&h.app.config_path).unwrap();
        assert_eq!(saved.theme, ThemeName::Emerald);
    }
}
