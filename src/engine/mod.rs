//! Playback handle abstraction.
//!
//! The store never talks to an audio backend directly. It issues commands
//! through [`PlaybackEngine`] and reacts to [`EngineEvent`]s delivered on a
//! channel, so transitions can be driven by hand in tests.

pub mod mpv;

use crate::error::EngineError;

/// Identifies one `play` request. Only the most recent request may change
/// player state when it resolves.
pub type RequestId = u64;

/// Events emitted by the playback handle.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Playback position advanced.
    TimeUpdate { position: f64 },
    /// Duration of the new source is known.
    MetadataReady { duration: f64 },
    /// A new source started loading.
    LoadStarted,
    /// The source played to its end.
    Ended,
    /// A `play` request completed.
    PlayResolved {
        request: RequestId,
        result: Result<(), EngineError>,
    },
    /// The current source could not be loaded or decoded.
    Failed { message: String },
}

/// Imperative side of the playback handle.
///
/// Implementations own exactly one handle, created on first use. None of
/// these calls may block on the handle; results arrive as events.
pub trait PlaybackEngine {
    fn load(&mut self, url: &str);
    fn play(&mut self, request: RequestId);
    fn pause(&mut self);
    fn seek(&mut self, position: f64);
    fn set_volume(&mut self, level: f64);
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{PlaybackEngine, RequestId};

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Call {
        Load(String),
        Play(RequestId),
        Pause,
        Seek(f64),
        Volume(f64),
    }

    /// Records every command; tests feed events to the store themselves.
    #[derive(Clone, Default)]
    pub(crate) struct FakeEngine {
        pub(crate) calls: Rc<RefCell<Vec<Call>>>,
    }

    impl FakeEngine {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        pub(crate) fn loads(&self) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|c| matches!(c, Call::Load(_)))
                .count()
        }

        pub(crate) fn last_play(&self) -> Option<RequestId> {
            self.calls.borrow().iter().rev().find_map(|c| match c {
                Call::Play(r) => Some(*r),
                _ => None,
            })
        }

        pub(crate) fn clear(&self) {
            self.calls.borrow_mut().clear();
        }
    }

    impl PlaybackEngine for FakeEngine {
        fn load(&mut self, url: &str) {
            self.calls.borrow_mut().push(Call::Load(url.to_string()));
        }

        fn play(&mut self, request: RequestId) {
            self.calls.borrow_mut().push(Call::Play(request));
        }

        fn pause(&mut self) {
            self.calls.borrow_mut().push(Call::Pause);
        }

        fn seek(&mut self, position: f64) {
            self.calls.borrow_mut().push(Call::Seek(position));
        }

        fn set_volume(&mut self, level: f64) {
            self.calls.borrow_mut().push(Call::Volume(level));
        }
    }
}
