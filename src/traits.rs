//! Core traits that decouple the workspace/layout engine from any
//! specific operating system or transport mechanism.
//!
//! Every concrete backend (a macOS Accessibility bridge, a Unix-socket
//! listener, a test harness, …) implements one of these traits.  The
//! [`TilingWm`](crate::wm::TilingWm) only depends on these abstractions
//! and never touches the OS directly.

use crate::command::{Command, KeyChord};
use crate::geometry::{Point, Rect, Size};
use crate::state::StateSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::mpsc;

/// Opaque handle to an on-screen window.  The window system owns the
/// underlying resource; the core only stores the handle and a counted
/// reference is retained by the backend for the client's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One row of the on-screen window enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    /// Owning process.
    pub pid: i32,
    /// Window-server layer; only layer 0 holds ordinary application
    /// windows.
    pub layer: i32,
}

/// One row of the display enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    pub id: u32,
    /// Usable area on the virtual desktop.
    pub rect: Rect,
    pub primary: bool,
}

/// Abstraction over the window system: geometry reads and writes, window
/// lifecycle requests, and enumeration.
///
/// An implementation might talk to the OS accessibility layer, or it
/// might be a recording stub used in tests.  Calls are synchronous and
/// may block briefly on OS IPC; implementations should apply best-effort
/// timeouts so one unresponsive application cannot stall the event loop
/// indefinitely.
pub trait WindowSystem {
    /// The error type produced by this window system.
    type Error: std::error::Error + Send + 'static;

    /// Enumerate the active displays.
    fn displays(&self) -> Result<Vec<DisplayInfo>, Self::Error>;

    /// Enumerate on-screen windows, including ones the manager does not
    /// manage yet.
    fn windows(&self) -> Result<Vec<WindowInfo>, Self::Error>;

    /// Whether the window is an ordinary, non-minimized application
    /// window the manager should tile.
    fn is_manageable(&self, win: WindowId) -> Result<bool, Self::Error>;

    /// Current frame of the window.
    fn frame(&self, win: WindowId) -> Result<Rect, Self::Error>;

    fn set_position(&self, win: WindowId, pos: Point) -> Result<(), Self::Error>;

    fn set_size(&self, win: WindowId, size: Size) -> Result<(), Self::Error>;

    /// Window title, for the status summary.
    fn title(&self, win: WindowId) -> Result<String, Self::Error>;

    /// Display name of the owning application, or `None` when the
    /// process cannot be resolved.  Keys the rule table and the
    /// persisted-state snapshot.
    fn app_name(&self, pid: i32) -> Result<Option<String>, Self::Error>;

    /// Ask the window to close gracefully (press its close control).
    fn request_close(&self, win: WindowId) -> Result<(), Self::Error>;

    /// Raise the window and bring its owning application frontmost.
    fn raise(&self, win: WindowId, pid: i32) -> Result<(), Self::Error>;

    /// Launch a program.  Fire-and-forget: a failed spawn is the
    /// backend's problem, never the core's.
    fn spawn(&self, argv: &[String]) -> Result<(), Self::Error>;
}

/// External events funneled into the single-threaded processing loop.
///
/// Both asynchronous sources — the input interceptor and the periodic
/// timer — produce values of this type into one mpsc channel, so no two
/// state transitions ever interleave.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An intercepted key chord, to be resolved against the binding
    /// table.
    Key(KeyChord),
    /// A command delivered directly (e.g. over the control socket).
    Command(Command),
    /// Periodic reconciliation tick.
    Tick,
}

/// A source of [`Event`]s.
///
/// Implementations listen on some transport — a Unix socket, an OS event
/// tap, a timer, an in-memory channel — and forward events into the
/// provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source is exhausted
///   or an unrecoverable error occurs.
/// * Each received event must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated
///   thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Event`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error>;
}

/// Durable storage for per-application client state.
///
/// The snapshot maps an application's display name to its tags and
/// floating flag.  Writes are eager (after every tag move or float
/// toggle) and last-writer-wins; reads are lazy (once per newly managed
/// client).  The error policy is baked into the contract: a load that
/// fails or parses badly yields an empty snapshot, and a failed store is
/// logged by the implementation — persistence trouble never propagates
/// into the core.
pub trait StateStore {
    /// Read the snapshot, falling back to an empty one on any error.
    fn load(&self) -> StateSnapshot;

    /// Write the snapshot, best-effort.
    fn store(&self, snapshot: &StateSnapshot);
}

/// The status tuple emitted after every re-arrange or focus change, for
/// display by an external status surface (menu bar, log, …).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    /// 1-based number of the focused monitor's first viewed tag.
    pub tag: u32,
    /// Active layout symbol, e.g. `[]=`.
    pub layout: &'static str,
    /// Title of the selected window, if any.
    pub window: Option<String>,
}

/// Consumer of [`StatusSummary`] updates.
pub trait StatusSink {
    fn update(&self, status: &StatusSummary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, KeySym, ModMask};
    use std::cell::RefCell;

    /// A test double that records every geometry call made to it.
    #[derive(Debug, Default)]
    struct RecordingWs {
        moves: RefCell<Vec<(WindowId, Point)>>,
        resizes: RefCell<Vec<(WindowId, Size)>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recording error")]
    struct RecordingErr;

    impl WindowSystem for RecordingWs {
        type Error = RecordingErr;

        fn displays(&self) -> Result<Vec<DisplayInfo>, RecordingErr> {
            Ok(vec![DisplayInfo {
                id: 1,
                rect: Rect::new(0, 0, 1920, 1080),
                primary: true,
            }])
        }

        fn windows(&self) -> Result<Vec<WindowInfo>, RecordingErr> {
            Ok(Vec::new())
        }

        fn is_manageable(&self, _win: WindowId) -> Result<bool, RecordingErr> {
            Ok(true)
        }

        fn frame(&self, _win: WindowId) -> Result<Rect, RecordingErr> {
            Ok(Rect::new(0, 0, 640, 480))
        }

        fn set_position(&self, win: WindowId, pos: Point) -> Result<(), RecordingErr> {
            self.moves.borrow_mut().push((win, pos));
            Ok(())
        }

        fn set_size(&self, win: WindowId, size: Size) -> Result<(), RecordingErr> {
            self.resizes.borrow_mut().push((win, size));
            Ok(())
        }

        fn title(&self, _win: WindowId) -> Result<String, RecordingErr> {
            Ok("mock".into())
        }

        fn app_name(&self, _pid: i32) -> Result<Option<String>, RecordingErr> {
            Ok(Some("MockApp".into()))
        }

        fn request_close(&self, _win: WindowId) -> Result<(), RecordingErr> {
            Ok(())
        }

        fn raise(&self, _win: WindowId, _pid: i32) -> Result<(), RecordingErr> {
            Ok(())
        }

        fn spawn(&self, _argv: &[String]) -> Result<(), RecordingErr> {
            Ok(())
        }
    }

    #[test]
    fn recording_ws_logs_geometry_calls() {
        let ws = RecordingWs::default();
        ws.set_position(WindowId(1), Point::new(10, 20)).unwrap();
        ws.set_size(WindowId(1), Size::new(300, 200)).unwrap();
        assert_eq!(ws.moves.borrow().len(), 1);
        assert_eq!(ws.moves.borrow()[0], (WindowId(1), Point::new(10, 20)));
        assert_eq!(ws.resizes.borrow().len(), 1);
    }

    /// A test double that emits a fixed sequence of events.
    struct FixedSource {
        events: Vec<Event>,
    }

    impl EventSource for FixedSource {
        type Error = RecordingErr;

        fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), RecordingErr> {
            for ev in self.events.drain(..) {
                let _ = sink.send(ev);
            }
            Ok(())
        }
    }

    #[test]
    fn fixed_source_emits_events_in_order() {
        let mut src = FixedSource {
            events: vec![
                Event::Key(KeyChord {
                    mods: ModMask::ALT,
                    key: KeySym::new("j"),
                }),
                Event::Command(Command::Quit),
                Event::Tick,
            ],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], Event::Command(Command::Quit));
        assert_eq!(events[2], Event::Tick);
    }
}
