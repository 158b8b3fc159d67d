//! **axtile** — a keyboard-driven tiling window manager core.
//!
//! Windows are arranged automatically in a master/stack tiling (with
//! monocle and float alternatives) and grouped by *tags*: a client may
//! carry several workspaces at once, each monitor permanently owns a
//! slice of the tag space and displays one tag combination at a time.
//! The core holds no window-system coupling and never receives window
//! notifications; a periodic tick reconciles its registry against the
//! actual window list.
//!
//! # Architecture
//!
//! The crate is organised around four ports:
//!
//! * [`traits::WindowSystem`] — abstracts display and window access so
//!   the tiling logic is not coupled to any specific platform.
//! * [`traits::EventSource`] — abstracts the transport that delivers
//!   user-intent (a Unix socket, a key interceptor, a timer, …) so the
//!   main loop is not coupled to any specific IPC mechanism.
//! * [`traits::StateStore`] — durable per-application client state.
//! * [`traits::StatusSink`] — consumer of status summaries.
//!
//! Concrete implementations live in [`ipc`] (Unix-socket event
//! listener), [`state`] (JSON state file) and [`status`] (log sink);
//! the state machine itself is [`wm::TilingWm`].

pub mod client;
pub mod command;
pub mod config;
pub mod geometry;
pub mod ipc;
pub mod layout;
pub mod state;
pub mod status;
pub mod tags;
pub mod traits;
pub mod wm;
