//! IPC listener that accepts events over a Unix socket.
//!
//! External tools (hotkey daemons, scripts, status bars) connect to the
//! socket and send newline-delimited JSON messages: intercepted key
//! chords to be resolved against the binding table, or commands to run
//! directly.

pub mod listener;
