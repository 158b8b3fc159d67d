//! Unix-socket [`EventSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is parsed as a JSON-encoded [`Message`].
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"Key":{"mods":["alt"],"key":"j"}}
//! {"Key":{"mods":["alt","shift"],"key":"1"}}
//! {"Command":"FocusNext"}
//! {"Command":{"View":4}}
//! {"Command":{"Spawn":["open","-a","Ghostty"]}}
//! ```

use crate::command::{Command, KeyChord};
use crate::traits::{Event, EventSource};
use log::{debug, error, info};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// One line on the wire: a raw key chord or a direct command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum Message {
    Key(KeyChord),
    Command(Command),
}

impl From<Message> for Event {
    fn from(msg: Message) -> Event {
        match msg {
            Message::Key(chord) => Event::Key(chord),
            Message::Command(cmd) => Event::Command(cmd),
        }
    }
}

/// An [`EventSource`] that listens on a Unix stream socket for
/// JSON-encoded messages.
///
/// Each accepted connection can send multiple newline-delimited JSON
/// messages.  When the connection closes, the listener waits for the
/// next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](EventSource::run) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** indefinitely.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    let reader = BufReader::new(stream);
                    for line in reader.lines() {
                        match line {
                            Ok(ref text) if text.trim().is_empty() => continue,
                            Ok(text) => match serde_json::from_str::<Message>(&text) {
                                Ok(msg) => {
                                    debug!("received {:?}", msg);
                                    if sink.send(msg.into()).is_err() {
                                        info!("sink closed, shutting down");
                                        return Ok(());
                                    }
                                }
                                Err(e) => {
                                    error!("bad message: {} ({})", text, e);
                                }
                            },
                            Err(e) => {
                                error!("read error: {}", e);
                                break;
                            }
                        }
                    }
                    debug!("client disconnected");
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
        Ok(())
    }
}

//  Tests
