//! Entry point for the **axtile** daemon.
//!
//! Spawns all configured [`EventSource`](axtile::traits::EventSource)s
//! on background threads and processes incoming events on the main
//! thread, one at a time.
//!
//! The binary ships with a no-op window system; a real backend
//! implements [`WindowSystem`](axtile::traits::WindowSystem) and is
//! plugged in here.

use axtile::config::Config;
use axtile::ipc::listener::UnixSocketListener;
use axtile::state::JsonStateFile;
use axtile::status::LogStatus;
use axtile::traits::{Event, EventSource, WindowSystem};
use axtile::wm::TilingWm;
use log::{error, info};
use std::sync::mpsc;
use std::time::Duration;

/// Default socket path for the event listener.
fn default_socket_path() -> String {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    format!("{}/axtile.sock", runtime)
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/axtile`).
fn config_dir() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    std::path::PathBuf::from(base).join("axtile")
}

/// Try to load the config from `$XDG_CONFIG_HOME/axtile/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Tick source

mod tick {
    use axtile::traits::{Event, EventSource};
    use std::sync::mpsc;
    use std::time::Duration;

    /// Emits [`Event::Tick`] at a fixed interval, driving reconciliation.
    pub struct TickSource {
        interval: Duration,
    }

    impl TickSource {
        pub fn new(interval: Duration) -> Self {
            Self { interval }
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("tick source error")]
    pub struct TickError;

    impl EventSource for TickSource {
        type Error = TickError;

        fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), TickError> {
            loop {
                std::thread::sleep(self.interval);
                if sink.send(Event::Tick).is_err() {
                    return Ok(());
                }
            }
        }
    }
}

//  No-op window system

mod noop_ws {
    use axtile::geometry::{Point, Rect, Size};
    use axtile::traits::{DisplayInfo, WindowId, WindowInfo, WindowSystem};

    /// Backend stub: one display, no windows, every mutation succeeds.
    pub struct NoopWindowSystem;

    #[derive(Debug, thiserror::Error)]
    #[error("noop")]
    pub struct NoopError;

    impl WindowSystem for NoopWindowSystem {
        type Error = NoopError;

        fn displays(&self) -> Result<Vec<DisplayInfo>, NoopError> {
            Ok(vec![DisplayInfo {
                id: 1,
                rect: Rect::new(0, 0, 1920, 1080),
                primary: true,
            }])
        }

        fn windows(&self) -> Result<Vec<WindowInfo>, NoopError> {
            Ok(Vec::new())
        }

        fn is_manageable(&self, _: WindowId) -> Result<bool, NoopError> {
            Ok(false)
        }

        fn frame(&self, _: WindowId) -> Result<Rect, NoopError> {
            Err(NoopError)
        }

        fn set_position(&self, _: WindowId, _: Point) -> Result<(), NoopError> {
            Ok(())
        }

        fn set_size(&self, _: WindowId, _: Size) -> Result<(), NoopError> {
            Ok(())
        }

        fn title(&self, _: WindowId) -> Result<String, NoopError> {
            Ok(String::new())
        }

        fn app_name(&self, _: i32) -> Result<Option<String>, NoopError> {
            Ok(None)
        }

        fn request_close(&self, _: WindowId) -> Result<(), NoopError> {
            Ok(())
        }

        fn raise(&self, _: WindowId, _: i32) -> Result<(), NoopError> {
            Ok(())
        }

        fn spawn(&self, argv: &[String]) -> Result<(), NoopError> {
            log::info!("would spawn {:?}", argv);
            Ok(())
        }
    }
}

//  Main

fn main() {
    env_logger::init();

    let config = load_config();
    run_daemon(noop_ws::NoopWindowSystem, config);
}

fn run_daemon<W: WindowSystem>(ws: W, config: Config) {
    let _ = std::fs::create_dir_all(config_dir());
    let store = JsonStateFile::new(config_dir().join("state.json"));

    let mut wm = match TilingWm::new(ws, store, LogStatus, &config) {
        Ok(wm) => wm,
        Err(e) => {
            error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let (event_tx, event_rx) = mpsc::channel::<Event>();
    spawn_event_sources(event_tx);

    info!("axtile running");
    for event in event_rx {
        if let Err(e) = wm.handle_event(event) {
            error!("event error: {}", e);
        }
        if !wm.running() {
            break;
        }
    }
    info!("event loop finished, exiting");
}

//  Helpers

fn spawn_event_sources(tx: mpsc::Sender<Event>) {
    {
        let tx = tx.clone();
        let path = default_socket_path();
        std::thread::spawn(move || {
            let mut source = UnixSocketListener::new(&path);
            if let Err(e) = source.run(tx) {
                error!("socket listener error: {}", e);
            }
        });
    }

    {
        let tx = tx.clone();
        std::thread::spawn(move || {
            let mut source = tick::TickSource::new(Duration::from_secs(1));
            let _ = source.run(tx);
        });
    }

    drop(tx);
}
