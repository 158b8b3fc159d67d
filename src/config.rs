//! Application configuration.
//!
//! The configuration is loaded from a JSON file.  Every section is
//! optional — a minimal `{}` file is valid and all sections fall back to
//! their compiled-in defaults, which reproduce the classic setup: nine
//! tags, a 10px gap, a 0.55 master fraction, one master client, and the
//! alt-modifier binding set.
//!
//! # Example
//!
//! ```json
//! {
//!   "layout": { "mfact": 0.6, "nmaster": 2, "gap": 8 },
//!   "tags": { "count": 9, "primary": 31, "secondary": 480 },
//!   "rules": [ { "app": "Calculator", "floating": true } ],
//!   "bindings": [
//!     { "mods": ["alt"], "key": "j", "command": "FocusNext" }
//!   ]
//! }
//! ```

use crate::command::{Binding, BindingTable, Command, KeySym, ModMask, Rule, Side};
use crate::tags::TagMask;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Layout tunables.
    pub layout: LayoutConfig,

    /// Tag space and monitor partition.
    pub tags: TagConfig,

    /// Per-application placement rules, first substring match wins.
    pub rules: Vec<Rule>,

    /// Key bindings, first exact match wins.
    pub bindings: BindingTable,
}

/// Layout tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Master area fraction of the usable width.
    pub mfact: f32,
    /// Number of clients in the master area.
    pub nmaster: i32,
    /// Gap in pixels between windows and against monitor edges.
    pub gap: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            mfact: 0.55,
            nmaster: 1,
            gap: 10,
        }
    }
}

/// Tag space size and how tags are partitioned across monitors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// Number of workspaces.
    pub count: u32,
    /// Tags owned by the primary monitor.
    pub primary: TagMask,
    /// Tags owned by every other monitor.
    pub secondary: TagMask,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            count: 9,
            // Workspaces 1-5 on the primary monitor, 6-9 elsewhere.
            primary: TagMask::new(0b1_1111),
            secondary: TagMask::new(0b1_1110_0000),
        }
    }
}

impl TagConfig {
    /// The mask covering the whole configured tag space.
    pub fn full_mask(&self) -> TagMask {
        TagMask::all(self.count)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            tags: TagConfig::default(),
            rules: default_rules(),
            bindings: default_bindings(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate();
        Ok(config)
    }

    /// Sanity-check the partition; problems are logged, not repaired.
    /// Overlapping monitor partitions leave tag ownership undefined
    /// (first monitor wins), which is almost never what the user wants.
    pub fn validate(&self) {
        let full = self.tags.full_mask();
        if self.tags.primary.intersects(self.tags.secondary) {
            warn!(
                "monitor tag partitions overlap ({} & {}); ownership is first-match-wins",
                self.tags.primary, self.tags.secondary
            );
        }
        if self.tags.primary.bits() & !full.bits() != 0 {
            warn!(
                "primary partition names tags outside the {}-tag space",
                self.tags.count
            );
        }
        if self.tags.secondary.bits() & !full.bits() != 0 {
            warn!(
                "secondary partition names tags outside the {}-tag space",
                self.tags.count
            );
        }
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

/// Applications that should float by default.
fn default_rules() -> Vec<Rule> {
    ["System Preferences", "System Settings", "Calculator", "Preview"]
        .into_iter()
        .map(|app| Rule {
            app: app.to_string(),
            tags: TagMask::EMPTY,
            floating: true,
        })
        .collect()
}

fn bind(mods: ModMask, key: &str, command: Command) -> Binding {
    Binding {
        mods,
        key: KeySym::new(key),
        command,
    }
}

/// The compiled-in binding table (alt as the primary modifier).
fn default_bindings() -> BindingTable {
    let alt = ModMask::ALT;
    let alt_shift = ModMask::ALT | ModMask::SHIFT;
    let alt_ctrl = ModMask::ALT | ModMask::CTRL;

    let mut bindings = vec![
        bind(
            alt,
            "return",
            Command::Spawn(vec!["open".into(), "-a".into(), "Ghostty".into()]),
        ),
        bind(alt, "j", Command::FocusNext),
        bind(alt, "k", Command::FocusPrev),
        bind(alt_shift, "j", Command::SwapNext),
        bind(alt_shift, "k", Command::SwapPrev),
        bind(alt, "h", Command::SetMasterFraction(-0.05)),
        bind(alt, "l", Command::SetMasterFraction(0.05)),
        bind(alt, "i", Command::IncMasterCount(1)),
        bind(alt, "d", Command::IncMasterCount(-1)),
        bind(alt_shift, "c", Command::KillSelected),
        bind(alt, "t", Command::SetLayout(0)),
        bind(alt, "m", Command::SetLayout(1)),
        bind(alt, "f", Command::SetLayout(2)),
        bind(alt, "space", Command::CycleLayout),
        bind(alt_shift, "space", Command::ToggleFloating),
        bind(alt, "tab", Command::FocusLast),
        bind(alt, "comma", Command::FocusMonitor(Side::Left)),
        bind(alt, "period", Command::FocusMonitor(Side::Right)),
        bind(alt_shift, "q", Command::Quit),
    ];

    // View / move-to / toggle bindings for each tag digit.
    for tag in 0..TagConfig::default().count {
        let key = (tag + 1).to_string();
        let mask = TagMask::from_index(tag);
        bindings.push(bind(alt, &key, Command::View(mask)));
        bindings.push(bind(alt_shift, &key, Command::MoveToTag(mask)));
        bindings.push(bind(alt_ctrl, &key, Command::ToggleView(mask)));
    }

    BindingTable::new(bindings)
}
