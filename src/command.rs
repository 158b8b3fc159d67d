//! Commands and the static tables that produce them.
//!
//! This module defines the vocabulary shared by all components:
//! [`Command`] names every state transition the window manager can
//! perform, [`KeyChord`] + [`BindingTable`] map abstract input events to
//! commands, and [`Rule`] carries per-application placement overrides.
//!
//! Key symbols are abstract lowercase names ("j", "return", "space"), not
//! OS key codes; the input interceptor that translates hardware events
//! into chords lives outside this crate.

use crate::tags::TagMask;
use bitflags::bitflags;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Modifier keys held in a chord.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModMask: u8 {
        /// Option / Alt.
        const ALT   = 1 << 0;
        /// Command / Super.
        const CMD   = 1 << 1;
        const SHIFT = 1 << 2;
        const CTRL  = 1 << 3;
    }
}

/// Parse one modifier name (case-insensitive, with common aliases).
fn parse_modifier(s: &str) -> Option<ModMask> {
    match s.trim().to_lowercase().as_str() {
        "alt" | "opt" | "option" | "mod1" => Some(ModMask::ALT),
        "cmd" | "command" | "super" | "mod4" => Some(ModMask::CMD),
        "shift" => Some(ModMask::SHIFT),
        "ctrl" | "control" => Some(ModMask::CTRL),
        _ => None,
    }
}

fn modifier_name(m: ModMask) -> &'static str {
    match m {
        ModMask::ALT => "alt",
        ModMask::CMD => "cmd",
        ModMask::SHIFT => "shift",
        ModMask::CTRL => "ctrl",
        _ => "?",
    }
}

impl Serialize for ModMask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let names: Vec<&str> = self.iter().map(modifier_name).collect();
        names.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModMask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut mask = ModMask::empty();
        for name in &names {
            let m = parse_modifier(name)
                .ok_or_else(|| DeError::custom(format!("unknown modifier: {:?}", name)))?;
            mask |= m;
        }
        Ok(mask)
    }
}

/// An abstract key symbol, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct KeySym(String);

impl KeySym {
    pub fn new(name: impl AsRef<str>) -> Self {
        KeySym(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeySym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for KeySym {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.trim().is_empty() {
            return Err(DeError::custom("key symbol must not be empty"));
        }
        Ok(KeySym::new(s))
    }
}

/// A modifier set plus a key symbol — one abstract input event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChord {
    pub mods: ModMask,
    pub key: KeySym,
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in self.mods.iter() {
            write!(f, "{}+", modifier_name(m))?;
        }
        write!(f, "{}", self.key)
    }
}

/// Which neighbouring monitor a focus command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Every state transition the window manager can perform.
///
/// Commands are produced by [`BindingTable::resolve`] or arrive directly
/// from an [`EventSource`](crate::traits::EventSource), and are consumed
/// by [`TilingWm`](crate::wm::TilingWm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Launch a program; fire-and-forget, failure never affects core
    /// state.
    Spawn(Vec<String>),

    /// Focus the next visible client in registry order, wrapping around.
    FocusNext,

    /// Focus the previous visible client in registry order, wrapping
    /// around.
    FocusPrev,

    /// Focus the previously selected client, if it is still visible.
    FocusLast,

    /// Focus the first visible client on the nearest monitor to the left
    /// or right of the selected client's monitor.
    FocusMonitor(Side),

    /// Reorder the selected tiled client with its next visible tiled
    /// neighbour.
    SwapNext,

    /// Reorder the selected tiled client with its previous visible tiled
    /// neighbour.
    SwapPrev,

    /// Adjust the master-area fraction by a delta.  A delta that would
    /// push the fraction outside `0.1..=0.9` is rejected outright rather
    /// than clamped.
    SetMasterFraction(f32),

    /// Adjust the number of master-area clients, floored at zero.
    IncMasterCount(i32),

    /// Select the layout at the given index; out-of-range indices are
    /// ignored.
    SetLayout(usize),

    /// Advance to the next layout, wrapping.
    CycleLayout,

    /// Flip the selected client's floating flag.
    ToggleFloating,

    /// Re-tag the selected client with the given mask.
    MoveToTag(TagMask),

    /// Switch the owning monitor's view to the given mask.
    View(TagMask),

    /// XOR the given mask into the owning monitor's view.
    ToggleView(TagMask),

    /// Ask the selected window to close gracefully.  The client record is
    /// removed only once reconciliation observes the window gone.
    KillSelected,

    /// Shut the event loop down.
    Quit,
}

/// One entry of the binding table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub mods: ModMask,
    pub key: KeySym,
    pub command: Command,
}

/// An ordered list of key bindings, static for the process lifetime.
///
/// Resolution is an exact match on the modifier set and key symbol; the
/// first matching entry wins, and unmatched chords resolve to `None` so
/// the caller can pass the event through unhandled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn resolve(&self, chord: &KeyChord) -> Option<&Command> {
        self.bindings
            .iter()
            .find(|b| b.mods == chord.mods && b.key == chord.key)
            .map(|b| &b.command)
    }
}

/// Per-application placement override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Substring matched against the application display name.
    pub app: String,
    /// Tags to assign; the empty mask means "keep the default tags".
    #[serde(default)]
    pub tags: TagMask,
    /// Floating flag, applied unconditionally when the rule matches.
    #[serde(default)]
    pub floating: bool,
}

/// Find the first rule whose `app` substring occurs in `app_name`.
pub fn matching_rule<'a>(rules: &'a [Rule], app_name: &str) -> Option<&'a Rule> {
    rules.iter().find(|r| app_name.contains(r.app.as_str()))
}
