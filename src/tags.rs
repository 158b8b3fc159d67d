//! Tags (workspaces) and the per-monitor view model.
//!
//! A [`TagMask`] is a bit-set over the configured number of tags; bit *k*
//! stands for workspace *k + 1*.  A client may carry several tags at once.
//!
//! Each [`Monitor`] permanently owns a slice of the tag space and keeps a
//! two-slot history of the tag combination it currently displays, so
//! switching back to the previously viewed workspace is a single slot
//! flip.  [`MonitorSet`] answers the collection-level questions: which
//! monitor owns a mask, which monitor a window frame lands on, and
//! whether a client is visible anywhere.

use crate::geometry::Rect;
use crate::traits::DisplayInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};

/// A set of tags, encoded as bits of a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMask(u32);

impl TagMask {
    pub const EMPTY: TagMask = TagMask(0);

    pub fn new(bits: u32) -> Self {
        TagMask(bits)
    }

    /// The mask containing only tag `index` (0-based).
    pub fn from_index(index: u32) -> Self {
        TagMask(1 << index)
    }

    /// The mask covering every tag in a `count`-tag configuration.
    /// Counts past the 32 bits of the mask saturate to a full mask.
    pub fn all(count: u32) -> Self {
        if count >= u32::BITS {
            TagMask(u32::MAX)
        } else {
            TagMask((1u32 << count) - 1)
        }
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: TagMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Drop any bits outside the configured tag space.
    pub fn clamp_to(self, full: TagMask) -> Self {
        TagMask(self.0 & full.0)
    }

    /// 1-based number of the lowest tag in the mask, or `None` when empty.
    /// This is the tag reported in the status summary.
    pub fn first_tag(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() + 1)
        }
    }
}

impl Default for TagMask {
    fn default() -> Self {
        TagMask::EMPTY
    }
}

impl BitAnd for TagMask {
    type Output = TagMask;
    fn bitand(self, rhs: TagMask) -> TagMask {
        TagMask(self.0 & rhs.0)
    }
}

impl BitOr for TagMask {
    type Output = TagMask;
    fn bitor(self, rhs: TagMask) -> TagMask {
        TagMask(self.0 | rhs.0)
    }
}

impl BitXor for TagMask {
    type Output = TagMask;
    fn bitxor(self, rhs: TagMask) -> TagMask {
        TagMask(self.0 ^ rhs.0)
    }
}

impl fmt::Display for TagMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

/// One display area with its owned tag slice and current view.
#[derive(Debug, Clone)]
pub struct Monitor {
    /// Display identifier from the window system.
    pub id: u32,
    /// Usable area on the virtual desktop.
    pub rect: Rect,
    /// Tags permanently assigned to this monitor.  Under a correct
    /// configuration no two monitors share a tag.
    pub owned: TagMask,
    /// Whether the window system reported this as the primary display.
    pub primary: bool,
    /// Two-slot view history; `selector` indexes the active slot.
    tagset: [TagMask; 2],
    selector: usize,
}

impl Monitor {
    /// Create a monitor viewing `initial` (both history slots start there).
    pub fn new(id: u32, rect: Rect, owned: TagMask, initial: TagMask, primary: bool) -> Self {
        Self {
            id,
            rect,
            owned,
            primary,
            tagset: [initial, initial],
            selector: 0,
        }
    }

    /// The tag combination currently displayed.
    pub fn active(&self) -> TagMask {
        self.tagset[self.selector]
    }

    /// Switch the view to `mask`.
    ///
    /// A request equal to the current view is a no-op and does **not**
    /// flip the history slot, so repeating a switch never eats the
    /// "toggle back to the last workspace" entry.  Returns whether the
    /// view changed.
    pub fn set_view(&mut self, mask: TagMask) -> bool {
        if self.active() == mask {
            return false;
        }
        self.selector ^= 1;
        self.tagset[self.selector] = mask;
        true
    }

    /// XOR `delta` into the current view.
    ///
    /// The result is committed only when it is non-empty and still
    /// intersects the monitor's owned tags; otherwise the state is left
    /// untouched.  The history slot never flips here — toggling tags in
    /// and out edits the current view in place.
    pub fn toggle_view(&mut self, delta: TagMask) -> bool {
        let next = self.active() ^ delta;
        if next.is_empty() || !next.intersects(self.owned) {
            return false;
        }
        self.tagset[self.selector] = next;
        true
    }
}

/// All monitors known to the window manager, in display-enumeration order.
#[derive(Debug, Clone)]
pub struct MonitorSet {
    monitors: Vec<Monitor>,
}

impl MonitorSet {
    pub fn new(monitors: Vec<Monitor>) -> Self {
        Self { monitors }
    }

    /// Build the set from enumerated displays.
    ///
    /// The primary display receives `primary_tags`, every other display
    /// receives `secondary_tags`; each starts out viewing the lowest tag
    /// it owns.
    pub fn from_displays(
        displays: &[DisplayInfo],
        primary_tags: TagMask,
        secondary_tags: TagMask,
    ) -> Self {
        let monitors = displays
            .iter()
            .map(|d| {
                let owned = if d.primary {
                    primary_tags
                } else {
                    secondary_tags
                };
                let initial = owned
                    .first_tag()
                    .map(|t| TagMask::from_index(t - 1))
                    .unwrap_or(TagMask::EMPTY);
                Monitor::new(d.id, d.rect, owned, initial, d.primary)
            })
            .collect();
        Self { monitors }
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Monitor> {
        self.monitors.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Monitor> {
        self.monitors.get(index)
    }

    /// Index of the primary monitor, falling back to the first one.
    pub fn primary_index(&self) -> usize {
        self.monitors
            .iter()
            .position(|m| m.primary)
            .unwrap_or(0)
    }

    /// The monitor owning any tag of `mask` (first match in enumeration
    /// order), falling back to the primary monitor.  The fallback should
    /// not occur under a correct partition; overlapping or incomplete
    /// partitions are undefined configuration.
    pub fn owner_of(&self, mask: TagMask) -> usize {
        self.monitors
            .iter()
            .position(|m| mask.intersects(m.owned))
            .unwrap_or_else(|| self.primary_index())
    }

    pub fn monitor(&self, index: usize) -> &Monitor {
        &self.monitors[index]
    }

    pub fn monitor_mut(&mut self, index: usize) -> &mut Monitor {
        &mut self.monitors[index]
    }

    /// The monitor containing most of `frame` (largest overlap area),
    /// falling back to the first monitor for fully off-screen frames.
    pub fn monitor_at(&self, frame: &Rect) -> usize {
        let mut best = 0;
        let mut best_overlap = 0i64;
        for (i, m) in self.monitors.iter().enumerate() {
            let overlap = frame.overlap_area(&m.rect);
            if overlap > best_overlap {
                best_overlap = overlap;
                best = i;
            }
        }
        best
    }

    /// Whether a client carrying `tags` is visible on *any* monitor's
    /// active view.  Monitor-scoped filtering additionally intersects
    /// with that monitor's owned tags.
    pub fn is_visible(&self, tags: TagMask) -> bool {
        self.monitors.iter().any(|m| tags.intersects(m.active()))
    }
}
