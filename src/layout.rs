//! Layout algorithms.
//!
//! A layout is a pure function from (monitor rectangle, layout
//! parameters, tiled-client count) to one rectangle per client, in the
//! order the caller iterates its clients.  Nothing here touches the
//! window system; the orchestrator applies the computed geometry through
//! the port.
//!
//! One layout is active per process — every monitor renders with the
//! same algorithm, parameterized by its own rectangle and client subset.

use crate::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Off-screen sentinel where hidden (not-visible-anywhere) windows are
/// parked before each arrange pass.
pub const HIDDEN_POS: Point = Point { x: -10000, y: -10000 };

/// The available arrangement algorithms, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Master column plus stack column.
    Tile,
    /// Every tiled client maximized to the monitor bounds; the window
    /// server's z-order decides what is actually seen.
    Monocle,
    /// No-op arrangement: floating clients keep operator-set geometry.
    Float,
}

pub const LAYOUTS: [Layout; 3] = [Layout::Tile, Layout::Monocle, Layout::Float];

impl Layout {
    /// Status-surface symbol for this layout.
    pub fn symbol(self) -> &'static str {
        match self {
            Layout::Tile => "[]=",
            Layout::Monocle => "[M]",
            Layout::Float => "><>",
        }
    }

    pub fn from_index(index: usize) -> Option<Layout> {
        LAYOUTS.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Layout::Tile => 0,
            Layout::Monocle => 1,
            Layout::Float => 2,
        }
    }

    /// The next layout in cycle order, wrapping.
    pub fn next(self) -> Layout {
        LAYOUTS[(self.index() + 1) % LAYOUTS.len()]
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Tunables shared by all layouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Pixels between windows and against monitor edges.
    pub gap: i32,
    /// Fraction of the usable width given to the master column.
    pub mfact: f32,
    /// Number of clients kept in the master column.
    pub nmaster: i32,
}

/// Compute geometry for `count` tiled clients on `mon`.
///
/// Returns `None` for the floating layout (no geometry is recomputed)
/// and for `count == 0`; otherwise exactly `count` rectangles in client
/// order.
pub fn arrange(layout: Layout, mon: &Rect, params: &LayoutParams, count: usize) -> Option<Vec<Rect>> {
    if count == 0 {
        return None;
    }
    match layout {
        Layout::Tile => Some(tile(mon, params, count)),
        Layout::Monocle => Some(monocle(mon, params, count)),
        Layout::Float => None,
    }
}

/// Master/stack tiling.
///
/// With `n <= nmaster` every client lands in a single full-width column.
/// Otherwise the first `nmaster` clients form a left column of width
/// `mfact * (W - 3*gap)` and the rest share the residual width on the
/// right.  All rectangles are inset by `gap` on all sides and between
/// siblings; divisions truncate.
fn tile(mon: &Rect, params: &LayoutParams, count: usize) -> Vec<Rect> {
    let gap = params.gap;
    let n = count as i32;
    let nmaster = params.nmaster.max(0);

    let mx = mon.x + gap;
    let my = mon.y + gap;

    let mut rects = Vec::with_capacity(count);

    if n <= nmaster {
        // All in master: one full-width column.
        let mw = mon.width - 2 * gap;
        let mh = (mon.height - (n + 1) * gap) / n;
        for i in 0..n {
            rects.push(Rect::new(mx, my + i * (mh + gap), mw, mh));
        }
        return rects;
    }

    // Master column; zero masters collapses it so the stack spans the
    // full width.
    let mw = if nmaster > 0 {
        ((mon.width - 3 * gap) as f32 * params.mfact) as i32
    } else {
        0
    };
    let (sx, sw) = if nmaster > 0 {
        (mx + mw + gap, mon.width - mw - 3 * gap)
    } else {
        (mx, mon.width - 2 * gap)
    };
    let sy = my;
    let stack_n = n - nmaster;
    let sh = (mon.height - (stack_n + 1) * gap) / stack_n;

    for i in 0..n {
        if i < nmaster {
            let mh = (mon.height - (nmaster + 1) * gap) / nmaster;
            rects.push(Rect::new(mx, my + i * (mh + gap), mw, mh));
        } else {
            let row = i - nmaster;
            rects.push(Rect::new(sx, sy + row * (sh + gap), sw, sh));
        }
    }
    rects
}

/// Every client gets the monitor rectangle inset by the gap.
fn monocle(mon: &Rect, params: &LayoutParams, count: usize) -> Vec<Rect> {
    let gap = params.gap;
    let maximized = Rect::new(
        mon.x + gap,
        mon.y + gap,
        mon.width - 2 * gap,
        mon.height - 2 * gap,
    );
    vec![maximized; count]
}
