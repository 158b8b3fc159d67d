//! The window manager core.
//!
//! [`TilingWm`] owns every piece of mutable state — the client registry,
//! the monitor set, the active layout and its parameters, the focus pair
//! — and advances it one [`Event`] at a time.  It talks to the outside
//! world exclusively through the [`WindowSystem`], [`StateStore`] and
//! [`StatusSink`] ports, so the whole state machine runs unchanged
//! against a real backend or an in-memory mock.
//!
//! The core never receives window notifications.  Instead a periodic
//! [`Event::Tick`] triggers [`reconcile`](TilingWm::reconcile), which
//! diffs the window system's current window list against the registry:
//! new windows are managed, vanished windows are unmanaged, and a
//! re-created handle with the same process and frame is recognized as
//! the same client.

use crate::client::{Client, ClientRegistry};
use crate::command::{matching_rule, BindingTable, Command, KeyChord, Rule, Side};
use crate::config::Config;
use crate::geometry::Rect;
use crate::layout::{self, Layout, LayoutParams, HIDDEN_POS};
use crate::state::{ClientState, StateSnapshot};
use crate::tags::{MonitorSet, TagMask};
use crate::traits::{
    Event, StateStore, StatusSink, StatusSummary, WindowId, WindowInfo, WindowSystem,
};
use log::{debug, info, warn};
use std::collections::HashSet;

/// Errors produced by the window manager core.
#[derive(Debug, thiserror::Error)]
pub enum WmError {
    /// The window system failed underneath us.
    #[error("window system error: {0}")]
    WindowSystem(String),

    /// The window system reported no displays at startup.
    #[error("no displays found")]
    NoDisplays,
}

/// The tiling window manager state machine.
///
/// Generic over its three ports so tests can substitute recording mocks.
pub struct TilingWm<W: WindowSystem, S: StateStore, T: StatusSink> {
    ws: W,
    store: S,
    status: T,

    bindings: BindingTable,
    rules: Vec<Rule>,
    full_tags: TagMask,

    registry: ClientRegistry,
    monitors: MonitorSet,
    layout: Layout,
    params: LayoutParams,

    /// Selected client and the one selected before it.
    sel: Option<WindowId>,
    last_sel: Option<WindowId>,
    /// Monitor that owns the selection (or was last focused).
    sel_monitor: usize,

    /// Forces a re-arrange on the next reconciliation even when the
    /// window count is unchanged.  Raised when a geometry write failed
    /// so the arrange is retried instead of leaving a stale frame.
    windows_changed: bool,
    running: bool,

    snapshot: StateSnapshot,
}

impl<W: WindowSystem, S: StateStore, T: StatusSink> TilingWm<W, S, T> {
    /// Create the core: enumerate displays, partition the tag space
    /// across them, and load the persisted client state.
    ///
    /// A window system that cannot even enumerate displays is fatal.
    pub fn new(ws: W, store: S, status: T, config: &Config) -> Result<Self, WmError> {
        let displays = ws
            .displays()
            .map_err(|e| WmError::WindowSystem(e.to_string()))?;
        if displays.is_empty() {
            return Err(WmError::NoDisplays);
        }

        let full_tags = config.tags.full_mask();
        let monitors = MonitorSet::from_displays(
            &displays,
            config.tags.primary.clamp_to(full_tags),
            config.tags.secondary.clamp_to(full_tags),
        );
        let snapshot = store.load();
        info!(
            "managing {} monitor(s) across {} tags ({} saved client state(s))",
            monitors.len(),
            config.tags.count,
            snapshot.len()
        );

        Ok(Self {
            ws,
            store,
            status,
            bindings: config.bindings.clone(),
            rules: config.rules.clone(),
            full_tags,
            registry: ClientRegistry::new(),
            sel_monitor: monitors.primary_index(),
            monitors,
            layout: Layout::Tile,
            params: LayoutParams {
                gap: config.layout.gap,
                mfact: config.layout.mfact,
                nmaster: config.layout.nmaster,
            },
            sel: None,
            last_sel: None,
            windows_changed: false,
            running: true,
            snapshot,
        })
    }

    /// Whether the event loop should keep draining events.
    pub fn running(&self) -> bool {
        self.running
    }

    /// The currently selected client, if any.
    pub fn selected(&self) -> Option<WindowId> {
        self.sel
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn monitors(&self) -> &MonitorSet {
        &self.monitors
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Advance the state machine by one event.
    pub fn handle_event(&mut self, event: Event) -> Result<(), WmError> {
        match event {
            Event::Key(chord) => self.handle_key(&chord),
            Event::Command(cmd) => self.handle_command(&cmd),
            Event::Tick => self.reconcile(),
        }
    }

    /// Resolve a key chord against the binding table and run the bound
    /// command.  Unbound chords are ignored so the interceptor can pass
    /// them through to the focused application.
    pub fn handle_key(&mut self, chord: &KeyChord) -> Result<(), WmError> {
        match self.bindings.resolve(chord).cloned() {
            Some(cmd) => self.handle_command(&cmd),
            None => {
                debug!("unbound chord {}", chord);
                Ok(())
            }
        }
    }

    /// Execute one command.
    pub fn handle_command(&mut self, cmd: &Command) -> Result<(), WmError> {
        debug!("command: {:?}", cmd);
        match cmd {
            Command::Spawn(argv) => {
                if argv.is_empty() {
                    warn!("spawn with empty argv");
                } else if let Err(e) = self.ws.spawn(argv) {
                    warn!("spawn {:?} failed: {}", argv, e);
                }
            }
            Command::FocusNext => self.focus_relative(1),
            Command::FocusPrev => self.focus_relative(-1),
            Command::FocusLast => self.focus_last(),
            Command::FocusMonitor(side) => self.focus_monitor(*side),
            Command::SwapNext => self.swap_relative(1),
            Command::SwapPrev => self.swap_relative(-1),
            Command::SetMasterFraction(delta) => {
                let f = self.params.mfact + delta;
                if !(0.1..=0.9).contains(&f) {
                    debug!("master fraction {:.2} out of range, ignoring", f);
                } else {
                    self.params.mfact = f;
                    self.arrange();
                }
            }
            Command::IncMasterCount(delta) => {
                self.params.nmaster = (self.params.nmaster + delta).max(0);
                self.arrange();
            }
            Command::SetLayout(index) => match Layout::from_index(*index) {
                Some(l) => {
                    self.layout = l;
                    self.arrange();
                }
                None => warn!("no layout at index {}", index),
            },
            Command::CycleLayout => {
                self.layout = self.layout.next();
                self.arrange();
            }
            Command::ToggleFloating => self.toggle_floating(),
            Command::MoveToTag(mask) => self.move_to_tag(*mask),
            Command::View(mask) => self.view(*mask),
            Command::ToggleView(mask) => self.toggle_view(*mask),
            Command::KillSelected => {
                // The record stays until reconciliation sees the window
                // gone; applications may refuse or delay the close.
                if let Some(id) = self.sel {
                    if let Err(e) = self.ws.request_close(id) {
                        warn!("close request for {} failed: {}", id, e);
                    }
                }
            }
            Command::Quit => {
                info!("shutting down");
                self.running = false;
            }
        }
        Ok(())
    }

    /// Diff the window system's window list against the registry.
    ///
    /// New manageable windows on layer 0 are managed; registry entries
    /// whose window no longer exists are dropped.  A window whose handle
    /// was recreated (same process, byte-identical frame, old handle
    /// dead) is re-keyed in place so its tags and floating flag survive.
    /// Re-arranges only when something actually changed.
    pub fn reconcile(&mut self) -> Result<(), WmError> {
        let windows = self
            .ws
            .windows()
            .map_err(|e| WmError::WindowSystem(e.to_string()))?;
        let live: HashSet<WindowId> = windows.iter().map(|w| w.id).collect();
        let mut seen: HashSet<WindowId> = HashSet::new();
        let mut changed = std::mem::take(&mut self.windows_changed);

        for win in &windows {
            if win.layer != 0 {
                continue;
            }
            if self.registry.contains(win.id) {
                seen.insert(win.id);
                continue;
            }
            match self.ws.is_manageable(win.id) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("skipping {}: {}", win.id, e);
                    continue;
                }
            }
            let frame = match self.ws.frame(win.id) {
                Ok(f) => f,
                Err(e) => {
                    debug!("no frame for {}: {}", win.id, e);
                    continue;
                }
            };

            let rekey = self
                .registry
                .iter()
                .find(|c| c.pid == win.pid && c.frame == frame && !live.contains(&c.window))
                .map(|c| c.window);
            if let Some(old) = rekey {
                debug!("window {} re-appeared as {}", old, win.id);
                if let Some(c) = self.registry.get_mut(old) {
                    c.window = win.id;
                }
                if self.sel == Some(old) {
                    self.sel = Some(win.id);
                }
                if self.last_sel == Some(old) {
                    self.last_sel = Some(win.id);
                }
                seen.insert(win.id);
                changed = true;
                continue;
            }

            self.manage(win, frame);
            seen.insert(win.id);
            changed = true;
        }

        for id in self.registry.ids() {
            if !seen.contains(&id) {
                self.unmanage(id);
                changed = true;
            }
        }

        if changed {
            self.refocus();
            self.arrange();
        }
        Ok(())
    }

    /// Start tracking a window.
    ///
    /// Tags default to the active view of the monitor under the frame,
    /// then a matching rule applies (tags only when it names some,
    /// floating unconditionally), then saved state applies with the same
    /// override shape.
    fn manage(&mut self, win: &WindowInfo, frame: Rect) {
        let app = match self.ws.app_name(win.pid) {
            Ok(Some(name)) => name,
            Ok(None) => String::new(),
            Err(e) => {
                debug!("no app name for pid {}: {}", win.pid, e);
                String::new()
            }
        };
        let title = self.ws.title(win.id).unwrap_or_default();

        let mon_idx = self.monitors.monitor_at(&frame);
        let default_tags = self.monitors.monitor(mon_idx).active();
        let mut tags = default_tags;
        let mut floating = false;

        if let Some(rule) = matching_rule(&self.rules, &app) {
            floating = rule.floating;
            if !rule.tags.is_empty() {
                tags = rule.tags;
            }
        }
        if !app.is_empty() {
            if let Some(saved) = self.snapshot.get(&app) {
                floating = saved.floating;
                if !saved.tags.is_empty() {
                    tags = saved.tags;
                }
            }
        }

        let tags = {
            let clamped = tags.clamp_to(self.full_tags);
            if clamped.is_empty() {
                default_tags
            } else {
                clamped
            }
        };

        info!(
            "managing {} ({:?}) tags {} floating {}",
            win.id, app, tags, floating
        );
        self.registry.insert(Client {
            window: win.id,
            pid: win.pid,
            app,
            title,
            tags,
            floating,
            frame,
        });
    }

    fn unmanage(&mut self, id: WindowId) {
        if let Some(c) = self.registry.remove(id) {
            info!("unmanaging {} ({:?})", id, c.app);
        }
        if self.sel == Some(id) {
            self.sel = None;
        }
        if self.last_sel == Some(id) {
            self.last_sel = None;
        }
    }

    /// Apply geometry: hide invisible clients off-screen, restore visible
    /// ones, then lay out the tiled clients of each monitor.  Emits a
    /// status update afterwards.
    fn arrange(&mut self) {
        let mut retry = false;

        for id in self
            .registry
            .iter()
            .filter(|c| !self.monitors.is_visible(c.tags))
            .map(|c| c.window)
            .collect::<Vec<_>>()
        {
            if let Err(e) = self.ws.set_position(id, HIDDEN_POS) {
                warn!("failed to hide {}: {}", id, e);
                retry = true;
            }
        }

        for idx in 0..self.monitors.len() {
            let mon_rect = self.monitors.monitor(idx).rect;
            let visible = self.visible_on(idx);

            // Visible clients come back from the hidden position first;
            // tiling then overrides the tiled ones.
            for &(id, _) in &visible {
                if let Some(c) = self.registry.get(id) {
                    if let Err(e) = self.ws.set_position(id, c.frame.origin()) {
                        warn!("failed to place {}: {}", id, e);
                        retry = true;
                    }
                }
            }

            let tiled: Vec<WindowId> = visible
                .iter()
                .filter(|&&(_, floating)| !floating)
                .map(|&(id, _)| id)
                .collect();
            if let Some(rects) = layout::arrange(self.layout, &mon_rect, &self.params, tiled.len())
            {
                for (&id, rect) in tiled.iter().zip(rects) {
                    if let Err(e) = self.ws.set_position(id, rect.origin()) {
                        warn!("failed to move {}: {}", id, e);
                        retry = true;
                    }
                    if let Err(e) = self.ws.set_size(id, rect.size()) {
                        warn!("failed to resize {}: {}", id, e);
                        retry = true;
                    }
                    if let Some(c) = self.registry.get_mut(id) {
                        c.frame = rect;
                    }
                }
            }
        }

        // A partially applied arrange is retried on the next tick.
        self.windows_changed |= retry;
        self.emit_status();
    }

    /// Visible clients on monitor `idx` in registry (newest-first) order,
    /// with their floating flag.  A client whose tags span both
    /// partitions shows up on every owning monitor.
    fn visible_on(&self, idx: usize) -> Vec<(WindowId, bool)> {
        let Some(mon) = self.monitors.get(idx) else {
            return Vec::new();
        };
        let active = mon.active();
        let owned = mon.owned;
        self.registry
            .iter()
            .filter(|c| c.tags.intersects(active) && c.tags.intersects(owned))
            .map(|c| (c.window, c.floating))
            .collect()
    }

    /// Move the selection by `step` through every visible client in
    /// registry order, wrapping around.  Traversal is global: the walk
    /// skips only clients visible on no monitor, so it crosses monitor
    /// boundaries.
    fn focus_relative(&mut self, step: i32) {
        let order: Vec<WindowId> = self
            .registry
            .iter()
            .filter(|c| self.monitors.is_visible(c.tags))
            .map(|c| c.window)
            .collect();
        if order.is_empty() {
            return;
        }
        let next = match self.sel.and_then(|id| order.iter().position(|&w| w == id)) {
            Some(i) => (i as i32 + step).rem_euclid(order.len() as i32) as usize,
            None => 0,
        };
        self.focus(order[next]);
        self.emit_status();
    }

    /// Jump back to the previously selected client, if it is still
    /// managed and visible.
    fn focus_last(&mut self) {
        let Some(last) = self.last_sel else {
            return;
        };
        let visible = self
            .registry
            .get(last)
            .map(|c| self.monitors.is_visible(c.tags))
            .unwrap_or(false);
        if visible {
            self.focus(last);
            self.emit_status();
        }
    }

    /// Focus the nearest monitor to the given side, selecting its first
    /// visible client (or nothing, when it shows an empty view).
    fn focus_monitor(&mut self, side: Side) {
        let cur_x = self.monitors.monitor(self.sel_monitor).rect.x;
        let mut best: Option<(usize, i32)> = None;
        for (i, m) in self.monitors.iter().enumerate() {
            let dx = m.rect.x - cur_x;
            let candidate = match side {
                Side::Left => dx < 0,
                Side::Right => dx > 0,
            };
            if candidate && best.map_or(true, |(_, d)| dx.abs() < d) {
                best = Some((i, dx.abs()));
            }
        }
        let Some((idx, _)) = best else {
            debug!("no monitor to the {}", side);
            return;
        };

        self.sel_monitor = idx;
        match self.visible_on(idx).first() {
            Some(&(id, _)) => self.focus(id),
            None => {
                self.last_sel = self.sel.take().or(self.last_sel);
            }
        }
        self.emit_status();
    }

    /// Swap the selected tiled client with its visible tiled neighbour.
    fn swap_relative(&mut self, step: i32) {
        let Some(sel) = self.sel else {
            return;
        };
        let order: Vec<WindowId> = self
            .visible_on(self.sel_monitor)
            .into_iter()
            .filter(|&(_, floating)| !floating)
            .map(|(id, _)| id)
            .collect();
        if order.len() < 2 {
            return;
        }
        let Some(i) = order.iter().position(|&w| w == sel) else {
            return;
        };
        let j = (i as i32 + step).rem_euclid(order.len() as i32) as usize;
        self.registry.swap(order[i], order[j]);
        self.arrange();
    }

    fn toggle_floating(&mut self) {
        let Some(id) = self.sel else {
            return;
        };
        let Some(c) = self.registry.get_mut(id) else {
            return;
        };
        c.floating = !c.floating;
        let app = c.app.clone();
        let state = ClientState {
            tags: c.tags,
            floating: c.floating,
        };
        self.save_state(&app, state);
        self.arrange();
    }

    /// Re-tag the selected client.  Masks that clamp to empty are
    /// rejected so a client can never drop off every workspace.
    fn move_to_tag(&mut self, mask: TagMask) {
        let mask = mask.clamp_to(self.full_tags);
        if mask.is_empty() {
            return;
        }
        let Some(id) = self.sel else {
            return;
        };
        let Some(c) = self.registry.get_mut(id) else {
            return;
        };
        if c.tags == mask {
            return;
        }
        c.tags = mask;
        let app = c.app.clone();
        let state = ClientState {
            tags: mask,
            floating: c.floating,
        };
        self.save_state(&app, state);
        self.refocus();
        self.arrange();
    }

    /// Switch the view of the monitor owning `mask` and focus its
    /// first visible client.
    fn view(&mut self, mask: TagMask) {
        let mask = mask.clamp_to(self.full_tags);
        if mask.is_empty() {
            return;
        }
        let idx = self.monitors.owner_of(mask);
        if !self.monitors.monitor_mut(idx).set_view(mask) {
            return;
        }
        self.sel_monitor = idx;
        match self.visible_on(idx).first() {
            Some(&(id, _)) => self.focus(id),
            None => {
                self.last_sel = self.sel.take().or(self.last_sel);
            }
        }
        self.arrange();
    }

    /// XOR `mask` into the view of the monitor that owns it, focusing
    /// that monitor on a committed toggle.
    fn toggle_view(&mut self, mask: TagMask) {
        let mask = mask.clamp_to(self.full_tags);
        if mask.is_empty() {
            return;
        }
        let idx = self.monitors.owner_of(mask);
        if self.monitors.monitor_mut(idx).toggle_view(mask) {
            self.sel_monitor = idx;
            self.refocus();
            self.arrange();
        }
    }

    /// Ensure the selection points at a visible client, preferring the
    /// focused monitor, then any monitor, then nothing.
    fn refocus(&mut self) {
        let sel_visible = self
            .sel
            .and_then(|id| self.registry.get(id))
            .map(|c| self.monitors.is_visible(c.tags))
            .unwrap_or(false);
        if sel_visible {
            return;
        }

        let pick = self
            .visible_on(self.sel_monitor)
            .first()
            .map(|&(id, _)| id)
            .or_else(|| {
                self.registry
                    .iter()
                    .find(|c| self.monitors.is_visible(c.tags))
                    .map(|c| c.window)
            });
        match pick {
            Some(id) => self.focus(id),
            None => {
                self.last_sel = self.sel.take().or(self.last_sel);
            }
        }
    }

    /// Select a client and raise its window.
    fn focus(&mut self, id: WindowId) {
        if self.sel == Some(id) {
            return;
        }
        self.last_sel = self.sel;
        self.sel = Some(id);
        let Some(c) = self.registry.get(id) else {
            return;
        };
        self.sel_monitor = self.monitors.owner_of(c.tags);
        if let Err(e) = self.ws.raise(id, c.pid) {
            warn!("failed to raise {}: {}", id, e);
        }
    }

    /// Persist one client's tags and floating flag, keyed by application
    /// name.  Clients without a resolvable application are not persisted.
    fn save_state(&mut self, app: &str, state: ClientState) {
        if app.is_empty() {
            return;
        }
        self.snapshot.set(app, state);
        self.store.store(&self.snapshot);
    }

    fn emit_status(&self) {
        let Some(mon) = self.monitors.get(self.sel_monitor) else {
            return;
        };
        let window = self
            .sel
            .and_then(|id| self.registry.get(id))
            .map(|c| c.title.clone());
        self.status.update(&StatusSummary {
            tag: mon.active().first_tag().unwrap_or(1),
            layout: self.layout.symbol(),
            window,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{KeySym, ModMask};
    use crate::geometry::{Point, Rect, Size};
    use crate::traits::DisplayInfo;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Debug, thiserror::Error)]
    #[error("mock window system error")]
    struct MockError;

    #[derive(Default)]
    struct WsInner {
        displays: Vec<DisplayInfo>,
        windows: RefCell<Vec<WindowInfo>>,
        frames: RefCell<HashMap<WindowId, Rect>>,
        titles: RefCell<HashMap<WindowId, String>>,
        apps: RefCell<HashMap<i32, String>>,
        unmanageable: RefCell<HashSet<WindowId>>,
        log: RefCell<Vec<String>>,
    }

    /// Scriptable window system that records every mutation.
    #[derive(Clone, Default)]
    struct RecorderWs(Rc<WsInner>);

    impl RecorderWs {
        fn with_displays(displays: Vec<DisplayInfo>) -> Self {
            RecorderWs(Rc::new(WsInner {
                displays,
                ..WsInner::default()
            }))
        }

        fn single_display(rect: Rect) -> Self {
            Self::with_displays(vec![DisplayInfo {
                id: 1,
                rect,
                primary: true,
            }])
        }

        fn add_window(&self, id: u64, pid: i32, app: &str, frame: Rect) {
            let win = WindowId(id);
            self.0.windows.borrow_mut().push(WindowInfo {
                id: win,
                pid,
                layer: 0,
            });
            self.0.frames.borrow_mut().insert(win, frame);
            self.0
                .titles
                .borrow_mut()
                .insert(win, format!("{} window {}", app, id));
            self.0.apps.borrow_mut().insert(pid, app.to_string());
        }

        fn add_layered_window(&self, id: u64, pid: i32, layer: i32) {
            let win = WindowId(id);
            self.0.windows.borrow_mut().push(WindowInfo {
                id: win,
                pid,
                layer,
            });
            self.0
                .frames
                .borrow_mut()
                .insert(win, Rect::new(0, 0, 100, 100));
        }

        fn remove_window(&self, id: u64) {
            self.0
                .windows
                .borrow_mut()
                .retain(|w| w.id != WindowId(id));
        }

        fn frame_of(&self, id: u64) -> Rect {
            self.0.frames.borrow()[&WindowId(id)]
        }

        fn log(&self) -> Vec<String> {
            self.0.log.borrow().clone()
        }

        fn clear_log(&self) {
            self.0.log.borrow_mut().clear();
        }
    }

    impl WindowSystem for RecorderWs {
        type Error = MockError;

        fn displays(&self) -> Result<Vec<DisplayInfo>, MockError> {
            Ok(self.0.displays.clone())
        }

        fn windows(&self) -> Result<Vec<WindowInfo>, MockError> {
            Ok(self.0.windows.borrow().clone())
        }

        fn is_manageable(&self, win: WindowId) -> Result<bool, MockError> {
            Ok(!self.0.unmanageable.borrow().contains(&win))
        }

        fn frame(&self, win: WindowId) -> Result<Rect, MockError> {
            self.0.frames.borrow().get(&win).copied().ok_or(MockError)
        }

        fn set_position(&self, win: WindowId, pos: Point) -> Result<(), MockError> {
            let mut frames = self.0.frames.borrow_mut();
            let frame = frames.get_mut(&win).ok_or(MockError)?;
            frame.x = pos.x;
            frame.y = pos.y;
            self.0
                .log
                .borrow_mut()
                .push(format!("pos {} {},{}", win, pos.x, pos.y));
            Ok(())
        }

        fn set_size(&self, win: WindowId, size: Size) -> Result<(), MockError> {
            let mut frames = self.0.frames.borrow_mut();
            let frame = frames.get_mut(&win).ok_or(MockError)?;
            frame.width = size.width;
            frame.height = size.height;
            self.0
                .log
                .borrow_mut()
                .push(format!("size {} {}x{}", win, size.width, size.height));
            Ok(())
        }

        fn title(&self, win: WindowId) -> Result<String, MockError> {
            Ok(self
                .0
                .titles
                .borrow()
                .get(&win)
                .cloned()
                .unwrap_or_default())
        }

        fn app_name(&self, pid: i32) -> Result<Option<String>, MockError> {
            Ok(self.0.apps.borrow().get(&pid).cloned())
        }

        fn request_close(&self, win: WindowId) -> Result<(), MockError> {
            self.0.log.borrow_mut().push(format!("close {}", win));
            Ok(())
        }

        fn raise(&self, win: WindowId, _pid: i32) -> Result<(), MockError> {
            self.0.log.borrow_mut().push(format!("raise {}", win));
            Ok(())
        }

        fn spawn(&self, argv: &[String]) -> Result<(), MockError> {
            self.0
                .log
                .borrow_mut()
                .push(format!("spawn {}", argv.join(" ")));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemStore(Rc<RefCell<StateSnapshot>>);

    impl StateStore for MemStore {
        fn load(&self) -> StateSnapshot {
            self.0.borrow().clone()
        }

        fn store(&self, snapshot: &StateSnapshot) {
            *self.0.borrow_mut() = snapshot.clone();
        }
    }

    #[derive(Clone, Default)]
    struct StatusRecorder(Rc<RefCell<Vec<StatusSummary>>>);

    impl StatusSink for StatusRecorder {
        fn update(&self, status: &StatusSummary) {
            self.0.borrow_mut().push(status.clone());
        }
    }

    type TestWm = TilingWm<RecorderWs, MemStore, StatusRecorder>;

    fn wm_with(ws: &RecorderWs, store: &MemStore, status: &StatusRecorder) -> TestWm {
        TilingWm::new(ws.clone(), store.clone(), status.clone(), &Config::default())
            .expect("core construction")
    }

    fn wm(ws: &RecorderWs) -> TestWm {
        wm_with(ws, &MemStore::default(), &StatusRecorder::default())
    }

    fn two_display_ws() -> RecorderWs {
        RecorderWs::with_displays(vec![
            DisplayInfo {
                id: 1,
                rect: Rect::new(0, 0, 1000, 800),
                primary: true,
            },
            DisplayInfo {
                id: 2,
                rect: Rect::new(1000, 0, 1000, 800),
                primary: false,
            },
        ])
    }

    #[test]
    fn startup_requires_a_display() {
        let ws = RecorderWs::default();
        let res = TilingWm::new(
            ws,
            MemStore::default(),
            StatusRecorder::default(),
            &Config::default(),
        );
        assert!(matches!(res, Err(WmError::NoDisplays)));
    }

    #[test]
    fn reconcile_manages_and_tiles() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(50, 50, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(60, 60, 400, 300));
        let mut wm = wm(&ws);

        wm.reconcile().unwrap();
        assert_eq!(wm.registry().len(), 2);

        // Newest client (window 2) takes the master column.
        assert_eq!(ws.frame_of(2), Rect::new(10, 10, 533, 780));
        assert_eq!(ws.frame_of(1), Rect::new(553, 10, 437, 780));
        assert_eq!(wm.selected(), Some(WindowId(2)));
    }

    #[test]
    fn reconcile_skips_layered_and_unmanageable_windows() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_layered_window(1, 100, 25);
        ws.add_window(2, 200, "Editor", Rect::new(0, 0, 400, 300));
        ws.0.unmanageable.borrow_mut().insert(WindowId(2));
        let mut wm = wm(&ws);

        wm.reconcile().unwrap();
        assert!(wm.registry().is_empty());
    }

    #[test]
    fn reconcile_unmanages_closed_windows() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();

        ws.remove_window(2);
        wm.reconcile().unwrap();
        assert_eq!(wm.registry().len(), 1);
        // Focus falls over to the surviving client.
        assert_eq!(wm.selected(), Some(WindowId(1)));
    }

    #[test]
    fn reconcile_without_changes_does_not_rearrange() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        let status = StatusRecorder::default();
        let mut wm = wm_with(&ws, &MemStore::default(), &status);
        wm.reconcile().unwrap();

        ws.clear_log();
        let updates = status.0.borrow().len();
        wm.reconcile().unwrap();
        assert!(ws.log().is_empty());
        assert_eq!(status.0.borrow().len(), updates);
    }

    #[test]
    fn recreated_handle_keeps_client_state() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        wm.handle_command(&Command::MoveToTag(TagMask::from_index(2)))
            .unwrap();
        wm.handle_command(&Command::View(TagMask::from_index(2)))
            .unwrap();

        // Same process, identical frame, new handle.
        let frame = ws.frame_of(1);
        ws.remove_window(1);
        ws.add_window(9, 100, "Editor", frame);
        wm.reconcile().unwrap();

        assert_eq!(wm.registry().len(), 1);
        let client = wm.registry().get(WindowId(9)).expect("re-keyed client");
        assert_eq!(client.tags, TagMask::from_index(2));
        assert_eq!(wm.selected(), Some(WindowId(9)));
    }

    #[test]
    fn rules_float_matching_applications() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Calculator", Rect::new(100, 100, 300, 200));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();

        assert!(wm.registry().get(WindowId(2)).unwrap().floating);
        // The floating client is skipped by tiling: the editor alone
        // fills the whole tiled area.
        assert_eq!(ws.frame_of(1), Rect::new(10, 10, 980, 780));
        assert_eq!(ws.frame_of(2), Rect::new(100, 100, 300, 200));
    }

    #[test]
    fn saved_state_overrides_rules() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Calculator", Rect::new(0, 0, 300, 200));
        let store = MemStore::default();
        {
            let mut snapshot = StateSnapshot::new();
            snapshot.set(
                "Calculator",
                ClientState {
                    tags: TagMask::from_index(1),
                    floating: false,
                },
            );
            *store.0.borrow_mut() = snapshot;
        }
        let mut wm = wm_with(&ws, &store, &StatusRecorder::default());
        wm.reconcile().unwrap();

        let client = wm.registry().get(WindowId(1)).unwrap();
        assert_eq!(client.tags, TagMask::from_index(1));
        assert!(!client.floating);
    }

    #[test]
    fn default_tags_come_from_monitor_under_frame() {
        let ws = two_display_ws();
        ws.add_window(1, 100, "Editor", Rect::new(1200, 100, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();

        // Secondary monitor starts out viewing tag 6.
        assert_eq!(
            wm.registry().get(WindowId(1)).unwrap().tags,
            TagMask::from_index(5)
        );
    }

    #[test]
    fn move_to_tag_hides_and_view_restores() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();

        wm.handle_command(&Command::MoveToTag(TagMask::from_index(1)))
            .unwrap();
        assert_eq!(ws.frame_of(1).origin(), HIDDEN_POS);
        assert_eq!(wm.selected(), None);

        wm.handle_command(&Command::View(TagMask::from_index(1)))
            .unwrap();
        assert_eq!(ws.frame_of(1), Rect::new(10, 10, 980, 780));
        assert_eq!(wm.selected(), Some(WindowId(1)));
    }

    #[test]
    fn move_to_tag_persists_client_state() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        let store = MemStore::default();
        let mut wm = wm_with(&ws, &store, &StatusRecorder::default());
        wm.reconcile().unwrap();

        wm.handle_command(&Command::MoveToTag(TagMask::from_index(3)))
            .unwrap();
        let saved = store.0.borrow().get("Editor").expect("persisted state");
        assert_eq!(saved.tags, TagMask::from_index(3));
        assert!(!saved.floating);
    }

    #[test]
    fn move_to_tag_rejects_masks_outside_tag_space() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        let before = wm.registry().get(WindowId(1)).unwrap().tags;

        wm.handle_command(&Command::MoveToTag(TagMask::new(1 << 20)))
            .unwrap();
        assert_eq!(wm.registry().get(WindowId(1)).unwrap().tags, before);
    }

    #[test]
    fn repeated_view_is_a_noop() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        let status = StatusRecorder::default();
        let mut wm = wm_with(&ws, &MemStore::default(), &status);
        wm.reconcile().unwrap();

        wm.handle_command(&Command::View(TagMask::from_index(1)))
            .unwrap();
        let updates = status.0.borrow().len();
        wm.handle_command(&Command::View(TagMask::from_index(1)))
            .unwrap();
        assert_eq!(status.0.borrow().len(), updates);
    }

    #[test]
    fn toggle_view_shows_two_tags_at_once() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        wm.handle_command(&Command::MoveToTag(TagMask::from_index(1)))
            .unwrap();
        assert_eq!(ws.frame_of(2).origin(), HIDDEN_POS);

        wm.handle_command(&Command::ToggleView(TagMask::from_index(1)))
            .unwrap();
        // Both clients visible and tiled together.
        assert_ne!(ws.frame_of(1).origin(), HIDDEN_POS);
        assert_ne!(ws.frame_of(2).origin(), HIDDEN_POS);
        assert_eq!(
            wm.monitors().monitor(0).active().bits(),
            TagMask::from_index(0).bits() | TagMask::from_index(1).bits()
        );
    }

    #[test]
    fn toggle_view_routes_to_owner_monitor() {
        let ws = two_display_ws();
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();

        // Tag 7 belongs to the secondary monitor's partition; toggling
        // it while the primary is focused edits the secondary's view.
        wm.handle_command(&Command::ToggleView(TagMask::from_index(6)))
            .unwrap();
        assert_eq!(
            wm.monitors().monitor(1).active().bits(),
            TagMask::from_index(5).bits() | TagMask::from_index(6).bits()
        );
        assert_eq!(wm.monitors().monitor(0).active(), TagMask::from_index(0));
    }

    #[test]
    fn view_focuses_the_switched_to_monitors_client() {
        let ws = two_display_ws();
        ws.add_window(1, 100, "Editor", Rect::new(100, 100, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(1200, 100, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));

        // Hiding the editor lets the selection fall through to the
        // other monitor's client.
        wm.handle_command(&Command::MoveToTag(TagMask::from_index(1)))
            .unwrap();
        assert_eq!(wm.selected(), Some(WindowId(2)));

        // Switching the view pulls focus onto the revealed client even
        // though the old selection is still visible elsewhere.
        wm.handle_command(&Command::View(TagMask::from_index(1)))
            .unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));
    }

    #[test]
    fn dual_partition_client_tiles_on_each_owner() {
        let ws = two_display_ws();
        ws.add_window(1, 100, "Editor", Rect::new(100, 100, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(100, 100, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        assert_eq!(wm.selected(), Some(WindowId(2)));
        assert_eq!(ws.frame_of(2), Rect::new(10, 10, 533, 780));

        // Tag the terminal onto both partitions at once.
        wm.handle_command(&Command::MoveToTag(
            TagMask::from_index(0) | TagMask::from_index(5),
        ))
        .unwrap();

        // It fills the secondary monitor last, but still takes the
        // master slot in the primary's tile pass: the editor stays in
        // the stack column.
        assert_eq!(ws.frame_of(2), Rect::new(1010, 10, 980, 780));
        assert_eq!(ws.frame_of(1), Rect::new(553, 10, 437, 780));
    }

    #[test]
    fn master_fraction_rejects_out_of_range() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        let mut wm = wm(&ws);

        wm.handle_command(&Command::SetMasterFraction(0.4)).unwrap();
        assert_eq!(wm.params().mfact, 0.55);
        wm.handle_command(&Command::SetMasterFraction(-0.05))
            .unwrap();
        assert_eq!(wm.params().mfact, 0.5);
    }

    #[test]
    fn master_count_floors_at_zero() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        let mut wm = wm(&ws);

        wm.handle_command(&Command::IncMasterCount(-5)).unwrap();
        assert_eq!(wm.params().nmaster, 0);
        wm.handle_command(&Command::IncMasterCount(2)).unwrap();
        assert_eq!(wm.params().nmaster, 2);
    }

    #[test]
    fn focus_cycles_through_visible_clients() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        ws.add_window(3, 300, "Browser", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        assert_eq!(wm.selected(), Some(WindowId(3)));

        wm.handle_command(&Command::FocusNext).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(2)));
        wm.handle_command(&Command::FocusNext).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));
        wm.handle_command(&Command::FocusNext).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(3)));
        wm.handle_command(&Command::FocusPrev).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));
    }

    #[test]
    fn focus_next_crosses_monitors() {
        let ws = two_display_ws();
        ws.add_window(1, 100, "Editor", Rect::new(100, 100, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(1200, 100, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));

        // The walk covers every visible client, not just the focused
        // monitor's own.
        wm.handle_command(&Command::FocusNext).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(2)));
        wm.handle_command(&Command::FocusNext).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));
    }

    #[test]
    fn focus_last_jumps_to_previous_selection() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();

        wm.handle_command(&Command::FocusNext).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));
        wm.handle_command(&Command::FocusLast).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(2)));
        wm.handle_command(&Command::FocusLast).unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));
    }

    #[test]
    fn swap_promotes_stack_client_to_master() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        // Window 2 is master, window 1 the stack.
        assert_eq!(ws.frame_of(2), Rect::new(10, 10, 533, 780));

        wm.handle_command(&Command::SwapNext).unwrap();
        assert_eq!(ws.frame_of(1), Rect::new(10, 10, 533, 780));
        assert_eq!(ws.frame_of(2), Rect::new(553, 10, 437, 780));
        // Selection follows the client, not the slot.
        assert_eq!(wm.selected(), Some(WindowId(2)));
    }

    #[test]
    fn monocle_maximizes_every_tiled_client() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();

        wm.handle_command(&Command::SetLayout(1)).unwrap();
        assert_eq!(wm.layout(), Layout::Monocle);
        assert_eq!(ws.frame_of(1), Rect::new(10, 10, 980, 780));
        assert_eq!(ws.frame_of(2), Rect::new(10, 10, 980, 780));
    }

    #[test]
    fn float_layout_leaves_geometry_alone() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        let tiled = ws.frame_of(1);

        wm.handle_command(&Command::SetLayout(2)).unwrap();
        assert_eq!(ws.frame_of(1), tiled);
    }

    #[test]
    fn cycle_layout_wraps() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        let mut wm = wm(&ws);
        assert_eq!(wm.layout(), Layout::Tile);
        wm.handle_command(&Command::CycleLayout).unwrap();
        assert_eq!(wm.layout(), Layout::Monocle);
        wm.handle_command(&Command::CycleLayout).unwrap();
        assert_eq!(wm.layout(), Layout::Float);
        wm.handle_command(&Command::CycleLayout).unwrap();
        assert_eq!(wm.layout(), Layout::Tile);
    }

    #[test]
    fn toggle_floating_persists_and_rearranges() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        let store = MemStore::default();
        let mut wm = wm_with(&ws, &store, &StatusRecorder::default());
        wm.reconcile().unwrap();

        wm.handle_command(&Command::ToggleFloating).unwrap();
        assert!(wm.registry().get(WindowId(2)).unwrap().floating);
        assert!(store.0.borrow().get("Terminal").unwrap().floating);
        // The remaining tiled client takes the whole area.
        assert_eq!(ws.frame_of(1), Rect::new(10, 10, 980, 780));
    }

    #[test]
    fn kill_requests_close_but_keeps_the_record() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();
        ws.clear_log();

        wm.handle_command(&Command::KillSelected).unwrap();
        assert!(ws.log().contains(&"close 0x1".to_string()));
        assert_eq!(wm.registry().len(), 1);

        ws.remove_window(1);
        wm.reconcile().unwrap();
        assert!(wm.registry().is_empty());
        assert_eq!(wm.selected(), None);
    }

    #[test]
    fn focus_monitor_moves_selection_sideways() {
        let ws = two_display_ws();
        ws.add_window(1, 100, "Editor", Rect::new(100, 100, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(1200, 100, 400, 300));
        let status = StatusRecorder::default();
        let mut wm = wm_with(&ws, &MemStore::default(), &status);
        wm.reconcile().unwrap();

        // Both monitors hold one client; focus starts on the primary.
        wm.handle_command(&Command::View(TagMask::from_index(0)))
            .unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));

        wm.handle_command(&Command::FocusMonitor(Side::Right))
            .unwrap();
        assert_eq!(wm.selected(), Some(WindowId(2)));
        assert_eq!(status.0.borrow().last().unwrap().tag, 6);

        wm.handle_command(&Command::FocusMonitor(Side::Left))
            .unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));
    }

    #[test]
    fn spawn_and_quit() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        let mut wm = wm(&ws);
        assert!(wm.running());

        wm.handle_command(&Command::Spawn(vec!["open".into(), "-a".into(), "Ghostty".into()]))
            .unwrap();
        assert!(ws.log().contains(&"spawn open -a Ghostty".to_string()));

        wm.handle_command(&Command::Quit).unwrap();
        assert!(!wm.running());
    }

    #[test]
    fn bound_key_runs_its_command_and_unbound_is_ignored() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        ws.add_window(2, 200, "Terminal", Rect::new(0, 0, 400, 300));
        let mut wm = wm(&ws);
        wm.reconcile().unwrap();

        wm.handle_event(Event::Key(KeyChord {
            mods: ModMask::ALT,
            key: KeySym::new("j"),
        }))
        .unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));

        wm.handle_event(Event::Key(KeyChord {
            mods: ModMask::CMD,
            key: KeySym::new("z"),
        }))
        .unwrap();
        assert_eq!(wm.selected(), Some(WindowId(1)));
    }

    #[test]
    fn status_reports_tag_layout_and_title() {
        let ws = RecorderWs::single_display(Rect::new(0, 0, 1000, 800));
        ws.add_window(1, 100, "Editor", Rect::new(0, 0, 400, 300));
        let status = StatusRecorder::default();
        let mut wm = wm_with(&ws, &MemStore::default(), &status);
        wm.reconcile().unwrap();

        let last = status.0.borrow().last().cloned().unwrap();
        assert_eq!(last.tag, 1);
        assert_eq!(last.layout, "[]=");
        assert_eq!(last.window.as_deref(), Some("Editor window 1"));
    }
}
