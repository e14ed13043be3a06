//! Reference host: a tick-driven server the toolkit runs against.
//!
//! TICK ORDER (fixed):
//!   1. Advance the clock.
//!   2. Run the executor heartbeat for the new tick.
//!
//! CLICK ORDER:
//!   1. Build the click occurrence from the viewer's current view.
//!   2. Dispatch it to listeners.
//!   3. If nobody cancelled it, apply the default content change.
//!
//! RULES:
//!   - Every viewer has a personal inventory surface, at most one open
//!     view, and a cursor item.
//!   - The host never holds a surface lock while dispatching.

use crate::{
    clock::ServerClock,
    config::ToolkitConfig,
    dispatch::EventBus,
    error::{ToolkitError, ToolkitResult},
    event::{Cancellable, ClickEvent, ClickKind, CloseEvent, InventoryView, OpenEvent},
    executor::{HeartbeatReport, TickExecutor},
    item::Item,
    menu::Presenter,
    scheduler::HostExecutor,
    surface::{SharedSurface, Surface},
    sync::lock,
    types::{Tick, ViewerId},
};
use std::{collections::HashMap, sync::Arc};

pub struct ViewerState {
    pub name:     String,
    pub personal: SharedSurface,
    pub open:     Option<SharedSurface>,
    pub cursor:   Option<Item>,
}

pub struct Server {
    pub clock: ServerClock,
    executor:  Arc<TickExecutor>,
    bus:       Arc<EventBus>,
    viewers:   HashMap<ViewerId, ViewerState>,
    config:    ToolkitConfig,
}

impl Server {
    pub fn new(config: &ToolkitConfig) -> ToolkitResult<Self> {
        config.validate()?;
        Ok(Self {
            clock:    ServerClock::new(),
            executor: Arc::new(TickExecutor::new(&config.executor)?),
            bus:      Arc::new(EventBus::new()),
            viewers:  HashMap::new(),
            config:   config.clone(),
        })
    }

    pub fn executor(&self) -> Arc<TickExecutor> {
        Arc::clone(&self.executor)
    }

    /// The executor as the scheduler sees it.
    pub fn host_executor(&self) -> Arc<dyn HostExecutor> {
        self.executor.clone()
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick
    }

    // ── Viewers ────────────────────────────────────────────────

    pub fn join(&mut self, name: impl Into<String>) -> ToolkitResult<ViewerId> {
        let name = name.into();
        let personal = Surface::new(name.clone(), self.config.personal_layout())?.shared();
        let id = ViewerId::new();
        log::info!("{name} joined as {id}");
        self.viewers.insert(id, ViewerState { name, personal, open: None, cursor: None });
        Ok(id)
    }

    /// Close whatever the viewer has open, then forget them.
    pub fn leave(&mut self, viewer: ViewerId) -> ToolkitResult<()> {
        self.close_view(viewer)?;
        self.viewers.remove(&viewer);
        Ok(())
    }

    pub fn viewer(&self, viewer: ViewerId) -> Option<&ViewerState> {
        self.viewers.get(&viewer)
    }

    pub fn viewer_ids(&self) -> Vec<ViewerId> {
        self.viewers.keys().copied().collect()
    }

    fn viewer_mut(&mut self, viewer: ViewerId) -> ToolkitResult<&mut ViewerState> {
        self.viewers
            .get_mut(&viewer)
            .ok_or(ToolkitError::UnknownViewer { viewer })
    }

    /// The pair of surfaces the viewer currently sees. Without an open view,
    /// the viewer's own inventory is both top and bottom.
    pub fn view_of(&self, viewer: ViewerId) -> ToolkitResult<InventoryView> {
        let state = self.viewers.get(&viewer).ok_or(ToolkitError::UnknownViewer { viewer })?;
        let bottom = lock(&state.personal).id();
        let (top, top_size) = match &state.open {
            Some(open) => {
                let open = lock(open);
                (open.id(), open.size())
            }
            None => (bottom, lock(&state.personal).size()),
        };
        Ok(InventoryView { top, top_size, bottom })
    }

    /// Close the viewer's open view, if any. Returns whether one was open.
    pub fn close_view(&mut self, viewer: ViewerId) -> ToolkitResult<bool> {
        let tick = self.clock.current_tick;
        let Some(surface) = self.viewer_mut(viewer)?.open.take() else {
            return Ok(false);
        };
        let surface_id = lock(&surface).id();
        drop(surface);
        let mut event = CloseEvent { viewer, surface: surface_id, tick };
        self.bus.dispatch(&mut event);
        log::debug!("{viewer} closed {surface_id}");
        Ok(true)
    }

    // ── Input ──────────────────────────────────────────────────

    /// Deliver a click at `raw_slot` of the viewer's view (`None` = outside
    /// the window). Returns the occurrence as listeners left it.
    pub fn click(
        &mut self,
        viewer: ViewerId,
        raw_slot: Option<usize>,
        kind: ClickKind,
    ) -> ToolkitResult<ClickEvent> {
        let view = self.view_of(viewer)?;
        if let Some(raw) = raw_slot {
            let bottom_size = self.viewer_mut(viewer).map(|s| lock(&s.personal).size())?;
            let limit = if view.top == view.bottom { view.top_size } else { view.top_size + bottom_size };
            if raw >= limit {
                return Err(ToolkitError::SlotOutOfRange { slot: raw, size: limit });
            }
        }

        let mut event = ClickEvent::new(viewer, view, raw_slot, kind, self.clock.current_tick);
        self.bus.dispatch(&mut event);

        if !event.is_cancelled() {
            self.apply_default_click(&event)?;
        }
        Ok(event)
    }

    fn apply_default_click(&mut self, event: &ClickEvent) -> ToolkitResult<()> {
        let Some(clicked_id) = event.clicked else {
            return Ok(());
        };
        let state = self.viewer_mut(event.viewer)?;
        let personal = Arc::clone(&state.personal);
        let open = state.open.clone();
        let (clicked, other) = match &open {
            Some(top) if lock(top).id() == clicked_id => (Arc::clone(top), Some(personal)),
            Some(top) => (personal, Some(Arc::clone(top))),
            None => (personal, None),
        };

        match event.kind {
            ClickKind::Left | ClickKind::Right => {
                let mut surface = lock(&clicked);
                let taken = surface.take(event.slot);
                surface.set(event.slot, state.cursor.take())?;
                state.cursor = taken;
            }
            ClickKind::ShiftLeft | ClickKind::ShiftRight => {
                let Some(other) = other else {
                    return Ok(());
                };
                let Some(item) = lock(&clicked).take(event.slot) else {
                    return Ok(());
                };
                let leftovers = lock(&other).add_items([item]);
                if let Some(rest) = leftovers.into_iter().next() {
                    lock(&clicked).set(event.slot, Some(rest))?;
                }
            }
            ClickKind::Drop => {
                if let Some(item) = lock(&clicked).take(event.slot) {
                    log::debug!("{} dropped {}", event.viewer, item.material);
                }
            }
            ClickKind::Middle => {}
        }
        Ok(())
    }

    // ── Ticks ──────────────────────────────────────────────────

    /// Advance one tick and run everything scheduled for it.
    /// After `shutdown` nothing advances and an empty report comes back.
    pub fn tick(&mut self) -> HeartbeatReport {
        let Some(tick) = self.clock.advance() else {
            log::warn!("tick requested on a stopped server");
            return HeartbeatReport { tick: self.clock.current_tick, ..HeartbeatReport::default() };
        };
        self.executor.heartbeat(tick)
    }

    pub fn run_ticks(&mut self, n: u64) -> Vec<HeartbeatReport> {
        (0..n).map(|_| self.tick()).collect()
    }

    /// Cancel everything still queued. The server is unusable afterwards.
    pub fn shutdown(&mut self) -> usize {
        self.clock.pause();
        self.executor.shutdown()
    }
}

impl Presenter for Server {
    /// Any view already open is closed first, as the host would.
    fn open_surface(&mut self, viewer: ViewerId, surface: SharedSurface) -> ToolkitResult<bool> {
        self.close_view(viewer)?;
        let surface_id = lock(&surface).id();
        let mut event = OpenEvent::new(viewer, surface_id, self.clock.current_tick);
        self.bus.dispatch(&mut event);
        if event.is_cancelled() {
            log::debug!("open of {surface_id} for {viewer} was cancelled");
            return Ok(false);
        }
        self.viewer_mut(viewer)?.open = Some(surface);
        log::debug!("{viewer} opened {surface_id}");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Server {
        Server::new(&ToolkitConfig::default()).unwrap()
    }

    #[test]
    fn unclaimed_clicks_apply_default_swap() {
        let mut server = server();
        let viewer = server.join("alex").unwrap();
        let chest = Surface::new("chest", crate::surface::SurfaceLayout::Rows(1)).unwrap().shared();
        lock(&chest).set(0, Some(Item::new("APPLE"))).unwrap();
        assert!(server.open_surface(viewer, Arc::clone(&chest)).unwrap());

        let event = server.click(viewer, Some(0), ClickKind::Left).unwrap();
        assert!(!event.is_cancelled());
        assert!(lock(&chest).get(0).is_none());
        assert_eq!(server.viewer(viewer).unwrap().cursor.as_ref().unwrap().material, "APPLE");

        // Put it down in the personal inventory (raw 9 = personal slot 0).
        server.click(viewer, Some(9), ClickKind::Left).unwrap();
        let personal = Arc::clone(&server.viewer(viewer).unwrap().personal);
        assert_eq!(lock(&personal).get(0).unwrap().material, "APPLE");
    }

    #[test]
    fn shift_click_moves_between_surfaces() {
        let mut server = server();
        let viewer = server.join("sam").unwrap();
        let chest = Surface::new("chest", crate::surface::SurfaceLayout::Rows(1)).unwrap().shared();
        lock(&chest).set(4, Some(Item::new("COAL").with_amount(10))).unwrap();
        server.open_surface(viewer, Arc::clone(&chest)).unwrap();

        server.click(viewer, Some(4), ClickKind::ShiftLeft).unwrap();
        assert!(lock(&chest).get(4).is_none());
        let personal = Arc::clone(&server.viewer(viewer).unwrap().personal);
        assert_eq!(lock(&personal).get(0).unwrap().amount, 10);
    }

    #[test]
    fn clicks_past_the_view_are_rejected() {
        let mut server = server();
        let viewer = server.join("kit").unwrap();
        assert!(matches!(
            server.click(viewer, Some(36), ClickKind::Left),
            Err(ToolkitError::SlotOutOfRange { slot: 36, size: 36 })
        ));
        assert!(matches!(
            server.click(ViewerId::new(), None, ClickKind::Left),
            Err(ToolkitError::UnknownViewer { .. })
        ));
    }

    #[test]
    fn opening_closes_the_previous_view() {
        let mut server = server();
        let viewer = server.join("lee").unwrap();
        let closes = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&closes);
        server.bus().listen::<CloseEvent, _>("test", move |e| {
            seen.lock().unwrap().push(e.surface);
            Ok(())
        });
        let first = Surface::new("a", crate::surface::SurfaceLayout::Rows(1)).unwrap().shared();
        let first_id = lock(&first).id();
        let second = Surface::new("b", crate::surface::SurfaceLayout::Rows(2)).unwrap().shared();
        server.open_surface(viewer, first).unwrap();
        server.open_surface(viewer, second).unwrap();
        assert_eq!(*closes.lock().unwrap(), vec![first_id]);
        assert_eq!(server.view_of(viewer).unwrap().top_size, 18);
    }

    #[test]
    fn cancelled_open_leaves_view_closed() {
        let mut server = server();
        let viewer = server.join("max").unwrap();
        server.bus().listen::<OpenEvent, _>("test", |e| {
            e.set_cancelled(true);
            Ok(())
        });
        let chest = Surface::new("c", crate::surface::SurfaceLayout::Rows(1)).unwrap().shared();
        assert!(!server.open_surface(viewer, chest).unwrap());
        assert!(server.viewer(viewer).unwrap().open.is_none());
    }

    #[test]
    fn stopped_server_does_not_tick() {
        let mut server = server();
        server.run_ticks(2);
        let ran = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&ran);
        let scheduler = crate::scheduler::Scheduler::new("test", server.host_executor());
        let handle = scheduler.delay_ticks(1, move |_| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(server.shutdown(), 1);
        assert!(handle.is_cancelled());

        let reports = server.run_ticks(3);
        assert!(reports.iter().all(|r| r.tick == 2 && r.ran == 0));
        assert_eq!(server.current_tick(), 2);
        assert_eq!(ran.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn ticks_advance_clock_and_executor() {
        let mut server = server();
        let reports = server.run_ticks(3);
        assert_eq!(reports.last().unwrap().tick, 3);
        assert_eq!(server.current_tick(), 3);
        assert_eq!(server.executor().current_tick(), 3);
    }
}
