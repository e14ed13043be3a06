//! Menus: a titled surface, the buttons bound into it, and three
//! optional lifecycle hooks.
//!
//! RULES:
//!   - Content written with `set_item`/`add_item`/fills never binds a click
//!     handler. Only `add_button` binds.
//!   - Hooks are plain setters; the last write wins. An unset hook is a no-op.
//!   - A menu never references its viewers.

use crate::{
    button::{Button, ClickButton, ToggleableButton},
    error::{HookResult, ToolkitResult},
    event::{ClickEvent, CloseEvent, OpenEvent},
    item::Item,
    surface::{SharedSurface, Surface, SurfaceLayout},
    sync::lock,
    types::{Slot, SurfaceId, ViewerId},
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

pub type OpenHook = Box<dyn FnMut(&mut Menu, &mut OpenEvent) -> HookResult + Send>;
pub type CloseHook = Box<dyn FnMut(&mut Menu, &CloseEvent) -> HookResult + Send>;
pub type ClickHook = Box<dyn FnMut(&mut Menu, &ClickEvent) -> HookResult + Send>;

/// How a menu gets in front of a viewer. Implemented by the host.
pub trait Presenter {
    /// Show `surface` to `viewer`. Returns false if a listener cancelled the open.
    fn open_surface(&mut self, viewer: ViewerId, surface: SharedSurface) -> ToolkitResult<bool>;
}

pub struct Menu {
    title:      String,
    surface_id: SurfaceId,
    layout:     SurfaceLayout,
    surface:    SharedSurface,
    buttons:    HashMap<Slot, Box<dyn Button>>,
    on_open:    Option<OpenHook>,
    on_close:   Option<CloseHook>,
    on_click:   Option<ClickHook>,
    /// Slot whose button is lent out to a running click, and whether
    /// that click unbound it.
    lent:       Option<(Slot, bool)>,
}

impl Menu {
    /// Allocate the surface. Fails with `InvalidRowCount` for rows outside [1, 6).
    pub fn new(title: impl Into<String>, layout: SurfaceLayout) -> ToolkitResult<Self> {
        let title = title.into();
        let surface = Surface::new(title.clone(), layout)?;
        Ok(Self {
            title,
            surface_id: surface.id(),
            layout,
            surface: surface.shared(),
            buttons: HashMap::new(),
            on_open: None,
            on_close: None,
            on_click: None,
            lent: None,
        })
    }

    pub fn title(&self) -> &str { &self.title }
    pub fn surface_id(&self) -> SurfaceId { self.surface_id }
    pub fn layout(&self) -> SurfaceLayout { self.layout }
    pub fn size(&self) -> usize { self.layout.size() }

    /// The shared surface, as handed to the host for presentation.
    pub fn surface(&self) -> SharedSurface {
        Arc::clone(&self.surface)
    }

    /// How many parties (this menu included) hold the surface.
    pub fn surface_holders(&self) -> usize {
        Arc::strong_count(&self.surface)
    }

    // ── Hooks ──────────────────────────────────────────────────

    pub fn on_open<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Menu, &mut OpenEvent) -> HookResult + Send + 'static,
    {
        self.on_open = Some(Box::new(hook));
    }

    pub fn on_close<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Menu, &CloseEvent) -> HookResult + Send + 'static,
    {
        self.on_close = Some(Box::new(hook));
    }

    pub fn on_click<F>(&mut self, hook: F)
    where
        F: FnMut(&mut Menu, &ClickEvent) -> HookResult + Send + 'static,
    {
        self.on_click = Some(Box::new(hook));
    }

    // ── Content ────────────────────────────────────────────────

    fn surface_mut(&self) -> MutexGuard<'_, Surface> {
        lock(&self.surface)
    }

    pub fn set_item(&mut self, slot: Slot, item: Item) -> ToolkitResult<()> {
        self.surface_mut().set(slot, Some(item))
    }

    /// Returns the items that did not fit.
    pub fn add_item(&mut self, items: impl IntoIterator<Item = Item>) -> Vec<Item> {
        self.surface_mut().add_items(items)
    }

    pub fn get_item(&self, slot: Slot) -> Option<Item> {
        self.surface_mut().get(slot).cloned()
    }

    /// Clear the rendered item. Any button bound there stays bound.
    pub fn remove(&mut self, slot: Slot) -> Option<Item> {
        self.surface_mut().take(slot)
    }

    pub fn contents(&self) -> Vec<Option<Item>> {
        self.surface_mut().contents().to_vec()
    }

    /// Render `item` on the outer ring. No-op for non-grid presets.
    pub fn set_border(&mut self, item: Item) {
        let mut surface = self.surface_mut();
        let border = surface.border_slots();
        if border.is_empty() {
            log::debug!("menu '{}': no border for layout {:?}", self.title, self.layout);
        }
        for slot in border {
            // Border slots are always in range.
            let _ = surface.set(slot, Some(item.clone()));
        }
    }

    /// Render `item` into every slot holding nothing or air.
    pub fn fill_empty(&mut self, item: Item) {
        let mut surface = self.surface_mut();
        for slot in 0..surface.size() {
            if surface.is_vacant(slot) {
                let _ = surface.set(slot, Some(item.clone()));
            }
        }
    }

    /// Render `item` into `[start, end)`. Bound buttons stay bound.
    pub fn fill_range(&mut self, start: Slot, end: Slot, item: Item) -> ToolkitResult<()> {
        let mut surface = self.surface_mut();
        if end > start {
            surface.check_slot(end - 1)?;
        }
        for slot in start..end {
            surface.set(slot, Some(item.clone()))?;
        }
        Ok(())
    }

    // ── Buttons ────────────────────────────────────────────────

    /// Bind `button` at its slot and render its visual, replacing
    /// whatever was bound or rendered there.
    pub fn add_button(&mut self, button: impl Button + 'static) -> ToolkitResult<()> {
        self.add_boxed_button(Box::new(button))
    }

    pub fn add_boxed_button(&mut self, button: Box<dyn Button>) -> ToolkitResult<()> {
        let slot = button.slot();
        self.surface_mut().set(slot, Some(button.visual().clone()))?;
        if let Some((lent_slot, unbound)) = &mut self.lent {
            if *lent_slot == slot {
                *unbound = true;
            }
        }
        self.buttons.insert(slot, button);
        Ok(())
    }

    pub fn button<F>(&mut self, slot: Slot, visual: Item, callback: F) -> ToolkitResult<()>
    where
        F: FnMut(&ClickEvent, &mut Menu) -> HookResult + Send + 'static,
    {
        self.add_button(ClickButton::new(slot, visual, callback))
    }

    pub fn toggleable_button<F>(
        &mut self,
        slot: Slot,
        true_visual: Item,
        false_visual: Item,
        state: bool,
        callback: F,
    ) -> ToolkitResult<()>
    where
        F: FnMut(bool, &ClickEvent, &mut Menu) -> HookResult + Send + 'static,
    {
        self.add_button(ToggleableButton::new(slot, true_visual, false_visual, state, callback))
    }

    /// Unbind the button at `slot` and clear its visual.
    /// Returns `None` when nothing was bound there.
    pub fn remove_button(&mut self, slot: Slot) -> Option<Box<dyn Button>> {
        let removed = self.buttons.remove(&slot);
        let lent_here = match &mut self.lent {
            Some((lent_slot, unbound)) if *lent_slot == slot => {
                *unbound = true;
                true
            }
            _ => false,
        };
        if removed.is_some() || lent_here {
            self.remove(slot);
        }
        removed
    }

    pub fn button_at(&self, slot: Slot) -> Option<&dyn Button> {
        self.buttons.get(&slot).map(|b| b.as_ref())
    }

    /// Read-only view of every bound button, by slot.
    pub fn buttons(&self) -> BTreeMap<Slot, &dyn Button> {
        self.buttons.iter().map(|(slot, b)| (*slot, b.as_ref())).collect()
    }

    // ── Dispatch ───────────────────────────────────────────────

    pub fn handle_open(&mut self, event: &mut OpenEvent) -> HookResult {
        let Some(mut hook) = self.on_open.take() else {
            return Ok(());
        };
        let result = hook(self, event);
        self.on_open.get_or_insert(hook);
        result
    }

    pub fn handle_close(&mut self, event: &CloseEvent) -> HookResult {
        let Some(mut hook) = self.on_close.take() else {
            return Ok(());
        };
        let result = hook(self, event);
        self.on_close.get_or_insert(hook);
        result
    }

    /// Run the menu's click hook, then the button bound at the clicked slot.
    /// A failing menu hook stops the button from running.
    pub fn handle_click(&mut self, event: &ClickEvent) -> HookResult {
        if let Some(mut hook) = self.on_click.take() {
            let result = hook(self, event);
            self.on_click.get_or_insert(hook);
            result?;
        }

        let slot = event.slot;
        let Some(mut button) = self.buttons.remove(&slot) else {
            return Ok(());
        };
        self.lent = Some((slot, false));
        let result = button.on_click(event, self);
        if let Some((_, false)) = self.lent.take() {
            self.buttons.insert(slot, button);
        }
        result
    }
}

/// Shared ownership of a menu, as held by the registry and by callers.
#[derive(Clone)]
pub struct MenuHandle {
    surface_id: SurfaceId,
    menu:       Arc<Mutex<Menu>>,
}

impl MenuHandle {
    pub fn new(menu: Menu) -> Self {
        Self { surface_id: menu.surface_id(), menu: Arc::new(Mutex::new(menu)) }
    }

    pub fn surface_id(&self) -> SurfaceId { self.surface_id }

    pub fn lock(&self) -> MutexGuard<'_, Menu> {
        lock(&self.menu)
    }

    /// Present the menu to `viewer`. The menu is not locked while the host
    /// delivers the resulting open occurrence.
    pub fn open(&self, presenter: &mut dyn Presenter, viewer: ViewerId) -> ToolkitResult<bool> {
        let surface = self.lock().surface();
        presenter.open_surface(viewer, surface)
    }

    /// How many handles to this menu exist, this one included.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.menu)
    }

    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, Menu>> {
        crate::sync::try_lock(&self.menu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ToolkitError,
        event::{ClickKind, InventoryView},
        types::SurfaceId,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn menu(rows: usize) -> Menu {
        Menu::new("Test", SurfaceLayout::Rows(rows)).unwrap()
    }

    fn click(menu: &Menu, slot: Slot) -> ClickEvent {
        let view = InventoryView { top: menu.surface_id(), top_size: menu.size(), bottom: SurfaceId::new() };
        ClickEvent::new(ViewerId::new(), view, Some(slot), ClickKind::Left, 0)
    }

    #[test]
    fn row_count_is_validated() {
        assert!(matches!(
            Menu::new("t", SurfaceLayout::Rows(0)),
            Err(ToolkitError::InvalidRowCount { rows: 0 })
        ));
        assert!(matches!(
            Menu::new("t", SurfaceLayout::Rows(6)),
            Err(ToolkitError::InvalidRowCount { rows: 6 })
        ));
        assert_eq!(menu(3).size(), 27);
    }

    #[test]
    fn set_item_does_not_bind() {
        let mut m = menu(1);
        m.set_item(3, Item::new("STONE")).unwrap();
        assert_eq!(m.get_item(3).unwrap().material, "STONE");
        assert!(m.button_at(3).is_none());
        assert!(m.set_item(9, Item::new("STONE")).is_err());
    }

    #[test]
    fn add_button_overwrites_handler_and_visual() {
        let mut m = menu(1);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let (f, s) = (Arc::clone(&first), Arc::clone(&second));
        m.button(4, Item::new("RED_WOOL"), move |_, _| { f.fetch_add(1, Ordering::SeqCst); Ok(()) }).unwrap();
        m.button(4, Item::new("BLUE_WOOL"), move |_, _| { s.fetch_add(1, Ordering::SeqCst); Ok(()) }).unwrap();

        assert_eq!(m.get_item(4).unwrap().material, "BLUE_WOOL");
        assert_eq!(m.buttons().len(), 1);
        assert_eq!(m.buttons()[&4].visual().material, "BLUE_WOOL");

        let event = click(&m, 4);
        m.handle_click(&event).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_button_clears_visual_and_reports_misses() {
        let mut m = menu(1);
        m.button(2, Item::new("STONE"), |_, _| Ok(())).unwrap();
        assert!(m.remove_button(2).is_some());
        assert!(m.get_item(2).is_none());
        assert!(m.remove_button(2).is_none());
        assert!(m.remove_button(7).is_none());
    }

    #[test]
    fn fill_range_is_half_open() {
        let mut m = menu(1);
        m.set_item(1, Item::new("DIRT")).unwrap();
        m.fill_range(2, 5, Item::new("GLASS")).unwrap();
        for slot in 2..5 {
            assert_eq!(m.get_item(slot).unwrap().material, "GLASS");
        }
        assert_eq!(m.get_item(1).unwrap().material, "DIRT");
        assert!(m.get_item(5).is_none());
        assert!(m.fill_range(5, 10, Item::new("GLASS")).is_err());
        assert!(m.get_item(5).is_none());
    }

    #[test]
    fn fill_range_keeps_button_bindings() {
        let mut m = menu(1);
        let clicks = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&clicks);
        m.button(3, Item::new("LEVER"), move |_, _| { seen.fetch_add(1, Ordering::SeqCst); Ok(()) }).unwrap();
        m.fill_range(0, 9, Item::new("GLASS")).unwrap();

        assert_eq!(m.get_item(3).unwrap().material, "GLASS");
        assert!(m.button_at(3).is_some());
        let event = click(&m, 3);
        m.handle_click(&event).unwrap();
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fill_empty_skips_occupied_and_fills_air() {
        let mut m = menu(1);
        m.set_item(0, Item::new("DIAMOND")).unwrap();
        m.set_item(1, Item::air()).unwrap();
        m.fill_empty(Item::new("GLASS"));
        assert_eq!(m.get_item(0).unwrap().material, "DIAMOND");
        assert!(m.contents()[1..].iter().all(|i| i.as_ref().unwrap().material == "GLASS"));
    }

    #[test]
    fn border_rings_the_surface() {
        let mut m = menu(3);
        m.set_border(Item::new("BLACK_GLASS"));
        let filled: Vec<Slot> = (0..27).filter(|&s| m.get_item(s).is_some()).collect();
        assert_eq!(filled.len(), 20);
        assert!(m.get_item(10).is_none() && m.get_item(16).is_none());
        assert!(m.get_item(9).is_some() && m.get_item(17).is_some());
    }

    #[test]
    fn border_on_non_grid_preset_is_noop() {
        let mut m = Menu::new("f", SurfaceLayout::Preset(crate::surface::PresetLayout::Furnace)).unwrap();
        m.set_border(Item::new("BLACK_GLASS"));
        assert!(m.contents().iter().all(Option::is_none));
    }

    #[test]
    fn hooks_are_last_write_wins() {
        let mut m = menu(1);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&calls), Arc::clone(&calls));
        m.on_click(move |_, _| { a.lock().unwrap().push("first"); Ok(()) });
        m.on_click(move |_, _| { b.lock().unwrap().push("second"); Ok(()) });
        let event = click(&m, 0);
        m.handle_click(&event).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn click_hook_runs_before_button() {
        let mut m = menu(1);
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&order), Arc::clone(&order));
        m.on_click(move |_, _| { a.lock().unwrap().push("menu"); Ok(()) });
        m.button(4, Item::new("STONE"), move |_, _| { b.lock().unwrap().push("button"); Ok(()) }).unwrap();
        m.handle_click(&click(&m, 4)).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["menu", "button"]);
    }

    #[test]
    fn failing_click_hook_skips_button() {
        let mut m = menu(1);
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        m.on_click(|_, _| anyhow::bail!("nope"));
        m.button(4, Item::new("STONE"), move |_, _| { r.fetch_add(1, Ordering::SeqCst); Ok(()) }).unwrap();
        assert!(m.handle_click(&click(&m, 4)).is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        // The hook survives its own failure.
        assert!(m.handle_click(&click(&m, 4)).is_err());
    }

    #[test]
    fn button_can_unbind_itself() {
        let mut m = menu(1);
        m.button(4, Item::new("TNT"), |event, menu| {
            menu.remove_button(event.slot);
            Ok(())
        })
        .unwrap();
        m.handle_click(&click(&m, 4)).unwrap();
        assert!(m.button_at(4).is_none());
        assert!(m.get_item(4).is_none());
    }

    #[test]
    fn button_can_replace_itself() {
        let mut m = menu(1);
        m.button(4, Item::new("TNT"), |event, menu| {
            menu.button(event.slot, Item::new("AIR_BLOCK"), |_, _| Ok(()))
                .map_err(Into::into)
        })
        .unwrap();
        m.handle_click(&click(&m, 4)).unwrap();
        assert_eq!(m.button_at(4).unwrap().visual().material, "AIR_BLOCK");
    }

    #[test]
    fn hook_can_mutate_its_menu() {
        let mut m = menu(1);
        m.on_click(|menu, event| {
            menu.set_item(event.slot, Item::new("CLICKED"))?;
            Ok(())
        });
        m.handle_click(&click(&m, 6)).unwrap();
        assert_eq!(m.get_item(6).unwrap().material, "CLICKED");
    }
}
