//! Buttons: a visual plus click behaviour bound to one menu position.
//!
//! RULE: A button never holds a reference to its menu. The menu lends
//! itself to the button for the duration of one click call.

use crate::{error::HookResult, event::ClickEvent, item::Item, menu::Menu, types::Slot};
use std::any::Any;

/// The contract every button fulfills.
pub trait Button: Send {
    fn slot(&self) -> Slot;

    /// What the menu renders when the button is bound.
    fn visual(&self) -> &Item;

    /// Called one tick after a click landed on this button's slot,
    /// after the menu's own click hook.
    fn on_click(&mut self, event: &ClickEvent, menu: &mut Menu) -> HookResult;

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}

pub type ClickCallback = Box<dyn FnMut(&ClickEvent, &mut Menu) -> HookResult + Send>;

/// Receives the state after the flip.
pub type StateChangeCallback = Box<dyn FnMut(bool, &ClickEvent, &mut Menu) -> HookResult + Send>;

/// A button that runs the same callback on every click.
pub struct ClickButton {
    slot:     Slot,
    visual:   Item,
    callback: ClickCallback,
}

impl ClickButton {
    pub fn new<F>(slot: Slot, visual: Item, callback: F) -> Self
    where
        F: FnMut(&ClickEvent, &mut Menu) -> HookResult + Send + 'static,
    {
        Self { slot, visual, callback: Box::new(callback) }
    }
}

impl Button for ClickButton {
    fn slot(&self) -> Slot { self.slot }
    fn visual(&self) -> &Item { &self.visual }

    fn on_click(&mut self, event: &ClickEvent, menu: &mut Menu) -> HookResult {
        (self.callback)(event, menu)
    }

    fn as_any(&self) -> &dyn Any { self }
}

/// A two-state button. Every click flips the state, then notifies.
///
/// The rendered item is not refreshed by the flip; callers that want the
/// slot to follow the state re-render it from the callback with
/// `menu.set_item(event.slot, ..)`.
pub struct ToggleableButton {
    slot:            Slot,
    true_visual:     Item,
    false_visual:    Item,
    state:           bool,
    on_state_change: StateChangeCallback,
}

impl ToggleableButton {
    pub fn new<F>(slot: Slot, true_visual: Item, false_visual: Item, state: bool, callback: F) -> Self
    where
        F: FnMut(bool, &ClickEvent, &mut Menu) -> HookResult + Send + 'static,
    {
        Self {
            slot,
            true_visual,
            false_visual,
            state,
            on_state_change: Box::new(callback),
        }
    }

    pub fn state(&self) -> bool { self.state }
    pub fn true_visual(&self) -> &Item { &self.true_visual }
    pub fn false_visual(&self) -> &Item { &self.false_visual }

    pub fn visual_for(&self, state: bool) -> &Item {
        if state { &self.true_visual } else { &self.false_visual }
    }
}

impl Button for ToggleableButton {
    fn slot(&self) -> Slot { self.slot }

    fn visual(&self) -> &Item {
        self.visual_for(self.state)
    }

    fn on_click(&mut self, event: &ClickEvent, menu: &mut Menu) -> HookResult {
        self.state = !self.state;
        (self.on_state_change)(self.state, event, menu)
    }

    fn as_any(&self) -> &dyn Any { self }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::{ClickKind, InventoryView},
        surface::SurfaceLayout,
        types::ViewerId,
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn click_on(menu: &Menu, slot: usize) -> ClickEvent {
        let view = InventoryView {
            top: menu.surface_id(),
            top_size: menu.size(),
            bottom: crate::types::SurfaceId::new(),
        };
        ClickEvent::new(ViewerId::new(), view, Some(slot), ClickKind::Left, 0)
    }

    #[test]
    fn toggle_flips_before_notifying() {
        let mut menu = Menu::new("t", SurfaceLayout::Rows(1)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut button = ToggleableButton::new(
            2,
            Item::new("LIME_DYE"),
            Item::new("GRAY_DYE"),
            true,
            move |state, _, _| {
                assert!(!state || seen.load(Ordering::SeqCst) == 1);
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
        let event = click_on(&menu, 2);

        button.on_click(&event, &mut menu).unwrap();
        assert!(!button.state());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        button.on_click(&event, &mut menu).unwrap();
        assert!(button.state());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn toggle_visual_tracks_state_but_menu_is_not_rerendered() {
        let mut menu = Menu::new("t", SurfaceLayout::Rows(1)).unwrap();
        menu.add_button(ToggleableButton::new(
            0,
            Item::new("LIME_DYE"),
            Item::new("GRAY_DYE"),
            true,
            |_, _, _| Ok(()),
        ))
        .unwrap();
        assert_eq!(menu.get_item(0).unwrap().material, "LIME_DYE");

        let event = click_on(&menu, 0);
        menu.handle_click(&event).unwrap();

        let button = menu.button_at(0).unwrap();
        let toggle = button.as_any().downcast_ref::<ToggleableButton>().unwrap();
        assert!(!toggle.state());
        assert_eq!(toggle.visual().material, "GRAY_DYE");
        // The rendered slot still shows the old visual.
        assert_eq!(menu.get_item(0).unwrap().material, "LIME_DYE");
    }

    #[test]
    fn click_button_runs_callback_every_time() {
        let mut menu = Menu::new("t", SurfaceLayout::Rows(1)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut button = ClickButton::new(1, Item::new("STONE"), move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let event = click_on(&menu, 1);
        for _ in 0..3 {
            button.on_click(&event, &mut menu).unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
