//! Menu click router: connects host occurrences to menus.
//!
//! CLICK PROTOCOL (fixed, must not be reordered):
//!   1. A click outside any inventory-backed position is ignored.
//!   2. The menu is resolved from the TOP surface of the viewer's view.
//!      No menu, nothing happens.
//!   3. The click is cancelled, wherever in the view it landed. This
//!      includes the viewer's own inventory while a menu is on top.
//!   4. A click outside the menu's own surface stops here.
//!   5. Otherwise the menu's click hook and then the bound button run
//!      on the main lane `click_delay_ticks` later (one tick by default),
//!      after the host has finished processing the click.
//!
//! Open and close occurrences reach the menu's hooks synchronously.

use crate::{
    config::RouterConfig,
    dispatch::{EventBus, SubscriptionId},
    event::{Cancellable, ClickEvent, CloseEvent, OpenEvent},
    registry::MenuRegistry,
    scheduler::{Lane, Scheduler},
    time_unit::TimeUnit,
    types::Tick,
};
use std::sync::Arc;

pub struct MenuClickRouter {
    subscriptions: Vec<SubscriptionId>,
}

impl MenuClickRouter {
    /// Subscribe the router's three listeners under the scheduler's owner.
    pub fn install(
        bus: &EventBus,
        registry: Arc<MenuRegistry>,
        scheduler: Scheduler,
        config: &RouterConfig,
    ) -> Self {
        let owner = scheduler.owner().to_string();

        let open = {
            let registry = Arc::clone(&registry);
            bus.listen::<OpenEvent, _>(&owner, move |event| {
                let Some(menu) = registry.resolve(event.surface) else {
                    return Ok(());
                };
                let result = menu.lock().handle_open(event);
                result
            })
        };

        let close = {
            let registry = Arc::clone(&registry);
            bus.listen::<CloseEvent, _>(&owner, move |event| {
                let result = match registry.resolve(event.surface) {
                    Some(menu) => {
                        let mut menu = menu.lock();
                        menu.handle_close(event)
                    }
                    None => Ok(()),
                };
                registry.prune();
                result
            })
        };

        let delay = config.click_delay_ticks;
        let click = bus.listen::<ClickEvent, _>(&owner, move |event| {
            route_click(&registry, &scheduler, delay, event);
            Ok(())
        });

        Self { subscriptions: vec![open, close, click] }
    }

    /// Remove the router's listeners. Returns how many were still subscribed.
    pub fn uninstall(self, bus: &EventBus) -> usize {
        self.subscriptions
            .into_iter()
            .filter(|id| bus.unsubscribe(*id))
            .count()
    }
}

fn route_click(registry: &MenuRegistry, scheduler: &Scheduler, delay: Tick, event: &mut ClickEvent) {
    if event.clicked.is_none() {
        return;
    }
    let Some(menu) = registry.resolve(event.view.top) else {
        return;
    };

    event.set_cancelled(true);

    if event.clicked != Some(menu.surface_id()) {
        return;
    }

    let click = event.clone();
    let handle = scheduler.run_delayed(delay, TimeUnit::Ticks, Lane::Main, move |_| {
        menu.lock().handle_click(&click)
    });
    log::trace!(
        "deferred click by {} on slot {} as task {:?}",
        event.viewer,
        event.slot,
        handle.id()
    );
}
