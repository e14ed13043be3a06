//! The toolkit context, passed explicitly to whatever builds menus.
//!
//! LIFECYCLE:
//!   1. `Toolkit::init` once at process start: claims the owner name on the
//!      event bus and installs the click router.
//!   2. Pass `&Toolkit` to whatever builds menus or schedules work.
//!   3. `Toolkit::shutdown` at teardown: removes the listeners, cancels the
//!      owner's pending tasks and drops every registered menu.

use crate::{
    config::ToolkitConfig,
    dispatch::EventBus,
    error::ToolkitResult,
    menu::{Menu, MenuHandle},
    registry::MenuRegistry,
    router::MenuClickRouter,
    scheduler::{HostExecutor, Scheduler},
    surface::SurfaceLayout,
};
use serde::Serialize;
use std::sync::Arc;

pub struct Toolkit {
    config:    ToolkitConfig,
    bus:       Arc<EventBus>,
    registry:  Arc<MenuRegistry>,
    scheduler: Scheduler,
    router:    MenuClickRouter,
}

/// What teardown released.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    pub listeners_removed: usize,
    pub tasks_cancelled:   usize,
    pub menus_dropped:     usize,
}

impl Toolkit {
    /// Fails with `AlreadyInitialized` if the owner name is already claimed
    /// on `bus`, and with `InvalidConfig` for a bad configuration.
    pub fn init(
        config: ToolkitConfig,
        executor: Arc<dyn HostExecutor>,
        bus: Arc<EventBus>,
    ) -> ToolkitResult<Self> {
        config.validate()?;
        bus.claim_owner(&config.owner)?;

        let registry = Arc::new(MenuRegistry::new());
        let scheduler = Scheduler::new(config.owner.clone(), executor);
        let router =
            MenuClickRouter::install(&bus, Arc::clone(&registry), scheduler.clone(), &config.router);

        log::info!(
            "Toolkit '{}' initialized (click delay {} ticks)",
            config.owner,
            config.router.click_delay_ticks
        );
        Ok(Self { config, bus, registry, scheduler, router })
    }

    pub fn owner(&self) -> &str { &self.config.owner }
    pub fn config(&self) -> &ToolkitConfig { &self.config }
    pub fn scheduler(&self) -> &Scheduler { &self.scheduler }
    pub fn registry(&self) -> &MenuRegistry { &self.registry }
    pub fn bus(&self) -> &EventBus { &self.bus }

    /// Build a menu, let `configure` fill it in, then register it so the
    /// router can find it. Nothing is registered if any step fails.
    pub fn menu<F>(
        &self,
        title: impl Into<String>,
        layout: SurfaceLayout,
        configure: F,
    ) -> ToolkitResult<MenuHandle>
    where
        F: FnOnce(&mut Menu) -> ToolkitResult<()>,
    {
        let mut menu = Menu::new(title, layout)?;
        configure(&mut menu)?;
        Ok(self.register(menu))
    }

    /// Register an already-built menu.
    pub fn register(&self, menu: Menu) -> MenuHandle {
        let handle = MenuHandle::new(menu);
        self.registry.register(handle.clone());
        log::debug!("{} registered menu on {}", self.config.owner, handle.surface_id());
        handle
    }

    pub fn shutdown(self) -> ShutdownReport {
        let tasks_cancelled = self.scheduler.cancel_all();
        let listeners_removed =
            self.router.uninstall(&self.bus) + self.bus.release_owner(&self.config.owner);
        let menus_dropped = self.registry.clear();
        let report = ShutdownReport { listeners_removed, tasks_cancelled, menus_dropped };
        log::info!("Toolkit '{}' shut down: {report:?}", self.config.owner);
        report
    }
}
