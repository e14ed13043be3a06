//! Toolkit context tests.
//!
//! Cover: single initialization per owner, menu factory failures,
//! registry pruning on close, teardown.

use menukit_core::{
    config::ToolkitConfig,
    error::ToolkitError,
    event::{ClickEvent, ClickKind, CloseEvent, OpenEvent},
    item::Item,
    server::Server,
    surface::{PresetLayout, SurfaceLayout},
    toolkit::Toolkit,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

fn build() -> (Server, Toolkit) {
    let config = ToolkitConfig::default();
    let server = Server::new(&config).expect("server");
    let toolkit = Toolkit::init(config, server.host_executor(), server.bus()).expect("toolkit");
    (server, toolkit)
}

#[test]
fn second_init_with_same_owner_fails() {
    let (server, _toolkit) = build();
    let again = Toolkit::init(ToolkitConfig::default(), server.host_executor(), server.bus());
    assert!(matches!(again, Err(ToolkitError::AlreadyInitialized { .. })));

    let mut other = ToolkitConfig::default();
    other.owner = "second-plugin".to_string();
    let second = Toolkit::init(other, server.host_executor(), server.bus()).unwrap();
    assert_eq!(second.owner(), "second-plugin");
    assert_eq!(second.config().router.click_delay_ticks, 1);
    assert!(second.bus().is_claimed("menukit"));
    assert!(second.bus().is_claimed("second-plugin"));
}

#[test]
fn invalid_config_is_rejected_before_claiming() {
    let server = Server::new(&ToolkitConfig::default()).unwrap();
    let mut config = ToolkitConfig::default();
    config.router.click_delay_ticks = 0;
    assert!(matches!(
        Toolkit::init(config, server.host_executor(), server.bus()),
        Err(ToolkitError::InvalidConfig { .. })
    ));
    assert!(!server.bus().is_claimed("menukit"));
}

#[test]
fn menu_factory_validates_rows() {
    let (_server, toolkit) = build();
    for rows in [0, 6, 9] {
        let result = toolkit.menu("Bad", SurfaceLayout::Rows(rows), |_| Ok(()));
        assert!(
            matches!(result, Err(ToolkitError::InvalidRowCount { rows: r }) if r == rows),
            "rows={rows} was accepted"
        );
    }
    assert!(toolkit.registry().is_empty());

    let menu = toolkit.menu("Good", SurfaceLayout::Rows(3), |_| Ok(())).unwrap();
    assert_eq!(menu.lock().size(), 27);
    let hopper = toolkit
        .menu("Hopper", SurfaceLayout::Preset(PresetLayout::Hopper), |_| Ok(()))
        .unwrap();
    assert_eq!(hopper.lock().size(), 5);
}

#[test]
fn failed_configuration_registers_nothing() {
    let (_server, toolkit) = build();
    let result = toolkit.menu("Half", SurfaceLayout::Rows(1), |menu| {
        menu.set_item(0, Item::new("STONE"))?;
        menu.set_item(99, Item::new("STONE"))
    });
    assert!(matches!(result, Err(ToolkitError::SlotOutOfRange { slot: 99, size: 9 })));
    assert!(toolkit.registry().is_empty());
}

#[test]
fn closed_and_dropped_menus_are_pruned() {
    let (mut server, toolkit) = build();
    let viewer = server.join("notch").unwrap();
    let menu = toolkit.menu("Temp", SurfaceLayout::Rows(1), |_| Ok(())).unwrap();
    let kept = toolkit.menu("Kept", SurfaceLayout::Rows(1), |_| Ok(())).unwrap();
    menu.open(&mut server, viewer).unwrap();
    drop(menu);
    assert_eq!(toolkit.registry().len(), 2);

    server.close_view(viewer).unwrap();
    assert_eq!(toolkit.registry().len(), 1);
    assert!(toolkit.registry().resolve(kept.surface_id()).is_some());
}

#[test]
fn viewed_menu_survives_dropped_handle() {
    let (mut server, toolkit) = build();
    let viewer = server.join("jeb").unwrap();
    let clicks = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&clicks);
    let menu = toolkit
        .menu("Fire and forget", SurfaceLayout::Rows(1), move |menu| {
            menu.button(0, Item::new("BELL"), move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .unwrap();
    menu.open(&mut server, viewer).unwrap();
    drop(menu);

    server.click(viewer, Some(0), ClickKind::Left).unwrap();
    server.tick();
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
}

#[test]
fn shutdown_releases_listeners_tasks_and_menus() {
    let (mut server, toolkit) = build();
    let viewer = server.join("dinnerbone").unwrap();
    let clicks = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&clicks);
    let menu = toolkit
        .menu("Soon gone", SurfaceLayout::Rows(1), move |menu| {
            menu.button(0, Item::new("CLOCK"), move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .unwrap();
    menu.open(&mut server, viewer).unwrap();
    let ticker = toolkit.scheduler().repeat_ticks(1, |_| Ok(()));

    // A click is pending when the toolkit goes away.
    server.click(viewer, Some(0), ClickKind::Left).unwrap();
    let bus = server.bus();
    let report = toolkit.shutdown();

    assert_eq!(report.listeners_removed, 3);
    assert_eq!(report.tasks_cancelled, 2);
    assert_eq!(report.menus_dropped, 1);
    assert!(ticker.is_cancelled());
    assert_eq!(bus.listener_count::<ClickEvent>(), 0);
    assert_eq!(bus.listener_count::<OpenEvent>(), 0);
    assert_eq!(bus.listener_count::<CloseEvent>(), 0);

    server.run_ticks(2);
    assert_eq!(clicks.load(Ordering::SeqCst), 0);

    let event = server.click(viewer, Some(0), ClickKind::Left).unwrap();
    assert!(!menukit_core::event::Cancellable::is_cancelled(&event));

    // The owner name is free again.
    assert!(Toolkit::init(ToolkitConfig::default(), server.host_executor(), bus).is_ok());
}
