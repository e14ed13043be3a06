//! menukit-core: menus, buttons and tick-based task scheduling for a
//! tick-driven game server.
//!
//! Build a `Toolkit` once against the host's executor and event bus, then
//! create menus through it. The `server` module is a reference host used
//! by the runner and the tests.

pub mod button;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod executor;
pub mod item;
pub mod menu;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod server;
pub mod surface;
pub mod time_unit;
pub mod toolkit;
pub mod types;

mod sync;
