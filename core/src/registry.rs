//! Surface → menu registry.
//!
//! RULE: The click router finds menus ONLY through this registry.
//! The menu factory registers every menu it builds; pruning removes
//! menus nobody can reach any more.

use crate::{menu::MenuHandle, sync::lock, types::SurfaceId};
use std::{collections::HashMap, sync::Mutex};

#[derive(Default)]
pub struct MenuRegistry {
    menus: Mutex<HashMap<SurfaceId, MenuHandle>>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, menu: MenuHandle) {
        lock(&self.menus).insert(menu.surface_id(), menu);
    }

    pub fn resolve(&self, surface: SurfaceId) -> Option<MenuHandle> {
        lock(&self.menus).get(&surface).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.menus).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.menus).is_empty()
    }

    /// Drop every menu that only the registry still holds and whose
    /// surface is not being viewed. Menus busy on another call are kept.
    pub fn prune(&self) -> usize {
        let mut menus = lock(&self.menus);
        let before = menus.len();
        menus.retain(|_, handle| {
            if handle.holders() > 1 {
                return true;
            }
            match handle.try_lock() {
                Some(menu) => menu.surface_holders() > 1,
                None => true,
            }
        });
        let pruned = before - menus.len();
        if pruned > 0 {
            log::debug!("Pruned {pruned} unreachable menus, {} remain", menus.len());
        }
        pruned
    }

    pub fn clear(&self) -> usize {
        let mut menus = lock(&self.menus);
        let count = menus.len();
        menus.clear();
        count
    }
}
