//! Surfaces: the addressable grids of positions a viewer can open.
//!
//! RULE: Only row layouts and grid presets are rectangular.
//! Border rendering is defined for rectangular surfaces only.

use crate::{
    error::{ToolkitError, ToolkitResult},
    item::{Item, MAX_STACK_SIZE},
    types::{Slot, SurfaceId, ROW_WIDTH},
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// A surface shared between its owner and the host presenting it.
pub type SharedSurface = Arc<Mutex<Surface>>;

/// Rows accepted for a row-based layout: [1, 6).
pub const VALID_ROWS: std::ops::Range<usize> = 1..6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceLayout {
    /// `rows` × 9 positions.
    Rows(usize),
    /// A host-defined layout with a fixed size.
    Preset(PresetLayout),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetLayout {
    Hopper,
    Dispenser,
    Dropper,
    Furnace,
    BrewingStand,
    Anvil,
    Workbench,
}

impl PresetLayout {
    pub fn size(self) -> usize {
        match self {
            Self::Hopper       => 5,
            Self::Dispenser    => 9,
            Self::Dropper      => 9,
            Self::Furnace      => 3,
            Self::BrewingStand => 5,
            Self::Anvil        => 3,
            Self::Workbench    => 10,
        }
    }

    /// (width, rows) for presets laid out as a grid.
    pub fn grid(self) -> Option<(usize, usize)> {
        match self {
            Self::Hopper                   => Some((5, 1)),
            Self::Dispenser | Self::Dropper => Some((3, 3)),
            _                              => None,
        }
    }
}

impl SurfaceLayout {
    pub fn validate(self) -> ToolkitResult<()> {
        match self {
            Self::Rows(rows) if !VALID_ROWS.contains(&rows) => {
                Err(ToolkitError::InvalidRowCount { rows })
            }
            _ => Ok(()),
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::Rows(rows)     => rows * ROW_WIDTH,
            Self::Preset(preset) => preset.size(),
        }
    }

    pub fn grid(self) -> Option<(usize, usize)> {
        match self {
            Self::Rows(rows)     => Some((ROW_WIDTH, rows)),
            Self::Preset(preset) => preset.grid(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Surface {
    id:     SurfaceId,
    title:  String,
    layout: SurfaceLayout,
    slots:  Vec<Option<Item>>,
}

impl Surface {
    pub fn new(title: impl Into<String>, layout: SurfaceLayout) -> ToolkitResult<Self> {
        layout.validate()?;
        Ok(Self {
            id: SurfaceId::new(),
            title: title.into(),
            layout,
            slots: vec![None; layout.size()],
        })
    }

    pub fn shared(self) -> SharedSurface {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> SurfaceId { self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn layout(&self) -> SurfaceLayout { self.layout }
    pub fn size(&self) -> usize { self.slots.len() }
    pub fn contents(&self) -> &[Option<Item>] { &self.slots }

    pub fn contains_slot(&self, slot: Slot) -> bool {
        slot < self.slots.len()
    }

    pub fn check_slot(&self, slot: Slot) -> ToolkitResult<()> {
        if self.contains_slot(slot) {
            Ok(())
        } else {
            Err(ToolkitError::SlotOutOfRange { slot, size: self.size() })
        }
    }

    /// Item at `slot`; `None` when empty or out of range.
    pub fn get(&self, slot: Slot) -> Option<&Item> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn set(&mut self, slot: Slot, item: Option<Item>) -> ToolkitResult<()> {
        self.check_slot(slot)?;
        self.slots[slot] = item;
        Ok(())
    }

    pub fn take(&mut self, slot: Slot) -> Option<Item> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// True when `slot` holds nothing or air.
    pub fn is_vacant(&self, slot: Slot) -> bool {
        self.get(slot).map_or(true, Item::is_air)
    }

    pub fn first_empty(&self) -> Option<Slot> {
        (0..self.size()).find(|&slot| self.is_vacant(slot))
    }

    pub fn has_space(&self) -> bool {
        self.first_empty().is_some()
    }

    pub fn is_empty(&self) -> bool {
        (0..self.size()).all(|slot| self.is_vacant(slot))
    }

    /// Add items, topping up similar stacks before using empty slots.
    /// Returns whatever did not fit.
    pub fn add_items(&mut self, items: impl IntoIterator<Item = Item>) -> Vec<Item> {
        let mut leftovers = Vec::new();
        for item in items {
            if item.is_air() {
                continue;
            }
            if let Some(rest) = self.add_one(item) {
                leftovers.push(rest);
            }
        }
        leftovers
    }

    fn add_one(&mut self, mut item: Item) -> Option<Item> {
        for existing in self.slots.iter_mut().flatten() {
            if existing.is_air() || !existing.is_similar(&item) {
                continue;
            }
            let room = MAX_STACK_SIZE.saturating_sub(existing.amount);
            let moved = room.min(item.amount);
            existing.amount += moved;
            item.amount -= moved;
            if item.amount == 0 {
                return None;
            }
        }
        while item.amount > 0 {
            let Some(slot) = self.first_empty() else {
                return Some(item);
            };
            let moved = item.amount.min(MAX_STACK_SIZE);
            self.slots[slot] = Some(item.clone().with_amount(moved));
            item.amount -= moved;
        }
        None
    }

    /// Positions on the outer ring of a rectangular surface, in row order.
    /// Empty for non-grid presets.
    pub fn border_slots(&self) -> Vec<Slot> {
        let Some((width, rows)) = self.layout.grid() else {
            return Vec::new();
        };
        (0..rows)
            .flat_map(|row| (0..width).map(move |column| (row, column)))
            .filter(|&(row, column)| {
                row == 0 || row == rows - 1 || column == 0 || column == width - 1
            })
            .map(|(row, column)| row * width + column)
            .collect()
    }
}
