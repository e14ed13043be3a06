//! Minimal item representation rendered into surface positions.
//!
//! The toolkit treats items as opaque visuals; only the fields needed
//! for stacking and air detection are modelled.

use serde::{Deserialize, Serialize};

pub const MAX_STACK_SIZE: u32 = 64;

const AIR: &str = "AIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub material:     String,
    pub amount:       u32,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Item {
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            amount: 1,
            display_name: None,
        }
    }

    pub fn air() -> Self {
        Self { material: AIR.to_string(), amount: 0, display_name: None }
    }

    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = amount;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// An air slot renders as nothing.
    pub fn is_air(&self) -> bool {
        self.material == AIR || self.amount == 0
    }

    /// Two items stack when everything but the amount matches.
    pub fn is_similar(&self, other: &Item) -> bool {
        self.material == other.material && self.display_name == other.display_name
    }
}
