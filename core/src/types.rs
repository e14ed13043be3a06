//! Shared primitive types used across the entire toolkit.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A server tick. One tick = 50 ms of simulated time.
pub type Tick = u64;

/// An index into a surface's grid of positions.
pub type Slot = usize;

/// Fixed simulation rate of the host.
pub const TICKS_PER_SECOND: u64 = 20;

/// Width of a row-based surface.
pub const ROW_WIDTH: usize = 9;

/// Stable identity of one surface (a container in game terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Stable identity of a connected viewer (a player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewerId(pub Uuid);

impl ViewerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewerId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

/// Name a toolkit instance registers its listeners and tasks under.
pub type OwnerName = String;
