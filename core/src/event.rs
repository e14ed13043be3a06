//! Occurrences the host delivers to listeners.
//!
//! RULE: The host constructs occurrences; listeners only read them and,
//! where the occurrence is cancellable, flip its cancel flag.
//! The host inspects the flag after every listener has returned.

use crate::types::{Slot, SurfaceId, Tick, ViewerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything the event bus can deliver.
pub trait Occurrence: Send + 'static {
    /// Whether a listener has already cancelled this occurrence.
    /// Always false for occurrences that cannot be cancelled.
    fn cancelled(&self) -> bool {
        false
    }
}

pub trait Cancellable {
    fn is_cancelled(&self) -> bool;
    fn set_cancelled(&mut self, cancel: bool);
}

/// The pair of surfaces a viewer sees while a container is open:
/// the container on top and their own inventory below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryView {
    pub top:      SurfaceId,
    pub top_size: usize,
    pub bottom:   SurfaceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickKind {
    Left,
    Right,
    ShiftLeft,
    ShiftRight,
    Middle,
    Drop,
}

impl ClickKind {
    pub fn is_shift(self) -> bool {
        matches!(self, Self::ShiftLeft | Self::ShiftRight)
    }
}

/// A viewer opened a surface. Cancelling keeps it closed.
#[derive(Debug, Clone, Serialize)]
pub struct OpenEvent {
    pub viewer:  ViewerId,
    pub surface: SurfaceId,
    pub tick:    Tick,
    cancelled:   bool,
}

impl OpenEvent {
    pub fn new(viewer: ViewerId, surface: SurfaceId, tick: Tick) -> Self {
        Self { viewer, surface, tick, cancelled: false }
    }
}

impl Cancellable for OpenEvent {
    fn is_cancelled(&self) -> bool { self.cancelled }
    fn set_cancelled(&mut self, cancel: bool) { self.cancelled = cancel; }
}

impl Occurrence for OpenEvent {
    fn cancelled(&self) -> bool { self.cancelled }
}

/// A viewer closed a surface.
#[derive(Debug, Clone, Serialize)]
pub struct CloseEvent {
    pub viewer:  ViewerId,
    pub surface: SurfaceId,
    pub tick:    Tick,
}

impl Occurrence for CloseEvent {}

/// A viewer clicked somewhere inside an open view.
///
/// `raw_slot` indexes the combined view (top surface first, then the
/// viewer's own inventory). `clicked` is `None` when the click landed
/// outside any inventory-backed position.
#[derive(Debug, Clone, Serialize)]
pub struct ClickEvent {
    pub viewer:   ViewerId,
    pub view:     InventoryView,
    pub raw_slot: Option<usize>,
    pub clicked:  Option<SurfaceId>,
    /// Position inside `clicked`.
    pub slot:     Slot,
    pub kind:     ClickKind,
    pub tick:     Tick,
    cancelled:    bool,
}

impl ClickEvent {
    pub fn new(
        viewer: ViewerId,
        view: InventoryView,
        raw_slot: Option<usize>,
        kind: ClickKind,
        tick: Tick,
    ) -> Self {
        let (clicked, slot) = match raw_slot {
            Some(raw) if raw < view.top_size => (Some(view.top), raw),
            Some(raw) => (Some(view.bottom), raw - view.top_size),
            None => (None, 0),
        };
        Self { viewer, view, raw_slot, clicked, slot, kind, tick, cancelled: false }
    }

    /// The click landed in the top surface of the view.
    pub fn in_top(&self) -> bool {
        self.clicked == Some(self.view.top)
    }
}

impl Cancellable for ClickEvent {
    fn is_cancelled(&self) -> bool { self.cancelled }
    fn set_cancelled(&mut self, cancel: bool) { self.cancelled = cancel; }
}

impl Occurrence for ClickEvent {
    fn cancelled(&self) -> bool { self.cancelled }
}

/// A cancellable, timestamped wrapper for toolkit-defined occurrences.
#[derive(Debug, Clone)]
pub struct CustomEvent<T> {
    pub payload:  T,
    pub fired_at: DateTime<Utc>,
    cancelled:    bool,
}

impl<T> CustomEvent<T> {
    pub fn new(payload: T) -> Self {
        Self { payload, fired_at: Utc::now(), cancelled: false }
    }
}

impl<T> Cancellable for CustomEvent<T> {
    fn is_cancelled(&self) -> bool { self.cancelled }
    fn set_cancelled(&mut self, cancel: bool) { self.cancelled = cancel; }
}

impl<T: Send + 'static> Occurrence for CustomEvent<T> {
    fn cancelled(&self) -> bool { self.cancelled }
}
