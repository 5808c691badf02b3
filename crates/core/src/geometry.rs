//! Interactive move/resize engine for zones.
//!
//! A drag is modelled as a [`DragSession`] created on pointer-down. Every
//! pointer-move produces a complete new zone list computed from the zone as it
//! was when the drag began, so intermediate frames never accumulate error and
//! every frame already satisfies the zone invariants. Releasing the pointer
//! simply drops the session.

use serde::{Deserialize, Serialize};

use crate::types::EntityId;
use crate::zone::{finite_or, Zone, CANVAS_EXTENT, MIN_SIZE};

/// Which part of the zone the user grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragHandle {
    Move,
    Top,
    Bottom,
    Left,
    Right,
}

/// A pointer position in container percentage space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

impl Pointer {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: finite_or(x, 0.0),
            y: finite_or(y, 0.0),
        }
    }
}

/// Convert a pixel position relative to the container's top-left corner into
/// percentage space, clamped to the canvas.
pub fn normalize_pointer(px: f64, py: f64, container_width: f64, container_height: f64) -> Pointer {
    let axis = |p: f64, extent: f64| {
        if extent > 0.0 && extent.is_finite() {
            (finite_or(p, 0.0) / extent * CANVAS_EXTENT).clamp(0.0, CANVAS_EXTENT)
        } else {
            0.0
        }
    };
    Pointer::new(axis(px, container_width), axis(py, container_height))
}

/// Compute the geometry of `zone` for one pointer frame.
///
/// `grab_offset` is the pointer position at press time minus the zone's
/// top-left corner; it is only used by [`DragHandle::Move`]. Resizes keep the
/// opposite edge fixed and clamp the moving edge so the dimension never drops
/// below [`MIN_SIZE`] and the zone never leaves the canvas.
pub fn compute_geometry_update(
    zone: &Zone,
    handle: DragHandle,
    pointer: Pointer,
    grab_offset: Pointer,
) -> Zone {
    let base = zone.clamped();
    let pointer = Pointer::new(pointer.x, pointer.y);
    let mut next = base.clone();

    match handle {
        DragHandle::Move => {
            next.x = (pointer.x - grab_offset.x).clamp(0.0, CANVAS_EXTENT - base.width);
            next.y = (pointer.y - grab_offset.y).clamp(0.0, CANVAS_EXTENT - base.height);
        }
        DragHandle::Right => {
            next.width = (pointer.x - base.x).clamp(MIN_SIZE, CANVAS_EXTENT - base.x);
        }
        DragHandle::Bottom => {
            next.height = (pointer.y - base.y).clamp(MIN_SIZE, CANVAS_EXTENT - base.y);
        }
        DragHandle::Left => {
            let right = base.right();
            next.x = pointer.x.clamp(0.0, right - MIN_SIZE);
            next.width = right - next.x;
        }
        DragHandle::Top => {
            let bottom = base.bottom();
            next.y = pointer.y.clamp(0.0, bottom - MIN_SIZE);
            next.height = bottom - next.y;
        }
    }

    next
}

// ---------------------------------------------------------------------------
// Drag session
// ---------------------------------------------------------------------------

/// State held between pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    zone_id: EntityId,
    handle: DragHandle,
    grab_offset: Pointer,
    origin: Zone,
}

impl DragSession {
    /// Start dragging `zone_id` with `handle` at `pointer`.
    ///
    /// Returns `None` when the zone does not exist.
    pub fn begin(
        zones: &[Zone],
        zone_id: &str,
        handle: DragHandle,
        pointer: Pointer,
    ) -> Option<Self> {
        let origin = zones.iter().find(|z| z.id == zone_id)?.clamped();
        let pointer = Pointer::new(pointer.x, pointer.y);
        let grab_offset = Pointer::new(pointer.x - origin.x, pointer.y - origin.y);
        tracing::debug!(zone_id, ?handle, "Zone drag started");
        Some(Self {
            zone_id: origin.id.clone(),
            handle,
            grab_offset,
            origin,
        })
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn handle(&self) -> DragHandle {
        self.handle
    }

    /// The dragged zone as it was at pointer-down.
    pub fn origin(&self) -> &Zone {
        &self.origin
    }

    /// Geometry of the dragged zone for this pointer frame.
    pub fn preview(&self, pointer: Pointer) -> Zone {
        compute_geometry_update(&self.origin, self.handle, pointer, self.grab_offset)
    }

    /// Return a new zone list with the dragged zone updated for `pointer`.
    ///
    /// If the zone was removed mid-drag the list is returned unchanged.
    pub fn update(&self, zones: &[Zone], pointer: Pointer) -> Vec<Zone> {
        let updated = self.preview(pointer);
        zones
            .iter()
            .map(|z| {
                if z.id == self.zone_id {
                    Zone {
                        name: z.name.clone(),
                        ..updated.clone()
                    }
                } else {
                    z.clone()
                }
            })
            .collect()
    }

    /// Return a new zone list with the dragged zone put back where it was at
    /// pointer-down.
    pub fn restore(&self, zones: &[Zone]) -> Vec<Zone> {
        zones
            .iter()
            .map(|z| {
                if z.id == self.zone_id {
                    Zone {
                        name: z.name.clone(),
                        ..self.origin.clone()
                    }
                } else {
                    z.clone()
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
