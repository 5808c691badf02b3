//! Zone model, layout templates and layout validation.
//!
//! Zones live in a normalized percentage space: the containing canvas is
//! always `[0, 100] x [0, 100]` regardless of the physical resolution. Every
//! constructor and mutator in this module clamps its input, so a [`Zone`]
//! obtained from here always satisfies the bounds and minimum-size
//! invariants. Only deserialized data can violate them, which is what
//! [`validate_layout`] reports.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{new_id, EntityId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum width and height of a zone, in percent of the canvas.
pub const MIN_SIZE: f64 = 10.0;

/// Extent of the normalized canvas on both axes.
pub const CANVAS_EXTENT: f64 = 100.0;

/// Tolerance used when checking invariants on computed floating-point values.
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Width and height of a zone created with "add zone".
pub const DEFAULT_ZONE_SIZE: f64 = 30.0;

/// Default canvas resolution for new templates.
pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 1920,
    height: 1080,
};

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// A rectangular region of a layout template, in percentage units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: EntityId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Zone {
    /// Build a zone, clamping the geometry into a valid rectangle.
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            x,
            y,
            width,
            height,
        }
        .clamped()
    }

    /// X coordinate of the right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Y coordinate of the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Returns `true` when the zone satisfies every geometric invariant.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.x >= -GEOMETRY_EPSILON
            && self.y >= -GEOMETRY_EPSILON
            && self.right() <= CANVAS_EXTENT + GEOMETRY_EPSILON
            && self.bottom() <= CANVAS_EXTENT + GEOMETRY_EPSILON
            && self.width >= MIN_SIZE - GEOMETRY_EPSILON
            && self.height >= MIN_SIZE - GEOMETRY_EPSILON
    }

    /// Return a copy of this zone forced into a valid rectangle.
    ///
    /// Size is clamped first (to `[MIN_SIZE, 100]`), then position is clamped
    /// so the zone fits inside the canvas with that size.
    pub fn clamped(&self) -> Self {
        let width = finite_or(self.width, MIN_SIZE).clamp(MIN_SIZE, CANVAS_EXTENT);
        let height = finite_or(self.height, MIN_SIZE).clamp(MIN_SIZE, CANVAS_EXTENT);
        let x = finite_or(self.x, 0.0).clamp(0.0, CANVAS_EXTENT - width);
        let y = finite_or(self.y, 0.0).clamp(0.0, CANVAS_EXTENT - height);
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            x,
            y,
            width,
            height,
        }
    }

    /// Axis-aligned intersection test. Zones that only share an edge do not
    /// overlap.
    pub fn overlaps(&self, other: &Zone) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }
}

/// Replace NaN and infinities with `fallback`.
pub(crate) fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// All overlapping pairs `(i, j)` with `i < j`, reported by zone id.
pub fn find_overlaps(zones: &[Zone]) -> Vec<(EntityId, EntityId)> {
    let mut pairs = Vec::new();
    for (i, a) in zones.iter().enumerate() {
        for b in &zones[i + 1..] {
            if a.overlaps(b) {
                pairs.push((a.id.clone(), b.id.clone()));
            }
        }
    }
    pairs
}

// ---------------------------------------------------------------------------
// Layout template
// ---------------------------------------------------------------------------

/// Physical resolution the template is designed for, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        DEFAULT_RESOLUTION
    }
}

/// Shape family of a layout template. Everything except `Custom` can be
/// produced by [`LayoutTemplate::quick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    Fullscreen,
    SplitHorizontal,
    SplitVertical,
    Grid,
    LShape,
    MainSidebar,
    Custom,
}

/// A named set of zones that together describe one screen layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LayoutTemplate {
    pub id: EntityId,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(rename = "type")]
    pub layout_type: LayoutType,
}

impl LayoutTemplate {
    /// An empty custom template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            zones: Vec::new(),
            resolution: Resolution::default(),
            layout_type: LayoutType::Custom,
        }
    }

    /// Generate one of the predefined quick templates.
    pub fn quick(kind: LayoutType) -> Self {
        let specs: &[(&str, f64, f64, f64, f64)] = match kind {
            LayoutType::Fullscreen => &[("Main", 0.0, 0.0, 100.0, 100.0)],
            LayoutType::SplitHorizontal => &[
                ("Left", 0.0, 0.0, 50.0, 100.0),
                ("Right", 50.0, 0.0, 50.0, 100.0),
            ],
            LayoutType::SplitVertical => &[
                ("Top", 0.0, 0.0, 100.0, 50.0),
                ("Bottom", 0.0, 50.0, 100.0, 50.0),
            ],
            LayoutType::Grid => &[
                ("Top Left", 0.0, 0.0, 50.0, 50.0),
                ("Top Right", 50.0, 0.0, 50.0, 50.0),
                ("Bottom Left", 0.0, 50.0, 50.0, 50.0),
                ("Bottom Right", 50.0, 50.0, 50.0, 50.0),
            ],
            LayoutType::LShape => &[
                ("Main", 0.0, 0.0, 75.0, 75.0),
                ("Sidebar", 75.0, 0.0, 25.0, 100.0),
                ("Ticker", 0.0, 75.0, 75.0, 25.0),
            ],
            LayoutType::MainSidebar => &[
                ("Main", 0.0, 0.0, 70.0, 100.0),
                ("Sidebar", 70.0, 0.0, 30.0, 100.0),
            ],
            LayoutType::Custom => &[],
        };

        let zones = specs
            .iter()
            .enumerate()
            .map(|(i, (name, x, y, w, h))| {
                Zone::new(format!("zone-{}", i + 1), *name, *x, *y, *w, *h)
            })
            .collect();

        Self {
            id: new_id(),
            name: quick_template_name(kind).to_string(),
            description: String::new(),
            zones,
            resolution: Resolution::default(),
            layout_type: kind,
        }
    }

    /// Look up a zone by id.
    pub fn zone(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == zone_id)
    }

    /// Append a default-sized zone and return its id.
    ///
    /// New zones cascade down-right from `(10, 10)` in steps of 5 so that
    /// consecutive additions do not stack exactly on top of each other.
    pub fn add_zone(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.next_zone_id();
        let step = (self.zones.len() % 10) as f64;
        let offset = 10.0 + 5.0 * step;
        let zone = Zone::new(
            id.clone(),
            name,
            offset,
            offset,
            DEFAULT_ZONE_SIZE,
            DEFAULT_ZONE_SIZE,
        );
        self.zones.push(zone);
        self.layout_type = LayoutType::Custom;
        id
    }

    /// Remove a zone, returning it if it existed.
    pub fn remove_zone(&mut self, zone_id: &str) -> Option<Zone> {
        let index = self.zones.iter().position(|z| z.id == zone_id)?;
        self.layout_type = LayoutType::Custom;
        Some(self.zones.remove(index))
    }

    /// Rename a zone.
    pub fn rename_zone(&mut self, zone_id: &str, name: impl Into<String>) -> Result<(), CoreError> {
        let zone = self
            .zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| CoreError::not_found("zone", zone_id))?;
        zone.name = name.into();
        Ok(())
    }

    /// Replace the zone list, e.g. with the output of a drag update. Every
    /// zone is clamped on the way in.
    pub fn set_zones(&mut self, zones: Vec<Zone>) {
        self.zones = zones.iter().map(Zone::clamped).collect();
    }

    fn next_zone_id(&self) -> EntityId {
        let mut n = self.zones.len() + 1;
        loop {
            let candidate = format!("zone-{n}");
            if self.zone(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}

fn quick_template_name(kind: LayoutType) -> &'static str {
    match kind {
        LayoutType::Fullscreen => "Fullscreen",
        LayoutType::SplitHorizontal => "Split Horizontal",
        LayoutType::SplitVertical => "Split Vertical",
        LayoutType::Grid => "Grid 2x2",
        LayoutType::LShape => "L-Shape",
        LayoutType::MainSidebar => "Main + Sidebar",
        LayoutType::Custom => "Custom Layout",
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Advisory layout problems. None of these block editing; only
/// [`LayoutWarning::NoZones`] blocks saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutWarning {
    NoZones,
    Overlap { first: EntityId, second: EntityId },
    EmptyZone { zone_id: EntityId },
    OutOfBounds { zone_id: EntityId },
}

/// Geometric warnings for a template: no zones, invalid rectangles and
/// overlapping pairs.
pub fn validate_layout(template: &LayoutTemplate) -> Vec<LayoutWarning> {
    let mut warnings = Vec::new();
    if template.zones.is_empty() {
        warnings.push(LayoutWarning::NoZones);
    }
    for zone in &template.zones {
        if !zone.is_valid() {
            warnings.push(LayoutWarning::OutOfBounds {
                zone_id: zone.id.clone(),
            });
        }
    }
    for (first, second) in find_overlaps(&template.zones) {
        warnings.push(LayoutWarning::Overlap { first, second });
    }
    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
