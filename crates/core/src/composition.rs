//! Compositions (a saved layout plus its zone playlists) and campaigns (a
//! rotated set of compositions).

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::playlist::ZonePlaylists;
use crate::rotation::{self, RotationPolicy, Rotator, WeightWarning};
use crate::types::{new_id, EntityId, Timestamp};
use crate::zone::{validate_layout, LayoutTemplate, LayoutWarning};

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Layout warnings plus one [`LayoutWarning::EmptyZone`] per zone without
/// media.
pub fn validate_composition(
    template: &LayoutTemplate,
    playlists: &ZonePlaylists,
) -> Vec<LayoutWarning> {
    let mut warnings = validate_layout(template);
    for zone in &template.zones {
        if playlists.is_empty(&zone.id) {
            warnings.push(LayoutWarning::EmptyZone {
                zone_id: zone.id.clone(),
            });
        }
    }
    warnings
}

/// A saved layout and its playlists. Immutable once created: the template
/// and playlists are only exposed by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    id: EntityId,
    name: String,
    template: LayoutTemplate,
    playlists: ZonePlaylists,
}

impl Composition {
    /// Freeze an edited template and its playlists into a composition.
    ///
    /// Fails only when the template has no zones or an invalid name. Other
    /// layout warnings are advisory and are logged. Playlists for zones that
    /// no longer exist are dropped.
    pub fn save(
        name: impl Into<String>,
        template: LayoutTemplate,
        mut playlists: ZonePlaylists,
    ) -> Result<Self, CoreError> {
        template.validate()?;
        if template.zones.is_empty() {
            return Err(CoreError::Validation(
                "A composition needs at least one zone".to_string(),
            ));
        }

        let zone_ids: Vec<EntityId> = template.zones.iter().map(|z| z.id.clone()).collect();
        playlists.retain_zones(&zone_ids);

        let warnings = validate_composition(&template, &playlists);
        if !warnings.is_empty() {
            tracing::info!(
                template_id = %template.id,
                warning_count = warnings.len(),
                "Saving composition with layout warnings"
            );
        }

        Ok(Self {
            id: new_id(),
            name: name.into(),
            template: LayoutTemplate {
                zones: template.zones.iter().map(|z| z.clamped()).collect(),
                ..template
            },
            playlists,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &LayoutTemplate {
        &self.template
    }

    pub fn playlists(&self) -> &ZonePlaylists {
        &self.playlists
    }

    /// Length of the longest zone playlist, in seconds. This is one full
    /// playback cycle of the composition.
    pub fn cycle_duration(&self) -> u64 {
        self.template
            .zones
            .iter()
            .map(|z| self.playlists.total_duration(&z.id))
            .max()
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

/// How long each campaign step lasts on air unless the campaign says
/// otherwise.
pub const DEFAULT_CAMPAIGN_STEP_SECS: u64 = 60;

fn default_step_secs() -> u64 {
    DEFAULT_CAMPAIGN_STEP_SECS
}

/// An ordered, optionally weighted set of compositions rotated as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Campaign {
    pub id: EntityId,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub composition_ids: Vec<EntityId>,
    pub rotation_type: RotationPolicy,
    /// Percentages keyed by composition id; missing entries count as zero.
    #[serde(default)]
    pub weights: BTreeMap<EntityId, f64>,
    /// Seconds each rotation step stays on air.
    #[serde(default = "default_step_secs")]
    #[validate(range(min = 1))]
    pub step_secs: u64,
}

impl Campaign {
    pub fn new(
        name: impl Into<String>,
        composition_ids: Vec<EntityId>,
        rotation_type: RotationPolicy,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            composition_ids,
            rotation_type,
            weights: BTreeMap::new(),
            step_secs: DEFAULT_CAMPAIGN_STEP_SECS,
        }
    }

    pub fn with_step_secs(mut self, step_secs: u64) -> Self {
        self.step_secs = step_secs.max(1);
        self
    }

    /// Weights aligned with `composition_ids`.
    pub fn weight_vector(&self) -> Vec<f64> {
        self.composition_ids
            .iter()
            .map(|id| self.weights.get(id).copied().unwrap_or(0.0))
            .collect()
    }

    /// Set a weight. Non-finite or negative input keeps the previous value.
    /// Returns the weight in effect afterwards.
    pub fn set_weight(&mut self, composition_id: &str, percent: f64) -> f64 {
        if percent.is_finite() && percent >= 0.0 {
            self.weights.insert(composition_id.to_string(), percent);
            return percent;
        }
        tracing::debug!(composition_id, percent, "Rejected campaign weight, keeping previous");
        self.weights.get(composition_id).copied().unwrap_or(0.0)
    }

    /// [`set_weight`](Self::set_weight) for raw text input.
    pub fn set_weight_input(&mut self, composition_id: &str, raw: &str) -> f64 {
        let percent = raw.trim().parse::<f64>().unwrap_or(f64::NAN);
        self.set_weight(composition_id, percent)
    }

    /// Over/under-100% warning for weighted campaigns. Never blocks rotation.
    pub fn weight_warning(&self) -> Option<WeightWarning> {
        if self.rotation_type != RotationPolicy::Weighted {
            return None;
        }
        rotation::weight_total_warning(&self.weight_vector())
    }

    /// The composition active at `step`.
    pub fn active_composition<R: Rng>(&self, step: u64, rng: &mut R) -> Option<&EntityId> {
        rotation::select(
            &self.composition_ids,
            self.rotation_type,
            &self.weight_vector(),
            step,
            rng,
        )
    }

    /// Rotation step reached at `now` for a rotation that began at `started`.
    /// Instants before the start count as step 0.
    pub fn step_at(&self, started: Timestamp, now: Timestamp) -> u64 {
        let elapsed = (now - started).num_seconds().max(0) as u64;
        elapsed / self.step_secs.max(1)
    }

    /// The composition on air at `now`.
    ///
    /// Random and weighted draws are seeded from `rotation_key` and the step,
    /// so every caller asking about the same step gets the same answer.
    pub fn composition_at(
        &self,
        rotation_key: &str,
        started: Timestamp,
        now: Timestamp,
    ) -> Option<&EntityId> {
        let step = self.step_at(started, now);
        let mut hasher = DefaultHasher::new();
        (rotation_key, step).hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());
        self.active_composition(step, &mut rng)
    }

    /// A stateful rotator over this campaign's compositions.
    pub fn rotator(&self) -> Rotator<EntityId> {
        Rotator::new(self.composition_ids.clone(), self.rotation_type)
            .with_weights(self.weight_vector())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
