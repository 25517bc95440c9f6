use std::{collections::BTreeMap, path::Path};

use crate::{
    foundation::error::StrokemapResult,
    masks::load::{discover_zone_masks, load_zone_weights},
    masks::weights::{MaskPolarity, MaskValuePolicy, WeightMatrix},
};

/// A normalized zone mask together with the convention it was loaded under.
#[derive(Clone, Debug)]
pub struct ZoneMask {
    pub polarity: MaskPolarity,
    pub weights: WeightMatrix,
}

/// Zone name -> weight mask, loaded once per run and shared read-only by every trial.
#[derive(Clone, Debug, Default)]
pub struct MaskSet {
    zones: BTreeMap<String, ZoneMask>,
}

impl MaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, mask: ZoneMask) -> Option<ZoneMask> {
        self.zones.insert(name.into(), mask)
    }

    pub fn get(&self, name: &str) -> Option<&ZoneMask> {
        self.zones.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ZoneMask)> {
        self.zones.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Load every `body_<zone>.<ext>` mask in `dir`, resized to `size`.
    pub fn load_dir(
        dir: &Path,
        size: (u32, u32),
        polarity: MaskPolarity,
        policy: MaskValuePolicy,
    ) -> StrokemapResult<Self> {
        let mut set = Self::new();
        for (zone, path) in discover_zone_masks(dir)? {
            let weights = load_zone_weights(&path, size, polarity, policy)?;
            tracing::debug!(
                zone = %zone,
                included = weights.included_count(),
                "zone mask loaded"
            );
            set.insert(zone, ZoneMask { polarity, weights });
        }
        Ok(set)
    }
}
