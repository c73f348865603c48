use std::collections::HashMap;

use thiserror::Error;

use crate::world::Viewport;
use crate::world::{Zone, ZoneBuildError};

use super::loader::ContentLoadError;
use super::types::ZoneConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneLookupError {
    #[error("zone '{zone_id}' not found")]
    NotFound { zone_id: String },
    #[error("zone '{zone_id}' failed to build: {source}")]
    Build {
        zone_id: String,
        #[source]
        source: ZoneBuildError,
    },
}

pub trait ZoneProvider {
    fn create_zone(&self, zone_id: &str, viewport: Viewport) -> Result<Zone, ZoneLookupError>;

    fn zone_config(&self, zone_id: &str) -> Option<&ZoneConfig>;

    fn available_zone_ids(&self) -> Vec<&str>;

    fn has_zone(&self, zone_id: &str) -> bool {
        self.zone_config(zone_id).is_some()
    }
}

/// Zone configs keyed by id. Every config is test-built when the registry is
/// created, so later lookups only fail for ids that were never loaded.
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    configs: Vec<ZoneConfig>,
    index: HashMap<String, usize>,
}

impl ZoneRegistry {
    pub fn from_configs(configs: Vec<ZoneConfig>) -> Result<Self, ContentLoadError> {
        let mut index = HashMap::with_capacity(configs.len());
        for (position, config) in configs.iter().enumerate() {
            if index.insert(config.zone_id.clone(), position).is_some() {
                return Err(ContentLoadError::DuplicateZone {
                    zone_id: config.zone_id.clone(),
                });
            }
            Zone::from_config(config, Viewport::default())?;
        }
        Ok(Self { configs, index })
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn configs(&self) -> &[ZoneConfig] {
        &self.configs
    }
}

impl ZoneProvider for ZoneRegistry {
    fn create_zone(&self, zone_id: &str, viewport: Viewport) -> Result<Zone, ZoneLookupError> {
        let config = self
            .zone_config(zone_id)
            .ok_or_else(|| ZoneLookupError::NotFound {
                zone_id: zone_id.to_string(),
            })?;
        Zone::from_config(config, viewport).map_err(|source| ZoneLookupError::Build {
            zone_id: zone_id.to_string(),
            source,
        })
    }

    fn zone_config(&self, zone_id: &str) -> Option<&ZoneConfig> {
        self.index.get(zone_id).map(|&position| &self.configs[position])
    }

    fn available_zone_ids(&self) -> Vec<&str> {
        self.configs
            .iter()
            .map(|config| config.zone_id.as_str())
            .collect()
    }
}
