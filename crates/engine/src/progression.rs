use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::world::Viewport;
use crate::content::{LevelConfig, ZoneLookupError, ZoneProvider};
use crate::world::{Position, Zone};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelSetupError {
    #[error("level '{level_id}' has no zones")]
    EmptyLevel { level_id: String },
    #[error("level '{level_id}' refers to unknown zone '{zone_id}'")]
    UnknownZone { level_id: String, zone_id: String },
    #[error(transparent)]
    Zone(#[from] ZoneLookupError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("zone '{zone_id}' is not complete")]
    ZoneIncomplete { zone_id: String },
    #[error("zone '{zone_id}' is the last zone of the level")]
    FinalZone { zone_id: String },
    #[error(transparent)]
    Zone(#[from] ZoneLookupError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressionOutcome {
    Zone { from: String, to: String },
    Level { level_id: String },
}

/// Walks the zones of one level in order. The current zone is always built
/// fresh from the provider; completed zones are remembered by id.
pub struct LevelGameState {
    level: LevelConfig,
    provider: Arc<dyn ZoneProvider>,
    viewport: Viewport,
    current_zone: Zone,
    current_zone_index: usize,
    cursor: Position,
    completed_zones: BTreeSet<String>,
}

impl LevelGameState {
    pub fn new(
        level: LevelConfig,
        provider: Arc<dyn ZoneProvider>,
        viewport: Viewport,
    ) -> Result<Self, LevelSetupError> {
        let Some(first_zone_id) = level.zones.first() else {
            return Err(LevelSetupError::EmptyLevel {
                level_id: level.id.clone(),
            });
        };
        if let Some(zone_id) = level.zones.iter().find(|zone_id| !provider.has_zone(zone_id)) {
            return Err(LevelSetupError::UnknownZone {
                level_id: level.id.clone(),
                zone_id: zone_id.clone(),
            });
        }

        let current_zone = provider.create_zone(first_zone_id, viewport)?;
        let cursor = current_zone.start_position();
        info!(level_id = %level.id, zone_id = %current_zone.zone_id(), "level_started");
        Ok(Self {
            level,
            provider,
            viewport,
            current_zone,
            current_zone_index: 0,
            cursor,
            completed_zones: BTreeSet::new(),
        })
    }

    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    pub fn current_zone(&self) -> &Zone {
        &self.current_zone
    }

    pub fn current_zone_mut(&mut self) -> &mut Zone {
        &mut self.current_zone
    }

    pub fn current_zone_index(&self) -> usize {
        self.current_zone_index
    }

    pub fn completed_zones(&self) -> &BTreeSet<String> {
        &self.completed_zones
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Position) {
        self.cursor = cursor;
    }

    pub fn is_final_zone(&self) -> bool {
        self.current_zone_index + 1 == self.level.zones.len()
    }

    pub fn is_current_zone_complete(&self) -> bool {
        self.current_zone.is_complete()
    }

    pub fn is_cursor_at_gate(&self) -> bool {
        self.current_zone.is_gate_at(self.cursor)
    }

    pub fn should_progress_to_next_zone(&self) -> bool {
        self.is_current_zone_complete() && !self.is_final_zone() && self.is_cursor_at_gate()
    }

    pub fn should_progress_to_next_level(&self) -> bool {
        self.is_current_zone_complete() && self.is_final_zone() && self.is_cursor_at_gate()
    }

    pub fn progress_to_next_zone(&mut self) -> Result<(), ProgressionError> {
        let zone_id = self.current_zone.zone_id().to_string();
        if !self.is_current_zone_complete() {
            return Err(ProgressionError::ZoneIncomplete { zone_id });
        }
        if self.is_final_zone() {
            return Err(ProgressionError::FinalZone { zone_id });
        }

        let next_index = self.current_zone_index + 1;
        let next_zone = self
            .provider
            .create_zone(&self.level.zones[next_index], self.viewport)?;

        self.completed_zones.insert(zone_id);
        self.current_zone_index = next_index;
        self.cursor = next_zone.start_position();
        self.current_zone = next_zone;
        Ok(())
    }

    /// Runs whichever transition the predicates allow; `None` when neither
    /// holds.
    pub fn execute_progression(&mut self) -> Result<Option<ProgressionOutcome>, ProgressionError> {
        if self.should_progress_to_next_zone() {
            let from = self.current_zone.zone_id().to_string();
            self.progress_to_next_zone()?;
            let to = self.current_zone.zone_id().to_string();
            info!(from = %from, to = %to, "zone_progressed");
            return Ok(Some(ProgressionOutcome::Zone { from, to }));
        }
        if self.should_progress_to_next_level() {
            self.completed_zones
                .insert(self.current_zone.zone_id().to_string());
            info!(level_id = %self.level.id, "level_completed");
            return Ok(Some(ProgressionOutcome::Level {
                level_id: self.level.id.clone(),
            }));
        }
        Ok(None)
    }

    pub fn is_level_complete(&self) -> bool {
        let current_id = self.current_zone.zone_id();
        let current_complete = self.current_zone.is_complete();
        self.level.zones.iter().all(|zone_id| {
            self.completed_zones.contains(zone_id) || (zone_id == current_id && current_complete)
        })
    }

    /// Relayout of the current zone; the cursor follows the origin shift.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some((dx, dy)) = self.current_zone.relayout(viewport) {
            self.cursor = self.cursor.translate(dx, dy);
        }
    }
}

impl std::fmt::Debug for LevelGameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelGameState")
            .field("level", &self.level.id)
            .field("current_zone_index", &self.current_zone_index)
            .field("cursor", &self.cursor)
            .field("completed_zones", &self.completed_zones)
            .finish_non_exhaustive()
    }
}
