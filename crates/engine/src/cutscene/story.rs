use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryError {
    #[error("Game ID is required for stories")]
    MissingGameId,
    #[error("Level ID is required for level-type stories")]
    MissingLevelForLevelStory,
    #[error("Level ID is required for zone-type stories")]
    MissingLevelForZoneStory,
    #[error("Zone ID is required for zone-type stories")]
    MissingZoneForZoneStory,
    #[error("Story script must contain at least one line")]
    EmptyScript,
    #[error("duplicate story '{identifier}'")]
    Duplicate { identifier: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryKind {
    Origin,
    Game,
    Level,
    Zone,
}

impl StoryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Game => "game",
            Self::Level => "level",
            Self::Zone => "zone",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "origin" => Some(Self::Origin),
            "game" => Some(Self::Game),
            "level" => Some(Self::Level),
            "zone" => Some(Self::Zone),
            _ => None,
        }
    }
}

impl fmt::Display for StoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryScope {
    pub level_id: Option<String>,
    pub zone_id: Option<String>,
}

/// Identifies one narrative beat. Extra scope ids are kept verbatim and
/// become part of the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoryKey {
    pub game_id: String,
    pub kind: StoryKind,
    pub level_id: Option<String>,
    pub zone_id: Option<String>,
}

impl StoryKey {
    pub fn new(game_id: impl Into<String>, kind: StoryKind, scope: StoryScope) -> Self {
        Self {
            game_id: game_id.into(),
            kind,
            level_id: scope.level_id,
            zone_id: scope.zone_id,
        }
    }

    pub fn origin(game_id: impl Into<String>) -> Self {
        Self::new(game_id, StoryKind::Origin, StoryScope::default())
    }

    pub fn game(game_id: impl Into<String>) -> Self {
        Self::new(game_id, StoryKind::Game, StoryScope::default())
    }

    pub fn level(game_id: impl Into<String>, level_id: impl Into<String>) -> Self {
        Self::new(
            game_id,
            StoryKind::Level,
            StoryScope {
                level_id: Some(level_id.into()),
                zone_id: None,
            },
        )
    }

    pub fn zone(
        game_id: impl Into<String>,
        level_id: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Self {
        Self::new(
            game_id,
            StoryKind::Zone,
            StoryScope {
                level_id: Some(level_id.into()),
                zone_id: Some(zone_id.into()),
            },
        )
    }

    /// Key from loosely typed input; `None` when `kind` is not a known scope.
    pub fn parse(
        game_id: &str,
        kind: &str,
        level_id: Option<&str>,
        zone_id: Option<&str>,
    ) -> Option<Self> {
        let kind = StoryKind::parse(kind)?;
        Some(Self::new(
            game_id,
            kind,
            StoryScope {
                level_id: level_id.map(str::to_string),
                zone_id: zone_id.map(str::to_string),
            },
        ))
    }

    /// Persistence key: `game:kind[:level][:zone]`.
    pub fn identifier(&self) -> String {
        let mut parts = vec![self.game_id.as_str(), self.kind.as_str()];
        parts.extend(self.level_id.as_deref());
        parts.extend(self.zone_id.as_deref());
        parts.join(":")
    }

    fn validate(&self) -> Result<(), StoryError> {
        if self.game_id.is_empty() {
            return Err(StoryError::MissingGameId);
        }
        let has_level = self.level_id.as_deref().is_some_and(|id| !id.is_empty());
        let has_zone = self.zone_id.as_deref().is_some_and(|id| !id.is_empty());
        match self.kind {
            StoryKind::Level if !has_level => Err(StoryError::MissingLevelForLevelStory),
            StoryKind::Zone if !has_level => Err(StoryError::MissingLevelForZoneStory),
            StoryKind::Zone if !has_zone => Err(StoryError::MissingZoneForZoneStory),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for StoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    key: StoryKey,
    script: Vec<String>,
    has_been_shown: bool,
}

impl Story {
    pub fn new(
        game_id: impl Into<String>,
        kind: StoryKind,
        script: Vec<String>,
        scope: StoryScope,
    ) -> Result<Self, StoryError> {
        Self::from_key(StoryKey::new(game_id, kind, scope), script)
    }

    pub fn from_key(key: StoryKey, script: Vec<String>) -> Result<Self, StoryError> {
        key.validate()?;
        if script.is_empty() {
            return Err(StoryError::EmptyScript);
        }
        Ok(Self {
            key,
            script,
            has_been_shown: false,
        })
    }

    pub fn key(&self) -> &StoryKey {
        &self.key
    }

    pub fn game_id(&self) -> &str {
        &self.key.game_id
    }

    pub fn kind(&self) -> StoryKind {
        self.key.kind
    }

    pub fn level_id(&self) -> Option<&str> {
        self.key.level_id.as_deref()
    }

    pub fn zone_id(&self) -> Option<&str> {
        self.key.zone_id.as_deref()
    }

    pub fn script(&self) -> &[String] {
        &self.script
    }

    pub fn has_been_shown(&self) -> bool {
        self.has_been_shown
    }

    pub fn identifier(&self) -> String {
        self.key.identifier()
    }

    pub fn mark_as_shown(&mut self) {
        self.has_been_shown = true;
    }

    pub fn reset(&mut self) {
        self.has_been_shown = false;
    }
}
