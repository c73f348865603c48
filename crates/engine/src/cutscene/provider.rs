use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::story::{Story, StoryError, StoryKey, StoryKind, StoryScope};

/// Read-only source of story content. Lookups never fail; a missing story
/// is `None`.
pub trait CutsceneProvider {
    fn cutscene_story(&self, key: &StoryKey) -> Option<Story>;

    fn all_stories(&self) -> Vec<Story>;

    fn has_cutscene_story(&self, key: &StoryKey) -> bool {
        self.cutscene_story(key).is_some()
    }

    fn stories_for_game(&self, game_id: &str) -> Vec<Story> {
        self.all_stories()
            .into_iter()
            .filter(|story| story.game_id() == game_id)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoryEntry {
    pub game_id: String,
    #[serde(rename = "type")]
    pub kind: StoryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    pub script: Vec<String>,
}

impl StoryEntry {
    pub fn into_story(self) -> Result<Story, StoryError> {
        Story::new(
            self.game_id,
            self.kind,
            self.script,
            StoryScope {
                level_id: self.level_id,
                zone_id: self.zone_id,
            },
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CutsceneLibrary {
    stories: Vec<Story>,
    index: HashMap<String, usize>,
}

impl CutsceneLibrary {
    pub fn from_stories(stories: Vec<Story>) -> Result<Self, StoryError> {
        let mut index = HashMap::with_capacity(stories.len());
        for (position, story) in stories.iter().enumerate() {
            let identifier = story.identifier();
            if index.contains_key(&identifier) {
                return Err(StoryError::Duplicate { identifier });
            }
            index.insert(identifier, position);
        }
        Ok(Self { stories, index })
    }

    pub fn from_entries(entries: Vec<StoryEntry>) -> Result<Self, StoryError> {
        let stories = entries
            .into_iter()
            .map(StoryEntry::into_story)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_stories(stories)
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

impl CutsceneProvider for CutsceneLibrary {
    fn cutscene_story(&self, key: &StoryKey) -> Option<Story> {
        self.index
            .get(&key.identifier())
            .map(|&position| self.stories[position].clone())
    }

    fn all_stories(&self) -> Vec<Story> {
        self.stories.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn library() -> CutsceneLibrary {
        let entries: Vec<StoryEntry> = serde_json::from_value(json!([
            {"gameId": "g", "type": "origin", "script": ["In the beginning"]},
            {"gameId": "g", "type": "level", "levelId": "l1", "script": ["Level one"]},
            {"gameId": "g", "type": "zone", "levelId": "l1", "zoneId": "z1", "script": ["Zone one"]},
            {"gameId": "other", "type": "game", "script": ["Elsewhere"]}
        ]))
        .expect("entries");
        CutsceneLibrary::from_entries(entries).expect("library")
    }

    #[test]
    fn lookup_by_key() {
        let library = library();
        let story = library
            .cutscene_story(&StoryKey::zone("g", "l1", "z1"))
            .expect("story");
        assert_eq!(story.script(), ["Zone one".to_string()]);
        assert!(!story.has_been_shown());
        assert!(library.has_cutscene_story(&StoryKey::level("g", "l1")));
        assert!(!library.has_cutscene_story(&StoryKey::level("g", "l2")));
    }

    #[test]
    fn stories_for_game_filters_by_game() {
        let library = library();
        assert_eq!(library.stories_for_game("g").len(), 3);
        assert_eq!(library.stories_for_game("other").len(), 1);
        assert_eq!(library.all_stories().len(), 4);
    }

    #[test]
    fn invalid_entry_fails_library_build() {
        let entries: Vec<StoryEntry> = serde_json::from_value(json!([
            {"gameId": "g", "type": "zone", "levelId": "l1", "script": ["x"]}
        ]))
        .expect("entries");
        assert_eq!(
            CutsceneLibrary::from_entries(entries).err(),
            Some(StoryError::MissingZoneForZoneStory)
        );
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let story = Story::new("g", StoryKind::Game, vec!["a".into()], StoryScope::default())
            .expect("story");
        let error = CutsceneLibrary::from_stories(vec![story.clone(), story]).expect_err("dup");
        assert_eq!(
            error,
            StoryError::Duplicate {
                identifier: "g:game".to_string()
            }
        );
    }
}
