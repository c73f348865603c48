use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::{FeatureFlag, FeatureFlags};

use super::provider::CutsceneProvider;
use super::store::StateStore;
use super::story::{Story, StoryKey};

pub const CUTSCENE_STATE_KEY: &str = "cutsceneStoryStates";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryState {
    has_been_shown: bool,
}

// Entries are decoded one at a time so a bad entry only hides its own story.
enum StoredStates {
    Entries(Map<String, Value>),
    NotAnObject,
}

/// Decides whether a story should play, combining the feature flag, the
/// content provider and persisted shown state. Nothing here returns an
/// error: store failures are logged and read as "do not show".
pub struct CutsceneService {
    flags: FeatureFlags,
    provider: Arc<dyn CutsceneProvider>,
    store: Box<dyn StateStore>,
}

impl CutsceneService {
    pub fn new(
        flags: FeatureFlags,
        provider: Arc<dyn CutsceneProvider>,
        store: Box<dyn StateStore>,
    ) -> Self {
        Self {
            flags,
            provider,
            store,
        }
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn StateStore {
        self.store.as_mut()
    }

    pub fn should_show_cutscene_story(&self, key: &StoryKey) -> bool {
        if !self.flags.is_enabled(FeatureFlag::OriginStoryCutscenes) {
            return false;
        }
        if !self.provider.has_cutscene_story(key) {
            return false;
        }
        match self.load_states() {
            Some(StoredStates::Entries(entries)) => match entries.get(&key.identifier()) {
                Some(entry) => parse_entry(&key.identifier(), entry)
                    .is_some_and(|state| !state.has_been_shown),
                None => true,
            },
            Some(StoredStates::NotAnObject) | None => false,
        }
    }

    /// Loosely typed entry point; an unrecognized `kind` is never shown.
    pub fn should_show_named(
        &self,
        game_id: &str,
        kind: &str,
        level_id: Option<&str>,
        zone_id: Option<&str>,
    ) -> bool {
        StoryKey::parse(game_id, kind, level_id, zone_id)
            .is_some_and(|key| self.should_show_cutscene_story(&key))
    }

    pub fn get_cutscene_story(&self, key: &StoryKey) -> Option<Story> {
        self.provider.cutscene_story(key)
    }

    pub fn mark_cutscene_story_as_shown(&mut self, key: &StoryKey) {
        let identifier = key.identifier();
        let Some(stored) = self.load_states() else {
            warn!(identifier = %identifier, "cutscene_state_not_saved");
            return;
        };
        let mut entries = match stored {
            StoredStates::Entries(entries) => entries,
            StoredStates::NotAnObject => Map::new(),
        };
        let state = StoryState {
            has_been_shown: true,
        };
        match serde_json::to_value(state) {
            Ok(value) => {
                entries.insert(identifier.clone(), value);
            }
            Err(error) => {
                warn!(error = %error, "cutscene_store_encode_failed");
                return;
            }
        }
        if self.save_states(entries) {
            info!(identifier = %identifier, "cutscene_marked_shown");
        }
    }

    pub fn reset_cutscene_story_state(&mut self, key: &StoryKey) {
        match self.load_states() {
            Some(StoredStates::Entries(mut entries)) => {
                if entries.remove(&key.identifier()).is_some() {
                    self.save_states(entries);
                }
            }
            Some(StoredStates::NotAnObject) => {
                self.save_states(Map::new());
            }
            None => {}
        }
    }

    /// Clears the shown flag of every story the provider knows about.
    /// Entries for unknown identifiers are left alone.
    pub fn reset_all_cutscene_stories(&mut self) {
        let mut entries = match self.load_states() {
            Some(StoredStates::Entries(entries)) => entries,
            Some(StoredStates::NotAnObject) => Map::new(),
            None => return,
        };
        let mut cleared = 0usize;
        for story in self.provider.all_stories() {
            if entries.remove(&story.identifier()).is_some() {
                cleared += 1;
            }
        }
        if self.save_states(entries) {
            info!(cleared, "cutscene_states_reset");
        }
    }

    pub fn should_show_origin_story(&self, game_id: &str) -> bool {
        self.should_show_cutscene_story(&StoryKey::origin(game_id))
    }

    pub fn get_origin_story(&self, game_id: &str) -> Option<Story> {
        self.get_cutscene_story(&StoryKey::origin(game_id))
    }

    pub fn mark_origin_story_as_shown(&mut self, game_id: &str) {
        self.mark_cutscene_story_as_shown(&StoryKey::origin(game_id));
    }

    pub fn reset_origin_story(&mut self, game_id: &str) {
        self.reset_cutscene_story_state(&StoryKey::origin(game_id));
    }

    fn load_states(&self) -> Option<StoredStates> {
        match self.store.read(CUTSCENE_STATE_KEY) {
            Ok(None) => Some(StoredStates::Entries(Map::new())),
            Ok(Some(Value::Object(entries))) => Some(StoredStates::Entries(entries)),
            Ok(Some(_)) => {
                warn!(key = CUTSCENE_STATE_KEY, "cutscene_store_not_an_object");
                Some(StoredStates::NotAnObject)
            }
            Err(error) => {
                warn!(error = %error, "cutscene_store_read_failed");
                None
            }
        }
    }

    fn save_states(&mut self, entries: Map<String, Value>) -> bool {
        match self.store.write(CUTSCENE_STATE_KEY, Value::Object(entries)) {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "cutscene_store_write_failed");
                false
            }
        }
    }
}

fn parse_entry(identifier: &str, entry: &Value) -> Option<StoryState> {
    match serde_path_to_error::deserialize::<_, StoryState>(entry) {
        Ok(state) => Some(state),
        Err(error) => {
            warn!(
                identifier,
                path = %error.path(),
                error = %error.inner(),
                "cutscene_store_entry_malformed"
            );
            None
        }
    }
}

impl std::fmt::Debug for CutsceneService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CutsceneService")
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use serde_json::{json, Value};

    use super::*;
    use crate::cutscene::{CutsceneLibrary, MemoryStore, StoreError, StoryKind, StoryScope};

    fn library() -> Arc<CutsceneLibrary> {
        let stories = vec![
            Story::new("g", StoryKind::Game, vec!["Hi".into()], StoryScope::default())
                .expect("game story"),
            Story::new("g", StoryKind::Origin, vec!["Long ago".into()], StoryScope::default())
                .expect("origin story"),
            Story::new(
                "g",
                StoryKind::Level,
                vec!["Level".into()],
                StoryScope {
                    level_id: Some("l1".into()),
                    zone_id: None,
                },
            )
            .expect("level story"),
        ];
        Arc::new(CutsceneLibrary::from_stories(stories).expect("library"))
    }

    fn service(flags: FeatureFlags) -> CutsceneService {
        CutsceneService::new(flags, library(), Box::new(MemoryStore::new()))
    }

    struct FailingStore;

    impl StateStore for FailingStore {
        fn read(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Read {
                path: "state.json".into(),
                source: io::Error::other("disk gone"),
            })
        }

        fn write(&mut self, _key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Write {
                path: "state.json".into(),
                source: io::Error::other("disk gone"),
            })
        }

        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct ReadOnlyStore(MemoryStore);

    impl StateStore for ReadOnlyStore {
        fn read(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.0.read(key)
        }

        fn write(&mut self, _key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Write {
                path: "state.json".into(),
                source: io::Error::other("read only"),
            })
        }

        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn game_story_shows_once() {
        let mut service = service(FeatureFlags::new());
        let key = StoryKey::game("g");
        assert!(service.should_show_cutscene_story(&key));
        service.mark_cutscene_story_as_shown(&key);
        assert!(!service.should_show_cutscene_story(&key));
    }

    #[test]
    fn disabled_flag_hides_everything() {
        let service = service(FeatureFlags::new().with(FeatureFlag::OriginStoryCutscenes, false));
        assert!(!service.should_show_cutscene_story(&StoryKey::game("g")));
        assert!(!service.should_show_origin_story("g"));
    }

    #[test]
    fn missing_story_is_not_shown() {
        let service = service(FeatureFlags::new());
        assert!(!service.should_show_cutscene_story(&StoryKey::level("g", "l9")));
        assert!(service.get_cutscene_story(&StoryKey::level("g", "l9")).is_none());
    }

    #[test]
    fn unknown_scope_name_is_not_shown() {
        let service = service(FeatureFlags::new());
        assert!(!service.should_show_named("g", "chapter", None, None));
        assert!(service.should_show_named("g", "level", Some("l1"), None));
    }

    #[test]
    fn shown_state_is_persisted_under_identifier() {
        let mut service = service(FeatureFlags::new());
        service.mark_cutscene_story_as_shown(&StoryKey::level("g", "l1"));
        let stored = service
            .store()
            .read(CUTSCENE_STATE_KEY)
            .expect("read")
            .expect("entry");
        assert_eq!(stored, json!({"g:level:l1": {"hasBeenShown": true}}));
    }

    #[test]
    fn reset_restores_visibility() {
        let mut service = service(FeatureFlags::new());
        let game = StoryKey::game("g");
        let level = StoryKey::level("g", "l1");
        service.mark_cutscene_story_as_shown(&game);
        service.mark_cutscene_story_as_shown(&level);

        service.reset_cutscene_story_state(&game);
        assert!(service.should_show_cutscene_story(&game));
        assert!(!service.should_show_cutscene_story(&level));

        service.reset_all_cutscene_stories();
        assert!(service.should_show_cutscene_story(&level));
    }

    #[test]
    fn legacy_origin_api_shares_state() {
        let mut service = service(FeatureFlags::new());
        assert!(service.should_show_origin_story("g"));
        assert_eq!(
            service.get_origin_story("g").map(|story| story.identifier()),
            Some("g:origin".to_string())
        );
        service.mark_origin_story_as_shown("g");
        assert!(!service.should_show_cutscene_story(&StoryKey::origin("g")));
        service.reset_origin_story("g");
        assert!(service.should_show_origin_story("g"));
    }

    #[test]
    fn failing_store_degrades_to_not_shown() {
        let mut service = CutsceneService::new(FeatureFlags::new(), library(), Box::new(FailingStore));
        let key = StoryKey::game("g");
        assert!(!service.should_show_cutscene_story(&key));
        service.mark_cutscene_story_as_shown(&key);
        service.reset_all_cutscene_stories();
    }

    #[test]
    fn write_failure_is_swallowed() {
        let mut service = CutsceneService::new(
            FeatureFlags::new(),
            library(),
            Box::new(ReadOnlyStore(MemoryStore::new())),
        );
        let key = StoryKey::game("g");
        service.mark_cutscene_story_as_shown(&key);
        assert!(service.should_show_cutscene_story(&key));
    }

    #[test]
    fn malformed_state_entry_is_not_shown() {
        let mut store = MemoryStore::new();
        store
            .write(CUTSCENE_STATE_KEY, json!({"g:game": {"hasBeenShown": "yes"}}))
            .expect("seed");
        let service = CutsceneService::new(FeatureFlags::new(), library(), Box::new(store));
        assert!(!service.should_show_cutscene_story(&StoryKey::game("g")));
    }

    #[test]
    fn bad_sibling_entry_does_not_affect_other_stories() {
        let mut store = MemoryStore::new();
        store
            .write(CUTSCENE_STATE_KEY, json!({"stale:entry": "garbage"}))
            .expect("seed");
        let mut service = CutsceneService::new(FeatureFlags::new(), library(), Box::new(store));
        let level = StoryKey::level("g", "l1");
        assert!(service.should_show_cutscene_story(&level));

        service.mark_cutscene_story_as_shown(&level);
        assert!(!service.should_show_cutscene_story(&level));
        assert_eq!(
            service.store().read(CUTSCENE_STATE_KEY).expect("read"),
            Some(json!({
                "stale:entry": "garbage",
                "g:level:l1": {"hasBeenShown": true}
            }))
        );

        service.reset_all_cutscene_stories();
        assert!(service.should_show_cutscene_story(&level));
        assert_eq!(
            service.store().read(CUTSCENE_STATE_KEY).expect("read"),
            Some(json!({"stale:entry": "garbage"}))
        );
    }

    #[test]
    fn reset_repairs_state_that_is_not_an_object() {
        let mut store = MemoryStore::new();
        store
            .write(CUTSCENE_STATE_KEY, json!(["g:game"]))
            .expect("seed");
        let mut service = CutsceneService::new(FeatureFlags::new(), library(), Box::new(store));
        let game = StoryKey::game("g");
        assert!(!service.should_show_cutscene_story(&game));

        service.reset_all_cutscene_stories();
        assert_eq!(
            service.store().read(CUTSCENE_STATE_KEY).expect("read"),
            Some(json!({}))
        );
        assert!(service.should_show_cutscene_story(&game));
    }

    #[test]
    fn malformed_entry_is_overwritten_by_mark() {
        let mut store = MemoryStore::new();
        store
            .write(CUTSCENE_STATE_KEY, json!({"g:game": 7}))
            .expect("seed");
        let mut service = CutsceneService::new(FeatureFlags::new(), library(), Box::new(store));
        let game = StoryKey::game("g");
        service.mark_cutscene_story_as_shown(&game);
        service.reset_cutscene_story_state(&game);
        assert!(service.should_show_cutscene_story(&game));
    }
}
