mod provider;
mod service;
mod store;
mod story;

pub use provider::{CutsceneLibrary, CutsceneProvider, StoryEntry};
pub use service::{CutsceneService, CUTSCENE_STATE_KEY};
pub use store::{JsonFileStore, MemoryStore, StateStore, StoreError};
pub use story::{Story, StoryError, StoryKey, StoryKind, StoryScope};
