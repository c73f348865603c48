use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::world::Viewport;
use crate::config::FeatureFlags;
use crate::content::{EventTrigger, GameConfig, ZoneProvider};
use crate::cutscene::{CutsceneService, StateStore, Story, StoryKey};
use crate::progression::{LevelGameState, LevelSetupError, ProgressionError, ProgressionOutcome};
use crate::world::{
    ActiveNpc, CollectibleKey, DynamicZoneMap, Gate, Position, TextLabel, VimKey, Zone,
};

pub const SELECTED_GAME_KEY: &str = "selectedGame";
pub const SELECTED_LEVEL_KEY: &str = "selectedLevel";
pub const MAX_COUNT_PREFIX: u32 = 99;
const MESSAGE_LOG_LIMIT: usize = 6;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("game '{game_id}' has no level '{level_id}'")]
    UnknownLevel { game_id: String, level_id: String },
    #[error("game '{game_id}' has no levels")]
    NoLevels { game_id: String },
    #[error(transparent)]
    Level(#[from] LevelSetupError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
}

pub struct SessionSetup {
    pub game: GameConfig,
    pub zones: Arc<dyn ZoneProvider>,
    pub cutscenes: CutsceneService,
    /// Explicit level choice; overrides the persisted selection.
    pub requested_level: Option<String>,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    pub ignored: bool,
    pub steps: u32,
    pub blocked: bool,
    pub collected: Vec<String>,
    pub gate_opened: bool,
    pub dialogue: Option<String>,
    pub progression: Option<ProgressionOutcome>,
    pub game_complete: bool,
}

impl TurnOutcome {
    fn ignored() -> Self {
        Self {
            ignored: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Dialogue {
    npc_id: String,
    speaker: String,
    lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogueView<'a> {
    pub speaker: &'a str,
    pub lines: &'a [String],
}

#[derive(Debug, Clone)]
pub struct RenderSnapshot<'a> {
    pub map: &'a DynamicZoneMap,
    pub cursor: Position,
    pub vim_keys: &'a [VimKey],
    pub collected_keys: &'a BTreeSet<String>,
    pub collectibles: &'a [CollectibleKey],
    pub gate: Option<&'a Gate>,
    pub npcs: Vec<ActiveNpc<'a>>,
    pub text_labels: &'a [TextLabel],
    pub narration: &'a [String],
    pub messages: &'a [String],
    pub dialogue: Option<DialogueView<'a>>,
    pub cutscene: Option<&'a Story>,
    pub game_name: &'a str,
    pub level_name: &'a str,
    pub zone_name: &'a str,
    pub pending_count: Option<u32>,
    pub gate_ready: bool,
    pub zone_complete: bool,
    pub game_complete: bool,
}

/// The move-player use case plus game-shell bookkeeping: level selection,
/// the cutscene queue, dialogue and the message log.
pub struct GameSession {
    game: GameConfig,
    zones: Arc<dyn ZoneProvider>,
    cutscenes: CutsceneService,
    level_index: usize,
    level: LevelGameState,
    viewport: Viewport,
    cutscene_queue: VecDeque<Story>,
    dialogue: Option<Dialogue>,
    pending_count: Option<u32>,
    messages: Vec<String>,
    game_complete: bool,
}

impl GameSession {
    pub fn start(setup: SessionSetup) -> Result<Self, SessionError> {
        let SessionSetup {
            game,
            zones,
            mut cutscenes,
            requested_level,
            viewport,
        } = setup;

        let level_index = resolve_level_index(&game, requested_level.as_deref(), cutscenes.store())?;
        let level = LevelGameState::new(game.levels[level_index].clone(), zones.clone(), viewport)?;
        persist_selection(cutscenes.store_mut(), &game.id, &level.level().id);

        let mut session = Self {
            game,
            zones,
            cutscenes,
            level_index,
            level,
            viewport,
            cutscene_queue: VecDeque::new(),
            dialogue: None,
            pending_count: None,
            messages: Vec::new(),
            game_complete: false,
        };
        info!(
            game_id = %session.game.id,
            level_id = %session.level.level().id,
            "session_started"
        );

        let game_id = session.game.id.clone();
        session.queue_story(StoryKey::origin(&game_id));
        session.queue_story(StoryKey::game(&game_id));
        session.enter_level();
        Ok(session)
    }

    pub fn game(&self) -> &GameConfig {
        &self.game
    }

    pub fn level_state(&self) -> &LevelGameState {
        &self.level
    }

    pub fn current_zone(&self) -> &Zone {
        self.level.current_zone()
    }

    pub fn cursor(&self) -> Position {
        self.level.cursor()
    }

    pub fn flags(&self) -> &FeatureFlags {
        self.cutscenes.flags()
    }

    pub fn cutscenes_mut(&mut self) -> &mut CutsceneService {
        &mut self.cutscenes
    }

    pub fn active_cutscene(&self) -> Option<&Story> {
        self.cutscene_queue.front()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn pending_count(&self) -> Option<u32> {
        self.pending_count
    }

    pub fn is_dialogue_open(&self) -> bool {
        self.dialogue.is_some()
    }

    pub fn is_game_complete(&self) -> bool {
        self.game_complete
    }

    pub fn dismiss_cutscene(&mut self) -> bool {
        let Some(story) = self.cutscene_queue.pop_front() else {
            return false;
        };
        self.cutscenes.mark_cutscene_story_as_shown(story.key());
        true
    }

    /// Confirm key: closes the cutscene first, then any open dialogue.
    pub fn dismiss(&mut self) -> bool {
        if self.dismiss_cutscene() {
            return true;
        }
        self.dialogue.take().is_some()
    }

    /// Clears a half-typed count and closes dialogue. Returns whether there
    /// was anything to clear.
    pub fn cancel_pending(&mut self) -> bool {
        let had_count = self.pending_count.take().is_some();
        let had_dialogue = self.dialogue.take().is_some();
        had_count || had_dialogue
    }

    pub fn handle_key(&mut self, key: char) -> TurnOutcome {
        if self.game_complete || self.active_cutscene().is_some() {
            return TurnOutcome::ignored();
        }

        if let Some(digit) = key.to_digit(10) {
            if digit == 0 && self.pending_count.is_none() {
                return TurnOutcome::ignored();
            }
            let count = self.pending_count.unwrap_or(0) * 10 + digit;
            self.pending_count = Some(count.min(MAX_COUNT_PREFIX));
            return TurnOutcome::default();
        }

        let Some((dx, dy)) = motion_delta(key) else {
            self.pending_count = None;
            return TurnOutcome::ignored();
        };
        self.dialogue = None;
        let count = self.pending_count.take().unwrap_or(1);
        self.step(dx, dy, count)
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.level.resize(viewport);
    }

    pub fn snapshot(&self) -> RenderSnapshot<'_> {
        let zone = self.level.current_zone();
        RenderSnapshot {
            map: zone.map(),
            cursor: self.level.cursor(),
            vim_keys: zone.vim_keys(),
            collected_keys: zone.collected_keys(),
            collectibles: zone.collectible_keys(),
            gate: zone.gate(),
            npcs: zone.active_npcs(),
            text_labels: zone.text_labels(),
            narration: zone.narration(),
            messages: &self.messages,
            dialogue: self.dialogue.as_ref().map(|dialogue| DialogueView {
                speaker: &dialogue.speaker,
                lines: &dialogue.lines,
            }),
            cutscene: self.cutscene_queue.front(),
            game_name: &self.game.name,
            level_name: &self.level.level().name,
            zone_name: zone.name(),
            pending_count: self.pending_count,
            gate_ready: zone.gate_can_unlock(),
            zone_complete: zone.is_complete(),
            game_complete: self.game_complete,
        }
    }

    fn step(&mut self, dx: i32, dy: i32, count: u32) -> TurnOutcome {
        let mut outcome = TurnOutcome::default();
        for _ in 0..count {
            let next = self.level.cursor().translate(dx, dy);

            if let Some(npc) = self.level.current_zone().npc_at(next) {
                let dialogue = Dialogue {
                    npc_id: npc.id.to_string(),
                    speaker: npc.name.to_string(),
                    lines: npc.dialogue.to_vec(),
                };
                info!(npc_id = %dialogue.npc_id, "npc_dialogue_opened");
                outcome.dialogue = Some(dialogue.npc_id.clone());
                self.dialogue = Some(dialogue);
                break;
            }
            if !self.level.current_zone().is_passable(next) {
                outcome.blocked = true;
                break;
            }

            self.level.set_cursor(next);
            outcome.steps += 1;
            self.collect_at(next, &mut outcome);

            if self.level.is_cursor_at_gate() {
                self.progress(&mut outcome);
                break;
            }
        }
        outcome
    }

    fn collect_at(&mut self, pos: Position, outcome: &mut TurnOutcome) {
        let zone = self.level.current_zone_mut();

        if let Some(key) = zone.vim_key_at(pos).map(|vim_key| vim_key.key.clone()) {
            let collection = zone.collect_key(&key);
            info!(zone_id = %zone.zone_id(), key = %key, "key_collected");
            let trigger = EventTrigger::OnKeyCollected { key: key.clone() };
            let mut lines = event_lines(zone, &trigger);
            if collection.gate_opened {
                info!(zone_id = %zone.zone_id(), "gate_opened");
                outcome.gate_opened = true;
                lines.extend(event_lines(zone, &EventTrigger::OnGateOpened));
            }
            outcome.collected.push(key);
            self.push_messages(lines);
        }

        let zone = self.level.current_zone_mut();
        if let Some(collectible) = zone.collectible_at(pos).cloned() {
            zone.collect_collectible(&collectible.id);
            info!(zone_id = %zone.zone_id(), collectible = %collectible.id, "collectible_collected");
            outcome.collected.push(collectible.id);
            self.push_messages([format!("Found the {}!", collectible.name)]);
        }
    }

    fn progress(&mut self, outcome: &mut TurnOutcome) {
        let result = match self.level.execute_progression() {
            Ok(result) => result,
            Err(error) => {
                warn!(error = %error, "progression_failed");
                return;
            }
        };
        match &result {
            Some(ProgressionOutcome::Zone { .. }) => self.enter_zone(),
            Some(ProgressionOutcome::Level { .. }) => {
                if let Err(error) = self.advance_level() {
                    warn!(error = %error, "level_swap_failed");
                }
                outcome.game_complete = self.game_complete;
            }
            None => {}
        }
        outcome.progression = result;
    }

    fn advance_level(&mut self) -> Result<(), SessionError> {
        let next_index = self.level_index + 1;
        let Some(next_level) = self.game.levels.get(next_index).cloned() else {
            self.game_complete = true;
            info!(game_id = %self.game.id, "game_completed");
            self.push_messages([format!("You finished {}!", self.game.name)]);
            return Ok(());
        };
        self.level = LevelGameState::new(next_level, self.zones.clone(), self.viewport)?;
        self.level_index = next_index;
        persist_selection(
            self.cutscenes.store_mut(),
            &self.game.id,
            &self.level.level().id,
        );
        self.enter_level();
        Ok(())
    }

    fn enter_level(&mut self) {
        let key = StoryKey::level(&self.game.id, &self.level.level().id);
        self.queue_story(key);
        self.enter_zone();
    }

    fn enter_zone(&mut self) {
        self.dialogue = None;
        self.pending_count = None;
        let zone = self.level.current_zone();
        let key = StoryKey::zone(&self.game.id, &self.level.level().id, zone.zone_id());
        let lines = event_lines(zone, &EventTrigger::OnEnter);
        info!(zone_id = %zone.zone_id(), "zone_entered");
        self.queue_story(key);
        self.push_messages(lines);
    }

    fn queue_story(&mut self, key: StoryKey) {
        if !self.cutscenes.should_show_cutscene_story(&key) {
            return;
        }
        if let Some(story) = self.cutscenes.get_cutscene_story(&key) {
            info!(story = %key, "cutscene_queued");
            self.cutscene_queue.push_back(story);
        }
    }

    fn push_messages(&mut self, lines: impl IntoIterator<Item = String>) {
        self.messages.extend(lines);
        if self.messages.len() > MESSAGE_LOG_LIMIT {
            let excess = self.messages.len() - MESSAGE_LOG_LIMIT;
            self.messages.drain(..excess);
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("game", &self.game.id)
            .field("level", &self.level)
            .field("queued_cutscenes", &self.cutscene_queue.len())
            .field("game_complete", &self.game_complete)
            .finish_non_exhaustive()
    }
}

fn motion_delta(key: char) -> Option<(i32, i32)> {
    match key {
        'h' => Some((-1, 0)),
        'j' => Some((0, 1)),
        'k' => Some((0, -1)),
        'l' => Some((1, 0)),
        _ => None,
    }
}

fn event_lines(zone: &Zone, trigger: &EventTrigger) -> Vec<String> {
    zone.events_for(trigger)
        .flat_map(|event| event.narration.iter().cloned())
        .collect()
}

fn resolve_level_index(
    game: &GameConfig,
    requested: Option<&str>,
    store: &dyn StateStore,
) -> Result<usize, SessionError> {
    if game.levels.is_empty() {
        return Err(SessionError::NoLevels {
            game_id: game.id.clone(),
        });
    }
    if let Some(level_id) = requested {
        return game
            .level_index(level_id)
            .ok_or_else(|| SessionError::UnknownLevel {
                game_id: game.id.clone(),
                level_id: level_id.to_string(),
            });
    }

    let stored_game = read_string(store, SELECTED_GAME_KEY);
    let stored_level = read_string(store, SELECTED_LEVEL_KEY);
    match (stored_game, stored_level) {
        (Some(stored_game), Some(level_id)) if stored_game == game.id => {
            match game.level_index(&level_id) {
                Some(index) => Ok(index),
                None => {
                    warn!(level_id = %level_id, "stored_level_unknown");
                    Ok(0)
                }
            }
        }
        _ => Ok(0),
    }
}

fn read_string(store: &dyn StateStore, key: &str) -> Option<String> {
    match store.read(key) {
        Ok(Some(Value::String(value))) => Some(value),
        Ok(_) => None,
        Err(error) => {
            warn!(key, error = %error, "selection_read_failed");
            None
        }
    }
}

fn persist_selection(store: &mut dyn StateStore, game_id: &str, level_id: &str) {
    for (key, value) in [(SELECTED_GAME_KEY, game_id), (SELECTED_LEVEL_KEY, level_id)] {
        if let Err(error) = store.write(key, Value::String(value.to_string())) {
            warn!(key, error = %error, "selection_save_failed");
        }
    }
}
