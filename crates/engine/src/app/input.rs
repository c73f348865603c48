use std::collections::VecDeque;

use tracing::{debug, info};
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{Key, KeyCode, PhysicalKey};

use crate::session::{GameSession, TurnOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameInput {
    Key(char),
    Confirm,
    Cancel,
    ToggleOverlay,
}

impl GameInput {
    pub fn from_script_char(ch: char) -> Self {
        match ch {
            '\n' | '\r' => Self::Confirm,
            '\u{1b}' => Self::Cancel,
            other => Self::Key(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEffect {
    Turn(TurnOutcome),
    Dismissed,
    Cancelled,
    Quit,
    ToggleOverlay,
    Nothing,
}

/// Routes one input through the session the same way for the window and
/// for headless scripts.
pub fn apply_input(session: &mut GameSession, input: GameInput) -> InputEffect {
    match input {
        GameInput::Key(ch) => {
            let outcome = session.handle_key(ch);
            if outcome.ignored {
                debug!(key = %ch.escape_debug(), "key_ignored");
            }
            InputEffect::Turn(outcome)
        }
        GameInput::Confirm => {
            if session.dismiss() {
                InputEffect::Dismissed
            } else {
                InputEffect::Nothing
            }
        }
        GameInput::Cancel => {
            if session.dismiss_cutscene() {
                info!("cutscene_skipped");
                InputEffect::Dismissed
            } else if session.cancel_pending() {
                InputEffect::Cancelled
            } else {
                InputEffect::Quit
            }
        }
        GameInput::ToggleOverlay => InputEffect::ToggleOverlay,
    }
}

// Typed characters honor key repeat so holding `l` keeps walking.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    confirm_is_down: bool,
    cancel_is_down: bool,
    overlay_toggle_is_down: bool,
    pending: VecDeque<GameInput>,
}

impl InputCollector {
    pub(crate) fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let code = match key_event.physical_key {
            PhysicalKey::Code(code) => Some(code),
            PhysicalKey::Unidentified(_) => None,
        };
        match code.map(classify_key_code) {
            Some(KeyClass::Confirm) => self.handle_confirm_key_state(key_event.state),
            Some(KeyClass::Cancel) => self.handle_cancel_key_state(key_event.state),
            Some(KeyClass::OverlayToggle) => {
                self.handle_overlay_toggle_key_state(key_event.state)
            }
            Some(KeyClass::Text) | None => {
                if key_event.state == ElementState::Pressed {
                    if let Key::Character(text) = &key_event.logical_key {
                        self.push_text(text);
                    }
                }
            }
        }
    }

    fn handle_confirm_key_state(&mut self, state: ElementState) {
        if press_edge(&mut self.confirm_is_down, state) {
            self.pending.push_back(GameInput::Confirm);
        }
    }

    fn handle_cancel_key_state(&mut self, state: ElementState) {
        if press_edge(&mut self.cancel_is_down, state) {
            self.pending.push_back(GameInput::Cancel);
        }
    }

    fn handle_overlay_toggle_key_state(&mut self, state: ElementState) {
        if press_edge(&mut self.overlay_toggle_is_down, state) {
            self.pending.push_back(GameInput::ToggleOverlay);
        }
    }

    fn push_text(&mut self, text: &str) {
        self.pending
            .extend(text.chars().filter(|ch| !ch.is_control()).map(GameInput::Key));
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = GameInput> + '_ {
        self.pending.drain(..)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyClass {
    Confirm,
    Cancel,
    OverlayToggle,
    Text,
}

fn classify_key_code(code: KeyCode) -> KeyClass {
    match code {
        KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space => KeyClass::Confirm,
        KeyCode::Escape => KeyClass::Cancel,
        KeyCode::F3 => KeyClass::OverlayToggle,
        _ => KeyClass::Text,
    }
}

fn press_edge(is_down: &mut bool, state: ElementState) -> bool {
    match state {
        ElementState::Pressed => {
            let edge = !*is_down;
            *is_down = true;
            edge
        }
        ElementState::Released => {
            *is_down = false;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{quiet_session, session};

    #[test]
    fn confirm_is_edge_triggered() {
        let mut input = InputCollector::default();
        input.handle_confirm_key_state(ElementState::Pressed);
        input.handle_confirm_key_state(ElementState::Pressed);
        assert_eq!(input.drain().collect::<Vec<_>>(), vec![GameInput::Confirm]);

        input.handle_confirm_key_state(ElementState::Released);
        input.handle_confirm_key_state(ElementState::Pressed);
        assert_eq!(input.drain().collect::<Vec<_>>(), vec![GameInput::Confirm]);
    }

    #[test]
    fn held_escape_does_not_spam_cancel() {
        let mut input = InputCollector::default();
        input.handle_cancel_key_state(ElementState::Pressed);
        input.handle_cancel_key_state(ElementState::Pressed);
        input.handle_cancel_key_state(ElementState::Pressed);
        assert_eq!(input.drain().count(), 1);
    }

    #[test]
    fn f3_toggle_is_edge_triggered() {
        let mut input = InputCollector::default();
        input.handle_overlay_toggle_key_state(ElementState::Pressed);
        input.handle_overlay_toggle_key_state(ElementState::Released);
        input.handle_overlay_toggle_key_state(ElementState::Pressed);
        assert_eq!(
            input.drain().collect::<Vec<_>>(),
            vec![GameInput::ToggleOverlay, GameInput::ToggleOverlay]
        );
    }

    #[test]
    fn typed_text_keeps_order_and_drops_control_chars() {
        let mut input = InputCollector::default();
        input.push_text("3l");
        input.push_text("\u{8}");
        input.push_text("k");
        assert_eq!(
            input.drain().collect::<Vec<_>>(),
            vec![GameInput::Key('3'), GameInput::Key('l'), GameInput::Key('k')]
        );
        assert_eq!(input.drain().count(), 0);
    }

    #[test]
    fn named_keys_classify() {
        assert_eq!(classify_key_code(KeyCode::Space), KeyClass::Confirm);
        assert_eq!(classify_key_code(KeyCode::NumpadEnter), KeyClass::Confirm);
        assert_eq!(classify_key_code(KeyCode::Escape), KeyClass::Cancel);
        assert_eq!(classify_key_code(KeyCode::F3), KeyClass::OverlayToggle);
        assert_eq!(classify_key_code(KeyCode::KeyH), KeyClass::Text);
    }

    #[test]
    fn script_chars_decode() {
        assert_eq!(GameInput::from_script_char('\n'), GameInput::Confirm);
        assert_eq!(GameInput::from_script_char('\u{1b}'), GameInput::Cancel);
        assert_eq!(GameInput::from_script_char('j'), GameInput::Key('j'));
    }

    #[test]
    fn confirm_dismisses_cutscene_before_typing_counts() {
        let mut session = session();
        assert!(session.active_cutscene().is_some());
        let typed = apply_input(&mut session, GameInput::Key('l'));
        assert!(matches!(typed, InputEffect::Turn(outcome) if outcome.ignored));

        while session.active_cutscene().is_some() {
            assert_eq!(apply_input(&mut session, GameInput::Confirm), InputEffect::Dismissed);
        }
        assert_eq!(apply_input(&mut session, GameInput::Confirm), InputEffect::Nothing);
    }

    #[test]
    fn escape_skips_cutscene_then_clears_count_then_quits() {
        let mut session = session();
        while session.active_cutscene().is_some() {
            assert_eq!(apply_input(&mut session, GameInput::Cancel), InputEffect::Dismissed);
        }
        apply_input(&mut session, GameInput::Key('3'));
        assert_eq!(apply_input(&mut session, GameInput::Cancel), InputEffect::Cancelled);
        assert_eq!(session.pending_count(), None);
        assert_eq!(apply_input(&mut session, GameInput::Cancel), InputEffect::Quit);
    }

    #[test]
    fn motion_key_moves_cursor() {
        let mut session = quiet_session();
        let start = session.cursor();
        let effect = apply_input(&mut session, GameInput::Key('l'));
        assert!(matches!(effect, InputEffect::Turn(outcome) if outcome.steps == 1));
        assert_eq!(session.cursor(), start.translate(1, 0));
        assert_eq!(
            apply_input(&mut session, GameInput::ToggleOverlay),
            InputEffect::ToggleOverlay
        );
    }
}
