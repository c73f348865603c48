use engine::{apply_input, GameInput, GameSession, InputEffect, ProgressionOutcome};
use tracing::info;

/// What a key script did to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ScriptReport {
    pub(crate) inputs: usize,
    pub(crate) steps: u32,
    pub(crate) blocked_turns: usize,
    pub(crate) collected: Vec<String>,
    pub(crate) zones_entered: Vec<String>,
    pub(crate) levels_completed: Vec<String>,
    pub(crate) dismissed: usize,
    pub(crate) quit: bool,
}

/// Expands `\n`, `\e` and `\\` so scripts can be passed as one shell
/// argument. Unknown escapes are kept verbatim.
pub(crate) fn decode_key_script(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            decoded.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('e') => decoded.push('\u{1b}'),
            Some('\\') => decoded.push('\\'),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }
    decoded
}

pub(crate) fn run_key_script(session: &mut GameSession, script: &str) -> ScriptReport {
    let mut report = ScriptReport::default();
    for ch in script.chars() {
        report.inputs += 1;
        match apply_input(session, GameInput::from_script_char(ch)) {
            InputEffect::Turn(outcome) => {
                if outcome.ignored {
                    continue;
                }
                report.steps += outcome.steps;
                if outcome.blocked {
                    report.blocked_turns += 1;
                }
                report.collected.extend(outcome.collected);
                match outcome.progression {
                    Some(ProgressionOutcome::Zone { to, .. }) => report.zones_entered.push(to),
                    Some(ProgressionOutcome::Level { level_id }) => {
                        report.levels_completed.push(level_id)
                    }
                    None => {}
                }
            }
            InputEffect::Dismissed => report.dismissed += 1,
            InputEffect::Quit => {
                report.quit = true;
                break;
            }
            InputEffect::Cancelled | InputEffect::ToggleOverlay | InputEffect::Nothing => {}
        }
    }
    info!(
        inputs = report.inputs,
        steps = report.steps,
        collected = report.collected.len(),
        levels_completed = report.levels_completed.len(),
        quit = report.quit,
        "script_finished"
    );
    report
}

/// One-line state summary printed after a headless run.
pub(crate) fn summary_line(session: &GameSession, report: &ScriptReport) -> String {
    let zone = session.current_zone();
    let cursor = zone
        .map()
        .absolute_to_zone(session.cursor())
        .map_or_else(|| "outside".to_string(), |pos| format!("{},{}", pos.x, pos.y));
    let keys = zone
        .collected_keys()
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "level={} zone={} cursor={} keys=[{}] levels_completed=[{}] game_complete={}",
        session.level_state().level().id,
        zone.zone_id(),
        cursor,
        keys,
        report.levels_completed.join(","),
        session.is_game_complete()
    )
}
