mod app;

use std::env;
use std::process::ExitCode;

use engine::{resolve_app_paths, run_app, FeatureFlags, LoopConfig, Viewport};
use tracing::{error, info};

use app::bootstrap::{self, BootstrapError, Selection};
use app::headless;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Play,
    Keys(String),
    ResetCutscenes,
    Help,
}

fn main() -> ExitCode {
    let command = match parse_args(env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{}", usage_text());
            return ExitCode::from(2);
        }
    };
    if command == Command::Help {
        println!("{}", usage_text());
        return ExitCode::SUCCESS;
    }

    bootstrap::init_tracing();
    info!("=== KeyQuest Startup ===");

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::from(1)
        }
    }
}

fn run(command: Command) -> Result<(), BootstrapError> {
    let paths = resolve_app_paths()?;
    let wiring = bootstrap::load(paths, FeatureFlags::from_env())?;
    let selection = Selection::from_env();

    match command {
        Command::Play => {
            let config = LoopConfig::default();
            let viewport = Viewport {
                width: config.window_width,
                height: config.window_height,
            };
            let session = wiring.start_session(&selection, wiring.file_store(), viewport)?;
            run_app(config, session)?;
        }
        Command::Keys(script) => {
            let config = LoopConfig::default();
            let viewport = Viewport {
                width: config.window_width,
                height: config.window_height,
            };
            let mut session = wiring.start_session(&selection, wiring.file_store(), viewport)?;
            let report = headless::run_key_script(&mut session, &script);
            println!("{}", headless::summary_line(&session, &report));
        }
        Command::ResetCutscenes => {
            let mut service = wiring.cutscene_service(wiring.file_store());
            service.reset_all_cutscene_stories();
            info!(state_file = %wiring.paths.state_file().display(), "cutscenes_reset");
        }
        Command::Help => {}
    }
    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command, String> {
    let args = args.into_iter().collect::<Vec<_>>();
    let Some(first) = args.first() else {
        return Ok(Command::Play);
    };

    let command = match first.as_str() {
        "-h" | "--help" => Command::Help,
        "--keys" => {
            let script = args
                .get(1)
                .ok_or_else(|| "missing value for --keys".to_string())?;
            if args.len() > 2 {
                return Err(format!("unexpected argument '{}'", args[2]));
            }
            return Ok(Command::Keys(headless::decode_key_script(script)));
        }
        "--reset-cutscenes" => Command::ResetCutscenes,
        other => return Err(format!("unknown argument '{other}'")),
    };
    if let Some(extra) = args.get(1) {
        return Err(format!("unexpected argument '{extra}'"));
    }
    Ok(command)
}

fn usage_text() -> String {
    [
        "usage:",
        "  keyquest                     open the game window",
        "  keyquest --keys <script>     play a key script headless and print the result",
        "                               (\\n confirms, \\e is escape)",
        "  keyquest --reset-cutscenes   forget which stories were already shown",
        "",
        "environment:",
        "  KEYQUEST_ROOT      directory holding assets/content and saves",
        "  KEYQUEST_GAME      game id to play",
        "  KEYQUEST_LEVEL     level id to start at",
        "  KEYQUEST_FEATURES  feature flag overrides, e.g. debug_overlay=on",
        "  RUST_LOG           tracing filter (default info)",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        parse_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn no_arguments_plays() {
        assert_eq!(parse(&[]), Ok(Command::Play));
    }

    #[test]
    fn keys_script_is_decoded() {
        assert_eq!(
            parse(&["--keys", r"\n3l\e"]),
            Ok(Command::Keys("\n3l\u{1b}".to_string()))
        );
    }

    #[test]
    fn keys_requires_a_script() {
        assert_eq!(
            parse(&["--keys"]),
            Err("missing value for --keys".to_string())
        );
    }

    #[test]
    fn rejects_unknown_and_extra_arguments() {
        assert!(parse(&["--fullscreen"]).is_err());
        assert!(parse(&["--reset-cutscenes", "now"]).is_err());
        assert!(parse(&["--keys", "l", "h"]).is_err());
    }

    #[test]
    fn help_and_reset_parse() {
        assert_eq!(parse(&["-h"]), Ok(Command::Help));
        assert_eq!(parse(&["--reset-cutscenes"]), Ok(Command::ResetCutscenes));
    }
}
