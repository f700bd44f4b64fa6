//! Entry point for the syspulse TUI. Parses args, resolves settings and runs the App.

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use syspulse::app::App;
use syspulse::settings::{self, load_settings, save_settings, Overrides, URL_ENV};
use tracing_subscriber::EnvFilter;

struct ParsedArgs {
    url: Option<String>,
    config: Option<PathBuf>,
    history: Option<usize>,
    mute: bool,
    save: bool,
    dry_run: bool,
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--config PATH|-c PATH] [--history N] [--no-sound] [--save] [--dry-run] [ws://HOST:PORT/ws]"
    )
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "syspulse".into());
    let mut parsed = ParsedArgs {
        url: None,
        config: None,
        history: None,
        mute: false,
        save: false,
        dry_run: false,
    };

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--config" | "-c" => {
                parsed.config = it.next().map(PathBuf::from);
            }
            "--history" => {
                let v = it.next().unwrap_or_default();
                parsed.history = Some(
                    v.parse::<usize>()
                        .map_err(|_| format!("invalid --history value '{v}'\n{}", usage(&prog)))?,
                );
            }
            "--no-sound" => parsed.mute = true,
            "--save" => parsed.save = true,
            "--dry-run" => parsed.dry_run = true,
            _ if arg.starts_with("--config=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.config = Some(PathBuf::from(v));
                    }
                }
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option '{arg}'. {}", usage(&prog)));
            }
            _ => {
                if parsed.url.is_none() {
                    parsed.url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {}", usage(&prog)));
                }
            }
        }
    }
    Ok(parsed)
}

// The TUI owns the terminal, so logs go to a file next to the settings.
fn init_logging() {
    let path = settings::log_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("SYSPULSE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    init_logging();

    let path = parsed.config.clone().unwrap_or_else(settings::settings_path);
    let stored = load_settings(&path);
    let resolved = Overrides {
        url: parsed.url.clone(),
        env_url: env::var(URL_ENV).ok(),
        history_capacity: parsed.history,
        mute: parsed.mute,
    }
    .apply(stored);

    if parsed.save {
        save_settings(&path, &resolved)?;
        eprintln!("saved settings to {}", path.display());
    }

    if parsed.dry_run {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    tracing::info!(url = %resolved.url, "starting syspulse");
    let mut app = App::new(resolved, path);
    tokio::select! {
        res = app.run() => res,
        _ = tokio::signal::ctrl_c() => Ok(()),
    }
}
