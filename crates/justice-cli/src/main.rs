use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use futures::StreamExt;
use justice_ai::{AiError, DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient, GeminiConfig};
use justice_app::{
    AnalysisJob, App, AppError, ChatTurn, DisguiseGate, GateOutcome, Key, Ticket, UnlockCode, View,
};
use justice_core::AnalysisResult;
use justice_store::{FileStore, Vault};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod command;
mod display;

use command::Command;

// Secrets come from the environment only, never argv.
const API_KEY_VAR: &str = "GEMINI_API_KEY";
const UNLOCK_CODE_VAR: &str = "JUSTICE_UNLOCK_CODE";
const DEFAULT_UNLOCK_CODE: &str = "1234";

#[derive(Parser)]
#[command(
    name = "calc",
    about = "Calculator",
    version,
    after_help = "Environment:\n  GEMINI_API_KEY       model API key (required)\n  JUSTICE_UNLOCK_CODE  digits that open the app [default: 1234]"
)]
struct Cli {
    /// Model used for analysis and chat
    #[arg(long, env = "JUSTICE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "JUSTICE_API_BASE", default_value = DEFAULT_BASE_URL)]
    api_base: String,

    /// Where the vault is kept [default: <local data dir>/justice]
    #[arg(long, env = "JUSTICE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Timeout for each model request, in seconds
    #[arg(
        long,
        env = "JUSTICE_TIMEOUT_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: u64,
}

fn init_tracing() {
    // stderr keeps log lines off the screen being rendered.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

fn env_secret(var: &str) -> anyhow::Result<Option<String>> {
    match std::env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {var}")),
    }
}

fn build_app(cli: Cli) -> anyhow::Result<App> {
    let Some(api_key) = env_secret(API_KEY_VAR)? else {
        bail!("{API_KEY_VAR} is not set");
    };
    let unlock_code = env_secret(UNLOCK_CODE_VAR)?.unwrap_or_else(|| DEFAULT_UNLOCK_CODE.to_string());
    let code = UnlockCode::new(&unlock_code).with_context(|| format!("invalid {UNLOCK_CODE_VAR}"))?;

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => match dirs::data_local_dir() {
            Some(base) => base.join("justice"),
            None => bail!("no local data directory on this platform; pass --data-dir"),
        },
    };
    let store = FileStore::open(&data_dir)
        .with_context(|| format!("opening data directory {}", data_dir.display()))?;
    let vault = Vault::open(Box::new(store));

    let client = GeminiClient::new(GeminiConfig {
        api_key,
        model: cli.model,
        base_url: cli.api_base,
        timeout: Duration::from_secs(cli.timeout_secs),
    })
    .context("building HTTP client")?;
    let client = Arc::new(client);

    tracing::info!(
        model = client.model(),
        data_dir = %data_dir.display(),
        entries = vault.len(),
        "starting"
    );
    Ok(App::new(vault, client.clone(), client, DisguiseGate::new(code)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let app = build_app(cli)?;
    run(app).await
}

/// Outstanding remote work. At most one of each.
#[derive(Default)]
struct InFlight {
    analysis: Option<AnalysisJob>,
    turn: Option<ChatTurn>,
}

impl InFlight {
    /// Drop work whose screen is gone.
    fn reconcile(&mut self, app: &App) {
        let analyzing = matches!(app.view(), View::Disclosure(f) if f.is_analyzing());
        if !analyzing {
            self.analysis = None;
        }
        let typing = matches!(app.view(), View::Companion(c) if c.is_typing());
        if !typing {
            self.turn = None;
        }
    }
}

async fn next_analysis(
    job: &mut Option<AnalysisJob>,
) -> (Ticket, Result<AnalysisResult, AiError>) {
    match job {
        Some(job) => (job.ticket, (&mut job.future).await),
        None => std::future::pending().await,
    }
}

async fn next_fragment(turn: &mut Option<ChatTurn>) -> (Ticket, Option<Result<String, AiError>>) {
    match turn {
        Some(turn) => (turn.ticket, turn.stream.next().await),
        None => std::future::pending().await,
    }
}

fn show(app: &App) {
    print!("{}{}", display::CLEAR_SCREEN, display::render(app));
    let _ = std::io::stdout().flush();
}

async fn run(mut app: App) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut work = InFlight::default();
    show(&app);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading input")? else {
                    break;
                };
                let cmd = command::parse(&line, app.view());
                handle(&mut app, &mut work, cmd);
                work.reconcile(&app);
            }
            (ticket, outcome) = next_analysis(&mut work.analysis) => {
                work.analysis = None;
                app.complete_analysis(ticket, outcome);
                show(&app);
            }
            (ticket, item) = next_fragment(&mut work.turn) => {
                match item {
                    Some(Ok(fragment)) => {
                        app.chat_fragment(ticket, &fragment);
                        print!("{fragment}");
                        let _ = std::io::stdout().flush();
                    }
                    Some(Err(e)) => {
                        work.turn = None;
                        app.finish_chat_turn(ticket, Err(e));
                        show(&app);
                    }
                    None => {
                        work.turn = None;
                        app.finish_chat_turn(ticket, Ok(()));
                        show(&app);
                    }
                }
            }
        }
    }

    // Leave nothing on screen when input closes.
    app.panic();
    print!("{}", display::CLEAR_SCREEN);
    Ok(())
}

/// Feed a line of keys to the gate, stopping once it opens.
fn press_keys(app: &mut App, keys: Vec<Key>) -> Result<(), AppError> {
    for key in keys {
        if app.press_key(key)? == GateOutcome::Unlocked {
            break;
        }
    }
    Ok(())
}

fn handle(app: &mut App, work: &mut InFlight, cmd: Command) {
    let result = match cmd {
        Command::Panic => {
            app.panic();
            Ok(())
        }
        Command::Keys(keys) => press_keys(app, keys),
        Command::Lock => {
            app.lock();
            Ok(())
        }
        Command::Home => app.home(),
        Command::Chat => app.open_chat(),
        Command::Write => app.open_disclosure(),
        Command::Vault => app.open_vault(),
        Command::Help => {
            show(app);
            return;
        }
        Command::Text(text) => match app.view() {
            View::Companion(_) => match app.send_chat(&text) {
                Ok(Some(turn)) => {
                    work.turn = Some(turn);
                    show(app);
                    return;
                }
                Ok(None) => return,
                Err(e) => Err(e),
            },
            View::Disclosure(form) => {
                let text = if form.input.is_empty() {
                    text
                } else {
                    format!("{}\n{text}", form.input)
                };
                app.edit_disclosure(&text)
            }
            _ => {
                println!("{}", command::help(app.view()));
                return;
            }
        },
        Command::Submit => app.submit_disclosure().map(|job| {
            if job.is_some() {
                work.analysis = job;
            }
        }),
        Command::ClearInput => app.edit_disclosure(""),
        Command::Proceed => app.proceed_from_chat(),
        Command::DismissBreathing => {
            app.dismiss_breathing();
            Ok(())
        }
        Command::Confirm => app.confirm_draft().map(drop),
        Command::Discard => app.discard_draft(),
        Command::Delete(n) => match app.vault().entries().get(n - 1) {
            Some(entry) => {
                let id = entry.id.clone();
                app.request_delete(&id)
            }
            None => {
                println!("No record {n}.");
                return;
            }
        },
        Command::Yes => app.confirm_delete(),
        Command::No => {
            app.cancel_delete();
            Ok(())
        }
        Command::Unknown(word) => {
            if !matches!(app.view(), View::Gate) {
                println!("Unknown command {word}. {}", command::GLOBAL_HELP);
            }
            return;
        }
    };

    show(app);
    if let Err(e) = result {
        tracing::debug!(error = %e, "command rejected");
        if !matches!(app.view(), View::Gate) {
            println!("! {e}");
        }
    }
}
