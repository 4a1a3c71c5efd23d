//! Line-oriented input. What a line means depends on the screen showing.

use justice_app::{Key, View};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Calculator keys typed at the gate.
    Keys(Vec<Key>),
    Panic,
    Lock,
    Home,
    Chat,
    Write,
    Vault,
    Help,
    /// A chat message, or a line added to the disclosure text.
    Text(String),
    Submit,
    ClearInput,
    Proceed,
    DismissBreathing,
    Confirm,
    Discard,
    /// 1-based position in the vault listing.
    Delete(usize),
    Yes,
    No,
    Unknown(String),
}

/// Panic works everywhere, including the gate, and must be quick to type.
const PANIC_WORDS: &[&str] = &["!!", ":panic", ":x"];

pub fn parse(line: &str, view: &View) -> Command {
    let trimmed = line.trim();
    if PANIC_WORDS.contains(&trimmed) {
        return Command::Panic;
    }

    if matches!(view, View::Gate) {
        return Command::Keys(trimmed.chars().filter_map(Key::from_char).collect());
    }

    let text = || Command::Text(line.trim_end_matches(['\r', '\n']).to_string());
    let Some(word) = trimmed.strip_prefix(':') else {
        return text();
    };
    let (word, arg) = word
        .split_once(char::is_whitespace)
        .map(|(w, a)| (w, a.trim()))
        .unwrap_or((word, ""));

    match (word, view) {
        ("lock", _) => Command::Lock,
        ("home", _) => Command::Home,
        ("chat", _) => Command::Chat,
        ("write", _) => Command::Write,
        ("vault", _) => Command::Vault,
        ("help" | "h", _) => Command::Help,
        ("submit", View::Disclosure(_)) => Command::Submit,
        ("clear", View::Disclosure(_)) => Command::ClearInput,
        ("proceed", View::Companion(_)) => Command::Proceed,
        ("ok", View::Companion(_)) => Command::DismissBreathing,
        ("confirm", View::Review(_)) => Command::Confirm,
        ("discard", View::Review(_)) => Command::Discard,
        ("delete" | "rm", View::Vault(_)) => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Command::Delete(n),
            _ => Command::Unknown(trimmed.to_string()),
        },
        ("yes" | "y", View::Vault(_)) => Command::Yes,
        ("no" | "n", View::Vault(_)) => Command::No,
        // Screens that take free text keep lines like ":) he laughed".
        (_, View::Disclosure(_) | View::Companion(_)) => text(),
        _ => Command::Unknown(trimmed.to_string()),
    }
}

pub fn help(view: &View) -> &'static str {
    match view {
        View::Gate => "",
        View::Dashboard => ":chat talk it through  :write document an incident  :vault saved records",
        View::Companion(_) => {
            "type to talk  :proceed turn this into a record  :ok dismiss the breathing prompt"
        }
        View::Disclosure(_) => "type lines of text  :submit analyse  :clear start over",
        View::Review(_) => ":confirm save to the vault  :discard go back and edit",
        View::Vault(_) => ":delete N remove record N (asks first)",
    }
}

pub const GLOBAL_HELP: &str = ":home  :lock  !! leave immediately";
