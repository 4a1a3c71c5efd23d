//! Plain-text rendering of each screen.

use std::fmt::Write as _;

use chrono::{Local, TimeZone};
use justice_app::{App, ChatScreen, DisclosureForm, View, VaultScreen};
use justice_core::law::{DISCLAIMER, DOCUMENTATION_TIPS, Statute, relevant_statutes};
use justice_core::{ConversationTurn, Draft, IncidentEntry, Role};

use crate::command;

/// Wipes the terminal, scrollback included where supported.
pub const CLEAR_SCREEN: &str = "\x1b[3J\x1b[2J\x1b[H";
const RULE: &str = "────────────────────────────────────────";

pub fn render(app: &App) -> String {
    let mut out = match app.view() {
        View::Gate => render_gate(app.gate_display()),
        View::Dashboard => render_dashboard(app.vault().len()),
        View::Companion(chat) => render_chat(chat),
        View::Disclosure(form) => render_disclosure(form),
        View::Review(draft) => render_review(draft),
        View::Vault(screen) => render_vault(app.vault().entries(), screen),
    };
    // A streaming reply is written after the render; it must stay last.
    let streaming = matches!(app.view(), View::Companion(c) if c.is_typing());
    if !matches!(app.view(), View::Gate) && !streaming {
        let _ = writeln!(out, "\n{}\n{}", command::help(app.view()), command::GLOBAL_HELP);
    }
    out
}

pub fn render_gate(display: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "┌──────────────┐");
    let _ = writeln!(out, "│ {display:>12} │");
    let _ = writeln!(out, "└──────────────┘");
    let _ = writeln!(out, "  7 8 9   4 5 6   1 2 3   0 = C");
    out
}

pub fn render_dashboard(entries: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Justice\n{RULE}");
    let _ = writeln!(out, "Saved records: {entries}\n");
    let _ = writeln!(out, "Know your rights");
    for statute in Statute::ALL {
        let _ = writeln!(out, "  • {}", statute.citation());
    }
    let _ = writeln!(out, "\nDocumentation tips");
    for tip in DOCUMENTATION_TIPS {
        let _ = writeln!(out, "  • {tip}");
    }
    out
}

fn turn_line(turn: &ConversationTurn) -> String {
    let who = match turn.role {
        Role::User => "You",
        Role::Companion => "Companion",
    };
    format!("{who}: {}", turn.text)
}

pub fn render_chat(chat: &ChatScreen) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Companion\n{RULE}");
    for turn in &chat.transcript {
        let _ = writeln!(out, "{}\n", turn_line(turn));
    }
    if chat.breathing {
        let _ = writeln!(out, "{}", breathing_prompt());
    }
    if let Some(pending) = &chat.pending {
        let _ = write!(out, "Companion: {}", pending.text);
    }
    out
}

pub fn breathing_prompt() -> &'static str {
    "  ( Breathe in for four… hold… and out for six. :ok when you're ready. )"
}

pub fn render_disclosure(form: &DisclosureForm) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Document an incident\n{RULE}");
    if form.input.is_empty() {
        let _ = writeln!(out, "(nothing written yet)");
    } else {
        let _ = writeln!(out, "{}", form.input);
    }
    let _ = writeln!(out, "{RULE}");
    if form.is_analyzing() {
        let _ = writeln!(out, "Analysing…");
    }
    if let Some(notice) = &form.notice {
        let _ = writeln!(out, "! {notice}");
    }
    out
}

pub fn render_review(draft: &Draft) -> String {
    let analysis = draft.analysis();
    let tags: Vec<&str> = analysis.classifications.iter().map(|c| c.as_str()).collect();

    let mut out = String::new();
    let _ = writeln!(out, "Review before saving\n{RULE}");
    let _ = writeln!(out, "Classification: {}", tags.join(", "));
    let _ = writeln!(out, "Urgency:        {}", analysis.urgency);
    if analysis.is_vague {
        let _ = writeln!(
            out,
            "Note: the account is light on detail. Dates, places, and exact words help."
        );
    }
    let _ = writeln!(out, "\nRedacted account\n  {}", analysis.redacted_text);
    if !analysis.placeholders.is_empty() {
        let _ = writeln!(out, "\nPlaceholders");
        for (key, value) in &analysis.placeholders {
            let _ = writeln!(out, "  {key:<14} {value}");
        }
    }

    let guidance = &analysis.legal_guidance;
    let _ = writeln!(out, "\nWhat the law says\n  {}", guidance.what_the_law_says);
    let _ = writeln!(out, "Why it matters\n  {}", guidance.why_it_matters);
    let _ = writeln!(out, "Next steps\n  {}", guidance.next_steps);
    let statutes = relevant_statutes(&analysis.classifications);
    if !statutes.is_empty() {
        let cited: Vec<&str> = statutes.iter().map(|s| s.citation()).collect();
        let _ = writeln!(out, "See: {}", cited.join("; "));
    }
    let _ = writeln!(out, "\n{DISCLAIMER}");
    out
}

fn format_timestamp(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub fn render_entry(index: usize, entry: &IncidentEntry) -> String {
    let tags: Vec<&str> = entry.classifications.iter().map(|c| c.as_str()).collect();
    format!(
        "{index:>3}. {}  [{}]  urgency: {}\n     {}\n",
        format_timestamp(entry.timestamp),
        tags.join(", "),
        entry.urgency,
        entry.redacted_content,
    )
}

pub fn render_vault(entries: &[IncidentEntry], screen: &VaultScreen) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Vault\n{RULE}");
    if entries.is_empty() {
        let _ = writeln!(out, "No records yet.");
    }
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&render_entry(i + 1, entry));
    }
    if let Some(id) = &screen.pending_delete
        && let Some(pos) = entries.iter().position(|e| &e.id == id)
    {
        let _ = writeln!(
            out,
            "\nDelete record {}? This cannot be undone. :yes / :no",
            pos + 1
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use justice_core::{AnalysisResult, Classification, LegalGuidance, Urgency};
    use std::collections::BTreeMap;

    fn entry(id: &str) -> IncidentEntry {
        IncidentEntry {
            id: id.into(),
            timestamp: 1_700_000_000_000,
            redacted_content: "[PERSON_1] blocked my promotion".into(),
            classifications: vec![Classification::Discrimination],
            urgency: Urgency::High,
            legal_context: "Article 27".into(),
            placeholders: BTreeMap::new(),
        }
    }

    #[test]
    fn gate_shows_only_the_display() {
        let out = render_gate("1235");
        assert!(out.contains("1235"));
        assert!(!out.contains("Justice"));
    }

    #[test]
    fn review_carries_disclaimer_and_redacted_text_only() {
        let draft = Draft::new(
            AnalysisResult {
                classifications: vec![Classification::SexualHarassment],
                urgency: Urgency::High,
                redacted_text: "[PERSON_1] touched me".into(),
                legal_guidance: LegalGuidance {
                    what_the_law_says: "s. 6".into(),
                    why_it_matters: "It is unlawful.".into(),
                    next_steps: "Write it down.".into(),
                },
                placeholders: BTreeMap::from([("[PERSON_1]".into(), "Mr. Otieno".into())]),
                is_vague: true,
            },
            "Mr. Otieno touched me",
        );
        let out = render_review(&draft);
        assert!(out.contains(DISCLAIMER));
        assert!(out.contains("[PERSON_1] touched me"));
        assert!(out.contains("Sexual Harassment"));
        assert!(out.contains("Sexual Offences Act"));
        assert!(!out.contains("Mr. Otieno touched me"));
    }

    #[test]
    fn vault_lists_entries_and_asks_before_delete() {
        let entries = vec![entry("2"), entry("1")];
        let screen = VaultScreen {
            pending_delete: Some("1".into()),
        };
        let out = render_vault(&entries, &screen);
        assert!(out.contains("  1. "));
        assert!(out.contains("  2. "));
        assert!(out.contains("[Discrimination]"));
        assert!(out.contains("Delete record 2?"));
    }

    #[test]
    fn empty_vault() {
        let out = render_vault(&[], &VaultScreen::default());
        assert!(out.contains("No records yet."));
    }
}
