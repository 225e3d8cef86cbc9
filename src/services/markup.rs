//! Speech control markup.
//!
//! Users can steer the synthesized speech with lightweight markup that is
//! rewritten into punctuation and stress marks understood by the phonemizer:
//!
//! Pauses:
//! - `|` short, `||` medium, `|||` long
//! - `|0.5|` pause given in seconds
//! - `<break time="0.5s"/>` SSML-like form
//!
//! Stress (the stressed syllable is marked for espeak-ng with an apostrophe):
//! - `у'дарение` passes through unchanged
//! - `з[а]мок` and `з{а}мок` become `з'амок`

use std::sync::OnceLock;

use regex::{Captures, Regex};

const SHORT_PAUSE: &str = ", ";
const MEDIUM_PAUSE: &str = "; ";
const LONG_PAUSE: &str = ". ";

fn break_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<break\s+time=["']?(\d+\.?\d*)\s*s["']?\s*/>"#)
            .expect("valid break tag regex")
    })
}

fn timed_pause_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\|(\d+\.?\d*)\|").expect("valid timed pause regex"))
}

fn square_stress_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)\[(\w+)\](\w*)").expect("valid stress regex"))
}

fn curly_stress_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)\{(\w+)\}(\w*)").expect("valid stress regex"))
}

fn line_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break regex"))
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"))
}

/// Map a pause duration in seconds to the punctuation that produces it.
pub fn pause_for_seconds(seconds: &str) -> &'static str {
    match seconds.parse::<f64>() {
        Ok(s) if s <= 0.3 => SHORT_PAUSE,
        Ok(s) if s <= 0.7 => MEDIUM_PAUSE,
        Ok(_) => LONG_PAUSE,
        Err(_) => SHORT_PAUSE,
    }
}

/// Rewrite pause markers into punctuation.
pub fn process_pauses(text: &str) -> String {
    let text = break_tag_re().replace_all(text, |caps: &Captures| pause_for_seconds(&caps[1]));

    // Timed pauses first so `|0.5|` isn't read as two short pauses
    let text = timed_pause_re().replace_all(&text, |caps: &Captures| pause_for_seconds(&caps[1]));

    // Longest runs first; after `|||` and `||` only isolated bars remain
    text.replace("|||", LONG_PAUSE)
        .replace("||", MEDIUM_PAUSE)
        .replace('|', SHORT_PAUSE)
}

/// Rewrite bracketed stress marks into espeak-ng apostrophe notation.
pub fn process_stress_marks(text: &str) -> String {
    let text = square_stress_re().replace_all(text, "${1}'${2}${3}");
    curly_stress_re()
        .replace_all(&text, "${1}'${2}${3}")
        .into_owned()
}

/// Apply every speech control rewrite: pauses, then stress marks.
pub fn process_control_marks(text: &str) -> String {
    process_stress_marks(&process_pauses(text))
}

/// Strip HTML the VK client may have left in the text and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let text = line_break_re().replace_all(text, " ");
    let text = html_tag_re().replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Full text preparation before synthesis.
///
/// Break tags are converted before HTML cleanup strips tags.
pub fn prepare_text(text: &str, max_chars: usize) -> String {
    let marked = process_control_marks(text);
    truncate(&clean_text(&marked), max_chars)
}
