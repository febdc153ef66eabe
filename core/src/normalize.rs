use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// One step of a noise-removal pass.
enum Rewrite {
    Pattern(Regex, &'static str),
    /// Plain substring replacement, applied once left to right.
    Literal(&'static str, &'static str),
    Trim,
}

impl Rewrite {
    fn pattern(re: &str, replacement: &'static str) -> Self {
        Rewrite::Pattern(Regex::new(re).expect("valid regex"), replacement)
    }

    fn apply(&self, text: String) -> String {
        match self {
            Rewrite::Pattern(re, replacement) => {
                if re.is_match(&text) {
                    re.replace_all(&text, *replacement).into_owned()
                } else {
                    text
                }
            }
            Rewrite::Literal(from, to) => text.replace(*from, to),
            Rewrite::Trim => {
                let trimmed = text.trim_matches(' ');
                if trimmed.len() == text.len() { text } else { trimmed.to_string() }
            }
        }
    }
}

/// Which characters survive noise removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alphabet {
    /// ASCII letters and digits only; other characters become spaces.
    #[default]
    Ascii,
    /// NFKC-normalize first, then keep any Unicode letter or digit.
    Unicode,
}

impl FromStr for Alphabet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascii" => Ok(Alphabet::Ascii),
            "unicode" => Ok(Alphabet::Unicode),
            other => Err(format!("unknown alphabet `{other}` (expected ascii or unicode)")),
        }
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alphabet::Ascii => "ascii",
            Alphabet::Unicode => "unicode",
        })
    }
}

// Order matters: later rules clean up residue left by earlier ones.
fn noise_rules(disallowed: &str) -> Vec<Rewrite> {
    vec![
        // citation markers such as [12] or [3a]
        Rewrite::pattern(r"\[[0-9][0-9A-Za-z_]{0,3}\]", " "),
        Rewrite::pattern(r"(\.+ )|(-+ )|( -+)|( \.+)|(^-)|(^\.)", " "),
        Rewrite::pattern(r"\.+ ", " "),
        Rewrite::pattern(r"-+ ", " "),
        Rewrite::pattern(r" -+", " "),
        Rewrite::pattern(r" \.+", " "),
        Rewrite::pattern(r"^-", " "),
        Rewrite::pattern(r"^\.", " "),
        Rewrite::pattern(r"[.\-]+$", ""),
        Rewrite::pattern(disallowed, " "),
        Rewrite::Literal("  ", " "),
        Rewrite::Trim,
    ]
}

lazy_static! {
    static ref ASCII_RULES: Vec<Rewrite> = noise_rules(r"[^0-9a-zA-Z.\- ]");
    static ref UNICODE_RULES: Vec<Rewrite> = noise_rules(r"[^\p{L}\p{N}.\- ]");
}

/// Normalize raw document text with the ASCII alphabet: optional case
/// folding, then `noise_passes` repetitions of the noise-removal rule list.
pub fn normalize(raw: &str, case_fold: bool, noise_passes: u32) -> String {
    normalize_with(raw, case_fold, noise_passes, Alphabet::Ascii)
}

pub fn normalize_with(raw: &str, case_fold: bool, noise_passes: u32, alphabet: Alphabet) -> String {
    let (mut text, rules): (String, &[Rewrite]) = match alphabet {
        Alphabet::Ascii => (raw.to_string(), ASCII_RULES.as_slice()),
        Alphabet::Unicode => (raw.nfkc().collect(), UNICODE_RULES.as_slice()),
    };
    if case_fold {
        text = text.to_lowercase();
    }
    for _ in 0..noise_passes {
        text = rules.iter().fold(text, |acc, rule| rule.apply(acc));
    }
    text
}
