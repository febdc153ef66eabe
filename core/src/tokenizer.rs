use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a token that ends in `.` is trimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrailingDot {
    /// Remove exactly the final `.`.
    #[default]
    Strip,
    /// Remove the final two characters, matching indexes produced by the
    /// older pipeline. Tokens that become empty are dropped.
    Legacy,
}

impl FromStr for TrailingDot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strip" => Ok(TrailingDot::Strip),
            "legacy" => Ok(TrailingDot::Legacy),
            other => Err(format!("unknown trailing-dot mode `{other}` (expected strip or legacy)")),
        }
    }
}

impl fmt::Display for TrailingDot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrailingDot::Strip => "strip",
            TrailingDot::Legacy => "legacy",
        })
    }
}

/// Split normalized text into word tokens using the default trailing-dot handling.
pub fn tokenize(text: &str) -> Vec<String> {
    tokenize_with(text, TrailingDot::Strip)
}

/// Split normalized text on single spaces, dropping empty tokens and bare
/// `.`, and trimming sentence-final dots. Token order is preserved.
pub fn tokenize_with(text: &str, mode: TrailingDot) -> Vec<String> {
    text.split(' ')
        .filter_map(|word| valid_word(word, mode))
        .map(str::to_string)
        .collect()
}

fn valid_word(word: &str, mode: TrailingDot) -> Option<&str> {
    if word.is_empty() || word == "." {
        return None;
    }
    if word.chars().count() == 1 || !word.ends_with('.') {
        return Some(word);
    }
    let trimmed = match mode {
        TrailingDot::Strip => &word[..word.len() - 1],
        TrailingDot::Legacy => {
            let cut = word.char_indices().rev().nth(1).map(|(i, _)| i).unwrap_or(0);
            &word[..cut]
        }
    };
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("the cat  sat . on the mat.");
        assert_eq!(t, vec!["the", "cat", "sat", "on", "the", "mat"]);
    }

    #[test]
    fn legacy_mode_drops_two_characters() {
        let t = tokenize_with("end. a. ok.", TrailingDot::Legacy);
        assert_eq!(t, vec!["en", "o"]);
    }

    #[test]
    fn single_character_tokens_survive() {
        assert_eq!(tokenize("a b -"), vec!["a", "b", "-"]);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("legacy".parse::<TrailingDot>().unwrap(), TrailingDot::Legacy);
        assert!("other".parse::<TrailingDot>().is_err());
    }
}
