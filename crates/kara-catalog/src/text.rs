// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text folding and word-boundary matching shared by the catalog modules.

/// Lower-cases and strips Spanish diacritics.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Alphanumeric words of already-folded text.
pub(crate) fn words(folded: &str) -> impl Iterator<Item = &str> {
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

/// Folded text re-joined as ` word word ` for whole-word phrase lookups.
#[derive(Debug, Clone)]
pub(crate) struct WordText(String);

impl WordText {
    pub(crate) fn new(raw: &str) -> Self {
        let folded = fold(raw);
        let mut padded = String::with_capacity(folded.len() + 2);
        padded.push(' ');
        for word in words(&folded) {
            padded.push_str(word);
            padded.push(' ');
        }
        Self(padded)
    }

    /// True when `phrase` (folded, one or more words) occurs on word boundaries.
    pub(crate) fn contains_phrase(&self, phrase: &str) -> bool {
        self.0.contains(&format!(" {phrase} "))
    }

    /// The folded words, space separated, without padding.
    pub(crate) fn as_str(&self) -> &str {
        self.0.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folding_removes_accents_and_case() {
        assert_eq!(fold("¿Hacen ENVÍOS al país?"), "¿hacen envios al pais?");
    }

    #[test]
    fn phrases_match_on_word_boundaries_only() {
        let text = WordText::new("Remera talle S, color azul-marino");
        assert!(text.contains_phrase("s"));
        assert!(text.contains_phrase("azul marino"));
        assert!(!text.contains_phrase("rem"));
        assert_eq!(text.as_str(), "remera talle s color azul marino");
    }
}
