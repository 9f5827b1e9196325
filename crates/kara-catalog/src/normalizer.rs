// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query normalization and intent classification.
//!
//! Both are table driven and free of I/O. Matching works on folded text, so
//! "ENVÍOS" and "envios" are the same query.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use strum::{Display, EnumString};

use crate::synonyms::{SynonymGroup, TermKind};
use crate::text::{WordText, fold, words};

/// Coarse classification of what the sender wants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ProductSearch,
    SizeInquiry,
    PriceInquiry,
    Availability,
    Shipping,
    Help,
    Greeting,
    GeneralInquiry,
}

/// Keyword buckets, in tie-break order.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::ProductSearch,
        &[
            "busco", "buscando", "quiero", "necesito", "tienen", "tenes", "mostrame",
            "comprar", "producto", "modelo", "prenda", "ropa", "recomenda",
        ],
    ),
    (
        Intent::SizeInquiry,
        &["talle", "medida", "tamano", "size", "calce", "me queda", "horma"],
    ),
    (
        Intent::PriceInquiry,
        &["precio", "cuesta", "cuanto sale", "valor", "cuotas", "descuento", "oferta", "barato", "$"],
    ),
    (
        Intent::Availability,
        &["stock", "disponible", "disponibilidad", "quedan", "agotado", "reponen", "ingreso"],
    ),
    (
        Intent::Shipping,
        &["envio", "enviar", "envian", "entrega", "llega", "correo", "despacho", "retiro", "domicilio"],
    ),
    (
        Intent::Help,
        &["ayuda", "problema", "cambio", "devolucion", "devolver", "reclamo", "no funciona", "como hago"],
    ),
    (
        Intent::Greeting,
        &["hola", "buenas", "buen dia", "buenos dias", "saludos", "que tal"],
    ),
];

/// Words dropped from free-text terms.
const STOPWORDS: &[&str] = &[
    "que", "con", "para", "por", "una", "uno", "unos", "unas", "los", "las", "del", "the",
    "hola", "buenas", "busco", "buscando", "quiero", "necesito", "tienen", "tenes", "hay",
    "algo", "alguna", "alguno", "color", "talle", "como", "este", "esta", "esto", "ese",
    "esa", "muy", "mas", "pero", "gracias", "favor", "tiene", "son", "sus", "mis",
];

/// Free-text words shorter than this are ignored.
const MIN_KEYWORD_LEN: usize = 3;

static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s*\d|\b\d[\d.,]*\s*(?:pesos|ars|usd|dolares|mil|k)\b").unwrap()
});

/// A query broken into synonym-table concepts and leftover words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTerms {
    /// Canonical category terms.
    pub categories: BTreeSet<&'static str>,
    /// Canonical color terms.
    pub colors: BTreeSet<&'static str>,
    /// Canonical size terms.
    pub sizes: BTreeSet<&'static str>,
    /// Remaining meaningful words.
    pub keywords: BTreeSet<String>,
}

impl QueryTerms {
    pub fn analyze(query: &str) -> Self {
        let text = WordText::new(query);
        let categories = matched_groups(&text, TermKind::Category);
        let colors = matched_groups(&text, TermKind::Color);
        let sizes = matched_groups(&text, TermKind::Size);

        let consumed: BTreeSet<&str> = [
            (TermKind::Category, &categories),
            (TermKind::Color, &colors),
            (TermKind::Size, &sizes),
        ]
        .into_iter()
        .flat_map(|(kind, groups)| groups.iter().map(move |g| (kind, *g)))
        .filter_map(|(kind, canonical)| crate::synonyms::find_group(kind, canonical))
        .flat_map(|g| g.synonyms.iter().flat_map(|s| s.split(' ')))
        .collect();

        let keywords = words(text.as_str())
            .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
            .filter(|w| !STOPWORDS.contains(w) && !consumed.contains(w))
            .map(str::to_string)
            .collect();

        Self {
            categories,
            colors,
            sizes,
            keywords,
        }
    }

    /// Terms matched by substring against product text: every synonym of
    /// the detected categories and colors, plus the leftover keywords.
    pub fn text_terms(&self) -> BTreeSet<String> {
        let mut terms = self.keywords.clone();
        for (kind, groups) in [
            (TermKind::Category, &self.categories),
            (TermKind::Color, &self.colors),
        ] {
            for canonical in groups {
                if let Some(g) = crate::synonyms::find_group(kind, canonical) {
                    terms.extend(g.synonyms.iter().map(|s| s.to_string()));
                }
            }
        }
        terms
    }

    /// Every normalized term, sizes included.
    pub fn all_terms(&self) -> BTreeSet<String> {
        let mut terms = self.text_terms();
        terms.extend(self.sizes.iter().map(|s| s.to_string()));
        terms
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.colors.is_empty()
            && self.sizes.is_empty()
            && self.keywords.is_empty()
    }
}

fn matched_groups(text: &WordText, kind: TermKind) -> BTreeSet<&'static str> {
    kind.table()
        .iter()
        .filter(|g: &&SynonymGroup| g.synonyms.iter().any(|s| text.contains_phrase(s)))
        .map(|g| g.canonical)
        .collect()
}

/// Expands a query against the synonym tables and tokenizes the rest.
///
/// Sizes appear as canonical tokens only (`"m"`, `"xl"`); categories and
/// colors contribute their canonical term and all synonyms.
pub fn normalize_terms(query: &str) -> BTreeSet<String> {
    QueryTerms::analyze(query).all_terms()
}

/// Boolean signals extracted alongside the intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectedPatterns {
    pub specific_product: bool,
    pub color_mentioned: bool,
    pub size_mentioned: bool,
    pub price_mentioned: bool,
}

/// Outcome of [`classify_intent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    pub primary_intent: Intent,
    /// Score per bucket, in table order.
    pub scores_by_intent: Vec<(Intent, u32)>,
    pub detected_patterns: DetectedPatterns,
    /// Share of the total score held by the primary intent, 0.0 when nothing matched.
    pub confidence: f32,
}

/// Scores the query against each keyword bucket by substring counting.
///
/// The highest score wins; ties go to the bucket listed first. With no
/// matches the result is [`Intent::GeneralInquiry`].
pub fn classify_intent(query: &str) -> IntentResult {
    let folded = fold(query);
    let terms = QueryTerms::analyze(query);

    let scores_by_intent: Vec<(Intent, u32)> = INTENT_KEYWORDS
        .iter()
        .map(|(intent, keywords)| {
            let score = keywords
                .iter()
                .map(|k| folded.matches(k).count() as u32)
                .sum();
            (*intent, score)
        })
        .collect();

    let mut primary_intent = Intent::GeneralInquiry;
    let mut best = 0;
    for &(intent, score) in &scores_by_intent {
        if score > best {
            best = score;
            primary_intent = intent;
        }
    }

    let total: u32 = scores_by_intent.iter().map(|(_, s)| s).sum();
    let confidence = if total == 0 {
        0.0
    } else {
        best as f32 / total as f32
    };

    IntentResult {
        primary_intent,
        scores_by_intent,
        detected_patterns: DetectedPatterns {
            specific_product: !terms.categories.is_empty(),
            color_mentioned: !terms.colors.is_empty(),
            size_mentioned: !terms.sizes.is_empty(),
            price_mentioned: PRICE_PATTERN.is_match(&folded),
        },
        confidence,
    }
}

impl IntentResult {
    pub fn score(&self, intent: Intent) -> u32 {
        self.scores_by_intent
            .iter()
            .find(|(i, _)| *i == intent)
            .map_or(0, |(_, s)| *s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_category_and_color_synonyms() {
        let terms = normalize_terms("Busco una camiseta NEGRA");
        assert!(terms.contains("remera"));
        assert!(terms.contains("camiseta"));
        assert!(terms.contains("negro"));
        assert!(terms.contains("black"));
        assert!(!terms.contains("busco"));
    }

    #[test]
    fn sizes_need_a_whole_word() {
        let analyzed = QueryTerms::analyze("remeras talle M");
        assert_eq!(analyzed.sizes, BTreeSet::from(["m"]));

        let none = QueryTerms::analyze("mostrame sweaters");
        assert!(none.sizes.is_empty(), "{none:?}");
    }

    #[test]
    fn leftover_words_become_keywords() {
        let analyzed = QueryTerms::analyze("buzo de algodón oversize");
        assert_eq!(analyzed.categories, BTreeSet::from(["buzo"]));
        assert!(analyzed.keywords.contains("algodon"));
        assert!(analyzed.keywords.contains("oversize"));
        assert!(!analyzed.keywords.contains("buzo"));
        assert!(!analyzed.keywords.contains("de"));
    }

    #[test]
    fn empty_query_has_no_terms() {
        assert!(QueryTerms::analyze("  ¿? ").is_empty());
        assert!(normalize_terms("").is_empty());
    }

    #[test]
    fn shipping_question_is_classified_as_shipping() {
        let result = classify_intent("¿Hacen envíos a todo el país?");
        assert_eq!(result.primary_intent, Intent::Shipping);
        assert_eq!(result.score(Intent::Shipping), 1);
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn product_search_with_patterns() {
        let result = classify_intent("Hola! busco una remera negra talle L, ¿tienen?");
        assert_eq!(result.primary_intent, Intent::ProductSearch);
        let p = result.detected_patterns;
        assert!(p.specific_product && p.color_mentioned && p.size_mentioned);
        assert!(!p.price_mentioned);
    }

    #[test]
    fn price_tokens_are_detected() {
        let result = classify_intent("¿La campera sale $45.000?");
        assert!(result.detected_patterns.price_mentioned);
        assert_eq!(result.primary_intent, Intent::PriceInquiry);
        assert!(classify_intent("algo por 20 mil pesos").detected_patterns.price_mentioned);
    }

    #[test]
    fn no_keyword_means_general_inquiry() {
        let result = classify_intent("xyz");
        assert_eq!(result.primary_intent, Intent::GeneralInquiry);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.scores_by_intent.len(), INTENT_KEYWORDS.len());
    }

    #[test]
    fn ties_go_to_the_first_bucket() {
        // one shipping keyword, one greeting keyword
        let result = classify_intent("hola, envio?");
        assert_eq!(result.score(Intent::Shipping), 1);
        assert_eq!(result.score(Intent::Greeting), 1);
        assert_eq!(result.primary_intent, Intent::Shipping);
        assert!((result.confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn intent_labels_are_snake_case() {
        assert_eq!(Intent::ProductSearch.to_string(), "product_search");
        assert_eq!(Intent::GeneralInquiry.to_string(), "general_inquiry");
    }
}
