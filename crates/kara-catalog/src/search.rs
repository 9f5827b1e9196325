// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stock-aware product ranking.
//!
//! Candidates are products where any text term is a substring of the name,
//! description, material or color, or any size term equals a product or
//! variant size. Detected category/color/size concepts then narrow that set.
//! Scores are a weighted count of matching terms plus stock and intent
//! bonuses; the sort is stable so equal scores keep catalog order.

use serde::Serialize;
use tracing::debug;

use kara_core::Product;

use crate::normalizer::{Intent, QueryTerms, classify_intent};
use crate::synonyms::{TermKind, find_group};
use crate::text::fold;

pub const NAME_WEIGHT: u32 = 10;
pub const CATEGORY_WEIGHT: u32 = 8;
pub const COLOR_WEIGHT: u32 = 7;
pub const MATERIAL_WEIGHT: u32 = 6;
pub const DESCRIPTION_WEIGHT: u32 = 5;
pub const IN_STOCK_BONUS: u32 = 5;
pub const DEEP_STOCK_BONUS: u32 = 3;
pub const DEEP_STOCK_THRESHOLD: i64 = 10;
pub const PRODUCT_SEARCH_BONUS: u32 = 2;

/// A product with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProduct {
    pub product: Product,
    pub score: u32,
}

/// Ranked search output, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedProducts {
    pub results: Vec<ScoredProduct>,
}

impl RankedProducts {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.results.iter().map(|r| &r.product)
    }
}

/// Folded copies of the searchable fields of one product.
struct ProductText {
    name: String,
    description: String,
    material: String,
    color: String,
    category: String,
    sizes: Vec<String>,
    variant_colors: String,
}

impl ProductText {
    fn new(product: &Product) -> Self {
        let opt = |v: &Option<String>| v.as_deref().map(fold).unwrap_or_default();
        let mut sizes: Vec<String> = product
            .variants
            .iter()
            .map(|v| fold(v.size.trim()))
            .collect();
        if let Some(size) = &product.size {
            sizes.extend(fold(size).split([',', '/', ' ']).map(|s| s.trim().to_string()));
        }
        sizes.retain(|s| !s.is_empty());
        Self {
            name: fold(&product.name),
            description: opt(&product.description),
            material: opt(&product.material),
            color: opt(&product.color),
            category: opt(&product.category),
            sizes,
            variant_colors: product
                .variants
                .iter()
                .map(|v| fold(&v.color))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    fn text_match(&self, term: &str) -> bool {
        self.name.contains(term)
            || self.description.contains(term)
            || self.material.contains(term)
            || self.color.contains(term)
    }

    fn has_size(&self, size: &str) -> bool {
        self.sizes.iter().any(|s| s == size)
    }

    fn in_group(&self, kind: TermKind, canonical: &str) -> bool {
        let Some(group) = find_group(kind, canonical) else {
            return false;
        };
        match kind {
            TermKind::Category => group
                .synonyms
                .iter()
                .any(|s| self.category.contains(s) || self.name.contains(s)),
            TermKind::Color => group.synonyms.iter().any(|s| {
                self.color.contains(s) || self.variant_colors.contains(s) || self.name.contains(s)
            }),
            TermKind::Size => group.synonyms.iter().any(|s| self.has_size(s)),
        }
    }
}

/// Ranks the catalog for a query, classifying its intent first.
pub fn search(catalog: &[Product], query: &str, limit: usize) -> RankedProducts {
    let intent = classify_intent(query).primary_intent;
    search_with_intent(catalog, query, Some(intent), limit)
}

/// Ranks the catalog for a query with a caller-supplied intent.
pub fn search_with_intent(
    catalog: &[Product],
    query: &str,
    intent: Option<Intent>,
    limit: usize,
) -> RankedProducts {
    let terms = QueryTerms::analyze(query);
    let text_terms = terms.text_terms();
    if text_terms.is_empty() && terms.sizes.is_empty() {
        return RankedProducts::default();
    }

    let mut results: Vec<ScoredProduct> = catalog
        .iter()
        .filter_map(|product| {
            let text = ProductText::new(product);

            let candidate = text_terms.iter().any(|t| text.text_match(t))
                || terms.sizes.iter().any(|s| text.has_size(s));
            if !candidate {
                return None;
            }
            let narrowed = terms.categories.iter().all(|c| text.in_group(TermKind::Category, c))
                && terms.colors.iter().all(|c| text.in_group(TermKind::Color, c))
                && terms.sizes.iter().all(|s| text.in_group(TermKind::Size, s));
            // Each detected concept must be satisfied by at least one of its synonyms.
            if !narrowed {
                return None;
            }

            Some(ScoredProduct {
                score: score(product, &text, &text_terms, intent),
                product: product.clone(),
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(limit);
    debug!(query, matches = results.len(), "catalog search");
    RankedProducts { results }
}

fn score(
    product: &Product,
    text: &ProductText,
    terms: &std::collections::BTreeSet<String>,
    intent: Option<Intent>,
) -> u32 {
    let mut score = 0;
    for term in terms {
        let term = term.as_str();
        if text.name.contains(term) {
            score += NAME_WEIGHT;
        }
        if text.category.contains(term) {
            score += CATEGORY_WEIGHT;
        }
        if text.color.contains(term) {
            score += COLOR_WEIGHT;
        }
        if text.material.contains(term) {
            score += MATERIAL_WEIGHT;
        }
        if text.description.contains(term) {
            score += DESCRIPTION_WEIGHT;
        }
    }

    let stock = product.total_stock();
    if stock > 0 {
        score += IN_STOCK_BONUS;
    }
    if stock > DEEP_STOCK_THRESHOLD {
        score += DEEP_STOCK_BONUS;
    }
    if intent == Some(Intent::ProductSearch) {
        score += PRODUCT_SEARCH_BONUS;
    }
    score
}

/// Unfiltered catalog sample, in database order, used when a search comes back empty.
pub fn fallback_sample(catalog: &[Product], limit: usize) -> Vec<&Product> {
    catalog.iter().take(limit).collect()
}
