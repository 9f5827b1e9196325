// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Preference mining from past prompts, and preference-based recommendations.
//!
//! The heuristic is lossy on purpose: all prompts are merged into one blob,
//! so recency and frequency carry no weight.

use std::collections::BTreeSet;

use serde::Serialize;

use kara_core::{ConversationTurn, Product};

use crate::synonyms::{TermKind, find_group};
use crate::text::{WordText, fold};

/// Categories, colors and sizes a user has asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub categories: BTreeSet<String>,
    pub colors: BTreeSet<String>,
    pub sizes: BTreeSet<String>,
}

impl Preferences {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.colors.is_empty() && self.sizes.is_empty()
    }

    /// One-line summary for prompts, e.g. `categorías: buzo, remera; colores: negro`.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("categorías", &self.categories),
            ("colores", &self.colors),
            ("talles", &self.sizes),
        ]
        .into_iter()
        .filter(|(_, set)| !set.is_empty())
        .map(|(label, set)| {
            format!("{label}: {}", set.iter().cloned().collect::<Vec<_>>().join(", "))
        })
        .collect();
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

/// Collects every category, color and size mentioned in any prior prompt.
///
/// Prompts of failed exchanges count too; only their responses are suspect.
pub fn infer_preferences(turns: &[ConversationTurn]) -> Preferences {
    let blob = WordText::new(
        &turns
            .iter()
            .map(|t| t.prompt.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    );

    let collect = |kind: TermKind| -> BTreeSet<String> {
        kind.table()
            .iter()
            .filter(|g| g.synonyms.iter().any(|s| blob.contains_phrase(s)))
            .map(|g| g.canonical.to_string())
            .collect()
    };

    Preferences {
        categories: collect(TermKind::Category),
        colors: collect(TermKind::Color),
        sizes: collect(TermKind::Size),
    }
}

fn matches_any(kind: TermKind, wanted: &BTreeSet<String>, fields: &[&str]) -> bool {
    wanted.iter().any(|canonical| {
        find_group(kind, canonical).is_some_and(|g| {
            g.synonyms
                .iter()
                .any(|s| fields.iter().any(|f| f.contains(s)))
        })
    })
}

fn matches_preferences(product: &Product, prefs: &Preferences) -> bool {
    let name = fold(&product.name);
    let category = product.category.as_deref().map(fold).unwrap_or_default();
    let mut colors = vec![product.color.as_deref().map(fold).unwrap_or_default()];
    colors.extend(product.variants.iter().map(|v| fold(&v.color)));
    let color_refs: Vec<&str> = colors.iter().map(String::as_str).collect();

    let by_category = matches_any(
        TermKind::Category,
        &prefs.categories,
        &[category.as_str(), name.as_str()],
    );
    let by_color = matches_any(TermKind::Color, &prefs.colors, &color_refs);
    let by_size = prefs.sizes.iter().any(|size| {
        find_group(TermKind::Size, size).is_some_and(|g| {
            product
                .variants
                .iter()
                .any(|v| g.synonyms.contains(&fold(v.size.trim()).as_str()))
        })
    });
    by_category || by_color || by_size
}

/// Newest matching in-stock products, at most `limit`.
///
/// Products match on category OR color OR variant size. Without any
/// preference the whole catalog is eligible.
pub fn recommend(catalog: &[Product], prefs: &Preferences, limit: usize) -> Vec<Product> {
    let mut matches: Vec<&Product> = catalog
        .iter()
        .filter(|p| prefs.is_empty() || matches_preferences(p, prefs))
        .collect();
    matches.sort_by(|a, b| b.id.cmp(&a.id));
    matches
        .into_iter()
        .filter(|p| p.is_available())
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kara_core::Variant;

    fn turn(prompt: &str, response: &str) -> ConversationTurn {
        ConversationTurn {
            id: 0,
            session_id: "s".into(),
            prompt: prompt.into(),
            response: response.into(),
            created_at: String::new(),
        }
    }

    fn product(id: i64, name: &str, category: &str, color: &str, size: &str, stock: i64) -> Product {
        Product {
            id,
            name: name.into(),
            description: None,
            price: 1.0,
            material: None,
            size: None,
            color: Some(color.into()),
            category: Some(category.into()),
            variants: vec![Variant {
                size: size.into(),
                color: color.into(),
                stock,
            }],
        }
    }

    #[test]
    fn mines_all_prompts_including_failed_turns() {
        let turns = vec![
            turn("Hola, tienen buzos?", "Sí"),
            turn("y en color NEGRO talle XL", "ERROR: Failed to get response: 503"),
        ];
        let prefs = infer_preferences(&turns);
        assert_eq!(prefs.categories, BTreeSet::from(["buzo".to_string()]));
        assert_eq!(prefs.colors, BTreeSet::from(["negro".to_string()]));
        assert_eq!(prefs.sizes, BTreeSet::from(["xl".to_string()]));
    }

    #[test]
    fn duplicate_mentions_are_deduplicated() {
        let turns = vec![turn("remera", ""), turn("remeras y camisetas", "")];
        let prefs = infer_preferences(&turns);
        assert_eq!(prefs.categories.len(), 1);
        assert_eq!(
            prefs.summary().as_deref(),
            Some("categorías: remera")
        );
    }

    #[test]
    fn no_history_means_no_preferences() {
        assert!(infer_preferences(&[]).is_empty());
        assert_eq!(Preferences::default().summary(), None);
    }

    #[test]
    fn recommend_is_newest_first_and_skips_empty_stock() {
        let catalog = vec![
            product(1, "Buzo gris", "Buzos", "Gris", "M", 4),
            product(2, "Remera azul", "Remeras", "Azul", "XL", 2),
            product(3, "Buzo negro", "Buzos", "Negro", "L", 0),
            product(4, "Campera roja", "Camperas", "Rojo", "S", 9),
            product(5, "Buzo verde", "Buzos", "Verde", "S", 1),
        ];
        let prefs = Preferences {
            categories: BTreeSet::from(["buzo".to_string()]),
            colors: BTreeSet::new(),
            sizes: BTreeSet::from(["xl".to_string()]),
        };

        let ids: Vec<_> = recommend(&catalog, &prefs, 10).iter().map(|p| p.id).collect();
        assert_eq!(ids, [5, 2, 1]);

        let ids: Vec<_> = recommend(&catalog, &prefs, 2).iter().map(|p| p.id).collect();
        assert_eq!(ids, [5, 2]);
    }

    #[test]
    fn empty_preferences_recommend_newest_available() {
        let catalog = vec![
            product(1, "A", "Remeras", "Negro", "M", 1),
            product(2, "B", "Remeras", "Negro", "M", 0),
        ];
        let ids: Vec<_> = recommend(&catalog, &Preferences::default(), 3)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, [1]);
    }
}
