// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog intelligence for the Kara assistant.
//!
//! - [`normalizer`]: synonym expansion and coarse intent classification.
//! - [`search`]: weighted, stock-aware product ranking.
//! - [`preferences`]: affinity mining from past prompts and recommendations.
//!
//! Everything here is pure and synchronous; callers pass a catalog snapshot.

pub mod normalizer;
pub mod preferences;
pub mod search;
pub mod synonyms;
mod text;

pub use normalizer::{
    DetectedPatterns, Intent, IntentResult, QueryTerms, classify_intent, normalize_terms,
};
pub use preferences::{Preferences, infer_preferences, recommend};
pub use search::{RankedProducts, ScoredProduct, fallback_sample, search, search_with_intent};
pub use text::fold;
