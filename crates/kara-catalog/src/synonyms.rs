// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static synonym tables for apparel categories, colors and sizes.
//!
//! Entries are stored folded (lower case, no diacritics). The canonical term
//! is always listed among its own synonyms.

/// A canonical term and every spelling that maps to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynonymGroup {
    pub canonical: &'static str,
    pub synonyms: &'static [&'static str],
}

const fn group(canonical: &'static str, synonyms: &'static [&'static str]) -> SynonymGroup {
    SynonymGroup {
        canonical,
        synonyms,
    }
}

pub const CATEGORIES: &[SynonymGroup] = &[
    group(
        "remera",
        &["remera", "remeras", "camiseta", "camisetas", "playera", "playeras", "t shirt", "tshirt", "musculosa", "musculosas"],
    ),
    group(
        "buzo",
        &["buzo", "buzos", "hoodie", "hoodies", "sudadera", "sudaderas", "canguro", "sweater"],
    ),
    group(
        "pantalon",
        &["pantalon", "pantalones", "jean", "jeans", "jogger", "joggers", "cargo", "cargos"],
    ),
    group(
        "campera",
        &["campera", "camperas", "chaqueta", "chaquetas", "abrigo", "abrigos", "jacket", "rompeviento"],
    ),
    group("camisa", &["camisa", "camisas", "blusa", "blusas"]),
    group("short", &["short", "shorts", "bermuda", "bermudas"]),
    group("vestido", &["vestido", "vestidos"]),
    group("pollera", &["pollera", "polleras", "falda", "faldas"]),
    group("gorra", &["gorra", "gorras", "gorro", "gorros", "cap", "beanie"]),
    group(
        "accesorio",
        &["accesorio", "accesorios", "cinturon", "cinturones", "bolso", "bolsos", "mochila", "mochilas", "medias"],
    ),
];

pub const COLORS: &[SynonymGroup] = &[
    group("negro", &["negro", "negra", "negros", "negras", "black"]),
    group("blanco", &["blanco", "blanca", "blancos", "blancas", "white"]),
    group("gris", &["gris", "grises", "gray", "grey", "melange"]),
    group("azul", &["azul", "azules", "marino", "navy", "blue"]),
    group("rojo", &["rojo", "roja", "rojos", "rojas", "bordo", "red"]),
    group("verde", &["verde", "verdes", "oliva", "militar", "green"]),
    group("amarillo", &["amarillo", "amarilla", "amarillos", "amarillas", "mostaza", "yellow"]),
    group("rosa", &["rosa", "rosado", "rosada", "rosas", "fucsia", "pink"]),
    group("beige", &["beige", "crema", "arena", "hueso", "nude"]),
    group("marron", &["marron", "marrones", "cafe", "chocolate", "camel", "brown"]),
    group("violeta", &["violeta", "violetas", "lila", "morado", "morada", "purple"]),
];

pub const SIZES: &[SynonymGroup] = &[
    group("xs", &["xs", "extra small", "extra chico"]),
    group("s", &["s", "small", "chico"]),
    group("m", &["m", "medium", "mediano", "mediana"]),
    group("l", &["l", "large", "grande"]),
    group("xl", &["xl", "extra large", "extra grande"]),
    group("xxl", &["xxl", "2xl"]),
];

/// Which table a matched group came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    Category,
    Color,
    Size,
}

impl TermKind {
    pub fn table(self) -> &'static [SynonymGroup] {
        match self {
            TermKind::Category => CATEGORIES,
            TermKind::Color => COLORS,
            TermKind::Size => SIZES,
        }
    }
}

/// Looks up a group by canonical term.
pub fn find_group(kind: TermKind, canonical: &str) -> Option<&'static SynonymGroup> {
    kind.table().iter().find(|g| g.canonical == canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_is_listed_among_its_synonyms() {
        for kind in [TermKind::Category, TermKind::Color, TermKind::Size] {
            for g in kind.table() {
                assert!(g.synonyms.contains(&g.canonical), "{}", g.canonical);
            }
        }
    }

    #[test]
    fn entries_are_folded() {
        for kind in [TermKind::Category, TermKind::Color, TermKind::Size] {
            for g in kind.table() {
                for s in g.synonyms {
                    assert_eq!(crate::text::fold(s), *s);
                }
            }
        }
    }
}
