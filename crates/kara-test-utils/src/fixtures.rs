// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sample catalog and message builders.

use kara_core::{InboundEmail, Product, Variant};

fn variant(size: &str, color: &str, stock: i64) -> Variant {
    Variant {
        size: size.into(),
        color: color.into(),
        stock,
    }
}

#[allow(clippy::too_many_arguments)]
fn product(
    name: &str,
    description: &str,
    price: f64,
    material: &str,
    color: &str,
    category: &str,
    variants: Vec<Variant>,
) -> Product {
    Product {
        id: 0,
        name: name.into(),
        description: Some(description.into()),
        price,
        material: Some(material.into()),
        size: None,
        color: Some(color.into()),
        category: Some(category.into()),
        variants,
    }
}

/// A small clothing catalog; ids are assigned on import in this order.
pub fn sample_catalog() -> Vec<Product> {
    vec![
        product(
            "Remera Negra Básica",
            "Remera de algodón peinado, corte recto",
            15000.0,
            "algodón",
            "negro",
            "Remeras",
            vec![variant("S", "negro", 0), variant("M", "negro", 0)],
        ),
        product(
            "Remera Negra Oversize",
            "Remera oversize de algodón pesado",
            18000.0,
            "algodón",
            "negro",
            "Remeras",
            vec![variant("M", "negro", 7), variant("L", "negro", 5)],
        ),
        product(
            "Buzo Gris Canguro",
            "Buzo con capucha y bolsillo canguro",
            32000.0,
            "frisa",
            "gris",
            "Buzos",
            vec![variant("M", "gris", 3), variant("XL", "gris", 2)],
        ),
        product(
            "Pantalón Cargo Beige",
            "Pantalón cargo de gabardina con bolsillos laterales",
            38000.0,
            "gabardina",
            "beige",
            "Pantalones",
            vec![variant("40", "beige", 4)],
        ),
        product(
            "Campera Azul Rompevientos",
            "Campera liviana impermeable",
            54000.0,
            "nylon",
            "azul",
            "Camperas",
            vec![variant("L", "azul", 1)],
        ),
    ]
}

/// An unseen message with a plain-text body.
pub fn inbound(uid: &str, sender: &str, subject: &str, body: &str) -> InboundEmail {
    InboundEmail {
        uid: uid.into(),
        sender: sender.into(),
        subject: subject.into(),
        body: Some(body.into()),
    }
}
