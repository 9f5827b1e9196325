// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to the product catalog, plus a bulk import used for seeding.

use std::collections::HashMap;

use kara_core::{KaraError, Product, Variant};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// All products in id order, each with its category name and variants.
pub async fn list_products(db: &Database) -> Result<Vec<Product>, KaraError> {
    db.connection()
        .call(|conn| -> Result<Vec<Product>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name, p.description, p.price, p.material, p.size, p.color, c.name
                 FROM products p
                 LEFT JOIN categories c ON c.id = p.category_id
                 ORDER BY p.id ASC",
            )?;
            let mut products = stmt
                .query_map([], |row| {
                    Ok(Product {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        price: row.get(3)?,
                        material: row.get(4)?,
                        size: row.get(5)?,
                        color: row.get(6)?,
                        category: row.get(7)?,
                        variants: Vec::new(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let index: HashMap<i64, usize> = products
                .iter()
                .enumerate()
                .map(|(i, p)| (p.id, i))
                .collect();

            let mut stmt = conn.prepare(
                "SELECT product_id, size, color, stock_quantity
                 FROM product_variants
                 ORDER BY product_id ASC, id ASC",
            )?;
            let variants = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    Variant {
                        size: row.get(1)?,
                        color: row.get(2)?,
                        stock: row.get(3)?,
                    },
                ))
            })?;
            for variant in variants {
                let (product_id, variant) = variant?;
                if let Some(&i) = index.get(&product_id) {
                    products[i].variants.push(variant);
                }
            }
            Ok(products)
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts products with their categories and variants in one transaction.
///
/// A non-zero `id` is kept; zero lets SQLite assign one.
pub async fn import_products(db: &Database, products: &[Product]) -> Result<usize, KaraError> {
    let products = products.to_vec();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let tx = conn.transaction()?;
            for product in &products {
                let category_id: Option<i64> = match &product.category {
                    Some(name) => {
                        tx.execute(
                            "INSERT INTO categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                            params![name],
                        )?;
                        Some(tx.query_row(
                            "SELECT id FROM categories WHERE name = ?1",
                            params![name],
                            |row| row.get(0),
                        )?)
                    }
                    None => None,
                };

                let product_id: i64 = tx.query_row(
                    "INSERT INTO products
                        (id, name, description, price, material, size, color, category_id)
                     VALUES (NULLIF(?1, 0), ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     RETURNING id",
                    params![
                        product.id,
                        product.name,
                        product.description,
                        product.price,
                        product.material,
                        product.size,
                        product.color,
                        category_id
                    ],
                    |row| row.get(0),
                )?;

                for variant in &product.variants {
                    tx.execute(
                        "INSERT INTO product_variants (product_id, size, color, stock_quantity)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![product_id, variant.size, variant.color, variant.stock],
                    )?;
                }
            }
            tx.commit()?;
            Ok(products.len())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn product(name: &str, category: &str, stock: &[i64]) -> Product {
        Product {
            id: 0,
            name: name.to_string(),
            description: Some(format!("{name} de algodón")),
            price: 12000.0,
            material: Some("algodón".to_string()),
            size: None,
            color: Some("negro".to_string()),
            category: Some(category.to_string()),
            variants: stock
                .iter()
                .map(|&s| Variant {
                    size: "M".to_string(),
                    color: "negro".to_string(),
                    stock: s,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn import_then_list_preserves_variants_and_order() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db").to_str().unwrap(), true)
            .await
            .unwrap();

        let count = import_products(
            &db,
            &[
                product("Remera básica", "Remeras", &[3, 4]),
                product("Buzo oversize", "Buzos", &[]),
                product("Remera estampada", "Remeras", &[0]),
            ],
        )
        .await
        .unwrap();
        assert_eq!(count, 3);

        let products = list_products(&db).await.unwrap();
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Remera básica", "Buzo oversize", "Remera estampada"]);
        assert_eq!(products[0].total_stock(), 7);
        assert!(products[1].variants.is_empty());
        assert_eq!(products[2].category.as_deref(), Some("Remeras"));
        assert!(!products[2].is_available());
    }
}
