// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands.
//!
//! Commands print plain text by default and pretty JSON with `--json`.
//! Colors are applied only when printing; the formatting helpers return
//! plain strings.

use std::path::Path;
use std::str::FromStr;

use colored::{ColoredString, Colorize};
use kara_agent::ReprocessOutcome;
use kara_catalog::{
    IntentResult, classify_intent, fallback_sample, infer_preferences, recommend, search,
};
use kara_config::model::KaraConfig;
use kara_core::{EmailTask, KaraError, Product, TaskStatus};
use serde::Serialize;
use tracing::info;

use crate::wiring;

/// Parses a `--status` value.
pub fn parse_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::from_str(value).map_err(|_| {
        "expected one of: pending, processing, reprocessing, done, failed, dead_letter".to_string()
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), KaraError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| KaraError::Internal(format!("failed to render JSON: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn colored_status(status: TaskStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        TaskStatus::Done => label.green(),
        TaskStatus::Pending => label.yellow(),
        TaskStatus::Processing | TaskStatus::Reprocessing => label.cyan(),
        TaskStatus::Failed | TaskStatus::DeadLetter => label.red(),
    }
}

fn task_line(task: &EmailTask) -> String {
    format!(
        "#{:<5} {:<24} {}/{}  {}  \"{}\"",
        task.id,
        task.sender_email,
        task.attempts,
        task.max_attempts,
        task.created_at,
        task.subject
    )
}

fn product_line(product: &Product) -> String {
    let stock = product.total_stock();
    format!(
        "[{}] {} | {} | ${:.2} | {}",
        product.id,
        product.name,
        product.category.as_deref().unwrap_or("N/A"),
        product.price,
        if stock > 0 {
            format!("stock {stock}")
        } else {
            "sin stock".to_string()
        }
    )
}

fn intent_lines(result: &IntentResult) -> Vec<String> {
    let mut lines = vec![format!(
        "{} (confidence {:.2})",
        result.primary_intent, result.confidence
    )];
    lines.extend(
        result
            .scores_by_intent
            .iter()
            .filter(|(_, score)| *score > 0)
            .map(|(intent, score)| format!("  {intent}: {score}")),
    );
    let patterns = &result.detected_patterns;
    let flags: Vec<&str> = [
        ("specific_product", patterns.specific_product),
        ("color", patterns.color_mentioned),
        ("size", patterns.size_mentioned),
        ("price", patterns.price_mentioned),
    ]
    .into_iter()
    .filter_map(|(name, on)| on.then_some(name))
    .collect();
    if !flags.is_empty() {
        lines.push(format!("  patterns: {}", flags.join(", ")));
    }
    lines
}

/// `kara tasks`
pub async fn run_tasks(
    config: &KaraConfig,
    status: Option<TaskStatus>,
    limit: usize,
    json: bool,
) -> Result<(), KaraError> {
    let storage = wiring::open_storage(config).await?;
    let tasks = storage.list_tasks(status, limit).await?;
    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("{}", "no tasks".dimmed());
    }
    for task in &tasks {
        println!("{:<13} {}", colored_status(task.status), task_line(task));
        if let Some(error) = &task.error_message {
            println!("              {}", error.dimmed());
        }
    }
    Ok(())
}

/// `kara reprocess <task-id>`
pub async fn run_reprocess(config: &KaraConfig, task_id: i64) -> Result<(), KaraError> {
    let intake = wiring::intake(config).await?;
    let outcome = intake.worker.reprocess(task_id).await?;
    intake.storage.close().await?;
    match outcome {
        ReprocessOutcome::Answered { task_id } => {
            println!("{} task #{task_id} answered", "ok".green());
            Ok(())
        }
        ReprocessOutcome::Failed { task_id, error } => Err(KaraError::Internal(format!(
            "task #{task_id} marked failed: {error}"
        ))),
    }
}

/// `kara search <query>`
pub async fn run_search(
    config: &KaraConfig,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<(), KaraError> {
    let storage = wiring::open_storage(config).await?;
    let catalog = storage.list_products().await?;
    let ranked = search(&catalog, query, limit);
    if json {
        return print_json(&ranked);
    }
    if ranked.is_empty() {
        println!("{}", "no matches, showing a catalog sample".dimmed());
        for product in fallback_sample(&catalog, limit) {
            println!("{:>4}  {}", "-", product_line(product));
        }
        return Ok(());
    }
    for scored in &ranked.results {
        println!("{:>4}  {}", scored.score, product_line(&scored.product));
    }
    Ok(())
}

/// `kara intent <query>`
pub fn run_intent(query: &str, json: bool) -> Result<(), KaraError> {
    let result = classify_intent(query);
    if json {
        return print_json(&result);
    }
    for line in intent_lines(&result) {
        println!("{line}");
    }
    Ok(())
}

/// `kara preferences <session>`
pub async fn run_preferences(
    config: &KaraConfig,
    session: &str,
    json: bool,
) -> Result<(), KaraError> {
    let storage = wiring::open_storage(config).await?;
    let turns = storage
        .recent_turns(session, config.worker.preference_turns)
        .await?;
    let prefs = infer_preferences(&turns);
    if json {
        return print_json(&prefs);
    }
    match prefs.summary() {
        Some(summary) => println!("{summary}"),
        None => println!("{}", "no preferences recorded".dimmed()),
    }
    Ok(())
}

/// `kara recommend <session>`
pub async fn run_recommend(
    config: &KaraConfig,
    session: &str,
    limit: usize,
    json: bool,
) -> Result<(), KaraError> {
    let storage = wiring::open_storage(config).await?;
    let turns = storage
        .recent_turns(session, config.worker.preference_turns)
        .await?;
    let prefs = infer_preferences(&turns);
    let catalog = storage.list_products().await?;
    let products = recommend(&catalog, &prefs, limit);
    if json {
        return print_json(&products);
    }
    if products.is_empty() {
        println!("{}", "no recommendations".dimmed());
    }
    for product in &products {
        println!("{}", product_line(product));
    }
    Ok(())
}

/// Parses a catalog file: a JSON array of products.
fn parse_catalog(content: &str) -> Result<Vec<Product>, KaraError> {
    serde_json::from_str(content)
        .map_err(|e| KaraError::Config(format!("invalid catalog file: {e}")))
}

/// `kara catalog import <file>`
pub async fn run_catalog_import(config: &KaraConfig, file: &Path) -> Result<(), KaraError> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| KaraError::Config(format!("cannot read {}: {e}", file.display())))?;
    let products = parse_catalog(&content)?;
    let storage = wiring::open_storage(config).await?;
    let imported = storage.import_products(&products).await?;
    storage.close().await?;
    info!(imported, file = %file.display(), "catalog imported");
    println!("{} {imported} products imported", "ok".green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kara_core::Variant;

    fn product(stock: i64) -> Product {
        Product {
            id: 7,
            name: "Buzo Gris".into(),
            description: None,
            price: 32000.0,
            material: None,
            size: None,
            color: Some("gris".into()),
            category: Some("Buzos".into()),
            variants: vec![Variant {
                size: "M".into(),
                color: "gris".into(),
                stock,
            }],
        }
    }

    #[test]
    fn status_values_parse() {
        assert_eq!(parse_status("pending"), Ok(TaskStatus::Pending));
        assert_eq!(parse_status("dead_letter"), Ok(TaskStatus::DeadLetter));
        assert!(parse_status("dead-letter").is_err());
    }

    #[test]
    fn product_line_shows_stock_state() {
        assert_eq!(
            product_line(&product(3)),
            "[7] Buzo Gris | Buzos | $32000.00 | stock 3"
        );
        assert!(product_line(&product(0)).ends_with("sin stock"));
    }

    #[test]
    fn intent_lines_list_matching_buckets() {
        let lines = intent_lines(&classify_intent("hola, tienen remera negra talle M?"));
        assert!(lines[0].contains("confidence"));
        assert!(lines.iter().any(|l| l.starts_with("  patterns:")));
    }

    #[test]
    fn catalog_file_with_defaults() {
        let products = parse_catalog(
            r#"[{"name": "Remera Blanca", "price": 12000, "category": "Remeras",
                 "variants": [{"size": "S", "color": "blanco", "stock": 4}]}]"#,
        )
        .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, 0);
        assert_eq!(products[0].total_stock(), 4);
    }

    #[test]
    fn malformed_catalog_is_a_config_error() {
        assert!(matches!(
            parse_catalog("{\"name\": 1}"),
            Err(KaraError::Config(_))
        ));
    }
}
