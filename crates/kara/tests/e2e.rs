// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete Kara pipeline.
//!
//! Harness tests wire a temp SQLite database, the sample catalog and mock
//! mail/provider adapters. The CLI tests run the compiled binary against a
//! throwaway config file and never touch the network.

use std::path::Path;
use std::process::Command;

use kara_core::{ProviderError, TaskStatus};
use kara_test_utils::TestHarness;

// ---- Customer journey ----

#[tokio::test]
async fn email_then_chat_share_history_and_preferences() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            "Tenemos la Remera Negra Oversize en M y L.".to_string(),
            "La M cuesta $18000.".to_string(),
        ])
        .build()
        .await
        .unwrap();

    harness.deliver(
        "1",
        "lucia@example.com",
        "Remeras",
        "Hola! Busco una remera negra talle M",
    );
    assert_eq!(harness.run_once().await.unwrap().answered(), 1);

    // The same address keeps talking through chat.
    let reply = harness
        .chat
        .ask("lucia@example.com", "Y cuanto sale la M?")
        .await
        .unwrap();
    assert_eq!(reply.text, "La M cuesta $18000.");

    let request = harness.provider.last_request().unwrap();
    let system = &request.messages[0].content;
    assert!(system.contains("Preferencias del cliente"));
    assert!(system.contains("RECOMENDACIONES PERSONALIZADAS"));
    assert!(
        request
            .messages
            .iter()
            .any(|m| m.content == "Tenemos la Remera Negra Oversize en M y L.")
    );

    let turns = harness
        .storage
        .recent_turns("lucia@example.com", 10)
        .await
        .unwrap();
    assert_eq!(turns.len(), 2);
}

#[tokio::test]
async fn mixed_batch_is_processed_in_order() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.provider.push_response("Sí, el buzo gris está disponible.");
    harness.provider.push_error(ProviderError::Unavailable {
        status: Some(503),
        message: "overloaded".into(),
    });

    harness.deliver("10", "a@example.com", "Buzo", "Tienen el buzo gris?");
    harness.deliver("11", "b@example.com", "Campera", "Busco campera azul");
    harness.deliver("12", "c@example.com", "Pago", "Aceptan mercado pago?");

    let report = harness.run_once().await.unwrap();
    let uids: Vec<&str> = report.outcomes.iter().map(|(uid, _)| uid.as_str()).collect();
    assert_eq!(uids, vec!["10", "11", "12"]);
    assert_eq!(report.answered(), 2);
    assert_eq!(report.released(), 1);

    // Only the model-backed messages reached the provider.
    assert_eq!(harness.provider.call_count(), 2);
    assert_eq!(
        harness.task("11").await.unwrap().unwrap().status,
        TaskStatus::Pending
    );
    assert!(!harness.mailbox.is_seen("11"));
    assert_eq!(harness.mailbox.unseen_count(), 1);
}

#[tokio::test]
async fn operator_recovers_a_dead_letter() {
    let harness = TestHarness::builder()
        .with_max_attempts(1)
        .build()
        .await
        .unwrap();
    harness.provider.push_error(ProviderError::Api {
        status: 400,
        message: "context length exceeded".into(),
    });
    harness.deliver("20", "d@example.com", "Pantalón", "Busco pantalon cargo 40");

    harness.run_once().await.unwrap();
    let dead = harness
        .storage
        .list_tasks(Some(TaskStatus::DeadLetter), 10)
        .await
        .unwrap();
    assert_eq!(dead.len(), 1);

    harness.worker.reprocess(dead[0].id).await.unwrap();
    let task = harness.task("20").await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert!(harness.mailbox.is_seen("20"));
}

// ---- CLI ----

fn write_config(dir: &Path) -> std::path::PathBuf {
    let config = dir.join("kara.toml");
    let db = dir.join("kara.db");
    std::fs::write(
        &config,
        format!(
            "[agent]\nlog_level = \"error\"\n\n[storage]\ndatabase_path = {:?}\n",
            db.to_string_lossy()
        ),
    )
    .unwrap();
    config
}

fn kara(config: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_kara"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn cli_imports_catalog_and_searches_it() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    let catalog = dir.path().join("catalog.json");
    std::fs::write(
        &catalog,
        r#"[
            {"name": "Remera Negra Oversize", "price": 18000, "category": "Remeras",
             "color": "negro", "variants": [{"size": "M", "color": "negro", "stock": 7}]},
            {"name": "Buzo Gris Canguro", "price": 32000, "category": "Buzos",
             "color": "gris", "variants": [{"size": "L", "color": "gris", "stock": 2}]}
        ]"#,
    )
    .unwrap();

    let import = kara(&config, &["catalog", "import", catalog.to_str().unwrap()]);
    assert!(import.status.success(), "{import:?}");

    let search = kara(&config, &["search", "remera negra", "--json"]);
    assert!(search.status.success(), "{search:?}");
    let ranked: serde_json::Value = serde_json::from_slice(&search.stdout).unwrap();
    assert_eq!(
        ranked["results"][0]["product"]["name"],
        "Remera Negra Oversize"
    );
}

#[test]
fn cli_classifies_intent_without_storage() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let out = kara(&config, &["intent", "cuanto cuesta el buzo?", "--json"]);
    assert!(out.status.success(), "{out:?}");
    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["primary_intent"], "price_inquiry");
}

#[test]
fn cli_rejects_unknown_config_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("kara.toml");
    std::fs::write(&config, "[worker]\nmax_atempts = 3\n").unwrap();

    let out = kara(&config, &["intent", "hola"]);
    assert_eq!(out.status.code(), Some(2));
}
