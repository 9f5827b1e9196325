// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use kara_test_utils::TestHarness;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn failed_run_is_retried_until_it_succeeds() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.deliver("201", "ana@example.com", "Consulta", "Busco remera");
    harness.mailbox.fail_next_connects(2);

    let report = harness
        .scheduler()
        .run_with_retry(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.answered(), 1);
    assert_eq!(harness.mailbox.connect_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn retries_are_bounded() {
    let harness = TestHarness::builder()
        .with_config(|c| c.worker.run_max_retries = 2)
        .build()
        .await
        .unwrap();
    harness.mailbox.fail_next_connects(10);

    let result = harness
        .scheduler()
        .run_with_retry(&CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(harness.mailbox.connect_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancelled_scheduler_stops_without_polling() {
    let harness = TestHarness::builder().build().await.unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    harness.scheduler().run(cancel).await;
    assert_eq!(harness.mailbox.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn scheduler_polls_until_cancelled() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.deliver("202", "ana@example.com", "Consulta", "Busco buzo");

    let cancel = CancellationToken::new();
    let scheduler = harness.scheduler();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(harness.mailer.sent().len(), 1);
    assert!(harness.mailbox.is_seen("202"));
}
