// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Kara metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "kara_messages_total",
        "Inbound messages handled, by outcome"
    );
    describe_counter!("kara_llm_calls_total", "Chat-completion calls, by result");
    describe_counter!("kara_faq_hits_total", "Replies answered from the FAQ table");
    describe_counter!("kara_tokens_total", "Tokens consumed by the chat provider");
    describe_gauge!(
        "kara_circuit_open",
        "1 while the provider circuit breaker is open"
    );
    describe_histogram!(
        "kara_llm_latency_seconds",
        "Chat-completion latency in seconds"
    );
}

/// Record the outcome of one inbound message (`done`, `retry`, `dead_letter`, `skipped`, ...).
pub fn record_message(outcome: &str) {
    metrics::counter!("kara_messages_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record one chat-completion call (`ok`, `rate_limited`, `unavailable`, `error`).
pub fn record_llm_call(result: &str) {
    metrics::counter!("kara_llm_calls_total", "result" => result.to_string()).increment(1);
}

pub fn record_faq_hit(topic: &str) {
    metrics::counter!("kara_faq_hits_total", "topic" => topic.to_string()).increment(1);
}

/// Record token consumption.
pub fn record_tokens(model: &str, input: u32, output: u32) {
    metrics::counter!("kara_tokens_total", "model" => model.to_string(), "type" => "input")
        .increment(input as u64);
    metrics::counter!("kara_tokens_total", "model" => model.to_string(), "type" => "output")
        .increment(output as u64);
}

pub fn set_circuit_open(open: bool) {
    metrics::gauge!("kara_circuit_open").set(if open { 1.0 } else { 0.0 });
}

pub fn record_llm_latency(seconds: f64) {
    metrics::histogram!("kara_llm_latency_seconds").record(seconds);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        register_metrics();
        record_message("done");
        record_llm_call("ok");
        record_faq_hit("shipping");
        record_tokens("llama-3.1-8b-instant", 10, 5);
        set_circuit_open(true);
        record_llm_latency(0.25);
    }
}
