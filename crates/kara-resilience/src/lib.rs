// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for calls to the LLM provider.
//!
//! [`RateLimiter`] combines a sliding-window throttle with a circuit
//! breaker. It is an explicit object owned by whoever drives the calls, so
//! every worker (and every test) gets an independent instance.

pub mod limiter;

pub use limiter::{LimiterSettings, LimiterSnapshot, RateLimiter, SlotDecision};
