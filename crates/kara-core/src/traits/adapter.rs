// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all backends implement.

use async_trait::async_trait;

use crate::error::KaraError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, lifecycle and health reporting shared by every adapter.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Reports the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, KaraError>;

    /// Releases any held resources.
    async fn shutdown(&self) -> Result<(), KaraError>;
}
