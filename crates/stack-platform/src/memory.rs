//! In-memory release platform.
//!
//! Mimics the semantics the reconciler relies on: installs need an existing
//! namespace and a free name, a failed install leaves a `Failed` release
//! behind, upgrades bump the version, and uninstall of a missing release is
//! `NotFound`. Faults can be injected per operation and release name.
//!
//! [`MemoryPlatform::with_journal`] additionally records every call so tests
//! can assert what was attempted; [`MemoryPlatform::new`] keeps no history.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use stack_state::{ClusterId, Registry};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{PlatformError, PlatformResult};
use crate::platform::ReleasePlatform;
use crate::release::{InstallConfig, Release, ReleaseStatus};

/// Platform operation, used for fault injection and the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformOp {
    Get,
    Install,
    UpgradeInstall,
    Uninstall,
    CreateNamespace,
}

/// One journaled call: operation plus the release or namespace it targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCall {
    pub op: PlatformOp,
    pub target: String,
    /// Registries handed over with an install or upgrade; empty otherwise.
    pub registries: Vec<Registry>,
}

impl PlatformCall {
    pub fn is_mutation(&self) -> bool {
        self.op != PlatformOp::Get
    }
}

type ReleaseKey = (ClusterId, String, String);

#[derive(Default)]
struct Inner {
    namespaces: HashSet<(ClusterId, String)>,
    releases: HashMap<ReleaseKey, Release>,
    faults: HashMap<(PlatformOp, String), PlatformError>,
    unreachable: bool,
    journal: Option<Vec<PlatformCall>>,
}

impl Inner {
    fn record(&mut self, op: PlatformOp, target: &str) -> PlatformResult<()> {
        self.record_with(op, target, &[])
    }

    fn record_with(
        &mut self,
        op: PlatformOp,
        target: &str,
        registries: &[Registry],
    ) -> PlatformResult<()> {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(PlatformCall {
                op,
                target: target.to_string(),
                registries: registries.to_vec(),
            });
        }
        if self.unreachable {
            return Err(PlatformError::Unreachable("memory platform offline".to_string()));
        }
        match self.faults.get(&(op, target.to_string())) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn require_namespace(&self, cluster_id: ClusterId, namespace: &str) -> PlatformResult<()> {
        if self.namespaces.contains(&(cluster_id, namespace.to_string())) {
            Ok(())
        } else {
            Err(PlatformError::NotFound(format!("namespace {namespace}")))
        }
    }
}

/// Thread-safe in-memory platform. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryPlatform {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform that journals every call, for inspection via [`Self::calls`].
    pub fn with_journal() -> Self {
        let inner = Inner {
            journal: Some(Vec::new()),
            ..Inner::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Make every future `op` against `target` fail with `err`.
    pub async fn inject_fault(&self, op: PlatformOp, target: &str, err: PlatformError) {
        let mut inner = self.inner.lock().await;
        inner.faults.insert((op, target.to_string()), err);
    }

    /// Simulate losing connectivity to every cluster.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.inner.lock().await.unreachable = unreachable;
    }

    /// Seed a namespace without journaling a call.
    pub async fn seed_namespace(&self, cluster_id: ClusterId, name: &str) {
        let mut inner = self.inner.lock().await;
        inner.namespaces.insert((cluster_id, name.to_string()));
    }

    /// Seed a deployed release without journaling a call.
    pub async fn seed_release(&self, cluster_id: ClusterId, release: Release) {
        let mut inner = self.inner.lock().await;
        inner
            .namespaces
            .insert((cluster_id, release.namespace.clone()));
        let key = (cluster_id, release.namespace.clone(), release.name.clone());
        inner.releases.insert(key, release);
    }

    /// Current release state, bypassing faults and the journal.
    pub async fn release(
        &self,
        cluster_id: ClusterId,
        namespace: &str,
        name: &str,
    ) -> Option<Release> {
        let inner = self.inner.lock().await;
        inner
            .releases
            .get(&(cluster_id, namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn has_namespace(&self, cluster_id: ClusterId, name: &str) -> bool {
        let inner = self.inner.lock().await;
        inner.namespaces.contains(&(cluster_id, name.to_string()))
    }

    /// All calls made so far, in order. Always empty without a journal.
    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.inner.lock().await.journal.clone().unwrap_or_default()
    }

    /// Calls that could have changed cluster state.
    pub async fn mutations(&self) -> Vec<PlatformCall> {
        self.calls()
            .await
            .into_iter()
            .filter(PlatformCall::is_mutation)
            .collect()
    }

    pub async fn clear_calls(&self) {
        if let Some(journal) = self.inner.lock().await.journal.as_mut() {
            journal.clear();
        }
    }
}

fn new_release(config: &InstallConfig, status: ReleaseStatus) -> Release {
    Release {
        name: config.name.clone(),
        namespace: config.namespace.clone(),
        chart: config.chart.clone(),
        config: config.values.clone(),
        version: 1,
        status,
    }
}

#[async_trait]
impl ReleasePlatform for MemoryPlatform {
    async fn get_release(
        &self,
        cluster_id: ClusterId,
        namespace: &str,
        name: &str,
    ) -> PlatformResult<Release> {
        let mut inner = self.inner.lock().await;
        inner.record(PlatformOp::Get, name)?;
        inner
            .releases
            .get(&(cluster_id, namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("release {namespace}/{name}")))
    }

    async fn install_chart(&self, config: &InstallConfig) -> PlatformResult<Release> {
        let mut inner = self.inner.lock().await;
        let key = (config.cluster_id, config.namespace.clone(), config.name.clone());

        let recorded = inner.record_with(PlatformOp::Install, &config.name, &config.registries);
        if let Err(err) = recorded {
            // A rejected install still leaves a failed release behind.
            if matches!(err, PlatformError::Rejected(_)) && !inner.releases.contains_key(&key) {
                inner
                    .releases
                    .insert(key, new_release(config, ReleaseStatus::Failed));
            }
            return Err(err);
        }
        inner.require_namespace(config.cluster_id, &config.namespace)?;
        if inner.releases.contains_key(&key) {
            return Err(PlatformError::AlreadyExists(format!(
                "release {}/{}",
                config.namespace, config.name
            )));
        }

        let release = new_release(config, ReleaseStatus::Deployed);
        inner.releases.insert(key, release.clone());
        debug!(namespace = %config.namespace, release = %config.name, "release installed");
        Ok(release)
    }

    async fn upgrade_install_chart(&self, config: &InstallConfig) -> PlatformResult<Release> {
        let mut inner = self.inner.lock().await;
        inner.record_with(PlatformOp::UpgradeInstall, &config.name, &config.registries)?;
        inner.require_namespace(config.cluster_id, &config.namespace)?;

        let key = (config.cluster_id, config.namespace.clone(), config.name.clone());
        let release = match inner.releases.get(&key) {
            Some(existing) => Release {
                chart: config.chart.clone(),
                config: config.values.clone(),
                version: existing.version + 1,
                status: ReleaseStatus::Deployed,
                ..existing.clone()
            },
            None => new_release(config, ReleaseStatus::Deployed),
        };
        inner.releases.insert(key, release.clone());
        debug!(
            namespace = %config.namespace,
            release = %config.name,
            version = release.version,
            "release upgraded"
        );
        Ok(release)
    }

    async fn uninstall_chart(
        &self,
        cluster_id: ClusterId,
        namespace: &str,
        name: &str,
    ) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record(PlatformOp::Uninstall, name)?;
        inner
            .releases
            .remove(&(cluster_id, namespace.to_string(), name.to_string()))
            .map(|_| debug!(%namespace, release = %name, "release uninstalled"))
            .ok_or_else(|| PlatformError::NotFound(format!("release {namespace}/{name}")))
    }

    async fn create_namespace(&self, cluster_id: ClusterId, name: &str) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        inner.record(PlatformOp::CreateNamespace, name)?;
        if !inner.namespaces.insert((cluster_id, name.to_string())) {
            return Err(PlatformError::AlreadyExists(format!("namespace {name}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{Chart, Values};

    fn config(name: &str) -> InstallConfig {
        let mut values = Values::new();
        values.insert("replicas".to_string(), serde_json::json!(1));
        InstallConfig {
            cluster_id: 1,
            name: name.to_string(),
            namespace: "porter-stack-api".to_string(),
            chart: Chart::new("api", "0.1.0"),
            values,
            registries: Vec::new(),
        }
    }

    #[tokio::test]
    async fn install_requires_namespace() {
        let platform = MemoryPlatform::new();
        let err = platform.install_chart(&config("api")).await.unwrap_err();
        assert!(err.is_not_found());

        platform.create_namespace(1, "porter-stack-api").await.unwrap();
        let release = platform.install_chart(&config("api")).await.unwrap();
        assert_eq!(release.version, 1);
        assert_eq!(release.status, ReleaseStatus::Deployed);
    }

    #[tokio::test]
    async fn create_namespace_twice_reports_already_exists() {
        let platform = MemoryPlatform::new();
        platform.create_namespace(1, "ns").await.unwrap();
        let err = platform.create_namespace(1, "ns").await.unwrap_err();
        assert!(err.is_already_exists());
        // Namespaces are per cluster.
        platform.create_namespace(2, "ns").await.unwrap();
    }

    #[tokio::test]
    async fn install_twice_is_rejected() {
        let platform = MemoryPlatform::new();
        platform.seed_namespace(1, "porter-stack-api").await;
        platform.install_chart(&config("api")).await.unwrap();
        let err = platform.install_chart(&config("api")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn upgrade_install_bumps_version_or_installs() {
        let platform = MemoryPlatform::new();
        platform.seed_namespace(1, "porter-stack-api").await;

        let first = platform.upgrade_install_chart(&config("api")).await.unwrap();
        assert_eq!(first.version, 1);
        let second = platform.upgrade_install_chart(&config("api")).await.unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.config, first.config);
    }

    #[tokio::test]
    async fn rejected_install_leaves_failed_release() {
        let platform = MemoryPlatform::new();
        platform.seed_namespace(1, "porter-stack-api").await;
        platform
            .inject_fault(
                PlatformOp::Install,
                "api",
                PlatformError::Rejected("bad values".to_string()),
            )
            .await;

        assert!(platform.install_chart(&config("api")).await.is_err());
        let leftover = platform.release(1, "porter-stack-api", "api").await.unwrap();
        assert_eq!(leftover.status, ReleaseStatus::Failed);

        platform.uninstall_chart(1, "porter-stack-api", "api").await.unwrap();
        assert!(platform.release(1, "porter-stack-api", "api").await.is_none());
    }

    #[tokio::test]
    async fn uninstall_missing_is_not_found() {
        let platform = MemoryPlatform::new();
        let err = platform
            .uninstall_chart(1, "porter-stack-api", "api")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unreachable_fails_everything_and_journals() {
        let platform = MemoryPlatform::with_journal();
        platform.set_unreachable(true).await;
        let err = platform.get_release(1, "ns", "api").await.unwrap_err();
        assert!(matches!(err, PlatformError::Unreachable(_)));

        let calls = platform.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].op, PlatformOp::Get);
        assert!(platform.mutations().await.is_empty());
    }

    #[tokio::test]
    async fn journal_records_registries_of_installs() {
        let platform = MemoryPlatform::with_journal();
        platform.seed_namespace(1, "porter-stack-api").await;
        let registry = Registry {
            id: 1,
            project_id: 1,
            name: "ghcr".to_string(),
            url: "ghcr.io/acme".to_string(),
        };
        let mut install = config("api");
        install.registries = vec![registry.clone()];

        platform.install_chart(&install).await.unwrap();
        platform.upgrade_install_chart(&install).await.unwrap();
        platform.get_release(1, "porter-stack-api", "api").await.unwrap();

        let calls = platform.calls().await;
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].registries, vec![registry.clone()]);
        assert_eq!(calls[1].registries, vec![registry]);
        assert!(calls[2].registries.is_empty());
    }

    #[tokio::test]
    async fn default_platform_keeps_no_history() {
        let platform = MemoryPlatform::new();
        platform.seed_namespace(1, "porter-stack-api").await;
        for _ in 0..50 {
            platform.upgrade_install_chart(&config("api")).await.unwrap();
        }
        assert!(platform.calls().await.is_empty());
        let release = platform.release(1, "porter-stack-api", "api").await.unwrap();
        assert_eq!(release.version, 50);
    }
}
