//! 分析服务
//!
//! Runs one analysis request end to end: concurrent mailbox scans per target,
//! the optional profile lookup, reconciliation with manual dates, percentile
//! ranking and composite scores.

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::curve::CurveDataset;
use crate::models::join::{Hit, ManualEntry};
use crate::models::report::{AnalysisReport, PlatformReport};
use crate::models::target::{Target, TargetRegistry};
use crate::models::time::ms_to_datestr;
use crate::observability::AppMetrics;
use crate::services::locator::{BisectionLocator, LocatorConfig};
use crate::services::percentile::{composite_for, percentile_result};
use crate::services::profile_lookup::ProfileLookup;
use crate::services::reconcile::ReconciliationPolicy;
use crate::services::scanner::TierScanner;
use crate::storage::MessageStore;

/// Target whose detection also accepts the public profile creation time.
const PROFILE_TARGET: &str = "twitter";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Targets to analyse; every registered target when `None`.
    pub targets: Option<Vec<String>>,
    pub manual: Vec<ManualEntry>,
    pub profile_handle: Option<String>,
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// `store` is `None` when the caller has no mailbox access; only manual
    /// and profile signals are used then.
    async fn analyze(
        &self,
        store: Option<Arc<dyn MessageStore>>,
        request: AnalysisRequest,
    ) -> Result<AnalysisReport>;
}

pub struct AnalysisServiceImpl {
    registry: Arc<TargetRegistry>,
    curves: Arc<CurveDataset>,
    scanner: TierScanner,
    policy: ReconciliationPolicy,
    profile_lookup: Option<Arc<dyn ProfileLookup>>,
    budget: Duration,
    max_concurrent_scans: usize,
    metrics: Arc<AppMetrics>,
}

impl AnalysisServiceImpl {
    pub fn new(
        registry: Arc<TargetRegistry>,
        curves: Arc<CurveDataset>,
        scanner: TierScanner,
        policy: ReconciliationPolicy,
        budget: Duration,
        max_concurrent_scans: usize,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            registry,
            curves,
            scanner,
            policy,
            profile_lookup: None,
            budget,
            max_concurrent_scans: max_concurrent_scans.max(1),
            metrics,
        }
    }

    pub fn with_profile_lookup(mut self, lookup: Arc<dyn ProfileLookup>) -> Self {
        self.profile_lookup = Some(lookup);
        self
    }

    fn selected_targets(&self, request: &AnalysisRequest) -> Result<Vec<Arc<Target>>> {
        let targets = match &request.targets {
            Some(keys) => {
                // Repeated keys collapse to their first occurrence.
                let mut seen = HashSet::with_capacity(keys.len());
                keys.iter()
                    .filter(|key| seen.insert(key.as_str()))
                    .map(|key| {
                        self.registry.get(key).ok_or_else(|| {
                            AppError::Validation(format!("unknown target: {}", key))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            None => self.registry.iter().cloned().collect(),
        };

        if let Some(entry) = request
            .manual
            .iter()
            .find(|m| !self.registry.contains(&m.target_key))
        {
            return Err(AppError::Validation(format!(
                "manual date for unknown target: {}",
                entry.target_key
            )));
        }
        Ok(targets)
    }

    /// Mailbox hits by target key. Only an authentication failure is an error;
    /// anything else drops that target's mailbox signal.
    async fn scan_all(
        &self,
        store: Arc<dyn MessageStore>,
        targets: &[Arc<Target>],
    ) -> Result<HashMap<String, Hit>> {
        let permits = Arc::new(Semaphore::new(self.max_concurrent_scans));

        let scans = targets.iter().map(|target| {
            let store = store.clone();
            let permits = permits.clone();
            async move {
                let _permit = permits
                    .acquire()
                    .await
                    .map_err(|e| AppError::Internal(format!("scan limiter closed: {}", e)))?;
                let hit = self.scanner.scan(store.as_ref(), target, self.budget).await;
                Ok::<_, AppError>((target.key.clone(), hit))
            }
        });

        let mut hits = HashMap::new();
        for outcome in join_all(scans).await {
            let (key, result) = outcome?;
            match result {
                Ok(hit) => {
                    self.metrics.record_scan(hit.is_some());
                    if let Some(hit) = hit {
                        hits.insert(key, hit);
                    }
                }
                Err(e) if e.is_authentication() => return Err(e),
                Err(e) => {
                    self.metrics.record_scan(false);
                    warn!(target_key = %key, error = %e, "Mailbox scan failed, ignoring target signal");
                }
            }
        }
        Ok(hits)
    }

    async fn profile_hit(&self, request: &AnalysisRequest, targets: &[Arc<Target>]) -> Option<Hit> {
        let lookup = self.profile_lookup.as_ref()?;
        let handle = request.profile_handle.as_deref()?;
        if !targets.iter().any(|t| t.key == PROFILE_TARGET) {
            return None;
        }
        lookup.created_at(handle).await.map(Hit::profile)
    }
}

#[async_trait]
impl AnalysisService for AnalysisServiceImpl {
    async fn analyze(
        &self,
        store: Option<Arc<dyn MessageStore>>,
        request: AnalysisRequest,
    ) -> Result<AnalysisReport> {
        let started = Instant::now();
        let analysis_id = Uuid::new_v4();
        let targets = self.selected_targets(&request)?;

        let scans = async {
            match store {
                Some(store) => self.scan_all(store, &targets).await,
                None => Ok(HashMap::new()),
            }
        };
        let (mailbox_hits, profile_hit) =
            tokio::join!(scans, self.profile_hit(&request, &targets));

        let mut mailbox_hits = match mailbox_hits {
            Ok(hits) => hits,
            Err(e) => {
                if e.is_authentication() {
                    self.metrics.record_auth_failure();
                }
                warn!(%analysis_id, error = %e, "Analysis aborted");
                return Err(e);
            }
        };

        let mut platforms = Vec::with_capacity(targets.len());
        for target in &targets {
            let mut detected = mailbox_hits.remove(&target.key);
            if target.key == PROFILE_TARGET {
                detected = Hit::earliest(detected, profile_hit);
            }
            let manual = request.manual.iter().find(|m| m.target_key == target.key);
            let curve = self.curves.curve_or_default(&target.key, target.window_floor);

            let Some(joined) =
                self.policy
                    .resolve(&target.key, manual, detected.as_ref(), curve.launch_ms())
            else {
                debug!(%analysis_id, target_key = %target.key, "No join signal, omitting target");
                self.metrics.record_omitted_target();
                continue;
            };

            let percentile = percentile_result(&target.key, &curve, joined.timestamp_ms);
            platforms.push(PlatformReport {
                target_key: target.key.clone(),
                display_name: target.display_name.clone(),
                metric_label: target.metric_label.clone(),
                joined_date: ms_to_datestr(joined.timestamp_ms),
                joined,
                percentile,
            });
        }

        let composite = composite_for(
            platforms
                .iter()
                .filter_map(|p| p.percentile.as_ref().map(|r| (&p.joined, r))),
        );

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.metrics.record_analysis(elapsed_ms);
        info!(
            %analysis_id,
            platforms = platforms.len(),
            overall = ?composite.overall,
            verified_only = ?composite.verified_only,
            elapsed_ms,
            "Analysis complete"
        );

        Ok(AnalysisReport {
            analysis_id,
            platforms,
            composite,
            elapsed_ms,
        })
    }
}

/// 根据配置创建分析服务
pub fn create_analysis_service(
    config: &AppConfig,
    registry: Arc<TargetRegistry>,
    curves: Arc<CurveDataset>,
    profile_lookup: Option<Arc<dyn ProfileLookup>>,
    metrics: Arc<AppMetrics>,
) -> Box<dyn AnalysisService> {
    let scanner = TierScanner::new(BisectionLocator::new(LocatorConfig::from(&config.search)));
    let service = AnalysisServiceImpl::new(
        registry,
        curves,
        scanner,
        ReconciliationPolicy::from(&config.reconciliation),
        config.search.budget(),
        config.search.max_concurrent_scans,
        metrics,
    );

    match profile_lookup {
        Some(lookup) => Box::new(service.with_profile_lookup(lookup)),
        None => Box::new(service),
    }
}
