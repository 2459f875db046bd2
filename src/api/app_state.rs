use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::curve::CurveDataset;
use crate::models::target::TargetRegistry;
use crate::observability::AppMetrics;
use crate::security::token::{RefreshingTokenSource, StaticToken, TokenSource};
use crate::services::analysis::AnalysisService;
use crate::storage::{GmailStore, MessageStore};

/// Lifetime assumed for a caller-supplied access token that comes with a
/// refresh token; Google issues them for an hour.
const ASSUMED_ACCESS_TOKEN_MINUTES: i64 = 55;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<TargetRegistry>,
    pub curves: Arc<CurveDataset>,
    pub analysis_service: Arc<dyn AnalysisService>,
    /// Shared connection pool for mailbox calls
    pub http_client: reqwest::Client,
    pub metrics: Arc<AppMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("app_name", &self.config.app_name)
            .field("targets", &self.registry.len())
            .field("curves", &self.curves.len())
            .field("analysis_service", &"Arc<dyn AnalysisService>")
            .finish()
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        registry: TargetRegistry,
        curves: CurveDataset,
        analysis_service: Box<dyn AnalysisService>,
        http_client: reqwest::Client,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            curves: Arc::new(curves),
            analysis_service: Arc::from(analysis_service),
            http_client,
            metrics,
        }
    }

    /// Mailbox for one request, or `None` when the caller sent no
    /// credentials at all.
    pub fn mailbox_for(
        &self,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Option<Arc<dyn MessageStore>> {
        let tokens: Arc<dyn TokenSource> = match (access_token, refresh_token) {
            (None, None) => return None,
            (Some(access), None) => Arc::new(StaticToken::new(access)),
            (access, Some(refresh)) => {
                let source = RefreshingTokenSource::new(
                    self.http_client.clone(),
                    &self.config.gmail,
                    refresh,
                );
                Arc::new(match access {
                    Some(access) => source.with_access_token(
                        access,
                        Utc::now() + Duration::minutes(ASSUMED_ACCESS_TOKEN_MINUTES),
                    ),
                    None => source,
                })
            }
        };

        Some(Arc::new(GmailStore::new(
            self.http_client.clone(),
            &self.config.gmail.api_base,
            tokens,
            self.config.search.page_size,
        )))
    }
}
