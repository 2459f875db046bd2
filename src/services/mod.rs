//! 服务模块

pub mod adoption;
pub mod analysis;
pub mod locator;
pub mod percentile;
pub mod profile_lookup;
pub mod reconcile;
pub mod scanner;

pub use adoption::{timeline_series, users_at, users_today};
pub use analysis::{AnalysisRequest, AnalysisService, AnalysisServiceImpl, create_analysis_service};
pub use locator::{BisectionLocator, LocatorConfig, QueryProbe, RangeProbe};
pub use percentile::{composite_for, composite_score, early_percentile, narrative_percent, percentile_result};
pub use profile_lookup::{ProfileLookup, XProfileClient};
pub use reconcile::ReconciliationPolicy;
pub use scanner::TierScanner;
