//! 数据模型模块

pub mod curve;
pub mod join;
pub mod report;
pub mod target;
pub mod time;
pub mod window;

pub use curve::{AdoptionCurve, CurveDataset, TimelinePoint};
pub use join::{DetectionSource, Hit, ManualEntry, ResolvedJoin};
pub use report::{AnalysisReport, CompositeScore, PercentileResult, PlatformReport, SeriesPoint};
pub use target::{Target, TargetRegistry};
pub use window::SearchWindow;
