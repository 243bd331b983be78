//! Tick pipeline stages
//!
//! Four stages run in order against the same store snapshot on every
//! tick: processor -> analytics -> validation -> alerts. Each stage is an
//! explicit component with its own bounded history; nothing here
//! schedules itself (the orchestrator owns the only timer).

pub mod alerts;
pub mod analytics;
pub mod processor;
pub mod validation;

pub use alerts::{Alert, AlertCounts, AlertEngine, AlertFilter, AlertKind, AlertSeverity};
pub use analytics::{
    AnalysisMetrics, AnalysisResult, AnalyticsEngine, RiskAssessment, RiskLevel, Signal,
    SignalKind,
};
pub use processor::{CompositeScore, WindowedProcessor};
pub use validation::{
    IssueKind, IssueSeverity, ValidationEngine, ValidationIssue, ValidationMetrics,
    ValidationResult,
};
