pub mod events;
pub mod types;

pub use events::SessionEvent;
pub use types::{
    AnalysisContext, AnalysisResult, AnalysisSummary, AnomalyRecord, CategoryStats, ChatMessage,
    MonthlyStat, Role, SessionPhase, SessionSnapshot, Severity, SpreadsheetKind, Thresholds,
    UploadCandidate,
};
