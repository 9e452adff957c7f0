pub mod content;
pub mod path;
pub mod report;

pub use content::{ExtractedContent, FileSlot, UploadedFile};
pub use path::{apply, FieldPath, PathSegment};
pub use report::{
    AuditReport, DetailedReviews, LevelStat, Overview, ReportWarning, ReviewItem, Severity, Stats,
};
