//! 字段路径与原位变更
//!
//! 编辑器对报告的每次修改都表达为「路径 + 新值」。路径是带类型的
//! 段序列（字段名 / 数组索引），逐段沿现有结构解析；任何解析不到
//! 的段都是前置条件违约，显式报错，绝不静默跳过、绝不自动扩容。
//! 变更产生新的报告快照，旧快照由调用方丢弃（last-write-wins）。

use serde_json::Value as JsonValue;

use crate::error::{AppResult, PathError};
use crate::models::report::AuditReport;

/// 路径段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// 对象字段名（与报告的 camelCase 线上字段名一致）
    Field(String),
    /// 数组索引（从 0 开始）
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(idx) => write!(f, "{}", idx),
        }
    }
}

/// 字段路径
///
/// 形如 `detailedReviews.part1.0.answer`：纯数字段解析为索引，
/// 其余解析为字段名。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// 从点分字符串解析路径
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.trim().is_empty() {
            return Err(PathError::EmptyPath);
        }

        let segments = raw
            .split('.')
            .map(|seg| match seg.parse::<usize>() {
                Ok(idx) => PathSegment::Index(idx),
                Err(_) => PathSegment::Field(seg.to_string()),
            })
            .collect();

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}", joined)
    }
}

/// 对报告应用一次叶子变更，返回新的报告快照
///
/// 解析从根出发逐段下行，最后一段指向的标量叶子被替换为 `value`，
/// 其余子树原样保留。回读为 `AuditReport` 保证变更后形状仍符合
/// schema（把字符串写进数值字段等类型错误会被拒绝）。
pub fn apply(report: &AuditReport, path: &FieldPath, value: JsonValue) -> AppResult<AuditReport> {
    let mut image = serde_json::to_value(report).map_err(|e| PathError::TypeMismatch {
        source: Box::new(e),
    })?;

    let leaf = resolve_mut(&mut image, path)?;
    if leaf.is_object() || leaf.is_array() {
        return Err(PathError::NotALeaf {
            path: path.to_string(),
        }
        .into());
    }
    *leaf = value;

    let updated = serde_json::from_value(image).map_err(|e| PathError::TypeMismatch {
        source: Box::new(e),
    })?;
    Ok(updated)
}

/// 沿路径解析到目标节点的可变引用
fn resolve_mut<'a>(
    root: &'a mut JsonValue,
    path: &FieldPath,
) -> Result<&'a mut JsonValue, PathError> {
    let mut current = root;

    for segment in path.segments() {
        current = match (segment, &mut *current) {
            (PathSegment::Field(name), JsonValue::Object(map)) => {
                map.get_mut(name).ok_or_else(|| PathError::UnknownField {
                    field: name.clone(),
                })?
            }
            (PathSegment::Index(idx), JsonValue::Array(items)) => {
                let len = items.len();
                items
                    .get_mut(*idx)
                    .ok_or(PathError::IndexOutOfRange { index: *idx, len })?
            }
            (segment, _) => {
                return Err(PathError::SegmentMismatch {
                    segment: segment.to_string(),
                })
            }
        };
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::report::fixtures::sample_report;
    use serde_json::json;

    #[test]
    fn test_parse_mixed_segments() {
        let path = FieldPath::parse("detailedReviews.part1.0.answer").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Field("detailedReviews".to_string()),
                PathSegment::Field("part1".to_string()),
                PathSegment::Index(0),
                PathSegment::Field("answer".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(FieldPath::parse("  "), Err(PathError::EmptyPath)));
    }

    #[test]
    fn test_apply_changes_only_target_leaf() {
        let report = sample_report();
        let path = FieldPath::parse("detailedReviews.part1.0.answer").unwrap();

        let updated = apply(&report, &path, json!("C")).unwrap();

        assert_eq!(updated.detailed_reviews.part1[0].answer, "C");
        // 其余叶子全部保持不变
        let mut restored = updated.clone();
        restored.detailed_reviews.part1[0].answer = report.detailed_reviews.part1[0].answer.clone();
        assert_eq!(restored, report);
    }

    #[test]
    fn test_apply_last_write_wins() {
        let report = sample_report();
        let path = FieldPath::parse("auditorName").unwrap();

        let first = apply(&report, &path, json!("Nguyễn Văn A")).unwrap();
        let second = apply(&first, &path, json!("Trần Thị B")).unwrap();

        assert_eq!(second.auditor_name, "Trần Thị B");
    }

    #[test]
    fn test_apply_rejects_unknown_field() {
        let report = sample_report();
        let path = FieldPath::parse("overview.nonexistent").unwrap();

        let err = apply(&report, &path, json!("x")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Path(PathError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_apply_rejects_out_of_range_index() {
        let report = sample_report();
        let path = FieldPath::parse("detailedReviews.part1.5.answer").unwrap();

        let err = apply(&report, &path, json!("x")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Path(PathError::IndexOutOfRange { index: 5, len: 1 })
        ));
    }

    #[test]
    fn test_apply_rejects_non_leaf_target() {
        let report = sample_report();
        let path = FieldPath::parse("overview").unwrap();

        let err = apply(&report, &path, json!("x")).unwrap_err();
        assert!(matches!(err, AppError::Path(PathError::NotALeaf { .. })));
    }

    #[test]
    fn test_apply_rejects_type_mismatch() {
        let report = sample_report();
        let path = FieldPath::parse("totalQuestions").unwrap();

        let err = apply(&report, &path, json!("không phải số")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Path(PathError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_apply_rejects_index_on_object() {
        let report = sample_report();
        let path = FieldPath::parse("overview.0").unwrap();

        let err = apply(&report, &path, json!("x")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Path(PathError::SegmentMismatch { .. })
        ));
    }
}
