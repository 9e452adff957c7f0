//! 报告文档模型
//!
//! 分析服务返回的结构化批改报告。字段名与服务端 schema 保持
//! camelCase 一致，一次成功的组装完整构造，此后只通过字段路径
//! 变更标量叶子，结构本身不可变。

use serde::{Deserialize, Serialize};

/// 批改报告（根实体）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// 科目
    pub subject: String,
    /// 试卷代码
    pub exam_code: String,
    /// 年级
    pub grade: String,
    /// 学期
    pub semester: String,
    /// 题目总数
    pub total_questions: u32,
    /// 报告编号
    pub report_id: String,
    /// 评审人姓名
    #[serde(default)]
    pub auditor_name: String,
    /// 评审日期
    #[serde(default)]
    pub audit_date: String,
    /// 未提供矩阵、由服务合成理想分配时为 true
    #[serde(rename = "isAIGeneratedMatrix", default)]
    pub is_ai_generated_matrix: bool,
    /// 总体评价
    pub overview: Overview,
    /// 三个题型分区的逐题评审
    pub detailed_reviews: DetailedReviews,
    /// 难度层级统计（缺失时回填全零，见 RequestAssembler）
    #[serde(default)]
    pub stats: Stats,
    /// 重要发现列表
    #[serde(default)]
    pub warnings: Vec<ReportWarning>,
}

/// 总体评价
///
/// 四个子字段必填；改进建议仅在矩阵由服务合成时要求产出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    /// 科学性评价
    pub scientific: String,
    /// 教学法评价
    pub pedagogical: String,
    /// 准确性评价
    pub accuracy: String,
    /// 与矩阵的契合度
    pub matrix_alignment: String,
    /// 改进建议（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement_suggestions: Option<String>,
}

/// 三个题型分区
///
/// part1 单选 / part2 多命题判断 / part3 简答。分区归属在创建时
/// 由题型确定，编辑不会移动条目。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedReviews {
    #[serde(default)]
    pub part1: Vec<ReviewItem>,
    #[serde(default)]
    pub part2: Vec<ReviewItem>,
    #[serde(default)]
    pub part3: Vec<ReviewItem>,
}

impl DetailedReviews {
    /// 按分区名遍历（固定顺序 part1 → part2 → part3）
    pub fn parts(&self) -> [(&'static str, &Vec<ReviewItem>); 3] {
        [
            ("part1", &self.part1),
            ("part2", &self.part2),
            ("part3", &self.part3),
        ]
    }
}

/// 逐题评审条目
///
/// answer / explanation 只放正确答案与完整解析；
/// observation / suggestion 只放题目缺陷与修订建议。
/// 两组字段互不渗透，是与分析服务约定的硬性契约。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    /// 题号（显示用标签）
    pub question_no: String,
    /// 题目考查内容
    pub question_review: String,
    /// 发现的缺陷（无缺陷时为通过说明）
    pub observation: String,
    /// 修订建议（绝不含解题过程）
    pub suggestion: String,
    /// 正确答案（必填、非空）
    pub answer: String,
    /// 完整解析（必填，可以很长）
    pub explanation: String,
}

/// 难度层级统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// 参照分配（矩阵）
    pub matrix: LevelStat,
    /// 实际分配（试卷观测值）
    pub actual: LevelStat,
}

/// 四个认知难度层级的题量
///
/// nb=Nhận biết（识记） th=Thông hiểu（理解）
/// vd=Vận dụng（应用） vdc=Vận dụng cao（高阶应用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStat {
    pub nb: u32,
    pub th: u32,
    pub vd: u32,
    pub vdc: u32,
}

impl LevelStat {
    pub fn total(&self) -> u32 {
        self.nb + self.th + self.vd + self.vdc
    }
}

/// 重要发现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportWarning {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
    #[serde(rename = "questionId", skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// 发现级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl AuditReport {
    /// 校验报告约束
    ///
    /// - 每个评审条目的 answer / explanation 非空
    /// - actual 层级题量之和等于 totalQuestions
    /// - 矩阵非合成时，matrix 层级题量之和也等于 totalQuestions
    ///
    /// 返回所有违反项的描述；空列表表示通过。
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (part, items) in self.detailed_reviews.parts() {
            for (idx, item) in items.iter().enumerate() {
                if item.answer.trim().is_empty() {
                    violations.push(format!("{}[{}] ({}) 缺少答案", part, idx, item.question_no));
                }
                if item.explanation.trim().is_empty() {
                    violations.push(format!("{}[{}] ({}) 缺少解析", part, idx, item.question_no));
                }
            }
        }

        let actual_total = self.stats.actual.total();
        if actual_total != self.total_questions {
            violations.push(format!(
                "实际层级题量之和 {} 不等于题目总数 {}",
                actual_total, self.total_questions
            ));
        }

        // 合成矩阵允许因取整与总数有出入
        if !self.is_ai_generated_matrix {
            let matrix_total = self.stats.matrix.total();
            if matrix_total != self.total_questions {
                violations.push(format!(
                    "矩阵层级题量之和 {} 不等于题目总数 {}",
                    matrix_total, self.total_questions
                ));
            }
        }

        violations
    }
}

/// 测试夹具（供本 crate 各模块的单元测试共用）
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn sample_report() -> AuditReport {
        AuditReport {
            subject: "Toán".to_string(),
            exam_code: "101".to_string(),
            grade: "12".to_string(),
            semester: "HK1".to_string(),
            total_questions: 4,
            report_id: "RPT-001".to_string(),
            auditor_name: String::new(),
            audit_date: "20/11/2025".to_string(),
            is_ai_generated_matrix: false,
            overview: Overview {
                scientific: "Đề đảm bảo tính khoa học.".to_string(),
                pedagogical: "Phù hợp trình độ học sinh.".to_string(),
                accuracy: "Chính xác.".to_string(),
                matrix_alignment: "Bám sát ma trận.".to_string(),
                improvement_suggestions: None,
            },
            detailed_reviews: DetailedReviews {
                part1: vec![ReviewItem {
                    question_no: "Câu 1".to_string(),
                    question_review: "Đạo hàm của hàm số.".to_string(),
                    observation: "Không phát hiện lỗi.".to_string(),
                    suggestion: "Giữ nguyên.".to_string(),
                    answer: "B".to_string(),
                    explanation: "Ta có $y' = 2x$.".to_string(),
                }],
                part2: vec![],
                part3: vec![],
            },
            stats: Stats {
                matrix: LevelStat { nb: 2, th: 1, vd: 1, vdc: 0 },
                actual: LevelStat { nb: 2, th: 1, vd: 1, vdc: 0 },
            },
            warnings: vec![ReportWarning {
                severity: Severity::Info,
                message: "Đề đạt yêu cầu.".to_string(),
                question_id: None,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_report;

    #[test]
    fn test_validate_passes_on_consistent_report() {
        assert!(sample_report().validate().is_empty());
    }

    #[test]
    fn test_validate_rejects_actual_sum_mismatch() {
        let mut report = sample_report();
        report.stats.actual.nb = 99;
        let violations = report.validate();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("实际层级"));
    }

    #[test]
    fn test_validate_allows_matrix_mismatch_when_ai_generated() {
        let mut report = sample_report();
        report.is_ai_generated_matrix = true;
        report.stats.matrix.vdc = 7;
        assert!(report.validate().is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_answer() {
        let mut report = sample_report();
        report.detailed_reviews.part1[0].answer = "  ".to_string();
        let violations = report.validate();
        assert!(violations.iter().any(|v| v.contains("缺少答案")));
    }

    #[test]
    fn test_serde_uses_camel_case_wire_names() {
        let value = serde_json::to_value(sample_report()).unwrap();
        assert!(value.get("totalQuestions").is_some());
        assert!(value.get("isAIGeneratedMatrix").is_some());
        assert!(value.get("detailedReviews").is_some());
        assert_eq!(value["warnings"][0]["type"], "info");
    }
}
