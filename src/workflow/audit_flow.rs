//! 批改分析流水线 - 流程编排层
//!
//! 一次分析 = 前置校验 → 并发提取 → 组装提交。只编排顺序，
//! 能力全部来自业务层；任何一步失败整个流水线失败。

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{AuditReport, ExtractedContent, FileSlot, UploadedFile};
use crate::services::{FormatExtractor, RequestAssembler};

/// 校验文件落在槽位允许的扩展名内
///
/// 在流水线启动前调用；不通过的文件根本不会进入提取。
pub fn validate_slot(slot: FileSlot, file: &UploadedFile) -> AppResult<()> {
    let extension = file.extension().unwrap_or_default();
    if slot.allowed_extensions().contains(&extension.as_str()) {
        return Ok(());
    }

    let message = match slot {
        FileSlot::Exam => format!(
            "Định dạng file đề thi không được hỗ trợ: {} (chấp nhận: docx, pdf)",
            file.name
        ),
        FileSlot::Matrix => format!(
            "Định dạng file ma trận không được hỗ trợ: {} (chấp nhận: docx, xlsx, xls)",
            file.name
        ),
    };
    Err(AppError::Validation(message))
}

/// 并发提取试卷与矩阵（`try_join!`）
///
/// 任一文件提取失败整个阶段失败，不产出部分结果。
pub async fn extract_inputs(
    extractor: &FormatExtractor,
    exam: &UploadedFile,
    matrix: Option<&UploadedFile>,
) -> AppResult<(ExtractedContent, Option<ExtractedContent>)> {
    match matrix {
        Some(matrix_file) => {
            debug!("并发提取试卷与矩阵");
            let (exam_content, matrix_content) = tokio::try_join!(
                extractor.extract(exam),
                extractor.extract(matrix_file),
            )?;
            Ok((exam_content, Some(matrix_content)))
        }
        None => {
            debug!("未附矩阵，只提取试卷");
            Ok((extractor.extract(exam).await?, None))
        }
    }
}

/// 跑一次完整的批改分析
///
/// 前置校验 → 并发提取 → 组装提交；矩阵缺席时由组装服务
/// 注入占位文本。
pub async fn run_audit_pipeline(
    extractor: &FormatExtractor,
    assembler: &RequestAssembler,
    exam: &UploadedFile,
    matrix: Option<&UploadedFile>,
) -> AppResult<AuditReport> {
    info!("🚀 开始批改分析: {}", exam.name);

    validate_slot(FileSlot::Exam, exam)?;
    if let Some(matrix_file) = matrix {
        validate_slot(FileSlot::Matrix, matrix_file)?;
    }

    let (exam_content, matrix_content) = extract_inputs(extractor, exam, matrix).await?;

    let report = assembler
        .run_audit(&exam_content, matrix_content.as_ref())
        .await?;

    info!("✓ 批改分析完成: {} 题", report.total_questions);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exam_slot_accepts_docx_and_pdf() {
        for name in ["de_thi.docx", "de_thi.pdf", "DE_THI.PDF"] {
            let file = UploadedFile::new(name, vec![]);
            assert!(validate_slot(FileSlot::Exam, &file).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_exam_slot_rejects_workbooks() {
        let file = UploadedFile::new("de_thi.xlsx", vec![]);
        let err = validate_slot(FileSlot::Exam, &file).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_matrix_slot_rejects_pdf() {
        let file = UploadedFile::new("ma_tran.pdf", vec![]);
        let err = validate_slot(FileSlot::Matrix, &file).unwrap_err();
        match err {
            AppError::Validation(message) => assert!(message.contains("ma trận")),
            other => panic!("错误类型不对: {:?}", other),
        }
    }

    #[test]
    fn test_extensionless_file_rejected() {
        let file = UploadedFile::new("dethi", vec![]);
        assert!(validate_slot(FileSlot::Exam, &file).is_err());
    }
}
