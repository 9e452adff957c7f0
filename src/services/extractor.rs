//! 文件内容提取服务 - 业务能力层
//!
//! 按扩展名分发的单文件提取能力，不关心流程：
//! - pdf  → 整文件 base64 透传（客户端解析 PDF 版面不可靠，交给分析服务）
//! - docx → 还原成简化 HTML 后交给压缩器
//! - xlsx / xls → 逐工作表摊平成伪 markdown 表格
//! - 其他 → 按纯文本读取并截断
//!
//! 成功结果有且只有一种形态（text 或 binary），失败不返回部分内容。

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use calamine::{Reader, Xls, Xlsx};
use tracing::debug;

use crate::error::{AppError, AppResult, ExtractionError};
use crate::models::{ExtractedContent, UploadedFile};
use crate::services::normalizer::ContentNormalizer;

/// 纯文本路径的最大字符数（约束下游请求体成本）
pub const MAX_PLAIN_TEXT_CHARS: usize = 300_000;

/// 文件内容提取服务
pub struct FormatExtractor {
    normalizer: ContentNormalizer,
}

impl FormatExtractor {
    pub fn new() -> Self {
        Self {
            normalizer: ContentNormalizer::new(),
        }
    }

    /// 提取单个文件的内容
    pub async fn extract(&self, file: &UploadedFile) -> AppResult<ExtractedContent> {
        let extension = file.extension().unwrap_or_default();
        debug!("提取文件: {} (扩展名: {})", file.name, extension);

        match extension.as_str() {
            "pdf" => Ok(ExtractedContent::Binary {
                data: BASE64.encode(&file.bytes),
                mime_type: "application/pdf".to_string(),
            }),
            "docx" => {
                let html = self.docx_to_html(file)?;
                Ok(ExtractedContent::text(self.normalizer.normalize(&html)))
            }
            "xlsx" => self.workbook_to_text(file, WorkbookKind::Xlsx),
            "xls" => self.workbook_to_text(file, WorkbookKind::Xls),
            _ => {
                let raw = String::from_utf8_lossy(&file.bytes);
                let truncated: String = raw.chars().take(MAX_PLAIN_TEXT_CHARS).collect();
                Ok(ExtractedContent::text(truncated))
            }
        }
    }

    /// 把 DOCX 还原成只含结构线索的简化 HTML
    ///
    /// 只保留段落、表格、加粗、斜体和换行；图形 / 图片元素直接跳过。
    fn docx_to_html(&self, file: &UploadedFile) -> AppResult<String> {
        let docx = docx_rs::read_docx(&file.bytes).map_err(|e| {
            AppError::Extraction(ExtractionError::DocxParseFailed {
                name: file.name.clone(),
                source: Box::new(e),
            })
        })?;

        let mut html = String::new();
        for child in &docx.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(paragraph) => {
                    let inner = paragraph_to_html(paragraph);
                    html.push_str("<p>");
                    html.push_str(&inner);
                    html.push_str("</p>");
                }
                docx_rs::DocumentChild::Table(table) => {
                    html.push_str("<table>");
                    for row in &table.rows {
                        let docx_rs::TableChild::TableRow(tr) = row;
                        html.push_str("<tr>");
                        for cell in &tr.cells {
                            let docx_rs::TableRowChild::TableCell(tc) = cell;
                            html.push_str("<td>");
                            for content in &tc.children {
                                if let docx_rs::TableCellContent::Paragraph(paragraph) = content {
                                    html.push_str(&paragraph_to_html(paragraph));
                                }
                            }
                            html.push_str("</td>");
                        }
                        html.push_str("</tr>");
                    }
                    html.push_str("</table>");
                }
                _ => {}
            }
        }

        Ok(html)
    }

    /// 把工作簿摊平成伪 markdown 表格
    ///
    /// 每个工作表一段：`### SHEET: 名称` 标题行，随后每个数据行
    /// 一条管道分隔行，空单元格渲染为空字符串，工作表按簿内顺序拼接。
    fn workbook_to_text(
        &self,
        file: &UploadedFile,
        kind: WorkbookKind,
    ) -> AppResult<ExtractedContent> {
        let cursor = Cursor::new(file.bytes.as_slice());

        let sheets = match kind {
            WorkbookKind::Xlsx => {
                let mut workbook = Xlsx::new(cursor).map_err(|e| {
                    AppError::Extraction(ExtractionError::WorkbookParseFailed {
                        name: file.name.clone(),
                        source: Box::new(e),
                    })
                })?;
                read_all_sheets(&mut workbook)
            }
            WorkbookKind::Xls => {
                let mut workbook = Xls::new(cursor).map_err(|e| {
                    AppError::Extraction(ExtractionError::WorkbookParseFailed {
                        name: file.name.clone(),
                        source: Box::new(e),
                    })
                })?;
                read_all_sheets(&mut workbook)
            }
        };

        Ok(ExtractedContent::text(sheets.trim()))
    }
}

impl Default for FormatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 工作簿格式
enum WorkbookKind {
    Xlsx,
    Xls,
}

/// 按簿内顺序读出所有工作表
fn read_all_sheets<RS, R>(workbook: &mut R) -> String
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
{
    let mut out = String::new();

    for sheet_name in workbook.sheet_names().to_vec() {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(_) => continue,
        };
        if range.is_empty() {
            continue;
        }

        out.push_str(&format!("### SHEET: {}\n", sheet_name));
        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    calamine::Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        out.push('\n');
    }

    out
}

/// 段落转 HTML（加粗 / 斜体 / 换行；图形跳过）
fn paragraph_to_html(paragraph: &docx_rs::Paragraph) -> String {
    let mut html = String::new();
    for child in &paragraph.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                html.push_str(&run_to_html(run));
            }
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        html.push_str(&run_to_html(run));
                    }
                }
            }
            _ => {}
        }
    }
    html
}

fn run_to_html(run: &docx_rs::Run) -> String {
    let mut text = String::new();
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(t) => text.push_str(&t.text),
            docx_rs::RunChild::Break(_) => text.push_str("<br/>"),
            docx_rs::RunChild::Tab(_) => text.push(' '),
            // 图片 / 图形元素丢弃
            _ => {}
        }
    }

    if text.is_empty() {
        return text;
    }
    if run.run_property.bold.is_some() {
        text = format!("<strong>{}</strong>", text);
    }
    if run.run_property.italic.is_some() {
        text = format!("<i>{}</i>", text);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    fn extractor() -> FormatExtractor {
        FormatExtractor::new()
    }

    /// 在内存里构造一个最小 DOCX
    fn docx_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        docx_rs::Docx::new()
            .add_paragraph(
                docx_rs::Paragraph::new()
                    .add_run(docx_rs::Run::new().add_text("Câu 1: ").bold())
                    .add_run(docx_rs::Run::new().add_text("Tính đạo hàm của $y = x^2$")),
            )
            .build()
            .pack(&mut std::io::Cursor::new(&mut buf))
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_pdf_is_forwarded_as_binary() {
        let file = UploadedFile::new("de_thi.pdf", b"%PDF-1.7 fake".to_vec());
        let content = extractor().extract(&file).await.unwrap();

        match content {
            ExtractedContent::Binary { data, mime_type } => {
                assert_eq!(mime_type, "application/pdf");
                assert_eq!(BASE64.decode(data).unwrap(), b"%PDF-1.7 fake");
            }
            ExtractedContent::Text { .. } => panic!("PDF 必须按二进制透传"),
        }
    }

    #[tokio::test]
    async fn test_docx_yields_normalized_html() {
        let file = UploadedFile::new("de_thi.docx", docx_bytes());
        let content = extractor().extract(&file).await.unwrap();

        match content {
            ExtractedContent::Text { text } => {
                assert!(text.contains("<strong>Câu 1: </strong>"));
                assert!(text.contains("Tính đạo hàm"));
                assert!(text.starts_with("<p>"));
            }
            ExtractedContent::Binary { .. } => panic!("DOCX 必须走文本路径"),
        }
    }

    #[tokio::test]
    async fn test_plain_text_is_truncated() {
        let big = "a".repeat(MAX_PLAIN_TEXT_CHARS + 1000);
        let file = UploadedFile::new("ghi_chu.txt", big.into_bytes());
        let content = extractor().extract(&file).await.unwrap();

        match content {
            ExtractedContent::Text { text } => {
                assert_eq!(text.chars().count(), MAX_PLAIN_TEXT_CHARS);
            }
            ExtractedContent::Binary { .. } => panic!("纯文本路径不应产出二进制"),
        }
    }

    #[tokio::test]
    async fn test_corrupt_workbook_is_rejected_without_partial_output() {
        let file = UploadedFile::new("ma_tran.xlsx", b"not a zip".to_vec());
        let err = extractor().extract(&file).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Extraction(ExtractionError::WorkbookParseFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_rejected() {
        let file = UploadedFile::new("de_thi.docx", b"garbage".to_vec());
        let err = extractor().extract(&file).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Extraction(ExtractionError::DocxParseFailed { .. })
        ));
    }
}
