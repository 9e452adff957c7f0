//! 报告渲染服务 - 业务能力层
//!
//! 把批改报告确定性地渲染成 A4 biên bản 的完整 HTML 文档，
//! 供导出路径加载到无头页面打印。不触网、不落盘、不关心流程。
//!
//! 字段值一律 HTML 转义；数学公式保留 `$...$` 定界符，由页面里的
//! MathJax 排版。

use std::fmt::Write as _;

use crate::models::{AuditReport, LevelStat, ReviewItem};

/// 空分区的占位行文本
const EMPTY_PART_PLACEHOLDER: &str = "(Không ghi nhận lỗi sai hoặc phản biện cho phần này)";

/// 三个分区的标题（固定顺序）
const PART_TITLES: [&str; 3] = [
    "Phần I: Câu hỏi trắc nghiệm (Chọn 1 đáp án đúng)",
    "Phần II: Câu hỏi trắc nghiệm Đúng/Sai",
    "Phần III: Câu hỏi trắc nghiệm trả lời ngắn",
];

/// 报告渲染服务
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// 渲染完整 HTML 文档
    pub fn render(&self, report: &AuditReport) -> String {
        let mut html = String::with_capacity(16 * 1024);

        html.push_str(
            r#"<!DOCTYPE html>
<html lang="vi">
<head>
<meta charset="utf-8">
<script>
window.MathJax = { tex: { inlineMath: [['$', '$']], displayMath: [['$$', '$$']] } };
</script>
<script src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
<style>
body { font-family: 'Times New Roman', serif; font-size: 12pt; color: #000; margin: 0; }
.a4-container { width: 210mm; min-height: 297mm; padding: 15mm 18mm; box-sizing: border-box; background: #fff; }
table { width: 100%; border-collapse: collapse; margin-bottom: 8px; }
th, td { border: 0.7pt solid #000; padding: 4px 6px; vertical-align: top; }
th { background: #f1f5f9; font-size: 9pt; text-align: center; }
h1 { font-size: 15pt; text-transform: uppercase; margin: 0; }
h2 { font-size: 11pt; text-transform: uppercase; margin: 0 0 8px 0; }
.header { display: flex; justify-content: space-between; margin-bottom: 24px; }
.header div { text-align: center; font-weight: bold; font-size: 9pt; }
.title { text-align: center; margin-bottom: 24px; }
.title .meta { font-style: italic; font-size: 11pt; margin-top: 8px; }
.section { margin-bottom: 18px; }
.part-title { font-weight: bold; font-style: italic; font-size: 10pt; margin: 12px 0 6px 0; }
.placeholder { text-align: center; font-style: italic; font-size: 10pt; padding: 10px; }
.answer-label { font-weight: bold; }
.signature { display: flex; justify-content: space-around; text-align: center; margin-top: 48px; }
.signature .note { font-style: italic; font-size: 9pt; }
.col-no { width: 5%; text-align: center; font-weight: bold; font-size: 10pt; }
.col-review { width: 12%; font-size: 8.5pt; }
.col-observation { width: 13%; font-size: 9pt; }
.col-answer { width: 58%; font-size: 9.5pt; }
.col-suggestion { width: 12%; font-size: 8.5pt; font-style: italic; }
</style>
</head>
<body>
<div class="a4-container">
"#,
        );

        self.render_header(&mut html);
        self.render_title(&mut html, report);
        self.render_stats(&mut html, report);
        self.render_overview(&mut html, report);
        self.render_detailed_reviews(&mut html, report);
        self.render_signature(&mut html, report);

        html.push_str("</div>\n</body>\n</html>\n");
        html
    }

    fn render_header(&self, html: &mut String) {
        html.push_str(
            r#"<div class="header">
<div><p>SỞ GD&amp;ĐT ...........................</p><p>TRƯỜNG THPT ......................</p></div>
<div><p>CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM</p><p>Độc lập - Tự do - Hạnh phúc</p></div>
</div>
"#,
        );
    }

    fn render_title(&self, html: &mut String, report: &AuditReport) {
        let _ = write!(
            html,
            r#"<div class="title">
<h1>BIÊN BẢN PHẢN BIỆN ĐỀ THI &amp; ĐÁP ÁN</h1>
<p class="meta">Môn: <b>{}</b> &nbsp; Khối: <b>{}</b> &nbsp; Mã đề: <b>{}</b></p>
</div>
"#,
            html_escape(&report.subject),
            html_escape(&report.grade),
            html_escape(&report.exam_code),
        );
    }

    fn render_stats(&self, html: &mut String, report: &AuditReport) {
        html.push_str("<div class=\"section\">\n<h2>I. THỐNG KÊ TỶ LỆ CÂU HỎI</h2>\n");
        html.push_str(
            "<table>\n<tr><th style=\"width:30%\">Hạng mục</th><th>NB</th><th>TH</th><th>VD</th><th>VDC</th><th>Tổng</th></tr>\n",
        );
        self.render_stat_row(html, "Ma trận chuẩn", &report.stats.matrix, report.stats.matrix.total());
        self.render_stat_row(html, "Thực tế đề thi", &report.stats.actual, report.total_questions);
        html.push_str("</table>\n");
        let _ = write!(
            html,
            "<p style=\"font-size:10pt;font-style:italic\"><b>Nhận xét tỷ lệ:</b> {}</p>\n</div>\n",
            html_escape(&report.overview.matrix_alignment),
        );
    }

    fn render_stat_row(&self, html: &mut String, label: &str, stat: &LevelStat, total: u32) {
        let _ = write!(
            html,
            "<tr><td style=\"text-align:left;font-style:italic\">{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:center;font-weight:bold\">{}</td></tr>\n",
            label, stat.nb, stat.th, stat.vd, stat.vdc, total,
        );
    }

    fn render_overview(&self, html: &mut String, report: &AuditReport) {
        let _ = write!(
            html,
            r#"<div class="section">
<h2>II. ĐÁNH GIÁ CHUYÊN MÔN TỔNG QUAN</h2>
<p><b>1. Tính khoa học:</b> {}</p>
<p><b>2. Tính sư phạm:</b> {}</p>
<p><b>3. Độ chính xác:</b> {}</p>
"#,
            html_escape(&report.overview.scientific),
            html_escape(&report.overview.pedagogical),
            html_escape(&report.overview.accuracy),
        );
        if let Some(suggestions) = &report.overview.improvement_suggestions {
            let _ = write!(
                html,
                "<p><b>4. Đề xuất cải tiến:</b> {}</p>\n",
                html_escape(suggestions),
            );
        }
        html.push_str("</div>\n");
    }

    fn render_detailed_reviews(&self, html: &mut String, report: &AuditReport) {
        html.push_str("<div class=\"section\">\n<h2>III. CHI TIẾT PHẢN BIỆN &amp; ĐÁP ÁN GỢI Ý</h2>\n");

        for (title, (_, items)) in PART_TITLES.iter().zip(report.detailed_reviews.parts()) {
            let _ = write!(html, "<p class=\"part-title\">{}</p>\n", title);
            html.push_str(
                "<table>\n<tr><th>Câu</th><th>Nội dung</th><th>Nhận xét lỗi</th><th>Đáp án &amp; Lời giải chi tiết</th><th>Đề xuất</th></tr>\n",
            );
            if items.is_empty() {
                let _ = write!(
                    html,
                    "<tr><td colspan=\"5\" class=\"placeholder\">{}</td></tr>\n",
                    EMPTY_PART_PLACEHOLDER,
                );
            } else {
                for item in items {
                    self.render_review_row(html, item);
                }
            }
            html.push_str("</table>\n");
        }

        html.push_str("</div>\n");
    }

    fn render_review_row(&self, html: &mut String, item: &ReviewItem) {
        // 题号列只显示编号，去掉 "Câu " 前缀
        let question_label = item.question_no.replace("Câu ", "");
        let _ = write!(
            html,
            r#"<tr>
<td class="col-no">{}</td>
<td class="col-review">{}</td>
<td class="col-observation">{}</td>
<td class="col-answer"><div><span class="answer-label">ĐÁP ÁN:</span> {}</div><div>{}</div></td>
<td class="col-suggestion">{}</td>
</tr>
"#,
            html_escape(&question_label),
            html_escape(&item.question_review),
            html_escape(&item.observation),
            html_escape(&item.answer),
            html_escape(&item.explanation),
            html_escape(&item.suggestion),
        );
    }

    fn render_signature(&self, html: &mut String, report: &AuditReport) {
        let auditor = if report.auditor_name.trim().is_empty() {
            "(Họ tên)"
        } else {
            report.auditor_name.as_str()
        };
        let _ = write!(
            html,
            r#"<div class="signature">
<div><p style="font-weight:bold;text-transform:uppercase">Người ra đề</p><p class="note" style="margin-top:80px">(Ký và ghi rõ họ tên)</p></div>
<div><p style="font-style:italic">Ngày {}</p><p style="font-weight:bold;text-transform:uppercase">Người phản biện</p><p style="margin-top:64px;font-weight:bold">{}</p></div>
</div>
"#,
            html_escape(&report.audit_date),
            html_escape(auditor),
        );
    }
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// HTML 字符转义（字段值注入前统一过这一层）
fn html_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::fixtures::sample_report;

    #[test]
    fn test_render_contains_all_sections() {
        let html = ReportRenderer::new().render(&sample_report());

        assert!(html.contains("BIÊN BẢN PHẢN BIỆN ĐỀ THI"));
        assert!(html.contains("I. THỐNG KÊ TỶ LỆ CÂU HỎI"));
        assert!(html.contains("II. ĐÁNH GIÁ CHUYÊN MÔN TỔNG QUAN"));
        assert!(html.contains("III. CHI TIẾT PHẢN BIỆN"));
        assert!(html.contains("Người phản biện"));
        assert!(html.contains("mathjax@3"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = ReportRenderer::new();
        let report = sample_report();
        assert_eq!(renderer.render(&report), renderer.render(&report));
    }

    #[test]
    fn test_empty_parts_get_placeholder_row() {
        let html = ReportRenderer::new().render(&sample_report());
        // part2 / part3 为空，各有一条占位行
        assert_eq!(html.matches(EMPTY_PART_PLACEHOLDER).count(), 2);
    }

    #[test]
    fn test_question_no_prefix_stripped_in_cell() {
        let html = ReportRenderer::new().render(&sample_report());
        assert!(html.contains("<td class=\"col-no\">1</td>"));
    }

    #[test]
    fn test_field_values_are_escaped() {
        let mut report = sample_report();
        report.subject = "Toán <script>alert(1)</script>".to_string();
        let html = ReportRenderer::new().render(&report);

        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_math_delimiters_survive_escaping() {
        let html = ReportRenderer::new().render(&sample_report());
        assert!(html.contains("$y&#39; = 2x$"));
    }

    #[test]
    fn test_blank_auditor_name_gets_placeholder() {
        let html = ReportRenderer::new().render(&sample_report());
        assert!(html.contains("(Họ tên)"));
    }
}
