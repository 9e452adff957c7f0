//! 分析请求组装服务 - 业务能力层
//!
//! 只负责"一次批改分析"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 调用 OpenAI 兼容端点（Gemini 等）
//! - 结构化输出：schema 同时写进指令和 response_format
//! - 二进制内容（PDF）按 data URL 走视觉消息部件
//!
//! 调用是一次性的：不重试、不超时，失败原样上抛。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, AssemblyError};
use crate::models::{AuditReport, ExtractedContent};

/// 未附矩阵时的占位文本（分析服务据此切换合成矩阵模式）
pub const MISSING_MATRIX_SENTINEL: &str = "KHÔNG CÓ MA TRẬN ĐÍNH KÈM";

/// 试卷部分的前缀标记
const EXAM_PART_HEADER: &str = "--- NỘI DUNG ĐỀ THI ---";
/// 矩阵部分的前缀标记
const MATRIX_PART_HEADER: &str = "--- DỮ LIỆU MA TRẬN ---";

/// 分析请求组装服务
///
/// 职责：
/// - 把提取产物拼成一次多部件分析请求
/// - 解析响应为完整的批改报告
/// - 不读文件、不渲染、不关心流程顺序
pub struct RequestAssembler {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl RequestAssembler {
    /// 创建组装服务；API Key 由调用方通过 `SettingsStore` 解析好传入
    pub fn new(config: &Config, api_key: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 提交一次批改分析，返回完整报告
    ///
    /// `matrix` 为 None 时注入占位文本，分析服务进入合成矩阵模式。
    pub async fn run_audit(
        &self,
        exam: &ExtractedContent,
        matrix: Option<&ExtractedContent>,
    ) -> AppResult<AuditReport> {
        info!("📊 提交批改分析，模型: {}", self.model_name);

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_instruction())
            .build()
            .map_err(|e| AppError::assembly_api_failed(&self.model_name, e))?;

        let parts = build_user_parts(exam, matrix);
        debug!("用户消息部件数: {}", parts.len());

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(parts))
            .build()
            .map_err(|e| AppError::assembly_api_failed(&self.model_name, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.2)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "audit_report".to_string(),
                    description: Some("Biên bản phản biện đề thi".to_string()),
                    schema: Some(report_schema()),
                    strict: Some(false),
                },
            })
            .build()
            .map_err(|e| AppError::assembly_api_failed(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("❌ 分析服务调用失败: {}", e);
            AppError::assembly_api_failed(&self.model_name, e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        let report = self.parse_report(&content)?;
        info!(
            "✓ 批改报告已生成: {} ({} 题)",
            report.subject, report.total_questions
        );
        Ok(report)
    }

    /// 把响应文本解析为报告
    ///
    /// 空内容、围栏外壳、形状不符、约束违反都是终态失败，
    /// 绝不产出部分对象。
    fn parse_report(&self, raw: &str) -> AppResult<AuditReport> {
        let body = strip_code_fences(raw);
        if body.is_empty() {
            return Err(AppError::Assembly(AssemblyError::EmptyResponse {
                model: self.model_name.clone(),
            }));
        }

        let mut report: AuditReport = serde_json::from_str(body).map_err(|e| {
            AppError::Assembly(AssemblyError::JsonParseFailed {
                source: Box::new(e),
            })
        })?;

        // 评审日期由本地补齐，不依赖服务端时钟
        if report.audit_date.trim().is_empty() {
            report.audit_date = chrono::Local::now().format("%d/%m/%Y").to_string();
        }

        let violations = report.validate();
        if !violations.is_empty() {
            return Err(AppError::schema_violation(violations.join("; ")));
        }

        Ok(report)
    }
}

/// 构建用户消息部件（试卷部分在前，矩阵部分在后）
///
/// 文本内容带前缀标记拼进文本部件；二进制内容先放一个只含标记的
/// 文本部件，再按 data URL 追加一个图像部件。
fn build_user_parts(
    exam: &ExtractedContent,
    matrix: Option<&ExtractedContent>,
) -> Vec<ChatCompletionRequestUserMessageContentPart> {
    let mut parts = Vec::new();
    push_content(&mut parts, EXAM_PART_HEADER, Some(exam));
    push_content(&mut parts, MATRIX_PART_HEADER, matrix);
    parts
}

fn push_content(
    parts: &mut Vec<ChatCompletionRequestUserMessageContentPart>,
    header: &str,
    content: Option<&ExtractedContent>,
) {
    match content {
        Some(ExtractedContent::Text { text }) => {
            parts.push(text_part(format!("{}\n{}", header, text)));
        }
        Some(ExtractedContent::Binary { data, mime_type }) => {
            parts.push(text_part(header.to_string()));
            parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{}", mime_type, data),
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ));
        }
        None => {
            parts.push(text_part(format!(
                "{}\n{}",
                header, MISSING_MATRIX_SENTINEL
            )));
        }
    }
}

fn text_part(text: String) -> ChatCompletionRequestUserMessageContentPart {
    ChatCompletionRequestUserMessageContentPart::Text(
        ChatCompletionRequestMessageContentPartText { text },
    )
}

/// 固定的分析指令（越南语，与服务端约定的硬性规则）
fn system_instruction() -> String {
    format!(
        r#"Bạn là một chuyên gia phản biện đề thi với hơn 20 năm kinh nghiệm thẩm định đề kiểm tra. Hãy phản biện đề thi được cung cấp và lập biên bản phản biện theo đúng các quy tắc BẮT BUỘC sau:

1. PHÂN TÁCH TRƯỜNG DỮ LIỆU (tuyệt đối không trộn lẫn):
   - "answer" và "explanation": CHỈ chứa đáp án đúng và lời giải chi tiết của câu hỏi.
   - "observation" và "suggestion": CHỈ chứa lỗi sai / điểm chưa hợp lý của đề và đề xuất chỉnh sửa. KHÔNG được chứa lời giải.

2. MA TRẬN ĐỀ:
   - Nếu phần dữ liệu ma trận là "{sentinel}": tự suy luận mức độ nhận thức của từng câu (NB / TH / VD / VDC), tự xây dựng ma trận lý tưởng theo tỷ lệ chuẩn (khoảng 40% NB, 30% TH, 20% VD, 10% VDC), đặt "isAIGeneratedMatrix" = true và BẮT BUỘC điền "improvementSuggestions" trong "overview".
   - Nếu có ma trận đính kèm: đối chiếu từng câu của đề với ma trận, đặt "isAIGeneratedMatrix" = false.

3. ĐÁP ÁN:
   - Nếu đề không kèm đáp án: tự giải từng câu và điền đáp án đúng.
   - Nếu đề có đáp án: kiểm chứng lại từng đáp án, chỉ ra đáp án sai (nếu có) trong "observation".

4. CÔNG THỨC TOÁN HỌC: dùng dấu $...$ cho công thức trong dòng và $$...$$ cho công thức riêng dòng.

5. JSON HỢP LỆ: mọi ký tự backslash trong công thức phải được escape (viết \\frac thay vì \frac).

6. Phân loại câu hỏi vào ba phần: "part1" (trắc nghiệm nhiều lựa chọn), "part2" (đúng / sai nhiều mệnh đề), "part3" (trả lời ngắn / tự luận).

7. Tổng số câu ở "stats.actual" phải đúng bằng "totalQuestions".

CHỈ trả về MỘT object JSON duy nhất theo đúng schema dưới đây, không kèm bất kỳ văn bản nào khác:

{schema}"#,
        sentinel = MISSING_MATRIX_SENTINEL,
        schema = serde_json::to_string_pretty(&report_schema()).unwrap_or_default(),
    )
}

/// 报告的响应 schema（与 `AuditReport` 的线上字段名一一对应）
fn report_schema() -> serde_json::Value {
    let review_item = serde_json::json!({
        "type": "object",
        "properties": {
            "questionNo": { "type": "string" },
            "questionReview": { "type": "string" },
            "observation": { "type": "string" },
            "suggestion": { "type": "string" },
            "answer": { "type": "string" },
            "explanation": { "type": "string" }
        },
        "required": ["questionNo", "questionReview", "observation", "suggestion", "answer", "explanation"]
    });
    let level_stat = serde_json::json!({
        "type": "object",
        "properties": {
            "nb": { "type": "integer" },
            "th": { "type": "integer" },
            "vd": { "type": "integer" },
            "vdc": { "type": "integer" }
        },
        "required": ["nb", "th", "vd", "vdc"]
    });

    serde_json::json!({
        "type": "object",
        "properties": {
            "subject": { "type": "string" },
            "examCode": { "type": "string" },
            "grade": { "type": "string" },
            "semester": { "type": "string" },
            "totalQuestions": { "type": "integer" },
            "reportId": { "type": "string" },
            "auditorName": { "type": "string" },
            "auditDate": { "type": "string" },
            "isAIGeneratedMatrix": { "type": "boolean" },
            "overview": {
                "type": "object",
                "properties": {
                    "scientific": { "type": "string" },
                    "pedagogical": { "type": "string" },
                    "accuracy": { "type": "string" },
                    "matrixAlignment": { "type": "string" },
                    "improvementSuggestions": { "type": "string" }
                },
                "required": ["scientific", "pedagogical", "accuracy", "matrixAlignment"]
            },
            "detailedReviews": {
                "type": "object",
                "properties": {
                    "part1": { "type": "array", "items": review_item.clone() },
                    "part2": { "type": "array", "items": review_item.clone() },
                    "part3": { "type": "array", "items": review_item }
                },
                "required": ["part1", "part2", "part3"]
            },
            "stats": {
                "type": "object",
                "properties": {
                    "matrix": level_stat.clone(),
                    "actual": level_stat
                },
                "required": ["matrix", "actual"]
            },
            "warnings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string", "enum": ["error", "warning", "info"] },
                        "message": { "type": "string" },
                        "questionId": { "type": "string" }
                    },
                    "required": ["type", "message"]
                }
            }
        },
        "required": ["subject", "examCode", "grade", "semester", "totalQuestions", "reportId", "isAIGeneratedMatrix", "overview", "detailedReviews", "stats", "warnings"]
    })
}

/// 去掉响应外层可能存在的 ``` / ```json 围栏
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}
