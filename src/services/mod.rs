//! 业务能力层
//!
//! 每个服务只提供一种能力，不关心流程顺序：
//! - [`extractor`]：按扩展名提取文件内容
//! - [`normalizer`]：压缩 DOCX 富文本
//! - [`assembler`]：组装分析请求 / 解析报告
//! - [`settings`]：本地设置与 API Key 解析
//! - [`renderer`]：报告渲染为 A4 HTML
//! - [`exporter`]：导出 PDF 的状态机

pub mod assembler;
pub mod exporter;
pub mod extractor;
pub mod normalizer;
pub mod renderer;
pub mod settings;

pub use assembler::{RequestAssembler, MISSING_MATRIX_SENTINEL};
pub use exporter::{ChromiumBackend, ExportState, RenderBackend, RenderExporter, SETTLE_DELAY};
pub use extractor::{FormatExtractor, MAX_PLAIN_TEXT_CHARS};
pub use normalizer::ContentNormalizer;
pub use renderer::ReportRenderer;
pub use settings::SettingsStore;
