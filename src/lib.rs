//! # Auto Audit
//!
//! 一个试卷批改（phản biện đề thi）自动化程序：读入试卷与命题矩阵，
//! 提交结构化分析服务，产出可编辑的批改报告并导出为 A4 PDF 版
//! biên bản。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供注入 / eval / 打印能力
//! - `browser/` - 无头浏览器的启动
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程顺序
//! - `FormatExtractor` / `ContentNormalizer` - 文件内容提取与压缩
//! - `RequestAssembler` - 组装分析请求、解析报告
//! - `SettingsStore` - 本地设置与 API Key 解析
//! - `ReportRenderer` / `RenderExporter` - 渲染与导出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次分析"的完整流程（校验 → 提取 → 组装）
//!
//! ### ④ 编排层（Orchestration）
//! - `app.rs` - 会话状态与五个用户动作（上传 / 分析 / 编辑 / 导出 / 重置）

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::{App, AuditStatus};
pub use browser::launch_headless_browser;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{AuditReport, ExtractedContent, FieldPath, FileSlot, UploadedFile};
pub use services::{
    ChromiumBackend, FormatExtractor, RenderExporter, ReportRenderer, RequestAssembler,
    SettingsStore,
};
pub use workflow::run_audit_pipeline;
