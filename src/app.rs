//! 应用编排层
//!
//! `App` 持有一次会话的全部状态：上传的文件、分析状态、当前报告
//! 快照。五个动作（上传 / 分析 / 编辑 / 导出 / 重置）都从这里进入，
//! 能力全部来自业务层。
//!
//! 失败语义：任何一步失败都是该动作的终态，状态回到 Idle，
//! 已上传的文件和已有的报告保持原样，绝不自动重试。

use std::path::PathBuf;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{apply, AuditReport, FieldPath, FileSlot, UploadedFile};
use crate::services::{
    FormatExtractor, RenderBackend, RenderExporter, RequestAssembler, SettingsStore,
};
use crate::workflow;

/// 分析状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    /// 空闲（初始态，也是所有失败的归宿）
    Idle,
    /// 正在提取文件内容
    Extracting,
    /// 正在等待分析服务
    Assembling,
    /// 报告就绪
    Completed,
}

/// 应用主结构
pub struct App {
    config: Config,
    settings: SettingsStore,
    extractor: FormatExtractor,
    status: AuditStatus,
    exam_file: Option<UploadedFile>,
    matrix_file: Option<UploadedFile>,
    report: Option<AuditReport>,
}

impl App {
    /// 初始化应用（加载本地设置）
    pub fn initialize(config: Config) -> AppResult<Self> {
        let settings = SettingsStore::load(&config.settings_file)?;
        Ok(Self {
            config,
            settings,
            extractor: FormatExtractor::new(),
            status: AuditStatus::Idle,
            exam_file: None,
            matrix_file: None,
            report: None,
        })
    }

    pub fn status(&self) -> AuditStatus {
        self.status
    }

    pub fn report(&self) -> Option<&AuditReport> {
        self.report.as_ref()
    }

    /// 上传文件到槽位（替换旧文件）
    ///
    /// 扩展名校验在这里就做，不合法的文件根本不会被记住。
    pub fn upload(&mut self, slot: FileSlot, file: UploadedFile) -> AppResult<()> {
        workflow::validate_slot(slot, &file)?;
        info!("📁 已接收文件: {} ({:?})", file.name, slot);
        match slot {
            FileSlot::Exam => self.exam_file = Some(file),
            FileSlot::Matrix => self.matrix_file = Some(file),
        }
        Ok(())
    }

    /// 保存 / 清除用户填写的 API Key（立即写盘）
    pub fn set_api_key(&mut self, key: Option<String>) -> AppResult<()> {
        self.settings.set_custom_api_key(key)
    }

    /// 跑一次批改分析
    ///
    /// 成功后旧报告被新快照整体替换；失败时状态回 Idle，
    /// 文件和旧报告原样保留。
    pub async fn start_analysis(&mut self) -> AppResult<()> {
        let exam = self.exam_file.as_ref().ok_or_else(|| {
            AppError::Validation("Vui lòng tải lên ít nhất một file Đề thi.".to_string())
        })?;
        workflow::validate_slot(FileSlot::Exam, exam)?;
        if let Some(matrix) = &self.matrix_file {
            workflow::validate_slot(FileSlot::Matrix, matrix)?;
        }

        // Key 解析也是前置条件，不通过就不进入流水线
        let api_key = self.settings.resolve_api_key(&self.config)?;
        let assembler = RequestAssembler::new(&self.config, &api_key);

        self.status = AuditStatus::Extracting;
        let extraction = workflow::extract_inputs(
            &self.extractor,
            exam,
            self.matrix_file.as_ref(),
        )
        .await;
        let (exam_content, matrix_content) = match extraction {
            Ok(contents) => contents,
            Err(e) => {
                warn!("❌ 提取失败，状态回到空闲: {}", e);
                self.status = AuditStatus::Idle;
                return Err(e);
            }
        };

        self.status = AuditStatus::Assembling;
        match assembler
            .run_audit(&exam_content, matrix_content.as_ref())
            .await
        {
            Ok(report) => {
                self.report = Some(report);
                self.status = AuditStatus::Completed;
                Ok(())
            }
            Err(e) => {
                warn!("❌ 分析失败，状态回到空闲: {}", e);
                self.status = AuditStatus::Idle;
                Err(e)
            }
        }
    }

    /// 对当前报告应用一次字段编辑（last-write-wins）
    pub fn apply_edit(&mut self, path: &str, value: JsonValue) -> AppResult<()> {
        let report = self.report.as_ref().ok_or_else(|| {
            AppError::Validation("Chưa có báo cáo để chỉnh sửa.".to_string())
        })?;
        let field_path = FieldPath::parse(path)?;
        let updated = apply(report, &field_path, value)?;
        self.report = Some(updated);
        Ok(())
    }

    /// 导出当前报告为 PDF
    pub async fn export<B: RenderBackend>(
        &self,
        exporter: &RenderExporter<B>,
    ) -> AppResult<Option<PathBuf>> {
        let report = self.report.as_ref().ok_or_else(|| {
            AppError::Validation("Chưa có báo cáo để xuất file.".to_string())
        })?;
        exporter.export(report).await
    }

    /// 丢弃所有会话状态，回到初始态
    pub fn reset(&mut self) {
        info!("🔄 会话重置");
        self.exam_file = None;
        self.matrix_file = None;
        self.report = None;
        self.status = AuditStatus::Idle;
    }
}
