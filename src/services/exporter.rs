//! 报告导出服务 - 业务能力层
//!
//! 把批改报告渲染、排版并打印成 A4 PDF 落盘。导出是串行动作：
//! 状态机 {Idle, Exporting, Failed, Done}，Exporting 期间的再次
//! 请求直接忽略（不排队、不取消）。任一步骤失败进入 Failed，
//! 不落盘任何部分产物；下一次导出从头开始。

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ExportError};
use crate::infrastructure::JsExecutor;
use crate::models::AuditReport;
use crate::services::renderer::ReportRenderer;

/// 数学排版后的稳定等待
///
/// MathJax 完成 typeset 后页面还有一拍布局刷新，经验值 500ms，
/// 可通过 [`RenderExporter::with_settle_delay`] 覆盖。
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// 导出状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Exporting,
    Failed,
    Done,
}

/// 渲染后端：无头页面之上的三步能力
///
/// 状态机不直接依赖浏览器，换成记录型假后端即可单测。
pub trait RenderBackend {
    /// 把完整 HTML 文档装入页面
    async fn load(&self, html: &str) -> AppResult<()>;
    /// 等待页面内的数学排版完成
    async fn typeset_math(&self) -> AppResult<()>;
    /// 打印当前页面为 PDF 字节流
    async fn snapshot(&self) -> AppResult<Vec<u8>>;
}

/// 报告导出服务
///
/// 职责：
/// - 渲染 → 装载 → 排版 → 快照 → 落盘 的完整导出序列
/// - 并发导出请求的忽略语义
/// - 不解析报告内容、不关心流程顺序
pub struct RenderExporter<B: RenderBackend> {
    renderer: ReportRenderer,
    backend: B,
    output_folder: PathBuf,
    settle_delay: Duration,
    typeset: bool,
    state: Mutex<ExportState>,
}

impl<B: RenderBackend> RenderExporter<B> {
    pub fn new(backend: B, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            renderer: ReportRenderer::new(),
            backend,
            output_folder: output_folder.into(),
            settle_delay: SETTLE_DELAY,
            typeset: true,
            state: Mutex::new(ExportState::Idle),
        }
    }

    /// 覆盖排版后的稳定等待时长
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// 关闭数学排版步骤（编辑预览模式）
    pub fn with_typeset_disabled(mut self) -> Self {
        self.typeset = false;
        self
    }

    /// 当前导出状态
    pub fn state(&self) -> ExportState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 导出一份报告
    ///
    /// 返回写入的文件路径；正在导出时的重复请求返回 `Ok(None)`。
    pub async fn export(&self, report: &AuditReport) -> AppResult<Option<PathBuf>> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == ExportState::Exporting {
                warn!("⚠️ 已有导出在进行中，本次请求忽略");
                return Ok(None);
            }
            *state = ExportState::Exporting;
        }

        match self.run_export(report).await {
            Ok(path) => {
                *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ExportState::Done;
                info!("✅ 报告已导出: {}", path.display());
                Ok(Some(path))
            }
            Err(e) => {
                *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ExportState::Failed;
                Err(e)
            }
        }
    }

    async fn run_export(&self, report: &AuditReport) -> AppResult<PathBuf> {
        let html = self.renderer.render(report);
        debug!("渲染完成: {} 字节", html.len());

        self.backend.load(&html).await?;

        if self.typeset {
            self.backend.typeset_math().await?;
            tokio::time::sleep(self.settle_delay).await;
        }

        let pdf = self.backend.snapshot().await?;
        debug!("快照完成: {} 字节", pdf.len());

        let path = self.output_folder.join(export_file_name(&report.subject));
        tokio::fs::write(&path, pdf).await.map_err(|e| {
            AppError::Export(ExportError::WriteFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;

        Ok(path)
    }
}

/// 导出文件名：`PhanBien_<科目>.pdf`，科目为空时退回 `DeThi`
fn export_file_name(subject: &str) -> String {
    let cleaned: String = subject
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let stem = if cleaned.trim().is_empty() {
        "DeThi".to_string()
    } else {
        cleaned.trim().replace(' ', "")
    };
    format!("PhanBien_{}.pdf", stem)
}

/// 真实的无头浏览器后端
pub struct ChromiumBackend {
    executor: JsExecutor,
}

impl ChromiumBackend {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }
}

impl RenderBackend for ChromiumBackend {
    async fn load(&self, html: &str) -> AppResult<()> {
        self.executor.set_content(html).await.map_err(|e| {
            AppError::Export(ExportError::LoadFailed {
                source: e.into(),
            })
        })
    }

    async fn typeset_math(&self) -> AppResult<()> {
        let js = r#"
            (async () => {
                if (window.MathJax && window.MathJax.typesetPromise) {
                    await window.MathJax.typesetPromise();
                }
                return true;
            })()
        "#;
        self.executor.eval(js).await.map_err(|e| {
            AppError::Export(ExportError::TypesetFailed {
                source: e.into(),
            })
        })?;
        Ok(())
    }

    async fn snapshot(&self) -> AppResult<Vec<u8>> {
        // A4 纵向，零边距，2 倍缩放，保留背景
        let params = PrintToPdfParams {
            landscape: Some(false),
            print_background: Some(true),
            scale: Some(2.0),
            paper_width: Some(8.27),
            paper_height: Some(11.69),
            margin_top: Some(0.0),
            margin_bottom: Some(0.0),
            margin_left: Some(0.0),
            margin_right: Some(0.0),
            ..Default::default()
        };
        self.executor.print_to_pdf(params).await.map_err(|e| {
            AppError::Export(ExportError::SnapshotFailed {
                source: e.into(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::fixtures::sample_report;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 记录型假后端：统计每步调用次数，快照前故意让出一拍
    #[derive(Clone, Default)]
    struct FakeBackend {
        loads: Arc<AtomicUsize>,
        typesets: Arc<AtomicUsize>,
        snapshots: Arc<AtomicUsize>,
        fail_snapshot: Arc<AtomicBool>,
    }

    impl RenderBackend for FakeBackend {
        async fn load(&self, _html: &str) -> AppResult<()> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn typeset_math(&self) -> AppResult<()> {
            self.typesets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn snapshot(&self) -> AppResult<Vec<u8>> {
            tokio::task::yield_now().await;
            if self.fail_snapshot.load(Ordering::SeqCst) {
                return Err(AppError::Export(ExportError::SnapshotFailed {
                    source: "页面崩溃".into(),
                }));
            }
            self.snapshots.fetch_add(1, Ordering::SeqCst);
            Ok(b"%PDF-1.7 fake".to_vec())
        }
    }

    fn test_exporter(
        backend: FakeBackend,
        dir: &std::path::Path,
    ) -> RenderExporter<FakeBackend> {
        RenderExporter::new(backend, dir).with_settle_delay(Duration::from_millis(0))
    }

    #[tokio::test]
    async fn test_export_writes_named_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::default();
        let exporter = test_exporter(backend.clone(), dir.path());

        let path = exporter.export(&sample_report()).await.unwrap().unwrap();

        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("PhanBien_Toán.pdf")
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 fake");
        assert_eq!(exporter.state(), ExportState::Done);
        assert_eq!(backend.typesets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_export_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::default();
        let exporter = test_exporter(backend.clone(), dir.path());
        let report = sample_report();

        let (first, second) = tokio::join!(exporter.export(&report), exporter.export(&report));

        let results = [first.unwrap(), second.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_some()).count(), 1);
        assert_eq!(results.iter().filter(|r| r.is_none()).count(), 1);
        // 整个过程只产生一次快照、一份文件
        assert_eq!(backend.snapshots.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_export_leaves_no_file_and_rearms() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::default();
        backend.fail_snapshot.store(true, Ordering::SeqCst);
        let exporter = test_exporter(backend.clone(), dir.path());
        let report = sample_report();

        let err = exporter.export(&report).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Export(ExportError::SnapshotFailed { .. })
        ));
        assert_eq!(exporter.state(), ExportState::Failed);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        // 失败后可以直接重试
        backend.fail_snapshot.store(false, Ordering::SeqCst);
        assert!(exporter.export(&report).await.unwrap().is_some());
        assert_eq!(exporter.state(), ExportState::Done);
    }

    #[tokio::test]
    async fn test_typeset_skipped_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::default();
        let exporter = RenderExporter::new(backend.clone(), dir.path()).with_typeset_disabled();

        exporter.export(&sample_report()).await.unwrap();
        assert_eq!(backend.typesets.load(Ordering::SeqCst), 0);
        assert_eq!(backend.snapshots.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_export_file_name_fallback() {
        assert_eq!(export_file_name("Toán"), "PhanBien_Toán.pdf");
        assert_eq!(export_file_name("Vật lý"), "PhanBien_Vậtlý.pdf");
        assert_eq!(export_file_name(""), "PhanBien_DeThi.pdf");
        assert_eq!(export_file_name("a/b:c"), "PhanBien_abc.pdf");
        assert_eq!(export_file_name("  "), "PhanBien_DeThi.pdf");
    }
}
