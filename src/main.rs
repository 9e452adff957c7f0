use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use auto_audit::utils::logging;
use auto_audit::{
    App, ChromiumBackend, Config, FileSlot, JsExecutor, RenderExporter, UploadedFile,
    launch_headless_browser,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置并初始化日志
    let config = Config::from_env();
    logging::init(config.verbose_logging);
    logging::log_startup(&config.llm_model_name, &config.output_folder);

    // 命令行参数：试卷路径（必填）+ 矩阵路径（可选）
    let mut args = std::env::args().skip(1);
    let exam_path = args
        .next()
        .context("用法: auto_audit <đề thi: docx|pdf> [ma trận: docx|xlsx|xls]")?;
    let matrix_path = args.next();

    let mut app = App::initialize(config.clone())?;
    app.upload(FileSlot::Exam, read_file(&exam_path)?)?;
    if let Some(path) = matrix_path {
        app.upload(FileSlot::Matrix, read_file(&path)?)?;
    }

    // 分析
    app.start_analysis().await?;
    if let Some(report) = app.report() {
        logging::log_report_summary(
            &report.subject,
            report.total_questions,
            report.warnings.len(),
        );
    }

    // 导出
    let (mut browser, page) = launch_headless_browser().await?;
    let exporter = RenderExporter::new(
        ChromiumBackend::new(JsExecutor::new(page)),
        &config.output_folder,
    );
    if let Some(path) = app.export(&exporter).await? {
        info!("📄 导出文件: {}", path.display());
    }
    browser.close().await?;

    Ok(())
}

/// 从磁盘读入一个上传文件
fn read_file(path: &str) -> Result<UploadedFile> {
    let bytes = std::fs::read(path).with_context(|| format!("读取文件失败: {}", path))?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    Ok(UploadedFile::new(name, bytes))
}
