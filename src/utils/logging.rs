/// 日志工具模块
///
/// 提供 tracing 初始化和阶段性输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；未设置时 verbose 模式开 debug，否则 info。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 记录程序启动信息
pub fn log_startup(model_name: &str, output_folder: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 试卷批改分析");
    info!("📊 分析模型: {}", model_name);
    info!("📁 输出目录: {}", output_folder);
    info!("{}", "=".repeat(60));
}

/// 记录分析结果摘要
pub fn log_report_summary(subject: &str, total_questions: u32, warning_count: usize) {
    info!("✓ 分析完成: {} ({} 题)", subject, total_questions);
    if warning_count > 0 {
        info!("⚠️ 重要发现 {} 条", warning_count);
    }
}
