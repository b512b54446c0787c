/// 日志工具模块
///
/// 初始化 tracing，并提供启动 / 结束横幅等输出辅助函数
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 日志文件前缀
const LOG_FILE_PREFIX: &str = "crawler.log";

/// 初始化日志系统
///
/// 控制台按 `RUST_LOG`（默认 info）过滤，同时按天滚动写入 `{log_dir}/crawler.log.YYYY-MM-DD`。
/// 返回的 WorkerGuard 必须在 main 中一直持有，否则文件日志不会落盘。
pub fn init(log_dir: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(env_filter());

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 记录程序启动信息
pub fn log_startup(max_concurrent: usize, list_url: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多分类并发抓取模式");
    info!("📊 最大并发分类数: {}", max_concurrent);
    info!("🔗 列表页: {}", list_url);
    info!(
        "🕐 启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录找到的分类
pub fn log_filters_found(names: &[String], skipped: &[String]) {
    for name in skipped {
        info!("⏭️ 跳过分类: {}", name);
    }
    info!("✓ 找到 {} 个分类: {:?}", names.len(), names);
}

/// 打印最终统计信息
pub fn print_final_stats(saved: usize, skipped: usize, failed: usize, output_dir: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已保存: {}", saved);
    info!("⏭️ 跳过: {}", skipped);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_dir);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
