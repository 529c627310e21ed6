use anyhow::Result;
/// 日志工具模块
///
/// 提供 tracing 初始化和日志格式化输出的辅助函数
use std::fs;
use tracing::info;

use crate::models::outcome::RunSummary;

/// 初始化 tracing 订阅器
///
/// 日志级别由 RUST_LOG 控制，默认 info
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化运行日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量选课上传日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(platform_url: &str, interactive: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量选课上传模式");
    info!("🌐 平台: {}", platform_url);
    info!(
        "🧭 恢复策略: {}",
        if interactive {
            "交互式（失败时询问操作员）"
        } else {
            "无人值守（自动重试后记为失败）"
        }
    );
    info!("{}", "=".repeat(60));
}

/// 记录单元加载信息
pub fn log_units_loaded(total: usize) {
    info!("✓ 找到 {} 个待上传的单元文件", total);
    info!("💡 单会话顺序处理，一次只推一个单元\n");
}

/// 记录单元开始信息
pub fn log_unit_start(unit_index: usize, total: usize, name: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 个单元: {}", unit_index, total, name);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.counts.success, summary.len());
    info!("❌ 校验拒绝: {}", summary.counts.validation_failed);
    info!("⏱️ 超时: {}", summary.counts.timeout);
    info!("🧩 UI故障: {}", summary.counts.ui_error);
    info!("⏭️ 跳过: {}", summary.counts.skipped);
    info!("🛑 中止: {}", summary.counts.aborted);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
