use anyhow::Result;
use bulk_enrollment_upload::orchestrator::{RunCoordinator, UnitSource};
use bulk_enrollment_upload::services::partitioner;
use bulk_enrollment_upload::utils::logging;
use bulk_enrollment_upload::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置（CONFIG_FILE 指向 TOML 文件时优先于环境变量）
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => Config::from_toml_file(&path)?,
        Err(_) => Config::from_env(),
    };

    // 可选的分区阶段：原始记录文件 → 逐单元文件（及批次）
    partitioner::run_partition_stage(&config)?;

    // 初始化并运行上传
    let coordinator = RunCoordinator::initialize(config.clone()).await?;
    let summary = coordinator
        .run(UnitSource::Folder(config.unit_folder.clone()))
        .await?;

    // 退出码反映整体成败，供自动化调用方判断
    std::process::exit(summary.exit_code());
}
