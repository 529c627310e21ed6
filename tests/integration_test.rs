use std::path::PathBuf;
use std::sync::Arc;

use bulk_enrollment_upload::browser::connect_to_browser_and_page;
use bulk_enrollment_upload::infrastructure::PageDriver;
use bulk_enrollment_upload::orchestrator::{RunCoordinator, UnitSource};
use bulk_enrollment_upload::utils::logging;
use bulk_enrollment_upload::workflow::AutoRecovery;
use bulk_enrollment_upload::Config;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 测试浏览器连接（操作员需已在调试端口浏览器中登录平台）
    let result =
        connect_to_browser_and_page(config.browser_debug_port, &config.platform_url).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore]
async fn test_single_unit_upload_against_live_platform() {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 连接浏览器
    let (_browser, page) =
        connect_to_browser_and_page(config.browser_debug_port, &config.platform_url)
            .await
            .expect("连接浏览器失败");

    let driver = Arc::new(PageDriver::new(page, config.poll_interval()));
    let policy = Arc::new(AutoRecovery::new(config.max_retry_attempts));

    // 注意：请根据实际情况修改单元文件路径
    let unit_file = PathBuf::from("individual_courses/NM_2425_FA_BUS101.csv");

    let coordinator = RunCoordinator::with_driver(config, driver, policy)
        .expect("创建协调器失败");
    let summary = coordinator
        .run(UnitSource::Files(vec![unit_file]))
        .await
        .expect("运行失败");

    assert_eq!(summary.len(), 1);
    assert_eq!(summary.exit_code(), 0, "单元上传应该成功");
}
