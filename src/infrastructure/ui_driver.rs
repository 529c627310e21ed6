//! UI 驱动能力接口
//!
//! 把"驱动一个脆弱的远端表单"抽象成一组有界阻塞操作。
//! 所有等待都由调用方给定超时上限，绝不出现无限挂起：
//! 超时要么转成 `ElementNotFound`（定位类操作），
//! 要么转成 `Ok(false)`（`wait_until`，分类留给调用方）

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;

/// 远端 UI 驱动能力
///
/// 职责：
/// - 只暴露单次交互能力，不编排步骤
/// - 每个操作携带显式超时
/// - 失败统一分类为 `UiInteractionError`，携带定位器与操作种类
///
/// 测试中用脚本化的桩实现替换
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// 导航到指定 URL；平台不可达时返回 `SessionError`
    async fn goto(&self, url: &str) -> AppResult<()>;

    /// 定位文件输入框并附加待上传文件
    async fn set_file_input(
        &self,
        selector: &str,
        file_path: &Path,
        timeout: Duration,
    ) -> AppResult<()>;

    /// 等待元素出现并点击
    async fn click(&self, selector: &str, timeout: Duration) -> AppResult<()>;

    /// 读取复选框勾选状态
    async fn is_checked(&self, selector: &str, timeout: Duration) -> AppResult<bool>;

    /// 设置复选框勾选状态（先读后写，状态一致时不触碰 UI）
    async fn set_checked(&self, selector: &str, desired: bool, timeout: Duration)
        -> AppResult<()>;

    /// 读取元素的可见文本
    async fn read_text(&self, selector: &str, timeout: Duration) -> AppResult<String>;

    /// 按固定间隔轮询元素是否出现
    ///
    /// 超时返回 `Ok(false)` 而不是错误，失败分类留给调用方
    async fn wait_until(&self, selector: &str, timeout: Duration) -> AppResult<bool>;
}
