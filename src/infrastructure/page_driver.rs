//! chromiumoxide 驱动实现
//!
//! 持有唯一的 Page 资源。DOM 交互统一通过页面内 JS 求值完成，
//! 返回 JSON 结果；只有附加上传文件走 CDP 命令
//! （浏览器拒绝脚本对 file input 赋值）

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::Page;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{AppError, AppResult, UiInteractionError, UiOp};
use crate::infrastructure::ui_driver::UiDriver;

/// chromiumoxide 页面驱动
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 把定位器原样交给 document.querySelector，不解释其语法
/// - 不认识 Unit，不处理业务流程
pub struct PageDriver {
    page: Page,
    poll_interval: Duration,
}

impl PageDriver {
    pub fn new(page: Page, poll_interval: Duration) -> Self {
        Self {
            page,
            poll_interval,
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    async fn eval(&self, js_code: String) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code).await.map_err(|e| {
            AppError::Ui(UiInteractionError::ScriptFailed {
                source: Box::new(e),
            })
        })?;
        let json_value: JsonValue = result.into_value().map_err(|e| {
            AppError::Ui(UiInteractionError::ScriptFailed {
                source: Box::new(e),
            })
        })?;
        Ok(json_value)
    }

    /// 元素当前是否存在
    async fn exists(&self, selector: &str) -> AppResult<bool> {
        let js = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(selector)?
        );
        let value = self.eval(js).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// 有界等待元素出现；超时转成 ElementNotFound
    async fn locate(&self, selector: &str, op: UiOp, timeout: Duration) -> AppResult<()> {
        if self.wait_present(selector, timeout).await? {
            Ok(())
        } else {
            Err(AppError::element_not_found(selector, op, timeout))
        }
    }

    async fn wait_present(&self, selector: &str, timeout: Duration) -> AppResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.exists(selector).await? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// 对已定位的元素执行一段 JS 表达式
    ///
    /// 元素在等待和执行之间消失时按 missing 处理，不让 JS 抛异常
    async fn eval_on(&self, selector: &str, op: UiOp, body: &str) -> AppResult<JsonValue> {
        let js = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                if (!el) {{
                    return {{ missing: true }};
                }}
                return {{ missing: false, value: ({body}) }};
            }})()
            "#,
            selector = serde_json::to_string(selector)?,
            body = body,
        );
        let result = self.eval(js).await?;
        if result
            .get("missing")
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
        {
            return Err(AppError::element_not_found(
                selector,
                op,
                Duration::from_secs(0),
            ));
        }
        Ok(result.get("value").cloned().unwrap_or(JsonValue::Null))
    }
}

#[async_trait]
impl UiDriver for PageDriver {
    async fn goto(&self, url: &str) -> AppResult<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(())
    }

    async fn set_file_input(
        &self,
        selector: &str,
        file_path: &Path,
        timeout: Duration,
    ) -> AppResult<()> {
        self.locate(selector, UiOp::SetFile, timeout).await?;

        let element = self.page.find_element(selector).await.map_err(|e| {
            AppError::interaction_failed(selector, UiOp::SetFile, e)
        })?;

        let params = SetFileInputFilesParams::builder()
            .file(file_path.to_string_lossy().to_string())
            .backend_node_id(element.backend_node_id)
            .build()
            .map_err(AppError::Other)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| AppError::interaction_failed(selector, UiOp::SetFile, e))?;

        debug!("已附加文件: {}", file_path.display());
        Ok(())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> AppResult<()> {
        self.locate(selector, UiOp::Click, timeout).await?;
        self.eval_on(selector, UiOp::Click, "el.click(), true").await?;
        debug!("已点击: {}", selector);
        Ok(())
    }

    async fn is_checked(&self, selector: &str, timeout: Duration) -> AppResult<bool> {
        self.locate(selector, UiOp::ReadChecked, timeout).await?;
        let value = self
            .eval_on(selector, UiOp::ReadChecked, "el.checked === true")
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn set_checked(
        &self,
        selector: &str,
        desired: bool,
        timeout: Duration,
    ) -> AppResult<()> {
        // 先读后写：状态已一致时不触碰 UI，避免多余交互触发重新校验
        let current = self.is_checked(selector, timeout).await?;
        if current != desired {
            self.eval_on(selector, UiOp::SetChecked, "el.click(), true")
                .await?;
            debug!("已切换勾选状态: {} -> {}", selector, desired);
        }
        Ok(())
    }

    async fn read_text(&self, selector: &str, timeout: Duration) -> AppResult<String> {
        self.locate(selector, UiOp::ReadText, timeout).await?;
        let value = self
            .eval_on(selector, UiOp::ReadText, "el.innerText ?? ''")
            .await?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    async fn wait_until(&self, selector: &str, timeout: Duration) -> AppResult<bool> {
        self.wait_present(selector, timeout).await
    }
}
