//! 单元上传状态机 - 流程层
//!
//! 核心职责：把一个单元文件推过远端表单的完整导入序列
//!
//! 步骤顺序：
//! 1. Uploading   - 定位文件输入框，附加单元文件
//! 2. Validating  - 触发平台校验，有界等待结果指示，分类其文本
//! 3. Configuring - 表单配置（邮件通知保持关闭），先读后写
//! 4. Submitting  - 触发导入
//! 5. Confirming  - 有界等待终态横幅，按文本分类成败
//!
//! 瞬态 UI 故障（元素尚未渲染）在界内退避重试；
//! 平台拒绝（ValidationRejected）绝不自动重试——根因在数据，
//! 必须交回操作员裁决

use std::future::Future;
use std::time::Duration;

use regex::Regex;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{Config, Selectors};
use crate::error::{AppError, AppResult, UiInteractionError};
use crate::infrastructure::UiDriver;
use crate::models::outcome::{FailureCause, StepId};
use crate::services::AuditLog;
use crate::utils::logging::truncate_text;
use crate::workflow::unit_ctx::UnitCtx;

/// 邮件通知复选框的存在性探测上限
///
/// 平台某些版本没有这个复选框，缺席不算错误，不值得等满一个步骤超时
const CHECKBOX_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// 单元流程结果
///
/// 失败携带出错步骤与分类原因；会话级错误不会出现在这里
#[derive(Debug)]
pub enum FlowResult {
    /// 导入成功并得到平台确认
    Succeeded,
    /// 在某一步骤失败
    Failed { step: StepId, cause: FailureCause },
}

impl FlowResult {
    fn failed(step: StepId, cause: FailureCause) -> Self {
        FlowResult::Failed { step, cause }
    }
}

/// 单元上传流程
///
/// - 编排一个单元的完整导入序列
/// - 每次等待都有显式上限，绝不无限挂起
/// - 不持有任何资源（page）
/// - 只依赖 UiDriver 能力
pub struct UploadFlow {
    selectors: Selectors,
    per_step_timeout: Duration,
    submit_timeout: Duration,
    max_retry_attempts: u32,
    retry_backoff: Duration,
    validation_passed_re: Regex,
    import_success_re: Regex,
    verbose_logging: bool,
}

impl UploadFlow {
    /// 创建新的上传流程
    ///
    /// 文本模式在这里编译；非法模式属于启动期配置错误
    pub fn new(config: &Config) -> AppResult<Self> {
        let validation_passed_re =
            Regex::new(&config.validation_passed_pattern).map_err(|e| {
                AppError::Config(crate::error::ConfigError::InvalidPattern {
                    pattern: config.validation_passed_pattern.clone(),
                    source: Box::new(e),
                })
            })?;
        let import_success_re = Regex::new(&config.import_success_pattern).map_err(|e| {
            AppError::Config(crate::error::ConfigError::InvalidPattern {
                pattern: config.import_success_pattern.clone(),
                source: Box::new(e),
            })
        })?;
        Ok(Self {
            selectors: config.selectors.clone(),
            per_step_timeout: config.per_step_timeout(),
            submit_timeout: config.submit_timeout(),
            max_retry_attempts: config.max_retry_attempts,
            retry_backoff: config.retry_backoff(),
            validation_passed_re,
            import_success_re,
            verbose_logging: config.verbose_logging,
        })
    }

    /// 把一个单元推完整个导入序列
    ///
    /// 每次状态转移先写审计流再动 UI，保证被尝试过的单元
    /// 在审计里绝不缺页
    pub async fn run(
        &self,
        driver: &dyn UiDriver,
        ctx: &UnitCtx,
        audit: &AuditLog,
    ) -> AppResult<FlowResult> {
        // ========== ① Uploading: 附加文件 ==========
        audit.record_step(&ctx.unit_name, StepId::Uploading).await?;
        info!("{} 📤 附加文件: {}", ctx, ctx.file_path.display());

        if let Err(cause) = self
            .with_retry(ctx, || {
                driver.set_file_input(
                    &self.selectors.file_input,
                    &ctx.file_path,
                    self.per_step_timeout,
                )
            })
            .await
        {
            return Ok(FlowResult::failed(StepId::Uploading, cause));
        }

        // ========== ② Validating: 平台校验 ==========
        audit.record_step(&ctx.unit_name, StepId::Validating).await?;
        info!("{} 🔍 触发平台校验...", ctx);

        if let Err(cause) = self
            .with_retry(ctx, || {
                driver.click(&self.selectors.validate_button, self.per_step_timeout)
            })
            .await
        {
            return Ok(FlowResult::failed(StepId::Validating, cause));
        }

        // 有界等待校验结果指示出现
        match driver
            .wait_until(&self.selectors.validation_result, self.per_step_timeout)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!("{} ⚠️ 等待校验结果超时", ctx);
                return Ok(FlowResult::failed(
                    StepId::Validating,
                    FailureCause::Timeout {
                        step: StepId::Validating,
                        waited: self.per_step_timeout,
                    },
                ));
            }
            Err(e) => {
                return Ok(FlowResult::failed(StepId::Validating, classify(e)));
            }
        }

        let banner = match self
            .with_retry(ctx, || {
                driver.read_text(&self.selectors.validation_result, self.per_step_timeout)
            })
            .await
        {
            Ok(text) => text,
            Err(cause) => return Ok(FlowResult::failed(StepId::Validating, cause)),
        };

        // 默认拒绝：结果文本必须明确匹配"通过"模式才放行。
        // 认不出的文本一律当作平台反馈交回操作员，绝不冒险继续导入
        if !self.validation_passed_re.is_match(&banner) {
            warn!("{} ❌ 平台校验拒绝: {}", ctx, banner);
            return Ok(FlowResult::failed(
                StepId::Validating,
                FailureCause::ValidationRejected { banner },
            ));
        }
        if self.verbose_logging {
            info!("{} 校验结果: {}", ctx, truncate_text(&banner, 80));
        }
        info!("{} ✓ 平台校验通过", ctx);

        // 翻页：查看校验结果 → 继续到选项
        for selector in [
            &self.selectors.see_results_button,
            &self.selectors.continue_button,
        ] {
            if let Err(cause) = self
                .with_retry(ctx, || driver.click(selector, self.per_step_timeout))
                .await
            {
                return Ok(FlowResult::failed(StepId::Validating, cause));
            }
        }

        // ========== ③ Configuring: 表单配置 ==========
        audit
            .record_step(&ctx.unit_name, StepId::Configuring)
            .await?;

        if let Err(cause) = self.configure_form(driver, ctx).await {
            return Ok(FlowResult::failed(StepId::Configuring, cause));
        }

        // ========== ④ Submitting: 触发导入 ==========
        audit.record_step(&ctx.unit_name, StepId::Submitting).await?;
        info!("{} 📥 触发导入...", ctx);

        if let Err(cause) = self
            .with_retry(ctx, || {
                driver.click(&self.selectors.import_button, self.submit_timeout)
            })
            .await
        {
            return Ok(FlowResult::failed(StepId::Submitting, cause));
        }

        // ========== ⑤ Confirming: 等待终态横幅 ==========
        audit.record_step(&ctx.unit_name, StepId::Confirming).await?;
        info!("{} ⏳ 等待导入结果 (上限 {:?})...", ctx, self.submit_timeout);

        match driver
            .wait_until(&self.selectors.confirm_banner, self.submit_timeout)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!("{} ⚠️ 等待导入结果超时", ctx);
                return Ok(FlowResult::failed(
                    StepId::Confirming,
                    FailureCause::Timeout {
                        step: StepId::Confirming,
                        waited: self.submit_timeout,
                    },
                ));
            }
            Err(e) => {
                return Ok(FlowResult::failed(StepId::Confirming, classify(e)));
            }
        }

        let confirm_text = match self
            .with_retry(ctx, || {
                driver.read_text(&self.selectors.confirm_banner, self.per_step_timeout)
            })
            .await
        {
            Ok(text) => text,
            Err(cause) => return Ok(FlowResult::failed(StepId::Confirming, cause)),
        };

        if !self.import_success_re.is_match(&confirm_text) {
            warn!("{} ❌ 平台报告导入失败: {}", ctx, confirm_text);
            return Ok(FlowResult::failed(
                StepId::Confirming,
                FailureCause::ValidationRejected {
                    banner: confirm_text,
                },
            ));
        }

        info!("{} ✅ 导入成功: {}", ctx, truncate_text(&confirm_text, 80));

        // 收尾：查看汇总 → 完成，把表单复位给下一个单元。
        // 平台已确认导入，这里失败只影响复位，不降级结果
        self.reset_form(driver, ctx).await;

        Ok(FlowResult::Succeeded)
    }

    /// 表单配置：邮件通知保持关闭
    ///
    /// 先读后写：状态一致时不产生任何 UI 交互，避免触发重新校验。
    /// 复选框缺席（平台某些版本没有）按无事发生处理
    async fn configure_form(
        &self,
        driver: &dyn UiDriver,
        ctx: &UnitCtx,
    ) -> Result<(), FailureCause> {
        let present = match driver
            .wait_until(&self.selectors.email_checkbox, CHECKBOX_PROBE_TIMEOUT)
            .await
        {
            Ok(p) => p,
            Err(e) => return Err(classify(e)),
        };

        if !present {
            info!("{} 未发现邮件通知复选框，跳过配置", ctx);
            return Ok(());
        }

        let checked = self
            .with_retry(ctx, || {
                driver.is_checked(&self.selectors.email_checkbox, self.per_step_timeout)
            })
            .await?;

        if checked {
            self.with_retry(ctx, || {
                driver.set_checked(&self.selectors.email_checkbox, false, self.per_step_timeout)
            })
            .await?;
            info!("{} ✓ 已关闭邮件通知", ctx);
        } else {
            info!("{} 邮件通知已是关闭状态", ctx);
        }

        Ok(())
    }

    /// 成功后的表单复位（查看汇总 → 完成）
    async fn reset_form(&self, driver: &dyn UiDriver, ctx: &UnitCtx) {
        for selector in [
            &self.selectors.view_summary_button,
            &self.selectors.done_button,
        ] {
            if let Err(e) = driver.click(selector, self.per_step_timeout).await {
                warn!("{} ⚠️ 表单复位失败 ({}): {}", ctx, selector, e);
                return;
            }
        }
    }

    /// 带退避的有界重试
    ///
    /// 只重试瞬态故障（元素尚未渲染）；其余错误立即分类返回
    async fn with_retry<T, F, Fut>(&self, ctx: &UnitCtx, op: F) -> Result<T, FailureCause>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(AppError::Ui(e)) if e.is_transient() && attempt < self.max_retry_attempts => {
                    warn!(
                        "{} ⚠️ 第 {}/{} 次尝试失败: {}，退避后重试",
                        ctx, attempt, self.max_retry_attempts, e
                    );
                    sleep(self.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(classify(e)),
            }
        }
    }
}

/// 把驱动错误分类为失败原因
fn classify(err: AppError) -> FailureCause {
    match err {
        AppError::Ui(e) => FailureCause::Ui(e),
        other => FailureCause::Ui(UiInteractionError::ScriptFailed {
            source: Box::new(other),
        }),
    }
}
