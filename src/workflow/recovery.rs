//! 失败恢复决策 - 策略注入
//!
//! 状态机只负责把失败分类上交；"接下来怎么办"是可替换的策略：
//! - 交互式运行问操作员（PromptRecovery）
//! - 无人值守运行按固定规则走（AutoRecovery）
//!
//! 同一套核心因此既能值守跑也能无人跑

use std::io::Write;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::outcome::{FailureCause, StepId};
use crate::workflow::unit_ctx::UnitCtx;

/// 单元失败后的处置决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// 从 Pending 重跑这个单元
    Retry,
    /// 跳过：结果记为 SKIPPED，继续后面的单元
    Skip,
    /// 保留失败分类（VALIDATION_FAILED / TIMEOUT / UI_ERROR），继续后面的单元
    Keep,
    /// 中止：剩余未处理单元全部记为 ABORTED
    Abort,
}

/// 恢复策略
///
/// `attempt` 是该单元已完整跑过的次数（从 1 开始）
#[async_trait]
pub trait RecoveryPolicy: Send + Sync {
    async fn decide(
        &self,
        ctx: &UnitCtx,
        step: StepId,
        cause: &FailureCause,
        attempt: u32,
    ) -> RecoveryDecision;
}

/// 交互式恢复：把分类原因和平台原文摆给操作员，由人裁决
pub struct PromptRecovery;

#[async_trait]
impl RecoveryPolicy for PromptRecovery {
    async fn decide(
        &self,
        ctx: &UnitCtx,
        step: StepId,
        cause: &FailureCause,
        _attempt: u32,
    ) -> RecoveryDecision {
        println!();
        println!("{}", "─".repeat(60));
        println!("{} 在 {} 步骤失败", ctx, step);
        println!("原因: {}", cause);
        println!("{}", "─".repeat(60));

        loop {
            print!("如何处置? [r]重试 / [s]跳过 / [k]记为失败并继续 / [a]中止运行: ");
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).is_err() {
                // 没有可用的标准输入（比如被重定向关闭），按中止处理
                warn!("标准输入不可用，按中止处理");
                return RecoveryDecision::Abort;
            }

            match line.trim().to_ascii_lowercase().as_str() {
                "r" => return RecoveryDecision::Retry,
                "s" => return RecoveryDecision::Skip,
                "k" => return RecoveryDecision::Keep,
                "a" => return RecoveryDecision::Abort,
                other => println!("无法识别: '{}'，请输入 r / s / k / a", other),
            }
        }
    }
}

/// 无人值守恢复：瞬态故障在预算内重试，然后记为失败继续；
/// 平台拒绝绝不重试——同一份数据重跑只会得到同一个拒绝
pub struct AutoRecovery {
    max_unit_attempts: u32,
}

impl AutoRecovery {
    pub fn new(max_unit_attempts: u32) -> Self {
        Self { max_unit_attempts }
    }
}

#[async_trait]
impl RecoveryPolicy for AutoRecovery {
    async fn decide(
        &self,
        ctx: &UnitCtx,
        _step: StepId,
        cause: &FailureCause,
        attempt: u32,
    ) -> RecoveryDecision {
        if cause.is_auto_retryable() && attempt < self.max_unit_attempts {
            info!(
                "{} 自动重试 ({}/{})",
                ctx,
                attempt + 1,
                self.max_unit_attempts
            );
            RecoveryDecision::Retry
        } else {
            RecoveryDecision::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn ctx() -> UnitCtx {
        UnitCtx::new("C1".to_string(), 1, 1, PathBuf::from("C1.csv"))
    }

    #[tokio::test]
    async fn auto_recovery_retries_transient_then_keeps() {
        let policy = AutoRecovery::new(3);
        let cause = FailureCause::Timeout {
            step: StepId::Validating,
            waited: Duration::from_secs(1),
        };
        assert_eq!(
            policy.decide(&ctx(), StepId::Validating, &cause, 1).await,
            RecoveryDecision::Retry
        );
        assert_eq!(
            policy.decide(&ctx(), StepId::Validating, &cause, 3).await,
            RecoveryDecision::Keep
        );
    }

    #[tokio::test]
    async fn auto_recovery_never_retries_platform_rejection() {
        let policy = AutoRecovery::new(3);
        let cause = FailureCause::ValidationRejected {
            banner: "Row 4: unknown course".to_string(),
        };
        assert_eq!(
            policy.decide(&ctx(), StepId::Validating, &cause, 1).await,
            RecoveryDecision::Keep
        );
    }
}
