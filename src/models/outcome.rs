use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::UiInteractionError;

/// 状态机步骤标识
///
/// 失败结果会携带出错时所处的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepId {
    /// 尚未开始
    Pending,
    /// 附加上传文件
    Uploading,
    /// 平台校验
    Validating,
    /// 表单配置
    Configuring,
    /// 发起导入
    Submitting,
    /// 等待确认结果
    Confirming,
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepId::Pending => "Pending",
            StepId::Uploading => "Uploading",
            StepId::Validating => "Validating",
            StepId::Configuring => "Configuring",
            StepId::Submitting => "Submitting",
            StepId::Confirming => "Confirming",
        };
        write!(f, "{}", name)
    }
}

/// 单元处理失败的分类原因
///
/// 区分"平台说数据不对"（ValidationRejected，不自动重试）
/// 和"UI 没响应"（Ui / Timeout，可在界内重试）
#[derive(Debug)]
pub enum FailureCause {
    /// UI 交互故障（元素缺失、脚本失败）
    Ui(UiInteractionError),
    /// 有界等待超时
    Timeout { step: StepId, waited: Duration },
    /// 平台判定数据无效，横幅文本原样保留
    ValidationRejected { banner: String },
}

impl FailureCause {
    /// 映射为结果状态
    pub fn status(&self) -> OutcomeStatus {
        match self {
            FailureCause::Ui(_) => OutcomeStatus::UiError,
            FailureCause::Timeout { .. } => OutcomeStatus::Timeout,
            FailureCause::ValidationRejected { .. } => OutcomeStatus::ValidationFailed,
        }
    }

    /// 是否允许自动重试
    ///
    /// 平台拒绝说明根因在数据而不是时序，必须由操作员裁决
    pub fn is_auto_retryable(&self) -> bool {
        !matches!(self, FailureCause::ValidationRejected { .. })
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCause::Ui(e) => write!(f, "{}", e),
            FailureCause::Timeout { step, waited } => {
                write!(f, "{} 步骤等待超时 ({:?})", step, waited)
            }
            // 平台反馈原样透出
            FailureCause::ValidationRejected { banner } => write!(f, "{}", banner),
        }
    }
}

/// 单元处理的终态分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// 成功导入
    Success,
    /// 平台校验拒绝
    ValidationFailed,
    /// 等待超时
    Timeout,
    /// UI 交互故障
    UiError,
    /// 操作员选择跳过
    Skipped,
    /// 运行中止，未处理
    Aborted,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutcomeStatus::Success => "SUCCESS",
            OutcomeStatus::ValidationFailed => "VALIDATION_FAILED",
            OutcomeStatus::Timeout => "TIMEOUT",
            OutcomeStatus::UiError => "UI_ERROR",
            OutcomeStatus::Skipped => "SKIPPED",
            OutcomeStatus::Aborted => "ABORTED",
        };
        write!(f, "{}", name)
    }
}

/// 一个单元的处理结果，记录后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// 单元名
    pub unit: String,
    /// 终态分类
    pub status: OutcomeStatus,
    /// 到达的步骤
    pub step_reached: StepId,
    /// 说明文本（平台横幅原文或错误描述）
    pub message: String,
    /// 记录时间
    pub timestamp: String,
}

impl UploadOutcome {
    pub fn new(
        unit: impl Into<String>,
        status: OutcomeStatus,
        step_reached: StepId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            unit: unit.into(),
            status,
            step_reached,
            message: message.into(),
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// 按状态的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: usize,
    pub validation_failed: usize,
    pub timeout: usize,
    pub ui_error: usize,
    pub skipped: usize,
    pub aborted: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Success => self.success += 1,
            OutcomeStatus::ValidationFailed => self.validation_failed += 1,
            OutcomeStatus::Timeout => self.timeout += 1,
            OutcomeStatus::UiError => self.ui_error += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Aborted => self.aborted += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success
            + self.validation_failed
            + self.timeout
            + self.ui_error
            + self.skipped
            + self.aborted
    }
}

/// 整个运行的审计汇总
///
/// 运行开始时创建，结束时定稿；无论运行如何终止都要落盘
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// 运行开始时间
    pub started_at: String,
    /// 运行结束时间（定稿时填充）
    pub finished_at: Option<String>,
    /// 按状态的计数
    pub counts: StatusCounts,
    /// 按处理顺序排列的全部结果
    pub outcomes: Vec<UploadOutcome>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            started_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            finished_at: None,
            counts: StatusCounts::default(),
            outcomes: Vec::new(),
        }
    }

    /// 追加一个结果（只增不改）
    pub fn push(&mut self, outcome: UploadOutcome) {
        self.counts.record(outcome.status);
        self.outcomes.push(outcome);
    }

    /// 定稿：填充结束时间
    pub fn finalize(&mut self) {
        self.finished_at =
            Some(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// 是否有单元以失败或中止收场
    pub fn has_failures(&self) -> bool {
        self.counts.validation_failed > 0
            || self.counts.timeout > 0
            || self.counts.ui_error > 0
            || self.counts.aborted > 0
    }

    /// 进程退出码：全部 SUCCESS/SKIPPED 为 0，否则非零
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}
