//! 审计流写入服务 - 业务能力层
//!
//! 合规审查的事实来源：逐条追加的步骤/结果事件流（JSONL），
//! 以及运行结束时落盘的结构化汇总报告。
//! 只追加，不回改；每个被尝试过的单元都必须留下记录

use std::fs::OpenOptions;
use std::io::Write;

use serde_json::json;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::outcome::{RunSummary, StepId, UploadOutcome};

/// 审计流写入服务
///
/// 职责：
/// - 把步骤转移和单元结果追加到审计文件
/// - 把 RunSummary 写成 JSON 报告
/// - 不关心流程顺序
pub struct AuditLog {
    audit_file_path: String,
    summary_file_path: String,
}

impl AuditLog {
    pub fn new(audit_file_path: impl Into<String>, summary_file_path: impl Into<String>) -> Self {
        Self {
            audit_file_path: audit_file_path.into(),
            summary_file_path: summary_file_path.into(),
        }
    }

    /// 记录一次状态机步骤转移
    pub async fn record_step(&self, unit: &str, step: StepId) -> AppResult<()> {
        debug!("审计: 单元 {} 进入 {} 步骤", unit, step);
        self.append(json!({
            "timestamp": now(),
            "event": "step",
            "unit": unit,
            "step": step.to_string(),
        }))
    }

    /// 记录一个单元的终态结果
    pub async fn record_outcome(&self, outcome: &UploadOutcome) -> AppResult<()> {
        debug!(
            "审计: 单元 {} 终态 {} (步骤: {})",
            outcome.unit, outcome.status, outcome.step_reached
        );
        self.append(json!({
            "timestamp": outcome.timestamp,
            "event": "outcome",
            "unit": outcome.unit,
            "status": outcome.status.to_string(),
            "step_reached": outcome.step_reached.to_string(),
            "message": outcome.message,
        }))
    }

    /// 落盘运行汇总报告
    ///
    /// 无论运行如何结束都要调用；这是合规审查要求的审计记录
    pub fn write_summary(&self, summary: &RunSummary) -> AppResult<()> {
        let content = serde_json::to_string_pretty(summary)?;
        std::fs::write(&self.summary_file_path, content)
            .map_err(|e| AppError::file_write_failed(&self.summary_file_path, e))?;
        Ok(())
    }

    fn append(&self, event: serde_json::Value) -> AppResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_file_path)
            .map_err(|e| AppError::file_write_failed(&self.audit_file_path, e))?;

        writeln!(file, "{}", event)
            .map_err(|e| AppError::file_write_failed(&self.audit_file_path, e))?;

        Ok(())
    }
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
