//! # Bulk Enrollment Upload
//!
//! 一个把批量选课变更记录灌进教务平台手动导入表单的自动化工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `UiDriver` - 远端 UI 交互能力接口，所有等待都有显式上限
//! - `PageDriver` - chromiumoxide 实现，唯一的 page owner
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `RecordPartitioner` - 记录校验、查重、按课程切分单元
//! - `AuditLog` - 追加审计流、落盘运行汇总
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个单元"的完整导入流程
//! - `UnitCtx` - 上下文封装（单元名 + 序号 + 文件路径）
//! - `UploadFlow` - 状态机（上传 → 校验 → 配置 → 提交 → 确认）
//! - `RecoveryPolicy` - 失败处置策略（交互式 / 无人值守可替换）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/run_coordinator` - 运行协调器，独占会话、
//!   顺序调度、汇总审计
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::{Config, Selectors};
pub use error::{AppError, AppResult};
pub use infrastructure::{PageDriver, UiDriver};
pub use models::{ChangeRecord, OutcomeStatus, RunSummary, StepId, Unit, UploadOutcome};
pub use orchestrator::{run_uploads, RunCoordinator, UnitSource};
pub use workflow::{FlowResult, RecoveryDecision, RecoveryPolicy, UnitCtx, UploadFlow};
