//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整个运行的调度，是系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `run_coordinator` - 运行协调器
//! - 管理应用生命周期（初始化、运行、收尾）
//! - 枚举单元文件（目录或显式列表），顺序确定
//! - 独占持有浏览器会话，一次只交给一个流程调用
//! - 失败时咨询恢复策略（重试/跳过/保留/中止）
//! - 汇总全部结果，运行结束必定落盘 RunSummary
//!
//! ## 层次关系
//!
//! ```text
//! run_coordinator (处理 Vec<单元文件>)
//!     ↓
//! workflow::UploadFlow (处理单个 Unit 的状态机)
//!     ↓
//! services (能力层：partitioner / audit_log)
//!     ↓
//! infrastructure (基础设施：UiDriver / PageDriver)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单会话顺序**：远端表单不支持并发的多步交互，绝不并行
//! 2. **单元隔离**：单个单元的故障不影响运行；会话/配置故障立即中止
//! 3. **审计完整**：每个被尝试的单元必有结果记录，计数总和等于单元数
//! 4. **只在边界中止**：中止只发生在单元之间，不打断进行中的步骤

pub mod run_coordinator;

// 重新导出主要类型
pub use run_coordinator::{run_uploads, RunCoordinator, UnitSource};
