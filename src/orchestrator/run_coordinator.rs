//! 运行协调器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次完整运行的调度与审计。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、建立浏览器会话、创建驱动
//! 2. **单元枚举**：目录扫描（按文件名排序）或显式文件列表
//! 3. **顺序处理**：独占会话，一次只把一个单元交给状态机
//! 4. **失败裁决**：咨询注入的恢复策略（重试/跳过/保留/中止）
//! 5. **审计收尾**：无论运行如何结束，RunSummary 必定落盘

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{PageDriver, UiDriver};
use crate::models::loaders::{load_unit_file, scan_unit_folder};
use crate::models::outcome::{OutcomeStatus, RunSummary, StepId, UploadOutcome};
use crate::services::AuditLog;
use crate::utils::logging::{
    init_log_file, log_startup, log_unit_start, log_units_loaded, print_final_stats,
};
use crate::workflow::{
    AutoRecovery, FlowResult, PromptRecovery, RecoveryDecision, RecoveryPolicy, UnitCtx,
    UploadFlow,
};

/// 本次运行的单元来源
pub enum UnitSource {
    /// 目录下的全部单元文件（按文件名排序）
    Folder(String),
    /// 显式文件列表（比如一个批次文件），按给定顺序
    Files(Vec<PathBuf>),
}

/// 运行协调器
///
/// 独占持有浏览器会话；RunSummary 和全部 UploadOutcome 归它所有
pub struct RunCoordinator {
    config: Config,
    _browser: Option<Browser>,
    driver: Arc<dyn UiDriver>,
    policy: Arc<dyn RecoveryPolicy>,
    flow: UploadFlow,
    audit: AuditLog,
}

impl RunCoordinator {
    /// 初始化应用：建立浏览器会话并按配置选择恢复策略
    pub async fn initialize(config: Config) -> Result<Self> {
        // 配置错误在这里就失败，不进入逐单元处理
        config.validate().context("配置校验失败")?;

        init_log_file(&config.output_log_file)?;
        log_startup(&config.platform_url, config.interactive);

        // 连接浏览器（操作员已在其中手动登录）
        let (browser, page) =
            browser::connect_to_browser_and_page(config.browser_debug_port, &config.platform_url)
                .await
                .context("无法建立浏览器会话")?;

        let driver: Arc<dyn UiDriver> =
            Arc::new(PageDriver::new(page, config.poll_interval()));
        let policy: Arc<dyn RecoveryPolicy> = if config.interactive {
            Arc::new(PromptRecovery)
        } else {
            Arc::new(AutoRecovery::new(config.max_retry_attempts))
        };

        let mut coordinator = Self::with_driver(config, driver, policy)?;
        coordinator._browser = Some(browser);
        Ok(coordinator)
    }

    /// 用注入的驱动和策略构造（测试与无浏览器场景）
    pub fn with_driver(
        config: Config,
        driver: Arc<dyn UiDriver>,
        policy: Arc<dyn RecoveryPolicy>,
    ) -> Result<Self> {
        config.validate().context("配置校验失败")?;
        let flow = UploadFlow::new(&config)?;
        let audit = AuditLog::new(config.audit_log_file.clone(), config.summary_file.clone());
        Ok(Self {
            config,
            _browser: None,
            driver,
            policy,
            flow,
            audit,
        })
    }

    /// 运行主逻辑：逐个单元处理并汇总
    ///
    /// 汇总报告在所有退出路径上都会落盘，包括运行级错误
    pub async fn run(&self, source: UnitSource) -> Result<RunSummary> {
        let unit_files = self.enumerate(source).await?;

        if unit_files.is_empty() {
            warn!("⚠️ 没有找到待上传的单元文件，程序结束");
        } else {
            log_units_loaded(unit_files.len());
        }

        let mut summary = RunSummary::new();
        let result = self.process_units(&unit_files, &mut summary).await;

        summary.finalize();
        if let Err(e) = self.audit.write_summary(&summary) {
            // 落盘失败只剩日志可用，尽量留痕
            error!("❌ 汇总报告落盘失败: {}", e);
        }
        print_final_stats(&summary, &self.config.output_log_file);

        result.map(|_| summary)
    }

    /// 枚举单元文件
    async fn enumerate(&self, source: UnitSource) -> Result<Vec<PathBuf>> {
        match source {
            UnitSource::Folder(folder) => {
                info!("\n📁 正在扫描待上传的单元文件: {}", folder);
                scan_unit_folder(&folder).await
            }
            UnitSource::Files(files) => Ok(files),
        }
    }

    /// 顺序处理全部单元
    async fn process_units(
        &self,
        unit_files: &[PathBuf],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let total = unit_files.len();
        let mut aborted = false;

        for (index, path) in unit_files.iter().enumerate() {
            let unit_index = index + 1;
            let unit_name = path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let ctx = UnitCtx::new(unit_name.clone(), unit_index, total, path.clone());

            // 中止只发生在单元边界：剩余单元原样记为 ABORTED
            if aborted {
                let outcome = UploadOutcome::new(
                    unit_name.clone(),
                    OutcomeStatus::Aborted,
                    StepId::Pending,
                    "运行已中止，未处理",
                );
                self.audit.record_outcome(&outcome).await?;
                summary.push(outcome);
                continue;
            }

            log_unit_start(unit_index, total, &unit_name);

            // 编排期才发现的坏单元文件只算该单元的故障，运行继续
            match load_unit_file(path).await {
                Ok(unit) => {
                    info!("{} 共 {} 条变更记录", ctx, unit.records.len());
                }
                Err(e) => {
                    warn!("{} ⚠️ 单元文件无法解析，跳过: {:#}", ctx, e);
                    let outcome = UploadOutcome::new(
                        unit_name.clone(),
                        OutcomeStatus::Skipped,
                        StepId::Pending,
                        format!("单元文件无法解析: {:#}", e),
                    );
                    self.audit.record_outcome(&outcome).await?;
                    summary.push(outcome);
                    continue;
                }
            }

            let outcome = self.process_unit(&ctx, &mut aborted).await?;
            self.audit.record_outcome(&outcome).await?;
            summary.push(outcome);
        }

        Ok(())
    }

    /// 处理单个单元直到得到终态结果
    ///
    /// 状态机每失败一次就咨询一次恢复策略；重试从 Pending 整体重跑
    async fn process_unit(&self, ctx: &UnitCtx, aborted: &mut bool) -> Result<UploadOutcome> {
        let mut attempt: u32 = 1;

        loop {
            match self.flow.run(self.driver.as_ref(), ctx, &self.audit).await? {
                FlowResult::Succeeded => {
                    info!("{} ✅ 单元处理完成\n", ctx);
                    return Ok(UploadOutcome::new(
                        ctx.unit_name.clone(),
                        OutcomeStatus::Success,
                        StepId::Confirming,
                        "导入成功",
                    ));
                }
                FlowResult::Failed { step, cause } => {
                    error!("{} ❌ 在 {} 步骤失败: {}", ctx, step, cause);

                    match self.policy.decide(ctx, step, &cause, attempt).await {
                        RecoveryDecision::Retry => {
                            attempt += 1;
                            info!("{} 🔁 从头重跑（第 {} 次尝试）", ctx, attempt);
                        }
                        RecoveryDecision::Skip => {
                            return Ok(UploadOutcome::new(
                                ctx.unit_name.clone(),
                                OutcomeStatus::Skipped,
                                step,
                                format!("操作员跳过: {}", cause),
                            ));
                        }
                        RecoveryDecision::Keep => {
                            return Ok(UploadOutcome::new(
                                ctx.unit_name.clone(),
                                cause.status(),
                                step,
                                cause.to_string(),
                            ));
                        }
                        RecoveryDecision::Abort => {
                            warn!("{} 🛑 操作员选择中止运行", ctx);
                            *aborted = true;
                            return Ok(UploadOutcome::new(
                                ctx.unit_name.clone(),
                                cause.status(),
                                step,
                                cause.to_string(),
                            ));
                        }
                    }
                }
            }
        }
    }
}

/// 命令面入口：对给定单元来源执行一次完整上传运行
///
/// 驱动与恢复策略由调用方注入，同一套核心既能值守跑也能无人跑
pub async fn run_uploads(
    source: UnitSource,
    config: Config,
    driver: Arc<dyn UiDriver>,
    policy: Arc<dyn RecoveryPolicy>,
) -> Result<RunSummary> {
    let coordinator = RunCoordinator::with_driver(config, driver, policy)?;
    coordinator.run(source).await
}
