//! 用脚本化桩驱动跑完整的上传运行
//!
//! 不碰真实浏览器：桩按单元名决定每一步的反应，
//! 用来验证状态机分类、恢复策略和审计完整性

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use bulk_enrollment_upload::config::{Config, Selectors};
use bulk_enrollment_upload::error::{AppError, AppResult, UiOp};
use bulk_enrollment_upload::infrastructure::UiDriver;
use bulk_enrollment_upload::models::outcome::{FailureCause, OutcomeStatus, StepId};
use bulk_enrollment_upload::orchestrator::{run_uploads, UnitSource};
use bulk_enrollment_upload::services::AuditLog;
use bulk_enrollment_upload::workflow::{
    AutoRecovery, RecoveryDecision, RecoveryPolicy, UnitCtx, UploadFlow,
};

/// 桩驱动对一个单元的反应脚本
#[derive(Debug, Clone)]
enum Behavior {
    /// 每一步都顺利
    Succeed,
    /// 平台校验拒绝，横幅原文如下
    RejectValidation(String),
    /// 校验结果指示永远不出现
    NeverShowValidationResult,
    /// 导入结果横幅报错
    RejectAtConfirm(String),
    /// 校验按钮前几次点击时元素尚未渲染
    FlakyValidateClick(u32),
}

#[derive(Default)]
struct StubState {
    current_unit: String,
    email_checked: bool,
    checkbox_mutations: usize,
    flaky_remaining: HashMap<String, u32>,
    click_log: Vec<String>,
}

/// 脚本化桩驱动
struct StubDriver {
    selectors: Selectors,
    behaviors: HashMap<String, Behavior>,
    state: Mutex<StubState>,
}

impl StubDriver {
    fn new(selectors: Selectors, behaviors: HashMap<String, Behavior>) -> Self {
        let mut flaky_remaining = HashMap::new();
        for (unit, behavior) in &behaviors {
            if let Behavior::FlakyValidateClick(n) = behavior {
                flaky_remaining.insert(unit.clone(), *n);
            }
        }
        Self {
            selectors,
            behaviors,
            state: Mutex::new(StubState {
                email_checked: true,
                flaky_remaining,
                ..StubState::default()
            }),
        }
    }

    fn behavior_of(&self, unit: &str) -> Behavior {
        self.behaviors
            .get(unit)
            .cloned()
            .unwrap_or(Behavior::Succeed)
    }

    fn checkbox_mutations(&self) -> usize {
        self.state.lock().unwrap().checkbox_mutations
    }
}

#[async_trait]
impl UiDriver for StubDriver {
    async fn goto(&self, _url: &str) -> AppResult<()> {
        Ok(())
    }

    async fn set_file_input(
        &self,
        _selector: &str,
        file_path: &Path,
        _timeout: Duration,
    ) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.current_unit = file_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Ok(())
    }

    async fn click(&self, selector: &str, _timeout: Duration) -> AppResult<()> {
        let unit = {
            let mut state = self.state.lock().unwrap();
            state.click_log.push(selector.to_string());
            state.current_unit.clone()
        };

        if selector == self.selectors.validate_button {
            if let Behavior::FlakyValidateClick(_) = self.behavior_of(&unit) {
                let mut state = self.state.lock().unwrap();
                let remaining = state.flaky_remaining.entry(unit).or_insert(0);
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AppError::element_not_found(
                        selector,
                        UiOp::Click,
                        Duration::from_millis(1),
                    ));
                }
            }
        }
        Ok(())
    }

    async fn is_checked(&self, _selector: &str, _timeout: Duration) -> AppResult<bool> {
        Ok(self.state.lock().unwrap().email_checked)
    }

    async fn set_checked(
        &self,
        _selector: &str,
        desired: bool,
        _timeout: Duration,
    ) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        // 真实驱动先读后写；状态一致时不产生 UI 交互
        if state.email_checked != desired {
            state.email_checked = desired;
            state.checkbox_mutations += 1;
        }
        Ok(())
    }

    async fn read_text(&self, selector: &str, _timeout: Duration) -> AppResult<String> {
        let unit = self.state.lock().unwrap().current_unit.clone();
        if selector == self.selectors.validation_result {
            return Ok(match self.behavior_of(&unit) {
                Behavior::RejectValidation(banner) => banner,
                _ => "Validation passed. 12 records ready for import.".to_string(),
            });
        }
        if selector == self.selectors.confirm_banner {
            return Ok(match self.behavior_of(&unit) {
                Behavior::RejectAtConfirm(banner) => banner,
                _ => "Import complete. 12 records processed.".to_string(),
            });
        }
        Ok(String::new())
    }

    async fn wait_until(&self, selector: &str, _timeout: Duration) -> AppResult<bool> {
        let unit = self.state.lock().unwrap().current_unit.clone();
        if selector == self.selectors.validation_result {
            if let Behavior::NeverShowValidationResult = self.behavior_of(&unit) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// 操作员脚本：单元失败时直接中止
struct AbortOnFailure;

#[async_trait]
impl RecoveryPolicy for AbortOnFailure {
    async fn decide(
        &self,
        _ctx: &UnitCtx,
        _step: StepId,
        _cause: &FailureCause,
        _attempt: u32,
    ) -> RecoveryDecision {
        RecoveryDecision::Abort
    }
}

/// 操作员脚本：单元失败时选择跳过
struct SkipOnFailure;

#[async_trait]
impl RecoveryPolicy for SkipOnFailure {
    async fn decide(
        &self,
        _ctx: &UnitCtx,
        _step: StepId,
        _cause: &FailureCause,
        _attempt: u32,
    ) -> RecoveryDecision {
        RecoveryDecision::Skip
    }
}

fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.unit_folder = dir.join("units").to_string_lossy().to_string();
    config.audit_log_file = dir.join("audit.jsonl").to_string_lossy().to_string();
    config.summary_file = dir.join("summary.json").to_string_lossy().to_string();
    config.per_step_timeout_secs = 1;
    config.submit_timeout_secs = 1;
    config.poll_interval_ms = 10;
    config.retry_backoff_ms = 1;
    config.interactive = false;
    config
}

fn write_unit_file(config: &Config, name: &str) {
    let folder = PathBuf::from(&config.unit_folder);
    std::fs::create_dir_all(&folder).expect("创建单元目录失败");
    let content = format!(
        "ACTION,USER_NAME,INSTRUCTOR_ID,COURSE_ID\nDROP,jdoe,T100,{name}\nADD,asmith,T100,{name}\n"
    );
    std::fs::write(folder.join(format!("{name}.csv")), content).expect("写入单元文件失败");
}

fn stub(config: &Config, behaviors: HashMap<String, Behavior>) -> Arc<StubDriver> {
    Arc::new(StubDriver::new(config.selectors.clone(), behaviors))
}

#[tokio::test]
async fn happy_path_three_units_all_succeed() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    for name in ["C101", "C102", "C103"] {
        write_unit_file(&config, name);
    }

    let driver = stub(&config, HashMap::new());
    let policy = Arc::new(AutoRecovery::new(config.max_retry_attempts));
    let summary = run_uploads(
        UnitSource::Folder(config.unit_folder.clone()),
        config.clone(),
        driver,
        policy,
    )
    .await
    .expect("运行失败");

    assert_eq!(summary.len(), 3);
    assert_eq!(summary.counts.success, 3);
    assert_eq!(summary.counts.total(), 3);
    assert!(!summary.has_failures());
    assert_eq!(summary.exit_code(), 0);
    assert!(summary.finished_at.is_some());

    // 审计流里有步骤转移和结果记录
    let audit = std::fs::read_to_string(&config.audit_log_file).expect("审计文件缺失");
    assert!(audit.lines().count() >= 3 * 6);
}

#[tokio::test]
async fn rejected_validation_preserves_platform_banner_and_continues() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    for name in ["C101", "C102", "C103"] {
        write_unit_file(&config, name);
    }

    let mut behaviors = HashMap::new();
    behaviors.insert(
        "C102".to_string(),
        Behavior::RejectValidation("Row 4: unknown course".to_string()),
    );
    let driver = stub(&config, behaviors);
    let policy = Arc::new(AutoRecovery::new(config.max_retry_attempts));
    let summary = run_uploads(
        UnitSource::Folder(config.unit_folder.clone()),
        config.clone(),
        driver,
        policy,
    )
    .await
    .expect("运行失败");

    // 单元 2 失败不影响单元 1 和 3
    assert_eq!(summary.len(), 3);
    assert_eq!(summary.counts.success, 2);
    assert_eq!(summary.counts.validation_failed, 1);

    let failed = &summary.outcomes[1];
    assert_eq!(failed.unit, "C102");
    assert_eq!(failed.status, OutcomeStatus::ValidationFailed);
    assert_eq!(failed.step_reached, StepId::Validating);
    // 平台横幅原文必须原样保留
    assert_eq!(failed.message, "Row 4: unknown course");

    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn never_satisfied_wait_reaches_timeout_outcome() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    write_unit_file(&config, "C101");

    let mut behaviors = HashMap::new();
    behaviors.insert("C101".to_string(), Behavior::NeverShowValidationResult);
    let driver = stub(&config, behaviors);
    let policy = Arc::new(AutoRecovery::new(config.max_retry_attempts));

    // 必须在有界时间内收敛为 Timeout，绝不挂起
    let summary = tokio::time::timeout(
        Duration::from_secs(30),
        run_uploads(
            UnitSource::Folder(config.unit_folder.clone()),
            config.clone(),
            driver,
            policy,
        ),
    )
    .await
    .expect("运行挂起未收敛")
    .expect("运行失败");

    assert_eq!(summary.len(), 1);
    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Timeout);
    assert_eq!(summary.outcomes[0].step_reached, StepId::Validating);
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn operator_abort_marks_remaining_units_aborted() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    for name in ["C101", "C102", "C103"] {
        write_unit_file(&config, name);
    }

    let mut behaviors = HashMap::new();
    behaviors.insert(
        "C102".to_string(),
        Behavior::RejectValidation("Row 4: unknown course".to_string()),
    );
    let driver = stub(&config, behaviors);
    let summary = run_uploads(
        UnitSource::Folder(config.unit_folder.clone()),
        config.clone(),
        driver,
        Arc::new(AbortOnFailure),
    )
    .await
    .expect("运行失败");

    // 中止后汇总仍然完整：3 个单元 3 条结果
    assert_eq!(summary.len(), 3);
    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Success);
    assert_eq!(summary.outcomes[1].status, OutcomeStatus::ValidationFailed);
    assert_eq!(summary.outcomes[2].status, OutcomeStatus::Aborted);
    assert_eq!(summary.outcomes[2].step_reached, StepId::Pending);
    assert_eq!(summary.counts.total(), 3);
    assert_eq!(summary.exit_code(), 1);

    // 汇总报告已落盘
    let persisted = std::fs::read_to_string(&config.summary_file).expect("汇总报告缺失");
    let parsed: bulk_enrollment_upload::RunSummary =
        serde_json::from_str(&persisted).expect("汇总报告应是合法 JSON");
    assert_eq!(parsed.len(), 3);
}

#[tokio::test]
async fn operator_skip_records_skipped_outcome() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    for name in ["C101", "C102"] {
        write_unit_file(&config, name);
    }

    let mut behaviors = HashMap::new();
    behaviors.insert(
        "C101".to_string(),
        Behavior::RejectValidation("Row 2: user not enrolled".to_string()),
    );
    let driver = stub(&config, behaviors);
    let summary = run_uploads(
        UnitSource::Folder(config.unit_folder.clone()),
        config.clone(),
        driver,
        Arc::new(SkipOnFailure),
    )
    .await
    .expect("运行失败");

    assert_eq!(summary.len(), 2);
    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Skipped);
    // 跳过的单元也要保留原因
    assert!(summary.outcomes[0].message.contains("Row 2: user not enrolled"));
    assert_eq!(summary.outcomes[1].status, OutcomeStatus::Success);
    // 全部 SUCCESS/SKIPPED 时退出码为 0
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn transient_click_failures_are_retried_within_bounds() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    write_unit_file(&config, "C101");

    let mut behaviors = HashMap::new();
    // 前两次点击时元素尚未渲染，第三次成功；重试预算是 3
    behaviors.insert("C101".to_string(), Behavior::FlakyValidateClick(2));
    let driver = stub(&config, behaviors);
    let policy = Arc::new(AutoRecovery::new(config.max_retry_attempts));
    let summary = run_uploads(
        UnitSource::Folder(config.unit_folder.clone()),
        config.clone(),
        driver,
        policy,
    )
    .await
    .expect("运行失败");

    assert_eq!(summary.len(), 1);
    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Success);
}

#[tokio::test]
async fn malformed_unit_file_is_skipped_and_run_continues() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    write_unit_file(&config, "C101");
    // C100 排序在前，列名完全不对
    let folder = PathBuf::from(&config.unit_folder);
    std::fs::write(folder.join("C100.csv"), "WHO,WHAT\njdoe,ADD\n").expect("写入失败");

    let driver = stub(&config, HashMap::new());
    let policy = Arc::new(AutoRecovery::new(config.max_retry_attempts));
    let summary = run_uploads(
        UnitSource::Folder(config.unit_folder.clone()),
        config.clone(),
        driver,
        policy,
    )
    .await
    .expect("运行失败");

    assert_eq!(summary.len(), 2);
    assert_eq!(summary.outcomes[0].unit, "C100");
    assert_eq!(summary.outcomes[0].status, OutcomeStatus::Skipped);
    assert_eq!(summary.outcomes[0].step_reached, StepId::Pending);
    assert_eq!(summary.outcomes[1].status, OutcomeStatus::Success);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn configuring_twice_performs_no_second_mutation() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    write_unit_file(&config, "C101");

    let driver = stub(&config, HashMap::new());
    let flow = UploadFlow::new(&config).expect("创建流程失败");
    let audit = AuditLog::new(config.audit_log_file.clone(), config.summary_file.clone());
    let ctx = UnitCtx::new(
        "C101".to_string(),
        1,
        1,
        PathBuf::from(&config.unit_folder).join("C101.csv"),
    );

    // 第一遍：复选框初始为勾选，配置步骤把它关掉（一次变更）
    flow.run(driver.as_ref(), &ctx, &audit)
        .await
        .expect("第一遍流程失败");
    assert_eq!(driver.checkbox_mutations(), 1);

    // 第二遍：会话状态未变，配置步骤先读后写，不应产生新的变更
    flow.run(driver.as_ref(), &ctx, &audit)
        .await
        .expect("第二遍流程失败");
    assert_eq!(driver.checkbox_mutations(), 1);
}

#[tokio::test]
async fn import_error_banner_is_classified_at_confirming() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = test_config(dir.path());
    write_unit_file(&config, "C101");

    let mut behaviors = HashMap::new();
    behaviors.insert(
        "C101".to_string(),
        Behavior::RejectAtConfirm("Import failed: 3 records could not be processed".to_string()),
    );
    let driver = stub(&config, behaviors);
    let policy = Arc::new(AutoRecovery::new(config.max_retry_attempts));
    let summary = run_uploads(
        UnitSource::Folder(config.unit_folder.clone()),
        config.clone(),
        driver,
        policy,
    )
    .await
    .expect("运行失败");

    assert_eq!(summary.len(), 1);
    assert_eq!(summary.outcomes[0].status, OutcomeStatus::ValidationFailed);
    assert_eq!(summary.outcomes[0].step_reached, StepId::Confirming);
    assert!(summary.outcomes[0]
        .message
        .contains("Import failed: 3 records could not be processed"));
}
