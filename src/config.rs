use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 各步骤的元素定位器
///
/// 核心只把它们当作不透明字符串传给驱动；具体语法由驱动绑定决定
/// （PageDriver 交给 document.querySelector，因此默认值是 CSS）。
/// 远端平台改版时只需要改这里
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// 文件上传输入框
    pub file_input: String,
    /// “Validate File” 按钮
    pub validate_button: String,
    /// 校验结果指示区域（可读文本）
    pub validation_result: String,
    /// “See Validation Results” 按钮
    pub see_results_button: String,
    /// “Continue to Options” 按钮
    pub continue_button: String,
    /// 邮件通知复选框
    pub email_checkbox: String,
    /// “Import Now” 按钮
    pub import_button: String,
    /// 导入结果横幅（成功或失败文本）
    pub confirm_banner: String,
    /// “View Summary” 按钮
    pub view_summary_button: String,
    /// “Done” 按钮
    pub done_button: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            file_input: "input#ctl_7[type=file]".to_string(),
            validate_button: "#btn-validate-file".to_string(),
            validation_result: "#validation-result".to_string(),
            see_results_button: "#btn-see-results".to_string(),
            continue_button: "#btn-continue-options".to_string(),
            email_checkbox: "input#z_f[type=checkbox]".to_string(),
            import_button: "#btn-import-now".to_string(),
            confirm_banner: "#import-result".to_string(),
            view_summary_button: "#btn-view-summary".to_string(),
            done_button: "#btn-done".to_string(),
        }
    }
}

impl Selectors {
    /// 检查所有定位器非空（空定位器属于启动期配置错误）
    pub fn validate(&self) -> AppResult<()> {
        let entries = [
            ("file_input", &self.file_input),
            ("validate_button", &self.validate_button),
            ("validation_result", &self.validation_result),
            ("see_results_button", &self.see_results_button),
            ("continue_button", &self.continue_button),
            ("email_checkbox", &self.email_checkbox),
            ("import_button", &self.import_button),
            ("confirm_banner", &self.confirm_banner),
            ("view_summary_button", &self.view_summary_button),
            ("done_button", &self.done_button),
        ];
        for (name, value) in entries {
            if value.trim().is_empty() {
                return Err(AppError::Config(ConfigError::EmptySelector {
                    step: name.to_string(),
                }));
            }
        }
        Ok(())
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口（操作员在该浏览器中手动完成登录）
    pub browser_debug_port: u16,
    /// 平台批量导入页面 URL
    pub platform_url: String,
    /// 原始批量记录文件（设置后先执行分区阶段）
    pub input_csv: Option<String>,
    /// 分区键：course_id（默认）或 instructor_id
    pub partition_key: String,
    /// 单元文件存放目录
    pub unit_folder: String,
    /// 合并批次文件存放目录
    pub batch_folder: String,
    /// 批次过滤子串（设置后在分区阶段生成合并批次文件）
    pub batch_filter: Option<String>,
    /// 单步等待超时（秒）
    pub per_step_timeout_secs: u64,
    /// 导入提交步骤的超时（秒），大文件需要更久
    pub submit_timeout_secs: u64,
    /// 等待轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 瞬态 UI 错误的最大重试次数
    pub max_retry_attempts: u32,
    /// 重试退避基数（毫秒），按尝试次数线性放大
    pub retry_backoff_ms: u64,
    /// 是否交互式恢复（失败时询问操作员）
    pub interactive: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 运行日志文件
    pub output_log_file: String,
    /// 审计流文件（逐条追加的 JSONL）
    pub audit_log_file: String,
    /// 运行汇总报告文件
    pub summary_file: String,
    /// 校验结果中判定通过的文本模式；不匹配即视为平台拒绝
    pub validation_passed_pattern: String,
    /// 确认横幅中判定成功的文本模式；不匹配即视为导入失败
    pub import_success_pattern: String,
    /// 各步骤定位器
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            platform_url: "https://test.example.com/bulk-user-management".to_string(),
            input_csv: None,
            partition_key: "course_id".to_string(),
            unit_folder: "individual_courses".to_string(),
            batch_folder: "batch_courses".to_string(),
            batch_filter: None,
            per_step_timeout_secs: 300,
            submit_timeout_secs: 600,
            poll_interval_ms: 500,
            max_retry_attempts: 3,
            retry_backoff_ms: 2000,
            interactive: true,
            verbose_logging: false,
            output_log_file: "upload_log.txt".to_string(),
            audit_log_file: "audit_log.jsonl".to_string(),
            summary_file: "run_summary.json".to_string(),
            validation_passed_pattern: "(?i)passed|no errors|ready for import".to_string(),
            import_success_pattern: "(?i)success|complete|imported".to_string(),
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            platform_url: std::env::var("PLATFORM_URL").unwrap_or(default.platform_url),
            input_csv: std::env::var("INPUT_CSV").ok(),
            partition_key: std::env::var("PARTITION_KEY").unwrap_or(default.partition_key),
            unit_folder: std::env::var("UNIT_FOLDER").unwrap_or(default.unit_folder),
            batch_folder: std::env::var("BATCH_FOLDER").unwrap_or(default.batch_folder),
            batch_filter: std::env::var("BATCH_FILTER").ok(),
            per_step_timeout_secs: std::env::var("PER_STEP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.per_step_timeout_secs),
            submit_timeout_secs: std::env::var("SUBMIT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.submit_timeout_secs),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_ms),
            max_retry_attempts: std::env::var("MAX_RETRY_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retry_attempts),
            retry_backoff_ms: std::env::var("RETRY_BACKOFF_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_backoff_ms),
            interactive: std::env::var("INTERACTIVE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.interactive),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            audit_log_file: std::env::var("AUDIT_LOG_FILE").unwrap_or(default.audit_log_file),
            summary_file: std::env::var("SUMMARY_FILE").unwrap_or(default.summary_file),
            validation_passed_pattern: std::env::var("VALIDATION_PASSED_PATTERN")
                .unwrap_or(default.validation_passed_pattern),
            import_success_pattern: std::env::var("IMPORT_SUCCESS_PATTERN")
                .unwrap_or(default.import_success_pattern),
            selectors: default.selectors,
        }
    }

    /// 从 TOML 文件加载配置（定位器随平台改版更新时走这里）
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::AppError::file_read_failed(path, e))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 启动期校验：定位器非空、文本模式可编译
    ///
    /// 配置错误在这里就失败，不会进入逐单元处理
    pub fn validate(&self) -> AppResult<()> {
        self.selectors.validate()?;
        regex::Regex::new(&self.validation_passed_pattern).map_err(|e| {
            AppError::Config(ConfigError::InvalidPattern {
                pattern: self.validation_passed_pattern.clone(),
                source: Box::new(e),
            })
        })?;
        regex::Regex::new(&self.import_success_pattern).map_err(|e| {
            AppError::Config(ConfigError::InvalidPattern {
                pattern: self.import_success_pattern.clone(),
                source: Box::new(e),
            })
        })?;
        Ok(())
    }

    pub fn per_step_timeout(&self) -> Duration {
        Duration::from_secs(self.per_step_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
