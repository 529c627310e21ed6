use std::fmt;
use std::time::Duration;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 浏览器会话错误（运行级，无法继续处理任何单元）
    Session(SessionError),
    /// UI 交互错误（元素/时序故障，可有界重试）
    Ui(UiInteractionError),
    /// 文件操作错误
    File(FileError),
    /// 输入数据错误（记录缺字段等）
    Input(InputError),
    /// 配置错误（启动时致命）
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "会话错误: {}", e),
            AppError::Ui(e) => write!(f, "UI交互错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Input(e) => write!(f, "输入数据错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Session(e) => Some(e),
            AppError::Ui(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Input(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 浏览器会话错误
///
/// 会话级故障意味着平台不可达，整个运行无法推进
#[derive(Debug)]
pub enum SessionError {
    /// 连接浏览器失败
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ConnectionFailed { port, source } => {
                write!(f, "无法连接到浏览器 (端口: {}): {}", port, source)
            }
            SessionError::PageCreationFailed { source } => {
                write!(f, "创建页面失败: {}", source)
            }
            SessionError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            SessionError::LaunchFailed { source } => {
                write!(f, "启动浏览器失败: {}", source)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::ConnectionFailed { source, .. }
            | SessionError::PageCreationFailed { source }
            | SessionError::NavigationFailed { source, .. }
            | SessionError::LaunchFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// UI 交互操作种类（用于错误定位）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiOp {
    /// 定位元素
    Locate,
    /// 点击
    Click,
    /// 附加上传文件
    SetFile,
    /// 读取文本
    ReadText,
    /// 读取勾选状态
    ReadChecked,
    /// 设置勾选状态
    SetChecked,
}

impl fmt::Display for UiOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UiOp::Locate => "定位元素",
            UiOp::Click => "点击",
            UiOp::SetFile => "附加文件",
            UiOp::ReadText => "读取文本",
            UiOp::ReadChecked => "读取勾选状态",
            UiOp::SetChecked => "设置勾选状态",
        };
        write!(f, "{}", name)
    }
}

/// UI 交互错误
///
/// 统一携带出错时的定位器和操作种类，便于排查远端 UI 的变化
#[derive(Debug)]
pub enum UiInteractionError {
    /// 在超时时间内未找到元素
    ElementNotFound {
        selector: String,
        op: UiOp,
        waited: Duration,
    },
    /// 对元素的操作失败
    InteractionFailed {
        selector: String,
        op: UiOp,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 页面脚本执行失败
    ScriptFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl UiInteractionError {
    /// 该错误是否属于可重试的瞬态故障（元素尚未渲染）
    pub fn is_transient(&self) -> bool {
        matches!(self, UiInteractionError::ElementNotFound { .. })
    }

    /// 出错时的定位器（若有）
    pub fn selector(&self) -> Option<&str> {
        match self {
            UiInteractionError::ElementNotFound { selector, .. }
            | UiInteractionError::InteractionFailed { selector, .. } => Some(selector),
            UiInteractionError::ScriptFailed { .. } => None,
        }
    }
}

impl fmt::Display for UiInteractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiInteractionError::ElementNotFound {
                selector,
                op,
                waited,
            } => {
                write!(f, "{}超时 ({:?}): 未找到元素 '{}'", op, waited, selector)
            }
            UiInteractionError::InteractionFailed {
                selector,
                op,
                source,
            } => {
                write!(f, "{}失败 (元素: '{}'): {}", op, selector, source)
            }
            UiInteractionError::ScriptFailed { source } => {
                write!(f, "页面脚本执行失败: {}", source)
            }
        }
    }
}

impl std::error::Error for UiInteractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UiInteractionError::InteractionFailed { source, .. }
            | UiInteractionError::ScriptFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            UiInteractionError::ElementNotFound { .. } => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound {
        path: String,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建目录失败
    CreateDirFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// CSV 解析失败
    CsvParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 目录不存在
    DirectoryNotFound {
        path: String,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "文件不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::CreateDirFailed { path, source } => {
                write!(f, "创建目录失败 ({}): {}", path, source)
            }
            FileError::CsvParseFailed { path, source } => {
                write!(f, "CSV解析失败 ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
            FileError::DirectoryNotFound { path } => write!(f, "目录不存在: {}", path),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::CreateDirFailed { source, .. }
            | FileError::CsvParseFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 输入数据错误
///
/// 分区阶段发现的记录问题。重复记录属于警告，不走这里
#[derive(Debug)]
pub enum InputError {
    /// 缺少必需列
    MissingColumn {
        column: String,
    },
    /// 某行字段为空
    EmptyField {
        row: usize,
        column: String,
    },
    /// 无法识别的操作类型
    UnknownAction {
        row: usize,
        value: String,
    },
    /// 两个不同的分组键归一化为同一文件名
    NameCollision {
        file_name: String,
        first_key: String,
        second_key: String,
    },
    /// 输入为空
    EmptyInput {
        path: String,
    },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::MissingColumn { column } => {
                write!(f, "缺少必需列: {}", column)
            }
            InputError::EmptyField { row, column } => {
                write!(f, "第 {} 行的 {} 列为空", row, column)
            }
            InputError::UnknownAction { row, value } => {
                write!(f, "第 {} 行的操作类型无法识别: '{}'", row, value)
            }
            InputError::NameCollision {
                file_name,
                first_key,
                second_key,
            } => {
                write!(
                    f,
                    "文件名冲突: 键 '{}' 与 '{}' 都归一化为 '{}'",
                    first_key, second_key, file_name
                )
            }
            InputError::EmptyInput { path } => write!(f, "输入文件为空: {}", path),
        }
    }
}

impl std::error::Error for InputError {}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 步骤定位器为空
    EmptySelector {
        step: String,
    },
    /// 文本匹配模式无效
    InvalidPattern {
        pattern: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::EmptySelector { step } => {
                write!(f, "步骤 {} 的定位器为空", step)
            }
            ConfigError::InvalidPattern { pattern, source } => {
                write!(f, "文本匹配模式 '{}' 无效: {}", pattern, source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPattern { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Ui(UiInteractionError::ScriptFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: String::new(), // JSON错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::File(FileError::CsvParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::Config(ConfigError::InvalidPattern {
            pattern: String::new(),
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn session_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Session(SessionError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Session(SessionError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建元素未找到错误
    pub fn element_not_found(selector: impl Into<String>, op: UiOp, waited: Duration) -> Self {
        AppError::Ui(UiInteractionError::ElementNotFound {
            selector: selector.into(),
            op,
            waited,
        })
    }

    /// 创建元素操作失败错误
    pub fn interaction_failed(
        selector: impl Into<String>,
        op: UiOp,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Ui(UiInteractionError::InteractionFailed {
            selector: selector.into(),
            op,
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
