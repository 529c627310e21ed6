use serde::{Deserialize, Serialize};

/// 选课变更操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnrollmentAction {
    #[serde(rename = "ADD")]
    Add,
    #[serde(rename = "DROP")]
    Drop,
    #[serde(rename = "UPDATE")]
    Update,
}

impl EnrollmentAction {
    /// 解析列值，大小写不敏感；无法识别时返回 None
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADD" => Some(EnrollmentAction::Add),
            "DROP" => Some(EnrollmentAction::Drop),
            "UPDATE" => Some(EnrollmentAction::Update),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentAction::Add => "ADD",
            EnrollmentAction::Drop => "DROP",
            EnrollmentAction::Update => "UPDATE",
        }
    }
}

impl std::fmt::Display for EnrollmentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单条选课变更记录
///
/// 读入后不可变。四个字段全部相同的两条记录视为重复
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "ACTION")]
    pub action: EnrollmentAction,
    #[serde(rename = "USER_NAME")]
    pub user_name: String,
    #[serde(rename = "INSTRUCTOR_ID")]
    pub instructor_id: String,
    #[serde(rename = "COURSE_ID")]
    pub course_id: String,
}

impl std::fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} (课程: {}, 教师: {})",
            self.action, self.user_name, self.course_id, self.instructor_id
        )
    }
}

/// 输入文件中必需的列名
pub const REQUIRED_COLUMNS: [&str; 4] = ["ACTION", "USER_NAME", "INSTRUCTOR_ID", "COURSE_ID"];

/// 一处重复记录
///
/// `row` 与 `first_row` 都是 1 起始的数据行号（不含表头）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateEntry {
    /// 重复出现的行
    pub row: usize,
    /// 首次出现的行
    pub first_row: usize,
    /// 重复的记录内容
    pub record: ChangeRecord,
}

/// 输入校验报告
///
/// 重复属于警告：如实上报，绝不静默丢弃
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// 记录总数
    pub total_records: usize,
    /// 发现的全部重复
    pub duplicates: Vec<DuplicateEntry>,
}

impl ValidationReport {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}
