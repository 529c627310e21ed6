use serde::{Deserialize, Serialize};

use crate::models::record::ChangeRecord;

/// 分区键：按哪一列把记录分组为单元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartitionKey {
    /// 按课程 ID 分组（默认）
    #[default]
    CourseId,
    /// 按教师 ID 分组
    InstructorId,
}

impl PartitionKey {
    /// 从记录中取出分组键的值
    pub fn extract<'a>(&self, record: &'a ChangeRecord) -> &'a str {
        match self {
            PartitionKey::CourseId => &record.course_id,
            PartitionKey::InstructorId => &record.instructor_id,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "course_id" => Some(PartitionKey::CourseId),
            "instructor_id" => Some(PartitionKey::InstructorId),
            _ => None,
        }
    }
}

/// 一个上传单元：同一分组键下的全部变更记录
///
/// 写盘一次，成功导入或永久失败后生命周期结束
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    /// 单元名（即分组键的值）
    pub name: String,
    /// 记录列表，保持输入顺序
    pub records: Vec<ChangeRecord>,
    /// 单元文件路径（写盘后填充）
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
            file_path: None,
        }
    }

    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }
}

/// 批次合并结果
///
/// 批次只是组织上的合并视图，不是事务边界；
/// 成败仍然按单元逐个跟踪
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// 过滤子串
    pub filter: String,
    /// 匹配到的单元数（0 表示无事发生，不算错误）
    pub matched_units: usize,
    /// 合并的记录总数
    pub total_records: usize,
    /// 批次文件路径（有匹配时填充）
    pub file_path: Option<String>,
}
