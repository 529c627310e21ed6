//! 单元处理上下文
//!
//! 封装"我正在处理本次运行的第几个单元"这一信息

use std::fmt::Display;
use std::path::PathBuf;

/// 单元处理上下文
#[derive(Debug, Clone)]
pub struct UnitCtx {
    /// 单元名
    pub unit_name: String,

    /// 单元在本次运行中的序号（从1开始，仅用于日志显示）
    pub unit_index: usize,

    /// 本次运行的单元总数
    pub total_units: usize,

    /// 单元文件路径
    pub file_path: PathBuf,
}

impl UnitCtx {
    pub fn new(
        unit_name: String,
        unit_index: usize,
        total_units: usize,
        file_path: PathBuf,
    ) -> Self {
        Self {
            unit_name,
            unit_index,
            total_units,
            file_path,
        }
    }
}

impl Display for UnitCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[单元 {}/{} '{}']",
            self.unit_index, self.total_units, self.unit_name
        )
    }
}
