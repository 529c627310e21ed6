//! 记录集校验与分区 - 业务能力层
//!
//! 把原始批量变更记录切分为逐单元的上传文件：
//! 1. 加载并校验原始 CSV（必需列、空字段、操作类型）
//! 2. 全量查重（四个字段完全相同才算重复；只上报，不丢弃）
//! 3. 按分组键切分为 Unit，单元内保持输入顺序
//! 4. 每个 Unit 写一个文件；重跑覆盖旧文件是允许的
//! 5. 可选：按名称子串把多个 Unit 合并为一个批次文件

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{AppError, AppResult, InputError};
use crate::models::record::{
    ChangeRecord, DuplicateEntry, EnrollmentAction, ValidationReport, REQUIRED_COLUMNS,
};
use crate::models::unit::{BatchReport, PartitionKey, Unit};

/// 记录集分区器
///
/// 职责：
/// - 只处理记录与文件，不认识浏览器
/// - 不决定上传流程
pub struct RecordPartitioner {
    key: PartitionKey,
}

impl RecordPartitioner {
    pub fn new(key: PartitionKey) -> Self {
        Self { key }
    }

    /// 加载原始记录文件
    ///
    /// 缺少必需列是硬错误；单行问题（空字段、未知操作类型）收集到
    /// issues 里上报，该行不进入结果，分区继续
    pub fn load_records(
        &self,
        path: &Path,
    ) -> AppResult<(Vec<ChangeRecord>, Vec<InputError>)> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.to_string_lossy(), e))?;

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| AppError::File(crate::error::FileError::CsvParseFailed {
                path: path.to_string_lossy().to_string(),
                source: Box::new(e),
            }))?
            .clone();

        // 必需列齐全才能继续
        let mut column_index = HashMap::new();
        for column in REQUIRED_COLUMNS {
            match headers.iter().position(|h| h == column) {
                Some(idx) => {
                    column_index.insert(column, idx);
                }
                None => {
                    return Err(AppError::Input(InputError::MissingColumn {
                        column: column.to_string(),
                    }));
                }
            }
        }

        let mut records = Vec::new();
        let mut issues = Vec::new();

        for (index, row) in reader.records().enumerate() {
            let row_number = index + 1; // 数据行号，1 起始
            let row = row.map_err(|e| {
                AppError::File(crate::error::FileError::CsvParseFailed {
                    path: path.to_string_lossy().to_string(),
                    source: Box::new(e),
                })
            })?;

            let field = |column: &str| -> String {
                row.get(column_index[column]).unwrap_or_default().trim().to_string()
            };

            let action_raw = field("ACTION");
            let user_name = field("USER_NAME");
            let instructor_id = field("INSTRUCTOR_ID");
            let course_id = field("COURSE_ID");

            let mut row_ok = true;
            for (column, value) in [
                ("ACTION", &action_raw),
                ("USER_NAME", &user_name),
                ("INSTRUCTOR_ID", &instructor_id),
                ("COURSE_ID", &course_id),
            ] {
                if value.is_empty() {
                    issues.push(InputError::EmptyField {
                        row: row_number,
                        column: column.to_string(),
                    });
                    row_ok = false;
                }
            }
            if !row_ok {
                continue;
            }

            match EnrollmentAction::parse(&action_raw) {
                Some(action) => records.push(ChangeRecord {
                    action,
                    user_name,
                    instructor_id,
                    course_id,
                }),
                None => issues.push(InputError::UnknownAction {
                    row: row_number,
                    value: action_raw,
                }),
            }
        }

        if records.is_empty() && issues.is_empty() {
            return Err(AppError::Input(InputError::EmptyInput {
                path: path.to_string_lossy().to_string(),
            }));
        }

        Ok((records, issues))
    }

    /// 全量查重
    ///
    /// 重复只是警告：如实上报行号与内容，记录不会被丢弃。
    /// 丢弃重复必须是显式决策，不能默默发生
    pub fn validate(&self, records: &[ChangeRecord]) -> ValidationReport {
        let mut first_seen: HashMap<&ChangeRecord, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let row = index + 1;
            match first_seen.get(record) {
                Some(&first_row) => duplicates.push(DuplicateEntry {
                    row,
                    first_row,
                    record: record.clone(),
                }),
                None => {
                    first_seen.insert(record, row);
                }
            }
        }

        ValidationReport {
            total_records: records.len(),
            duplicates,
        }
    }

    /// 按分组键切分为单元
    ///
    /// 单元顺序按键首次出现的顺序，单元内保持输入顺序
    pub fn partition(&self, records: &[ChangeRecord]) -> Vec<Unit> {
        let mut units: Vec<Unit> = Vec::new();
        let mut index_of: HashMap<String, usize> = HashMap::new();

        for record in records {
            let key = self.key.extract(record).to_string();
            let idx = *index_of.entry(key.clone()).or_insert_with(|| {
                units.push(Unit::new(key));
                units.len() - 1
            });
            units[idx].records.push(record.clone());
        }

        units
    }

    /// 把每个单元写为一个 CSV 文件
    ///
    /// 目录不存在则创建；同键重跑覆盖旧文件。
    /// 两个不同的键归一化出同一文件名是硬错误
    pub fn write_units(&self, units: &mut [Unit], out_dir: &Path) -> AppResult<()> {
        std::fs::create_dir_all(out_dir).map_err(|e| {
            AppError::File(crate::error::FileError::CreateDirFailed {
                path: out_dir.to_string_lossy().to_string(),
                source: Box::new(e),
            })
        })?;

        let mut name_owner: HashMap<String, String> = HashMap::new();

        for unit in units.iter_mut() {
            let file_name = format!("{}.csv", sanitize_file_name(&unit.name));
            if let Some(first_key) = name_owner.get(&file_name) {
                return Err(AppError::Input(InputError::NameCollision {
                    file_name,
                    first_key: first_key.clone(),
                    second_key: unit.name.clone(),
                }));
            }
            name_owner.insert(file_name.clone(), unit.name.clone());

            let path = out_dir.join(&file_name);
            write_records(&path, &unit.records)?;
            unit.file_path = Some(path.to_string_lossy().to_string());
            info!("✓ 已生成单元文件: {}", path.display());
        }

        Ok(())
    }

    /// 按名称子串合并批次
    ///
    /// 批次只是组织视图：记录按单元顺序拼接，成败仍按单元跟踪。
    /// 匹配不到任何单元时按无事发生上报，不算错误
    pub fn write_batch(
        &self,
        units: &[Unit],
        filter: &str,
        out_dir: &Path,
    ) -> AppResult<BatchReport> {
        let matched: Vec<&Unit> = units
            .iter()
            .filter(|u| u.name.contains(filter))
            .collect();

        if matched.is_empty() {
            warn!("⚠️ 没有单元匹配过滤条件: '{}'", filter);
            return Ok(BatchReport {
                filter: filter.to_string(),
                matched_units: 0,
                total_records: 0,
                file_path: None,
            });
        }

        std::fs::create_dir_all(out_dir).map_err(|e| {
            AppError::File(crate::error::FileError::CreateDirFailed {
                path: out_dir.to_string_lossy().to_string(),
                source: Box::new(e),
            })
        })?;

        let mut combined = Vec::new();
        for unit in &matched {
            combined.extend(unit.records.iter().cloned());
        }

        let file_name = format!("{}_batch.csv", sanitize_file_name(filter));
        let path = out_dir.join(&file_name);
        write_records(&path, &combined)?;

        info!(
            "✓ 已生成批次文件: {} (匹配 {} 个单元, 共 {} 条记录)",
            path.display(),
            matched.len(),
            combined.len()
        );

        Ok(BatchReport {
            filter: filter.to_string(),
            matched_units: matched.len(),
            total_records: combined.len(),
            file_path: Some(path.to_string_lossy().to_string()),
        })
    }
}

impl Default for RecordPartitioner {
    fn default() -> Self {
        Self::new(PartitionKey::CourseId)
    }
}

/// 分区阶段入口：原始记录文件 → 逐单元文件（及可选批次）
///
/// 未配置 input_csv 时不做任何事。重复与单行问题如实上报后继续；
/// 文件名冲突与缺列是硬错误
pub fn run_partition_stage(config: &crate::config::Config) -> AppResult<()> {
    let Some(input) = config.input_csv.as_deref() else {
        return Ok(());
    };

    let key = PartitionKey::parse(&config.partition_key).ok_or_else(|| {
        AppError::Config(crate::error::ConfigError::EnvVarParseFailed {
            var_name: "PARTITION_KEY".to_string(),
            value: config.partition_key.clone(),
            expected_type: "course_id | instructor_id".to_string(),
        })
    })?;

    info!("\n📁 分区阶段: 加载原始记录文件 {}", input);
    let partitioner = RecordPartitioner::new(key);
    let (records, issues) = partitioner.load_records(Path::new(input))?;

    info!("✓ 加载 {} 条有效记录", records.len());
    for issue in &issues {
        warn!("⚠️ 输入问题: {}", issue);
    }
    if !issues.is_empty() {
        warn!("⚠️ 共 {} 行存在问题，已跳过这些行", issues.len());
    }

    // 查重结果在继续之前如实上报；记录不会被丢弃
    let report = partitioner.validate(&records);
    if report.has_duplicates() {
        warn!("⚠️ 发现 {} 处重复记录:", report.duplicates.len());
        for dup in &report.duplicates {
            warn!(
                "  第 {} 行与第 {} 行完全相同: {}",
                dup.row, dup.first_row, dup.record
            );
        }
        warn!("重复记录会原样出现在单元文件中");
    }

    let mut units = partitioner.partition(&records);
    info!("✓ 切分为 {} 个单元", units.len());
    partitioner.write_units(&mut units, Path::new(&config.unit_folder))?;

    if let Some(filter) = config.batch_filter.as_deref() {
        partitioner.write_batch(&units, filter, Path::new(&config.batch_folder))?;
    }

    Ok(())
}

/// 写记录列表到 CSV 文件（带表头）
fn write_records(path: &PathBuf, records: &[ChangeRecord]) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::file_write_failed(path.to_string_lossy(), e)
    })?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::file_write_failed(path.to_string_lossy(), e))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::file_write_failed(path.to_string_lossy(), e))?;
    Ok(())
}

/// 键值归一化为安全文件名
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
