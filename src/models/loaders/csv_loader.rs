use crate::models::record::ChangeRecord;
use crate::models::unit::Unit;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 CSV 文件加载数据并转换为 Unit 对象
///
/// 单元名取文件名（去扩展名）。列不匹配或值非法时返回错误，
/// 由调用方决定这属于哪个层级的故障
pub async fn load_unit_file(csv_file_path: &Path) -> Result<Unit> {
    let content = fs::read_to_string(csv_file_path)
        .await
        .with_context(|| format!("无法读取CSV文件: {}", csv_file_path.display()))?;

    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<ChangeRecord>().enumerate() {
        let record = row.with_context(|| {
            format!(
                "无法解析CSV文件 {} 的第 {} 行",
                csv_file_path.display(),
                index + 1
            )
        })?;
        records.push(record);
    }

    let name = csv_file_path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let mut unit = Unit::new(name);
    unit.records = records;
    unit.file_path = Some(csv_file_path.to_string_lossy().to_string());

    Ok(unit)
}

/// 扫描文件夹，返回所有单元文件的路径
///
/// 结果按文件名排序，保证处理顺序确定
pub async fn scan_unit_folder(folder_path: &str) -> Result<Vec<PathBuf>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut unit_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("csv") {
            unit_files.push(path);
        }
    }

    unit_files.sort();

    Ok(unit_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn load_unit_file_parses_records_in_order() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("NM_2425_FA_BUS101.csv");
        let mut file = std::fs::File::create(&path).expect("创建文件失败");
        writeln!(file, "ACTION,USER_NAME,INSTRUCTOR_ID,COURSE_ID").unwrap();
        writeln!(file, "DROP,jdoe,T100,NM_2425_FA_BUS101").unwrap();
        writeln!(file, "ADD,asmith,T100,NM_2425_FA_BUS101").unwrap();

        let unit = load_unit_file(&path).await.expect("加载单元文件失败");
        assert_eq!(unit.name, "NM_2425_FA_BUS101");
        assert_eq!(unit.records.len(), 2);
        assert_eq!(unit.records[0].user_name, "jdoe");
        assert_eq!(unit.records[1].user_name, "asmith");
    }

    #[tokio::test]
    async fn malformed_unit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("broken.csv");
        let mut file = std::fs::File::create(&path).expect("创建文件失败");
        // 列名不对
        writeln!(file, "WHO,WHAT").unwrap();
        writeln!(file, "jdoe,ADD").unwrap();

        assert!(load_unit_file(&path).await.is_err());
    }

    #[tokio::test]
    async fn scan_returns_sorted_csv_paths() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        for name in ["b.csv", "a.csv", "ignore.txt", "c.csv"] {
            std::fs::File::create(dir.path().join(name)).expect("创建文件失败");
        }

        let paths = scan_unit_folder(dir.path().to_str().unwrap())
            .await
            .expect("扫描失败");
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv", "c.csv"]);
    }
}
