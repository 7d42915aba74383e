// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::PageResult;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

const CSV_HEADER: [&str; 5] = ["url", "size", "price", "raw_size", "raw_price"];

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// 每个单元一行
    #[default]
    Csv,
    /// 完整的页面结果数组
    Json,
}

/// 按指定格式写出结果
pub fn export(results: &[PageResult], path: &Path, format: ExportFormat) -> io::Result<()> {
    match format {
        ExportFormat::Csv => export_to_csv(results, path),
        ExportFormat::Json => export_to_json(results, path),
    }
}

/// 导出为CSV
///
/// 只写出成功页面的单元；没有任何单元时仍写出表头。
///
/// # 参数
///
/// * `results` - 页面结果列表
/// * `path` - 输出文件路径
pub fn export_to_csv(results: &[PageResult], path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let rows = write_units_csv(&mut writer, results)?;
    writer.flush()?;

    info!("Exported {} units to {}", rows, path.display());
    Ok(())
}

/// 把单元以CSV写入任意 writer，返回写出的数据行数
pub fn write_units_csv<W: Write>(mut w: W, results: &[PageResult]) -> io::Result<usize> {
    let header: Vec<String> = CSV_HEADER.iter().map(|s| s.to_string()).collect();
    write_row(&mut w, &header, ',')?;

    let mut rows = 0;
    for unit in results.iter().filter(|r| r.success).flat_map(|r| &r.units) {
        let row = [
            unit.source_url.clone(),
            unit.size.clone(),
            unit.price.clone(),
            unit.raw_size.clone().unwrap_or_default(),
            unit.raw_price.clone().unwrap_or_default(),
        ];
        write_row(&mut w, &row, ',')?;
        rows += 1;
    }
    Ok(rows)
}

/// 导出为格式化JSON数组
pub fn export_to_json(results: &[PageResult], path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!("Exported {} page results to {}", results.len(), path.display());
    Ok(())
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", sep)?;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}
