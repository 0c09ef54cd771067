// crates/cw_wind/src/lookup.rs

//! 地类码到分扇区粗糙度长度的查找表
//!
//! 文本格式逐行 `class z0` (单值广播到 12 个扇区) 或
//! `class z0_1 .. z0_12` (逐扇区), 以 `#` 开头的行与空行跳过。

use cw_foundation::error::{CwError, CwResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// 风向扇区数, 每扇区 30°
pub const N_SECTORS: usize = 12;

/// 地类码 -> 分扇区粗糙度长度 (米)
#[derive(Debug, Clone, Default)]
pub struct SectorLookupTable {
    entries: HashMap<i32, [f64; N_SECTORS]>,
}

impl SectorLookupTable {
    /// 空表
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 从文件读取
    ///
    /// # Errors
    /// 文件不存在或行格式非法时返回错误
    pub fn read<P: AsRef<Path>>(path: P) -> CwResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CwError::file_not_found(path));
        }
        Self::read_from_reader(BufReader::new(File::open(path)?))
    }

    /// 从 reader 读取
    ///
    /// # Errors
    /// 行字段数既非 2 也非 13, 或字段无法解析时返回错误
    pub fn read_from_reader<R: BufRead>(reader: R) -> CwResult<Self> {
        let mut table = Self::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| CwError::io_with_source("读取查找表失败", e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let line_no = i + 1;

            let class: i32 = fields[0].parse().map_err(|_| {
                CwError::config(format!("查找表第{line_no}行: 无法解析地类码 {:?}", fields[0]))
            })?;

            let roughness = match fields.len() {
                // 单值行广播到全部扇区
                2 => [parse_z0(fields[1], line_no)?; N_SECTORS],
                n if n == N_SECTORS + 1 => {
                    let mut z0 = [0.0; N_SECTORS];
                    for (sector, field) in fields[1..].iter().enumerate() {
                        z0[sector] = parse_z0(field, line_no)?;
                    }
                    z0
                }
                n => {
                    return Err(CwError::config(format!(
                        "查找表第{line_no}行: 期望 2 或 {} 个字段, 实际为 {n}",
                        N_SECTORS + 1
                    )))
                }
            };
            table.entries.insert(class, roughness);
        }
        Ok(table)
    }

    /// 登记一个地类, 单值广播到全部扇区
    pub fn insert_uniform(&mut self, class: i32, z0: f64) {
        self.entries.insert(class, [z0; N_SECTORS]);
    }

    /// 登记一个地类的逐扇区粗糙度
    pub fn insert(&mut self, class: i32, z0: [f64; N_SECTORS]) {
        self.entries.insert(class, z0);
    }

    /// 按地类码取分扇区粗糙度
    #[must_use]
    pub fn roughness(&self, class: i32) -> Option<&[f64; N_SECTORS]> {
        self.entries.get(&class)
    }

    /// 登记的地类数
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空表
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_z0(field: &str, line_no: usize) -> CwResult<f64> {
    field.parse().map_err(|_| {
        CwError::config(format!(
            "查找表第{line_no}行: 无法解析粗糙度长度 {field:?}"
        ))
    })
}
