// crates/cw_output/src/harmonics.rs

//! 分潮谐波解文件读取
//!
//! 文件结构: 分潮数; 逐分潮 `freq nodal_factor equilib NAME`; 节点数;
//! 逐节点一行编号后跟逐分潮数据行。水位解每行 `amp phase`, 流速解
//! 每行 `um up vm vp`。分潮名统一转为大写。

use cw_foundation::error::{CwError, CwResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;

/// 谐波解类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonicsKind {
    /// 水位解 (fort.53 风格, 每分潮幅值与相位)
    Elevation,
    /// 流速解 (fort.54 风格, 每分潮 u/v 各自幅值与相位)
    Velocity,
}

/// 分潮元数据
#[derive(Debug, Clone, PartialEq)]
pub struct Constituent {
    /// 分潮名 (大写)
    pub name: String,
    /// 角频率 (rad/s)
    pub frequency: f64,
    /// 节点因子
    pub nodal_factor: f64,
    /// 平衡潮迟角 (度)
    pub equilibrium_arg: f64,
}

/// 逐分潮的谐波数据列
///
/// 水位解只使用前两列, 流速解四列全用。
#[derive(Debug, Clone, Default)]
struct ConstituentData {
    amplitude: Vec<f64>,
    phase: Vec<f64>,
    v_amplitude: Vec<f64>,
    v_phase: Vec<f64>,
}

/// 分潮谐波解读取器
#[derive(Debug)]
pub struct HarmonicsReader {
    kind: HarmonicsKind,
    constituents: Vec<Constituent>,
    data: Vec<ConstituentData>,
    by_name: HashMap<String, usize>,
    node_ids: Vec<usize>,
    node_lookup: HashMap<usize, usize>,
}

impl HarmonicsReader {
    /// 读取谐波解文件
    ///
    /// # Errors
    /// 文件不存在或格式损坏时返回错误
    pub fn read<P: AsRef<Path>>(path: P, kind: HarmonicsKind) -> CwResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CwError::file_not_found(path));
        }
        let reader = BufReader::new(File::open(path)?);
        let result = Self::read_from_reader(reader, path, kind)?;
        info!(
            file = %path.display(),
            n_constituents = result.n_constituents(),
            n_nodes = result.n_nodes(),
            "谐波解文件已读取"
        );
        Ok(result)
    }

    /// 从 reader 读取谐波解
    ///
    /// # Errors
    /// 格式损坏时返回错误
    pub fn read_from_reader<R: BufRead>(
        reader: R,
        source: &Path,
        kind: HarmonicsKind,
    ) -> CwResult<Self> {
        let mut src = Source {
            lines: reader.lines(),
            file: source.to_path_buf(),
            line_no: 0,
        };

        let count_line = src.next_required("分潮数")?;
        let n_constituents: usize = src.field(&count_line, 0, "分潮数")?;

        let mut constituents = Vec::with_capacity(n_constituents);
        let mut by_name = HashMap::with_capacity(n_constituents);
        for i in 0..n_constituents {
            let line = src.next_required("分潮声明行")?;
            let frequency: f64 = src.field(&line, 0, "分潮角频率")?;
            let nodal_factor: f64 = src.field(&line, 1, "分潮节点因子")?;
            let equilibrium_arg: f64 = src.field(&line, 2, "分潮平衡潮迟角")?;
            let name = line
                .split_whitespace()
                .nth(3)
                .ok_or_else(|| src.parse_error("缺少分潮名"))?
                .to_uppercase();
            by_name.insert(name.clone(), i);
            constituents.push(Constituent {
                name,
                frequency,
                nodal_factor,
                equilibrium_arg,
            });
        }

        let count_line = src.next_required("节点数")?;
        let n_nodes: usize = src.field(&count_line, 0, "节点数")?;

        let mut data = vec![ConstituentData::default(); n_constituents];
        for column in &mut data {
            column.amplitude.reserve(n_nodes);
            column.phase.reserve(n_nodes);
            if kind == HarmonicsKind::Velocity {
                column.v_amplitude.reserve(n_nodes);
                column.v_phase.reserve(n_nodes);
            }
        }

        let mut node_ids = Vec::with_capacity(n_nodes);
        let mut node_lookup = HashMap::with_capacity(n_nodes);
        for position in 0..n_nodes {
            let id_line = src.next_required("节点编号行")?;
            let id: usize = src.field(&id_line, 0, "节点编号")?;
            node_lookup.insert(id, position);
            node_ids.push(id);

            for column in &mut data {
                let line = src.next_required("谐波数据行")?;
                match kind {
                    HarmonicsKind::Elevation => {
                        column.amplitude.push(src.field(&line, 0, "幅值")?);
                        column.phase.push(src.field(&line, 1, "相位")?);
                    }
                    HarmonicsKind::Velocity => {
                        column.amplitude.push(src.field(&line, 0, "u幅值")?);
                        column.phase.push(src.field(&line, 1, "u相位")?);
                        column.v_amplitude.push(src.field(&line, 2, "v幅值")?);
                        column.v_phase.push(src.field(&line, 3, "v相位")?);
                    }
                }
            }
        }

        Ok(Self {
            kind,
            constituents,
            data,
            by_name,
            node_ids,
            node_lookup,
        })
    }

    /// 解类型
    #[must_use]
    pub fn kind(&self) -> HarmonicsKind {
        self.kind
    }

    /// 分潮数
    #[must_use]
    pub fn n_constituents(&self) -> usize {
        self.constituents.len()
    }

    /// 节点数
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.node_ids.len()
    }

    /// 分潮元数据表
    #[must_use]
    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    /// 按名取分潮元数据, 名字大小写不敏感
    ///
    /// # Errors
    /// 分潮不存在时返回错误
    pub fn constituent(&self, name: &str) -> CwResult<&Constituent> {
        let index = self.locate(name)?;
        Ok(&self.constituents[index])
    }

    /// 文件声明的节点编号表
    #[must_use]
    pub fn node_ids(&self) -> &[usize] {
        &self.node_ids
    }

    /// 节点编号到数组位置
    ///
    /// # Errors
    /// 编号不存在时返回错误
    pub fn node_id_to_array_index(&self, id: usize) -> CwResult<usize> {
        self.node_lookup
            .get(&id)
            .copied()
            .ok_or(CwError::UnknownNode { id })
    }

    /// 水位解的幅值数组
    ///
    /// # Errors
    /// 分潮不存在或当前为流速解时返回错误
    pub fn amplitude(&self, name: &str) -> CwResult<&[f64]> {
        self.elevation_column(name).map(|c| c.amplitude.as_slice())
    }

    /// 水位解的相位数组
    ///
    /// # Errors
    /// 分潮不存在或当前为流速解时返回错误
    pub fn phase(&self, name: &str) -> CwResult<&[f64]> {
        self.elevation_column(name).map(|c| c.phase.as_slice())
    }

    /// 流速解的 u 幅值数组
    ///
    /// # Errors
    /// 分潮不存在或当前为水位解时返回错误
    pub fn u_magnitude(&self, name: &str) -> CwResult<&[f64]> {
        self.velocity_column(name).map(|c| c.amplitude.as_slice())
    }

    /// 流速解的 u 相位数组
    ///
    /// # Errors
    /// 分潮不存在或当前为水位解时返回错误
    pub fn u_phase(&self, name: &str) -> CwResult<&[f64]> {
        self.velocity_column(name).map(|c| c.phase.as_slice())
    }

    /// 流速解的 v 幅值数组
    ///
    /// # Errors
    /// 分潮不存在或当前为水位解时返回错误
    pub fn v_magnitude(&self, name: &str) -> CwResult<&[f64]> {
        self.velocity_column(name).map(|c| c.v_amplitude.as_slice())
    }

    /// 流速解的 v 相位数组
    ///
    /// # Errors
    /// 分潮不存在或当前为水位解时返回错误
    pub fn v_phase(&self, name: &str) -> CwResult<&[f64]> {
        self.velocity_column(name).map(|c| c.v_phase.as_slice())
    }

    fn locate(&self, name: &str) -> CwResult<usize> {
        self.by_name
            .get(&name.to_uppercase())
            .copied()
            .ok_or_else(|| CwError::unknown_constituent(name))
    }

    fn elevation_column(&self, name: &str) -> CwResult<&ConstituentData> {
        if self.kind != HarmonicsKind::Elevation {
            return Err(CwError::invalid_input("流速解没有标量幅值/相位列"));
        }
        Ok(&self.data[self.locate(name)?])
    }

    fn velocity_column(&self, name: &str) -> CwResult<&ConstituentData> {
        if self.kind != HarmonicsKind::Velocity {
            return Err(CwError::invalid_input("水位解没有 u/v 分量列"));
        }
        Ok(&self.data[self.locate(name)?])
    }
}

// 逐行解析辅助
struct Source<R: BufRead> {
    lines: std::io::Lines<R>,
    file: PathBuf,
    line_no: usize,
}

impl<R: BufRead> Source<R> {
    fn next_required(&mut self, expected: &str) -> CwResult<String> {
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(line)
            }
            Some(Err(e)) => Err(CwError::io_with_source(
                format!("读取 {} 失败", self.file.display()),
                e,
            )),
            None => Err(CwError::format(
                &self.file,
                format!("文件意外结束, 期望{expected}"),
            )),
        }
    }

    fn field<T: std::str::FromStr>(&self, line: &str, idx: usize, what: &str) -> CwResult<T> {
        line.split_whitespace()
            .nth(idx)
            .ok_or_else(|| self.parse_error(format!("缺少字段: {what}")))?
            .parse()
            .map_err(|_| self.parse_error(format!("无法解析{what}: {line:?}")))
    }

    fn parse_error<S: Into<String>>(&self, message: S) -> CwError {
        CwError::parse(&self.file, self.line_no, message)
    }
}

// ============================================================================
// 测试
// ============================================================================
