// crates/cw_output/src/ascii.rs

//! ASCII 时间序列格式
//!
//! 文件结构: 标题行; `nsnaps nnodes dt dit ncols` 信息行; 逐记录的
//! 记录头与节点行。满存储记录头为 `time it` 两个字段, 稀疏记录头为
//! `time it nactive default` 四个字段; 节点行为 `id v1 [v2]`, 编号
//! 1 起。稀疏与满存储的判别在打开时探测首条记录头完成, 之后不再
//! 逐记录判别。

use crate::reader::OutputMetadata;
use crate::record::OutputRecord;
use cw_foundation::error::{CwError, CwResult};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// 满存储记录的默认值约定
pub const FULL_RECORD_DEFAULT: f64 = -99999.0;

/// ASCII 时间序列数据源
#[derive(Debug)]
pub struct AsciiSource<R: BufRead> {
    lines: std::io::Lines<R>,
    file: PathBuf,
    line_no: usize,
    /// 打开时探测记录头读出的行, 第一条记录读取时先消费它
    pending: Option<String>,
}

impl<R: BufRead> AsciiSource<R> {
    /// 读取文件头并探测稀疏/满存储
    ///
    /// 返回 (数据源, 元数据, 是否稀疏)。
    ///
    /// # Errors
    /// 信息行缺失、列数非 1/2 或首条记录头无法判别时返回错误
    pub fn open(reader: R, source: &Path) -> CwResult<(Self, OutputMetadata, bool)> {
        let mut src = Self {
            lines: reader.lines(),
            file: source.to_path_buf(),
            line_no: 0,
            pending: None,
        };

        let title = src.next_required("标题行")?.trim_end().to_string();
        let info = src.next_required("信息行")?;
        let n_snaps: usize = src.field(&info, 0, "快照数")?;
        let n_nodes: usize = src.field(&info, 1, "节点数")?;
        let dt: f64 = src.field(&info, 2, "输出时间间隔")?;
        let dit: u64 = src.field(&info, 3, "输出步间隔")?;
        let n_cols: usize = src.field(&info, 4, "列数")?;

        if n_cols != 1 && n_cols != 2 {
            return Err(CwError::format(
                source,
                format!("列数必须为1或2, 实际为 {n_cols}"),
            ));
        }

        // 探测首条记录头: 2-3 字段为满存储, 4+ 字段为稀疏
        let sparse = match src.try_next()? {
            Some(line) => {
                let n_fields = line.split_whitespace().count();
                let sparse = match n_fields {
                    2 | 3 => false,
                    n if n >= 4 => true,
                    _ => {
                        return Err(CwError::format(
                            source,
                            format!("记录头字段数异常: {n_fields}"),
                        ))
                    }
                };
                src.pending = Some(line);
                sparse
            }
            // 无记录的文件按满存储处理
            None => false,
        };

        let metadata = OutputMetadata {
            title,
            n_snaps,
            n_nodes,
            dt,
            dit,
            n_cols,
        };
        Ok((src, metadata, sparse))
    }

    /// 读取一条记录
    ///
    /// # Errors
    /// 文件在记录中途结束或字段无法解析时返回错误
    pub fn read_record(
        &mut self,
        metadata: &OutputMetadata,
        sparse: bool,
    ) -> CwResult<OutputRecord> {
        let head = self.next_required("记录头")?;
        let time: f64 = self.field(&head, 0, "记录时间")?;
        let iteration: u64 = self.field(&head, 1, "记录迭代步")?;

        let (n_active, default_value) = if sparse {
            (
                self.field::<usize>(&head, 2, "稀疏记录节点数")?,
                self.field::<f64>(&head, 3, "稀疏记录默认值")?,
            )
        } else {
            (metadata.n_nodes, FULL_RECORD_DEFAULT)
        };

        let mut u = vec![default_value; metadata.n_nodes];
        let mut v = if metadata.n_cols == 2 {
            Some(vec![default_value; metadata.n_nodes])
        } else {
            None
        };

        for _ in 0..n_active {
            let line = self.next_required("节点行")?;
            let id: usize = self.field(&line, 0, "节点编号")?;
            if id < 1 || id > metadata.n_nodes {
                return Err(CwError::UnknownNode { id });
            }
            u[id - 1] = self.field(&line, 1, "节点取值")?;
            if let Some(v) = v.as_mut() {
                v[id - 1] = self.field(&line, 2, "节点v分量")?;
            }
        }

        match v {
            Some(v) => OutputRecord::vector(time, iteration, default_value, n_active, u, v),
            None => Ok(OutputRecord::scalar(
                time,
                iteration,
                default_value,
                n_active,
                u,
            )),
        }
    }

    fn try_next(&mut self) -> CwResult<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(Some(line))
            }
            Some(Err(e)) => Err(CwError::io_with_source(
                format!("读取 {} 失败", self.file.display()),
                e,
            )),
            None => Ok(None),
        }
    }

    fn next_required(&mut self, expected: &str) -> CwResult<String> {
        match self.try_next()? {
            Some(line) => Ok(line),
            None => Err(CwError::format(
                &self.file,
                format!("文件意外结束, 期望{expected}"),
            )),
        }
    }

    fn field<T: std::str::FromStr>(&self, line: &str, idx: usize, what: &str) -> CwResult<T> {
        line.split_whitespace()
            .nth(idx)
            .ok_or_else(|| CwError::parse(&self.file, self.line_no, format!("缺少字段: {what}")))?
            .parse()
            .map_err(|_| {
                CwError::parse(
                    &self.file,
                    self.line_no,
                    format!("无法解析{what}: {line:?}"),
                )
            })
    }
}

// ============================================================================
// 测试
// ============================================================================
