// crates/cw_output/src/reader.rs

//! 时间序列读取器门面
//!
//! 统一 ASCII 与列式容器两种后端，顺序读取快照并在内存中持有
//! 已读记录。支持按下标回取与逐槽释放: 释放后记录数据不再可取，
//! 但时间与迭代步元信息保留。
//!
//! # 示例
//!
//! ```ignore
//! use cw_output::reader::OutputReader;
//!
//! let mut reader = OutputReader::open("fort.63")?;
//! while reader.read().is_ok() {}
//! let record = reader.data(0)?;
//! ```

use crate::ascii::AsciiSource;
use crate::columnar::{ColumnarSource, COLUMNAR_MAGIC};
use crate::record::OutputRecord;
use cw_foundation::error::{CwError, CwResult};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// 元数据与格式
// ============================================================================

/// 时间序列文件头元数据
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMetadata {
    /// 标题行 (列式容器无标题, 为空串)
    pub title: String,
    /// 快照总数
    pub n_snaps: usize,
    /// 节点数
    pub n_nodes: usize,
    /// 输出时间间隔 (秒)
    pub dt: f64,
    /// 输出步间隔
    pub dit: u64,
    /// 列数 (1 标量 / 2 矢量)
    pub n_cols: usize,
}

/// 时间序列文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// ASCII 满存储
    AsciiFull,
    /// ASCII 稀疏
    AsciiSparse,
    /// 列式容器满存储
    ColumnarFull,
    /// 列式容器稀疏
    ColumnarSparse,
}

impl OutputFormat {
    /// 是否为稀疏格式
    #[must_use]
    pub fn is_sparse(self) -> bool {
        matches!(self, Self::AsciiSparse | Self::ColumnarSparse)
    }
}

// ============================================================================
// 记录槽
// ============================================================================

/// 读取器内的记录槽
enum RecordSlot {
    Loaded(OutputRecord),
    /// 数据已释放, 仅保留元信息
    Evicted { time: f64, iteration: u64 },
}

enum Backend {
    Ascii(AsciiSource<BufReader<File>>),
    Columnar(ColumnarSource<BufReader<File>>),
}

// ============================================================================
// 读取器
// ============================================================================

/// 时间序列读取器
pub struct OutputReader {
    file: PathBuf,
    metadata: OutputMetadata,
    format: OutputFormat,
    backend: Option<Backend>,
    slots: Vec<RecordSlot>,
}

impl OutputReader {
    /// 打开时间序列文件, 自动识别格式
    ///
    /// 先嗅探魔数判别列式容器, 否则按 ASCII 解析, 稀疏/满存储由
    /// 各后端在打开时判别。
    ///
    /// # Errors
    /// 文件不存在或文件头无法解析时返回错误
    pub fn open<P: AsRef<Path>>(path: P) -> CwResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CwError::file_not_found(path));
        }

        let columnar = {
            let mut probe = File::open(path)?;
            let mut magic = [0u8; 4];
            match probe.read_exact(&mut magic) {
                Ok(()) => magic == COLUMNAR_MAGIC,
                Err(_) => false,
            }
        };

        let reader = BufReader::new(File::open(path)?);
        let (backend, metadata, sparse) = if columnar {
            let (src, meta, sparse) = ColumnarSource::open(reader, path)?;
            (Backend::Columnar(src), meta, sparse)
        } else {
            let (src, meta, sparse) = AsciiSource::open(reader, path)?;
            (Backend::Ascii(src), meta, sparse)
        };

        let format = match (columnar, sparse) {
            (true, true) => OutputFormat::ColumnarSparse,
            (true, false) => OutputFormat::ColumnarFull,
            (false, true) => OutputFormat::AsciiSparse,
            (false, false) => OutputFormat::AsciiFull,
        };

        info!(
            file = %path.display(),
            format = ?format,
            n_snaps = metadata.n_snaps,
            n_nodes = metadata.n_nodes,
            "时间序列文件已打开"
        );

        Ok(Self {
            file: path.to_path_buf(),
            metadata,
            format,
            backend: Some(backend),
            slots: Vec::new(),
        })
    }

    /// 文件头元数据
    #[must_use]
    pub fn metadata(&self) -> &OutputMetadata {
        &self.metadata
    }

    /// 文件格式
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// 文件路径
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// 已读取的快照数
    #[must_use]
    pub fn n_read(&self) -> usize {
        self.slots.len()
    }

    /// 读取下一条记录并返回其引用
    ///
    /// # Errors
    /// 超过文件头声明的快照总数时返回 [`CwError::EndOfData`];
    /// 读取器已关闭时返回 [`CwError::NotInitialized`]; 记录损坏
    /// 时返回解析错误并关闭后端
    pub fn read(&mut self) -> CwResult<&OutputRecord> {
        if self.slots.len() >= self.metadata.n_snaps {
            return Err(CwError::end_of_data(
                self.slots.len(),
                self.metadata.n_snaps,
            ));
        }
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| CwError::not_initialized("时间序列后端"))?;

        let sparse = self.format.is_sparse();
        let result = match backend {
            Backend::Ascii(src) => src.read_record(&self.metadata, sparse),
            Backend::Columnar(src) => src.read_record(&self.metadata, sparse),
        };
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                // 记录损坏后流位置不可信, 释放后端
                self.backend = None;
                return Err(e);
            }
        };

        self.slots.push(RecordSlot::Loaded(record));
        match self.slots.last() {
            Some(RecordSlot::Loaded(record)) => Ok(record),
            _ => Err(CwError::not_initialized("记录槽")),
        }
    }

    /// 按下标取已读记录
    ///
    /// # Errors
    /// 下标越界返回 [`CwError::IndexOutOfBounds`]; 槽已释放返回
    /// [`CwError::RecordEvicted`]
    pub fn data(&self, index: usize) -> CwResult<&OutputRecord> {
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| CwError::index_out_of_bounds("snapshot", index, self.slots.len()))?;
        match slot {
            RecordSlot::Loaded(record) => Ok(record),
            RecordSlot::Evicted { .. } => Err(CwError::record_evicted(index)),
        }
    }

    /// 已读记录的时间, 释放后仍可取
    ///
    /// # Errors
    /// 下标越界时返回错误
    pub fn time(&self, index: usize) -> CwResult<f64> {
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| CwError::index_out_of_bounds("snapshot", index, self.slots.len()))?;
        Ok(match slot {
            RecordSlot::Loaded(record) => record.time,
            RecordSlot::Evicted { time, .. } => *time,
        })
    }

    /// 已读记录的迭代步, 释放后仍可取
    ///
    /// # Errors
    /// 下标越界时返回错误
    pub fn iteration(&self, index: usize) -> CwResult<u64> {
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| CwError::index_out_of_bounds("snapshot", index, self.slots.len()))?;
        Ok(match slot {
            RecordSlot::Loaded(record) => record.iteration,
            RecordSlot::Evicted { iteration, .. } => *iteration,
        })
    }

    /// 释放指定槽的记录数据, 保留时间与迭代步
    ///
    /// 对已释放的槽重复调用是无操作。
    ///
    /// # Errors
    /// 下标越界时返回错误
    pub fn clear_at(&mut self, index: usize) -> CwResult<()> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| CwError::index_out_of_bounds("snapshot", index, len))?;
        if let RecordSlot::Loaded(record) = slot {
            let (time, iteration) = (record.time, record.iteration);
            *slot = RecordSlot::Evicted { time, iteration };
        }
        Ok(())
    }

    /// 关闭底层文件, 已读记录仍可访问
    ///
    /// 重复关闭是无操作。
    pub fn close(&mut self) {
        self.backend = None;
    }

    /// 底层文件是否仍打开
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columnar::ColumnarWriter;
    use std::io::Write as _;

    const FULL_SCALAR: &str = "\
elevation output
3 2 10.0 5 1
10.0 5
1 0.1
2 0.2
20.0 10
1 0.3
2 0.4
30.0 15
1 0.5
2 0.6
";

    fn write_temp(text: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_read_until_end_of_data() {
        let f = write_temp(FULL_SCALAR);
        let mut reader = OutputReader::open(f.path()).unwrap();
        assert_eq!(reader.format(), OutputFormat::AsciiFull);
        assert_eq!(reader.metadata().n_snaps, 3);

        for _ in 0..3 {
            reader.read().unwrap();
        }
        let err = reader.read().unwrap_err();
        assert!(matches!(
            err,
            CwError::EndOfData {
                current: 3,
                total: 3
            }
        ));
        assert!(err.is_recoverable());
        // 耗尽不关闭后端
        assert!(reader.is_open());
    }

    #[test]
    fn test_eviction_isolated_per_slot() {
        let f = write_temp(FULL_SCALAR);
        let mut reader = OutputReader::open(f.path()).unwrap();
        for _ in 0..3 {
            reader.read().unwrap();
        }

        reader.clear_at(1).unwrap();
        assert!(reader.data(0).is_ok());
        assert!(matches!(
            reader.data(1).unwrap_err(),
            CwError::RecordEvicted { index: 1 }
        ));
        assert!(reader.data(2).is_ok());

        // 元信息保留
        assert!((reader.time(1).unwrap() - 20.0).abs() < 1e-12);
        assert_eq!(reader.iteration(1).unwrap(), 10);

        // 重复释放无操作
        reader.clear_at(1).unwrap();
        assert!(reader.clear_at(9).is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let f = write_temp(FULL_SCALAR);
        let mut reader = OutputReader::open(f.path()).unwrap();
        reader.read().unwrap();
        reader.close();
        reader.close();
        assert!(!reader.is_open());
        // 已读记录不受关闭影响
        assert!(reader.data(0).is_ok());
        assert!(matches!(
            reader.read().unwrap_err(),
            CwError::NotInitialized { .. }
        ));
    }

    #[test]
    fn test_corrupt_record_releases_backend() {
        let f = write_temp("cut\n2 3 10.0 5 1\n10.0 5\n1 0.5\n");
        let mut reader = OutputReader::open(f.path()).unwrap();
        assert!(reader.read().is_err());
        assert!(!reader.is_open());
    }

    #[test]
    fn test_columnar_backend() {
        let meta = OutputMetadata {
            title: String::new(),
            n_snaps: 2,
            n_nodes: 3,
            dt: 10.0,
            dit: 5,
            n_cols: 1,
        };
        let f = tempfile::NamedTempFile::new().unwrap();
        {
            let mut writer = ColumnarWriter::new(f.reopen().unwrap(), &meta, false).unwrap();
            writer
                .write_full_record(&OutputRecord::scalar(10.0, 5, -99999.0, 3, vec![1.0, 2.0, 3.0]))
                .unwrap();
            writer
                .write_full_record(&OutputRecord::scalar(20.0, 10, -99999.0, 3, vec![4.0, 5.0, 6.0]))
                .unwrap();
            writer.flush().unwrap();
        }

        let mut reader = OutputReader::open(f.path()).unwrap();
        assert_eq!(reader.format(), OutputFormat::ColumnarFull);
        let r1 = reader.read().unwrap();
        assert!((r1.value(2).unwrap() - 3.0).abs() < 1e-12);
        let r2 = reader.read().unwrap();
        assert!((r2.value(0).unwrap() - 4.0).abs() < 1e-12);
        assert!(reader.read().is_err());
    }
}
