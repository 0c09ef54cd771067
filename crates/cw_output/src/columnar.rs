// crates/cw_output/src/columnar.rs

//! 二进制列式时间序列容器
//!
//! 布局 (全部小端):
//!
//! ```text
//! [0..4)   魔数 "CWC1"
//! [4..8)   版本 u32
//! [8..16)  快照数 u64
//! [16..24) 节点数 u64
//! [24..32) 输出时间间隔 f64
//! [32..40) 输出步间隔 u64
//! [40..44) 列数 u32 (1 标量 / 2 矢量)
//! [44..45) 稀疏标志 u8
//! 逐记录:
//!   时间 f64, 迭代步 u64, 默认值 f64, 有效节点数 u64,
//!   [稀疏时: 有效节点数 个 u64 编号 (1 起)],
//!   有效节点数 个 f64 u 列, [列数为 2 时再跟 v 列]
//! ```

use crate::reader::OutputMetadata;
use crate::record::OutputRecord;
use cw_foundation::ensure;
use cw_foundation::error::{CwError, CwResult};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// 容器魔数
pub const COLUMNAR_MAGIC: [u8; 4] = *b"CWC1";
/// 容器版本
pub const COLUMNAR_VERSION: u32 = 1;

// ============================================================================
// 读取
// ============================================================================

/// 列式容器数据源
#[derive(Debug)]
pub struct ColumnarSource<R: Read> {
    reader: R,
    file: PathBuf,
}

impl<R: Read> ColumnarSource<R> {
    /// 校验魔数与版本并读取文件头
    ///
    /// 返回 (数据源, 元数据, 是否稀疏)。
    ///
    /// # Errors
    /// 魔数/版本不符或文件头损坏时返回错误
    pub fn open(mut reader: R, source: &Path) -> CwResult<(Self, OutputMetadata, bool)> {
        let file = source.to_path_buf();

        let mut magic = [0u8; 4];
        read_exact(&mut reader, &mut magic, &file)?;
        ensure!(
            magic == COLUMNAR_MAGIC,
            CwError::format(&file, "魔数不符, 不是列式容器文件")
        );
        let version = read_u32(&mut reader, &file)?;
        ensure!(
            version == COLUMNAR_VERSION,
            CwError::format(&file, format!("不支持的容器版本: {version}"))
        );

        let n_snaps = read_u64(&mut reader, &file)? as usize;
        let n_nodes = read_u64(&mut reader, &file)? as usize;
        let dt = read_f64(&mut reader, &file)?;
        let dit = read_u64(&mut reader, &file)?;
        let n_cols = read_u32(&mut reader, &file)? as usize;
        let sparse = read_u8(&mut reader, &file)? != 0;

        if n_cols != 1 && n_cols != 2 {
            return Err(CwError::format(
                &file,
                format!("列数必须为1或2, 实际为 {n_cols}"),
            ));
        }

        let metadata = OutputMetadata {
            title: String::new(),
            n_snaps,
            n_nodes,
            dt,
            dit,
            n_cols,
        };
        Ok((Self { reader, file }, metadata, sparse))
    }

    /// 读取一条记录
    ///
    /// # Errors
    /// 数据在记录中途结束或节点编号越界时返回错误
    pub fn read_record(
        &mut self,
        metadata: &OutputMetadata,
        sparse: bool,
    ) -> CwResult<OutputRecord> {
        let time = read_f64(&mut self.reader, &self.file)?;
        let iteration = read_u64(&mut self.reader, &self.file)?;
        let default_value = read_f64(&mut self.reader, &self.file)?;
        let n_active = read_u64(&mut self.reader, &self.file)? as usize;

        if n_active > metadata.n_nodes {
            return Err(CwError::format(
                &self.file,
                format!(
                    "有效节点数 {n_active} 超过节点总数 {}",
                    metadata.n_nodes
                ),
            ));
        }

        let ids: Option<Vec<usize>> = if sparse {
            let mut ids = Vec::with_capacity(n_active);
            for _ in 0..n_active {
                let id = read_u64(&mut self.reader, &self.file)? as usize;
                if id < 1 || id > metadata.n_nodes {
                    return Err(CwError::UnknownNode { id });
                }
                ids.push(id);
            }
            Some(ids)
        } else {
            None
        };

        let u = self.read_column(metadata, n_active, default_value, ids.as_deref())?;
        let v = if metadata.n_cols == 2 {
            Some(self.read_column(metadata, n_active, default_value, ids.as_deref())?)
        } else {
            None
        };

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

    fn read_column(
        &mut self,
        metadata: &OutputMetadata,
        n_active: usize,
        default_value: f64,
        ids: Option<&[usize]>,
    ) -> CwResult<Vec<f64>> {
        let mut column = vec![default_value; metadata.n_nodes];
        for i in 0..n_active {
            let value = read_f64(&mut self.reader, &self.file)?;
            let index = match ids {
                Some(ids) => ids[i] - 1,
                None => i,
            };
            column[index] = value;
        }
        Ok(column)
    }
}

// ============================================================================
// 写出 (往返测试与格式转换使用)
// ============================================================================

/// 列式容器写出器
pub struct ColumnarWriter<W: Write> {
    writer: W,
    n_cols: usize,
    sparse: bool,
}

impl<W: Write> ColumnarWriter<W> {
    /// 写出文件头
    ///
    /// # Errors
    /// IO 失败时返回错误
    pub fn new(mut writer: W, metadata: &OutputMetadata, sparse: bool) -> CwResult<Self> {
        writer.write_all(&COLUMNAR_MAGIC)?;
        writer.write_all(&COLUMNAR_VERSION.to_le_bytes())?;
        writer.write_all(&(metadata.n_snaps as u64).to_le_bytes())?;
        writer.write_all(&(metadata.n_nodes as u64).to_le_bytes())?;
        writer.write_all(&metadata.dt.to_le_bytes())?;
        writer.write_all(&metadata.dit.to_le_bytes())?;
        writer.write_all(&(metadata.n_cols as u32).to_le_bytes())?;
        writer.write_all(&[u8::from(sparse)])?;
        Ok(Self {
            writer,
            n_cols: metadata.n_cols,
            sparse,
        })
    }

    /// 写出满存储记录
    ///
    /// # Errors
    /// 写出器为稀疏模式或 IO 失败时返回错误
    pub fn write_full_record(&mut self, record: &OutputRecord) -> CwResult<()> {
        if self.sparse {
            return Err(CwError::invalid_input("稀疏容器不接受满存储记录"));
        }
        self.write_record_head(record, record.n_nodes())?;
        for v in record.u_values() {
            self.writer.write_all(&v.to_le_bytes())?;
        }
        if self.n_cols == 2 {
            let v = record
                .v_values()
                .ok_or_else(|| CwError::invalid_input("矢量容器需要 v 分量"))?;
            for value in v {
                self.writer.write_all(&value.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// 写出稀疏记录，默认值节点不落盘
    ///
    /// # Errors
    /// 写出器为满存储模式或 IO 失败时返回错误
    pub fn write_sparse_record(&mut self, record: &OutputRecord) -> CwResult<()> {
        if !self.sparse {
            return Err(CwError::invalid_input("满存储容器不接受稀疏记录"));
        }
        let u = record.u_values();
        let v = record.v_values();

        let stored: Vec<usize> = (0..u.len())
            .filter(|&i| {
                u[i] != record.default_value
                    || v.is_some_and(|v| v[i] != record.default_value)
            })
            .collect();

        self.write_record_head(record, stored.len())?;
        for &i in &stored {
            self.writer.write_all(&((i + 1) as u64).to_le_bytes())?;
        }
        for &i in &stored {
            self.writer.write_all(&u[i].to_le_bytes())?;
        }
        if self.n_cols == 2 {
            let v = v.ok_or_else(|| CwError::invalid_input("矢量容器需要 v 分量"))?;
            for &i in &stored {
                self.writer.write_all(&v[i].to_le_bytes())?;
            }
        }
        Ok(())
    }

    fn write_record_head(&mut self, record: &OutputRecord, n_active: usize) -> CwResult<()> {
        self.writer.write_all(&record.time.to_le_bytes())?;
        self.writer.write_all(&record.iteration.to_le_bytes())?;
        self.writer.write_all(&record.default_value.to_le_bytes())?;
        self.writer.write_all(&(n_active as u64).to_le_bytes())?;
        Ok(())
    }

    /// 刷新底层 writer
    ///
    /// # Errors
    /// IO 失败时返回错误
    pub fn flush(&mut self) -> CwResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// 小端读取辅助
// ============================================================================

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], file: &Path) -> CwResult<()> {
    reader
        .read_exact(buf)
        .map_err(|_| CwError::format(file, "数据意外结束"))
}

fn read_u8<R: Read>(reader: &mut R, file: &Path) -> CwResult<u8> {
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf, file)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(reader: &mut R, file: &Path) -> CwResult<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf, file)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R, file: &Path) -> CwResult<u64> {
    let mut buf = [0u8; 8];
    read_exact(reader, &mut buf, file)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64<R: Read>(reader: &mut R, file: &Path) -> CwResult<f64> {
    let mut buf = [0u8; 8];
    read_exact(reader, &mut buf, file)?;
    Ok(f64::from_le_bytes(buf))
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn path() -> &'static Path {
        Path::new("output.cwc")
    }

    fn metadata(n_snaps: usize, n_nodes: usize, n_cols: usize) -> OutputMetadata {
        OutputMetadata {
            title: String::new(),
            n_snaps,
            n_nodes,
            dt: 10.0,
            dit: 5,
            n_cols,
        }
    }

    #[test]
    fn test_full_scalar_roundtrip() {
        let meta = metadata(2, 3, 1);
        let mut buf = Vec::new();
        {
            let mut writer = ColumnarWriter::new(&mut buf, &meta, false).unwrap();
            writer
                .write_full_record(&OutputRecord::scalar(10.0, 5, -99999.0, 3, vec![1.0, 2.0, 3.0]))
                .unwrap();
            writer
                .write_full_record(&OutputRecord::scalar(20.0, 10, -99999.0, 3, vec![4.0, 5.0, 6.0]))
                .unwrap();
        }

        let (mut src, meta2, sparse) = ColumnarSource::open(Cursor::new(&buf), path()).unwrap();
        assert!(!sparse);
        assert_eq!(meta2.n_snaps, 2);
        assert_eq!(meta2.n_nodes, 3);

        let r1 = src.read_record(&meta2, sparse).unwrap();
        assert!((r1.time - 10.0).abs() < 1e-12);
        assert!((r1.value(2).unwrap() - 3.0).abs() < 1e-12);

        let r2 = src.read_record(&meta2, sparse).unwrap();
        assert_eq!(r2.iteration, 10);
        assert!((r2.value(0).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_sparse_vector_roundtrip() {
        let meta = metadata(1, 4, 2);
        let record = OutputRecord::vector(
            10.0,
            5,
            0.0,
            2,
            vec![3.0, 0.0, 0.0, 1.0],
            vec![4.0, 0.0, 0.0, 2.0],
        )
        .unwrap();

        let mut buf = Vec::new();
        {
            let mut writer = ColumnarWriter::new(&mut buf, &meta, true).unwrap();
            writer.write_sparse_record(&record).unwrap();
        }

        let (mut src, meta2, sparse) = ColumnarSource::open(Cursor::new(&buf), path()).unwrap();
        assert!(sparse);
        let r = src.read_record(&meta2, sparse).unwrap();
        assert_eq!(r.n_active, 2);
        assert!((r.magnitude(0).unwrap() - 5.0).abs() < 1e-12);
        // 未存储的节点落回默认值
        assert!(r.u(1).unwrap().abs() < 1e-12);
        assert!((r.v(3).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_magic() {
        let buf = b"NOPE00000000".to_vec();
        let err = ColumnarSource::open(Cursor::new(&buf), path()).unwrap_err();
        assert!(matches!(err, CwError::Format { .. }));
    }

    #[test]
    fn test_truncated_payload() {
        let meta = metadata(1, 3, 1);
        let mut buf = Vec::new();
        {
            let mut writer = ColumnarWriter::new(&mut buf, &meta, false).unwrap();
            writer
                .write_full_record(&OutputRecord::scalar(10.0, 5, 0.0, 3, vec![1.0, 2.0, 3.0]))
                .unwrap();
        }
        buf.truncate(buf.len() - 4);

        let (mut src, meta2, sparse) = ColumnarSource::open(Cursor::new(&buf), path()).unwrap();
        let err = src.read_record(&meta2, sparse).unwrap_err();
        assert!(matches!(err, CwError::Format { .. }));
    }

    #[test]
    fn test_mode_mismatch() {
        let meta = metadata(1, 2, 1);
        let mut buf = Vec::new();
        let mut writer = ColumnarWriter::new(&mut buf, &meta, false).unwrap();
        let record = OutputRecord::scalar(0.0, 0, 0.0, 2, vec![1.0, 2.0]);
        assert!(writer.write_sparse_record(&record).is_err());
        assert!(writer.write_full_record(&record).is_ok());
    }
}
