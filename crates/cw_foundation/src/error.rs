// crates/cw_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `CwError` 枚举和 `CwResult` 类型别名，用于整个项目的错误处理。
//!
//! # 设计原则
//!
//! 1. **层次化**: 基础层定义全部数据引擎错误，各 crate 直接复用
//! 2. **可定位**: 解析类错误必须携带文件路径与行号
//! 3. **可恢复区分**: `EndOfData` / `RecordEvicted` 是顺序读取器的
//!    预期状态，不是故障
//!
//! # 示例
//!
//! ```
//! use cw_foundation::error::{CwError, CwResult};
//!
//! fn read_header() -> CwResult<()> {
//!     Err(CwError::parse("fort.14", 2, "无法解析节点数"))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type CwResult<T> = Result<T, CwError>;

/// CoastalWorks 错误类型
///
/// 核心错误类型，覆盖网格、属性表、输出文件与风折减计算的全部故障面。
#[derive(Error, Debug)]
pub enum CwError {
    // ========================================================================
    // IO 相关错误
    // ========================================================================

    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 文件解析错误
    #[error("文件解析错误: {file} 第{line}行: {message}")]
    Parse {
        /// 文件路径
        file: PathBuf,
        /// 行号 (1 起)
        line: usize,
        /// 错误信息
        message: String,
    },

    /// 不支持的文件格式
    #[error("不支持的文件格式: {path}")]
    UnknownFormat {
        /// 输入文件
        path: PathBuf,
    },

    /// 文件头与载荷不一致
    #[error("文件头不一致: {file}: {message}")]
    Format {
        /// 文件路径
        file: PathBuf,
        /// 不一致说明
        message: String,
    },

    // ========================================================================
    // 数据完整性错误
    // ========================================================================

    /// 引用完整性错误 (悬垂的节点/单元引用)
    #[error("引用完整性错误: {referrer} {referrer_id} 引用了不存在的节点 {node_id}")]
    ReferentialIntegrity {
        /// 引用方类别 ("element", "boundary")
        referrer: &'static str,
        /// 引用方声明 ID
        referrer_id: usize,
        /// 缺失的节点 ID
        node_id: usize,
    },

    /// 属性维度不匹配
    #[error("属性维度不匹配: {attribute} 声明宽度 {expected}, 实际 {actual}")]
    DimensionMismatch {
        /// 属性名
        attribute: String,
        /// 声明宽度
        expected: usize,
        /// 实际宽度
        actual: usize,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引越界
    #[error("索引越界: {index_type} 索引 {index} 超出范围 0..{len}")]
    IndexOutOfBounds {
        /// 索引类别描述
        index_type: &'static str,
        /// 访问的索引
        index: usize,
        /// 上界（长度）
        len: usize,
    },

    // ========================================================================
    // 顺序读取器的预期状态
    // ========================================================================

    /// 已读到最后一条记录之后
    #[error("已到数据末尾: 记录 {current} / {total}")]
    EndOfData {
        /// 当前游标位置
        current: usize,
        /// 总记录数
        total: usize,
    },

    /// 记录已被显式释放
    #[error("记录 {index} 的载荷已被释放")]
    RecordEvicted {
        /// 被释放的记录槽位
        index: usize,
    },

    // ========================================================================
    // 查询失败
    // ========================================================================

    /// 未知节点 ID
    #[error("未知节点: ID {id} 不在文件的节点集中")]
    UnknownNode {
        /// 查询的声明 ID
        id: usize,
    },

    /// 未知分潮名
    #[error("未知分潮: {name}")]
    UnknownConstituent {
        /// 查询的分潮名
        name: String,
    },

    /// 资源未找到
    #[error("资源未找到: {resource}")]
    NotFound {
        /// 资源名称
        resource: String,
    },

    // ========================================================================
    // 配置与状态错误
    // ========================================================================

    /// 配置错误 (坐标系无法解析、查找表损坏等，批量计算前抛出)
    #[error("配置错误: {message}")]
    Config {
        /// 具体错误信息
        message: String,
    },

    /// 结构未初始化 (如构建前查询空间索引)
    #[error("未初始化: {what}")]
    NotInitialized {
        /// 未初始化的结构描述
        what: &'static str,
    },

    /// 投影错误
    #[error("投影错误: {0}")]
    Projection(String),

    /// 坐标系错误
    #[error("坐标系错误: {0}")]
    Crs(String),

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl CwError {
    /// 从IO错误创建
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 从IO错误创建（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 解析错误
    pub fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// 格式无法识别
    pub fn unknown_format(path: impl Into<PathBuf>) -> Self {
        Self::UnknownFormat { path: path.into() }
    }

    /// 文件头不一致
    pub fn format(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            file: file.into(),
            message: message.into(),
        }
    }

    /// 引用完整性错误
    pub fn referential_integrity(
        referrer: &'static str,
        referrer_id: usize,
        node_id: usize,
    ) -> Self {
        Self::ReferentialIntegrity {
            referrer,
            referrer_id,
            node_id,
        }
    }

    /// 属性维度不匹配
    pub fn dimension_mismatch(
        attribute: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::DimensionMismatch {
            attribute: attribute.into(),
            expected,
            actual,
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 索引越界
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 数据末尾
    pub fn end_of_data(current: usize, total: usize) -> Self {
        Self::EndOfData { current, total }
    }

    /// 记录已释放
    pub fn record_evicted(index: usize) -> Self {
        Self::RecordEvicted { index }
    }

    /// 未知节点
    pub fn unknown_node(id: usize) -> Self {
        Self::UnknownNode { id }
    }

    /// 未知分潮
    pub fn unknown_constituent(name: impl Into<String>) -> Self {
        Self::UnknownConstituent { name: name.into() }
    }

    /// 资源未找到
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 配置错误
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// 未初始化
    pub fn not_initialized(what: &'static str) -> Self {
        Self::NotInitialized { what }
    }

    /// 投影错误
    pub fn projection(message: impl Into<String>) -> Self {
        Self::Projection(message.into())
    }

    /// 坐标系错误
    pub fn crs(message: impl Into<String>) -> Self {
        Self::Crs(message.into())
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl CwError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> CwResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查索引是否在范围内
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> CwResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }

    /// 是否为顺序读取器的预期状态 (而非真正故障)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EndOfData { .. } | Self::RecordEvicted { .. })
    }
}

// ========================================================================
// 标准库错误转换
// ========================================================================

impl From<std::io::Error> for CwError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ========================================================================
// 测试
// ========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_location() {
        let err = CwError::parse("fort.14", 17, "节点坐标无法解析");
        let s = err.to_string();
        assert!(s.contains("fort.14"));
        assert!(s.contains("17"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = CwError::dimension_mismatch("surface_directional_effective_roughness_length", 12, 3);
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("3"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(CwError::end_of_data(3, 3).is_recoverable());
        assert!(CwError::record_evicted(1).is_recoverable());
        assert!(!CwError::unknown_node(42).is_recoverable());
        assert!(!CwError::io("读取失败").is_recoverable());
    }

    #[test]
    fn test_check_size() {
        assert!(CwError::check_size("nodes", 10, 10).is_ok());
        assert!(CwError::check_size("nodes", 10, 5).is_err());
    }

    #[test]
    fn test_check_index() {
        assert!(CwError::check_index("record", 2, 3).is_ok());
        assert!(CwError::check_index("record", 3, 3).is_err());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let cw_err: CwError = io_err.into();
        assert!(matches!(cw_err, CwError::Io { .. }));
    }
}
