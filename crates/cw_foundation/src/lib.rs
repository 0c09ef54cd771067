// crates/cw_foundation/src/lib.rs

//! CoastalWorks 基础层
//!
//! 最小依赖基础层，提供整个数据引擎的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `CwError` / `CwResult`
//!
//! # 设计原则
//!
//! 1. **最小依赖**: 仅依赖 thiserror
//! 2. **可定位错误**: 解析错误携带文件与行号
//! 3. **读取器状态显式化**: 数据末尾与记录释放是枚举变体，不是哨兵值
//!
//! # 示例
//!
//! ```
//! use cw_foundation::{ensure, error::{CwError, CwResult}};
//!
//! fn check_count(n: usize) -> CwResult<()> {
//!     ensure!(n > 0, CwError::invalid_input("节点数必须为正"));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

// 重导出常用类型
pub use error::{CwError, CwResult};

/// 条件检查宏: 条件不满足时提前返回错误
///
/// # 示例
///
/// ```
/// use cw_foundation::{ensure, error::{CwError, CwResult}};
///
/// fn validate(width: usize) -> CwResult<()> {
///     ensure!(width == 1 || width == 12, CwError::config("宽度必须为1或12"));
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

/// Option 解包宏: 值缺失时提前返回错误
///
/// # 示例
///
/// ```
/// use cw_foundation::{require, error::{CwError, CwResult}};
///
/// fn lookup(opt: Option<usize>) -> CwResult<usize> {
///     let v = require!(opt, CwError::not_found("节点索引"));
///     Ok(v)
/// }
/// ```
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr) => {
        match $opt {
            Some(v) => v,
            None => return Err($err),
        }
    };
}

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::error::{CwError, CwResult};
    pub use crate::{ensure, require};
}
