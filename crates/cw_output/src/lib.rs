// crates/cw_output/src/lib.rs

//! CoastalWorks 输出层
//!
//! 模型输出时间序列 (ASCII 与列式容器, 满存储与稀疏, 标量与矢量)
//! 的统一读取, 以及分潮谐波解文件的读取。
//!
//! # 模块概览
//!
//! - [`record`]: 时间快照与派生量 (幅值/方向)
//! - [`ascii`] / [`columnar`]: 两种文件格式的后端
//! - [`reader`]: 格式自动识别的读取器门面, 带逐槽释放
//! - [`harmonics`]: 分潮谐波解 (fort.53 / fort.54 风格)
//!
//! # 示例
//!
//! ```ignore
//! use cw_output::reader::OutputReader;
//!
//! let mut reader = OutputReader::open("fort.63")?;
//! let record = reader.read()?;
//! let eta = record.value(0)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ascii;
pub mod columnar;
pub mod harmonics;
pub mod reader;
pub mod record;

// 重导出常用类型
pub use harmonics::{Constituent, HarmonicsKind, HarmonicsReader};
pub use reader::{OutputFormat, OutputMetadata, OutputReader};
pub use record::{AngleUnit, OutputRecord};
