// crates/cw_wind/src/lib.rs

//! CoastalWorks 风场层
//!
//! 基于地表粗糙度的分扇区风削减: 地类栅格采样抽象、粗糙度查找表
//! 与逐节点并行的削减引擎。
//!
//! # 模块概览
//!
//! - [`lookup`]: 地类码 -> 12 扇区粗糙度长度查找表
//! - [`raster`]: [`raster::RasterSource`] 特征与内存栅格实现
//! - [`reduction`]: 高斯加权分扇区削减引擎
//!
//! # 示例
//!
//! ```ignore
//! use cw_wind::{DirectionalReductionEngine, SectorLookupTable};
//!
//! let lookup = SectorLookupTable::read("roughness.table")?;
//! let engine = DirectionalReductionEngine::new(&mesh, &raster, &lookup)?;
//! let factors = engine.compute_with_progress(|done, total| {
//!     println!("{done}/{total}");
//! });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lookup;
pub mod raster;
pub mod reduction;

// 重导出常用类型
pub use lookup::{SectorLookupTable, N_SECTORS};
pub use raster::{ClassSample, MemoryRaster, RasterSource};
pub use reduction::{DirectionalReductionEngine, OPEN_TERRAIN_Z0, SENTINEL, WIND_RADIUS};
