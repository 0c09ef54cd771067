// crates/cw_geo/src/lib.rs

//! CoastalWorks 地理层
//!
//! 提供几何基元、坐标参考系统、纯 Rust 投影转换与空间索引。
//!
//! # 模块概览
//!
//! - [`geometry`]: 二维点与距离计算
//! - [`ellipsoid`]: 地球椭球体参数
//! - [`crs`]: 坐标参考系统 (地理 / UTM / Web Mercator)
//! - [`projection`]: 投影正反算 (Krüger 级数横轴墨卡托)
//! - [`transform`]: 坐标转换器与仿射变换
//! - [`spatial_index`]: 基于 R-tree 的空间索引
//!
//! # 示例
//!
//! ```
//! use cw_geo::crs::Crs;
//! use cw_geo::transform::GeoTransformer;
//!
//! let transformer = GeoTransformer::from_epsg(4326, 32650).unwrap();
//! let (x, y) = transformer.transform_point(116.0, 40.0).unwrap();
//! assert!(x > 400_000.0 && x < 600_000.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod crs;
pub mod ellipsoid;
pub mod geometry;
pub mod projection;
pub mod spatial_index;
pub mod transform;

// 重导出常用类型
pub use crs::Crs;
pub use ellipsoid::Ellipsoid;
pub use geometry::Point2D;
pub use spatial_index::{BoundingBox, SpatialIndex};
pub use transform::{AffineTransform, GeoTransformer};
