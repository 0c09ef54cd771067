// crates/cw_mesh/src/lib.rs

//! CoastalWorks 网格层
//!
//! 非结构网格模型、ADCIRC ASCII 格式读写与节点属性表。
//!
//! # 模块概览
//!
//! - [`node`] / [`element`] / [`boundary`]: 网格要素值类型
//! - [`mesh`]: 网格容器，双编号空间、空间查询与重投影
//! - [`io`]: ADCIRC ASCII (fort.14 / .grd) 读写
//! - [`attributes`]: 节点属性表 (fort.13)
//!
//! # 示例
//!
//! ```ignore
//! use cw_mesh::mesh::Mesh;
//!
//! let mut mesh = Mesh::read("fort.14")?;
//! mesh.build_spatial_index();
//! let position = mesh.nearest_node(121.5, 30.2)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attributes;
pub mod boundary;
pub mod element;
pub mod io;
pub mod mesh;
pub mod node;

// 重导出常用类型
pub use attributes::NodalAttributes;
pub use boundary::{LandBoundary, OpenBoundary};
pub use element::Element;
pub use mesh::Mesh;
pub use node::Node;
