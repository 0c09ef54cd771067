// crates/cw_mesh/src/mesh.rs

//! 非结构网格模型
//!
//! 节点与单元存放在连续数组中，文件声明编号与数组下标是两个独立的
//! 编号空间: `node(position)` 按 0 起的数组下标访问，`node_by_id(id)`
//! 按文件声明编号 (1 起, 允许有空洞) 解析。编号连续时按偏移直接换算，
//! 不连续时才构建哈希查找表。
//!
//! # 示例
//!
//! ```
//! use cw_mesh::mesh::Mesh;
//! use cw_mesh::node::Node;
//! use cw_mesh::element::Element;
//! use cw_geo::Crs;
//!
//! let nodes = vec![
//!     Node::new(1, 0.0, 0.0, -2.0),
//!     Node::new(2, 1.0, 0.0, -2.0),
//!     Node::new(3, 0.0, 1.0, -2.0),
//! ];
//! let elements = vec![Element::new(1, vec![1, 2, 3]).unwrap()];
//! let mesh = Mesh::new("demo".into(), nodes, elements, vec![], vec![], Crs::wgs84()).unwrap();
//! assert_eq!(mesh.n_nodes(), 3);
//! ```

use crate::boundary::{LandBoundary, OpenBoundary};
use crate::element::Element;
use crate::node::Node;
use cw_foundation::error::{CwError, CwResult};
use cw_geo::spatial_index::{BoundingBox, SpatialIndex};
use cw_geo::transform::GeoTransformer;
use cw_geo::{Crs, Point2D};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// 非结构网格
#[derive(Debug)]
pub struct Mesh {
    /// 网格标题 (文件首行)
    pub title: String,
    nodes: Vec<Node>,
    elements: Vec<Element>,
    open_boundaries: Vec<OpenBoundary>,
    land_boundaries: Vec<LandBoundary>,
    crs: Crs,
    /// 声明编号 -> 数组下标；编号连续时为 None，走偏移快速路径
    node_lookup: Option<HashMap<usize, usize>>,
    element_lookup: Option<HashMap<usize, usize>>,
    spatial_index: Option<SpatialIndex<usize>>,
}

impl Mesh {
    /// 组装网格并校验引用完整性
    ///
    /// # Errors
    /// 单元或边界引用了不存在的节点编号时返回
    /// [`CwError::ReferentialIntegrity`]
    pub fn new(
        title: String,
        nodes: Vec<Node>,
        elements: Vec<Element>,
        open_boundaries: Vec<OpenBoundary>,
        land_boundaries: Vec<LandBoundary>,
        crs: Crs,
    ) -> CwResult<Self> {
        let node_lookup = build_lookup(nodes.iter().map(|n| n.id));
        let element_lookup = build_lookup(elements.iter().map(|e| e.id));

        let mesh = Self {
            title,
            nodes,
            elements,
            open_boundaries,
            land_boundaries,
            crs,
            node_lookup,
            element_lookup,
            spatial_index: None,
        };
        mesh.check_references()?;

        debug!(
            nodes = mesh.nodes.len(),
            elements = mesh.elements.len(),
            "网格组装完成"
        );
        Ok(mesh)
    }

    /// 从 ADCIRC ASCII 文件读取网格
    ///
    /// # Errors
    /// 文件不存在、格式无法识别或解析失败时返回错误
    pub fn read<P: AsRef<Path>>(path: P) -> CwResult<Self> {
        crate::io::AdcircLoader::load(path)
    }

    /// 写出 ADCIRC ASCII 文件
    ///
    /// # Errors
    /// IO 失败时返回错误
    pub fn write<P: AsRef<Path>>(&self, path: P) -> CwResult<()> {
        crate::io::AdcircWriter::write(self, path)
    }

    // ========================================================================
    // 计数与数组访问
    // ========================================================================

    /// 节点数
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// 单元数
    #[must_use]
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    /// 开边界数
    #[must_use]
    pub fn n_open_boundaries(&self) -> usize {
        self.open_boundaries.len()
    }

    /// 陆边界数
    #[must_use]
    pub fn n_land_boundaries(&self) -> usize {
        self.land_boundaries.len()
    }

    /// 按数组下标访问节点 (0 起)
    #[must_use]
    pub fn node(&self, position: usize) -> Option<&Node> {
        self.nodes.get(position)
    }

    /// 按数组下标访问单元 (0 起)
    #[must_use]
    pub fn element(&self, position: usize) -> Option<&Element> {
        self.elements.get(position)
    }

    /// 全部节点
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// 全部单元
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// 全部开边界
    #[must_use]
    pub fn open_boundaries(&self) -> &[OpenBoundary] {
        &self.open_boundaries
    }

    /// 全部陆边界
    #[must_use]
    pub fn land_boundaries(&self) -> &[LandBoundary] {
        &self.land_boundaries
    }

    // ========================================================================
    // 声明编号解析
    // ========================================================================

    /// 声明节点编号 -> 数组下标
    ///
    /// # Errors
    /// 编号不存在时返回 [`CwError::UnknownNode`]
    pub fn node_index_by_id(&self, id: usize) -> CwResult<usize> {
        match &self.node_lookup {
            Some(map) => map.get(&id).copied().ok_or(CwError::UnknownNode { id }),
            None => {
                if id >= 1 && id <= self.nodes.len() {
                    Ok(id - 1)
                } else {
                    Err(CwError::UnknownNode { id })
                }
            }
        }
    }

    /// 按声明编号访问节点
    ///
    /// # Errors
    /// 编号不存在时返回 [`CwError::UnknownNode`]
    pub fn node_by_id(&self, id: usize) -> CwResult<&Node> {
        let idx = self.node_index_by_id(id)?;
        Ok(&self.nodes[idx])
    }

    /// 声明单元编号 -> 数组下标
    ///
    /// # Errors
    /// 编号不存在时返回错误
    pub fn element_index_by_id(&self, id: usize) -> CwResult<usize> {
        match &self.element_lookup {
            Some(map) => map
                .get(&id)
                .copied()
                .ok_or_else(|| CwError::not_found(format!("单元 {id}"))),
            None => {
                if id >= 1 && id <= self.elements.len() {
                    Ok(id - 1)
                } else {
                    Err(CwError::not_found(format!("单元 {id}")))
                }
            }
        }
    }

    /// 节点编号是否连续 (1..=n)
    #[must_use]
    pub fn node_numbering_is_contiguous(&self) -> bool {
        self.node_lookup.is_none()
    }

    // ========================================================================
    // 几何查询
    // ========================================================================

    /// 坐标参考系统
    #[must_use]
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// 重新标注 CRS (不变换坐标，用于来源元数据缺失时)
    pub fn set_crs(&mut self, crs: Crs) {
        self.crs = crs;
    }

    /// 网格包围盒，空网格返回 None
    #[must_use]
    pub fn extent(&self) -> Option<BoundingBox> {
        let points: Vec<Point2D> = self.nodes.iter().map(Node::position).collect();
        BoundingBox::from_points(points.iter())
    }

    /// 单元形心
    ///
    /// # Errors
    /// 下标越界时返回错误
    pub fn element_centroid(&self, position: usize) -> CwResult<Point2D> {
        let element = self
            .elements
            .get(position)
            .ok_or_else(|| CwError::index_out_of_bounds("element", position, self.elements.len()))?;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for &id in &element.nodes {
            let node = self.node_by_id(id)?;
            cx += node.x;
            cy += node.y;
        }
        let n = element.nodes.len() as f64;
        Ok(Point2D::new(cx / n, cy / n))
    }

    /// 修改节点坐标，使已建的空间索引失效
    ///
    /// # Errors
    /// 下标越界时返回错误
    pub fn set_node_position(&mut self, position: usize, x: f64, y: f64) -> CwResult<()> {
        let len = self.nodes.len();
        let node = self
            .nodes
            .get_mut(position)
            .ok_or_else(|| CwError::index_out_of_bounds("node", position, len))?;
        node.x = x;
        node.y = y;
        self.spatial_index = None;
        Ok(())
    }

    // ========================================================================
    // 空间索引
    // ========================================================================

    /// 在当前坐标上整体构建空间索引
    pub fn build_spatial_index(&mut self) {
        let points: Vec<(Point2D, usize)> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.position(), i))
            .collect();
        self.spatial_index = Some(SpatialIndex::bulk_load(points));
        debug!(nodes = self.nodes.len(), "空间索引构建完成");
    }

    /// 空间索引是否已构建
    #[must_use]
    pub fn has_spatial_index(&self) -> bool {
        self.spatial_index.is_some()
    }

    /// 最近节点的数组下标
    ///
    /// # Errors
    /// 索引未构建时返回 [`CwError::NotInitialized`]，空网格返回 NotFound
    pub fn nearest_node(&self, x: f64, y: f64) -> CwResult<usize> {
        let index = self
            .spatial_index
            .as_ref()
            .ok_or(CwError::NotInitialized {
                what: "spatial index",
            })?;
        index
            .nearest(&Point2D::new(x, y))
            .map(|(_, &position)| position)
            .ok_or_else(|| CwError::not_found("最近节点 (空网格)".to_string()))
    }

    // ========================================================================
    // 重投影
    // ========================================================================

    /// 将全部节点坐标变换到目标 CRS
    ///
    /// 先在临时数组上完成全部变换，任一点失败则网格保持原样。
    /// 成功后更新 CRS 并丢弃空间索引。
    ///
    /// # Errors
    /// 任意坐标超出投影有效范围时返回错误
    pub fn reproject(&mut self, target: &Crs) -> CwResult<()> {
        if *target == self.crs {
            return Ok(());
        }
        let transformer = GeoTransformer::new(&self.crs, target);

        let mut xs: Vec<f64> = self.nodes.iter().map(|n| n.x).collect();
        let mut ys: Vec<f64> = self.nodes.iter().map(|n| n.y).collect();
        transformer.transform_inplace(&mut xs, &mut ys)?;

        for (node, (x, y)) in self.nodes.iter_mut().zip(xs.into_iter().zip(ys)) {
            node.x = x;
            node.y = y;
        }
        self.crs = *target;
        self.spatial_index = None;
        debug!(crs = %self.crs, "网格重投影完成");
        Ok(())
    }

    // ========================================================================
    // 完整性校验
    // ========================================================================

    fn check_references(&self) -> CwResult<()> {
        for element in &self.elements {
            for &id in &element.nodes {
                if self.node_index_by_id(id).is_err() {
                    return Err(CwError::referential_integrity("element", element.id, id));
                }
            }
        }
        for (i, boundary) in self.open_boundaries.iter().enumerate() {
            for &id in &boundary.nodes {
                if self.node_index_by_id(id).is_err() {
                    return Err(CwError::referential_integrity("open boundary", i + 1, id));
                }
            }
        }
        for (i, boundary) in self.land_boundaries.iter().enumerate() {
            for id in boundary.all_nodes() {
                if self.node_index_by_id(id).is_err() {
                    return Err(CwError::referential_integrity("land boundary", i + 1, id));
                }
            }
        }
        Ok(())
    }
}

/// 编号连续时返回 None，否则构建编号 -> 下标映射
fn build_lookup(ids: impl ExactSizeIterator<Item = usize> + Clone) -> Option<HashMap<usize, usize>> {
    let contiguous = ids.clone().enumerate().all(|(i, id)| id == i + 1);
    if contiguous {
        None
    } else {
        Some(ids.enumerate().map(|(i, id)| (id, i)).collect())
    }
}

// ============================================================================
// 测试
// ============================================================================
