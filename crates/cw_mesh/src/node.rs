// crates/cw_mesh/src/node.rs

//! 网格节点

use cw_geo::Point2D;

/// 网格节点
///
/// `id` 为文件中声明的节点编号 (1 起, 允许不连续)，与数组下标分离。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// 声明编号
    pub id: usize,
    /// x 坐标 (经度或东向米)
    pub x: f64,
    /// y 坐标 (纬度或北向米)
    pub y: f64,
    /// 高程 (正值朝下的水深约定由数据源决定，本层不翻转)
    pub z: f64,
}

impl Node {
    /// 创建新节点
    #[must_use]
    pub fn new(id: usize, x: f64, y: f64, z: f64) -> Self {
        Self { id, x, y, z }
    }

    /// 水平位置
    #[must_use]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// 到另一节点的水平距离
    #[must_use]
    pub fn distance_to(&self, other: &Node) -> f64 {
        self.position().distance_to(&other.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Node::new(1, 0.0, 0.0, -5.0);
        let b = Node::new(2, 3.0, 4.0, -7.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }
}
