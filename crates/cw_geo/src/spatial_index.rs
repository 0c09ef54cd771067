// crates/cw_geo/src/spatial_index.rs

//! 空间索引实现
//!
//! 基于 R-tree 的点集空间索引。索引整体批量构建，坐标变化后重建，
//! 不做增量修补。
//!
//! # 示例
//!
//! ```
//! use cw_geo::spatial_index::SpatialIndex;
//! use cw_geo::geometry::Point2D;
//!
//! let index = SpatialIndex::bulk_load(vec![
//!     (Point2D::new(0.0, 0.0), 1u32),
//!     (Point2D::new(10.0, 10.0), 2),
//! ]);
//! let (_, data) = index.nearest(&Point2D::new(1.0, 1.0)).unwrap();
//! assert_eq!(*data, 1);
//! ```

use crate::geometry::Point2D;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

// ============================================================================
// 边界框
// ============================================================================

/// 轴对齐边界框
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// 最小 x
    pub min_x: f64,
    /// 最小 y
    pub min_y: f64,
    /// 最大 x
    pub max_x: f64,
    /// 最大 y
    pub max_y: f64,
}

impl BoundingBox {
    /// 创建新的边界框，角点顺序自动规范化
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// 包含点集的最小边界框，空集返回 None
    #[must_use]
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point2D>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    /// 点是否在框内 (含边界)
    #[must_use]
    pub fn contains_point(&self, point: &Point2D) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// 宽度
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// 高度
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// 中心点
    #[must_use]
    pub fn center(&self) -> Point2D {
        Point2D::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

// ============================================================================
// R-tree 包装
// ============================================================================

/// 空间索引条目
#[derive(Debug, Clone)]
struct IndexedPoint<T> {
    point: Point2D,
    data: T,
}

impl<T> RTreeObject for IndexedPoint<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.point.x, self.point.y])
    }
}

impl<T> PointDistance for IndexedPoint<T> {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point.x - point[0];
        let dy = self.point.y - point[1];
        dx * dx + dy * dy
    }
}

/// 点集空间索引
#[derive(Debug)]
pub struct SpatialIndex<T> {
    tree: RTree<IndexedPoint<T>>,
}

impl<T> SpatialIndex<T> {
    /// 从点集批量构建
    #[must_use]
    pub fn bulk_load(points: Vec<(Point2D, T)>) -> Self {
        let entries: Vec<IndexedPoint<T>> = points
            .into_iter()
            .map(|(point, data)| IndexedPoint { point, data })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// 最近的一个点
    #[must_use]
    pub fn nearest(&self, point: &Point2D) -> Option<(&Point2D, &T)> {
        self.tree
            .nearest_neighbor(&[point.x, point.y])
            .map(|entry| (&entry.point, &entry.data))
    }

    /// 最近的 k 个点，按距离升序
    #[must_use]
    pub fn nearest_k(&self, point: &Point2D, k: usize) -> Vec<(&Point2D, &T)> {
        self.tree
            .nearest_neighbor_iter(&[point.x, point.y])
            .take(k)
            .map(|entry| (&entry.point, &entry.data))
            .collect()
    }

    /// 指定距离内的全部点，按距离升序
    #[must_use]
    pub fn within_distance(&self, point: &Point2D, distance: f64) -> Vec<(&Point2D, &T)> {
        let dist_squared = distance * distance;
        self.tree
            .nearest_neighbor_iter(&[point.x, point.y])
            .take_while(|entry| entry.distance_2(&[point.x, point.y]) <= dist_squared)
            .map(|entry| (&entry.point, &entry.data))
            .collect()
    }

    /// 边界框内的全部点
    #[must_use]
    pub fn query_range(&self, bbox: &BoundingBox) -> Vec<(&Point2D, &T)> {
        let envelope = AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]);
        self.tree
            .locate_in_envelope(&envelope)
            .map(|entry| (&entry.point, &entry.data))
            .collect()
    }

    /// 索引中的点数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// 是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> SpatialIndex<u32> {
        SpatialIndex::bulk_load(vec![
            (Point2D::new(0.0, 0.0), 1),
            (Point2D::new(10.0, 10.0), 2),
            (Point2D::new(20.0, 20.0), 3),
            (Point2D::new(5.0, 0.0), 4),
        ])
    }

    #[test]
    fn test_nearest() {
        let index = sample_index();
        let (p, data) = index.nearest(&Point2D::new(1.0, 1.0)).unwrap();
        assert_eq!(*data, 1);
        assert!((p.x).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_k_ordering() {
        let index = sample_index();
        let results = index.nearest_k(&Point2D::new(0.0, 0.0), 3);
        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].1, 1);
        assert_eq!(*results[1].1, 4);
        assert_eq!(*results[2].1, 2);
    }

    #[test]
    fn test_within_distance() {
        let index = sample_index();
        let results = index.within_distance(&Point2D::new(0.0, 0.0), 6.0);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_query_range() {
        let index = sample_index();
        let bbox = BoundingBox::new(-1.0, -1.0, 6.0, 6.0);
        let results = index.query_range(&bbox);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        // 伪随机点集上与暴力扫描对照
        let mut points = Vec::new();
        let mut seed = 12345u64;
        for i in 0..200u32 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let x = (seed >> 33) as f64 / 4.0e8;
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let y = (seed >> 33) as f64 / 4.0e8;
            points.push((Point2D::new(x, y), i));
        }
        let index = SpatialIndex::bulk_load(points.clone());

        let queries = [
            Point2D::new(1.0, 1.0),
            Point2D::new(3.5, 0.2),
            Point2D::new(0.0, 4.9),
        ];
        for q in queries {
            let brute = points
                .iter()
                .min_by(|a, b| {
                    a.0.distance_squared_to(&q)
                        .partial_cmp(&b.0.distance_squared_to(&q))
                        .unwrap()
                })
                .unwrap();
            let (_, data) = index.nearest(&q).unwrap();
            assert_eq!(*data, brute.1);
        }
    }

    #[test]
    fn test_empty_index() {
        let index: SpatialIndex<u32> = SpatialIndex::bulk_load(Vec::new());
        assert!(index.is_empty());
        assert!(index.nearest(&Point2D::origin()).is_none());
    }

    #[test]
    fn test_bounding_box_from_points() {
        let pts = [Point2D::new(1.0, 5.0), Point2D::new(-2.0, 3.0)];
        let bbox = BoundingBox::from_points(pts.iter()).unwrap();
        assert!((bbox.min_x + 2.0).abs() < 1e-12);
        assert!((bbox.max_y - 5.0).abs() < 1e-12);
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }
}
