// crates/cw_geo/src/geometry.rs

//! 二维几何基元
//!
//! # 示例
//!
//! ```
//! use cw_geo::geometry::Point2D;
//!
//! let p1 = Point2D::new(0.0, 0.0);
//! let p2 = Point2D::new(3.0, 4.0);
//! assert!((p1.distance_to(&p2) - 5.0).abs() < 1e-10);
//! ```

use serde::{Deserialize, Serialize};

/// 二维点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// x 坐标 (投影坐标系下为米, 地理坐标系下为经度)
    pub x: f64,
    /// y 坐标 (投影坐标系下为米, 地理坐标系下为纬度)
    pub y: f64,
}

impl Point2D {
    /// 创建新的点
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 原点
    #[must_use]
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// 到另一点的欧氏距离
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    /// 到另一点的距离平方 (避免开方的比较路径)
    #[inline]
    #[must_use]
    pub fn distance_squared_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// 与另一点的中点
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point2D {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(p: Point2D) -> Self {
        [p.x, p.y]
    }
}
