// crates/cw_geo/src/ellipsoid.rs

//! 地球椭球体定义
//!
//! # 示例
//!
//! ```
//! use cw_geo::ellipsoid::Ellipsoid;
//!
//! let wgs84 = Ellipsoid::WGS84;
//! assert!((wgs84.a - 6_378_137.0).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};

/// 地球椭球体
///
/// 由长半轴与扁率定义，派生参数按需计算。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// 长半轴 (m)
    pub a: f64,
    /// 扁率 (flattening)
    pub f: f64,
}

impl Ellipsoid {
    /// WGS84 椭球体 (GPS 标准)
    ///
    /// - 长半轴: 6378137.0 m
    /// - 扁率: 1/298.257223563
    pub const WGS84: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// GRS80 椭球体
    pub const GRS80: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_222_101,
    };

    /// 第一偏心率平方 e² = f(2-f)
    #[must_use]
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// 第三扁率 n = f/(2-f)，Krüger 级数的展开参数
    #[must_use]
    pub fn third_flattening(&self) -> f64 {
        self.f / (2.0 - self.f)
    }

    /// 短半轴 b = a(1-f)
    #[must_use]
    pub fn b(&self) -> f64 {
        self.a * (1.0 - self.f)
    }
}
