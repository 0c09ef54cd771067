// crates/cw_geo/src/transform.rs

//! 坐标转换器
//!
//! 基于纯 Rust 投影实现的坐标系间转换，以及栅格像素坐标使用的仿射变换。
//!
//! # 示例
//!
//! ```
//! use cw_geo::transform::{AffineTransform, GeoTransformer};
//!
//! let affine = AffineTransform::identity();
//! let (x, y) = affine.apply(10.0, 20.0);
//! assert!((x - 10.0).abs() < 1e-12);
//!
//! let transformer = GeoTransformer::from_epsg(4326, 32650).unwrap();
//! let (utm_x, _utm_y) = transformer.transform_point(116.0, 40.0).unwrap();
//! assert!(utm_x > 400_000.0);
//! ```

use crate::crs::Crs;
use crate::projection::Projection;
use cw_foundation::error::CwResult;

// ============================================================================
// 仿射变换
// ============================================================================

/// 仿射变换矩阵
///
/// 用于栅格像素坐标到地理坐标的转换:
/// - x' = a*col + b*row + c
/// - y' = d*col + e*row + f
#[derive(Debug, Clone, Copy)]
pub struct AffineTransform {
    /// x 方向缩放系数
    pub a: f64,
    /// x 方向倾斜系数
    pub b: f64,
    /// x 平移量
    pub c: f64,
    /// y 方向倾斜系数
    pub d: f64,
    /// y 方向缩放系数
    pub e: f64,
    /// y 平移量
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    /// 恒等变换
    #[must_use]
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 1.0,
            f: 0.0,
        }
    }

    /// 从 GDAL `GeoTransform` 数组创建
    ///
    /// GDAL 格式: [c, a, b, f, d, e] (原点x, 像元宽, 旋转, 原点y, 旋转, 像元高)
    #[must_use]
    pub fn from_gdal_geotransform(gt: [f64; 6]) -> Self {
        Self {
            c: gt[0],
            a: gt[1],
            b: gt[2],
            f: gt[3],
            d: gt[4],
            e: gt[5],
        }
    }

    /// 转换为 GDAL `GeoTransform` 格式
    #[must_use]
    pub fn to_gdal_geotransform(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// 规则北向上栅格的变换 (无旋转项)
    #[must_use]
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            a: pixel_width,
            b: 0.0,
            c: origin_x,
            d: 0.0,
            e: pixel_height,
            f: origin_y,
        }
    }

    /// 应用正向变换
    #[inline]
    #[must_use]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }

    /// 计算逆变换，退化矩阵返回 None
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < 1e-15 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Self {
            a: self.e * inv_det,
            b: -self.b * inv_det,
            c: (self.b * self.f - self.c * self.e) * inv_det,
            d: -self.d * inv_det,
            e: self.a * inv_det,
            f: (self.c * self.d - self.a * self.f) * inv_det,
        })
    }

    /// 应用逆变换
    #[must_use]
    pub fn apply_inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        self.inverse().map(|inv| inv.apply(x, y))
    }

    /// 变换的行列式
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// 是否为恒等变换
    #[must_use]
    pub fn is_identity(&self) -> bool {
        (self.a - 1.0).abs() < 1e-10
            && self.b.abs() < 1e-10
            && self.c.abs() < 1e-10
            && self.d.abs() < 1e-10
            && (self.e - 1.0).abs() < 1e-10
            && self.f.abs() < 1e-10
    }
}

// ============================================================================
// 地理坐标转换器
// ============================================================================

/// 地理坐标转换器
///
/// 单点转换经由地理坐标中转: 源坐标反算到经纬度，再正算到目标坐标。
/// 源与目标相同时走恒等快速路径。
#[derive(Debug, Clone)]
pub struct GeoTransformer {
    source_crs: Crs,
    target_crs: Crs,
    source_proj: Projection,
    target_proj: Projection,
    is_identity: bool,
}

impl GeoTransformer {
    /// 创建新的坐标转换器
    #[must_use]
    pub fn new(source: &Crs, target: &Crs) -> Self {
        Self {
            source_crs: *source,
            target_crs: *target,
            source_proj: Projection::for_crs(source),
            target_proj: Projection::for_crs(target),
            is_identity: source == target,
        }
    }

    /// 从 EPSG 代码创建转换器
    ///
    /// # Errors
    /// EPSG 代码无效时返回错误
    pub fn from_epsg(source_epsg: u32, target_epsg: u32) -> CwResult<Self> {
        let source = Crs::from_epsg(source_epsg)?;
        let target = Crs::from_epsg(target_epsg)?;
        Ok(Self::new(&source, &target))
    }

    /// 恒等转换器
    #[must_use]
    pub fn identity() -> Self {
        Self::new(&Crs::wgs84(), &Crs::wgs84())
    }

    /// 正向变换单点
    ///
    /// # Errors
    /// 坐标超出投影有效范围时返回错误
    #[inline]
    pub fn transform_point(&self, x: f64, y: f64) -> CwResult<(f64, f64)> {
        if self.is_identity {
            return Ok((x, y));
        }
        let (lon, lat) = self.source_proj.inverse(x, y)?;
        self.target_proj.forward(lon, lat)
    }

    /// 逆向变换单点
    ///
    /// # Errors
    /// 坐标超出投影有效范围时返回错误
    #[inline]
    pub fn inverse_transform_point(&self, x: f64, y: f64) -> CwResult<(f64, f64)> {
        if self.is_identity {
            return Ok((x, y));
        }
        let (lon, lat) = self.target_proj.inverse(x, y)?;
        self.source_proj.forward(lon, lat)
    }

    /// 就地变换坐标数组
    ///
    /// 任意一点失败则整体失败，此时数组内容不保证完整，调用方应丢弃。
    ///
    /// # Errors
    /// 任意坐标超出有效范围时返回错误
    pub fn transform_inplace(&self, x: &mut [f64], y: &mut [f64]) -> CwResult<()> {
        if self.is_identity {
            return Ok(());
        }
        let n = x.len().min(y.len());
        for i in 0..n {
            let (nx, ny) = self.transform_point(x[i], y[i])?;
            x[i] = nx;
            y[i] = ny;
        }
        Ok(())
    }

    /// 批量正向变换
    ///
    /// # Errors
    /// 任意坐标超出有效范围时返回错误
    pub fn transform_points(&self, points: &[(f64, f64)]) -> CwResult<Vec<(f64, f64)>> {
        if self.is_identity {
            return Ok(points.to_vec());
        }
        points
            .iter()
            .map(|&(x, y)| self.transform_point(x, y))
            .collect()
    }

    /// 源 CRS
    #[must_use]
    pub fn source_crs(&self) -> &Crs {
        &self.source_crs
    }

    /// 目标 CRS
    #[must_use]
    pub fn target_crs(&self) -> &Crs {
        &self.target_crs
    }

    /// 是否为恒等变换
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.is_identity
    }
}

// ============================================================================
// 测试
// ============================================================================
