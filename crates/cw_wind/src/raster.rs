// crates/cw_wind/src/raster.rs

//! 地类栅格采样抽象
//!
//! 引擎只依赖 [`RasterSource`] 特征: 栅格声明自身 CRS 与格元尺寸,
//! 按圆形窗口给出格元中心与地类码。内存栅格实现用于测试与小图;
//! 文件栅格解码交由外部驱动实现同一特征。

use cw_foundation::error::{CwError, CwResult};
use cw_geo::{AffineTransform, Crs};

/// 一个落在采样窗口内的格元
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassSample {
    /// 格元中心 x (栅格 CRS)
    pub x: f64,
    /// 格元中心 y (栅格 CRS)
    pub y: f64,
    /// 地类码
    pub class: i32,
}

/// 地类栅格数据源
pub trait RasterSource: Sync {
    /// 栅格坐标参照系
    fn crs(&self) -> &Crs;

    /// 格元尺寸 (CRS 单位)
    fn cell_size(&self) -> f64;

    /// 无值标记
    fn nodata(&self) -> i32;

    /// 以 (x, y) 为圆心、radius 为半径采样格元中心
    ///
    /// 无值格元不返回; 窗口完全落在栅格外时返回空表。
    ///
    /// # Errors
    /// 底层数据源读取失败时返回错误
    fn sample_window(&self, x: f64, y: f64, radius: f64) -> CwResult<Vec<ClassSample>>;
}

/// 整幅驻留内存的地类栅格
#[derive(Debug)]
pub struct MemoryRaster {
    crs: Crs,
    transform: AffineTransform,
    inverse: AffineTransform,
    width: usize,
    height: usize,
    data: Vec<i32>,
    nodata: i32,
}

impl MemoryRaster {
    /// 构造内存栅格
    ///
    /// `transform` 把 (列, 行) 映射到 CRS 坐标, 行优先存储。
    ///
    /// # Errors
    /// 数据长度与宽高不符或仿射不可逆时返回错误
    pub fn new(
        crs: Crs,
        transform: AffineTransform,
        width: usize,
        height: usize,
        data: Vec<i32>,
        nodata: i32,
    ) -> CwResult<Self> {
        CwError::check_size("raster data", width * height, data.len())?;
        let inverse = transform
            .inverse()
            .ok_or_else(|| CwError::config("栅格仿射变换不可逆"))?;
        Ok(Self {
            crs,
            transform,
            inverse,
            width,
            height,
            data,
            nodata,
        })
    }

    /// 等格元正轴栅格的便捷构造
    ///
    /// # Errors
    /// 数据长度与宽高不符时返回错误
    pub fn north_up(
        crs: Crs,
        origin_x: f64,
        origin_y: f64,
        cell_size: f64,
        width: usize,
        height: usize,
        data: Vec<i32>,
        nodata: i32,
    ) -> CwResult<Self> {
        let transform = AffineTransform::north_up(origin_x, origin_y, cell_size, -cell_size);
        Self::new(crs, transform, width, height, data, nodata)
    }

    /// 栅格宽 (格元数)
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// 栅格高 (格元数)
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// 按 (列, 行) 取地类码
    #[must_use]
    pub fn class_at(&self, col: usize, row: usize) -> Option<i32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }
}

impl RasterSource for MemoryRaster {
    fn crs(&self) -> &Crs {
        &self.crs
    }

    fn cell_size(&self) -> f64 {
        let (a, d) = (self.transform.a, self.transform.d);
        a.hypot(d)
    }

    fn nodata(&self) -> i32 {
        self.nodata
    }

    fn sample_window(&self, x: f64, y: f64, radius: f64) -> CwResult<Vec<ClassSample>> {
        // 圆的外接矩形落到格元坐标
        let corners = [
            (x - radius, y - radius),
            (x - radius, y + radius),
            (x + radius, y - radius),
            (x + radius, y + radius),
        ];
        let mut col_min = f64::INFINITY;
        let mut col_max = f64::NEG_INFINITY;
        let mut row_min = f64::INFINITY;
        let mut row_max = f64::NEG_INFINITY;
        for (cx, cy) in corners {
            let (col, row) = self.inverse.apply(cx, cy);
            col_min = col_min.min(col);
            col_max = col_max.max(col);
            row_min = row_min.min(row);
            row_max = row_max.max(row);
        }

        let col_lo = col_min.floor().max(0.0) as usize;
        let row_lo = row_min.floor().max(0.0) as usize;
        if col_max < 0.0 || row_max < 0.0 || col_lo >= self.width || row_lo >= self.height {
            return Ok(Vec::new());
        }
        let col_hi = (col_max.ceil() as usize).min(self.width);
        let row_hi = (row_max.ceil() as usize).min(self.height);

        let radius_sq = radius * radius;
        let mut samples = Vec::new();
        for row in row_lo..row_hi {
            for col in col_lo..col_hi {
                let class = self.data[row * self.width + col];
                if class == self.nodata {
                    continue;
                }
                let (cx, cy) = self.transform.apply(col as f64 + 0.5, row as f64 + 0.5);
                let dx = cx - x;
                let dy = cy - y;
                if dx * dx + dy * dy <= radius_sq {
                    samples.push(ClassSample { x: cx, y: cy, class });
                }
            }
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm() -> Crs {
        Crs::utm(51, true).unwrap()
    }

    #[test]
    fn test_window_within_raster() {
        // 10x10 栅格, 格元 100 m, 原点 (0, 1000)
        let raster =
            MemoryRaster::north_up(utm(), 0.0, 1000.0, 100.0, 10, 10, vec![7; 100], -1).unwrap();
        assert!((raster.cell_size() - 100.0).abs() < 1e-9);

        let samples = raster.sample_window(500.0, 500.0, 150.0).unwrap();
        assert!(!samples.is_empty());
        for s in &samples {
            assert_eq!(s.class, 7);
            let d = ((s.x - 500.0).powi(2) + (s.y - 500.0).powi(2)).sqrt();
            assert!(d <= 150.0);
        }
    }

    #[test]
    fn test_window_outside_raster() {
        let raster =
            MemoryRaster::north_up(utm(), 0.0, 1000.0, 100.0, 10, 10, vec![7; 100], -1).unwrap();
        let samples = raster.sample_window(99000.0, 99000.0, 200.0).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_nodata_skipped() {
        let mut data = vec![7; 100];
        data[0] = -1;
        let raster = MemoryRaster::north_up(utm(), 0.0, 1000.0, 100.0, 10, 10, data, -1).unwrap();
        // 左上角格元中心 (50, 950) 是无值
        let samples = raster.sample_window(50.0, 950.0, 60.0).unwrap();
        assert!(samples.iter().all(|s| s.class != -1));
    }

    #[test]
    fn test_size_mismatch() {
        assert!(MemoryRaster::north_up(utm(), 0.0, 1000.0, 100.0, 10, 10, vec![7; 99], -1).is_err());
    }

    #[test]
    fn test_class_at() {
        let mut data = vec![0; 100];
        data[23] = 5;
        let raster = MemoryRaster::north_up(utm(), 0.0, 1000.0, 100.0, 10, 10, data, -1).unwrap();
        assert_eq!(raster.class_at(3, 2), Some(5));
        assert_eq!(raster.class_at(0, 0), Some(0));
        assert_eq!(raster.class_at(10, 0), None);
    }
}
