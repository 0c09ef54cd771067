// crates/cw_wind/src/reduction.rs

//! 分扇区风削减引擎
//!
//! 对网格每个节点, 在 10 km 风半径内采样地类栅格, 把格元按 12 个
//! 30° 扇区归类并做高斯距离加权, 得到各扇区的有效粗糙度长度, 再按
//! 对数风廓线幂律折算成相对开阔地形的削减系数。
//!
//! # 示例
//!
//! ```ignore
//! use cw_wind::{DirectionalReductionEngine, SectorLookupTable};
//!
//! let lookup = SectorLookupTable::read("ccap.table")?;
//! let engine = DirectionalReductionEngine::new(&mesh, &raster, &lookup)?;
//! let factors = engine.compute();
//! ```

use crate::lookup::{SectorLookupTable, N_SECTORS};
use crate::raster::RasterSource;
use cw_foundation::ensure;
use cw_foundation::error::{CwError, CwResult};
use cw_geo::GeoTransformer;
use cw_mesh::{Mesh, Node};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// 风半径 (米)
pub const WIND_RADIUS: f64 = 10_000.0;
/// 高斯核尺度 (千米)
pub const WIND_SIGMA: f64 = 6.0;
/// 开阔地形参考粗糙度 (米)
pub const OPEN_TERRAIN_Z0: f64 = 0.003;
/// 对数风廓线幂指数
pub const LOG_LAW_EXPONENT: f64 = 0.0706;
/// 节点计算失败时记录的哨兵值
pub const SENTINEL: f64 = -9999.0;

const DISTANCE_FACTOR: f64 = 1.0e-3;
const ROOT_TWO_PI: f64 = 2.506_628_274_631_000_2;
const ONE_OVER_2_MINUS_ROOT3: f64 = 3.732_050_807_568_877;
const ONE_OVER_2_PLUS_ROOT3: f64 = 0.267_949_192_431_122_7;
const PROGRESS_STRIDE: usize = 256;

/// sgn(dx)+1 行, k*sgn(dy)+3 列 -> 扇区号 (0 起)
///
/// 中间行只有两端可达: dx 为零时 tanxy 取大数, k 必为 3。
const DIRECTION_LOOKUP: [[i8; 7]; 3] = [
    [3, 2, 1, 0, 11, 10, 9],
    [3, -1, -1, -1, -1, -1, 9],
    [3, 4, 5, 6, 7, 8, 9],
];

/// 分扇区风削减引擎
#[derive(Debug)]
pub struct DirectionalReductionEngine<'a, R: RasterSource> {
    mesh: &'a Mesh,
    raster: &'a R,
    lookup: &'a SectorLookupTable,
    transformer: GeoTransformer,
}

impl<'a, R: RasterSource> DirectionalReductionEngine<'a, R> {
    /// 组装引擎并做快速失败检查
    ///
    /// 坐标变换器在这里一次构建, 节点循环内只做变换。
    ///
    /// # Errors
    /// 查找表为空或栅格为地理坐标系 (距离无法按米计) 时返回配置错误
    pub fn new(mesh: &'a Mesh, raster: &'a R, lookup: &'a SectorLookupTable) -> CwResult<Self> {
        ensure!(!lookup.is_empty(), CwError::config("粗糙度查找表为空"));
        ensure!(
            !raster.crs().is_geographic(),
            CwError::config("风半径按米计, 地类栅格需使用投影坐标系")
        );
        let transformer = GeoTransformer::new(mesh.crs(), raster.crs());
        Ok(Self {
            mesh,
            raster,
            lookup,
            transformer,
        })
    }

    /// 计算全部节点的分扇区削减系数
    ///
    /// 单节点失败以 [`SENTINEL`] 填满该节点的 12 个扇区, 不中断整体。
    #[must_use]
    pub fn compute(&self) -> Vec<[f64; N_SECTORS]> {
        self.compute_with_progress(|_, _| {})
    }

    /// 同 [`compute`](Self::compute), 每 256 个节点回调一次进度
    ///
    /// 回调只做观察, 不影响计算结果。
    pub fn compute_with_progress<F>(&self, progress: F) -> Vec<[f64; N_SECTORS]>
    where
        F: Fn(usize, usize) + Sync,
    {
        let total = self.mesh.n_nodes();
        let done = AtomicUsize::new(0);

        let factors: Vec<[f64; N_SECTORS]> = self
            .mesh
            .nodes()
            .par_iter()
            .map(|node| {
                let result = self
                    .reduce_node(node)
                    .unwrap_or([SENTINEL; N_SECTORS]);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n % PROGRESS_STRIDE == 0 || n == total {
                    progress(n, total);
                }
                result
            })
            .collect();

        let failed = factors.iter().filter(|f| f[0] == SENTINEL).count();
        info!(total, failed, "分扇区风削减计算完成");
        factors
    }

    /// 单节点: 采样、扇区加权、折算削减系数
    fn reduce_node(&self, node: &Node) -> CwResult<[f64; N_SECTORS]> {
        let (x, y) = self.transformer.transform_point(node.x, node.y)?;
        let samples = self.raster.sample_window(x, y, WIND_RADIUS)?;

        let mut wind = [0.0f64; N_SECTORS];
        let mut weight = [0.0f64; N_SECTORS];
        let mut near_weight = 0.0f64;
        let mut any = false;

        for sample in &samples {
            let Some(z0) = self.lookup.roughness(sample.class) else {
                continue;
            };
            let dx = (sample.x - x) * DISTANCE_FACTOR;
            let dy = (sample.y - y) * DISTANCE_FACTOR;
            let d = dx * dx + dy * dy;
            let w = gaussian(d);
            any = true;

            match sector_of(dx, dy, d) {
                Some(sector) => {
                    weight[sector] += w;
                    wind[sector] += w * z0[sector];
                }
                // 圆心上的格元无方向, 权重摊给全部扇区
                None => near_weight += w,
            }
        }

        if !any {
            return Err(CwError::not_found("风半径内的地类栅格数据"));
        }

        let mut factors = [0.0f64; N_SECTORS];
        for sector in 0..N_SECTORS {
            let w = weight[sector] + near_weight;
            let z0 = if w > 1e-12 { wind[sector] / w } else { 0.0 };
            factors[sector] = reduction_factor(z0);
        }
        Ok(factors)
    }
}

/// 高斯距离权重, d 为平方距离 (km²)
fn gaussian(d: f64) -> f64 {
    (1.0 / (WIND_SIGMA * ROOT_TWO_PI)) * (-d / (2.0 * WIND_SIGMA * WIND_SIGMA)).exp()
}

/// 把相对位移 (km) 归到 12 个 30° 扇区, 圆心处返回 None
fn sector_of(dx: f64, dy: f64, d: f64) -> Option<usize> {
    if d <= f64::EPSILON * f64::EPSILON {
        return None;
    }
    let tanxy = if dx.abs() > f64::EPSILON {
        (dy / dx).abs()
    } else {
        10_000_000.0
    };
    let k = (1i32).min((tanxy * ONE_OVER_2_MINUS_ROOT3) as i32)
        + (1i32).min(tanxy as i32)
        + (1i32).min((tanxy * ONE_OVER_2_PLUS_ROOT3) as i32);
    let a = (sgn(dx) + 1) as usize;
    let b = (k * sgn(dy) + 3) as usize;
    let dir = DIRECTION_LOOKUP[a][b];
    debug_assert!(dir >= 0);
    Some(dir as usize)
}

/// 对数风廓线幂律折算, 粗糙度越大削减越强
fn reduction_factor(z0_sector: f64) -> f64 {
    if z0_sector <= 0.0 {
        return 1.0;
    }
    (OPEN_TERRAIN_Z0 / z0_sector)
        .powf(LOG_LAW_EXPONENT)
        .clamp(0.0, 1.0)
}

fn sgn(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::MemoryRaster;
    use cw_geo::Crs;
    use cw_mesh::Element;
    use std::sync::atomic::AtomicUsize;

    fn utm() -> Crs {
        Crs::utm(51, true).unwrap()
    }

    /// 中心区域的三角形小网格 (投影坐标, 米)
    fn small_mesh(crs: Crs) -> Mesh {
        let nodes = vec![
            Node::new(1, 15000.0, 15000.0, -5.0),
            Node::new(2, 16000.0, 15000.0, -6.0),
            Node::new(3, 15500.0, 16000.0, -7.0),
        ];
        let elements = vec![Element::new(1, vec![1, 2, 3]).unwrap()];
        Mesh::new(String::from("test"), nodes, elements, Vec::new(), Vec::new(), crs).unwrap()
    }

    /// 覆盖 [0, 30km]² 的均一地类栅格, 格元 500 m
    fn uniform_raster(class: i32) -> MemoryRaster {
        MemoryRaster::north_up(utm(), 0.0, 30000.0, 500.0, 60, 60, vec![class; 3600], -1).unwrap()
    }

    #[test]
    fn test_uniform_raster_uniform_reduction() {
        let mesh = small_mesh(utm());
        let raster = uniform_raster(7);
        let mut lookup = SectorLookupTable::new();
        lookup.insert_uniform(7, 0.3);

        let engine = DirectionalReductionEngine::new(&mesh, &raster, &lookup).unwrap();
        let factors = engine.compute();
        assert_eq!(factors.len(), 3);

        // 均一地类下所有节点所有扇区得到同一削减系数
        let expected = (0.003f64 / 0.3).powf(LOG_LAW_EXPONENT);
        for node_factors in &factors {
            for &f in node_factors.iter() {
                assert!((f - expected).abs() < 1e-6, "factor {f} != {expected}");
            }
        }
        assert!(expected < 1.0);
    }

    #[test]
    fn test_open_water_no_reduction() {
        let mesh = small_mesh(utm());
        let raster = uniform_raster(11);
        let mut lookup = SectorLookupTable::new();
        // 开阔水面粗糙度低于参考值, 系数截断到 1
        lookup.insert_uniform(11, 0.001);

        let engine = DirectionalReductionEngine::new(&mesh, &raster, &lookup).unwrap();
        let factors = engine.compute();
        for node_factors in &factors {
            for &f in node_factors.iter() {
                assert!((f - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_node_outside_raster_gets_sentinel() {
        let nodes = vec![
            Node::new(1, 15000.0, 15000.0, -5.0),
            Node::new(2, 500_000.0, 500_000.0, -5.0),
        ];
        let mesh = Mesh::new(
            String::from("test"),
            nodes,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            utm(),
        )
        .unwrap();
        let raster = uniform_raster(7);
        let mut lookup = SectorLookupTable::new();
        lookup.insert_uniform(7, 0.3);

        let engine = DirectionalReductionEngine::new(&mesh, &raster, &lookup).unwrap();
        let factors = engine.compute();
        assert!(factors[0][0] != SENTINEL);
        assert!(factors[1].iter().all(|&f| f == SENTINEL));
    }

    #[test]
    fn test_empty_lookup_fails_fast() {
        let mesh = small_mesh(utm());
        let raster = uniform_raster(7);
        let lookup = SectorLookupTable::new();
        let err = DirectionalReductionEngine::new(&mesh, &raster, &lookup).unwrap_err();
        assert!(matches!(err, CwError::Config { .. }));
    }

    #[test]
    fn test_geographic_raster_fails_fast() {
        let mesh = small_mesh(utm());
        let raster =
            MemoryRaster::north_up(Crs::wgs84(), 120.0, 31.0, 0.01, 10, 10, vec![7; 100], -1)
                .unwrap();
        let mut lookup = SectorLookupTable::new();
        lookup.insert_uniform(7, 0.3);
        let err = DirectionalReductionEngine::new(&mesh, &raster, &lookup).unwrap_err();
        assert!(matches!(err, CwError::Config { .. }));
    }

    #[test]
    fn test_progress_callback_cadence() {
        // 300 个节点, 进度应在 256 与 300 处各回调一次
        let nodes: Vec<Node> = (0..300)
            .map(|i| Node::new(i + 1, 15000.0 + i as f64, 15000.0, -5.0))
            .collect();
        let mesh = Mesh::new(
            String::from("test"),
            nodes,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            utm(),
        )
        .unwrap();
        let raster = uniform_raster(7);
        let mut lookup = SectorLookupTable::new();
        lookup.insert_uniform(7, 0.3);

        let engine = DirectionalReductionEngine::new(&mesh, &raster, &lookup).unwrap();
        let calls = AtomicUsize::new(0);
        let factors = engine.compute_with_progress(|done, total| {
            assert_eq!(total, 300);
            assert!(done == 256 || done == 300);
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(factors.len(), 300);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_sector_binning_covers_all_sectors() {
        // 单位圆上取 12 个扇区中心方向, 应落到 12 个不同扇区
        let mut seen = [false; N_SECTORS];
        for i in 0..N_SECTORS {
            let theta = (i as f64) * 30.0f64.to_radians();
            let (dx, dy) = (theta.cos(), theta.sin());
            let sector = sector_of(dx, dy, dx * dx + dy * dy).unwrap();
            assert!(!seen[sector], "sector {sector} hit twice");
            seen[sector] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_center_pixel_has_no_sector() {
        assert!(sector_of(0.0, 0.0, 0.0).is_none());
    }
}
