// crates/cw_geo/src/projection.rs

//! 投影正反算
//!
//! 纯 Rust 实现，不依赖外部 C 库。横轴墨卡托使用三阶 Krüger 级数，
//! 在单个 UTM 带内精度优于毫米级，往返误差远小于 1e-9 度。
//!
//! # 参考文献
//!
//! Krüger, L. (1912). "Konforme Abbildung des Erdellipsoids in der Ebene";
//! 系数形式见 Karney (2011), "Transverse Mercator with an accuracy of a
//! few nanometers", J. Geodesy 85(8).

use crate::crs::Crs;
use crate::ellipsoid::Ellipsoid;
use cw_foundation::error::{CwError, CwResult};
use std::f64::consts::PI;

// ============================================================================
// 横轴墨卡托参数
// ============================================================================

/// 横轴墨卡托投影参数
#[derive(Debug, Clone, Copy)]
pub struct TransverseMercatorParams {
    /// 椭球体
    pub ellipsoid: Ellipsoid,
    /// 中央子午线 (度)
    pub central_meridian: f64,
    /// 比例因子
    pub scale_factor: f64,
    /// 假东 (m)
    pub false_easting: f64,
    /// 假北 (m)
    pub false_northing: f64,
}

impl TransverseMercatorParams {
    /// UTM 分带参数
    #[must_use]
    pub fn utm(zone: u8, north: bool) -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            central_meridian: f64::from(zone) * 6.0 - 183.0,
            scale_factor: 0.9996,
            false_easting: 500_000.0,
            false_northing: if north { 0.0 } else { 10_000_000.0 },
        }
    }
}

/// Krüger 级数系数 (三阶, 以第三扁率 n 展开)
#[derive(Debug, Clone, Copy)]
struct KrugerSeries {
    /// 校正半径 A = a/(1+n) (1 + n²/4 + n⁴/64)
    a_bar: f64,
    /// 正算系数 alpha[1..3]
    alpha: [f64; 3],
    /// 反算系数 beta[1..3]
    beta: [f64; 3],
    /// 共形纬度反算系数 delta[1..3]
    delta: [f64; 3],
    /// 共形纬度参数 2√n/(1+n)
    conformal_k: f64,
}

impl KrugerSeries {
    fn new(ellipsoid: &Ellipsoid) -> Self {
        let n = ellipsoid.third_flattening();
        let n2 = n * n;
        let n3 = n2 * n;
        let a_bar = ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);
        Self {
            a_bar,
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
            conformal_k: 2.0 * n.sqrt() / (1.0 + n),
        }
    }
}

/// 横轴墨卡托正算: (lon, lat) 度 -> (x, y) 米
///
/// # Errors
/// 纬度超出 [-90, 90] 时返回错误
pub fn transverse_mercator_forward(
    params: &TransverseMercatorParams,
    lon: f64,
    lat: f64,
) -> CwResult<(f64, f64)> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(CwError::invalid_input(format!(
            "纬度 {lat} 超出范围 [-90, 90]"
        )));
    }

    let series = KrugerSeries::new(&params.ellipsoid);

    let phi = lat.to_radians();
    let mut dlon = lon - params.central_meridian;
    // 规范化到 (-180, 180]
    while dlon > 180.0 {
        dlon -= 360.0;
    }
    while dlon <= -180.0 {
        dlon += 360.0;
    }
    let lam = dlon.to_radians();

    // 共形纬度的正切
    let sin_phi = phi.sin();
    let k = series.conformal_k;
    let t = (sin_phi.atanh() - k * (k * sin_phi).atanh()).sinh();

    let xi_p = t.atan2(lam.cos());
    let eta_p = (lam.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, alpha) in series.alpha.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi += alpha * (m * xi_p).sin() * (m * eta_p).cosh();
        eta += alpha * (m * xi_p).cos() * (m * eta_p).sinh();
    }

    let scale = params.scale_factor * series.a_bar;
    let x = params.false_easting + scale * eta;
    let y = params.false_northing + scale * xi;
    Ok((x, y))
}

/// 横轴墨卡托反算: (x, y) 米 -> (lon, lat) 度
///
/// # Errors
/// 坐标落在投影有效域之外时返回错误
pub fn transverse_mercator_inverse(
    params: &TransverseMercatorParams,
    x: f64,
    y: f64,
) -> CwResult<(f64, f64)> {
    let series = KrugerSeries::new(&params.ellipsoid);
    let scale = params.scale_factor * series.a_bar;

    let xi = (y - params.false_northing) / scale;
    let eta = (x - params.false_easting) / scale;

    if xi.abs() > PI || eta.abs() > PI {
        return Err(CwError::projection(format!(
            "坐标 ({x}, {y}) 超出投影有效域"
        )));
    }

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in series.beta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi_p -= beta * (m * xi).sin() * (m * eta).cosh();
        eta_p -= beta * (m * xi).cos() * (m * eta).sinh();
    }

    // 共形纬度 -> 大地纬度
    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut phi = chi;
    for (j, delta) in series.delta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        phi += delta * (m * chi).sin();
    }

    let lam = eta_p.sinh().atan2(xi_p.cos());
    let lon = params.central_meridian + lam.to_degrees();
    Ok((lon, phi.to_degrees()))
}

// ============================================================================
// Web Mercator
// ============================================================================

/// Web Mercator 使用的地球半径 (等于 WGS84 长半轴)
pub const WEB_MERCATOR_RADIUS: f64 = Ellipsoid::WGS84.a;

/// Web Mercator 最大纬度 (度)
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779;

/// 地理坐标 -> Web Mercator，纬度自动裁剪到有效范围
#[must_use]
pub fn geographic_to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS * ((PI / 4.0 + lat.to_radians() / 2.0).tan()).ln();
    (x, y)
}

/// Web Mercator -> 地理坐标
#[must_use]
pub fn web_mercator_to_geographic(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

// ============================================================================
// 按 CRS 分派的投影
// ============================================================================

/// 按 CRS 分派的投影实现
///
/// 每个坐标系对应一对正反算: `forward` 从地理坐标到该坐标系，
/// `inverse` 从该坐标系回地理坐标。
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    /// 地理坐标系，正反算均为恒等
    Geographic,
    /// 横轴墨卡托 (UTM)
    TransverseMercator(TransverseMercatorParams),
    /// Web Mercator
    WebMercator,
}

impl Projection {
    /// 从 CRS 创建投影
    #[must_use]
    pub fn for_crs(crs: &Crs) -> Self {
        match crs {
            Crs::Geographic => Projection::Geographic,
            Crs::Utm { zone, north } => {
                Projection::TransverseMercator(TransverseMercatorParams::utm(*zone, *north))
            }
            Crs::WebMercator => Projection::WebMercator,
        }
    }

    /// 地理坐标 -> 本坐标系
    ///
    /// # Errors
    /// 坐标超出投影有效范围时返回错误
    pub fn forward(&self, lon: f64, lat: f64) -> CwResult<(f64, f64)> {
        match self {
            Projection::Geographic => Ok((lon, lat)),
            Projection::TransverseMercator(params) => {
                transverse_mercator_forward(params, lon, lat)
            }
            Projection::WebMercator => Ok(geographic_to_web_mercator(lon, lat)),
        }
    }

    /// 本坐标系 -> 地理坐标
    ///
    /// # Errors
    /// 坐标超出投影有效范围时返回错误
    pub fn inverse(&self, x: f64, y: f64) -> CwResult<(f64, f64)> {
        match self {
            Projection::Geographic => Ok((x, y)),
            Projection::TransverseMercator(params) => {
                transverse_mercator_inverse(params, x, y)
            }
            Projection::WebMercator => Ok(web_mercator_to_geographic(x, y)),
        }
    }
}

// ============================================================================
// 快捷转换函数
// ============================================================================

/// WGS84 经纬度转 UTM
///
/// # Errors
/// 坐标超出有效范围时返回错误
pub fn wgs84_to_utm(lon: f64, lat: f64, zone: u8, north: bool) -> CwResult<(f64, f64)> {
    transverse_mercator_forward(&TransverseMercatorParams::utm(zone, north), lon, lat)
}

/// UTM 转 WGS84 经纬度
///
/// # Errors
/// 坐标超出有效范围时返回错误
pub fn utm_to_wgs84(x: f64, y: f64, zone: u8, north: bool) -> CwResult<(f64, f64)> {
    transverse_mercator_inverse(&TransverseMercatorParams::utm(zone, north), x, y)
}

// ============================================================================
// 测试
// ============================================================================
