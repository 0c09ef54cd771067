// crates/cw_geo/src/crs.rs

//! 坐标参考系统 (CRS) 定义和解析
//!
//! 支持沿海模型数据实际使用的三类坐标系: 地理坐标 (EPSG:4326)、
//! UTM 分带投影 (EPSG:326xx/327xx) 与 Web Mercator (EPSG:3857)。
//!
//! # 示例
//!
//! ```
//! use cw_geo::crs::Crs;
//!
//! let wgs84 = Crs::wgs84();
//! assert!(wgs84.is_geographic());
//!
//! let utm = Crs::from_epsg(32650).unwrap();
//! assert!(utm.is_projected());
//! assert_eq!(utm.epsg(), 32650);
//! ```

use crate::ellipsoid::Ellipsoid;
use cw_foundation::error::{CwError, CwResult};
use serde::{Deserialize, Serialize};

/// 坐标参考系统
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Crs {
    /// WGS84 地理坐标系 (EPSG:4326)，单位为度
    Geographic,
    /// UTM 分带投影，单位为米
    Utm {
        /// 带号 1-60
        zone: u8,
        /// true = 北半球 (326xx), false = 南半球 (327xx)
        north: bool,
    },
    /// Web Mercator (EPSG:3857)，单位为米
    WebMercator,
}

impl Crs {
    /// WGS84 地理坐标系
    #[must_use]
    pub fn wgs84() -> Self {
        Crs::Geographic
    }

    /// UTM 投影坐标系
    ///
    /// # Errors
    /// 带号超出 1-60 时返回错误
    pub fn utm(zone: u8, north: bool) -> CwResult<Self> {
        if !(1..=60).contains(&zone) {
            return Err(CwError::crs(format!("UTM 带号无效: {zone}")));
        }
        Ok(Crs::Utm { zone, north })
    }

    /// Web Mercator 坐标系
    #[must_use]
    pub fn web_mercator() -> Self {
        Crs::WebMercator
    }

    /// 从 EPSG 代码创建
    ///
    /// # Errors
    /// 不支持的 EPSG 代码返回错误
    pub fn from_epsg(code: u32) -> CwResult<Self> {
        match code {
            4326 => Ok(Crs::Geographic),
            3857 => Ok(Crs::WebMercator),
            32601..=32660 => Ok(Crs::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(Crs::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => Err(CwError::crs(format!("不支持的 EPSG 代码: {code}"))),
        }
    }

    /// 从定义字符串创建 (支持 "EPSG:xxxx")
    ///
    /// # Errors
    /// 无法解析时返回错误
    pub fn parse(def: &str) -> CwResult<Self> {
        let trimmed = def.trim();
        if let Some(suffix) = trimmed.strip_prefix("EPSG:") {
            let code: u32 = suffix
                .trim()
                .parse()
                .map_err(|_| CwError::crs(format!("无法解析 CRS 定义: {def}")))?;
            return Self::from_epsg(code);
        }
        Err(CwError::crs(format!("无法解析 CRS 定义: {def}")))
    }

    /// 根据经纬度自动选择 UTM 带
    #[must_use]
    pub fn auto_utm(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
        Crs::Utm {
            zone,
            north: lat >= 0.0,
        }
    }

    /// 获取 EPSG 代码
    #[must_use]
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Geographic => 4326,
            Crs::Utm { zone, north: true } => 32600 + u32::from(*zone),
            Crs::Utm { zone, north: false } => 32700 + u32::from(*zone),
            Crs::WebMercator => 3857,
        }
    }

    /// 是否为地理坐标系 (度)
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic)
    }

    /// 是否为投影坐标系 (米)
    #[must_use]
    pub fn is_projected(&self) -> bool {
        !self.is_geographic()
    }

    /// 单位名称
    #[must_use]
    pub fn unit_name(&self) -> &'static str {
        if self.is_geographic() {
            "degree"
        } else {
            "metre"
        }
    }

    /// 椭球体
    #[must_use]
    pub fn ellipsoid(&self) -> Ellipsoid {
        Ellipsoid::WGS84
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_epsg() {
        assert!(Crs::from_epsg(4326).unwrap().is_geographic());
        assert_eq!(
            Crs::from_epsg(32650).unwrap(),
            Crs::Utm {
                zone: 50,
                north: true
            }
        );
        assert_eq!(
            Crs::from_epsg(32750).unwrap(),
            Crs::Utm {
                zone: 50,
                north: false
            }
        );
        assert!(Crs::from_epsg(99999).is_err());
    }

    #[test]
    fn test_epsg_roundtrip() {
        for code in [4326u32, 3857, 32610, 32733] {
            let crs = Crs::from_epsg(code).unwrap();
            assert_eq!(crs.epsg(), code);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Geographic);
        assert_eq!(Crs::parse(" EPSG:3857 ").unwrap(), Crs::WebMercator);
        assert!(Crs::parse("+proj=omerc").is_err());
    }

    #[test]
    fn test_auto_utm() {
        // 北京 116°E, 40°N -> UTM 50N
        assert_eq!(
            Crs::auto_utm(116.0, 40.0),
            Crs::Utm {
                zone: 50,
                north: true
            }
        );
        assert_eq!(
            Crs::auto_utm(116.0, -35.0),
            Crs::Utm {
                zone: 50,
                north: false
            }
        );
    }

    #[test]
    fn test_invalid_zone() {
        assert!(Crs::utm(0, true).is_err());
        assert!(Crs::utm(61, true).is_err());
        assert!(Crs::utm(50, true).is_ok());
    }

    #[test]
    fn test_serde_roundtrip() {
        let crs = Crs::Utm {
            zone: 51,
            north: true,
        };
        let json = serde_json::to_string(&crs).unwrap();
        let back: Crs = serde_json::from_str(&json).unwrap();
        assert_eq!(crs, back);
    }
}
