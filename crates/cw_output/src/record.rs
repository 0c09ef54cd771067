// crates/cw_output/src/record.rs

//! 输出记录
//!
//! 一条记录对应一个时间快照。标量场只有 u 分量，矢量场带 u/v 两个
//! 分量，幅值与方向按需派生。稀疏记录在读入时按默认值填满，
//! `n_active` 保留文件中实际存储的节点数。

use cw_foundation::error::{CwError, CwResult};

/// 角度单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    /// 度
    Degrees,
    /// 弧度
    Radians,
}

/// 单个时间快照
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    /// 模型时间 (秒)
    pub time: f64,
    /// 模型迭代步
    pub iteration: u64,
    /// 默认值 (稀疏记录未存储节点的取值)
    pub default_value: f64,
    /// 文件中实际存储的节点数
    pub n_active: usize,
    u: Vec<f64>,
    v: Option<Vec<f64>>,
}

impl OutputRecord {
    /// 标量记录
    #[must_use]
    pub fn scalar(time: f64, iteration: u64, default_value: f64, n_active: usize, u: Vec<f64>) -> Self {
        Self {
            time,
            iteration,
            default_value,
            n_active,
            u,
            v: None,
        }
    }

    /// 矢量记录
    ///
    /// # Errors
    /// u/v 长度不一致时返回错误
    pub fn vector(
        time: f64,
        iteration: u64,
        default_value: f64,
        n_active: usize,
        u: Vec<f64>,
        v: Vec<f64>,
    ) -> CwResult<Self> {
        CwError::check_size("vector components", u.len(), v.len())?;
        Ok(Self {
            time,
            iteration,
            default_value,
            n_active,
            u,
            v: Some(v),
        })
    }

    /// 节点数
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.u.len()
    }

    /// 是否为矢量记录
    #[must_use]
    pub fn is_vector(&self) -> bool {
        self.v.is_some()
    }

    /// u 分量 (标量记录即取值本身)
    ///
    /// # Errors
    /// 下标越界时返回错误
    pub fn u(&self, node_index: usize) -> CwResult<f64> {
        self.u
            .get(node_index)
            .copied()
            .ok_or_else(|| CwError::index_out_of_bounds("node", node_index, self.u.len()))
    }

    /// v 分量
    ///
    /// # Errors
    /// 标量记录或下标越界时返回错误
    pub fn v(&self, node_index: usize) -> CwResult<f64> {
        let v = self
            .v
            .as_ref()
            .ok_or_else(|| CwError::invalid_input("标量记录没有 v 分量"))?;
        v.get(node_index)
            .copied()
            .ok_or_else(|| CwError::index_out_of_bounds("node", node_index, v.len()))
    }

    /// 标量取值, `u` 的别名
    ///
    /// # Errors
    /// 下标越界时返回错误
    pub fn value(&self, node_index: usize) -> CwResult<f64> {
        self.u(node_index)
    }

    /// 矢量幅值 sqrt(u² + v²)
    ///
    /// # Errors
    /// 标量记录或下标越界时返回错误
    pub fn magnitude(&self, node_index: usize) -> CwResult<f64> {
        let u = self.u(node_index)?;
        let v = self.v(node_index)?;
        Ok(u.hypot(v))
    }

    /// 矢量方向 atan2(v, u)
    ///
    /// # Errors
    /// 标量记录或下标越界时返回错误
    pub fn direction(&self, node_index: usize, unit: AngleUnit) -> CwResult<f64> {
        let u = self.u(node_index)?;
        let v = self.v(node_index)?;
        let angle = v.atan2(u);
        Ok(match unit {
            AngleUnit::Radians => angle,
            AngleUnit::Degrees => angle.to_degrees(),
        })
    }

    /// u 分量数组
    #[must_use]
    pub fn u_values(&self) -> &[f64] {
        &self.u
    }

    /// v 分量数组 (标量记录为 None)
    #[must_use]
    pub fn v_values(&self) -> Option<&[f64]> {
        self.v.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_record() {
        let r = OutputRecord::scalar(10.0, 5, -99999.0, 3, vec![1.0, 2.0, 3.0]);
        assert!(!r.is_vector());
        assert!((r.value(1).unwrap() - 2.0).abs() < 1e-12);
        assert!(r.value(3).is_err());
        assert!(r.v(0).is_err());
        assert!(r.magnitude(0).is_err());
    }

    #[test]
    fn test_vector_derived() {
        let r = OutputRecord::vector(0.0, 0, 0.0, 2, vec![3.0, 0.0], vec![4.0, 1.0]).unwrap();
        assert!((r.magnitude(0).unwrap() - 5.0).abs() < 1e-12);
        assert!((r.direction(1, AngleUnit::Degrees).unwrap() - 90.0).abs() < 1e-10);
        assert!(
            (r.direction(1, AngleUnit::Radians).unwrap() - std::f64::consts::FRAC_PI_2).abs()
                < 1e-12
        );
    }

    #[test]
    fn test_vector_length_check() {
        assert!(OutputRecord::vector(0.0, 0, 0.0, 1, vec![1.0], vec![1.0, 2.0]).is_err());
    }
}
