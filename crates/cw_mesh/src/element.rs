// crates/cw_mesh/src/element.rs

//! 网格单元

use cw_foundation::error::{CwError, CwResult};

/// 网格单元 (三角形或四边形)
///
/// `nodes` 存声明的节点编号而非数组下标，写回文件时原样输出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// 声明编号
    pub id: usize,
    /// 顶点的声明节点编号，逆时针顺序
    pub nodes: Vec<usize>,
}

impl Element {
    /// 创建新单元
    ///
    /// # Errors
    /// 顶点数不是 3 或 4 时返回错误
    pub fn new(id: usize, nodes: Vec<usize>) -> CwResult<Self> {
        if nodes.len() != 3 && nodes.len() != 4 {
            return Err(CwError::invalid_input(format!(
                "单元 {id} 顶点数无效: {}",
                nodes.len()
            )));
        }
        Ok(Self { id, nodes })
    }

    /// 顶点数
    #[must_use]
    pub fn n_vertices(&self) -> usize {
        self.nodes.len()
    }

    /// 是否为三角形
    #[must_use]
    pub fn is_triangle(&self) -> bool {
        self.nodes.len() == 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_count_validation() {
        assert!(Element::new(1, vec![1, 2, 3]).is_ok());
        assert!(Element::new(2, vec![1, 2, 3, 4]).is_ok());
        assert!(Element::new(3, vec![1, 2]).is_err());
        assert!(Element::new(4, vec![1, 2, 3, 4, 5]).is_err());
    }
}
