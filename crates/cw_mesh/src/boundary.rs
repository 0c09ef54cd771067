// crates/cw_mesh/src/boundary.rs

//! 网格边界
//!
//! 开边界 (潮位强迫) 只有节点串；陆边界按类型码携带不同的载荷:
//! 码 3/13/23 为外部堰 (堰顶高程 + 超临界系数)，码 4/24 为内部堰
//! (成对节点 + 亚/超临界系数)，码 5/25 在内部堰之上再带涵管参数。
//! 其余码只有节点串。

/// 开边界
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBoundary {
    /// 边界节点的声明编号，沿边界有序
    pub nodes: Vec<usize>,
}

impl OpenBoundary {
    /// 创建开边界
    #[must_use]
    pub fn new(nodes: Vec<usize>) -> Self {
        Self { nodes }
    }

    /// 节点数
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// 陆边界
///
/// 各载荷数组与 `nodes` 等长；不适用的载荷保持空数组。
#[derive(Debug, Clone, PartialEq)]
pub struct LandBoundary {
    /// 边界类型码
    pub code: i32,
    /// 边界节点的声明编号
    pub nodes: Vec<usize>,
    /// 内部堰的对侧节点编号 (码 4/24/5/25)
    pub paired_nodes: Vec<usize>,
    /// 堰顶高程 (码 3/13/23/4/24/5/25)
    pub crest_elevations: Vec<f64>,
    /// 亚临界流系数 (码 4/24/5/25)
    pub subcritical_coefficients: Vec<f64>,
    /// 超临界流系数 (码 3/13/23/4/24/5/25)
    pub supercritical_coefficients: Vec<f64>,
    /// 涵管高程 (码 5/25)
    pub pipe_heights: Vec<f64>,
    /// 涵管系数 (码 5/25)
    pub pipe_coefficients: Vec<f64>,
    /// 涵管直径 (码 5/25)
    pub pipe_diameters: Vec<f64>,
}

impl LandBoundary {
    /// 创建指定类型码的空边界
    #[must_use]
    pub fn new(code: i32) -> Self {
        Self {
            code,
            nodes: Vec::new(),
            paired_nodes: Vec::new(),
            crest_elevations: Vec::new(),
            subcritical_coefficients: Vec::new(),
            supercritical_coefficients: Vec::new(),
            pipe_heights: Vec::new(),
            pipe_coefficients: Vec::new(),
            pipe_diameters: Vec::new(),
        }
    }

    /// 是否为外部堰边界
    #[must_use]
    pub fn is_external_weir(code: i32) -> bool {
        matches!(code, 3 | 13 | 23)
    }

    /// 是否为内部堰边界 (含涵管变体)
    #[must_use]
    pub fn is_internal_weir(code: i32) -> bool {
        matches!(code, 4 | 24 | 5 | 25)
    }

    /// 是否带涵管
    #[must_use]
    pub fn has_pipes(code: i32) -> bool {
        matches!(code, 5 | 25)
    }

    /// 节点数
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 边界引用的全部节点编号 (含对侧节点)
    pub fn all_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .copied()
            .chain(self.paired_nodes.iter().copied())
    }
}
