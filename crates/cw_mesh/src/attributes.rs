// crates/cw_mesh/src/attributes.rs

//! 节点属性表 (fort.13)
//!
//! 文件结构: 标题行; 节点数行; 属性数行; 逐属性的声明块 (名称行,
//! 单位行, 宽度行, 默认值行); 再逐属性的取值块 (名称行, 非默认节点
//! 数行, `nodeId v1..vWidth` 数据行)。
//!
//! 存储是稀疏的: 只保留与默认值不同的行，查询时未存储的节点返回
//! 默认值。属性元数据的作用域是表实例，不进任何全局注册表。
//!
//! # 示例
//!
//! ```ignore
//! use cw_mesh::attributes::NodalAttributes;
//!
//! let attrs = NodalAttributes::read("fort.13", Some(&mesh))?;
//! let handle = attrs.locate_attribute("mannings_n_at_sea_floor")?;
//! let n = attrs.scalar(handle, 42)?;
//! ```

use crate::mesh::Mesh;
use cw_foundation::error::{CwError, CwResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// 常用属性名: 曼宁糙率
pub const ATTR_MANNINGS_N: &str = "mannings_n_at_sea_floor";
/// 常用属性名: 分方向有效粗糙长度 (12 扇区)
pub const ATTR_DIRECTIONAL_ROUGHNESS: &str = "surface_directional_effective_roughness_length";

/// 单个属性的声明元数据
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMetadata {
    /// 属性名
    pub name: String,
    /// 单位
    pub units: String,
    /// 每节点取值个数
    pub width: usize,
    /// 默认值向量，长度等于 `width`
    pub defaults: Vec<f64>,
}

/// 节点属性表
#[derive(Debug, Clone)]
pub struct NodalAttributes {
    header: String,
    n_nodes: usize,
    metadata: Vec<AttributeMetadata>,
    /// 每属性一张稀疏表: 节点数组下标 -> 取值行
    values: Vec<HashMap<usize, Vec<f64>>>,
    /// 下标 -> 声明编号 (来自附着网格)；无网格时为 None, 写出按 idx+1
    declared_ids: Option<Vec<usize>>,
}

impl NodalAttributes {
    /// 创建空表
    #[must_use]
    pub fn new(header: String, n_nodes: usize) -> Self {
        Self {
            header,
            n_nodes,
            metadata: Vec::new(),
            values: Vec::new(),
            declared_ids: None,
        }
    }

    /// 声明一个属性，返回其句柄
    ///
    /// # Errors
    /// 默认值向量长度与宽度不符时返回 [`CwError::DimensionMismatch`]
    pub fn add_attribute(&mut self, metadata: AttributeMetadata) -> CwResult<usize> {
        if metadata.defaults.len() != metadata.width {
            return Err(CwError::dimension_mismatch(
                metadata.name,
                metadata.width,
                metadata.defaults.len(),
            ));
        }
        self.metadata.push(metadata);
        self.values.push(HashMap::new());
        Ok(self.metadata.len() - 1)
    }

    // ========================================================================
    // 查询
    // ========================================================================

    /// 标题行
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// 表覆盖的节点数
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// 属性个数
    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.metadata.len()
    }

    /// 按名称定位属性句柄
    ///
    /// # Errors
    /// 名称不存在时返回错误
    pub fn locate_attribute(&self, name: &str) -> CwResult<usize> {
        self.metadata
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| CwError::not_found(format!("属性 {name}")))
    }

    /// 属性元数据
    ///
    /// # Errors
    /// 句柄越界时返回错误
    pub fn metadata(&self, handle: usize) -> CwResult<&AttributeMetadata> {
        self.metadata
            .get(handle)
            .ok_or_else(|| CwError::index_out_of_bounds("attribute", handle, self.metadata.len()))
    }

    /// 节点的取值行: 存储行或默认值
    ///
    /// # Errors
    /// 句柄或节点下标越界时返回错误
    pub fn row(&self, handle: usize, node_index: usize) -> CwResult<&[f64]> {
        let meta = self.metadata(handle)?;
        CwError::check_index("node", node_index, self.n_nodes)?;
        Ok(self.values[handle]
            .get(&node_index)
            .map_or(meta.defaults.as_slice(), Vec::as_slice))
    }

    /// 宽度为 1 的属性的便捷标量访问
    ///
    /// # Errors
    /// 句柄或节点下标越界时返回错误
    pub fn scalar(&self, handle: usize, node_index: usize) -> CwResult<f64> {
        Ok(self.row(handle, node_index)?[0])
    }

    /// 非默认节点数
    ///
    /// # Errors
    /// 句柄越界时返回错误
    pub fn n_non_default(&self, handle: usize) -> CwResult<usize> {
        self.metadata(handle)?;
        Ok(self.values[handle].len())
    }

    // ========================================================================
    // 修改
    // ========================================================================

    /// 设置节点的取值行
    ///
    /// 与默认值相等的行不存储 (已存的会被移除)，保持稀疏表最小。
    ///
    /// # Errors
    /// 行宽与声明宽度不符时返回 [`CwError::DimensionMismatch`]，
    /// 节点下标越界时返回 [`CwError::IndexOutOfBounds`]
    pub fn set_row(&mut self, handle: usize, node_index: usize, row: &[f64]) -> CwResult<()> {
        let meta = self.metadata(handle)?;
        if row.len() != meta.width {
            return Err(CwError::dimension_mismatch(
                meta.name.clone(),
                meta.width,
                row.len(),
            ));
        }
        CwError::check_index("node", node_index, self.n_nodes)?;

        if row == meta.defaults.as_slice() {
            self.values[handle].remove(&node_index);
        } else {
            self.values[handle].insert(node_index, row.to_vec());
        }
        Ok(())
    }

    // ========================================================================
    // 读取
    // ========================================================================

    /// 从文件读取属性表
    ///
    /// 传入网格时按网格解析节点编号 (支持不连续编号) 并校验节点数
    /// 一致；不传时按 1..=n 连续编号解析。
    ///
    /// # Errors
    /// 文件不存在、解析失败或节点数与网格不符时返回错误
    pub fn read<P: AsRef<Path>>(path: P, mesh: Option<&Mesh>) -> CwResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CwError::file_not_found(path));
        }
        let file = File::open(path)
            .map_err(|e| CwError::io_with_source(format!("无法打开 {}", path.display()), e))?;
        let table = Self::read_from_reader(BufReader::new(file), path, mesh)?;
        info!(
            path = %path.display(),
            attributes = table.n_attributes(),
            "属性表加载完成"
        );
        Ok(table)
    }

    /// 从 reader 读取，`source` 仅用于错误信息
    ///
    /// # Errors
    /// 解析失败时返回带行号的错误
    pub fn read_from_reader<R: BufRead>(
        reader: R,
        source: &Path,
        mesh: Option<&Mesh>,
    ) -> CwResult<Self> {
        let mut src = Source {
            lines: reader.lines(),
            file: source.to_path_buf(),
            line_no: 0,
        };

        let header = src.next("标题行")?.trim_end().to_string();
        let n_nodes: usize = src.parse_first("节点数")?;
        let n_attributes: usize = src.parse_first("属性数")?;

        if let Some(mesh) = mesh {
            CwError::check_size("nodal attribute nodes", mesh.n_nodes(), n_nodes)?;
        }

        let mut table = Self::new(header, n_nodes);
        table.declared_ids = mesh.map(|m| m.nodes().iter().map(|n| n.id).collect());

        // 声明块
        for _ in 0..n_attributes {
            let name = src.next("属性名行")?.trim().to_string();
            let units = src.next("单位行")?.trim().to_string();
            let width: usize = src.parse_first("属性宽度")?;
            let defaults_line = src.next("默认值行")?;
            let defaults = src.parse_values(&defaults_line, width, "默认值")?;
            table.add_attribute(AttributeMetadata {
                name,
                units,
                width,
                defaults,
            })?;
        }

        // 取值块: 顺序允许与声明顺序不同, 按名称定位
        for _ in 0..n_attributes {
            let name = src.next("取值块属性名行")?.trim().to_string();
            let handle = table
                .locate_attribute(&name)
                .map_err(|_| src.error(format!("取值块引用了未声明的属性: {name}")))?;
            let width = table.metadata[handle].width;
            let count: usize = src.parse_first("非默认节点数")?;

            for _ in 0..count {
                let line = src.next("属性数据行")?;
                let mut fields = line.split_whitespace();
                let id: usize = fields
                    .next()
                    .ok_or_else(|| src.error("数据行缺少节点编号"))?
                    .parse()
                    .map_err(|_| src.error(format!("无法解析节点编号: {line:?}")))?;

                let node_index = match mesh {
                    Some(mesh) => mesh.node_index_by_id(id)?,
                    None => {
                        if id >= 1 && id <= n_nodes {
                            id - 1
                        } else {
                            return Err(CwError::UnknownNode { id });
                        }
                    }
                };

                let mut row = Vec::with_capacity(width);
                for _ in 0..width {
                    let value: f64 = fields
                        .next()
                        .ok_or_else(|| {
                            CwError::dimension_mismatch(name.clone(), width, row.len())
                        })?
                        .parse()
                        .map_err(|_| src.error(format!("无法解析属性值: {line:?}")))?;
                    row.push(value);
                }
                table.values[handle].insert(node_index, row);
            }
        }

        Ok(table)
    }

    // ========================================================================
    // 写出
    // ========================================================================

    /// 写出到文件
    ///
    /// # Errors
    /// IO 失败时返回错误
    pub fn write<P: AsRef<Path>>(&self, path: P) -> CwResult<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| CwError::io_with_source(format!("无法创建 {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer
            .flush()
            .map_err(|e| CwError::io_with_source(format!("写入 {} 失败", path.display()), e))?;
        Ok(())
    }

    /// 写出到任意 writer，保持声明顺序，默认值不落盘
    ///
    /// # Errors
    /// IO 失败时返回错误
    pub fn write_to<W: Write>(&self, writer: &mut W) -> CwResult<()> {
        writeln!(writer, "{}", self.header)?;
        writeln!(writer, "{}", self.n_nodes)?;
        writeln!(writer, "{}", self.metadata.len())?;

        for meta in &self.metadata {
            writeln!(writer, "{}", meta.name)?;
            writeln!(writer, "{}", meta.units)?;
            writeln!(writer, "{}", meta.width)?;
            let defaults: Vec<String> = meta.defaults.iter().map(f64::to_string).collect();
            writeln!(writer, "{}", defaults.join(" "))?;
        }

        for (handle, meta) in self.metadata.iter().enumerate() {
            writeln!(writer, "{}", meta.name)?;
            writeln!(writer, "{}", self.values[handle].len())?;

            // 按节点下标排序, 输出稳定
            let mut rows: Vec<(&usize, &Vec<f64>)> = self.values[handle].iter().collect();
            rows.sort_by_key(|(idx, _)| **idx);
            for (idx, row) in rows {
                let id = self
                    .declared_ids
                    .as_ref()
                    .and_then(|ids| ids.get(*idx).copied())
                    .unwrap_or(idx + 1);
                write!(writer, "{id}")?;
                for v in row {
                    write!(writer, " {v}")?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

/// fort.13 逐行读取辅助
struct Source<R: BufRead> {
    lines: std::io::Lines<R>,
    file: PathBuf,
    line_no: usize,
}

impl<R: BufRead> Source<R> {
    fn next(&mut self, expected: &str) -> CwResult<String> {
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(line)
            }
            Some(Err(e)) => Err(CwError::io_with_source(
                format!("读取 {} 失败", self.file.display()),
                e,
            )),
            None => Err(CwError::parse(
                &self.file,
                self.line_no + 1,
                format!("文件意外结束, 期望{expected}"),
            )),
        }
    }

    fn parse_first<T: std::str::FromStr>(&mut self, what: &str) -> CwResult<T> {
        let line = self.next(what)?;
        line.split_whitespace()
            .next()
            .ok_or_else(|| self.error(format!("缺少字段: {what}")))?
            .parse()
            .map_err(|_| self.error(format!("无法解析{what}: {line:?}")))
    }

    fn parse_values(&self, line: &str, count: usize, what: &str) -> CwResult<Vec<f64>> {
        let values: Vec<f64> = line
            .split_whitespace()
            .take(count)
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| self.error(format!("无法解析{what}: {line:?}")))?;
        if values.len() != count {
            return Err(self.error(format!("{what}个数不足: 期望{count}, 实际{}", values.len())));
        }
        Ok(values)
    }

    fn error(&self, message: impl Into<String>) -> CwError {
        CwError::parse(&self.file, self.line_no, message)
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
test attributes
4
2
mannings_n_at_sea_floor
unitless
1
0.035
surface_directional_effective_roughness_length
m
12
0 0 0 0 0 0 0 0 0 0 0 0
mannings_n_at_sea_floor
2
2 0.02
4 0.025
surface_directional_effective_roughness_length
1
1 0.1 0.1 0.1 0.1 0.1 0.1 0.2 0.2 0.2 0.2 0.2 0.2
";

    fn path() -> &'static Path {
        Path::new("fort.13")
    }

    #[test]
    fn test_read_sample() {
        let table = NodalAttributes::read_from_reader(Cursor::new(SAMPLE), path(), None).unwrap();
        assert_eq!(table.n_nodes(), 4);
        assert_eq!(table.n_attributes(), 2);

        let manning = table.locate_attribute(ATTR_MANNINGS_N).unwrap();
        assert_eq!(table.n_non_default(manning).unwrap(), 2);
        // 未覆盖的节点落回默认值
        assert!((table.scalar(manning, 0).unwrap() - 0.035).abs() < 1e-12);
        // 覆盖的节点读到存储值
        assert!((table.scalar(manning, 1).unwrap() - 0.02).abs() < 1e-12);
        assert!((table.scalar(manning, 3).unwrap() - 0.025).abs() < 1e-12);

        let rough = table
            .locate_attribute(ATTR_DIRECTIONAL_ROUGHNESS)
            .unwrap();
        let row = table.row(rough, 0).unwrap();
        assert_eq!(row.len(), 12);
        assert!((row[6] - 0.2).abs() < 1e-12);
        assert!(table.row(rough, 1).unwrap().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_locate_unknown() {
        let table = NodalAttributes::read_from_reader(Cursor::new(SAMPLE), path(), None).unwrap();
        assert!(table.locate_attribute("sea_surface_height_above_geoid").is_err());
    }

    #[test]
    fn test_set_row_dimension_check() {
        let mut table =
            NodalAttributes::read_from_reader(Cursor::new(SAMPLE), path(), None).unwrap();
        let manning = table.locate_attribute(ATTR_MANNINGS_N).unwrap();

        assert!(matches!(
            table.set_row(manning, 0, &[0.1, 0.2]),
            Err(CwError::DimensionMismatch {
                expected: 1,
                actual: 2,
                ..
            })
        ));
        assert!(table.set_row(manning, 0, &[0.1]).is_ok());
        assert!(table.set_row(manning, 99, &[0.1]).is_err());
    }

    #[test]
    fn test_set_default_row_stays_sparse() {
        let mut table =
            NodalAttributes::read_from_reader(Cursor::new(SAMPLE), path(), None).unwrap();
        let manning = table.locate_attribute(ATTR_MANNINGS_N).unwrap();

        // 写回默认值会把存储行移除
        table.set_row(manning, 1, &[0.035]).unwrap();
        assert_eq!(table.n_non_default(manning).unwrap(), 1);
    }

    #[test]
    fn test_roundtrip() {
        let table = NodalAttributes::read_from_reader(Cursor::new(SAMPLE), path(), None).unwrap();
        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();

        let table2 =
            NodalAttributes::read_from_reader(Cursor::new(&buf), path(), None).unwrap();
        assert_eq!(table2.n_attributes(), table.n_attributes());

        let manning = table2.locate_attribute(ATTR_MANNINGS_N).unwrap();
        assert_eq!(table2.n_non_default(manning).unwrap(), 2);
        assert!((table2.scalar(manning, 1).unwrap() - 0.02).abs() < 1e-12);

        let rough = table2
            .locate_attribute(ATTR_DIRECTIONAL_ROUGHNESS)
            .unwrap();
        assert_eq!(table2.row(rough, 0).unwrap(), table.row(rough, 0).unwrap());
    }

    #[test]
    fn test_mesh_size_mismatch() {
        use crate::element::Element;
        use crate::node::Node;
        use cw_geo::Crs;

        let nodes = vec![
            Node::new(1, 0.0, 0.0, -1.0),
            Node::new(2, 1.0, 0.0, -1.0),
            Node::new(3, 0.0, 1.0, -1.0),
        ];
        let elements = vec![Element::new(1, vec![1, 2, 3]).unwrap()];
        let mesh = crate::mesh::Mesh::new(
            "m".into(),
            nodes,
            elements,
            vec![],
            vec![],
            Crs::wgs84(),
        )
        .unwrap();

        // 表声明 4 个节点, 网格只有 3 个
        let err =
            NodalAttributes::read_from_reader(Cursor::new(SAMPLE), path(), Some(&mesh))
                .unwrap_err();
        assert!(matches!(err, CwError::SizeMismatch { .. }));
    }

    #[test]
    fn test_truncated_declaration() {
        let text = "bad\n4\n1\nmannings_n_at_sea_floor\nunitless\n";
        let err = NodalAttributes::read_from_reader(Cursor::new(text), path(), None).unwrap_err();
        assert!(matches!(err, CwError::Parse { .. }));
    }

    #[test]
    fn test_row_width_mismatch_in_body() {
        let text = "\
bad widths
2
1
velocity_scale
unitless
2
1.0 1.0
velocity_scale
1
1 0.5
";
        let err = NodalAttributes::read_from_reader(Cursor::new(text), path(), None).unwrap_err();
        assert!(matches!(err, CwError::DimensionMismatch { .. }));
    }
}
