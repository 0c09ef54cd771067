// crates/cw_mesh/src/io.rs

//! ADCIRC ASCII 网格格式读写 (fort.14 / .grd)
//!
//! 文件结构: 标题行; `ne nn` 计数行 (单元数在前); nn 行节点
//! `id x y z`; ne 行单元 `id nvert v1..vn`; 之后是可选的开边界块
//! (NOPE, NETA, 逐边界的计数行与节点行) 与陆边界块 (NBOU, NVEL,
//! 逐边界的 `count code` 行与按类型码展开的节点行)。
//!
//! 所有解析失败都携带文件路径与行号。加载是原子的: 解析中途失败
//! 不会产出部分网格。
//!
//! # 示例
//!
//! ```ignore
//! use cw_mesh::io::AdcircLoader;
//!
//! let mesh = AdcircLoader::load("fort.14")?;
//! println!("{} nodes, {} elements", mesh.n_nodes(), mesh.n_elements());
//! ```

use crate::boundary::{LandBoundary, OpenBoundary};
use crate::element::Element;
use crate::mesh::Mesh;
use crate::node::Node;
use cw_foundation::error::{CwError, CwResult};
use cw_geo::Crs;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// 网格文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    /// ADCIRC ASCII (fort.14 / .grd)
    AdcircAscii,
}

/// 按扩展名识别网格格式
///
/// # Errors
/// 扩展名不是 `.14` / `.grd` 时返回 [`CwError::UnknownFormat`]
pub fn detect_format(path: &Path) -> CwResult<MeshFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match ext.as_deref() {
        Some("14" | "grd") => Ok(MeshFormat::AdcircAscii),
        _ => Err(CwError::unknown_format(path)),
    }
}

// ============================================================================
// 带行号的逐行读取
// ============================================================================

/// 逐行读取器，跟踪行号用于错误定位
struct LineSource<R: BufRead> {
    lines: std::io::Lines<R>,
    file: PathBuf,
    line_no: usize,
}

impl<R: BufRead> LineSource<R> {
    fn new(reader: R, file: PathBuf) -> Self {
        Self {
            lines: reader.lines(),
            file,
            line_no: 0,
        }
    }

    /// 下一行，EOF 返回 None
    fn try_next(&mut self) -> CwResult<Option<String>> {
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(Some(line))
            }
            Some(Err(e)) => Err(CwError::io_with_source(
                format!("读取 {} 失败", self.file.display()),
                e,
            )),
            None => Ok(None),
        }
    }

    /// 下一行，EOF 视为解析错误
    fn next_required(&mut self, expected: &str) -> CwResult<String> {
        match self.try_next()? {
            Some(line) => Ok(line),
            None => Err(CwError::parse(
                &self.file,
                self.line_no + 1,
                format!("文件意外结束, 期望{expected}"),
            )),
        }
    }

    fn error(&self, message: impl Into<String>) -> CwError {
        CwError::parse(&self.file, self.line_no, message)
    }

    /// 解析当前行的第 idx 个空白分隔字段
    fn field<T: std::str::FromStr>(&self, line: &str, idx: usize, what: &str) -> CwResult<T> {
        line.split_whitespace()
            .nth(idx)
            .ok_or_else(|| self.error(format!("缺少字段: {what}")))?
            .parse()
            .map_err(|_| self.error(format!("无法解析{what}: {line:?}")))
    }
}

// ============================================================================
// 读取
// ============================================================================

/// ADCIRC ASCII 网格加载器
pub struct AdcircLoader;

impl AdcircLoader {
    /// 从文件加载网格
    ///
    /// # Errors
    /// 文件不存在、格式无法识别或解析失败时返回错误
    pub fn load<P: AsRef<Path>>(path: P) -> CwResult<Mesh> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CwError::file_not_found(path));
        }
        detect_format(path)?;
        let file = File::open(path)
            .map_err(|e| CwError::io_with_source(format!("无法打开 {}", path.display()), e))?;
        let mesh = Self::load_from_reader(BufReader::new(file), path)?;
        info!(
            path = %path.display(),
            nodes = mesh.n_nodes(),
            elements = mesh.n_elements(),
            "网格加载完成"
        );
        Ok(mesh)
    }

    /// 从 reader 加载，`source` 仅用于错误信息
    ///
    /// # Errors
    /// 解析失败时返回带行号的错误
    pub fn load_from_reader<R: BufRead>(reader: R, source: &Path) -> CwResult<Mesh> {
        let mut src = LineSource::new(reader, source.to_path_buf());

        let title = src.next_required("标题行")?.trim_end().to_string();

        // 计数行: 单元数在前, 节点数在后
        let counts = src.next_required("计数行")?;
        let n_elements: usize = src.field(&counts, 0, "单元数")?;
        let n_nodes: usize = src.field(&counts, 1, "节点数")?;

        let mut nodes = Vec::with_capacity(n_nodes);
        for _ in 0..n_nodes {
            let line = src.next_required("节点行")?;
            let id: usize = src.field(&line, 0, "节点编号")?;
            let x: f64 = src.field(&line, 1, "节点x坐标")?;
            let y: f64 = src.field(&line, 2, "节点y坐标")?;
            let z: f64 = src.field(&line, 3, "节点高程")?;
            nodes.push(Node::new(id, x, y, z));
        }

        let mut elements = Vec::with_capacity(n_elements);
        for _ in 0..n_elements {
            let line = src.next_required("单元行")?;
            let id: usize = src.field(&line, 0, "单元编号")?;
            let n_vertices: usize = src.field(&line, 1, "单元顶点数")?;
            let mut vertex_ids = Vec::with_capacity(n_vertices);
            for v in 0..n_vertices {
                vertex_ids.push(src.field(&line, 2 + v, "单元顶点编号")?);
            }
            let element =
                Element::new(id, vertex_ids).map_err(|e| src.error(e.to_string()))?;
            elements.push(element);
        }

        let open_boundaries = Self::read_open_boundaries(&mut src)?;
        let land_boundaries = if open_boundaries.is_some() {
            Self::read_land_boundaries(&mut src)?
        } else {
            None
        };

        Mesh::new(
            title,
            nodes,
            elements,
            open_boundaries.unwrap_or_default(),
            land_boundaries.unwrap_or_default(),
            Crs::wgs84(),
        )
    }

    /// 开边界块，文件在此结束时返回 None
    fn read_open_boundaries<R: BufRead>(
        src: &mut LineSource<R>,
    ) -> CwResult<Option<Vec<OpenBoundary>>> {
        let Some(nope_line) = src.try_next()? else {
            return Ok(None);
        };
        let n_boundaries: usize = src.field(&nope_line, 0, "开边界数 (NOPE)")?;
        // NETA 总节点数行, 仅作存在性检查
        let neta_line = src.next_required("开边界总节点数行 (NETA)")?;
        let _total: usize = src.field(&neta_line, 0, "开边界总节点数 (NETA)")?;

        let mut boundaries = Vec::with_capacity(n_boundaries);
        for _ in 0..n_boundaries {
            let count_line = src.next_required("开边界节点数行")?;
            let count: usize = src.field(&count_line, 0, "开边界节点数")?;
            let mut boundary_nodes = Vec::with_capacity(count);
            for _ in 0..count {
                let line = src.next_required("开边界节点行")?;
                boundary_nodes.push(src.field(&line, 0, "开边界节点编号")?);
            }
            boundaries.push(OpenBoundary::new(boundary_nodes));
        }
        Ok(Some(boundaries))
    }

    /// 陆边界块，文件在此结束时返回 None
    fn read_land_boundaries<R: BufRead>(
        src: &mut LineSource<R>,
    ) -> CwResult<Option<Vec<LandBoundary>>> {
        let Some(nbou_line) = src.try_next()? else {
            return Ok(None);
        };
        let n_boundaries: usize = src.field(&nbou_line, 0, "陆边界数 (NBOU)")?;
        let nvel_line = src.next_required("陆边界总节点数行 (NVEL)")?;
        let _total: usize = src.field(&nvel_line, 0, "陆边界总节点数 (NVEL)")?;

        let mut boundaries = Vec::with_capacity(n_boundaries);
        for _ in 0..n_boundaries {
            let head = src.next_required("陆边界描述行")?;
            let count: usize = src.field(&head, 0, "陆边界节点数")?;
            let code: i32 = src.field(&head, 1, "陆边界类型码")?;

            let mut boundary = LandBoundary::new(code);
            for _ in 0..count {
                let line = src.next_required("陆边界节点行")?;
                boundary.nodes.push(src.field(&line, 0, "陆边界节点编号")?);
                if LandBoundary::is_external_weir(code) {
                    boundary
                        .crest_elevations
                        .push(src.field(&line, 1, "堰顶高程")?);
                    boundary
                        .supercritical_coefficients
                        .push(src.field(&line, 2, "超临界流系数")?);
                } else if LandBoundary::is_internal_weir(code) {
                    boundary
                        .paired_nodes
                        .push(src.field(&line, 1, "对侧节点编号")?);
                    boundary
                        .crest_elevations
                        .push(src.field(&line, 2, "堰顶高程")?);
                    boundary
                        .subcritical_coefficients
                        .push(src.field(&line, 3, "亚临界流系数")?);
                    boundary
                        .supercritical_coefficients
                        .push(src.field(&line, 4, "超临界流系数")?);
                    if LandBoundary::has_pipes(code) {
                        boundary.pipe_heights.push(src.field(&line, 5, "涵管高程")?);
                        boundary
                            .pipe_coefficients
                            .push(src.field(&line, 6, "涵管系数")?);
                        boundary
                            .pipe_diameters
                            .push(src.field(&line, 7, "涵管直径")?);
                    }
                }
            }
            boundaries.push(boundary);
        }
        Ok(Some(boundaries))
    }
}

// ============================================================================
// 写出
// ============================================================================

/// ADCIRC ASCII 网格写出器
pub struct AdcircWriter;

impl AdcircWriter {
    /// 写出到文件
    ///
    /// # Errors
    /// IO 失败时返回错误
    pub fn write<P: AsRef<Path>>(mesh: &Mesh, path: P) -> CwResult<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| CwError::io_with_source(format!("无法创建 {}", path.display()), e))?;
        let mut writer = BufWriter::new(file);
        Self::write_to(mesh, &mut writer)?;
        writer
            .flush()
            .map_err(|e| CwError::io_with_source(format!("写入 {} 失败", path.display()), e))?;
        Ok(())
    }

    /// 写出到任意 writer
    ///
    /// 节点与单元按数组顺序输出声明编号，边界保持插入顺序与堰载荷。
    ///
    /// # Errors
    /// IO 失败时返回错误
    pub fn write_to<W: Write>(mesh: &Mesh, writer: &mut W) -> CwResult<()> {
        writeln!(writer, "{}", mesh.title)?;
        writeln!(writer, "{} {}", mesh.n_elements(), mesh.n_nodes())?;

        for node in mesh.nodes() {
            writeln!(writer, "{} {} {} {}", node.id, node.x, node.y, node.z)?;
        }
        for element in mesh.elements() {
            write!(writer, "{} {}", element.id, element.n_vertices())?;
            for id in &element.nodes {
                write!(writer, " {id}")?;
            }
            writeln!(writer)?;
        }

        // 开边界块
        writeln!(writer, "{}", mesh.n_open_boundaries())?;
        let neta: usize = mesh.open_boundaries().iter().map(OpenBoundary::len).sum();
        writeln!(writer, "{neta}")?;
        for boundary in mesh.open_boundaries() {
            writeln!(writer, "{}", boundary.len())?;
            for id in &boundary.nodes {
                writeln!(writer, "{id}")?;
            }
        }

        // 陆边界块
        writeln!(writer, "{}", mesh.n_land_boundaries())?;
        let nvel: usize = mesh.land_boundaries().iter().map(LandBoundary::len).sum();
        writeln!(writer, "{nvel}")?;
        for boundary in mesh.land_boundaries() {
            writeln!(writer, "{} {}", boundary.len(), boundary.code)?;
            for i in 0..boundary.len() {
                if LandBoundary::is_external_weir(boundary.code) {
                    writeln!(
                        writer,
                        "{} {} {}",
                        boundary.nodes[i],
                        boundary.crest_elevations[i],
                        boundary.supercritical_coefficients[i]
                    )?;
                } else if LandBoundary::has_pipes(boundary.code) {
                    writeln!(
                        writer,
                        "{} {} {} {} {} {} {} {}",
                        boundary.nodes[i],
                        boundary.paired_nodes[i],
                        boundary.crest_elevations[i],
                        boundary.subcritical_coefficients[i],
                        boundary.supercritical_coefficients[i],
                        boundary.pipe_heights[i],
                        boundary.pipe_coefficients[i],
                        boundary.pipe_diameters[i]
                    )?;
                } else if LandBoundary::is_internal_weir(boundary.code) {
                    writeln!(
                        writer,
                        "{} {} {} {} {}",
                        boundary.nodes[i],
                        boundary.paired_nodes[i],
                        boundary.crest_elevations[i],
                        boundary.subcritical_coefficients[i],
                        boundary.supercritical_coefficients[i]
                    )?;
                } else {
                    writeln!(writer, "{}", boundary.nodes[i])?;
                }
            }
        }
        Ok(())
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
coastal test grid
2 4
1 0.0 0.0 -2.0
2 1.0 0.0 -3.5
3 0.0 1.0 -4.0
4 1.0 1.0 -5.0
1 3 1 2 3
2 3 2 4 3
1
2
2
1
2
1
2
2 20
3
4
";

    const SAMPLE_WITH_WEIRS: &str = "\
weir grid
1 6
1 0.0 0.0 -2.0
2 1.0 0.0 -2.0
3 0.0 1.0 -2.0
4 2.0 0.0 -2.0
5 2.0 1.0 -2.0
6 3.0 0.0 -2.0
1 3 1 2 3
0
0
2
4
2 13
4 1.5 1.0
5 1.6 1.0
2 24
6 1 2.0 1.0 1.0
2 3 2.1 1.0 1.0
";

    fn path() -> &'static Path {
        Path::new("fort.14")
    }

    #[test]
    fn test_load_sample() {
        let mesh = AdcircLoader::load_from_reader(Cursor::new(SAMPLE), path()).unwrap();
        assert_eq!(mesh.title, "coastal test grid");
        assert_eq!(mesh.n_nodes(), 4);
        assert_eq!(mesh.n_elements(), 2);
        assert_eq!(mesh.n_open_boundaries(), 1);
        assert_eq!(mesh.n_land_boundaries(), 1);
        assert_eq!(mesh.open_boundaries()[0].nodes, vec![1, 2]);
        assert_eq!(mesh.land_boundaries()[0].code, 20);
        assert!((mesh.node_by_id(2).unwrap().z + 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_load_weirs() {
        let mesh = AdcircLoader::load_from_reader(Cursor::new(SAMPLE_WITH_WEIRS), path()).unwrap();
        assert_eq!(mesh.n_land_boundaries(), 2);

        let external = &mesh.land_boundaries()[0];
        assert_eq!(external.code, 13);
        assert_eq!(external.nodes, vec![4, 5]);
        assert!((external.crest_elevations[1] - 1.6).abs() < 1e-12);
        assert!(external.paired_nodes.is_empty());

        let internal = &mesh.land_boundaries()[1];
        assert_eq!(internal.code, 24);
        assert_eq!(internal.paired_nodes, vec![1, 3]);
        assert!((internal.subcritical_coefficients[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_boundary_blocks() {
        let text = "tiny\n1 3\n1 0.0 0.0 -1.0\n2 1.0 0.0 -1.0\n3 0.0 1.0 -1.0\n1 3 1 2 3\n";
        let mesh = AdcircLoader::load_from_reader(Cursor::new(text), path()).unwrap();
        assert_eq!(mesh.n_open_boundaries(), 0);
        assert_eq!(mesh.n_land_boundaries(), 0);
    }

    #[test]
    fn test_roundtrip() {
        let mesh = AdcircLoader::load_from_reader(Cursor::new(SAMPLE_WITH_WEIRS), path()).unwrap();
        let mut buf = Vec::new();
        AdcircWriter::write_to(&mesh, &mut buf).unwrap();

        let mesh2 = AdcircLoader::load_from_reader(Cursor::new(&buf), path()).unwrap();
        assert_eq!(mesh2.title, mesh.title);
        assert_eq!(mesh2.n_nodes(), mesh.n_nodes());
        assert_eq!(mesh2.n_elements(), mesh.n_elements());
        assert_eq!(mesh2.land_boundaries(), mesh.land_boundaries());
        for (a, b) in mesh.nodes().iter().zip(mesh2.nodes()) {
            assert_eq!(a.id, b.id);
            assert!((a.x - b.x).abs() < 1e-12);
            assert!((a.z - b.z).abs() < 1e-12);
        }
    }

    #[test]
    fn test_parse_error_carries_line() {
        let text = "bad grid\n1 3\n1 0.0 0.0 -1.0\n2 abc 0.0 -1.0\n";
        let err = AdcircLoader::load_from_reader(Cursor::new(text), path()).unwrap_err();
        match err {
            CwError::Parse { line, .. } => assert_eq!(line, 4),
            other => panic!("期望 Parse 错误, 得到 {other:?}"),
        }
    }

    #[test]
    fn test_truncated_file() {
        let text = "truncated\n2 4\n1 0.0 0.0 -1.0\n";
        let err = AdcircLoader::load_from_reader(Cursor::new(text), path()).unwrap_err();
        assert!(matches!(err, CwError::Parse { .. }));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(Path::new("fort.14")).unwrap(),
            MeshFormat::AdcircAscii
        );
        assert_eq!(
            detect_format(Path::new("mesh.GRD")).unwrap(),
            MeshFormat::AdcircAscii
        );
        assert!(matches!(
            detect_format(Path::new("mesh.msh")),
            Err(CwError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = AdcircLoader::load("/nonexistent/fort.14").unwrap_err();
        assert!(matches!(err, CwError::FileNotFound { .. }));
    }

    #[test]
    fn test_file_roundtrip() {
        let mesh = AdcircLoader::load_from_reader(Cursor::new(SAMPLE), path()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.grd");
        mesh.write(&out).unwrap();

        let mesh2 = Mesh::read(&out).unwrap();
        assert_eq!(mesh2.n_nodes(), mesh.n_nodes());
        assert_eq!(mesh2.open_boundaries()[0].nodes, mesh.open_boundaries()[0].nodes);
    }
}
