// crates/cw_mesh/tests/workflow.rs

//! 跨模块集成测试: 读网格、空间查询、重投影、属性表随网格读写。

use cw_geo::Crs;
use cw_mesh::{Mesh, NodalAttributes};

// 节点编号带空洞 (缺 3), 覆盖非连续编号路径
const FORT14: &str = "\
gap numbered estuary grid
2 4
1 121.40 30.10 -5.0
2 121.50 30.10 -8.0
4 121.40 30.20 -6.5
5 121.50 30.20 -12.0
1 3 1 2 4
2 3 2 5 4
1
2
2
1
2
1
2
2 20
4
5
";

const FORT13: &str = "\
gap numbered estuary attributes
4
2
mannings_n_at_sea_floor
dimensionless
1
0.025
surface_directional_effective_roughness_length
m
12
0 0 0 0 0 0 0 0 0 0 0 0
mannings_n_at_sea_floor
1
5 0.04
surface_directional_effective_roughness_length
1
4 0.1 0.1 0.1 0.1 0.1 0.1 0.2 0.2 0.2 0.2 0.2 0.2
";

fn write_fixture(dir: &std::path::Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_mesh_query_and_attributes_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = write_fixture(dir.path(), "fort.14", FORT14);
    let attr_path = write_fixture(dir.path(), "fort.13", FORT13);

    let mut mesh = Mesh::read(&mesh_path).unwrap();
    assert_eq!(mesh.n_nodes(), 4);
    assert!(!mesh.node_numbering_is_contiguous());
    assert_eq!(mesh.node_index_by_id(4).unwrap(), 2);
    assert!((mesh.node_by_id(5).unwrap().z + 12.0).abs() < 1e-12);

    mesh.build_spatial_index();
    let near = mesh.nearest_node(121.49, 30.11).unwrap();
    assert_eq!(mesh.node(near).unwrap().id, 2);

    // 属性表经网格解析声明编号
    let table = NodalAttributes::read(&attr_path, Some(&mesh)).unwrap();
    let manning = table.locate_attribute("mannings_n_at_sea_floor").unwrap();
    let roughness = table
        .locate_attribute("surface_directional_effective_roughness_length")
        .unwrap();

    // 节点 5 是数组下标 3; 其余节点取默认值
    assert!((table.scalar(manning, 3).unwrap() - 0.04).abs() < 1e-12);
    assert!((table.scalar(manning, 0).unwrap() - 0.025).abs() < 1e-12);
    let row = table.row(roughness, 2).unwrap();
    assert_eq!(row.len(), 12);
    assert!((row[6] - 0.2).abs() < 1e-12);

    // 回写保持声明编号空间
    let out_path = dir.path().join("out.13");
    table.write(&out_path).unwrap();
    let text = std::fs::read_to_string(&out_path).unwrap();
    assert!(text.contains("\n5 0.04\n"));
    assert!(text.contains("\n4 0.1"));

    let table2 = NodalAttributes::read(&out_path, Some(&mesh)).unwrap();
    assert_eq!(table2.n_non_default(manning).unwrap(), 1);
    assert!((table2.scalar(manning, 3).unwrap() - 0.04).abs() < 1e-12);
}

#[test]
fn test_reproject_roundtrip_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = write_fixture(dir.path(), "fort.14", FORT14);

    let mut mesh = Mesh::read(&mesh_path).unwrap();
    let original: Vec<(f64, f64)> = mesh.nodes().iter().map(|n| (n.x, n.y)).collect();
    mesh.build_spatial_index();

    let utm = Crs::utm(51, true).unwrap();
    mesh.reproject(&utm).unwrap();
    assert_eq!(mesh.crs(), &utm);
    // 投影后坐标量级为米
    assert!(mesh.node(0).unwrap().x > 100_000.0);
    // 投影使空间索引失效
    assert!(!mesh.has_spatial_index());

    mesh.reproject(&Crs::wgs84()).unwrap();
    for (node, (x0, y0)) in mesh.nodes().iter().zip(&original) {
        assert!((node.x - x0).abs() < 1e-6);
        assert!((node.y - y0).abs() < 1e-6);
    }
}
