//! USDA (ASCII) layer writer.
//!
//! Flattens a [`SceneGraph`] into a single text layer. Output is a pure
//! function of the scene: the same scene always gives the same bytes.
//! Floats use Rust's shortest round-trip formatting, so [`parse_usda`]
//! recovers the exact values.
//!
//! [`parse_usda`]: super::parse_usda

use std::fmt::Write;

use arq_math::Vec3;
use rayon::prelude::*;

use crate::scene::{MeshPrim, PreviewMaterial, SceneGraph};

const INDENT: &str = "    ";

/// Write the scene as a USDA layer.
pub fn write_usda(scene: &SceneGraph) -> String {
    // Mesh blocks are independent; format them in parallel, keep order
    let meshes: Vec<String> = scene
        .mesh_prims
        .par_iter()
        .map(|prim| mesh_block(prim, 1))
        .collect();

    let mut out = String::new();
    out.push_str("#usda 1.0\n");
    out.push_str("(\n");
    let _ = writeln!(out, "{INDENT}defaultPrim = \"{}\"", scene.root.name);
    let _ = writeln!(out, "{INDENT}metersPerUnit = 1");
    let _ = writeln!(out, "{INDENT}upAxis = \"Y\"");
    out.push_str(")\n\n");

    let _ = writeln!(out, "def Xform \"{}\" (", scene.root.name);
    let _ = writeln!(out, "{INDENT}kind = \"component\"");
    out.push_str(")\n{\n");

    out.push_str(&material_block(&scene.material, 1));
    for block in &meshes {
        out.push('\n');
        out.push_str(block);
    }

    out.push_str("}\n");

    log::debug!(
        "Wrote USDA layer: {} mesh prims, {} bytes",
        scene.mesh_prims.len(),
        out.len()
    );

    out
}

/// [`write_usda`] as UTF-8 bytes.
pub fn serialize(scene: &SceneGraph) -> Vec<u8> {
    write_usda(scene).into_bytes()
}

fn material_block(material: &PreviewMaterial, depth: usize) -> String {
    let pad = INDENT.repeat(depth);
    let inner = INDENT.repeat(depth + 1);
    let attr = INDENT.repeat(depth + 2);

    let mut out = String::new();
    let _ = writeln!(out, "{pad}def Material \"{}\"", material.name);
    let _ = writeln!(out, "{pad}{{");
    let _ = writeln!(
        out,
        "{inner}token outputs:surface.connect = <{}.outputs:surface>",
        material.shader_path()
    );
    out.push('\n');
    let _ = writeln!(out, "{inner}def Shader \"PBRShader\"");
    let _ = writeln!(out, "{inner}{{");
    let _ = writeln!(out, "{attr}uniform token info:id = \"UsdPreviewSurface\"");
    let _ = writeln!(
        out,
        "{attr}color3f inputs:diffuseColor = {}",
        tuple(material.diffuse_color)
    );
    let _ = writeln!(out, "{attr}float inputs:metallic = {}", float(material.metallic));
    let _ = writeln!(out, "{attr}float inputs:roughness = {}", float(material.roughness));
    let _ = writeln!(out, "{attr}token outputs:surface");
    let _ = writeln!(out, "{inner}}}");
    let _ = writeln!(out, "{pad}}}");
    out
}

fn mesh_block(prim: &MeshPrim, depth: usize) -> String {
    let pad = INDENT.repeat(depth);
    let attr = INDENT.repeat(depth + 1);

    let mut out = String::new();
    let _ = writeln!(out, "{pad}def Mesh \"{}\" (", prim.name);
    let _ = writeln!(out, "{attr}prepend apiSchemas = [\"MaterialBindingAPI\"]");
    let _ = writeln!(out, "{pad})");
    let _ = writeln!(out, "{pad}{{");

    let extent = if prim.extent.is_empty() {
        [Vec3::ZERO, Vec3::ZERO]
    } else {
        [prim.extent.min(), prim.extent.max()]
    };
    let _ = writeln!(out, "{attr}float3[] extent = {}", vec3_array(&extent));
    let _ = writeln!(
        out,
        "{attr}int[] faceVertexCounts = {}",
        int_array(&prim.face_vertex_counts)
    );
    let _ = writeln!(
        out,
        "{attr}int[] faceVertexIndices = {}",
        int_array(&prim.face_vertex_indices)
    );
    let _ = writeln!(out, "{attr}rel material:binding = <{}>", prim.material.path());
    if let Some(normals) = &prim.normals {
        let _ = writeln!(
            out,
            "{attr}normal3f[] normals = {} (interpolation = \"vertex\")",
            vec3_array(normals)
        );
    }
    let _ = writeln!(out, "{attr}point3f[] points = {}", vec3_array(&prim.points));
    if let Some(colors) = &prim.display_color {
        let _ = writeln!(
            out,
            "{attr}color3f[] primvars:displayColor = {} (interpolation = \"vertex\")",
            vec3_array(colors)
        );
    }
    let _ = writeln!(out, "{attr}uniform token subdivisionScheme = \"none\"");
    let _ = writeln!(out, "{pad}}}");
    out
}

/// A float in USDA spelling: `nan`, `inf` and `-inf` for non-finite values.
fn float(value: f32) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        value.to_string()
    }
}

fn tuple(v: Vec3) -> String {
    format!("({}, {}, {})", float(v.x), float(v.y), float(v.z))
}

fn vec3_array(values: &[Vec3]) -> String {
    let items: Vec<String> = values.iter().map(|v| tuple(*v)).collect();
    format!("[{}]", items.join(", "))
}

fn int_array(values: &[i32]) -> String {
    let items: Vec<String> = values.iter().map(i32::to_string).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{GlbAsset, MeshData};
    use crate::usd::{parse_usda, UsdPrim};

    fn scene(mesh_count: usize) -> SceneGraph {
        let meshes = (0..mesh_count)
            .map(|i| {
                let offset = Vec3::splat(i as f32);
                MeshData::new(
                    format!("m{i}"),
                    vec![offset, offset + Vec3::X, offset + Vec3::new(0.1, 0.7, 0.3)],
                    vec![[0, 1, 2]],
                    Some(vec![Vec3::Z; 3]),
                    Some(vec![Vec3::X, Vec3::Y, Vec3::new(0.2, 0.4, 0.6)]),
                )
                .unwrap()
            })
            .collect();
        SceneGraph::from_asset(GlbAsset {
            meshes,
            diagnostics: Vec::new(),
        })
    }

    #[test]
    fn test_header_and_root() {
        let text = write_usda(&scene(0));

        assert!(text.starts_with("#usda 1.0\n(\n    defaultPrim = \"Root\"\n"));
        assert!(text.contains("    metersPerUnit = 1\n"));
        assert!(text.contains("    upAxis = \"Y\"\n"));
        assert!(text.contains("def Xform \"Root\" (\n    kind = \"component\"\n)\n{\n"));
        assert!(text.contains("uniform token info:id = \"UsdPreviewSurface\""));
        assert!(!text.contains("def Mesh"));
    }

    #[test]
    fn test_mesh_attributes() {
        let text = write_usda(&scene(1));

        assert!(text.contains("    def Mesh \"Mesh_0\" (\n"));
        assert!(text.contains("int[] faceVertexCounts = [3]\n"));
        assert!(text.contains("int[] faceVertexIndices = [0, 1, 2]\n"));
        assert!(text.contains("rel material:binding = </Root/Material>\n"));
        assert!(text.contains("normal3f[] normals = [(0, 0, 1), (0, 0, 1), (0, 0, 1)] (interpolation = \"vertex\")\n"));
        assert!(text.contains("point3f[] points = [(0, 0, 0), (1, 0, 0), (0.1, 0.7, 0.3)]\n"));
        assert!(text.contains("float3[] extent = [(0, 0, 0), (1, 0.7, 0.3)]\n"));
        assert!(text.contains("uniform token subdivisionScheme = \"none\"\n"));
    }

    #[test]
    fn test_non_finite_floats_use_usda_spelling() {
        assert_eq!(float(f32::NAN), "nan");
        assert_eq!(float(f32::INFINITY), "inf");
        assert_eq!(float(f32::NEG_INFINITY), "-inf");
        assert_eq!(float(0.25), "0.25");
        assert_eq!(tuple(Vec3::new(f32::NAN, 1.0, f32::NEG_INFINITY)), "(nan, 1, -inf)");

        let mut scene = scene(0);
        scene.material = std::sync::Arc::new(PreviewMaterial {
            roughness: f32::INFINITY,
            ..Default::default()
        });
        let text = write_usda(&scene);
        assert!(text.contains("float inputs:roughness = inf\n"));
    }

    #[test]
    fn test_deterministic() {
        let scene = scene(8);
        assert_eq!(serialize(&scene), serialize(&scene));
    }

    #[test]
    fn test_parse_back() {
        let scene = scene(3);
        let layer = parse_usda(&write_usda(&scene)).unwrap();

        assert_eq!(layer.metadata.default_prim.as_deref(), Some("Root"));
        let meshes = layer.meshes();
        assert_eq!(meshes.len(), 3);
        for (mesh, prim) in meshes.iter().zip(&scene.mesh_prims) {
            assert_eq!(mesh.path, prim.path);
            assert_eq!(mesh.points, prim.points);
            assert_eq!(mesh.face_vertex_indices, prim.face_vertex_indices);
            assert_eq!(mesh.display_color, prim.display_color);
            assert_eq!(mesh.normals_interpolation.as_deref(), Some("vertex"));
            assert_eq!(mesh.extent, Some([prim.extent.min(), prim.extent.max()]));
            assert_eq!(mesh.material_binding.as_deref(), Some("/Root/Material"));
        }

        let summary = layer.summary();
        assert_eq!(summary.materials.len(), 1);
        assert_eq!(summary.materials[0].diffuse_color, Some(Vec3::splat(0.7)));
        assert_eq!(summary.materials[0].roughness, Some(0.5));
        assert_eq!(summary.materials[0].metallic, Some(0.0));

        assert!(matches!(layer.default_prim(), Some(UsdPrim::Xform(_))));
    }
}
