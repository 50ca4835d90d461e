//! Turning decoded primitive attributes into [`MeshData`].
//!
//! Both readers decode accessors their own way, then hand the results here so
//! that triangle assembly and the attribute skip rules are the same for each.

use arq_math::Vec3;

use super::GlbResult;
use crate::diagnostics::Diagnostic;
use crate::mesh::MeshData;

/// Attributes of one triangle primitive, decoded but not yet checked.
pub(super) struct RawPrimitive {
    /// Diagnostic subject, see [`subject`]
    pub subject: String,
    pub name: String,
    pub positions: Vec<Vec3>,
    /// `None` for a non-indexed primitive
    pub indices: Option<Vec<u32>>,
    /// `None` when the primitive has no NORMAL attribute
    pub normals: Option<GlbResult<Vec<Vec3>>>,
    /// `None` when the primitive has no COLOR_0 attribute
    pub colors: Option<GlbResult<Vec<Vec3>>>,
}

pub(super) fn subject(mesh_index: usize, primitive_index: usize) -> String {
    format!("mesh {mesh_index} primitive {primitive_index}")
}

/// Mesh name for diagnostics and CLI output: source name or `mesh_<i>`,
/// suffixed with the primitive index.
pub(super) fn mesh_name(name: Option<&str>, mesh_index: usize, primitive_index: usize) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{name}.{primitive_index}"),
        _ => format!("mesh_{mesh_index}.{primitive_index}"),
    }
}

/// Build a [`MeshData`], recording every dropped attribute or rejected mesh.
pub(super) fn assemble(raw: RawPrimitive, diagnostics: &mut Vec<Diagnostic>) -> Option<MeshData> {
    let RawPrimitive {
        subject,
        name,
        positions,
        indices,
        normals,
        colors,
    } = raw;

    let indices = indices.unwrap_or_else(|| (0..positions.len() as u32).collect());
    let faces = triangles(&indices, &subject, diagnostics);

    let normals = match normals {
        Some(Ok(normals)) if normals.len() == positions.len() => Some(normals),
        Some(Ok(normals)) => {
            diagnostics.push(Diagnostic::skipped_attribute(
                subject.as_str(),
                format!(
                    "NORMAL has {} values for {} vertices, dropped",
                    normals.len(),
                    positions.len()
                ),
            ));
            None
        }
        Some(Err(e)) => {
            diagnostics.push(Diagnostic::skipped_attribute(
                subject.as_str(),
                format!("NORMAL dropped: {e}"),
            ));
            None
        }
        None => None,
    };

    let colors = match colors {
        Some(Ok(colors)) => Some(colors),
        Some(Err(e)) => {
            diagnostics.push(Diagnostic::skipped_attribute(
                subject.as_str(),
                format!("COLOR_0 dropped: {e}"),
            ));
            None
        }
        None => None,
    };

    match MeshData::new(name, positions, faces, normals, colors) {
        Ok(mesh) => Some(mesh),
        Err(e) => {
            diagnostics.push(Diagnostic::unsupported(subject, format!("mesh rejected: {e}")));
            None
        }
    }
}

/// Group a flat index list into triangles, dropping an incomplete tail.
fn triangles(indices: &[u32], subject: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<[u32; 3]> {
    let chunks = indices.chunks_exact(3);
    let remainder = chunks.remainder().len();
    if remainder != 0 {
        diagnostics.push(Diagnostic::unsupported(
            subject,
            format!(
                "{} indices is not a multiple of 3, dropped the last {remainder}",
                indices.len()
            ),
        ));
    }

    chunks.map(|c| [c[0], c[1], c[2]]).collect()
}
