//! Built-in GLB reader.
//!
//! Splits the container, decodes the JSON chunk into [`Document`] and reads
//! accessors straight out of the BIN chunk. Only the header, chunk layout and
//! JSON syntax are fatal; everything else is decided per primitive.

use super::accessor::Accessors;
use super::container::GlbContainer;
use super::document::{mode_name, Document, Primitive, KHR_DRACO_MESH_COMPRESSION, MODE_TRIANGLES};
use super::primitive::{assemble, mesh_name, subject, RawPrimitive};
use super::{GlbError, GlbResult};
use crate::diagnostics::Diagnostic;
use crate::mesh::GlbAsset;

/// Parse a GLB file into a [`GlbAsset`].
///
/// # Errors
///
/// [`GlbError::InvalidFormat`] for a bad header, broken chunk layout or
/// undecodable JSON. Problems inside individual primitives are reported as
/// diagnostics on the returned asset instead.
pub fn parse(bytes: &[u8]) -> GlbResult<GlbAsset> {
    let container = GlbContainer::split(bytes)?;
    let document: Document = serde_json::from_slice(container.json)
        .map_err(|e| GlbError::InvalidFormat(format!("JSON chunk: {e}")))?;

    log::debug!(
        "GLB v{}: {} meshes, {} accessors, BIN chunk {} bytes",
        container.header.version,
        document.meshes.len(),
        document.accessors.len(),
        container.bin.map_or(0, <[u8]>::len)
    );

    let mut asset = GlbAsset::new();

    for extension in &document.extensions_required {
        asset.diagnostics.push(Diagnostic::unsupported(
            "document",
            format!("required extension {extension} is not supported"),
        ));
    }

    let accessors = Accessors::new(&document, resolve_buffers(&document, container.bin));

    for (mesh_index, mesh) in document.meshes.iter().enumerate() {
        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            let raw = read_primitive(
                &accessors,
                primitive,
                subject(mesh_index, primitive_index),
                mesh_name(mesh.name.as_deref(), mesh_index, primitive_index),
            );

            match raw {
                Ok(raw) => {
                    if let Some(mesh) = assemble(raw, &mut asset.diagnostics) {
                        asset.meshes.push(mesh);
                    }
                }
                Err(diagnostic) => asset.diagnostics.push(diagnostic),
            }
        }
    }

    log::debug!(
        "Read {} meshes ({} vertices, {} triangles)",
        asset.mesh_count(),
        asset.vertex_count(),
        asset.triangle_count()
    );

    Ok(asset)
}

/// Buffer 0 without a URI is the BIN chunk; nothing else is loaded.
fn resolve_buffers<'a>(document: &Document, bin: Option<&'a [u8]>) -> Vec<Option<&'a [u8]>> {
    document
        .buffers
        .iter()
        .enumerate()
        .map(|(index, buffer)| match (index, &buffer.uri) {
            (0, None) => bin,
            (_, Some(uri)) => {
                let shown = if uri.starts_with("data:") { "data URI" } else { uri.as_str() };
                log::debug!("Buffer {} refers to {}, not loaded", index, shown);
                None
            }
            (_, None) => None,
        })
        .collect()
}

fn read_primitive(
    accessors: &Accessors<'_>,
    primitive: &Primitive,
    subject: String,
    name: String,
) -> Result<RawPrimitive, Diagnostic> {
    let mode = primitive.mode();
    if mode != MODE_TRIANGLES {
        return Err(Diagnostic::unsupported(
            subject,
            format!("mode {} ({}) is not a triangle list", mode, mode_name(mode)),
        ));
    }

    if primitive.extensions.contains_key(KHR_DRACO_MESH_COMPRESSION) {
        return Err(Diagnostic::unsupported(
            subject,
            format!("{KHR_DRACO_MESH_COMPRESSION} is not supported"),
        ));
    }

    let Some(position) = primitive.attribute("POSITION") else {
        return Err(Diagnostic::skipped_mesh(subject, "no POSITION attribute, no vertices"));
    };

    let positions = match accessors.read_vec3(position) {
        Ok(positions) => positions,
        Err(e) => return Err(Diagnostic::unsupported(subject, format!("POSITION: {e}"))),
    };

    let indices = match primitive.indices.map(|index| accessors.read_indices(index)) {
        Some(Ok(indices)) => Some(indices),
        Some(Err(e)) => return Err(Diagnostic::unsupported(subject, format!("indices: {e}"))),
        None => None,
    };

    Ok(RawPrimitive {
        normals: primitive.attribute("NORMAL").map(|index| accessors.read_vec3(index)),
        colors: primitive.attribute("COLOR_0").map(|index| accessors.read_colors(index)),
        subject,
        name,
        positions,
        indices,
    })
}
