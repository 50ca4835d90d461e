//! GLB reader backed by the `gltf` crate.
//!
//! The crate validates the complete document before anything is read, so a
//! file it accepts has consistent accessor, view and buffer references. Files
//! it rejects fail here as a whole ([`GlbError::Gltf`]). Dangling accessor
//! references are caught first, as [`GlbError::InvalidFormat`].

use arq_math::Vec3;
use gltf::buffer::Source;
use gltf::mesh::Mode;
use gltf::Semantic;

use super::document::mode_name;
use super::primitive::{assemble, mesh_name, subject, RawPrimitive};
use super::{validate_header, GlbError, GlbResult};
use crate::diagnostics::Diagnostic;
use crate::mesh::GlbAsset;

/// Parse a GLB file into a [`GlbAsset`] using `gltf::Gltf`.
pub fn parse(bytes: &[u8]) -> GlbResult<GlbAsset> {
    validate_header(bytes)?;
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice_without_validation(bytes)?;
    let root = document.into_json();
    // The crate's own validation indexes accessors unchecked
    check_accessor_references(&root)?;
    let document = gltf::Document::from_json(root)?;
    let blob = blob.as_deref();

    log::debug!(
        "glTF document: {} meshes, {} accessors, blob {} bytes",
        document.meshes().len(),
        document.accessors().len(),
        blob.map_or(0, <[u8]>::len)
    );

    let mut asset = GlbAsset::new();

    for extension in document.extensions_required() {
        asset.diagnostics.push(Diagnostic::unsupported(
            "document",
            format!("required extension {extension} is not supported"),
        ));
    }

    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let raw = read_primitive(
                &primitive,
                blob,
                subject(mesh.index(), primitive.index()),
                mesh_name(mesh.name(), mesh.index(), primitive.index()),
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

    Ok(asset)
}

/// Every accessor a primitive names must exist.
fn check_accessor_references(root: &gltf::json::Root) -> GlbResult<()> {
    let count = root.accessors.len();

    for (mesh_index, mesh) in root.meshes.iter().enumerate() {
        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            let targets = primitive
                .targets
                .iter()
                .flatten()
                .flat_map(|target| [target.positions, target.normals, target.tangents])
                .flatten();
            let referenced = primitive
                .attributes
                .values()
                .copied()
                .chain(primitive.indices)
                .chain(targets);

            for accessor in referenced {
                if accessor.value() >= count {
                    return Err(GlbError::InvalidFormat(format!(
                        "{} refers to accessor {}, the document has {}",
                        subject(mesh_index, primitive_index),
                        accessor.value(),
                        count
                    )));
                }
            }
        }
    }

    Ok(())
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    blob: Option<&[u8]>,
    subject: String,
    name: String,
) -> Result<RawPrimitive, Diagnostic> {
    let mode = primitive.mode();
    if mode != Mode::Triangles {
        let mode = mode.as_gl_enum();
        return Err(Diagnostic::unsupported(
            subject,
            format!("mode {} ({}) is not a triangle list", mode, mode_name(mode)),
        ));
    }

    // Only the GLB blob is available; URI buffers stay unresolved
    let reader = primitive.reader(|buffer| match buffer.source() {
        Source::Bin => blob,
        Source::Uri(_) => None,
    });

    if primitive.get(&Semantic::Positions).is_none() {
        return Err(Diagnostic::skipped_mesh(subject, "no POSITION attribute, no vertices"));
    }
    let Some(positions) = reader.read_positions() else {
        return Err(Diagnostic::unsupported(
            subject,
            "POSITION data is not embedded in the GLB",
        ));
    };
    let positions: Vec<Vec3> = positions.map(Vec3::from).collect();

    let indices: Option<Vec<u32>> = match (primitive.indices(), reader.read_indices()) {
        (None, _) => None,
        (Some(_), Some(indices)) => Some(indices.into_u32().collect()),
        (Some(_), None) => {
            return Err(Diagnostic::unsupported(
                subject,
                "index data is not embedded in the GLB",
            ))
        }
    };

    let normals: Option<GlbResult<Vec<Vec3>>> = primitive.get(&Semantic::Normals).map(|_| {
        reader
            .read_normals()
            .map(|normals| normals.map(Vec3::from).collect())
            .ok_or_else(not_embedded("NORMAL"))
    });

    let colors: Option<GlbResult<Vec<Vec3>>> = primitive.get(&Semantic::Colors(0)).map(|_| {
        reader
            .read_colors(0)
            .map(|colors| {
                colors
                    .into_rgb_f32()
                    .map(|c| Vec3::from(c).clamp(Vec3::ZERO, Vec3::ONE))
                    .collect()
            })
            .ok_or_else(not_embedded("COLOR_0"))
    });

    Ok(RawPrimitive {
        subject,
        name,
        positions,
        indices,
        normals,
        colors,
    })
}

fn not_embedded(attribute: &'static str) -> impl Fn() -> GlbError {
    move || GlbError::UnsupportedFeature(format!("{attribute} data is not embedded in the GLB"))
}
