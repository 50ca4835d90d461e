//! ARQ Core - GLB to USDZ conversion for AR Quick Look.
//!
//! This crate provides:
//!
//! - **GLB reading**: two readers (`gltf` crate backed and built-in) that
//!   produce triangle meshes plus diagnostics
//! - **Scene building**: a `Root` Xform with one mesh prim per mesh, all
//!   bound to a single preview material
//! - **USD support**: USDA writing and parsing
//! - **USDZ packaging**: stored, 64-byte aligned, deterministic archives
//! - **Conversion**: an ordered strategy chain with fallback
//!
//! # Example
//!
//! ```ignore
//! use arq_core::{output_file_name, Converter};
//!
//! let glb = std::fs::read("chair.glb")?;
//! let conversion = Converter::default().convert(&glb)?;
//! std::fs::write(output_file_name("chair.glb"), &conversion.bytes)?;
//! println!("Converted with {}", conversion.strategy);
//! ```

pub mod convert;
pub mod diagnostics;
pub mod glb;
pub mod mesh;
pub mod options;
pub mod scene;
pub mod usd;
pub mod usdz;

// Re-export commonly used types
pub use convert::{convert, output_file_name, Conversion, ConversionStrategy, ConvertError, Converter};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use mesh::{GlbAsset, MeshData};
pub use options::{ConvertOptions, OptionsError};
pub use scene::{PreviewMaterial, SceneGraph};
pub use usdz::{UsdzPackage, USDZ_MEDIA_TYPE};
