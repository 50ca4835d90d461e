//! USD (Universal Scene Description) layer support.
//!
//! Writing and reading of the USDA (ASCII) layers that go into a USDZ
//! package. No composition: one flat layer per package.
//!
//! ## Supported USD Features
//!
//! - `Xform` root with `kind` metadata, the layer's `defaultPrim`
//! - `UsdGeomMesh`: points, triangle topology, vertex normals, display color,
//!   extent
//! - `UsdShade`: one `Material` with a `UsdPreviewSurface` shader, bound
//!   through `MaterialBindingAPI`
//!
//! ## Not Supported
//!
//! - Binary `.usdc` layers
//! - Textures, animation, skinning
//! - References, payloads, variants
//!
//! # Example
//!
//! ```ignore
//! use arq_core::usd::{parse_usda, write_usda};
//!
//! let text = write_usda(&scene);
//! let layer = parse_usda(&text)?;
//! println!("{}", layer.summary());
//! ```

mod parser;
mod types;
pub mod writer;

pub use parser::*;
pub use types::*;
pub use writer::{serialize, write_usda};
