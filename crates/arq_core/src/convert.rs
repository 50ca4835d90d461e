//! Conversion orchestration.
//!
//! A [`Converter`] holds an ordered list of [`ConversionStrategy`]s. The GLB
//! header is validated once, then each strategy is tried at most once, in
//! order, until one produces a package. A strategy that errors or panics is
//! recorded and the next one runs. When every strategy fails, the error names
//! each one with its failure.
//!
//! ```text
//! Idle -> Attempting(0) -> Success
//!                       -> Attempting(1) -> ... -> AllFailed
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::glb::{self, gltf_reader, GlbError, GlbResult};
use crate::mesh::GlbAsset;
use crate::options::{ConvertOptions, StrategyKind};
use crate::scene::{self, PreviewMaterial};
use crate::usd;
use crate::usdz::{self, PackageOptions, UsdzError};

/// Why a single strategy failed.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error(transparent)]
    Glb(#[from] GlbError),

    #[error(transparent)]
    Usdz(#[from] UsdzError),

    /// Anything else a strategy could not recover from
    #[error("{0}")]
    Internal(String),
}

/// A failed attempt, in the order it was made.
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: StrategyError,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

/// Errors that can occur while converting.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The input is not a GLB file; no strategy was attempted
    #[error("{0}")]
    InvalidFormat(String),

    #[error("all conversion strategies failed: {}", join_failures(.failures))]
    ConversionFailed { failures: Vec<StrategyFailure> },
}

impl ConvertError {
    /// True when the caller sent bad input rather than the pipeline failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ConvertError::InvalidFormat(_))
    }
}

fn join_failures(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(StrategyFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// What a successful strategy returns.
#[derive(Debug)]
pub struct StrategyOutput {
    /// The USDZ archive
    pub bytes: Vec<u8>,

    pub diagnostics: Vec<Diagnostic>,
}

/// One complete way of producing USDZ bytes from GLB bytes.
pub trait ConversionStrategy: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    fn convert(&self, glb: &[u8]) -> Result<StrategyOutput, StrategyError>;
}

/// A GLB reader a [`PipelineStrategy`] can be built on.
pub trait GlbSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn read(&self, glb: &[u8]) -> GlbResult<GlbAsset>;
}

/// Reads through the `gltf` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfCrateSource;

impl GlbSource for GltfCrateSource {
    fn name(&self) -> &'static str {
        StrategyKind::Gltf.name()
    }

    fn read(&self, glb: &[u8]) -> GlbResult<GlbAsset> {
        gltf_reader::parse(glb)
    }
}

/// Reads with the built-in container reader.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContainerSource;

impl GlbSource for ContainerSource {
    fn name(&self) -> &'static str {
        StrategyKind::Glb.name()
    }

    fn read(&self, glb: &[u8]) -> GlbResult<GlbAsset> {
        glb::parse(glb)
    }
}

/// Reader -> scene builder -> USDA writer -> packager.
pub struct PipelineStrategy<R: GlbSource> {
    source: R,
    material: PreviewMaterial,
    package: PackageOptions,
}

impl<R: GlbSource> PipelineStrategy<R> {
    pub fn new(source: R, material: PreviewMaterial, package: PackageOptions) -> Self {
        Self {
            source,
            material,
            package,
        }
    }
}

impl<R: GlbSource> ConversionStrategy for PipelineStrategy<R> {
    fn name(&self) -> &str {
        self.source.name()
    }

    fn convert(&self, glb: &[u8]) -> Result<StrategyOutput, StrategyError> {
        let asset = self.source.read(glb)?;
        let scene = scene::build(asset, self.material.clone());
        let layer = usd::serialize(&scene);
        let bytes = usdz::package(layer, &self.package)?.to_bytes()?;

        Ok(StrategyOutput {
            bytes,
            diagnostics: scene.diagnostics,
        })
    }
}

/// A finished conversion.
#[derive(Debug)]
pub struct Conversion {
    /// The USDZ archive
    pub bytes: Vec<u8>,

    /// Name of the strategy that produced it
    pub strategy: String,

    /// Non-fatal conditions reported by that strategy
    pub diagnostics: Vec<Diagnostic>,

    /// Strategies that failed before it
    pub failures: Vec<StrategyFailure>,
}

/// Runs strategies in order until one succeeds.
///
/// Holds only immutable strategies, so one converter can be shared across
/// threads.
pub struct Converter {
    strategies: Vec<Box<dyn ConversionStrategy>>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::with_options(&ConvertOptions::default())
    }
}

impl Converter {
    pub fn new(strategies: Vec<Box<dyn ConversionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Pipeline strategies in the order `options.strategies` lists them.
    pub fn with_options(options: &ConvertOptions) -> Self {
        let material = options.material.to_material();
        let strategies = options
            .strategies
            .iter()
            .map(|kind| -> Box<dyn ConversionStrategy> {
                match kind {
                    StrategyKind::Gltf => Box::new(PipelineStrategy::new(
                        GltfCrateSource,
                        material.clone(),
                        options.package.clone(),
                    )),
                    StrategyKind::Glb => Box::new(PipelineStrategy::new(
                        ContainerSource,
                        material.clone(),
                        options.package.clone(),
                    )),
                }
            })
            .collect();

        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Convert GLB bytes to USDZ bytes.
    ///
    /// # Errors
    ///
    /// [`ConvertError::InvalidFormat`] when the header is not a GLB header,
    /// [`ConvertError::ConversionFailed`] when every strategy failed.
    pub fn convert(&self, glb: &[u8]) -> Result<Conversion, ConvertError> {
        let header =
            glb::validate_header(glb).map_err(|e| ConvertError::InvalidFormat(e.to_string()))?;
        log::debug!(
            "GLB v{} header ok, {} bytes declared, {} bytes given",
            header.version,
            header.length,
            glb.len()
        );

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            let name = strategy.name().to_string();
            log::debug!("Trying strategy {}", name);

            // A panic inside one strategy (including third-party decoders)
            // counts as that strategy's failure
            let result = panic::catch_unwind(AssertUnwindSafe(|| strategy.convert(glb)))
                .unwrap_or_else(|payload| {
                    Err(StrategyError::Internal(format!(
                        "panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });

            match result {
                Ok(output) => {
                    log::info!(
                        "Converted with {}: {} bytes, {} diagnostics",
                        name,
                        output.bytes.len(),
                        output.diagnostics.len()
                    );
                    return Ok(Conversion {
                        bytes: output.bytes,
                        strategy: name,
                        diagnostics: output.diagnostics,
                        failures,
                    });
                }
                Err(error) => {
                    log::warn!("Strategy {} failed: {}", name, error);
                    failures.push(StrategyFailure {
                        strategy: name,
                        error,
                    });
                }
            }
        }

        Err(ConvertError::ConversionFailed { failures })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Convert with the default options.
pub fn convert(glb: &[u8]) -> Result<Vec<u8>, ConvertError> {
    Converter::default().convert(glb).map(|c| c.bytes)
}

/// Download name for a converted file: `chair.glb` gives `chair.usdz`,
/// anything else gives `model.usdz`.
pub fn output_file_name(input: &str) -> String {
    let file_name = Path::new(input)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    match file_name.len().checked_sub(4) {
        Some(stem_len)
            if stem_len > 0
                && file_name.is_char_boundary(stem_len)
                && file_name[stem_len..].eq_ignore_ascii_case(".glb") =>
        {
            format!("{}.usdz", &file_name[..stem_len])
        }
        _ => "model.usdz".to_string(),
    }
}
