//! Example: Convert a GLB file and inspect the resulting package.
//!
//! Run with: cargo run --example convert_glb -- assets/chair.glb

use std::env;
use std::fs;

use arq_core::usdz::Alignment;
use arq_core::{output_file_name, Converter, UsdzPackage};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: convert_glb <path-to-glb-file>");
        println!("\nExample:");
        println!("  cargo run --example convert_glb -- assets/chair.glb");
        return;
    }

    let path = &args[1];
    println!("Converting GLB file: {}", path);

    let glb = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            return;
        }
    };

    let conversion = match Converter::default().convert(&glb) {
        Ok(conversion) => conversion,
        Err(e) => {
            eprintln!("Error converting GLB file: {}", e);
            return;
        }
    };

    println!("\n=== {} ===", output_file_name(path));
    println!("Strategy: {}", conversion.strategy);
    println!("Size: {} bytes", conversion.bytes.len());
    for failure in &conversion.failures {
        println!("  Fell back past {}", failure);
    }

    if !conversion.diagnostics.is_empty() {
        println!("\n--- Diagnostics ---");
        for diagnostic in &conversion.diagnostics {
            println!("  [{:?}] {}", diagnostic.kind, diagnostic);
        }
    }

    let layer = match UsdzPackage::read(&conversion.bytes).and_then(|p| p.validate(Alignment::Strict)) {
        Ok(layer) => layer,
        Err(e) => {
            eprintln!("Package does not validate: {}", e);
            return;
        }
    };

    println!("\n--- Layer ---");
    print!("{}", layer.summary());
}
