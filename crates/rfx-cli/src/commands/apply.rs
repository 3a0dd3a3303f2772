//! Apply a filter chain to a PNG.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use rfx_core::{Canvas, FilterConfig};
use rfx_filters::{BackendKind, Filter, FilterBackend, FilterRegistry, LoadOptions, active_filters};
use serde_json::Value;
use tracing::info;

use crate::ApplyArgs;
use crate::io::{PngSourceLoader, read_png, write_png};

/// Chain records from `--chain` followed by each `--filter`.
fn chain_document(args: &ApplyArgs) -> Result<Value> {
    let mut records = match &args.chain {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read chain: {}", path.display()))?;
            match serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))? {
                Value::Array(items) => items,
                single @ Value::Object(_) => vec![single],
                _ => bail!("{}: expected an array of filter records", path.display()),
            }
        }
        None => Vec::new(),
    };
    for inline in &args.filters {
        let record: Value = serde_json::from_str(inline).with_context(|| format!("Invalid filter record: {inline}"))?;
        records.push(record);
    }
    Ok(Value::Array(records))
}

pub fn run(args: ApplyArgs, verbose: bool) -> Result<()> {
    let kind: BackendKind = args.backend.parse().map_err(anyhow::Error::msg)?;
    let source = read_png(&args.input)?;
    let width = args.width.unwrap_or(source.width());
    let height = args.height.unwrap_or(source.height());

    // Blend images resolve relative to the chain file, else the input.
    let anchor = args.chain.as_deref().unwrap_or(&args.input);
    let base = anchor.parent().unwrap_or(Path::new("."));
    let options = LoadOptions::default().with_loader(Arc::new(PngSourceLoader::new(base)));
    let doc = chain_document(&args)?;
    let chain = pollster::block_on(FilterRegistry::global().chain_from_value(&doc, &options))?;

    let filters: Vec<&dyn Filter> = if args.keep_neutral {
        chain.iter().map(|f| f.as_ref()).collect()
    } else {
        active_filters(&chain)
    };

    let mut backend = FilterBackend::with_kind(kind, FilterConfig::global());
    let mut canvas = Canvas::new(width, height);
    let start = Instant::now();
    let output = backend
        .apply_filters(&filters, &source, width, height, &mut canvas, args.cache_key.as_deref())
        .context("Filter chain failed")?
        .context("destination has no 2D context")?;
    let elapsed = start.elapsed();
    info!(backend = output.backend.name(), filters = filters.len(), ?elapsed, "chain applied");

    let surface = canvas.into_surface().context("destination has no surface")?;
    write_png(&args.output, &surface)?;
    backend.dispose();

    if verbose {
        println!(
            "{} -> {} ({}x{}, {} filters, {} backend, {:.1} ms)",
            args.input.display(),
            args.output.display(),
            output.width,
            output.height,
            filters.len(),
            output.backend.name(),
            elapsed.as_secs_f64() * 1000.0
        );
    }
    Ok(())
}
