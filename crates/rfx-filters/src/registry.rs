//! Filter registry: rebuilds filters from `{ "type": tag, ... }` records.
//!
//! The registry uses a singleton via [`FilterRegistry::global()`]; built-in
//! filters are registered on first access.
//!
//! Most filters rebuild synchronously. Filters that embed a loadable resource
//! ([`BlendImage`], and any [`Composed`] containing one) need a
//! [`SourceLoader`] and must go through [`FilterRegistry::from_object`].
//!
//! # Example
//!
//! ```ignore
//! use rfx_filters::registry::{FilterRegistry, LoadOptions};
//!
//! let record = serde_json::json!({ "type": "Brightness", "brightness": 0.2 });
//! let filter = FilterRegistry::global().from_object_sync(&record)?;
//! let same = pollster::block_on(FilterRegistry::global().from_object(&record, &LoadOptions::default()))?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use rfx_core::Surface;
use serde_json::Value;

use crate::filters::{
    BlendColor, BlendImage, Blur, Brightness, ColorMatrix, ColorMatrixPreset, Composed, Contrast, Convolute, Gamma,
    Grayscale, HueRotation, Invert, Noise, Pixelate, PresetFilter, RemoveColor, Resize, Saturation, Vibrance,
    from_record,
};
use crate::{Filter, FilterError, FilterResult};

/// Boxed `Send` future, as returned by the async loaders.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// =============================================================================
// Load options
// =============================================================================

/// Cooperative cancellation flag shared between a caller and a reconstruction.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Aborted)` once aborted.
    pub fn check(&self) -> FilterResult<()> {
        if self.is_aborted() { Err(FilterError::Aborted) } else { Ok(()) }
    }
}

/// Resolves the `src` of an embedded image to pixels.
pub trait SourceLoader: Send + Sync {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, FilterResult<Arc<Surface>>>;
}

/// Loader over preloaded surfaces.
#[derive(Debug, Default)]
pub struct MemorySourceLoader {
    sources: HashMap<String, Arc<Surface>>,
}

impl MemorySourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, src: impl Into<String>, surface: Arc<Surface>) -> Self {
        self.insert(src, surface);
        self
    }

    pub fn insert(&mut self, src: impl Into<String>, surface: Arc<Surface>) {
        self.sources.insert(src.into(), surface);
    }
}

impl SourceLoader for MemorySourceLoader {
    fn load<'a>(&'a self, src: &'a str) -> BoxFuture<'a, FilterResult<Arc<Surface>>> {
        Box::pin(async move {
            self.sources
                .get(src)
                .cloned()
                .ok_or_else(|| FilterError::SourceLoad { src: src.to_string(), message: "not found".into() })
        })
    }
}

/// Options for asynchronous reconstruction.
#[derive(Clone, Default)]
pub struct LoadOptions {
    pub signal: AbortSignal,
    pub loader: Option<Arc<dyn SourceLoader>>,
}

impl LoadOptions {
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("signal", &self.signal)
            .field("loader", &self.loader.is_some())
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Asynchronous constructor.
pub type LoadFn =
    for<'a> fn(&'a FilterRegistry, &'a Value, &'a LoadOptions) -> BoxFuture<'a, FilterResult<Box<dyn Filter>>>;

/// Registry entry for one type tag.
#[derive(Clone)]
pub struct FilterInfo {
    /// Type tag, e.g. `"Brightness"`.
    pub name: &'static str,
    /// Synchronous constructor.
    pub from_object: fn(&FilterRegistry, &Value) -> FilterResult<Box<dyn Filter>>,
    /// Asynchronous constructor; `None` when the sync one suffices.
    pub load: Option<LoadFn>,
}

/// Table of filter constructors keyed by type tag.
pub struct FilterRegistry {
    filters: HashMap<&'static str, FilterInfo>,
}

fn boxed<F: Filter + 'static>(result: FilterResult<F>) -> FilterResult<Box<dyn Filter>> {
    result.map(|f| Box::new(f) as Box<dyn Filter>)
}

fn preset_from_object(_: &FilterRegistry, record: &Value) -> FilterResult<Box<dyn Filter>> {
    let tag = record_type(record)?;
    let preset = ColorMatrixPreset::from_name(tag).ok_or_else(|| FilterError::UnknownFilter(tag.to_string()))?;
    boxed(PresetFilter::from_object(preset, record))
}

fn load_blend_image<'a>(
    _: &'a FilterRegistry,
    record: &'a Value,
    options: &'a LoadOptions,
) -> BoxFuture<'a, FilterResult<Box<dyn Filter>>> {
    Box::pin(async move { boxed(BlendImage::load(record, options).await) })
}

fn load_composed<'a>(
    registry: &'a FilterRegistry,
    record: &'a Value,
    options: &'a LoadOptions,
) -> BoxFuture<'a, FilterResult<Box<dyn Filter>>> {
    Box::pin(async move { boxed(Composed::load(registry, record, options).await) })
}

/// `"type"` field of a record.
pub fn record_type(record: &Value) -> FilterResult<&str> {
    record
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| FilterError::InvalidRecord("missing \"type\" tag".into()))
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { filters: HashMap::new() }
    }

    /// Global registry with the built-in filters.
    pub fn global() -> &'static FilterRegistry {
        static INSTANCE: OnceLock<FilterRegistry> = OnceLock::new();
        INSTANCE.get_or_init(|| {
            let mut registry = FilterRegistry::new();
            registry.register_builtin_filters();
            registry
        })
    }

    fn register_builtin_filters(&mut self) {
        self.register(FilterInfo {
            name: Brightness::TYPE,
            from_object: |_, r| boxed(from_record::<Brightness>(Brightness::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Contrast::TYPE,
            from_object: |_, r| boxed(from_record::<Contrast>(Contrast::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Saturation::TYPE,
            from_object: |_, r| boxed(from_record::<Saturation>(Saturation::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Vibrance::TYPE,
            from_object: |_, r| boxed(from_record::<Vibrance>(Vibrance::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Gamma::TYPE,
            from_object: |_, r| boxed(from_record::<Gamma>(Gamma::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Noise::TYPE,
            from_object: |_, r| boxed(from_record::<Noise>(Noise::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Invert::TYPE,
            from_object: |_, r| boxed(from_record::<Invert>(Invert::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Pixelate::TYPE,
            from_object: |_, r| boxed(from_record::<Pixelate>(Pixelate::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: RemoveColor::TYPE,
            from_object: |_, r| boxed(from_record::<RemoveColor>(RemoveColor::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Grayscale::TYPE,
            from_object: |_, r| boxed(from_record::<Grayscale>(Grayscale::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: ColorMatrix::TYPE,
            from_object: |_, r| boxed(from_record::<ColorMatrix>(ColorMatrix::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: HueRotation::TYPE,
            from_object: |_, r| boxed(from_record::<HueRotation>(HueRotation::TYPE, r)),
            load: None,
        });
        for preset in ColorMatrixPreset::ALL {
            self.register(FilterInfo { name: preset.name(), from_object: preset_from_object, load: None });
        }
        self.register(FilterInfo {
            name: Convolute::TYPE,
            from_object: |_, r| boxed(Convolute::from_object(r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Blur::TYPE,
            from_object: |_, r| boxed(from_record::<Blur>(Blur::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: Resize::TYPE,
            from_object: |_, r| boxed(Resize::from_object(r)),
            load: None,
        });
        self.register(FilterInfo {
            name: BlendColor::TYPE,
            from_object: |_, r| boxed(from_record::<BlendColor>(BlendColor::TYPE, r)),
            load: None,
        });
        self.register(FilterInfo {
            name: BlendImage::TYPE,
            from_object: |_, _| Err(FilterError::RequiresAsync(BlendImage::TYPE.to_string())),
            load: Some(load_blend_image),
        });
        self.register(FilterInfo {
            name: Composed::TYPE,
            from_object: |reg, r| boxed(Composed::from_object(reg, r)),
            load: Some(load_composed),
        });
    }

    /// Registers a filter, replacing any entry with the same tag.
    pub fn register(&mut self, info: FilterInfo) {
        self.filters.insert(info.name, info);
    }

    pub fn get(&self, name: &str) -> Option<&FilterInfo> {
        self.filters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered type tags, sorted.
    pub fn filter_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.filters.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, record: &Value) -> FilterResult<&FilterInfo> {
        let tag = record_type(record)?;
        self.filters.get(tag).ok_or_else(|| FilterError::UnknownFilter(tag.to_string()))
    }

    /// Rebuild a filter that needs no loading.
    ///
    /// Returns [`FilterError::RequiresAsync`] for records that embed a
    /// loadable resource.
    pub fn from_object_sync(&self, record: &Value) -> FilterResult<Box<dyn Filter>> {
        let info = self.lookup(record)?;
        (info.from_object)(self, record)
    }

    /// Rebuild any filter, loading embedded resources through `options`.
    pub fn from_object<'a>(
        &'a self,
        record: &'a Value,
        options: &'a LoadOptions,
    ) -> BoxFuture<'a, FilterResult<Box<dyn Filter>>> {
        Box::pin(async move {
            options.signal.check()?;
            let info = self.lookup(record)?;
            match info.load {
                Some(load) => load(self, record, options).await,
                None => (info.from_object)(self, record),
            }
        })
    }

    /// Rebuild a chain from a JSON array of records.
    pub async fn chain_from_value(&self, records: &Value, options: &LoadOptions) -> FilterResult<Vec<Box<dyn Filter>>> {
        let items = records
            .as_array()
            .ok_or_else(|| FilterError::InvalidRecord("filter chain must be an array".into()))?;
        let mut chain = Vec::with_capacity(items.len());
        for record in items {
            chain.push(self.from_object(record, options).await?);
        }
        tracing::debug!(filters = chain.len(), "Rebuilt filter chain");
        Ok(chain)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{BlendImageMode, BlendSource};
    use serde_json::json;

    #[test]
    fn test_builtin_filters_registered() {
        let registry = FilterRegistry::global();
        for name in ["Brightness", "Convolute", "Resize", "Composed", "BlendImage", "Sepia", "Polaroid"] {
            assert!(registry.contains(name), "{name} missing");
        }
        assert_eq!(registry.filter_names().len(), 18 + ColorMatrixPreset::ALL.len());
    }

    #[test]
    fn test_unknown_and_untagged_records() {
        let registry = FilterRegistry::global();
        assert!(matches!(
            registry.from_object_sync(&json!({ "type": "Sharpen" })),
            Err(FilterError::UnknownFilter(t)) if t == "Sharpen"
        ));
        assert!(matches!(registry.from_object_sync(&json!({ "brightness": 1 })), Err(FilterError::InvalidRecord(_))));
    }

    #[test]
    fn test_missing_params_take_defaults() {
        let f = FilterRegistry::global().from_object_sync(&json!({ "type": "Pixelate" })).unwrap();
        assert_eq!(f.to_object(), json!({ "type": "Pixelate", "blocksize": 4 }));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let registry = FilterRegistry::global();
        assert!(registry.from_object_sync(&json!({ "type": "Convolute", "matrix": [1, 1, 1, 1] })).is_err());
        assert!(registry.from_object_sync(&json!({ "type": "ColorMatrix", "matrix": [1, 0, 0] })).is_err());
        assert!(registry.from_object_sync(&json!({ "type": "Resize", "scaleX": 0 })).is_err());
    }

    #[test]
    fn test_async_path_handles_plain_filters() {
        let record = json!({ "type": "Brightness", "brightness": 0.25 });
        let f = pollster::block_on(FilterRegistry::global().from_object(&record, &LoadOptions::default())).unwrap();
        assert_eq!(f.to_object(), record);
    }

    #[test]
    fn test_composite_with_image_requires_async() {
        let image = crate::filters::BlendImage::new(
            BlendSource::new("a.png", Arc::new(Surface::filled(1, 1, [1, 2, 3, 4]))),
            BlendImageMode::Multiply,
        );
        let record = json!({ "type": "Composed", "subFilters": [{ "type": "Invert" }, image.to_object()] });
        let registry = FilterRegistry::global();
        assert!(matches!(registry.from_object_sync(&record), Err(FilterError::RequiresAsync(_))));

        let loader = MemorySourceLoader::new().with_source("a.png", image.image.surface.clone());
        let options = LoadOptions::default().with_loader(Arc::new(loader));
        let rebuilt = pollster::block_on(registry.from_object(&record, &options)).unwrap();
        assert_eq!(rebuilt.filter_type(), "Composed");
        assert_eq!(rebuilt.to_object()["subFilters"][1]["image"]["src"], "a.png");
    }

    #[test]
    fn test_abort_stops_reconstruction() {
        let signal = AbortSignal::new();
        signal.abort();
        let options = LoadOptions::default().with_signal(signal);
        let record = json!([{ "type": "Invert" }]);
        let result = pollster::block_on(FilterRegistry::global().chain_from_value(&record, &options));
        assert!(matches!(result, Err(FilterError::Aborted)));
    }

    #[test]
    fn test_chain_from_value() {
        let records = json!([{ "type": "Brightness", "brightness": 0.1 }, { "type": "Sepia" }]);
        let chain = pollster::block_on(FilterRegistry::global().chain_from_value(&records, &LoadOptions::default()))
            .unwrap();
        let tags: Vec<_> = chain.iter().map(|f| f.filter_type()).collect();
        assert_eq!(tags, ["Brightness", "Sepia"]);
        assert!(pollster::block_on(FilterRegistry::global().chain_from_value(&json!({}), &LoadOptions::default())).is_err());
    }
}
