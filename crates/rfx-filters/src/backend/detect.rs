//! Capability probe and backend detection.
//!
//! The probe runs once per process: it asks for a GPU device, records the
//! largest 2D texture it accepts, and finds the highest shader float
//! precision by compiling a trivial fragment shader at each level, highest
//! first. The result is cached and never refreshed.

use std::sync::OnceLock;

use super::BackendKind;

/// Shader float precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precision {
    /// `f16`
    Medium,
    /// `f32`
    High,
}

impl Precision {
    /// Levels in probe order.
    pub const PROBE_ORDER: [Precision; 2] = [Precision::High, Precision::Medium];

    pub fn name(&self) -> &'static str {
        match self {
            Self::High => "highp",
            Self::Medium => "mediump",
        }
    }
}

/// Probe results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// A GPU device could be created and compiles shaders.
    pub gpu_available: bool,
    /// Largest supported 2D texture dimension, 0 without a GPU.
    pub max_texture_size: u32,
    /// Highest precision that compiled.
    pub precision: Option<Precision>,
    /// Adapter name, for diagnostics.
    pub adapter: Option<String>,
}

impl Capabilities {
    /// No GPU.
    pub fn cpu_only() -> Self {
        Self { gpu_available: false, max_texture_size: 0, precision: None, adapter: None }
    }
}

/// Cached process-wide capabilities.
pub fn capabilities() -> &'static Capabilities {
    static CAPS: OnceLock<Capabilities> = OnceLock::new();
    CAPS.get_or_init(|| {
        let caps = probe();
        tracing::debug!(
            gpu = caps.gpu_available,
            max_texture_size = caps.max_texture_size,
            precision = caps.precision.map(|p| p.name()),
            adapter = caps.adapter.as_deref(),
            "capability probe"
        );
        caps
    })
}

#[cfg(feature = "wgpu")]
fn probe() -> Capabilities {
    pollster::block_on(probe_gpu()).unwrap_or_else(Capabilities::cpu_only)
}

#[cfg(not(feature = "wgpu"))]
fn probe() -> Capabilities {
    Capabilities::cpu_only()
}

#[cfg(feature = "wgpu")]
async fn probe_gpu() -> Option<Capabilities> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await?;

    let (device, _queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("rfx-probe"),
                required_features: adapter.features() & wgpu::Features::SHADER_F16,
                required_limits: adapter.limits(),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .ok()?;

    let mut precision = None;
    for level in Precision::PROBE_ORDER {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(level.name()),
            source: wgpu::ShaderSource::Wgsl(crate::shaders::precision_probe(level).into()),
        });
        if device.pop_error_scope().await.is_none() {
            precision = Some(level);
            break;
        }
    }

    Some(Capabilities {
        gpu_available: precision.is_some(),
        max_texture_size: device.limits().max_texture_dimension_2d,
        precision,
        adapter: Some(adapter.get_info().name),
    })
}

/// Information about a filter backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub backend: BackendKind,
    pub name: &'static str,
    pub available: bool,
    pub description: &'static str,
}

/// Detect all backends compiled into this build.
#[cfg_attr(not(feature = "wgpu"), allow(unused_mut))]
pub fn detect_backends() -> Vec<BackendInfo> {
    let mut backends = vec![BackendInfo {
        backend: BackendKind::Cpu,
        name: "CPU",
        available: true,
        description: "pixel buffers with rayon parallelization",
    }];

    #[cfg(feature = "wgpu")]
    backends.push(BackendInfo {
        backend: BackendKind::Wgpu,
        name: "wgpu",
        available: capabilities().gpu_available,
        description: "fragment shaders via wgpu (Vulkan/Metal/DX12/GL)",
    });

    backends
}

/// Get description of available backends and probe results.
pub fn describe_backends() -> String {
    let mut desc = String::new();
    for info in detect_backends() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description));
    }
    let caps = capabilities();
    if let Some(adapter) = &caps.adapter {
        desc.push_str(&format!("adapter: {adapter}\n"));
    }
    if caps.gpu_available {
        desc.push_str(&format!("max texture size: {}\n", caps.max_texture_size));
    }
    if let Some(p) = caps.precision {
        desc.push_str(&format!("shader precision: {}\n", p.name()));
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_is_cached() {
        let a = capabilities() as *const Capabilities;
        let b = capabilities() as *const Capabilities;
        assert_eq!(a, b);
    }

    #[test]
    fn test_cpu_always_listed() {
        let backends = detect_backends();
        assert!(backends.iter().any(|b| b.backend == BackendKind::Cpu && b.available));
        assert!(describe_backends().contains("[+] CPU"));
    }

    #[test]
    fn test_precision_order() {
        assert!(Precision::High > Precision::Medium);
        assert_eq!(Precision::PROBE_ORDER[0], Precision::High);
    }
}
