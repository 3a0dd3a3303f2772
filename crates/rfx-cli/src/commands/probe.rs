//! Capability probe and backend selection report.

use anyhow::Result;
use rfx_core::FilterConfig;
use rfx_filters::backend::{capabilities, describe_backends, select_backend_kind};

use crate::ProbeArgs;

pub fn run(args: ProbeArgs) -> Result<()> {
    let config = FilterConfig::global();
    let caps = capabilities();
    let selected = select_backend_kind(config, caps);

    if args.json {
        let doc = serde_json::json!({
            "gpuAvailable": caps.gpu_available,
            "maxTextureSize": caps.max_texture_size,
            "precision": caps.precision.map(|p| p.name()),
            "adapter": caps.adapter,
            "config": {
                "enableGpuFiltering": config.enable_gpu_filtering,
                "textureSize": config.texture_size,
                "forcePutImageData": config.force_put_image_data,
            },
            "selected": selected.name(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", describe_backends());
        println!("texture size: {}", config.texture_size);
        println!("gpu filtering: {}", if config.enable_gpu_filtering { "enabled" } else { "disabled" });
        println!("selected: {}", selected.name());
    }
    Ok(())
}
