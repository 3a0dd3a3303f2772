//! List registered filter types.

use anyhow::Result;
use rfx_filters::FilterRegistry;

pub fn run() -> Result<()> {
    for name in FilterRegistry::global().filter_names() {
        println!("{name}");
    }
    Ok(())
}
