//! Cache-or-build inventory loading and output rendering

use std::sync::Arc;

use tracing::{debug, info, warn};

use abqinv_client::CloudApi;
use abqinv_inventory::{BuildOptions, CacheStore, HostVars, InventoryBuilder, InventoryError, InventorySnapshot};

/// Return the cached snapshot if it is fresh, otherwise build and cache one
///
/// An unreadable cache counts as a miss and a failed cache write is only
/// logged. A failed build is never cached.
///
/// # Errors
/// Returns an error if the inventory had to be built and the build failed.
pub async fn load(
    api: Arc<dyn CloudApi>,
    options: BuildOptions,
    cache: Option<&CacheStore>,
    refresh: bool,
) -> Result<InventorySnapshot, InventoryError> {
    if let Some(cache) = cache.filter(|c| !refresh && c.is_fresh()) {
        match cache.try_read() {
            Ok(snapshot) => {
                info!(
                    path = %cache.path().display(),
                    ttl_secs = cache.ttl().as_secs(),
                    "using cached inventory"
                );
                return Ok(snapshot);
            }
            Err(e) => debug!(error = %e, "cache unreadable, rebuilding"),
        }
    }

    let snapshot = InventoryBuilder::new(api, options).build().await?;

    if let Some(cache) = cache
        && let Err(e) = cache.write(&snapshot)
    {
        warn!(error = %e, "failed to write inventory cache");
    }

    Ok(snapshot)
}

/// Render the whole inventory, or a single host's variables
///
/// An unknown host renders as an empty object.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn render(snapshot: &InventorySnapshot, host: Option<&str>) -> serde_json::Result<String> {
    match host {
        Some(host) => {
            let empty = HostVars::new();
            serde_json::to_string_pretty(snapshot.host(host).unwrap_or(&empty))
        }
        None => snapshot.to_json_pretty(),
    }
}
