//! Directory Roll-up (`spec.md` §4.F).
//!
//! Free functions over `&CatalogStore`, not methods on it — roll-up is a
//! pure orchestration of two Catalog Store calls, and the on-read listing
//! path (an external-facade concern) needs to reach it without routing
//! through the Job Coordinator.

use crate::infrastructure::database::catalog::{CatalogResult, CatalogStore, DirectoryCacheStats};

/// Depth bound applied when no caller-supplied value is available.
pub const DEFAULT_MAX_DEPTH: u32 = 20;

/// Validates `dir_path`'s cache status without writing anything
/// (`spec.md` §4.A `ValidateDirectoryCacheStatus`, surfaced here for the
/// explicit `ValidateDirectoryCache` external operation).
pub async fn validate(
    catalog: &CatalogStore,
    dir_path: &str,
    max_depth: u32,
) -> CatalogResult<DirectoryCacheStats> {
    catalog.validate_directory_cache_status(dir_path, max_depth).await
}

/// Validates and writes the `cached` flag if it changed. Used both by the
/// on-read opportunistic-validate hook (§4.F.1) and the explicit API call
/// (§4.F.2). Returns the validation stats plus whether the flag was flipped.
pub async fn update_if_valid(
    catalog: &CatalogStore,
    dir_path: &str,
    max_depth: u32,
) -> CatalogResult<(DirectoryCacheStats, bool)> {
    catalog.update_directory_cache_if_valid(dir_path, max_depth).await
}
