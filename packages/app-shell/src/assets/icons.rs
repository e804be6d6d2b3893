//! The fixed icon set prefetched before the app mounts

use std::path::Path;

use super::AssetRef;

/// Bundled icon files, relative to the asset root.
pub const ICONS: &[&str] = &[
    "icons/logo.png",
    "icons/menu.png",
    "icons/back.png",
    "icons/search.png",
    "icons/avatar_placeholder.png",
];

/// Asset references for [`ICONS`] under `asset_root`.
pub fn icon_assets(asset_root: &Path) -> Vec<AssetRef> {
    ICONS
        .iter()
        .map(|icon| AssetRef::bundled(asset_root.join(icon)))
        .collect()
}
