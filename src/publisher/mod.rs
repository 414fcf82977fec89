//! 发布目录与元数据清单

mod cache;
pub mod classify;
pub mod manifest;

pub use cache::{publish_file, write_atomic};
pub use classify::{CategoryRule, Classifier, Matcher, DEFAULT_CATEGORY};
pub use manifest::{
    build_manifest, AssetType, Manifest, ManifestPublisher, PublishedAsset, MANIFEST_FILENAME,
};
