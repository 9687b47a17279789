//! Storage abstractions for service layer
//!
//! Uploaded images live on the local filesystem under the configured assets
//! directory and are addressed by public URL everywhere else.

pub mod assets;

pub use assets::{AssetKind, AssetStore, Upload};
