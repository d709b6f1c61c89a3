//! Loan approval model core
//!
//! Everything an inference consumer needs to reproduce the exact transform a
//! model was trained on and to evaluate the model itself.
//!
//! Modules:
//! - `record`: Raw record access and the loan dataset column names
//! - `encoding`: Per-column categorical mappings
//! - `scaling`: Standardization parameters fitted at training time
//! - `transform`: The persisted feature transform (derivation + encoding)
//! - `forest`: Random-forest classifier and its decision trees
//! - `bundle`: Model + transform + scaling bundled as one artifact
//! - `store`: Artifact Store (filesystem persistence of bundles)
//! - `serde_canon`: Canonical JSON and BLAKE3 hashing

pub mod bundle;
pub mod encoding;
pub mod errors;
pub mod forest;
pub mod record;
pub mod scaling;
pub mod serde_canon;
pub mod store;
pub mod transform;

pub use bundle::{BundleMetadata, ModelBundle, BUNDLE_FORMAT_VERSION};
pub use encoding::CategoryMapping;
pub use errors::{ModelError, Result};
pub use forest::{Node, RandomForest, Tree};
pub use record::RawRecord;
pub use scaling::{FeatureScale, ScalingParams};
pub use store::ArtifactStore;
pub use transform::FeatureTransform;

/// Crate version string recorded in bundle metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
