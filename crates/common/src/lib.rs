/**
 * Proof-of-work creation tokens: validity is a pure
 *  function of the token bytes.
 */
pub mod credential;
/**
 * Content-addressed, deduplicated blob storage.
 */
pub mod content;
pub mod engine;
pub mod error;
/**
 * Request path resolution: clean URLs and
 *  the 404 policy.
 */
pub mod resolver;
/**
 * Site lifecycle and per-site path index,
 *  size accounting and manifest.
 */
pub mod site;
/**
 * The durable keyed store the engine runs on,
 *  plus an in-memory implementation.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::credential::{decode_token, generate_token, is_valid, Threshold};
    pub use crate::engine::Engine;
    pub use crate::error::SiteError;
    pub use crate::resolver::Resolved;
    pub use crate::site::{NewFile, Site, SiteCreated, SiteSettings, UploadResult, MANIFEST_PATH};
    pub use crate::store::{DynKvStore, KvError, KvStore, MemoryKvStore};
    pub use crate::version::build_info;
}
