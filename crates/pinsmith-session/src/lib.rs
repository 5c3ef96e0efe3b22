//! Session artifact storage for pinsmith.
//!
//! One opaque artifact per user, stored as a file under a namespaced base
//! directory. The artifact carries bearer material (cookies), so files are
//! created with owner-only permissions and writes are atomic: a crashed
//! save never leaves a partial file a later load would accept.

mod store;

pub use store::FileSessionStore;
