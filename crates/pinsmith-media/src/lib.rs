//! Pin image staging.
//!
//! Resolves a pin's image reference (local path or remote URL) into a
//! local file ready to hand to the browser's file input. Remote images
//! are downloaded to a temp file and upscaled to the minimum acceptable
//! width when needed; every temp file is deleted when the staged handle
//! drops, on success and failure paths alike.

mod stager;

pub use stager::{MediaStager, StagedMedia};
