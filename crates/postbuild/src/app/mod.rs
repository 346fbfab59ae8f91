//! Application layer: scanning, resolution, rendering, and rewriting.

pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod rewrite;
pub mod scan;
