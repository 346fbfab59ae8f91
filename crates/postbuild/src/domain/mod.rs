//! Domain types shared by the scanner, resolver, renderer, and rewriter.

pub mod errors;
pub mod model;
