//! Serializers for the compiled system graph.
//!
//! - **Turtle** ([`turtle`]): the build output, written to `output.ttl`.

pub mod turtle;
