/// Chart layer: requests, axis resolution and rendering.
///
/// ```text
///   ChartRequest ──▶ resolver (schema-only, pure) ──▶ render ──▶ ChartArtifact
/// ```

pub mod render;
pub mod request;
pub mod resolver;
pub mod summary;
