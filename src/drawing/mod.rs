//! Vector overlays: lines, polygons and rectangles turned into view-space meshes.
//!
//! Points are projected relative to the view's top-left and unwrapped across the
//! antimeridian, optionally clipped to the view, stroked into triangle strips and, for
//! filled shapes, rasterized into a coverage mask.

pub mod clip;
pub mod element;
pub mod engine;
pub mod fill;
pub mod project;
pub mod stroke;

pub use element::{Color, DrawingElement, DrawingStyle, ElementKind, ElementMesh, PointSequence};
pub use engine::{DrawingEngine, GeometryBuffers};
pub use fill::{contains_point, FillMask};
