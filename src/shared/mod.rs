//! Types shared between the window manager modules.

pub mod geometry;

pub use geometry::{spans_overlap, Geometry, Point, Rect};
