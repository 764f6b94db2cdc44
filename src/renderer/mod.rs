//! Viewing side of the scene: cameras, projections and viewports.

pub mod viewer;

pub use viewer::{Camera, Projection, Viewer, Viewport};
