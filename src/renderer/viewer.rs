//! Camera and viewer abstractions
//!
//! Provides the camera the pointer picker casts rays through. Drawing is left
//! to the render collaborator.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

/// Viewport information, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Get the aspect ratio. A zero height yields 1.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Convert a pixel position (origin top-left, Y down) to normalized
    /// device coordinates (origin center, Y up).
    pub fn pixel_to_ndc(&self, x: f32, y: f32) -> Vec2 {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        Vec2::new(
            (x - self.x as f32) / w * 2.0 - 1.0,
            -((y - self.y as f32) / h) * 2.0 + 1.0,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Projection mode for a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection.
    Perspective {
        /// Field of view in radians.
        fov: f32,
        /// Aspect ratio (width / height).
        aspect: f32,
        /// Near clipping plane.
        near: f32,
        /// Far clipping plane.
        far: f32,
    },
    /// Orthographic projection.
    Orthographic {
        /// Width of the view.
        width: f32,
        /// Height of the view.
        height: f32,
        /// Near clipping plane.
        near: f32,
        /// Far clipping plane.
        far: f32,
    },
}

impl Projection {
    /// Create a perspective projection.
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::Perspective {
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    /// Create an orthographic projection.
    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        Self::Orthographic {
            width,
            height,
            near,
            far,
        }
    }

    /// Get the projection matrix (depth range 0..1).
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov, aspect, near, far),
            Projection::Orthographic {
                width,
                height,
                near,
                far,
            } => Mat4::orthographic_rh(
                -width / 2.0,
                width / 2.0,
                -height / 2.0,
                height / 2.0,
                near,
                far,
            ),
        }
    }

    /// Update the aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = self {
            *a = aspect;
        }
    }
}

/// Trait for objects that can view a scene.
pub trait Viewer {
    /// Get the camera position.
    fn position(&self) -> Vec3;

    /// Get the view matrix.
    fn view_matrix(&self) -> Mat4;

    /// Get the projection matrix.
    fn projection_matrix(&self) -> Mat4;

    /// Get the combined view-projection matrix.
    fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get the viewport.
    fn viewport(&self) -> Viewport;

    /// Map a point in normalized device coordinates back to world space.
    ///
    /// Returns `None` when the view-projection matrix is singular.
    fn unproject(&self, ndc: Vec3) -> Option<Vec3> {
        let vp = self.view_projection_matrix();
        if vp.determinant().abs() < f32::EPSILON {
            return None;
        }
        let p = vp.inverse() * ndc.extend(1.0);
        if p.w.abs() < f32::EPSILON || !p.is_finite() {
            return None;
        }
        Some(p.xyz() / p.w)
    }
}

/// A 3D camera.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Projection mode.
    pub projection: Projection,
    /// Viewport.
    viewport: Viewport,
}

impl Camera {
    /// Create a new perspective camera.
    pub fn new_perspective(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            target,
            up,
            projection: Projection::perspective(fov_degrees, aspect, near, far),
            viewport: Viewport::default(),
        }
    }

    /// Create a new orthographic camera.
    pub fn new_orthographic(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        width: f32,
        height: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            target,
            up,
            projection: Projection::orthographic(width, height, near, far),
            viewport: Viewport::default(),
        }
    }

    /// Set the viewport and update aspect ratio.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.projection.set_aspect(viewport.aspect());
    }
}

impl Viewer for Camera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_to_ndc_flips_y() {
        let viewport = Viewport::new(800, 600);
        assert_eq!(viewport.pixel_to_ndc(0.0, 0.0), Vec2::new(-1.0, 1.0));
        assert_eq!(viewport.pixel_to_ndc(400.0, 300.0), Vec2::ZERO);
        assert_eq!(viewport.pixel_to_ndc(800.0, 600.0), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_unproject_center_lies_on_view_axis() {
        let camera = Camera::new_perspective(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            Vec3::Y,
            60.0,
            1.0,
            0.1,
            100.0,
        );
        let near = camera.unproject(Vec3::new(0.0, 0.0, 0.0)).unwrap();
        let far = camera.unproject(Vec3::new(0.0, 0.0, 1.0)).unwrap();

        assert!((near - Vec3::new(0.0, 0.0, 4.9)).length() < 1e-3);
        assert!((far - Vec3::new(0.0, 0.0, -95.0)).length() < 1.0);
    }

    #[test]
    fn test_set_viewport_updates_aspect() {
        let mut camera = Camera::new_perspective(Vec3::ONE, Vec3::ZERO, Vec3::Y, 75.0, 1.0, 0.1, 100.0);
        camera.set_viewport(Viewport::new(1600, 800));
        match camera.projection {
            Projection::Perspective { aspect, .. } => assert_eq!(aspect, 2.0),
            Projection::Orthographic { .. } => unreachable!(),
        }
    }
}
