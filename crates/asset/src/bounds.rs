//! Axis-aligned bounds of primitive control points seen during a load pass.

use corelib::{PrimitiveRecord, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Start with an inverted box of half-size `view_distance`, so any point
    /// inside the view volume replaces both corners.
    pub fn new(view_distance: f32) -> Self {
        Self {
            min: Vec3::splat(view_distance),
            max: Vec3::splat(-view_distance),
        }
    }

    /// Update bounds with a new point.
    pub fn update(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Update bounds with all three control points of a primitive.
    pub fn include_primitive(&mut self, primitive: &PrimitiveRecord) {
        for p in primitive.control_points() {
            self.update(p);
        }
    }

    /// Per-axis size of the box, always non-negative.
    pub fn extent(&self) -> Vec3 {
        (self.max - self.min).abs()
    }

    /// Uniform ratio that brings the box height to `desired_height`.
    ///
    /// `None` when the box is flat along Y.
    pub fn scale_ratio(&self, desired_height: f32) -> Option<f32> {
        let ratio = desired_height / self.extent().y;
        ratio.is_finite().then_some(ratio)
    }
}
