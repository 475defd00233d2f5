//! Camera/viewport configuration entity.
//!
//! # Responsibility
//! - Hold per-view camera and projection properties.
//! - Cache the bounding box used for caller-requested fit.
//!
//! # Invariants
//! - Views have a lifecycle independent of models; several views may show
//!   the same model.
//! - Bounds fitting happens only on explicit request, so scripted replays
//!   stay deterministic with no camera drift.

use crate::model::property::PropertyStore;
use crate::model::value::PropertyValue;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Combines two boxes into their union.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut min = self.min;
        let mut max = self.max;
        for axis in 0..3 {
            min[axis] = min[axis].min(other.min[axis]);
            max[axis] = max[axis].max(other.max[axis]);
        }
        Bounds { min, max }
    }
}

/// A named camera/viewport configuration.
pub struct View {
    name: String,
    pub properties: PropertyStore,
    bounds: Option<Bounds>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: PropertyStore::new(),
            bounds: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Cached bounding box from the last fit request.
    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    pub fn clear_bounds(&mut self) {
        self.bounds = None;
    }

    /// Caller-requested fit: caches `bounds` and mirrors min/max/focus into
    /// the property store so the external renderer picks them up.
    pub fn fit_bounds(&mut self, bounds: Bounds) {
        let center = bounds.center();
        self.properties.set(
            "min",
            PropertyValue::float_array(&[
                f64::from(bounds.min[0]),
                f64::from(bounds.min[1]),
                f64::from(bounds.min[2]),
            ]),
        );
        self.properties.set(
            "max",
            PropertyValue::float_array(&[
                f64::from(bounds.max[0]),
                f64::from(bounds.max[1]),
                f64::from(bounds.max[2]),
            ]),
        );
        self.properties.set(
            "focus",
            PropertyValue::float_array(&[
                f64::from(center[0]),
                f64::from(center[1]),
                f64::from(center[2]),
            ]),
        );
        self.bounds = Some(bounds);
    }
}

#[cfg(test)]
mod tests {
    use super::{Bounds, View};
    use crate::model::value::PropertyValue;

    #[test]
    fn fit_bounds_caches_and_mirrors_to_properties() {
        let mut view = View::new("top");
        view.fit_bounds(Bounds::new([0.0, 0.0, 0.0], [2.0, 4.0, 6.0]));

        let cached = view.bounds().expect("cached bounds");
        assert_eq!(cached.center(), [1.0, 2.0, 3.0]);
        assert_eq!(
            view.properties.get("focus"),
            Some(&PropertyValue::float_array(&[1.0, 2.0, 3.0]))
        );
    }

    #[test]
    fn union_spans_both_boxes() {
        let a = Bounds::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = Bounds::new([-1.0, 0.5, 0.0], [0.5, 2.0, 3.0]);
        let union = a.union(&b);
        assert_eq!(union.min, [-1.0, 0.0, 0.0]);
        assert_eq!(union.max, [1.0, 2.0, 3.0]);
    }
}
