//! Pupil → scene → canvas coordinate mapping with temporal smoothing.

use crate::{
    calibration::CalibrationModel,
    config::{Config, RoiConfig},
    filters::{AxisFilters, OneEuroParams},
};
use log::debug;

/// Anything that maps a pupil position into scene coordinates
pub trait PointMapper {
    /// Map a pupil point, `None` when no mapping is available
    fn map_point(&self, pupil_xy: (f64, f64)) -> Option<(f64, f64)>;
}

impl PointMapper for CalibrationModel {
    fn map_point(&self, pupil_xy: (f64, f64)) -> Option<(f64, f64)> {
        Self::map_point(self, pupil_xy)
    }
}

impl<T: PointMapper + ?Sized> PointMapper for &T {
    fn map_point(&self, pupil_xy: (f64, f64)) -> Option<(f64, f64)> {
        (**self).map_point(pupil_xy)
    }
}

/// Scene-space region mapped onto a physical surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    /// Scene-space origin x
    pub x: f64,
    /// Scene-space origin y
    pub y: f64,
    /// Scene-space width
    pub width: f64,
    /// Scene-space height
    pub height: f64,
    /// Physical width of the region (mm)
    pub physical_width_mm: f64,
    /// Physical height of the region (mm)
    pub physical_height_mm: f64,
}

impl Default for Roi {
    fn default() -> Self {
        Self::from(&RoiConfig::default())
    }
}

impl From<&RoiConfig> for Roi {
    fn from(config: &RoiConfig) -> Self {
        Self {
            x: config.x,
            y: config.y,
            width: config.width,
            height: config.height,
            physical_width_mm: config.physical_width_mm,
            physical_height_mm: config.physical_height_mm,
        }
    }
}

impl Roi {
    /// Map a scene point into physical canvas coordinates
    ///
    /// Points outside the region extrapolate linearly. A zero-area region has
    /// no defined mapping.
    #[must_use]
    pub fn to_canvas(&self, scene: (f64, f64)) -> Option<(f64, f64)> {
        if self.width == 0.0 || self.height == 0.0 {
            return None;
        }
        let norm_x = (scene.0 - self.x) / self.width;
        let norm_y = (scene.1 - self.y) / self.height;
        let canvas = (norm_x * self.physical_width_mm, norm_y * self.physical_height_mm);
        (canvas.0.is_finite() && canvas.1.is_finite()).then_some(canvas)
    }
}

/// Maps pupil positions through a calibration into smoothed scene points
/// and physical canvas coordinates
#[derive(Debug, Clone)]
pub struct GazeMapper<M> {
    mapper: M,
    roi: Roi,
    params: OneEuroParams,
    filters: Option<AxisFilters>,
}

impl<M: PointMapper> GazeMapper<M> {
    /// Create a mapper with the default region and filter parameters
    pub fn new(mapper: M) -> Self {
        Self {
            mapper,
            roi: Roi::default(),
            params: OneEuroParams::default(),
            filters: None,
        }
    }

    /// Create a mapper using the region and filter sections of a configuration
    pub fn from_config(mapper: M, config: &Config) -> Self {
        Self {
            mapper,
            roi: Roi::from(&config.roi),
            params: OneEuroParams::from(&config.filter),
            filters: None,
        }
    }

    /// Replace the filter parameters; filters restart on the next sample
    #[must_use]
    pub fn with_filter_params(mut self, params: OneEuroParams) -> Self {
        self.params = params;
        self.filters = None;
        self
    }

    /// Set the scene region and its physical size
    pub fn set_roi(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        physical_width_mm: f64,
        physical_height_mm: f64,
    ) {
        self.roi = Roi {
            x,
            y,
            width,
            height,
            physical_width_mm,
            physical_height_mm,
        };
    }

    /// Active region of interest
    #[must_use]
    pub const fn roi(&self) -> &Roi {
        &self.roi
    }

    /// Map a pupil position to a smoothed scene position
    ///
    /// The first mapped sample seeds the filters and is returned as-is.
    /// Non-finite mappings yield `None` and leave the filters untouched.
    pub fn map_to_scene(&mut self, pupil: Option<(f64, f64)>, timestamp: f64) -> Option<(f64, f64)> {
        let raw = self.mapper.map_point(pupil?)?;
        if !(raw.0.is_finite() && raw.1.is_finite()) {
            debug!("Dropping non-finite mapped point ({}, {})", raw.0, raw.1);
            return None;
        }

        match &mut self.filters {
            Some(filters) => Some(filters.apply(timestamp, raw)),
            None => {
                self.filters = Some(AxisFilters::seeded(timestamp, raw, self.params));
                Some(raw)
            }
        }
    }

    /// Map a scene position into physical canvas coordinates (mm)
    #[must_use]
    pub fn map_scene_to_canvas(&self, scene: Option<(f64, f64)>) -> Option<(f64, f64)> {
        self.roi.to_canvas(scene?)
    }

    /// Drop filter state; the next sample passes through unfiltered
    pub fn reset_filters(&mut self) {
        self.filters = None;
    }

    /// Whether the filters have been seeded
    #[must_use]
    pub const fn is_filtering(&self) -> bool {
        self.filters.is_some()
    }

    /// Underlying point mapper
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Underlying point mapper, mutably (e.g. to recalibrate)
    pub fn mapper_mut(&mut self) -> &mut M {
        &mut self.mapper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl PointMapper for Identity {
        fn map_point(&self, pupil_xy: (f64, f64)) -> Option<(f64, f64)> {
            Some(pupil_xy)
        }
    }

    #[test]
    fn test_none_passthrough() {
        let mut mapper = GazeMapper::new(Identity);
        assert_eq!(mapper.map_to_scene(None, 0.0), None);
        assert!(!mapper.is_filtering());
        assert_eq!(mapper.map_scene_to_canvas(None), None);
    }

    #[test]
    fn test_first_sample_unfiltered() {
        let mut mapper = GazeMapper::new(Identity);
        assert_eq!(mapper.map_to_scene(Some((100.0, 50.0)), 0.0), Some((100.0, 50.0)));
        assert!(mapper.is_filtering());

        let (x, _) = mapper.map_to_scene(Some((200.0, 50.0)), 1.0 / 30.0).unwrap();
        assert!(x > 100.0 && x < 200.0);

        mapper.reset_filters();
        assert_eq!(mapper.map_to_scene(Some((300.0, 10.0)), 0.1), Some((300.0, 10.0)));
    }

    #[test]
    fn test_non_finite_frame_does_not_poison_filters() {
        let mut mapper = GazeMapper::new(Identity);
        assert_eq!(mapper.map_to_scene(Some((f64::NAN, 10.0)), 0.0), None);
        assert!(!mapper.is_filtering());

        mapper.map_to_scene(Some((100.0, 100.0)), 0.0);
        assert_eq!(mapper.map_to_scene(Some((f64::NAN, f64::NAN)), 1.0 / 30.0), None);
        assert_eq!(mapper.map_to_scene(Some((f64::INFINITY, 100.0)), 2.0 / 30.0), None);

        let mut last = None;
        for i in 3..100 {
            last = mapper.map_to_scene(Some((100.0, 100.0)), f64::from(i) / 30.0);
            let (x, y) = last.unwrap();
            assert!(x.is_finite() && y.is_finite());
        }
        let (x, y) = last.unwrap();
        assert!((x - 100.0).abs() < 1e-9 && (y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_uncalibrated_model_maps_nothing() {
        let model = CalibrationModel::new();
        let mut mapper = GazeMapper::new(&model);
        assert_eq!(mapper.map_to_scene(Some((1.0, 1.0)), 0.0), None);
        assert!(!mapper.is_filtering());
    }

    #[test]
    fn test_scene_to_canvas() {
        let mapper = GazeMapper::new(Identity);
        assert_eq!(mapper.map_scene_to_canvas(Some((320.0, 240.0))), Some((210.0, 148.5)));
        assert_eq!(mapper.map_scene_to_canvas(Some((0.0, 0.0))), Some((0.0, 0.0)));
        // No clamping outside the region
        let (x, _) = mapper.map_scene_to_canvas(Some((-64.0, 0.0))).unwrap();
        assert!((x + 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_area_roi() {
        let mut mapper = GazeMapper::new(Identity);
        mapper.set_roi(10.0, 10.0, 0.0, 100.0, 420.0, 297.0);
        assert_eq!(mapper.map_scene_to_canvas(Some((10.0, 10.0))), None);
    }
}
