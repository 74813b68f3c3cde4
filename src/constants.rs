//! Constants used throughout the library

/// Default one-euro minimum cutoff frequency (Hz)
pub const DEFAULT_MIN_CUTOFF: f64 = 0.5;

/// Default one-euro speed coefficient
pub const DEFAULT_BETA: f64 = 0.1;

/// Default cutoff for the derivative low-pass (Hz)
pub const DEFAULT_D_CUTOFF: f64 = 1.0;

/// Number of terms in the quadratic basis [1, x, y, xy, x², y²]
pub const POLY_TERMS: usize = 6;

/// Minimum calibration pairs needed to fit the quadratic model
pub const MIN_CALIBRATION_POINTS: usize = 6;

/// Ridge penalty added to the normal-equations diagonal
pub const DEFAULT_RIDGE_LAMBDA: f64 = 0.001;

/// Default drawing surface width (A4 landscape), millimetres
pub const DEFAULT_CANVAS_WIDTH_MM: f64 = 297.0;

/// Default drawing surface height (A4 landscape), millimetres
pub const DEFAULT_CANVAS_HEIGHT_MM: f64 = 210.0;

/// Default scene-space region of interest
pub const DEFAULT_ROI: (f64, f64, f64, f64) = (0.0, 0.0, 640.0, 480.0);

/// Default physical width of the region of interest (A3 landscape), millimetres
pub const DEFAULT_PHYSICAL_WIDTH_MM: f64 = 420.0;

/// Default physical height of the region of interest (A3 landscape), millimetres
pub const DEFAULT_PHYSICAL_HEIGHT_MM: f64 = 297.0;

/// Observation ring capacity for globe fitting
pub const MAX_RAYS: usize = 300;

/// Intersection ring capacity for globe fitting
pub const MAX_INTERSECTIONS: usize = 3000;

/// Number of angular coverage sectors (45° each)
pub const ANGLE_SECTORS: usize = 8;

/// Width of one coverage sector in degrees
pub const SECTOR_WIDTH_DEG: f64 = 45.0;

/// Samples a sector needs before it counts as covered
pub const MIN_SECTOR_SAMPLES: u32 = 3;

/// Minimum detector confidence for an observation to be used
pub const MIN_PUPIL_CONFIDENCE: f64 = 0.65;

/// Minimum ellipse axis length (px)
pub const MIN_AXIS_PX: f64 = 3.0;

/// Maximum minor/major axis ratio; rounder ellipses give unstable orientations
pub const MAX_AXIS_RATIO: f64 = 0.85;

/// Minimum rays before intersections are attempted
pub const MIN_RAYS: usize = 5;

/// Minimum stored intersections before a center is reported
pub const MIN_INTERSECTIONS: usize = 5;

/// Rays required before an auto-fit can report ready
pub const READY_MIN_RAYS: usize = 50;

/// Angular coverage (%) required before an auto-fit can report ready
pub const READY_MIN_COVERAGE: f64 = 60.0;

/// Determinant magnitude below which two rays count as parallel
pub const PARALLEL_EPSILON: f64 = 1e-6;

/// Margin around the eye frame inside which intersections are kept (px)
pub const INTERSECTION_MARGIN_PX: f64 = 500.0;

/// Minimum orientation difference between paired rays (degrees)
pub const DEFAULT_MIN_ANGLE_DIFF: f64 = 10.0;

/// MAD multiples beyond which an intersection is an outlier
pub const DEFAULT_MAD_THRESHOLD: f64 = 2.0;

/// Floor applied to a zero MAD
pub const MAD_FLOOR: f64 = 1e-6;

/// Fewest MAD survivors accepted before falling back to the full set
pub const MIN_MAD_SURVIVORS: usize = 3;

/// Default eye camera frame width used when fitting the globe (px)
pub const DEFAULT_EYE_FRAME_WIDTH: f64 = 640.0;

/// Default eye camera frame height used when fitting the globe (px)
pub const DEFAULT_EYE_FRAME_HEIGHT: f64 = 480.0;

/// Smallest plausible globe radius, exclusive (px)
pub const MIN_GLOBE_RADIUS_PX: f64 = 30.0;

/// Largest plausible globe radius, exclusive (px)
pub const MAX_GLOBE_RADIUS_PX: f64 = 2000.0;

/// Radius above which a fitted globe is suspicious (px)
pub const OVERSIZED_GLOBE_RADIUS_PX: f64 = 400.0;

/// Auto-fit stops after this much sample time even when not ready (s)
pub const AUTO_FIT_TIMEOUT_SECS: f64 = 7.0;

/// Pupil samples averaged per calibration target
pub const CALIBRATION_SAMPLES_PER_POINT: usize = 10;

/// Normalized positions of the canonical calibration targets along each axis
pub const CALIBRATION_TARGET_FRACTIONS: [f64; 3] = [0.1, 0.5, 0.9];

/// Heatmap physical cell size (mm)
pub const DEFAULT_HEATMAP_RESOLUTION_MM: f64 = 1.0;

/// Fewest pixel-proxy columns
pub const PROXY_MIN_COLS: usize = 32;

/// Most pixel-proxy columns
pub const PROXY_MAX_COLS: usize = 128;

/// Fewest pixel-proxy rows
pub const PROXY_MIN_ROWS: usize = 24;

/// Most pixel-proxy rows
pub const PROXY_MAX_ROWS: usize = 96;

/// Frame pixels per pixel-proxy cell before clamping
pub const PROXY_CELL_PX: u32 = 20;

/// Display width that blur sizes are expressed against
pub const BLUR_REFERENCE_WIDTH: f64 = 1280.0;

/// Blur diameter to sigma ratio (diameter ≈ 6σ)
pub const BLUR_DIAMETER_PER_SIGMA: f64 = 6.0;

/// Sigma at or below which no blur is applied
pub const MIN_BLUR_SIGMA: f64 = 0.1;

/// Default overlay blur diameter (reference display px)
pub const DEFAULT_BLUR_SIZE: f64 = 31.0;

/// Default overlay opacity
pub const DEFAULT_OVERLAY_ALPHA: f64 = 0.6;
