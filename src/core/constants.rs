//! Site-wide defaults for the location map.
//! Keeping them in a single place makes it easier to tweak the magic numbers.

use crate::core::geo::LatLng;

/// Initial map center, roughly the middle of Czechia.
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 49.8,
    lng: 15.5,
};

/// Initial zoom showing the whole country.
pub const DEFAULT_ZOOM: f64 = 8.0;

/// Street-level zoom used when focusing a single location.
pub const CLOSE_ZOOM: f64 = 14.0;

/// Zoom range served by the base tile layers.
pub const TILE_MIN_ZOOM: u8 = 3;
pub const TILE_MAX_ZOOM: u8 = 19;

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Opacity applied to semi-transparent thematic overlays.
pub const OVERLAY_OPACITY: f32 = 0.8;

/// Scale control maximum bar width in pixels.
pub const SCALE_MAX_WIDTH: f64 = 200.0;

/// Locate control: zoom used on the first position fix.
pub const LOCATE_MAX_ZOOM: f64 = 14.0;
/// Locate control: accepted age of a cached position (ms).
pub const LOCATE_MAXIMUM_AGE_MS: u64 = 10_000;
/// Locate control: give up waiting for a fix after this long (ms).
pub const LOCATE_TIMEOUT_MS: u64 = 15_000;

/// How long a toast notification stays visible.
pub const TOAST_TIMEOUT_MS: u64 = 2_000;

/// Label of the button that clears a tag filter selection.
pub const FILTER_CLEAR_TEXT: &str = "Reset";

/// Endpoint serving photo galleries of Czech mine works.
pub const GEOFOND_PHOTOS_ENDPOINT: &str = "/api/geofond_photos";

/// Path prefix of a location detail page.
pub const LOCATION_DETAIL_PATH: &str = "/location";

/// Default container size used before the host layout reports one.
pub const DEFAULT_CONTAINER_SIZE: (f64, f64) = (800.0, 600.0);
