use serde::{Deserialize, Serialize};

const EARTH_RADIUS: f64 = 6378137.0;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    /// Calculates the distance to another LatLng using the Haversine formula
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS * c
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap_lng(lng: f64) -> f64 {
        let wrapped = lng % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }

    /// Returns the same position with its longitude wrapped
    pub fn wrapped(&self) -> Self {
        Self::new(self.lat, Self::wrap_lng(self.lng))
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<geo_types::Coord<f64>> for LatLng {
    fn from(coord: geo_types::Coord<f64>) -> Self {
        // geo-types stores x = longitude, y = latitude
        Self::new(coord.y, coord.x)
    }
}

/// A point in tile, pixel or scene space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(&self) -> Point {
        let len = self.length();
        if len <= f64::EPSILON {
            Point::default()
        } else {
            Point::new(self.x / len, self.y / len)
        }
    }

    /// Left-hand perpendicular (rotated 90° counter-clockwise in a y-down space)
    pub fn perpendicular(&self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn approx_eq(&self, other: &Point, epsilon: f64) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Geographic rectangle in degrees.
///
/// `left`/`right` are longitudes, `top`/`bottom` latitudes, so `top >= bottom` for a
/// well-formed rectangle. `right` may exceed 180 when the rectangle crosses the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl GeoRect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds a rectangle from its top-left corner and its extent in degrees
    pub fn from_origin_size(x1: f64, y1: f64, width: f64, height: f64) -> Self {
        Self::new(x1, y1, x1 + width, y1 - height)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.top + self.bottom) / 2.0,
            (self.left + self.right) / 2.0,
        )
    }

    pub fn contains(&self, point: &LatLng) -> bool {
        point.lng >= self.left
            && point.lng <= self.right
            && point.lat <= self.top
            && point.lat >= self.bottom
    }

    pub fn intersects(&self, other: &GeoRect) -> bool {
        !(other.right < self.left
            || other.left > self.right
            || other.top < self.bottom
            || other.bottom > self.top)
    }

    /// Maps a normalized position (0,0 = top-left, 1,1 = bottom-right) to a coordinate
    pub fn lerp(&self, nx: f64, ny: f64) -> LatLng {
        LatLng::new(
            self.top + (self.bottom - self.top) * ny,
            self.left + self.width() * nx,
        )
    }

    /// Inverse of [`GeoRect::lerp`]. Degenerate rectangles map to 0.
    pub fn normalize(&self, point: &LatLng) -> (f64, f64) {
        let w = self.width();
        let h = self.top - self.bottom;
        let nx = if w.abs() > f64::EPSILON {
            (point.lng - self.left) / w
        } else {
            0.0
        };
        let ny = if h.abs() > f64::EPSILON {
            (self.top - point.lat) / h
        } else {
            0.0
        };
        (nx, ny)
    }

    pub fn approx_eq(&self, other: &GeoRect, epsilon: f64) -> bool {
        (self.left - other.left).abs() <= epsilon
            && (self.top - other.top).abs() <= epsilon
            && (self.right - other.right).abs() <= epsilon
            && (self.bottom - other.bottom).abs() <= epsilon
    }
}
