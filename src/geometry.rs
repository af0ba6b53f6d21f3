//! Point-radius containment tests against warning-area geometries.
//!
//! Coordinates are projected onto a local equirectangular plane centered on
//! the query point, which is accurate enough for radii up to a few hundred
//! kilometers. Only the outer ring of a polygon is used; holes are ignored.

use serde_json::Value;
use tracing::debug;

use crate::error::GeometryError;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Projects `(lon, lat)` to meters east/north of `origin`.
pub fn project(point: LonLat, origin: LonLat) -> (f64, f64) {
    let x = (point.lon - origin.lon).to_radians() * origin.lat.to_radians().cos() * EARTH_RADIUS_M;
    let y = (point.lat - origin.lat).to_radians() * EARTH_RADIUS_M;
    (x, y)
}

/// Ray-casting containment of `point` in the ring.
pub fn point_in_polygon(point: LonLat, outer_ring: &[LonLat], origin: LonLat) -> bool {
    if outer_ring.len() < 3 {
        return false;
    }

    let (px, py) = project(point, origin);
    let projected: Vec<(f64, f64)> = outer_ring.iter().map(|p| project(*p, origin)).collect();

    let mut inside = false;
    let mut j = projected.len() - 1;
    for i in 0..projected.len() {
        let (xi, yi) = projected[i];
        let (xj, yj) = projected[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance in meters from `p` to the segment `a`-`b`, all in projected meters.
pub fn distance_point_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (p.0 - a.0).hypot(p.1 - a.1);
    }

    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    let cx = a.0 + t * dx;
    let cy = a.1 + t * dy;
    (p.0 - cx).hypot(p.1 - cy)
}

/// True if `center` is inside the outer ring or within `radius_m` of its edge.
pub fn polygon_within_radius(center: LonLat, radius_m: f64, rings: &[Vec<LonLat>]) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    if outer.is_empty() {
        return false;
    }
    if point_in_polygon(center, outer, center) {
        return true;
    }

    let projected: Vec<(f64, f64)> = outer.iter().map(|p| project(*p, center)).collect();
    let n = projected.len();
    (0..n).any(|i| {
        let a = projected[i];
        let b = projected[(i + 1) % n];
        distance_point_to_segment((0.0, 0.0), a, b) <= radius_m
    })
}

/// True if any segment of the line passes within `radius_m` of `center`.
pub fn linestring_within_radius(center: LonLat, radius_m: f64, line: &[LonLat]) -> bool {
    if line.len() < 2 {
        return false;
    }
    let projected: Vec<(f64, f64)> = line.iter().map(|p| project(*p, center)).collect();
    projected
        .windows(2)
        .any(|w| distance_point_to_segment((0.0, 0.0), w[0], w[1]) <= radius_m)
}

/// Evaluates a GeoJSON container against the circle. Anything malformed or
/// unsupported fails closed.
pub fn geometry_matches(container: &Value, center: LonLat, radius_m: f64) -> bool {
    match try_geometry_matches(container, center, radius_m) {
        Ok(matched) => matched,
        Err(e) => {
            debug!(error = %e, "Geometry not evaluable, treating as no match");
            false
        }
    }
}

fn try_geometry_matches(container: &Value, center: LonLat, radius_m: f64) -> Result<bool, GeometryError> {
    let kind = container
        .get("type")
        .and_then(Value::as_str)
        .ok_or(GeometryError::MissingType)?;

    match kind {
        "Feature" => {
            let geometry = container
                .get("geometry")
                .filter(|g| !g.is_null())
                .ok_or(GeometryError::MissingType)?;
            try_geometry_matches(geometry, center, radius_m)
        }
        "FeatureCollection" => {
            let features = container
                .get("features")
                .and_then(Value::as_array)
                .ok_or(GeometryError::MalformedCoordinates("FeatureCollection"))?;
            Ok(features
                .iter()
                .any(|feature| geometry_matches(feature, center, radius_m)))
        }
        "Polygon" => {
            let rings = parse_polygon(coordinates(container, "Polygon")?)?;
            Ok(polygon_within_radius(center, radius_m, &rings))
        }
        "MultiPolygon" => {
            let polygons = as_array(coordinates(container, "MultiPolygon")?, "MultiPolygon")?;
            Ok(any_valid_part(polygons, |polygon| {
                parse_polygon(polygon).map(|rings| polygon_within_radius(center, radius_m, &rings))
            }))
        }
        "LineString" => {
            let line = parse_positions(coordinates(container, "LineString")?, "LineString")?;
            Ok(linestring_within_radius(center, radius_m, &line))
        }
        "MultiLineString" => {
            let lines = as_array(coordinates(container, "MultiLineString")?, "MultiLineString")?;
            Ok(any_valid_part(lines, |line| {
                parse_positions(line, "MultiLineString")
                    .map(|line| linestring_within_radius(center, radius_m, &line))
            }))
        }
        other => Err(GeometryError::UnsupportedType(other.to_string())),
    }
}

/// Evaluates every part of a multi-geometry. Malformed parts are skipped the
/// same way malformed features of a collection are, so part order never
/// changes the result.
fn any_valid_part<F>(parts: &[Value], mut matches: F) -> bool
where
    F: FnMut(&Value) -> Result<bool, GeometryError>,
{
    let mut matched = false;
    for part in parts {
        match matches(part) {
            Ok(hit) => matched |= hit,
            Err(e) => debug!(error = %e, "Skipping malformed geometry part"),
        }
    }
    matched
}

fn coordinates<'a>(geometry: &'a Value, kind: &'static str) -> Result<&'a Value, GeometryError> {
    geometry
        .get("coordinates")
        .ok_or(GeometryError::MalformedCoordinates(kind))
}

fn as_array<'a>(value: &'a Value, kind: &'static str) -> Result<&'a Vec<Value>, GeometryError> {
    value
        .as_array()
        .ok_or(GeometryError::MalformedCoordinates(kind))
}

fn parse_polygon(value: &Value) -> Result<Vec<Vec<LonLat>>, GeometryError> {
    as_array(value, "Polygon")?
        .iter()
        .map(|ring| parse_positions(ring, "Polygon"))
        .collect()
}

fn parse_positions(value: &Value, kind: &'static str) -> Result<Vec<LonLat>, GeometryError> {
    as_array(value, kind)?
        .iter()
        .map(|position| parse_position(position, kind))
        .collect()
}

fn parse_position(value: &Value, kind: &'static str) -> Result<LonLat, GeometryError> {
    let pair = as_array(value, kind)?;
    match (
        pair.first().and_then(Value::as_f64),
        pair.get(1).and_then(Value::as_f64),
    ) {
        (Some(lon), Some(lat)) => Ok(LonLat::new(lon, lat)),
        _ => Err(GeometryError::MalformedCoordinates(kind)),
    }
}
