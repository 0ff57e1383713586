//! Core domain types: points, route segments and journeys.
//!
//! The serialized shape matches what the route function accepts and what the
//! store, queue and broadcast channel carry: `origin`/`endpoint` are GeoJSON
//! Point geometries, segment paths are bare `[lon, lat]` positions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A geographic coordinate (longitude, latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonPoint", into = "GeoJsonPoint")]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Shift this point by the given deltas in degrees.
    pub fn offset(&self, d_lon: f64, d_lat: f64) -> Self {
        Self {
            lon: self.lon + d_lon,
            lat: self.lat + d_lat,
        }
    }

    /// Coordinates in (longitude, latitude) order.
    pub fn coordinates(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

impl TryFrom<GeoJsonPoint> for Point {
    type Error = String;

    fn try_from(value: GeoJsonPoint) -> Result<Self, Self::Error> {
        if value.kind != "Point" {
            return Err(format!("expected geometry type Point, got {}", value.kind));
        }
        let [lon, lat] = value.coordinates;
        if !lon.is_finite() || !lat.is_finite() {
            return Err("point coordinates must be finite".to_string());
        }
        Ok(Point::new(lon, lat))
    }
}

impl From<Point> for GeoJsonPoint {
    fn from(point: Point) -> Self {
        GeoJsonPoint {
            kind: "Point".to_string(),
            coordinates: point.coordinates(),
        }
    }
}

mod positions {
    use super::Point;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(path: &[Point], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(path.iter().map(Point::coordinates))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Point>, D::Error> {
        let raw: Vec<[f64; 2]> = Vec::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|[lon, lat]| Point::new(lon, lat))
            .collect())
    }
}

/// One traveled leg of a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// Leg length in meters, as reported by the routing provider
    #[serde(rename = "distance", deserialize_with = "non_negative")]
    pub distance_meters: f64,
    /// Ordered positions tracing the leg
    #[serde(rename = "route", with = "positions")]
    pub path: Vec<Point>,
}

fn non_negative<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(format!(
            "segment distance must be a non-negative number, got {}",
            value
        )))
    }
}

impl RouteSegment {
    pub fn new(distance_meters: f64, path: Vec<Point>) -> Self {
        Self {
            distance_meters,
            path,
        }
    }

    pub fn start(&self) -> Option<Point> {
        self.path.first().copied()
    }

    pub fn end(&self) -> Option<Point> {
        self.path.last().copied()
    }
}

/// The persisted itinerary of one bottle.
///
/// `segments` only ever grows, and `endpoint` follows the end of the last
/// appended segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    id: String,
    #[serde(rename = "created")]
    created_at: DateTime<Utc>,
    origin: Point,
    endpoint: Point,
    #[serde(rename = "routes")]
    segments: Vec<RouteSegment>,
}

impl Journey {
    /// A fresh journey that has not traveled yet.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, origin: Point) -> Self {
        Self {
            id: id.into(),
            created_at,
            origin,
            endpoint: origin,
            segments: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn endpoint(&self) -> Point {
        self.endpoint
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn last_segment(&self) -> Option<&RouteSegment> {
        self.segments.last()
    }

    /// Produce the next snapshot with `legs` appended and the endpoint moved
    /// to `new_endpoint`. The receiver is left untouched.
    pub fn with_appended(&self, legs: Vec<RouteSegment>, new_endpoint: Point) -> Journey {
        let mut segments = Vec::with_capacity(self.segments.len() + legs.len());
        segments.extend_from_slice(&self.segments);
        segments.extend(legs);
        Journey {
            id: self.id.clone(),
            created_at: self.created_at,
            origin: self.origin,
            endpoint: new_endpoint,
            segments,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
