use crate::error::EmptyInputError;
use crate::types::ParsedGeometry;
use geo::{Centroid, Point};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Where a map opens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

/// Area-weighted centroid of one zone; holes pull the result away from
/// themselves. Falls back to geo's lower-dimensional centroid for zero-area
/// rings.
pub fn centroid(geometry: &ParsedGeometry) -> Option<Point<f64>> {
    match geometry {
        ParsedGeometry::Polygon(polygon) => polygon.centroid(),
        ParsedGeometry::MultiPolygon(multi) => multi.centroid(),
    }
}

/// Mean of the per-zone centroids.
pub fn center<'a, I>(geometries: I) -> Result<LatLng, EmptyInputError>
where
    I: IntoIterator<Item = &'a ParsedGeometry>,
{
    let (count, sum_x, sum_y) = geometries
        .into_iter()
        .filter_map(centroid)
        .fold((0usize, 0.0, 0.0), |(n, x, y), point| {
            (n + 1, x + point.x(), y + point.y())
        });
    if count == 0 {
        return Err(EmptyInputError);
    }
    Ok(LatLng {
        lat: sum_y / count as f64,
        lng: sum_x / count as f64,
    })
}
