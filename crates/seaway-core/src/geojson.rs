//! Land polygons from GeoJSON text.
//!
//! Accepts a FeatureCollection, a single Feature, or a bare geometry. Only
//! Polygon and MultiPolygon geometries contribute land; other geometry
//! types are skipped. Coordinates arrive as `[lon, lat]`.

use serde_json::Value;
use thiserror::Error;

use crate::land::LandPolygon;

#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error("land file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("land file has no usable geometry: {0}")]
    Geometry(String),
}

/// Extract land polygons from GeoJSON text.
pub fn parse_land_geojson(text: &str) -> Result<Vec<LandPolygon>, GeoJsonError> {
    let root: Value = serde_json::from_str(text)?;
    let mut polygons = Vec::new();
    collect_polygons(&root, &mut polygons)?;
    if polygons.is_empty() {
        return Err(GeoJsonError::Geometry("no Polygon or MultiPolygon found".to_string()));
    }
    Ok(polygons)
}

fn collect_polygons(node: &Value, out: &mut Vec<LandPolygon>) -> Result<(), GeoJsonError> {
    match node.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            let features = node
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| GeoJsonError::Geometry("FeatureCollection without features".to_string()))?;
            for feature in features {
                collect_polygons(feature, out)?;
            }
        }
        Some("Feature") => {
            if let Some(geometry) = node.get("geometry").filter(|g| !g.is_null()) {
                collect_polygons(geometry, out)?;
            }
        }
        Some("GeometryCollection") => {
            if let Some(geometries) = node.get("geometries").and_then(Value::as_array) {
                for geometry in geometries {
                    collect_polygons(geometry, out)?;
                }
            }
        }
        Some("Polygon") => {
            out.push(parse_polygon(coordinates(node)?)?);
        }
        Some("MultiPolygon") => {
            let parts = coordinates(node)?
                .as_array()
                .ok_or_else(|| GeoJsonError::Geometry("MultiPolygon coordinates must be an array".to_string()))?;
            for part in parts {
                out.push(parse_polygon(part)?);
            }
        }
        Some(_) => {}
        None => return Err(GeoJsonError::Geometry("object without a type".to_string())),
    }
    Ok(())
}

fn coordinates(node: &Value) -> Result<&Value, GeoJsonError> {
    node.get("coordinates")
        .ok_or_else(|| GeoJsonError::Geometry("geometry without coordinates".to_string()))
}

fn parse_polygon(rings: &Value) -> Result<LandPolygon, GeoJsonError> {
    let rings = rings
        .as_array()
        .ok_or_else(|| GeoJsonError::Geometry("polygon rings must be an array".to_string()))?;
    let mut rings = rings.iter().map(parse_ring);
    let exterior = rings
        .next()
        .ok_or_else(|| GeoJsonError::Geometry("polygon without exterior ring".to_string()))??;
    let holes = rings.collect::<Result<Vec<_>, _>>()?;
    Ok(LandPolygon { exterior, holes })
}

/// `[[lon, lat], ...]` into `[lat, lon]` vertices.
fn parse_ring(ring: &Value) -> Result<Vec<[f64; 2]>, GeoJsonError> {
    let positions = ring
        .as_array()
        .ok_or_else(|| GeoJsonError::Geometry("ring must be an array".to_string()))?;
    positions
        .iter()
        .map(|position| {
            let pair = position.as_array().filter(|p| p.len() >= 2);
            match pair.map(|p| (p[0].as_f64(), p[1].as_f64())) {
                Some((Some(lon), Some(lat))) => Ok([lat, lon]),
                _ => Err(GeoJsonError::Geometry(format!("bad position {position}"))),
            }
        })
        .collect()
}
