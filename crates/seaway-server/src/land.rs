//! Land geometry loaded from a GeoJSON file at startup.

use std::path::Path;
use std::sync::Arc;

use seaway_core::geojson::{parse_land_geojson, GeoJsonError};
use seaway_core::{LandMask, LandPolygon, PolygonLandMask};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LandLoadError {
    #[error("cannot read land file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] GeoJsonError),
}

/// Load the land mask, or `None` (with a warning) when the file is missing
/// or unusable. Routing then runs without land constraints.
pub fn load_land_mask(path: &str, buffer_deg: f64) -> Option<Arc<dyn LandMask>> {
    if !Path::new(path).exists() {
        tracing::warn!(path, "Land GeoJSON not found; routing without land constraints");
        return None;
    }

    match read_land_polygons(path) {
        Ok(polygons) => {
            let mask = PolygonLandMask::new(polygons, buffer_deg);
            tracing::info!(
                path,
                polygons = mask.polygon_count(),
                buffer_deg,
                "Loaded land geometry"
            );
            Some(Arc::new(mask))
        }
        Err(err) => {
            tracing::warn!(path, "Ignoring land GeoJSON: {}", err);
            None
        }
    }
}

fn read_land_polygons(path: &str) -> Result<Vec<LandPolygon>, LandLoadError> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_land_geojson(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_means_no_land() {
        assert!(load_land_mask("/nonexistent/seaway/map.geojson", 0.001).is_none());
    }

    #[test]
    fn land_file_is_loaded_with_buffer() {
        let path = std::env::temp_dir().join(format!("seaway-land-{}.geojson", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"type": "Polygon", "coordinates": [[[131.9, 43.0], [132.0, 43.0], [132.0, 43.1], [131.9, 43.0]]]}}"#
        )
        .unwrap();

        let mask = load_land_mask(path.to_str().unwrap(), 0.001).unwrap();
        assert!(mask.contains(43.01, 131.99));
        // Inside the buffer just south of the bottom edge.
        assert!(mask.contains(42.9995, 131.95));
        assert!(!mask.contains(42.99, 131.95));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn unparsable_file_means_no_land() {
        let path = std::env::temp_dir().join(format!("seaway-land-{}.geojson", uuid::Uuid::new_v4()));
        std::fs::write(&path, "not json").unwrap();
        assert!(load_land_mask(path.to_str().unwrap(), 0.001).is_none());
        std::fs::remove_file(path).ok();
    }
}
