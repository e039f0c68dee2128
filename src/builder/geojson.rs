// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;

use super::model::{RawCollection, RawFeature, RawGeometry, Road};
use super::Error;
use crate::Coord;

/// Roads read from a GeoJSON `FeatureCollection`.
#[derive(Debug, Default)]
pub(super) struct Collection {
    pub roads: Vec<Road>,

    /// Number of features in the input, including skipped ones.
    pub total: usize,
}

pub(super) fn from_io<R: io::Read>(reader: R) -> Result<Collection, Error> {
    let raw: RawCollection = serde_json::from_reader(reader)?;
    convert(raw)
}

pub(super) fn from_slice(data: &[u8]) -> Result<Collection, Error> {
    let raw: RawCollection = serde_json::from_slice(data)?;
    convert(raw)
}

fn convert(raw: RawCollection) -> Result<Collection, Error> {
    if raw.kind != "FeatureCollection" {
        return Err(Error::NotAFeatureCollection(raw.kind));
    }

    let total = raw.features.len();
    let roads = raw
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match road_from_value(index, value) {
            Ok(road) => Some(road),
            Err(reason) => {
                log::warn!("skipping feature {}: {}", index, reason);
                None
            }
        })
        .collect();

    Ok(Collection { roads, total })
}

fn road_from_value(index: usize, value: serde_json::Value) -> Result<Road, String> {
    let feature: RawFeature = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let geometry = feature.geometry.ok_or("missing geometry")?;
    let coords = line_coordinates(geometry)?;

    Ok(Road {
        index,
        coords,
        props: feature.properties.unwrap_or_default().into(),
    })
}

fn line_coordinates(geometry: RawGeometry) -> Result<Vec<Coord>, String> {
    if geometry.kind != "LineString" {
        return Err(format!("unsupported geometry type {:?}", geometry.kind));
    }

    let positions: Vec<Vec<f64>> = geometry
        .coordinates
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| e.to_string())?
        .ok_or("missing coordinates")?;

    if positions.len() < 2 {
        return Err(format!("line has {} vertices, at least 2 are required", positions.len()));
    }

    positions
        .into_iter()
        .map(|p| match p.as_slice() {
            [lng, lat, ..] if lng.is_finite() && lat.is_finite() => Ok([*lng, *lat]),
            _ => Err(format!("invalid position {:?}", p)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::model::RoadType;
    use super::*;

    #[test]
    fn malformed_features_are_skipped() {
        let data = br#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"roadType": "freeway", "rightLanes": 2},
                 "geometry": {"type": "LineString", "coordinates": [[1.0, 2.0, 30.0], [1.5, 2.5]]}},
                {"type": "Feature", "properties": {}, "geometry": null},
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[1.0, 2.0]]}},
                {"type": "Feature", "properties": {"leftLanes": "many"},
                 "geometry": {"type": "LineString", "coordinates": [[1.0, 2.0], [1.5, 2.5]]}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[1.0, 2.0], [3.0]]}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[3.0, 4.0], [3.5, 4.5]]}}
            ]
        }"#;

        let c = from_slice(data).unwrap();
        assert_eq!(c.total, 7);
        assert_eq!(c.roads.len(), 3);

        assert_eq!(c.roads[0].index, 0);
        assert_eq!(c.roads[0].coords, vec![[1.0, 2.0], [1.5, 2.5]]);
        assert_eq!(c.roads[0].props.road_type, RoadType::Freeway);
        assert_eq!(c.roads[0].props.right_lanes, Some(2));

        // Unreadable lane counts don't drop the road
        assert_eq!(c.roads[1].index, 4);
        assert_eq!(c.roads[1].props.left_lanes, None);

        assert_eq!(c.roads[2].index, 6);
        assert_eq!(c.roads[2].props.road_type, RoadType::Local);
        assert!(!c.roads[2].props.has_type);
    }

    #[test]
    fn rejects_other_documents() {
        let err = from_slice(br#"{"type": "Feature", "features": []}"#).unwrap_err();
        assert!(matches!(err, Error::NotAFeatureCollection(kind) if kind == "Feature"));

        let err = from_io(&b"not json"[..]).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
