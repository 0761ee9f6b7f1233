use geo_types::Coord;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::MapError;
use crate::models::Entity;
use crate::projection::{is_valid_lon_lat, project};

/// A projected point on the map, one per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub id: String,
    pub coord: Coord<f64>, // EPSG:3857 metres
    pub entity: Arc<Entity>,
}

/// Project every entity into a point feature, keeping input order.
///
/// The whole snapshot is rejected if any record has out-of-range coordinates
/// or repeats an id seen earlier; nothing is dropped or deduplicated.
pub fn build_features(entities: &[Entity]) -> Result<Vec<PointFeature>, MapError> {
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(entities.len());
    let mut features = Vec::with_capacity(entities.len());

    for (index, entity) in entities.iter().enumerate() {
        if let Some(&first) = seen.get(entity.id.as_str()) {
            return Err(MapError::DuplicateId {
                id: entity.id.clone(),
                first,
                second: index,
            });
        }
        seen.insert(entity.id.as_str(), index);

        if !is_valid_lon_lat(entity.longitude, entity.latitude) {
            return Err(MapError::InvalidCoordinate {
                id: entity.id.clone(),
                index,
                latitude: entity.latitude,
                longitude: entity.longitude,
            });
        }

        features.push(PointFeature {
            id: entity.id.clone(),
            coord: project(entity.longitude, entity.latitude),
            entity: Arc::new(entity.clone()),
        });
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_feature_per_entity_in_order() {
        let entities = vec![
            Entity::new("123sad", "Emma Maersk", 55.422, 4.414),
            Entity::new("asflkjd", "Boaty McBoatface", 55.6, 4.414),
        ];
        let features = build_features(&entities).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, "123sad");
        assert_eq!(features[1].id, "asflkjd");
        assert_eq!(features[1].entity.name, "Boaty McBoatface");
        assert!(features[1].coord.y > features[0].coord.y);
        assert_eq!(features[0].coord, project(4.414, 55.422));
    }

    #[test]
    fn test_duplicate_id_fails_whole_build() {
        let entities = vec![
            Entity::new("dup1", "a", 10.0, 10.0),
            Entity::new("other", "b", 11.0, 11.0),
            Entity::new("dup1", "c", 12.0, 12.0),
        ];
        let err = build_features(&entities).unwrap_err();
        assert_eq!(
            err,
            MapError::DuplicateId {
                id: "dup1".to_string(),
                first: 0,
                second: 2
            }
        );
    }

    #[test]
    fn test_out_of_range_latitude_rejected() {
        let entities = vec![
            Entity::new("ok", "a", 10.0, 10.0),
            Entity::new("bad", "b", 91.0, 10.0),
        ];
        match build_features(&entities) {
            Err(MapError::InvalidCoordinate { id, index, .. }) => {
                assert_eq!(id, "bad");
                assert_eq!(index, 1);
            }
            other => panic!("expected InvalidCoordinate, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_longitude_rejected() {
        let entities = vec![Entity::new("nan", "a", 0.0, f64::NAN)];
        assert!(matches!(
            build_features(&entities),
            Err(MapError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_empty_input_is_valid() {
        assert!(build_features(&[]).unwrap().is_empty());
    }
}
