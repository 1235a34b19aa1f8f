use crate::{
    core::{
        bounds::Bounds,
        geo::{LatLng, LatLngBounds, Point},
    },
    MapError, Result,
};

use rstar::{RTree, RTreeObject, AABB};

/// A spatial item that can be indexed via an R-tree
///
/// Geographic items are stored with `x = lng` and `y = lat`.
#[derive(Debug, Clone)]
pub struct SpatialItem<T> {
    pub id: String,
    pub bounds: Bounds,
    pub data: T,
}

impl<T> SpatialItem<T> {
    pub fn new(id: String, bounds: Bounds, data: T) -> Self {
        Self { id, bounds, data }
    }

    pub fn from_point(id: String, point: Point, data: T) -> Self {
        let bounds = Bounds::new(point, point);
        Self::new(id, bounds, data)
    }

    pub fn from_lat_lng(id: String, lat_lng: LatLng, data: T) -> Self {
        let point = Point::new(lat_lng.lng, lat_lng.lat);
        Self::from_point(id, point, data)
    }

    /// Center of the item as a geographic coordinate
    pub fn lat_lng(&self) -> LatLng {
        let center = self.bounds.center();
        LatLng::new(center.y, center.x)
    }
}

impl<T> PartialEq for SpatialItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for SpatialItem<T> {}

// --- rstar integration -------------------------------------------------------------------------

impl<T> RTreeObject for SpatialItem<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min.x, self.bounds.min.y],
            [self.bounds.max.x, self.bounds.max.y],
        )
    }
}

/// R-tree over the marker positions
pub struct SpatialIndex<T> {
    rtree: RTree<SpatialItem<T>>,
}

impl<T: Clone> SpatialIndex<T> {
    pub fn new() -> Self {
        Self { rtree: RTree::new() }
    }

    /// Builds the index in one pass; faster than repeated inserts
    pub fn bulk_load(items: Vec<SpatialItem<T>>) -> Self {
        Self {
            rtree: RTree::bulk_load(items),
        }
    }

    pub fn insert(&mut self, item: SpatialItem<T>) -> Result<()> {
        if !item.bounds.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "item '{}' has no finite position",
                item.id
            )));
        }
        self.rtree.insert(item);
        Ok(())
    }

    pub fn query(&self, bounds: &Bounds) -> Vec<&SpatialItem<T>> {
        let envelope = AABB::from_corners(
            [bounds.min.x, bounds.min.y],
            [bounds.max.x, bounds.max.y],
        );
        self.rtree.locate_in_envelope_intersecting(&envelope).collect()
    }

    /// Items inside a geographic rectangle
    pub fn query_lat_lng(&self, bounds: &LatLngBounds) -> Vec<&SpatialItem<T>> {
        self.query(&Bounds::from_coords(
            bounds.south_west.lng,
            bounds.south_west.lat,
            bounds.north_east.lng,
            bounds.north_east.lat,
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn clear(&mut self) {
        self.rtree = RTree::new();
    }
}

impl<T: Clone> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, lat: f64, lng: f64) -> SpatialItem<()> {
        SpatialItem::from_lat_lng(id.to_string(), LatLng::new(lat, lng), ())
    }

    #[test]
    fn test_query_lat_lng() {
        let mut index = SpatialIndex::new();
        index.insert(item("prague", 50.08, 14.42)).unwrap();
        index.insert(item("brno", 49.19, 16.61)).unwrap();

        let bohemia = LatLngBounds::from_coords(49.5, 12.0, 51.0, 15.0);
        let found = index.query_lat_lng(&bohemia);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "prague");
        assert_eq!(found[0].lat_lng(), LatLng::new(50.08, 14.42));
    }

    #[test]
    fn test_bulk_load_and_clear() {
        let mut index = SpatialIndex::bulk_load(vec![item("a", 1.0, 1.0), item("b", 5.0, 5.0)]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.query(&Bounds::from_coords(0.0, 0.0, 2.0, 2.0)).len(), 1);

        index.clear();
        assert!(index.is_empty());
    }

    #[test]
    fn test_rejects_non_finite_position() {
        let mut index = SpatialIndex::new();
        assert!(index.insert(item("nan", f64::NAN, 15.0)).is_err());
        assert!(index.is_empty());
    }
}
