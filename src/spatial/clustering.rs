use crate::prelude::HashMap;
use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point},
        viewport::Viewport,
    },
    spatial::index::{SpatialIndex, SpatialItem},
    Result,
};
use serde::{Deserialize, Serialize};

/// Represents a cluster of markers
#[derive(Debug, Clone)]
pub struct Cluster<T> {
    /// Unique identifier for the cluster
    pub id: String,
    /// Mean position of the clustered items
    pub center: LatLng,
    /// Geographic bounds of the cluster
    pub bounds: LatLngBounds,
    /// Items in this cluster
    pub items: Vec<SpatialItem<T>>,
    /// Zoom level at which this cluster was created
    pub zoom_level: f64,
}

impl<T> Cluster<T> {
    pub fn new(id: String, items: Vec<SpatialItem<T>>, zoom_level: f64) -> Self {
        let (center, bounds) = Self::calculate_extent(&items);
        Self {
            id,
            center,
            bounds,
            items,
            zoom_level,
        }
    }

    fn calculate_extent(items: &[SpatialItem<T>]) -> (LatLng, LatLngBounds) {
        let Some(first) = items.first() else {
            let origin = LatLng::default();
            return (origin, LatLngBounds::new(origin, origin));
        };

        let first = first.lat_lng();
        let mut bounds = LatLngBounds::new(first, first);
        let (mut lat_sum, mut lng_sum) = (0.0, 0.0);
        for item in items {
            let position = item.lat_lng();
            bounds.extend(&position);
            lat_sum += position.lat;
            lng_sum += position.lng;
        }
        let n = items.len() as f64;
        (LatLng::new(lat_sum / n, lng_sum / n), bounds)
    }

    /// Get the number of items in the cluster
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Check if this is a single-item cluster
    pub fn is_single(&self) -> bool {
        self.items.len() == 1
    }
}

/// Configuration for clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Side of the grid cell markers are bucketed into, in screen pixels
    pub max_cluster_radius: f64,
    /// From this zoom on every marker is drawn on its own
    pub disable_clustering_at_zoom: f64,
    /// Maximum number of items in a single cluster
    pub max_cluster_size: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_cluster_radius: 80.0,
            disable_clustering_at_zoom: 18.0,
            max_cluster_size: 100,
        }
    }
}

/// Grid-based marker clustering over an R-tree
pub struct Clustering<T> {
    config: ClusteringConfig,
    spatial_index: SpatialIndex<T>,
    /// Clusters computed for `last_view`
    cached: Vec<Cluster<T>>,
    last_view: Option<(LatLngBounds, f64)>,
}

impl<T: Clone> Clustering<T> {
    pub fn new(config: ClusteringConfig) -> Self {
        Self {
            config,
            spatial_index: SpatialIndex::new(),
            cached: Vec::new(),
            last_view: None,
        }
    }

    pub fn add_item(&mut self, item: SpatialItem<T>) -> Result<()> {
        self.spatial_index.insert(item)?;
        self.invalidate_cache();
        Ok(())
    }

    /// Replace the indexed items wholesale
    pub fn rebuild(&mut self, items: Vec<SpatialItem<T>>) {
        self.spatial_index = SpatialIndex::bulk_load(items);
        self.invalidate_cache();
    }

    pub fn clear(&mut self) {
        self.spatial_index.clear();
        self.invalidate_cache();
    }

    fn invalidate_cache(&mut self) {
        self.cached.clear();
        self.last_view = None;
    }

    /// Clusters for everything inside the viewport
    pub fn get_clusters(&mut self, viewport: &Viewport) -> Vec<Cluster<T>> {
        let view_bounds = viewport.bounds();
        let zoom = viewport.zoom;

        if let Some((ref bounds, last_zoom)) = self.last_view {
            if *bounds == view_bounds && (last_zoom - zoom).abs() < 0.01 {
                return self.cached.clone();
            }
        }

        let items: Vec<SpatialItem<T>> = self
            .spatial_index
            .query_lat_lng(&view_bounds)
            .into_iter()
            .cloned()
            .collect();

        let clusters = if zoom >= self.config.disable_clustering_at_zoom {
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| Cluster::new(format!("single_{}", i), vec![item], zoom))
                .collect()
        } else {
            self.grid_cluster(items, viewport)
        };

        self.cached = clusters.clone();
        self.last_view = Some((view_bounds, zoom));
        clusters
    }

    fn grid_cluster(&self, items: Vec<SpatialItem<T>>, viewport: &Viewport) -> Vec<Cluster<T>> {
        let cell = self.config.max_cluster_radius.max(1.0);
        let mut grid: HashMap<(i64, i64), Vec<SpatialItem<T>>> = HashMap::default();

        for item in items {
            let pixel: Point = viewport.project(&item.lat_lng(), None);
            let key = ((pixel.x / cell).floor() as i64, (pixel.y / cell).floor() as i64);
            grid.entry(key).or_default().push(item);
        }

        // Stable output order regardless of hash iteration
        let mut cells: Vec<_> = grid.into_iter().collect();
        cells.sort_by_key(|((x, y), _)| (*y, *x));

        let chunk_size = self.config.max_cluster_size.max(1);
        let mut clusters = Vec::with_capacity(cells.len());
        for ((grid_x, grid_y), cell_items) in cells {
            if cell_items.len() <= chunk_size {
                let id = format!("cluster_{}_{}", grid_x, grid_y);
                clusters.push(Cluster::new(id, cell_items, viewport.zoom));
            } else {
                for (i, chunk) in cell_items.chunks(chunk_size).enumerate() {
                    let id = format!("cluster_{}_{}__{}", grid_x, grid_y, i);
                    clusters.push(Cluster::new(id, chunk.to_vec(), viewport.zoom));
                }
            }
        }
        clusters
    }

    pub fn len(&self) -> usize {
        self.spatial_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spatial_index.is_empty()
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }
}

impl<T: Clone> Default for Clustering<T> {
    fn default() -> Self {
        Self::new(ClusteringConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, lat: f64, lng: f64) -> SpatialItem<usize> {
        SpatialItem::from_lat_lng(id.to_string(), LatLng::new(lat, lng), 0)
    }

    fn viewport(zoom: f64) -> Viewport {
        Viewport::new(LatLng::new(49.8, 15.5), zoom, Point::new(800.0, 600.0))
    }

    #[test]
    fn test_nearby_markers_collapse_at_low_zoom() {
        let mut clustering = Clustering::default();
        clustering.add_item(item("a", 49.800, 15.500)).unwrap();
        clustering.add_item(item("b", 49.801, 15.501)).unwrap();

        let clusters = clustering.get_clusters(&viewport(8.0));
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count(), 2);
        assert!((clusters[0].center.lat - 49.8005).abs() < 1e-9);
    }

    #[test]
    fn test_clustering_disabled_at_high_zoom() {
        let mut clustering = Clustering::default();
        clustering.add_item(item("a", 49.800, 15.500)).unwrap();
        clustering.add_item(item("b", 49.8001, 15.5001)).unwrap();

        let clusters = clustering.get_clusters(&viewport(18.0));
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.is_single()));
    }

    #[test]
    fn test_items_outside_view_are_ignored() {
        let mut clustering = Clustering::default();
        clustering.add_item(item("inside", 49.8, 15.5)).unwrap();
        clustering.add_item(item("far", 10.0, 100.0)).unwrap();

        let clusters = clustering.get_clusters(&viewport(8.0));
        let total: usize = clusters.iter().map(|c| c.count()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_rebuild_replaces_items() {
        let mut clustering = Clustering::default();
        clustering.add_item(item("a", 49.8, 15.5)).unwrap();
        assert_eq!(clustering.get_clusters(&viewport(8.0)).len(), 1);

        clustering.rebuild(Vec::new());
        assert!(clustering.is_empty());
        assert!(clustering.get_clusters(&viewport(8.0)).is_empty());
    }

    #[test]
    fn test_oversized_cells_are_split() {
        let mut clustering = Clustering::new(ClusteringConfig {
            max_cluster_size: 2,
            ..ClusteringConfig::default()
        });
        for i in 0..5 {
            clustering
                .add_item(item(&format!("m{}", i), 49.8, 15.5 + i as f64 * 1e-5))
                .unwrap();
        }
        let clusters = clustering.get_clusters(&viewport(8.0));
        assert_eq!(clusters.len(), 3);
    }
}
