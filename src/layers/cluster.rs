use crate::{
    core::{
        geo::{LatLng, LatLngBounds},
        viewport::Viewport,
    },
    layers::{
        base::{LayerProperties, LayerTrait, LayerType},
        marker::Marker,
    },
    rendering::context::RenderContext,
    spatial::{
        clustering::{Cluster, Clustering, ClusteringConfig},
        index::SpatialItem,
    },
    ui::filter::FilterBar,
    Result,
};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_COLLECTION: AtomicU64 = AtomicU64::new(1);

/// Clustered marker overlay
///
/// Every instance gets a process-unique layer id (`markers-<n>`), so a caller
/// holding the id of a replaced collection can tell it is gone.
pub struct MarkerCollection {
    properties: LayerProperties,
    markers: Vec<Marker>,
    clustering: Clustering<usize>,
    /// Markers changed since the index was last built
    dirty: bool,
}

impl MarkerCollection {
    pub fn new() -> Self {
        Self::with_config(ClusteringConfig::default())
    }

    pub fn with_config(config: ClusteringConfig) -> Self {
        let n = NEXT_COLLECTION.fetch_add(1, Ordering::Relaxed);
        let properties = LayerProperties::new(
            format!("markers-{}", n),
            "Markers".to_string(),
            LayerType::MarkerCluster,
        )
        .with_z_index(100);
        Self {
            properties,
            markers: Vec::new(),
            clustering: Clustering::new(config),
            dirty: false,
        }
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
        self.dirty = true;
    }

    pub fn extend(&mut self, markers: impl IntoIterator<Item = Marker>) {
        self.markers.extend(markers);
        self.dirty = true;
    }

    pub fn remove_marker(&mut self, id: &str) -> Option<Marker> {
        let pos = self.markers.iter().position(|m| m.id() == id)?;
        self.dirty = true;
        Some(self.markers.remove(pos))
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get_marker(&self, id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id() == id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn visible_markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(|m| m.is_visible())
    }

    /// Show exactly the markers the filters let through
    pub fn apply_filter(&mut self, filters: &FilterBar) -> usize {
        let mut shown = 0;
        for marker in &mut self.markers {
            let visible = filters.matches(marker.tags());
            marker.set_visible(visible);
            if visible {
                shown += 1;
            }
        }
        self.dirty = true;
        log::debug!("{}: {} of {} markers pass filters", self.id(), shown, self.markers.len());
        shown
    }

    fn rebuild_index(&mut self) {
        if !self.dirty {
            return;
        }
        let items = self
            .markers
            .iter()
            .enumerate()
            // Unplaceable markers stay in the collection but out of the index
            .filter(|(_, m)| m.is_visible() && m.position().is_valid())
            .map(|(i, m)| SpatialItem::from_lat_lng(m.id().to_string(), m.position(), i))
            .collect();
        self.clustering.rebuild(items);
        self.dirty = false;
    }

    /// Clusters of visible markers in the current view
    pub fn clusters(&mut self, viewport: &Viewport) -> Vec<Cluster<usize>> {
        self.rebuild_index();
        self.clustering.get_clusters(viewport)
    }
}

impl Default for MarkerCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTrait for MarkerCollection {
    crate::impl_layer_trait!(MarkerCollection, properties);

    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        if !self.is_visible() {
            return Ok(());
        }
        for cluster in self.clusters(viewport) {
            if cluster.is_single() {
                let index = cluster.items[0].data;
                if let Some(marker) = self.markers.get_mut(index) {
                    marker.render(context, viewport)?;
                }
            } else {
                let position = viewport.lat_lng_to_pixel(&cluster.center);
                context.render_cluster(position, cluster.count());
            }
        }
        Ok(())
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        let mut positions = self.markers.iter().map(|m| m.position());
        let first: LatLng = positions.next()?;
        let mut bounds = LatLngBounds::new(first, first);
        for p in positions {
            bounds.extend(&p);
        }
        Some(bounds)
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "markers": self.markers.len(),
            "visible": self.visible_markers().count(),
            "max_cluster_radius": self.clustering.config().max_cluster_radius,
            "disable_clustering_at_zoom": self.clustering.config().disable_clustering_at_zoom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::geo::Point,
        layers::marker::MarkerTags,
        rendering::context::DrawCommand,
        ui::filter::TagAttribute,
    };

    fn marker(id: &str, lat: f64, lng: f64, kind: &str) -> Marker {
        Marker::new(id, LatLng::new(lat, lng), id).with_tags(MarkerTags::new(kind, "open", "easy"))
    }

    #[test]
    fn test_ids_are_unique() {
        let a = MarkerCollection::new();
        let b = MarkerCollection::new();
        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("markers-"));
    }

    #[test]
    fn test_filter_hides_markers() {
        let mut collection = MarkerCollection::new();
        collection.add_marker(marker("a", 49.8, 15.5, "cave"));
        collection.add_marker(marker("b", 50.0, 14.4, "mine"));

        let mut bar = FilterBar::collect(collection.markers().iter().filter_map(|m| m.tags()));
        bar.toggle(TagAttribute::Type, "mine").unwrap();
        assert_eq!(collection.apply_filter(&bar), 1);
        assert_eq!(collection.visible_markers().next().unwrap().id(), "b");

        bar.clear(TagAttribute::Type).unwrap();
        assert_eq!(collection.apply_filter(&bar), 2);
    }

    #[test]
    fn test_render_draws_clusters_and_singles() {
        let mut collection = MarkerCollection::new();
        collection.add_marker(marker("a", 49.8, 15.5, "cave"));
        collection.add_marker(marker("b", 49.8001, 15.5001, "cave"));
        collection.add_marker(marker("c", 50.5, 14.0, "mine"));

        let viewport = Viewport::new(LatLng::new(49.8, 15.5), 8.0, Point::new(800.0, 600.0));
        let mut ctx = RenderContext::new(800, 600);
        collection.render(&mut ctx, &viewport).unwrap();

        assert_eq!(ctx.count(|c| matches!(c, DrawCommand::Cluster { count: 2, .. })), 1);
        assert_eq!(ctx.count(|c| matches!(c, DrawCommand::Marker { id, .. } if id == "c")), 1);
    }

    #[test]
    fn test_hidden_markers_are_not_clustered() {
        let mut collection = MarkerCollection::new();
        collection.add_marker(marker("a", 49.8, 15.5, "cave"));
        collection.add_marker(marker("b", 49.8001, 15.5001, "mine"));

        let mut bar = FilterBar::collect(collection.markers().iter().filter_map(|m| m.tags()));
        bar.toggle(TagAttribute::Type, "cave").unwrap();
        collection.apply_filter(&bar);

        let viewport = Viewport::new(LatLng::new(49.8, 15.5), 8.0, Point::new(800.0, 600.0));
        let clusters = collection.clusters(&viewport);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].is_single());
    }

    #[test]
    fn test_remove_marker() {
        let mut collection = MarkerCollection::new();
        collection.add_marker(marker("a", 49.8, 15.5, "cave"));
        assert!(collection.remove_marker("a").is_some());
        assert!(collection.remove_marker("a").is_none());
        assert!(collection.is_empty());
        assert!(collection.bounds().is_none());
    }

    #[test]
    fn test_unplaceable_marker_is_kept_but_not_clustered() {
        let mut collection = MarkerCollection::new();
        collection.add_marker(marker("a", 49.8, 15.5, "cave"));
        collection.add_marker(marker("nowhere", f64::NAN, 15.5, "cave"));

        let viewport = Viewport::new(LatLng::new(49.8, 15.5), 8.0, Point::new(800.0, 600.0));
        let total: usize = collection.clusters(&viewport).iter().map(|c| c.count()).sum();
        assert_eq!(total, 1);
        assert_eq!(collection.len(), 2);
    }
}
