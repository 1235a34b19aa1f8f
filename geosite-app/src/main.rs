use anyhow::Context;
use geosite_map::{
    prelude::*,
    spatial::clustering::Cluster,
};
use std::rc::Rc;

const USAGE: &str = "usage: geosite-app <locations-url> [basic|standard|geology|photos] [base-url]";

/// Loads one locations endpoint into a headless map view and prints what a
/// browser would show: markers, filter buttons and clusters at a few zooms
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    geosite_map::init_logging();

    let mut args = std::env::args().skip(1);
    let url = args.next().context(USAGE)?;
    let variant: MapVariant = match args.next() {
        Some(name) => name.parse()?,
        None => MapVariant::default(),
    };
    let source: Rc<dyn LocationDataSource> = match args.next() {
        Some(base) => Rc::new(HttpDataSource::with_base_url(&base)?),
        None => Rc::new(HttpDataSource::new()?),
    };

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            let view = MapViewBuilder::with_variant("map", variant)
                .with_data_source(source)
                .build()
                .context("building the map view")?;

            let report = view
                .fetch_locations(&url)
                .await
                .with_context(|| format!("loading {}", url))?;
            println!(
                "{} markers added, {} records skipped (collection {})",
                report.added,
                report.skipped,
                view.markers_id()
            );

            for attribute in TagAttribute::ALL {
                println!("{} filter: {:?}", attribute, view.filter_values(attribute));
            }

            let hidden = view.marker_count() - view.visible_marker_count();
            for zoom in [6.0, 8.0, 11.0, 14.0] {
                let center = view.viewport().center;
                view.with_map_mut(|map| map.set_view(center, zoom))?;
                let context = view.render()?;
                let bubbles = context.count(|c| matches!(c, DrawCommand::Cluster { .. }));
                let pins = context.count(|c| matches!(c, DrawCommand::Marker { .. }));
                println!(
                    "zoom {:>4}: {} clusters, {} single markers ({} hidden by filters)",
                    zoom, bubbles, pins, hidden
                );
            }

            print_largest_clusters(&view);
            Ok::<_, anyhow::Error>(())
        })
        .await
}

fn print_largest_clusters(view: &LocationMapView) {
    let viewport = view.viewport();
    let markers_id = view.markers_id();
    let mut clusters: Vec<Cluster<usize>> = view
        .with_map_mut(|map| {
            map.get_layer_mut(&markers_id)?
                .as_any_mut()
                .downcast_mut::<MarkerCollection>()
                .map(|collection| collection.clusters(&viewport))
        })
        .unwrap_or_default();
    clusters.sort_by(|a, b| b.count().cmp(&a.count()));
    for cluster in clusters.iter().take(5) {
        println!(
            "  {:>4} markers around {}",
            cluster.count(),
            cluster.center
        );
    }
}
