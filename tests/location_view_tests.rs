use geosite_map::{
    data::geology::FeatureCollection,
    prelude::*,
    MapError,
};
use serde_json::json;

/// Integration tests driving the view the way a page does: fetches run as
/// local tasks while the test keeps interacting with the view
#[cfg(test)]
mod location_view_tests {
    use super::*;
    use tokio::task::{yield_now, LocalSet};

    const URL: &str = "/api/locations";

    fn record(id: u64, name: &str, kind: &str, state: &str, access: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "latitude": 49.0 + id as f64 * 0.1,
            "longitude": 15.0 + id as f64 * 0.1,
            "description": format!("About {}", name),
            "image": format!("/img/{}.jpg", id),
            "type": kind,
            "state": state,
            "accessibility": access,
        })
    }

    fn body(records: Vec<serde_json::Value>) -> String {
        json!({ "locations": records }).to_string()
    }

    fn sample_body() -> String {
        body(vec![
            record(1, "Cave A", "cave", "open", "easy"),
            record(2, "Mine B", "mine", "collapsed", "hard"),
            record(3, "Quarry C", "quarry", "open", "easy"),
        ])
    }

    fn view_with(source: Rc<StaticDataSource>, variant: MapVariant) -> LocationMapView {
        LocationMapView::initialize("map", variant.resolve(), source).unwrap()
    }

    /// Yield until `done` holds, giving spawned tasks a chance to run
    async fn settle(mut done: impl FnMut() -> bool) {
        for _ in 0..50 {
            if done() {
                return;
            }
            yield_now().await;
        }
    }

    /// Every valid record becomes one marker whose popup names and describes it
    #[tokio::test]
    async fn test_fetch_creates_one_marker_per_record() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(StaticDataSource::new().with_response(URL, sample_body()));
                let view = view_with(source, MapVariant::Standard);

                let report = view.fetch_locations(URL).await.unwrap();
                assert_eq!(report, FetchReport { added: 3, skipped: 0 });
                assert_eq!(view.marker_count(), 3);

                view.with_markers(|collection| {
                    for marker in collection.markers() {
                        let popup = marker.popup().unwrap();
                        assert!(popup.contains(marker.title()));
                        assert!(popup.contains(&format!("About {}", marker.title())));
                    }
                })
                .unwrap();
            })
            .await;
    }

    /// The record from the site's detail page example
    #[tokio::test]
    async fn test_single_record_marker() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(StaticDataSource::new().with_response(
                    URL,
                    body(vec![record(1, "Cave A", "cave", "open", "easy")]),
                ));
                let view = view_with(source, MapVariant::Basic);
                view.fetch_locations(URL).await.unwrap();

                let (tooltip, popup) = view
                    .with_markers(|c| {
                        let marker = &c.markers()[0];
                        (
                            marker.tooltip().unwrap().content.clone(),
                            marker.popup().unwrap().to_string(),
                        )
                    })
                    .unwrap();
                assert_eq!(tooltip, "Cave A");
                assert!(popup.contains("href=\"/location/1\""));
                assert!(popup.contains("Cave A"));
            })
            .await;
    }

    /// Clearing always yields an empty collection under a never-seen id
    #[tokio::test]
    async fn test_clear_markers_gives_fresh_collection() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(StaticDataSource::new().with_response(URL, sample_body()));
                let view = view_with(source, MapVariant::Standard);
                let mut seen = HashSet::default();
                seen.insert(view.markers_id());

                for _ in 0..3 {
                    view.fetch_locations(URL).await.unwrap();
                    view.add_marker(LatLng::new(50.0, 14.0), "Pin", false).unwrap();
                    let id = view.clear_markers().unwrap();
                    assert_eq!(view.marker_count(), 0);
                    assert!(seen.insert(id.clone()), "id {} reused", id);
                    assert_eq!(view.with_filters(|f| f.bound_to().map(String::from)), Some(id));
                }
            })
            .await;
    }

    /// Filter values are exactly the distinct values of the last fetch
    #[tokio::test]
    async fn test_filters_follow_last_fetch() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(
                    StaticDataSource::new()
                        .with_response(URL, sample_body())
                        .with_response(
                            "/api/caves",
                            body(vec![
                                record(7, "Cave X", "cave", "flooded", "easy"),
                                record(8, "Cave Y", "cave", "open", "easy"),
                            ]),
                        ),
                );
                let view = view_with(source, MapVariant::Standard);

                view.fetch_locations(URL).await.unwrap();
                assert_eq!(
                    view.filter_values(TagAttribute::Type),
                    vec!["cave", "mine", "quarry"]
                );

                view.fetch_locations("/api/caves").await.unwrap();
                assert_eq!(view.filter_values(TagAttribute::Type), vec!["cave"]);
                assert_eq!(view.filter_values(TagAttribute::State), vec!["flooded", "open"]);
                assert_eq!(view.filter_values(TagAttribute::Accessibility), vec!["easy"]);
                // Markers accumulate across fetches
                assert_eq!(view.marker_count(), 5);
            })
            .await;
    }

    /// Selections combine with OR inside a button and AND across buttons
    #[tokio::test]
    async fn test_filter_selection_and_popovers() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(StaticDataSource::new().with_response(URL, sample_body()));
                let view = view_with(source, MapVariant::Standard);
                view.fetch_locations(URL).await.unwrap();

                assert_eq!(view.toggle_filter(TagAttribute::Type, "cave").unwrap(), 1);
                assert_eq!(view.toggle_filter(TagAttribute::Type, "quarry").unwrap(), 2);
                assert_eq!(view.toggle_filter(TagAttribute::Accessibility, "hard").unwrap(), 0);
                assert_eq!(view.clear_filter(TagAttribute::Accessibility).unwrap(), 2);
                assert_eq!(view.clear_filter(TagAttribute::Type).unwrap(), 3);

                view.toggle_filter_popover(TagAttribute::Type);
                view.toggle_filter_popover(TagAttribute::State);
                assert_eq!(
                    view.with_filters(|f| f.open_popover()),
                    Some(TagAttribute::State)
                );
                assert!(!view.with_filters(|f| f.button(TagAttribute::Type).unwrap().is_open()));
            })
            .await;
    }

    /// An empty list leaves no markers and three empty filter buttons
    #[tokio::test]
    async fn test_empty_list() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(StaticDataSource::new().with_response(URL, body(vec![])));
                let view = view_with(source, MapVariant::Standard);

                let report = view.fetch_locations(URL).await.unwrap();
                assert_eq!(report, FetchReport::default());
                assert_eq!(view.marker_count(), 0);
                view.with_filters(|filters| {
                    assert_eq!(filters.buttons().len(), 3);
                    assert!(filters.buttons().iter().all(|b| b.values().is_empty()));
                });
            })
            .await;
    }

    /// A malformed body leaves markers and filters exactly as they were
    #[tokio::test]
    async fn test_malformed_body_changes_nothing() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(
                    StaticDataSource::new()
                        .with_response(URL, sample_body())
                        .with_response("/api/broken", "<html>502 Bad Gateway</html>"),
                );
                let view = view_with(source, MapVariant::Standard);
                view.fetch_locations(URL).await.unwrap();
                view.toggle_filter(TagAttribute::State, "open").unwrap();

                let before_values = view.filter_values(TagAttribute::State);
                let before_id = view.markers_id();

                let err = view.fetch_locations("/api/broken").await.unwrap_err();
                assert!(matches!(err, MapError::Parse(_)));
                assert!(view.toast().is_some());

                assert_eq!(view.markers_id(), before_id);
                assert_eq!(view.marker_count(), 3);
                assert_eq!(view.visible_marker_count(), 2);
                assert_eq!(view.filter_values(TagAttribute::State), before_values);
                assert_eq!(
                    view.with_filters(|f| f.button(TagAttribute::State).unwrap().selected().to_vec()),
                    vec!["open"]
                );
            })
            .await;
    }

    /// zoom_to lands on the position at zoom 14 whatever the view was before
    #[tokio::test]
    async fn test_zoom_to_from_any_state() {
        let source = Rc::new(StaticDataSource::new());
        let view = view_with(source, MapVariant::Standard);
        let target = LatLng::new(49.1951, 16.6068);

        for (center, zoom) in [
            (LatLng::new(0.0, 0.0), 3.0),
            (LatLng::new(50.0, 14.0), 19.0),
            (target, 14.0),
        ] {
            view.with_map_mut(|m| m.set_view(center, zoom)).unwrap();
            view.zoom_to(target).unwrap();
            assert_eq!(view.viewport().center, target);
            assert_eq!(view.viewport().zoom, 14.0);
        }
    }

    /// A view destroyed while its fetch is suspended is not touched
    #[tokio::test]
    async fn test_destroy_during_fetch() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(StaticDataSource::new().with_response(URL, sample_body()));
                let gate = source.hold(URL);
                let view = view_with(source.clone(), MapVariant::Standard);

                let handle = view.fetch_locations(URL);
                settle(|| !source.requests().is_empty()).await;
                assert_eq!(source.requests(), vec![URL]);

                view.destroy();
                gate.open();

                assert!(matches!(handle.await, Err(MapError::Cancelled(_))));
                assert_eq!(view.marker_count(), 0);
                assert!(view.filter_values(TagAttribute::Type).is_empty());
                assert!(view.toast().is_none());
            })
            .await;
    }

    /// Concurrent fetches commit in completion order and both land
    #[tokio::test]
    async fn test_concurrent_fetches_accumulate() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(
                    StaticDataSource::new()
                        .with_response(URL, sample_body())
                        .with_response(
                            "/api/more",
                            body(vec![record(9, "Adit Z", "mine", "open", "medium")]),
                        ),
                );
                let slow = source.hold(URL);
                let view = view_with(source, MapVariant::Standard);

                let first = view.fetch_locations(URL);
                let second = view.fetch_locations("/api/more");
                assert_eq!(second.await.unwrap().added, 1);
                assert_eq!(view.filter_values(TagAttribute::Type), vec!["mine"]);

                slow.open();
                assert_eq!(first.await.unwrap().added, 3);
                assert_eq!(view.marker_count(), 4);
                assert_eq!(
                    view.filter_values(TagAttribute::Type),
                    vec!["cave", "mine", "quarry"]
                );
            })
            .await;
    }

    fn mine_work() -> FeatureCollection {
        let attributes = json!({"KLIC": 4711, "NAZEV": "Důl Jeroným", "SUROVINA": "Sn"});
        serde_json::from_value(json!({ "features": [{ "attributes": attributes }] })).unwrap()
    }

    fn photos() -> String {
        json!({"photos": [
            {"url": "https://app.geology.cz/dud_foto/1.jpg", "title": "Adit", "thumbnail": "t1.jpg"},
            {"url": "https://app.geology.cz/dud_foto/2.jpg", "title": "Dump", "thumbnail": "t2.jpg"}
        ]})
        .to_string()
    }

    /// Feature popups of Czech mine works pull in their photo gallery
    #[tokio::test]
    async fn test_feature_popup_gallery() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(
                    StaticDataSource::new().with_response("/api/geofond_photos/4711", photos()),
                );
                let view = view_with(source, MapVariant::Photos);

                let opened = view
                    .open_feature_popup("overlay-mines", LatLng::new(50.2, 12.7), &mine_work())
                    .unwrap();
                assert_eq!(opened.gallery, Some(4711));
                let popup_id = opened.popup_id;

                let count = view.fetch_gallery(&popup_id, 4711).await.unwrap().unwrap();
                assert_eq!(count, 2);

                view.with_lightbox(|lightbox| {
                    let lightbox = lightbox.unwrap();
                    assert_eq!(lightbox.scope(), popup_id);
                    assert_eq!(lightbox.len(), 2);
                });
                let gallery = view.with_popups(|p| p.get(&popup_id).unwrap().html());
                assert!(gallery.contains("<div class=\"gallery\">"));
                assert!(gallery.contains("t2.jpg"));
            })
            .await;
    }

    /// A photo endpoint answering with garbage is reported to the user
    #[tokio::test]
    async fn test_malformed_gallery_shows_toast() {
        let source = Rc::new(
            StaticDataSource::new().with_response("/api/geofond_photos/4711", "<html>500</html>"),
        );
        let view = view_with(source, MapVariant::Photos);

        let opened = view
            .open_feature_popup("overlay-mines", LatLng::new(50.2, 12.7), &mine_work())
            .unwrap();
        let result = view.load_gallery(&opened.popup_id, 4711).await;

        assert!(matches!(result, Err(MapError::Parse(_))));
        assert_eq!(view.toast().as_deref(), Some("Photo data could not be read"));
        assert!(view.with_lightbox(|l| l.is_none()));
    }

    /// An unreachable photo endpoint is reported as a loading failure
    #[tokio::test]
    async fn test_unreachable_gallery_shows_toast() {
        let source = Rc::new(
            StaticDataSource::new().with_failure("/api/geofond_photos/4711", "connection reset"),
        );
        let view = view_with(source, MapVariant::Photos);

        let opened = view
            .open_feature_popup("overlay-mines", LatLng::new(50.2, 12.7), &mine_work())
            .unwrap();
        let result = view.load_gallery(&opened.popup_id, 4711).await;

        assert!(matches!(result, Err(MapError::Network(_))));
        assert_eq!(view.toast().as_deref(), Some("Photos could not be loaded"));
    }

    /// Photos arriving after their popup was replaced are dropped
    #[tokio::test]
    async fn test_gallery_for_closed_popup_is_dropped() {
        LocalSet::new()
            .run_until(async {
                let photos_url = "/api/geofond_photos/4711";
                let source = Rc::new(
                    StaticDataSource::new()
                        .with_response(photos_url, photos())
                        .with_response(URL, sample_body()),
                );
                let gate = source.hold(photos_url);
                let view = view_with(source.clone(), MapVariant::Photos);
                view.fetch_locations(URL).await.unwrap();

                let popup_id = view
                    .open_feature_popup("overlay-mines", LatLng::new(50.2, 12.7), &mine_work())
                    .unwrap()
                    .popup_id;
                let gallery = view.fetch_gallery(&popup_id, 4711);
                settle(|| source.requests().len() >= 2).await;

                view.open_marker_popup("location-1").unwrap().unwrap();
                assert!(!view.with_popups(|p| p.is_open(&popup_id)));

                gate.open();
                assert!(matches!(gallery.await, Some(Err(MapError::Cancelled(_)))));
                assert!(view.with_lightbox(|l| l.is_none()));
                assert_eq!(
                    view.with_popups(|p| p.get(&popup_id).unwrap().gallery().map(String::from)),
                    Some(String::new())
                );
            })
            .await;
    }

    /// Variants without feature popups ignore identify results
    #[tokio::test]
    async fn test_standard_variant_has_no_feature_popups() {
        let view = view_with(Rc::new(StaticDataSource::new()), MapVariant::Standard);
        assert!(view
            .open_feature_popup("overlay-mines", LatLng::new(50.2, 12.7), &mine_work())
            .is_none());
    }

    /// Undermined areas use the schema configured for their overlay
    #[tokio::test]
    async fn test_overlay_schema_wins() {
        let view = view_with(Rc::new(StaticDataSource::new()), MapVariant::Geology);
        let features: FeatureCollection = serde_json::from_value(json!({
            "features": [{ "attributes": { "NAZOV": "Halda", "POZUSTATEK": "odval" } }]
        }))
        .unwrap();
        let opened = view
            .open_feature_popup("overlay-undermined", LatLng::new(49.8, 18.2), &features)
            .unwrap();
        assert_eq!(opened.gallery, None);
        let id = opened.popup_id;
        let html = view.with_popups(|p| p.get(&id).unwrap().html());
        assert!(html.contains("Undermined area"));
        assert!(!html.contains("gallery"));
    }

    /// Rendering the loaded view yields tiles and marker or cluster commands
    #[tokio::test]
    async fn test_render_after_fetch() {
        LocalSet::new()
            .run_until(async {
                let source = Rc::new(StaticDataSource::new().with_response(URL, sample_body()));
                let view = view_with(source, MapVariant::Standard);
                view.fetch_locations(URL).await.unwrap();
                view.zoom_to(LatLng::new(49.2, 15.2)).unwrap();

                let context = view.render().unwrap();
                let pins = context.count(|c| {
                    matches!(c, DrawCommand::Marker { .. } | DrawCommand::Cluster { .. })
                });
                assert!(pins > 0);
                assert!(context.count(|c| matches!(c, DrawCommand::Tile { .. })) > 0);
            })
            .await;
    }
}
