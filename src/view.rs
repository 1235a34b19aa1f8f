//! The location map view
//!
//! [`LocationMapView`] owns a map widget with a clustered marker overlay, the
//! three tag filter buttons, popups and a toast. Location data is loaded
//! asynchronously on the local executor: a fetch suspends at the network call
//! and, once it resumes, commits all of its markers and rebuilt filters in one
//! step. A view that was destroyed in the meantime is left alone.
//!
//! State lives behind `Rc<RefCell<_>>` and is never borrowed across an
//! `.await`, so several fetches may be in flight at once. They complete in any
//! order and their markers accumulate.

use crate::{
    core::{
        config::MapViewOptions,
        geo::LatLng,
        map::Map,
        viewport::Viewport,
    },
    data::{
        geology::{resolve_feature_popup, FeatureCollection},
        source::LocationDataSource,
    },
    layers::{
        base::LayerTrait,
        cluster::MarkerCollection,
        marker::{Marker, Tooltip},
    },
    plugins::base::MapEvent,
    prelude::{Future, Pin},
    rendering::context::RenderContext,
    runtime::{spawn_local, TaskHandle},
    traits::MapWidget,
    ui::{
        filter::{FilterBar, TagAttribute},
        popup::{Lightbox, Popup, PopupManager},
        toast::{copy_to_clipboard, Clipboard, MemoryClipboard, ToastArea},
    },
    MapError, Result,
};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    task::{Context, Poll},
};

/// A feature popup that was just opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePopupOpened {
    pub popup_id: String,
    /// Object whose photos belong in the popup's gallery region
    pub gallery: Option<u64>,
}

/// Outcome of one location fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Markers added to the collection
    pub added: usize,
    /// Records that could not be turned into a marker
    pub skipped: usize,
}

/// Pending result of [`LocationMapView::fetch_locations`]
///
/// Dropping the handle does not cancel the fetch.
pub struct FetchHandle {
    inner: TaskHandle<Result<FetchReport>>,
}

impl FetchHandle {
    pub fn try_result(&mut self) -> Option<Result<FetchReport>> {
        self.inner.try_result()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Future for FetchHandle {
    type Output = Result<FetchReport>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Some(result)) => Poll::Ready(result),
            Poll::Ready(None) => Poll::Ready(Err(MapError::Cancelled(
                "fetch task was dropped".to_string(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

struct ViewState<W> {
    map: W,
    options: MapViewOptions,
    /// Layer id of the attached marker collection
    markers_id: String,
    filters: FilterBar,
    popups: PopupManager,
    toasts: ToastArea,
    lightbox: Option<Lightbox>,
    next_marker: u64,
}

impl<W: MapWidget> ViewState<W> {
    fn toast(&mut self, text: &str) {
        let timeout = self.options.toast_timeout_ms;
        self.toasts.show(text, timeout);
    }

    /// Toast for a failed fetch
    fn report_error(&mut self, error: &MapError) {
        match error {
            MapError::Parse(_) => {
                log::error!("location data is malformed: {}", error);
                self.toast("Location data could not be read");
            }
            _ => {
                log::warn!("loading locations failed: {}", error);
                self.toast("Locations could not be loaded");
            }
        }
    }

    fn report_gallery_error(&mut self, object_id: u64, error: &MapError) {
        match error {
            MapError::Parse(_) => {
                log::error!("photos of {} are malformed: {}", object_id, error);
                self.toast("Photo data could not be read");
            }
            _ => {
                log::warn!("gallery of {} failed: {}", object_id, error);
                self.toast("Photos could not be loaded");
            }
        }
    }

    fn apply_filters(&mut self) -> Result<usize> {
        let collection = collection_mut(&mut self.map, &self.markers_id)?;
        Ok(collection.apply_filter(&self.filters))
    }
}

fn collection<'a, W: MapWidget>(map: &'a W, id: &str) -> Result<&'a MarkerCollection> {
    map.get_layer(id)
        .and_then(|layer| layer.as_any().downcast_ref::<MarkerCollection>())
        .ok_or_else(|| MapError::Layer(format!("marker collection '{}' is not attached", id)))
}

fn collection_mut<'a, W: MapWidget>(map: &'a mut W, id: &str) -> Result<&'a mut MarkerCollection> {
    map.get_layer_mut(id)
        .and_then(|layer| layer.as_any_mut().downcast_mut::<MarkerCollection>())
        .ok_or_else(|| MapError::Layer(format!("marker collection '{}' is not attached", id)))
}

/// Map of locations with clustered markers and tag filters
///
/// Clones share the same view; pending tasks hold a clone.
pub struct LocationMapView<W: MapWidget = Map> {
    state: Rc<RefCell<ViewState<W>>>,
    source: Rc<dyn LocationDataSource>,
    clipboard: Rc<dyn Clipboard>,
    alive: Rc<Cell<bool>>,
}

impl<W: MapWidget> Clone for LocationMapView<W> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            source: self.source.clone(),
            clipboard: self.clipboard.clone(),
            alive: self.alive.clone(),
        }
    }
}

impl LocationMapView<Map> {
    /// Build the map into `container_id` with the layers and controls of
    /// `options` and an empty marker collection; no request is made
    pub fn initialize(
        container_id: &str,
        options: MapViewOptions,
        source: Rc<dyn LocationDataSource>,
    ) -> Result<Self> {
        let map = Map::from_options(container_id, &options)?;
        Self::from_map(map, options, source)
    }

    pub fn select_base_layer(&self, name: &str) -> Result<()> {
        self.ensure_alive()?;
        self.state.borrow_mut().map.select_base_layer(name)
    }

    pub fn set_overlay(&self, name: &str, enabled: bool) -> Result<()> {
        self.ensure_alive()?;
        self.state.borrow_mut().map.set_overlay(name, enabled)
    }

    /// Position fix from the device
    pub fn location_found(&self, position: LatLng, accuracy: f64) -> Result<()> {
        self.ensure_alive()?;
        self.state.borrow_mut().map.location_found(position, accuracy)
    }

    /// Locating failed; the reason is shown as a toast
    pub fn location_error(&self, message: &str) {
        if !self.is_alive() {
            return;
        }
        let mut state = self.state.borrow_mut();
        if let Some(text) = state.map.location_error(message) {
            state.toast(&text);
        }
    }

    /// Pointer or keyboard input for the map plugins
    pub fn handle_event(&self, event: &MapEvent) -> Result<bool> {
        self.ensure_alive()?;
        self.state.borrow_mut().map.handle_event(event)
    }
}

impl<W: MapWidget> LocationMapView<W> {
    /// Wrap an already built map widget; attaches an empty marker collection
    pub fn from_map(
        mut map: W,
        options: MapViewOptions,
        source: Rc<dyn LocationDataSource>,
    ) -> Result<Self> {
        let collection = MarkerCollection::with_config(options.clustering.clone());
        let markers_id = collection.id().to_string();
        map.add_layer(Box::new(collection))?;

        let mut filters = FilterBar::empty();
        filters.bind(&markers_id);

        log::info!(
            "location view on '{}' initialized with collection {}",
            map.container_id(),
            markers_id
        );

        Ok(Self {
            state: Rc::new(RefCell::new(ViewState {
                map,
                options,
                markers_id,
                filters,
                popups: PopupManager::new(),
                toasts: ToastArea::new(),
                lightbox: None,
                next_marker: 1,
            })),
            source,
            clipboard: Rc::new(MemoryClipboard::new()),
            alive: Rc::new(Cell::new(true)),
        })
    }

    pub fn with_clipboard(mut self, clipboard: Rc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(MapError::Cancelled("view was destroyed".to_string()))
        }
    }

    /// Start loading locations from `url` on the local executor
    ///
    /// Must be called from within the executor (a tokio `LocalSet` natively).
    pub fn fetch_locations(&self, url: &str) -> FetchHandle
    where
        W: 'static,
    {
        let view = self.clone();
        let url = url.to_string();
        FetchHandle {
            inner: spawn_local(async move { view.load_locations(&url).await }),
        }
    }

    /// Load locations from `url` and add them as markers
    ///
    /// On success the filter buttons are replaced by ones holding the distinct
    /// values of this batch. On failure a toast is shown and markers and
    /// filters stay as they were.
    pub async fn load_locations(&self, url: &str) -> Result<FetchReport> {
        self.ensure_alive()?;
        log::info!("fetching locations from {}", url);

        let result = self.source.fetch_locations(url).await;

        if !self.is_alive() {
            log::debug!("view destroyed while fetching {}, dropping response", url);
            return Err(MapError::Cancelled(format!("fetch of {}", url)));
        }

        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                self.state.borrow_mut().report_error(&e);
                return Err(e);
            }
        };

        let mut skipped = batch.errors.len();
        for error in &batch.errors {
            log::warn!("skipping location: {}", error);
        }
        let mut markers = Vec::with_capacity(batch.records.len());
        for record in &batch.records {
            match record.to_marker() {
                Ok(marker) => markers.push(marker),
                Err(e) => {
                    log::warn!("skipping location: {}", e);
                    skipped += 1;
                }
            }
        }

        let mut filters = FilterBar::collect(markers.iter().filter_map(|m| m.tags()));
        let added = markers.len();

        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        filters.bind(&state.markers_id);
        let collection = collection_mut(&mut state.map, &state.markers_id)?;
        collection.extend(markers);
        let shown = collection.apply_filter(&filters);
        state.filters = filters;

        log::info!(
            "{} locations added from {} ({} skipped, {} shown)",
            added,
            url,
            skipped,
            shown
        );
        Ok(FetchReport { added, skipped })
    }

    /// Add a single marker; the tooltip shows the title, always when
    /// `show_tooltip` is set. Returns the marker id.
    pub fn add_marker(&self, position: LatLng, title: &str, show_tooltip: bool) -> Result<String> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let id = format!("marker-{}", state.next_marker);
        state.next_marker += 1;

        let tooltip = if show_tooltip {
            Tooltip::permanent(title)
        } else {
            Tooltip::new(title)
        };
        let marker = Marker::new(id.clone(), position, title).with_tooltip(tooltip);

        collection_mut(&mut state.map, &state.markers_id)?.add_marker(marker);
        state.apply_filters()?;
        Ok(id)
    }

    /// Center on `position` at the close zoom
    pub fn zoom_to(&self, position: LatLng) -> Result<()> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        let zoom = state.options.close_zoom;
        state.map.set_view(position, zoom)
    }

    /// Replace the marker collection with a new empty one
    ///
    /// The filters are re-bound to the new collection. Returns its layer id.
    pub fn clear_markers(&self) -> Result<String> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        let old_id = state.markers_id.clone();
        state.map.remove_layer(&old_id)?;

        let collection = MarkerCollection::with_config(state.options.clustering.clone());
        let new_id = collection.id().to_string();
        state.map.add_layer(Box::new(collection))?;
        state.markers_id = new_id.clone();
        state.filters.bind(&new_id);
        state.popups.clear();
        state.lightbox = None;

        log::debug!("marker collection {} replaced by {}", old_id, new_id);
        Ok(new_id)
    }

    /// Re-read the container size; returns `true` when the map was resized
    pub fn redraw(&self) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state.borrow_mut().map.invalidate_size()
    }

    /// Mark the view dead; pending tasks finish without touching it
    pub fn destroy(&self) {
        if !self.alive.replace(false) {
            return;
        }
        let mut state = self.state.borrow_mut();
        state.popups.clear();
        state.toasts.dismiss();
        state.lightbox = None;
        log::info!("location view on '{}' destroyed", state.map.container_id());
    }

    /// Open the popup bound to a marker, closing any other popup
    pub fn open_marker_popup(&self, marker_id: &str) -> Result<Option<String>> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        let (position, html) = {
            let collection = collection(&state.map, &state.markers_id)?;
            match collection.get_marker(marker_id) {
                Some(marker) => match marker.popup() {
                    Some(html) => (marker.position(), html.to_string()),
                    None => return Ok(None),
                },
                None => return Ok(None),
            }
        };
        let id = state.popups.next_popup_id();
        Ok(Some(state.popups.open_popup(Popup::new(id, position, html))))
    }

    pub fn close_popup(&self, popup_id: &str) {
        self.state.borrow_mut().popups.hide_popup(popup_id);
    }

    /// Show a popup for the first feature of an identify result on `overlay_id`
    ///
    /// Czech mine works get an empty gallery region when a photos endpoint is
    /// configured; the returned [`FeaturePopupOpened::gallery`] is the object id
    /// to pass to [`Self::fetch_gallery`] or [`Self::load_gallery`]. Nothing is
    /// requested here. `None` when there is nothing to show.
    pub fn open_feature_popup(
        &self,
        overlay_id: &str,
        position: LatLng,
        features: &FeatureCollection,
    ) -> Option<FeaturePopupOpened> {
        if !self.is_alive() {
            return None;
        }
        let mut state = self.state.borrow_mut();
        if !state.options.feature_popups {
            return None;
        }
        let schema = state.options.overlay(overlay_id).and_then(|o| o.schema);
        let content = resolve_feature_popup(features, schema)?;

        let id = state.popups.next_popup_id();
        let mut popup = Popup::new(id, position, content.html);
        let gallery = match (content.object_id, &state.options.photos_endpoint) {
            (Some(object_id), Some(_)) => {
                popup = popup.with_gallery();
                Some(object_id)
            }
            _ => None,
        };
        Some(FeaturePopupOpened {
            popup_id: state.popups.open_popup(popup),
            gallery,
        })
    }

    /// Start loading the photo gallery of `popup_id` on the local executor
    ///
    /// Spawns like [`Self::fetch_locations`]: with `tokio-runtime` this must be
    /// called inside a `tokio::task::LocalSet`.
    pub fn fetch_gallery(&self, popup_id: &str, object_id: u64) -> TaskHandle<Result<usize>>
    where
        W: 'static,
    {
        let view = self.clone();
        let popup_id = popup_id.to_string();
        spawn_local(async move { view.load_gallery(&popup_id, object_id).await })
    }

    /// Fetch photos of `object_id` into the gallery of `popup_id`
    ///
    /// Replaces the gallery region and binds a new lightbox to it. If the
    /// popup was closed or replaced meanwhile nothing is changed. Returns the
    /// number of photos.
    pub async fn load_gallery(&self, popup_id: &str, object_id: u64) -> Result<usize> {
        self.ensure_alive()?;
        let endpoint = self
            .state
            .borrow()
            .options
            .photos_endpoint
            .clone()
            .ok_or_else(|| MapError::Config("no photos endpoint configured".to_string()))?;
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), object_id);

        let result = self.source.fetch_photos(&url).await;

        if !self.is_alive() {
            return Err(MapError::Cancelled(format!("gallery of {}", object_id)));
        }
        let mut state = self.state.borrow_mut();
        if !state.popups.is_open(popup_id) {
            log::debug!("popup {} closed before its gallery arrived", popup_id);
            return Err(MapError::Cancelled(format!("popup {} is closed", popup_id)));
        }
        let photos = match result {
            Ok(photos) => photos,
            Err(e) => {
                state.report_gallery_error(object_id, &e);
                return Err(e);
            }
        };

        let count = photos.len();
        let lightbox = Lightbox::init(popup_id, photos);
        if let Some(popup) = state.popups.get_mut(popup_id) {
            popup.set_gallery(lightbox.to_html());
        }
        state.lightbox = Some(lightbox);
        log::debug!("{} photos in gallery of popup {}", count, popup_id);
        Ok(count)
    }

    /// Copy `text` to the clipboard and confirm with a toast
    pub fn copy_to_clipboard(&self, text: &str) {
        if !self.is_alive() {
            return;
        }
        let mut state = self.state.borrow_mut();
        let timeout = state.options.toast_timeout_ms;
        copy_to_clipboard(self.clipboard.as_ref(), &mut state.toasts, text, timeout);
    }

    /// Click on a filter button; closes the popover of every other button
    pub fn toggle_filter_popover(&self, attribute: TagAttribute) {
        self.state.borrow_mut().filters.toggle_popover(attribute);
    }

    /// Select or deselect a filter value; returns the number of markers shown
    pub fn toggle_filter(&self, attribute: TagAttribute, value: &str) -> Result<usize> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        state.filters.toggle(attribute, value)?;
        state.apply_filters()
    }

    /// The "Reset" entry of a filter button
    pub fn clear_filter(&self, attribute: TagAttribute) -> Result<usize> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        state.filters.clear(attribute)?;
        state.apply_filters()
    }

    /// Expire toasts and auto-closing popups
    pub fn update(&self) {
        let mut state = self.state.borrow_mut();
        state.toasts.update();
        state.popups.update();
    }

    /// Display list of the map with the open popup on top
    pub fn render(&self) -> Result<RenderContext> {
        self.ensure_alive()?;
        let mut state = self.state.borrow_mut();
        let mut context = state.map.render()?;
        state.popups.render(&mut context, state.map.viewport());
        Ok(context)
    }

    pub fn markers_id(&self) -> String {
        self.state.borrow().markers_id.clone()
    }

    pub fn marker_count(&self) -> usize {
        let state = self.state.borrow();
        collection(&state.map, &state.markers_id).map_or(0, |c| c.len())
    }

    pub fn visible_marker_count(&self) -> usize {
        let state = self.state.borrow();
        collection(&state.map, &state.markers_id).map_or(0, |c| c.visible_markers().count())
    }

    /// Run `f` on the attached marker collection
    pub fn with_markers<R>(&self, f: impl FnOnce(&MarkerCollection) -> R) -> Option<R> {
        let state = self.state.borrow();
        collection(&state.map, &state.markers_id).ok().map(f)
    }

    pub fn with_filters<R>(&self, f: impl FnOnce(&FilterBar) -> R) -> R {
        f(&self.state.borrow().filters)
    }

    pub fn filter_values(&self, attribute: TagAttribute) -> Vec<String> {
        self.state.borrow().filters.values(attribute).to_vec()
    }

    pub fn with_map<R>(&self, f: impl FnOnce(&W) -> R) -> R {
        f(&self.state.borrow().map)
    }

    pub fn with_map_mut<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.state.borrow_mut().map)
    }

    pub fn with_popups<R>(&self, f: impl FnOnce(&PopupManager) -> R) -> R {
        f(&self.state.borrow().popups)
    }

    pub fn with_lightbox<R>(&self, f: impl FnOnce(Option<&Lightbox>) -> R) -> R {
        f(self.state.borrow().lightbox.as_ref())
    }

    pub fn viewport(&self) -> Viewport {
        self.state.borrow().map.viewport().clone()
    }

    /// Text of the visible toast
    pub fn toast(&self) -> Option<String> {
        self.state.borrow().toasts.current().map(str::to_string)
    }

    pub fn toast_html(&self) -> String {
        self.state.borrow().toasts.to_html()
    }

    pub fn options(&self) -> MapViewOptions {
        self.state.borrow().options.clone()
    }
}
