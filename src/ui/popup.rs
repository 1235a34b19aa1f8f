use crate::prelude::HashMap;
use crate::{
    core::{geo::LatLng, viewport::Viewport},
    data::{location::Photo, templates},
    rendering::context::RenderContext,
};
use instant::{Duration, Instant};

/// HTML popup anchored at a map position
///
/// The body is fixed once built; the optional gallery region can be replaced
/// later, e.g. when photos arrive.
#[derive(Debug, Clone)]
pub struct Popup {
    pub id: String,
    pub position: LatLng,
    pub content: String,
    pub visible: bool,
    pub created_at: Instant,
    pub auto_close_duration: Option<Duration>,
    gallery: Option<String>,
}

impl Popup {
    pub fn new(id: String, position: LatLng, content: String) -> Self {
        Self {
            id,
            position,
            content,
            visible: false,
            created_at: Instant::now(),
            auto_close_duration: None,
            gallery: None,
        }
    }

    pub fn with_auto_close(mut self, duration: Duration) -> Self {
        self.auto_close_duration = Some(duration);
        self
    }

    /// Reserve an empty gallery region below the body
    pub fn with_gallery(mut self) -> Self {
        self.gallery = Some(String::new());
        self
    }

    pub fn has_gallery(&self) -> bool {
        self.gallery.is_some()
    }

    pub fn gallery(&self) -> Option<&str> {
        self.gallery.as_deref()
    }

    /// Replace the content of the gallery region, creating it if needed
    pub fn set_gallery(&mut self, html: String) {
        self.gallery = Some(html);
    }

    pub fn html(&self) -> String {
        match &self.gallery {
            Some(gallery) => format!(
                "{}<div class=\"gallery\">{}</div>",
                self.content, gallery
            ),
            None => self.content.clone(),
        }
    }

    pub fn show(&mut self) {
        self.visible = true;
        self.created_at = Instant::now();
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn should_auto_close(&self) -> bool {
        if let Some(duration) = self.auto_close_duration {
            self.created_at.elapsed() > duration
        } else {
            false
        }
    }
}

/// Keeps track of popups; at most one is open at a time
pub struct PopupManager {
    popups: HashMap<String, Popup>,
    open: Option<String>,
    next_id: u64,
}

impl PopupManager {
    pub fn new() -> Self {
        Self {
            popups: HashMap::default(),
            open: None,
            next_id: 1,
        }
    }

    /// Fresh id for a popup about to be added
    pub fn next_popup_id(&mut self) -> String {
        let id = format!("popup-{}", self.next_id);
        self.next_id += 1;
        id
    }

    pub fn add_popup(&mut self, popup: Popup) {
        self.popups.insert(popup.id.clone(), popup);
    }

    pub fn remove_popup(&mut self, id: &str) -> Option<Popup> {
        if self.open.as_deref() == Some(id) {
            self.open = None;
        }
        self.popups.remove(id)
    }

    /// Show a popup, closing whichever one was open before
    pub fn show_popup(&mut self, id: &str) -> bool {
        if !self.popups.contains_key(id) {
            return false;
        }
        if let Some(previous) = self.open.take() {
            if previous != id {
                self.close(&previous);
            }
        }
        if let Some(popup) = self.popups.get_mut(id) {
            popup.show();
        }
        self.open = Some(id.to_string());
        true
    }

    pub fn hide_popup(&mut self, id: &str) {
        if let Some(popup) = self.popups.get_mut(id) {
            popup.hide();
        }
        if self.open.as_deref() == Some(id) {
            self.open = None;
        }
    }

    /// Add and show in one step; returns the popup id
    pub fn open_popup(&mut self, popup: Popup) -> String {
        let id = popup.id.clone();
        self.add_popup(popup);
        self.show_popup(&id);
        id
    }

    fn close(&mut self, id: &str) {
        if let Some(popup) = self.popups.get_mut(id) {
            popup.hide();
        }
    }

    pub fn get(&self, id: &str) -> Option<&Popup> {
        self.popups.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Popup> {
        self.popups.get_mut(id)
    }

    pub fn open_popup_id(&self) -> Option<&str> {
        self.open.as_deref()
    }

    /// Whether `id` exists and is currently shown
    pub fn is_open(&self, id: &str) -> bool {
        self.popups.get(id).is_some_and(|p| p.visible)
    }

    pub fn update(&mut self) {
        let expired: Vec<String> = self
            .popups
            .iter()
            .filter(|(_, p)| p.should_auto_close())
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            self.remove_popup(&id);
        }
    }

    /// Queue the open popup as a label at its anchor
    pub fn render(&self, context: &mut RenderContext, viewport: &Viewport) {
        if let Some(popup) = self.open.as_ref().and_then(|id| self.popups.get(id)) {
            let anchor = viewport.lat_lng_to_pixel(&popup.position);
            context.render_label(anchor, &popup.html());
        }
    }

    pub fn clear(&mut self) {
        self.popups.clear();
        self.open = None;
    }

    pub fn visible_count(&self) -> usize {
        self.popups.values().filter(|p| p.visible).count()
    }
}

impl Default for PopupManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Image viewer bound to the gallery of one popup
#[derive(Debug, Clone, PartialEq)]
pub struct Lightbox {
    scope: String,
    photos: Vec<Photo>,
    current: Option<usize>,
}

impl Lightbox {
    /// Bind to the photos shown in popup `scope`
    pub fn init(scope: &str, photos: Vec<Photo>) -> Self {
        Self {
            scope: scope.to_string(),
            photos,
            current: None,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn open(&mut self, index: usize) -> Option<&Photo> {
        if index >= self.photos.len() {
            return None;
        }
        self.current = Some(index);
        self.photos.get(index)
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&Photo> {
        self.current.and_then(|i| self.photos.get(i))
    }

    /// Wraps around at the end
    pub fn next(&mut self) -> Option<&Photo> {
        let i = self.current?;
        let next = (i + 1) % self.photos.len();
        self.current = Some(next);
        self.photos.get(next)
    }

    pub fn previous(&mut self) -> Option<&Photo> {
        let i = self.current?;
        let prev = (i + self.photos.len() - 1) % self.photos.len();
        self.current = Some(prev);
        self.photos.get(prev)
    }

    pub fn to_html(&self) -> String {
        templates::gallery_html(&self.scope, &self.photos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(n: u32) -> Photo {
        Photo {
            url: format!("/p/{}.jpg", n),
            title: format!("Photo {}", n),
            thumbnail: format!("/p/{}_t.jpg", n),
        }
    }

    #[test]
    fn test_only_one_popup_open() {
        let mut manager = PopupManager::new();
        let a = manager.next_popup_id();
        let b = manager.next_popup_id();
        manager.open_popup(Popup::new(a.clone(), LatLng::new(1.0, 1.0), "A".into()));
        manager.open_popup(Popup::new(b.clone(), LatLng::new(2.0, 2.0), "B".into()));

        assert!(!manager.is_open(&a));
        assert!(manager.is_open(&b));
        assert_eq!(manager.visible_count(), 1);
        assert_eq!(manager.open_popup_id(), Some(b.as_str()));
    }

    #[test]
    fn test_gallery_region_is_replaced() {
        let mut popup = Popup::new("p".into(), LatLng::new(0.0, 0.0), "<b>Body</b>".into())
            .with_gallery();
        assert_eq!(popup.html(), "<b>Body</b><div class=\"gallery\"></div>");

        popup.set_gallery("<img>".into());
        popup.set_gallery("<img><img>".into());
        assert_eq!(popup.html(), "<b>Body</b><div class=\"gallery\"><img><img></div>");
    }

    #[test]
    fn test_auto_close_removes_popup() {
        let mut manager = PopupManager::new();
        let popup = Popup::new("p".into(), LatLng::new(0.0, 0.0), "x".into())
            .with_auto_close(Duration::from_millis(0));
        manager.open_popup(popup);
        std::thread::sleep(std::time::Duration::from_millis(2));
        manager.update();
        assert!(manager.get("p").is_none());
        assert!(manager.open_popup_id().is_none());
    }

    #[test]
    fn test_lightbox_navigation_wraps() {
        let mut lightbox = Lightbox::init("popup-1", vec![photo(1), photo(2), photo(3)]);
        assert!(lightbox.next().is_none());

        assert_eq!(lightbox.open(2).unwrap().title, "Photo 3");
        assert_eq!(lightbox.next().unwrap().title, "Photo 1");
        assert_eq!(lightbox.previous().unwrap().title, "Photo 3");
        assert!(lightbox.open(5).is_none());

        lightbox.close();
        assert!(lightbox.current().is_none());
    }
}
