//! Tag filter buttons for the marker collection
//!
//! Each button owns the distinct values of one marker attribute. Selecting
//! values in one button keeps markers having any of them; buttons combine with
//! AND. A button with nothing selected does not filter at all.

use crate::{
    core::constants::FILTER_CLEAR_TEXT,
    layers::marker::MarkerTags,
    prelude::HashSet,
    MapError, Result,
};
use serde::{Deserialize, Serialize};

/// Marker attribute a filter button works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagAttribute {
    Type,
    State,
    Accessibility,
}

impl TagAttribute {
    pub const ALL: [TagAttribute; 3] = [
        TagAttribute::Type,
        TagAttribute::State,
        TagAttribute::Accessibility,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TagAttribute::Type => "type",
            TagAttribute::State => "state",
            TagAttribute::Accessibility => "accessibility",
        }
    }

    /// Icon class shown on the button
    pub fn icon(&self) -> &'static str {
        match self {
            TagAttribute::Type => "bi bi-house-door",
            TagAttribute::State => "bi bi-wrench",
            TagAttribute::Accessibility => "bi bi-door-closed",
        }
    }
}

impl std::fmt::Display for TagAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Distinct values in first-seen order
#[derive(Debug, Clone, Default)]
pub struct DistinctValues {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl DistinctValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the value was not seen before
    pub fn insert(&mut self, value: &str) -> bool {
        if self.seen.contains(value) {
            return false;
        }
        self.seen.insert(value.to_string());
        self.ordered.push(value.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagFilterButton {
    attribute: TagAttribute,
    values: Vec<String>,
    selected: Vec<String>,
    open: bool,
    clear_text: String,
}

impl TagFilterButton {
    pub fn new(attribute: TagAttribute, values: Vec<String>) -> Self {
        Self {
            attribute,
            values,
            selected: Vec::new(),
            open: false,
            clear_text: FILTER_CLEAR_TEXT.to_string(),
        }
    }

    pub fn attribute(&self) -> TagAttribute {
        self.attribute
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn clear_text(&self) -> &str {
        &self.clear_text
    }

    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Flip selection of `value`; returns whether it is now selected
    pub fn toggle(&mut self, value: &str) -> Result<bool> {
        if !self.values.iter().any(|v| v == value) {
            return Err(MapError::Config(format!(
                "'{}' is not a {} filter value",
                value, self.attribute
            )));
        }
        if let Some(pos) = self.selected.iter().position(|v| v == value) {
            self.selected.remove(pos);
            Ok(false)
        } else {
            self.selected.push(value.to_string());
            Ok(true)
        }
    }

    /// The "Reset" entry: drop every selection
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn matches(&self, tags: &MarkerTags) -> bool {
        if self.selected.is_empty() {
            return true;
        }
        let value = tags.get(self.attribute);
        self.selected.iter().any(|v| v == value)
    }

    /// Markup of the button and its tag list
    pub fn to_html(&self) -> String {
        let display = if self.open { "block" } else { "none" };
        let mut html = format!(
            "<div class=\"tag-filter-button\" data-attribute=\"{}\"><button class=\"easy-button-button\"><i class=\"{}\"></i></button><div class=\"tag-filter-tags-container\" style=\"display: {}\"><ul>",
            self.attribute,
            self.attribute.icon(),
            display
        );
        for value in &self.values {
            let checked = if self.selected.contains(value) { " checked" } else { "" };
            html.push_str(&format!(
                "<li><label><input type=\"checkbox\" value=\"{0}\"{1}> {0}</label></li>",
                crate::data::templates::escape_html(value),
                checked
            ));
        }
        html.push_str(&format!(
            "<li class=\"ripple tag-filter-clear\">{}</li></ul></div></div>",
            crate::data::templates::escape_html(&self.clear_text)
        ));
        html
    }
}

/// The three filter buttons of one marker collection
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBar {
    buttons: Vec<TagFilterButton>,
    /// Layer id of the collection the filters apply to
    bound_to: Option<String>,
}

impl FilterBar {
    /// Buttons with no values, as before the first fetch
    pub fn empty() -> Self {
        Self::from_values(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn from_values(
        types: Vec<String>,
        states: Vec<String>,
        accessibility: Vec<String>,
    ) -> Self {
        Self {
            buttons: vec![
                TagFilterButton::new(TagAttribute::Type, types),
                TagFilterButton::new(TagAttribute::State, states),
                TagFilterButton::new(TagAttribute::Accessibility, accessibility),
            ],
            bound_to: None,
        }
    }

    /// Collect distinct values of every attribute in first-seen order
    pub fn collect<'a>(tags: impl IntoIterator<Item = &'a MarkerTags>) -> Self {
        let mut types = DistinctValues::new();
        let mut states = DistinctValues::new();
        let mut accessibility = DistinctValues::new();
        for t in tags {
            types.insert(&t.kind);
            states.insert(&t.state);
            accessibility.insert(&t.accessibility);
        }
        Self::from_values(types.into_vec(), states.into_vec(), accessibility.into_vec())
    }

    pub fn bind(&mut self, collection_id: &str) {
        self.bound_to = Some(collection_id.to_string());
    }

    pub fn bound_to(&self) -> Option<&str> {
        self.bound_to.as_deref()
    }

    pub fn buttons(&self) -> &[TagFilterButton] {
        &self.buttons
    }

    pub fn button(&self, attribute: TagAttribute) -> Option<&TagFilterButton> {
        self.buttons.iter().find(|b| b.attribute == attribute)
    }

    fn button_mut(&mut self, attribute: TagAttribute) -> Result<&mut TagFilterButton> {
        self.buttons
            .iter_mut()
            .find(|b| b.attribute == attribute)
            .ok_or_else(|| MapError::Config(format!("no {} filter", attribute)))
    }

    pub fn values(&self, attribute: TagAttribute) -> &[String] {
        self.button(attribute).map(|b| b.values()).unwrap_or(&[])
    }

    /// Click on a button: toggles its popover and closes every other one
    pub fn toggle_popover(&mut self, attribute: TagAttribute) {
        for button in &mut self.buttons {
            if button.attribute == attribute {
                button.open = !button.open;
            } else {
                button.open = false;
            }
        }
    }

    pub fn open_popover(&self) -> Option<TagAttribute> {
        self.buttons.iter().find(|b| b.open).map(|b| b.attribute)
    }

    pub fn toggle(&mut self, attribute: TagAttribute, value: &str) -> Result<bool> {
        self.button_mut(attribute)?.toggle(value)
    }

    pub fn clear(&mut self, attribute: TagAttribute) -> Result<()> {
        self.button_mut(attribute)?.clear();
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.buttons.iter().any(|b| b.is_active())
    }

    /// Untagged markers only pass while no filter is active
    pub fn matches(&self, tags: Option<&MarkerTags>) -> bool {
        match tags {
            Some(tags) => self.buttons.iter().all(|b| b.matches(tags)),
            None => !self.is_active(),
        }
    }

    pub fn to_html(&self) -> String {
        self.buttons.iter().map(|b| b.to_html()).collect()
    }
}

impl Default for FilterBar {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> Vec<MarkerTags> {
        vec![
            MarkerTags::new("cave", "open", "easy"),
            MarkerTags::new("mine", "closed", "hard"),
            MarkerTags::new("cave", "closed", "easy"),
            MarkerTags::new("quarry", "open", "medium"),
        ]
    }

    #[test]
    fn test_collect_keeps_first_seen_order() {
        let bar = FilterBar::collect(&tags());
        assert_eq!(bar.values(TagAttribute::Type), ["cave", "mine", "quarry"]);
        assert_eq!(bar.values(TagAttribute::State), ["open", "closed"]);
        assert_eq!(bar.values(TagAttribute::Accessibility), ["easy", "hard", "medium"]);
    }

    #[test]
    fn test_empty_selection_matches_everything() {
        let bar = FilterBar::collect(&tags());
        assert!(tags().iter().all(|t| bar.matches(Some(t))));
        assert!(bar.matches(None));
    }

    #[test]
    fn test_or_within_and_across() {
        let all = tags();
        let mut bar = FilterBar::collect(&all);
        bar.toggle(TagAttribute::Type, "cave").unwrap();
        bar.toggle(TagAttribute::Type, "quarry").unwrap();
        bar.toggle(TagAttribute::State, "open").unwrap();

        let shown: Vec<bool> = all.iter().map(|t| bar.matches(Some(t))).collect();
        assert_eq!(shown, vec![true, false, false, true]);
        assert!(!bar.matches(None));
    }

    #[test]
    fn test_toggle_twice_and_reset() {
        let mut bar = FilterBar::collect(&tags());
        assert!(bar.toggle(TagAttribute::State, "open").unwrap());
        assert!(!bar.toggle(TagAttribute::State, "open").unwrap());
        bar.toggle(TagAttribute::State, "closed").unwrap();
        bar.clear(TagAttribute::State).unwrap();
        assert!(!bar.is_active());
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let mut bar = FilterBar::collect(&tags());
        assert!(matches!(
            bar.toggle(TagAttribute::Type, "castle"),
            Err(MapError::Config(_))
        ));
    }

    #[test]
    fn test_popovers_are_mutually_exclusive() {
        let mut bar = FilterBar::empty();
        bar.toggle_popover(TagAttribute::Type);
        assert_eq!(bar.open_popover(), Some(TagAttribute::Type));

        bar.toggle_popover(TagAttribute::Accessibility);
        assert_eq!(bar.open_popover(), Some(TagAttribute::Accessibility));
        assert!(!bar.button(TagAttribute::Type).unwrap().is_open());

        bar.toggle_popover(TagAttribute::Accessibility);
        assert_eq!(bar.open_popover(), None);
    }

    #[test]
    fn test_html_has_container_class_and_reset() {
        let bar = FilterBar::collect(&tags());
        let html = bar.button(TagAttribute::Type).unwrap().to_html();
        assert!(html.contains("tag-filter-tags-container"));
        assert!(html.contains(">Reset<"));
        assert!(html.contains("value=\"quarry\""));
    }
}
