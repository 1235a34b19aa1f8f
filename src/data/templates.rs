//! HTML fragments for popups, galleries and feature info

use crate::{
    core::constants::LOCATION_DETAIL_PATH,
    data::location::{LocationRecord, Photo},
};

/// Escape text for use inside HTML element content or a quoted attribute
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Popup body of a location marker: image, linked name, clamped description
pub fn location_popup_html(record: &LocationRecord) -> String {
    format!(
        "<div style=\"min-width: 200px\">\
         <img src=\"{image}\" style=\"width: 100%\">\
         <h4 class=\"mt-2\"><a href=\"{path}/{id}\">{name}</a></h4>\
         <p class=\"overflow-hidden\" style=\"display: -webkit-box; -webkit-box-orient: vertical; -webkit-line-clamp: 4;\">{description}</p>\
         </div>",
        image = escape_html(&record.image),
        path = LOCATION_DETAIL_PATH,
        id = record.id,
        name = escape_html(&record.name),
        description = escape_html(&record.description),
    )
}

/// Thumbnails linking to the full photos, grouped for the lightbox of `scope`
pub fn gallery_html(scope: &str, photos: &[Photo]) -> String {
    photos
        .iter()
        .map(|photo| {
            format!(
                "<a href=\"{}\" data-lightbox=\"{}\" data-title=\"{}\"><img src=\"{}\" alt=\"{}\"></a>",
                escape_html(&photo.url),
                escape_html(scope),
                escape_html(&photo.title),
                escape_html(&photo.thumbnail),
                escape_html(&photo.title),
            )
        })
        .collect()
}

/// Titled table of labelled values; empty values are left out
pub fn feature_table_html(title: &str, rows: &[(&str, String)]) -> String {
    let mut html = format!("<h5>{}</h5><table class=\"table table-sm\">", escape_html(title));
    for (label, value) in rows.iter().filter(|(_, v)| !v.is_empty()) {
        html.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>",
            escape_html(label),
            escape_html(value)
        ));
    }
    html.push_str("</table>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LocationRecord {
        LocationRecord {
            id: 1,
            name: "Cave A".to_string(),
            latitude: Some(49.5),
            longitude: Some(16.7),
            description: "Limestone cave".to_string(),
            image: "/img/a.jpg".to_string(),
            kind: "cave".to_string(),
            state: "open".to_string(),
            accessibility: "easy".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_location_popup_links_detail_page() {
        let html = location_popup_html(&record());
        assert!(html.contains("<a href=\"/location/1\">Cave A</a>"));
        assert!(html.contains("Limestone cave"));
        assert!(html.contains("src=\"/img/a.jpg\""));
    }

    #[test]
    fn test_gallery_groups_by_scope() {
        let photos = vec![Photo {
            url: "https://example.org/1.jpg".into(),
            title: "Adit".into(),
            thumbnail: "https://example.org/1_t.jpg".into(),
        }];
        let html = gallery_html("popup-3", &photos);
        assert!(html.contains("data-lightbox=\"popup-3\""));
        assert!(html.contains("<img src=\"https://example.org/1_t.jpg\" alt=\"Adit\">"));
        assert_eq!(gallery_html("popup-3", &[]), "");
    }

    #[test]
    fn test_feature_table_skips_empty_values() {
        let html = feature_table_html("Cave", &[("Name", "Macocha".into()), ("Length", String::new())]);
        assert!(html.contains("<th>Name</th><td>Macocha</td>"));
        assert!(!html.contains("Length"));
    }
}
