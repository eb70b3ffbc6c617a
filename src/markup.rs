use regex::Regex;
use std::sync::OnceLock;

pub fn link_markup(text: &str, url: &str) -> String {
    format!("[{text}]({url})")
}

/// Placeholder line for an attachment. Only the id goes into the note; the
/// payload stays in the attachment collection.
pub fn image_placeholder(id: &str) -> String {
    format!("\n![Image]({id})\n")
}

pub fn referenced_image_ids(text: &str) -> Vec<&str> {
    static RE_IMAGE: OnceLock<Regex> = OnceLock::new();
    let re_image = RE_IMAGE.get_or_init(|| Regex::new(r"!\[Image\]\(([^)\s]+)\)").unwrap());

    re_image
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect()
}
