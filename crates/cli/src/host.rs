//! Terminal stand-ins for the browser pieces the login flow drives.

use std::fmt::Write as _;

use {
    tracing::{debug, warn},
    url::Url,
    weblib_common::{Item, ItemList},
    weblib_oauth::{BrowserContext, ItemRenderer, Popup},
};

const DESCRIPTION_WIDTH: usize = 160;

/// Opens provider pages in the user's default browser.
pub struct SystemBrowser;

/// The provider window closes itself once the callback page loads.
struct BrowserTab;

impl Popup for BrowserTab {
    fn close(&self) {
        debug!("provider window closes itself after the callback");
    }
}

impl BrowserContext for SystemBrowser {
    fn open_popup(&self, url: &Url) -> Option<Box<dyn Popup>> {
        match open::that(url.as_str()) {
            Ok(()) => {
                eprintln!("Continue signing in in your browser.");
                Some(Box::new(BrowserTab))
            },
            Err(e) => {
                warn!(error = %e, "could not open browser");
                None
            },
        }
    }

    fn navigate(&self, url: &Url) {
        if let Err(e) = open::that(url.as_str()) {
            warn!(error = %e, "could not open browser");
            eprintln!("Open {url} to finish signing out.");
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Prints session lists as text cards on stdout.
pub struct TerminalRenderer {
    /// Backend origin that cached thumbnail paths are resolved against.
    base_url: String,
}

impl TerminalRenderer {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ItemRenderer for TerminalRenderer {
    fn set_logged_in(&self, logged_in: bool) {
        if logged_in {
            println!("Logged in.");
        } else {
            println!("Logged out.");
        }
    }

    fn clear_list(&self, list: ItemList) {
        println!("\n== {} ==", list_title(list));
    }

    fn append_item(&self, _list: ItemList, item: &Item) {
        println!("{}", render_card(item, &self.base_url));
    }
}

fn list_title(list: ItemList) -> &'static str {
    match list {
        ItemList::Saved => "Saved",
        ItemList::RecentlyViewed => "Recently viewed",
        ItemList::RecentlySearched => "Recently searched",
        ItemList::SearchResults => "Results",
    }
}

/// Format one item as a few indented lines. Server-relative thumbnail paths
/// are prefixed with `base_url`.
#[must_use]
pub fn render_card(item: &Item, base_url: &str) -> String {
    let marker = if item.saved { '*' } else { ' ' };
    let mut card = format!("[{marker}] {}  ({})", item.title, item.id);

    let description = item.description.trim();
    if !description.is_empty() {
        let _ = write!(card, "\n    {}", truncate(description, DESCRIPTION_WIDTH));
    }
    if let Some(thumb) = item.thumbnail() {
        if thumb.starts_with('/') {
            let _ = write!(card, "\n    Thumbnail: {base_url}{thumb}");
        } else {
            let _ = write!(card, "\n    Thumbnail: {thumb}");
        }
    }
    if let Some(source) = item.resolved_source() {
        if source.name.is_empty() {
            let _ = write!(card, "\n    Source: {}", source.url);
        } else {
            let _ = write!(card, "\n    Source: {} <{}>", source.name, source.url);
        }
    }
    card
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, weblib_common::ItemSource};

    const BASE: &str = "http://localhost:5000";

    fn item() -> Item {
        serde_json::from_value(serde_json::json!({
            "id": "42",
            "title": "Rust (programming language)",
            "description": "A general-purpose language.",
        }))
        .unwrap()
    }

    #[test]
    fn card_shows_title_and_description() {
        let card = render_card(&item(), BASE);
        assert_eq!(
            card,
            "[ ] Rust (programming language)  (42)\n    A general-purpose language."
        );
    }

    #[test]
    fn saved_items_are_marked() {
        let mut item = item();
        item.saved = true;
        assert!(render_card(&item, BASE).starts_with("[*] "));
    }

    #[test]
    fn card_uses_either_source_shape() {
        let mut nested = item();
        nested.source = Some(ItemSource {
            url: "https://en.wikipedia.org/wiki/Rust".into(),
            name: "Wikipedia".into(),
        });
        let card = render_card(&nested, BASE);
        assert!(card.ends_with("Source: Wikipedia <https://en.wikipedia.org/wiki/Rust>"));

        let mut flat = item();
        flat.source_url = Some("https://example.org/a".into());
        assert!(render_card(&flat, BASE).ends_with("Source: https://example.org/a"));
    }

    #[test]
    fn thumbnails_resolve_against_backend() {
        let mut cached = item();
        cached.thumb_ext = Some("jpg".into());
        assert!(render_card(&cached, BASE).contains(
            "\n    Thumbnail: http://localhost:5000/static/cache/42/thumb.jpg"
        ));

        let mut remote = item();
        remote.thumb_url = Some("https://upload.wikimedia.org/rust.png".into());
        let card = render_card(&remote, BASE);
        assert!(card.contains("\n    Thumbnail: https://upload.wikimedia.org/rust.png"));
    }

    #[test]
    fn long_descriptions_are_truncated_on_char_boundaries() {
        let text = "é".repeat(200);
        let cut = truncate(&text, DESCRIPTION_WIDTH);
        assert_eq!(cut.chars().count(), DESCRIPTION_WIDTH + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short", DESCRIPTION_WIDTH), "short");
    }
}
