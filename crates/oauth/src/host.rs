//! Seams to the environment hosting the login flow.

use {url::Url, weblib_common::{Item, ItemList}};

/// A secondary browsing context opened for the provider.
pub trait Popup: Send + Sync {
    fn close(&self);
}

/// The top-level browsing context the controller runs in.
pub trait BrowserContext: Send + Sync {
    /// Open `url` in a new context. `None` means the host refused (pop-up blocked).
    fn open_popup(&self, url: &Url) -> Option<Box<dyn Popup>>;

    /// Send the top-level context to `url`.
    fn navigate(&self, url: &Url);

    /// Show a blocking message to the user.
    fn alert(&self, message: &str);
}

/// Rendering collaborator that owns the item cards.
pub trait ItemRenderer: Send + Sync {
    /// Flip the login control between "LOGIN" and "LOGOUT".
    fn set_logged_in(&self, logged_in: bool);

    /// Remove every card from `list` before it is refilled.
    fn clear_list(&self, list: ItemList);

    fn append_item(&self, list: ItemList, item: &Item);
}
