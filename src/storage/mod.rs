use crate::models::{SortOrder, Story, ViewMode};
use serde::{Deserialize, Serialize};

/// The whole journal lives in this one slot. Every mutation is
/// read-full-list, transform, write-full-list; the browser event loop
/// serializes access, so there is no locking.
pub(crate) const STORIES_KEY: &str = "storypad_stories";

/// Optional relay base URL; overrides `window.ENV` when present.
pub(crate) const RELAY_URL_KEY: &str = "storypad_relay_url";

// Persisted view preferences (plain strings, not JSON). Secret mode and
// the tag filter are deliberately session-only.
pub(crate) const VIEW_MODE_KEY: &str = "storypad_view_mode";
pub(crate) const SORT_ORDER_KEY: &str = "storypad_sort_order";

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten())?;
    let json = storage.get_item(key).ok().flatten()?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        if let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) {
            let _ = storage.set_item(key, &json);
        }
    }
}

/// An absent, unreadable or corrupt slot is an empty journal, never an
/// error the user sees.
pub(crate) fn load_stories() -> Vec<Story> {
    load_json_from_storage::<Vec<Story>>(STORIES_KEY).unwrap_or_default()
}

pub(crate) fn save_stories(stories: &[Story]) {
    save_json_to_storage(STORIES_KEY, &stories);
}

pub(crate) fn load_relay_url_override() -> Option<String> {
    let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten())?;
    storage
        .get_item(RELAY_URL_KEY)
        .ok()
        .flatten()
        .filter(|s| !s.trim().is_empty())
}

/// An empty or whitespace-only value clears the override.
pub(crate) fn save_relay_url_override(url: &str) {
    if let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            let _ = storage.remove_item(RELAY_URL_KEY);
        } else {
            let _ = storage.set_item(RELAY_URL_KEY, trimmed);
        }
    }
}

pub(crate) fn load_view_mode() -> ViewMode {
    load_str_pref(VIEW_MODE_KEY)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

pub(crate) fn save_view_mode(mode: ViewMode) {
    save_str_pref(VIEW_MODE_KEY, &mode.to_string());
}

pub(crate) fn load_sort_order() -> SortOrder {
    load_str_pref(SORT_ORDER_KEY)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

pub(crate) fn save_sort_order(order: SortOrder) {
    save_str_pref(SORT_ORDER_KEY, &order.to_string());
}

fn load_str_pref(key: &str) -> Option<String> {
    let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten())?;
    storage.get_item(key).ok().flatten()
}

fn save_str_pref(key: &str, value: &str) {
    if let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) {
        let _ = storage.set_item(key, value);
    }
}
