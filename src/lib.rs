mod app;
mod components;
mod models;
mod pages;
mod state;
mod storage;
mod stories;
mod sync;
mod util;

use crate::app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(App);
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::models::{SortOrder, Story, ViewMode};
    use crate::pages::JournalPage;
    use crate::state::{AppContext, AppState};
    use crate::storage;
    use leptos::mount::mount_to;
    use leptos::prelude::provide_context;
    use leptos::task::tick;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn local_storage() -> web_sys::Storage {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .unwrap()
    }

    fn document() -> web_sys::Document {
        web_sys::window().unwrap().document().unwrap()
    }

    fn query(selector: &str) -> Option<web_sys::Element> {
        document().query_selector(selector).unwrap()
    }

    fn click(selector: &str) {
        query(selector)
            .unwrap()
            .dyn_into::<web_sys::HtmlElement>()
            .unwrap()
            .click();
    }

    fn press_escape() {
        let init = web_sys::KeyboardEventInit::new();
        init.set_key("Escape");
        let escape =
            web_sys::KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
        web_sys::window().unwrap().dispatch_event(&escape).unwrap();
    }

    /// Fresh host element per test, so assertions never match leftovers or
    /// the test runner's own output.
    fn fresh_host() -> web_sys::HtmlElement {
        let host = document().create_element("div").unwrap();
        document().body().unwrap().append_child(&host).unwrap();
        host.dyn_into().unwrap()
    }

    fn seed_journal(stories: &[Story]) {
        storage::save_stories(stories);
        storage::save_view_mode(ViewMode::List);
        // No relay: the startup fetch must stay out of these tests.
        storage::save_relay_url_override("");
    }

    fn story(id: &str, title: &str) -> Story {
        Story {
            id: id.to_string(),
            title: title.to_string(),
            content: "First line\nSecond line".to_string(),
            tags: vec!["travel".to_string()],
            favorite: false,
            created_at: "2024-01-02T10:00:00Z".to_string(),
            remote_ref: None,
        }
    }

    #[wasm_bindgen_test]
    fn test_stories_slot_roundtrip() {
        let stories = vec![story("a", "Alps"), story("b", "Baltic")];
        storage::save_stories(&stories);
        assert_eq!(storage::load_stories(), stories);
    }

    #[wasm_bindgen_test]
    fn test_corrupt_stories_slot_reads_as_empty() {
        local_storage()
            .set_item(storage::STORIES_KEY, "not json at all")
            .unwrap();
        assert!(storage::load_stories().is_empty());
    }

    #[wasm_bindgen_test]
    fn test_absent_stories_slot_reads_as_empty() {
        local_storage().remove_item(storage::STORIES_KEY).unwrap();
        assert!(storage::load_stories().is_empty());
    }

    #[wasm_bindgen_test]
    fn test_saving_a_loaded_slot_changes_nothing() {
        storage::save_stories(&[story("a", "Alps")]);
        let before = local_storage()
            .get_item(storage::STORIES_KEY)
            .unwrap()
            .unwrap();

        storage::save_stories(&storage::load_stories());
        let after = local_storage()
            .get_item(storage::STORIES_KEY)
            .unwrap()
            .unwrap();

        assert_eq!(before, after);
    }

    #[wasm_bindgen_test]
    fn test_view_prefs_roundtrip() {
        storage::save_view_mode(ViewMode::Timeline);
        storage::save_sort_order(SortOrder::Asc);
        assert_eq!(storage::load_view_mode(), ViewMode::Timeline);
        assert_eq!(storage::load_sort_order(), SortOrder::Asc);
    }

    #[wasm_bindgen_test]
    fn test_relay_override_roundtrip() {
        storage::save_relay_url_override("  https://relay.example.com  ");
        assert_eq!(
            storage::load_relay_url_override().as_deref(),
            Some("https://relay.example.com")
        );

        storage::save_relay_url_override("");
        assert_eq!(storage::load_relay_url_override(), None);
    }

    #[wasm_bindgen_test]
    async fn test_escape_steps_back_to_the_story_grid() {
        seed_journal(&[story("s1", "Ridge day")]);

        let host = fresh_host();
        let page = mount_to(host.clone(), || {
            provide_context(AppContext(AppState::new()));
            JournalPage()
        });
        tick().await;
        assert!(query(".border-dashed").is_some());

        // Form panel: Escape cancels back to the grid.
        click(".border-dashed");
        tick().await;
        assert!(document().get_element_by_id("story-title").is_some());
        // The cancel control must not double as the form's submit button.
        assert!(query("form button[type='button']").is_some());

        press_escape();
        tick().await;
        assert!(document().get_element_by_id("story-title").is_none());
        assert!(query(".border-dashed").is_some());

        // Detail panel: same shortcut, same way out.
        click(".group.cursor-pointer");
        tick().await;
        assert!(host.text_content().unwrap_or_default().contains("Back"));

        press_escape();
        tick().await;
        assert!(!host.text_content().unwrap_or_default().contains("Back"));

        // With the delete overlay up, Escape closes the overlay and keeps
        // both the story and the grid.
        click("button[title='Delete']");
        tick().await;
        assert!(query(".fixed.inset-0").is_some());

        press_escape();
        tick().await;
        assert!(query(".fixed.inset-0").is_none());
        assert!(query(".group.cursor-pointer").is_some());

        drop(page);
        host.remove();
    }

    #[wasm_bindgen_test]
    async fn test_unmount_removes_the_escape_listener() {
        seed_journal(&[story("s1", "Ridge day")]);

        let host = fresh_host();
        let page = mount_to(host.clone(), || {
            provide_context(AppContext(AppState::new()));
            JournalPage()
        });
        tick().await;
        assert!(query(".border-dashed").is_some());

        // Dropping the mount disposes the page's signals. A keydown arriving
        // after that must hit nothing.
        drop(page);
        assert!(query(".border-dashed").is_none());

        press_escape();
        tick().await;

        host.remove();
    }
}
