use crate::models::Story;
use crate::storage;
use crate::stories::pipeline;
use crate::sync::SyncClient;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::collections::HashSet;

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub sync: RwSignal<SyncClient>,

    /// Render cache; the localStorage slot stays the source of truth.
    pub stories: RwSignal<Vec<Story>>,

    /// Dismissible banner for best-effort sync failures.
    pub sync_notice: RwSignal<Option<String>>,

    /// Startup fetch guards (one fetch per session, ignore re-entry).
    pub remote_loading: RwSignal<bool>,
    pub remote_loaded_once: RwSignal<bool>,

    /// Story ids with a remote mutation in flight.
    pub inflight_ids: RwSignal<HashSet<String>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            sync: RwSignal::new(SyncClient::load_from_storage()),
            stories: RwSignal::new(storage::load_stories()),
            sync_notice: RwSignal::new(None),
            remote_loading: RwSignal::new(false),
            remote_loaded_once: RwSignal::new(false),
            inflight_ids: RwSignal::new(HashSet::new()),
        }
    }

    /// Persist then publish. The slot write comes first so a render never
    /// shows a list the slot does not hold.
    pub fn commit_stories(&self, stories: Vec<Story>) {
        storage::save_stories(&stories);
        self.stories.set(stories);
    }

    /// Re-read the slot into the cache.
    pub fn reload_stories(&self) {
        self.stories.set(storage::load_stories());
    }

    /// Claims an id for a remote mutation. Returns false when a call for
    /// the same story is still in flight.
    pub fn begin_inflight(&self, id: &str) -> bool {
        let mut claimed = false;
        self.inflight_ids.update(|ids| {
            claimed = ids.insert(id.to_string());
        });
        claimed
    }

    pub fn end_inflight(&self, id: &str) {
        self.inflight_ids.update(|ids| {
            ids.remove(id);
        });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);

/// Best-effort relay create for a story that was already saved locally.
/// On success the returned reference is stamped into the slot; on failure
/// the local copy stands and a notice is posted. Secret stories never
/// leave the device.
pub(crate) fn push_create(app_state: AppContext, story: Story) {
    if pipeline::is_secret(&story) {
        return;
    }

    let sync = app_state.0.sync.get_untracked();
    if !sync.enabled() {
        return;
    }

    spawn_local(async move {
        match sync.create(&story).await {
            Ok(remote_ref) => {
                let mut stories = storage::load_stories();
                if let Some(s) = stories.iter_mut().find(|s| s.id == story.id) {
                    s.remote_ref = Some(remote_ref);
                    storage::save_stories(&stories);
                    app_state.0.reload_stories();
                }
            }
            Err(e) => {
                leptos::logging::warn!("relay create failed: {e}");
                app_state
                    .0
                    .sync_notice
                    .set(Some(format!("Story saved locally; sync failed: {e}")));
            }
        }
    });
}

/// Best-effort relay update. Stories that never synced have no remote
/// reference and are skipped; an edit does not create remotely.
pub(crate) fn push_update(app_state: AppContext, story: Story) {
    if pipeline::is_secret(&story) {
        return;
    }

    let Some(remote_ref) = story.remote_ref.clone() else {
        return;
    };

    let sync = app_state.0.sync.get_untracked();
    if !sync.enabled() {
        return;
    }

    spawn_local(async move {
        if let Err(e) = sync.update(&remote_ref, &story).await {
            leptos::logging::warn!("relay update failed: {e}");
            app_state
                .0
                .sync_notice
                .set(Some(format!("Change saved locally; sync failed: {e}")));
        }
    });
}

/// Startup fetch: once per session, success replaces the non-secret part
/// of the slot, failure leaves local data untouched. Either way the guard
/// latches so navigating back does not refetch.
pub(crate) fn load_remote_stories(app_state: AppContext) {
    if app_state.0.remote_loading.get_untracked() || app_state.0.remote_loaded_once.get_untracked()
    {
        return;
    }

    let sync = app_state.0.sync.get_untracked();
    if !sync.enabled() {
        return;
    }

    app_state.0.remote_loading.set(true);

    spawn_local(async move {
        match sync.fetch_all().await {
            Ok(fetched) => {
                let merged = pipeline::merge_fetched(&storage::load_stories(), fetched);
                app_state.0.commit_stories(merged);
            }
            Err(e) => {
                leptos::logging::warn!("relay fetch failed: {e}");
                app_state
                    .0
                    .sync_notice
                    .set(Some(format!("Could not load stories from the relay: {e}")));
            }
        }

        app_state.0.remote_loaded_once.set(true);
        app_state.0.remote_loading.set(false);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_state() -> AppState {
        // No storage access here; `AppState::new` is wasm-only.
        AppState {
            sync: RwSignal::new(SyncClient::new(None)),
            stories: RwSignal::new(vec![]),
            sync_notice: RwSignal::new(None),
            remote_loading: RwSignal::new(false),
            remote_loaded_once: RwSignal::new(false),
            inflight_ids: RwSignal::new(HashSet::new()),
        }
    }

    #[test]
    fn test_inflight_guard_claims_once_per_id() {
        let state = bare_state();

        assert!(state.begin_inflight("a"));
        assert!(!state.begin_inflight("a"));
        assert!(state.begin_inflight("b"));

        state.end_inflight("a");
        assert!(state.begin_inflight("a"));
    }
}
