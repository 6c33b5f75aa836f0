use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription,
    CardFooter, CardHeader, CardTitle, Input, Label, Separator, Spinner, Textarea,
};
use crate::models::{SortOrder, Story, TagFilter, ViewMode, ViewQuery};
use crate::state::{self, AppContext};
use crate::storage;
use crate::stories::pipeline::{self, ContentLine};
use crate::stories::transfer;
use crate::sync::SyncClient;
use crate::util::{new_story_id, now_iso};
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use wasm_bindgen::JsCast;

/// What the main column of the journal currently shows.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Panel {
    Browse,
    Detail(String),
    Form(FormMode),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum FormMode {
    Create,
    Edit(String),
}

#[component]
pub fn JournalPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let view_mode: RwSignal<ViewMode> = RwSignal::new(storage::load_view_mode());
    let sort_order: RwSignal<SortOrder> = RwSignal::new(storage::load_sort_order());
    let secret_mode: RwSignal<bool> = RwSignal::new(false);
    let filter: RwSignal<TagFilter> = RwSignal::new(TagFilter::All);
    let panel: RwSignal<Panel> = RwSignal::new(Panel::Browse);

    let form_title: RwSignal<String> = RwSignal::new(String::new());
    let form_content: RwSignal<String> = RwSignal::new(String::new());
    let form_tags: RwSignal<String> = RwSignal::new(String::new());
    let form_error: RwSignal<Option<String>> = RwSignal::new(None);
    let title_ref: NodeRef<html::Input> = NodeRef::new();

    let delete_confirm: RwSignal<Option<Story>> = RwSignal::new(None);
    let delete_loading: RwSignal<bool> = RwSignal::new(false);
    let delete_error: RwSignal<Option<String>> = RwSignal::new(None);

    // One relay fetch per session; the guard lives in AppState.
    Effect::new(move |_| {
        state::load_remote_stories(app_state);
    });

    // Focus the title field whenever the form panel opens.
    Effect::new(move |_| {
        if matches!(panel.get(), Panel::Form(_)) {
            if let Some(input) = title_ref.get() {
                let _ = input.focus();
            }
        }
    });

    let open_create = move |_ev: web_sys::MouseEvent| {
        form_title.set(String::new());
        form_content.set(String::new());
        form_tags.set(String::new());
        form_error.set(None);
        panel.set(Panel::Form(FormMode::Create));
    };

    let open_detail = Callback::new(move |id: String| {
        panel.set(Panel::Detail(id));
    });

    let open_edit = Callback::new(move |id: String| {
        let Some(story) = app_state
            .0
            .stories
            .get_untracked()
            .into_iter()
            .find(|s| s.id == id)
        else {
            return;
        };
        form_title.set(story.title);
        form_content.set(story.content);
        form_tags.set(story.tags.join(", "));
        form_error.set(None);
        panel.set(Panel::Form(FormMode::Edit(id)));
    });

    let on_submit_form = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let title = form_title.get_untracked();
        let content = form_content.get_untracked();
        if let Err(message) = pipeline::validate_story_input(&title, &content) {
            form_error.set(Some(message));
            return;
        }
        let tags = pipeline::parse_tags_input(&form_tags.get_untracked());

        let Panel::Form(mode) = panel.get_untracked() else {
            return;
        };
        match mode {
            FormMode::Create => {
                let story = Story {
                    id: new_story_id(),
                    title: title.trim().to_string(),
                    content,
                    tags,
                    favorite: false,
                    created_at: now_iso(),
                    remote_ref: None,
                };
                let mut stories = app_state.0.stories.get_untracked();
                pipeline::prepend_story(&mut stories, story.clone());
                app_state.0.commit_stories(stories);
                state::push_create(app_state, story);
                panel.set(Panel::Browse);
            }
            FormMode::Edit(id) => {
                let mut stories = app_state.0.stories.get_untracked();
                if !pipeline::apply_edit(&mut stories, &id, title.trim().to_string(), content, tags)
                {
                    form_error.set(Some("This story no longer exists.".to_string()));
                    return;
                }
                let updated = stories.iter().find(|s| s.id == id).cloned();
                app_state.0.commit_stories(stories);
                if let Some(updated) = updated {
                    state::push_update(app_state, updated);
                }
                panel.set(Panel::Browse);
            }
        }
    };

    let on_toggle_favorite = Callback::new(move |id: String| {
        let mut stories = app_state.0.stories.get_untracked();
        if pipeline::toggle_favorite(&mut stories, &id) {
            let updated = stories.iter().find(|s| s.id == id).cloned();
            app_state.0.commit_stories(stories);
            if let Some(updated) = updated {
                state::push_update(app_state, updated);
            }
        }
    });

    let request_delete = Callback::new(move |id: String| {
        let Some(story) = app_state
            .0
            .stories
            .get_untracked()
            .into_iter()
            .find(|s| s.id == id)
        else {
            return;
        };
        delete_error.set(None);
        delete_confirm.set(Some(story));
    });

    let on_confirm_delete = move |_ev: web_sys::MouseEvent| {
        let Some(story) = delete_confirm.get_untracked() else {
            return;
        };
        if !app_state.0.begin_inflight(&story.id) {
            return;
        }

        let sync = app_state.0.sync.get_untracked();
        let needs_archive = story.remote_ref.is_some() && sync.enabled();

        if pipeline::can_remove_locally(needs_archive, false) {
            let mut stories = app_state.0.stories.get_untracked();
            pipeline::remove_story(&mut stories, &story.id);
            app_state.0.commit_stories(stories);
            app_state.0.end_inflight(&story.id);
            delete_confirm.set(None);
            if panel.get_untracked() == Panel::Detail(story.id.clone()) {
                panel.set(Panel::Browse);
            }
            return;
        }

        // The relay archive must succeed before the local copy goes away.
        let remote_ref = story.remote_ref.clone().unwrap_or_default();
        delete_loading.set(true);
        spawn_local(async move {
            let archive_ok = match sync.archive(&remote_ref).await {
                Ok(()) => true,
                Err(e) => {
                    delete_error.set(Some(format!("Could not archive remotely: {e}")));
                    false
                }
            };

            if pipeline::can_remove_locally(true, archive_ok) {
                let mut stories = storage::load_stories();
                pipeline::remove_story(&mut stories, &story.id);
                app_state.0.commit_stories(stories);
                delete_confirm.set(None);
                if panel.get_untracked() == Panel::Detail(story.id.clone()) {
                    panel.set(Panel::Browse);
                }
            }

            app_state.0.end_inflight(&story.id);
            delete_loading.set(false);
        });
    };

    let on_toggle_view = move |_ev: web_sys::MouseEvent| {
        let next = match view_mode.get_untracked() {
            ViewMode::List => ViewMode::Timeline,
            ViewMode::Timeline => ViewMode::List,
        };
        storage::save_view_mode(next);
        view_mode.set(next);
    };

    let on_toggle_sort = move |_ev: web_sys::MouseEvent| {
        let next = match sort_order.get_untracked() {
            SortOrder::Desc => SortOrder::Asc,
            SortOrder::Asc => SortOrder::Desc,
        };
        storage::save_sort_order(next);
        sort_order.set(next);
    };

    let on_toggle_secret = move |_ev: web_sys::MouseEvent| {
        secret_mode.update(|on| *on = !*on);
    };

    // Esc closes whatever is open: a focused field loses focus first, then
    // the delete overlay, then the side panel. The closure reads page-owned
    // signals, so the listener goes away with the page.
    let key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if ev.key().to_lowercase() != "escape" {
            return;
        }

        let target_tag = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
            .map(|el| el.tag_name().to_lowercase());
        if let Some(tag) = target_tag {
            if tag == "input" || tag == "textarea" {
                if let Some(el) = document()
                    .active_element()
                    .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok())
                {
                    let _ = el.blur();
                }
                return;
            }
        }

        if delete_confirm.get_untracked().is_some() {
            if !delete_loading.get_untracked() {
                delete_confirm.set(None);
            }
            return;
        }

        if panel.get_untracked() != Panel::Browse {
            panel.set(Panel::Browse);
        }
    });
    on_cleanup(move || key_handle.remove());

    let sidebar = move || {
        let current = filter.get();
        let tags = pipeline::tag_panel(&app_state.0.stories.get());

        let mut out: Vec<AnyView> = Vec::new();
        for (label, choice) in [
            ("All stories", TagFilter::All),
            ("Favorites", TagFilter::Favorites),
        ] {
            out.push(filter_button(label.to_string(), choice, &current, filter));
        }
        if !tags.cp.is_empty() {
            out.push(section_caption("CP"));
            for choice in tags.cp {
                out.push(filter_button(
                    choice.label,
                    TagFilter::Tag(choice.tag),
                    &current,
                    filter,
                ));
            }
        }
        if !tags.general.is_empty() {
            out.push(section_caption("Tags"));
            for choice in tags.general {
                out.push(filter_button(
                    choice.label,
                    TagFilter::Tag(choice.tag),
                    &current,
                    filter,
                ));
            }
        }
        out
    };

    let panel_view = move || match panel.get() {
        Panel::Browse => {
            let q = ViewQuery {
                secret_mode: secret_mode.get(),
                filter: filter.get(),
                sort: sort_order.get(),
            };
            let stories = app_state.0.stories.get();

            match view_mode.get() {
                ViewMode::List => {
                    let visible = pipeline::visible_stories(&stories, &q);
                    let is_empty = visible.is_empty();

                    let placeholder = view! {
                        <Card
                            class="flex h-36 cursor-pointer items-center justify-center border-dashed transition-colors hover:ring-1 hover:ring-border"
                            on:click=open_create
                        >
                            <div class="flex flex-col items-center gap-2 p-6">
                                <div class="flex h-10 w-10 items-center justify-center rounded-full border border-border bg-background">
                                    <span class="text-lg text-muted-foreground">"+"</span>
                                </div>
                                <div class="text-sm font-medium">"New story"</div>
                            </div>
                        </Card>
                    }
                    .into_any();

                    view! {
                        <div class="space-y-3">
                            <Show when=move || is_empty fallback=|| ().into_view()>
                                <div class="text-sm text-muted-foreground">
                                    "Nothing here. Write the first story."
                                </div>
                            </Show>
                            <div class="grid gap-3 sm:grid-cols-2">
                                {visible
                                    .into_iter()
                                    .map(|story| {
                                        view! {
                                            <StoryCard
                                                story=story
                                                on_open=open_detail
                                                on_edit=open_edit
                                                on_toggle_favorite=on_toggle_favorite
                                                on_delete=request_delete
                                            />
                                        }
                                        .into_any()
                                    })
                                    .chain(std::iter::once(placeholder))
                                    .collect_view()}
                            </div>
                        </div>
                    }
                    .into_any()
                }
                ViewMode::Timeline => {
                    let sections = pipeline::timeline_sections(&stories, &q);
                    let is_empty = sections.is_empty();

                    view! {
                        <div class="space-y-4">
                            <Show when=move || is_empty fallback=|| ().into_view()>
                                <div class="text-sm text-muted-foreground">
                                    "No stories in this view."
                                </div>
                            </Show>
                            {sections
                                .into_iter()
                                .map(|section| {
                                    view! {
                                        <div class="space-y-2">
                                            <div class="flex items-center gap-2">
                                                <div class="shrink-0 text-xs font-medium text-muted-foreground">
                                                    {section.date}
                                                </div>
                                                <Separator class="flex-1" />
                                            </div>
                                            <div class="grid gap-3 sm:grid-cols-2">
                                                {section
                                                    .stories
                                                    .into_iter()
                                                    .map(|story| {
                                                        view! {
                                                            <StoryCard
                                                                story=story
                                                                on_open=open_detail
                                                                on_edit=open_edit
                                                                on_toggle_favorite=on_toggle_favorite
                                                                on_delete=request_delete
                                                            />
                                                        }
                                                        .into_any()
                                                    })
                                                    .collect_view()}
                                            </div>
                                        </div>
                                    }
                                    .into_any()
                                })
                                .collect_view()}
                        </div>
                    }
                    .into_any()
                }
            }
        }
        Panel::Detail(id) => {
            let Some(story) = app_state
                .0
                .stories
                .get()
                .into_iter()
                .find(|s| s.id == id)
            else {
                return view! {
                    <div class="flex flex-col items-start gap-3">
                        <div class="text-sm text-muted-foreground">"This story is gone."</div>
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            on:click=move |_| panel.set(Panel::Browse)
                        >
                            "Back"
                        </Button>
                    </div>
                }
                .into_any();
            };

            let date = pipeline::date_key(&story.created_at);
            let lines = pipeline::content_lines(&story.content);
            let favorite = story.favorite;
            let star_fill = if favorite { "currentColor" } else { "none" };
            let star_class = if favorite {
                "text-amber-500"
            } else {
                "text-muted-foreground"
            };
            let star_title = if favorite {
                "Remove from favorites"
            } else {
                "Add to favorites"
            };
            let id_for_fav = story.id.clone();
            let id_for_edit = story.id.clone();
            let id_for_delete = story.id.clone();

            view! {
                <Card class="w-full">
                    <CardHeader class="w-full">
                        <div class="flex w-full items-start justify-between gap-2">
                            <CardTitle class="min-w-0 flex-1 text-lg">{story.title.clone()}</CardTitle>
                            <Button
                                variant=ButtonVariant::Ghost
                                size=ButtonSize::Icon
                                class=star_class
                                attr:title=star_title
                                on:click=move |_| on_toggle_favorite.run(id_for_fav.clone())
                            >
                                <svg
                                    xmlns="http://www.w3.org/2000/svg"
                                    width="16"
                                    height="16"
                                    viewBox="0 0 24 24"
                                    fill=star_fill
                                    stroke="currentColor"
                                    stroke-width="2"
                                    stroke-linecap="round"
                                    stroke-linejoin="round"
                                    aria-hidden="true"
                                >
                                    <polygon points="12 2 15.09 8.26 22 9.27 17 14.14 18.18 21.02 12 17.77 5.82 21.02 7 14.14 2 9.27 8.91 8.26 12 2" />
                                </svg>
                            </Button>
                        </div>
                        <CardDescription>{date}</CardDescription>
                        <div class="flex flex-wrap gap-1">
                            {story
                                .tags
                                .iter()
                                .map(|tag| {
                                    view! {
                                        <span class="rounded-full border border-border bg-muted px-2 py-0.5 text-[10px] text-muted-foreground">
                                            {tag.clone()}
                                        </span>
                                    }
                                })
                                .collect_view()}
                        </div>
                    </CardHeader>
                    <CardContent class="w-full space-y-1">
                        {lines
                            .into_iter()
                            .map(|line| match line {
                                ContentLine::Emphasis(text) => view! {
                                    <div class="text-base font-semibold leading-relaxed">{text}</div>
                                }
                                .into_any(),
                                ContentLine::Plain(text) => view! {
                                    <div class="min-h-5 text-sm leading-relaxed">{text}</div>
                                }
                                .into_any(),
                            })
                            .collect_view()}
                    </CardContent>
                    <CardFooter class="w-full justify-between">
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Sm
                            on:click=move |_| panel.set(Panel::Browse)
                        >
                            "Back"
                        </Button>
                        <div class="flex items-center gap-2">
                            <Button
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                on:click=move |_| open_edit.run(id_for_edit.clone())
                            >
                                "Edit"
                            </Button>
                            <Button
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                class="border-destructive/40 text-destructive"
                                on:click=move |_| request_delete.run(id_for_delete.clone())
                            >
                                "Delete"
                            </Button>
                        </div>
                    </CardFooter>
                </Card>
            }
            .into_any()
        }
        Panel::Form(mode) => {
            let heading = match &mode {
                FormMode::Create => "New story",
                FormMode::Edit(_) => "Edit story",
            };

            view! {
                <Card class="w-full">
                    <CardHeader class="w-full">
                        <CardTitle>{heading}</CardTitle>
                        <CardDescription>
                            "Tags are free-form, separated by commas or spaces. Tag a story secret to keep it on this device only."
                        </CardDescription>
                    </CardHeader>
                    <CardContent class="w-full">
                        <form class="flex flex-col gap-3" on:submit=on_submit_form>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="story-title">"Title"</Label>
                                <Input
                                    id="story-title"
                                    bind_value=form_title
                                    node_ref=title_ref
                                    placeholder="A day worth keeping"
                                />
                            </div>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="story-content">"Story"</Label>
                                <Textarea id="story-content" bind_value=form_content rows=8 />
                            </div>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="story-tags">"Tags"</Label>
                                <Input
                                    id="story-tags"
                                    bind_value=form_tags
                                    placeholder="travel, CP:alps"
                                />
                            </div>
                            {move || {
                                form_error
                                    .get()
                                    .map(|message| {
                                        view! {
                                            <Alert class="border-destructive/30">
                                                <AlertDescription class="text-destructive text-xs">
                                                    {message}
                                                </AlertDescription>
                                            </Alert>
                                        }
                                    })
                            }}
                            <div class="flex items-center justify-end gap-2">
                                <Button
                                    variant=ButtonVariant::Outline
                                    size=ButtonSize::Sm
                                    attr:r#type="button"
                                    on:click=move |_| panel.set(Panel::Browse)
                                >
                                    "Cancel"
                                </Button>
                                <Button size=ButtonSize::Sm>"Save"</Button>
                            </div>
                        </form>
                    </CardContent>
                </Card>
            }
            .into_any()
        }
    };

    view! {
        <div class="min-h-screen bg-background text-foreground">
            <div class="mx-auto flex min-h-screen w-full max-w-5xl flex-col gap-4 px-4 py-6">
                <header class="flex flex-wrap items-center justify-between gap-3">
                    <div class="flex items-center gap-2">
                        <h1 class="text-xl font-semibold">"Storypad"</h1>
                        <Show when=move || secret_mode.get() fallback=|| ().into_view()>
                            <span class="rounded-full border border-border bg-muted px-2 py-0.5 text-xs text-muted-foreground">
                                "Secret"
                            </span>
                        </Show>
                    </div>
                    <div class="flex flex-wrap items-center gap-2">
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Icon
                            class="h-8 w-8"
                            attr:title=move || {
                                if secret_mode.get() {
                                    "Hide secret stories"
                                } else {
                                    "Show secret stories"
                                }
                            }
                            on:click=on_toggle_secret
                        >
                            {move || {
                                if secret_mode.get() {
                                    view! {
                                        <svg
                                            xmlns="http://www.w3.org/2000/svg"
                                            width="16"
                                            height="16"
                                            viewBox="0 0 24 24"
                                            fill="none"
                                            stroke="currentColor"
                                            stroke-width="2"
                                            stroke-linecap="round"
                                            stroke-linejoin="round"
                                            aria-hidden="true"
                                        >
                                            <path d="M4 4l16 16" />
                                            <path d="M10.58 6.2A9.9 9.9 0 0 1 12 6c6.5 0 10 6 10 6a17.5 17.5 0 0 1-2.83 3.42" />
                                            <path d="M6.61 6.61A17.6 17.6 0 0 0 2 12s3.5 6 10 6a9.9 9.9 0 0 0 3.39-.61" />
                                        </svg>
                                    }
                                    .into_any()
                                } else {
                                    view! {
                                        <svg
                                            xmlns="http://www.w3.org/2000/svg"
                                            width="16"
                                            height="16"
                                            viewBox="0 0 24 24"
                                            fill="none"
                                            stroke="currentColor"
                                            stroke-width="2"
                                            stroke-linecap="round"
                                            stroke-linejoin="round"
                                            aria-hidden="true"
                                        >
                                            <path d="M2 12s3.5-6 10-6 10 6 10 6-3.5 6-10 6-10-6-10-6Z" />
                                            <circle cx="12" cy="12" r="3" />
                                        </svg>
                                    }
                                    .into_any()
                                }
                            }}
                        </Button>
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            attr:title="Switch view"
                            on:click=on_toggle_view
                        >
                            {move || {
                                if view_mode.get() == ViewMode::List {
                                    "Timeline view"
                                } else {
                                    "List view"
                                }
                            }}
                        </Button>
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            attr:title="Flip sort order"
                            on:click=on_toggle_sort
                        >
                            {move || {
                                if sort_order.get() == SortOrder::Desc {
                                    "Newest first"
                                } else {
                                    "Oldest first"
                                }
                            }}
                        </Button>
                        <Button variant=ButtonVariant::Outline size=ButtonSize::Sm href="/settings">
                            "Settings"
                        </Button>
                        <Button size=ButtonSize::Sm on:click=open_create>
                            "New story"
                        </Button>
                    </div>
                </header>

                {move || {
                    app_state
                        .0
                        .sync_notice
                        .get()
                        .map(|message| {
                            view! {
                                <Alert>
                                    <AlertDescription class="flex w-full items-center justify-between gap-2 text-xs">
                                        <span>{message}</span>
                                        <Button
                                            variant=ButtonVariant::Ghost
                                            size=ButtonSize::Icon
                                            class="h-6 w-6"
                                            attr:title="Dismiss"
                                            on:click=move |_| app_state.0.sync_notice.set(None)
                                        >
                                            "\u{00d7}"
                                        </Button>
                                    </AlertDescription>
                                </Alert>
                            }
                        })
                }}

                <Show when=move || app_state.0.remote_loading.get() fallback=|| ().into_view()>
                    <div class="flex items-center gap-2 text-xs text-muted-foreground">
                        <Spinner />
                        "Loading stories from the relay..."
                    </div>
                </Show>

                <div class="flex flex-1 items-start gap-4">
                    <aside class="w-52 shrink-0">
                        <Card class="gap-2 py-3">
                            <CardContent class="flex w-full flex-col gap-1 px-2">{sidebar}</CardContent>
                        </Card>
                    </aside>
                    <main class="min-w-0 flex-1">{panel_view}</main>
                </div>
            </div>

            <Show when=move || delete_confirm.get().is_some() fallback=|| ().into_view()>
                <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/30 px-4">
                    <div class="w-full max-w-sm rounded-md border border-border bg-background p-4 shadow-lg">
                        <div class="mb-2 text-sm font-medium text-destructive">"Delete story"</div>
                        <div class="mb-3 text-xs text-muted-foreground">
                            {move || {
                                let needs_archive = delete_confirm
                                    .get()
                                    .map(|s| s.remote_ref.is_some())
                                    .unwrap_or(false)
                                    && app_state.0.sync.get().enabled();
                                if needs_archive {
                                    "The story is archived on the relay first; it stays put if that fails."
                                } else {
                                    "This removes the story from this device."
                                }
                            }}
                        </div>
                        <div class="mb-3 rounded-md border border-border bg-muted px-3 py-2 text-sm">
                            {move || delete_confirm.get().map(|s| s.title)}
                        </div>
                        {move || {
                            delete_error
                                .get()
                                .map(|message| {
                                    view! {
                                        <Alert class="mb-3 border-destructive/30">
                                            <AlertDescription class="text-destructive text-xs">
                                                {message}
                                            </AlertDescription>
                                        </Alert>
                                    }
                                })
                        }}
                        <div class="flex items-center justify-end gap-2">
                            <Button
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                attr:disabled=move || delete_loading.get()
                                on:click=move |_| delete_confirm.set(None)
                            >
                                "Cancel"
                            </Button>
                            <Button
                                variant=ButtonVariant::Destructive
                                size=ButtonSize::Sm
                                attr:disabled=move || delete_loading.get()
                                on:click=on_confirm_delete
                            >
                                <span class="inline-flex items-center gap-2">
                                    <Show when=move || delete_loading.get() fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || if delete_loading.get() { "Deleting..." } else { "Delete" }}
                                </span>
                            </Button>
                        </div>
                    </div>
                </div>
            </Show>
        </div>
    }
}

fn section_caption(text: &'static str) -> AnyView {
    view! {
        <div class="flex items-center gap-2 px-1 pt-2">
            <div class="text-xs font-medium text-muted-foreground">{text}</div>
            <Separator class="flex-1" />
        </div>
    }
    .into_any()
}

fn filter_button(
    label: String,
    choice: TagFilter,
    current: &TagFilter,
    filter: RwSignal<TagFilter>,
) -> AnyView {
    let is_selected = *current == choice;
    let variant = if is_selected {
        ButtonVariant::Accent
    } else {
        ButtonVariant::Ghost
    };

    view! {
        <Button
            variant=variant
            size=ButtonSize::Sm
            class="w-full min-w-0 justify-start"
            attr:aria-current=move || if is_selected { Some("true") } else { None }
            on:click=move |_| filter.set(choice.clone())
        >
            <span class="min-w-0 flex-1 truncate text-left">{label}</span>
        </Button>
    }
    .into_any()
}

#[component]
fn StoryCard(
    story: Story,
    on_open: Callback<String>,
    on_edit: Callback<String>,
    on_toggle_favorite: Callback<String>,
    on_delete: Callback<String>,
) -> impl IntoView {
    let id = StoredValue::new(story.id.clone());
    let date = pipeline::date_key(&story.created_at);
    let preview: Vec<ContentLine> = pipeline::content_lines(&story.content)
        .into_iter()
        .take(2)
        .collect();
    let title = story.title.clone();
    let tags = story.tags.clone();

    let favorite = story.favorite;
    let star_fill = if favorite { "currentColor" } else { "none" };
    let star_class = if favorite {
        "h-7 w-7 text-amber-500"
    } else {
        "h-7 w-7 text-muted-foreground opacity-60 hover:opacity-100"
    };
    let star_title = if favorite {
        "Remove from favorites"
    } else {
        "Add to favorites"
    };

    view! {
        <Card
            class="group relative cursor-pointer gap-2 py-4 transition-colors hover:ring-1 hover:ring-border"
            on:click=move |_| on_open.run(id.get_value())
        >
            <CardHeader class="w-full px-4">
                <div class="flex w-full items-start justify-between gap-2">
                    <CardTitle class="min-w-0 flex-1 truncate text-sm">{title}</CardTitle>
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Icon
                        class=star_class
                        attr:title=star_title
                        on:click=move |ev: web_sys::MouseEvent| {
                            ev.stop_propagation();
                            on_toggle_favorite.run(id.get_value());
                        }
                    >
                        <svg
                            xmlns="http://www.w3.org/2000/svg"
                            width="16"
                            height="16"
                            viewBox="0 0 24 24"
                            fill=star_fill
                            stroke="currentColor"
                            stroke-width="2"
                            stroke-linecap="round"
                            stroke-linejoin="round"
                            aria-hidden="true"
                        >
                            <polygon points="12 2 15.09 8.26 22 9.27 17 14.14 18.18 21.02 12 17.77 5.82 21.02 7 14.14 2 9.27 8.91 8.26 12 2" />
                        </svg>
                    </Button>
                </div>
                <CardDescription class="text-xs">{date}</CardDescription>
            </CardHeader>
            <CardContent class="w-full space-y-1 px-4 pb-2">
                {preview
                    .into_iter()
                    .map(|line| match line {
                        ContentLine::Emphasis(text) => view! {
                            <div class="truncate text-sm font-medium">{text}</div>
                        }
                        .into_any(),
                        ContentLine::Plain(text) => view! {
                            <div class="truncate text-xs text-muted-foreground">{text}</div>
                        }
                        .into_any(),
                    })
                    .collect_view()}
                <div class="flex flex-wrap gap-1 pt-1">
                    {tags
                        .into_iter()
                        .map(|tag| {
                            view! {
                                <span class="rounded-full border border-border bg-muted px-2 py-0.5 text-[10px] text-muted-foreground">
                                    {tag}
                                </span>
                            }
                        })
                        .collect_view()}
                </div>
            </CardContent>
            <div class="absolute bottom-2 right-2 hidden items-center gap-1 group-hover:flex">
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    class="h-7 w-7"
                    attr:title="Edit"
                    on:click=move |ev: web_sys::MouseEvent| {
                        ev.stop_propagation();
                        on_edit.run(id.get_value());
                    }
                >
                    <svg
                        xmlns="http://www.w3.org/2000/svg"
                        width="16"
                        height="16"
                        viewBox="0 0 24 24"
                        fill="none"
                        stroke="currentColor"
                        stroke-width="2"
                        stroke-linecap="round"
                        stroke-linejoin="round"
                        aria-hidden="true"
                    >
                        <path d="M12 20h9" />
                        <path d="M16.5 3.5a2.121 2.121 0 0 1 3 3L7 19l-4 1 1-4Z" />
                    </svg>
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    class="h-7 w-7 text-destructive"
                    attr:title="Delete"
                    on:click=move |ev: web_sys::MouseEvent| {
                        ev.stop_propagation();
                        on_delete.run(id.get_value());
                    }
                >
                    <svg
                        xmlns="http://www.w3.org/2000/svg"
                        width="16"
                        height="16"
                        viewBox="0 0 24 24"
                        fill="none"
                        stroke="currentColor"
                        stroke-width="2"
                        stroke-linecap="round"
                        stroke-linejoin="round"
                        aria-hidden="true"
                    >
                        <path d="M3 6h18" />
                        <path d="M8 6V4h8v2" />
                        <path d="M19 6l-1 14H6L5 6" />
                        <path d="M10 11v6" />
                        <path d="M14 11v6" />
                    </svg>
                </Button>
            </div>
        </Card>
    }
}

#[component]
pub fn SettingsPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let relay_input: RwSignal<String> =
        RwSignal::new(storage::load_relay_url_override().unwrap_or_default());
    let relay_saved: RwSignal<Option<String>> = RwSignal::new(None);
    let transfer_error: RwSignal<Option<String>> = RwSignal::new(None);
    let transfer_done: RwSignal<Option<String>> = RwSignal::new(None);
    let import_confirm: RwSignal<Option<Vec<Story>>> = RwSignal::new(None);
    let file_ref: NodeRef<html::Input> = NodeRef::new();

    let apply_relay = move |raw: String| {
        storage::save_relay_url_override(&raw);
        app_state.0.sync.set(SyncClient::load_from_storage());
        // Next journal visit refetches against the new relay.
        app_state.0.remote_loaded_once.set(false);
        let message = if raw.trim().is_empty() {
            "Override cleared."
        } else {
            "Relay saved."
        };
        relay_saved.set(Some(message.to_string()));
    };

    let on_save_relay = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        apply_relay(relay_input.get_untracked());
    };

    let on_clear_relay = move |_ev: web_sys::MouseEvent| {
        relay_input.set(String::new());
        apply_relay(String::new());
    };

    let relay_status = move || {
        let sync = app_state.0.sync.get();
        match sync.base_url() {
            Some(url) => format!("Sync is on: {url}"),
            None => "Sync is off: stories stay on this device.".to_string(),
        }
    };

    let on_export = move |_ev: web_sys::MouseEvent| {
        transfer_error.set(None);
        transfer_done.set(None);
        let json = transfer::export_json(&app_state.0.stories.get_untracked());
        if let Err(e) = download_export(&json) {
            transfer_error.set(Some(format!("Export failed: {e:?}")));
        }
    };

    let on_pick_import = move |_ev: web_sys::MouseEvent| {
        if let Some(input) = file_ref.get_untracked() {
            input.click();
        }
    };

    let on_import_file = move |_ev: web_sys::Event| {
        transfer_error.set(None);
        transfer_done.set(None);

        let Some(input) = file_ref.get_untracked() else {
            return;
        };
        let Some(file) = input.files().and_then(|list| list.get(0)) else {
            return;
        };

        let Ok(reader) = web_sys::FileReader::new() else {
            transfer_error.set(Some("Could not read the selected file.".to_string()));
            return;
        };
        let reader_for_onload = reader.clone();
        let onload =
            wasm_bindgen::closure::Closure::once_into_js(move |_ev: web_sys::Event| {
                let text = reader_for_onload
                    .result()
                    .ok()
                    .and_then(|v| v.as_string())
                    .unwrap_or_default();
                match transfer::parse_import(&text) {
                    Ok(stories) => import_confirm.set(Some(stories)),
                    Err(e) => transfer_error.set(Some(e.to_string())),
                }
            });
        reader.set_onload(Some(onload.unchecked_ref()));
        if reader.read_as_text(&file).is_err() {
            transfer_error.set(Some("Could not read the selected file.".to_string()));
        }
        // Allow re-selecting the same file.
        input.set_value("");
    };

    let on_confirm_import = move |_ev: web_sys::MouseEvent| {
        let Some(stories) = import_confirm.get_untracked() else {
            return;
        };
        let count = stories.len();
        let noun = if count == 1 { "story" } else { "stories" };
        app_state.0.commit_stories(stories);
        import_confirm.set(None);
        transfer_done.set(Some(format!("Imported {count} {noun}.")));
    };

    view! {
        <div class="min-h-screen bg-background text-foreground">
            <div class="mx-auto flex w-full max-w-2xl flex-col gap-4 px-4 py-6">
                <header class="flex items-center justify-between gap-3">
                    <a href="/" class="text-sm font-medium text-foreground">
                        "Storypad"
                    </a>
                    <Button variant=ButtonVariant::Outline size=ButtonSize::Sm href="/">
                        "Back to journal"
                    </Button>
                </header>
                <h1 class="text-xl font-semibold">"Settings"</h1>

                <Card class="w-full">
                    <CardHeader class="w-full">
                        <CardTitle>"Sync relay"</CardTitle>
                        <CardDescription>
                            "Stories sync through a relay server that holds the notes-service credential. The browser never sees a token. Leave the field empty to use the deployment's RELAY_URL."
                        </CardDescription>
                    </CardHeader>
                    <CardContent class="w-full">
                        <form class="flex flex-col gap-3" on:submit=on_save_relay>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="relay-url">"Relay URL override"</Label>
                                <Input
                                    id="relay-url"
                                    r#type="url"
                                    bind_value=relay_input
                                    placeholder="https://relay.example.com"
                                    class="h-8 text-sm"
                                />
                            </div>
                            <div class="flex items-center gap-2">
                                <Button size=ButtonSize::Sm>"Save"</Button>
                                <Button
                                    variant=ButtonVariant::Outline
                                    size=ButtonSize::Sm
                                    attr:r#type="button"
                                    on:click=on_clear_relay
                                >
                                    "Clear override"
                                </Button>
                            </div>
                            <div class="text-xs text-muted-foreground">{relay_status}</div>
                            {move || {
                                relay_saved
                                    .get()
                                    .map(|message| {
                                        view! {
                                            <Alert>
                                                <AlertDescription class="text-xs">{message}</AlertDescription>
                                            </Alert>
                                        }
                                    })
                            }}
                        </form>
                    </CardContent>
                </Card>

                <Card class="w-full">
                    <CardHeader class="w-full">
                        <CardTitle>"Backup"</CardTitle>
                        <CardDescription>
                            {move || {
                                let count = app_state.0.stories.get().len();
                                let noun = if count == 1 { "story" } else { "stories" };
                                format!("{count} {noun} on this device.")
                            }}
                        </CardDescription>
                    </CardHeader>
                    <CardContent class="flex w-full flex-col gap-3">
                        <div class="flex items-center gap-2">
                            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_export>
                                "Export JSON"
                            </Button>
                            <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_pick_import>
                                "Import JSON"
                            </Button>
                            <input
                                type="file"
                                accept="application/json,.json"
                                class="hidden"
                                node_ref=file_ref
                                on:change=on_import_file
                            />
                        </div>
                        {move || {
                            transfer_error
                                .get()
                                .map(|message| {
                                    view! {
                                        <Alert class="border-destructive/30">
                                            <AlertDescription class="text-destructive text-xs">
                                                {message}
                                            </AlertDescription>
                                        </Alert>
                                    }
                                })
                        }}
                        {move || {
                            transfer_done
                                .get()
                                .map(|message| {
                                    view! {
                                        <Alert>
                                            <AlertDescription class="text-xs">{message}</AlertDescription>
                                        </Alert>
                                    }
                                })
                        }}
                    </CardContent>
                </Card>
            </div>

            <Show when=move || import_confirm.get().is_some() fallback=|| ().into_view()>
                <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/30 px-4">
                    <div class="w-full max-w-sm rounded-md border border-border bg-background p-4 shadow-lg">
                        <div class="mb-2 text-sm font-medium text-destructive">
                            "Replace local stories"
                        </div>
                        <div class="mb-3 text-xs text-muted-foreground">
                            "Importing replaces everything stored on this device."
                        </div>
                        <div class="mb-2 rounded-md border border-border bg-muted px-3 py-2 text-sm">
                            {move || {
                                let count = app_state.0.stories.get().len();
                                format!("Now on this device: {count}")
                            }}
                        </div>
                        <div class="mb-3 rounded-md border border-border bg-muted px-3 py-2 text-sm">
                            {move || {
                                let count = import_confirm.get().map(|s| s.len()).unwrap_or(0);
                                format!("In the file: {count}")
                            }}
                        </div>
                        <div class="flex items-center justify-end gap-2">
                            <Button
                                variant=ButtonVariant::Outline
                                size=ButtonSize::Sm
                                on:click=move |_| import_confirm.set(None)
                            >
                                "Cancel"
                            </Button>
                            <Button
                                variant=ButtonVariant::Destructive
                                size=ButtonSize::Sm
                                on:click=on_confirm_import
                            >
                                "Replace"
                            </Button>
                        </div>
                    </div>
                </div>
            </Show>
        </div>
    }
}

fn download_export(json: &str) -> Result<(), wasm_bindgen::JsValue> {
    let parts = js_sys::Array::new();
    parts.push(&wasm_bindgen::JsValue::from_str(json));

    let options = web_sys::BlobPropertyBag::new();
    options.set_type("application/json");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor = document()
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(wasm_bindgen::JsValue::from)?;
    anchor.set_href(&url);
    anchor.set_download(transfer::EXPORT_FILE_NAME);

    let body = document()
        .body()
        .ok_or_else(|| wasm_bindgen::JsValue::from_str("document has no body"))?;
    body.append_child(&anchor)?;
    anchor.click();
    let _ = body.remove_child(&anchor);

    web_sys::Url::revoke_object_url(&url)?;
    Ok(())
}
