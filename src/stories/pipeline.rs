use crate::models::{SortOrder, Story, TagFilter, ViewQuery};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Reserved tag: stories carrying it render only in secret mode, and they
/// never leave the device (see the sync helpers in `state`).
pub(crate) const SECRET_TAG: &str = "secret";

/// Tag prefix that forms its own group in the tag panel. The same marker
/// at the start of a content line is a display directive.
pub(crate) const CP_TAG_PREFIX: &str = "CP:";

pub(crate) fn is_secret(story: &Story) -> bool {
    story.tags.iter().any(|t| t == SECRET_TAG)
}

/// Secret partition first, then the tag/favorites filter. Secret mode is
/// a strict mode switch, not an additive reveal: every story renders in
/// exactly one of the two modes.
pub(crate) fn filter_stories(stories: &[Story], query: &ViewQuery) -> Vec<Story> {
    stories
        .iter()
        .filter(|s| is_secret(s) == query.secret_mode)
        .filter(|s| match &query.filter {
            TagFilter::All => true,
            TagFilter::Favorites => s.favorite,
            TagFilter::Tag(tag) => s.tags.iter().any(|t| t == tag),
        })
        .cloned()
        .collect()
}

/// Epoch milliseconds for ordering. Accepts RFC 3339 plus the lenient
/// shapes that show up in hand-edited import files; anything unparseable
/// maps to 0 so garbage sorts deterministically instead of randomly.
pub(crate) fn parse_created_at(raw: &str) -> i64 {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp_millis();
    }

    // Minute-precision stamps like "2024-01-02T10:00Z" are not valid
    // RFC 3339. Read them (and their zone-less cousins) as UTC.
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return dt.and_utc().timestamp_millis();
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return dt.and_utc().timestamp_millis();
        }
    }

    0
}

/// Stable sort on the parsed creation timestamp; ties keep their current
/// order, so toggling the direction twice restores the original list.
pub(crate) fn sort_stories(stories: &mut [Story], order: SortOrder) {
    stories.sort_by(|a, b| {
        let a_ms = parse_created_at(&a.created_at);
        let b_ms = parse_created_at(&b.created_at);
        match order {
            SortOrder::Asc => a_ms.cmp(&b_ms),
            SortOrder::Desc => b_ms.cmp(&a_ms),
        }
    });
}

pub(crate) fn visible_stories(stories: &[Story], query: &ViewQuery) -> Vec<Story> {
    let mut out = filter_stories(stories, query);
    sort_stories(&mut out, query.sort);
    out
}

/// UTC calendar date bucket, "YYYY-MM-DD". The timezone is fixed so a
/// story never hops between timeline sections when the viewer travels.
pub(crate) fn date_key(created_at: &str) -> String {
    let ms = parse_created_at(created_at);
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "1970-01-01".to_string())
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TimelineSection {
    pub date: String,
    pub stories: Vec<Story>,
}

/// Date-grouped rendering of the same filtered list the flat view shows.
/// Sections order by their date string (lexicographic is chronological
/// for "YYYY-MM-DD"), stories inside by full timestamp, both following
/// `query.sort`.
pub(crate) fn timeline_sections(stories: &[Story], query: &ViewQuery) -> Vec<TimelineSection> {
    let mut groups: BTreeMap<String, Vec<Story>> = BTreeMap::new();
    for story in filter_stories(stories, query) {
        groups
            .entry(date_key(&story.created_at))
            .or_default()
            .push(story);
    }

    let mut out: Vec<TimelineSection> = groups
        .into_iter()
        .map(|(date, mut stories)| {
            sort_stories(&mut stories, query.sort);
            TimelineSection { date, stories }
        })
        .collect();

    if query.sort == SortOrder::Desc {
        out.reverse();
    }

    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TagChoice {
    /// Full tag value to filter on.
    pub tag: String,
    /// Panel label; CP entries render without their prefix.
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub(crate) struct TagPanel {
    pub cp: Vec<TagChoice>,
    pub general: Vec<TagChoice>,
}

/// Derived from the unfiltered list so the panel never shrinks to the
/// current selection. Duplicates collapse here and only here; the tag
/// `secret` is never offered as a filter.
pub(crate) fn tag_panel(stories: &[Story]) -> TagPanel {
    let mut distinct: BTreeSet<&str> = BTreeSet::new();
    for story in stories {
        for tag in &story.tags {
            distinct.insert(tag.as_str());
        }
    }

    let mut panel = TagPanel::default();
    for tag in distinct {
        if let Some(rest) = tag.strip_prefix(CP_TAG_PREFIX) {
            panel.cp.push(TagChoice {
                tag: tag.to_string(),
                label: rest.to_string(),
            });
        } else if tag != SECRET_TAG {
            panel.general.push(TagChoice {
                tag: tag.to_string(),
                label: tag.to_string(),
            });
        }
    }

    panel
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ContentLine {
    Emphasis(String),
    Plain(String),
}

/// A leading "CP:" on the first line is a display directive: that line
/// renders emphasized with the marker stripped. Every other line passes
/// through untouched, including blank ones.
pub(crate) fn content_lines(content: &str) -> Vec<ContentLine> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                if let Some(rest) = line.strip_prefix(CP_TAG_PREFIX) {
                    if !rest.is_empty() {
                        return ContentLine::Emphasis(rest.to_string());
                    }
                }
            }
            ContentLine::Plain(line.to_string())
        })
        .collect()
}

/// New stories go to the front; with equal timestamps the stable sort
/// then keeps creation order visible.
pub(crate) fn prepend_story(stories: &mut Vec<Story>, story: Story) {
    stories.insert(0, story);
}

/// Edits touch title/content/tags only; id and createdAt are immutable.
/// Returns false when the id is gone (deleted elsewhere between opening
/// the form and saving).
pub(crate) fn apply_edit(
    stories: &mut [Story],
    id: &str,
    title: String,
    content: String,
    tags: Vec<String>,
) -> bool {
    match stories.iter_mut().find(|s| s.id == id) {
        Some(story) => {
            story.title = title;
            story.content = content;
            story.tags = tags;
            true
        }
        None => false,
    }
}

pub(crate) fn toggle_favorite(stories: &mut [Story], id: &str) -> bool {
    match stories.iter_mut().find(|s| s.id == id) {
        Some(story) => {
            story.favorite = !story.favorite;
            true
        }
        None => false,
    }
}

pub(crate) fn remove_story(stories: &mut Vec<Story>, id: &str) -> bool {
    let before = stories.len();
    stories.retain(|s| s.id != id);
    stories.len() != before
}

/// Title and content must survive trimming; tags and favorite are free.
pub(crate) fn validate_story_input(title: &str, content: &str) -> Result<(), String> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err("Title and content are required.".to_string());
    }
    Ok(())
}

/// Tags come from one free-form field, split on commas and whitespace.
/// Duplicates survive in the stored record; the tag panel collapses them.
pub(crate) fn parse_tags_input(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Local removal must not run ahead of the remote archive: a story that
/// needs archiving stays on the device until the archive call succeeded.
pub(crate) fn can_remove_locally(needs_archive: bool, archive_ok: bool) -> bool {
    !needs_archive || archive_ok
}

/// A successful startup fetch replaces the non-secret portion of the
/// store. Local secret stories never left the device, so they survive; a
/// fetched record with a colliding id wins.
pub(crate) fn merge_fetched(local: &[Story], fetched: Vec<Story>) -> Vec<Story> {
    let fetched_ids: HashSet<String> = fetched.iter().map(|s| s.id.clone()).collect();

    let mut out = fetched;
    out.extend(
        local
            .iter()
            .filter(|s| is_secret(s) && !fetched_ids.contains(&s.id))
            .cloned(),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(id: &str, created_at: &str, tags: &[&str]) -> Story {
        Story {
            id: id.to_string(),
            title: format!("Story {id}"),
            content: format!("Content {id}"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            favorite: false,
            created_at: created_at.to_string(),
            remote_ref: None,
        }
    }

    fn query(secret_mode: bool, filter: TagFilter, sort: SortOrder) -> ViewQuery {
        ViewQuery {
            secret_mode,
            filter,
            sort,
        }
    }

    fn ids(stories: &[Story]) -> Vec<&str> {
        stories.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_secret_partition_hides_secret_stories_by_default() {
        let all = vec![
            story("1", "2024-01-01T00:00:00.000Z", &["secret"]),
            story("2", "2024-01-02T00:00:00.000Z", &["x"]),
        ];

        let visible = filter_stories(&all, &query(false, TagFilter::All, SortOrder::Desc));
        assert_eq!(ids(&visible), vec!["2"]);

        let secret = filter_stories(&all, &query(true, TagFilter::All, SortOrder::Desc));
        assert_eq!(ids(&secret), vec!["1"]);
    }

    #[test]
    fn test_secret_partition_is_disjoint_and_complete() {
        let all = vec![
            story("1", "2024-01-01T00:00:00.000Z", &["secret", "travel"]),
            story("2", "2024-01-02T00:00:00.000Z", &["travel"]),
            story("3", "2024-01-03T00:00:00.000Z", &[]),
            story("4", "2024-01-04T00:00:00.000Z", &["secret"]),
        ];

        let normal = filter_stories(&all, &query(false, TagFilter::All, SortOrder::Asc));
        let secret = filter_stories(&all, &query(true, TagFilter::All, SortOrder::Asc));

        assert_eq!(normal.len() + secret.len(), all.len());
        for s in &normal {
            assert!(!secret.iter().any(|t| t.id == s.id));
        }
    }

    #[test]
    fn test_favorites_filter_keeps_only_favorites() {
        let mut fav = story("1", "2024-01-01T00:00:00.000Z", &["x"]);
        fav.favorite = true;
        let all = vec![fav, story("2", "2024-01-02T00:00:00.000Z", &["x"])];

        let visible = filter_stories(&all, &query(false, TagFilter::Favorites, SortOrder::Desc));
        assert_eq!(ids(&visible), vec!["1"]);
    }

    #[test]
    fn test_tag_filter_matches_exactly_and_case_sensitively() {
        let all = vec![
            story("1", "2024-01-01T00:00:00.000Z", &["travel"]),
            story("2", "2024-01-02T00:00:00.000Z", &["Travel"]),
            story("3", "2024-01-03T00:00:00.000Z", &["travels"]),
        ];

        let visible = filter_stories(
            &all,
            &query(false, TagFilter::Tag("travel".to_string()), SortOrder::Asc),
        );
        assert_eq!(ids(&visible), vec!["1"]);
    }

    #[test]
    fn test_filter_output_is_a_subset_of_input() {
        let all = vec![
            story("1", "2024-01-01T00:00:00.000Z", &["a"]),
            story("2", "2024-01-02T00:00:00.000Z", &["b", "secret"]),
        ];

        let visible = filter_stories(
            &all,
            &query(false, TagFilter::Tag("a".to_string()), SortOrder::Asc),
        );
        for s in &visible {
            assert!(all.iter().any(|orig| orig.id == s.id));
        }
    }

    #[test]
    fn test_sort_desc_puts_newest_first() {
        let all = vec![
            story("old", "2024-01-01T00:00:00.000Z", &[]),
            story("new", "2024-03-01T00:00:00.000Z", &[]),
            story("mid", "2024-02-01T00:00:00.000Z", &[]),
        ];

        let visible = visible_stories(&all, &query(false, TagFilter::All, SortOrder::Desc));
        assert_eq!(ids(&visible), vec!["new", "mid", "old"]);

        let visible = visible_stories(&all, &query(false, TagFilter::All, SortOrder::Asc));
        assert_eq!(ids(&visible), vec!["old", "mid", "new"]);
    }

    #[test]
    fn test_sort_is_stable_so_double_toggle_restores_order() {
        // Three stories share a timestamp; one sits apart.
        let mut list = vec![
            story("a", "2024-01-02T10:00:00.000Z", &[]),
            story("b", "2024-01-02T10:00:00.000Z", &[]),
            story("c", "2024-01-02T10:00:00.000Z", &[]),
            story("d", "2024-01-01T00:00:00.000Z", &[]),
        ];

        sort_stories(&mut list, SortOrder::Desc);
        assert_eq!(ids(&list), vec!["a", "b", "c", "d"]);

        sort_stories(&mut list, SortOrder::Asc);
        sort_stories(&mut list, SortOrder::Desc);
        assert_eq!(ids(&list), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_unparseable_created_at_sorts_as_epoch() {
        let all = vec![
            story("bad", "not a date", &[]),
            story("good", "2024-01-01T00:00:00.000Z", &[]),
        ];

        let visible = visible_stories(&all, &query(false, TagFilter::All, SortOrder::Asc));
        assert_eq!(ids(&visible), vec!["bad", "good"]);

        // Deterministic: same input, same order, every time.
        let again = visible_stories(&all, &query(false, TagFilter::All, SortOrder::Asc));
        assert_eq!(ids(&visible), ids(&again));
    }

    #[test]
    fn test_parse_created_at_accepts_lenient_shapes() {
        assert_eq!(
            parse_created_at("2024-01-02T10:00:00.000Z"),
            parse_created_at("2024-01-02T10:00Z")
        );
        assert_eq!(
            parse_created_at("2024-01-02T00:00:00.000Z"),
            parse_created_at("2024-01-02")
        );
        assert_eq!(parse_created_at(""), 0);
        assert_eq!(parse_created_at("yesterday"), 0);
    }

    #[test]
    fn test_timeline_groups_by_utc_date() {
        let all = vec![
            story("m", "2024-01-02T10:00Z", &[]),
            story("e", "2024-01-02T22:00Z", &[]),
            story("p", "2024-01-01T09:00Z", &[]),
        ];

        let sections = timeline_sections(&all, &query(false, TagFilter::All, SortOrder::Desc));
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].date, "2024-01-02");
        assert_eq!(ids(&sections[0].stories), vec!["e", "m"]);
        assert_eq!(sections[1].date, "2024-01-01");
        assert_eq!(ids(&sections[1].stories), vec!["p"]);

        let sections = timeline_sections(&all, &query(false, TagFilter::All, SortOrder::Asc));
        assert_eq!(sections[0].date, "2024-01-01");
        assert_eq!(ids(&sections[1].stories), vec!["m", "e"]);
    }

    #[test]
    fn test_timeline_respects_the_shared_filter() {
        let mut fav = story("f", "2024-01-02T10:00Z", &[]);
        fav.favorite = true;
        let all = vec![fav, story("n", "2024-01-02T11:00Z", &[])];

        let sections = timeline_sections(&all, &query(false, TagFilter::Favorites, SortOrder::Desc));
        assert_eq!(sections.len(), 1);
        assert_eq!(ids(&sections[0].stories), vec!["f"]);
    }

    #[test]
    fn test_date_key_is_utc_and_tolerates_garbage() {
        assert_eq!(date_key("2024-01-02T22:00Z"), "2024-01-02");
        assert_eq!(date_key("2024-01-02T00:00:00.000Z"), "2024-01-02");
        assert_eq!(date_key("garbage"), "1970-01-01");
    }

    #[test]
    fn test_tag_panel_groups_strip_and_sort() {
        let all = vec![
            story("1", "2024-01-01T00:00:00.000Z", &["CP:zeta", "beach"]),
            story("2", "2024-01-02T00:00:00.000Z", &["CP:alpha", "beach", "secret"]),
            story("3", "2024-01-03T00:00:00.000Z", &["art"]),
        ];

        let panel = tag_panel(&all);

        let cp_labels: Vec<&str> = panel.cp.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(cp_labels, vec!["alpha", "zeta"]);
        // Filter values keep the full tag.
        assert_eq!(panel.cp[0].tag, "CP:alpha");

        let general: Vec<&str> = panel.general.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(general, vec!["art", "beach"]);
    }

    #[test]
    fn test_tag_panel_excludes_secret_and_collapses_duplicates() {
        let all = vec![
            story("1", "2024-01-01T00:00:00.000Z", &["beach", "beach"]),
            story("2", "2024-01-02T00:00:00.000Z", &["beach", "secret"]),
        ];

        let panel = tag_panel(&all);
        assert_eq!(panel.general.len(), 1);
        assert!(panel.general.iter().all(|c| c.tag != "secret"));
    }

    #[test]
    fn test_content_lines_emphasizes_cp_first_line_only() {
        let lines = content_lines("CP:Chapter One\nplain text\nCP:not a directive here");
        assert_eq!(
            lines,
            vec![
                ContentLine::Emphasis("Chapter One".to_string()),
                ContentLine::Plain("plain text".to_string()),
                ContentLine::Plain("CP:not a directive here".to_string()),
            ]
        );
    }

    #[test]
    fn test_content_lines_requires_a_nonempty_directive() {
        // Bare "CP:" is an ordinary line.
        let lines = content_lines("CP:\nrest");
        assert_eq!(lines[0], ContentLine::Plain("CP:".to_string()));

        let lines = content_lines("no directive");
        assert_eq!(lines, vec![ContentLine::Plain("no directive".to_string())]);
    }

    #[test]
    fn test_prepend_apply_edit_and_remove() {
        let mut list = vec![story("1", "2024-01-01T00:00:00.000Z", &["a"])];

        prepend_story(&mut list, story("2", "2024-01-02T00:00:00.000Z", &[]));
        assert_eq!(ids(&list), vec!["2", "1"]);

        let edited = apply_edit(
            &mut list,
            "1",
            "New title".to_string(),
            "New content".to_string(),
            vec!["b".to_string()],
        );
        assert!(edited);
        let s = list.iter().find(|s| s.id == "1").unwrap();
        assert_eq!(s.title, "New title");
        assert_eq!(s.tags, vec!["b".to_string()]);
        // Creation timestamp is untouched by edits.
        assert_eq!(s.created_at, "2024-01-01T00:00:00.000Z");

        assert!(!apply_edit(
            &mut list,
            "missing",
            String::new(),
            String::new(),
            vec![]
        ));

        assert!(remove_story(&mut list, "2"));
        assert!(!remove_story(&mut list, "2"));
        assert_eq!(ids(&list), vec!["1"]);
    }

    #[test]
    fn test_toggle_favorite_flips_in_place() {
        let mut list = vec![story("1", "2024-01-01T00:00:00.000Z", &[])];
        assert!(toggle_favorite(&mut list, "1"));
        assert!(list[0].favorite);
        assert!(toggle_favorite(&mut list, "1"));
        assert!(!list[0].favorite);
        assert!(!toggle_favorite(&mut list, "missing"));
    }

    #[test]
    fn test_validate_story_input_rejects_blank_fields() {
        assert!(validate_story_input("t", "c").is_ok());
        assert!(validate_story_input("  ", "c").is_err());
        assert!(validate_story_input("t", " \n ").is_err());
        assert!(validate_story_input("", "").is_err());
    }

    #[test]
    fn test_parse_tags_input_splits_on_commas_and_whitespace() {
        assert_eq!(
            parse_tags_input("beach, travel  CP:alpha"),
            vec!["beach", "travel", "CP:alpha"]
        );
        assert_eq!(parse_tags_input("  ,, , "), Vec::<String>::new());
        // Duplicates survive.
        assert_eq!(parse_tags_input("a a"), vec!["a", "a"]);
    }

    #[test]
    fn test_can_remove_locally_blocks_on_failed_archive() {
        assert!(can_remove_locally(false, false));
        assert!(can_remove_locally(true, true));
        assert!(!can_remove_locally(true, false));
    }

    #[test]
    fn test_merge_fetched_replaces_non_secret_and_keeps_local_secrets() {
        let local = vec![
            story("keep-secret", "2024-01-01T00:00:00.000Z", &["secret"]),
            story("replaced", "2024-01-02T00:00:00.000Z", &["x"]),
        ];
        let fetched = vec![story("remote-1", "2024-01-03T00:00:00.000Z", &[])];

        let merged = merge_fetched(&local, fetched);
        assert_eq!(ids(&merged), vec!["remote-1", "keep-secret"]);
    }

    #[test]
    fn test_merge_fetched_lets_a_colliding_remote_record_win() {
        let local = vec![story("same-id", "2024-01-01T00:00:00.000Z", &["secret"])];
        let fetched = vec![story("same-id", "2024-02-01T00:00:00.000Z", &[])];

        let merged = merge_fetched(&local, fetched);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].created_at, "2024-02-01T00:00:00.000Z");
    }
}
