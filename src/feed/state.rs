use super::query::ArchiveFilters;
use super::types::ContentItem;

/// Which controller operation a phase or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Initialize,
    LoadMore,
    ApplyFilters,
}

/// Lifecycle of one feed.
///
/// ```text
/// Idle ──initialize──▶ InitialLoading ──ok──▶ Ready ──load_more──▶ LoadingMore ──ok──▶ Ready
///                          │   │                 ▲  └─apply_filters─▶ InitialLoading     │
///                          │   └─not found──▶ NotFound                                   │
///                          └──── transport error ──▶ Failed ◀── transport error ─────────┘
/// ```
///
/// `Failed` never discards data that was already loaded; the next
/// successful fetch moves the feed back to `Ready`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    InitialLoading,
    Ready,
    LoadingMore,
    NotFound,
    Failed {
        operation: Operation,
        message: String,
    },
}

/// Everything one feed instance shows: lead items, the paginated extension,
/// and the pagination cursor.
///
/// Owned exclusively by a [`FeedController`](super::FeedController); callers
/// only ever see it by shared reference.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    lead_items: Vec<ContentItem>,
    page_items: Vec<ContentItem>,
    offset: usize,
    has_more: bool,
    phase: Phase,
    filters: Option<ArchiveFilters>,
}

impl FeedState {
    pub fn lead_items(&self) -> &[ContentItem] {
        &self.lead_items
    }

    pub fn page_items(&self) -> &[ContentItem] {
        &self.page_items
    }

    /// Lead items followed by page items, in display order.
    pub fn items(&self) -> impl Iterator<Item = &ContentItem> {
        self.lead_items.iter().chain(self.page_items.iter())
    }

    /// Sum of the lengths of every page the server returned since the last reset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Archive filters the current pages were fetched with.
    pub fn filters(&self) -> Option<&ArchiveFilters> {
        self.filters.as_ref()
    }

    pub fn initial_loading(&self) -> bool {
        self.phase == Phase::InitialLoading
    }

    pub fn loading_more(&self) -> bool {
        self.phase == Phase::LoadingMore
    }

    pub fn is_in_flight(&self) -> bool {
        self.initial_loading() || self.loading_more()
    }

    pub fn is_empty(&self) -> bool {
        self.lead_items.is_empty() && self.page_items.is_empty()
    }

    pub fn last_error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Transitions (controller only)
    // ------------------------------------------------------------------------

    /// New context: everything from the previous context is invalid.
    pub(crate) fn begin_initialize(&mut self) {
        *self = FeedState {
            phase: Phase::InitialLoading,
            ..FeedState::default()
        };
    }

    /// Filter change: current pages stay visible until the new first page lands.
    pub(crate) fn begin_refilter(&mut self) {
        self.phase = Phase::InitialLoading;
    }

    pub(crate) fn begin_load_more(&mut self) {
        self.phase = Phase::LoadingMore;
    }

    /// Installs a fresh context in one step.
    pub(crate) fn apply_initial(
        &mut self,
        lead_items: Vec<ContentItem>,
        page_items: Vec<ContentItem>,
        returned: usize,
        limit: usize,
        filters: Option<ArchiveFilters>,
    ) {
        *self = FeedState {
            lead_items,
            page_items,
            offset: returned,
            has_more: returned == limit,
            phase: Phase::Ready,
            filters,
        };
    }

    /// Replaces the paginated extension after a filter change. Lead items survive.
    pub(crate) fn replace_pages(
        &mut self,
        page_items: Vec<ContentItem>,
        returned: usize,
        limit: usize,
        filters: Option<ArchiveFilters>,
    ) {
        self.page_items = page_items;
        self.offset = returned;
        self.has_more = returned == limit;
        self.filters = filters;
        self.phase = Phase::Ready;
    }

    pub(crate) fn append_page(&mut self, page_items: Vec<ContentItem>, returned: usize, limit: usize) {
        self.page_items.extend(page_items);
        self.offset += returned;
        self.has_more = returned == limit;
        self.phase = Phase::Ready;
    }

    pub(crate) fn mark_not_found(&mut self) {
        *self = FeedState {
            phase: Phase::NotFound,
            ..FeedState::default()
        };
    }

    pub(crate) fn mark_failed(&mut self, operation: Operation, message: String) {
        self.phase = Phase::Failed { operation, message };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::EntityId;

    fn items(ids: std::ops::Range<i64>) -> Vec<ContentItem> {
        ids.map(|id| {
            serde_json::from_value(serde_json::json!({"ContentID": id})).unwrap()
        })
        .collect()
    }

    #[test]
    fn test_default_is_idle_and_empty() {
        let state = FeedState::default();
        assert_eq!(state.phase(), &Phase::Idle);
        assert!(state.is_empty());
        assert_eq!(state.offset(), 0);
        assert!(!state.has_more());
        assert!(!state.is_in_flight());
    }

    #[test]
    fn test_loading_flags_are_exclusive() {
        let mut state = FeedState::default();

        state.begin_initialize();
        assert!(state.initial_loading() && !state.loading_more());

        state.apply_initial(items(1..3), items(3..9), 6, 6, None);
        assert!(!state.initial_loading() && !state.loading_more());

        state.begin_load_more();
        assert!(!state.initial_loading() && state.loading_more());
    }

    #[test]
    fn test_append_accumulates_offset() {
        let mut state = FeedState::default();
        state.apply_initial(Vec::new(), items(0..6), 6, 6, None);
        state.begin_load_more();
        state.append_page(items(6..12), 6, 6);
        state.begin_load_more();
        state.append_page(items(12..15), 3, 6);

        assert_eq!(state.offset(), 15);
        assert_eq!(state.page_items().len(), 15);
        assert!(!state.has_more());
        assert_eq!(state.phase(), &Phase::Ready);
    }

    #[test]
    fn test_offset_counts_returned_not_kept() {
        let mut state = FeedState::default();
        // Server returned 6, one was dropped client-side
        state.apply_initial(Vec::new(), items(0..5), 6, 6, None);
        assert_eq!(state.offset(), 6);
        assert!(state.has_more());
    }

    #[test]
    fn test_failure_keeps_data() {
        let mut state = FeedState::default();
        state.apply_initial(items(1..3), items(3..9), 6, 6, None);
        state.begin_load_more();
        state.mark_failed(Operation::LoadMore, "HTTP error: status 502".into());

        assert_eq!(state.page_items().len(), 6);
        assert_eq!(state.offset(), 6);
        assert!(state.has_more());
        assert_eq!(state.last_error(), Some("HTTP error: status 502"));
        assert!(!state.is_in_flight());
    }

    #[test]
    fn test_replace_pages_keeps_lead() {
        let mut state = FeedState::default();
        state.apply_initial(items(1..3), items(3..9), 6, 6, None);
        state.begin_refilter();
        state.replace_pages(items(20..22), 2, 6, Some(ArchiveFilters::default()));

        assert_eq!(state.lead_items().len(), 2);
        assert_eq!(state.page_items()[0].id, EntityId::Number(20));
        assert_eq!(state.offset(), 2);
        assert!(!state.has_more());
    }

    #[test]
    fn test_not_found_resets() {
        let mut state = FeedState::default();
        state.apply_initial(items(1..3), items(3..9), 6, 6, None);
        state.mark_not_found();
        assert!(state.is_empty());
        assert_eq!(state.phase(), &Phase::NotFound);
    }
}
