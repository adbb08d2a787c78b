//! Feed controller: lead set, exclusion, and offset pagination for one context.
//!
//! Every operation exists in two forms. The async methods ([`FeedController::initialize`],
//! [`FeedController::load_more`], [`FeedController::apply_filters`]) issue, await and
//! apply in one call. The ticket API splits that into `begin_*` (synchronous,
//! marks the fetch in flight), `fetch` (async, needs only the gateway, so it can
//! run on a spawned task) and `complete_*` (synchronous, applies the result).
//!
//! Each `begin_*` that starts a fetch bumps a sequence number. A completed
//! fetch whose number is no longer current is discarded without touching
//! state and reported as [`FetchOutcome::Superseded`].

use super::context::{CategoryRef, ContextResolver, FeedContext, ResolvedContext};
use super::endpoints::Endpoints;
use super::error::FeedError;
use super::exclusion::ExclusionSet;
use super::query::{ArchiveFilters, FilterZone, PageScope};
use super::state::{FeedState, Operation};
use super::types::{decode, ContentItem, LeadEnvelope, PageEnvelope};
use crate::config::Config;
use crate::gateway::ContentGateway;
use std::sync::Arc;

/// Page sizes used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLimits {
    /// Lead items per category or subcategory.
    pub lead: usize,
    /// Items per category/subcategory page.
    pub page: usize,
    /// Items per archive page.
    pub archive_page: usize,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            lead: 10,
            page: 6,
            archive_page: 12,
        }
    }
}

impl FeedLimits {
    /// A limit of zero would make every page look final; clamp to one.
    fn clamped(self) -> Self {
        Self {
            lead: self.lead.max(1),
            page: self.page.max(1),
            archive_page: self.archive_page.max(1),
        }
    }
}

/// The operations a [`PageTicket`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOperation {
    LoadMore,
    ApplyFilters,
}

impl From<PageOperation> for Operation {
    fn from(operation: PageOperation) -> Self {
        match operation {
            PageOperation::LoadMore => Operation::LoadMore,
            PageOperation::ApplyFilters => Operation::ApplyFilters,
        }
    }
}

/// Result of an operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was applied. `received` is the server-returned length.
    Loaded { received: usize, has_more: bool },
    /// The context does not exist; state is empty.
    NotFound,
    /// Nothing was requested (no more pages, or a fetch is already in flight).
    Skipped,
    /// A newer operation started while this one was in flight; its result was dropped.
    Superseded,
}

// ============================================================================
// Tickets
// ============================================================================

/// A pending initialize. Produced by [`FeedController::begin_initialize`].
#[derive(Debug, Clone)]
pub struct InitTicket {
    seq: u64,
    context: FeedContext,
    filters: Option<ArchiveFilters>,
    endpoints: Arc<Endpoints>,
    limits: FeedLimits,
    zone: FilterZone,
}

/// Data fetched for an [`InitTicket`], ready for [`FeedController::complete_initialize`].
#[derive(Debug)]
pub struct InitFetched {
    seq: u64,
    result: Result<Initialized, FeedError>,
}

#[derive(Debug)]
enum Initialized {
    NotFound,
    Loaded {
        resolved: ResolvedContext,
        lead_items: Vec<ContentItem>,
        scope: Arc<PageScope>,
        page: Vec<ContentItem>,
    },
}

impl InitTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn context(&self) -> &FeedContext {
        &self.context
    }

    /// Runs the lead and first-page requests. The page request is only
    /// issued after the lead set has arrived.
    ///
    /// A slug or id that cannot be a path segment names no category, so it
    /// resolves to not found without any request.
    pub async fn fetch<G: ContentGateway + ?Sized>(self, gateway: &G) -> InitFetched {
        let result = match self.run(gateway).await {
            Err(FeedError::InvalidSegment(value)) => {
                tracing::debug!(
                    value = %value,
                    context = %self.context,
                    "Context cannot be addressed"
                );
                Ok(Initialized::NotFound)
            }
            other => other,
        };
        InitFetched {
            seq: self.seq,
            result,
        }
    }

    async fn run<G: ContentGateway + ?Sized>(&self, gateway: &G) -> Result<Initialized, FeedError> {
        let resolver = ContextResolver::new(gateway, &self.endpoints);

        let (resolved, lead_id, page_category_id, missing_lead_is_not_found) = match &self.context {
            FeedContext::Archive => {
                let scope = Arc::new(PageScope::archive(
                    self.filters.clone().unwrap_or_default(),
                    self.zone,
                ));
                let page = fetch_page(gateway, &self.endpoints.archive, &scope, self.limits.archive_page, 0).await?;
                return Ok(Initialized::Loaded {
                    resolved: ResolvedContext::archive(),
                    lead_items: Vec::new(),
                    scope,
                    page,
                });
            }
            FeedContext::Category(CategoryRef::Id(id)) => {
                (ResolvedContext::by_id(id), id.clone(), id.clone(), true)
            }
            FeedContext::Category(CategoryRef::Slug(slug)) => {
                let Some(category) = resolver.resolve_category(slug).await? else {
                    return Ok(Initialized::NotFound);
                };
                let id = category.id.clone();
                (ResolvedContext::for_category(category), id.clone(), id, false)
            }
            FeedContext::Subcategory {
                category,
                subcategory,
            } => {
                let Some((parent, child)) =
                    resolver.resolve_subcategory(category, subcategory).await?
                else {
                    return Ok(Initialized::NotFound);
                };
                let lead_id = child.id.clone();
                let page_id = parent.id.clone();
                (
                    ResolvedContext::for_subcategory(parent, child),
                    lead_id,
                    page_id,
                    false,
                )
            }
        };

        let lead_path = match &self.context {
            FeedContext::Subcategory { .. } => {
                self.endpoints.subcategory_lead_path(&lead_id, self.limits.lead)?
            }
            _ => self.endpoints.lead_path(&lead_id, self.limits.lead)?,
        };
        let lead: LeadEnvelope = decode(gateway.read(&lead_path).await?)?;
        let lead_items = match lead.items {
            Some(items) => items,
            None if missing_lead_is_not_found => {
                tracing::debug!(category_id = %lead_id, "Lead set has no items collection");
                return Ok(Initialized::NotFound);
            }
            None => Vec::new(),
        };

        let scope = Arc::new(PageScope::Listing {
            exclusion: ExclusionSet::build(&lead_items),
            category_id: page_category_id,
        });
        let page = fetch_page(gateway, &self.endpoints.page, &scope, self.limits.page, 0).await?;

        Ok(Initialized::Loaded {
            resolved,
            lead_items,
            scope,
            page,
        })
    }
}

/// A pending page request from [`FeedController::begin_load_more`] or
/// [`FeedController::begin_apply_filters`].
#[derive(Debug, Clone)]
pub struct PageTicket {
    seq: u64,
    operation: PageOperation,
    path: String,
    scope: Arc<PageScope>,
    limit: usize,
    offset: usize,
}

/// Data fetched for a [`PageTicket`], ready for [`FeedController::complete_page`].
#[derive(Debug)]
pub struct PageFetched {
    seq: u64,
    operation: PageOperation,
    scope: Arc<PageScope>,
    limit: usize,
    result: Result<Vec<ContentItem>, FeedError>,
}

impl PageTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn operation(&self) -> PageOperation {
        self.operation
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub async fn fetch<G: ContentGateway + ?Sized>(self, gateway: &G) -> PageFetched {
        let result = fetch_page(gateway, &self.path, &self.scope, self.limit, self.offset).await;
        PageFetched {
            seq: self.seq,
            operation: self.operation,
            scope: self.scope,
            limit: self.limit,
            result,
        }
    }
}

async fn fetch_page<G: ContentGateway + ?Sized>(
    gateway: &G,
    path: &str,
    scope: &PageScope,
    limit: usize,
    offset: usize,
) -> Result<Vec<ContentItem>, FeedError> {
    let body = scope.body(limit, offset)?;
    let page: PageEnvelope = decode(gateway.submit(path, &body).await?)?;
    Ok(page.data)
}

// ============================================================================
// Controller
// ============================================================================

/// Drives one feed: owns its [`FeedState`] and the gateway it fetches through.
pub struct FeedController<G> {
    gateway: G,
    endpoints: Arc<Endpoints>,
    limits: FeedLimits,
    refilter_pages: bool,
    filter_zone: FilterZone,
    state: FeedState,
    context: Option<FeedContext>,
    resolved: Option<ResolvedContext>,
    scope: Option<Arc<PageScope>>,
    seq: u64,
}

impl<G: ContentGateway> FeedController<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            endpoints: Arc::new(Endpoints::default()),
            limits: FeedLimits::default(),
            refilter_pages: true,
            filter_zone: FilterZone::default(),
            state: FeedState::default(),
            context: None,
            resolved: None,
            scope: None,
            seq: 0,
        }
    }

    pub fn from_config(gateway: G, config: &Config) -> Self {
        Self::new(gateway)
            .with_limits(config.limits())
            .with_endpoints(config.endpoints.clone())
            .with_refilter_pages(config.refilter_pages)
    }

    pub fn with_limits(mut self, limits: FeedLimits) -> Self {
        self.limits = limits.clamped();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Arc::new(endpoints);
        self
    }

    /// Drop page items that repeat a lead id even if the server returned them.
    pub fn with_refilter_pages(mut self, enabled: bool) -> Self {
        self.refilter_pages = enabled;
        self
    }

    pub fn with_filter_zone(mut self, zone: FilterZone) -> Self {
        self.filter_zone = zone;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn context(&self) -> Option<&FeedContext> {
        self.context.as_ref()
    }

    /// Set once an initialize has succeeded.
    pub fn resolved(&self) -> Option<&ResolvedContext> {
        self.resolved.as_ref()
    }

    pub fn limits(&self) -> FeedLimits {
        self.limits
    }

    /// Ids the current context excludes from its pages.
    pub fn exclusion(&self) -> Option<&ExclusionSet> {
        self.scope.as_deref().and_then(PageScope::exclusion)
    }

    fn next_seq(&mut self) -> u64 {
        self.seq = self.seq.wrapping_add(1);
        self.seq
    }

    fn is_current(&self, seq: u64, operation: Operation) -> bool {
        if seq == self.seq {
            return true;
        }
        tracing::debug!(
            expected = self.seq,
            got = seq,
            operation = ?operation,
            "Ignoring stale feed result (sequence mismatch)"
        );
        false
    }

    // ------------------------------------------------------------------------
    // Initialize
    // ------------------------------------------------------------------------

    /// Starts loading `context` from scratch. Any fetch still in flight is superseded.
    ///
    /// `filters` only apply to [`FeedContext::Archive`].
    pub fn begin_initialize(
        &mut self,
        context: FeedContext,
        filters: Option<ArchiveFilters>,
    ) -> Result<InitTicket, FeedError> {
        if let Some(filters) = &filters {
            if !context.is_archive() {
                return Err(FeedError::FiltersUnsupported);
            }
            filters.validate()?;
        }

        let seq = self.next_seq();
        self.state.begin_initialize();
        self.context = Some(context.clone());
        self.resolved = None;
        self.scope = None;
        tracing::debug!(seq, context = %context, "Initializing feed");

        Ok(InitTicket {
            seq,
            context,
            filters,
            endpoints: Arc::clone(&self.endpoints),
            limits: self.limits,
            zone: self.filter_zone,
        })
    }

    pub fn complete_initialize(&mut self, fetched: InitFetched) -> Result<FetchOutcome, FeedError> {
        if !self.is_current(fetched.seq, Operation::Initialize) {
            return Ok(FetchOutcome::Superseded);
        }

        match fetched.result {
            Err(e) => {
                tracing::warn!(seq = fetched.seq, error = %e, "Feed initialization failed");
                self.state.mark_failed(Operation::Initialize, e.to_string());
                Err(e)
            }
            Ok(Initialized::NotFound) => {
                tracing::debug!(seq = fetched.seq, "Feed context not found");
                self.state.mark_not_found();
                Ok(FetchOutcome::NotFound)
            }
            Ok(Initialized::Loaded {
                resolved,
                lead_items,
                scope,
                mut page,
            }) => {
                let received = page.len();
                let limit = self.page_limit(&scope);
                self.drop_excluded(&scope, &mut page);

                self.state.apply_initial(
                    lead_items,
                    page,
                    received,
                    limit,
                    scope.filters().cloned(),
                );
                self.resolved = Some(resolved);
                self.scope = Some(scope);

                tracing::debug!(
                    seq = fetched.seq,
                    lead = self.state.lead_items().len(),
                    received,
                    has_more = self.state.has_more(),
                    "Feed initialized"
                );
                Ok(FetchOutcome::Loaded {
                    received,
                    has_more: self.state.has_more(),
                })
            }
        }
    }

    pub async fn initialize(
        &mut self,
        context: FeedContext,
        filters: Option<ArchiveFilters>,
    ) -> Result<FetchOutcome, FeedError> {
        let ticket = self.begin_initialize(context, filters)?;
        let fetched = ticket.fetch(&self.gateway).await;
        self.complete_initialize(fetched)
    }

    // ------------------------------------------------------------------------
    // Load more
    // ------------------------------------------------------------------------

    /// Starts fetching the next page, or returns `None` when there is nothing
    /// to fetch or a fetch is already in flight.
    pub fn begin_load_more(&mut self) -> Option<PageTicket> {
        if !self.state.has_more() || self.state.is_in_flight() {
            tracing::debug!(
                has_more = self.state.has_more(),
                in_flight = self.state.is_in_flight(),
                "Load more skipped"
            );
            return None;
        }
        let scope = Arc::clone(self.scope.as_ref()?);

        let seq = self.next_seq();
        let offset = self.state.offset();
        self.state.begin_load_more();
        tracing::debug!(seq, offset, "Loading next page");

        Some(PageTicket {
            seq,
            operation: PageOperation::LoadMore,
            path: self.page_path(&scope).to_string(),
            limit: self.page_limit(&scope),
            scope,
            offset,
        })
    }

    pub async fn load_more(&mut self) -> Result<FetchOutcome, FeedError> {
        let Some(ticket) = self.begin_load_more() else {
            return Ok(FetchOutcome::Skipped);
        };
        let fetched = ticket.fetch(&self.gateway).await;
        self.complete_page(fetched)
    }

    // ------------------------------------------------------------------------
    // Apply filters
    // ------------------------------------------------------------------------

    /// Starts re-querying the archive's first page with `filters`. Any fetch
    /// still in flight is superseded.
    ///
    /// Current page items stay visible until the new page arrives; a failed
    /// request leaves them and the previous filters in place.
    pub fn begin_apply_filters(&mut self, filters: ArchiveFilters) -> Result<PageTicket, FeedError> {
        if !self.context.as_ref().is_some_and(FeedContext::is_archive) {
            return Err(FeedError::FiltersUnsupported);
        }
        filters.validate()?;

        let scope = Arc::new(PageScope::archive(filters, self.filter_zone));
        let seq = self.next_seq();
        self.state.begin_refilter();
        tracing::debug!(seq, "Applying archive filters");

        Ok(PageTicket {
            seq,
            operation: PageOperation::ApplyFilters,
            path: self.endpoints.archive.clone(),
            limit: self.limits.archive_page,
            scope,
            offset: 0,
        })
    }

    pub async fn apply_filters(&mut self, filters: ArchiveFilters) -> Result<FetchOutcome, FeedError> {
        let ticket = self.begin_apply_filters(filters)?;
        let fetched = ticket.fetch(&self.gateway).await;
        self.complete_page(fetched)
    }

    // ------------------------------------------------------------------------
    // Page completion
    // ------------------------------------------------------------------------

    pub fn complete_page(&mut self, fetched: PageFetched) -> Result<FetchOutcome, FeedError> {
        if !self.is_current(fetched.seq, fetched.operation.into()) {
            return Ok(FetchOutcome::Superseded);
        }

        let mut page = match fetched.result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    seq = fetched.seq,
                    operation = ?fetched.operation,
                    error = %e,
                    "Page fetch failed"
                );
                self.state.mark_failed(fetched.operation.into(), e.to_string());
                return Err(e);
            }
        };

        let received = page.len();
        self.drop_excluded(&fetched.scope, &mut page);

        match fetched.operation {
            PageOperation::ApplyFilters => {
                self.state.replace_pages(
                    page,
                    received,
                    fetched.limit,
                    fetched.scope.filters().cloned(),
                );
                if self.resolved.is_none() {
                    self.resolved = Some(ResolvedContext::archive());
                }
                self.scope = Some(fetched.scope);
            }
            PageOperation::LoadMore => {
                self.state.append_page(page, received, fetched.limit);
            }
        }

        tracing::debug!(
            seq = fetched.seq,
            received,
            offset = self.state.offset(),
            has_more = self.state.has_more(),
            "Page applied"
        );
        Ok(FetchOutcome::Loaded {
            received,
            has_more: self.state.has_more(),
        })
    }

    fn page_limit(&self, scope: &PageScope) -> usize {
        match scope {
            PageScope::Listing { .. } => self.limits.page,
            PageScope::Archive { .. } => self.limits.archive_page,
        }
    }

    fn page_path(&self, scope: &PageScope) -> &str {
        match scope {
            PageScope::Listing { .. } => &self.endpoints.page,
            PageScope::Archive { .. } => &self.endpoints.archive,
        }
    }

    fn drop_excluded(&self, scope: &PageScope, page: &mut Vec<ContentItem>) {
        if !self.refilter_pages {
            return;
        }
        let Some(exclusion) = scope.exclusion() else {
            return;
        };
        let dropped = exclusion.retain_unseen(page);
        if dropped > 0 {
            tracing::warn!(
                dropped,
                excluded = exclusion.len(),
                "Server returned lead items in a page; dropped them"
            );
        }
    }
}
