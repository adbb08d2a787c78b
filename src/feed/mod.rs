//! Lead-set plus offset-paginated feeds.
//!
//! A feed context (category, subcategory or archive) shows a fixed set of
//! lead items followed by pages that never repeat a lead item:
//!
//! - [`types`] - wire types for items, categories and response envelopes
//! - [`ExclusionSet`] - lead ids withheld from every page of a context
//! - [`FeedState`] - what one feed currently shows, with an explicit [`Phase`]
//! - [`FeedController`] - initialize, load more, apply filters
//! - [`ContextResolver`] - slug lookups and the archive's category options
//!
//! # Example
//!
//! ```ignore
//! let gateway = HttpGateway::from_config(&config)?;
//! let mut feed = FeedController::from_config(gateway, &config);
//!
//! feed.initialize(FeedContext::category_slug("sports"), None).await?;
//! while feed.state().has_more() {
//!     feed.load_more().await?;
//! }
//! ```

mod context;
mod controller;
mod endpoints;
mod error;
mod exclusion;
mod presenter;
mod query;
mod state;
pub mod types;

pub use context::{CategoryRef, ContextResolver, FeedContext, ResolvedContext};
pub use controller::{
    FeedController, FeedLimits, FetchOutcome, InitFetched, InitTicket, PageFetched, PageOperation,
    PageTicket,
};
pub use endpoints::Endpoints;
pub use error::FeedError;
pub use exclusion::ExclusionSet;
pub use presenter::{present_if_ready, FeedView, Presenter};
pub use query::{ArchiveFilters, FilterZone};
pub use state::{FeedState, Operation, Phase};
pub use types::{Category, ContentItem, EntityId};
