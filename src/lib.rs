//! Lead-set plus offset-paginated news feeds.
//!
//! [`feed::FeedController`] drives one feed context through a
//! [`gateway::ContentGateway`]; [`gateway::HttpGateway`] is the HTTP/JSON
//! implementation used by the `leadfeed` binary.

pub mod config;
pub mod feed;
pub mod gateway;
pub mod util;
