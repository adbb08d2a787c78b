use super::error::FeedError;
use super::exclusion::ExclusionSet;
use super::types::EntityId;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// Archive filters
// ============================================================================

/// Archive filter selection. Every field empty means "unfiltered".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveFilters {
    pub start_date: Option<NaiveDate>,
    /// Inclusive: the whole day is part of the range.
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<EntityId>,
}

impl ArchiveFilters {
    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn to_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn in_category(mut self, id: impl Into<EntityId>) -> Self {
        self.category_id = Some(id.into());
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.category_id.is_none()
    }

    pub(crate) fn validate(&self) -> Result<(), FeedError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if end < start => {
                Err(FeedError::InvalidDateRange { start, end })
            }
            _ => Ok(()),
        }
    }
}

/// Time zone whose calendar days the archive date filters refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterZone {
    /// The machine's local zone.
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl FilterZone {
    /// Last millisecond (23:59:59.999) of `date` in this zone, as a UTC instant.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let last_ms = date
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap_or_else(|| date.and_time(NaiveTime::default()));

        let instant = match self {
            FilterZone::Local => Local
                .from_local_datetime(&last_ms)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            FilterZone::Fixed(offset) => offset
                .from_local_datetime(&last_ms)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        };

        instant.unwrap_or_else(|| Utc.from_utc_datetime(&last_ms))
    }
}

// ============================================================================
// Page scope
// ============================================================================

/// Everything a page query needs besides `limit` and `offset`.
///
/// Captured once per initialize or filter change and reused unchanged by
/// every later "load more" of that context.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PageScope {
    Listing {
        exclusion: ExclusionSet,
        category_id: EntityId,
    },
    Archive {
        filters: ArchiveFilters,
        start_date: String,
        end_date: String,
    },
}

impl PageScope {
    /// Archive scope with the end date widened to the end of its day.
    pub(crate) fn archive(filters: ArchiveFilters, zone: FilterZone) -> Self {
        let start_date = filters
            .start_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let end_date = filters
            .end_date
            .map(|d| {
                zone.end_of_day(d)
                    .to_rfc3339_opts(SecondsFormat::Millis, true)
            })
            .unwrap_or_default();

        PageScope::Archive {
            filters,
            start_date,
            end_date,
        }
    }

    pub(crate) fn exclusion(&self) -> Option<&ExclusionSet> {
        match self {
            PageScope::Listing { exclusion, .. } => Some(exclusion),
            PageScope::Archive { .. } => None,
        }
    }

    pub(crate) fn filters(&self) -> Option<&ArchiveFilters> {
        match self {
            PageScope::Listing { .. } => None,
            PageScope::Archive { filters, .. } => Some(filters),
        }
    }

    pub(crate) fn body(&self, limit: usize, offset: usize) -> Result<Value, serde_json::Error> {
        match self {
            PageScope::Listing {
                exclusion,
                category_id,
            } => serde_json::to_value(ListingPageBody {
                top_content_ids: exclusion.ids(),
                category_id,
                limit,
                offset,
            }),
            PageScope::Archive {
                filters,
                start_date,
                end_date,
            } => serde_json::to_value(ArchivePageBody {
                start_date,
                end_date,
                category_id: filters.category_id.as_ref(),
                limit,
                offset,
            }),
        }
    }
}

#[derive(Serialize)]
struct ListingPageBody<'a> {
    top_content_ids: &'a [EntityId],
    category_id: &'a EntityId,
    limit: usize,
    offset: usize,
}

#[derive(Serialize)]
struct ArchivePageBody<'a> {
    start_date: &'a str,
    end_date: &'a str,
    #[serde(serialize_with = "empty_when_none")]
    category_id: Option<&'a EntityId>,
    limit: usize,
    offset: usize,
}

fn empty_when_none<S: Serializer>(id: &Option<&EntityId>, serializer: S) -> Result<S::Ok, S::Error> {
    match id {
        Some(id) => id.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}
