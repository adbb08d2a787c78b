use serde::{Deserialize, Deserializer, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque identifier of a content item or category.
///
/// The API is not consistent about id types (numbers in most payloads,
/// strings in some), so both forms are kept verbatim and echoed back in the
/// same JSON form they arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

/// Parses numeric input as [`EntityId::Number`], anything else as text.
impl FromStr for EntityId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(s.parse::<i64>()
            .map(EntityId::Number)
            .unwrap_or_else(|_| EntityId::Text(s.to_string())))
    }
}

// ============================================================================
// Content items
// ============================================================================

/// One feed entry as returned by the content API.
///
/// Identity is `id`; every other field is display data that the feed
/// controller never inspects or changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "ContentID")]
    pub id: EntityId,
    #[serde(rename = "Slug", default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(rename = "DetailsHeading", default, deserialize_with = "null_as_default")]
    pub heading: String,
    #[serde(rename = "ContentBrief", default, deserialize_with = "null_as_default")]
    pub brief: String,
    /// Relative asset path; the image host is a presentation concern.
    #[serde(rename = "ImageBgPath", default)]
    pub image_path: Option<String>,
    #[serde(rename = "CategoryID", default)]
    pub category_id: Option<EntityId>,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: Option<String>,
    #[serde(rename = "Tags", default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

/// A category or subcategory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "CategoryID")]
    pub id: EntityId,
    #[serde(rename = "CategoryName", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "Slug", default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(rename = "BannerImage", default)]
    pub banner_image: Option<String>,
    #[serde(rename = "subCategories", default, deserialize_with = "null_as_default")]
    pub subcategories: Vec<Category>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tags arrive either as a JSON array or as one comma-separated string.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Joined(String),
    }

    let tags = match Option::<Tags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Tags::List(list)) => list,
        Some(Tags::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

// ============================================================================
// Response envelopes
// ============================================================================

/// `{ items: [...] }` from the lead-set endpoint.
///
/// `items` absent or null means the owning category does not exist, which is
/// different from an empty array.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LeadEnvelope {
    #[serde(alias = "inner_category_content", alias = "inner_subcategory_content")]
    pub items: Option<Vec<ContentItem>>,
}

/// `{ data: [...] }` from the page endpoints. A missing `data` is an empty page.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<ContentItem>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CategoryEnvelope {
    pub category: Option<Category>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubcategoryEnvelope {
    #[serde(rename = "subCategories")]
    pub subcategory: Option<Category>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CategoryListEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
}

/// Decodes a response envelope, treating a JSON `null` body as an empty object.
pub(crate) fn decode<T>(value: serde_json::Value) -> Result<T, serde_json::Error>
where
    T: serde::de::DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value)
}
