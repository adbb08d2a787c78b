use super::endpoints::Endpoints;
use super::error::FeedError;
use super::types::{decode, Category, CategoryEnvelope, CategoryListEnvelope, EntityId, SubcategoryEnvelope};
use crate::gateway::ContentGateway;
use std::fmt;

/// How a category context is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRef {
    /// Known id: the lead set is read directly.
    Id(EntityId),
    /// URL slug: resolved to an id before the lead set is read.
    Slug(String),
}

/// The scope of one feed instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedContext {
    Category(CategoryRef),
    /// Both levels addressed by slug.
    Subcategory {
        category: String,
        subcategory: String,
    },
    /// Filterable archive; has no lead tier.
    Archive,
}

impl FeedContext {
    pub fn category_slug(slug: impl Into<String>) -> Self {
        FeedContext::Category(CategoryRef::Slug(slug.into()))
    }

    pub fn category_id(id: impl Into<EntityId>) -> Self {
        FeedContext::Category(CategoryRef::Id(id.into()))
    }

    pub fn subcategory(category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        FeedContext::Subcategory {
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, FeedContext::Archive)
    }
}

impl fmt::Display for FeedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedContext::Category(CategoryRef::Id(id)) => write!(f, "category #{}", id),
            FeedContext::Category(CategoryRef::Slug(slug)) => write!(f, "category/{}", slug),
            FeedContext::Subcategory {
                category,
                subcategory,
            } => write!(f, "category/{}/{}", category, subcategory),
            FeedContext::Archive => f.write_str("archive"),
        }
    }
}

/// What was learned about a context while initializing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedContext {
    /// Heading to show for the feed.
    pub title: String,
    pub category: Option<Category>,
    pub subcategory: Option<Category>,
}

impl ResolvedContext {
    pub(crate) fn by_id(id: &EntityId) -> Self {
        Self {
            title: id.to_string(),
            category: None,
            subcategory: None,
        }
    }

    pub(crate) fn for_category(category: Category) -> Self {
        Self {
            title: display_name(&category),
            category: Some(category),
            subcategory: None,
        }
    }

    pub(crate) fn for_subcategory(category: Category, subcategory: Category) -> Self {
        Self {
            title: display_name(&subcategory),
            category: Some(category),
            subcategory: Some(subcategory),
        }
    }

    pub(crate) fn archive() -> Self {
        Self {
            title: "Archive".to_string(),
            category: None,
            subcategory: None,
        }
    }
}

fn display_name(category: &Category) -> String {
    if category.name.trim().is_empty() {
        category.slug.clone()
    } else {
        category.name.clone()
    }
}

/// Looks up category records by slug and lists the archive's filter options.
pub struct ContextResolver<'a, G: ?Sized> {
    gateway: &'a G,
    endpoints: &'a Endpoints,
}

impl<'a, G: ContentGateway + ?Sized> ContextResolver<'a, G> {
    pub fn new(gateway: &'a G, endpoints: &'a Endpoints) -> Self {
        Self { gateway, endpoints }
    }

    /// `Ok(None)` when the server has no category with this slug.
    pub async fn resolve_category(&self, slug: &str) -> Result<Option<Category>, FeedError> {
        let path = self.endpoints.category_path(slug)?;
        let envelope: CategoryEnvelope = decode(self.gateway.read(&path).await?)?;
        if envelope.category.is_none() {
            tracing::debug!(slug, "Category not found");
        }
        Ok(envelope.category)
    }

    /// Resolves both levels, returning `(parent, child)`.
    ///
    /// The child is only requested once the parent exists. Both slugs are
    /// checked before anything is sent.
    pub async fn resolve_subcategory(
        &self,
        category: &str,
        subcategory: &str,
    ) -> Result<Option<(Category, Category)>, FeedError> {
        let path = self.endpoints.subcategory_path(category, subcategory)?;
        let Some(parent) = self.resolve_category(category).await? else {
            return Ok(None);
        };

        let envelope: SubcategoryEnvelope = decode(self.gateway.read(&path).await?)?;
        match envelope.subcategory {
            Some(child) => Ok(Some((parent, child))),
            None => {
                tracing::debug!(category, subcategory, "Subcategory not found");
                Ok(None)
            }
        }
    }

    /// Every category, for the archive's category filter.
    pub async fn archive_categories(&self) -> Result<Vec<Category>, FeedError> {
        let envelope: CategoryListEnvelope =
            decode(self.gateway.read(&self.endpoints.category_list).await?)?;
        Ok(envelope.categories)
    }
}
