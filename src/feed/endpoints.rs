use super::error::FeedError;
use super::types::EntityId;
use serde::Deserialize;

/// Path templates for every content API call, relative to the base URL.
///
/// Placeholders are written `{name}`. Values substituted from slugs or ids
/// must be a single path segment; anything that could escape the segment is
/// rejected instead of being sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Category lookup by slug. Placeholder: `{slug}`.
    pub category: String,
    /// Subcategory lookup. Placeholders: `{category}`, `{subcategory}`.
    pub subcategory: String,
    /// Archive filter options (all categories).
    pub category_list: String,
    /// Category lead set. Placeholders: `{category_id}`, `{limit}`.
    pub lead: String,
    /// Subcategory lead set, keyed by the subcategory's id. Same placeholders as `lead`.
    pub subcategory_lead: String,
    /// Category/subcategory page query (POST).
    pub page: String,
    /// Archive page query (POST).
    pub archive: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            category: "category/{slug}".to_string(),
            subcategory: "sub-categorys/{category}/{subcategory}".to_string(),
            category_list: "category".to_string(),
            lead: "leadByCategory/{category_id}/{limit}".to_string(),
            subcategory_lead: "leadByCategory/{category_id}/{limit}".to_string(),
            page: "inner-category-content-more".to_string(),
            archive: "archive".to_string(),
        }
    }
}

impl Endpoints {
    pub fn category_path(&self, slug: &str) -> Result<String, FeedError> {
        render(&self.category, &[("slug", slug)])
    }

    pub fn subcategory_path(&self, category: &str, subcategory: &str) -> Result<String, FeedError> {
        render(
            &self.subcategory,
            &[("category", category), ("subcategory", subcategory)],
        )
    }

    pub fn lead_path(&self, category_id: &EntityId, limit: usize) -> Result<String, FeedError> {
        render_lead(&self.lead, category_id, limit)
    }

    pub fn subcategory_lead_path(
        &self,
        subcategory_id: &EntityId,
        limit: usize,
    ) -> Result<String, FeedError> {
        render_lead(&self.subcategory_lead, subcategory_id, limit)
    }
}

fn render_lead(template: &str, id: &EntityId, limit: usize) -> Result<String, FeedError> {
    let id = id.to_string();
    let limit = limit.to_string();
    render(
        template,
        &[("category_id", id.as_str()), ("limit", limit.as_str())],
    )
}

/// Substitutes every `{name}` in one left-to-right pass, so substituted
/// values are never scanned for placeholders again.
fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, FeedError> {
    for (_, value) in vars {
        if !is_single_segment(value) {
            return Err(FeedError::InvalidSegment((*value).to_string()));
        }
    }

    let mut path = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        path.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                path.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                // Not a known placeholder; keep the brace literally
                path.push('{');
                rest = after;
            }
        }
    }
    path.push_str(rest);
    Ok(path)
}

fn is_single_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%' | '{' | '}') || c.is_control())
}
