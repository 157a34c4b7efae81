//! Search requests and results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use docsearch_core::filter::{self, FilterError};

/// Body of a search request. Unset fields are left to the service defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    /// Compiled filter expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_retrieve: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<String>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    /// Compile a structural filter description and attach it. An empty
    /// description (`{}` or `[]`) leaves the query unfiltered.
    pub fn with_filter<T: Serialize + ?Sized>(mut self, filter: &T) -> Result<Self, FilterError> {
        let expression = filter::build(filter)?;
        self.filter = (!expression.is_empty()).then_some(expression);
        Ok(self)
    }

    /// Attach an already written filter expression verbatim.
    pub fn with_filter_expression(mut self, expression: impl Into<String>) -> Self {
        self.filter = Some(expression.into());
        self
    }

    pub fn with_sort<S: Into<String>>(mut self, sort: impl IntoIterator<Item = S>) -> Self {
        self.sort.extend(sort.into_iter().map(Into::into));
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_attributes_to_retrieve<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.attributes_to_retrieve = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_facets<S: Into<String>>(mut self, facets: impl IntoIterator<Item = S>) -> Self {
        self.facets.extend(facets.into_iter().map(Into::into));
        self
    }
}

/// Search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults<T> {
    pub hits: Vec<T>,
    pub query: String,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub estimated_total_hits: Option<u64>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub facet_distribution: Option<Value>,
}
