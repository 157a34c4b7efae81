//! Index settings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::index::Index;
use crate::task::Task;

/// Index settings. Fields left `None` are not sent and keep their current
/// value on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayed_attributes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_rules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<Map<String, Value>>,
}

impl Settings {
    pub fn with_searchable_attributes<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.searchable_attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_filterable_attributes<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.filterable_attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sortable_attributes<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.sortable_attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_displayed_attributes<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.displayed_attributes = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// Attribute lists that have their own settings route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeList {
    Searchable,
    Filterable,
    Sortable,
    Displayed,
}

impl AttributeList {
    pub const ALL: [AttributeList; 4] = [
        AttributeList::Searchable,
        AttributeList::Filterable,
        AttributeList::Sortable,
        AttributeList::Displayed,
    ];

    /// Route segment under `/settings`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            AttributeList::Searchable => "searchable-attributes",
            AttributeList::Filterable => "filterable-attributes",
            AttributeList::Sortable => "sortable-attributes",
            AttributeList::Displayed => "displayed-attributes",
        }
    }

    /// Key in the settings object.
    pub fn key(&self) -> &'static str {
        match self {
            AttributeList::Searchable => "searchableAttributes",
            AttributeList::Filterable => "filterableAttributes",
            AttributeList::Sortable => "sortableAttributes",
            AttributeList::Displayed => "displayedAttributes",
        }
    }
}

/// Settings of one index.
pub struct IndexSettings {
    index: Index,
}

impl IndexSettings {
    pub(crate) fn new(index: Index) -> Self {
        Self { index }
    }

    fn path(&self) -> String {
        format!("{}/settings", self.index.path())
    }

    pub async fn get(&self) -> Result<Settings, ClientError> {
        self.index.shared().http.get(&self.path()).await
    }

    pub async fn update(&self, settings: &Settings) -> Result<Task, ClientError> {
        let shared = self.index.shared();
        let record = shared.http.patch(&self.path(), settings).await?;
        Ok(shared.task(record))
    }

    /// Update from a free-form JSON object.
    ///
    /// Top-level snake_case keys are rewritten to camelCase before sending,
    /// with a warning for each rewritten key.
    pub async fn update_raw(&self, settings: Value) -> Result<Task, ClientError> {
        let shared = self.index.shared();
        let body = match settings {
            Value::Object(map) => Value::Object(normalize_keys(map, |original, converted| {
                shared.diagnostics.warn(&format!(
                    "settings attribute '{original}' is not camelCase, sending it as '{converted}'"
                ))
            })),
            other => {
                return Err(ClientError::InvalidConfig(format!(
                    "settings must be a JSON object, got {other}"
                )))
            }
        };
        let record = shared.http.patch(&self.path(), &body).await?;
        Ok(shared.task(record))
    }

    /// Reset every setting to its default.
    pub async fn reset(&self) -> Result<Task, ClientError> {
        let shared = self.index.shared();
        let record = shared.http.delete(&self.path()).await?;
        Ok(shared.task(record))
    }

    pub async fn get_attribute_list(&self, list: AttributeList) -> Result<Vec<String>, ClientError> {
        self.index
            .shared()
            .http
            .get(&format!("{}/{}", self.path(), list.path_segment()))
            .await
    }

    pub async fn update_attribute_list<S: AsRef<str>>(
        &self,
        list: AttributeList,
        names: &[S],
    ) -> Result<Task, ClientError> {
        let shared = self.index.shared();
        let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        let record = shared
            .http
            .put(&format!("{}/{}", self.path(), list.path_segment()), &names)
            .await?;
        Ok(shared.task(record))
    }

    pub async fn reset_attribute_list(&self, list: AttributeList) -> Result<Task, ClientError> {
        let shared = self.index.shared();
        let record = shared
            .http
            .delete(&format!("{}/{}", self.path(), list.path_segment()))
            .await?;
        Ok(shared.task(record))
    }
}

fn normalize_keys(
    map: Map<String, Value>,
    mut on_converted: impl FnMut(&str, &str),
) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let converted = to_camel_case(&key);
            if converted != key {
                on_converted(&key, &converted);
            }
            (converted, value)
        })
        .collect()
}

/// `filterable_attributes` -> `filterableAttributes`. Keys without
/// underscores are returned unchanged.
pub(crate) fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
