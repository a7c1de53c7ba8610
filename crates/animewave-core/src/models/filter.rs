use serde::{Deserialize, Serialize};

use animewave_api::types::{CatalogQuery, SortField, SortOrder};

/// Catalog constraints chosen by the user. Unset constraints mean "any";
/// the sort fields always carry a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Backend item type (`anime-serial`, `anime`).
    pub item_type: Option<String>,
    /// `tv`, `ova`, `ona`, `movie`, `special`.
    pub kind: Option<String>,
    pub year: Option<u32>,
    pub sort: SortField,
    pub order: SortOrder,
}

/// A single-field edit merged into [`FilterState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Type(Option<String>),
    Kind(Option<String>),
    Year(Option<u32>),
    Sort(SortField),
    Order(SortOrder),
}

impl FilterState {
    /// Shallow merge of one field. Blank strings clear the field.
    /// Returns whether the state changed.
    pub fn apply(&mut self, update: FilterUpdate) -> bool {
        let before = self.clone();
        match update {
            FilterUpdate::Type(value) => self.item_type = normalize(value),
            FilterUpdate::Kind(value) => self.kind = normalize(value),
            FilterUpdate::Year(value) => self.year = value,
            FilterUpdate::Sort(sort) => self.sort = sort,
            FilterUpdate::Order(order) => self.order = order,
        }
        *self != before
    }

    /// True when anything differs from "unfiltered, default sort".
    pub fn is_active(&self) -> bool {
        self.non_default_fields() > 0
    }

    /// Number of fields that differ from the default state.
    pub fn non_default_fields(&self) -> usize {
        let default = Self::default();
        [
            self.item_type.is_some(),
            self.kind.is_some(),
            self.year.is_some(),
            self.sort != default.sort,
            self.order != default.order,
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// List query for this filter. Sort and order are always sent.
    pub fn to_query(&self, limit: u32) -> CatalogQuery {
        CatalogQuery {
            limit,
            types: self.item_type.clone(),
            anime_kind: self.kind.clone(),
            year: self.year,
            sort: Some(self.sort),
            order: Some(self.order),
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
