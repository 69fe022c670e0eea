//! The discovery bar: search box, sort toggle, category and tag chips.
//!
//! The bar owns no state of its own. It renders from a [`FilterState`] and
//! reports [`DiscoveryAction`]s back to whoever owns the filter.

use std::collections::BTreeSet;

use crate::content::{query::ALL_CATEGORIES, Category, PostQuery, Sort};

/// The user's current filter selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
	pub category: Category,
	pub tags: BTreeSet<String>,
	/// The settled (debounced and trimmed) search text.
	pub search: String,
	pub sort: Sort,
}

impl FilterState {
	/// Adds the tag if absent, removes it if present.
	pub fn toggle_tag(&mut self, tag: &str) {
		if !self.tags.remove(tag) {
			self.tags.insert(tag.to_owned());
		}
	}

	/// The first-page query for this filter.
	pub fn query(&self) -> PostQuery {
		PostQuery {
			category: self.category.clone(),
			tags: self.tags.clone(),
			search: self.search.clone(),
			cursor: None,
			sort: self.sort,
		}
	}
}

/// An input reported by the discovery bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryAction {
	/// Raw search input, debounced by the owner before it reaches the filter.
	SetQuery(String),
	SetSort(Sort),
	SelectCategory(Category),
	ToggleTag(String),
}

/// A selectable filter pill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
	pub label: String,
	pub active: bool,
}

impl Chip {
	/// The action emitted when a category chip is pressed.
	pub fn select_category(&self) -> DiscoveryAction {
		DiscoveryAction::SelectCategory(Category::from_label(&self.label))
	}

	/// The action emitted when a tag chip is pressed.
	pub fn toggle_tag(&self) -> DiscoveryAction {
		DiscoveryAction::ToggleTag(self.label.clone())
	}
}

/// A snapshot of everything the discovery bar displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryBar {
	/// The search box contents, which may run ahead of the settled filter.
	pub query: String,
	pub sort: Sort,
	/// Category chips, starting with the sentinel "all" chip.
	pub categories: Vec<Chip>,
	pub tags: Vec<Chip>,
}

impl DiscoveryBar {
	pub fn new(input: &str, filter: &FilterState, categories: &[String], tags: &[String]) -> Self {
		let categories = std::iter::once(ALL_CATEGORIES)
			.chain(categories.iter().map(String::as_str).filter(|c| *c != ALL_CATEGORIES))
			.map(|label| Chip {
				label: label.to_owned(),
				active: filter.category.label() == label,
			})
			.collect();

		let tags = tags
			.iter()
			.map(|tag| Chip {
				label: tag.clone(),
				active: filter.tags.contains(tag),
			})
			.collect();

		Self {
			query: input.to_owned(),
			sort: filter.sort,
			categories,
			tags,
		}
	}

	/// The tag row is hidden when the loaded posts carry no tags.
	pub fn shows_tags(&self) -> bool {
		!self.tags.is_empty()
	}
}
