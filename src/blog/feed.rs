//! The paginated post list behind the blog page.
//!
//! [`Feed`] is a plain state machine: every transition that needs data
//! returns a [`FetchRequest`], and the caller reports the outcome back with
//! [`Feed::page_loaded`] or [`Feed::page_failed`]. Each request carries the
//! generation it was issued in, so responses to a superseded filter are
//! dropped instead of overwriting newer results.
//!
//! ```text
//! Idle ── start ──▶ Loading ── page ──▶ Loaded ── sentinel ──▶ LoadingMore
//!                     ▲  │                ▲                        │
//!           filter ───┘  └── error ──▶ Error ◀──── error ──────────┘
//!                                     (retry re-issues the request)
//! ```

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, Locale, Offset, Utc};
use tokio::time::Instant;

use super::discovery::{DiscoveryAction, DiscoveryBar, FilterState};
use crate::content::{ContentStore, Post, PostQuery, PAGE_SIZE};

/// How long search input must be stable before it filters the list.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Month labels are rendered in Turkish local time.
const LOCAL_OFFSET_SECONDS: i32 = 3 * 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
	Idle,
	/// Loading the first page of the current filter.
	Loading,
	Loaded,
	LoadingMore,
	/// The last fetch failed; auto-loading stops until [`Feed::retry`].
	Error(String),
}

/// A page fetch the owner of the feed must perform.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
	pub generation: u64,
	pub query: PostQuery,
	/// Whether the page extends the current results or replaces them.
	pub append: bool,
}

/// One item of the rendered list.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEntry<'a> {
	MonthDivider(String),
	Post(&'a Post),
}

/// Debounces raw search input.
#[derive(Debug, Clone)]
pub struct SearchDebounce {
	delay: Duration,
	pending: Option<(String, Instant)>,
}

impl Default for SearchDebounce {
	fn default() -> Self {
		Self::new(SEARCH_DEBOUNCE)
	}
}

impl SearchDebounce {
	pub fn new(delay: Duration) -> Self {
		Self {
			delay,
			pending: None,
		}
	}

	/// Records new input, restarting the timer.
	pub fn input(&mut self, text: String, now: Instant) {
		self.pending = Some((text, now + self.delay));
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.pending.as_ref().map(|(_, deadline)| *deadline)
	}

	/// Returns the trimmed input once it has been stable for the full delay.
	pub fn poll(&mut self, now: Instant) -> Option<String> {
		match &self.pending {
			Some((_, deadline)) if now >= *deadline => self
				.pending
				.take()
				.map(|(text, _)| text.trim().to_owned()),
			_ => None,
		}
	}
}

/// The formatted month a post belongs to, e.g. "Ocak 2025".
pub fn month_label(published_at: DateTime<Utc>) -> String {
	let offset = FixedOffset::east_opt(LOCAL_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix());

	published_at
		.with_timezone(&offset)
		.format_localized("%B %Y", Locale::tr_TR)
		.to_string()
}

#[derive(Debug, Clone)]
pub struct Feed {
	filter: FilterState,
	/// What the search box shows, ahead of the debounced filter.
	search_input: String,
	debounce: SearchDebounce,
	posts: Vec<Post>,
	cursor: Option<DateTime<Utc>>,
	has_more: bool,
	status: Status,
	generation: u64,
	failed: Option<FetchRequest>,
	all_categories: Vec<String>,
}

impl Default for Feed {
	fn default() -> Self {
		Self::new(SearchDebounce::default())
	}
}

impl Feed {
	pub fn new(debounce: SearchDebounce) -> Self {
		Self {
			filter: FilterState::default(),
			search_input: String::new(),
			debounce,
			posts: Vec::new(),
			cursor: None,
			has_more: false,
			status: Status::Idle,
			generation: 0,
			failed: None,
			all_categories: Vec::new(),
		}
	}

	pub fn posts(&self) -> &[Post] {
		&self.posts
	}

	pub fn status(&self) -> &Status {
		&self.status
	}

	pub fn has_more(&self) -> bool {
		self.has_more
	}

	pub fn cursor(&self) -> Option<DateTime<Utc>> {
		self.cursor
	}

	pub fn filter(&self) -> &FilterState {
		&self.filter
	}

	/// When the pending search input settles, if any.
	pub fn search_deadline(&self) -> Option<Instant> {
		self.debounce.deadline()
	}

	/// Loads the first page on mount.
	pub fn start(&mut self) -> FetchRequest {
		self.reset()
	}

	/// Discards results and cursor and requests the first page of the current filter.
	fn reset(&mut self) -> FetchRequest {
		self.generation += 1;
		self.posts.clear();
		self.cursor = None;
		self.has_more = true;
		self.failed = None;
		self.status = Status::Loading;

		tracing::debug!(generation = self.generation, "feed reset");

		FetchRequest {
			generation: self.generation,
			query: self.filter.query(),
			append: false,
		}
	}

	/// Applies a discovery bar action. Search text only takes effect once
	/// [`Feed::tick`] sees it settle.
	pub fn apply(&mut self, action: DiscoveryAction, now: Instant) -> Option<FetchRequest> {
		let previous = self.filter.clone();

		match action {
			DiscoveryAction::SetQuery(text) => {
				self.search_input.clone_from(&text);
				self.debounce.input(text, now);
				return None;
			}
			DiscoveryAction::SetSort(sort) => self.filter.sort = sort,
			DiscoveryAction::SelectCategory(category) => self.filter.category = category,
			DiscoveryAction::ToggleTag(tag) => self.filter.toggle_tag(&tag),
		}

		(self.filter != previous).then(|| self.reset())
	}

	/// Promotes settled search input into the filter.
	pub fn tick(&mut self, now: Instant) -> Option<FetchRequest> {
		let search = self.debounce.poll(now)?;

		if search == self.filter.search {
			return None;
		}

		self.filter.search = search;
		Some(self.reset())
	}

	/// The end-of-list sentinel scrolled into view.
	pub fn sentinel_visible(&mut self) -> Option<FetchRequest> {
		if self.status != Status::Loaded || !self.has_more {
			return None;
		}

		let cursor = self.cursor?;
		self.status = Status::LoadingMore;

		Some(FetchRequest {
			generation: self.generation,
			query: self.filter.query().after(cursor),
			append: true,
		})
	}

	/// Applies a fetched page. Returns `false` if the response was stale and ignored.
	pub fn page_loaded(&mut self, request: &FetchRequest, page: Vec<Post>) -> bool {
		if request.generation != self.generation {
			tracing::debug!(
				stale = request.generation,
				current = self.generation,
				"dropping superseded page"
			);
			return false;
		}

		self.has_more = page.len() == PAGE_SIZE;

		if let Some(last) = page.last() {
			self.cursor = Some(last.published_at);
		}

		if request.append {
			self.posts.extend(page);
		} else {
			self.posts = page;
		}

		self.failed = None;
		self.status = Status::Loaded;
		true
	}

	/// Records a failed fetch. Returns `false` if the request was stale.
	pub fn page_failed(&mut self, request: &FetchRequest, message: impl Into<String>) -> bool {
		if request.generation != self.generation {
			return false;
		}

		self.failed = Some(request.clone());
		self.status = Status::Error(message.into());
		true
	}

	/// Re-issues the request that failed. Only a manual action triggers this.
	pub fn retry(&mut self) -> Option<FetchRequest> {
		if !matches!(self.status, Status::Error(_)) {
			return None;
		}

		let request = self.failed.take()?;

		self.status = if request.append {
			Status::LoadingMore
		} else {
			Status::Loading
		};

		Some(request)
	}

	/// Stores the full category list, which takes precedence over categories seen in posts.
	pub fn categories_loaded(&mut self, categories: Vec<String>) {
		self.all_categories = categories;
	}

	pub fn categories(&self) -> Vec<String> {
		if self.all_categories.is_empty() {
			unique(self.posts.iter().flat_map(|post| post.categories.iter()))
		} else {
			self.all_categories.clone()
		}
	}

	/// Tags of the currently loaded posts only.
	pub fn tags(&self) -> Vec<String> {
		unique(self.posts.iter().flat_map(|post| post.tags.iter()))
	}

	/// The list with a month divider before the first post of each month.
	pub fn entries(&self) -> Vec<FeedEntry<'_>> {
		let mut entries = Vec::with_capacity(self.posts.len());
		let mut previous: Option<String> = None;

		for post in &self.posts {
			let month = month_label(post.published_at);

			if previous.as_deref() != Some(month.as_str()) {
				entries.push(FeedEntry::MonthDivider(month.clone()));
			}

			entries.push(FeedEntry::Post(post));
			previous = Some(month);
		}

		entries
	}

	pub fn discovery_bar(&self) -> DiscoveryBar {
		DiscoveryBar::new(&self.search_input, &self.filter, &self.categories(), &self.tags())
	}
}

fn unique<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
	let mut seen = Vec::<String>::new();

	for value in values {
		if !seen.contains(value) {
			seen.push(value.clone());
		}
	}

	seen
}

/// Runs a [`Feed`]'s requests against a content store, one at a time.
pub struct FeedDriver {
	store: Arc<dyn ContentStore>,
	pub feed: Feed,
}

impl FeedDriver {
	pub fn new(store: Arc<dyn ContentStore>) -> Self {
		Self {
			store,
			feed: Feed::default(),
		}
	}

	async fn run(&mut self, request: Option<FetchRequest>) {
		let Some(request) = request else {
			return;
		};

		match self.store.posts(&request.query).await {
			Ok(page) => {
				self.feed.page_loaded(&request, page);
			}
			Err(error) => {
				tracing::warn!(%error, append = request.append, "failed to load posts");
				self.feed.page_failed(&request, error.to_string());
			}
		}
	}

	/// Loads the category list and the first page.
	pub async fn mount(&mut self) {
		match self.store.categories().await {
			Ok(categories) => self.feed.categories_loaded(categories),
			// chips fall back to the categories of loaded posts
			Err(error) => tracing::debug!(%error, "failed to load categories"),
		}

		let request = self.feed.start();
		self.run(Some(request)).await;
	}

	pub async fn dispatch(&mut self, action: DiscoveryAction, now: Instant) {
		let request = self.feed.apply(action, now);
		self.run(request).await;
	}

	pub async fn tick(&mut self, now: Instant) {
		let request = self.feed.tick(now);
		self.run(request).await;
	}

	pub async fn scrolled_to_end(&mut self) {
		let request = self.feed.sentinel_visible();
		self.run(request).await;
	}

	pub async fn retry(&mut self) {
		let request = self.feed.retry();
		self.run(request).await;
	}
}

#[cfg(test)]
mod test {
	use std::sync::atomic::{AtomicBool, Ordering};

	use chrono::{Duration as ChronoDuration, TimeZone};

	use super::*;
	use crate::content::{self, Category, MemoryStore, Sort};

	fn post(i: usize, published_at: DateTime<Utc>) -> Post {
		Post {
			id: format!("post-{i}"),
			title: format!("Yazı {i}"),
			slug: Some(format!("yazi-{i}")),
			published_at,
			description: None,
			main_image: None,
			author: None,
			categories: vec!["Teknoloji".into()],
			tags: vec![format!("t{}", i % 3)],
		}
	}

	/// Posts 1..=count, post 1 newest, one day apart.
	fn posts(count: usize) -> Vec<Post> {
		let newest = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();

		(1..=count)
			.map(|i| post(i, newest - ChronoDuration::days(i64::try_from(i).unwrap())))
			.collect()
	}

	fn ids(feed: &Feed) -> Vec<&str> {
		feed.posts().iter().map(|p| p.id.as_str()).collect()
	}

	#[tokio::test]
	async fn test_thirty_posts_paginate_in_two_pages() {
		let mut driver = FeedDriver::new(Arc::new(MemoryStore::new(posts(30))));

		driver.mount().await;

		assert_eq!(driver.feed.status(), &Status::Loaded);
		assert_eq!(driver.feed.posts().len(), 24);
		assert!(driver.feed.has_more());
		assert_eq!(driver.feed.cursor(), Some(driver.feed.posts()[23].published_at));

		driver.scrolled_to_end().await;

		assert_eq!(driver.feed.posts().len(), 30);
		assert_eq!(ids(&driver.feed)[24], "post-25");
		assert_eq!(ids(&driver.feed)[29], "post-30");
		assert!(!driver.feed.has_more());

		// nothing more to load
		assert!(driver.feed.sentinel_visible().is_none());
	}

	#[tokio::test]
	async fn test_oldest_first_pages_follow_cursor_forward() {
		let mut driver = FeedDriver::new(Arc::new(MemoryStore::new(posts(30))));

		driver.mount().await;
		driver
			.dispatch(DiscoveryAction::SetSort(Sort::Oldest), Instant::now())
			.await;

		assert_eq!(driver.feed.posts().len(), 24);
		assert_eq!(ids(&driver.feed)[0], "post-30");
		assert_eq!(ids(&driver.feed)[23], "post-7");

		let first_cursor = driver.feed.cursor().unwrap();

		driver.scrolled_to_end().await;

		let second_cursor = driver.feed.cursor().unwrap();
		assert!(second_cursor > first_cursor);
		assert!(!driver.feed.has_more());

		// every post exactly once, strictly ascending across the page boundary
		assert_eq!(driver.feed.posts().len(), 30);
		assert_eq!(ids(&driver.feed)[24], "post-6");
		assert_eq!(ids(&driver.feed)[29], "post-1");
		assert!(driver
			.feed
			.posts()
			.windows(2)
			.all(|pair| pair[0].published_at < pair[1].published_at));
	}

	#[test]
	fn test_cursor_is_monotonic_across_pages() {
		let all = posts(60);
		let mut feed = Feed::default();

		let first = feed.start();
		feed.page_loaded(&first, all[..24].to_vec());
		let first_cursor = feed.cursor().unwrap();

		let second = feed.sentinel_visible().unwrap();
		assert_eq!(second.query.cursor, Some(first_cursor));
		assert!(second.append);

		feed.page_loaded(&second, all[24..48].to_vec());

		assert!(feed.cursor().unwrap() < first_cursor);
		assert_eq!(feed.cursor(), Some(all[47].published_at));
	}

	#[test]
	fn test_full_last_page_keeps_has_more() {
		let all = posts(48);
		let mut feed = Feed::default();

		let first = feed.start();
		feed.page_loaded(&first, all[..24].to_vec());
		let second = feed.sentinel_visible().unwrap();
		feed.page_loaded(&second, all[24..].to_vec());

		// exactly a full page: another (empty) fetch is needed to learn the end
		assert!(feed.has_more());

		let third = feed.sentinel_visible().unwrap();
		feed.page_loaded(&third, Vec::new());

		assert!(!feed.has_more());
		assert_eq!(feed.posts().len(), 48);
		assert_eq!(feed.cursor(), Some(all[47].published_at));
	}

	#[test]
	fn test_filter_change_resets_and_drops_stale_pages() {
		let all = posts(30);
		let mut feed = Feed::default();
		let now = Instant::now();

		let first = feed.start();
		feed.page_loaded(&first, all[..24].to_vec());

		let more = feed.sentinel_visible().unwrap();
		let changed = feed
			.apply(DiscoveryAction::SelectCategory(Category::Named("Kültür".into())), now)
			.unwrap();

		assert_eq!(feed.status(), &Status::Loading);
		assert!(feed.posts().is_empty());
		assert!(feed.cursor().is_none());
		assert!(!changed.append);
		assert!(changed.query.cursor.is_none());

		// the in-flight page for the old filter arrives late
		assert!(!feed.page_loaded(&more, all[24..].to_vec()));
		assert!(feed.posts().is_empty());

		assert!(feed.page_loaded(&changed, all[..2].to_vec()));
		assert_eq!(feed.posts().len(), 2);
		assert!(!feed.has_more());
	}

	#[test]
	fn test_unchanged_filter_does_not_refetch() {
		let mut feed = Feed::default();
		let now = Instant::now();

		feed.start();

		assert!(feed
			.apply(DiscoveryAction::SelectCategory(Category::All), now)
			.is_none());
		assert!(feed.apply(DiscoveryAction::SetSort(Sort::Newest), now).is_none());

		let request = feed.apply(DiscoveryAction::SetSort(Sort::Oldest), now).unwrap();
		assert_eq!(request.query.sort, Sort::Oldest);

		let request = feed.apply(DiscoveryAction::ToggleTag("ai".into()), now).unwrap();
		assert!(request.query.tags.contains("ai"));
	}

	#[test]
	fn test_search_is_debounced() {
		let mut feed = Feed::default();
		let start = Instant::now();

		feed.start();

		assert!(feed
			.apply(DiscoveryAction::SetQuery("blo".into()), start)
			.is_none());
		assert!(feed
			.apply(
				DiscoveryAction::SetQuery(" blockchain ".into()),
				start + Duration::from_millis(200)
			)
			.is_none());

		assert_eq!(feed.discovery_bar().query, " blockchain ");
		assert!(feed.tick(start + Duration::from_millis(450)).is_none());

		let request = feed.tick(start + Duration::from_millis(500)).unwrap();

		assert_eq!(request.query.search, "blockchain");
		assert_eq!(feed.filter().search, "blockchain");
		assert!(feed.search_deadline().is_none());
	}

	#[test]
	fn test_failure_stops_autoload_until_retry() {
		let all = posts(30);
		let mut feed = Feed::default();

		let first = feed.start();
		feed.page_loaded(&first, all[..24].to_vec());

		let more = feed.sentinel_visible().unwrap();
		assert!(feed.page_failed(&more, "timeout"));

		assert_eq!(feed.status(), &Status::Error("timeout".into()));
		assert!(feed.sentinel_visible().is_none());
		assert_eq!(feed.posts().len(), 24);

		let retried = feed.retry().unwrap();
		assert_eq!(retried, more);
		assert_eq!(feed.status(), &Status::LoadingMore);
		assert!(feed.retry().is_none());
	}

	#[test]
	fn test_categories_prefer_full_list() {
		let mut all = posts(3);
		all[1].categories = vec!["Kültür".into()];

		let mut feed = Feed::default();
		let first = feed.start();
		feed.page_loaded(&first, all);

		assert_eq!(feed.categories(), ["Teknoloji", "Kültür"]);
		assert_eq!(feed.tags(), ["t1", "t2", "t0"]);

		feed.categories_loaded(vec!["Bilim".into(), "Kültür".into(), "Teknoloji".into()]);

		assert_eq!(feed.categories(), ["Bilim", "Kültür", "Teknoloji"]);
	}

	#[test]
	fn test_month_dividers_compare_adjacent_posts() {
		let at = |m, d| Utc.with_ymd_and_hms(2025, m, d, 12, 0, 0).unwrap();
		let mut feed = Feed::default();
		let first = feed.start();

		feed.page_loaded(
			&first,
			vec![post(1, at(3, 20)), post(2, at(3, 2)), post(3, at(2, 14)), post(4, at(1, 30))],
		);

		let labels = feed
			.entries()
			.into_iter()
			.map(|entry| match entry {
				FeedEntry::MonthDivider(label) => label,
				FeedEntry::Post(post) => post.id.clone(),
			})
			.collect::<Vec<_>>();

		assert_eq!(
			labels,
			["Mart 2025", "post-1", "post-2", "Şubat 2025", "post-3", "Ocak 2025", "post-4"]
		);
	}

	#[test]
	fn test_month_label_uses_local_time() {
		// 22:30 UTC on the last day of January is already February in Istanbul
		let late = Utc.with_ymd_and_hms(2025, 1, 31, 22, 30, 0).unwrap();

		assert_eq!(month_label(late), "Şubat 2025");
	}

	struct FlakyStore {
		inner: MemoryStore,
		fail: AtomicBool,
	}

	#[async_trait::async_trait]
	impl ContentStore for FlakyStore {
		async fn posts(&self, query: &PostQuery) -> Result<Vec<Post>, content::Error> {
			if self.fail.swap(false, Ordering::SeqCst) {
				return Err(content::Error::Query {
					status: 500,
					message: "unavailable".into(),
				});
			}

			self.inner.posts(query).await
		}

		async fn categories(&self) -> Result<Vec<String>, content::Error> {
			Err(content::Error::Endpoint("offline".into()))
		}

		async fn post(&self, slug: &str) -> Result<Option<Post>, content::Error> {
			self.inner.post(slug).await
		}

		async fn body_text(&self, slug: &str) -> Result<Option<String>, content::Error> {
			self.inner.body_text(slug).await
		}
	}

	#[tokio::test]
	async fn test_driver_manual_retry_after_failure() {
		let mut driver = FeedDriver::new(Arc::new(FlakyStore {
			inner: MemoryStore::new(posts(5)),
			fail: AtomicBool::new(true),
		}));

		driver.mount().await;

		assert!(matches!(driver.feed.status(), Status::Error(_)));
		assert!(driver.feed.posts().is_empty());

		driver.retry().await;

		assert_eq!(driver.feed.status(), &Status::Loaded);
		assert_eq!(driver.feed.posts().len(), 5);
		// categories fall back to those seen in posts
		assert_eq!(driver.feed.categories(), ["Teknoloji"]);
	}
}
