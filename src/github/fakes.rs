//! In-memory fake repository host (testing only)
//!
//! `FakeHost` serves scripted search pages and per-repository listings,
//! counts every call, can inject failures, and records how many requests were
//! ever in flight at once.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::error::{ApiError, ApiResult};
use super::host::RepositoryHost;
use super::types::{CommitRef, ContentEntry, Contributor, RateLimitState, RawCandidate, SearchQuery};

/// Which endpoint a scripted failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Search,
    Contributors,
    Commits,
    Contents,
    RateLimit,
}

/// Per-endpoint call counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub search: usize,
    pub contributors: usize,
    pub commits: usize,
    pub contents: usize,
    pub rate_limit: usize,
}

impl CallCounts {
    /// Calls made against a single repository's listings
    pub fn detail_calls(&self) -> usize {
        self.contributors + self.commits + self.contents
    }
}

/// Scripted listings for one repository
#[derive(Debug, Clone, Default)]
pub struct RepoScript {
    pub contributors: usize,
    pub recent_commits: usize,
    pub total_commits: usize,
    /// Directory path ("" for root) to its entries
    pub tree: HashMap<String, Vec<ContentEntry>>,
}

impl RepoScript {
    /// A repository that clears the default criteria comfortably
    pub fn passing() -> Self {
        Self {
            contributors: 45,
            recent_commits: 12,
            total_commits: 400,
            tree: nested_tree(6, 12),
        }
    }

    pub fn contributors(mut self, count: usize) -> Self {
        self.contributors = count;
        self
    }

    pub fn recent_commits(mut self, count: usize) -> Self {
        self.recent_commits = count;
        self
    }

    pub fn total_commits(mut self, count: usize) -> Self {
        self.total_commits = count;
        self
    }

    pub fn tree(mut self, tree: HashMap<String, Vec<ContentEntry>>) -> Self {
        self.tree = tree;
        self
    }
}

/// A root with `dirs` subdirectories of `files_per_dir` files each, plus a README
pub fn nested_tree(dirs: usize, files_per_dir: usize) -> HashMap<String, Vec<ContentEntry>> {
    let mut tree = HashMap::new();
    let mut root = vec![ContentEntry::file("README.md")];
    for d in 0..dirs {
        let dir = format!("module{}", d);
        let files = (0..files_per_dir)
            .map(|f| ContentEntry::file(format!("{}/File{}.java", dir, f)))
            .collect();
        tree.insert(dir.clone(), files);
        root.push(ContentEntry::dir(dir));
    }
    tree.insert(String::new(), root);
    tree
}

/// A root holding `count` plain files
pub fn flat_tree(count: usize) -> HashMap<String, Vec<ContentEntry>> {
    let files = (0..count).map(|f| ContentEntry::file(format!("File{}.java", f))).collect();
    HashMap::from([(String::new(), files)])
}

/// A deterministic candidate record with the given id
pub fn sample_candidate(id: u64) -> RawCandidate {
    let created = Utc.with_ymd_and_hms(2014, 6, 1, 8, 0, 0).unwrap();
    RawCandidate {
        id,
        name: format!("project-{}", id),
        full_name: format!("owner{}/project-{}", id, id),
        html_url: format!("https://github.com/owner{}/project-{}", id, id),
        url: format!("https://api.github.com/repos/owner{}/project-{}", id, id),
        created_at: created,
        updated_at: created + Duration::days(1000),
        pushed_at: Some(created + Duration::days(999)),
        language: Some("Java".to_string()),
        stargazers_count: id * 10,
        watchers_count: id * 10,
        default_branch: "master".to_string(),
    }
}

pub fn sample_query() -> SearchQuery {
    SearchQuery {
        created_before: Utc.with_ymd_and_hms(2016, 4, 22, 0, 0, 0).unwrap(),
        language: "Java".to_string(),
        sort: "updated".to_string(),
        order: "desc".to_string(),
    }
}

#[derive(Default)]
struct FakeState {
    search_pages: Vec<Vec<RawCandidate>>,
    search_pages_requested: Vec<u32>,
    search_page_failures: HashMap<u32, VecDeque<ApiError>>,
    repos: HashMap<u64, RepoScript>,
    failures: HashMap<Endpoint, VecDeque<ApiError>>,
    rate_limits: VecDeque<RateLimitState>,
    calls: CallCounts,
}

pub struct FakeHost {
    page_size: usize,
    state: Mutex<FakeState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::with_page_size(30)
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            state: Mutex::new(FakeState::default()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_search_pages(&self, pages: Vec<Vec<RawCandidate>>) {
        self.state().search_pages = pages;
    }

    /// Serve `candidates` as consecutive full pages
    pub fn set_search_results(&self, candidates: Vec<RawCandidate>) {
        let pages = candidates.chunks(self.page_size.max(1)).map(|c| c.to_vec()).collect();
        self.set_search_pages(pages);
    }

    pub fn set_repo(&self, id: u64, script: RepoScript) {
        self.state().repos.insert(id, script);
    }

    /// Queue a failure for the next call to `endpoint`
    pub fn fail_next(&self, endpoint: Endpoint, error: ApiError) {
        self.state().failures.entry(endpoint).or_default().push_back(error);
    }

    pub fn fail_next_search(&self, error: ApiError) {
        self.fail_next(Endpoint::Search, error);
    }

    /// Queue a failure for the next request of a specific search page
    pub fn fail_search_page(&self, page: u32, error: ApiError) {
        self.state().search_page_failures.entry(page).or_default().push_back(error);
    }

    /// Queue quota readings; the last one repeats
    pub fn push_rate_limit(&self, state: RateLimitState) {
        self.state().rate_limits.push_back(state);
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }

    pub fn search_pages_requested(&self) -> Vec<u32> {
        self.state().search_pages_requested.clone()
    }

    /// Highest number of simultaneously outstanding requests observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Give any concurrent caller a chance to overlap
        tokio::task::yield_now().await;
        InFlight(&self.in_flight)
    }

    fn take_failure(&self, endpoint: Endpoint) -> Option<ApiError> {
        self.state().failures.get_mut(&endpoint).and_then(|q| q.pop_front())
    }

    fn script(&self, repo: &RawCandidate) -> ApiResult<RepoScript> {
        self.state()
            .repos
            .get(&repo.id)
            .cloned()
            .ok_or_else(|| ApiError::status(404, format!("no script for {}", repo.full_name)))
    }

    fn page_of(&self, total: usize, page: u32) -> usize {
        let skip = (page.saturating_sub(1) as usize) * self.page_size;
        total.saturating_sub(skip).min(self.page_size)
    }
}

#[async_trait]
impl RepositoryHost for FakeHost {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn search_page(&self, _query: &SearchQuery, page: u32) -> ApiResult<Vec<RawCandidate>> {
        let _guard = self.enter().await;
        let mut state = self.state();
        state.calls.search += 1;
        state.search_pages_requested.push(page);

        if let Some(err) = state.failures.get_mut(&Endpoint::Search).and_then(|q| q.pop_front()) {
            return Err(err);
        }
        if let Some(err) = state.search_page_failures.get_mut(&page).and_then(|q| q.pop_front()) {
            return Err(err);
        }
        Ok(state.search_pages.get(page as usize - 1).cloned().unwrap_or_default())
    }

    async fn contributors_page(&self, repo: &RawCandidate, page: u32) -> ApiResult<Vec<Contributor>> {
        let _guard = self.enter().await;
        self.state().calls.contributors += 1;
        if let Some(err) = self.take_failure(Endpoint::Contributors) {
            return Err(err);
        }
        let count = self.page_of(self.script(repo)?.contributors, page);
        Ok((0..count)
            .map(|i| Contributor { login: Some(format!("dev{}-{}", page, i)), contributions: 1 })
            .collect())
    }

    async fn commits_page(
        &self,
        repo: &RawCandidate,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> ApiResult<Vec<CommitRef>> {
        let _guard = self.enter().await;
        self.state().calls.commits += 1;
        if let Some(err) = self.take_failure(Endpoint::Commits) {
            return Err(err);
        }
        let script = self.script(repo)?;
        let total = if since.is_some() { script.recent_commits } else { script.total_commits };
        let count = self.page_of(total, page);
        Ok((0..count).map(|i| CommitRef { sha: format!("{:040x}", page as usize * 1000 + i) }).collect())
    }

    async fn contents(&self, repo: &RawCandidate, path: &str) -> ApiResult<Vec<ContentEntry>> {
        let _guard = self.enter().await;
        self.state().calls.contents += 1;
        if let Some(err) = self.take_failure(Endpoint::Contents) {
            return Err(err);
        }
        self.script(repo)?
            .tree
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::status(404, format!("no directory {}", path)))
    }

    async fn rate_limit(&self) -> ApiResult<RateLimitState> {
        let mut state = self.state();
        state.calls.rate_limit += 1;
        if let Some(err) = state.failures.get_mut(&Endpoint::RateLimit).and_then(|q| q.pop_front()) {
            return Err(err);
        }
        let reading = if state.rate_limits.len() > 1 {
            state.rate_limits.pop_front()
        } else {
            state.rate_limits.front().copied()
        };
        Ok(reading.unwrap_or_else(|| RateLimitState::new(5000, Utc::now() + Duration::hours(1))))
    }
}
