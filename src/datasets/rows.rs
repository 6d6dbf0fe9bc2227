//! Client for the Hugging Face datasets-server `rows` endpoint.
//!
//! The endpoint returns JSON pages shaped like
//! `{ "rows": [{ "row_idx": 0, "row": { "text": "...", "label": 1 } }], "num_rows_total": 25000 }`
//! and serves at most [`MAX_PAGE_LENGTH`] rows per request.

use derive_new::new;
use futures::future::try_join_all;
use serde::Deserialize;
use url::Url;

use super::LoadError;

/// The datasets-server rows endpoint
pub static ROWS_ENDPOINT: &str = "https://datasets-server.huggingface.co/rows";

/// The largest page the rows endpoint will serve
pub const MAX_PAGE_LENGTH: usize = 100;

/// Number of pages a request is spread over, when it has enough rows
pub const SPREAD_PAGES: usize = 10;

static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Identifies a slice of rows from a hosted dataset
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct RowsRequest {
    /// The dataset repository id (e.g., "stanfordnlp/imdb")
    pub dataset: String,

    /// The dataset configuration (e.g., "plain_text")
    pub config: String,

    /// The split to read rows from (e.g., "train")
    pub split: String,

    /// How many rows to sample from the split
    pub num_rows: usize,
}

impl RowsRequest {
    /// Build the URL for a single page of rows
    pub fn page_url(&self, endpoint: &str, offset: usize, length: usize) -> Result<Url, LoadError> {
        let url = Url::parse_with_params(
            endpoint,
            &[
                ("dataset", self.dataset.as_str()),
                ("config", self.config.as_str()),
                ("split", self.split.as_str()),
                ("offset", &offset.to_string()),
                ("length", &length.to_string()),
            ],
        )?;

        Ok(url)
    }
}

/// Length of each page when `num_rows` rows are spread over the split
pub fn page_length(num_rows: usize) -> usize {
    num_rows.div_ceil(SPREAD_PAGES).clamp(1, MAX_PAGE_LENGTH)
}

/// Plan the `(offset, length)` pages that sample `num_rows` rows out of a split of `total` rows
///
/// Hosted splits are often sorted by label, so the pages are spread evenly from the start of
/// the split to its end instead of reading one contiguous block. Pages never overlap and never
/// run past `total`. The first page always starts at offset 0.
pub fn plan_pages(total: usize, num_rows: usize) -> Vec<(usize, usize)> {
    let n = num_rows.min(total);
    if n == 0 {
        return Vec::new();
    }

    let length = page_length(n);
    let n_pages = n.div_ceil(length);
    let slack = total - n;

    (0..n_pages)
        .map(|i| {
            let offset = i * length + i * slack / n_pages;

            (offset, length.min(n - i * length))
        })
        .collect()
}

/// Flatten fetched pages into rows, keeping at most `limit`
pub fn collect_rows(pages: Vec<RowsPage>, limit: usize, dataset: &str) -> Vec<Row> {
    let entries: Vec<RowEntry> = pages
        .into_iter()
        .flat_map(|page| page.rows)
        .take(limit)
        .collect();

    let truncated = entries
        .iter()
        .filter(|entry| !entry.truncated_cells.is_empty())
        .count();

    if truncated > 0 {
        log::warn!(
            "{} of {} rows from {} had truncated cells",
            truncated,
            entries.len(),
            dataset
        );
    }

    entries.into_iter().map(|entry| entry.row).collect()
}

/// A single page returned by the rows endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct RowsPage {
    /// The rows in this page
    pub rows: Vec<RowEntry>,

    /// The total number of rows in the split, if reported
    #[serde(default)]
    pub num_rows_total: Option<usize>,
}

/// A row wrapper, carrying the row index and any truncated cells
#[derive(Clone, Debug, Deserialize)]
pub struct RowEntry {
    /// The row's index within the split
    #[serde(default)]
    pub row_idx: usize,

    /// The row contents
    pub row: Row,

    /// Names of cells the server shortened to fit the response
    #[serde(default)]
    pub truncated_cells: Vec<String>,
}

/// A raw sentiment row
#[derive(Clone, Debug, PartialEq, Deserialize, new)]
pub struct Row {
    /// The text to classify
    pub text: String,

    /// The label as published by the dataset, if any
    #[serde(default)]
    pub label: Option<RawLabel>,
}

/// Datasets publish labels either as class ids or as class names
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawLabel {
    /// A numeric class id
    Id(i64),

    /// A class name
    Name(String),
}

/// HTTP client for the rows endpoint
pub struct RowsClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl RowsClient {
    /// Create a client, picking up an optional `HF_TOKEN` from the environment
    pub fn new() -> Result<Self, LoadError> {
        let token = std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty());

        Self::build(token)
    }

    /// Create a client with an explicit token
    pub fn with_token(token: impl Into<String>) -> Result<Self, LoadError> {
        Self::build(Some(token.into()))
    }

    /// Send requests to another rows endpoint, such as a mirror
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build(token: Option<String>) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            endpoint: ROWS_ENDPOINT.to_string(),
            token,
        })
    }

    /// Fetch one page of rows
    pub async fn fetch_page(
        &self,
        request: &RowsRequest,
        offset: usize,
        length: usize,
    ) -> Result<RowsPage, LoadError> {
        let url = request.page_url(&self.endpoint, offset, length)?;

        log::debug!("GET {}", url);

        let mut builder = self.client.get(url.clone());
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response.json::<RowsPage>().await?)
    }

    /// Fetch up to `request.num_rows` rows, sampled evenly across the split
    ///
    /// The first page is fetched alone to learn the size of the split, then the remaining pages
    /// of the plan are requested concurrently.
    pub async fn fetch(&self, request: &RowsRequest) -> Result<Vec<Row>, LoadError> {
        if request.num_rows == 0 {
            return Ok(Vec::new());
        }

        let mut first = self
            .fetch_page(request, 0, page_length(request.num_rows))
            .await?;

        if first.rows.is_empty() {
            log::warn!("{} returned no rows", request.dataset);

            return Ok(Vec::new());
        }

        let total = first.num_rows_total.unwrap_or(request.num_rows);
        let plan = plan_pages(total, request.num_rows);

        if let Some((_, length)) = plan.first() {
            first.rows.truncate(*length);
        }

        let rest = try_join_all(
            plan.iter()
                .skip(1)
                .map(|(offset, length)| self.fetch_page(request, *offset, *length)),
        )
        .await?;

        let limit = plan.iter().map(|(_, length)| length).sum();
        let rows = collect_rows(
            std::iter::once(first).chain(rest).collect(),
            limit,
            &request.dataset,
        );

        log::info!(
            "Fetched {} rows from {} in {} pages across {} rows",
            rows.len(),
            request.dataset,
            plan.len(),
            total
        );

        Ok(rows)
    }
}

impl std::fmt::Debug for RowsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowsClient")
            .field("endpoint", &self.endpoint)
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}
