use async_trait::async_trait;

/// The Hugging Face datasets-server rows client
pub mod rows;

/// Sentiment-labeled text datasets
pub mod sentiment;

/// A dataset which can be loaded
#[async_trait]
pub trait LoadableDataset<I>: burn::data::dataset::Dataset<I> {
    /// Load the dataset, using the local cache under `data_dir` unless `refresh` is set
    async fn load(
        source: &sentiment::Source,
        data_dir: &str,
        refresh: bool,
    ) -> Result<Self, LoadError>
    where
        Self: std::marker::Sized;
}

/// Errors raised while fetching, caching, or splitting a dataset
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    /// The HTTP request could not be sent or its body could not be decoded
    #[error("dataset request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request URL could not be built
    #[error("invalid dataset url: {0}")]
    Url(#[from] url::ParseError),

    /// The server answered with a non-success status
    #[error("{url} returned {status}")]
    Status {
        /// The requested URL
        url: String,

        /// The HTTP status returned
        status: reqwest::StatusCode,
    },

    /// The local CSV cache could not be read or written
    #[error("dataset cache error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// No usable labeled rows were found
    #[error("no labeled rows found for {0}")]
    Empty(String),

    /// A class has no rows, so a classifier could not learn it
    #[error("no rows labeled {label} in {dataset}")]
    MissingClass {
        /// The dataset that was loaded
        dataset: String,

        /// The class with no rows
        label: String,
    },

    /// The requested test fraction is outside of (0, 1)
    #[error("test size must be between 0 and 1, got {0}")]
    InvalidSplit(f64),
}
