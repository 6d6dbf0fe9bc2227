use std::fmt::Display;

use crate::datasets::{
    rows::RowsRequest,
    sentiment::{Labels, Source},
};

/// The IMDB movie review dataset
pub static IMDB: &str = "imdb";

/// The Rotten Tomatoes movie review dataset
pub static ROTTEN_TOMATOES: &str = "rotten_tomatoes";

/// The Dataset enum
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Dataset {
    /// IMDB reviews
    Imdb,

    /// Rotten Tomatoes reviews
    RottenTomatoes,
}

impl Dataset {
    /// The hosted repository, configuration and split that hold the rows
    fn location(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Dataset::Imdb => ("stanfordnlp/imdb", "plain_text", "train"),
            Dataset::RottenTomatoes => ("cornell-movie-review-data/rotten_tomatoes", "default", "train"),
        }
    }

    /// Describe where to fetch `num_rows` rows of this dataset from
    pub fn source(&self, num_rows: usize) -> Source {
        let (repo, config, split) = self.location();

        Source::new(
            self.to_string(),
            RowsRequest::new(repo.to_string(), config.to_string(), split.to_string(), num_rows),
            Labels::default(),
        )
    }
}

impl TryFrom<&str> for Dataset {
    type Error = DatasetError;

    /// Try to convert a string to a Dataset
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.to_lowercase();

        if value == IMDB {
            Ok(Dataset::Imdb)
        } else if value == ROTTEN_TOMATOES {
            Ok(Dataset::RottenTomatoes)
        } else {
            Err(Self::Error::Unknown(value))
        }
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dataset::Imdb => IMDB,
            Dataset::RottenTomatoes => ROTTEN_TOMATOES,
        };

        write!(f, "{}", name)
    }
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// No dataset found for the given string
    #[error("no dataset found for {0}")]
    Unknown(String),
}
