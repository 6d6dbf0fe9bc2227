use std::path::{Path, PathBuf};

use async_trait::async_trait;
use burn::data::dataset::{self, Dataset as _, InMemDataset};
use derive_new::new;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::pipelines::sequence_classification::text_classification;

use super::{
    rows::{RawLabel, Row, RowsClient, RowsRequest},
    LoadError, LoadableDataset,
};

/// The class names used when a dataset does not provide its own
pub static DEFAULT_LABELS: [&str; 2] = ["negative", "positive"];

/// Ordered sentiment class names, indexed by class id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels(Vec<String>);

impl Default for Labels {
    fn default() -> Self {
        Self(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect())
    }
}

impl Labels {
    /// Create a label set from class names
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// The class names, in class id order
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// The number of classes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no classes at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Map a published label onto a class id
    ///
    /// Numeric labels (and numeric strings) must already be a valid class id. Other strings match
    /// a class name case-insensitively, either in full or as an unambiguous prefix ("neg").
    pub fn class_id(&self, raw: &RawLabel) -> Option<usize> {
        match raw {
            RawLabel::Id(id) => usize::try_from(*id).ok().filter(|id| *id < self.len()),
            RawLabel::Name(name) => {
                let name = name.trim().to_lowercase();

                if let Ok(id) = name.parse::<i64>() {
                    return self.class_id(&RawLabel::Id(id));
                }

                if name.is_empty() {
                    return None;
                }

                if let Some(id) = self.0.iter().position(|n| n.to_lowercase() == name) {
                    return Some(id);
                }

                let mut prefixed = self
                    .0
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| n.to_lowercase().starts_with(&name));

                match (prefixed.next(), prefixed.next()) {
                    (Some((id, _)), None) => Some(id),
                    _ => None,
                }
            }
        }
    }
}

/// Where a sentiment dataset comes from and how its labels are named
#[derive(Clone, Debug, PartialEq, Eq, new)]
pub struct Source {
    /// Short name used for the local cache (e.g., "imdb")
    pub name: String,

    /// The rows to request from the datasets-server
    pub request: RowsRequest,

    /// The class names for this dataset
    pub labels: Labels,
}

/// A labeled text for sentiment classification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Item {
    /// The text for classification
    pub text: String,

    /// The class id of the text
    pub label: usize,
}

impl text_classification::Item for Item {
    fn input(&self) -> &str {
        &self.text
    }

    fn class_id(&self) -> usize {
        self.label
    }
}

/// An in-memory sentiment dataset
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,
}

impl dataset::Dataset<Item> for Dataset {
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Dataset {
    /// Wrap a list of items
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            dataset: InMemDataset::new(items),
        }
    }

    /// Map raw rows onto class ids, dropping rows whose label has no class
    pub fn from_rows(rows: Vec<Row>, labels: &Labels) -> Self {
        let total = rows.len();

        let items: Vec<Item> = rows
            .into_iter()
            .filter_map(|row| {
                let label = labels.class_id(row.label.as_ref()?)?;

                Some(Item::new(row.text, label))
            })
            .collect();

        if items.len() < total {
            log::warn!(
                "Dropped {} of {} rows without a usable label",
                total - items.len(),
                total
            );
        }

        Self::new(items)
    }

    /// Shuffle with the given seed and split off `test_size` of the items for evaluation
    ///
    /// Returns `(train, test)`. With at least two items, neither partition is empty.
    pub fn split(self, test_size: f64, seed: u64) -> Result<(Self, Self), LoadError> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(LoadError::InvalidSplit(test_size));
        }

        let mut items: Vec<Item> = self.dataset.iter().collect();
        items.shuffle(&mut StdRng::seed_from_u64(seed));

        let len = items.len();
        let mut n_test = (len as f64 * test_size).round() as usize;
        if len >= 2 {
            n_test = n_test.clamp(1, len - 1);
        }

        let train = items.split_off(n_test);

        Ok((Self::new(train), Self::new(items)))
    }

    /// Count the items in each class
    pub fn class_counts(&self, n_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; n_classes];

        for item in self.dataset.iter() {
            if let Some(count) = counts.get_mut(item.label) {
                *count += 1;
            }
        }

        counts
    }

    /// The location of the CSV cache for a source
    ///
    /// The number of requested rows is part of the key, so a larger or smaller request never
    /// reuses rows cached for another.
    pub fn cache_path(data_dir: &str, source: &Source) -> PathBuf {
        Path::new(data_dir)
            .join("datasets")
            .join(&source.name)
            .join(format!(
                "{}-{}.csv",
                source.request.split, source.request.num_rows
            ))
    }

    /// Fail when any class has no rows at all
    pub fn check_classes(&self, dataset: &str, labels: &Labels) -> Result<(), LoadError> {
        let counts = self.class_counts(labels.len());

        match counts.iter().position(|count| *count == 0) {
            Some(id) => Err(LoadError::MissingClass {
                dataset: dataset.to_string(),
                label: labels.names()[id].clone(),
            }),
            None => Ok(()),
        }
    }

    /// Load from the CSV cache, or fetch through `client` when the cache is missing, empty or
    /// `refresh` is set
    pub async fn load_with(
        client: &RowsClient,
        source: &Source,
        data_dir: &str,
        refresh: bool,
    ) -> Result<Self, LoadError> {
        let cache = Self::cache_path(data_dir, source);

        if !refresh && tokio::fs::try_exists(&cache).await? {
            log::info!("Loading {} from {}", source.name, cache.display());

            let dataset = Self::from_csv(&cache)?;
            if !dataset.is_empty() {
                dataset.check_classes(&source.request.dataset, &source.labels)?;

                return Ok(dataset);
            }

            log::warn!("Ignoring empty cache {}", cache.display());
        }

        log::info!(
            "Fetching {} rows of {} ({}/{})",
            source.request.num_rows,
            source.request.dataset,
            source.request.config,
            source.request.split
        );

        let rows = client.fetch(&source.request).await?;
        let dataset = Self::from_rows(rows, &source.labels);

        if dataset.is_empty() {
            return Err(LoadError::Empty(source.request.dataset.clone()));
        }

        dataset.check_classes(&source.request.dataset, &source.labels)?;
        dataset.save_csv(&cache)?;

        Ok(dataset)
    }

    /// Read a previously cached dataset
    pub fn from_csv(path: &Path) -> Result<Self, LoadError> {
        let reader = csv::ReaderBuilder::new();

        let dataset = InMemDataset::from_csv(path, &reader)?;

        Ok(Self { dataset })
    }

    /// Write the dataset to a CSV cache, creating parent directories as needed
    pub fn save_csv(&self, path: &Path) -> Result<(), LoadError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        for item in self.dataset.iter() {
            writer.serialize(item)?;
        }
        writer.flush()?;

        Ok(())
    }
}

#[async_trait]
impl LoadableDataset<Item> for Dataset {
    async fn load(source: &Source, data_dir: &str, refresh: bool) -> Result<Self, LoadError> {
        Self::load_with(&RowsClient::new()?, source, data_dir, refresh).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use burn::data::dataset::Dataset as _;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::datasets::rows::tests::{request, serve, sorted_split};

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("burn-sentiment-{}-{}", name, std::process::id()))
    }

    fn source(num_rows: usize) -> Source {
        Source::new("reviews".into(), request(num_rows), Labels::default())
    }

    fn client(endpoint: String) -> RowsClient {
        RowsClient::with_token("test").unwrap().with_endpoint(endpoint)
    }

    fn texts(dataset: &Dataset) -> Vec<String> {
        dataset.iter().map(|item| item.text).collect()
    }

    fn items(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| Item::new(format!("review {i}"), i % 2))
            .collect()
    }

    #[test]
    fn maps_numeric_and_named_labels() {
        let labels = Labels::default();

        assert_eq!(labels.class_id(&RawLabel::Id(0)), Some(0));
        assert_eq!(labels.class_id(&RawLabel::Id(1)), Some(1));
        assert_eq!(labels.class_id(&RawLabel::Id(-1)), None);
        assert_eq!(labels.class_id(&RawLabel::Id(2)), None);
        assert_eq!(labels.class_id(&RawLabel::Name("Positive".into())), Some(1));
        assert_eq!(labels.class_id(&RawLabel::Name("neg".into())), Some(0));
        assert_eq!(labels.class_id(&RawLabel::Name(" 1 ".into())), Some(1));
        assert_eq!(labels.class_id(&RawLabel::Name("neutral".into())), None);
        assert_eq!(labels.class_id(&RawLabel::Name("".into())), None);
    }

    #[test]
    fn ambiguous_prefixes_do_not_match() {
        let labels = Labels::new(vec!["positive".into(), "pessimistic".into()]);

        assert_eq!(labels.class_id(&RawLabel::Name("p".into())), None);
        assert_eq!(labels.class_id(&RawLabel::Name("pos".into())), Some(0));
    }

    #[test]
    fn drops_rows_without_a_class() {
        let rows = vec![
            Row::new("loved it".into(), Some(RawLabel::Id(1))),
            Row::new("unlabeled".into(), Some(RawLabel::Id(-1))),
            Row::new("hated it".into(), Some(RawLabel::Name("neg".into()))),
            Row::new("missing".into(), None),
        ];

        let dataset = Dataset::from_rows(rows, &Labels::default());

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(0), Some(Item::new("loved it".into(), 1)));
        assert_eq!(dataset.get(1), Some(Item::new("hated it".into(), 0)));
    }

    #[test]
    fn split_is_disjoint_and_complete() {
        let (train, test) = Dataset::new(items(50)).split(0.2, 42).unwrap();

        assert_eq!(train.len(), 40);
        assert_eq!(test.len(), 10);

        let texts: HashSet<String> = train.iter().chain(test.iter()).map(|i| i.text).collect();
        assert_eq!(texts.len(), 50);
    }

    #[test]
    fn split_is_deterministic_for_a_seed() {
        let (_, first) = Dataset::new(items(30)).split(0.3, 7).unwrap();
        let (_, second) = Dataset::new(items(30)).split(0.3, 7).unwrap();

        assert_eq!(first.iter().collect::<Vec<_>>(), second.iter().collect::<Vec<_>>());
    }

    #[test]
    fn split_keeps_both_partitions_non_empty() {
        let (train, test) = Dataset::new(items(3)).split(0.01, 1).unwrap();
        assert_eq!((train.len(), test.len()), (2, 1));

        let (train, test) = Dataset::new(items(3)).split(0.99, 1).unwrap();
        assert_eq!((train.len(), test.len()), (1, 2));
    }

    #[test]
    fn split_rejects_out_of_range_fractions() {
        assert!(matches!(
            Dataset::new(items(4)).split(1.0, 0),
            Err(LoadError::InvalidSplit(_))
        ));
        assert!(matches!(
            Dataset::new(items(4)).split(0.0, 0),
            Err(LoadError::InvalidSplit(_))
        ));
    }

    #[test]
    fn counts_classes() {
        let dataset = Dataset::new(items(5));

        assert_eq!(dataset.class_counts(2), vec![3, 2]);
    }

    #[test]
    fn reads_back_the_csv_cache() {
        let dir = std::env::temp_dir().join(format!("burn-sentiment-{}", std::process::id()));
        let source = Source::new(
            "tiny".into(),
            RowsRequest::new("org/tiny".into(), "default".into(), "train".into(), 2),
            Labels::default(),
        );
        let path = Dataset::cache_path(dir.to_str().unwrap(), &source);

        let dataset = Dataset::new(vec![
            Item::new("a \"quoted\", comma text".into(), 1),
            Item::new("plain".into(), 0),
        ]);
        dataset.save_csv(&path).unwrap();

        let cached = Dataset::from_csv(&path).unwrap();
        assert_eq!(cached.iter().collect::<Vec<_>>(), dataset.iter().collect::<Vec<_>>());
        assert!(path.ends_with("datasets/tiny/train-2.csv"));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn rejects_a_dataset_missing_a_class() {
        let dataset = Dataset::new(vec![Item::new("fine".into(), 1), Item::new("good".into(), 1)]);

        let result = dataset.check_classes("org/reviews", &Labels::default());

        assert!(matches!(
            result,
            Err(LoadError::MissingClass { label, .. }) if label == "negative"
        ));
    }

    #[tokio::test]
    async fn loads_from_the_cache_without_fetching() {
        let dir = temp_dir("cache-hit");
        let data_dir = dir.to_str().unwrap();
        let source = source(2);

        let cached = Dataset::new(vec![
            Item::new("cached bad".into(), 0),
            Item::new("cached good".into(), 1),
        ]);
        cached.save_csv(&Dataset::cache_path(data_dir, &source)).unwrap();

        let endpoint = serve(|_, _| (500, json!({ "error": "unavailable" }).to_string())).await;

        let dataset = Dataset::load_with(&client(endpoint), &source, data_dir, false)
            .await
            .unwrap();

        assert_eq!(texts(&dataset), vec!["cached bad", "cached good"]);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn refresh_ignores_the_cache() {
        let dir = temp_dir("refresh");
        let data_dir = dir.to_str().unwrap();
        let source = source(4);
        let cache = Dataset::cache_path(data_dir, &source);

        let cached = Dataset::new(vec![
            Item::new("stale bad".into(), 0),
            Item::new("stale good".into(), 1),
        ]);
        cached.save_csv(&cache).unwrap();

        let endpoint = serve(sorted_split(10)).await;

        let dataset = Dataset::load_with(&client(endpoint), &source, data_dir, true)
            .await
            .unwrap();

        let expected = vec!["review 0", "review 2", "review 5", "review 7"];
        assert_eq!(texts(&dataset), expected);
        assert_eq!(dataset.class_counts(2), vec![2, 2]);
        assert_eq!(texts(&Dataset::from_csv(&cache).unwrap()), expected);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn fetches_when_the_cache_is_empty() {
        let dir = temp_dir("empty-cache");
        let data_dir = dir.to_str().unwrap();
        let source = source(4);
        let cache = Dataset::cache_path(data_dir, &source);

        std::fs::create_dir_all(cache.parent().unwrap()).unwrap();
        std::fs::write(&cache, "text,label\n").unwrap();

        let endpoint = serve(sorted_split(10)).await;

        let dataset = Dataset::load_with(&client(endpoint), &source, data_dir, false)
            .await
            .unwrap();

        assert_eq!(dataset.len(), 4);
        assert_eq!(Dataset::from_csv(&cache).unwrap().len(), 4);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn a_smaller_cache_is_not_reused_for_more_rows() {
        let dir = temp_dir("cache-key");
        let data_dir = dir.to_str().unwrap();

        let small = Dataset::new(vec![
            Item::new("cached bad".into(), 0),
            Item::new("cached good".into(), 1),
        ]);
        small.save_csv(&Dataset::cache_path(data_dir, &source(2))).unwrap();

        let endpoint = serve(sorted_split(10)).await;

        let dataset = Dataset::load_with(&client(endpoint), &source(4), data_dir, false)
            .await
            .unwrap();

        assert_eq!(dataset.len(), 4);
        assert!(!texts(&dataset).contains(&"cached bad".to_string()));
        assert_eq!(
            texts(&Dataset::from_csv(&Dataset::cache_path(data_dir, &source(2))).unwrap()),
            vec!["cached bad", "cached good"]
        );

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn fetching_a_single_class_is_an_error() {
        let dir = temp_dir("single-class");
        let data_dir = dir.to_str().unwrap();
        let source = source(4);

        // Every row is negative
        let endpoint = serve(|offset, length| {
            let rows: Vec<_> = (offset..offset + length)
                .map(|i| {
                    json!({
                        "row_idx": i,
                        "row": { "text": format!("bad {i}"), "label": 0 },
                        "truncated_cells": []
                    })
                })
                .collect();

            (200, json!({ "rows": rows, "num_rows_total": 10 }).to_string())
        })
        .await;

        let result = Dataset::load_with(&client(endpoint), &source, data_dir, false).await;

        assert!(matches!(
            result,
            Err(LoadError::MissingClass { label, .. }) if label == "positive"
        ));
        assert!(!Dataset::cache_path(data_dir, &source).exists());

        let _ = std::fs::remove_dir_all(dir);
    }
}
