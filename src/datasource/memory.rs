//! In-memory collections
//!
//! Documents are loaded once from JSON files and never change afterwards.
//! Each collection has a full-scan path plus one single-key index per
//! configured property path. Index entries are built at load time; index
//! statistics are rebuilt on demand and published through the
//! collection's [`StatsStore`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::cancel::{cancelled, send_unless_cancelled};
use super::errors::{DataSourceError, DataSourceResult};
use super::{AccessPath, DataSource, DataSourceManager, ScanOptions, ViewRange};
use crate::ast::Context;
use crate::observability::{Event, Logger};
use crate::stats::{build_path_statistics, PathStatsMap, StatsStore};
use crate::value::{collate, Value};

/// Name of the full-scan access path
pub const ALL_DOCS_PATH: &str = "_all_docs";

type Documents = Arc<BTreeMap<String, Value>>;

/// Row shape emitted by scans: `{"meta": {"id": id}}`, plus `"doc"` if given
fn scan_row(id: &str, doc: Option<Value>) -> Value {
    let meta = Value::object([("id", Value::from(id))]);
    match doc {
        Some(doc) => Value::object([("meta", meta), ("doc", doc)]),
        None => Value::object([("meta", meta)]),
    }
}

/// Reads every document in id order
pub struct AllDocsPath {
    documents: Documents,
    keys: Vec<String>,
}

impl AllDocsPath {
    fn new(documents: Documents) -> Self {
        Self {
            documents,
            keys: Vec::new(),
        }
    }
}

impl AccessPath for AllDocsPath {
    fn name(&self) -> &str {
        ALL_DOCS_PATH
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn returns_all(&self) -> bool {
        true
    }

    fn scan(
        &self,
        output: mpsc::Sender<Value>,
        mut cancel: watch::Receiver<bool>,
        options: ScanOptions,
    ) -> BoxFuture<'static, DataSourceResult<()>> {
        let documents = Arc::clone(&self.documents);
        Box::pin(async move {
            let batch_size = options.batch_size.max(1);
            let mut remaining = documents.iter();
            loop {
                if *cancel.borrow_and_update() {
                    return Ok(());
                }
                let batch: Vec<_> = remaining.by_ref().take(batch_size).collect();
                if batch.is_empty() {
                    return Ok(());
                }
                for (id, doc) in batch {
                    let row = scan_row(id, Some(doc.clone()));
                    if !send_unless_cancelled(&output, &mut cancel, row).await {
                        return Ok(());
                    }
                }
            }
        })
    }

    fn update_stats(&self) -> BoxFuture<'_, DataSourceResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Single-key secondary index
pub struct IndexPath {
    name: String,
    keys: Vec<String>,
    /// `(key, doc id)` sorted by key collation, then id
    entries: Arc<Vec<(Value, String)>>,
    stats: Arc<StatsStore>,
}

impl IndexPath {
    fn new(key: &str, documents: &BTreeMap<String, Value>, stats: Arc<StatsStore>) -> Self {
        let mut entries = Vec::with_capacity(documents.len());
        for (id, doc) in documents {
            let row = scan_row(id, Some(doc.clone()));
            match Context::new(&row).get_path(key) {
                Ok(Value::Null) => {}
                Ok(value) => entries.push((value, id.clone())),
                Err(_) => {}
            }
        }
        entries.sort_by(|a, b| collate(&a.0, &b.0).then_with(|| a.1.cmp(&b.1)));

        Self {
            name: format!("index_by_{}", key),
            keys: vec![key.to_string()],
            entries: Arc::new(entries),
            stats,
        }
    }

    /// Number of entries in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn rebuild_stats(&self) {
        let mut groups: Vec<(Value, i64)> = Vec::new();
        for (key, _) in self.entries.iter() {
            match groups.last_mut() {
                Some((last, count)) if collate(last, key).is_eq() => *count += 1,
                _ => groups.push((key.clone(), 1)),
            }
        }
        self.stats
            .replace_path(self.keys[0].clone(), build_path_statistics(groups));
    }
}

impl AccessPath for IndexPath {
    fn name(&self) -> &str {
        &self.name
    }

    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn returns_all(&self) -> bool {
        false
    }

    /// Reads only the entries inside the requested ranges, one batch at a
    /// time. Overlapping ranges are coalesced first so each entry is
    /// emitted once, in index order.
    fn scan(
        &self,
        output: mpsc::Sender<Value>,
        mut cancel: watch::Receiver<bool>,
        options: ScanOptions,
    ) -> BoxFuture<'static, DataSourceResult<()>> {
        let entries = Arc::clone(&self.entries);
        Box::pin(async move {
            let batch_size = options.batch_size.max(1);
            let spans = if options.ranges.is_empty() {
                vec![ViewRange::full()]
            } else {
                ViewRange::coalesce(&options.ranges)
            };
            for span in spans {
                let selected = &entries[span.entry_span(entries.as_slice())];
                for batch in selected.chunks(batch_size) {
                    if *cancel.borrow_and_update() {
                        return Ok(());
                    }
                    for (_, id) in batch {
                        let row = scan_row(id, None);
                        if !send_unless_cancelled(&output, &mut cancel, row).await {
                            return Ok(());
                        }
                    }
                }
            }
            Ok(())
        })
    }

    fn update_stats(&self) -> BoxFuture<'_, DataSourceResult<()>> {
        Box::pin(async move {
            self.rebuild_stats();
            Ok(())
        })
    }
}

/// Immutable in-memory collection
pub struct MemoryDataSource {
    name: String,
    documents: Documents,
    stats: Arc<StatsStore>,
    paths: Vec<Arc<dyn AccessPath>>,
    indexes: Vec<Arc<IndexPath>>,
}

impl MemoryDataSource {
    /// Builds a collection and its indexes. Statistics are computed once here.
    pub fn new<I>(name: impl Into<String>, documents: I, indexes: &[String]) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let documents: Documents = Arc::new(documents.into_iter().collect());
        let stats = Arc::new(StatsStore::new());

        let index_paths: Vec<Arc<IndexPath>> = indexes
            .iter()
            .map(|key| Arc::new(IndexPath::new(key, &documents, Arc::clone(&stats))))
            .collect();

        let mut paths: Vec<Arc<dyn AccessPath>> =
            vec![Arc::new(AllDocsPath::new(Arc::clone(&documents)))];
        for index in &index_paths {
            paths.push(Arc::clone(index) as Arc<dyn AccessPath>);
        }

        let source = Self {
            name: name.into(),
            documents,
            stats,
            paths,
            indexes: index_paths,
        };
        for index in &source.indexes {
            index.rebuild_stats();
        }
        source
    }

    /// Loads a collection from a JSON file
    pub fn load(name: &str, path: &Path, indexes: &[String]) -> DataSourceResult<Self> {
        let documents = load_documents(path)?;
        let source = Self::new(name, documents, indexes);
        Logger::info(
            Event::DataSourceLoaded,
            &[
                ("bucket", name),
                ("documents", &source.rows().to_string()),
                ("indexes", &indexes.len().to_string()),
                ("path", &path.display().to_string()),
            ],
        );
        Ok(source)
    }

    /// Rebuilds statistics for every access path
    pub async fn refresh_stats(&self) -> DataSourceResult<()> {
        for path in &self.paths {
            path.update_stats().await?;
        }
        Ok(())
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl DataSource for MemoryDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn rows(&self) -> i64 {
        self.documents.len() as i64
    }

    fn path_stats(&self) -> Arc<PathStatsMap> {
        self.stats.snapshot()
    }

    fn access_paths(&self) -> Vec<Arc<dyn AccessPath>> {
        self.paths.clone()
    }

    fn fetch<'a>(&'a self, id: &'a str) -> BoxFuture<'a, DataSourceResult<Value>> {
        Box::pin(async move {
            self.documents
                .get(id)
                .cloned()
                .ok_or_else(|| DataSourceError::document_not_found(id))
        })
    }
}

/// Registry of in-memory collections by name
#[derive(Default)]
pub struct MemoryDataSourceManager {
    sources: BTreeMap<String, Arc<MemoryDataSource>>,
}

impl MemoryDataSourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collection, replacing any previous one of the same name
    pub fn add(&mut self, source: MemoryDataSource) {
        self.sources.insert(source.name.clone(), Arc::new(source));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Rebuilds statistics for every collection. A failing collection is
    /// logged and the others still refresh.
    pub async fn refresh_stats(&self) {
        let start = Instant::now();
        Logger::info(
            Event::StatsRefreshStart,
            &[("collections", &self.sources.len().to_string())],
        );
        for (name, source) in &self.sources {
            if let Err(err) = source.refresh_stats().await {
                Logger::warn(
                    Event::StatsRefreshFailed,
                    &[("bucket", name), ("error", &err.to_string())],
                );
            }
        }
        Logger::info(
            Event::StatsRefreshComplete,
            &[("duration_ms", &start.elapsed().as_millis().to_string())],
        );
    }

    /// Refreshes statistics every `interval` until `shutdown` turns true
    pub fn spawn_stats_refresh(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // stats were built at load; skip the immediate tick
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancelled(&mut shutdown) => return,
                    _ = ticker.tick() => manager.refresh_stats().await,
                }
            }
        })
    }
}

impl DataSourceManager for MemoryDataSourceManager {
    fn get_data_source(&self, name: &str) -> DataSourceResult<Arc<dyn DataSource>> {
        self.sources
            .get(name)
            .map(|source| Arc::clone(source) as Arc<dyn DataSource>)
            .ok_or_else(|| DataSourceError::not_found(name))
    }

    fn data_source_names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }
}

/// Reads documents from a JSON file.
///
/// An object maps ids to bodies. An array takes each element's `"id"` when
/// it is a string or number, and the element's position otherwise.
pub fn load_documents(path: &Path) -> DataSourceResult<Vec<(String, Value)>> {
    let content = fs::read_to_string(path).map_err(|e| {
        DataSourceError::load_failed(format!("failed to read '{}': {}", path.display(), e))
    })?;
    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        DataSourceError::load_failed(format!("invalid JSON in '{}': {}", path.display(), e))
    })?;

    match json {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(id, doc)| (id, Value::from(doc)))
            .collect()),
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(position, doc)| {
                let id = match doc.get("id") {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(serde_json::Value::Number(n)) => n.to_string(),
                    _ => position.to_string(),
                };
                (id, Value::from(doc))
            })
            .collect()),
        other => Err(DataSourceError::load_failed(format!(
            "'{}' must hold a JSON object or array, found {}",
            path.display(),
            Value::from(other).kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ComparisonOperator;
    use crate::datasource::CancelHandle;
    use std::io::Write;

    fn beer(name: &str, abv: f64) -> Value {
        Value::object([("name", Value::from(name)), ("abv", Value::from(abv))])
    }

    fn beers() -> MemoryDataSource {
        let docs = vec![
            ("a".to_string(), beer("ale", 5.0)),
            ("b".to_string(), beer("bock", 7.5)),
            ("c".to_string(), beer("cider", 4.0)),
            ("d".to_string(), beer("dubbel", 7.5)),
            ("e".to_string(), Value::object([("name", Value::from("water"))])),
        ];
        MemoryDataSource::new("beers", docs, &["doc.abv".to_string()])
    }

    async fn collect(path: &dyn AccessPath, options: ScanOptions) -> Vec<Value> {
        let (tx, mut rx) = mpsc::channel(2);
        let handle = CancelHandle::new();
        let scan = tokio::spawn(path.scan(tx, handle.subscribe(), options));
        let mut rows = Vec::new();
        while let Some(row) = rx.recv().await {
            rows.push(row);
        }
        scan.await.unwrap().unwrap();
        rows
    }

    fn ids(rows: &[Value]) -> Vec<String> {
        rows.iter()
            .map(|row| Context::new(row).get_path("meta.id").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_access_paths_full_scan_first() {
        let source = beers();
        let paths = source.access_paths();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].name(), ALL_DOCS_PATH);
        assert!(paths[0].returns_all());
        assert_eq!(paths[1].name(), "index_by_doc.abv");
        assert_eq!(paths[1].keys(), &["doc.abv".to_string()]);
    }

    #[tokio::test]
    async fn test_all_docs_scan_attaches_bodies() {
        let source = beers();
        let paths = source.access_paths();
        let options = ScanOptions {
            ranges: Vec::new(),
            batch_size: 2,
        };
        let rows = collect(paths[0].as_ref(), options).await;
        assert_eq!(rows.len(), 5);
        assert_eq!(ids(&rows), vec!["\"a\"", "\"b\"", "\"c\"", "\"d\"", "\"e\""]);
        assert_eq!(
            Context::new(&rows[1]).get_path("doc.name").unwrap(),
            Value::from("bock")
        );
    }

    #[tokio::test]
    async fn test_index_scan_skips_missing_keys() {
        let source = beers();
        let paths = source.access_paths();
        let rows = collect(paths[1].as_ref(), ScanOptions::default()).await;
        // "e" has no abv; order is by key then id
        assert_eq!(ids(&rows), vec!["\"c\"", "\"a\"", "\"b\"", "\"d\""]);
        assert!(rows[0].get("doc").is_none());
    }

    #[tokio::test]
    async fn test_index_scan_honors_ranges_without_duplicates() {
        let source = beers();
        let paths = source.access_paths();
        let mut ranges = ViewRange::for_comparison(ComparisonOperator::Gte, Value::from(5.0));
        ranges.extend(ViewRange::for_comparison(
            ComparisonOperator::Eq,
            Value::from(7.5),
        ));
        let options = ScanOptions {
            ranges,
            batch_size: 1,
        };
        let rows = collect(paths[1].as_ref(), options).await;
        assert_eq!(ids(&rows), vec!["\"a\"", "\"b\"", "\"d\""]);
    }

    #[tokio::test]
    async fn test_index_scan_reads_only_its_ranges() {
        let docs = (0..1000).map(|i| {
            let doc = Value::object([("x", Value::from((i % 100) as f64))]);
            (format!("{:04}", i), doc)
        });
        let source = MemoryDataSource::new("numbers", docs, &["doc.x".to_string()]);
        let paths = source.access_paths();

        let mut ranges = ViewRange::for_comparison(ComparisonOperator::Eq, Value::from(1.0));
        ranges.extend(ViewRange::for_comparison(ComparisonOperator::Eq, Value::from(98.0)));
        let options = ScanOptions {
            ranges: ranges.clone(),
            batch_size: 3,
        };
        let rows = collect(paths[1].as_ref(), options).await;
        assert_eq!(rows.len(), 20);

        // each range touches only its own ten entries
        let index = IndexPath::new("doc.x", &source.documents, Arc::new(StatsStore::new()));
        let spans: Vec<_> = ranges
            .iter()
            .map(|r| r.entry_span(index.entries.as_slice()))
            .collect();
        assert_eq!(spans, vec![10..20, 980..990]);
    }

    #[tokio::test]
    async fn test_scan_stops_on_cancel() {
        let source = beers();
        let paths = source.access_paths();
        let (tx, mut rx) = mpsc::channel(1);
        let handle = CancelHandle::new();
        let scan = tokio::spawn(paths[0].scan(tx, handle.subscribe(), ScanOptions::default()));

        assert!(rx.recv().await.is_some());
        handle.cancel();
        scan.await.unwrap().unwrap();
        // at most the one row already buffered remains
        let mut rest = 0;
        while rx.recv().await.is_some() {
            rest += 1;
        }
        assert!(rest <= 1);
    }

    #[tokio::test]
    async fn test_fetch() {
        let source = beers();
        assert_eq!(source.fetch("c").await.unwrap(), beer("cider", 4.0));
        let err = source.fetch("zzz").await.unwrap_err();
        assert_eq!(err.code().code(), "AERO_DOCUMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_index_stats_published() {
        let source = beers();
        let stats = source.path_stats();
        let abv = stats.get("doc.abv").expect("abv stats");
        assert_eq!(abv.rows, 4);
        assert_eq!(abv.distinct, 3);
        assert_eq!(abv.min, Some(Value::from(4.0)));
        assert_eq!(abv.max, Some(Value::from(7.5)));
        assert_eq!(abv.top_n.num_items_with_key(&Value::from(7.5)), Some(2));

        source.refresh_stats().await.unwrap();
        assert_eq!(source.path_stats().get("doc.abv").unwrap().rows, 4);
    }

    #[test]
    fn test_manager_lookup() {
        let mut manager = MemoryDataSourceManager::new();
        manager.add(beers());
        assert_eq!(manager.data_source_names(), vec!["beers".to_string()]);
        assert_eq!(manager.get_data_source("beers").unwrap().rows(), 5);

        let err = manager.get_data_source("wine").err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_stats_refresh_task_stops_on_shutdown() {
        let mut manager = MemoryDataSourceManager::new();
        manager.add(beers());
        let manager = Arc::new(manager);
        let (tx, rx) = watch::channel(false);

        let task = manager.spawn_stats_refresh(Duration::from_millis(5), rx);
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("refresh task should stop")
            .unwrap();
    }

    #[test]
    fn test_load_documents_object_and_array() {
        let mut object = tempfile::NamedTempFile::new().unwrap();
        write!(object, r#"{{"x": {{"v": 1}}, "y": {{"v": 2}}}}"#).unwrap();
        let docs = load_documents(object.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].0, "x");

        let mut array = tempfile::NamedTempFile::new().unwrap();
        write!(array, r#"[{{"id": "k1"}}, {{"id": 7}}, {{"v": true}}]"#).unwrap();
        let docs = load_documents(array.path()).unwrap();
        let ids: Vec<_> = docs.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["k1", "7", "2"]);
    }

    #[test]
    fn test_load_documents_rejects_scalars() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "42").unwrap();
        let err = load_documents(file.path()).unwrap_err();
        assert_eq!(err.code().code(), "AERO_DATASOURCE_LOAD_FAILED");

        let missing = load_documents(Path::new("/nonexistent/aeroquery/docs.json")).unwrap_err();
        assert_eq!(missing.code().code(), "AERO_DATASOURCE_LOAD_FAILED");
    }
}
