use std::{
    collections::{BTreeMap, HashMap},
    io::Cursor,
    ops::Bound,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use futures_util::stream;

use crate::{
    error::{Result, StoreError},
    r#trait::{BodyStream, QueueStore},
};

/// In-memory queue store.
///
/// Records live in a `BTreeMap`, which provides the ascending ranged
/// iteration the scan contract requires. Body streams are held in a
/// separate map, mirroring the two-tier layout of the real store: small
/// records addressed by key, bodies addressed by the same derived key but
/// living in their own stream namespace.
///
/// Intended for tests and development runs. Cloning is cheap and clones
/// share the same underlying maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueueStore {
    records: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    streams: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    fail_scans: Arc<AtomicBool>,
}

impl MemoryQueueStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record.
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the
    /// underlying data.
    pub fn put_record(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Stores a body stream under its derived key.
    pub fn put_stream(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.streams
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), body.into());
    }

    /// Makes every subsequent scan fail with a backend error. Lets tests
    /// exercise the store-fatal path.
    pub fn poison_scans(&self) {
        self.fail_scans.store(true, Ordering::SeqCst);
    }

    /// Number of records held (body streams not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    fn scan(
        &self,
        lower_exclusive: &str,
        upper_exclusive: &str,
    ) -> futures_util::stream::BoxStream<'static, Result<String>> {
        if self.fail_scans.load(Ordering::SeqCst) {
            let failure: Result<String> =
                Err(StoreError::Backend("injected scan failure".to_owned()));
            return Box::pin(stream::iter([failure]));
        }

        // An inverted range would panic in BTreeMap::range; it can only
        // arise from a corrupt cursor and holds no keys either way.
        if lower_exclusive >= upper_exclusive {
            return Box::pin(stream::iter(Vec::<Result<String>>::new()));
        }

        let keys: Vec<Result<String>> = match self.records.read() {
            Ok(records) => records
                .range::<str, _>((
                    Bound::Excluded(lower_exclusive),
                    Bound::Excluded(upper_exclusive),
                ))
                .map(|(key, _)| Ok(key.clone()))
                .collect(),
            Err(poisoned) => vec![Err(poisoned.into())],
        };

        Box::pin(stream::iter(keys))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.read()?.get(key).cloned())
    }

    async fn body(&self, key: &str) -> Result<Option<BodyStream>> {
        Ok(self
            .streams
            .read()?
            .get(key)
            .cloned()
            .map(|bytes| Box::pin(Cursor::new(bytes)) as BodyStream))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use tokio::io::AsyncReadExt;

    use super::*;

    async fn collect_scan(store: &MemoryQueueStore, lower: &str, upper: &str) -> Vec<String> {
        store
            .scan(lower, upper)
            .map(|entry| entry.expect("scan entry"))
            .collect()
            .await
    }

    #[tokio::test]
    async fn scan_is_ascending_with_exclusive_bounds() {
        let store = MemoryQueueStore::new();
        store.put_record("seq 001", "a");
        store.put_record("seq 003", "c");
        store.put_record("seq 002", "b");
        store.put_record("message x", "unrelated namespace");

        let keys = collect_scan(&store, "seq ", "seq ~").await;
        assert_eq!(keys, vec!["seq 001", "seq 002", "seq 003"]);

        // Both bounds are exclusive: a cursor equal to an existing key
        // skips that key.
        let keys = collect_scan(&store, "seq 001", "seq ~").await;
        assert_eq!(keys, vec!["seq 002", "seq 003"]);

        let keys = collect_scan(&store, "seq 003", "seq ~").await;
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn inverted_range_scans_nothing() {
        let store = MemoryQueueStore::new();
        store.put_record("seq 001", "a");

        let keys = collect_scan(&store, "seq ~", "seq ").await;
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn point_get_distinguishes_absent_keys() {
        let store = MemoryQueueStore::new();
        store.put_record("seq 001", "value");

        let value = store.get("seq 001").await.expect("get");
        assert_eq!(value, Some(b"value".to_vec()));

        let missing = store.get("seq 999").await.expect("get");
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn body_streams_read_back_in_full() {
        let store = MemoryQueueStore::new();
        store.put_stream("message abc", "line one\r\nline two\r\n");

        let mut body = store
            .body("message abc")
            .await
            .expect("body")
            .expect("stream present");
        let mut contents = Vec::new();
        body.read_to_end(&mut contents).await.expect("read body");
        assert_eq!(contents, b"line one\r\nline two\r\n");

        assert!(store.body("message nope").await.expect("body").is_none());
    }

    #[tokio::test]
    async fn poisoned_scan_reports_a_backend_error() {
        let store = MemoryQueueStore::new();
        store.put_record("seq 001", "a");
        store.poison_scans();

        let mut scan = store.scan("seq ", "seq ~");
        let first = scan.next().await.expect("one entry");
        assert!(matches!(first, Err(StoreError::Backend(_))));
    }
}
