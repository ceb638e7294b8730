//! Fakes for the file store and the analytics engine

use async_trait::async_trait;
use gnosis_cs::services::{
    Encoder, Encodings, EngineError, FileStore, LabeledImage, PutSource, SessionDescription,
    SignalingEngine, StoreError,
};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// File store kept in a map keyed by remote path
#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    dirs: Mutex<HashSet<String>>,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, remote_path: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(remote_path.to_string(), bytes.to_vec());
    }

    pub fn contents(&self, remote_path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(remote_path).cloned()
    }

    pub fn remove(&self, remote_path: &str) {
        self.files.lock().unwrap().remove(remote_path);
    }

    pub fn has_dir(&self, remote_dir: &str) -> bool {
        self.dirs.lock().unwrap().contains(remote_dir)
    }

    /// Number of successful uploads
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn ensure_dir(&self, remote_dir: &str) -> Result<(), StoreError> {
        self.dirs.lock().unwrap().insert(remote_dir.to_string());
        Ok(())
    }

    async fn put(&self, source: PutSource<'_>, remote_path: &str) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated upload failure".to_string()));
        }
        let bytes = match source {
            PutSource::Buffer(bytes) => bytes,
            PutSource::LocalFile(path) => std::fs::read(path)
                .map_err(|_| StoreError::NotFound(path.display().to_string()))?,
        };
        self.insert(remote_path, &bytes);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, remote_path: &str) -> Result<Vec<u8>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated connection reset".to_string()));
        }
        self.contents(remote_path)
            .ok_or_else(|| StoreError::RemoteNotFound(remote_path.to_string()))
    }

    async fn delete(&self, remote_path: &str) -> Result<(), StoreError> {
        self.files
            .lock()
            .unwrap()
            .remove(remote_path)
            .map(|_| ())
            .ok_or_else(|| StoreError::RemoteNotFound(remote_path.to_string()))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let mut files = self.files.lock().unwrap();
        let bytes = files
            .remove(from)
            .ok_or_else(|| StoreError::RemoteNotFound(from.to_string()))?;
        files.insert(to.to_string(), bytes);
        Ok(())
    }
}

/// Encoder returning `tok:<file bytes>` for each image and recording every call
#[derive(Default)]
pub struct FakeEncoder {
    calls: Mutex<Vec<Vec<(String, String)>>>,
    fail: AtomicBool,
    delete_while_encoding: Mutex<Option<(SqlitePool, Uuid)>>,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_for(bytes: &[u8]) -> String {
        format!("tok:{}", String::from_utf8_lossy(bytes))
    }

    /// Every call as a list of `(label, file_name)`
    pub fn calls(&self) -> Vec<Vec<(String, String)>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Delete an image row during the next encode call, before tokens are written back
    pub fn delete_while_encoding(&self, db: SqlitePool, image_id: Uuid) {
        *self.delete_while_encoding.lock().unwrap() = Some((db, image_id));
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(&self, images: Vec<LabeledImage>) -> Result<Encodings, EngineError> {
        self.calls.lock().unwrap().push(
            images
                .iter()
                .map(|i| (i.label.clone(), i.file_name.clone()))
                .collect(),
        );

        let pending = self.delete_while_encoding.lock().unwrap().take();
        if let Some((db, image_id)) = pending {
            gnosis_common::db::images::delete_image(&db, image_id)
                .await
                .unwrap();
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Network("connection refused".to_string()));
        }

        let mut encodings = Encodings::new();
        for image in images {
            encodings
                .entry(image.label)
                .or_default()
                .push(Self::token_for(&image.bytes));
        }
        Ok(encodings)
    }
}

/// Signaling engine echoing the offer back as an answer
#[derive(Default)]
pub struct FakeSignaling {
    detection_calls: AtomicUsize,
    recognition_calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeSignaling {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detection_calls(&self) -> usize {
        self.detection_calls.load(Ordering::SeqCst)
    }

    /// `(dataset_name, dataset_bytes)` of every recognition call
    pub fn recognition_calls(&self) -> Vec<(String, Vec<u8>)> {
        self.recognition_calls.lock().unwrap().clone()
    }

    fn answer(offer: &SessionDescription) -> SessionDescription {
        SessionDescription {
            sdp: format!("answer:{}", offer.sdp),
            sdp_type: "answer".to_string(),
        }
    }
}

#[async_trait]
impl SignalingEngine for FakeSignaling {
    async fn detection_offer(
        &self,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, EngineError> {
        self.detection_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::answer(offer))
    }

    async fn recognition_offer(
        &self,
        offer: &SessionDescription,
        dataset_name: &str,
        dataset: Vec<u8>,
    ) -> Result<SessionDescription, EngineError> {
        self.recognition_calls
            .lock()
            .unwrap()
            .push((dataset_name.to_string(), dataset));
        Ok(Self::answer(offer))
    }
}
