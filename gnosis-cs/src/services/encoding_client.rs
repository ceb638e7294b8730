//! Encoding client
//!
//! Turns reference image bytes into embedding tokens via the analytics engine.
//! A label with a single image goes to `/encoder/image`, a label with several
//! images goes to `/encoder/images` as one batch; both paths return the same
//! shape to the caller.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::collections::HashMap;

use super::engine::{send_json, EngineEndpoint, EngineError};

/// Embedding tokens per label, in submission order
pub type Encodings = HashMap<String, Vec<String>>;

/// One image to encode
#[derive(Debug, Clone)]
pub struct LabeledImage {
    /// Grouping key for the result (the profile name)
    pub label: String,
    /// File name sent with the multipart part
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode every image; one token per image, grouped by label, order preserved
    async fn encode(&self, images: Vec<LabeledImage>) -> Result<Encodings, EngineError>;
}

/// `{"embedding": ...}` entry as returned by the engine
#[derive(Debug, Deserialize)]
struct EmbeddingEntry {
    embedding: serde_json::Value,
}

/// The single-image endpoint may key its answer by whatever name it likes,
/// or answer with a bare entry
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SingleEncodeResponse {
    Keyed(HashMap<String, Vec<EmbeddingEntry>>),
    Bare(EmbeddingEntry),
}

/// Tokens are opaque: strings pass through, anything else is kept as compact JSON
fn token_from_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(token) => token,
        other => other.to_string(),
    }
}

/// HTTP encoding client for the analytics engine
#[derive(Debug, Clone)]
pub struct EncodingClient {
    endpoint: EngineEndpoint,
}

impl EncodingClient {
    pub fn new(endpoint: EngineEndpoint) -> Self {
        Self { endpoint }
    }

    async fn encode_single(&self, image: LabeledImage) -> Result<Vec<String>, EngineError> {
        let form = Form::new().part("file", Part::bytes(image.bytes).file_name(image.file_name));

        let response: SingleEncodeResponse = send_json(
            self.endpoint
                .http()
                .post(self.endpoint.url("/encoder/image"))
                .multipart(form),
        )
        .await?;

        let entries: Vec<EmbeddingEntry> = match response {
            SingleEncodeResponse::Bare(entry) => vec![entry],
            SingleEncodeResponse::Keyed(map) => map.into_values().flatten().collect(),
        };

        if entries.len() != 1 {
            return Err(EngineError::Parse(format!(
                "expected 1 embedding for label '{}', got {}",
                image.label,
                entries.len()
            )));
        }

        Ok(entries.into_iter().map(|e| token_from_value(e.embedding)).collect())
    }

    async fn encode_batch(
        &self,
        label: &str,
        images: Vec<LabeledImage>,
    ) -> Result<Vec<String>, EngineError> {
        let expected = images.len();
        let mut form = Form::new();
        for image in images {
            form = form.part("files", Part::bytes(image.bytes).file_name(image.file_name));
        }
        form = form.text("key", label.to_string());

        let mut response: HashMap<String, Vec<EmbeddingEntry>> = send_json(
            self.endpoint
                .http()
                .post(self.endpoint.url("/encoder/images"))
                .multipart(form),
        )
        .await?;

        let entries = response.remove(label).ok_or_else(|| {
            EngineError::Parse(format!("batch response has no entry for label '{}'", label))
        })?;

        if entries.len() != expected {
            return Err(EngineError::Parse(format!(
                "expected {} embeddings for label '{}', got {}",
                expected,
                label,
                entries.len()
            )));
        }

        Ok(entries.into_iter().map(|e| token_from_value(e.embedding)).collect())
    }
}

/// Group images by label, keeping first-seen label order and image order
fn group_by_label(images: Vec<LabeledImage>) -> Vec<(String, Vec<LabeledImage>)> {
    let mut groups: Vec<(String, Vec<LabeledImage>)> = Vec::new();
    for image in images {
        match groups.iter_mut().find(|(label, _)| *label == image.label) {
            Some((_, batch)) => batch.push(image),
            None => groups.push((image.label.clone(), vec![image])),
        }
    }
    groups
}

#[async_trait]
impl Encoder for EncodingClient {
    async fn encode(&self, images: Vec<LabeledImage>) -> Result<Encodings, EngineError> {
        let mut encodings = Encodings::new();

        for (label, mut batch) in group_by_label(images) {
            tracing::debug!(label = %label, images = batch.len(), "Requesting embeddings");

            let tokens = if batch.len() == 1 {
                let image = batch.remove(0);
                self.encode_single(image).await?
            } else {
                self.encode_batch(&label, batch).await?
            };

            encodings.insert(label, tokens);
        }

        Ok(encodings)
    }
}
