//! Dataset pipeline and signaling services
//!
//! File store gateway, analytics engine clients, image encoding orchestrator,
//! dataset builder and signaling relay.

pub mod dataset_builder;
pub mod encoding_client;
pub mod engine;
pub mod file_store;
pub mod image_encoder;
pub mod signaling_relay;
#[cfg(feature = "sftp")]
pub mod sftp_store;

pub use dataset_builder::{Dataset, DatasetBuilder, DatasetEntry};
pub use encoding_client::{Encoder, Encodings, EncodingClient, LabeledImage};
pub use engine::{EngineEndpoint, EngineError};
pub use file_store::{FileStore, LocalFileStore, PutSource, StoreError, StoreLayout};
pub use image_encoder::{EncodeOutcome, ImageEncoder, ImageUpdate, UpdateStatus};
pub use signaling_relay::{SessionDescription, SignalingClient, SignalingEngine, SignalingRelay};
#[cfg(feature = "sftp")]
pub use sftp_store::SftpFileStore;
