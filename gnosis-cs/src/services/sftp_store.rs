//! SFTP file store adapter
//!
//! Every call opens its own SSH session on a blocking thread and closes it
//! before returning, so no connection is shared between requests.

use async_trait::async_trait;
use ssh2::{ErrorCode, Session, Sftp};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use super::file_store::{validate_remote_path, FileStore, PutSource, StoreError};
use crate::config::SftpSettings;

/// libssh2 SFTP status code for a missing file
const SFTP_NO_SUCH_FILE: i32 = 2;

pub struct SftpFileStore {
    settings: SftpSettings,
}

impl SftpFileStore {
    pub fn new(settings: SftpSettings) -> Self {
        Self { settings }
    }

    /// Run `op` against a fresh SFTP channel; the session is closed afterwards
    async fn with_sftp<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Sftp) -> Result<T, StoreError> + Send + 'static,
    {
        let settings = self.settings.clone();
        tokio::task::spawn_blocking(move || {
            let session = open_session(&settings)?;
            let sftp = session.sftp().map_err(unavailable)?;
            let result = op(&sftp);
            drop(sftp);
            if let Err(e) = session.disconnect(None, "done", None) {
                tracing::debug!(error = %e, "SFTP disconnect failed");
            }
            result
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("SFTP task failed: {}", e)))?
    }
}

fn open_session(settings: &SftpSettings) -> Result<Session, StoreError> {
    let tcp = TcpStream::connect((settings.host.as_str(), settings.port)).map_err(|e| {
        StoreError::Unavailable(format!("{}:{}: {}", settings.host, settings.port, e))
    })?;

    let mut session = Session::new().map_err(unavailable)?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(unavailable)?;
    session
        .userauth_password(&settings.username, &settings.password)
        .map_err(unavailable)?;
    Ok(session)
}

fn unavailable(err: ssh2::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn remote_error(err: ssh2::Error, remote_path: &str) -> StoreError {
    match err.code() {
        ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => StoreError::RemoteNotFound(remote_path.to_string()),
        _ => StoreError::Unavailable(format!("{}: {}", remote_path, err)),
    }
}

/// Create each missing segment of `remote_dir`. A failed mkdir is tolerated
/// when the directory exists afterwards, since another request may have won.
fn create_dirs<E, M>(remote_dir: &str, exists: E, mut mkdir: M) -> Result<(), StoreError>
where
    E: Fn(&Path) -> bool,
    M: FnMut(&Path) -> Result<(), ssh2::Error>,
{
    let mut current = PathBuf::from("/");
    for segment in remote_dir.split('/').filter(|s| !s.is_empty()) {
        current.push(segment);
        if exists(&current) {
            continue;
        }
        if let Err(e) = mkdir(&current) {
            if !exists(&current) {
                return Err(remote_error(e, &current.to_string_lossy()));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl FileStore for SftpFileStore {
    async fn ensure_dir(&self, remote_dir: &str) -> Result<(), StoreError> {
        validate_remote_path(remote_dir)?;
        let remote_dir = remote_dir.to_string();

        self.with_sftp(move |sftp| {
            create_dirs(
                &remote_dir,
                |dir| sftp.stat(dir).is_ok(),
                |dir| sftp.mkdir(dir, 0o755),
            )
        })
        .await
    }

    async fn put(&self, source: PutSource<'_>, remote_path: &str) -> Result<(), StoreError> {
        validate_remote_path(remote_path)?;

        let bytes = match source {
            PutSource::Buffer(bytes) => bytes,
            PutSource::LocalFile(path) => tokio::fs::read(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StoreError::NotFound(path.display().to_string())
                } else {
                    StoreError::Unavailable(format!("{}: {}", path.display(), e))
                }
            })?,
        };
        let remote_path = remote_path.to_string();

        self.with_sftp(move |sftp| {
            let mut file = sftp
                .create(Path::new(&remote_path))
                .map_err(|e| remote_error(e, &remote_path))?;
            file.write_all(&bytes)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", remote_path, e)))?;
            Ok(())
        })
        .await
    }

    async fn get(&self, remote_path: &str) -> Result<Vec<u8>, StoreError> {
        validate_remote_path(remote_path)?;
        let remote_path = remote_path.to_string();

        self.with_sftp(move |sftp| {
            let mut file = sftp
                .open(Path::new(&remote_path))
                .map_err(|e| remote_error(e, &remote_path))?;
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", remote_path, e)))?;
            Ok(buffer)
        })
        .await
    }

    async fn delete(&self, remote_path: &str) -> Result<(), StoreError> {
        validate_remote_path(remote_path)?;
        let remote_path = remote_path.to_string();

        self.with_sftp(move |sftp| {
            sftp.unlink(Path::new(&remote_path))
                .map_err(|e| remote_error(e, &remote_path))
        })
        .await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        validate_remote_path(from)?;
        validate_remote_path(to)?;
        let (from, to) = (from.to_string(), to.to_string());

        self.with_sftp(move |sftp| {
            sftp.rename(Path::new(&from), Path::new(&to), None)
                .map_err(|e| remote_error(e, &from))
        })
        .await
    }
}
