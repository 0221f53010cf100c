pub mod canonical;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::response::{ResponseAck, ResponsePayload, ResponseRecord};
use crate::models::session::{FounderInputs, SessionRecord};
use crate::models::RECORD_VERSION;

use self::canonical::{canonical_json, sha256_hex};

/// Hex characters of the digest embedded in a response file name.
const DIGEST_PREFIX_LEN: usize = 12;

/// Where records land on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub sessions_dir: PathBuf,
    pub responses_dir: PathBuf,
}

impl StoreConfig {
    /// `root/sessions` and `root/responses`.
    pub fn under(root: &Path) -> Self {
        Self {
            sessions_dir: root.join("sessions"),
            responses_dir: root.join("responses"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only store writing one pretty-printed JSON file per record.
///
/// Nothing is ever read back, updated or deleted. File names embed the UTC
/// second plus an identifier, and two writes that produce the same name within
/// one second overwrite each other; no lock guards against that.
#[derive(Debug, Clone)]
pub struct JsonStore {
    config: StoreConfig,
}

impl JsonStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates both storage directories. Safe to call when they already exist.
    pub async fn init(&self) -> Result<(), StoreError> {
        for dir in [&self.config.sessions_dir, &self.config.responses_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::CreateDir {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Persists a new session and returns its freshly generated id.
    pub async fn create_session(&self, founder_inputs: FounderInputs) -> Result<Uuid, StoreError> {
        self.create_session_at(founder_inputs, Utc::now()).await
    }

    async fn create_session_at(
        &self,
        founder_inputs: FounderInputs,
        now: DateTime<Utc>,
    ) -> Result<Uuid, StoreError> {
        let session_id = Uuid::new_v4();
        let record = SessionRecord {
            session_id,
            founder_inputs,
            created_at_utc: iso_timestamp(now),
            version: RECORD_VERSION.to_string(),
        };

        let file_name = session_file_name(now, session_id);
        self.write_record(&self.config.sessions_dir, &file_name, &record)
            .await?;

        info!(session_id = %session_id, file = %file_name, "Session stored");
        Ok(session_id)
    }

    /// Persists a response with its content fingerprint. Identical payloads
    /// are stored again every time; the hash only makes them detectable later.
    pub async fn store_response(&self, payload: ResponsePayload) -> Result<ResponseAck, StoreError> {
        self.store_response_at(payload, Utc::now()).await
    }

    async fn store_response_at(
        &self,
        payload: ResponsePayload,
        now: DateTime<Utc>,
    ) -> Result<ResponseAck, StoreError> {
        let digest = sha256_hex(&canonical_json(&payload)?);
        let file_name = response_file_name(now, &payload, &digest);

        let record = ResponseRecord {
            received_at_utc: iso_timestamp(now),
            hash_sha256: digest.clone(),
            payload,
            version: RECORD_VERSION.to_string(),
        };
        self.write_record(&self.config.responses_dir, &file_name, &record)
            .await?;

        info!(
            session_id = %record.payload.session_id,
            respondent_id = %record.payload.respondent_id,
            file = %file_name,
            "Response stored"
        );
        Ok(ResponseAck {
            ok: true,
            hash: digest,
            file: file_name,
        })
    }

    async fn write_record<T: Serialize>(
        &self,
        dir: &Path,
        file_name: &str,
        record: &T,
    ) -> Result<PathBuf, StoreError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// Compact UTC second, e.g. `20240131T235959Z`.
pub fn file_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `{stamp}_{uuid}.json`
pub fn session_file_name(now: DateTime<Utc>, session_id: Uuid) -> String {
    format!("{}_{}.json", file_stamp(now), session_id)
}

/// `{stamp}_{session_id}_{respondent_id}_{digest[..12]}.json`
pub fn response_file_name(now: DateTime<Utc>, payload: &ResponsePayload, digest: &str) -> String {
    let prefix = &digest[..DIGEST_PREFIX_LEN.min(digest.len())];
    format!(
        "{}_{}_{}_{}.json",
        file_stamp(now),
        path_safe(&payload.session_id),
        path_safe(&payload.respondent_id),
        prefix
    )
}

/// Client ids are embedded verbatim except for characters that would split
/// the name into more than one path component.
fn path_safe(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}
