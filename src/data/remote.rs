//! Remote document store access over its HTTP data API.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::common::config::RemoteCfg;
use crate::common::error::{AdmitError, AdmitResult};

/// Source of raw applicant documents.
pub trait RemoteSource {
    /// Every document of the configured collection.
    fn find_all(&self) -> AdmitResult<Vec<Map<String, Value>>>;

    /// Human readable origin, used in manifests and logs.
    fn describe(&self) -> String;
}

#[derive(Deserialize)]
struct FindResponse {
    #[serde(default)]
    documents: Vec<Map<String, Value>>,
}

/// `POST <url>/action/find` client with bounded connect and request time.
pub struct HttpDocumentSource {
    client: reqwest::blocking::Client,
    cfg: RemoteCfg,
}

impl HttpDocumentSource {
    pub fn new(cfg: RemoteCfg, connect_timeout: Duration) -> AdmitResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(connect_timeout * 10)
            .build()
            .map_err(|e| AdmitError::Remote(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    fn endpoint(&self) -> String {
        format!("{}/action/find", self.cfg.url.trim_end_matches('/'))
    }
}

impl RemoteSource for HttpDocumentSource {
    fn find_all(&self) -> AdmitResult<Vec<Map<String, Value>>> {
        let body = json!({
            "database": self.cfg.database,
            "collection": self.cfg.collection,
            "filter": {},
        });
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AdmitError::Remote(e.to_string()))?;
        let parsed: FindResponse = response
            .json()
            .map_err(|e| AdmitError::Remote(format!("malformed answer: {e}")))?;
        Ok(parsed.documents)
    }

    fn describe(&self) -> String {
        format!("remote:{}/{}", self.cfg.database, self.cfg.collection)
    }
}
