//! Blocking HTTP client for the dataset API (`ureq`).
//!
//! Every JSON response is wrapped as `{"response": "ok", "data": ...}`.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use gantry_core::types::{Commit, DatasetInfo, DatasetName, NewCommit};

use super::{CommitLog, ObjectRef, ObjectStore};
use crate::error::RemoteError;

pub const API_KEY_HEADER: &str = "X-Gantry-Api-Key";
const VERSION_HEADER: &str = "x-amz-version-id";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

pub struct HttpApi {
    origin: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl HttpApi {
    pub fn new(origin: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            api_key,
            agent: ureq::AgentBuilder::new()
                .timeout_connect(CONNECT_TIMEOUT)
                .build(),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}/api/v1/{}", self.origin, path.trim_start_matches('/'));
        let request = self.agent.request(method, &url);
        match &self.api_key {
            Some(key) => request.set(API_KEY_HEADER, key),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let response = self.request("GET", path).call().map_err(map_ureq)?;
        decode(response)
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, RemoteError> {
        let response = self
            .request("POST", path)
            .send_json(body)
            .map_err(map_ureq)?;
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: ureq::Response) -> Result<T, RemoteError> {
    response
        .into_json::<Envelope<T>>()
        .map(|envelope| envelope.data)
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

fn map_ureq(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => RemoteError::Status {
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
    }
}

impl CommitLog for HttpApi {
    fn dataset(&self, name: &DatasetName) -> Result<DatasetInfo, RemoteError> {
        self.get_json(&format!("datasets/{name}"))
    }

    fn list_commits(&self, dataset_id: Uuid) -> Result<Vec<Commit>, RemoteError> {
        self.get_json(&format!("datasets/{dataset_id}/commits"))
    }

    fn get_commit(&self, dataset_id: Uuid, commit_id: Uuid) -> Result<Commit, RemoteError> {
        self.get_json(&format!("datasets/{dataset_id}/commits/{commit_id}"))
    }

    fn create_commit(&self, dataset_id: Uuid, commit: &NewCommit) -> Result<Commit, RemoteError> {
        let body = serde_json::to_value(commit).map_err(|e| RemoteError::Decode(e.to_string()))?;
        self.post_json(&format!("datasets/{dataset_id}/commits"), body)
    }

    fn disable_dataset(&self, dataset_id: Uuid) -> Result<(), RemoteError> {
        self.request("DELETE", &format!("datasets/{dataset_id}"))
            .call()
            .map_err(map_ureq)?;
        Ok(())
    }
}

impl ObjectStore for HttpApi {
    fn presign_get(
        &self,
        dataset_id: Uuid,
        objects: &[ObjectRef],
        expiration_secs: u64,
    ) -> Result<HashMap<String, String>, RemoteError> {
        self.post_json(
            &format!("datasets/{dataset_id}/presign/getobject"),
            json!({ "expiration": expiration_secs, "obj_infos": objects }),
        )
    }

    fn presign_put(
        &self,
        dataset_id: Uuid,
        keys: &[String],
    ) -> Result<HashMap<String, String>, RemoteError> {
        self.post_json(
            &format!("datasets/{dataset_id}/presign/putobject"),
            json!({ "obj_keys": keys }),
        )
    }

    fn get(&self, url: &str) -> Result<Box<dyn Read + Send>, RemoteError> {
        let response = self.agent.get(url).call().map_err(map_ureq)?;
        Ok(Box::new(response.into_reader()))
    }

    fn put(&self, url: &str, body: &mut dyn Read, len: u64) -> Result<String, RemoteError> {
        let response = self
            .agent
            .put(url)
            .set("Content-Length", &len.to_string())
            .send(body)
            .map_err(map_ureq)?;
        response
            .header(VERSION_HEADER)
            .map(str::to_string)
            .ok_or_else(|| RemoteError::MissingVersionId {
                key: url.split('?').next().unwrap_or(url).to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_unwraps_data() {
        let raw = r#"{"response":"ok","data":{"a":"https://x/a"}}"#;
        let envelope: Envelope<HashMap<String, String>> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.data["a"], "https://x/a");
    }

    #[test]
    fn presign_get_body_uses_wire_names() {
        let objects = vec![ObjectRef {
            key: "p/ds/a.csv".into(),
            version_id: "v1".into(),
        }];
        let body = json!({ "expiration": 3600, "obj_infos": objects });
        assert_eq!(body["obj_infos"][0]["obj_key"], "p/ds/a.csv");
        assert_eq!(body["obj_infos"][0]["version_id"], "v1");
    }

    #[test]
    fn origin_trailing_slash_is_trimmed() {
        let api = HttpApi::new("http://localhost:5000/", None);
        assert_eq!(api.origin, "http://localhost:5000");
    }
}
