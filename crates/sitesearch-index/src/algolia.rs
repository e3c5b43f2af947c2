//! Algolia REST client.
//!
//! Writes go to `https://{app_id}.algolia.net`, reads to the
//! `https://{app_id}-dsn.algolia.net` replica. Both can be replaced by a single
//! host for proxies and local test servers.

use std::{collections::BTreeSet, fmt};

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sitesearch_core::config::{IndexConfig, MAX_BATCH_SIZE};
use sitesearch_records::SearchRecord;
use tracing::{debug, info};

use crate::{IndexError, Result, SaveOptions, SearchIndex, validate_records};

/// Records per batch request unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Hits per browse page.
const BROWSE_PAGE_SIZE: usize = 1000;

const HEADER_APP_ID: &str = "X-Algolia-Application-Id";
const HEADER_API_KEY: &str = "X-Algolia-API-Key";

/// Action of one entry in a batch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchAction {
    /// Insert a record and let the index assign its ID.
    AddObject,
    /// Insert or replace the record with the given ID.
    UpdateObject,
    /// Remove the record with the given ID.
    DeleteObject,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OperationBody<'a> {
    Record(&'a SearchRecord),
    ObjectId {
        #[serde(rename = "objectID")]
        object_id: &'a str,
    },
}

/// One entry of a batch request.
#[derive(Debug, Serialize)]
pub struct BatchOperation<'a> {
    action: BatchAction,
    body: OperationBody<'a>,
}

impl BatchOperation<'_> {
    /// The action performed by this entry.
    pub fn action(&self) -> BatchAction {
        self.action
    }
}

/// Body of `POST /1/indexes/{index}/batch`.
#[derive(Debug, Serialize)]
pub struct BatchPayload<'a> {
    requests: Vec<BatchOperation<'a>>,
}

impl<'a> BatchPayload<'a> {
    /// Upserts for a chunk of records. Records without an ID become `addObject`.
    pub fn save(records: &'a [SearchRecord]) -> Self {
        let requests = records
            .iter()
            .map(|record| BatchOperation {
                action: if record.object_id.is_some() {
                    BatchAction::UpdateObject
                } else {
                    BatchAction::AddObject
                },
                body: OperationBody::Record(record),
            })
            .collect();
        Self { requests }
    }

    /// Deletions for a chunk of object IDs.
    pub fn delete(object_ids: &'a [String]) -> Self {
        let requests = object_ids
            .iter()
            .map(|id| BatchOperation {
                action: BatchAction::DeleteObject,
                body: OperationBody::ObjectId { object_id: id },
            })
            .collect();
        Self { requests }
    }

    /// The entries of this payload.
    pub fn operations(&self) -> &[BatchOperation<'a>] {
        &self.requests
    }
}

/// Response of a batch request.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchResponse {
    #[serde(rename = "taskID")]
    pub task_id: u64,
    #[serde(rename = "objectIDs", default)]
    pub object_ids: Vec<String>,
}

/// Body of `POST /1/indexes/{index}/browse`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseRequest<'a> {
    attributes_to_retrieve: [&'static str; 1],
    hits_per_page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

impl<'a> BrowseRequest<'a> {
    /// Request for the page following `cursor`, or the first page.
    pub fn page(cursor: Option<&'a str>) -> Self {
        Self {
            attributes_to_retrieve: ["objectID"],
            hits_per_page: BROWSE_PAGE_SIZE,
            cursor,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BrowseHit {
    #[serde(rename = "objectID")]
    object_id: String,
}

/// One page of a browse response.
#[derive(Debug, Deserialize)]
pub struct BrowsePage {
    #[serde(default)]
    hits: Vec<BrowseHit>,
    /// Cursor of the next page; absent on the last one.
    #[serde(default)]
    pub cursor: Option<String>,
}

impl BrowsePage {
    /// Object IDs on this page.
    pub fn object_ids(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|hit| hit.object_id.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Turn a non-success response into an [`IndexError::Api`].
pub fn api_error(status: u16, body: &str) -> IndexError {
    let message = match serde_json::from_str::<ApiMessage>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    };
    IndexError::api(status, message)
}

/// Client for one Algolia index.
#[derive(Clone)]
pub struct AlgoliaIndex {
    client: ReqwestClient,
    app_id: String,
    api_key: String,
    index_name: String,
    batch_size: usize,
    write_host: String,
    read_host: String,
}

impl fmt::Debug for AlgoliaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgoliaIndex")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .field("index_name", &self.index_name)
            .field("batch_size", &self.batch_size)
            .field("write_host", &self.write_host)
            .field("read_host", &self.read_host)
            .finish()
    }
}

impl AlgoliaIndex {
    /// Create a client for `index_name` using the default Algolia hosts.
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Result<Self> {
        let app_id = app_id.into();
        let api_key = api_key.into();
        let index_name = index_name.into();

        for (name, value) in [
            ("application id", &app_id),
            ("api key", &api_key),
            ("index name", &index_name),
        ] {
            if value.trim().is_empty() {
                return Err(IndexError::validation(format!("{name} must not be empty")));
            }
        }

        Ok(Self {
            client: ReqwestClient::new(),
            write_host: format!("https://{app_id}.algolia.net"),
            read_host: format!("https://{app_id}-dsn.algolia.net"),
            app_id,
            api_key,
            index_name,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Create a client from the `[index]` configuration section.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let index = Self::new(&config.app_id, &config.api_key, &config.index_name)?
            .with_batch_size(config.batch_size)?;
        Ok(match &config.host {
            Some(host) => index.with_host(host),
            None => index,
        })
    }

    /// Send reads and writes to `host` instead of the Algolia clusters.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.write_host = host.clone();
        self.read_host = host;
        self
    }

    /// Set the number of operations per batch request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(IndexError::validation(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
            )));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Number of operations per batch request.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// URL of an index endpoint such as `batch` or `browse`.
    pub fn endpoint(&self, host: &str, action: &str) -> Result<Url> {
        let mut url = Url::parse(host)
            .map_err(|e| IndexError::connection(format!("invalid host '{host}': {e}")))?;
        url.path_segments_mut()
            .map_err(|_| IndexError::connection(format!("host '{host}' cannot be a base URL")))?
            .pop_if_empty()
            .extend(["1", "indexes", self.index_name.as_str(), action]);
        Ok(url)
    }

    async fn post<B, R>(&self, url: Url, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url.clone())
            .header(HEADER_APP_ID, &self.app_id)
            .header(HEADER_API_KEY, &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| IndexError::parse(format!("unexpected response from {}: {e}", url.path())))
    }

    async fn send_batch(&self, payload: &BatchPayload<'_>) -> Result<BatchResponse> {
        let url = self.endpoint(&self.write_host, "batch")?;
        let response: BatchResponse = self.post(url, payload).await?;
        debug!(
            index = %self.index_name,
            operations = payload.operations().len(),
            task_id = response.task_id,
            "Batch accepted"
        );
        Ok(response)
    }
}

#[async_trait]
impl SearchIndex for AlgoliaIndex {
    fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn save_records(
        &self,
        records: &[SearchRecord],
        options: SaveOptions,
    ) -> Result<Vec<String>> {
        validate_records(records, options)?;

        let mut object_ids = Vec::with_capacity(records.len());
        for chunk in records.chunks(self.batch_size) {
            let response = self.send_batch(&BatchPayload::save(chunk)).await?;
            if response.object_ids.len() != chunk.len() {
                return Err(IndexError::parse(format!(
                    "batch returned {} object IDs for {} records",
                    response.object_ids.len(),
                    chunk.len()
                )));
            }
            object_ids.extend(response.object_ids);
        }

        info!(index = %self.index_name, count = object_ids.len(), "Saved records");
        Ok(object_ids)
    }

    async fn list_object_ids(&self) -> Result<BTreeSet<String>> {
        let url = self.endpoint(&self.read_host, "browse")?;
        let mut object_ids = BTreeSet::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page: BrowsePage = self
                .post(url.clone(), &BrowseRequest::page(cursor.as_deref()))
                .await?;
            pages += 1;
            object_ids.extend(page.object_ids().map(str::to_string));

            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(index = %self.index_name, pages, count = object_ids.len(), "Listed object IDs");
        Ok(object_ids)
    }

    async fn delete_records(&self, object_ids: &[String]) -> Result<usize> {
        if object_ids.is_empty() {
            return Ok(0);
        }

        for chunk in object_ids.chunks(self.batch_size) {
            self.send_batch(&BatchPayload::delete(chunk)).await?;
        }

        info!(index = %self.index_name, count = object_ids.len(), "Deleted records");
        Ok(object_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    fn index() -> AlgoliaIndex {
        AlgoliaIndex::new("APPID", "secret", "docs").unwrap()
    }

    #[test]
    fn test_save_payload_actions() {
        let records = vec![record("a", 1, Some("a-1")), record("b", 1, None)];
        let payload = BatchPayload::save(&records);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["requests"][0]["action"], "updateObject");
        assert_eq!(json["requests"][0]["body"]["objectID"], "a-1");
        assert_eq!(json["requests"][0]["body"]["slug"], "a");
        assert_eq!(json["requests"][1]["action"], "addObject");
        assert!(json["requests"][1]["body"].get("objectID").is_none());
    }

    #[test]
    fn test_delete_payload() {
        let ids = vec!["a-1".to_string(), "c".to_string()];
        let json = serde_json::to_value(BatchPayload::delete(&ids)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "requests": [
                    {"action": "deleteObject", "body": {"objectID": "a-1"}},
                    {"action": "deleteObject", "body": {"objectID": "c"}}
                ]
            })
        );
    }

    #[test]
    fn test_browse_request_shape() {
        let first = serde_json::to_value(BrowseRequest::page(None)).unwrap();
        assert_eq!(
            first,
            serde_json::json!({"attributesToRetrieve": ["objectID"], "hitsPerPage": 1000})
        );

        let next = serde_json::to_value(BrowseRequest::page(Some("abc"))).unwrap();
        assert_eq!(next["cursor"], "abc");
    }

    #[test]
    fn test_browse_page_parsing() {
        let page: BrowsePage = serde_json::from_str(
            r#"{"hits":[{"objectID":"a-1"},{"objectID":"c","_highlightResult":{}}],"cursor":"next","nbHits":2}"#,
        )
        .unwrap();
        assert_eq!(page.object_ids().collect::<Vec<_>>(), vec!["a-1", "c"]);
        assert_eq!(page.cursor.as_deref(), Some("next"));

        let last: BrowsePage = serde_json::from_str(r#"{"hits":[]}"#).unwrap();
        assert!(last.cursor.is_none());
    }

    #[test]
    fn test_batch_response_parsing() {
        let response: BatchResponse =
            serde_json::from_str(r#"{"taskID":42,"objectIDs":["a-1","1234"]}"#).unwrap();
        assert_eq!(response.task_id, 42);
        assert_eq!(response.object_ids, vec!["a-1", "1234"]);
    }

    #[test]
    fn test_api_error_mapping() {
        let err = api_error(403, r#"{"message":"Invalid Application-ID or API key","status":403}"#);
        assert!(matches!(
            &err,
            IndexError::Api { status: 403, message } if message == "Invalid Application-ID or API key"
        ));

        let err = api_error(502, "<html>Bad Gateway</html>\n");
        assert!(matches!(&err, IndexError::Api { message, .. } if message == "<html>Bad Gateway</html>"));

        let err = api_error(500, "");
        assert!(matches!(&err, IndexError::Api { message, .. } if message == "empty response body"));
    }

    #[test]
    fn test_default_endpoints() {
        let index = index();
        assert_eq!(
            index.endpoint(&index.write_host, "batch").unwrap().as_str(),
            "https://appid.algolia.net/1/indexes/docs/batch"
        );
        assert_eq!(
            index.endpoint(&index.read_host, "browse").unwrap().as_str(),
            "https://appid-dsn.algolia.net/1/indexes/docs/browse"
        );
    }

    #[test]
    fn test_host_override_and_encoding() {
        let index = AlgoliaIndex::new("APPID", "secret", "docs v2/en")
            .unwrap()
            .with_host("http://localhost:8080/proxy/");
        assert_eq!(
            index.endpoint(&index.read_host, "browse").unwrap().as_str(),
            "http://localhost:8080/proxy/1/indexes/docs%20v2%2Fen/browse"
        );
    }

    #[test]
    fn test_constructor_validation() {
        assert!(matches!(
            AlgoliaIndex::new("", "secret", "docs"),
            Err(IndexError::Validation(_))
        ));
        assert!(index().with_batch_size(0).is_err());
        assert!(index().with_batch_size(MAX_BATCH_SIZE + 1).is_err());
        assert_eq!(index().with_batch_size(50).unwrap().batch_size(), 50);
    }

    #[test]
    fn test_from_config() {
        let config = IndexConfig {
            app_id: "APPID".to_string(),
            api_key: "secret".to_string(),
            index_name: "docs".to_string(),
            batch_size: 250,
            host: Some("http://127.0.0.1:9999".to_string()),
        };
        let index = AlgoliaIndex::from_config(&config).unwrap();
        assert_eq!(index.batch_size(), 250);
        assert_eq!(index.index_name(), "docs");
        assert_eq!(
            index.endpoint(&index.write_host, "batch").unwrap().as_str(),
            "http://127.0.0.1:9999/1/indexes/docs/batch"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", index());
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_missing_ids_rejected_before_request() {
        // Unroutable host: reaching the network would fail differently.
        let index = index().with_host("http://127.0.0.1:1");
        let err = index
            .save_records(&[record("a", 1, None)], SaveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_delete_is_noop() {
        let index = index().with_host("http://127.0.0.1:1");
        assert_eq!(index.delete_records(&[]).await.unwrap(), 0);
    }

    /// A single-threaded HTTP/1.1 responder standing in for the Algolia API.
    mod server {
        use tokio::{
            io::{AsyncReadExt, AsyncWriteExt},
            net::{TcpListener, TcpStream},
            task::JoinHandle,
        };

        /// A request as received by the server.
        pub struct Received {
            pub head: String,
            pub path: String,
            pub body: serde_json::Value,
        }

        /// Answer one connection per entry of `responses`, in order.
        ///
        /// Returns the base URL and a handle yielding the received requests.
        pub async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Received>>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let host = format!("http://{}", listener.local_addr().unwrap());

            let handle = tokio::spawn(async move {
                let mut received = Vec::new();
                for (status, body) in responses {
                    let (mut stream, _) = listener.accept().await.unwrap();
                    received.push(read_request(&mut stream).await);
                    let response = format!(
                        "HTTP/1.1 {status} Fake\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(response.as_bytes()).await.unwrap();
                    stream.shutdown().await.unwrap();
                }
                received
            });

            (host, handle)
        }

        async fn read_request(stream: &mut TcpStream) -> Received {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let header_end = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            while buf.len() < header_end + length {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
            let body = serde_json::from_slice(&buf[header_end..header_end + length])
                .unwrap_or(serde_json::Value::Null);

            Received { head, path, body }
        }
    }

    #[tokio::test]
    async fn test_save_records_in_chunks() {
        let (host, requests) = server::serve(vec![
            (200, r#"{"taskID":1,"objectIDs":["a-1","a-2"]}"#),
            (200, r#"{"taskID":2,"objectIDs":["a-3"]}"#),
        ])
        .await;
        let index = index().with_host(host).with_batch_size(2).unwrap();
        let records = vec![
            record("a", 1, Some("a-1")),
            record("a", 2, Some("a-2")),
            record("a", 3, Some("a-3")),
        ];

        let ids = index
            .save_records(&records, SaveOptions::default())
            .await
            .unwrap();
        assert_eq!(ids, vec!["a-1", "a-2", "a-3"]);

        let requests = requests.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.path == "/1/indexes/docs/batch"));
        assert_eq!(requests[0].body["requests"].as_array().unwrap().len(), 2);
        assert_eq!(requests[1].body["requests"].as_array().unwrap().len(), 1);
        assert_eq!(requests[1].body["requests"][0]["body"]["objectID"], "a-3");

        let head = requests[0].head.to_ascii_lowercase();
        assert!(head.contains("x-algolia-application-id: appid"));
        assert!(head.contains("x-algolia-api-key: secret"));
    }

    #[tokio::test]
    async fn test_save_records_id_count_mismatch() {
        let (host, requests) =
            server::serve(vec![(200, r#"{"taskID":1,"objectIDs":["a-1"]}"#)]).await;
        let index = index().with_host(host);
        let records = vec![record("a", 1, Some("a-1")), record("a", 2, Some("a-2"))];

        let err = index
            .save_records(&records, SaveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(&err, IndexError::Parse(message) if message.contains("1 object IDs for 2 records")));
        assert_eq!(requests.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_follows_browse_cursor() {
        let (host, requests) = server::serve(vec![
            (200, r#"{"hits":[{"objectID":"a-1"},{"objectID":"b-1"}],"cursor":"page-2"}"#),
            (200, r#"{"hits":[{"objectID":"c"}]}"#),
        ])
        .await;
        let index = index().with_host(host);

        let ids = index.list_object_ids().await.unwrap();
        assert_eq!(
            ids,
            BTreeSet::from(["a-1".to_string(), "b-1".to_string(), "c".to_string()])
        );

        let requests = requests.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.path == "/1/indexes/docs/browse"));
        assert!(requests[0].body.get("cursor").is_none());
        assert_eq!(requests[1].body["cursor"], "page-2");
    }

    #[tokio::test]
    async fn test_rejected_request_maps_to_api_error() {
        let (host, requests) = server::serve(vec![(
            403,
            r#"{"message":"Invalid Application-ID or API key","status":403}"#,
        )])
        .await;
        let index = index().with_host(host);

        let err = index
            .delete_records(&["a-1".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            IndexError::Api { status: 403, message } if message == "Invalid Application-ID or API key"
        ));

        let requests = requests.await.unwrap();
        assert_eq!(requests[0].body["requests"][0]["action"], "deleteObject");
    }
}
