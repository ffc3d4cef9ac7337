use std::fmt::Debug;

use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::models::{PackageName, PackageRecord};
use crate::operations::PackageCache;

// Documents are `{ name, body }`, where `body` is the serialized record, and
// are looked up through a `byName` index on `.name`.
const GET_QUERY: &str = r#"
let doc = Collection(collection).byName(name).first()
if (doc == null) null else doc!.body
"#;

const PUT_QUERY: &str = r#"
let doc = Collection(collection).byName(name).first()
if (doc == null) {
  Collection(collection).create({ name: name, body: body })
} else {
  doc!.replace({ name: name, body: body })
}
null
"#;

const LIST_QUERY: &str = "Collection(collection).all().map(.name).pageSize(500)";

const NEXT_PAGE_QUERY: &str = "Set.paginate(after)";

#[derive(Debug, Error, Deserialize)]
#[error("fauna query failed ({code}): {message}")]
pub struct FaunaError {
    code: String,
    message: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    arguments: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: FaunaError,
}

#[derive(Deserialize)]
struct Page {
    data: Vec<String>,
    #[serde(default)]
    after: Option<String>,
}

/// Package records stored as documents in a Fauna collection, spoken to over
/// Fauna's HTTP query API.
#[derive(Clone)]
pub struct FaunaCache {
    query_url: Url,
    secret: String,
    collection: String,
    client: reqwest::Client,
}

impl Debug for FaunaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaunaCache")
            .field("query_url", &self.query_url.as_str())
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl FaunaCache {
    pub fn new(
        endpoint: &Url,
        secret: impl Into<String>,
        collection: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let mut query_url = endpoint.clone();
        query_url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("fauna endpoint {} cannot be a base", endpoint))?
            .pop_if_empty()
            .push("query")
            .push("1");

        Ok(Self {
            query_url,
            secret: secret.into(),
            collection: collection.into(),
            client: reqwest::Client::new(),
        })
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        arguments: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        let mut args = serde_json::Map::new();
        args.insert(
            "collection".to_string(),
            serde_json::Value::from(self.collection.as_str()),
        );
        for (key, value) in arguments {
            args.insert(key.to_string(), serde_json::Value::from(*value));
        }

        let response = self
            .client
            .post(self.query_url.clone())
            .bearer_auth(&self.secret)
            .header("x-format", "simple")
            .json(&QueryRequest {
                query,
                arguments: args,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            if let Ok(ErrorResponse { error }) = serde_json::from_slice(&body) {
                return Err(error.into());
            }
            anyhow::bail!("fauna query failed with status {}", status);
        }

        let QueryResponse { data } =
            serde_json::from_slice(&body).context("unexpected fauna response body")?;
        Ok(data)
    }
}

#[async_trait::async_trait]
impl PackageCache for FaunaCache {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, name: &PackageName) -> anyhow::Result<Option<PackageRecord>> {
        let body: Option<String> = self.query(GET_QUERY, &[("name", name.as_str())]).await?;
        let Some(body) = body else {
            return Ok(None);
        };

        let record = serde_json::from_str(body.as_str())
            .with_context(|| format!("stored record for {} is not valid json", name))?;
        Ok(Some(record))
    }

    #[instrument(level = "debug", skip(self, record))]
    async fn put(&self, name: &PackageName, record: &PackageRecord) -> anyhow::Result<()> {
        let body = serde_json::to_string(record)?;
        let args = [("name", name.as_str()), ("body", body.as_str())];
        let _: serde_json::Value = self.query(PUT_QUERY, &args).await?;
        Ok(())
    }

    async fn list_names(&self) -> anyhow::Result<Vec<String>> {
        let mut page: Page = self.query(LIST_QUERY, &[]).await?;
        let mut names = page.data;

        while let Some(after) = page.after.take() {
            debug!(count = names.len(), "fetching next page of package names");
            let args = [("after", after.as_str())];
            page = self.query(NEXT_PAGE_QUERY, &args).await?;
            names.append(&mut page.data);
        }

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::net::TcpListener;
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use super::*;

    type Documents = Arc<Mutex<BTreeMap<String, String>>>;

    // Answers the handful of queries the cache issues, paging one name at a time.
    async fn fake_query(
        State(documents): State<Documents>,
        headers: HeaderMap,
        Json(request): Json<Value>,
    ) -> Response {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer s3cret") {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"code": "unauthorized", "message": "Invalid token"}})),
            )
                .into_response();
        }
        assert_eq!(request["arguments"]["collection"], "Package");

        let query = request["query"].as_str().unwrap_or_default();
        let arg = |key: &str| {
            let value = request["arguments"][key].as_str().unwrap_or_default();
            value.to_string()
        };
        let mut documents = documents.lock().await;

        let page = |names: &BTreeMap<String, String>, index: usize| {
            let name = names.keys().nth(index).cloned();
            let after = (index + 1 < names.len()).then(|| (index + 1).to_string());
            json!({"data": {"data": name.into_iter().collect::<Vec<_>>(), "after": after}})
        };

        let data = if query.contains(".create(") {
            documents.insert(arg("name"), arg("body"));
            json!({"data": null})
        } else if query.contains("Set.paginate") {
            page(&*documents, arg("after").parse().unwrap())
        } else if query.contains(".all()") {
            page(&*documents, 0)
        } else {
            json!({"data": documents.get(&arg("name"))})
        };

        Json(data).into_response()
    }

    fn serve_fauna(secret: &str) -> FaunaCache {
        let app = Router::new()
            .route("/query/1", post(fake_query))
            .with_state(Documents::default());

        let tcp = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = tcp.local_addr().unwrap();
        let server = axum::Server::from_tcp(tcp)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);

        let endpoint = Url::parse(&format!("http://{}", addr)).unwrap();
        FaunaCache::new(&endpoint, secret, "Package").unwrap()
    }

    fn record(releases: Value) -> PackageRecord {
        serde_json::from_value(json!({"info": {"summary": "test"}, "releases": releases})).unwrap()
    }

    #[test]
    fn query_url_is_derived_from_endpoint() {
        let endpoint = Url::parse("https://db.fauna.com").unwrap();
        let cache = FaunaCache::new(&endpoint, "s3cret", "Package").unwrap();
        assert_eq!(cache.query_url.as_str(), "https://db.fauna.com/query/1");
        assert!(!format!("{:?}", cache).contains("s3cret"));
    }

    #[tokio::test]
    async fn stores_and_reads_back_records() {
        let cache = serve_fauna("s3cret");
        let name: PackageName = "foo".parse().unwrap();

        assert_eq!(cache.get(&name).await.unwrap(), None);

        cache.put(&name, &record(json!({"1.0": []}))).await.unwrap();
        cache.put(&name, &record(json!({"2.0": []}))).await.unwrap();

        let stored = cache.get(&name).await.unwrap().unwrap();
        assert_eq!(stored, record(json!({"2.0": []})));
    }

    #[tokio::test]
    async fn listing_follows_page_cursors() {
        let cache = serve_fauna("s3cret");
        for name in ["c", "a", "b"] {
            let name: PackageName = name.parse().unwrap();
            cache.put(&name, &record(json!({}))).await.unwrap();
        }

        assert_eq!(cache.list_names().await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn fauna_errors_are_surfaced() {
        let cache = serve_fauna("wrong");
        let name: PackageName = "foo".parse().unwrap();

        let err = cache.get(&name).await.unwrap_err();
        let err = err.downcast::<FaunaError>().unwrap();
        assert_eq!(err.code, "unauthorized");
    }
}
