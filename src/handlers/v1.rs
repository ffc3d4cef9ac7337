use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;

use serde_json::json;
use tracing::{instrument, Level};

use super::simple;
use crate::models::{PackageName, PackageRecord};
use crate::operations::{LookupError, PackageListing, PackageStorage};

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let status = match self {
            LookupError::InvalidName(_) => StatusCode::BAD_REQUEST,
            LookupError::PackageNotFound { .. } | LookupError::ReleaseNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            LookupError::Transport(_) | LookupError::Other(_) => {
                tracing::error!(error = ?self, "failed to look up package");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "internal error" })),
                )
                    .into_response();
            }
        };

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[instrument(level = "info", skip(state))]
async fn get_package<Storage>(
    State(state): State<Storage>,
    Path(name): Path<String>,
) -> Result<Json<PackageRecord>, LookupError>
where
    Storage: PackageStorage,
{
    let name: PackageName = name.parse()?;
    Ok(Json(state.fetch_package(&name, None).await?))
}

#[instrument(level = "info", skip(state))]
async fn get_release<Storage>(
    State(state): State<Storage>,
    Path((name, release)): Path<(String, String)>,
) -> Result<Json<PackageRecord>, LookupError>
where
    Storage: PackageStorage,
{
    let name: PackageName = name.parse()?;
    Ok(Json(
        state.fetch_package(&name, Some(release.as_str())).await?,
    ))
}

#[instrument(level = "info", skip(state))]
async fn simple_index<Listing>(State(state): State<Listing>) -> Result<Html<String>, LookupError>
where
    Listing: PackageListing,
{
    let names = state.list_packages().await?;
    Ok(Html(simple::render_index(names.as_slice())))
}

#[instrument(level = "info", skip(state))]
async fn simple_package<Listing>(
    State(state): State<Listing>,
    Path(name): Path<String>,
) -> Result<Html<String>, LookupError>
where
    Listing: PackageListing,
{
    let name: PackageName = name.parse()?;
    let files = state.list_files(&name).await?;
    let page = simple::render_package(name.as_str(), files.as_slice());
    Ok(Html(page))
}

async fn simple_package_redirect(Path(name): Path<String>) -> impl IntoResponse {
    let location = format!("/simple/{}/", urlencoding::encode(name.as_str()));
    Redirect::permanent(location.as_str())
}

pub fn routes<S>(state: S) -> Router
where
    S: PackageStorage + PackageListing + Clone + Sync + Send + 'static,
{
    Router::new()
        .route(
            "/pypi/:name/json",
            get(get_package::<S>)
                .layer(ServiceBuilder::new().layer(CompressionLayer::new())),
        )
        .route(
            "/pypi/:name/:release/json",
            get(get_release::<S>)
                .layer(ServiceBuilder::new().layer(CompressionLayer::new())),
        )
        .route("/simple/", get(simple_index::<S>))
        .route("/simple", get(|| async { Redirect::permanent("/simple/") }))
        .route("/simple/:name/", get(simple_package::<S>))
        .route("/simple/:name", get(simple_package_redirect))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(true)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
}
