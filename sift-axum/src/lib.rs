//! Axum framework integration for Sift.
//!
//! - [`FilterParams`] extracts every repeated `f` query-string parameter
//!   into a [`FilterQuery`]
//! - [`DaoState`] extracts a shared [`Dao`] from router state
//! - [`ApiError`] maps [`QueryError`] to HTTP responses: 404 for the
//!   not-found codes, 400 for builder misuse, 500 for everything else
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{Json, Router, routing::get};
//! use sift_axum::{ApiError, DaoState, FilterParams};
//! use sift_query::{PredicateSet, QueryEngine};
//!
//! async fn list_produtos(
//!     DaoState(dao): DaoState<MyEngine>,
//!     FilterParams(mut filters): FilterParams,
//! ) -> Result<Json<Vec<Produto>>, ApiError> {
//!     filters.allow_only(["nome", "preco", "ativo"]);
//!     let mut predicates = PredicateSet::new();
//!     filters.apply_to(&mut predicates);
//!
//!     let produtos = dao
//!         .select()
//!         .from::<Produto>()?
//!         .where_set(&predicates)?
//!         .list()
//!         .await?;
//!     Ok(Json(produtos))
//! }
//!
//! let app = Router::new()
//!     .route("/produtos", get(list_produtos))
//!     .with_state(Arc::new(Dao::new(engine)));
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use sift_query::{Dao, FilterQuery, QueryEngine, QueryError};

/// Query-string key carrying filter tokens.
pub const FILTER_PARAM: &str = "f";

/// Extractor for `?f=field|CONDITION|value&f=...` filter tokens.
///
/// Never rejects: a missing query string yields an empty [`FilterQuery`],
/// and invalid tokens are dropped when the query is decoded.
#[derive(Debug, Clone, Default)]
pub struct FilterParams(pub FilterQuery);

impl FilterParams {
    /// Collect every `f` value from a raw query string.
    pub fn from_query(query: &str) -> Self {
        let tokens: Vec<String> = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == FILTER_PARAM)
            .map(|(_, value)| value.into_owned())
            .collect();
        debug!(tokens = tokens.len(), "Extracted filter tokens");
        Self(FilterQuery::new(tokens))
    }

    /// Unwrap the decoder.
    pub fn into_inner(self) -> FilterQuery {
        self.0
    }
}

impl<S> FromRequestParts<S> for FilterParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_query(parts.uri.query().unwrap_or_default()))
    }
}

/// Extractor for a shared [`Dao`] held in router state.
#[derive(Debug)]
pub struct DaoState<E: QueryEngine>(pub Arc<Dao<E>>);

impl<E, S> FromRequestParts<S> for DaoState<E>
where
    E: QueryEngine,
    Arc<Dao<E>>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Arc::<Dao<E>>::from_ref(state)))
    }
}

/// A [`QueryError`] on its way to becoming an HTTP response.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct ApiError(#[from] pub QueryError);

impl ApiError {
    /// The status code this error maps to.
    pub fn status(&self) -> StatusCode {
        if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self.0, "Query failed");
            "internal server error".to_string()
        } else {
            debug!(error = %self.0, status = status.as_u16(), "Query error mapped to response");
            self.0.message.clone()
        };
        (
            status,
            Json(json!({ "code": self.0.code.code(), "message": message })),
        )
            .into_response()
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{ApiError, DaoState, FilterParams};
    pub use sift_query::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::{Router, routing::get};
    use pretty_assertions::assert_eq;
    use sift_query::{Condition, FilterValue};
    use tower::ServiceExt;

    async fn extract(uri: &str) -> FilterQuery {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        let FilterParams(query) = FilterParams::from_request_parts(&mut parts, &()).await.unwrap();
        query
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_extracts_repeated_params() {
        let query = extract("/produtos?f=preco%7CLESS_THAN%7C10&page=2&f=nome%7CLIKE%7C%25saia%25").await;
        assert_eq!(query.tokens(), ["preco|LESS_THAN|10", "nome|LIKE|%saia%"]);

        let items = query.filters();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].condition(), Condition::LessThan);
        assert_eq!(items[0].value(), &FilterValue::Int(10));
        assert_eq!(items[1].value(), &FilterValue::String("%saia%".into()));
    }

    #[tokio::test]
    async fn test_missing_query_string() {
        assert!(extract("/produtos").await.tokens().is_empty());
    }

    #[tokio::test]
    async fn test_hostile_tokens_dropped_after_extraction() {
        let query = extract("/produtos?f=nome%7CEQUAL%7C1+OR+1%3D1&f=ativo%7CEQUAL%7Ctrue").await;
        assert_eq!(query.tokens()[0], "nome|EQUAL|1 OR 1=1");
        assert_eq!(query.filters().len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_404() {
        let response = ApiError::from(QueryError::not_found_by_id("Venda", 42i64)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["code"], "P1002");
        assert_eq!(body["message"], "Venda not found for id 42");

        let response = ApiError::from(QueryError::not_found("Produto")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_maps_to_400() {
        let response = ApiError::from(QueryError::invalid_limit(0)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response = ApiError::from(QueryError::database("password authentication failed")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "internal server error");
    }

    async fn count_filters(FilterParams(query): FilterParams) -> String {
        query.filters().len().to_string()
    }

    async fn missing() -> Result<String, ApiError> {
        Err(QueryError::not_found("Produto").into())
    }

    #[tokio::test]
    async fn test_router_round_trip() {
        let app = Router::new()
            .route("/produtos", get(count_filters))
            .route("/missing", get(missing));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/produtos?f=preco%7CGREATER_THAN%7C5&f=junk")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"1");

        let response = app
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
