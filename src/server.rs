use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::index::{ExpenseView, PersonIndex};

pub const NOT_FOUND_MESSAGE: &str = "no data found for this person";

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

/// Error that converts into an HTTP response. Only the message is exposed.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: NOT_FOUND_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiError { message: self.message })).into_response()
    }
}

pub fn router(index: Arc<PersonIndex>) -> Router {
    Router::new()
        .route("/expenses/:identifier", get(get_expenses))
        .layer(TraceLayer::new_for_http())
        .with_state(index)
}

async fn get_expenses(
    State(index): State<Arc<PersonIndex>>,
    Path(identifier): Path<String>,
) -> std::result::Result<Json<Vec<ExpenseView>>, AppError> {
    index.lookup(&identifier).map(Json).ok_or_else(AppError::not_found)
}

pub async fn serve(bind: &str, index: Arc<PersonIndex>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "serving GET /expenses/{{identifier}}");
    axum::serve(listener, router(index)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::models::{YearDataset, NAME_COLUMN, URL_COLUMN, VALUE_COLUMN, YEAR_COLUMN};

    fn test_index() -> Arc<PersonIndex> {
        let columns = [NAME_COLUMN, "cpf", VALUE_COLUMN, URL_COLUMN, YEAR_COLUMN]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = vec![
            vec![Some("Ana".into()), Some("12345".into()), Some("100,00".into()), Some("http://doc/1".into()), Some("2019".into())],
            vec![Some("Ana".into()), Some("12345".into()), Some("abc".into()), Some("http://doc/2".into()), Some("2019".into())],
            vec![Some("Ana".into()), Some("12345".into()), Some("7,00".into()), None, Some("2019".into())],
        ];
        let ds = YearDataset::new(2019, columns, rows).unwrap();
        Arc::new(PersonIndex::from_datasets([ds], "cpf"))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router(test_index()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_known_person_returns_records_with_urls() {
        let (status, body) = get_json("/expenses/12345").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!([
                {"value": 100.0, "url": "http://doc/1", "year": "2019"},
                {"value": null, "url": "http://doc/2", "year": "2019"}
            ])
        );
    }

    #[tokio::test]
    async fn test_unknown_person_is_404() {
        let (status, body) = get_json("/expenses/00000").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({"message": NOT_FOUND_MESSAGE}));
    }
}
