//! Department catalog endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::error::{directory_error, not_found, store_error, ApiError};
use super::routes::AppState;
use crate::directory::{validate_new_catalog, Catalog, Roster};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_catalogs).post(create_catalog))
        .route("/:id/subtree", get(subtree))
}

async fn list_catalogs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Catalog>>, ApiError> {
    state.store.list_catalogs().await.map(Json).map_err(store_error)
}

async fn create_catalog(
    State(state): State<Arc<AppState>>,
    Json(catalog): Json<Catalog>,
) -> Result<Json<Catalog>, ApiError> {
    let existing = state.store.list_catalogs().await.map_err(store_error)?;
    validate_new_catalog(&catalog, &existing).map_err(directory_error)?;
    state
        .store
        .insert_catalog(&catalog)
        .await
        .map_err(store_error)?;
    tracing::info!("Added catalog {} ({})", catalog.id, catalog.name);
    Ok(Json(catalog))
}

/// GET /api/catalogs/:id/subtree - The catalog and every nested sub-catalog id.
async fn subtree(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let catalogs = state.store.list_catalogs().await.map_err(store_error)?;
    let roster = Roster::new(Vec::new(), catalogs);
    if roster.catalog(&id).is_none() {
        return Err(not_found("Catalog", &id));
    }
    let mut ids: Vec<String> = roster.subtree(&id).into_iter().collect();
    ids.sort();
    Ok(Json(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::tests::test_state;
    use crate::directory::tests::catalog;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn nested_catalogs() {
        let state = test_state();
        let Json(_) = create_catalog(State(state.clone()), Json(catalog("ops", None)))
            .await
            .unwrap();
        let Json(child) = create_catalog(State(state.clone()), Json(catalog("ops-field", Some("ops"))))
            .await
            .unwrap();
        assert_eq!(child.parent_id.as_deref(), Some("ops"));

        let err = create_catalog(State(state.clone()), Json(catalog("x", Some("ghost"))))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        let err = create_catalog(State(state.clone()), Json(catalog("ops", None)))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);

        let Json(ids) = subtree(State(state), Path("ops".into())).await.unwrap();
        assert_eq!(ids, vec!["ops", "ops-field"]);
    }
}
