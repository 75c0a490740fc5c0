// Sign-in / sign-out endpoints

use crate::server::{ApiError, AppState};
use crate::session::SessionSnapshot;
use crate::storage::{StoreError, UserRecord};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub id_token: String,
}

/// POST /api/sessions/:id/auth/sign-in - Attach the token's user to the session
pub async fn sign_in(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state.driver.view(&id, |_| ()).await?;

    let user = state.identity.verify(&request.id_token).await?;

    // The user record is best effort; sign-in succeeds without it
    match state.store.upsert_user(UserRecord::from(&user)).await {
        Ok(()) | Err(StoreError::Disabled) => {}
        Err(e) => tracing::warn!(uid = %user.uid, error = %e, "Failed to record user"),
    }

    tracing::info!(session = %id, uid = %user.uid, "Signed in");
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.set_user(Some(user));
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/sessions/:id/auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.set_user(None);
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}
