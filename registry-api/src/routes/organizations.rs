use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    auth::ApiToken,
    domain::models::{
        AppliedTag, AppliedTagId, ApplyTag, Import, Location, LocationId, LocationInput,
        NewOrganization, Organization, OrganizationId, OrganizationName,
    },
    AppState,
};

use super::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/organizations", post(create_organization))
        .route("/organizations/:id", delete(destroy_organization))
        .route("/organizations/:id/names", post(add_name))
        .route("/organizations/:id/website", put(update_website))
        .route("/organizations/:id/locations", post(add_location))
        .route("/organizations/:id/tags", post(apply_tag))
        .route("/organizations/:id/tags/:tag", get(applied_tags))
        .route(
            "/locations/:id",
            put(update_location).delete(remove_location),
        )
        .route("/imports", post(create_import))
        .route("/applied-tags/:id", delete(remove_applied_tag))
}

#[instrument(name = "POST /organizations", skip(_token, app_state, body))]
async fn create_organization(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Json(body): Json<NewOrganization>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    let organization = app_state.organizations.create_organization(body).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

#[instrument(name = "DELETE /organizations/:id", skip(_token, app_state))]
async fn destroy_organization(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path(id): Path<OrganizationId>,
) -> Result<StatusCode, ApiError> {
    app_state.organizations.destroy_organization(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AddNameBody {
    content: String,
}

#[instrument(name = "POST /organizations/:id/names", skip(_token, app_state))]
async fn add_name(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path(id): Path<OrganizationId>,
    Json(body): Json<AddNameBody>,
) -> Result<(StatusCode, Json<OrganizationName>), ApiError> {
    let name = app_state.organizations.add_name(id, &body.content).await?;
    Ok((StatusCode::CREATED, Json(name)))
}

#[derive(Debug, Deserialize)]
struct UpdateWebsiteBody {
    website: Option<String>,
}

#[instrument(name = "PUT /organizations/:id/website", skip(_token, app_state))]
async fn update_website(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path(id): Path<OrganizationId>,
    Json(body): Json<UpdateWebsiteBody>,
) -> Result<Json<Organization>, ApiError> {
    let organization = app_state
        .organizations
        .update_website(id, body.website.as_deref())
        .await?;
    Ok(Json(organization))
}

#[instrument(name = "POST /organizations/:id/locations", skip(_token, app_state))]
async fn add_location(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path(id): Path<OrganizationId>,
    Json(body): Json<LocationInput>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let location = app_state.organizations.add_location(id, body).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

#[instrument(name = "PUT /locations/:id", skip(_token, app_state))]
async fn update_location(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path(id): Path<LocationId>,
    Json(body): Json<LocationInput>,
) -> Result<Json<Location>, ApiError> {
    let location = app_state.organizations.update_location(id, body).await?;
    Ok(Json(location))
}

#[instrument(name = "DELETE /locations/:id", skip(_token, app_state))]
async fn remove_location(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path(id): Path<LocationId>,
) -> Result<StatusCode, ApiError> {
    app_state.organizations.remove_location(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CreateImportBody {
    name: String,
}

#[instrument(name = "POST /imports", skip(_token, app_state))]
async fn create_import(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Json(body): Json<CreateImportBody>,
) -> Result<(StatusCode, Json<Import>), ApiError> {
    let import = app_state.organizations.create_import(&body.name).await?;
    Ok((StatusCode::CREATED, Json(import)))
}

#[instrument(name = "POST /organizations/:id/tags", skip(_token, app_state))]
async fn apply_tag(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path(id): Path<OrganizationId>,
    Json(body): Json<ApplyTag>,
) -> Result<(StatusCode, Json<AppliedTag>), ApiError> {
    let applied = app_state.organizations.apply_tag(id, body).await?;
    Ok((StatusCode::CREATED, Json(applied)))
}

#[instrument(name = "GET /organizations/:id/tags/:tag", skip(_token, app_state))]
async fn applied_tags(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path((id, tag)): Path<(OrganizationId, String)>,
) -> Result<Json<Vec<AppliedTag>>, ApiError> {
    let applied = app_state.organizations.applied_tags_for(id, &tag).await?;
    Ok(Json(applied))
}

#[instrument(name = "DELETE /applied-tags/:id", skip(_token, app_state))]
async fn remove_applied_tag(
    _token: ApiToken,
    State(app_state): State<AppState>,
    Path(id): Path<AppliedTagId>,
) -> Result<StatusCode, ApiError> {
    app_state.organizations.remove_applied_tag(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
