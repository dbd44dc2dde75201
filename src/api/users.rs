//! User account endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        permission::{authorize, Action, Resource},
        user::{AdminUpdateUser, RegisterUser, ReplaceProfile, UpdateProfile, UserDetails, UserProfile, UserQuery},
    },
    AppState,
};

use super::{AuthenticatedUser, JsonBody};

/// Register a new account
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = UserProfile),
        (status = 400, description = "Invalid input or email already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterUser>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    authorize(None, Resource::User { user_id: None }, Action::Create)?;

    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> AppResult<Json<UserProfile>> {
    let actor = user.actor();
    authorize(Some(&actor), Resource::User { user_id: Some(actor.user_id) }, Action::Read)?;

    let account = state.services.users.get_by_id(actor.user_id).await?;
    Ok(Json(account.into()))
}

/// Replace the caller's profile
#[utoipa::path(
    put,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = ReplaceProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn replace_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(profile): JsonBody<ReplaceProfile>,
) -> AppResult<Json<UserProfile>> {
    let actor = user.actor();
    authorize(Some(&actor), Resource::User { user_id: Some(actor.user_id) }, Action::Update)?;

    let updated = state
        .services
        .users
        .update_profile(actor.user_id, profile.into())
        .await?;
    Ok(Json(updated.into()))
}

/// Partially update the caller's profile
#[utoipa::path(
    patch,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(profile): JsonBody<UpdateProfile>,
) -> AppResult<Json<UserProfile>> {
    let actor = user.actor();
    authorize(Some(&actor), Resource::User { user_id: Some(actor.user_id) }, Action::Update)?;

    let updated = state.services.users.update_profile(actor.user_id, profile).await?;
    Ok(Json(updated.into()))
}

/// List accounts
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "List of users", body = Vec<UserDetails>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Vec<UserDetails>>> {
    authorize(Some(&user.actor()), Resource::User { user_id: None }, Action::Read)?;

    let users = state.services.users.list(&query).await?;
    Ok(Json(users.into_iter().map(UserDetails::from).collect()))
}

/// Get an account by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = UserDetails),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UserDetails>> {
    authorize(Some(&user.actor()), Resource::User { user_id: Some(id) }, Action::Read)?;

    let account = state.services.users.get_by_id(id).await?;
    Ok(Json(account.into()))
}

/// Update an account, including privilege flags
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = AdminUpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserDetails),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    JsonBody(request): JsonBody<AdminUpdateUser>,
) -> AppResult<Json<UserDetails>> {
    authorize(Some(&user.actor()), Resource::User { user_id: None }, Action::Update)?;

    let updated = state.services.users.admin_update(id, request).await?;
    Ok(Json(updated.into()))
}

/// Delete an account
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    authorize(Some(&user.actor()), Resource::User { user_id: None }, Action::Delete)?;

    state.services.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
