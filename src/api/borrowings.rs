//! Borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::borrowing::{BorrowingDetails, BorrowingQuery, CreateBorrowing},
    AppState,
};

use super::{AuthenticatedUser, JsonBody};

/// List the caller's borrowings (all borrowings for admins)
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "List of borrowings", body = Vec<BorrowingDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    let borrowings = state.services.borrowings.list(&user.actor(), &query).await?;
    Ok(Json(borrowings))
}

/// Get one borrowing
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing details", body = BorrowingDetails),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    let borrowing = state.services.borrowings.get(&user.actor(), id).await?;
    Ok(Json(borrowing))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrowing created", body = BorrowingDetails),
        (status = 400, description = "Missing book, out of stock or invalid return date"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_borrowing(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(request): JsonBody<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<BorrowingDetails>)> {
    let created = state.services.borrowings.create(&user.actor(), request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = BorrowingDetails),
        (status = 400, description = "Already returned"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Borrowing belongs to another user"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn return_borrowing(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    let returned = state.services.borrowings.return_borrowing(&user.actor(), id).await?;
    Ok(Json(returned))
}
