//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrowings, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Rental API",
        version = "1.0.0",
        description = "Book catalog, borrowing and account management REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::patch_book,
        books::delete_book,
        // Borrowings
        borrowings::list_borrowings,
        borrowings::get_borrowing,
        borrowings::create_borrowing,
        borrowings::return_borrowing,
        // Users
        users::register,
        users::me,
        users::replace_me,
        users::update_me,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        // Tokens
        auth::obtain_token,
        auth::refresh_token,
        auth::verify_token,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::Cover,
            crate::models::book::BookInput,
            crate::models::book::BookPatch,
            // Borrowings
            crate::models::borrowing::BorrowingDetails,
            crate::models::borrowing::CreateBorrowing,
            // Users
            crate::models::user::UserProfile,
            crate::models::user::UserDetails,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateProfile,
            crate::models::user::ReplaceProfile,
            crate::models::user::AdminUpdateUser,
            // Tokens
            crate::models::token::TokenObtainRequest,
            crate::models::token::TokenPair,
            crate::models::token::TokenRefreshRequest,
            crate::models::token::AccessToken,
            crate::models::token::TokenVerifyRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::FieldErrors,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "JWT token endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "borrowings", description = "Borrowing and returning books"),
        (name = "users", description = "Accounts and profiles")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
