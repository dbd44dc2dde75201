//! Book (catalog entry) model and related types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult, FieldErrors};

/// Largest fee representable by NUMERIC(8, 2)
const MAX_DAILY_FEE: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2);

/// Physical binding of a book copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cover {
    Hard,
    Soft,
}

impl Cover {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cover::Hard => "HARD",
            Cover::Soft => "SOFT",
        }
    }
}

impl std::fmt::Display for Cover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Cover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HARD" => Ok(Cover::Hard),
            "SOFT" => Ok(Cover::Soft),
            _ => Err(format!("Invalid cover: {}", s)),
        }
    }
}

// SQLx conversion for Cover (stored as VARCHAR)
impl sqlx::Type<Postgres> for Cover {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Cover {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: &str = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Cover {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Book row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub cover: Cover,
    /// Copies currently available for borrowing
    pub inventory: i32,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    #[schema(value_type = f64, example = 1.5)]
    pub daily_fee: Decimal,
}

fn validate_daily_fee(fee: &Decimal) -> Result<(), ValidationError> {
    if *fee <= Decimal::ZERO {
        return Err(ValidationError::new("min_value").with_message("Daily fee must be greater than 0.".into()));
    }
    if fee.normalize().scale() > 2 {
        return Err(ValidationError::new("decimal_places")
            .with_message("Ensure that there are no more than 2 decimal places.".into()));
    }
    if *fee > MAX_DAILY_FEE {
        return Err(ValidationError::new("max_digits")
            .with_message("Ensure that there are no more than 8 digits in total.".into()));
    }
    Ok(())
}

/// Create / full update request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 1, max = 99, message = "Title must be between 1 and 99 characters."))]
    pub title: String,
    #[validate(length(min = 1, max = 99, message = "Author must be between 1 and 99 characters."))]
    pub author: String,
    pub cover: Cover,
    #[validate(range(min = 1, message = "Inventory must be at least 1."))]
    pub inventory: i32,
    #[validate(custom(function = "validate_daily_fee"))]
    #[schema(value_type = f64, example = 1.5)]
    pub daily_fee: Decimal,
}

/// Partial update request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BookPatch {
    #[validate(length(min = 1, max = 99, message = "Title must be between 1 and 99 characters."))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 99, message = "Author must be between 1 and 99 characters."))]
    pub author: Option<String>,
    pub cover: Option<Cover>,
    #[validate(range(min = 1, message = "Inventory must be at least 1."))]
    pub inventory: Option<i32>,
    #[validate(custom(function = "validate_daily_fee"))]
    #[schema(value_type = Option<f64>)]
    pub daily_fee: Option<Decimal>,
}

impl BookPatch {
    /// Overlay the patch on an existing book, yielding a complete input
    pub fn apply_to(self, book: &Book) -> BookInput {
        BookInput {
            title: self.title.unwrap_or_else(|| book.title.clone()),
            author: self.author.unwrap_or_else(|| book.author.clone()),
            cover: self.cover.unwrap_or(book.cover),
            inventory: self.inventory.unwrap_or(book.inventory),
            daily_fee: self.daily_fee.unwrap_or(book.daily_fee),
        }
    }
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Exact cover match (HARD or SOFT)
    pub cover: Option<Cover>,
    /// Exact author match
    pub author: Option<String>,
    /// Case-insensitive author substring
    #[serde(rename = "author__icontains")]
    pub author_icontains: Option<String>,
    /// Whitespace-separated terms, each matched against title or author
    pub search: Option<String>,
    /// Comma-separated sort fields, `-` prefix for descending
    pub ordering: Option<String>,
}

/// Columns accepted by the `ordering` parameter
const ORDERABLE_FIELDS: &[&str] = &["title", "author", "inventory", "daily_fee"];

/// One parsed `ordering` term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub descending: bool,
}

impl SortKey {
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.column, if self.descending { "DESC" } else { "ASC" })
    }
}

impl BookQuery {
    /// Parse `ordering`, dropping unknown fields; falls back to title, author
    pub fn sort_keys(&self) -> Vec<SortKey> {
        let mut keys: Vec<SortKey> = self
            .ordering
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .filter_map(|term| {
                let (descending, name) = match term.strip_prefix('-') {
                    Some(name) => (true, name),
                    None => (false, term),
                };
                ORDERABLE_FIELDS
                    .iter()
                    .copied()
                    .find(|field| *field == name)
                    .map(|column| SortKey { column, descending })
            })
            .collect();

        if keys.is_empty() {
            keys = vec![
                SortKey { column: "title", descending: false },
                SortKey { column: "author", descending: false },
            ];
        }
        keys
    }

    /// Non-empty search terms
    pub fn search_terms(&self) -> Vec<&str> {
        self.search
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Escape LIKE wildcards so user input only matches literally
pub fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Validate a complete book input and turn failures into field errors
pub fn validate_input(input: &BookInput) -> AppResult<()> {
    input.validate().map_err(AppError::from)
}

/// Error returned when another book already has the same title, author and cover
pub fn duplicate_combination() -> AppError {
    AppError::Validation(FieldErrors::single(
        crate::error::NON_FIELD_ERRORS,
        crate::error::DUPLICATE_BOOK,
    ))
}
