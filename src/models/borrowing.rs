//! Borrowing (loan of one book copy) model and related types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult, FieldErrors};

use super::book::{Book, Cover};

/// Borrowing row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Borrowing {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub book_id: i32,
    pub user_id: i32,
}

impl Borrowing {
    /// A borrowing stays active until its return date is recorded
    pub fn is_active(&self) -> bool {
        self.actual_return_date.is_none()
    }

    /// Returning is allowed exactly once
    pub fn ensure_returnable(&self) -> AppResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(AppError::BusinessRule("Already returned.".to_string()))
        }
    }
}

/// Borrowing joined with its book, as fetched by the read queries
#[derive(Debug, Clone, FromRow)]
pub struct BorrowingRow {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub user_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub book_cover: Cover,
    pub book_inventory: i32,
    pub book_daily_fee: Decimal,
}

/// Borrowing with nested book detail
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingDetails {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub is_active: bool,
    pub book: Book,
    pub user_id: i32,
}

impl From<BorrowingRow> for BorrowingDetails {
    fn from(row: BorrowingRow) -> Self {
        BorrowingDetails {
            id: row.id,
            borrow_date: row.borrow_date,
            expected_return_date: row.expected_return_date,
            actual_return_date: row.actual_return_date,
            is_active: row.actual_return_date.is_none(),
            book: Book {
                id: row.book_id,
                title: row.book_title,
                author: row.book_author,
                cover: row.book_cover,
                inventory: row.book_inventory,
                daily_fee: row.book_daily_fee,
            },
            user_id: row.user_id,
        }
    }
}

/// Create borrowing request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowing {
    /// Book ID
    pub book: Option<i32>,
    /// Date the book is expected back; must be after today
    pub expected_return_date: Option<NaiveDate>,
}

impl CreateBorrowing {
    /// The book id, which is checked before anything touches storage
    pub fn book_id(&self) -> AppResult<i32> {
        self.book
            .ok_or_else(|| AppError::BadRequest("Field 'book' is required.".to_string()))
    }
}

/// Checks run against the locked book row before a borrowing is written:
/// stock first, then the return date. Yields the accepted return date.
pub fn check_can_borrow(
    book: &Book,
    expected_return_date: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<NaiveDate> {
    if book.inventory <= 0 {
        return Err(AppError::BusinessRule("Book is out of stock.".to_string()));
    }
    let expected_return_date = expected_return_date.ok_or_else(|| {
        AppError::Validation(FieldErrors::single("expected_return_date", "This field is required."))
    })?;
    if expected_return_date <= today {
        return Err(AppError::Validation(FieldErrors::single(
            "expected_return_date",
            "Expected return date must be in the future.",
        )));
    }
    Ok(expected_return_date)
}

/// Borrowing list query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    /// Admin-only: restrict to one user
    pub user_id: Option<i32>,
    /// `true` for active borrowings, `false` for returned ones
    pub is_active: Option<String>,
    /// Maximum number of rows
    pub limit: Option<i64>,
    /// Rows to skip
    pub offset: Option<i64>,
}

impl BorrowingQuery {
    /// `1`, `true`, `yes` and `y` (any case) select active borrowings;
    /// any other value selects returned ones.
    pub fn active_filter(&self) -> Option<bool> {
        self.is_active
            .as_deref()
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y"))
    }
}

/// Resolved filter handed to the repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BorrowingFilter {
    pub user_id: Option<i32>,
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
