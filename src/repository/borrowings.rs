//! Borrowings repository for database operations

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::borrowing::{Borrowing, BorrowingDetails, BorrowingFilter, BorrowingRow},
};

/// Borrowing joined with its book, columns aliased for `BorrowingRow`
const SELECT_DETAILS: &str = r#"
    SELECT b.id, b.borrow_date, b.expected_return_date, b.actual_return_date,
           b.user_id, b.book_id,
           bk.title AS book_title, bk.author AS book_author, bk.cover AS book_cover,
           bk.inventory AS book_inventory, bk.daily_fee AS book_daily_fee
    FROM borrowings b
    JOIN books bk ON bk.id = b.book_id
"#;

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List borrowings, newest first with id as tie-break
    pub async fn list(&self, filter: &BorrowingFilter) -> AppResult<Vec<BorrowingDetails>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_DETAILS);
        builder.push(" WHERE 1=1");

        if let Some(user_id) = filter.user_id {
            builder.push(" AND b.user_id = ").push_bind(user_id);
        }

        match filter.active {
            Some(true) => {
                builder.push(" AND b.actual_return_date IS NULL");
            }
            Some(false) => {
                builder.push(" AND b.actual_return_date IS NOT NULL");
            }
            None => {}
        }

        builder.push(" ORDER BY b.borrow_date DESC, b.id ASC");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit.max(0));
        }
        if let Some(offset) = filter.offset {
            builder.push(" OFFSET ").push_bind(offset.max(0));
        }

        let rows = builder
            .build_query_as::<BorrowingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(BorrowingDetails::from).collect())
    }

    /// Get a borrowing with its book
    pub async fn get_details(&self, id: i32) -> AppResult<Option<BorrowingRow>> {
        let row = sqlx::query_as::<_, BorrowingRow>(&format!("{} WHERE b.id = $1", SELECT_DETAILS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Same as [`Self::get_details`] but inside the caller's transaction
    pub async fn get_details_in(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<BorrowingRow>> {
        let row = sqlx::query_as::<_, BorrowingRow>(&format!("{} WHERE b.id = $1", SELECT_DETAILS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Lock a borrowing and its book row for the rest of the transaction
    pub async fn lock_for_return(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<Borrowing>> {
        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            SELECT b.id, b.borrow_date, b.expected_return_date, b.actual_return_date,
                   b.book_id, b.user_id
            FROM borrowings b
            JOIN books bk ON bk.id = b.book_id
            WHERE b.id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(borrowing)
    }

    /// Lock every active borrowing of a user for the rest of the transaction
    pub async fn lock_active_for_user(&self, conn: &mut PgConnection, user_id: i32) -> AppResult<Vec<Borrowing>> {
        let borrowings = sqlx::query_as::<_, Borrowing>(
            r#"
            SELECT id, borrow_date, expected_return_date, actual_return_date, book_id, user_id
            FROM borrowings
            WHERE user_id = $1 AND actual_return_date IS NULL
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(borrowings)
    }

    /// Insert an active borrowing
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
        expected_return_date: NaiveDate,
    ) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO borrowings (borrow_date, expected_return_date, actual_return_date, book_id, user_id)
            VALUES ($1, $2, NULL, $3, $4)
            RETURNING id
            "#,
        )
        .bind(borrow_date)
        .bind(expected_return_date)
        .bind(book_id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    /// Record the return date of a borrowing
    pub async fn mark_returned(&self, conn: &mut PgConnection, id: i32, returned_on: NaiveDate) -> AppResult<()> {
        sqlx::query("UPDATE borrowings SET actual_return_date = $2 WHERE id = $1")
            .bind(id)
            .bind(returned_on)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
