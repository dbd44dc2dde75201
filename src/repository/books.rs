//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{like_pattern, Book, BookInput, BookQuery, Cover},
};

const BOOK_COLUMNS: &str = "id, title, author, cover, inventory, daily_fee";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Fetch a book and hold an exclusive row lock until the transaction ends
    pub async fn get_for_update(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(book)
    }

    /// List books matching the catalog filters
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM books WHERE 1=1", BOOK_COLUMNS));

        if let Some(cover) = query.cover {
            builder.push(" AND cover = ").push_bind(cover);
        }

        if let Some(ref author) = query.author {
            builder.push(" AND author = ").push_bind(author.clone());
        }

        if let Some(ref fragment) = query.author_icontains {
            builder.push(" AND author ILIKE ").push_bind(like_pattern(fragment));
        }

        for term in query.search_terms() {
            let pattern = like_pattern(term);
            builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR author ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        let order_by = query
            .sort_keys()
            .iter()
            .map(|key| key.to_sql())
            .collect::<Vec<_>>()
            .join(", ");
        builder.push(format!(" ORDER BY {}, id ASC", order_by));

        let books = builder.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok(books)
    }

    /// Check whether another book already uses this title/author/cover
    pub async fn combination_exists(
        &self,
        conn: &mut PgConnection,
        title: &str,
        author: &str,
        cover: Cover,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM books
                WHERE title = $1 AND author = $2 AND cover = $3
                  AND ($4::INTEGER IS NULL OR id != $4)
            )
            "#,
        )
        .bind(title)
        .bind(author)
        .bind(cover)
        .bind(exclude_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// Create a new book
    pub async fn create(&self, conn: &mut PgConnection, book: &BookInput) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, cover, inventory, daily_fee)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.cover)
        .bind(book.inventory)
        .bind(book.daily_fee)
        .fetch_one(&mut *conn)
        .await?;

        Ok(created)
    }

    /// Replace all editable fields of a book inside the caller's transaction
    pub async fn update(&self, conn: &mut PgConnection, id: i32, book: &BookInput) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
            SET title = $2, author = $3, cover = $4, inventory = $5, daily_fee = $6
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.cover)
        .bind(book.inventory)
        .bind(book.daily_fee)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book
    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Check whether any borrowing references the book
    pub async fn has_borrowings(&self, conn: &mut PgConnection, id: i32) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrowings WHERE book_id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        Ok(exists)
    }

    /// Shift a book's inventory by `delta` inside the caller's transaction
    pub async fn adjust_inventory(&self, conn: &mut PgConnection, id: i32, delta: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            "UPDATE books SET inventory = inventory + $2 WHERE id = $1 RETURNING {}",
            BOOK_COLUMNS
        ))
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }
}
