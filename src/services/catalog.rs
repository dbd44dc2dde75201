//! Book catalog service.
//!
//! Writes to an existing book hold its row lock for the whole
//! read-merge-write, the same lock borrow and return take, so an edit never
//! writes back an inventory count that a concurrent borrowing already changed.

use sqlx::PgConnection;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{self, Book, BookInput, BookPatch, BookQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters and ordering
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.search(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        book::validate_input(&input)?;

        let mut tx = self.repository.begin().await?;
        self.ensure_unique(&mut tx, &input, None).await?;
        let created = self.repository.books.create(&mut tx, &input).await?;
        tx.commit().await?;

        tracing::info!(
            book_id = created.id,
            inventory = created.inventory,
            "Catalog create: {} by {} ({})",
            created.title,
            created.author,
            created.cover
        );
        Ok(created)
    }

    /// Replace every field of a book
    pub async fn update_book(&self, id: i32, input: BookInput) -> AppResult<Book> {
        book::validate_input(&input)?;

        let mut tx = self.repository.begin().await?;
        self.lock(&mut tx, id).await?;
        self.ensure_unique(&mut tx, &input, Some(id)).await?;
        let updated = self.repository.books.update(&mut tx, id, &input).await?;
        tx.commit().await?;

        tracing::info!(book_id = id, inventory = updated.inventory, "Catalog update");
        Ok(updated)
    }

    /// Change only the fields present in the patch. Only those fields are
    /// validated, so a book whose copies are all borrowed stays editable.
    pub async fn patch_book(&self, id: i32, patch: BookPatch) -> AppResult<Book> {
        patch.validate()?;

        let mut tx = self.repository.begin().await?;
        let current = self.lock(&mut tx, id).await?;
        let input = patch.apply_to(&current);
        self.ensure_unique(&mut tx, &input, Some(id)).await?;
        let updated = self.repository.books.update(&mut tx, id, &input).await?;
        tx.commit().await?;

        tracing::info!(book_id = id, inventory = updated.inventory, "Catalog patch");
        Ok(updated)
    }

    /// Delete a book that was never borrowed
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        self.lock(&mut tx, id).await?;

        if self.repository.books.has_borrowings(&mut tx, id).await? {
            return Err(AppError::BusinessRule(
                "Book is referenced by borrowings and cannot be deleted.".to_string(),
            ));
        }

        self.repository.books.delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(book_id = id, "Catalog delete");
        Ok(())
    }

    async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Book> {
        self.repository
            .books
            .get_for_update(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn ensure_unique(
        &self,
        conn: &mut PgConnection,
        input: &BookInput,
        exclude_id: Option<i32>,
    ) -> AppResult<()> {
        let taken = self
            .repository
            .books
            .combination_exists(conn, &input.title, &input.author, input.cover, exclude_id)
            .await?;

        if taken {
            tracing::debug!("Catalog write rejected: duplicate {} / {} / {}", input.title, input.author, input.cover);
            return Err(book::duplicate_combination());
        }
        Ok(())
    }
}
