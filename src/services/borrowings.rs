//! Borrowing ledger service.
//!
//! Borrow and return each run in one transaction. The book row (and for a
//! return, the borrowing row) is locked with `FOR UPDATE` before inventory is
//! read, so two concurrent borrows of the last copy serialize and the second
//! one sees an empty shelf. A borrow also key-share locks the borrower's
//! account so it cannot be deleted underneath the new row.

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{self, BorrowingDetails, BorrowingFilter, BorrowingQuery, CreateBorrowing},
        permission::{authorize, Action, Actor, Resource},
    },
    repository::Repository,
};

/// Calendar date used for borrow and return stamps
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Resolve list parameters against the caller: members only ever see their
/// own rows, `user_id` is honoured for admins only.
pub fn scope_filter(actor: &Actor, query: &BorrowingQuery) -> BorrowingFilter {
    let user_id = if actor.is_admin() {
        query.user_id
    } else {
        Some(actor.user_id)
    };

    BorrowingFilter {
        user_id,
        active: query.active_filter(),
        limit: query.limit,
        offset: query.offset,
    }
}

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
}

impl BorrowingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List borrowings visible to the caller
    pub async fn list(&self, actor: &Actor, query: &BorrowingQuery) -> AppResult<Vec<BorrowingDetails>> {
        authorize(Some(actor), Resource::Borrowing { owner_id: None }, Action::Read)?;
        self.repository.borrowings.list(&scope_filter(actor, query)).await
    }

    /// Get one borrowing; other members' rows look like they do not exist
    pub async fn get(&self, actor: &Actor, id: i32) -> AppResult<BorrowingDetails> {
        let row = self
            .repository
            .borrowings
            .get_details(id)
            .await?
            .ok_or_else(|| not_found(id))?;

        authorize(Some(actor), Resource::Borrowing { owner_id: Some(row.user_id) }, Action::Read)
            .map_err(|_| not_found(id))?;

        Ok(row.into())
    }

    /// Borrow one copy of a book
    pub async fn create(&self, actor: &Actor, request: CreateBorrowing) -> AppResult<BorrowingDetails> {
        authorize(Some(actor), Resource::Borrowing { owner_id: None }, Action::Create)?;

        let book_id = request.book_id()?;
        let today = today();

        let mut tx = self.repository.begin().await?;

        // Account before book, the order user deletion locks in
        if !self.repository.users.lock_shared(&mut tx, actor.user_id).await? {
            return Err(AppError::Authentication("User not found".to_string()));
        }

        let book = self
            .repository
            .books
            .get_for_update(&mut tx, book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found.".to_string()))?;

        let expected_return_date =
            match borrowing::check_can_borrow(&book, request.expected_return_date, today) {
                Ok(date) => date,
                Err(e) => {
                    tracing::debug!(book_id, user_id = actor.user_id, "Borrow rejected: {}", e);
                    return Err(e);
                }
            };

        let id = self
            .repository
            .borrowings
            .insert(&mut tx, actor.user_id, book_id, today, expected_return_date)
            .await?;
        let book = self.repository.books.adjust_inventory(&mut tx, book_id, -1).await?;

        let row = self
            .repository
            .borrowings
            .get_details_in(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Borrowing {} vanished after insert", id)))?;

        tx.commit().await?;

        tracing::info!(
            borrowing_id = id,
            book_id,
            user_id = actor.user_id,
            inventory = book.inventory,
            "Book borrowed"
        );
        Ok(row.into())
    }

    /// Return a borrowed copy; a second return of the same borrowing fails
    pub async fn return_borrowing(&self, actor: &Actor, id: i32) -> AppResult<BorrowingDetails> {
        let today = today();
        let mut tx = self.repository.begin().await?;

        let borrowing = self
            .repository
            .borrowings
            .lock_for_return(&mut tx, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        authorize(
            Some(actor),
            Resource::Borrowing { owner_id: Some(borrowing.user_id) },
            Action::Return,
        )?;

        if let Err(e) = borrowing.ensure_returnable() {
            tracing::debug!(borrowing_id = id, "Return rejected: {}", e);
            return Err(e);
        }

        self.repository.borrowings.mark_returned(&mut tx, id, today).await?;
        let book = self
            .repository
            .books
            .adjust_inventory(&mut tx, borrowing.book_id, 1)
            .await?;

        let row = self
            .repository
            .borrowings
            .get_details_in(&mut tx, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        tx.commit().await?;

        tracing::info!(
            borrowing_id = id,
            book_id = borrowing.book_id,
            user_id = borrowing.user_id,
            inventory = book.inventory,
            "Book returned"
        );
        Ok(row.into())
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Borrowing with id {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBER: Actor = Actor { user_id: 5, is_staff: false, is_superuser: false };
    const ADMIN: Actor = Actor { user_id: 1, is_staff: true, is_superuser: false };

    #[test]
    fn members_are_pinned_to_their_own_rows() {
        let query = BorrowingQuery {
            user_id: Some(99),
            is_active: Some("true".to_string()),
            ..Default::default()
        };
        let filter = scope_filter(&MEMBER, &query);
        assert_eq!(filter.user_id, Some(5));
        assert_eq!(filter.active, Some(true));
    }

    #[test]
    fn admins_see_everything_or_one_user() {
        assert_eq!(scope_filter(&ADMIN, &BorrowingQuery::default()).user_id, None);

        let query = BorrowingQuery {
            user_id: Some(99),
            is_active: Some("false".to_string()),
            limit: Some(10),
            offset: Some(20),
        };
        assert_eq!(
            scope_filter(&ADMIN, &query),
            BorrowingFilter {
                user_id: Some(99),
                active: Some(false),
                limit: Some(10),
                offset: Some(20),
            }
        );
    }
}
