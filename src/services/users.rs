//! User accounts: registration, self-service profile, admin management

use std::collections::BTreeMap;

use validator::Validate;

use crate::{
    error::{AppError, AppResult, FieldErrors, DUPLICATE_EMAIL},
    models::{
        borrowing::Borrowing,
        user::{normalize_email, AdminUpdateUser, RegisterUser, UpdateProfile, User, UserQuery},
    },
    repository::{
        users::{NewUser, UserChanges},
        Repository,
    },
};

use super::auth::hash_password;

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Self-registration; new accounts never carry privileges
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        request.validate()?;

        let email = normalize_email(&request.email);
        self.ensure_email_free(&email, None).await?;

        let password_hash = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name: &request.first_name,
                last_name: &request.last_name,
                is_staff: false,
                is_superuser: false,
            })
            .await?;

        tracing::info!(user_id = user.id, "Registered user {}", user.email);
        Ok(user)
    }

    /// Create an administrator account (used by the bootstrap command)
    pub async fn create_superuser(&self, email: &str, password: &str) -> AppResult<User> {
        let request = RegisterUser {
            email: email.to_string(),
            password: password.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };
        request.validate()?;

        let email = normalize_email(email);
        self.ensure_email_free(&email, None).await?;

        let password_hash = hash_password(password)?;
        let user = self
            .repository
            .users
            .create(&NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name: "",
                last_name: "",
                is_staff: true,
                is_superuser: true,
            })
            .await?;

        tracing::info!(user_id = user.id, "Created superuser {}", user.email);
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// List accounts
    pub async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        self.repository.users.list(query).await
    }

    /// Change the caller's own profile; absent fields are kept
    pub async fn update_profile(&self, user_id: i32, profile: UpdateProfile) -> AppResult<User> {
        let changes = self.profile_changes(user_id, profile).await?;
        let user = self.repository.users.update(user_id, &changes).await?;
        tracing::info!(user_id, "Profile updated");
        Ok(user)
    }

    /// Administrative update, including privilege flags
    pub async fn admin_update(&self, id: i32, request: AdminUpdateUser) -> AppResult<User> {
        self.repository.users.get_by_id(id).await?;

        let mut changes = self.profile_changes(id, request.profile).await?;
        changes.is_staff = request.is_staff;
        changes.is_superuser = request.is_superuser;

        let user = self.repository.users.update(id, &changes).await?;
        tracing::info!(
            user_id = id,
            is_staff = user.is_staff,
            is_superuser = user.is_superuser,
            "User updated by admin"
        );
        Ok(user)
    }

    /// Delete an account. Books held by its open borrowings go back on the
    /// shelf before the borrowings cascade away.
    ///
    /// The account row is locked first: a borrow in flight holds a key-share
    /// lock on it, so this waits for that borrowing to commit and then sees
    /// it. The active borrowings are locked next, so a concurrent return
    /// either finishes first (and the row is no longer active) or finds the
    /// borrowing gone.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;

        self.repository.users.lock_for_delete(&mut tx, id).await?;
        let active = self
            .repository
            .borrowings
            .lock_active_for_user(&mut tx, id)
            .await?;

        for (book_id, copies) in held_copies(&active) {
            self.repository
                .books
                .adjust_inventory(&mut tx, book_id, copies)
                .await?;
        }
        self.repository.users.delete(&mut tx, id).await?;

        tx.commit().await?;

        tracing::info!(user_id = id, restored = active.len(), "User deleted");
        Ok(())
    }

    async fn profile_changes(&self, user_id: i32, profile: UpdateProfile) -> AppResult<UserChanges> {
        profile.validate()?;

        let email = match profile.email {
            Some(ref email) => {
                let email = normalize_email(email);
                self.ensure_email_free(&email, Some(user_id)).await?;
                Some(email)
            }
            None => None,
        };

        let password_hash = profile
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;

        Ok(UserChanges {
            email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            password_hash,
            ..Default::default()
        })
    }

    async fn ensure_email_free(&self, email: &str, exclude_id: Option<i32>) -> AppResult<()> {
        if self.repository.users.email_exists(email, exclude_id).await? {
            return Err(AppError::Validation(FieldErrors::single(
                "email",
                DUPLICATE_EMAIL,
            )));
        }
        Ok(())
    }
}

/// Copies held per book, in book id order so locks are taken consistently
fn held_copies(active: &[Borrowing]) -> BTreeMap<i32, i32> {
    let mut held = BTreeMap::new();
    for borrowing in active.iter().filter(|b| b.is_active()) {
        *held.entry(borrowing.book_id).or_insert(0) += 1;
    }
    held
}
