//! Data models for the library rental server

pub mod book;
pub mod borrowing;
pub mod permission;
pub mod token;
pub mod user;

// Re-export commonly used types
pub use book::{Book, Cover};
pub use borrowing::{Borrowing, BorrowingDetails};
pub use permission::{authorize, Action, Actor, Resource};
pub use user::{User, UserProfile};
