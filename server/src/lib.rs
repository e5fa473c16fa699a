//! ListKeeper Server - Session-backed to-do lists.
//!
//! This crate provides a small web application where each visitor keeps
//! named to-do lists in a server-side session:
//! - Creating, renaming and deleting lists
//! - Adding, toggling and deleting todos within a list
//! - Showing incomplete lists and todos before finished ones
//!
//! # Architecture
//!
//! Nothing is persisted. A visitor is identified by an opaque session cookie
//! and all of their lists live in an in-memory [`session::SessionStore`]
//! until the session expires. Pages are rendered server-side from liquid
//! templates by [`views::Views`], and every change is a form post answered
//! with a redirect.

pub mod config;
pub mod error;
pub mod presentation;
pub mod routes;
pub mod session;
pub mod store;
pub mod types;
pub mod validation;
pub mod views;
