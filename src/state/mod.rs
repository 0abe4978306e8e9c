/// State management module
///
/// This module handles all application state, including:
/// - The catalog data model (data.rs)
/// - SQLite catalog storage and the first-release table (library.rs)
/// - List filtering, sorting and selection (view.rs)
/// - The list screen controller (catalog.rs)
/// - Create/edit flows with cover uploads (edit.rs)
/// - Form validation (validation.rs)

pub mod catalog;
pub mod data;
pub mod edit;
pub mod library;
pub mod validation;
pub mod view;
