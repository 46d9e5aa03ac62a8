/// Database models
///
/// This module contains all database models and their query operations.
///
/// # Models
///
/// - `project`: Projects owning tasks, with image and ownership tracking
/// - `task`: Tasks belonging to a project, optionally assigned to a user
/// - `user`: User accounts with hashed credentials
/// - `status`: The shared pending/in_progress/completed status enum

pub mod project;
pub mod status;
pub mod task;
pub mod user;
