pub mod admins;
pub mod analytics;
pub mod sessions;
pub mod users;
