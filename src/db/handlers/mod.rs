pub mod admins;
pub mod analytics;
pub mod repository;
pub mod sessions;
pub mod users;

pub use admins::Admins;
pub use analytics::AnalyticsEvents;
pub use repository::Repository;
pub use sessions::AdminSessions;
pub use users::Users;
