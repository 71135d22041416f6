//! Authentication: password hashing, session tokens, session lifecycle,
//! principal extraction, and the access gate.

pub mod extract;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;
