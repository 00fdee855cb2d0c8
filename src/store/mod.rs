//! Session store implementations

mod cookie;

pub use cookie::CookieStore;
