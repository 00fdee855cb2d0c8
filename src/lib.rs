//! # salvo-secure-session
//!
//! Stateless cookie sessions for the Salvo web framework.
//!
//! Session values are serialized, encrypted, authenticated and stored in
//! the cookie itself, so no server-side storage is needed.
//!
//! ## Features
//!
//! - **Encrypt-then-MAC tokens**: AES-CTR with a random IV, HMAC-SHA256 over
//!   the cookie name, an issue timestamp and the ciphertext
//! - **Expiring tokens**: configurable maximum and minimum age, checked on decode
//! - **Key rotation**: ordered codec chains; the first codec encodes, all of them decode
//! - **Per-request registry**: every handler in a request sees the same session
//! - **Pluggable serialization and encryption**: [`Serializer`] and [`Cipher`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salvo::prelude::*;
//! use salvo_secure_session::{CookieStore, SessionDepotExt, SessionHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = CookieStore::from_key_pairs(&[(
//!         b"a-32-byte-or-longer-hmac-key.....".as_slice(),
//!         Some(b"16-byte-aes-key!".as_slice()),
//!     )])
//!     .unwrap();
//!
//!     let router = Router::new()
//!         .hoop(SessionHandler::new(store))
//!         .get(index);
//!
//!     let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
//!     Server::new(acceptor).serve(router).await;
//! }
//!
//! #[handler]
//! async fn index(req: &mut Request, depot: &mut Depot, res: &mut Response) {
//!     // A missing or rejected cookie gives a new, empty session
//!     let (session, _) = depot.session(req, "session");
//!     let views: i32 = session.get("views").unwrap_or(0);
//!     session.set("views", views + 1).unwrap();
//!     depot.save_session(res, &session).unwrap();
//! }
//! ```

pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod registry;
pub mod session;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{
    codecs_from_pairs, decode_chain, generate_random_key, AesCtr, Cipher, Codec, HashAlgorithm,
    JsonSerializer, SecureCookie, Serializer,
};
pub use config::{CookieOptions, SameSite};
pub use error::SessionError;
pub use handler::SessionHandler;
pub use registry::{validate_cookie_name, Registry};
pub use session::{Session, SessionValues};
pub use store::CookieStore;

/// Extension trait for Depot to easily access session
pub mod depot_ext;
pub use depot_ext::SessionDepotExt;
