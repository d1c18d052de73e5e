//! Authentication and session trust core for the FieldForce HR platform.
//!
//! The client half (credential storage, request gateway, session
//! controller, refresh scheduler) is consumed by the mobile shell; the
//! server half (boundary guard, auth handlers) by the `server` binary.

pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod storage;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use models::claims::{Claims, EmploymentStatus};
pub use models::session::{Session, UserProfile};
pub use session::controller::{SessionController, SessionEvent};
pub use storage::CredentialStore;
pub use token::TokenService;
