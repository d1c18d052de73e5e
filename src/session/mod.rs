//! Client-side session orchestration: login, logout, derivation and
//! proactive refresh.

pub mod controller;
pub mod scheduler;

pub use controller::{SessionController, SessionEvent};
pub use scheduler::RefreshScheduler;
