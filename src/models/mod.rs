pub mod claims;
pub mod session;

pub use claims::{Claims, EmploymentStatus};
pub use session::{
    AuthDataResponse, LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest,
    RefreshResponse, Session, UserProfile,
};
