pub mod auth;
pub mod jwt;
pub mod password;
pub mod validation;

pub use auth::AuthenticatedUser;
pub use jwt::{Claims, JwtConfig, JwtManager};
