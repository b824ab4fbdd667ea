//! Authentication module
//!
//! This module provides session-token authentication with the following components:
//! - Password hashing with Argon2
//! - Signed token issuance and verification
//! - Authentication service for registration, login and validation
//! - Middleware for request authentication

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{Claims, IssuedToken, TokenCodec, TokenError};
pub use middleware::{bearer_token, require_session, AuthenticatedUser};
pub use password::{PasswordConfig, PasswordError, PasswordHasher};
pub use service::{
    AuthService, LoginRequest, LoginResponse, RegisterRequest, UserInfo, ValidatedSession,
};
