//! Authentication and session module
//!
//! This module provides JWT-based authentication with the following components:
//! - Credential verification against stored password hashes
//! - Token issuance and verification (access + refresh)
//! - Middleware for request authentication
//! - Session revocation on logout
//! - Authentication service tying them together

pub mod credentials;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod revoker;
pub mod service;

pub use credentials::CredentialVerifier;
pub use error::{AuthError, AuthErrorKind, AuthResult};
pub use jwt::{Claims, TokenError, TokenIssuer, TokenKind, TokenPair, TokenVerifier};
pub use middleware::{auth_middleware, Principal};
pub use password::{compare_password, hash_password, verify_password, PasswordError};
pub use revoker::SessionRevoker;
pub use service::{
    AuthService, LoginOutcome, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse,
};
