//! Security audit logging for authentication events
//!
//! Logins, logouts, and rejected tokens are logged on the "audit" target so
//! they can be filtered and routed separately from application logs.
//! Passwords, hashes, and tokens never appear in an event.
//!
//! # Example
//!
//! ```ignore
//! use marquee_api::audit::{AuditEvent, audit_log};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     session_id: session.id,
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: Some("Mozilla/5.0...".to_string()),
//! });
//! ```
//!
//! Author: hephaex@gmail.com

use chrono::Utc;
use marquee_core::{SessionId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Security audit events for authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Credentials accepted and a session opened
    LoginSuccess {
        user_id: UserId,
        session_id: SessionId,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Login refused
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Session revoked through logout
    Logout {
        user_id: UserId,
        session_id: SessionId,
        ip_address: Option<String>,
    },

    /// Logout refused
    LogoutFailure {
        reason: String,
        ip_address: Option<String>,
    },

    /// Protected request rejected by the authentication middleware
    TokenRejected {
        reason: String,
        path: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },
}

/// Log a security audit event with structured fields
///
/// Successful events go out at INFO, refusals at WARN. The whole event is
/// also attached as a JSON string for log aggregators:
///
/// ```json
/// {
///   "event_type": "login_success",
///   "user_id": 7,
///   "session_id": 42,
///   "ip_address": "192.168.1.1",
///   "user_agent": "Mozilla/5.0..."
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess {
            user_id,
            session_id,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                session_id = %session_id,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::Logout {
            user_id,
            session_id,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                session_id = %session_id,
                ip_address = ?ip_address,
                "User logout"
            );
        }
        AuditEvent::LogoutFailure { reason, ip_address } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                ip_address = ?ip_address,
                "Logout failed"
            );
        }
        AuditEvent::TokenRejected {
            reason,
            path,
            ip_address,
            ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                path = %path,
                ip_address = ?ip_address,
                "Token rejected"
            );
        }
    }
}

/// Extract the client IP address from proxy headers
///
/// Checks X-Forwarded-For (first hop) and then X-Real-IP. The socket address
/// is not available here, so `None` means no proxy header was present.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|xff| xff.to_str().ok())
        .and_then(|xff| xff.split(',').next())
    {
        let first_ip = first_ip.trim();
        if !first_ip.is_empty() {
            return Some(first_ip.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|ip| ip.trim().to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: 7,
            session_id: 42,
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("\"session_id\":42"));
    }

    #[test]
    fn test_audit_log_all_events() {
        // Only checks that logging never panics
        audit_log(&AuditEvent::LoginFailure {
            email: "a@a.com".to_string(),
            reason: "InvalidCredentials".to_string(),
            ip_address: None,
            user_agent: None,
        });
        audit_log(&AuditEvent::Logout {
            user_id: 7,
            session_id: 1,
            ip_address: None,
        });
        audit_log(&AuditEvent::LogoutFailure {
            reason: "SessionNotFound".to_string(),
            ip_address: Some("10.0.0.1".to_string()),
        });
        audit_log(&AuditEvent::TokenRejected {
            reason: "Expired".to_string(),
            path: "/me".to_string(),
            ip_address: None,
            user_agent: Some("curl/8.0".to_string()),
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_user_agent() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            axum::http::header::USER_AGENT,
            "Mozilla/5.0 (Test)".parse().unwrap(),
        );

        assert_eq!(
            extract_user_agent(&headers),
            Some("Mozilla/5.0 (Test)".to_string())
        );
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();

        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}
