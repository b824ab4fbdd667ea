//! Security audit logging for authentication events
//!
//! Every externally visible authentication failure looks the same to the
//! caller. The audit log is where the actual reason is recorded, so operators
//! can tell an expired token from a shadowed one.
//!
//! All audit events are logged with the "audit" target, making them easy to
//! filter and route to security monitoring systems. Passwords and token
//! strings are never part of an event.
//!
//! # Example
//!
//! ```ignore
//! use tollgate_api::audit::{AuditEvent, audit_log};
//!
//! audit_log(&AuditEvent::LoginFailure {
//!     username: "alice".to_string(),
//!     reason: "wrong password".to_string(),
//! });
//! ```
//!
//! Author: hephaex@gmail.com

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Why a presented token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// No token was presented
    Missing,
    /// Not a decodable token for this issuer
    Malformed,
    /// Signature does not match the signing secret
    BadSignature,
    /// Embedded expiration has passed
    Expired,
    /// Claimed user does not exist
    UnknownUser,
    /// User has no recorded session
    NoSession,
    /// A newer session exists for the user
    Shadowed,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Missing => "missing",
            RejectReason::Malformed => "malformed",
            RejectReason::BadSignature => "bad_signature",
            RejectReason::Expired => "expired",
            RejectReason::UnknownUser => "unknown_user",
            RejectReason::NoSession => "no_session",
            RejectReason::Shadowed => "shadowed",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// New account created
    RegistrationSuccess { user_id: Uuid, username: String },

    /// Registration refused because the username is taken
    RegistrationConflict { username: String },

    /// Session token issued; earlier sessions of the user are now shadowed
    LoginSuccess {
        user_id: Uuid,
        username: String,
        expires_at: DateTime<Utc>,
    },

    /// Failed login attempt
    LoginFailure { username: String, reason: String },

    /// Presented token is the current session of its user
    TokenAccepted { user_id: Uuid, username: String },

    /// Presented token refused
    TokenRejected {
        username: Option<String>,
        reason: RejectReason,
    },
}

/// Log an audit event
///
/// Successful operations are logged at INFO, failures at WARN, both on the
/// "audit" target.
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    // Serialize event to JSON for structured logging
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::RegistrationSuccess { user_id, username } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                "User registered"
            );
        }
        AuditEvent::RegistrationConflict { username } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                "Registration rejected: username taken"
            );
        }
        AuditEvent::LoginSuccess {
            user_id,
            username,
            expires_at,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                expires_at = %expires_at,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure { username, reason } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = %username,
                reason = %reason,
                "Login failed"
            );
        }
        AuditEvent::TokenAccepted { user_id, username } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                username = %username,
                "Token accepted"
            );
        }
        AuditEvent::TokenRejected { username, reason } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                username = ?username,
                reason = %reason,
                "Token rejected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
            expires_at: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("login_success"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn test_reject_reason_serialization() {
        let event = AuditEvent::TokenRejected {
            username: Some("alice".to_string()),
            reason: RejectReason::Shadowed,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("token_rejected"));
        assert!(json.contains("\"reason\":\"shadowed\""));
        assert_eq!(RejectReason::BadSignature.to_string(), "bad_signature");
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: Uuid::new_v4(),
            username: "alice".to_string(),
        });
        audit_log(&AuditEvent::RegistrationConflict {
            username: "alice".to_string(),
        });
        audit_log(&AuditEvent::LoginFailure {
            username: "alice".to_string(),
            reason: "wrong password".to_string(),
        });
        audit_log(&AuditEvent::TokenRejected {
            username: None,
            reason: RejectReason::Expired,
        });
    }
}
