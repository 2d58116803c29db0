//! IP policy, rate limiting and audit logging.
//!
//! Everything here is advisory bookkeeping around the request gate:
//! events and access logs are append-only, and their write failures are
//! logged but never surfaced to the request that triggered them.

use tracing::warn;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::event::{EVENT_BLOCKED_IP_REQUEST, EVENT_RATE_LIMIT_EXCEEDED};
use crate::services::auth_service::{AuthError, SessionUser};

/// Substrings that mark a request as suspicious when found in its URL,
/// query string, body or user agent. Matching is case-insensitive.
const SUSPICIOUS_PATTERNS: &[&str] = &[
    "sqlmap",
    "nikto",
    "nmap",
    "dirb",
    "gobuster",
    "wfuzz",
    "union select",
    "drop table",
    "insert into",
    "delete from",
    "<script",
    "javascript:",
    "onload=",
    "onerror=",
    "../",
    "..\\",
    "etc/passwd",
    "windows/system32",
];

#[derive(Clone)]
pub struct SecurityService {
    store: Store,
    config: SecurityConfig,
}

impl SecurityService {
    #[must_use]
    pub const fn new(store: Store, config: SecurityConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub const fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// IPs on the trusted list bypass the device-trust gate at auto-login.
    #[must_use]
    pub fn is_trusted_ip(&self, ip: &str) -> bool {
        self.config.trusted_ips.iter().any(|t| t == ip)
    }

    /// Record a security event. Failures are swallowed: the event trail
    /// must never take down the request that produced it.
    pub async fn record_event(&self, ip: &str, kind: &str, details: Option<&str>, user_agent: &str) {
        if let Err(e) = self
            .store
            .record_security_event(ip, kind, details, user_agent)
            .await
        {
            warn!("Failed to record security event {kind} for {ip}: {e}");
        }
    }

    /// Append an access-log row. Failures are swallowed like events.
    pub async fn record_access(
        &self,
        user: Option<&SessionUser>,
        action: &str,
        details: Option<&str>,
        ip: &str,
        user_agent: &str,
    ) {
        let (account_id, account_name) = match user {
            Some(u) => (Some(u.id), u.username.as_str()),
            None => (None, "Anonymous"),
        };

        if let Err(e) = self
            .store
            .add_access_log(account_id, account_name, action, details, ip, user_agent)
            .await
        {
            warn!("Failed to record access log {action} for {ip}: {e}");
        }
    }

    /// Refuse requests from IPs a manager has blocked, leaving an event
    /// behind for each refused attempt.
    pub async fn ensure_ip_allowed(&self, ip: &str, user_agent: &str) -> Result<(), AuthError> {
        if self.store.is_ip_blocked(ip).await? {
            self.record_event(ip, EVENT_BLOCKED_IP_REQUEST, None, user_agent)
                .await;
            return Err(AuthError::IpBlocked);
        }

        Ok(())
    }

    /// Sliding-window rate limit keyed on the IP's own event history.
    /// Exceeding the limit records an event, so a flooding client keeps
    /// feeding the counter that rejects it.
    pub async fn check_rate_limit(&self, ip: &str, user_agent: &str) -> Result<(), AuthError> {
        let count = self
            .store
            .count_recent_events(ip, self.config.rate_limit_window_seconds)
            .await?;

        if count >= self.config.rate_limit_max_requests {
            self.record_event(
                ip,
                EVENT_RATE_LIMIT_EXCEEDED,
                Some(&format!("{count} events in window")),
                user_agent,
            )
            .await;
            return Err(AuthError::RateLimited);
        }

        Ok(())
    }

    /// Flag all existing event rows for an IP as blocked. An IP with no
    /// recorded history has nothing to flag and stays unblocked.
    pub async fn block_ip(&self, ip: &str) -> Result<u64, AuthError> {
        let updated = self.store.block_ip(ip).await?;
        Ok(updated)
    }

    /// Scan request material for attack-tool and injection signatures.
    /// Returns the first matching pattern.
    #[must_use]
    pub fn scan_suspicious(text: &str) -> Option<&'static str> {
        let lowered = text.to_lowercase();
        SUSPICIOUS_PATTERNS
            .iter()
            .find(|p| lowered.contains(**p))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_detects_tool_signatures() {
        assert_eq!(
            SecurityService::scan_suspicious("sqlmap/1.7.2#stable"),
            Some("sqlmap")
        );
        assert_eq!(
            SecurityService::scan_suspicious("Mozilla Nikto/2.1.6"),
            Some("nikto")
        );
    }

    #[test]
    fn test_scan_detects_injection() {
        assert_eq!(
            SecurityService::scan_suspicious("/api/tasks?q=1 UNION SELECT password"),
            Some("union select")
        );
        assert_eq!(
            SecurityService::scan_suspicious("/files/../../etc/passwd"),
            Some("../")
        );
        assert_eq!(
            SecurityService::scan_suspicious("<SCRIPT>alert(1)</script>"),
            Some("<script")
        );
    }

    #[test]
    fn test_scan_passes_clean_input() {
        assert_eq!(
            SecurityService::scan_suspicious("/api/tasks?page=2&per_page=20"),
            None
        );
        assert_eq!(
            SecurityService::scan_suspicious("Mozilla/5.0 (X11; Linux x86_64)"),
            None
        );
    }
}
