use crate::security_log;
use shared::error::{AppError, AppResult};
use subtle::ConstantTimeEq;

/// Shared admin token check
#[derive(Clone)]
pub struct AdminGuard {
    token: String,
}

impl std::fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGuard").finish_non_exhaustive()
    }
}

/// Constant-time token check
///
/// The work depends only on the presented length: the configured token is
/// cycled to that length and the length check is folded into the result.
fn token_matches(presented: &[u8], expected: &[u8]) -> bool {
    if expected.is_empty() {
        return false;
    }
    let cycled: Vec<u8> = (0..presented.len())
        .map(|i| expected[i % expected.len()])
        .collect();
    let same_len = (presented.len() as u64).ct_eq(&(expected.len() as u64));
    (cycled.ct_eq(presented) & same_len).into()
}

impl AdminGuard {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Accept `presented` only if it equals the configured token
    pub fn verify(&self, presented: &str) -> AppResult<()> {
        let presented = presented.trim();
        if presented.is_empty() {
            security_log!("WARN", "admin_token_missing", reason = "empty token");
            return Err(AppError::not_authenticated());
        }
        if !token_matches(presented.as_bytes(), self.token.as_bytes()) {
            security_log!(
                "WARN",
                "admin_token_rejected",
                presented_len = presented.len()
            );
            return Err(AppError::invalid_token("Invalid admin token"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn test_verify_token() {
        let guard = AdminGuard::new("hackathon2024");
        assert!(guard.verify("hackathon2024").is_ok());
        assert!(guard.verify(" hackathon2024 ").is_ok());
        assert_eq!(
            guard.verify("hackathon2025").unwrap_err().code,
            ErrorCode::TokenInvalid
        );
        assert_eq!(guard.verify("short").unwrap_err().code, ErrorCode::TokenInvalid);
        assert_eq!(guard.verify("").unwrap_err().code, ErrorCode::NotAuthenticated);
    }

    #[test]
    fn test_token_comparison() {
        let expected = b"hackathon2024";
        assert!(token_matches(b"hackathon2024", expected));
        // Prefixes, extensions and repeats of the token all fail
        assert!(!token_matches(b"hackathon", expected));
        assert!(!token_matches(b"hackathon2024hackathon2024", expected));
        assert!(!token_matches(b"hackathon2024 ", expected));
        assert!(!token_matches(b"", expected));
        assert!(!token_matches(b"anything", b""));
    }

    #[test]
    fn test_empty_configured_token_locks_admin() {
        let guard = AdminGuard::new("");
        assert!(guard.verify("anything").is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let guard = AdminGuard::new("secret-token");
        assert!(!format!("{guard:?}").contains("secret"));
    }
}
