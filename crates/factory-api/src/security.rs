//! HTTP Basic auth for mutating endpoints, compared in constant time.

use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated request. Extracting it is the only way a handler gets
/// to run; extraction fails with `ApiError::Unauthorized` on any mismatch.
pub struct BasicAuth;

impl axum::extract::FromRequestParts<AppState> for BasicAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(basic)) = parts
            .extract::<TypedHeader<Authorization<Basic>>>()
            .await
            .map_err(|_| ApiError::unauthorized("missing or malformed Basic auth header"))?;

        if credentials_match(basic.username(), &state.config.basic_auth_user)
            && credentials_match(basic.password(), &state.config.basic_auth_pass)
        {
            Ok(BasicAuth)
        } else {
            Err(ApiError::unauthorized("invalid credentials"))
        }
    }
}

/// Constant-time comparison so a timing side channel can't shorten a
/// credential-guessing attack.
fn credentials_match(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_credentials_compare_equal() {
        assert!(credentials_match("admin", "admin"));
    }

    #[test]
    fn mismatched_length_does_not_panic_or_match() {
        assert!(!credentials_match("admin", "a"));
        assert!(!credentials_match("a", "admin"));
    }

    #[test]
    fn mismatched_same_length_does_not_match() {
        assert!(!credentials_match("admin", "bdmin"));
    }
}
