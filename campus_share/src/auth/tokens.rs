//! Signed bearer tokens (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::{
    errors::TokenError,
    models::{TokenClaims, TokenIdentity},
};

/// Default token lifetime.
pub const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Issues and verifies self-contained, time-limited tokens.
///
/// Tokens are stateless: there is no server-side session table, so a token
/// stays valid until it expires.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    /// Create a token service signing with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime: Duration::days(TOKEN_LIFETIME_DAYS),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for `identity`, valid for the configured lifetime from now.
    pub fn issue(&self, identity: &TokenIdentity) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        identity: &TokenIdentity,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = TokenClaims {
            user_id: identity.user_id,
            email: identity.email.clone(),
            username: identity.username.clone(),
            student_id: identity.student_id.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token against the current time.
    ///
    /// # Errors
    ///
    /// * `TokenError::Expired` - Signature is valid but the expiry has passed
    /// * `TokenError::Invalid` - Malformed token, bad signature or wrong secret
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the supplied clock.
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn identity() -> TokenIdentity {
        TokenIdentity {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            username: "a".to_string(),
            student_id: "S1".to_string(),
        }
    }

    #[test]
    fn test_round_trip_carries_identity() {
        let service = TokenService::new("test_secret_key_for_testing_only_32b");
        let id = identity();
        let token = service.issue(&id).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.user_id, id.user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.username, "a");
        assert_eq!(claims.student_id, "S1");
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
    }

    #[test]
    fn test_accepted_just_after_issue_and_expired_after_seven_days() {
        let service = TokenService::new("test_secret_key_for_testing_only_32b");
        let issued = Utc::now();
        let token = service.issue_at(&identity(), issued).unwrap();

        assert!(service.verify_at(&token, issued + Duration::seconds(1)).is_ok());
        assert!(service.verify_at(&token, issued + Duration::days(6)).is_ok());
        assert!(matches!(
            service.verify_at(&token, issued + Duration::days(7) + Duration::seconds(1)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let issuer = TokenService::new("first_secret_key_for_testing_only");
        let verifier = TokenService::new("second_secret_key_for_testing_only");
        let token = issuer.issue(&identity()).unwrap();

        assert!(matches!(verifier.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let service = TokenService::new("test_secret_key_for_testing_only_32b");
        assert!(matches!(service.verify("not-a-jwt"), Err(TokenError::Invalid)));
        assert!(matches!(service.verify(""), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_tampered_expired_token_reports_invalid() {
        let service = TokenService::new("test_secret_key_for_testing_only_32b");
        let issued = Utc::now() - Duration::days(30);
        let mut token = service.issue_at(&identity(), issued).unwrap();
        token.push('x');

        assert!(matches!(service.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_same_identity_different_issue_times_differ() {
        let service = TokenService::new("test_secret_key_for_testing_only_32b");
        let id = identity();
        let now = Utc::now();
        let first = service.issue_at(&id, now).unwrap();
        let second = service.issue_at(&id, now + Duration::seconds(5)).unwrap();
        assert_ne!(first, second);
    }
}
