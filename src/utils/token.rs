// utils/token.rs
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(expires_in_seconds)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(
    token: T,
    secret: &[u8],
) -> Result<String, crate::error::HttpError> {
    // No expiry leeway: a token past its exp is rejected immediately.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &validation,
    );

    match decoded {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(crate::error::HttpError::unauthorized(
            crate::error::ErrorMessage::InvalidToken.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_decode_token() {
        let user_id = uuid::Uuid::new_v4().to_string();
        let secret = b"test-secret";

        let token = create_token(&user_id, secret, 60).unwrap();
        let decoded = decode_token(token, secret).unwrap();

        assert_eq!(decoded, user_id);
    }

    #[test]
    fn test_create_token_empty_subject() {
        assert!(create_token("", b"test-secret", 60).is_err());
    }

    #[test]
    fn test_decode_token_wrong_secret() {
        let token = create_token("user", b"right-secret", 60).unwrap();
        assert!(decode_token(token, b"wrong-secret").is_err());
    }

    #[test]
    fn test_decode_expired_token() {
        let token = create_token("user", b"test-secret", -60).unwrap();
        assert!(decode_token(token, b"test-secret").is_err());
    }

    #[test]
    fn test_decode_just_expired_token() {
        // Even a few seconds past exp must fail; no clock-skew allowance.
        let token = create_token("user", b"test-secret", -5).unwrap();
        assert!(decode_token(token, b"test-secret").is_err());
    }
}
