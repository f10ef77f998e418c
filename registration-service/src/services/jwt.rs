use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Actor, Role};

/// Validates HS256 access tokens issued by the school's identity service.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub school_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl From<AccessTokenClaims> for Actor {
    fn from(claims: AccessTokenClaims) -> Self {
        Actor {
            user_id: claims.sub,
            role: claims.role,
            school_id: claims.school_id,
            branch_id: claims.branch_id,
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
        }
    }
}

impl JwtService {
    pub fn new(secret: &Secret<String>) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
        }
    }

    /// Sign a token for `actor`. The identity service owns issuance; this
    /// exists for tooling and tests.
    pub fn issue(&self, actor: &Actor, ttl: Duration) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: actor.user_id,
            email: actor.email.clone(),
            first_name: actor.first_name.clone(),
            last_name: actor.last_name.clone(),
            role: actor.role,
            school_id: actor.school_id,
            branch_id: actor.branch_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Validate signature and expiry, returning the claims
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::new(&Secret::new(secret.to_string()))
    }

    fn registrar() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role: Role::Registrar,
            school_id: Some(Uuid::new_v4()),
            branch_id: Some(Uuid::new_v4()),
            email: "registrar@example.com".to_string(),
            first_name: "Hanna".to_string(),
            last_name: "Girma".to_string(),
        }
    }

    #[test]
    fn issued_token_validates_into_the_same_actor() {
        let jwt = service("test-secret");
        let actor = registrar();

        let token = jwt.issue(&actor, Duration::hours(1)).unwrap();
        let decoded: Actor = jwt.validate_access_token(&token).unwrap().into();

        assert_eq!(decoded.user_id, actor.user_id);
        assert_eq!(decoded.role, Role::Registrar);
        assert_eq!(decoded.branch_id, actor.branch_id);
        assert_eq!(decoded.full_name(), "Hanna Girma");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = service("issuer-secret")
            .issue(&registrar(), Duration::hours(1))
            .unwrap();
        assert!(service("other-secret").validate_access_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = service("test-secret");
        let token = jwt.issue(&registrar(), Duration::hours(-2)).unwrap();
        assert!(jwt.validate_access_token(&token).is_err());
    }

    #[test]
    fn claims_use_camel_case() {
        let jwt = service("test-secret");
        let token = jwt.issue(&registrar(), Duration::hours(1)).unwrap();
        let claims = jwt.validate_access_token(&token).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("firstName").is_some());
        assert!(json.get("schoolId").is_some());
        assert_eq!(json["role"], "REGISTRAR");
    }
}
