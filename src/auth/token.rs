use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Extension, FromRequest, RequestParts};
use axum::http::header::AUTHORIZATION;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::User;
use crate::entities::Role;
use crate::error::{unauthenticated_error, unexpected_error, Error};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub role: String,
    pub exp: usize,
}

/// HS256 signing material derived from the shared secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, id: Uuid, role: Role, ttl: Duration) -> Result<String, Error> {
        let claims = Claims {
            id,
            role: role.name(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn decode(&self, token: &str) -> Result<User, Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;

        Ok(User {
            id: data.claims.id,
            roles: vec![data.claims.role],
        })
    }
}

#[async_trait]
impl<B> FromRequest<B> for User
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Extension(keys) = Extension::<Arc<TokenKeys>>::from_request(req)
            .await
            .map_err(|_| unexpected_error())?;

        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(unauthenticated_error)?;

        keys.decode(token)
    }
}

#[test]
fn issued_tokens_decode_to_the_member() {
    let keys = TokenKeys::new("secret");
    let id = Uuid::new_v4();

    let token = keys.issue(id, Role::Driver, Duration::hours(1)).unwrap();
    let user = keys.decode(&token).unwrap();

    assert_eq!(user.id, id);
    assert_eq!(user.roles, vec!["driver".to_string()]);
}

#[test]
fn foreign_and_expired_tokens_are_rejected() {
    let keys = TokenKeys::new("secret");
    let other = TokenKeys::new("other");

    let token = other.issue(Uuid::new_v4(), Role::Passenger, Duration::hours(1)).unwrap();
    assert_eq!(keys.decode(&token).unwrap_err().code, 102);

    let token = keys.issue(Uuid::new_v4(), Role::Passenger, Duration::hours(-2)).unwrap();
    assert_eq!(keys.decode(&token).unwrap_err().code, 102);

    assert_eq!(keys.decode("not-a-token").unwrap_err().code, 102);
}
