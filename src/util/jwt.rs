// shamelessly stolen from https://www.shuttle.rs/blog/2024/02/21/using-jwt-auth-rust

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    RequestPartsExt,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::errors::{IntoRouteError, RouteError};
use crate::{models::players::Player, AppState};

/// Name of the cookie the token is read from when there's no `Authorization` header.
pub const AUTH_COOKIE: &str = "authorization";

#[derive(Clone)]
pub struct Keys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Hex-encoded player ID
    pub sub: String,
    pub username: String,
    pub exp: i64,
}

impl Claims {
    pub fn for_player(player: &Player, valid_for: Duration) -> Self {
        Self {
            sub: player.id.to_hex(),
            username: player.username.clone(),
            exp: (OffsetDateTime::now_utc() + valid_for).unix_timestamp(),
        }
    }

    /// The ID of the authenticated player.
    ///
    /// # Errors
    /// This fails if the token's subject isn't a valid ID, which only happens with tokens we didn't sign.
    pub fn player_id(&self) -> Result<ObjectId, RouteError> {
        ObjectId::parse_str(&self.sub).http_error("Invalid token subject", StatusCode::UNAUTHORIZED)
    }

    /// Signs the claims into a token.
    ///
    /// # Errors
    /// This fails if encoding the token fails.
    pub fn encode(&self, keys: &Keys) -> anyhow::Result<String> {
        Ok(encode(&Header::default(), self, &keys.encoding)?)
    }
}

impl<S> FromRequestParts<S> for Claims
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = RouteError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        // Extract the token from the authorization header, if it's not there, try the cookie
        let token = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
            Ok(bearer) => bearer.token().to_owned(),
            Err(_) => {
                let jar = parts
                    .extract::<CookieJar>()
                    .await
                    .http_status_error(StatusCode::UNAUTHORIZED)?;

                jar.get(AUTH_COOKIE)
                    .map(|cookie| cookie.value().trim_start_matches("Bearer ").to_owned())
                    .ok_or_else(|| {
                        RouteError::new_unauthorized().set_public_error_message("No token found")
                    })?
            }
        };

        // Decode the user data
        let token_data = decode::<Self>(&token, &state.jwt_keys.decoding, &Validation::default())
            .http_error("Invalid token", StatusCode::UNAUTHORIZED)?;

        Ok(token_data.claims)
    }
}
