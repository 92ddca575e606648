use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Access/refresh pair returned by login, register and exchange.
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

/// Returned by refresh.
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub access: String,
    pub refresh: String,
    pub user: PublicUser,
}

/// Returned by the link-token issue endpoint.
#[derive(Debug, Serialize)]
pub struct LinkTokenResponse {
    pub token: String,
}

/// Request body for the link-token exchange endpoint. `token` defaults to
/// empty so a missing field is a 400, not a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    #[serde(default)]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_request_tolerates_missing_token() {
        let req: ExchangeRequest = serde_json::from_str("{}").expect("deserialize");
        assert!(req.token.is_empty());
    }

    #[test]
    fn token_pair_uses_simplejwt_field_names() {
        let pair = TokenPairResponse {
            access: "a".into(),
            refresh: "r".into(),
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["access"], "a");
        assert_eq!(json["refresh"], "r");
    }
}
