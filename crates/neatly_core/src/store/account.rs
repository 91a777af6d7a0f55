//! Account endpoints that produce a `Session`.
//!
//! # Responsibility
//! - Register accounts and exchange credentials for a bearer token.
//!
//! # Invariants
//! - A successful login always yields an authenticated `Session`.
//! - Passwords and tokens are never logged.

use crate::config::ClientConfig;
use crate::model::session::{AccountInfo, Session};
use crate::store::http::{decode, HttpTransport};
use crate::store::{StoreError, StoreResult};
use log::info;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: String,
    #[serde(flatten)]
    account: AccountInfo,
}

/// Client for `api/v1/accounts` endpoints.
#[derive(Clone)]
pub struct AccountClient {
    transport: HttpTransport,
}

impl AccountClient {
    pub fn from_config(config: &ClientConfig) -> StoreResult<Self> {
        Ok(Self {
            transport: HttpTransport::from_config(config)?,
        })
    }

    pub fn with_client(client: Client, base_url: &str) -> StoreResult<Self> {
        Ok(Self {
            transport: HttpTransport::new(client, base_url)?,
        })
    }

    /// Creates an account. Does not log in.
    pub async fn register(
        &self,
        name: &str,
        username: &str,
        email: &str,
        password: &str,
    ) -> StoreResult<()> {
        let request = self
            .transport
            .client()
            .post(self.transport.url("accounts/register")?)
            .json(&json!({
                "name": name,
                "username": username,
                "email": email,
                "password": password,
            }));
        self.transport
            .execute(request, None, "accounts.register")
            .await?;
        info!("event=account_register module=store status=ok");
        Ok(())
    }

    /// Exchanges credentials for a session.
    pub async fn login(&self, username: &str, password: &str) -> StoreResult<Session> {
        let request = self
            .transport
            .client()
            .post(self.transport.url("accounts/login")?)
            .json(&json!({ "username": username, "password": password }));
        let response = self
            .transport
            .execute(request, None, "accounts.login")
            .await?;
        let login: LoginResponse = decode(response).await?;
        let session = Session::new(login.token, login.account);
        if !session.is_authenticated() {
            return Err(StoreError::NotAuthenticated);
        }
        info!("event=account_login module=store status=ok");
        Ok(session)
    }
}
