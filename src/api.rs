//! Typed client for the expense service REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{
    CreatedExpense, Error, Expense, ExpensePayload, ExpenseService, Registration, Session,
    TokenResponse, User, UserDirectory, UserId,
};

/// User agent string identifying this client.
const USER_AGENT: &str = concat!("expense-split/", env!("CARGO_PKG_VERSION"));

pub const LOGIN_FAILED: &str = "Login failed. Please try again.";

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// HTTP client for the expense service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Config,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn get(&self, session: &Session, path: &str) -> RequestBuilder {
        self.http
            .get(self.config.endpoint(path))
            .header(reqwest::header::AUTHORIZATION, session.bearer())
    }

    /// Sends the request and turns any non-2xx status into `Error::Api`.
    async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "request rejected");
        Err(Error::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Like `send`, but a 404 is `Ok(None)`.
    async fn send_optional(&self, request: RequestBuilder) -> Result<Option<Response>, Error> {
        match self.send(request).await {
            Ok(response) => Ok(Some(response)),
            Err(Error::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, Error> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// `POST /users/register/`. Returns the server's payload unchanged.
    pub async fn register(&self, registration: &Registration) -> Result<serde_json::Value, Error> {
        let request = self
            .http
            .post(self.config.endpoint("/users/register/"))
            .json(registration);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// `POST /auth/token/`. This is the only way to obtain a [`Session`]
    /// from credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, Error> {
        let request = self
            .http
            .post(self.config.endpoint("/auth/token/"))
            .json(&Credentials { username, password });
        let response = self.send(request).await?;
        let token: TokenResponse = Self::decode(response).await?;
        let session = Session::from_token_response(token, username)?;
        debug!(user_id = session.user_id, "logged in");
        Ok(session)
    }

    /// `GET /users/by-username/?username=<name>`.
    pub async fn user_by_username(
        &self,
        session: &Session,
        username: &str,
    ) -> Result<Option<User>, Error> {
        let request = self
            .get(session, "/users/by-username/")
            .query(&[("username", username)]);
        let Some(response) = self.send_optional(request).await? else {
            return Ok(None);
        };
        // a 200 without an id counts as not found
        let body: serde_json::Value = Self::decode(response).await?;
        if body.get("id").is_none_or(serde_json::Value::is_null) {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// `POST /expenses/add/`.
    pub async fn create_expense(
        &self,
        session: &Session,
        payload: &ExpensePayload,
    ) -> Result<CreatedExpense, Error> {
        let request = self
            .http
            .post(self.config.endpoint("/expenses/add/"))
            .header(reqwest::header::AUTHORIZATION, session.bearer())
            .json(payload);
        let response = self.send(request).await?;
        if response.status() != StatusCode::CREATED {
            warn!(status = response.status().as_u16(), "expense accepted with unexpected status");
        }
        Self::decode(response).await
    }

    /// `GET /expenses/user/{id}/`.
    pub async fn user_expenses(&self, session: &Session, user_id: UserId) -> Result<Vec<Expense>, Error> {
        let response = self
            .send(self.get(session, &format!("/expenses/user/{}/", user_id)))
            .await?;
        Self::decode(response).await
    }

    /// `GET /expenses/user/{id}/latest/`; `None` when the user has no expenses.
    pub async fn latest_expense(
        &self,
        session: &Session,
        user_id: UserId,
    ) -> Result<Option<Expense>, Error> {
        let request = self.get(session, &format!("/expenses/user/{}/latest/", user_id));
        match self.send_optional(request).await? {
            Some(response) => Ok(Some(Self::decode(response).await?)),
            None => Ok(None),
        }
    }

    /// `GET /expenses/balance-sheet/` as raw CSV. An empty id list asks for
    /// every expense.
    pub async fn balance_sheet(&self, session: &Session, expense_ids: &[i64]) -> Result<Vec<u8>, Error> {
        let mut request = self.get(session, "/expenses/balance-sheet/");
        if !expense_ids.is_empty() {
            let ids = expense_ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            request = request.query(&[("expense_ids", ids)]);
        }
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `GET /expenses/user/{id}/latest/download/` as raw CSV.
    pub async fn download_latest(
        &self,
        session: &Session,
        user_id: UserId,
    ) -> Result<Option<Vec<u8>>, Error> {
        let request = self.get(session, &format!("/expenses/user/{}/latest/download/", user_id));
        match self.send_optional(request).await? {
            Some(response) => Ok(Some(response.bytes().await?.to_vec())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserDirectory for ApiClient {
    async fn find_user_id(
        &self,
        session: &Session,
        username: &str,
    ) -> Result<Option<UserId>, Error> {
        Ok(self.user_by_username(session, username).await?.map(|u| u.id))
    }
}

#[async_trait]
impl ExpenseService for ApiClient {
    async fn add_expense(
        &self,
        session: &Session,
        payload: &ExpensePayload,
    ) -> Result<CreatedExpense, Error> {
        self.create_expense(session, payload).await
    }
}

/// What to tell the user after a failed login: the server's `detail`, or a
/// fixed fallback.
pub fn login_failure_message(error: &Error) -> String {
    match error {
        Error::Session(msg) => msg.clone(),
        _ => error
            .body_json()
            .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| LOGIN_FAILED.to_string()),
    }
}
