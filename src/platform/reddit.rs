//! Reddit implementation of [`Platform`]
//!
//! Authenticates as a "script" application with the password grant and then
//! talks to the OAuth API with a bearer token.

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{Community, InboxMessage, Platform, PlatformError, PlatformResult};
use crate::config::BotConfig;

/// Page size requested from listing endpoints
const PAGE_LIMIT: u32 = 100;
/// Error code the API returns when there is no pending invite
const NO_INVITE_FOUND: &str = "NO_INVITE_FOUND";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Identity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    after: Option<String>,
    children: Vec<T>,
}

/// `{ "kind": ..., "data": ... }` wrapper around listing children
#[derive(Debug, Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    name: String,
    subreddit: Option<String>,
    #[serde(default)]
    subject: String,
}

#[derive(Debug, Deserialize)]
struct BannedData {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SubredditData {
    display_name: String,
}

/// Body of `api_type=json` responses
#[derive(Debug, Default, Deserialize)]
struct JsonEnvelope {
    #[serde(default)]
    json: JsonErrors,
}

#[derive(Debug, Default, Deserialize)]
struct JsonErrors {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
}

impl JsonErrors {
    /// First error code in the body, if any
    fn first_code(&self) -> Option<String> {
        self.errors
            .first()
            .and_then(|error| error.first())
            .map(|code| code.as_str().map_or_else(|| code.to_string(), String::from))
    }
}

/// Authenticated Reddit API client
#[derive(Clone)]
pub struct RedditClient {
    client: Client,
    api_base: String,
    token: String,
    username: String,
}

impl std::fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditClient")
            .field("api_base", &self.api_base)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RedditClient {
    /// Log in with the configured account and resolve its username
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Auth` if the credentials are rejected, or a
    /// transport/decode error if the API cannot be reached.
    pub async fn login(config: &BotConfig) -> PlatformResult<Self> {
        let client = Client::builder().user_agent(config.user_agent()).build()?;

        let response = client
            .post(&config.auth_url)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PlatformError::Auth(format!(
                "token request returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = decode(response).await?;
        let token = match (token.access_token, token.error) {
            (Some(access_token), None) => access_token,
            (_, Some(error)) => return Err(PlatformError::Auth(error)),
            (None, None) => {
                return Err(PlatformError::Auth("no access token in response".to_string()));
            }
        };

        let mut reddit = Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            username: String::new(),
        };
        let identity: Identity = decode(reddit.send(reddit.get("/api/v1/me")).await?).await?;
        reddit.username = identity.name;

        info!("Logged in as /u/{}", reddit.username);
        Ok(reddit)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(&self.token)
    }

    fn post(&self, path: &str, form: &[(&str, &str)]) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .form(form)
    }

    /// Send a request and turn non-success statuses into errors
    async fn send(&self, request: RequestBuilder) -> PlatformResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            debug!("Request to {} failed with {status}", response.url());
            Err(PlatformError::from_status(status.as_u16()))
        }
    }

    /// POST an `api_type=json` form and surface errors from the body
    async fn post_json(&self, path: &str, form: &[(&str, &str)]) -> PlatformResult<JsonErrors> {
        let mut fields = vec![("api_type", "json")];
        fields.extend_from_slice(form);
        let response = self.send(self.post(path, &fields)).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(JsonErrors::default());
        }
        let envelope: JsonEnvelope =
            serde_json::from_str(&body).map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(envelope.json)
    }

    async fn post_checked(&self, path: &str, form: &[(&str, &str)]) -> PlatformResult<()> {
        match self.post_json(path, form).await?.first_code() {
            Some(code) => Err(PlatformError::Rejected(code)),
            None => Ok(()),
        }
    }

    /// Follow `after` cursors until the listing is exhausted
    async fn paginate<T: DeserializeOwned>(&self, path: &str) -> PlatformResult<Vec<T>> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let limit = PAGE_LIMIT.to_string();
            let mut query = vec![("limit", limit.as_str())];
            if let Some(cursor) = after.as_deref() {
                query.push(("after", cursor));
            }

            let listing: Listing<T> = decode(self.send(self.get(path).query(&query)).await?).await?;
            items.extend(listing.data.children);
            match listing.data.after {
                Some(next) if !next.is_empty() => after = Some(next),
                _ => break,
            }
        }
        Ok(items)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> PlatformResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| PlatformError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl Platform for RedditClient {
    fn me(&self) -> String {
        self.username.clone()
    }

    async fn unread_messages(&self) -> PlatformResult<Vec<InboxMessage>> {
        let things: Vec<Thing<MessageData>> = self.paginate("/message/unread").await?;
        Ok(things
            .into_iter()
            .map(|thing| InboxMessage {
                id: thing.data.name,
                community: thing.data.subreddit,
                subject: thing.data.subject,
            })
            .collect())
    }

    async fn mark_read(&self, message: &InboxMessage) -> PlatformResult<()> {
        self.send(self.post("/api/read_message", &[("id", message.id.as_str())]))
            .await?;
        Ok(())
    }

    async fn accept_moderator_invite(&self, community: &str) -> PlatformResult<()> {
        let path = format!("/r/{community}/api/accept_moderator_invite");
        match self.post_json(&path, &[]).await {
            Ok(errors) => match errors.first_code() {
                Some(code) if code == NO_INVITE_FOUND => Err(PlatformError::InvalidInvite),
                Some(code) => Err(PlatformError::Rejected(code)),
                None => Ok(()),
            },
            Err(PlatformError::Forbidden | PlatformError::NotFound) => {
                Err(PlatformError::InvalidInvite)
            }
            Err(e) => Err(e),
        }
    }

    async fn banned_users(&self, community: &str) -> PlatformResult<Vec<String>> {
        let banned: Vec<BannedData> = self
            .paginate(&format!("/r/{community}/about/banned"))
            .await?;
        Ok(banned.into_iter().map(|entry| entry.name).collect())
    }

    async fn remove_ban(&self, community: &str, username: &str) -> PlatformResult<()> {
        self.post_checked(
            &format!("/r/{community}/api/unfriend"),
            &[("name", username), ("type", "banned")],
        )
        .await
    }

    async fn send_community_message(
        &self,
        community: &str,
        subject: &str,
        body: &str,
    ) -> PlatformResult<()> {
        let to = format!("/r/{community}");
        self.post_checked(
            "/api/compose",
            &[("to", to.as_str()), ("subject", subject), ("text", body)],
        )
        .await
    }

    async fn edit_wiki_page(
        &self,
        community: &str,
        page: &str,
        content: &str,
    ) -> PlatformResult<()> {
        self.send(self.post(
            &format!("/r/{community}/api/wiki/edit"),
            &[("page", page), ("content", content)],
        ))
        .await?;
        Ok(())
    }

    async fn remove_moderator(&self, community: &str, username: &str) -> PlatformResult<()> {
        self.post_checked(
            &format!("/r/{community}/api/unfriend"),
            &[("name", username), ("type", "moderator")],
        )
        .await
    }

    async fn moderated_communities(&self) -> PlatformResult<Vec<Community>> {
        let things: Vec<Thing<SubredditData>> = self.paginate("/subreddits/mine/moderator").await?;
        Ok(things
            .into_iter()
            .map(|thing| Community::new(thing.data.display_name))
            .collect())
    }
}
