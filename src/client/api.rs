use reqwest::{multipart, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    auth::{AuthResponse, UserResponse},
    client::{
        confirm::{confirm_twice, Confirm, DELETE_ACCOUNT_PROMPTS, DELETE_POST_PROMPTS},
        session::Session,
    },
    comments::{CommentResponse, CreatedComment},
    follows::{FollowActionResponse, UserSummary},
    posts::{CreatedPost, LikeResponse, PostResponse},
    users::{ProfileResponse, MIN_SEARCH_CHARS},
};

/// Error type for API client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Cancelled by user")]
    Cancelled,

    #[error("Session storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid session data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[allow(dead_code)]
    message: String,
}

/// An image picked by the user for upload.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    fn into_part(self) -> Result<multipart::Part, ClientError> {
        Ok(multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?)
    }
}

/// Async client for the REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    fn authed(&self, session: &Session, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = session.token.as_deref().ok_or(ClientError::NotAuthenticated)?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Sends a request and decodes either the payload or the `{error}` body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                if text.is_empty() {
                    status.to_string()
                } else {
                    text
                }
            });
        debug!(status = status.as_u16(), "api error: {}", message);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    #[instrument(skip(self, session, password))]
    pub async fn register(
        &self,
        session: &mut Session,
        username: &str,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<UserResponse, ClientError> {
        let body = json!({
            "username": username,
            "email": email,
            "password": password,
            "full_name": full_name,
        });
        let auth: AuthResponse = self
            .send(self.request(Method::POST, "/register").json(&body))
            .await?;
        let user = auth.user.clone();
        session.sign_in(auth);
        Ok(user)
    }

    #[instrument(skip(self, session, password))]
    pub async fn login(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<UserResponse, ClientError> {
        let body = json!({ "username": username, "password": password });
        let auth: AuthResponse = self
            .send(self.request(Method::POST, "/login").json(&body))
            .await?;
        let user = auth.user.clone();
        session.sign_in(auth);
        Ok(user)
    }

    pub async fn me(&self, session: &Session) -> Result<UserResponse, ClientError> {
        self.send(self.authed(session, Method::GET, "/me")?).await
    }

    pub async fn feed(&self, session: &Session, page: i64, limit: i64) -> Result<Vec<PostResponse>, ClientError> {
        let request = self
            .authed(session, Method::GET, "/posts")?
            .query(&[("page", page), ("limit", limit)]);
        self.send(request).await
    }

    /// Fetches the page the session's feed cursor points at and advances it.
    pub async fn next_feed_page(&self, session: &mut Session) -> Result<Vec<PostResponse>, ClientError> {
        let cursor = session.feed;
        let posts = self.feed(session, cursor.next_page, cursor.limit).await?;
        session.feed.record_page(posts.len());
        Ok(posts)
    }

    pub async fn create_post(
        &self,
        session: &Session,
        content: &str,
        image: Option<ImageFile>,
    ) -> Result<i64, ClientError> {
        let mut form = multipart::Form::new().text("content", content.to_string());
        if let Some(image) = image {
            form = form.part("image", image.into_part()?);
        }
        let created: CreatedPost = self
            .send(self.authed(session, Method::POST, "/posts")?.multipart(form))
            .await?;
        Ok(created.post_id)
    }

    pub async fn get_post(&self, session: &Session, post_id: i64) -> Result<PostResponse, ClientError> {
        self.send(self.authed(session, Method::GET, &format!("/posts/{post_id}"))?)
            .await
    }

    /// Asks twice before deleting; returns `Cancelled` if either answer is no.
    pub async fn delete_post(
        &self,
        session: &Session,
        post_id: i64,
        confirm: &mut impl Confirm,
    ) -> Result<(), ClientError> {
        if !confirm_twice(confirm, DELETE_POST_PROMPTS) {
            return Err(ClientError::Cancelled);
        }
        let _: MessageBody = self
            .send(self.authed(session, Method::DELETE, &format!("/posts/{post_id}"))?)
            .await?;
        Ok(())
    }

    pub async fn toggle_like(&self, session: &Session, post_id: i64) -> Result<LikeResponse, ClientError> {
        self.send(self.authed(session, Method::POST, &format!("/posts/{post_id}/like"))?)
            .await
    }

    pub async fn comments(&self, session: &Session, post_id: i64) -> Result<Vec<CommentResponse>, ClientError> {
        self.send(self.authed(session, Method::GET, &format!("/posts/{post_id}/comments"))?)
            .await
    }

    pub async fn add_comment(&self, session: &Session, post_id: i64, content: &str) -> Result<i64, ClientError> {
        let request = self
            .authed(session, Method::POST, &format!("/posts/{post_id}/comments"))?
            .json(&json!({ "content": content }));
        let created: CreatedComment = self.send(request).await?;
        Ok(created.comment_id)
    }

    pub async fn profile(&self, session: &Session, user_id: i64) -> Result<ProfileResponse, ClientError> {
        self.send(self.authed(session, Method::GET, &format!("/users/{user_id}"))?)
            .await
    }

    /// Opens a profile and remembers it as the one being viewed.
    pub async fn view_profile(&self, session: &mut Session, user_id: i64) -> Result<ProfileResponse, ClientError> {
        let profile = self.profile(session, user_id).await?;
        session.viewing_profile = Some(profile.id);
        Ok(profile)
    }

    pub async fn update_profile(
        &self,
        session: &mut Session,
        full_name: Option<&str>,
        bio: Option<&str>,
        picture: Option<ImageFile>,
    ) -> Result<UserResponse, ClientError> {
        let mut form = multipart::Form::new();
        if let Some(full_name) = full_name {
            form = form.text("full_name", full_name.to_string());
        }
        if let Some(bio) = bio {
            form = form.text("bio", bio.to_string());
        }
        if let Some(picture) = picture {
            form = form.part("profile_picture", picture.into_part()?);
        }

        let _: MessageBody = self
            .send(self.authed(session, Method::PUT, "/users/profile")?.multipart(form))
            .await?;

        // Refresh the cached identity so rendering picks up the change.
        let me = self.me(session).await?;
        session.user = Some(me.clone());
        Ok(me)
    }

    pub async fn user_posts(
        &self,
        session: &Session,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<PostResponse>, ClientError> {
        let request = self
            .authed(session, Method::GET, &format!("/users/{user_id}/posts"))?
            .query(&[("page", page), ("limit", limit)]);
        self.send(request).await
    }

    pub async fn toggle_follow(&self, session: &Session, user_id: i64) -> Result<FollowActionResponse, ClientError> {
        self.send(self.authed(session, Method::POST, &format!("/users/{user_id}/follow"))?)
            .await
    }

    pub async fn followers(&self, session: &Session, user_id: i64) -> Result<Vec<UserSummary>, ClientError> {
        self.send(self.authed(session, Method::GET, &format!("/users/{user_id}/followers"))?)
            .await
    }

    pub async fn following(&self, session: &Session, user_id: i64) -> Result<Vec<UserSummary>, ClientError> {
        self.send(self.authed(session, Method::GET, &format!("/users/{user_id}/following"))?)
            .await
    }

    pub async fn suggested(&self, session: &Session) -> Result<Vec<UserSummary>, ClientError> {
        self.send(self.authed(session, Method::GET, "/users/suggested")?)
            .await
    }

    /// Short queries are answered locally with no results.
    pub async fn search(&self, session: &Session, query: &str) -> Result<Vec<UserSummary>, ClientError> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_CHARS {
            return Ok(Vec::new());
        }
        let mut url = reqwest::Url::parse(&self.url("/users/search/"))
            .map_err(|e| ClientError::Api {
                status: 0,
                message: e.to_string(),
            })?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Api {
                status: 0,
                message: "invalid base URL".to_string(),
            })?
            .pop_if_empty()
            .push(query);

        let token = session.token.as_deref().ok_or(ClientError::NotAuthenticated)?;
        self.send(self.http.get(url).bearer_auth(token)).await
    }

    /// Asks twice, deletes the account, then signs the session out.
    pub async fn delete_account(
        &self,
        session: &mut Session,
        confirm: &mut impl Confirm,
    ) -> Result<(), ClientError> {
        if !confirm_twice(confirm, DELETE_ACCOUNT_PROMPTS) {
            return Err(ClientError::Cancelled);
        }
        let _: MessageBody = self
            .send(self.authed(session, Method::DELETE, "/users/account")?)
            .await?;
        session.clear();
        Ok(())
    }

    /// Signs out locally; tokens are stateless so there is nothing to revoke.
    pub fn logout(&self, session: &mut Session) {
        session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = ApiClient::new("http://localhost:3000/");
        assert_eq!(client.url("/posts"), "http://localhost:3000/api/posts");
    }

    #[tokio::test]
    async fn protected_calls_need_a_token() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client.feed(&Session::default(), 1, 10).await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn short_search_never_hits_the_network() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let results = client.search(&Session::default(), " a ").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn declined_confirmation_cancels_before_sending() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let mut session = Session {
            token: Some("tok".into()),
            ..Session::default()
        };
        let mut asked = 0;
        let mut answers = |_: &str| {
            asked += 1;
            asked == 1
        };
        let err = client
            .delete_account(&mut session, &mut answers)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
        assert_eq!(asked, 2);
        assert!(session.is_authenticated());
    }
}
