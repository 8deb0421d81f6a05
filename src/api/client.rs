use crate::api::ChatBackend;
use crate::api::models::{
    AuthResponse, Contact, HistoryEntry, HistoryRequest, LoginRequest, RegisterRequest, SendMessageRequest,
    SetAvatarRequest, SetAvatarResponse,
};
use crate::app::AppConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct ApiClient {
    http: HttpClient,
    base_api: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self { http: HttpClient::new(), base_api: config.api_base() }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_api, path.trim_start_matches('/'))
    }

    fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if !resp.status().is_success() {
            return Err(Error::Http(resp.status().as_u16()));
        }
        Ok(resp)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let endpoint = self.endpoint(path);
        log::debug!("POST {endpoint}");
        let resp = Self::check(self.http.post(&endpoint).json(body).send().await?)?;
        Ok(resp.json::<T>().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let endpoint = self.endpoint(path);
        log::debug!("GET {endpoint}");
        let resp = Self::check(self.http.get(&endpoint).send().await?)?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        self.post_json("auth/login", req).await
    }

    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse> {
        self.post_json("auth/register", req).await
    }

    async fn set_avatar(&self, user_id: &str, image: &str) -> Result<SetAvatarResponse> {
        let body = SetAvatarRequest { image: image.to_string() };
        self.post_json(&format!("auth/setavatar/{user_id}"), &body).await
    }

    async fn contacts(&self, user_id: &str) -> Result<Vec<Contact>> {
        self.get_json(&format!("auth/allusers/{user_id}")).await
    }

    async fn history(&self, from: &str, to: &str) -> Result<Vec<HistoryEntry>> {
        let body = HistoryRequest { from: from.to_string(), to: to.to_string() };
        self.post_json("messages/getmsg", &body).await
    }

    /// The acknowledgement body is not used.
    async fn send_message(&self, req: &SendMessageRequest) -> Result<()> {
        let endpoint = self.endpoint("messages/addmsg");
        Self::check(self.http.post(&endpoint).json(req).send().await?)?;
        Ok(())
    }

    async fn logout(&self, user_id: &str) -> Result<()> {
        let endpoint = self.endpoint(&format!("auth/logout/{user_id}"));
        Self::check(self.http.get(&endpoint).send().await?)?;
        Ok(())
    }
}
