use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use jornadas_common::GatewayError;
use jornadas_protocol::{
    ContentEntry, ContentListing, DispatchAck, DispatchRequest, ErrorBody, LikeData, LikeResponse,
    NewEntry, ToggleRequest, routes,
};

use crate::session::SessionId;

/// Leitura e toggle de likes no serviço remoto.
#[async_trait]
pub trait LikeGateway: Send + Sync {
    async fn like_data(
        &self,
        entry_id: &str,
        session: &SessionId,
    ) -> Result<LikeData, GatewayError>;

    async fn toggle_like(&self, request: &ToggleRequest) -> Result<LikeResponse, GatewayError>;
}

/// Fonte da listagem de conteúdos da comunidade.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn content(&self) -> Result<ContentListing, GatewayError>;
}

/// Cliente HTTP do gateway.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    admin_token: Option<String>,
}

impl HttpGateway {
    /// `base` pode ter um prefixo de caminho (ex.: `https://host/.netlify/functions`);
    /// as rotas são resolvidas por baixo dele.
    pub fn new(base: &str) -> Result<Self, GatewayError> {
        let mut base = Url::parse(base).map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(base.to_string()));
        }
        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            base,
            admin_token: None,
        })
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn user_agent() -> &'static str {
        concat!("jornadas-client/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    // Caminho relativo para não descartar o prefixo da base
    fn url(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::InvalidUrl(e.to_string()))
    }

    /// `path` + um segmento final codificado (ids podem ter caracteres reservados).
    fn url_with_segment(&self, path: &str, segment: &str) -> Result<Url, GatewayError> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(url_string(&self.base)))?
            .push(segment);
        Ok(url)
    }

    fn admin_token(&self) -> Result<&str, GatewayError> {
        self.admin_token
            .as_deref()
            .ok_or_else(|| GatewayError::Unauthorized("token de administração em falta".into()))
    }

    pub async fn health(&self) -> Result<(), GatewayError> {
        let resp = self
            .client
            .get(self.url(routes::HEALTH)?)
            .send()
            .await
            .map_err(transport)?;
        expect_success(resp).await.map(|_| ())
    }

    pub async fn append_entry(&self, entry: &NewEntry) -> Result<ContentEntry, GatewayError> {
        let resp = self
            .client
            .post(self.url(routes::COMMUNITY)?)
            .bearer_auth(self.admin_token()?)
            .json(entry)
            .send()
            .await
            .map_err(transport)?;
        handle(resp).await
    }

    pub async fn remove_entry(&self, id: &str) -> Result<(), GatewayError> {
        let resp = self
            .client
            .delete(self.url_with_segment(routes::COMMUNITY, id)?)
            .bearer_auth(self.admin_token()?)
            .send()
            .await
            .map_err(transport)?;
        expect_success(resp).await.map(|_| ())
    }

    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchAck, GatewayError> {
        let resp = self
            .client
            .post(self.url(routes::DISPATCH)?)
            .bearer_auth(self.admin_token()?)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        handle(resp).await
    }
}

#[async_trait]
impl LikeGateway for HttpGateway {
    async fn like_data(
        &self,
        entry_id: &str,
        session: &SessionId,
    ) -> Result<LikeData, GatewayError> {
        let mut url = self.url_with_segment(routes::LIKES, entry_id)?;
        url.query_pairs_mut()
            .append_pair("sessionId", session.as_str());

        debug!("GET {url}");
        let resp = self.client.get(url).send().await.map_err(transport)?;
        handle(resp).await
    }

    async fn toggle_like(&self, request: &ToggleRequest) -> Result<LikeResponse, GatewayError> {
        debug!(
            "POST {} {} ({})",
            routes::LIKES,
            request.entry_id,
            request.action.as_str()
        );
        let resp = self
            .client
            .post(self.url(routes::LIKES)?)
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        handle(resp).await
    }
}

#[async_trait]
impl ContentSource for HttpGateway {
    async fn content(&self) -> Result<ContentListing, GatewayError> {
        let resp = self
            .client
            .get(self.url(routes::COMMUNITY)?)
            .send()
            .await
            .map_err(transport)?;
        handle(resp).await
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

fn url_string(url: &Url) -> String {
    url.as_str().to_string()
}

async fn expect_success(resp: Response) -> Result<Vec<u8>, GatewayError> {
    let status = resp.status();
    let bytes = resp.bytes().await.map_err(transport)?;
    if !status.is_success() {
        return Err(error_from_status(status, &bytes));
    }
    Ok(bytes.to_vec())
}

async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
    let bytes = expect_success(resp).await?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Mapeia uma resposta de erro; usa `{"error": ...}` quando presente.
fn error_from_status(status: StatusCode, body: &[u8]) -> GatewayError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

    if status == StatusCode::UNAUTHORIZED {
        GatewayError::Unauthorized(message)
    } else {
        GatewayError::Status {
            status: status.as_u16(),
            message,
        }
    }
}
