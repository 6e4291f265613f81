//! The dashboard's WebSocket link

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use sai_core::dto::outbound::ClientMessage;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use url::Url;

use crate::endpoint::SUBPROTOCOL;
use crate::error::{ClientError, Result};

/// A duplex text-frame link to the server
#[async_trait]
pub trait Transport: Send {
    /// Sends one text frame
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// The next text frame, or `None` once the server closed the link
    async fn next_text(&mut self) -> Result<Option<String>>;

    /// Encodes and sends a client message
    async fn send_message(&mut self, message: &ClientMessage) -> Result<()> {
        let text = message.to_json()?;
        debug!("-> {}", message.schema());
        self.send_text(text).await
    }
}

/// [`Transport`] over tokio-tungstenite
pub struct WsTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Opens the browse endpoint, negotiating the Sai sub-protocol
    ///
    /// # Arguments
    /// * `url` - The browse endpoint, see [`crate::endpoint::browse_url`]
    /// * `cookie` - Optional `Cookie` header value carrying a login
    pub async fn connect(url: &Url, cookie: Option<&str>) -> Result<Self> {
        let mut request = url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));
        if let Some(cookie) = cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ClientError::InvalidUrl(format!("bad cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let (ws, _response) = connect_async(request).await?;
        info!("Connected to {}", url);
        Ok(Self { ws })
    }

    /// Sends a close frame
    pub async fn close(&mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.ws.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => debug!("Ignoring non-UTF-8 binary frame"),
                },
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }
}
