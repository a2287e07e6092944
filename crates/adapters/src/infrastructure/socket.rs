//! WebSocket adapter using tokio-tungstenite

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use stagelink_ports::{SocketError, SocketEvent, SocketEventSender, SocketPort};

/// Close status used when the transport dies without a close frame.
const ABNORMAL_CLOSE: u16 = 1006;

/// WebSocket client for the interactive service.
///
/// `open` spawns one read task and one write task; outbound frames flow
/// through an internal channel so `send` never holds a lock across an await.
#[derive(Clone, Default)]
pub struct TungsteniteSocket {
    tx: Arc<Mutex<Option<mpsc::Sender<Message>>>>,
}

impl TungsteniteSocket {
    pub fn new() -> Self {
        Self::default()
    }

    fn writer(&self) -> Option<mpsc::Sender<Message>> {
        self.tx.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl SocketPort for TungsteniteSocket {
    async fn open(
        &self,
        url: &str,
        headers: &[(String, String)],
        events: SocketEventSender,
    ) -> Result<(), SocketError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| SocketError::Connect(e.to_string()))?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SocketError::Connect(e.to_string()))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| SocketError::Connect(e.to_string()))?;
            request.headers_mut().insert(name, value);
        }

        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| SocketError::Connect(e.to_string()))?;
        tracing::info!("connected to interactive service at {}", url);

        let (mut write, mut read) = stream.split();
        let (tx, mut rx) = mpsc::channel::<Message>(32);
        {
            let mut slot = self.tx.lock().unwrap_or_else(|p| p.into_inner());
            *slot = Some(tx);
        }
        let _ = events.send(SocketEvent::Opened);

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    tracing::error!("failed to send frame: {}", e);
                    break;
                }
            }
        });

        let tx_slot = Arc::clone(&self.tx);
        tokio::spawn(async move {
            let mut saw_close = false;
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let _ = events.send(SocketEvent::Message(text.to_string()));
                    }
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((ABNORMAL_CLOSE, String::new()));
                        tracing::info!("service closed connection ({}: {})", code, reason);
                        saw_close = true;
                        let _ = events.send(SocketEvent::Closed { code, reason });
                        break;
                    }
                    // Text frames only on this protocol.
                    Ok(Message::Binary(_)) => {}
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("websocket error: {}", e);
                        let _ = events.send(SocketEvent::Error(e.to_string()));
                        break;
                    }
                }
            }
            if !saw_close {
                let _ = events.send(SocketEvent::Closed {
                    code: ABNORMAL_CLOSE,
                    reason: "transport interrupted".to_string(),
                });
            }
            let mut slot = tx_slot.lock().unwrap_or_else(|p| p.into_inner());
            *slot = None;
        });

        Ok(())
    }

    async fn send(&self, text: String) -> Result<(), SocketError> {
        let tx = self.writer().ok_or(SocketError::NotOpen)?;
        tx.send(Message::Text(text))
            .await
            .map_err(|e| SocketError::Send(e.to_string()))
    }

    async fn close(&self, reason: &str) {
        let tx = {
            let mut slot = self.tx.lock().unwrap_or_else(|p| p.into_inner());
            slot.take()
        };
        if let Some(tx) = tx {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: reason.to_string().into(),
            };
            let _ = tx.send(Message::Close(Some(frame))).await;
        }
    }

    fn is_open(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }
}
