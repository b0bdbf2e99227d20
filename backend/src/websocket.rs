use crate::error::{AppError, AppResult};
use crate::models::{Auction, FeedItem};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::sync::RwLock;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Channel every feed item is published on
pub const FEED_CHANNEL: &str = "feed";

pub fn user_channel(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

pub fn auction_channel(auction_id: Uuid) -> String {
    format!("auction:{}", auction_id)
}

/// Whether a client may subscribe to `channel`
pub fn is_known_channel(channel: &str) -> bool {
    if channel == FEED_CHANNEL {
        return true;
    }
    match channel.split_once(':') {
        Some(("user", id)) | Some(("auction", id)) => Uuid::parse_str(id).is_ok(),
        _ => false,
    }
}

/// WebSocket message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "subscribe")]
    Subscribe { channel: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { channel: String },
    #[serde(rename = "feed_item")]
    FeedItem { item: FeedItem },
    #[serde(rename = "auction_updated")]
    AuctionUpdated { auction: Auction },
    #[serde(rename = "error")]
    Error { message: String },
}

/// A message addressed to one channel
#[derive(Debug, Clone)]
struct Envelope {
    channel: String,
    message: WsMessage,
}

/// WebSocket hub for live feed and auction updates
pub struct WebSocketServer {
    tx: broadcast::Sender<Envelope>,
    /// channel -> subscribed client ids
    subscriptions: Arc<RwLock<HashMap<String, Vec<Uuid>>>>,
    /// client id -> subscribed channels
    client_channels: Arc<RwLock<HashMap<Uuid, Vec<String>>>>,
}

impl WebSocketServer {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);

        Self {
            tx,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            client_channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish to the subscribers of a channel; a no-op when nobody listens
    pub async fn broadcast_to_channel(&self, channel: &str, message: WsMessage) {
        let subscriptions = self.subscriptions.read().await;

        let count = subscriptions.get(channel).map(Vec::len).unwrap_or(0);
        if count == 0 {
            return;
        }

        debug!("Broadcasting to {} subscribers on channel {}", count, channel);
        let envelope = Envelope {
            channel: channel.to_string(),
            message,
        };
        if let Err(e) = self.tx.send(envelope) {
            warn!("Failed to broadcast message: {}", e);
        }
    }

    pub async fn subscribe(&self, client_id: Uuid, channel: String) {
        let mut subscriptions = self.subscriptions.write().await;
        let mut client_channels = self.client_channels.write().await;

        let subscribers = subscriptions.entry(channel.clone()).or_default();
        if !subscribers.contains(&client_id) {
            subscribers.push(client_id);
        }

        let channels = client_channels.entry(client_id).or_default();
        if !channels.contains(&channel) {
            channels.push(channel.clone());
        }

        info!("Client {} subscribed to {}", client_id, channel);
    }

    pub async fn unsubscribe(&self, client_id: Uuid, channel: &str) {
        let mut subscriptions = self.subscriptions.write().await;
        let mut client_channels = self.client_channels.write().await;

        if let Some(subscribers) = subscriptions.get_mut(channel) {
            subscribers.retain(|&id| id != client_id);
            if subscribers.is_empty() {
                subscriptions.remove(channel);
            }
        }

        if let Some(channels) = client_channels.get_mut(&client_id) {
            channels.retain(|c| c != channel);
        }

        info!("Client {} unsubscribed from {}", client_id, channel);
    }

    /// Drop every subscription a client holds
    pub async fn disconnect(&self, client_id: Uuid) {
        let channels = self.get_client_channels(client_id).await;
        for channel in channels {
            self.unsubscribe(client_id, &channel).await;
        }
        self.client_channels.write().await.remove(&client_id);
    }

    pub async fn get_client_channels(&self, client_id: Uuid) -> Vec<String> {
        let client_channels = self.client_channels.read().await;
        client_channels.get(&client_id).cloned().unwrap_or_default()
    }

    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.subscriptions.read().await.get(channel).map(Vec::len).unwrap_or(0)
    }

    /// Connections whose outbound task is still forwarding broadcasts
    pub fn open_connections(&self) -> usize {
        self.tx.receiver_count()
    }

    async fn is_client_subscribed(&self, client_id: Uuid, channel: &str) -> bool {
        let subscriptions = self.subscriptions.read().await;
        subscriptions
            .get(channel)
            .map(|subscribers| subscribers.contains(&client_id))
            .unwrap_or(false)
    }

    /// Accept connections until the listener fails
    pub async fn run(self: Arc<Self>, addr: SocketAddr) -> AppResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Message(format!("Failed to bind WebSocket listener on {}: {}", addr, e)))?;
        info!("WebSocket server listening on {}", addr);

        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .map_err(|e| AppError::Message(format!("WebSocket accept failed: {}", e)))?;

            debug!("Accepted {} ({} connections open)", peer, self.open_connections());
            let hub = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = hub.handle_connection(stream).await {
                    warn!("WebSocket connection from {} failed: {}", peer, e);
                }
            });
        }
    }

    /// Handle a new WebSocket connection
    pub async fn handle_connection(&self, stream: tokio::net::TcpStream) -> AppResult<()> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| AppError::Message(format!("WebSocket handshake failed: {}", e)))?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let mut rx = self.tx.subscribe();
        let client_id = Uuid::new_v4();

        info!("New WebSocket connection: {}", client_id);
        self.client_channels.write().await.insert(client_id, Vec::new());

        let welcome = serde_json::json!({
            "type": "connected",
            "client_id": client_id.to_string(),
        });
        if let Err(e) = ws_sender.send(Message::Text(welcome.to_string())).await {
            warn!("Failed to send welcome message: {}", e);
        }

        let ws_sender = Arc::new(tokio::sync::Mutex::new(ws_sender));
        let (closed_tx, mut closed_rx) = oneshot::channel::<()>();

        // Inbound: subscription management
        let hub = self.clone();
        let sender = Arc::clone(&ws_sender);
        tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let reply = match serde_json::from_str::<WsMessage>(&text) {
                            Ok(WsMessage::Subscribe { channel }) if is_known_channel(&channel) => {
                                hub.subscribe(client_id, channel.clone()).await;
                                serde_json::json!({ "type": "subscribed", "channel": channel })
                            }
                            Ok(WsMessage::Subscribe { channel }) => {
                                serde_json::json!({ "type": "error", "message": format!("Unknown channel: {}", channel) })
                            }
                            Ok(WsMessage::Unsubscribe { channel }) => {
                                hub.unsubscribe(client_id, &channel).await;
                                serde_json::json!({ "type": "unsubscribed", "channel": channel })
                            }
                            Ok(_) => {
                                warn!("Unexpected message type from client {}", client_id);
                                serde_json::json!({ "type": "error", "message": "Unsupported message type" })
                            }
                            Err(_) => {
                                warn!("Failed to parse message from client {}: {}", client_id, text);
                                serde_json::json!({ "type": "error", "message": "Invalid message format" })
                            }
                        };

                        let mut sender = sender.lock().await;
                        if let Err(e) = sender.send(Message::Text(reply.to_string())).await {
                            warn!("Failed to reply to client {}: {}", client_id, e);
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("WebSocket connection closed: {}", client_id);
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            hub.disconnect(client_id).await;
            let _ = closed_tx.send(());
        });

        // Outbound: forward envelopes for subscribed channels
        let hub = self.clone();
        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = &mut closed_rx => break,
                    received = rx.recv() => received,
                };
                let envelope = match received {
                    Ok(envelope) => envelope,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagged, skipped {} messages", client_id, skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if !hub.is_client_subscribed(client_id, &envelope.channel).await {
                    continue;
                }

                let json = match serde_json::to_string(&envelope.message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };

                let mut sender = ws_sender.lock().await;
                if let Err(e) = sender.send(Message::Text(json)).await {
                    debug!("Failed to send message to client {}: {}", client_id, e);
                    break;
                }
            }
            debug!("Stopped forwarding to client {}", client_id);
        });

        Ok(())
    }

    /// Push a feed item to the global feed and its author's channel
    pub async fn broadcast_feed_item(&self, item: &FeedItem) {
        let message = WsMessage::FeedItem { item: item.clone() };
        self.broadcast_to_channel(FEED_CHANNEL, message.clone()).await;

        if let Some(user_id) = item.user_id {
            self.broadcast_to_channel(&user_channel(user_id), message).await;
        }
    }

    pub async fn broadcast_auction_updated(&self, auction: &Auction) {
        let message = WsMessage::AuctionUpdated {
            auction: auction.clone(),
        };
        self.broadcast_to_channel(&auction_channel(auction.id), message).await;
    }
}

impl Clone for WebSocketServer {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            subscriptions: Arc::clone(&self.subscriptions),
            client_channels: Arc::clone(&self.client_channels),
        }
    }
}

impl Default for WebSocketServer {
    fn default() -> Self {
        Self::new()
    }
}
