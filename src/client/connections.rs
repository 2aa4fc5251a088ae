use tracing::{info, instrument};

use super::{render::PageView, ApiClient, ClientError, PlayerCard, RequestAction};

/// State behind the connections page: confirmed connections and incoming
/// requests of the session player.
pub struct ConnectionsPage {
    client: ApiClient,
    connections: Vec<PlayerCard>,
    pending_requests: Vec<PlayerCard>,
}

impl ConnectionsPage {
    /// Creates an empty page. Call [`Self::load`] once to fill it.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            connections: Vec::new(),
            pending_requests: Vec::new(),
        }
    }

    #[must_use]
    pub fn connections(&self) -> &[PlayerCard] {
        &self.connections
    }

    #[must_use]
    pub fn pending_requests(&self) -> &[PlayerCard] {
        &self.pending_requests
    }

    /// Replaces both lists with what the server has.
    ///
    /// # Errors
    /// On failure the error is returned and the current lists are kept.
    #[instrument(skip(self), err(Debug))]
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let payload = self.client.get_connections().await?;
        self.connections = payload.connections;
        self.pending_requests = payload.pending_requests;
        info!(
            connections = self.connections.len(),
            pending = self.pending_requests.len(),
            "Loaded connections"
        );
        Ok(())
    }

    /// Accepts or rejects the pending request from `player_id`.
    ///
    /// On success the request leaves the pending list; an accepted one is
    /// appended to the connections as it looked before the call, the server's
    /// copy isn't fetched again.
    ///
    /// # Errors
    /// On failure the error is returned and neither list changes.
    #[instrument(skip(self), err(Debug))]
    pub async fn respond_to_request(
        &mut self,
        player_id: &str,
        action: RequestAction,
    ) -> Result<(), ClientError> {
        let snapshot = self
            .pending_requests
            .iter()
            .find(|card| card.id == player_id)
            .cloned();

        self.client.respond(player_id, action).await?;

        self.pending_requests.retain(|card| card.id != player_id);
        if action == RequestAction::Accept {
            if let Some(card) = snapshot {
                self.connections.push(card);
            }
        }
        Ok(())
    }

    /// Sends a connection request to `player_id`, then reloads the page.
    ///
    /// # Errors
    /// Fails if sending the request fails. A failed reload is also returned,
    /// but by then the request has been sent.
    #[instrument(skip(self), err(Debug))]
    pub async fn request_connection(&mut self, player_id: &str) -> Result<(), ClientError> {
        self.client.send_request(player_id).await?;
        self.load().await
    }

    #[must_use]
    pub fn view(&self) -> PageView {
        PageView::new(&self.connections, &self.pending_requests)
    }
}
