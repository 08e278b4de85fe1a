//! The single outbound transport connection and its failure
//! classification.

use siphon_smtp::{ClientError, Response, SmtpClient, SmtpConfig};
use tracing::{debug, info};

use crate::{error::SendError, reconstruct::OutboundMessage};

/// A successful handoff to the destination.
#[derive(Debug)]
pub struct Delivery {
    /// Final reply from the destination, the success signal.
    pub response: Response,
}

/// Owns at most one live SMTP connection.
///
/// The first send establishes the connection; later sends reuse it, one
/// message at a time, no pipelining. A destination refusal leaves the
/// channel usable; any transport-level fault closes it for good: partial
/// transport state cannot be trusted, so there is no reconnection.
pub struct DeliveryChannel {
    config: SmtpConfig,
    client: Option<SmtpClient>,
}

impl DeliveryChannel {
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Whether a connection was established this run.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Delivers one message over the shared connection, connecting first
    /// if this is the first send of the run.
    ///
    /// # Errors
    ///
    /// [`SendError::Rejected`] when the destination refuses this message;
    /// [`SendError::Transport`] when the connection itself fails, after
    /// which the channel is closed and must not be reused.
    pub async fn send(&mut self, message: OutboundMessage) -> Result<Delivery, SendError> {
        let result = self.transact(message).await;
        if matches!(result, Err(SendError::Transport(_))) {
            self.client = None;
        }
        result
    }

    /// Best-effort QUIT and teardown.
    pub async fn close(&mut self) {
        if let Some(mut client) = self.client.take() {
            if let Err(err) = client.quit().await {
                debug!(error = %err, "QUIT failed while closing delivery channel");
            }
        }
    }

    async fn ready(&mut self) -> Result<&mut SmtpClient, ClientError> {
        if self.client.is_none() {
            info!(
                server = %self.config.address(),
                secure = self.config.secure,
                auth = self.config.auth.is_some(),
                "connecting to delivery target"
            );
            let mut client = SmtpClient::connect(&self.config).await?;
            client.handshake(&self.config).await?;
            self.client = Some(client);
        }
        self.client.as_mut().ok_or(ClientError::Closed)
    }

    async fn transact(&mut self, message: OutboundMessage) -> Result<Delivery, SendError> {
        let from = message.from.clone();
        let to = message.to.clone();

        let client = self.ready().await?;

        let reply = client.mail_from(&from).await?;
        if !reply.is_success() {
            client.rset().await?;
            return Err(rejected(reply));
        }

        let reply = client.rcpt_to(&to).await?;
        if !reply.is_success() {
            client.rset().await?;
            return Err(rejected(reply));
        }

        let reply = client.data().await?;
        if !reply.is_intermediate() {
            client.rset().await?;
            return Err(rejected(reply));
        }

        let reply = client.send_body(message.into_read()).await?;
        if !reply.is_success() {
            return Err(rejected(reply));
        }

        Ok(Delivery { response: reply })
    }
}

fn rejected(reply: Response) -> SendError {
    SendError::Rejected {
        code: reply.code,
        reply: reply.message(),
    }
}
