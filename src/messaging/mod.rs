//! In-process extension messaging channel.
//!
//! Each component owns the receiving end of one mailbox and processes
//! envelopes one at a time. Messages from one sender arrive in send order;
//! every envelope carries a oneshot for its reply.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::platform::HostLink;
use crate::protocol::{HostRequest, Response, TabId};

/// Default queue depth for a component mailbox.
pub const MAILBOX_CAPACITY: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("Receiving end does not exist")]
    ReceiverGone,

    #[error("Message port closed before a response was received")]
    NoResponse,

    #[error("No response within {0:?}")]
    TimedOut(Duration),
}

/// A request in flight together with where it came from and how to answer.
#[derive(Debug)]
pub struct Envelope<Req> {
    pub request: Req,
    /// Tab of the sending agent, `None` for the popup or the host itself.
    pub origin: Option<TabId>,
    reply: oneshot::Sender<Response>,
}

impl<Req> Envelope<Req> {
    /// Sends the reply. A sender that stopped waiting is not an error.
    pub fn respond(self, response: Response) {
        if self.reply.send(response).is_err() {
            log::debug!("[MSG] Sender dropped before reply");
        }
    }

    pub fn into_parts(self) -> (Req, Option<TabId>, Replier) {
        (self.request, self.origin, Replier(self.reply))
    }
}

/// Reply half of an envelope that has been taken apart.
#[derive(Debug)]
pub struct Replier(oneshot::Sender<Response>);

impl Replier {
    pub fn respond(self, response: Response) {
        if self.0.send(response).is_err() {
            log::debug!("[MSG] Sender dropped before reply");
        }
    }
}

/// Sending half of a component's inbox.
#[derive(Debug)]
pub struct Mailbox<Req> {
    tx: mpsc::Sender<Envelope<Req>>,
    origin: Option<TabId>,
}

impl<Req> Clone for Mailbox<Req> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            origin: self.origin,
        }
    }
}

pub fn mailbox<Req>(capacity: usize) -> (Mailbox<Req>, mpsc::Receiver<Envelope<Req>>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Mailbox { tx, origin: None }, rx)
}

impl<Req> Mailbox<Req> {
    /// A handle whose messages are stamped with `tab` as their origin.
    pub fn from_tab(&self, tab: TabId) -> Self {
        Self {
            tx: self.tx.clone(),
            origin: Some(tab),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn send(&self, request: Req) -> Result<Response, MessagingError> {
        let (reply, rx) = oneshot::channel();
        let envelope = Envelope {
            request,
            origin: self.origin,
            reply,
        };
        self.tx
            .send(envelope)
            .await
            .map_err(|_| MessagingError::ReceiverGone)?;
        rx.await.map_err(|_| MessagingError::NoResponse)
    }

    pub async fn send_timeout(
        &self,
        request: Req,
        limit: Duration,
    ) -> Result<Response, MessagingError> {
        tokio::time::timeout(limit, self.send(request))
            .await
            .map_err(|_| MessagingError::TimedOut(limit))?
    }
}

impl HostLink for Mailbox<HostRequest> {
    async fn request(&self, request: HostRequest) -> Result<Response, MessagingError> {
        self.send(request).await
    }
}
