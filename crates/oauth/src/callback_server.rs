use std::net::SocketAddr;

use {
    anyhow::Result,
    axum::{
        Form, Router,
        extract::State,
        http::StatusCode,
        response::{Html, IntoResponse, Response},
        routing::post,
    },
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::message::ProviderMessage;

const CLOSE_PAGE: &str = "<!doctype html><html><head><title>weblib</title></head>\
<body><p>You can close this window.</p><script>window.close()</script></body></html>";

/// Local listener receiving the provider's `form_post` response and
/// forwarding it to the login flow as a [`ProviderMessage`].
#[derive(Debug)]
pub struct CallbackServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl CallbackServer {
    /// Bind `addr` and serve `POST path`. Messages arrive on the returned receiver.
    pub async fn start(
        addr: SocketAddr,
        path: &str,
    ) -> Result<(Self, mpsc::Receiver<ProviderMessage>)> {
        let (tx, rx) = mpsc::channel(8);
        let app = Router::new()
            .route(path, post(form_post_handler))
            .with_state(tx);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "callback server stopped");
            }
        });

        info!(%addr, path, "callback server listening");
        Ok((
            Self {
                addr,
                shutdown,
                handle,
            },
            rx,
        ))
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and wait for the listener to wind down.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "callback server task failed");
        }
    }
}

async fn form_post_handler(
    State(tx): State<mpsc::Sender<ProviderMessage>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let message = match ProviderMessage::from_pairs(fields) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "rejecting callback post");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        },
    };
    if tx.send(message).await.is_err() {
        warn!("login flow no longer listening, dropping provider message");
        return (StatusCode::GONE, "login is no longer pending").into_response();
    }
    Html(CLOSE_PAGE).into_response()
}
