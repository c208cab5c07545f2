use std::future::Future;

use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::routes::media_router;
use crate::MediaAxumState;

#[derive(Clone)]
pub struct MediaApp {
    pub state: MediaAxumState,
    pub router: Router<()>,
}

impl MediaApp {
    pub fn new(state: MediaAxumState) -> Self {
        // Layers run outermost-last: the id is assigned before tracing sees
        // the request and copied onto the response on the way out.
        let router = media_router(state.clone())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Self { state, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        self.listen_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve until `signal` resolves, then stop accepting and drain
    pub async fn listen_with_shutdown<A, F>(self, addr: A, signal: F) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "media server listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}
