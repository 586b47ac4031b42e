use folio_document::Context;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// HTTP front end over one document context.
pub struct FolioServer {
    config: ServerConfig,
    ctx: Context,
}

impl FolioServer {
    pub fn new(config: ServerConfig, ctx: Context) -> Self {
        Self { config, ctx }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(self.ctx.clone(), self.config.clone()))
    }

    /// Start serving requests until the process receives Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("folio server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
                tracing::info!("shutting down");
            })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_document::Registry;
    use folio_fs::Repository;

    fn server() -> FolioServer {
        let ctx = Context::new(Repository::in_memory(), Registry::new());
        FolioServer::new(ServerConfig::default(), ctx)
    }

    #[test]
    fn server_construction() {
        let server = server();
        assert_eq!(server.config().bind_addr, "127.0.0.1:8065".parse().unwrap());
    }

    #[test]
    fn router_builds() {
        let _router = server().router();
    }

    #[test]
    fn custom_resource_prefix_builds() {
        let ctx = Context::new(Repository::in_memory(), Registry::new())
            .with_resource_prefix("/static/res");
        let _router = FolioServer::new(ServerConfig::default(), ctx).router();
    }
}
