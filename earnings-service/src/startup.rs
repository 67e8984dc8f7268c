use axum::Router;
use service_core::error::AppError;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::{
    build_router,
    config::EarningsConfig,
    services::{Database, JwtService},
    AppState,
};

/// A bound, migrated server that has not started accepting yet.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: EarningsConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;
        db.run_migrations().await?;
        tracing::info!("Database initialized successfully");

        let jwt = JwtService::new(&config.jwt)?;

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        let listener = TcpListener::bind(config.common.socket_addr()).await?;
        let port = listener.local_addr()?.port();

        let state = AppState {
            config,
            db,
            jwt,
            login_rate_limiter,
            ip_rate_limiter,
        };

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Port actually bound; differs from the configured one when that was 0.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        self.run_with_shutdown(std::future::pending()).await
    }

    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(port = self.port, "Listening");

        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        Ok(())
    }
}
