use std::sync::Arc;

use panel_proxy::modules;
use panel_proxy::proxy;

#[tokio::main]
async fn main() -> Result<(), String> {
    modules::logger::init_logger();

    let mut proxy_config = match modules::config::load_proxy_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!("failed to load proxy config: {}. using defaults", err);
            let cfg = proxy::ProxyConfig::default();
            let _ = modules::config::save_proxy_config(&cfg);
            cfg
        }
    };

    if let Ok(value) = std::env::var("PANEL_PROXY_ALLOW_LAN") {
        let enabled = matches!(value.as_str(), "1" | "true" | "yes" | "on");
        if enabled {
            proxy_config.allow_lan_access = true;
        }
    }

    if let Ok(value) = std::env::var("PANEL_PROXY_TOTP_SECRET") {
        if !value.trim().is_empty() {
            proxy_config.totp_secret = value.trim().to_string();
        }
    }

    let bind_address = if let Ok(addr) = std::env::var("PANEL_PROXY_BIND") {
        if addr != "127.0.0.1" && addr != "localhost" {
            proxy_config.allow_lan_access = true;
        }
        addr
    } else {
        proxy_config.get_bind_address().to_string()
    };

    if proxy_config.totp_secret.trim().is_empty() {
        tracing::warn!(
            "no TOTP secret configured; login is disabled until one is set in the config or PANEL_PROXY_TOTP_SECRET"
        );
    }

    let port = proxy_config.port;
    let sessions = Arc::new(proxy::session::SessionStore::new());
    let bindings = Arc::new(proxy::binding::PanelBindingStore::new(sessions.clone()));

    let (server, handle) = proxy::AxumServer::start(
        bind_address.clone(),
        port,
        Arc::new(proxy_config),
        sessions,
        bindings,
    )
    .await
    .map_err(|e| format!("failed to start proxy server: {}", e))?;

    tracing::info!("panel-proxy listening on http://{}:{}", bind_address, port);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {}", e))?;

    tracing::info!("shutdown requested, stopping server...");
    server.stop();
    let _ = handle.await;

    Ok(())
}
