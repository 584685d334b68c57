use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use {
    anyhow::Context,
    tokio::sync::mpsc,
    url::Url,
    weblib_config::WeblibConfig,
};

use crate::{callback_server::CallbackServer, message::ProviderMessage, types::OidcConfig};

const BIND_HINT: &str =
    "set callback.bind (WEBLIB_CALLBACK_BIND) to a free local address, or point \
     identity.redirect_uri (WEBLIB_REDIRECT_URI) at one";

/// Build the controller configuration from the loaded weblib config.
#[must_use]
pub fn oidc_config(config: &WeblibConfig) -> OidcConfig {
    OidcConfig {
        client_id: config.identity.client_id.clone(),
        authority: config.identity.authority.clone(),
        issuer_base: config.identity.issuer_base.clone(),
        redirect_uri: config.redirect_uri(),
        post_logout_redirect_uri: config.post_logout_redirect_uri(),
        scopes: config.identity.scopes.clone(),
        login_timeout: Duration::from_secs(config.identity.login_timeout_secs),
    }
}

/// Address the callback server listens on: the explicit `callback.bind`, or
/// the host and port of the redirect URI.
pub fn callback_addr(config: &WeblibConfig) -> anyhow::Result<SocketAddr> {
    if let Some(bind) = &config.callback.bind {
        return bind
            .parse()
            .with_context(|| format!("invalid callback bind address '{bind}'"));
    }

    let redirect = config.redirect_uri();
    let url = Url::parse(&redirect).with_context(|| format!("invalid redirect URI '{redirect}'"))?;
    let ip = match url.host_str() {
        Some("localhost") | None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse()
            .with_context(|| {
                format!("redirect host '{host}' is not a local address; {BIND_HINT}")
            })?,
    };
    let port = url
        .port_or_known_default()
        .context("redirect URI has no port")?;
    Ok(SocketAddr::new(ip, port))
}

/// Start the callback listener where the provider will post its response.
pub async fn start_callback_server(
    config: &WeblibConfig,
    oidc: &OidcConfig,
) -> anyhow::Result<(CallbackServer, mpsc::Receiver<ProviderMessage>)> {
    let addr = callback_addr(config)?;
    let path = callback_path(oidc)?;
    CallbackServer::start(addr, &path)
        .await
        .with_context(|| format!("cannot listen for the login callback on {addr}; {BIND_HINT}"))
}

/// Path component of the redirect URI, where the `form_post` arrives.
pub fn callback_path(config: &OidcConfig) -> anyhow::Result<String> {
    let url = Url::parse(&config.redirect_uri)
        .with_context(|| format!("invalid redirect URI '{}'", config.redirect_uri))?;
    Ok(url.path().to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_identity_section() {
        let mut cfg = WeblibConfig::default();
        cfg.identity.login_timeout_secs = 30;
        let oidc = oidc_config(&cfg);
        assert_eq!(oidc.client_id, cfg.identity.client_id);
        assert_eq!(oidc.redirect_uri, "http://localhost:5000/api/oidc/redirect");
        assert_eq!(oidc.login_timeout, Duration::from_secs(30));
        assert_eq!(callback_path(&oidc).unwrap(), "/api/oidc/redirect");
    }

    #[test]
    fn callback_addr_from_redirect() {
        let mut cfg = WeblibConfig::default();
        assert_eq!(
            callback_addr(&cfg).unwrap(),
            "127.0.0.1:5000".parse::<SocketAddr>().unwrap()
        );
        cfg.identity.redirect_uri = Some("http://[::1]:8400/cb".into());
        assert_eq!(
            callback_addr(&cfg).unwrap(),
            "[::1]:8400".parse::<SocketAddr>().unwrap()
        );
        cfg.callback.bind = Some("0.0.0.0:9000".into());
        assert_eq!(callback_addr(&cfg).unwrap().port(), 9000);
    }

    #[test]
    fn callback_addr_rejects_remote_host() {
        let mut cfg = WeblibConfig::default();
        cfg.identity.redirect_uri = Some("https://weblib.example/api/oidc/redirect".into());
        let err = callback_addr(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("callback.bind"));
    }

    #[tokio::test]
    async fn occupied_callback_port_points_at_bind_setting() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut cfg = WeblibConfig::default();
        cfg.callback.bind = Some(taken.local_addr().unwrap().to_string());

        let err = start_callback_server(&cfg, &oidc_config(&cfg)).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("cannot listen for the login callback"));
        assert!(message.contains("WEBLIB_CALLBACK_BIND"));
    }

    #[tokio::test]
    async fn callback_server_starts_on_configured_bind() {
        let mut cfg = WeblibConfig::default();
        cfg.callback.bind = Some("127.0.0.1:0".into());
        let (server, _rx) = start_callback_server(&cfg, &oidc_config(&cfg)).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
        server.shutdown().await;
    }
}
