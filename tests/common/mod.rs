use reqwest::Response;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use wavecaptcha::test_utils::{BlockFontLoader, test_config};
use wavecaptcha::web::SESSION_COOKIE_NAME;
use wavecaptcha::{AppState, CaptchaConfig, ServerConfig, serve};

pub fn create_server_config(captcha: CaptchaConfig) -> Arc<ServerConfig> {
    Arc::new(ServerConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        font_dir: PathBuf::from("fonts"),
        session_expiry_secs: 3600,
        secure_cookies: false,
        log_format: "pretty".to_string(),
        captcha,
    })
}

pub async fn spawn_server() -> (u16, Arc<AppState>) {
    spawn_server_with(test_config()).await
}

pub async fn spawn_server_with(captcha: CaptchaConfig) -> (u16, Arc<AppState>) {
    let config = create_server_config(captcha);
    let state = Arc::new(AppState::new(config, Arc::new(BlockFontLoader)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server_state = state.clone();
    tokio::spawn(async move {
        let _ = serve(listener, server_state).await;
    });

    (port, state)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// `name=value` pair from the session `Set-Cookie`, ready for a `Cookie` header.
pub fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(SESSION_COOKIE_NAME))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

pub fn session_id(cookie: &str) -> &str {
    cookie.split_once('=').map(|(_, id)| id).unwrap()
}
