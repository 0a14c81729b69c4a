use crate::common::{client, session_cookie, session_id, spawn_server, spawn_server_with};
use wavecaptcha::test_utils::test_config;
use wavecaptcha::{CaptchaConfig, SESSION_KEY};

#[tokio::test]
async fn test_index_sets_session_cookie() {
    let (port, _) = spawn_server().await;
    let resp = client()
        .get(format!("http://127.0.0.1:{port}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let set_cookie = resp.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("captcha_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let body = resp.text().await.unwrap();
    assert!(body.contains(r#"<img src="/captcha""#));
    assert!(body.contains(r#"name="code""#));
}

#[tokio::test]
async fn test_image_is_never_cached() {
    let (port, _) = spawn_server().await;
    let client = client();
    let url = format!("http://127.0.0.1:{port}/captcha");

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    let headers = first.headers().clone();
    assert_eq!(headers["content-type"], "image/png");
    assert_eq!(headers["expires"], "Thu, 01 Jan 1970 00:00:00 GMT");
    assert_eq!(headers["pragma"], "no-cache");
    assert!(headers.contains_key("last-modified"));
    let cache_control: Vec<_> = headers
        .get_all("cache-control")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(
        cache_control,
        vec![
            "no-store, no-cache, must-revalidate",
            "post-check=0, pre-check=0",
            "max-age=0"
        ]
    );

    let bytes = first.bytes().await.unwrap();
    assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);

    let second = client.get(&url).send().await.unwrap();
    assert_ne!(headers["etag"], second.headers()["etag"]);
}

#[tokio::test]
async fn test_check_flow() {
    let (port, state) = spawn_server().await;
    let client = client();

    let resp = client
        .get(format!("http://127.0.0.1:{port}/captcha"))
        .send()
        .await
        .unwrap();
    let cookie = session_cookie(&resp).unwrap();
    let _ = resp.bytes().await.unwrap();

    let answer = state
        .sessions()
        .get(session_id(&cookie), SESSION_KEY)
        .unwrap();

    let resp = client
        .post(format!("http://127.0.0.1:{port}/"))
        .header("Cookie", &cookie)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(format!("code={}&test=Check", answer.to_uppercase()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("OK!"));

    let resp = client
        .post(format!("http://127.0.0.1:{port}/"))
        .header("Cookie", &cookie)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("code=wrong&test=Check")
        .send()
        .await
        .unwrap();
    assert!(resp.text().await.unwrap().contains("KO..."));
}

#[tokio::test]
async fn test_check_without_session_fails() {
    let (port, _) = spawn_server().await;
    let resp = client()
        .post(format!("http://127.0.0.1:{port}/"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("code=abcdef&test=Check")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("KO..."));
}

#[tokio::test]
async fn test_reload_redirects() {
    let (port, _) = spawn_server().await;
    let resp = client()
        .post(format!("http://127.0.0.1:{port}/"))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body("code=&reload=Reload")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/");
}

#[tokio::test]
async fn test_pipeline_failure_is_500() {
    let config = CaptchaConfig {
        width: 0,
        ..test_config()
    };
    let (port, _) = spawn_server_with(config).await;
    let resp = client()
        .get(format!("http://127.0.0.1:{port}/captcha"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    assert_eq!(resp.headers()["content-type"], "text/plain");
}

#[tokio::test]
async fn test_unknown_route() {
    let (port, _) = spawn_server().await;
    let resp = client()
        .get(format!("http://127.0.0.1:{port}/admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
