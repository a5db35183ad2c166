use axum::http::{self, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use mock_server::{app, ADMIN, PASSWORD, RESELLER, USER};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn basic(username: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{PASSWORD}")))
}

fn legacy_request(method: &str, uri: &str, username: &str, form: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, basic(username))
        .body(form.to_string())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- legacy ---

#[tokio::test]
async fn login_test_accepts_valid_credentials() {
    let resp = app()
        .oneshot(legacy_request("GET", "/CMD_API_LOGIN_TEST?json=yes", USER, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], "Login OK");
}

#[tokio::test]
async fn login_test_rejects_bad_password_with_envelope() {
    let request = Request::builder()
        .uri("/CMD_API_LOGIN_TEST?json=yes")
        .header(
            http::header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("bob:wrong")),
        )
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(request).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn login_as_reads_the_target_config() {
    let resp = app()
        .oneshot(legacy_request(
            "GET",
            "/CMD_API_SHOW_USER_CONFIG?json=yes",
            &format!("{RESELLER}|{USER}"),
            "",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let config = body_json(resp).await;
    assert_eq!(config["username"], USER);
    assert_eq!(config["usertype"], "user");
    assert_eq!(config["creator"], RESELLER);
}

#[tokio::test]
async fn reseller_lists_only_its_users() {
    let resp = app()
        .oneshot(legacy_request("GET", "/CMD_API_SHOW_USERS?json=yes", RESELLER, ""))
        .await
        .unwrap();

    assert_eq!(body_json(resp).await, serde_json::json!([USER]));
}

#[tokio::test]
async fn create_account_then_duplicate_fails() {
    let form = "action=create&username=carol&passwd=pw&passwd2=pw&domain=carol.example&email=c%40carol.example&package=default&ip=10.0.0.9&notify=no";
    let app = app();

    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/CMD_API_ACCOUNT_USER?action=create&json=yes", RESELLER, form))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "User carol created");

    let resp = app
        .oneshot(legacy_request("POST", "/CMD_API_ACCOUNT_USER?action=create&json=yes", RESELLER, form))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Unable to Create User");
    assert_eq!(body["result"], "That username already exists");
}

#[tokio::test]
async fn user_cannot_create_accounts() {
    let resp = app()
        .oneshot(legacy_request(
            "POST",
            "/CMD_API_ACCOUNT_USER?json=yes",
            USER,
            "username=x&passwd=p&passwd2=p",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn suspend_and_unsuspend_report_distinct_results() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/CMD_API_SELECT_USERS?json=yes", RESELLER, "suspend=Suspend&select0=bob"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "User suspended");

    let resp = app
        .clone()
        .oneshot(legacy_request("GET", "/CMD_API_LOGIN_TEST?json=yes", USER, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(legacy_request("POST", "/CMD_API_SELECT_USERS?json=yes", RESELLER, "suspend=Unsuspend&select0=bob"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "User unsuspended");
}

#[tokio::test]
async fn dns_add_then_delete_by_selector() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(legacy_request(
            "POST",
            "/CMD_API_DNS_CONTROL?action=add&action_pointers=yes&json=yes",
            USER,
            "domain=bob.example&name=mail&ttl=300&type=A&value=10.0.0.2",
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "Record Added");

    let resp = app
        .clone()
        .oneshot(legacy_request(
            "POST",
            "/CMD_API_DNS_CONTROL?action=select&delete=yes&json=yes",
            USER,
            "domain=bob.example&arecs0=name%3Dmail%26value%3D10.0.0.2",
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "Records Deleted");

    let resp = app
        .oneshot(legacy_request("GET", "/CMD_API_DNS_CONTROL?domain=bob.example&json=yes", USER, ""))
        .await
        .unwrap();
    let records = body_json(resp).await;
    assert_eq!(records["records"].as_array().unwrap().len(), 1);
    assert_eq!(records["records"][0]["name"], "www");
}

#[tokio::test]
async fn dns_of_foreign_domain_is_refused() {
    let resp = app()
        .oneshot(legacy_request("GET", "/CMD_API_DNS_CONTROL?domain=res.example&json=yes", USER, ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["error"], "Cannot view DNS");
}

#[tokio::test]
async fn system_info_uses_legacy_field_names() {
    let resp = app()
        .oneshot(legacy_request("GET", "/CMD_API_SYSTEM_INFO?json=yes", USER, ""))
        .await
        .unwrap();

    let info = body_json(resp).await;
    assert_eq!(info["numcpus"], "2");
    assert_eq!(info["cpus"]["0"]["vendor_id"], "GenuineIntel");
    assert_eq!(info["services"]["exim"]["info_str"], "running");
}

#[tokio::test]
async fn forwarders_are_created_modified_and_deleted() {
    let app = app();
    let uri = |action: &str| format!("/CMD_API_EMAIL_FORWARDERS?action={action}&json=yes");

    let resp = app
        .clone()
        .oneshot(legacy_request("POST", &uri("create"), USER, "domain=bob.example&user=sales&email=a%40x.example%2Cb%40x.example"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "Forwarder created");

    let resp = app
        .clone()
        .oneshot(legacy_request("POST", &uri("modify"), USER, "domain=bob.example&user=sales&email=c%40x.example"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "Forwarder updated");

    let resp = app
        .clone()
        .oneshot(legacy_request("GET", "/CMD_API_EMAIL_FORWARDERS?domain=bob.example&json=yes", USER, ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, serde_json::json!({"sales": ["c@x.example"]}));

    let resp = app
        .oneshot(legacy_request("POST", &uri("delete"), USER, "domain=bob.example&select0=sales"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "Forwarders deleted");
}

#[tokio::test]
async fn restore_needs_an_existing_archive() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/CMD_SITE_BACKUP?json=yes", USER, "action=backup&domain=bob.example&form_version=4&select0=domain"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "Backup creation added to queue");

    let resp = app
        .clone()
        .oneshot(legacy_request("GET", "/CMD_SITE_BACKUP?domain=bob.example&ipp=50&json=yes", USER, ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, serde_json::json!(["backup-bob-1.tar.zst"]));

    let resp = app
        .oneshot(legacy_request("POST", "/CMD_SITE_BACKUP?json=yes", USER, "action=restore&domain=bob.example&file=other.tar.zst&form_version=3&select0=domain"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["error"], "Cannot restore backup");
}

#[tokio::test]
async fn certificate_needs_a_hostname() {
    let resp = app()
        .oneshot(legacy_request("POST", "/CMD_API_SSL?json=yes", USER, "action=save&domain=bob.example&name="))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["result"], "no hostnames selected");
}

#[tokio::test]
async fn php_selector_moves_the_selected_slot() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/CMD_API_DOMAIN?json=yes", USER, "action=php_selector&domain=bob.example&php1_select=2&save=yes"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "PHP versions saved");

    let resp = app
        .oneshot(legacy_request("GET", "/CMD_API_ADDITIONAL_DOMAINS?domain=bob.example&action=view&json=yes", USER, ""))
        .await
        .unwrap();
    let view = body_json(resp).await;
    assert_eq!(view["php1_select"]["0"]["selected"], "no");
    assert_eq!(view["php1_select"]["1"]["selected"], "yes");
    assert_eq!(view["php2_ver"], "8.3");
}

#[tokio::test]
async fn account_without_package_name_gets_custom_limits() {
    let form = "action=create&username=dave&passwd=secret&passwd2=secret&domain=dave.example&email=d%40dave.example&bandwidth=1000&quota=500&ip=10.0.0.9&notify=no";
    let app = app();
    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/CMD_API_ACCOUNT_USER?action=create&json=yes", RESELLER, form))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["success"], "User dave created");

    let resp = app
        .oneshot(legacy_request("GET", "/CMD_API_SHOW_USER_CONFIG?json=yes", "dave", ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["package"], "custom");
}

// --- modern ---

#[tokio::test]
async fn login_sets_session_and_csrf_cookies() {
    let resp = app()
        .oneshot(json_request("POST", "/api/login", r#"{"username":"bob","password":"secret"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookies: Vec<String> = resp
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("session=")));
    assert!(cookies.iter().any(|c| c.starts_with("csrftoken=")));
    let body = body_json(resp).await;
    assert!(!body["sessionID"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn bad_login_returns_modern_error() {
    let resp = app()
        .oneshot(json_request("POST", "/api/login", r#"{"username":"bob","password":"nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["type"], "UNAUTHORIZED");
}

#[tokio::test]
async fn session_post_without_csrf_is_forbidden() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/login", r#"{"username":"res","password":"secret"}"#))
        .await
        .unwrap();
    let session = body_json(resp).await["sessionID"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("POST")
        .uri("/api/session/login-as/switch")
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::COOKIE, format!("session={session}"))
        .body(r#"{"username":"bob"}"#.to_string())
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["type"], "CSRF_FAILED");
}

#[tokio::test]
async fn database_names_need_the_account_prefix() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/api/db-manage/create-db", USER, r#"{"database":"shop"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/api/db-manage/create-db", USER, r#"{"database":"bob_shop"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = app
        .oneshot(legacy_request("GET", "/api/db-show/databases", USER, ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, serde_json::json!([{"database": "bob_shop"}]));
}

#[tokio::test]
async fn modern_user_config_uses_camel_case() {
    let resp = app()
        .oneshot(legacy_request("GET", "/api/users/bob/config", RESELLER, ""))
        .await
        .unwrap();

    let config = body_json(resp).await;
    assert_eq!(config["userType"], "User");
    assert_eq!(config["ipAddresses"], serde_json::json!(["10.0.0.1"]));
}

#[tokio::test]
async fn database_processes_are_admin_only() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(legacy_request("GET", "/api/db-monitor/processes", USER, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .oneshot(legacy_request("GET", "/api/db-monitor/processes", ADMIN, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, serde_json::json!([]));
}

#[tokio::test]
async fn wordpress_install_paths_must_be_relative() {
    let app = app();
    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/api/wordpress/install-quick", USER, r#"{"filePath":"/public_html"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(legacy_request("POST", "/api/wordpress/install-quick", USER, r#"{"filePath":"public_html","title":"Blog"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(legacy_request("GET", "/api/wordpress/locations", USER, ""))
        .await
        .unwrap();
    let locations = body_json(resp).await;
    assert_eq!(locations[0]["filePath"], "public_html");
    assert_eq!(locations[0]["wordpress"]["title"], "Blog");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app()
        .oneshot(Request::builder().uri("/CMD_NOPE").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
