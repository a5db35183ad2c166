//! In-memory fake of a DirectAdmin panel.
//!
//! Serves the subset of legacy `CMD_*` commands and `/api/*` endpoints the
//! client's integration tests drive, with the panel's authentication rules:
//! basic auth (including `actor|target` login-as), session cookies issued by
//! `POST /api/login`, and a CSRF token required on state-changing calls that
//! ride a session.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Password of every seeded account.
pub const PASSWORD: &str = "secret";
pub const ADMIN: &str = "admin";
pub const RESELLER: &str = "res";
pub const USER: &str = "bob";

pub const SESSION_COOKIE: &str = "session";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "x-csrftoken";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
    /// `admin`, `reseller` or `user`, as the legacy config spells it.
    pub usertype: String,
    pub creator: String,
    pub domain: String,
    pub email: String,
    pub package: String,
    pub ip: String,
    pub suspended: bool,
}

impl Account {
    fn new(username: &str, usertype: &str, creator: &str) -> Self {
        let domain = format!("{username}.example");
        Account {
            username: username.to_string(),
            password: PASSWORD.to_string(),
            usertype: usertype.to_string(),
            creator: creator.to_string(),
            email: format!("{username}@{domain}"),
            domain,
            package: "default".to_string(),
            ip: "10.0.0.1".to_string(),
            suspended: false,
        }
    }

    fn is_admin(&self) -> bool {
        self.usertype == "admin"
    }

    fn can_manage_users(&self) -> bool {
        matches!(self.usertype.as_str(), "admin" | "reseller")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub name: String,
    pub ttl: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Clone, Debug)]
struct PanelSession {
    username: String,
    csrf: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPressSite {
    pub id: String,
    pub file_path: String,
    pub title: String,
}

#[derive(Debug, Default)]
pub struct Panel {
    pub accounts: HashMap<String, Account>,
    pub dns: HashMap<String, Vec<DnsRecord>>,
    pub databases: HashMap<String, Vec<String>>,
    /// Per domain, local part to destinations.
    pub forwarders: HashMap<String, BTreeMap<String, Vec<String>>>,
    /// Per domain, archive names in creation order.
    pub backups: HashMap<String, Vec<String>>,
    /// Per domain, the hostnames of the last issued certificate.
    pub certificates: HashMap<String, Vec<String>>,
    /// Per domain, the selected PHP slot (1-based).
    pub php_slots: HashMap<String, usize>,
    /// Per account, WordPress installs.
    pub wordpress: HashMap<String, Vec<WordPressSite>>,
    sessions: HashMap<String, PanelSession>,
}

impl Panel {
    /// One admin, one reseller created by it, and one user created by the
    /// reseller. Each account owns `{username}.example` with an `A` record.
    pub fn seeded() -> Self {
        let mut panel = Panel::default();
        for account in [
            Account::new(ADMIN, "admin", ADMIN),
            Account::new(RESELLER, "reseller", ADMIN),
            Account::new(USER, "user", RESELLER),
        ] {
            panel.dns.insert(
                account.domain.clone(),
                vec![DnsRecord {
                    name: "www".to_string(),
                    ttl: "3600".to_string(),
                    kind: "A".to_string(),
                    value: account.ip.clone(),
                }],
            );
            panel.accounts.insert(account.username.clone(), account);
        }
        panel
    }

    /// Whether `actor` may act as, or manage, `target`.
    fn controls(&self, actor: &str, target: &str) -> bool {
        if actor == target {
            return true;
        }
        match (self.accounts.get(actor), self.accounts.get(target)) {
            (Some(actor), Some(target)) => actor.is_admin() || target.creator == actor.username,
            _ => false,
        }
    }

    fn check_password(&self, username: &str, password: &str) -> bool {
        self.accounts
            .get(username)
            .is_some_and(|account| account.password == password && !account.suspended)
    }
}

pub type Db = Arc<RwLock<Panel>>;

pub fn app() -> Router {
    app_with(Panel::seeded())
}

pub fn app_with(panel: Panel) -> Router {
    let db: Db = Arc::new(RwLock::new(panel));
    Router::new()
        .route("/CMD_API_LOGIN_TEST", get(login_test))
        .route("/CMD_API_SHOW_USER_CONFIG", get(show_user_config))
        .route("/CMD_API_SHOW_USERS", get(show_users))
        .route("/CMD_API_SHOW_ALL_USERS", get(show_all_users))
        .route("/CMD_API_SHOW_DOMAINS", get(show_domains))
        .route("/CMD_API_ACCOUNT_USER", post(create_account))
        .route("/CMD_API_SELECT_USERS", post(select_users))
        .route("/CMD_API_DNS_CONTROL", get(list_dns).post(change_dns))
        .route("/CMD_API_SYSTEM_INFO", get(system_info))
        .route("/CMD_API_EMAIL_FORWARDERS", get(list_forwarders).post(change_forwarders))
        .route("/CMD_SITE_BACKUP", get(list_backups).post(site_backup))
        .route("/CMD_API_SSL", post(issue_ssl))
        .route("/CMD_API_ADDITIONAL_DOMAINS", get(view_domain))
        .route("/CMD_API_DOMAIN", post(select_php))
        .route("/api/login", post(login))
        .route("/api/session", get(session_info))
        .route("/api/session/login-as/switch", post(switch_session))
        .route("/api/info", get(info))
        .route("/api/users/{username}/config", get(user_config))
        .route("/api/db-show/databases", get(list_databases))
        .route("/api/db-manage/create-db", post(create_database))
        .route("/api/db-monitor/processes", get(database_processes))
        .route("/api/plugins/list", get(plugins))
        .route("/api/wordpress/locations", get(wordpress_locations))
        .route("/api/wordpress/locations/{id}", delete(delete_wordpress))
        .route("/api/wordpress/install-quick", post(install_wordpress_quick))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock panel listening");
    }
    axum::serve(listener, app()).await
}

// --- responses ---

fn legacy_success(message: impl Into<String>) -> Response {
    Json(json!({"success": message.into(), "result": ""})).into_response()
}

fn legacy_error(status: StatusCode, error: &str, result: &str) -> Response {
    (status, Json(json!({"error": error, "result": result}))).into_response()
}

fn modern_error(status: StatusCode, kind: &str, message: &str) -> Response {
    (status, Json(json!({"type": kind, "message": message}))).into_response()
}

// --- authentication ---

enum Denied {
    Unauthorized,
    Csrf,
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find_map(|(key, value)| (key == name).then_some(value))
}

fn basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Resolve the account a request acts as.
///
/// A known session cookie wins over basic auth. Sessions must echo their
/// CSRF token on every method other than GET.
fn authenticate(panel: &Panel, method: &Method, headers: &HeaderMap) -> Result<String, Denied> {
    if let Some(session) = cookie(headers, SESSION_COOKIE).and_then(|id| panel.sessions.get(id)) {
        if *method != Method::GET {
            let token = headers.get(CSRF_HEADER).and_then(|value| value.to_str().ok());
            if token != Some(session.csrf.as_str()) {
                return Err(Denied::Csrf);
            }
        }
        return Ok(session.username.clone());
    }

    let (username, password) = basic_auth(headers).ok_or(Denied::Unauthorized)?;
    let (actor, target) = match username.split_once('|') {
        Some((actor, target)) => (actor, target),
        None => (username.as_str(), username.as_str()),
    };
    if !panel.check_password(actor, &password) || !panel.controls(actor, target) {
        return Err(Denied::Unauthorized);
    }
    Ok(target.to_string())
}

fn legacy_denied(denied: Denied) -> Response {
    match denied {
        Denied::Unauthorized => legacy_error(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "invalid username or password",
        ),
        Denied::Csrf => legacy_error(StatusCode::FORBIDDEN, "Forbidden", "missing CSRF token"),
    }
}

fn modern_denied(denied: Denied) -> Response {
    match denied {
        Denied::Unauthorized => modern_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "invalid username or password",
        ),
        Denied::Csrf => modern_error(StatusCode::FORBIDDEN, "CSRF_FAILED", "missing CSRF token"),
    }
}

fn form_fields(body: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

/// `{prefix}0..N` values in index order.
fn indexed<'a>(fields: &'a HashMap<String, String>, prefix: &str) -> Vec<&'a str> {
    (0..)
        .map_while(|index| fields.get(&format!("{prefix}{index}")))
        .map(String::as_str)
        .collect()
}

// --- legacy commands ---

async fn login_test(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    match authenticate(&panel, &method, &headers) {
        Ok(_) => legacy_success("Login OK"),
        Err(denied) => legacy_denied(denied),
    }
}

async fn show_user_config(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let Some(account) = panel.accounts.get(&username) else {
        return legacy_error(StatusCode::NOT_FOUND, "Unknown user", &username);
    };
    Json(json!({
        "username": account.username,
        "usertype": account.usertype,
        "creator": account.creator,
        "domain": account.domain,
        "email": account.email,
        "package": account.package,
        "ips": account.ip,
        "suspended": if account.suspended { "yes" } else { "no" },
        "date_created": "Mon Dec  2 03:18:43 2019",
        "ssl": "ON",
        "php": "ON",
    }))
    .into_response()
}

async fn show_users(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let mut users: Vec<&str> = panel
        .accounts
        .values()
        .filter(|account| account.creator == username && account.username != username)
        .map(|account| account.username.as_str())
        .collect();
    users.sort_unstable();
    Json(users).into_response()
}

async fn show_all_users(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    if !panel.accounts.get(&username).is_some_and(Account::is_admin) {
        return legacy_denied(Denied::Unauthorized);
    }
    let mut users: Vec<&str> = panel.accounts.keys().map(String::as_str).collect();
    users.sort_unstable();
    Json(users).into_response()
}

async fn show_domains(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let domains: Vec<&str> = panel
        .accounts
        .get(&username)
        .map(|account| account.domain.as_str())
        .into_iter()
        .collect();
    Json(domains).into_response()
}

async fn create_account(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut panel = db.write().await;
    let creator = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    if !panel.accounts.get(&creator).is_some_and(Account::can_manage_users) {
        return legacy_denied(Denied::Unauthorized);
    }

    let fields = form_fields(&body);
    let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
    let username = field("username");
    if username.is_empty() || field("passwd") != field("passwd2") {
        return legacy_error(StatusCode::OK, "Unable to Create User", "invalid username or password");
    }
    if panel.accounts.contains_key(&username) {
        return legacy_error(StatusCode::OK, "Unable to Create User", "That username already exists");
    }

    let account = Account {
        username: username.clone(),
        password: field("passwd"),
        usertype: "user".to_string(),
        creator,
        domain: field("domain"),
        email: field("email"),
        // Without a named package the limits arrive inline.
        package: match fields.get("package") {
            Some(package) => package.clone(),
            None if fields.contains_key("bandwidth") => "custom".to_string(),
            None => return legacy_error(StatusCode::OK, "Unable to Create User", "no package given"),
        },
        ip: field("ip"),
        suspended: false,
    };
    debug!(username = %account.username, creator = %account.creator, "account created");
    panel.dns.entry(account.domain.clone()).or_default();
    panel.accounts.insert(username.clone(), account);
    legacy_success(format!("User {username} created"))
}

async fn select_users(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut panel = db.write().await;
    let actor = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };

    let fields = form_fields(&body);
    let selected: Vec<String> = indexed(&fields, "select").into_iter().map(str::to_string).collect();
    if selected.is_empty() {
        return legacy_error(StatusCode::OK, "No users selected", "");
    }
    if let Some(name) = selected.iter().find(|name| actor == **name || !panel.controls(&actor, name)) {
        return legacy_error(StatusCode::OK, "Cannot modify user", name);
    }

    if fields.get("delete").map(String::as_str) == Some("yes") {
        if fields.get("confirmed").map(String::as_str) != Some("Confirm") {
            return legacy_error(StatusCode::OK, "Deletion not confirmed", "");
        }
        for name in &selected {
            panel.accounts.remove(name);
        }
        return legacy_success("User deleted");
    }

    let suspend = match fields.get("suspend").map(String::as_str) {
        Some("Suspend") => true,
        Some("Unsuspend") => false,
        _ => return legacy_error(StatusCode::OK, "Unknown action", ""),
    };
    for name in &selected {
        if let Some(account) = panel.accounts.get_mut(name) {
            account.suspended = suspend;
        }
    }
    legacy_success(if suspend { "User suspended" } else { "User unsuspended" })
}

fn owns_domain(panel: &Panel, username: &str, domain: &str) -> bool {
    panel
        .accounts
        .get(username)
        .is_some_and(|account| account.domain == domain)
}

async fn list_dns(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let domain = query.get("domain").cloned().unwrap_or_default();
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot view DNS", "You do not own that domain");
    }
    let records = panel.dns.get(&domain).cloned().unwrap_or_default();
    Json(json!({ "records": records })).into_response()
}

async fn change_dns(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut panel = db.write().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let fields = form_fields(&body);
    let domain = fields.get("domain").cloned().unwrap_or_default();
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot modify DNS", "You do not own that domain");
    }
    let records = panel.dns.entry(domain).or_default();

    match query.get("action").map(String::as_str) {
        Some("add") => {
            let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
            records.push(DnsRecord {
                name: field("name"),
                ttl: field("ttl"),
                kind: field("type"),
                value: field("value"),
            });
            legacy_success("Record Added")
        }
        Some("select") if query.get("delete").map(String::as_str) == Some("yes") => {
            let before = records.len();
            records.retain(|record| {
                let prefix = format!("{}recs", record.kind.to_lowercase());
                let selector = format!("name={}&value={}", record.name, record.value);
                !indexed(&fields, &prefix).contains(&selector.as_str())
            });
            if records.len() == before {
                return legacy_error(StatusCode::OK, "Cannot delete records", "no matching records");
            }
            legacy_success("Records Deleted")
        }
        _ => legacy_error(StatusCode::BAD_REQUEST, "Unknown action", ""),
    }
}

/// Installed PHP builds, one per selector slot.
const PHP_SLOTS: [&str; 2] = ["8.2", "8.3"];

async fn system_info(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    if let Err(denied) = authenticate(&panel, &method, &headers) {
        return legacy_denied(denied);
    }
    Json(json!({
        "numcpus": "2",
        "cpus": {
            "0": {"mhz": "2399.998", "model_name": "Mock CPU", "vendor_id": "GenuineIntel"},
            "1": {"mhz": "2399.998", "model_name": "Mock CPU", "vendor_id": "GenuineIntel"}
        },
        "load": {"load_1": "0.15", "load_5": "0.10", "load_15": "0.05"},
        "mem_info": {"MemTotal": "4015636", "MemFree": "1024000", "Active(anon)": "512000"},
        "services": {
            "directadmin": {"info_str": "running", "name": "DirectAdmin", "version": "1.66"},
            "exim": {"info_str": "running", "name": "Exim", "version": "4.97"}
        },
        "uptime_info": {
            "days": "3",
            "hours": "4",
            "minutes": "5",
            "total_seconds": "273900",
            "uptime": "3 days, 4:05"
        }
    }))
    .into_response()
}

async fn list_forwarders(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let domain = query.get("domain").cloned().unwrap_or_default();
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot view forwarders", "You do not own that domain");
    }
    Json(panel.forwarders.get(&domain).cloned().unwrap_or_default()).into_response()
}

async fn change_forwarders(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut panel = db.write().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let fields = form_fields(&body);
    let domain = fields.get("domain").cloned().unwrap_or_default();
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot modify forwarders", "You do not own that domain");
    }
    let forwarders = panel.forwarders.entry(domain).or_default();
    let user = fields.get("user").cloned().unwrap_or_default();
    let destinations = || -> Vec<String> {
        fields
            .get("email")
            .map(|list| list.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    };

    match query.get("action").map(String::as_str) {
        Some("create") if forwarders.contains_key(&user) => {
            legacy_error(StatusCode::OK, "Cannot create forwarder", "That forwarder already exists")
        }
        Some("create") => {
            forwarders.insert(user, destinations());
            legacy_success("Forwarder created")
        }
        Some("modify") => match forwarders.get_mut(&user) {
            Some(existing) => {
                *existing = destinations();
                legacy_success("Forwarder updated")
            }
            None => legacy_error(StatusCode::OK, "Cannot update forwarder", "no such forwarder"),
        },
        Some("delete") => {
            let selected = indexed(&fields, "select");
            if selected.is_empty() {
                return legacy_error(StatusCode::OK, "No forwarders selected", "");
            }
            for name in selected {
                forwarders.remove(name);
            }
            legacy_success("Forwarders deleted")
        }
        _ => legacy_error(StatusCode::BAD_REQUEST, "Unknown action", ""),
    }
}

async fn list_backups(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let domain = query.get("domain").cloned().unwrap_or_default();
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot view backups", "You do not own that domain");
    }
    let per_page = query.get("ipp").and_then(|ipp| ipp.parse().ok()).unwrap_or(usize::MAX);
    let backups: Vec<&String> = panel
        .backups
        .get(&domain)
        .into_iter()
        .flatten()
        .take(per_page)
        .collect();
    Json(backups).into_response()
}

async fn site_backup(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut panel = db.write().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let fields = form_fields(&body);
    let domain = fields.get("domain").cloned().unwrap_or_default();
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot manage backups", "You do not own that domain");
    }
    if indexed(&fields, "select").is_empty() {
        return legacy_error(StatusCode::OK, "No items selected", "");
    }
    let backups = panel.backups.entry(domain).or_default();

    match fields.get("action").map(String::as_str) {
        Some("backup") => {
            backups.push(format!("backup-{}-{}.tar.zst", username, backups.len() + 1));
            legacy_success("Backup creation added to queue")
        }
        Some("restore") => {
            let file = fields.get("file").cloned().unwrap_or_default();
            if !backups.contains(&file) {
                return legacy_error(StatusCode::OK, "Cannot restore backup", "no such file");
            }
            legacy_success("Restore will run in the background")
        }
        _ => legacy_error(StatusCode::BAD_REQUEST, "Unknown action", ""),
    }
}

async fn issue_ssl(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut panel = db.write().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let fields = form_fields(&body);
    let domain = fields.get("domain").cloned().unwrap_or_default();
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot issue certificate", "You do not own that domain");
    }
    let hostnames: Vec<String> = indexed(&fields, "le_select").into_iter().map(str::to_string).collect();
    if let Some(foreign) = hostnames.iter().find(|name| !name.ends_with(domain.as_str())) {
        return legacy_error(StatusCode::OK, "Cannot issue certificate", foreign);
    }
    if hostnames.is_empty() || fields.get("name") != hostnames.first() {
        return legacy_error(StatusCode::OK, "Cannot issue certificate", "no hostnames selected");
    }
    panel.certificates.insert(domain, hostnames);
    legacy_success("Certificate and Key Saved.")
}

async fn view_domain(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let domain = query.get("domain").cloned().unwrap_or_default();
    if query.get("action").map(String::as_str) != Some("view") {
        return legacy_error(StatusCode::BAD_REQUEST, "Unknown action", "");
    }
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot view domain", "You do not own that domain");
    }
    let selected = panel.php_slots.get(&domain).copied().unwrap_or(1);
    let mut view = json!({"domain": domain, "has_php_selector": "yes"});
    let options: serde_json::Map<String, Value> = PHP_SLOTS
        .iter()
        .enumerate()
        .map(|(index, version)| {
            let slot = index + 1;
            view[format!("php{slot}_ver")] = json!(version);
            let option = json!({
                "value": slot.to_string(),
                "selected": if slot == selected { "yes" } else { "no" },
                "text": format!("PHP {version}"),
            });
            (index.to_string(), option)
        })
        .collect();
    view["php1_select"] = Value::Object(options);
    Json(view).into_response()
}

async fn select_php(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut panel = db.write().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return legacy_denied(denied),
    };
    let fields = form_fields(&body);
    let domain = fields.get("domain").cloned().unwrap_or_default();
    if fields.get("action").map(String::as_str) != Some("php_selector") {
        return legacy_error(StatusCode::BAD_REQUEST, "Unknown action", "");
    }
    if !owns_domain(&panel, &username, &domain) {
        return legacy_error(StatusCode::OK, "Cannot modify domain", "You do not own that domain");
    }
    let slot = fields.get("php1_select").and_then(|slot| slot.parse::<usize>().ok());
    match slot {
        Some(slot) if (1..=PHP_SLOTS.len()).contains(&slot) => {
            panel.php_slots.insert(domain, slot);
            legacy_success("PHP versions saved")
        }
        _ => legacy_error(StatusCode::OK, "Cannot set PHP version", "no such PHP version"),
    }
}

// --- modern endpoints ---

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct SwitchRequest {
    username: String,
}

async fn login(State(db): State<Db>, Json(input): Json<LoginRequest>) -> Response {
    let mut panel = db.write().await;
    if !panel.check_password(&input.username, &input.password) {
        return modern_denied(Denied::Unauthorized);
    }

    let id = Uuid::new_v4().simple().to_string();
    let csrf = Uuid::new_v4().simple().to_string();
    panel.sessions.insert(
        id.clone(),
        PanelSession {
            username: input.username.clone(),
            csrf: csrf.clone(),
        },
    );
    info!(username = %input.username, "session created");

    let mut response = Json(json!({ "sessionID": id })).into_response();
    for cookie in [
        format!("{CSRF_COOKIE}={csrf}; Path=/"),
        format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly"),
    ] {
        if let Ok(value) = cookie.parse() {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

async fn session_info(State(db): State<Db>, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let Some(id) = cookie(&headers, SESSION_COOKIE) else {
        return modern_error(StatusCode::UNAUTHORIZED, "NO_SESSION", "no session");
    };
    let Some(session) = panel.sessions.get(id) else {
        return modern_error(StatusCode::UNAUTHORIZED, "NO_SESSION", "unknown session");
    };
    let role = panel
        .accounts
        .get(&session.username)
        .map(|account| account.usertype.clone())
        .unwrap_or_default();
    Json(json!({
        "sessionID": id,
        "effectiveUsername": session.username,
        "effectiveRole": role,
        "homeDir": format!("/home/{}", session.username),
    }))
    .into_response()
}

async fn switch_session(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Json(input): Json<SwitchRequest>,
) -> Response {
    let mut panel = db.write().await;
    let actor = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    if !panel.controls(&actor, &input.username) {
        return modern_error(StatusCode::FORBIDDEN, "FORBIDDEN", "cannot log in as that user");
    }
    let Some(id) = cookie(&headers, SESSION_COOKIE).map(str::to_string) else {
        return modern_error(StatusCode::UNAUTHORIZED, "NO_SESSION", "no session");
    };
    if let Some(session) = panel.sessions.get_mut(&id) {
        session.username = input.username;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn info() -> Json<Value> {
    Json(json!({
        "hostname": "panel.example",
        "languages": ["en"],
        "licenseValid": true,
        "otpTrustDays": 30,
    }))
}

async fn user_config(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Path(target): Path<String>,
) -> Response {
    let panel = db.read().await;
    let actor = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    if !panel.controls(&actor, &target) {
        return modern_error(StatusCode::FORBIDDEN, "FORBIDDEN", "not your user");
    }
    let Some(account) = panel.accounts.get(&target) else {
        return modern_error(StatusCode::NOT_FOUND, "NOT_FOUND", "no such user");
    };
    let mut role = account.usertype.clone();
    if let Some(first) = role.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Json(json!({
        "username": account.username,
        "userType": role,
        "creator": account.creator,
        "domain": account.domain,
        "email": account.email,
        "package": account.package,
        "ipAddresses": [account.ip],
        "suspended": account.suspended,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct CreateDatabase {
    database: String,
}

async fn list_databases(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    let databases: Vec<Value> = panel
        .databases
        .get(&username)
        .into_iter()
        .flatten()
        .map(|name| json!({ "database": name }))
        .collect();
    Json(databases).into_response()
}

async fn create_database(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Json(input): Json<CreateDatabase>,
) -> Response {
    let mut panel = db.write().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    if !input.database.starts_with(&format!("{username}_")) {
        return modern_error(
            StatusCode::BAD_REQUEST,
            "INVALID_NAME",
            "database names must start with the account name",
        );
    }
    let databases = panel.databases.entry(username).or_default();
    if databases.contains(&input.database) {
        return modern_error(StatusCode::CONFLICT, "ALREADY_EXISTS", "database already exists");
    }
    databases.push(input.database);
    StatusCode::NO_CONTENT.into_response()
}

async fn database_processes(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    if !panel.accounts.get(&username).is_some_and(Account::is_admin) {
        return modern_error(StatusCode::FORBIDDEN, "FORBIDDEN", "administrators only");
    }
    let processes: Vec<Value> = panel
        .databases
        .iter()
        .flat_map(|(owner, databases)| databases.iter().map(move |database| (owner, database)))
        .enumerate()
        .map(|(index, (owner, database))| {
            json!({
                "id": index + 1,
                "user": owner,
                "host": "localhost",
                "database": database,
                "command": "Sleep",
                "time": 0,
                "state": "",
                "info": "",
            })
        })
        .collect();
    Json(processes).into_response()
}

async fn plugins(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    let role = panel
        .accounts
        .get(&username)
        .map(|account| account.usertype.clone())
        .unwrap_or_default();
    Json(json!([{
        "id": "softaculous",
        "role": role,
        "menuEntry": {"title": "Softaculous", "url": "/CMD_PLUGINS/softaculous", "icon": ""}
    }]))
    .into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuickInstall {
    file_path: String,
    #[serde(default)]
    title: String,
}

async fn wordpress_locations(State(db): State<Db>, method: Method, headers: HeaderMap) -> Response {
    let panel = db.read().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    let locations: Vec<Value> = panel
        .wordpress
        .get(&username)
        .into_iter()
        .flatten()
        .map(|site| {
            json!({
                "id": site.id,
                "filePath": site.file_path,
                "wordpress": {"title": site.title, "version": "6.5"}
            })
        })
        .collect();
    Json(locations).into_response()
}

async fn install_wordpress_quick(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Json(input): Json<QuickInstall>,
) -> Response {
    let mut panel = db.write().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    if input.file_path.starts_with('/') {
        return modern_error(StatusCode::BAD_REQUEST, "INVALID_PATH", "path must be relative");
    }
    let sites = panel.wordpress.entry(username).or_default();
    sites.push(WordPressSite {
        id: Uuid::new_v4().simple().to_string(),
        file_path: input.file_path,
        title: input.title,
    });
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_wordpress(
    State(db): State<Db>,
    method: Method,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut panel = db.write().await;
    let username = match authenticate(&panel, &method, &headers) {
        Ok(username) => username,
        Err(denied) => return modern_denied(denied),
    };
    let sites = panel.wordpress.entry(username).or_default();
    let before = sites.len();
    sites.retain(|site| site.id != id);
    if sites.len() == before {
        return modern_error(StatusCode::NOT_FOUND, "NOT_FOUND", "no such install");
    }
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), value.parse().unwrap());
        }
        map
    }

    fn basic(username: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
    }

    #[test]
    fn seeded_panel_links_creators() {
        let panel = Panel::seeded();
        assert_eq!(panel.accounts[USER].creator, RESELLER);
        assert!(panel.controls(ADMIN, USER));
        assert!(panel.controls(RESELLER, USER));
        assert!(!panel.controls(USER, RESELLER));
    }

    #[test]
    fn login_as_resolves_to_target() {
        let panel = Panel::seeded();
        let auth = basic(&format!("{RESELLER}|{USER}"), PASSWORD);
        let acting = authenticate(&panel, &Method::GET, &headers(&[(header::AUTHORIZATION, auth.as_str())]));
        assert_eq!(acting.ok().as_deref(), Some(USER));
    }

    #[test]
    fn login_as_requires_control() {
        let panel = Panel::seeded();
        let auth = basic(&format!("{USER}|{RESELLER}"), PASSWORD);
        let acting = authenticate(&panel, &Method::GET, &headers(&[(header::AUTHORIZATION, auth.as_str())]));
        assert!(matches!(acting, Err(Denied::Unauthorized)));
    }

    #[test]
    fn session_post_needs_csrf_header() {
        let mut panel = Panel::seeded();
        panel.sessions.insert(
            "sid".to_string(),
            PanelSession {
                username: USER.to_string(),
                csrf: "tok".to_string(),
            },
        );
        let cookies = headers(&[(header::COOKIE, "csrftoken=tok; session=sid")]);
        assert!(matches!(
            authenticate(&panel, &Method::POST, &cookies),
            Err(Denied::Csrf)
        ));

        let mut with_token = cookies.clone();
        with_token.insert(CSRF_HEADER, "tok".parse().unwrap());
        assert_eq!(
            authenticate(&panel, &Method::POST, &with_token).ok().as_deref(),
            Some(USER)
        );
        assert!(authenticate(&panel, &Method::GET, &cookies).is_ok());
    }

    #[test]
    fn indexed_fields_stop_at_first_gap() {
        let fields = form_fields(b"select0=a&select1=b&select3=d");
        assert_eq!(indexed(&fields, "select"), ["a", "b"]);
    }
}
