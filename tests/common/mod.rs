//! In-process mock of an OpenStack-compatible endpoint, with per-route
//! request counters.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::extract::{Path, Query, Request};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use openstack_session::ConnectionConfig;

pub struct MockOptions {
    /// Version ids advertised by the probe endpoint.
    pub versions: Vec<&'static str>,
    /// Reject the password grant with 401.
    pub fail_auth: bool,
    /// Make the regions listing return 500.
    pub fail_regions: bool,
    /// Serve a server page without the `servers` field.
    pub malformed_servers: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            versions: vec!["v2.0", "v3.6"],
            fail_auth: false,
            fail_regions: false,
            malformed_servers: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct Counters {
    pub total: Arc<AtomicUsize>,
    pub auth: Arc<AtomicUsize>,
    pub regions: Arc<AtomicUsize>,
    pub projects: Arc<AtomicUsize>,
    pub servers: Arc<AtomicUsize>,
    pub images: Arc<AtomicUsize>,
    pub volumes: Arc<AtomicUsize>,
}

impl Counters {
    pub fn auth_calls(&self) -> usize {
        self.auth.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn server_page_calls(&self) -> usize {
        self.servers.load(Ordering::SeqCst)
    }
}

pub struct MockCloud {
    pub addr: SocketAddr,
    pub counters: Counters,
}

impl MockCloud {
    pub async fn spawn(options: MockOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let counters = Counters::default();
        let app = router(addr, options, counters.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, counters }
    }

    /// Connection parameters pointing at this mock, no project scope.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new(
            self.addr.ip().to_string(),
            self.addr.port(),
            "admin",
            "secret",
        )
    }

    /// Connection parameters with a project scope, so authentication returns
    /// the catalog below.
    pub fn scoped_config(&self) -> ConnectionConfig {
        self.config().with_project("p-demo")
    }
}

/// Catalog handed out with project-scoped tokens. Every service URL points
/// back into the mock itself.
fn catalog_for(addr: SocketAddr) -> Value {
    json!([
        {
            "type": "compute",
            "endpoints": [
                {"interface": "admin", "region": "RegionOne", "url": format!("http://{addr}/admin-compute")},
                {"interface": "public", "region": "RegionOne", "url": format!("http://{addr}/compute/v2.1")}
            ]
        },
        {
            "type": "image",
            "endpoints": [
                {"interface": "public", "region": "RegionOne", "url": format!("http://{addr}/image")}
            ]
        },
        {
            "type": "volumev2",
            "endpoints": [
                {"interface": "public", "region": "RegionOne", "url": format!("http://{addr}/volume")}
            ]
        }
    ])
}

fn router(addr: SocketAddr, options: MockOptions, counters: Counters) -> axum::Router {
    let versions = options.versions.clone();
    let probe = get(move || {
        let versions = versions.clone();
        async move {
            let values: Vec<Value> = versions.iter().map(|id| json!({"id": id})).collect();
            Json(json!({"versions": {"values": values}}))
        }
    });

    let auth_counter = counters.auth.clone();
    let fail_auth = options.fail_auth;
    let auth = post(move |Json(body): Json<Value>| {
        let auth_counter = auth_counter.clone();
        async move {
            auth_counter.fetch_add(1, Ordering::SeqCst);
            if fail_auth {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": {"code": 401, "title": "Unauthorized"}})),
                )
                    .into_response();
            }
            let mut token = json!({
                "user": {"id": "u-123", "name": "admin"},
                "issued_at": "2026-08-06T10:00:00.000000Z",
                "expires_at": "2026-08-06T11:00:00.000000Z"
            });
            if body["auth"]["scope"].is_object() {
                token["catalog"] = catalog_for(addr);
            }
            (
                StatusCode::CREATED,
                [("x-subject-token", "tok-mock-1")],
                Json(json!({"token": token})),
            )
                .into_response()
        }
    });

    let region_counter = counters.regions.clone();
    let fail_regions = options.fail_regions;
    let regions = get(move || {
        let region_counter = region_counter.clone();
        async move {
            region_counter.fetch_add(1, Ordering::SeqCst);
            if fail_regions {
                return (StatusCode::INTERNAL_SERVER_ERROR, "region backend exploded")
                    .into_response();
            }
            Json(json!({"regions": [{"id": "RegionOne"}, {"id": "RegionTwo"}]})).into_response()
        }
    });

    let project_counter = counters.projects.clone();
    let projects = get(move |Path(user_id): Path<String>| {
        let project_counter = project_counter.clone();
        async move {
            project_counter.fetch_add(1, Ordering::SeqCst);
            if user_id != "u-123" {
                return (StatusCode::NOT_FOUND, "no such user").into_response();
            }
            Json(json!({"projects": [
                {"id": "p-demo", "name": "demo", "enabled": true},
                {"id": "p-ops", "name": "ops", "enabled": true}
            ]}))
            .into_response()
        }
    });

    let server_counter = counters.servers.clone();
    let malformed_servers = options.malformed_servers;
    let servers = get(move |Query(params): Query<HashMap<String, String>>| {
        let server_counter = server_counter.clone();
        async move {
            server_counter.fetch_add(1, Ordering::SeqCst);
            if malformed_servers {
                return Json(json!({"instances": []})).into_response();
            }
            let body = match params.get("page").map(String::as_str) {
                Some("2") => json!({
                    "servers": [{"id": "s-3", "name": "vm3"}],
                    "next": format!("http://{addr}/compute/v2.1/servers?page=3")
                }),
                Some("3") => json!({
                    "servers": [{"id": "s-4", "name": "vm4"}]
                }),
                _ => json!({
                    "servers": [{"id": "s-1", "name": "vm1"}, {"id": "s-2", "name": "vm2"}],
                    "next": format!("http://{addr}/compute/v2.1/servers?page=2")
                }),
            };
            Json(body).into_response()
        }
    });

    let image_counter = counters.images.clone();
    let images = get(move |Query(params): Query<HashMap<String, String>>| {
        let image_counter = image_counter.clone();
        async move {
            image_counter.fetch_add(1, Ordering::SeqCst);
            if params.get("status").map(String::as_str) != Some("active") {
                return (StatusCode::BAD_REQUEST, "missing status filter").into_response();
            }
            Json(json!({"images": [
                {"name": "debian-13", "size": 2147483648u64, "visibility": "public", "disk_format": "qcow2", "status": "active"},
                {"name": "win11-gold", "size": 21474836480u64, "visibility": "private", "disk_format": "raw", "status": "active"}
            ]}))
            .into_response()
        }
    });

    let volume_counter = counters.volumes.clone();
    let volumes = get(move || {
        let volume_counter = volume_counter.clone();
        async move {
            volume_counter.fetch_add(1, Ordering::SeqCst);
            Json(json!({"volumes": [
                {"id": "vol-1", "name": "scratch"},
                {"id": "vol-2", "name": "home"}
            ]}))
        }
    });

    let total = counters.total.clone();
    axum::Router::new()
        .route("/", probe)
        .route("/v3/auth/tokens", auth)
        .route("/v3/regions/", regions)
        .route("/v3/users/{user_id}/projects", projects)
        .route("/compute/v2.1/servers", servers)
        .route("/image/v2/images", images)
        .route("/volume/volumes", volumes)
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            let total = total.clone();
            async move {
                total.fetch_add(1, Ordering::SeqCst);
                next.run(req).await
            }
        }))
}
