//! Integration tests for the station amenity backend.

use std::sync::Arc;

use reqwest::{Client, Method, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::analysis::PhotoAnalyzer;
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::mail::Mailer;
use crate::{create_router, AppState};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-password";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    admin_token: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let upload_dir = temp_dir.path().join("uploads");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        repo.ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("Failed to create admin");

        // Create config
        let config = Config {
            db_path,
            upload_dir,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            ..Config::default()
        };

        let state = AppState {
            repo,
            mailer: Arc::new(Mailer::disabled()),
            analyzer: Arc::new(PhotoAnalyzer::new(config.ai.clone()).unwrap()),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut fixture = TestFixture {
            client: Client::new(),
            base_url,
            admin_token: String::new(),
            _temp_dir: temp_dir,
        };
        fixture.admin_token = fixture.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        fixture
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "login failed for {}", email);
        let body: Value = resp.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> Response {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.unwrap()
    }

    /// Call as admin and return the `data` of a successful response.
    async fn admin(&self, method: Method, path: &str, body: Option<Value>) -> Value {
        let resp = self.call(method, path, &self.admin_token, body).await;
        assert_eq!(resp.status(), 200, "{} failed", path);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        body["data"].clone()
    }

    async fn create_station(&self, name: &str, code: &str) -> String {
        let station = self
            .admin(
                Method::POST,
                "/api/stations",
                Some(json!({ "name": name, "code": code, "region": "North" })),
            )
            .await;
        station["id"].as_str().unwrap().to_string()
    }

    /// Create a user and return a session token for it.
    async fn create_user(&self, email: &str, role: &str, station_id: Option<&str>) -> String {
        self.admin(
            Method::POST,
            "/api/users",
            Some(json!({
                "name": email,
                "email": email,
                "password": "password-123",
                "role": role,
                "stationId": station_id,
            })),
        )
        .await;
        self.login(email, "password-123").await
    }

    async fn amenity_type_id(&self, key: &str) -> String {
        let types = self.admin(Method::GET, "/api/amenity-types", None).await;
        types
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["key"] == key)
            .map(|t| t["id"].as_str().unwrap().to_string())
            .unwrap()
    }

    async fn create_amenity(&self, station_id: &str, type_key: &str, name: &str) -> Value {
        let type_id = self.amenity_type_id(type_key).await;
        self.admin(
            Method::POST,
            "/api/amenities",
            Some(json!({
                "stationId": station_id,
                "amenityTypeId": type_id,
                "name": name,
            })),
        )
        .await
    }
}

async fn error_code(resp: Response) -> String {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    body["error"]["code"].as_str().unwrap().to_string()
}

// ==================== HEALTH & AUTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_requests_without_session_are_unauthorized() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/stations"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(error_code(resp).await, "UNAUTHORIZED");

    let resp = fixture
        .call(Method::GET, "/api/stations", "not-a-real-token", None)
        .await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_login_sets_cookie_and_me_works() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "ADMIN@example.com", "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    // The cookie alone authenticates
    let session = cookie.split(';').next().unwrap().to_string();
    let resp = fixture
        .client
        .get(fixture.url("/api/auth/me"))
        .header("cookie", session)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["role"], "super_admin");
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let fixture = TestFixture::new().await;
    let token = fixture.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let resp = fixture
        .call(Method::POST, "/api/auth/logout", &token, None)
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture.call(Method::GET, "/api/auth/me", &token, None).await;
    assert_eq!(resp.status(), 401);

    // Other sessions are untouched
    let resp = fixture
        .call(Method::GET, "/api/auth/me", &fixture.admin_token, None)
        .await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_register_creates_public_user() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "name": "Rider", "email": "rider@example.com", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "name": "Rider", "email": "rider@example.com", "password": "long-enough" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["role"], "public");

    // Same email again
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "name": "Rider", "email": "rider@example.com", "password": "long-enough" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

// ==================== STATIONS & USERS ====================

#[tokio::test]
async fn test_station_crud() {
    let fixture = TestFixture::new().await;

    let station = fixture
        .admin(
            Method::POST,
            "/api/stations",
            Some(json!({
                "name": "Central",
                "code": "ctl",
                "region": "North",
                "latitude": 28.64,
                "longitude": 77.22
            })),
        )
        .await;
    assert_eq!(station["code"], "CTL");
    let id = station["id"].as_str().unwrap();

    let updated = fixture
        .admin(
            Method::PUT,
            &format!("/api/stations/{}", id),
            Some(json!({ "name": "Central Junction" })),
        )
        .await;
    assert_eq!(updated["name"], "Central Junction");
    assert_eq!(updated["region"], "North");

    // Duplicate code
    let resp = fixture
        .call(
            Method::POST,
            "/api/stations",
            &fixture.admin_token,
            Some(json!({ "name": "Other", "code": "CTL", "region": "South" })),
        )
        .await;
    assert_eq!(resp.status(), 409);
    assert_eq!(error_code(resp).await, "CONFLICT");

    fixture
        .admin(Method::DELETE, &format!("/api/stations/{}", id), None)
        .await;
    let resp = fixture
        .call(
            Method::GET,
            &format!("/api/stations/{}", id),
            &fixture.admin_token,
            None,
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_station_with_amenities_cannot_be_deleted() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;
    fixture
        .create_amenity(&station_id, "water_booth", "Platform 1 booth")
        .await;

    let resp = fixture
        .call(
            Method::DELETE,
            &format!("/api/stations/{}", station_id),
            &fixture.admin_token,
            None,
        )
        .await;
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_invalid_coordinates_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/stations",
            &fixture.admin_token,
            Some(json!({
                "name": "X",
                "code": "X",
                "region": "R",
                "latitude": 120.0,
                "longitude": 1.0
            })),
        )
        .await;
    assert_eq!(resp.status(), 400);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_staff_cannot_manage_stations_or_users() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;
    let staff = fixture
        .create_user("staff@example.com", "staff", Some(&station_id))
        .await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/stations",
            &staff,
            Some(json!({ "name": "New", "code": "NEW", "region": "East" })),
        )
        .await;
    assert_eq!(resp.status(), 403);
    assert_eq!(error_code(resp).await, "FORBIDDEN");

    let resp = fixture.call(Method::GET, "/api/users", &staff, None).await;
    assert_eq!(resp.status(), 403);

    // Reading stations is fine
    let resp = fixture.call(Method::GET, "/api/stations", &staff, None).await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_station_roles_require_station() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/users",
            &fixture.admin_token,
            Some(json!({
                "name": "Nobody",
                "email": "nobody@example.com",
                "password": "password-123",
                "role": "staff"
            })),
        )
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_manager_lists_only_own_station_users() {
    let fixture = TestFixture::new().await;
    let north = fixture.create_station("North", "NTH").await;
    let south = fixture.create_station("South", "STH").await;
    let manager = fixture
        .create_user("mgr@example.com", "station_manager", Some(&north))
        .await;
    fixture
        .create_user("staff-n@example.com", "staff", Some(&north))
        .await;
    fixture
        .create_user("staff-s@example.com", "staff", Some(&south))
        .await;

    let resp = fixture
        .call(
            Method::GET,
            &format!("/api/users?stationId={}", south),
            &manager,
            None,
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u["stationId"] == north.as_str()));
}

#[tokio::test]
async fn test_deactivated_user_loses_session() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;
    let token = fixture
        .create_user("staff@example.com", "staff", Some(&station_id))
        .await;

    let users = fixture
        .admin(Method::GET, "/api/users?role=staff", None)
        .await;
    let user_id = users[0]["id"].as_str().unwrap();

    fixture
        .admin(
            Method::PUT,
            &format!("/api/users/{}", user_id),
            Some(json!({ "active": false })),
        )
        .await;

    let resp = fixture.call(Method::GET, "/api/auth/me", &token, None).await;
    assert_eq!(resp.status(), 401);
}

// ==================== AMENITIES & INSPECTIONS ====================

#[tokio::test]
async fn test_amenity_version_conflict() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;
    let amenity = fixture
        .create_amenity(&station_id, "toilet", "Platform 1 toilets")
        .await;
    let id = amenity["id"].as_str().unwrap();
    assert_eq!(amenity["version"], 1);
    assert_eq!(amenity["status"], "ok");

    let updated = fixture
        .admin(
            Method::PUT,
            &format!("/api/amenities/{}", id),
            Some(json!({ "status": "needs_maintenance", "expectedVersion": 1 })),
        )
        .await;
    assert_eq!(updated["version"], 2);

    let resp = fixture
        .call(
            Method::PUT,
            &format!("/api/amenities/{}", id),
            &fixture.admin_token,
            Some(json!({ "status": "ok", "expectedVersion": 1 })),
        )
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(body["error"]["details"]["currentVersion"], 2);
}

#[tokio::test]
async fn test_amenity_requires_known_type() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/amenities",
            &fixture.admin_token,
            Some(json!({ "stationId": station_id, "amenityTypeId": "missing", "name": "X" })),
        )
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_inspection_updates_amenity_status() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;
    let staff = fixture
        .create_user("staff@example.com", "staff", Some(&station_id))
        .await;
    let amenity = fixture
        .create_amenity(&station_id, "water_booth", "Platform 2 booth")
        .await;
    let amenity_id = amenity["id"].as_str().unwrap();

    let resp = fixture
        .call(
            Method::POST,
            "/api/inspections",
            &staff,
            Some(json!({
                "amenityId": amenity_id,
                "status": "out_of_service",
                "notes": "No water"
            })),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["stationId"], station_id.as_str());

    let amenity = fixture
        .admin(Method::GET, &format!("/api/amenities/{}", amenity_id), None)
        .await;
    assert_eq!(amenity["status"], "out_of_service");
    assert_eq!(amenity["version"], 2);
    assert!(amenity["lastInspectedAt"].is_string());

    let inspections = fixture
        .admin(
            Method::GET,
            &format!("/api/inspections?amenityId={}", amenity_id),
            None,
        )
        .await;
    assert_eq!(inspections.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_staff_cannot_inspect_other_station() {
    let fixture = TestFixture::new().await;
    let north = fixture.create_station("North", "NTH").await;
    let south = fixture.create_station("South", "STH").await;
    let staff = fixture
        .create_user("staff@example.com", "staff", Some(&north))
        .await;
    let amenity = fixture.create_amenity(&south, "seating", "Bench").await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/inspections",
            &staff,
            Some(json!({ "amenityId": amenity["id"], "status": "ok" })),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

// ==================== ISSUES ====================

#[tokio::test]
async fn test_issue_status_accepts_any_transition() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;

    let issue = fixture
        .admin(
            Method::POST,
            "/api/issues",
            Some(json!({ "stationId": station_id, "title": "Broken bench" })),
        )
        .await;
    assert_eq!(issue["status"], "reported");
    assert_eq!(issue["priority"], "medium");
    let path = format!("/api/issues/{}/status", issue["id"].as_str().unwrap());

    let closed = fixture
        .admin(Method::PATCH, &path, Some(json!({ "status": "closed" })))
        .await;
    assert_eq!(closed["status"], "closed");
    assert!(closed.get("resolvedAt").is_none());
    assert!(closed.get("closedAt").is_none());

    let reopened = fixture
        .admin(Method::PATCH, &path, Some(json!({ "status": "reported" })))
        .await;
    assert_eq!(reopened["status"], "reported");

    let resolved = fixture
        .admin(
            Method::PATCH,
            &path,
            Some(json!({ "status": "resolved", "resolutionNotes": "Replaced" })),
        )
        .await;
    assert_eq!(resolved["status"], "resolved");
    assert!(resolved["resolvedAt"].is_string());
    assert_eq!(resolved["resolutionNotes"], "Replaced");

    let resp = fixture
        .call(
            Method::PATCH,
            &path,
            &fixture.admin_token,
            Some(json!({ "status": "escalated" })),
        )
        .await;
    assert_eq!(resp.status(), 400);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/stations"))
        .bearer_auth(&fixture.admin_token)
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");

    let resp = fixture
        .client
        .post(fixture.url("/api/stations"))
        .bearer_auth(&fixture.admin_token)
        .body("name=Central")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_issue_list_is_scoped_to_own_station() {
    let fixture = TestFixture::new().await;
    let north = fixture.create_station("North", "NTH").await;
    let south = fixture.create_station("South", "STH").await;
    let manager = fixture
        .create_user("mgr@example.com", "station_manager", Some(&north))
        .await;

    for station_id in [&north, &south] {
        fixture
            .admin(
                Method::POST,
                "/api/issues",
                Some(json!({ "stationId": station_id, "title": "Lights out" })),
            )
            .await;
    }

    let resp = fixture
        .call(
            Method::GET,
            &format!("/api/issues?stationId={}", south),
            &manager,
            None,
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let issues = body["data"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["stationId"], north.as_str());

    let all = fixture.admin(Method::GET, "/api/issues", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_staff_issue_is_pinned_to_own_station() {
    let fixture = TestFixture::new().await;
    let north = fixture.create_station("North", "NTH").await;
    let south = fixture.create_station("South", "STH").await;
    let staff = fixture
        .create_user("staff@example.com", "staff", Some(&north))
        .await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/issues",
            &staff,
            Some(json!({ "stationId": south, "title": "Leak", "priority": "high" })),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["stationId"], north.as_str());
    assert_eq!(body["data"]["priority"], "high");
}

#[tokio::test]
async fn test_public_user_sees_only_own_issues() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;
    let rider = fixture
        .create_user("rider@example.com", "public", None)
        .await;

    fixture
        .admin(
            Method::POST,
            "/api/issues",
            Some(json!({ "stationId": station_id, "title": "Staff report" })),
        )
        .await;
    let resp = fixture
        .call(
            Method::POST,
            "/api/issues",
            &rider,
            Some(json!({ "stationId": station_id, "title": "Dirty toilet" })),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture.call(Method::GET, "/api/issues", &rider, None).await;
    let body: Value = resp.json().await.unwrap();
    let issues = body["data"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["title"], "Dirty toilet");

    // Public users cannot move issues along
    let path = format!("/api/issues/{}/status", issues[0]["id"].as_str().unwrap());
    let resp = fixture
        .call(Method::PATCH, &path, &rider, Some(json!({ "status": "closed" })))
        .await;
    assert_eq!(resp.status(), 403);

    let resp = fixture.call(Method::GET, "/api/amenities", &rider, None).await;
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_assign_issue() {
    let fixture = TestFixture::new().await;
    let north = fixture.create_station("North", "NTH").await;
    let south = fixture.create_station("South", "STH").await;
    fixture
        .create_user("staff-n@example.com", "staff", Some(&north))
        .await;
    fixture
        .create_user("staff-s@example.com", "staff", Some(&south))
        .await;

    let users = fixture.admin(Method::GET, "/api/users?role=staff", None).await;
    let id_of = |email: &str| {
        users
            .as_array()
            .unwrap()
            .iter()
            .find(|u| u["email"] == email)
            .map(|u| u["id"].as_str().unwrap().to_string())
            .unwrap()
    };

    let issue = fixture
        .admin(
            Method::POST,
            "/api/issues",
            Some(json!({ "stationId": north, "title": "Ramp blocked" })),
        )
        .await;
    let path = format!("/api/issues/{}/assign", issue["id"].as_str().unwrap());

    let resp = fixture
        .call(
            Method::PATCH,
            &path,
            &fixture.admin_token,
            Some(json!({ "assigneeId": id_of("staff-s@example.com") })),
        )
        .await;
    assert_eq!(resp.status(), 400);

    let assigned = fixture
        .admin(
            Method::PATCH,
            &path,
            Some(json!({ "assigneeId": id_of("staff-n@example.com") })),
        )
        .await;
    assert_eq!(assigned["status"], "assigned");
    assert!(assigned["assignedAt"].is_string());
    assert_eq!(assigned["assigneeId"], id_of("staff-n@example.com").as_str());
}

// ==================== REPORTS & CONFIG ====================

#[tokio::test]
async fn test_mis_report_empty_station() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;

    let report = fixture
        .admin(
            Method::GET,
            &format!("/api/reports/mis?period=weekly&stationId={}", station_id),
            None,
        )
        .await;
    assert_eq!(report["period"], "weekly");
    let metrics = &report["metrics"];
    assert_eq!(metrics["totalIssues"], 0);
    assert_eq!(metrics["resolvedIssues"], 0);
    assert_eq!(metrics["openIssues"], 0);
    assert_eq!(metrics["avgResolutionTimeHours"], 0.0);
    assert_eq!(metrics["inspectionCount"], 0);

    let uptime = metrics["amenityUptime"].as_object().unwrap();
    assert_eq!(uptime.len(), 8);
    assert!(uptime.values().all(|v| v.as_f64() == Some(0.0)));
}

#[tokio::test]
async fn test_mis_report_rejects_unknown_period() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .call(
            Method::GET,
            "/api/reports/mis?period=yearly",
            &fixture.admin_token,
            None,
        )
        .await;
    assert_eq!(resp.status(), 400);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_mis_report_counts_activity() {
    let fixture = TestFixture::new().await;
    let station_id = fixture.create_station("Central", "CTL").await;
    let booth = fixture
        .create_amenity(&station_id, "water_booth", "Booth A")
        .await;
    fixture
        .create_amenity(&station_id, "water_booth", "Booth B")
        .await;

    fixture
        .admin(
            Method::POST,
            "/api/inspections",
            Some(json!({ "amenityId": booth["id"], "status": "out_of_service" })),
        )
        .await;
    let issue = fixture
        .admin(
            Method::POST,
            "/api/issues",
            Some(json!({ "stationId": station_id, "title": "Dry tap", "priority": "high" })),
        )
        .await;
    fixture
        .admin(
            Method::POST,
            "/api/issues",
            Some(json!({ "stationId": station_id, "title": "Dim lights" })),
        )
        .await;
    fixture
        .admin(
            Method::PATCH,
            &format!("/api/issues/{}/status", issue["id"].as_str().unwrap()),
            Some(json!({ "status": "resolved" })),
        )
        .await;

    let report = fixture
        .admin(
            Method::GET,
            &format!("/api/reports/mis?period=daily&stationId={}", station_id),
            None,
        )
        .await;
    let metrics = &report["metrics"];
    assert_eq!(metrics["totalIssues"], 2);
    assert_eq!(metrics["resolvedIssues"], 1);
    assert_eq!(metrics["openIssues"], 1);
    assert_eq!(metrics["highPriorityIssues"], 1);
    assert_eq!(metrics["inspectionCount"], 1);
    assert_eq!(metrics["amenityUptime"]["water_booth"], 50.0);
    assert_eq!(metrics["amenityUptime"]["toilet"], 0.0);
}

#[tokio::test]
async fn test_stored_reports_are_scoped() {
    let fixture = TestFixture::new().await;
    let north = fixture.create_station("North", "NTH").await;
    let south = fixture.create_station("South", "STH").await;
    let manager = fixture
        .create_user("mgr@example.com", "station_manager", Some(&north))
        .await;

    let network = fixture
        .admin(Method::POST, "/api/reports", Some(json!({ "period": "monthly" })))
        .await;
    assert!(network.get("stationId").is_none());

    let resp = fixture
        .call(
            Method::POST,
            "/api/reports",
            &manager,
            Some(json!({ "period": "daily", "stationId": south })),
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["stationId"], north.as_str());

    let resp = fixture.call(Method::GET, "/api/reports", &manager, None).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let resp = fixture
        .call(
            Method::GET,
            &format!("/api/reports/{}", network["id"].as_str().unwrap()),
            &manager,
            None,
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_config_round_trip() {
    let fixture = TestFixture::new().await;

    let config = fixture.admin(Method::GET, "/api/config", None).await;
    assert_eq!(config["highPriorityAlerts"], true);
    assert_eq!(config["inspectionIntervalDays"], 7);

    let saved = fixture
        .admin(
            Method::PUT,
            "/api/config",
            Some(json!({
                "siteName": "Northern Division",
                "alertEmails": ["Ops@Example.com", "ops@example.com"],
                "aiAnalysisEnabled": false
            })),
        )
        .await;
    assert_eq!(saved["alertEmails"], json!(["ops@example.com"]));
    assert_eq!(saved["aiAnalysisEnabled"], false);
    assert_eq!(saved["outOfServiceAlerts"], true);

    let config = fixture.admin(Method::GET, "/api/config", None).await;
    assert_eq!(config["siteName"], "Northern Division");

    let resp = fixture
        .call(
            Method::PUT,
            "/api/config",
            &fixture.admin_token,
            Some(json!({ "alertEmails": ["not-an-email"] })),
        )
        .await;
    assert_eq!(resp.status(), 400);
}

// ==================== UPLOADS & ANALYSIS ====================

#[tokio::test]
async fn test_upload_image_is_served() {
    let fixture = TestFixture::new().await;

    let part = reqwest::multipart::Part::bytes(crate::uploads::sample_png(64, 64))
        .file_name("booth.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = fixture
        .client
        .post(fixture.url("/api/uploads"))
        .bearer_auth(&fixture.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let url = body["data"]["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/"));

    let resp = fixture.client.get(fixture.url(url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let fixture = TestFixture::new().await;

    let part = reqwest::multipart::Part::bytes(b"hello".to_vec()).file_name("notes.txt");
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = fixture
        .client
        .post(fixture.url("/api/uploads"))
        .bearer_auth(&fixture.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_photo_analysis_unavailable_without_key() {
    let fixture = TestFixture::new().await;

    let part = reqwest::multipart::Part::bytes(crate::uploads::sample_png(32, 32))
        .file_name("booth.png");
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = fixture
        .client
        .post(fixture.url("/api/analysis/photo"))
        .bearer_auth(&fixture.admin_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    assert_eq!(error_code(resp).await, "SERVICE_UNAVAILABLE");
}
