use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use boxoffice_api::{app, AppState, AuthConfig};
use boxoffice_core::{
    CatalogRepository, CoordinatorConfig, InMemoryStore, ReservationCoordinator, StoreError,
    StoreResult, UserDirectory,
};
use boxoffice_shared::{Movie, MovieId, NewMovie, NewUser, Seat, SeatEvent, SeatFilter, SeatId};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: AppState,
}

fn test_auth() -> AuthConfig {
    AuthConfig { secret: "test-secret".to_string(), expiration: 3600 }
}

async fn store_with_admin() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .create_user(NewUser {
            username: "admin".to_string(),
            email: Some("admin@example.com".to_string()),
            password: "adminpass".to_string(),
            is_admin: true,
        })
        .await
        .unwrap();
    store
}

/// Catalog whose movie lookups fail while everything else works
struct MovieLookupDown(InMemoryStore);

#[async_trait]
impl CatalogRepository for MovieLookupDown {
    async fn create_movie(&self, movie: NewMovie) -> StoreResult<Movie> {
        self.0.create_movie(movie).await
    }

    async fn get_movie(&self, _id: MovieId) -> StoreResult<Movie> {
        Err(StoreError::Backend("pool timed out".to_string()))
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        self.0.list_movies().await
    }

    async fn update_movie(&self, id: MovieId, movie: NewMovie) -> StoreResult<Movie> {
        self.0.update_movie(id, movie).await
    }

    async fn delete_movie(&self, id: MovieId) -> StoreResult<()> {
        self.0.delete_movie(id).await
    }

    async fn create_seat(&self, seat_number: &str) -> StoreResult<Seat> {
        self.0.create_seat(seat_number).await
    }

    async fn get_seat(&self, id: SeatId) -> StoreResult<Seat> {
        self.0.get_seat(id).await
    }

    async fn list_seats(&self, filter: &SeatFilter) -> StoreResult<Vec<Seat>> {
        self.0.list_seats(filter).await
    }

    async fn delete_seat(&self, id: SeatId) -> StoreResult<()> {
        self.0.delete_seat(id).await
    }
}

impl TestApp {
    async fn new() -> Self {
        let state = AppState::in_memory(store_with_admin().await, CoordinatorConfig::default(), test_auth());
        Self::from_state(state)
    }

    fn from_state(state: AppState) -> Self {
        Self { router: app(state.clone()), state }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn token(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/v1/auth/token",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "token for {username}: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn register(&self, username: &str) -> String {
        let (status, _) = self
            .send(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(json!({ "username": username, "password": "testpass123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.token(username, "testpass123").await
    }

    /// Creates a movie and a seat as admin, returning their ids.
    async fn catalog(&self, admin: &str, seat_number: &str) -> (String, String) {
        let (status, movie) = self
            .send(
                Method::POST,
                "/v1/movies",
                Some(admin),
                Some(json!({
                    "title": "Inception",
                    "description": "Dreams within dreams",
                    "release_date": "2010-07-16",
                    "duration": 148
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, seat) = self
            .send(Method::POST, "/v1/seats", Some(admin), Some(json!({ "seat_number": seat_number })))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        (
            movie["id"].as_str().unwrap().to_string(),
            seat["id"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_bad_credentials_are_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/v1/auth/token",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_catalog_writes_need_admin() {
    let app = TestApp::new().await;
    let user = app.register("alice").await;
    let seat = json!({ "seat_number": "A1" });

    let (status, _) = app.send(Method::POST, "/v1/seats", None, Some(seat.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::POST, "/v1/seats", Some(&user), Some(seat.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::POST, "/v1/seats", Some("not-a-jwt"), Some(seat)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_movie_validation() {
    let app = TestApp::new().await;
    let admin = app.token("admin", "adminpass").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/movies",
            Some(&admin),
            Some(json!({ "title": "", "release_date": "2010-07-16", "duration": 148 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "title must not be empty");

    let (status, _) = app
        .send(
            Method::POST,
            "/v1/movies",
            Some(&admin),
            Some(json!({ "title": "Short", "release_date": "2010-07-16", "duration": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_duration_is_a_bad_request() {
    let app = TestApp::new().await;
    let admin = app.token("admin", "adminpass").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/movies",
            Some(&admin),
            Some(json!({ "title": "Endless", "release_date": "2010-07-16", "duration": 3_000_000_000u64 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duration must be at most 2147483647");
}

#[tokio::test]
async fn test_committed_booking_survives_failed_lookup() {
    let store = store_with_admin().await;
    let movie = store
        .create_movie(NewMovie {
            title: "Heat".to_string(),
            description: String::new(),
            release_date: chrono::NaiveDate::from_ymd_opt(1995, 12, 15).unwrap(),
            duration: 170,
        })
        .await
        .unwrap();
    let seat = store.create_seat("H8").await.unwrap();

    let coordinator = ReservationCoordinator::new(Arc::new(store.clone()), CoordinatorConfig::default());
    let state = AppState::new(
        Arc::new(coordinator),
        Arc::new(MovieLookupDown(store.clone())),
        Arc::new(store.clone()),
        test_auth(),
    );
    let app = TestApp::from_state(state);
    let mut events = app.state.seat_events.subscribe();
    let alice = app.register("alice").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/bookings",
            Some(&alice),
            Some(json!({ "movie": movie.id, "seat": seat.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["seat_id"], json!(seat.id));
    assert_eq!(body["movie_id"], json!(movie.id));
    assert!(body["id"].is_string());

    match events.try_recv().unwrap() {
        SeatEvent::SeatBooked { seat_id, seat_number, .. } => {
            assert_eq!(seat_id, seat.id);
            assert_eq!(seat_number, "H8");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let (_, seat_now) = app.send(Method::GET, &format!("/v1/seats/{}", seat.id), None, None).await;
    assert_eq!(seat_now["available"], false);
}

#[tokio::test]
async fn test_reserve_then_cancel() {
    let app = TestApp::new().await;
    let admin = app.token("admin", "adminpass").await;
    let alice = app.register("alice").await;
    let (movie, seat) = app.catalog(&admin, "A1").await;

    let (status, booking) = app
        .send(Method::POST, "/v1/bookings", Some(&alice), Some(json!({ "movie": movie, "seat": seat })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["user"]["username"], "alice");
    assert_eq!(booking["movie"]["title"], "Inception");
    assert_eq!(booking["seat"]["available"], false);
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (_, booked) = app.send(Method::GET, "/v1/seats/booked", None, None).await;
    assert_eq!(booked.as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(Method::POST, &format!("/v1/bookings/{}/cancel", booking_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Booking cancelled successfully");

    let (_, seat_now) = app.send(Method::GET, &format!("/v1/seats/{}", seat), None, None).await;
    assert_eq!(seat_now["available"], true);

    let (status, _) = app
        .send(Method::POST, &format!("/v1/bookings/{}/cancel", booking_id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_second_reservation_of_seat_fails() {
    let app = TestApp::new().await;
    let admin = app.token("admin", "adminpass").await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let (movie, seat) = app.catalog(&admin, "B2").await;
    let payload = json!({ "movie": movie, "seat": seat });

    let (status, _) = app.send(Method::POST, "/v1/bookings", Some(&alice), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.send(Method::POST, "/v1/bookings", Some(&bob), Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This seat is already booked");

    let (_, mine) = app.send(Method::GET, "/v1/bookings/my_bookings", Some(&bob), None).await;
    assert!(mine.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_references_are_bad_requests() {
    let app = TestApp::new().await;
    let admin = app.token("admin", "adminpass").await;
    let alice = app.register("alice").await;
    let (movie, seat) = app.catalog(&admin, "C3").await;
    let ghost = uuid::Uuid::new_v4().to_string();

    let (status, _) = app
        .send(Method::POST, "/v1/bookings", Some(&alice), Some(json!({ "movie": movie, "seat": ghost })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::POST, "/v1/bookings", Some(&alice), Some(json!({ "movie": ghost, "seat": seat })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, available) = app.send(Method::GET, "/v1/seats?available=yes", None, None).await;
    assert_eq!(available.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_only_owner_or_admin_may_cancel() {
    let app = TestApp::new().await;
    let admin = app.token("admin", "adminpass").await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let (movie, seat) = app.catalog(&admin, "D4").await;

    let (_, booking) = app
        .send(Method::POST, "/v1/bookings", Some(&alice), Some(json!({ "movie": movie, "seat": seat })))
        .await;
    let cancel = format!("/v1/bookings/{}/cancel", booking["id"].as_str().unwrap());

    let (status, body) = app.send(Method::POST, &cancel, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only cancel your own bookings");

    let (status, _) = app.send(Method::POST, &cancel, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_booking_visibility() {
    let app = TestApp::new().await;
    let admin = app.token("admin", "adminpass").await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let (movie, seat) = app.catalog(&admin, "E5").await;

    let (_, booking) = app
        .send(Method::POST, "/v1/bookings", Some(&alice), Some(json!({ "movie": movie, "seat": seat })))
        .await;
    let path = format!("/v1/bookings/{}", booking["id"].as_str().unwrap());

    let (status, _) = app.send(Method::GET, &path, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(Method::GET, &path, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = app.send(Method::GET, "/v1/bookings", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    let (_, admin_own) = app.send(Method::GET, "/v1/bookings/my_bookings", Some(&admin), None).await;
    assert!(admin_own.as_array().unwrap().is_empty());
    let (_, bobs) = app.send(Method::GET, "/v1/bookings", Some(&bob), None).await;
    assert!(bobs.as_array().unwrap().is_empty());

    let (status, _) = app.send(Method::GET, "/v1/bookings/by_movie", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, by_movie) = app
        .send(Method::GET, &format!("/v1/bookings/by_movie?movie_id={}", movie), Some(&alice), None)
        .await;
    assert_eq!(by_movie.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_booked_seat_cannot_be_deleted() {
    let app = TestApp::new().await;
    let admin = app.token("admin", "adminpass").await;
    let alice = app.register("alice").await;
    let (movie, seat) = app.catalog(&admin, "F6").await;

    app.send(Method::POST, "/v1/bookings", Some(&alice), Some(json!({ "movie": movie, "seat": seat })))
        .await;

    let (status, _) = app.send(Method::DELETE, &format!("/v1/seats/{}", seat), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.send(Method::DELETE, &format!("/v1/movies/{}", movie), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_seat_events_follow_commits() {
    let app = TestApp::new().await;
    let mut events = app.state.seat_events.subscribe();
    let admin = app.token("admin", "adminpass").await;
    let alice = app.register("alice").await;
    let (movie, seat) = app.catalog(&admin, "G7").await;

    let (_, booking) = app
        .send(Method::POST, "/v1/bookings", Some(&alice), Some(json!({ "movie": movie, "seat": seat })))
        .await;
    match events.recv().await.unwrap() {
        SeatEvent::SeatBooked { seat_number, .. } => assert_eq!(seat_number, "G7"),
        other => panic!("unexpected event: {:?}", other),
    }

    // A rejected attempt publishes nothing
    let (status, _) = app
        .send(Method::POST, "/v1/bookings", Some(&admin), Some(json!({ "movie": movie, "seat": seat })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.send(
        Method::POST,
        &format!("/v1/bookings/{}/cancel", booking["id"].as_str().unwrap()),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(events.recv().await.unwrap().kind(), "seat_released");
}

#[tokio::test]
async fn test_invalid_availability_filter() {
    let app = TestApp::new().await;
    let (status, _) = app.send(Method::GET, "/v1/seats?available=maybe", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
