//! HTTP read API over the ingested channel graph, plus web-user accounts and
//! saved messages.

pub mod auth;
pub mod channels;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod pagination;
pub mod params;
pub mod saved;
pub mod service;
pub mod users;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};

pub use auth::{AppState, AppStateInner};
pub use pagination::{PageWindow, PageWindower};
pub use service::{ReadService, ServiceError};

/// All routes. Only the saved-message routes require a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/channels", get(channels::get_channels_by_page))
        .route("/channels/count", get(channels::get_channels_count))
        .route("/channels/by-name/{name}", get(channels::get_channel_by_name))
        .route("/channels/{channel}/messages", get(channels::get_messages_by_page))
        .route("/channels/{channel}/messages/count", get(channels::get_messages_count))
        .route("/messages", get(messages::get_messages_by_page))
        .route("/messages/count", get(messages::get_messages_count))
        .route("/messages/{id}", get(messages::get_message))
        .route("/messages/{id}/replies", get(messages::get_replies))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/messages", get(users::get_user_messages))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/saved", get(saved::get_saved).post(saved::create_saved))
        .route("/saved/{id}", delete(saved::delete_saved))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use scanner_db::Database;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const SECRET: &str = "test-secret-for-router";

    fn app() -> (Arc<Database>, Router) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let state = Arc::new(AppStateInner {
            db: db.clone(),
            service: ReadService::new(db.clone(), PageWindower::default()),
            jwt_secret: SECRET.into(),
        });
        (db, router(state))
    }

    fn seed(db: &Database) -> (i64, i64) {
        let channel = db.create_channel("rust_ua", "Rust UA", "r.png").unwrap();
        let user = db.create_user("ivan", "Ivan P", "i.png").unwrap();
        let message = db
            .create_message(channel, user, "hello", "https://t.me/rust_ua/1", "")
            .unwrap();
        db.create_reply(message, user, "self reply", "").unwrap();
        (channel, message)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut req = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn login(app: &Router) -> String {
        let creds = json!({"email": "reader@example.com", "password": "hunter2hunter2"});
        let (status, _) = send(app, post_json("/auth/register", creds.clone(), None)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(app, post_json("/auth/login", creds, None)).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn reads_messages_and_channels() {
        let (db, app) = app();
        let (channel, message) = seed(&db);

        let (status, body) = send(&app, get("/messages?page=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["title"], "hello");
        assert_eq!(body[0]["repliesCount"], 1);
        assert_eq!(body[0]["channelName"], "rust_ua");

        let (status, body) = send(&app, get(&format!("/messages/{message}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["replies"][0]["title"], "self reply");

        let (status, body) = send(&app, get("/channels/by-name/rust_ua")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], channel);

        let (status, body) = send(&app, get(&format!("/channels/{channel}/messages/count"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, body) = send(&app, get("/channels/count")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn not_found_and_bad_request_bodies() {
        let (db, app) = app();
        seed(&db);

        let (status, body) = send(&app, get("/messages?page=2")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
        assert_eq!(body["name"], "Not Found");
        assert_eq!(body["message"], "full messages not found");

        let (status, body) = send(&app, get("/messages?page=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "page is not valid");

        let (status, _) = send(&app, get("/messages")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, get("/users/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "user id is not valid");

        let (status, _) = send(&app, get("/users/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn register_conflict_and_bad_login() {
        let (_db, app) = app();
        login(&app).await;

        let creds = json!({"email": "reader@example.com", "password": "hunter2hunter2"});
        let (status, _) = send(&app, post_json("/auth/register", creds, None)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let wrong = json!({"email": "reader@example.com", "password": "wrong-password"});
        let (status, _) = send(&app, post_json("/auth/login", wrong, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let missing = json!({"email": "nobody@example.com", "password": "whatever123"});
        let (status, body) = send(&app, post_json("/auth/login", missing, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "user not found");
    }

    #[tokio::test]
    async fn saved_routes_require_token() {
        let (_db, app) = app();

        let (status, body) = send(&app, get("/saved")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);

        let req = Request::get("/saved")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn save_list_and_delete() {
        let (db, app) = app();
        let (_, message) = seed(&db);
        let token = login(&app).await;
        let auth = format!("Bearer {token}");

        let (status, body) = send(
            &app,
            post_json("/saved", json!({"messageId": message}), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let saved_id = body["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            post_json("/saved", json!({"messageId": message}), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            post_json("/saved", json!({"messageId": 9999}), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let req = Request::get("/saved")
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["messageId"], message);

        let req = Request::delete(format!("/saved/{saved_id}"))
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let req = Request::get("/saved")
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn corrupt_saved_timestamp_is_internal_error() {
        let (db, app) = app();
        let (_, message) = seed(&db);
        let token = login(&app).await;

        let (status, _) = send(
            &app,
            post_json("/saved", json!({"messageId": message}), Some(&token)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        db.with_conn_mut(|c| Ok(c.execute("UPDATE saved SET created_at = 'yesterday'", [])?))
            .unwrap();

        let req = Request::get("/saved")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 500);
    }

    #[tokio::test]
    async fn channel_named_count_is_reachable_by_name() {
        let (db, app) = app();
        seed(&db);
        let id = db.create_channel("count", "Counting", "").unwrap();

        let (status, body) = send(&app, get("/channels/by-name/count")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
        assert_eq!(body["title"], "Counting");

        let (status, body) = send(&app, get("/channels/count")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
    }
}
