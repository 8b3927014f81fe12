use axum::{middleware, routing::{get, post}, Router};

use crate::handlers::user::{get_me, get_user, login, signup, update_user};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login));

    let protected = Router::new()
        .route("/auth/me", get(get_me))
        .route("/users/{id}", get(get_user).put(update_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    open.merge(protected)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::models::user::Role;
    use crate::test_support::{json_request, TestApp, PASSWORD};

    fn signup(email: &str, role: Option<&str>) -> axum::http::Request<axum::body::Body> {
        let mut body = json!({ "name": "Carol Jones", "email": email, "password": "secret123" });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        json_request(Method::POST, "/api/auth/signup", None, Some(body))
    }

    #[tokio::test]
    async fn signup_returns_token_and_profile() {
        let app = TestApp::new();

        let (status, body) = app.send(signup("Carol@Example.com", Some("owner"))).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert_eq!(body["user"]["email"], "carol@example.com");
        assert_eq!(body["user"]["username"], "carol");
        assert_eq!(body["user"]["firstName"], "Carol");
        assert_eq!(body["user"]["lastName"], "Jones");
        assert_eq!(body["user"]["role"], "owner");
        assert!(body["user"].get("passwordHash").is_none());

        let token = body["token"].as_str().unwrap();
        let (status, me) = app.send(json_request(Method::GET, "/api/auth/me", Some(token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "carol@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_creates_one_account() {
        let app = TestApp::new();

        let (status, _) = app.send(signup("carol@example.com", None)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app.send(signup("CAROL@example.com ", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "duplicate_email");
        assert_eq!(app.state.identity.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn signup_cannot_claim_admin() {
        let app = TestApp::new();

        let (status, _) = app.send(signup("carol@example.com", Some("admin"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(app.state.identity.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn signup_rejects_bad_input() {
        let app = TestApp::new();

        let (status, _) = app.send(signup("not-an-email", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app.send(signup("carol@example.com", Some("landlord"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_failures_look_the_same() {
        let app = TestApp::new();
        app.user("dave@example.com", Role::Tenant).await;

        let (status, body) = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "dave@example.com", "password": PASSWORD })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "dave@example.com");

        let (wrong_status, wrong) = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "dave@example.com", "password": "nope-nope" })),
            ))
            .await;
        let (unknown_status, unknown) = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
            ))
            .await;
        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
    }

    #[tokio::test]
    async fn profiles_are_private_to_self_and_admin() {
        let app = TestApp::new();
        let (erin, erin_token) = app.user("erin@example.com", Role::Tenant).await;
        let (_, frank_token) = app.user("frank@example.com", Role::Tenant).await;
        let (_, admin_token) = app.user("root@example.com", Role::Admin).await;
        let uri = format!("/api/users/{}", erin.id);

        let (status, _) = app.send(json_request(Method::GET, &uri, Some(&frank_token), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send(json_request(Method::GET, &uri, Some(&admin_token), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, updated) = app
            .send(json_request(
                Method::PUT,
                &uri,
                Some(&erin_token),
                Some(json!({ "firstName": "Erin", "occupation": "Engineer" })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["firstName"], "Erin");
        assert_eq!(updated["occupation"], "Engineer");
        assert_eq!(updated["role"], "tenant");
    }

    #[tokio::test]
    async fn deactivated_account_loses_access() {
        let app = TestApp::new();
        let (grace, grace_token) = app.user("grace@example.com", Role::Tenant).await;
        let (_, admin_token) = app.user("root@example.com", Role::Admin).await;

        let (status, _) = app
            .send(json_request(
                Method::PATCH,
                &format!("/api/admin/users/{}/status", grace.id),
                Some(&admin_token),
                Some(json!({ "active": false })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.send(json_request(Method::GET, "/api/auth/me", Some(&grace_token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
