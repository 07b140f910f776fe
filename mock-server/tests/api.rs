use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Envelope, Ordonnance, Prescription, Prestation, User, PHARMACIE_ID};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

const PHARMA_2025: &str = r#"{"date_debut":"2025-01-01","date_fin":"2025-09-30",
    "data":{"garantie":"PHARMA","prestataire_id":41},"index":0,"size":10}"#;

/// Log in as the seeded pharmacy and return the issued token.
async fn login(app: &axum::Router) -> String {
    let resp = app
        .clone()
        .oneshot(json_request(
            "/user/login",
            None,
            r#"{"login":"pharma.centre","password":"secret"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Envelope<User> = body_json(resp).await;
    envelope.items[0].token.clone().unwrap()
}

// --- login ---

#[tokio::test]
async fn login_issues_token() {
    let app = app();
    let resp = app
        .oneshot(json_request(
            "/user/login",
            None,
            r#"{"login":"pharma.centre","password":"secret"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Envelope<User> = body_json(resp).await;
    assert!(!envelope.has_error);
    assert_eq!(envelope.items.len(), 1);
    assert_eq!(envelope.items[0].prestataire_id, PHARMACIE_ID);
    assert!(envelope.items[0].token.is_some());
}

#[tokio::test]
async fn login_wrong_password_sets_has_error() {
    let app = app();
    let resp = app
        .oneshot(json_request(
            "/user/login",
            None,
            r#"{"login":"pharma.centre","password":"nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Envelope<User> = body_json(resp).await;
    assert!(envelope.has_error);
    assert!(envelope.items.is_empty());
    assert_eq!(envelope.message.as_deref(), Some("Identifiants incorrects"));
}

#[tokio::test]
async fn login_malformed_json_returns_422() {
    let app = app();
    let resp = app
        .oneshot(json_request("/user/login", None, r#"{"user":"x"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- auth ---

#[tokio::test]
async fn criteria_without_token_returns_401() {
    let app = app();
    let resp = app
        .oneshot(json_request("/prestationActe/getByCriteria", None, PHARMA_2025))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn criteria_with_unknown_token_returns_401() {
    let app = app();
    let resp = app
        .oneshot(json_request(
            "/ordonnance/getByCriteria",
            Some("not-a-session"),
            r#"{"index":0,"size":10}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_token() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .clone()
        .oneshot(json_request("/user/logout", Some(&token), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(json_request("/prestationActe/getByCriteria", Some(&token), PHARMA_2025))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- criteria ---

#[tokio::test]
async fn prestations_are_paginated_with_total_count() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .clone()
        .oneshot(json_request("/prestationActe/getByCriteria", Some(&token), PHARMA_2025))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let first: Envelope<Prestation> = body_json(resp).await;
    assert_eq!(first.count, 15);
    assert_eq!(first.items.len(), 10);

    let second_page = PHARMA_2025.replace(r#""index":0"#, r#""index":10"#);
    let resp = app
        .oneshot(json_request("/prestationActe/getByCriteria", Some(&token), &second_page))
        .await
        .unwrap();
    let second: Envelope<Prestation> = body_json(resp).await;
    assert_eq!(second.count, 15);
    assert_eq!(second.items.len(), 5);
    assert!(second
        .items
        .iter()
        .all(|p| first.items.iter().all(|q| q.id != p.id)));
}

#[tokio::test]
async fn matricule_filter_narrows_results() {
    let app = app();
    let token = login(&app).await;
    let resp = app
        .oneshot(json_request(
            "/prescriptionActe/getByCriteria",
            Some(&token),
            r#"{"data":{"matricule_assure":100245},"index":0,"size":100}"#,
        ))
        .await
        .unwrap();

    let envelope: Envelope<Prescription> = body_json(resp).await;
    assert!(envelope.count > 0);
    assert!(envelope.items.iter().all(|p| p.matricule_assure == 100245));
}

#[tokio::test]
async fn ordonnances_outside_date_range_are_excluded() {
    let app = app();
    let token = login(&app).await;
    let resp = app
        .oneshot(json_request(
            "/ordonnance/getByCriteria",
            Some(&token),
            r#"{"date_debut":"2030-01-01","date_fin":"2030-12-31","index":0,"size":10}"#,
        ))
        .await
        .unwrap();

    let envelope: Envelope<Ordonnance> = body_json(resp).await;
    assert_eq!(envelope.count, 0);
    assert!(!envelope.has_error);
}

// --- profile ---

#[tokio::test]
async fn get_user_returns_profile_and_404_for_unknown() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/user/7")
                .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Envelope<User> = body_json(resp).await;
    assert_eq!(envelope.items[0].login, "pharma.centre");
    assert!(envelope.items[0].token.is_none());

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/user/999")
                .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
