// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware, routing::get, Router};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    metrics::record_latency,
    models::{AttestationRequest, AttestationResponse},
    state::AppState,
};

pub mod attestation;
pub mod enclave;
pub mod health;

/// CORS is set per handler: attestation reads and the enclave script allow
/// any origin, attestation writes allow none.
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route(
            "/attestation",
            get(attestation::mint_token).post(attestation::set_attestation),
        )
        .route(
            "/attestation/{attestation_id}",
            get(attestation::get_attestation).options(attestation::preflight),
        )
        .route("/index.js", get(enclave::index_js))
        .route("/{project_id}", get(enclave::enclave_page))
        .route_layer(middleware::from_fn(record_latency))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::metrics,
        attestation::mint_token,
        attestation::get_attestation,
        attestation::preflight,
        attestation::set_attestation,
        enclave::enclave_page,
        enclave::index_js
    ),
    components(
        schemas(
            health::HealthResponse,
            AttestationRequest,
            AttestationResponse
        )
    ),
    tags(
        (name = "Health", description = "Service liveness"),
        (name = "Attestation", description = "Attestation records and CSRF tokens"),
        (name = "Enclave", description = "Verify enclave page and script")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, Response, StatusCode},
    };
    use chrono::{Duration as ChronoDuration, Utc};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        config::{Config, Environment},
        metrics::capture,
        models::{Project, ProjectId, ScamVerdict},
        registry::StaticProjectRegistry,
        scam_guard::{ScamGuard, ScamGuardError},
    };

    const WC_PROJECT: &str = "a3b4c5d6e7f8a9b0c1d2e3f4a5b6c7d8";
    const OTHER_PROJECT: &str = "11111111111111111111111111111111";
    const UNVERIFIED_PROJECT: &str = "22222222222222222222222222222222";
    const DISABLED_PROJECT: &str = "33333333333333333333333333333333";

    const INVALID_PROJECT_ID: &str = "Invalid URL: ProjectId should be a hex string 32 chars long";

    /// `evil` is a scam, `tbd` is unknown, everything else is safe.
    struct FixtureGuard;

    #[async_trait]
    impl ScamGuard for FixtureGuard {
        async fn classify(&self, attestation_id: &str, _: &str) -> Result<ScamVerdict, ScamGuardError> {
            Ok(match attestation_id {
                "evil" => ScamVerdict::Scam,
                "tbd" => ScamVerdict::Unknown,
                _ => ScamVerdict::Safe,
            })
        }
    }

    fn project(id: &str, verified_domain: Option<&str>, verify_enabled: bool) -> Project {
        Project {
            id: ProjectId::parse(id).unwrap(),
            verified_domain: verified_domain.map(str::to_string),
            verify_enabled,
            extra_frame_ancestors: Vec::new(),
        }
    }

    fn state(environment: Environment) -> AppState {
        AppState::in_memory(Config::for_environment(environment))
            .with_projects(StaticProjectRegistry::new([
                project(WC_PROJECT, Some("https://walletconnect.com"), true),
                project(OTHER_PROJECT, Some("https://app.example.com"), true),
                project(UNVERIFIED_PROJECT, None, true),
                project(DISABLED_PROJECT, None, false),
            ]))
            .with_scam_guard(FixtureGuard)
    }

    async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
        router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn get(state: &AppState, uri: &str) -> Response<Body> {
        send(state, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn csp(response: &Response<Body>) -> Option<&str> {
        response
            .headers()
            .get(header::CONTENT_SECURITY_POLICY)
            .map(|v| v.to_str().unwrap())
    }

    fn post_attestation(token: Option<&str>, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post("/attestation").header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header("x-csrf-token", token);
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("verify_csrf={cookie}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn attest(state: &AppState, attestation_id: &str, origin: &str) -> Response<Body> {
        let issued = state.csrf.issue("sess");
        send(
            state,
            post_attestation(
                Some(&issued.token),
                Some(&issued.session_id),
                json!({ "attestationId": attestation_id, "origin": origin }),
            ),
        )
        .await
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(state(Environment::Local));
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn health_reports_ok_with_request_id() {
        let state = state(Environment::Dev);
        let response = get(&state, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "dev");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn metrics_need_an_installed_recorder() {
        let state = state(Environment::Local);
        let response = get(&state, "/metrics").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = state.with_metrics(handle);
        let response = get(&state, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }

    #[test]
    fn requests_record_latency_per_route() {
        let ((), rendered) = capture(async {
            let state = state(Environment::Dev);
            let response = get(&state, &format!("/{OTHER_PROJECT}")).await;
            assert_eq!(response.status(), StatusCode::OK);
        });

        assert!(rendered.contains("latency"));
        assert!(rendered.contains(r#"path="/{project_id}""#));
        assert!(rendered.contains(r#"method="GET""#));
        assert!(rendered.contains(r#"status="200""#));
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let state = state(Environment::Local);
        let response = get(&state, "/api-doc/openapi.json").await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc = body_json(response).await;
        assert!(doc["paths"]["/attestation"].is_object());
        assert!(doc["paths"]["/{project_id}"].is_object());
    }

    // =========================================================================
    // Enclave page
    // =========================================================================

    #[tokio::test]
    async fn malformed_project_ids_are_rejected_verbatim() {
        let state = state(Environment::Prod);
        for id in [
            "aaaaaaaaaa",
            "3bc51577baa09be45c84b85f13419ae8a",
            "3bc51577baa09be45c84b85f13419aez",
            "A3B4C5D6E7F8A9B0C1D2E3F4A5B6C7D8",
        ] {
            let response = get(&state, &format!("/{id}")).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{id}");
            assert_eq!(body_text(response).await, INVALID_PROJECT_ID);
        }
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let state = state(Environment::Prod);
        let response = get(&state, "/00000000000000000000000000000000").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response)
            .await
            .contains("Project with the provided ID doesn't exist"));
    }

    #[tokio::test]
    async fn prod_walletconnect_project_policy_and_token() {
        let state = state(Environment::Prod);
        let response = get(&state, &format!("/{WC_PROJECT}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(csp(&response), Some("frame-ancestors https://*.walletconnect.com"));
        assert!(response.headers().contains_key("x-csrf-token"));

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("verify_csrf="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));

        let token = response.headers()["x-csrf-token"].to_str().unwrap().to_string();
        let html = body_text(response).await;
        assert!(html.contains(&format!("/index.js?token={token}&amp;projectId={WC_PROJECT}")));
    }

    #[tokio::test]
    async fn prod_other_project_allows_only_its_origin() {
        let state = state(Environment::Prod);
        let response = get(&state, &format!("/{OTHER_PROJECT}")).await;
        assert_eq!(csp(&response), Some("frame-ancestors https://app.example.com"));
    }

    #[tokio::test]
    async fn non_prod_policy_is_the_composite() {
        let state = state(Environment::Staging);
        let response = get(&state, &format!("/{OTHER_PROJECT}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            csp(&response),
            Some(
                "frame-ancestors https://*.walletconnect.com https://walletconnect.com \
                 https://*.app.example.com https://app.example.com \
                 https://*.vercel.app https://vercel.app \
                 http://*.localhost http://localhost"
            )
        );
    }

    #[tokio::test]
    async fn non_prod_walletconnect_project_repeats_wc_group() {
        let state = state(Environment::Staging);
        let response = get(&state, &format!("/{WC_PROJECT}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            csp(&response),
            Some(
                "frame-ancestors https://*.walletconnect.com https://walletconnect.com \
                 https://*.walletconnect.com https://walletconnect.com \
                 https://*.vercel.app https://vercel.app \
                 http://*.localhost http://localhost"
            )
        );
    }

    #[tokio::test]
    async fn missing_verified_domain_depends_on_environment() {
        let prod = state(Environment::Prod);
        let response = get(&prod, &format!("/{UNVERIFIED_PROJECT}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response)
            .await
            .contains("Project with the provided ID doesn't have a verified domain"));

        let dev = state(Environment::Dev);
        let response = get(&dev, &format!("/{UNVERIFIED_PROJECT}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            csp(&response),
            Some(
                "frame-ancestors https://*.walletconnect.com https://walletconnect.com \
                 https://*.vercel.app https://vercel.app \
                 http://*.localhost http://localhost"
            )
        );
    }

    #[tokio::test]
    async fn disabled_verification_serves_without_policy() {
        let state = state(Environment::Prod);
        let response = get(&state, &format!("/{DISABLED_PROJECT}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(csp(&response), None);
    }

    // =========================================================================
    // index.js
    // =========================================================================

    #[tokio::test]
    async fn index_js_is_served_to_any_origin() {
        let state = state(Environment::Prod);
        let token = state.csrf.issue("sess").token;
        let response = get(&state, &format!("/index.js?token={token}")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/javascript"));
        assert_eq!(csp(&response), None);
        assert!(body_text(response).await.contains("/attestation"));

        let bare = get(&state, "/index.js").await;
        assert_eq!(bare.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn index_js_rejects_malformed_token() {
        let state = state(Environment::Prod);
        for query in ["token=", "token=%3Cscript%3E", "token=a%20b"] {
            let response = get(&state, &format!("/index.js?{query}")).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
        }
    }

    #[tokio::test]
    async fn index_js_applies_project_policy() {
        let state = state(Environment::Prod);
        let response = get(&state, &format!("/index.js?projectId={WC_PROJECT}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(csp(&response), Some("frame-ancestors https://*.walletconnect.com"));

        let bad = get(&state, "/index.js?projectId=nope").await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(bad).await, INVALID_PROJECT_ID);
    }

    // =========================================================================
    // Attestations
    // =========================================================================

    #[tokio::test]
    async fn mint_endpoint_issues_token_and_cookie() {
        let state = state(Environment::Local);
        let response = get(&state, "/attestation").await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let token = response.headers()["x-csrf-token"].to_str().unwrap();
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let session = cookie
            .strip_prefix("verify_csrf=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert_eq!(state.csrf.verify(token, Some(session)).unwrap(), session);
    }

    #[tokio::test]
    async fn minting_keeps_an_existing_session() {
        let state = state(Environment::Local);
        let request = Request::get("/attestation")
            .header(header::COOKIE, "verify_csrf=existing")
            .body(Body::empty())
            .unwrap();
        let response = send(&state, request).await;

        let token = response.headers()["x-csrf-token"].to_str().unwrap();
        assert_eq!(state.csrf.verify(token, Some("existing")).unwrap(), "existing");
    }

    #[tokio::test]
    async fn post_then_get_roundtrip() {
        let state = state(Environment::Local);

        let response = attest(&state, "some", "localhost").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

        let first = get(&state, "/attestation/some").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(first.headers().contains_key("x-csrf-token"));
        let first = body_json(first).await;
        assert_eq!(first["origin"], "localhost");

        let second = body_json(get(&state, "/attestation/some").await).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn scam_verdict_is_tri_state() {
        let state = state(Environment::Local);
        for (id, expected) in [
            ("evil", json!(true)),
            ("tbd", Value::Null),
            ("fine", json!(false)),
        ] {
            assert_eq!(attest(&state, id, "https://dapp.example").await.status(), StatusCode::OK);
            let body = body_json(get(&state, &format!("/attestation/{id}")).await).await;
            assert_eq!(body["isScam"], expected, "{id}");
        }
    }

    #[tokio::test]
    async fn overwrite_keeps_latest_origin() {
        let state = state(Environment::Local);
        attest(&state, "id", "https://first.example").await;
        attest(&state, "id", "https://second.example").await;

        let body = body_json(get(&state, "/attestation/id").await).await;
        assert_eq!(body["origin"], "https://second.example");
    }

    #[tokio::test]
    async fn unknown_attestation_is_not_found_with_cors() {
        let state = state(Environment::Local);
        let response = get(&state, "/attestation/missing").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn preflight_is_identical_for_any_id() {
        let state = state(Environment::Local);
        attest(&state, "known", "localhost").await;

        let mut statuses = Vec::new();
        for id in ["known", "missing"] {
            let request = Request::options(format!("/attestation/{id}"))
                .header(header::ORIGIN, "https://dapp.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap();
            let response = send(&state, request).await;
            assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            statuses.push(response.status());
            assert!(body_text(response).await.is_empty());
        }
        assert_eq!(statuses, [StatusCode::NO_CONTENT, StatusCode::NO_CONTENT]);
    }

    #[tokio::test]
    async fn post_without_token_is_forbidden() {
        let state = state(Environment::Local);
        let response = send(
            &state,
            post_attestation(None, None, json!({ "attestationId": "x", "origin": "localhost" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error_code"], "missing_token");
        assert!(state.attestations.get_attestation("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn post_with_token_only_is_accepted() {
        let state = state(Environment::Local);
        let token = state.csrf.issue("sess").token;
        let response = send(
            &state,
            post_attestation(Some(&token), None, json!({ "attestationId": "x", "origin": "localhost" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_with_malformed_cookie_is_forbidden() {
        let state = state(Environment::Local);
        let token = state.csrf.issue("sess").token;
        let response = send(
            &state,
            post_attestation(
                Some(&token),
                Some("<script>"),
                json!({ "attestationId": "x", "origin": "localhost" }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error_code"], "cookie_mismatch");
        assert!(state.attestations.get_attestation("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_or_garbled_tokens_are_forbidden() {
        let state = state(Environment::Local);
        let body = json!({ "attestationId": "x", "origin": "localhost" });

        let expired = state
            .csrf
            .issue_at("sess", Utc::now() - ChronoDuration::hours(2))
            .token;
        let response = send(&state, post_attestation(Some(&expired), Some("sess"), body.clone())).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let valid = state.csrf.issue("sess").token;
        let (payload, _) = valid.split_once('.').unwrap();
        let garbled = format!("{payload}.garbled");
        let response = send(&state, post_attestation(Some(&garbled), Some("sess"), body.clone())).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&state, post_attestation(Some(&valid), Some("other"), body)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error_code"], "cookie_mismatch");

        assert!(state.attestations.get_attestation("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_bodies_are_bad_requests() {
        let state = state(Environment::Local);
        let issued = state.csrf.issue("sess");

        for body in [
            json!({ "attestationId": "x" }),
            json!({ "attestationId": "", "origin": "localhost" }),
            json!({ "attestationId": "x", "origin": "" }),
        ] {
            let response = send(
                &state,
                post_attestation(Some(&issued.token), Some(&issued.session_id), body.clone()),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }
}
