#[cfg(test)]
mod router_tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::{app_state::AppState, create_router};
    use crate::config::AppConfig;
    use crate::models::curve::CurveDataset;
    use crate::models::target::TargetRegistry;
    use crate::observability::AppMetrics;
    use crate::services::analysis::create_analysis_service;

    fn app(config: AppConfig) -> (Router, Arc<AppMetrics>) {
        let registry = TargetRegistry::builtin();
        let curves = CurveDataset::bundled();
        let metrics = Arc::new(AppMetrics::default());
        let service = create_analysis_service(
            &config,
            Arc::new(registry.clone()),
            Arc::new(curves.clone()),
            None,
            metrics.clone(),
        );
        let state = AppState::new(
            config,
            registry,
            curves,
            service,
            reqwest::Client::new(),
            metrics.clone(),
        );
        (create_router(state), metrics)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn analyze_request(body: Value, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/analyze")
            .header("Content-Type", "application/json");
        if let Some(token) = bearer {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_list_targets() {
        let (app, metrics) = app(AppConfig::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/targets")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 10);
        let gmail = body["targets"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["key"] == "gmail")
            .unwrap();
        assert_eq!(gmail["launch_date"], "2004-04-01");
        assert_eq!(
            metrics
                .http_requests_total
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_timeline_in_display_units() {
        let (app, _) = app(AppConfig::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/targets/twitter/timeline")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["unit"], 1_000_000);
        let series = body["series"].as_array().unwrap();
        assert!(series.len() >= 2);
        assert_eq!(series[0]["value"], 0.0);
    }

    #[tokio::test]
    async fn test_timeline_unknown_target_returns_404() {
        let (app, _) = app(AppConfig::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/targets/myspace/timeline")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_analyze_manual_only() {
        let (app, _) = app(AppConfig::default());

        let response = app
            .oneshot(analyze_request(
                json!({"manual": {"twitter": "2009-03", "reddit": "2012-01"}}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let platforms = body["platforms"].as_array().unwrap();
        assert_eq!(platforms.len(), 2);
        assert!(platforms.iter().all(|p| p["joined"]["verified"] == false));
        assert!(body["composite"]["overall"].is_number());
        assert!(body["composite"]["verified_only"].is_null());
    }

    #[tokio::test]
    async fn test_analyze_rejects_malformed_manual_date() {
        let (app, _) = app(AppConfig::default());

        let response = app
            .oneshot(analyze_request(json!({"manual": {"twitter": "sometime"}}), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_with_rejected_token_returns_401() {
        let gmail = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&gmail)
            .await;

        let mut config = AppConfig::default();
        config.gmail.api_base = gmail.uri();
        let (app, metrics) = app(config);

        let response = app
            .oneshot(analyze_request(
                json!({"targets": ["gmail"]}),
                Some("expired-token"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "UNAUTHORIZED");
        assert_eq!(
            metrics
                .auth_failures_total
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }
}
