#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use stocklock_core::LockConfig;

    use crate::server::router;

    fn app() -> Router {
        let service = stocklock_core::client::open_service(
            LockConfig::default(),
            "memory,memory,memory",
            "memory",
        )
        .unwrap();
        router(Arc::new(service))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app.clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn load_test_deduct_path_returns_created() {
        let app = app();
        assert_eq!(send(&app, Method::POST, "/product/reset", None).await, StatusCode::CREATED);

        let status = send(&app, Method::POST, "/product/1/deduct", Some(r#"{"quantity":1}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(send(&app, Method::GET, "/product/1", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn plural_paths_are_aliases() {
        let app = app();
        assert_eq!(send(&app, Method::POST, "/products/reset", None).await, StatusCode::CREATED);

        let status = send(&app, Method::POST, "/products/1/deduct", Some(r#"{"quantity":2}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(send(&app, Method::GET, "/products", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn deduct_errors_map_to_statuses() {
        let app = app();
        send(&app, Method::POST, "/product/reset", None).await;

        let zero = send(&app, Method::POST, "/product/1/deduct", Some(r#"{"quantity":0}"#)).await;
        assert_eq!(zero, StatusCode::BAD_REQUEST);

        let missing = send(&app, Method::POST, "/product/99/deduct", Some(r#"{"quantity":1}"#)).await;
        assert_eq!(missing, StatusCode::NOT_FOUND);

        let overdraw = send(&app, Method::POST, "/product/1/deduct", Some(r#"{"quantity":101}"#)).await;
        assert_eq!(overdraw, StatusCode::CONFLICT);

        assert_eq!(send(&app, Method::DELETE, "/product", None).await, StatusCode::OK);
        assert_eq!(send(&app, Method::GET, "/product/1", None).await, StatusCode::NOT_FOUND);
    }
}
