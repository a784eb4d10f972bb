//! # Index Page
//!
//! `GET /` serves `index.html` from the configured public directory,
//! falling back to an embedded page when the file is absent. Any other
//! read failure is a 500.

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

const FALLBACK_INDEX: &str = "<!DOCTYPE html>\n<html>\n<head><title>keygate</title></head>\n<body><h1>keygate</h1><p>License key service.</p></body>\n</html>\n";

/// Build the pages router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// GET / — Serve the landing page.
async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let path = state.config.public_dir.join("index.html");

    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => Ok(Html(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(Html(FALLBACK_INDEX.to_string()))
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read index page");
            Err(AppError::Internal(format!("failed to read index page: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AppConfig, LicenseStore};
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use http_body_util::BodyExt;
    use keygate_core::AdminCredentials;
    use tower::ServiceExt;

    fn test_credentials() -> AdminCredentials {
        use argon2::password_hash::rand_core::OsRng;
        use argon2::password_hash::SaltString;
        use argon2::{Argon2, PasswordHasher};

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"hunter2", &salt)
            .unwrap()
            .to_string();
        AdminCredentials::new("admin", hash).unwrap()
    }

    fn state_with_public_dir(dir: std::path::PathBuf) -> AppState {
        AppState {
            config: AppConfig {
                port: 0,
                https: false,
                logging_enabled: false,
                domain: "localhost".into(),
                database_url: None,
                public_dir: dir,
            },
            credentials: test_credentials(),
            stripe: None,
            licenses: LicenseStore::new(),
            db: None,
        }
    }

    #[tokio::test]
    async fn serves_index_from_public_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>custom page</h1>").unwrap();

        let response = router()
            .with_state(state_with_public_dir(dir.path().to_path_buf()))
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>custom page</h1>");
    }

    #[tokio::test]
    async fn missing_index_falls_back_to_embedded_page() {
        let dir = tempfile::tempdir().unwrap();

        let response = router()
            .with_state(state_with_public_dir(dir.path().to_path_buf()))
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("keygate"));
    }
}
