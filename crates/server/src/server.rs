use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{BillExtractor, balance, bills, extract, friends, payments, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    pub extractor: Arc<dyn BillExtractor>,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    // The gateway callback is authenticated by its HMAC signature, not by
    // Basic auth, so it sits outside the auth layer.
    let callback = Router::new()
        .route("/payments/confirm", post(payments::confirm))
        .with_state(state.clone());

    let authed = Router::new()
        .route("/bills", post(bills::create).get(bills::list))
        .route("/bills/{id}", get(bills::detail))
        .route("/bills/{id}/cancel", post(bills::cancel))
        .route("/friends", get(friends::list))
        .route("/friends/requests", post(friends::request).get(friends::pending))
        .route("/friends/requests/{requester}/accept", post(friends::accept))
        .route("/friends/{username}/block", post(friends::block))
        .route("/balance/{username}", get(balance::between))
        .route("/payments", post(payments::initiate))
        .route("/users/me", get(user::me))
        .route("/users/search", post(user::search_by_phone))
        .route("/extract", post(extract::extract_bill))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state);

    authed.merge(callback)
}

pub async fn run(engine: Engine, db: DatabaseConnection, extractor: Arc<dyn BillExtractor>) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, extractor, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    extractor: Arc<dyn BillExtractor>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
        extractor,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    extractor: Arc<dyn BillExtractor>,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, extractor, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement};
    use tower::ServiceExt;

    use api_types::extract::ExtractedBill;
    use engine::SettlementVerifier;

    pub(crate) const SECRET: &[u8] = b"merchant-key";

    struct StubExtractor;

    #[async_trait::async_trait]
    impl BillExtractor for StubExtractor {
        async fn extract(&self, _image: &[u8]) -> Result<ExtractedBill, crate::ExtractionError> {
            Ok(ExtractedBill {
                merchant_name: Some("Cafe Azzurro".to_string()),
                items: vec![],
                subtotal_minor: Some(9500),
                tax_minor: Some(500),
                tip_minor: Some(0),
                total_minor: Some(10_000),
                currency: api_types::Currency::Inr,
                raw: "{}".to_string(),
            })
        }
    }

    pub(crate) async fn test_router() -> (Router, DatabaseConnection) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let backend = db.get_database_backend();
        for user in ["alice", "bob", "carol"] {
            db.execute(Statement::from_sql_and_values(
                backend,
                "INSERT INTO users (username, password, display_name, phone_number) \
                 VALUES (?, ?, ?, ?)",
                vec![
                    user.into(),
                    "password".into(),
                    user.into(),
                    format!("+91-{user}").into(),
                ],
            ))
            .await
            .unwrap();
        }

        let engine = Engine::builder()
            .database(db.clone())
            .gateway_secret(SECRET.to_vec())
            .build()
            .unwrap();
        let state = ServerState {
            engine: Arc::new(engine),
            db: db.clone(),
            extractor: Arc::new(StubExtractor),
        };
        (router(state), db)
    }

    pub(crate) fn basic_auth(user: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:password"));
        format!("Basic {encoded}")
    }

    pub(crate) async fn send_json(
        router: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, basic_auth(user));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    pub(crate) fn sign_confirmation(body: &mut serde_json::Value) {
        let confirmation = engine::Confirmation {
            order_ref: body["order_ref"].as_str().unwrap().to_string(),
            payment_ref: body["payment_ref"].as_str().unwrap().to_string(),
            bill_id: body["bill_id"].as_str().unwrap().parse().unwrap(),
            payer: body["payer"].as_str().unwrap().to_string(),
            payee: body["payee"].as_str().unwrap().to_string(),
            amount_minor: body["amount_minor"].as_i64().unwrap(),
            currency: engine::Currency::Inr,
            signature: String::new(),
        };
        body["signature"] =
            SettlementVerifier::new(SECRET).sign(&confirmation).into();
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected() {
        let (router, _db) = test_router().await;
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/friends")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (router, _db) = test_router().await;
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:wrong");
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/friends")
            .header(header::AUTHORIZATION, format!("Basic {encoded}"))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn prefix_of_a_username_is_not_enough() {
        let (router, db) = test_router().await;
        let backend = db.get_database_backend();
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, display_name) VALUES (?, ?, ?)",
            vec!["alicette".into(), "password".into(), "alicette".into()],
        ))
        .await
        .unwrap();

        // "alice" must not authenticate as a substring match of "alicette".
        let encoded = base64::engine::general_purpose::STANDARD.encode("alic:password");
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/friends")
            .header(header::AUTHORIZATION, format!("Basic {encoded}"))
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
