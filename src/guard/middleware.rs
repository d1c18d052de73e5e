use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::{Method, header},
};
use futures_util::future::{LocalBoxFuture, Ready, ok, ready};
use log::{debug, warn};
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};
use uuid::Uuid;

use super::rules::{GuardPolicy, RequestMeta};
use crate::error::AuthError;
use crate::models::claims::EmploymentStatus;
use crate::token::{self, TokenService};

/// Identity established by the guard for handlers downstream.
#[derive(Debug, Clone)]
pub struct AuthenticatedEmployee {
    pub subject: String,
    pub account_id: String,
    pub employment_status: EmploymentStatus,
}

impl actix_web::FromRequest for AuthenticatedEmployee {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<Self>().cloned().ok_or_else(|| {
            AuthError::AuthenticationFailed("Authentication required".to_string()).into()
        }))
    }
}

fn header_string(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn request_meta(req: &ServiceRequest) -> RequestMeta {
    RequestMeta {
        path: req.path().to_string(),
        origin: header_string(req, "origin"),
        host: header_string(req, "host"),
        referer: header_string(req, "referer"),
        user_agent: header_string(req, "user-agent"),
        client_header: header_string(req, crate::constants::CLIENT_ID_HEADER),
    }
}

/// Trust-perimeter middleware: classifies the caller, then applies
/// employment-status gating when the request carries a token.
pub struct BoundaryGuard {
    policy: Arc<GuardPolicy>,
    tokens: Arc<TokenService>,
}

impl BoundaryGuard {
    pub fn new(policy: Arc<GuardPolicy>, tokens: Arc<TokenService>) -> Self {
        Self { policy, tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BoundaryGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = BoundaryGuardMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(BoundaryGuardMiddleware {
            service: Rc::new(service),
            policy: Arc::clone(&self.policy),
            tokens: Arc::clone(&self.tokens),
        })
    }
}

pub struct BoundaryGuardMiddleware<S> {
    service: Rc<S>,
    policy: Arc<GuardPolicy>,
    tokens: Arc<TokenService>,
}

fn apply_guard(
    policy: &GuardPolicy,
    tokens: &TokenService,
    req: &ServiceRequest,
) -> Result<(), AuthError> {
    let meta = request_meta(req);
    let classification = policy.classify(&meta);

    if !classification.allowed {
        let reason = classification
            .reason
            .clone()
            .unwrap_or_else(|| "External access is not permitted".to_string());
        warn!(
            "boundary_denied: request_id={}, path={}, agent={:?}",
            Uuid::new_v4(),
            meta.path,
            meta.user_agent.as_deref().unwrap_or("<none>")
        );
        return Err(AuthError::AuthorizationDenied {
            message: reason,
            status: None,
        });
    }

    // Employment-status gating applies once a token is presented,
    // regardless of how the caller was classified.
    if let Some(value) = header_string(req, header::AUTHORIZATION.as_str()) {
        let raw = token::extract_from_header(&value).ok_or_else(|| {
            AuthError::AuthenticationFailed("Invalid authorization header".to_string())
        })?;

        let claims = tokens.validate(raw).map_err(|_| {
            AuthError::AuthenticationFailed("Authentication failed".to_string())
        })?;

        let status = claims.employment_status;
        if !status.can_login() {
            debug!(
                "status_gated: subject={}, status={}",
                claims.sub, status
            );
            return Err(AuthError::denied_for_status(status));
        }

        req.extensions_mut().insert(AuthenticatedEmployee {
            subject: claims.sub.clone(),
            account_id: claims.account_id.clone(),
            employment_status: status,
        });
        req.extensions_mut().insert(claims);
    }

    req.extensions_mut().insert(classification);
    Ok(())
}

impl<S, B> Service<ServiceRequest> for BoundaryGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let policy = Arc::clone(&self.policy);
        let tokens = Arc::clone(&self.tokens);

        Box::pin(async move {
            // Pre-flight is answered by the CORS layer; it never
            // carries credentials and is not classified.
            if req.method() == Method::OPTIONS {
                return service.call(req).await;
            }

            // Health/diagnostic paths bypass all checks.
            if policy.is_bypass(req.path()) {
                return service.call(req).await;
            }

            apply_guard(&policy, &tokens, &req)?;
            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CLIENT_ID_VALUE;
    use actix_web::body::{MessageBody, to_bytes};
    use actix_web::{App, HttpResponse, error::ResponseError, test, web};

    const SECRET: &str = "guard-test-secret";

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(SECRET, 900))
    }

    fn app_factory() -> App<
        impl actix_web::dev::ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        let guard = BoundaryGuard::new(Arc::new(GuardPolicy::with_defaults()), tokens());
        App::new()
            .wrap(guard)
            .route(
                "/health",
                web::get().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
                }),
            )
            .route(
                "/api/employees",
                web::get().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({"items": []}))
                }),
            )
    }

    async fn send<S, R, B>(app: &S, req: R) -> (u16, String)
    where
        S: Service<R, Response = ServiceResponse<B>, Error = Error>,
        B: MessageBody,
    {
        match test::try_call_service(app, req).await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = test::read_body(resp).await;
                (status, String::from_utf8_lossy(&body).into_owned())
            }
            Err(err) => {
                let resp = err.error_response();
                let status = resp.status().as_u16();
                let body = to_bytes(resp.into_body()).await.unwrap_or_default();
                (status, String::from_utf8_lossy(&body).into_owned())
            }
        }
    }

    #[actix_web::test]
    async fn web_origin_is_allowed() {
        let app = test::init_service(app_factory()).await;
        let req = test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("Origin", "https://hr.fieldforce.io"))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, 200);
    }

    #[actix_web::test]
    async fn mobile_client_with_app_token_is_allowed() {
        let app = test::init_service(app_factory()).await;
        let req = test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("User-Agent", "FieldForce-Mobile/0.4 (okhttp/4.12)"))
            .insert_header((crate::constants::CLIENT_ID_HEADER, CLIENT_ID_VALUE))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, 200);
    }

    #[actix_web::test]
    async fn mobile_signature_without_app_token_is_denied() {
        let app = test::init_service(app_factory()).await;
        let req = test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("User-Agent", "FieldForce-Mobile/0.4 (okhttp/4.12)"))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, 403);
    }

    #[actix_web::test]
    async fn curl_is_denied_as_suspicious() {
        let app = test::init_service(app_factory()).await;
        let req = test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("User-Agent", "curl/7.68.0"))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 403);
        assert!(body.to_lowercase().contains("suspicious"));
    }

    #[actix_web::test]
    async fn suspended_token_is_gated_with_specific_message() {
        let app = test::init_service(app_factory()).await;
        let token = tokens()
            .issue("EMP-7", "acc-7", EmploymentStatus::Suspended)
            .unwrap();
        let req = test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("Origin", "https://hr.fieldforce.io"))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 403);
        assert!(body.to_lowercase().contains("suspended"));
        assert!(body.contains("SUSPENDED"));
    }

    #[actix_web::test]
    async fn active_token_proceeds() {
        let app = test::init_service(app_factory()).await;
        let token = tokens()
            .issue("EMP-7", "acc-7", EmploymentStatus::Active)
            .unwrap();
        let req = test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("Origin", "https://hr.fieldforce.io"))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, 200);
    }

    #[actix_web::test]
    async fn invalid_token_fails_generically() {
        let app = test::init_service(app_factory()).await;
        let req = test::TestRequest::get()
            .uri("/api/employees")
            .insert_header(("Origin", "https://hr.fieldforce.io"))
            .insert_header(("Authorization", "Bearer not.a.token"))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, 401);
        // No hint about why validation failed.
        assert!(!body.to_lowercase().contains("signature"));
        assert!(!body.to_lowercase().contains("issuer"));
    }

    #[actix_web::test]
    async fn health_bypasses_all_checks() {
        let app = test::init_service(app_factory()).await;
        let req = test::TestRequest::get()
            .uri("/health")
            .insert_header(("User-Agent", "curl/7.68.0"))
            .to_request();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, 200);
    }

    #[actix_web::test]
    async fn options_preflight_is_not_gated() {
        let app = test::init_service(app_factory()).await;
        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/employees")
            .insert_header(("User-Agent", "curl/7.68.0"))
            .to_request();
        let (status, _) = send(&app, req).await;
        // Forwarded past the guard; the route table answers (405 here,
        // the CORS layer in the assembled app).
        assert_ne!(status, 401);
        assert_ne!(status, 403);
    }
}
