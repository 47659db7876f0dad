use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{Method, header::CONTENT_TYPE},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::api::jwt::IdentityVerifier;
use crate::api::services::helpers::{AuthenticatedProfile, error_from_tracker};
use crate::errors::TrackerError;

/// Bearer-token authentication against the external identity provider.
///
/// On success the profile id is stored as [`AuthenticatedProfile`] in the
/// request extensions; otherwise the request is answered with 401.
#[derive(Clone)]
pub struct ProfileAuth {
    verifier: Arc<IdentityVerifier>,
}

impl ProfileAuth {
    pub fn new(verifier: Arc<IdentityVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ProfileAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ProfileAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ProfileAuthMiddleware {
            service: Rc::new(service),
            verifier: Arc::clone(&self.verifier),
        }))
    }
}

pub struct ProfileAuthMiddleware<S> {
    service: Rc<S>,
    verifier: Arc<IdentityVerifier>,
}

impl<S, B> ProfileAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    /// Handle OPTIONS requests for CORS preflight
    fn handle_options_request(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        req.into_response(
            HttpResponse::NoContent()
                .insert_header((CONTENT_TYPE, "text/plain; charset=utf-8"))
                .finish()
                .map_into_right_body(),
        )
    }

    fn handle_unauthorized(req: ServiceRequest, err: TrackerError) -> ServiceResponse<EitherBody<B>> {
        debug!("Profile authentication failed: {}", err);
        req.into_response(error_from_tracker(&err).map_into_right_body())
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl<S, B> Service<ServiceRequest> for ProfileAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let verifier = Arc::clone(&self.verifier);

        Box::pin(async move {
            if req.method() == Method::OPTIONS {
                return Ok(Self::handle_options_request(req));
            }

            let Some(token) = Self::extract_bearer_token(&req) else {
                return Ok(Self::handle_unauthorized(
                    req,
                    TrackerError::unauthenticated("Missing bearer token"),
                ));
            };

            match verifier.verify(&token) {
                Ok(profile_id) => {
                    trace!("Authenticated profile {}", profile_id);
                    req.extensions_mut()
                        .insert(AuthenticatedProfile(profile_id));
                    let response = srv.call(req).await?.map_into_left_body();
                    Ok(response)
                }
                Err(_) => Ok(Self::handle_unauthorized(
                    req,
                    TrackerError::unauthenticated("Invalid or expired token"),
                )),
            }
        })
    }
}
