use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized};
use actix_web::{web, Error, HttpMessage};
use actix_web_lab::middleware::Next;
use helpers::auth_jwt::auth::{verify_jwt, Claims, Role};
use lib_config::config::configuration::Settings;

fn authenticate(req: &ServiceRequest) -> Result<Claims, Error> {
    let token = req.headers().get("Authorization");
    if token.is_none() {
        return Err(ErrorUnauthorized("Missing token"));
    }
    let token = token.unwrap().to_str().unwrap_or("").replace("Bearer ", "");
    if token.is_empty() {
        return Err(ErrorUnauthorized("Invalid token"));
    }
    let settings = req
        .app_data::<web::Data<Settings>>()
        .ok_or_else(|| ErrorInternalServerError("Missing configuration"))?;
    verify_jwt(&token, &settings.jwt.secret).map_err(|_| ErrorUnauthorized("Invalid token"))
}

pub async fn jwt_auth_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let claims = authenticate(&req)?;
    req.extensions_mut().insert(claims);
    next.call(req).await
}

pub async fn admin_auth_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let claims = authenticate(&req)?;
    if claims.role != Role::Admin {
        return Err(ErrorForbidden("Administrator access required"));
    }
    req.extensions_mut().insert(claims);
    next.call(req).await
}
