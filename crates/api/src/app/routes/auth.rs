//! Registration, login, email verification, and password reset.
//!
//! Email *delivery* is out of scope: issued verification and reset tokens
//! are returned in the response body as the hand-off seam to the external
//! mailer.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::{Duration, Utc};

use tradepost_auth::{JwtClaims, Role};
use tradepost_buyers::{BuyerCommand, BuyerId, BuyerProfile, CreateBuyer};
use tradepost_core::UserId;
use tradepost_identity::{
    Account, AccountCommand, RegisterAccount, RequestPasswordReset, ResetPassword,
    SupersedeAccount, TokenRecord, VerifyEmail, hash_password, verify_password,
};
use tradepost_infra::streams;
use tradepost_suppliers::{CreateProfile, SupplierCommand, SupplierId, SupplierProfile};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_HOURS: i64 = 1;
const SESSION_TTL_HOURS: i64 = 8;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-email", post(verify_email))
        .route("/request-password-reset", post(request_password_reset))
        .route("/reset-password", post(reset_password))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let role: Role = match body.role.parse() {
        Ok(Role::Admin) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "admin accounts cannot be self-registered",
            );
        }
        Ok(role) => role,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "role must be buyer or supplier",
            );
        }
    };

    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "invalid email");
    }
    if body.password.len() < 8 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "password must be at least 8 characters",
        );
    }

    // Re-registration policy: a verified account blocks the email; an
    // unverified one is superseded so an abandoned signup never locks the
    // address out.
    if let Some(existing) = services.projections().accounts.by_email(&email) {
        if existing.email_verified {
            return errors::json_error(
                StatusCode::CONFLICT,
                "conflict",
                "email is already registered",
            );
        }

        let superseded = services.dispatch::<Account>(
            existing.user_id.into(),
            streams::ACCOUNT,
            AccountCommand::Supersede(SupersedeAccount {
                user_id: existing.user_id,
                occurred_at: Utc::now(),
            }),
            |agg| Account::empty(UserId::from(agg)),
        );
        if let Err(e) = superseded {
            return errors::dispatch_error_to_response(e);
        }
    }

    let password_hash = match hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                e.to_string(),
            );
        }
    };

    let user_id = UserId::new();
    let now = Utc::now();
    let verification_token = TokenRecord {
        token: uuid::Uuid::new_v4(),
        expires_at: now + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS),
    };

    if let Err(e) = services.dispatch::<Account>(
        user_id.into(),
        streams::ACCOUNT,
        AccountCommand::Register(RegisterAccount {
            user_id,
            email: email.clone(),
            password_hash,
            role,
            verification_token,
            occurred_at: now,
        }),
        |agg| Account::empty(UserId::from(agg)),
    ) {
        return errors::dispatch_error_to_response(e);
    }

    // One empty profile per account, created alongside registration.
    let profile_result = match role {
        Role::Supplier => {
            let supplier_id = SupplierId::from(user_id);
            services.dispatch::<SupplierProfile>(
                supplier_id.0,
                streams::SUPPLIER,
                SupplierCommand::Create(CreateProfile {
                    supplier_id,
                    user_id,
                    contact_email: Some(email.clone()),
                    occurred_at: now,
                }),
                |agg| SupplierProfile::empty(SupplierId::new(agg)),
            )
        }
        Role::Buyer => {
            let buyer_id = BuyerId::from(user_id);
            services.dispatch::<BuyerProfile>(
                buyer_id.0,
                streams::BUYER,
                BuyerCommand::Create(CreateBuyer {
                    buyer_id,
                    user_id,
                    contact_email: Some(email.clone()),
                    occurred_at: now,
                }),
                |agg| BuyerProfile::empty(BuyerId::new(agg)),
            )
        }
        Role::Admin => unreachable!("admin registration rejected above"),
    };
    if let Err(e) = profile_result {
        return errors::dispatch_error_to_response(e);
    }

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "user_id": user_id.to_string(),
            "role": role.as_str(),
            "verification_token": verification_token.token,
            "verification_expires_at": verification_token.expires_at,
        })),
    )
        .into_response()
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let Some(account) = services.projections().accounts.by_email(&body.email) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid credentials");
    };

    match verify_password(&body.password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return errors::json_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid credentials",
            );
        }
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                e.to_string(),
            );
        }
    }

    // Non-admin logins require a verified email; admins are seeded and
    // exempt.
    if !account.email_verified && !account.role.is_admin() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "email is not verified",
        );
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: account.user_id,
        role: account.role,
        issued_at: now,
        expires_at: now + Duration::hours(SESSION_TTL_HOURS),
    };
    let token = match services.jwt().encode(&claims) {
        Ok(token) => token,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                e.to_string(),
            );
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "token": token,
            "user_id": account.user_id.to_string(),
            "role": account.role.as_str(),
            "expires_at": claims.expires_at,
        })),
    )
        .into_response()
}

pub async fn verify_email(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::VerifyEmailRequest>,
) -> axum::response::Response {
    let Some(account) = services
        .projections()
        .accounts
        .by_verification_token(body.token)
    else {
        return errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "unknown verification token",
        );
    };

    // The aggregate checks token match and expiry.
    match services.dispatch::<Account>(
        account.user_id.into(),
        streams::ACCOUNT,
        AccountCommand::VerifyEmail(VerifyEmail {
            user_id: account.user_id,
            token: body.token,
            occurred_at: Utc::now(),
        }),
        |agg| Account::empty(UserId::from(agg)),
    ) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "user_id": account.user_id.to_string(),
                "email_verified": true,
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn request_password_reset(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RequestPasswordResetRequest>,
) -> axum::response::Response {
    let Some(account) = services.projections().accounts.by_email(&body.email) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "unknown email");
    };

    let reset_token = TokenRecord {
        token: uuid::Uuid::new_v4(),
        expires_at: Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS),
    };

    match services.dispatch::<Account>(
        account.user_id.into(),
        streams::ACCOUNT,
        AccountCommand::RequestPasswordReset(RequestPasswordReset {
            user_id: account.user_id,
            reset_token,
            occurred_at: Utc::now(),
        }),
        |agg| Account::empty(UserId::from(agg)),
    ) {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "reset_token": reset_token.token,
                "expires_at": reset_token.expires_at,
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ResetPasswordRequest>,
) -> axum::response::Response {
    if body.new_password.len() < 8 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "password must be at least 8 characters",
        );
    }

    let Some(account) = services.projections().accounts.by_reset_token(body.token) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "unknown reset token");
    };

    let new_password_hash = match hash_password(&body.new_password) {
        Ok(hash) => hash,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hash_error",
                e.to_string(),
            );
        }
    };

    match services.dispatch::<Account>(
        account.user_id.into(),
        streams::ACCOUNT,
        AccountCommand::ResetPassword(ResetPassword {
            user_id: account.user_id,
            token: body.token,
            new_password_hash,
            occurred_at: Utc::now(),
        }),
        |agg| Account::empty(UserId::from(agg)),
    ) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
