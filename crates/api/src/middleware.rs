//! Request pipeline: identity, then isolation and subscription.
//!
//! ```text
//! Authorization: Bearer <jwt>
//!   ↓
//! auth_middleware: validate token, reload principal      (401)
//!   ↓
//! gate_middleware: path/query/body schoolId vs principal  (403)
//!                  tenant active & subscription valid     (403 / 404)
//!   ↓
//! handler: role policy, then the operation
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use serde::Deserializer;
use serde::de::{IgnoredAny, MapAccess, Visitor};

use scholaris_auth::{AuthError, Principal, TokenValidator};
use scholaris_core::TenantId;
use scholaris_infra::{PrincipalDirectory, TenantRegistry};
use scholaris_tenancy::{SubscriptionStatus, check_subscription, resolve_requested};

use crate::app::errors::ApiError;
use crate::context::RequestContext;

pub const SUBSCRIPTION_WARNING_HEADER: HeaderName = HeaderName::from_static("x-subscription-warning");

const TENANT_FIELD: &str = "schoolId";
const MAX_GATED_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenValidator>,
    pub directory: Arc<dyn PrincipalDirectory>,
}

#[derive(Clone)]
pub struct GateState {
    pub registry: Arc<dyn TenantRegistry>,
}

/// Resolve the session to a live principal and attach it to the request.
///
/// The principal is re-read on every request: a deleted account's token
/// stops working immediately.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;
    let claims = state.tokens.validate(token, Utc::now())?;

    let principal = state
        .directory
        .get(claims.sub)?
        .ok_or_else(|| ApiError::Authentication("user not found".into()))?;
    if principal.role() != claims.role || principal.tenant_id() != claims.tenant_id {
        return Err(AuthError::InvalidToken("claims no longer match the account".into()).into());
    }

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Bind the effective tenant and check the subscription.
///
/// Must run after [`auth_middleware`].
pub async fn gate_middleware(
    State(state): State<GateState>,
    path: Option<Path<HashMap<String, String>>>,
    Query(query): Query<Vec<(String, String)>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let principal = req
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or_else(|| ApiError::from(AuthError::MissingCredentials))?;

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_GATED_BODY_BYTES)
        .await
        .map_err(|_| ApiError::PayloadTooLarge("request body too large".into()))?;

    let mut requested = Vec::new();
    if let Some(Path(params)) = &path {
        if let Some(raw) = params.get(TENANT_FIELD) {
            requested.push(parse_tenant(raw)?);
        }
    }
    // Every occurrence counts: a repeated key must not let an own id mask a
    // foreign one.
    for (key, raw) in &query {
        if key == TENANT_FIELD {
            requested.push(parse_tenant(raw)?);
        }
    }
    requested.extend(body_tenants(&bytes)?);

    let tenant = resolve_requested(&principal, requested)?;
    let subscription = subscription_for(&state, &principal, now)?;

    let client_ip = client_ip(&parts.headers);
    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(RequestContext::new(
        principal,
        tenant,
        subscription,
        client_ip,
        now,
    ));

    let mut res = next.run(req).await;
    if let Some(days) = subscription.warning_days() {
        res.headers_mut()
            .insert(SUBSCRIPTION_WARNING_HEADER, HeaderValue::from(days));
    }
    Ok(res)
}

fn subscription_for(
    state: &GateState,
    principal: &Principal,
    now: chrono::DateTime<Utc>,
) -> Result<SubscriptionStatus, ApiError> {
    let Some(tenant_id) = principal.tenant_id() else {
        return Ok(SubscriptionStatus::Active);
    };
    let tenant = state
        .registry
        .get(tenant_id)?
        .ok_or_else(|| ApiError::not_found("school"))?;
    Ok(check_subscription(principal, &tenant, now)?)
}

fn parse_tenant(raw: &str) -> Result<TenantId, ApiError> {
    raw.parse::<TenantId>()
        .map_err(|_| ApiError::Validation("invalid schoolId".into()))
}

/// Every top-level `schoolId` of a JSON object body, duplicates included.
/// Non-JSON bodies carry none; the handler's own extractor reports them.
fn body_tenants(bytes: &[u8]) -> Result<Vec<TenantId>, ApiError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let Ok(values) = (&mut de).deserialize_map(TenantFieldVisitor) else {
        return Ok(Vec::new());
    };

    let mut tenants = Vec::with_capacity(values.len());
    for value in values {
        match value {
            serde_json::Value::Null => {}
            serde_json::Value::String(raw) => tenants.push(parse_tenant(&raw)?),
            _ => return Err(ApiError::Validation("invalid schoolId".into())),
        }
    }
    Ok(tenants)
}

/// Walks the top-level object keeping each `schoolId` value. A map
/// deserializer would keep only the last of repeated keys.
struct TenantFieldVisitor;

impl<'de> Visitor<'de> for TenantFieldVisitor {
    type Value = Vec<serde_json::Value>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut values = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            if key == TENANT_FIELD {
                values.push(map.next_value::<serde_json::Value>()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(values)
    }
}

pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;

    let header = header.to_str().map_err(|_| AuthError::MissingCredentials)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingCredentials)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }

    Ok(token)
}
