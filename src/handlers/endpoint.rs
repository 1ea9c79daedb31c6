//! Request dispatcher: resolves the id and operation, applies the operation and permission
//! gates, then runs the create/update, read, list or delete flow against storage.

use crate::error::CrudError;
use crate::extractors::GrantedPermissions;
use crate::permissions::{Operation, Permissions};
use crate::registry::{Controller, Endpoint, ShapeView};
use crate::response::Reply;
use crate::service::{translate, RequestValidator};
use crate::shape::Record;
use crate::state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::sync::OnceLock;

/// Replacement written over hidden string fields in read and list output.
pub const HIDDEN_MASK: &str = "(hidden)";

/// One request routed to an endpoint: the path remainder after its prefix, plus method,
/// raw query string and body.
pub struct CrudRequest {
    pub method: Method,
    pub suffix: String,
    pub query: Option<String>,
    pub body: Body,
    /// Largest body accepted, in bytes.
    pub body_limit: usize,
}

enum Action {
    Put(Option<i64>),
    ReadOne(i64),
    List,
    Delete(Option<i64>),
}

impl Action {
    fn operation(&self) -> Operation {
        match self {
            Action::Put(Some(_)) => Operation::Update,
            Action::Put(None) => Operation::Create,
            Action::ReadOne(_) => Operation::Read,
            Action::List => Operation::List,
            Action::Delete(_) => Operation::Delete,
        }
    }
}

fn id_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[0-9]+$").expect("static regex"))
}

/// Empty remainder means no id. Anything else must be decimal digits fitting i64.
pub fn resolve_id(suffix: &str) -> Result<Option<i64>, CrudError> {
    if suffix.is_empty() {
        return Ok(None);
    }
    if !id_pattern().is_match(suffix) {
        return Err(CrudError::InvalidId);
    }
    suffix.parse::<i64>().map(Some).map_err(|_| CrudError::InvalidId)
}

fn action_for(method: &Method, id: Option<i64>) -> Result<Action, CrudError> {
    match (method, id) {
        (&Method::PUT, id) => Ok(Action::Put(id)),
        (&Method::GET, Some(id)) => Ok(Action::ReadOne(id)),
        (&Method::GET, None) => Ok(Action::List),
        (&Method::DELETE, id) => Ok(Action::Delete(id)),
        _ => Err(CrudError::MethodNotAllowed),
    }
}

fn check_permission(permissions: Option<&Permissions>, op: Operation, view: &ShapeView) -> Result<(), CrudError> {
    match permissions {
        Some(p) if !p.is_allowed(op, view.name()) => Err(CrudError::Forbidden {
            operation: op,
            shape: view.name().to_string(),
        }),
        _ => Ok(()),
    }
}

fn mask_hidden(record: &mut Record, hidden: &[String]) {
    record.map_strings(hidden, |_| HIDDEN_MASK.to_string());
}

/// Dispatch one request. No storage call happens before the id, operation and permission
/// checks have passed.
pub async fn dispatch(
    controller: &Controller,
    endpoint: &Endpoint,
    request: CrudRequest,
    permissions: Option<&Permissions>,
) -> Result<Reply, CrudError> {
    let id = resolve_id(&request.suffix)?;
    let action = action_for(&request.method, id)?;
    let op = action.operation();
    if !endpoint.operations().contains(op) {
        return Err(CrudError::MethodNotAllowed);
    }
    let view = endpoint.view(op);
    check_permission(permissions, op, view)?;
    tracing::debug!(prefix = endpoint.prefix(), operation = %op, shape = view.name(), "dispatch");

    match action {
        Action::Put(id) => {
            let bytes = read_body(request.body, request.body_limit).await?;
            put(controller, view, id, &bytes).await
        }
        Action::ReadOne(id) => read(controller, view, id).await,
        Action::List => list(controller, view, request.query.as_deref().unwrap_or("")).await,
        Action::Delete(id) => delete(controller, view, id).await,
    }
}

async fn load_existing(controller: &Controller, view: &ShapeView, id: i64) -> Result<Record, CrudError> {
    let storage = controller.storage();
    let mut record = view.factory().new_instance();
    storage.load(&mut record, id).await.map_err(CrudError::Load)?;
    if storage.identity(&record) == 0 {
        return Err(CrudError::NotFound);
    }
    Ok(record)
}

/// Whether a body read failed because the length limit was hit.
fn is_length_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Collect the body, at most `limit` bytes. Going over the limit is the client's fault,
/// whether the length was announced up front or only found while streaming.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, CrudError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let inner = e.into_inner();
        if is_length_limit(inner.as_ref()) {
            CrudError::BodyTooLarge { limit }
        } else {
            CrudError::ReadBody(inner.to_string())
        }
    })
}

async fn put(controller: &Controller, view: &ShapeView, id: Option<i64>, bytes: &[u8]) -> Result<Reply, CrudError> {
    let storage = controller.storage();

    let mut record = match id {
        Some(id) => load_existing(controller, view, id).await?,
        None => {
            let mut record = view.factory().new_instance();
            storage.reset_fields(&mut record);
            record
        }
    };

    // identity comes from the path, never from the body
    let identity = storage.identity(&record);
    let assigned = record.merge_json(bytes)?;
    record.set_identity(identity)?;

    if let Some(transform) = controller.password_transform() {
        let targets: Vec<String> = view
            .password_fields()
            .into_iter()
            .filter(|f| assigned.contains(f))
            .collect();
        record.map_strings(&targets, |raw| transform(raw));
    }

    let report = RequestValidator::validate(&record, view.rules())?;
    if !report.is_ok() {
        return Err(CrudError::ValidationFailed(report.field_errors));
    }

    storage.save(&mut record).await.map_err(CrudError::Save)?;
    let status = if id.is_some() { StatusCode::OK } else { StatusCode::CREATED };
    Ok(Reply::new(status).with("id", storage.identity(&record)))
}

async fn read(controller: &Controller, view: &ShapeView, id: i64) -> Result<Reply, CrudError> {
    let mut record = load_existing(controller, view, id).await?;
    mask_hidden(&mut record, &view.hidden_fields());
    Ok(Reply::new(StatusCode::OK).with("item", record))
}

async fn list(controller: &Controller, view: &ShapeView, raw_query: &str) -> Result<Reply, CrudError> {
    let storage = controller.storage();
    let query = translate(raw_query, view.shape(), storage)?;
    let hidden = view.hidden_fields();
    let mask = move |mut record: Record| {
        mask_hidden(&mut record, &hidden);
        record
    };
    let items = storage
        .list(view.factory().as_ref(), &query, &mask)
        .await
        .map_err(|e| {
            if e.is_invalid_filters() {
                CrudError::InvalidFilterValue(e)
            } else {
                CrudError::Load(e)
            }
        })?;
    let items: Vec<Value> = items.into_iter().map(Value::from).collect();
    Ok(Reply::new(StatusCode::OK).with("items", items))
}

async fn delete(controller: &Controller, view: &ShapeView, id: Option<i64>) -> Result<Reply, CrudError> {
    let id = id.ok_or(CrudError::InvalidId)?;
    let record = load_existing(controller, view, id).await?;
    controller.storage().delete(&record).await.map_err(CrudError::Delete)?;
    Ok(Reply::new(StatusCode::OK).with("id", id))
}

/// Fallback handler: every request not matched by another route lands here and is routed to the
/// endpoint with the longest matching prefix.
pub async fn handle(
    State(state): State<AppState>,
    GrantedPermissions(permissions): GrantedPermissions,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let Some((endpoint, suffix)) = state.controller.resolve(parts.uri.path()) else {
        return CrudError::NoEndpoint.into_response();
    };
    let request = CrudRequest {
        method: parts.method,
        suffix,
        query: parts.uri.query().map(str::to_string),
        body,
        body_limit: state.body_limit,
    };
    match dispatch(&state.controller, &endpoint, request, permissions.as_ref()).await {
        Ok(reply) => reply.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_plain_decimal() {
        assert_eq!(resolve_id("").unwrap(), None);
        assert_eq!(resolve_id("42").unwrap(), Some(42));
        assert!(matches!(resolve_id("-1"), Err(CrudError::InvalidId)));
        assert!(matches!(resolve_id("4a"), Err(CrudError::InvalidId)));
        assert!(matches!(resolve_id("1/2"), Err(CrudError::InvalidId)));
        assert!(matches!(resolve_id("99999999999999999999"), Err(CrudError::InvalidId)));
    }

    #[test]
    fn methods_map_to_operations() {
        assert_eq!(action_for(&Method::PUT, None).unwrap().operation(), Operation::Create);
        assert_eq!(action_for(&Method::PUT, Some(1)).unwrap().operation(), Operation::Update);
        assert_eq!(action_for(&Method::GET, None).unwrap().operation(), Operation::List);
        assert_eq!(action_for(&Method::GET, Some(1)).unwrap().operation(), Operation::Read);
        assert_eq!(action_for(&Method::DELETE, None).unwrap().operation(), Operation::Delete);
        assert!(matches!(action_for(&Method::POST, None), Err(CrudError::MethodNotAllowed)));
    }
}
