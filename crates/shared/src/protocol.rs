use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Role, SessionIdentity};

/// JSON body for every role's login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Extracts the account identifier from a login response.
///
/// The backend is inconsistent about where the identifier lives, so this is
/// an ordered list of extraction strategies tried in sequence, first defined
/// value wins:
///
/// 1. the role-scoped key (`studentId` / `professorId` / `hodId`)
/// 2. a plain `id` field
/// 3. the role-scoped key nested under a role object (`student.studentId`)
/// 4. the whole payload as a bare string or number
pub fn extract_identifier(role: Role, payload: &Value) -> Option<String> {
    if let Some(id) = payload.get(role.id_key()).and_then(value_as_id) {
        return Some(id);
    }
    if let Some(id) = payload.get("id").and_then(value_as_id) {
        return Some(id);
    }
    if let Some(id) = payload
        .get(role.as_str())
        .and_then(|nested| nested.get(role.id_key()))
        .and_then(value_as_id)
    {
        return Some(id);
    }
    value_as_id(payload)
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Folds a raw profile payload into the canonical identity shape.
///
/// Field-name drift handled here: the display name may arrive as `name` or
/// `studName`, the identifier under any of the keys `extract_identifier`
/// knows about. Missing fields degrade to empty strings rather than errors;
/// the identity is still useful with just the id.
pub fn identity_from_profile(role: Role, id: &str, profile: Value) -> SessionIdentity {
    let display_name = profile
        .get("name")
        .or_else(|| profile.get("studName"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let email = profile
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let image_url = profile
        .get("imageUrl")
        .and_then(Value::as_str)
        .map(str::to_string);

    SessionIdentity {
        role,
        id: id.to_string(),
        display_name,
        email,
        image_url,
        raw_profile: profile,
    }
}
