//! Response-envelope normalization.
//!
//! The server variants this client has had to talk to disagree on envelope
//! shape (`{"data": {...}}`, `{"user": {...}}`, bare object) and field casing
//! (snake_case vs camelCase) for the same routes. Everything funnels through
//! here so the rest of the client only ever sees one shape.

use serde_json::Value;

use crate::types::{Settings, Transaction, User};
use crate::ClientError;

/// Peel a wrapper key off an object envelope. Checked keys first, then the
/// generic `data` wrapper; a bare payload passes through untouched.
fn unwrap_envelope<'a>(v: &'a Value, keys: &[&str]) -> &'a Value {
    if let Some(obj) = v.as_object() {
        for key in keys {
            if let Some(inner) = obj.get(*key) {
                if inner.is_object() || inner.is_array() {
                    return inner;
                }
            }
        }
        if let Some(inner) = obj.get("data") {
            if inner.is_object() || inner.is_array() {
                return inner;
            }
        }
    }
    v
}

fn str_field(v: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| v.get(*n))
        .and_then(|f| f.as_str())
        .map(|s| s.to_string())
}

fn f64_field(v: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|n| v.get(*n)).and_then(|f| f.as_f64())
}

fn bool_field(v: &Value, names: &[&str]) -> Option<bool> {
    names.iter().find_map(|n| v.get(*n)).and_then(|f| f.as_bool())
}

pub fn user(v: &Value) -> Result<User, ClientError> {
    let v = unwrap_envelope(v, &["user"]);

    let id = str_field(v, &["id", "_id"])
        .ok_or_else(|| ClientError::Malformed("user payload missing id".into()))?;
    let username = str_field(v, &["username"])
        .ok_or_else(|| ClientError::Malformed("user payload missing username".into()))?;

    Ok(User {
        id,
        username,
        email: str_field(v, &["email"]),
        full_name: str_field(v, &["full_name", "fullName", "name"]),
        avatar_url: str_field(v, &["avatar_url", "avatarUrl"]),
        is_admin: bool_field(v, &["is_admin", "isAdmin"]).unwrap_or(false),
        status: str_field(v, &["status"]).unwrap_or_else(|| "Active".to_string()),
        balance: f64_field(v, &["balance"]).unwrap_or(0.0),
        created_at: str_field(v, &["created_at", "createdAt"]),
        last_login_at: str_field(v, &["last_login_at", "lastLoginAt"]),
    })
}

pub fn transaction(v: &Value) -> Result<Transaction, ClientError> {
    let v = unwrap_envelope(v, &["transaction"]);

    let id = str_field(v, &["id", "_id"])
        .ok_or_else(|| ClientError::Malformed("transaction payload missing id".into()))?;
    let tx_type = str_field(v, &["tx_type", "txType", "type"])
        .ok_or_else(|| ClientError::Malformed("transaction payload missing type".into()))?;

    Ok(Transaction {
        id,
        user_id: str_field(v, &["user_id", "userId"]),
        tx_type,
        amount: f64_field(v, &["amount"]).unwrap_or(0.0),
        memo: str_field(v, &["memo", "description"]),
        recipient: str_field(v, &["recipient", "to"]),
        created_at: str_field(v, &["created_at", "createdAt", "date"]),
    })
}

pub fn settings(v: &Value) -> Result<Settings, ClientError> {
    let v = unwrap_envelope(v, &["settings"]);

    Ok(Settings {
        system_name: str_field(v, &["system_name", "systemName"])
            .ok_or_else(|| ClientError::Malformed("settings payload missing system name".into()))?,
        maintenance_mode: bool_field(v, &["maintenance_mode", "maintenanceMode"]).unwrap_or(false),
        allow_new_users: bool_field(v, &["allow_new_users", "allowNewUsers"]).unwrap_or(true),
        contact_email: str_field(v, &["contact_email", "contactEmail"]),
    })
}

/// Normalize a list payload: a bare array, or one wrapped in `data` /
/// a named collection key.
pub fn list<'a>(v: &'a Value, keys: &[&str]) -> Result<Vec<&'a Value>, ClientError> {
    let v = unwrap_envelope(v, keys);
    v.as_array()
        .map(|items| items.iter().collect())
        .ok_or_else(|| ClientError::Malformed("expected a list payload".into()))
}

/// Pull code and message out of an error body, tolerating both the
/// structured `{"error": {"code", "message"}}` shape and the legacy flat
/// `{"message": "..."}` one.
pub fn error_parts(v: &Value) -> (String, String) {
    if let Some(err) = v.get("error") {
        if err.is_object() {
            let code = str_field(err, &["code"]).unwrap_or_else(|| "UNKNOWN".to_string());
            let message = str_field(err, &["message"]).unwrap_or_else(|| "request failed".to_string());
            return (code, message);
        }
        if let Some(msg) = err.as_str() {
            return ("UNKNOWN".to_string(), msg.to_string());
        }
    }
    let message = str_field(v, &["message", "error"]).unwrap_or_else(|| "request failed".to_string());
    ("UNKNOWN".to_string(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_from_bare_object() {
        let v = json!({
            "id": "u1", "username": "alice", "email": "a@example.com",
            "full_name": "Alice A", "is_admin": true, "status": "Active",
            "balance": 120.5, "created_at": "2025-01-01 00:00:00"
        });
        let u = user(&v).unwrap();
        assert_eq!(u.id, "u1");
        assert!(u.is_admin);
        assert_eq!(u.balance, 120.5);
        assert_eq!(u.full_name.as_deref(), Some("Alice A"));
    }

    #[test]
    fn test_user_from_data_envelope_camel_case() {
        let v = json!({"data": {
            "id": "u2", "username": "bob", "fullName": "Bob B",
            "isAdmin": false, "avatarUrl": "/uploads/u2.png",
            "createdAt": "2025-02-02 00:00:00"
        }});
        let u = user(&v).unwrap();
        assert_eq!(u.id, "u2");
        assert_eq!(u.full_name.as_deref(), Some("Bob B"));
        assert_eq!(u.avatar_url.as_deref(), Some("/uploads/u2.png"));
        assert!(!u.is_admin);
        assert_eq!(u.created_at.as_deref(), Some("2025-02-02 00:00:00"));
    }

    #[test]
    fn test_user_from_user_envelope() {
        let v = json!({"user": {"_id": "u3", "username": "carol"}});
        let u = user(&v).unwrap();
        assert_eq!(u.id, "u3");
        // Absent fields fall back to the canonical defaults.
        assert_eq!(u.status, "Active");
        assert_eq!(u.balance, 0.0);
    }

    #[test]
    fn test_user_missing_id_is_malformed() {
        let v = json!({"username": "nobody"});
        assert!(matches!(user(&v), Err(ClientError::Malformed(_))));
    }

    #[test]
    fn test_transaction_type_spellings() {
        for key in ["tx_type", "txType", "type"] {
            let v = json!({"id": "t1", key: "Bill Pay", "amount": 42.0});
            let t = transaction(&v).unwrap();
            assert_eq!(t.tx_type, "Bill Pay");
        }
    }

    #[test]
    fn test_transaction_envelope_and_memo_alias() {
        let v = json!({"transaction": {
            "id": "t2", "userId": "u1", "type": "Deposit",
            "amount": 10.0, "description": "payroll", "date": "2025-03-03 09:00:00"
        }});
        let t = transaction(&v).unwrap();
        assert_eq!(t.user_id.as_deref(), Some("u1"));
        assert_eq!(t.memo.as_deref(), Some("payroll"));
        assert_eq!(t.created_at.as_deref(), Some("2025-03-03 09:00:00"));
    }

    #[test]
    fn test_settings_three_shapes() {
        let bare = json!({"system_name": "MiniBank", "maintenance_mode": true,
                          "allow_new_users": false, "contact_email": "x@y.co"});
        let data = json!({"data": {"systemName": "MiniBank", "maintenanceMode": true,
                          "allowNewUsers": false}});
        let named = json!({"settings": {"system_name": "MiniBank"}});
        for v in [&bare, &data, &named] {
            let s = settings(v).unwrap();
            assert_eq!(s.system_name, "MiniBank");
        }
        assert!(settings(&bare).unwrap().maintenance_mode);
        assert!(!settings(&data).unwrap().allow_new_users);
        assert!(settings(&named).unwrap().allow_new_users);
    }

    #[test]
    fn test_list_shapes() {
        let bare = json!([{"id": "a"}, {"id": "b"}]);
        let wrapped = json!({"data": [{"id": "a"}]});
        let named = json!({"users": [{"id": "a"}]});
        assert_eq!(list(&bare, &["users"]).unwrap().len(), 2);
        assert_eq!(list(&wrapped, &["users"]).unwrap().len(), 1);
        assert_eq!(list(&named, &["users"]).unwrap().len(), 1);
        assert!(list(&json!({"nope": 1}), &["users"]).is_err());
    }

    #[test]
    fn test_error_parts() {
        let structured = json!({"error": {"code": "FORBIDDEN", "message": "no"}});
        assert_eq!(
            error_parts(&structured),
            ("FORBIDDEN".to_string(), "no".to_string())
        );

        let flat = json!({"message": "boom"});
        assert_eq!(error_parts(&flat).1, "boom");

        let stringy = json!({"error": "bad input"});
        assert_eq!(error_parts(&stringy).1, "bad input");

        assert_eq!(error_parts(&Value::Null).1, "request failed");
    }
}
