//! Standardized action results.
//!
//! Every action returns an [`ActionState`]: either a success carrying a
//! message and data, or a failure carrying a user-facing message and a
//! [`FailureKind`]. Failures never carry partial data.
//!
//! On the wire an action state looks like:
//!
//! ```json
//! { "isSuccess": false, "message": "Physician not found", "code": "not_found" }
//! ```

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Why an action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Required input missing or invalid. The store was not queried.
    Validation,
    NotFound,
    /// A unique key (NPI, user id, slug) is already taken.
    Conflict,
    /// The data store failed. Details are only logged server-side.
    Unavailable,
}

impl FailureKind {
    /// Machine-readable code used in JSON bodies.
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::Validation => "bad_request",
            FailureKind::NotFound => "not_found",
            FailureKind::Conflict => "conflict",
            FailureKind::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ActionFailure {}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionState<T> {
    Success { message: String, data: T },
    Failure(ActionFailure),
}

impl<T> ActionState<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        ActionState::Success {
            message: message.into(),
            data,
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ActionState::Failure(ActionFailure {
            kind,
            message: message.into(),
        })
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Conflict, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Unavailable, message)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionState::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ActionState::Success { message, .. } => message,
            ActionState::Failure(f) => &f.message,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ActionState::Success { data, .. } => Some(data),
            ActionState::Failure(_) => None,
        }
    }

    /// Failure kind, or `None` on success.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ActionState::Success { .. } => None,
            ActionState::Failure(f) => Some(f.kind),
        }
    }

    pub fn into_result(self) -> Result<T, ActionFailure> {
        match self {
            ActionState::Success { data, .. } => Ok(data),
            ActionState::Failure(f) => Err(f),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ActionState<U> {
        match self {
            ActionState::Success { message, data } => ActionState::Success {
                message,
                data: f(data),
            },
            ActionState::Failure(failure) => ActionState::Failure(failure),
        }
    }
}

impl<T: Serialize> Serialize for ActionState<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActionState::Success { message, data } => {
                let mut s = serializer.serialize_struct("ActionState", 3)?;
                s.serialize_field("isSuccess", &true)?;
                s.serialize_field("message", message)?;
                s.serialize_field("data", data)?;
                s.end()
            }
            ActionState::Failure(failure) => {
                let mut s = serializer.serialize_struct("ActionState", 3)?;
                s.serialize_field("isSuccess", &false)?;
                s.serialize_field("message", &failure.message)?;
                s.serialize_field("code", failure.kind.code())?;
                s.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let state = ActionState::success("ok", vec![1, 2]);
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({ "isSuccess": true, "message": "ok", "data": [1, 2] })
        );
    }

    #[test]
    fn test_failure_shape_has_no_data() {
        let state: ActionState<Vec<i32>> = ActionState::not_found("Physician not found");
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["isSuccess"], false);
        assert_eq!(value["code"], "not_found");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_into_result_and_map() {
        let state = ActionState::success("ok", 2).map(|n| n * 10);
        assert_eq!(state.into_result().unwrap(), 20);

        let failed: ActionState<i32> = ActionState::validation("NPI is required");
        assert_eq!(failed.failure_kind(), Some(FailureKind::Validation));
        assert_eq!(failed.into_result().unwrap_err().message, "NPI is required");
    }
}
