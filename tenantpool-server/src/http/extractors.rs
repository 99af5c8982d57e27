//! Custom Axum extractors

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use super::error::ApiError;

/// Pool role taken from the `{role}` path segment: `primary` or `read-only`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Role {
    pub read_only: bool,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "primary" => Some(Self { read_only: false }),
            "read-only" | "replica" => Some(Self { read_only: true }),
            _ => None,
        }
    }
}

impl<S> FromRequestParts<S> for Role
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(role): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest {
                message: "missing pool role".into(),
            })?;

        Self::parse(&role).ok_or_else(|| ApiError::BadRequest {
            message: format!("unknown pool role '{}', expected 'primary' or 'read-only'", role),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roles() {
        assert_eq!(Role::parse("primary"), Some(Role { read_only: false }));
        assert_eq!(Role::parse("read-only"), Some(Role { read_only: true }));
        assert_eq!(Role::parse("replica"), Some(Role { read_only: true }));
        assert_eq!(Role::parse("writer"), None);
    }
}
