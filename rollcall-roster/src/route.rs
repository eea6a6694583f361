//! Path parsing and route resolution

use axum::http::Method;
use rollcall_core::ApiError;

use crate::storage::WriteMode;

/// Top-level resources served by the router, with the one method each accepts.
pub const RESOURCES: &[(&str, &str)] = &[
    ("health", "GET"),
    ("classes", "GET"),
    ("students", "GET"),
    ("attendance", "POST"),
];

/// Outcome of splitting a request path into positional segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch<'a> {
    Matched {
        resource: &'a str,
        id: Option<&'a str>,
        sub: Option<&'a str>,
    },
    Unmatched,
}

impl<'a> PathMatch<'a> {
    /// Split on `/` and drop empty segments. Segments are not decoded and
    /// anything past the third is ignored.
    pub fn parse(path: &'a str) -> Self {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match segments.next() {
            Some(resource) => Self::Matched {
                resource,
                id: segments.next(),
                sub: segments.next(),
            },
            None => Self::Unmatched,
        }
    }
}

/// A request that passed method and shape checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    ListClasses,
    GetClass(String),
    ListClassStudents(String),
    ListStudents,
    GetStudent(String),
    WriteAttendance(WriteMode),
}

impl Route {
    /// Resolve a parsed path against the resource table.
    ///
    /// The method is checked per resource before the id or sub-resource is
    /// looked at, so `GET /attendance/submit` is a 405 and
    /// `POST /attendance/other` is a 404.
    pub fn resolve(method: &Method, path: &PathMatch<'_>) -> Result<Self, ApiError> {
        let PathMatch::Matched { resource, id, sub } = *path else {
            return Err(endpoint_not_found());
        };

        let allowed = RESOURCES
            .iter()
            .find(|(name, _)| *name == resource)
            .map(|(_, allowed)| *allowed)
            .ok_or_else(endpoint_not_found)?;

        if method.as_str() != allowed {
            return Err(ApiError::method_not_allowed());
        }

        let route = match (resource, id, sub) {
            ("health", _, _) => Self::Health,
            ("classes", None, _) => Self::ListClasses,
            ("classes", Some(id), Some("students")) => Self::ListClassStudents(id.to_string()),
            ("classes", Some(id), _) => Self::GetClass(id.to_string()),
            ("students", None, _) => Self::ListStudents,
            ("students", Some(id), _) => Self::GetStudent(id.to_string()),
            ("attendance", Some("submit"), _) => Self::WriteAttendance(WriteMode::Submit),
            ("attendance", Some("sync"), _) => Self::WriteAttendance(WriteMode::Sync),
            ("attendance", _, _) => {
                return Err(ApiError::not_found("Invalid attendance endpoint"));
            }
            _ => return Err(endpoint_not_found()),
        };

        Ok(route)
    }
}

fn endpoint_not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::ErrorKind;

    fn resolve(method: Method, path: &str) -> Result<Route, ApiError> {
        Route::resolve(&method, &PathMatch::parse(path))
    }

    fn kind(result: Result<Route, ApiError>) -> ErrorKind {
        result.expect_err("expected an error").kind
    }

    #[test]
    fn test_parse_drops_empty_segments() {
        assert_eq!(
            PathMatch::parse("//classes///7/students/"),
            PathMatch::Matched {
                resource: "classes",
                id: Some("7"),
                sub: Some("students"),
            }
        );
    }

    #[test]
    fn test_parse_root_is_unmatched() {
        assert_eq!(PathMatch::parse("/"), PathMatch::Unmatched);
        assert_eq!(PathMatch::parse(""), PathMatch::Unmatched);
    }

    #[test]
    fn test_parse_ignores_extra_segments_and_encoding() {
        assert_eq!(
            PathMatch::parse("/students/a%20b/x/y/z"),
            PathMatch::Matched {
                resource: "students",
                id: Some("a%20b"),
                sub: Some("x"),
            }
        );
    }

    #[test]
    fn test_resource_table_is_unique() {
        for (i, (name, method)) in RESOURCES.iter().enumerate() {
            assert!(!name.is_empty());
            assert!(!name.contains('/'));
            assert!(Method::from_bytes(method.as_bytes()).is_ok());
            assert!(RESOURCES[i + 1..].iter().all(|(other, _)| other != name));
        }
    }

    #[test]
    fn test_resolve_read_routes() {
        assert_eq!(resolve(Method::GET, "/health").unwrap(), Route::Health);
        assert_eq!(resolve(Method::GET, "/health/deep").unwrap(), Route::Health);
        assert_eq!(resolve(Method::GET, "/classes").unwrap(), Route::ListClasses);
        assert_eq!(
            resolve(Method::GET, "/classes/3").unwrap(),
            Route::GetClass("3".to_string())
        );
        assert_eq!(
            resolve(Method::GET, "/classes/3/students").unwrap(),
            Route::ListClassStudents("3".to_string())
        );
        assert_eq!(resolve(Method::GET, "/students").unwrap(), Route::ListStudents);
        assert_eq!(
            resolve(Method::GET, "/students/9").unwrap(),
            Route::GetStudent("9".to_string())
        );
    }

    #[test]
    fn test_resolve_unknown_sub_resource_falls_back_to_item() {
        assert_eq!(
            resolve(Method::GET, "/classes/3/teachers").unwrap(),
            Route::GetClass("3".to_string())
        );
        assert_eq!(
            resolve(Method::GET, "/students/9/classes").unwrap(),
            Route::GetStudent("9".to_string())
        );
    }

    #[test]
    fn test_resolve_attendance_routes() {
        assert_eq!(
            resolve(Method::POST, "/attendance/submit").unwrap(),
            Route::WriteAttendance(WriteMode::Submit)
        );
        assert_eq!(
            resolve(Method::POST, "/attendance/sync").unwrap(),
            Route::WriteAttendance(WriteMode::Sync)
        );
        assert_eq!(kind(resolve(Method::POST, "/attendance/purge")), ErrorKind::NotFound);
        assert_eq!(kind(resolve(Method::POST, "/attendance")), ErrorKind::NotFound);
    }

    #[test]
    fn test_resolve_method_checked_before_id() {
        assert_eq!(
            kind(resolve(Method::GET, "/attendance/submit")),
            ErrorKind::MethodNotAllowed
        );
        assert_eq!(
            kind(resolve(Method::DELETE, "/students/1")),
            ErrorKind::MethodNotAllowed
        );
        assert_eq!(
            kind(resolve(Method::POST, "/classes/1/students")),
            ErrorKind::MethodNotAllowed
        );
        assert_eq!(kind(resolve(Method::PUT, "/health")), ErrorKind::MethodNotAllowed);
    }

    #[test]
    fn test_resolve_unknown_resource() {
        assert_eq!(kind(resolve(Method::GET, "/unknown")), ErrorKind::NotFound);
        assert_eq!(kind(resolve(Method::DELETE, "/unknown/1")), ErrorKind::NotFound);
        assert_eq!(kind(resolve(Method::GET, "/")), ErrorKind::NotFound);
    }
}
