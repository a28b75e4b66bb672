//! Route classification.
//!
//! A total, side-effect-free mapping from a request path to its access
//! category. Anything that does not match a known public shape falls
//! through to the protected default.

/// Access category of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Static assets and infra paths that bypass the gateway entirely.
    Excluded,
    /// App pages reachable without a session (`/`, `/login`).
    Public,
    /// The one API endpoint reachable without a session (`/api/login`).
    ApiPublic,
    /// Every other API path; rejected with 401 JSON when unauthenticated.
    ApiProtected,
    /// Every other app path; redirected to `/login` when unauthenticated.
    AppProtected,
}

/// Exact-match public app paths.
const PUBLIC_PATHS: &[&str] = &["/", "/login"];

/// Path prefixes excluded from classification entirely.
const EXCLUDED_PREFIXES: &[&str] = &["/static/", "/assets/"];

/// Exact infra paths excluded from classification.
const EXCLUDED_PATHS: &[&str] = &["/favicon.ico", "/health"];

/// Classify a request path.
#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if EXCLUDED_PREFIXES.iter().any(|p| path.starts_with(p))
        || EXCLUDED_PATHS.contains(&path)
    {
        return RouteClass::Excluded;
    }

    if path == "/api/login" {
        return RouteClass::ApiPublic;
    }

    if path == "/api" || path.starts_with("/api/") {
        return RouteClass::ApiProtected;
    }

    if PUBLIC_PATHS.contains(&path) {
        return RouteClass::Public;
    }

    RouteClass::AppProtected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_pages() {
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/login"), RouteClass::Public);
    }

    #[test]
    fn test_app_routes_are_protected() {
        assert_eq!(classify("/yakap"), RouteClass::AppProtected);
        assert_eq!(classify("/register"), RouteClass::AppProtected);
        assert_eq!(classify("/reports"), RouteClass::AppProtected);
    }

    #[test]
    fn test_api_routes() {
        assert_eq!(classify("/api/login"), RouteClass::ApiPublic);
        assert_eq!(classify("/api/yakap"), RouteClass::ApiProtected);
        assert_eq!(classify("/api/auth/me"), RouteClass::ApiProtected);
        assert_eq!(classify("/api/brgy"), RouteClass::ApiProtected);
        assert_eq!(classify("/api"), RouteClass::ApiProtected);
    }

    #[test]
    fn test_login_lookalikes_are_protected() {
        // Only the exact endpoint is public
        assert_eq!(classify("/api/login/extra"), RouteClass::ApiProtected);
        assert_eq!(classify("/api/loginx"), RouteClass::ApiProtected);
        assert_eq!(classify("/login/reset"), RouteClass::AppProtected);
    }

    #[test]
    fn test_excluded_paths() {
        assert_eq!(classify("/static/app.css"), RouteClass::Excluded);
        assert_eq!(classify("/assets/logo.png"), RouteClass::Excluded);
        assert_eq!(classify("/favicon.ico"), RouteClass::Excluded);
        assert_eq!(classify("/health"), RouteClass::Excluded);
    }

    #[test]
    fn test_unmatched_defaults_closed() {
        assert_eq!(classify("/totally/unknown"), RouteClass::AppProtected);
        assert_eq!(classify(""), RouteClass::AppProtected);
        // Prefix without trailing slash is not an excluded asset dir
        assert_eq!(classify("/static"), RouteClass::AppProtected);
    }
}
