//! Session cookie adapter.
//!
//! The ONE place that maps the session token to transport-level storage.
//! Every issuing and verifying code path goes through the same cookie name.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Canonical session cookie name, used uniformly across issuance, the
/// access gateway, and logout.
pub const SESSION_COOKIE: &str = "yakap_session";

/// Read the session token from the request's cookie jar.
#[must_use]
pub fn read(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Attach a freshly issued session token to the response.
#[must_use]
pub fn write(jar: CookieJar, token: String, ttl: Duration, secure: bool) -> CookieJar {
    jar.add(build_cookie(token, ttl_seconds(ttl), secure))
}

/// Expire the session cookie. Idempotent: clearing an absent cookie leaves
/// the client unauthenticated with no error.
#[must_use]
pub fn clear(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(build_cookie(String::new(), 0, secure))
}

fn build_cookie(value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

#[allow(clippy::cast_possible_wrap)]
fn ttl_seconds(ttl: Duration) -> i64 {
    ttl.as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(8 * 3600);

    #[test]
    fn test_write_then_read() {
        let jar = CookieJar::new();
        let jar = write(jar, "tok123".to_string(), TTL, false);
        assert_eq!(read(&jar).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_cookie_attributes() {
        let jar = write(CookieJar::new(), "tok".to_string(), TTL, true);
        let cookie = jar.get(SESSION_COOKIE).unwrap();

        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(8 * 3600)));
    }

    #[test]
    fn test_clear_expires_immediately() {
        let jar = write(CookieJar::new(), "tok".to_string(), TTL, false);
        let jar = clear(jar, false);
        let cookie = jar.get(SESSION_COOKIE).unwrap();

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }

    #[test]
    fn test_clear_is_idempotent() {
        // Clearing a jar that never held the cookie still yields the
        // expired overwrite, not an error.
        let jar = clear(CookieJar::new(), false);
        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));

        let jar = clear(jar, false);
        assert_eq!(jar.get(SESSION_COOKIE).unwrap().value(), "");
    }
}
