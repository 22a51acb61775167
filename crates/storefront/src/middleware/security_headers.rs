//! Security headers middleware.
//!
//! Everything is locked down except what the payment widget needs: its
//! script origin, its checkout frame, and its API for card verification.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::csp::CspNonce;

/// Build the CSP header value.
///
/// ```text
/// default-src 'none';
/// script-src 'self' https://js.paystack.co 'nonce-…';
/// style-src 'self' 'unsafe-inline';
/// font-src 'self';
/// img-src 'self' https: data:;
/// connect-src 'self' https://api.paystack.co;
/// frame-src https://checkout.paystack.com;
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none'
/// ```
///
/// Product images are hosted wherever sellers upload them, hence `https:`.
/// The widget injects inline styles into its own overlay.
#[must_use]
pub fn content_security_policy(nonce: Option<&CspNonce>) -> String {
    let script_src = match nonce {
        Some(nonce) if !nonce.value().is_empty() => {
            format!("script-src 'self' https://js.paystack.co 'nonce-{}'", nonce.value())
        }
        _ => "script-src 'self' https://js.paystack.co".to_string(),
    };

    [
        "default-src 'none'",
        script_src.as_str(),
        "style-src 'self' 'unsafe-inline'",
        "font-src 'self'",
        "img-src 'self' https: data:",
        "connect-src 'self' https://api.paystack.co",
        "frame-src https://checkout.paystack.com",
        "object-src 'none'",
        "base-uri 'self'",
        "form-action 'self'",
        "frame-ancestors 'none'",
    ]
    .join("; ")
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: strict-origin-when-cross-origin` (the widget checks the
///   referring origin)
/// - `Content-Security-Policy` from [`content_security_policy`]
/// - `Permissions-Policy` denying sensors and media, allowing `payment` for self
/// - `Cache-Control: no-store` on everything but static assets
/// - `Cross-Origin-Opener-Policy: same-origin-allow-popups` (3-D Secure popups)
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let nonce = request.extensions().get::<CspNonce>().cloned();
    let is_static = request.uri().path().starts_with("/static/");

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    match HeaderValue::from_str(&content_security_policy(nonce.as_ref())) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid CSP header value"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(self), \
             usb=()",
        ),
    );

    if !is_static {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_allows_paystack() {
        let csp = content_security_policy(None);
        assert!(csp.contains("script-src 'self' https://js.paystack.co"));
        assert!(csp.contains("frame-src https://checkout.paystack.com"));
        assert!(csp.contains("form-action 'self'"));
        assert!(!csp.contains("nonce-"));
    }

    #[test]
    fn test_csp_includes_nonce() {
        let nonce = CspNonce("abc123==".to_string());
        let csp = content_security_policy(Some(&nonce));
        assert!(csp.contains("'nonce-abc123=='"));
        assert!(HeaderValue::from_str(&csp).is_ok());
    }
}
