//! Integration tests for request description, CSRF tokens, redirect
//! targets and captcha verification working together.

use async_trait::async_trait;
use fungiform_core::error::{FormError, FormResult};
use fungiform_security::csrf::{tokens_match, CsrfTokens, SESSION_KEY};
use fungiform_security::recaptcha::{parse_verify_response, CaptchaVerifier};
use fungiform_security::{get_redirect_target, MemorySession, RequestInfo, Session};

// ── Helpers ──────────────────────────────────────────────────────────

fn login_request() -> http::Request<()> {
    http::Request::builder()
        .method("POST")
        .uri("/accounts/login?next=%2Fdashboard")
        .header("host", "shop.example.com")
        .header("referer", "http://shop.example.com/cart")
        .body(())
        .unwrap()
}

/// Answers from canned service responses instead of the network.
struct CannedVerifier {
    body: &'static str,
}

#[async_trait]
impl CaptchaVerifier for CannedVerifier {
    async fn verify(
        &self,
        private_key: &str,
        _challenge: &str,
        response: &str,
        _remote_ip: &str,
    ) -> FormResult<bool> {
        if private_key.is_empty() {
            return parse_verify_response("false\ninvalid-site-private-key");
        }
        if response.is_empty() {
            return Ok(false);
        }
        parse_verify_response(self.body)
    }
}

const NONE: &[&str] = &[];

// ═══════════════════════════════════════════════════════════════════════
// CSRF
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn csrf_token_is_bound_to_the_current_url() {
    let info = RequestInfo::from_request(&login_request());
    let url = info.current_url(false);
    assert_eq!(url, "http://shop.example.com/accounts/login?next=%2Fdashboard");

    let session = MemorySession::new();
    let tokens = CsrfTokens::default();
    let issued = tokens.get_token(&session, &url, false);

    let submitted = issued.clone();
    assert!(tokens_match(&tokens.get_token(&session, &url, false), &submitted));
    assert!(!tokens_match(
        &tokens.get_token(&session, "http://shop.example.com/other", false),
        &submitted
    ));
}

#[test]
fn csrf_replay_fails_after_invalidation() {
    let session = MemorySession::new();
    let tokens = CsrfTokens::default();
    let url = "http://shop.example.com/checkout";

    let issued = tokens.get_token(&session, url, false);
    tokens.invalidate_token(&session, url);
    assert!(!tokens_match(&tokens.get_token(&session, url, false), &issued));
}

#[test]
fn csrf_sessions_keep_only_the_newest_tokens() {
    let session = MemorySession::new();
    let tokens = CsrfTokens::default();
    for i in 0..10 {
        tokens.get_token(&session, &format!("http://shop.example.com/{i}"), false);
    }
    let stored = session.get(SESSION_KEY).unwrap();
    assert_eq!(stored.as_array().unwrap().len(), 4);
}

// ═══════════════════════════════════════════════════════════════════════
// Redirects
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn redirect_falls_back_to_referer_of_real_request() {
    let info = RequestInfo::from_request(&login_request());
    assert_eq!(
        get_redirect_target(&info, None, NONE, NONE).as_deref(),
        Some("http://shop.example.com/cart")
    );
}

#[test]
fn redirect_rejects_login_page_and_foreign_hosts() {
    let info = RequestInfo::from_request(&login_request());
    assert_eq!(
        get_redirect_target(
            &info,
            Some("http://shop.example.com/accounts/login?next=%2Fdashboard"),
            NONE,
            NONE
        ),
        None
    );
    assert_eq!(
        get_redirect_target(&info, Some("https://phish.example.net/"), NONE, NONE),
        None
    );
    assert_eq!(
        get_redirect_target(&info, Some("/accounts/logout"), &["/accounts/logout"], NONE),
        None
    );
}

#[test]
fn redirect_honors_allowed_rules_and_forwarded_host() {
    let info = RequestInfo::from_request(&login_request()).with_forwarded_host("www.example.com");
    assert_eq!(
        get_redirect_target(&info, Some("http://static.example.com/x"), NONE, &["*.example.com"])
            .as_deref(),
        Some("http://static.example.com/x")
    );
    assert_eq!(
        get_redirect_target(&info, Some("http://www.example.com/home"), NONE, NONE).as_deref(),
        Some("http://www.example.com/home")
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Captcha
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn captcha_verifier_accepts_correct_answers() {
    let verifier = CannedVerifier { body: "true\n" };
    assert!(verifier.verify("secret", "challenge", "two words", "10.0.0.1").await.unwrap());
    assert!(!verifier.verify("secret", "challenge", "", "10.0.0.1").await.unwrap());
}

#[tokio::test]
async fn captcha_verifier_reports_wrong_answers_and_misconfiguration() {
    let verifier: Box<dyn CaptchaVerifier> = Box::new(CannedVerifier {
        body: "false\nincorrect-captcha-sol",
    });
    assert!(!verifier.verify("secret", "c", "wrong", "10.0.0.1").await.unwrap());
    assert!(matches!(
        verifier.verify("", "c", "r", "10.0.0.1").await,
        Err(FormError::CaptchaMisconfigured(_))
    ));
}
