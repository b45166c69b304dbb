//! # fungiform-security
//!
//! Protection for form submissions.
//!
//! - [`request`] - [`RequestInfo`], what forms know about the current request
//! - [`session`] - The [`Session`] trait and an in-memory implementation
//! - [`csrf`] - Per-URL CSRF tokens stored in the session
//! - [`redirects`] - Validation of user supplied redirect targets
//! - [`recaptcha`] - reCAPTCHA rendering and verification

pub mod csrf;
pub mod recaptcha;
pub mod redirects;
pub mod request;
pub mod session;

pub use csrf::CsrfTokens;
pub use recaptcha::{CaptchaVerifier, HttpCaptchaVerifier};
pub use redirects::get_redirect_target;
pub use request::RequestInfo;
pub use session::{MemorySession, Session, SessionData};
