//! reCAPTCHA support.
//!
//! [`recaptcha_html`] renders the challenge widget and a
//! [`CaptchaVerifier`] checks the user's answer. The HTTP verifier talks to
//! the reCAPTCHA service; tests and offline setups can plug in their own.

use std::time::Duration;

use async_trait::async_trait;
use fungiform_core::error::{FormError, FormResult};
use fungiform_core::html::{Attrs, HtmlBuilder, Markup};
use fungiform_core::i18n::Translations;

pub const API_SERVER: &str = "http://api.recaptcha.net/";
pub const SSL_API_SERVER: &str = "https://api-secure.recaptcha.net/";
pub const VERIFY_SERVER: &str = "http://api-verify.recaptcha.net/verify";

/// The form field carrying the challenge id.
pub const CHALLENGE_FIELD: &str = "recaptcha_challenge_field";
/// The form field carrying the user's answer.
pub const RESPONSE_FIELD: &str = "recaptcha_response_field";

/// Renders the reCAPTCHA widget.
///
/// `error` is the error code returned by a previous verification, if any.
/// Widget texts are translated with `translations`.
pub fn recaptcha_html(
    html: &HtmlBuilder,
    public_key: &str,
    use_ssl: bool,
    error: Option<&str>,
    translations: &dyn Translations,
) -> Markup {
    let server = if use_ssl { SSL_API_SERVER } else { API_SERVER };
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("k", public_key);
    if let Some(error) = error {
        query.append_pair("error", error);
    }
    let query = query.finish();

    let t = |msgid: &str| translations.gettext(msgid);
    let options = serde_json::json!({
        "theme": "clean",
        "custom_translations": {
            "visual_challenge": t("Get a visual challenge"),
            "audio_challenge": t("Get an audio challenge"),
            "refresh_btn": t("Get a new challenge"),
            "instructions_visual": t("Type the two words:"),
            "instructions_audio": t("Type what you hear:"),
            "help_btn": t("Help"),
            "play_again": t("Play sound again"),
            "cant_hear_this": t("Download sound as MP3"),
            "incorrect_try_again": t("Incorrect. Try again."),
        }
    });
    // `<` cannot end the script element when escaped as a JSON unicode escape.
    let options = options.to_string().replace('<', "\\u003c");

    let js = Attrs::new().with("type", "text/javascript");
    let options_script = html.element(
        "script",
        &js,
        [Markup::new(format!("var RecaptchaOptions = {options};"))],
    );
    let challenge_script = html.element(
        "script",
        &js.clone().with("src", format!("{server}challenge?{query}")),
        [],
    );

    let iframe = html.element(
        "iframe",
        &Attrs::new()
            .with("src", format!("{server}noscript?{query}"))
            .with("height", "300")
            .with("width", "500"),
        [],
    );
    let textarea = html.element(
        "textarea",
        &Attrs::new()
            .with("name", CHALLENGE_FIELD)
            .with("rows", "3")
            .with("cols", "40"),
        [],
    );
    let hidden = html.element(
        "input",
        &Attrs::new()
            .with("type", "hidden")
            .with("name", RESPONSE_FIELD)
            .with("value", "manual_challenge"),
        [],
    );
    let noscript = html.element(
        "noscript",
        &Attrs::new(),
        [
            html.element("div", &Attrs::new(), [iframe]),
            html.element("div", &Attrs::new(), [textarea, hidden]),
        ],
    );

    Markup::join([options_script, challenge_script, noscript], "\n")
}

/// Interprets the body returned by the verification service.
///
/// The first line is `true` for a correct answer. Otherwise the second line
/// holds an error code; codes that mean the site is misconfigured become
/// errors, everything else is a wrong answer.
pub fn parse_verify_response(body: &str) -> FormResult<bool> {
    let mut lines = body.lines();
    if lines.next().map(str::trim) == Some("true") {
        return Ok(true);
    }
    match lines.next().map(str::trim) {
        Some("invalid-site-public-key") => Err(FormError::CaptchaMisconfigured(
            "invalid public key for recaptcha set".to_string(),
        )),
        Some("invalid-site-private-key") => Err(FormError::CaptchaMisconfigured(
            "invalid private key for recaptcha set".to_string(),
        )),
        Some("invalid-referrer") => Err(FormError::CaptchaMisconfigured(
            "key not valid for the current domain".to_string(),
        )),
        _ => Ok(false),
    }
}

/// Checks a captcha answer.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(
        &self,
        private_key: &str,
        challenge: &str,
        response: &str,
        remote_ip: &str,
    ) -> FormResult<bool>;
}

/// Verifies answers with the reCAPTCHA web service.
#[derive(Debug, Clone)]
pub struct HttpCaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpCaptchaVerifier {
    /// Creates a verifier whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> FormResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                FormError::CaptchaTransport(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            verify_url: VERIFY_SERVER.to_string(),
        })
    }

    /// Sends verification requests to another endpoint.
    #[must_use]
    pub fn with_verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = url.into();
        self
    }

    pub fn verify_url(&self) -> &str {
        &self.verify_url
    }
}

#[async_trait]
impl CaptchaVerifier for HttpCaptchaVerifier {
    async fn verify(
        &self,
        private_key: &str,
        challenge: &str,
        response: &str,
        remote_ip: &str,
    ) -> FormResult<bool> {
        let params = [
            ("privatekey", private_key),
            ("remoteip", remote_ip),
            ("challenge", challenge),
            ("response", response),
        ];
        let body = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FormError::CaptchaTransport(e.to_string()))?
            .text()
            .await
            .map_err(|e| FormError::CaptchaTransport(e.to_string()))?;

        let verified = parse_verify_response(&body);
        if !matches!(verified, Ok(true)) {
            tracing::warn!(remote_ip, "captcha verification failed");
        }
        verified
    }
}
