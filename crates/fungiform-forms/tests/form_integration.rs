//! Integration tests for the submission -> validation -> rendering cycle.
//!
//! These tests drive whole forms the way a web application would:
//! 1. Decoding and converting flat submissions
//! 2. Rendering forms and their errors
//! 3. CSRF protection through a session
//! 4. Redirect targets and captcha checks

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use fungiform_core::error::{FormError, FormResult};
use fungiform_core::html::Attrs;
use fungiform_core::{value_map, FormData, ValidationError, Value};
use fungiform_forms::fields::Field;
use fungiform_forms::form::{FormBase, FormDefinition, FormIntegration, FormOptions};
use fungiform_forms::validators::from_fn;
use fungiform_forms::widgets::WidgetType;
use fungiform_security::recaptcha::{CaptchaVerifier, RESPONSE_FIELD};
use fungiform_security::request::RequestInfo;
use fungiform_security::session::{MemorySession, Session};

// ============================================================================
// Shared helpers
// ============================================================================

fn person_form() -> FormDefinition {
    FormDefinition::new("PersonForm")
        .field("name", Field::text().required(true))
        .field("age", Field::integer())
}

fn login_request() -> RequestInfo {
    RequestInfo::new("http", "example.com").with_path_info("/login")
}

fn submission<const N: usize>(pairs: [(&str, &str); N]) -> FormData {
    pairs.into_iter().collect()
}

/// A verifier that accepts one answer, checked with the right key.
struct FixedAnswer {
    answer: &'static str,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl CaptchaVerifier for FixedAnswer {
    async fn verify(
        &self,
        private_key: &str,
        _challenge: &str,
        response: &str,
        remote_ip: &str,
    ) -> FormResult<bool> {
        self.calls.lock().unwrap().push(remote_ip.to_string());
        Ok(private_key == "private" && response == self.answer)
    }
}

/// An application integration with a session and canned request data.
#[derive(Default)]
struct TestApp {
    session: Arc<MemorySession>,
    verifier: Option<Arc<FixedAnswer>>,
    request_body: Option<&'static str>,
}

#[async_trait]
impl FormIntegration for TestApp {
    fn session(&self) -> Option<Arc<dyn Session>> {
        Some(self.session.clone())
    }

    async fn autodiscover_data(&self, _info: Option<&RequestInfo>) -> FormResult<FormData> {
        self.request_body
            .map(FormData::parse_urlencoded)
            .ok_or_else(|| FormError::NotSupported("no request body".to_string()))
    }

    fn captcha_verifier(&self, _options: &FormOptions) -> FormResult<Arc<dyn CaptchaVerifier>> {
        match &self.verifier {
            Some(verifier) => Ok(verifier.clone()),
            None => Err(FormError::NotSupported("no verifier".to_string())),
        }
    }
}

// ============================================================================
// Category 1: Decoding and conversion
// ============================================================================

#[tokio::test]
async fn test_simple_form_converts_values() {
    let def = FormDefinition::new("SimpleForm")
        .field("foo", Field::integer())
        .field("bar", Field::boolean());
    let mut form = FormBase::new(&def);
    let ok = form
        .validate(&submission([("foo", "42"), ("bar", "a value")]))
        .await
        .unwrap();
    assert!(ok);
    assert_eq!(form.get("foo"), Some(&Value::Int(42)));
    assert_eq!(form.get("bar"), Some(&Value::Bool(true)));
    assert_eq!(
        form.raw_data(),
        Some(&value_map! { "foo" => "42", "bar" => "a value" })
    );

    form.reset();
    assert!(form.raw_data().is_none());
    assert_eq!(form.get("foo"), None);
}

#[tokio::test]
async fn test_indexed_keys_become_lists() {
    let def = FormDefinition::new("ListForm")
        .field("ints", Field::multiple(Field::integer()))
        .field("tags", Field::comma_separated(Field::text()));
    let mut form = FormBase::new(&def);
    let data = submission([
        ("ints.0", "42"),
        ("ints.1", "125"),
        ("ints.55", "23"),
        ("tags", "foo, bar, baz"),
    ]);
    assert!(form.validate(&data).await.unwrap());
    assert_eq!(
        form.get("ints"),
        Some(&Value::from(vec![42, 125, 23]))
    );
    assert_eq!(
        form.get("tags"),
        Some(&Value::from(vec!["foo", "bar", "baz"]))
    );
}

#[tokio::test]
async fn test_form_as_list_item() {
    let def = FormDefinition::new("TeamForm")
        .field("team", Field::text())
        .field("people", Field::multiple(person_form().as_field()));
    let mut form = FormBase::new(&def);
    let data = submission([
        ("team", "mushrooms"),
        ("people.0.name", "Jane"),
        ("people.0.age", "32"),
        ("people.7.name", "John"),
        ("people.7.age", ""),
    ]);
    assert!(form.validate(&data).await.unwrap());

    let people = form.get("people").and_then(Value::as_list).unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(people[0].get("age"), Some(&Value::Int(32)));
    assert_eq!(people[1].get("name"), Some(&Value::from("John")));
    assert_eq!(people[1].get("age"), Some(&Value::Null));
}

#[tokio::test]
async fn test_nested_errors_use_dotted_names() {
    let def = FormDefinition::new("TeamForm")
        .field("people", Field::multiple(person_form().as_field()));
    let mut form = FormBase::new(&def);
    let data = submission([("people.0.name", "Jane"), ("people.1.age", "old")]);
    assert!(!form.validate(&data).await.unwrap());

    let errors = form.errors();
    assert_eq!(errors[&Some("people.1.name".to_string())], ["This field is required."]);
    assert_eq!(errors[&Some("people.1.age".to_string())], ["Please enter a whole number."]);
    assert!(!errors.contains_key(&Some("people.0.name".to_string())));
}

#[tokio::test]
async fn test_inherited_form_validates_base_rules() {
    let base = person_form().context_validator(from_fn(|_, data| {
        if data.get("name") == Some(&Value::from("root")) {
            Err(ValidationError::new("Reserved name"))
        } else {
            Ok(())
        }
    }));
    let employee = FormDefinition::new("EmployeeForm")
        .field("company", Field::text().required(true))
        .inherit(&base);
    assert_eq!(employee.field_names(), ["name", "age", "company"]);

    let mut form = FormBase::new(&employee);
    let data = submission([("name", "root"), ("company", "Acme")]);
    assert!(!form.validate(&data).await.unwrap());
    assert_eq!(form.errors()[&None], ["Reserved name"]);
}

#[tokio::test]
async fn test_validate_request_uses_integration_data() {
    let app = Arc::new(TestApp {
        request_body: Some("name=Jane&age=7"),
        ..TestApp::default()
    });
    let mut form = FormBase::new(&person_form()).with_integration(app);
    assert!(form.validate_request().await.unwrap());
    assert_eq!(form.get("age"), Some(&Value::Int(7)));

    let mut form = FormBase::new(&person_form()).with_integration(Arc::new(TestApp::default()));
    assert!(matches!(
        form.validate_request().await,
        Err(FormError::NotSupported(_))
    ));
}

// ============================================================================
// Category 2: Rendering
// ============================================================================

#[test]
fn test_render_checkbox_group() {
    let def = FormDefinition::new("ChoiceForm").field(
        "mc",
        Field::multi_choice([(1, "One"), (2, "Two"), (3, "Three")])
            .label("Foo")
            .widget(WidgetType::CheckboxGroup),
    );
    let form = FormBase::new(&def);
    let html = form.as_widget().display().unwrap();
    assert_eq!(
        html.as_str(),
        concat!(
            r#"<form action="" method="post"><dl class="mapping">"#,
            r#"<dt><label for="f_mc">Foo</label></dt><dd><ul id="f_mc" class="choicegroup">"#,
            r#"<li><input type="checkbox" id="f_mc_1" value="1" name="mc"> <label for="f_mc_1">One</label></li>"#,
            r#"<li><input type="checkbox" id="f_mc_2" value="2" name="mc"> <label for="f_mc_2">Two</label></li>"#,
            r#"<li><input type="checkbox" id="f_mc_3" value="3" name="mc"> <label for="f_mc_3">Three</label></li>"#,
            r#"</ul></dd></dl><div class="actions"><input type="submit" value="Submit"></div></form>"#,
        )
    );
}

#[tokio::test]
async fn test_submitted_choices_are_checked() {
    let def = FormDefinition::new("ChoiceForm").field(
        "mc",
        Field::multi_choice([(1, "One"), (2, "Two"), (3, "Three")]).widget(WidgetType::CheckboxGroup),
    );
    let mut form = FormBase::new(&def);
    assert!(form.validate(&submission([("mc", "1"), ("mc", "3")])).await.unwrap());
    assert_eq!(form.get("mc"), Some(&Value::from(vec![1, 3])));

    let widget = form.as_widget();
    let group = widget.field("mc").unwrap();
    assert!(group.choice(1).unwrap().checked());
    assert!(!group.choice(2).unwrap().checked());
    assert!(group.choice(3).unwrap().checked());
}

#[tokio::test]
async fn test_invalid_value_is_shown_with_error() {
    let mut form = FormBase::new(&person_form());
    assert!(!form.validate(&submission([("name", "Jane"), ("age", "old")])).await.unwrap());

    let widget = form.as_widget();
    assert_eq!(
        widget.field("age").unwrap().display(&Attrs::new()).as_str(),
        r#"<input type="text" id="f_age" value="old" name="age"><ul class="errors"><li>Please enter a whole number.</li></ul>"#
    );
    assert_eq!(widget.all_errors().len(), 1);
    assert!(widget.errors().is_empty());
}

#[test]
fn test_per_instance_choices_render() {
    let def = FormDefinition::new("StatusForm").field("status", Field::choice(Vec::<&str>::new()));
    let mut form = FormBase::new(&def).with_initial(value_map! { "status" => "b" });
    form.field_mut("status").unwrap().set_choices([("a", "Happy"), ("b", "Sad")]);

    let widget = form.as_widget();
    assert_eq!(
        widget.field("status").unwrap().render(&Attrs::new()).as_str(),
        r#"<select id="f_status" name="status"><option value="a">Happy</option><option value="b" selected>Sad</option></select>"#
    );
}

// ============================================================================
// Category 3: CSRF protection
// ============================================================================

#[tokio::test]
async fn test_csrf_token_roundtrip() {
    let app = Arc::new(TestApp::default());
    let new_form = || {
        FormBase::new(&person_form())
            .with_request_info(login_request())
            .with_integration(app.clone())
    };

    let form = new_form();
    assert!(form.csrf_protected());
    let token = form.csrf_token().unwrap();
    assert_eq!(new_form().csrf_token().unwrap(), token);

    let html = form.as_widget().display().unwrap();
    assert!(html.as_str().contains(&format!(
        r#"<div style="display: none"><input type="hidden" name="_csrf_token" value="{token}"></div>"#
    )));

    let mut form = new_form();
    let data = submission([("name", "Jane"), ("_csrf_token", token.as_str())]);
    assert!(form.validate(&data).await.unwrap());

    // used tokens are gone
    let fresh = new_form().csrf_token().unwrap();
    assert_ne!(fresh, token);
}

#[tokio::test]
async fn test_wrong_csrf_token_skips_field_validation() {
    let app = Arc::new(TestApp::default());
    let mut form = FormBase::new(&person_form())
        .with_request_info(login_request())
        .with_integration(app.clone());
    let _ = form.csrf_token().unwrap();

    let data = submission([("name", ""), ("_csrf_token", "forged")]);
    assert!(!form.validate(&data).await.unwrap());
    assert_eq!(
        form.errors()[&None],
        ["Form submitted multiple times or session expired.  Try again."]
    );
    assert!(!form.errors().contains_key(&Some("name".to_string())));
    assert!(app.session.is_modified());
}

#[tokio::test]
async fn test_csrf_requires_session() {
    let mut form = FormBase::new(&person_form()).with_request_info(login_request());
    assert!(matches!(
        form.validate(&submission([("name", "Jane")])).await,
        Err(FormError::NotSupported(_))
    ));

    let mut form = FormBase::new(&person_form()).with_request_info(login_request());
    form.options_mut().csrf_protected = Some(false);
    assert!(form.validate(&submission([("name", "Jane")])).await.unwrap());
}

// ============================================================================
// Category 4: Redirects and captcha
// ============================================================================

#[test]
fn test_redirect_back_to_referer() {
    let info = login_request().with_referer("http://example.com/account");
    let form = FormBase::new(&person_form()).with_request_info(info);
    assert_eq!(
        form.redirect_target().unwrap().as_deref(),
        Some("http://example.com/account")
    );

    let response = form.redirect("/index").unwrap();
    assert_eq!(response.status(), http::StatusCode::FOUND);
    assert_eq!(
        response.headers()[http::header::LOCATION],
        "http://example.com/account"
    );
}

#[test]
fn test_redirect_falls_back_for_unsafe_targets() {
    let info = login_request().with_referer("http://evil.com/");
    let form = FormBase::new(&person_form()).with_request_info(info);
    assert_eq!(form.redirect_target().unwrap(), None);
    let response = form.redirect("/index").unwrap();
    assert_eq!(response.headers()[http::header::LOCATION], "/index");

    let info = login_request().with_referer("http://example.com/account");
    let mut form = FormBase::new(&person_form()).with_request_info(info);
    form.add_invalid_redirect_target("/account").unwrap();
    assert_eq!(form.redirect_target().unwrap(), None);
}

#[test]
fn test_redirect_target_is_rendered_hidden() {
    let info = login_request().with_referer("http://example.com/account");
    let mut form = FormBase::new(&person_form()).with_request_info(info);
    form.options_mut().csrf_protected = Some(false);
    let pairs = form.as_widget().hidden_field_pairs().unwrap();
    assert_eq!(
        pairs,
        [("_redirect_target", "http://example.com/account".to_string())]
    );
}

fn captcha_form(app: Arc<TestApp>) -> FormBase {
    let def = person_form().options(FormOptions {
        csrf_protected: Some(false),
        captcha_protected: true,
        recaptcha_public_key: Some("public".to_string()),
        recaptcha_private_key: Some("private".to_string()),
        ..FormOptions::default()
    });
    FormBase::new(&def)
        .with_request_info(login_request().with_remote_addr("10.0.0.1"))
        .with_integration(app)
}

#[tokio::test]
async fn test_captcha_checked_before_fields() {
    let verifier = Arc::new(FixedAnswer {
        answer: "fungus",
        calls: Mutex::new(Vec::new()),
    });
    let app = Arc::new(TestApp {
        verifier: Some(verifier.clone()),
        ..TestApp::default()
    });

    let mut form = captcha_form(app.clone());
    let data = submission([(RESPONSE_FIELD, "mold")]);
    assert!(!form.validate(&data).await.unwrap());
    assert_eq!(form.errors()[&None], ["You entered an invalid captcha."]);
    assert_eq!(form.errors().len(), 1);

    let mut form = captcha_form(app);
    let data = submission([("name", "Jane"), (RESPONSE_FIELD, "fungus")]);
    assert!(form.validate(&data).await.unwrap());
    assert_eq!(*verifier.calls.lock().unwrap(), ["10.0.0.1", "10.0.0.1"]);
}

#[test]
fn test_captcha_widget_uses_public_key() {
    let form = captcha_form(Arc::new(TestApp::default()));
    let captcha = form.as_widget().captcha().unwrap();
    assert!(captcha.as_str().contains("k=public"));

    let plain = FormBase::new(&person_form());
    assert!(plain.as_widget().captcha().is_none());
}
