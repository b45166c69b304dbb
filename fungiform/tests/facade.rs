//! End-to-end use of the facade: settings from a config file, a form built
//! from the prelude, validation and rendering.

use fungiform::core::settings_loader::from_toml_str;
use fungiform::prelude::*;

const CONFIG: &str = r#"
html_dialect = "xhtml"
csrf_protected = false
max_csrf_tokens = 8
"#;

fn signup() -> FormDefinition {
    let settings = from_toml_str(CONFIG).unwrap();
    FormDefinition::new("SignupForm")
        .field("username", Field::text().required(true).validator(MinLength(3)))
        .field("newsletter", Field::boolean().label("Newsletter"))
        .options(FormOptions::from_settings(&settings))
}

#[test]
fn test_config_file_drives_form_options() {
    let options = signup().form_options();
    assert_eq!(options.html, Dialect::Xhtml);
    assert_eq!(options.csrf_protected, Some(false));
    assert_eq!(options.max_csrf_tokens, 8);
    assert!(options.redirect_tracking);
}

#[tokio::test]
async fn test_validate_and_render_with_prelude() {
    let mut form = FormBase::new(&signup())
        .with_request_info(RequestInfo::new("https", "example.com").with_path_info("/signup"));
    let data = FormData::parse_urlencoded("username=jo&newsletter=on");
    assert!(!form.validate(&data).await.unwrap());
    assert_eq!(
        form.errors()[&Some("username".to_string())],
        ["Please enter at least 3 characters."]
    );

    let widget = form.as_widget();
    assert_eq!(
        widget.field("newsletter").unwrap().render(&Attrs::new()).as_str(),
        r#"<input type="checkbox" id="f_newsletter" name="newsletter" checked="checked" />"#
    );

    let data = FormData::parse_urlencoded("username=joanna");
    assert!(form.validate(&data).await.unwrap());
    assert_eq!(form.get("newsletter"), Some(&Value::Bool(false)));
}

#[test]
fn test_value_map_reexport() {
    let initial = fungiform::value_map! { "username" => "jane" };
    let form = FormBase::new(&signup()).with_initial(initial);
    assert_eq!(form.get("username"), Some(&Value::from("jane")));
    assert!(!form.has_changed());
}
