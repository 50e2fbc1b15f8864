mod test_support;

use serde_json::json;
use test_support::{Portal, Sidecar};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[test]
fn teacher_session_gates_methods_by_role() {
    let portal = Portal::start();
    portal.mount_login("teacher", "Mr Ade");
    portal.mount(
        Mock::given(method("POST"))
            .and(path("/api/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Logged out" }))),
    );
    let mut sidecar = Sidecar::spawn(&portal.api_base_url());

    let login = sidecar.request_ok("1", "session.login", json!({ "login": "ade", "password": "secret" }));
    assert_eq!(login["principal"]["role"], "teacher");
    assert_eq!(login["principal"]["displayName"], "Mr Ade");
    assert_eq!(login["landingRoute"], "/teacher/dashboard");

    let again = sidecar.request_err(
        "2",
        "session.login",
        json!({ "login": "ade", "password": "secret" }),
        "already_authenticated",
    );
    assert_eq!(again["details"]["landingRoute"], "/teacher/dashboard");

    sidecar.request_err("3", "admin.classes.list", json!({}), "forbidden");
    sidecar.request_err("4", "student.results", json!({}), "forbidden");

    let current = sidecar.request_ok("5", "session.current", json!({}));
    assert_eq!(current["authenticated"], true);

    sidecar.request_ok("6", "session.logout", json!({}));
    assert_eq!(portal.received("POST", "/api/logout").len(), 1);

    let current = sidecar.request_ok("7", "session.current", json!({}));
    assert_eq!(current["authenticated"], false);
    sidecar.request_err("8", "teacher.dashboard", json!({}), "unauthorized");

    assert!(sidecar.notices().iter().any(|m| m == "Welcome back, Mr Ade!"));
}

#[test]
fn rate_limited_login_surfaces_server_message() {
    let portal = Portal::start();
    portal.mount(
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "message": "Slow down, try again in 60s" }))),
    );
    let mut sidecar = Sidecar::spawn(&portal.api_base_url());

    sidecar.request_err(
        "1",
        "session.login",
        json!({ "login": "ade", "password": "wrong" }),
        "rate_limited",
    );
    sidecar.sync();
    assert!(sidecar
        .notices()
        .iter()
        .any(|m| m == "Slow down, try again in 60s"));
}

#[test]
fn missing_credentials_never_reach_the_server() {
    let portal = Portal::start();
    let mut sidecar = Sidecar::spawn(&portal.api_base_url());

    sidecar.request_err("1", "session.login", json!({ "login": "ade" }), "validation_failed");
    sidecar.request_err(
        "2",
        "session.studentLogin",
        json!({ "password": "secret" }),
        "validation_failed",
    );
    assert!(portal.received("POST", "/api/login").is_empty());
    assert!(portal.received("POST", "/api/student/login").is_empty());
}

#[test]
fn student_login_lands_on_student_routes() {
    let portal = Portal::start();
    portal.mount_login("student", "Chioma");
    portal.mount(
        Mock::given(method("POST"))
            .and(path("/api/student/logout"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({}))),
    );
    let mut sidecar = Sidecar::spawn(&portal.api_base_url());

    let login = sidecar.request_ok(
        "1",
        "session.studentLogin",
        json!({ "admissionNumber": "ADM/001", "password": "secret" }),
    );
    assert_eq!(login["landingRoute"], "/student/dashboard");
    let sent: serde_json::Value =
        serde_json::from_slice(&portal.received("POST", "/api/student/login")[0].body).expect("login body");
    assert_eq!(sent["admission_number"], "ADM/001");

    sidecar.request_err("2", "scores.open", json!({}), "forbidden");
    sidecar.request_ok("3", "session.logout", json!({}));
    assert_eq!(portal.received("POST", "/api/student/logout").len(), 1);
}
