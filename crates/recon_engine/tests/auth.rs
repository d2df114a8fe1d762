mod common;

use std::time::Duration;

use common::{FakeDriver, FakeLogin, LOGIN_PAGE};
use recon_engine::{AuthFailure, AuthOutcome, Authenticator, DriverError};

const LOGIN: &str = "https://intel.example.com/login";
const DASHBOARD: &str = "https://intel.example.com/dashboard";
const LOGIN_ERROR: &str = "https://intel.example.com/login?error=1";

fn authenticator() -> Authenticator {
    Authenticator::new(Duration::from_secs(10), Duration::from_secs(60))
}

fn site() -> FakeDriver {
    FakeDriver::new()
        .with_page(LOGIN, LOGIN_PAGE)
        .with_page(DASHBOARD, "<html><body>Welcome</body></html>")
        .with_page(LOGIN_ERROR, LOGIN_PAGE)
        .with_login(FakeLogin {
            login_url: LOGIN.to_string(),
            username: "analyst@example.com".to_string(),
            password: "s3cret".to_string(),
            success_url: DASHBOARD.to_string(),
            failure_url: LOGIN_ERROR.to_string(),
        })
}

#[tokio::test]
async fn missing_credentials_skip_without_navigation() {
    common::init_logging();
    let mut driver = site();

    let outcome = authenticator()
        .authenticate(&mut driver, LOGIN, "analyst@example.com", "")
        .await;
    assert_eq!(outcome, AuthOutcome::SkippedNoCredentials);

    let outcome = authenticator().authenticate(&mut driver, LOGIN, "", "s3cret").await;
    assert_eq!(outcome, AuthOutcome::SkippedNoCredentials);

    assert!(driver.navigations().is_empty());
}

#[tokio::test]
async fn valid_credentials_land_on_dashboard() {
    let mut driver = site();

    let outcome = authenticator()
        .authenticate(&mut driver, LOGIN, "analyst@example.com", "s3cret")
        .await;

    assert_eq!(
        outcome,
        AuthOutcome::Authenticated {
            landing_url: DASHBOARD.to_string()
        }
    );
    let log = driver.call_log();
    let calls = log.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            format!("navigate {LOGIN}"),
            "type input[type=\"email\"]".to_string(),
            "type input[type=\"password\"]".to_string(),
            "click button[type=\"submit\"]".to_string(),
        ]
    );
}

#[tokio::test]
async fn rejected_credentials_report_failed_login() {
    let mut driver = site();

    let outcome = authenticator()
        .authenticate(&mut driver, LOGIN, "analyst@example.com", "wrong")
        .await;

    assert_eq!(
        outcome,
        AuthOutcome::FailedLogin(AuthFailure::Rejected(LOGIN_ERROR.to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn missing_form_times_out() {
    let mut driver = FakeDriver::new().with_page(LOGIN, "<html><body>Maintenance</body></html>");
    let authenticator = Authenticator::new(Duration::from_secs(10), Duration::from_secs(60));

    let outcome = authenticator
        .authenticate(&mut driver, LOGIN, "analyst@example.com", "s3cret")
        .await;

    assert_eq!(
        outcome,
        AuthOutcome::FailedLogin(AuthFailure::LoginFormNotFound(Duration::from_secs(10)))
    );
}

#[tokio::test(start_paused = true)]
async fn stalled_element_lookup_is_bounded() {
    let mut driver = site().with_stalled_lookups();
    let outcome = Authenticator::new(Duration::from_secs(10), Duration::from_secs(1))
        .authenticate(&mut driver, LOGIN, "analyst@example.com", "s3cret")
        .await;
    assert_eq!(
        outcome,
        AuthOutcome::FailedLogin(AuthFailure::Driver(DriverError::Timeout))
    );

    let mut driver = site().with_stalled_lookups();
    let outcome = authenticator()
        .authenticate(&mut driver, LOGIN, "analyst@example.com", "s3cret")
        .await;
    assert_eq!(
        outcome,
        AuthOutcome::FailedLogin(AuthFailure::LoginFormNotFound(Duration::from_secs(10)))
    );
}

#[tokio::test]
async fn driver_errors_do_not_escape() {
    let mut driver = FakeDriver::new().with_failure(
        LOGIN,
        DriverError::Navigation {
            url: LOGIN.to_string(),
            message: "connection refused".to_string(),
        },
    );

    let outcome = authenticator()
        .authenticate(&mut driver, LOGIN, "analyst@example.com", "s3cret")
        .await;

    assert!(matches!(
        outcome,
        AuthOutcome::FailedLogin(AuthFailure::Driver(DriverError::Navigation { .. }))
    ));
}

#[tokio::test]
async fn form_without_password_field_fails() {
    let mut driver = FakeDriver::new().with_page(
        LOGIN,
        r#"<html><body><form><input type="text" name="username"><button>Next</button></form></body></html>"#,
    );

    let outcome = authenticator()
        .authenticate(&mut driver, LOGIN, "analyst", "s3cret")
        .await;

    assert_eq!(
        outcome,
        AuthOutcome::FailedLogin(AuthFailure::MissingField("password"))
    );
}
