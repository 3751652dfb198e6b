use std::net::TcpListener;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::future::join_all;
use qanuni_core::models::{
    ForgotPasswordRequest, IdentityRequest, RegistrationForm, ResetChannel, VerifyCodeRequest,
};
use qanuni_core::{ApiClient, ApiError, AuthError, Credentials, SessionManager, SessionState};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CASES_PATH: &str = "/Cases";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Authenticated call made by a consumer of the session, outside the auth API.
async fn fetch_cases(base: &str, token: String) -> Result<Value, ApiError> {
    let response = reqwest::Client::new()
        .get(format!("{}{}", base, CASES_PATH))
        .bearer_auth(token)
        .send()
        .await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_status(status, &body));
    }
    Ok(response.json().await?)
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/Login"))
        .and(body_json(json!({"identity": "1098765432", "password": "correct"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "A1",
            "refreshToken": "R1"
        })))
        .mount(server)
        .await;
}

async fn mount_cases(server: &MockServer, token: &str, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({"cases": [], "token": token}))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path(CASES_PATH))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn signed_in(server: &MockServer) -> Result<SessionManager> {
    mount_login(server).await;
    let manager = SessionManager::new(ApiClient::new(server.uri())?);
    manager
        .login(&Credentials::new("1098765432", "correct"))
        .await?;
    Ok(manager)
}

#[tokio::test]
async fn login_then_request_uses_access_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_cases(&server, "A1", 200).await;

    let manager = signed_in(&server).await?;
    let state = manager.state().await;
    assert_eq!(state.access_token(), Some("A1"));
    assert_eq!(state.refresh_token(), Some("R1"));

    let base = server.uri();
    let body = manager
        .authenticated_request(|token| fetch_cases(&base, token))
        .await?;
    assert_eq!(body["token"], "A1");
    Ok(())
}

#[tokio::test]
async fn invalid_credentials_are_not_retried() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let manager = SessionManager::new(ApiClient::new(server.uri())?);
    let err = manager
        .login(&Credentials::new("1098765432", "wrong"))
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(!manager.is_authenticated().await);
    Ok(())
}

#[tokio::test]
async fn login_transport_failure_is_surfaced() -> Result<()> {
    // Nothing listens on the discard port
    let manager = SessionManager::new(ApiClient::new("http://127.0.0.1:9")?);
    let err = manager
        .login(&Credentials::new("1098765432", "correct"))
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;
    assert!(matches!(err, AuthError::Transport(_)));
    Ok(())
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_retried() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_cases(&server, "A1", 401).await;
    mount_cases(&server, "A2", 200).await;
    Mock::given(method("POST"))
        .and(path("/Resend-Access-Token"))
        .and(body_json(json!({"refreshToken": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "A2",
            "refreshToken": "R2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = signed_in(&server).await?;
    let base = server.uri();
    let body = manager
        .authenticated_request(|token| fetch_cases(&base, token))
        .await?;

    assert_eq!(body["token"], "A2");
    let state = manager.state().await;
    assert_eq!(state.access_token(), Some("A2"));
    assert_eq!(state.refresh_token(), Some("R2"));
    Ok(())
}

#[tokio::test]
async fn concurrent_expired_requests_share_one_refresh() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_cases(&server, "A1", 401).await;
    mount_cases(&server, "A2", 200).await;
    Mock::given(method("POST"))
        .and(path("/Resend-Access-Token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "A2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = signed_in(&server).await?;
    let base = server.uri();
    let requests =
        (0..8).map(|_| manager.authenticated_request(|token| fetch_cases(&base, token)));
    let results = join_all(requests).await;

    for result in results {
        assert_eq!(result?["token"], "A2");
    }
    // Refresh response did not rotate the refresh token
    assert_eq!(manager.state().await.refresh_token(), Some("R1"));
    Ok(())
}

#[tokio::test]
async fn revoked_refresh_token_ends_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_cases(&server, "A1", 401).await;
    Mock::given(method("POST"))
        .and(path("/Resend-Access-Token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let manager = signed_in(&server).await?;
    let base = server.uri();
    let err = manager
        .authenticated_request(|token| fetch_cases(&base, token))
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;

    assert!(err.is_session_expired());
    assert_eq!(manager.state().await, SessionState::default());
    Ok(())
}

#[tokio::test]
async fn logout_blocks_requests_without_network() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CASES_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Resend-Access-Token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let manager = signed_in(&server).await?;
    manager.logout().await;
    manager.logout().await;

    let base = server.uri();
    let err = manager
        .authenticated_request(|token| fetch_cases(&base, token))
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;
    assert!(err.is_session_expired());
    Ok(())
}

#[tokio::test]
async fn non_expiry_errors_pass_through_without_refresh() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_cases(&server, "A1", 503).await;
    Mock::given(method("POST"))
        .and(path("/Resend-Access-Token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let manager = signed_in(&server).await?;
    let base = server.uri();
    let err = manager
        .authenticated_request(|token| fetch_cases(&base, token))
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;
    assert!(matches!(err, AuthError::Api(ApiError::ServerError(_))));
    assert!(manager.is_authenticated().await);
    Ok(())
}

#[tokio::test]
async fn password_recovery_over_whatsapp() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Forget-Password"))
        .and(body_json(json!({"identity": "1098765432", "type": "WhatsApp"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "T0",
            "typeOfGender": "ForgetPassword"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Verify/Verify-WhatsApp-Code"))
        .and(header("Authorization", "Bearer T0"))
        .and(body_json(json!({"typeOfGenerate": "ForgetPassword", "code": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "A5",
            "refreshToken": "R5"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Reset-Password"))
        .and(body_json(json!({"password": "N3w-pass", "confirmPassword": "N3w-pass"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let manager = SessionManager::new(ApiClient::new(server.uri())?);
    let purpose = manager
        .forgot_password(&ForgotPasswordRequest {
            identity: "1098765432".to_string(),
            channel: ResetChannel::WhatsApp,
        })
        .await?;
    assert!(purpose.is_password_reset());
    assert_eq!(manager.access_token().await.as_deref(), Some("T0"));

    let state = manager
        .verify_whatsapp_code(&VerifyCodeRequest {
            purpose: purpose.0.clone(),
            code: "123456".to_string(),
        })
        .await?;
    assert_eq!(state.access_token(), Some("A5"));
    assert_eq!(state.refresh_token(), Some("R5"));

    let ack = manager.reset_password("N3w-pass").await?;
    assert!(ack.is_null());
    Ok(())
}

#[tokio::test]
async fn reset_by_whatsapp_requires_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Reset-Whats-Password"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let manager = SessionManager::new(ApiClient::new(server.uri())?);
    let err = manager
        .reset_password_by_whatsapp(&IdentityRequest {
            identity: "1098765432".to_string(),
        })
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;
    assert!(err.is_session_expired());
    Ok(())
}

#[tokio::test]
async fn fast_login_and_registration_store_access_token_only() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Login-OTP"))
        .and(query_param("Identity", "1098765432"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "OTP"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Register/User"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "REG"})))
        .expect(1)
        .mount(&server)
        .await;

    let manager = SessionManager::new(ApiClient::new(server.uri())?);
    let state = manager.fast_login("1098765432").await?;
    assert_eq!(state.access_token(), Some("OTP"));
    assert!(state.refresh_token().is_none());

    let form = RegistrationForm {
        full_name: "سارة أحمد".to_string(),
        identity: "1098765432".to_string(),
        date_of_birth: "1990-04-01".to_string(),
        address: "الرياض".to_string(),
        phone_number: "+966500000000".to_string(),
        email: "sara@example.com".to_string(),
        contract_type: None,
        contract_hours: None,
        contract_duration: None,
        password: secrecy::SecretString::from("P@ssw0rd".to_string()),
        company: None,
    };
    let state = manager.register(&form).await?;
    assert_eq!(state.access_token(), Some("REG"));
    assert!(state.refresh_token().is_none());
    Ok(())
}

#[tokio::test]
async fn registration_validation_errors_are_surfaced() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Register/User"))
        .respond_with(ResponseTemplate::new(422).set_body_string("email already used"))
        .mount(&server)
        .await;

    let manager = SessionManager::new(ApiClient::new(server.uri())?);
    let form = RegistrationForm {
        full_name: "x".to_string(),
        identity: "1".to_string(),
        date_of_birth: String::new(),
        address: String::new(),
        phone_number: String::new(),
        email: "sara@example.com".to_string(),
        contract_type: None,
        contract_hours: None,
        contract_duration: None,
        password: secrecy::SecretString::from("pw".to_string()),
        company: None,
    };
    let err = manager
        .register(&form)
        .await
        .err()
        .ok_or_else(|| anyhow!("expected error"))?;
    assert!(matches!(err, AuthError::Validation(ref body) if body == "email already used"));
    Ok(())
}
