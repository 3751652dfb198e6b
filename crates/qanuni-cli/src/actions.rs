//! Command handlers.
//!
//! Each run restores the session saved in the keychain, executes one
//! command against the `SessionManager`, and writes the resulting session
//! back (or removes it once the session has ended). `status` and `logout`
//! only touch the keychain and config, so they work without an API base URL.

use anyhow::{Context, Result};
use clap::ArgMatches;
use qanuni_core::models::{
    CompanyDetails, ForgotPasswordRequest, IdentityRequest, RegistrationForm, ResetChannel,
    VerificationPurpose, VerifyCodeRequest,
};
use qanuni_core::{
    ApiClient, AuthError, Config, Credentials, SessionManager, SessionState, TokenStore,
};
use secrecy::SecretString;
use tracing::{debug, info, warn};

struct App {
    config: Config,
    manager: SessionManager,
    store: TokenStore,
}

fn arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    arg(matches, name).ok_or_else(|| anyhow::anyhow!("missing required argument: --{}", name))
}

fn password(matches: &ArgMatches, prompt: &str) -> Result<String> {
    match arg(matches, "password") {
        Some(password) => Ok(password),
        None => rpassword::prompt_password(prompt).context("Failed to read password"),
    }
}

/// Turn the session-expired case into the message a user can act on
fn explain(err: AuthError) -> anyhow::Error {
    match err {
        AuthError::SessionExpired => {
            anyhow::anyhow!("Session expired. Run `qanuni login` to sign in again.")
        }
        AuthError::InvalidCredentials => anyhow::anyhow!("Sign-in failed: wrong identity or password"),
        other => anyhow::Error::new(other),
    }
}

/// Commands that never call the API
fn is_offline(command: &str) -> bool {
    matches!(command, "status" | "logout")
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let config = Config::load()?;
    let explicit_base = matches.get_one::<String>("api-base").map(String::as_str);

    let profile = arg(matches, "profile").unwrap_or_else(|| "default".to_string());
    let store = TokenStore::new(profile);

    let saved = match store.load() {
        Ok(saved) => saved,
        Err(e) => {
            warn!(error = %e, "Could not read stored session");
            None
        }
    };

    if matches.subcommand_name().is_some_and(is_offline) {
        let api_base = config.api_base(explicit_base).ok();
        return match matches.subcommand() {
            Some(("status", sub)) => status(
                &saved.unwrap_or_default(),
                api_base.as_deref(),
                &config,
                sub.get_flag("json"),
            ),
            Some(("logout", _)) => logout(&store),
            _ => Err(anyhow::anyhow!("unknown command")),
        };
    }

    let api_base = config.api_base(explicit_base)?;
    let api = ApiClient::with_timeout(api_base, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let manager = SessionManager::new(api);

    if let Some(saved) = saved {
        debug!("Restored session from keychain");
        manager.restore(saved).await;
    }

    let mut ctx = App {
        config,
        manager,
        store,
    };

    let result = dispatch(&mut ctx, matches).await;

    // Persist whatever the command left behind, including a session torn
    // down by a failed refresh.
    if let Err(e) = ctx.store.sync(&ctx.manager.state().await) {
        warn!(error = %e, "Could not update stored session");
    }

    result
}

async fn dispatch(ctx: &mut App, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("login", sub)) => login(ctx, sub).await,
        Some(("fast-login", sub)) => fast_login(ctx, sub).await,
        Some(("register", sub)) => register(ctx, sub).await,
        Some(("verify", sub)) => verify(ctx, sub).await,
        Some(("forgot-password", sub)) => forgot_password(ctx, sub).await,
        Some(("reset-email", sub)) => {
            let request = IdentityRequest {
                identity: required(sub, "identity")?,
            };
            ctx.manager
                .reset_password_by_email(&request)
                .await
                .map_err(explain)?;
            println!("A password reset link was sent to your e-mail address.");
            Ok(())
        }
        Some(("reset-whatsapp", sub)) => {
            let request = IdentityRequest {
                identity: required(sub, "identity")?,
            };
            ctx.manager
                .reset_password_by_whatsapp(&request)
                .await
                .map_err(explain)?;
            println!("A verification code was sent to your registered WhatsApp number.");
            Ok(())
        }
        Some(("reset-password", sub)) => reset_password(ctx, sub).await,
        Some(("refresh", _)) => {
            ctx.manager.refresh().await.map_err(explain)?;
            println!("Access token refreshed.");
            Ok(())
        }
        _ => Err(anyhow::anyhow!("unknown command")),
    }
}

async fn login(ctx: &mut App, sub: &ArgMatches) -> Result<()> {
    let identity = required(sub, "identity")?;
    let credentials = Credentials::new(identity.clone(), password(sub, "Password: ")?);

    ctx.manager.login(&credentials).await.map_err(explain)?;

    ctx.config.last_identity = Some(identity);
    ctx.config.save()?;
    println!("Signed in.");
    Ok(())
}

async fn fast_login(ctx: &mut App, sub: &ArgMatches) -> Result<()> {
    ctx.manager
        .fast_login(&required(sub, "identity")?)
        .await
        .map_err(explain)?;

    ctx.config.pending_verification = None;
    ctx.config.save()?;
    println!("A one-time code was sent over WhatsApp. Confirm it with `qanuni verify <code>`.");
    Ok(())
}

async fn register(ctx: &mut App, sub: &ArgMatches) -> Result<()> {
    let company = arg(sub, "company-name").map(|company_name| CompanyDetails {
        type_of_legal: arg(sub, "type-of-legal").unwrap_or_default(),
        company_name,
        commercial_register_number: arg(sub, "commercial-register-number").unwrap_or_default(),
        articles_of_incorporation_expiry: arg(sub, "articles-expiry").unwrap_or_default(),
        commercial_register_expiry: arg(sub, "commercial-register-expiry"),
    });

    let form = RegistrationForm {
        full_name: required(sub, "full-name")?,
        identity: required(sub, "identity")?,
        date_of_birth: arg(sub, "date-of-birth").unwrap_or_default(),
        address: arg(sub, "address").unwrap_or_default(),
        phone_number: required(sub, "phone")?,
        email: required(sub, "email")?,
        contract_type: arg(sub, "contract-type"),
        contract_hours: arg(sub, "contract-hours"),
        contract_duration: arg(sub, "contract-duration"),
        password: SecretString::from(password(sub, "Choose a password: ")?),
        company,
    };

    ctx.manager.register(&form).await.map_err(explain)?;
    println!("Account created. Sign in with `qanuni login -i {}`.", form.identity);
    Ok(())
}

async fn verify(ctx: &mut App, sub: &ArgMatches) -> Result<()> {
    let request = VerifyCodeRequest {
        purpose: arg(sub, "purpose").or_else(|| ctx.config.pending_verification.clone()),
        code: required(sub, "code")?,
    };
    let resetting = VerificationPurpose(request.purpose.clone()).is_password_reset();

    ctx.manager
        .verify_whatsapp_code(&request)
        .await
        .map_err(explain)?;

    ctx.config.pending_verification = None;
    ctx.config.save()?;
    if resetting {
        println!("Code verified. Set a new password with `qanuni reset-password`.");
    } else {
        println!("Code verified. Signed in.");
    }
    Ok(())
}

async fn forgot_password(ctx: &mut App, sub: &ArgMatches) -> Result<()> {
    let channel = sub
        .get_one::<ResetChannel>("channel")
        .copied()
        .unwrap_or(ResetChannel::WhatsApp);
    let request = ForgotPasswordRequest {
        identity: required(sub, "identity")?,
        channel,
    };

    let purpose = ctx.manager.forgot_password(&request).await.map_err(explain)?;

    ctx.config.pending_verification = purpose.0.clone();
    ctx.config.save()?;
    match channel {
        ResetChannel::Email => println!("Check your e-mail for the reset link."),
        ResetChannel::WhatsApp => {
            println!("Enter the code sent over WhatsApp with `qanuni verify <code>`.")
        }
    }
    Ok(())
}

async fn reset_password(ctx: &mut App, sub: &ArgMatches) -> Result<()> {
    let new_password = match arg(sub, "password") {
        Some(password) => password,
        None => {
            let first = rpassword::prompt_password("New password: ")
                .context("Failed to read password")?;
            let second = rpassword::prompt_password("Repeat new password: ")
                .context("Failed to read password")?;
            if first != second {
                return Err(anyhow::anyhow!("Passwords do not match"));
            }
            first
        }
    };

    ctx.manager
        .reset_password(&new_password)
        .await
        .map_err(explain)?;
    println!("Password updated. Sign in with your new password.");
    Ok(())
}

fn logout(store: &TokenStore) -> Result<()> {
    store.delete()?;
    info!("Signed out");
    println!("Signed out.");
    Ok(())
}

fn status(
    state: &SessionState,
    api_base: Option<&str>,
    config: &Config,
    json: bool,
) -> Result<()> {
    if json {
        let summary = serde_json::json!({
            "active": state.is_active(),
            "has_refresh_token": state.refresh_token().is_some(),
            "issued_at": state.issued_at(),
            "api_base": api_base,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if !state.is_active() {
        println!("Not signed in.");
        return Ok(());
    }
    match api_base {
        Some(api_base) => println!("Signed in against {}", api_base),
        None => println!("Signed in (no API base URL configured)"),
    }
    if let Some(issued_at) = state.issued_at() {
        println!("Access token issued {}", issued_at.format("%Y-%m-%d %H:%M UTC"));
    }
    if state.refresh_token().is_none() {
        println!("No refresh token; the session ends when the access token expires.");
    }
    if let Some(ref identity) = config.last_identity {
        println!("Last identity: {}", identity);
    }
    Ok(())
}
