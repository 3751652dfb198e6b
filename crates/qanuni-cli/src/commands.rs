use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};
use qanuni_core::config::API_BASE_ENV;
use qanuni_core::models::ResetChannel;

fn identity_arg() -> Arg {
    Arg::new("identity")
        .short('i')
        .long("identity")
        .help("National ID or iqama number")
        .required(true)
}

fn password_arg() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Password (prompted for when omitted)")
        .env("QANUNI_PASSWORD")
        .hide_env_values(true)
}

fn text_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("qanuni")
        .about("Client for the legal-services portal API")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-base")
                .long("api-base")
                .help("Base URL of the portal API")
                .env(API_BASE_ENV)
                .global(true),
        )
        .arg(
            Arg::new("profile")
                .long("profile")
                .help("Keychain profile the session is stored under")
                .env("QANUNI_PROFILE")
                .default_value("default")
                .global(true),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in with identity and password")
                .arg(identity_arg())
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("fast-login")
                .about("Request a one-time code over WhatsApp")
                .arg(identity_arg()),
        )
        .subcommand(
            Command::new("register")
                .about("Create a personal or company account")
                .arg(text_arg("full-name", "Full name").required(true))
                .arg(identity_arg())
                .arg(text_arg("email", "E-mail address").required(true))
                .arg(text_arg("phone", "Phone number").required(true))
                .arg(text_arg("date-of-birth", "Date of birth (YYYY-MM-DD)").default_value(""))
                .arg(text_arg("address", "Postal address").default_value(""))
                .arg(text_arg("contract-type", "Contract type"))
                .arg(text_arg("contract-hours", "Contract hours"))
                .arg(text_arg("contract-duration", "Contract duration"))
                .arg(text_arg("company-name", "Register a company account under this name"))
                .arg(
                    text_arg("type-of-legal", "Legal form of the company")
                        .requires("company-name"),
                )
                .arg(
                    text_arg("commercial-register-number", "Commercial register number")
                        .requires("company-name"),
                )
                .arg(
                    text_arg("articles-expiry", "Articles of incorporation expiry date")
                        .requires("company-name"),
                )
                .arg(
                    text_arg("commercial-register-expiry", "Commercial register expiry date")
                        .requires("company-name"),
                )
                .arg(password_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Confirm the WhatsApp verification code")
                .arg(
                    Arg::new("code")
                        .help("Six digit code")
                        .required(true),
                )
                .arg(text_arg(
                    "purpose",
                    "Purpose marker to send with the code (defaults to the pending one)",
                )),
        )
        .subcommand(
            Command::new("forgot-password")
                .about("Start password recovery")
                .arg(identity_arg())
                .arg(
                    Arg::new("channel")
                        .short('c')
                        .long("channel")
                        .help("Where to send the reset code: email or whatsapp")
                        .default_value("whatsapp")
                        .value_parser(|s: &str| s.parse::<ResetChannel>()),
                ),
        )
        .subcommand(
            Command::new("reset-email")
                .about("Send a password reset link by e-mail")
                .arg(identity_arg()),
        )
        .subcommand(
            Command::new("reset-whatsapp")
                .about("Send a password reset code to the registered WhatsApp number")
                .arg(identity_arg()),
        )
        .subcommand(
            Command::new("reset-password")
                .about("Set a new password after verification")
                .arg(password_arg()),
        )
        .subcommand(Command::new("refresh").about("Refresh the access token now"))
        .subcommand(
            Command::new("status")
                .about("Show the stored session")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out and forget the stored session"))
}
