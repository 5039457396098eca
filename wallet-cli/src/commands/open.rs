//! Open command - run the wallet client for an address
//!
//! Each iteration of the outer loop is one page load: a fresh context runs
//! auto-login, then the prompt loop follows whichever screen the flows
//! rendered. Navigation back to the base address starts the next load.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dialoguer::{Input, Password, Select};

use wallet_core::adapters::headless::Screen;
use wallet_core::adapters::location::UrlLocation;
use wallet_core::config::Config;
use wallet_core::domain::payment::parse_amount;
use wallet_core::ports::Location;
use wallet_core::services::logging::events;
use wallet_core::services::LogEvent;
use wallet_core::{PaymentState, RegistrationForm, WalletContext};

use super::{ensure_wallet_dir, get_logger, log_event};
use crate::output;
use crate::terminal::TerminalView;

/// Address used when none is given
pub const DEFAULT_URL: &str = "https://wallet.local/";

const REDIRECT_POLL: Duration = Duration::from_millis(100);
const REDIRECT_GRACE: Duration = Duration::from_millis(500);

const LOGIN_MENU: [&str; 3] = ["Log in", "Create account", "Quit"];
const DASHBOARD_MENU: [&str; 4] = ["Send funds", "Show history", "Log out", "Quit"];

enum Step {
    Stay,
    Reload,
    Quit,
}

pub async fn run(url: Option<String>, demo: bool) -> Result<()> {
    if atty::isnt(atty::Stream::Stdin) {
        anyhow::bail!("ww open needs an interactive terminal");
    }
    let wallet_dir = ensure_wallet_dir()?;
    let mut config = Config::load(&wallet_dir)?;
    if demo {
        config.enable_demo_mode();
    }
    if config.demo_mode {
        output::warning("Demo mode: using the built-in demo backend");
    }

    let address = url.as_deref().unwrap_or(DEFAULT_URL);
    let location = Arc::new(
        UrlLocation::parse(address).with_context(|| format!("Invalid address: {}", address))?,
    );
    let view = Arc::new(TerminalView::new());
    let logger = get_logger();
    log_event(
        &logger,
        LogEvent::new(events::COMMAND_EXECUTED).with_action("open"),
    );

    loop {
        view.reset();
        let ctx = WalletContext::with_config(
            &wallet_dir,
            config.clone(),
            view.clone(),
            location.clone(),
            logger.clone(),
        )
        .context("Failed to initialize wallet client")?;

        ctx.start().await;
        match drive(&ctx, &view, &location).await {
            Ok(Step::Reload) => {
                tracing::debug!(address = %location.url(), "Reloading");
            }
            Ok(_) => return Ok(()),
            Err(e) => {
                ctx.report_unhandled(&e);
                return Err(e);
            }
        }
    }
}

/// Prompt according to the rendered screen until the page reloads or the
/// user quits
async fn drive(ctx: &WalletContext, view: &TerminalView, location: &UrlLocation) -> Result<Step> {
    loop {
        if location.take_navigation() {
            return Ok(Step::Reload);
        }

        let step = if ctx.payment_state() == PaymentState::Done {
            wait_for_redirect(ctx, location).await
        } else {
            match view.screen() {
                Screen::Login => login_menu(ctx).await?,
                Screen::Dashboard => dashboard_menu(ctx).await?,
                Screen::Pin => pin_prompt(ctx).await?,
                Screen::Amount => amount_prompt(ctx).await?,
                // An aborted payment leaves nothing on screen until the redirect
                Screen::Blank => wait_for_redirect(ctx, location).await,
            }
        };

        match step {
            Step::Stay => {}
            step => return Ok(step),
        }
    }
}

async fn wait_for_redirect(ctx: &WalletContext, location: &UrlLocation) -> Step {
    let deadline = tokio::time::Instant::now() + ctx.config.redirect_delay + REDIRECT_GRACE;
    while tokio::time::Instant::now() < deadline {
        if location.take_navigation() {
            return Step::Reload;
        }
        tokio::time::sleep(REDIRECT_POLL).await;
    }
    location.navigate_to_base();
    location.take_navigation();
    Step::Reload
}

/// Run a blocking dialoguer prompt off the async workers
async fn prompt<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    let value = tokio::task::spawn_blocking(f)
        .await
        .context("Prompt was interrupted")??;
    Ok(value)
}

// Flow failures are already shown through the view, so their results are
// dropped below.

async fn login_menu(ctx: &WalletContext) -> Result<Step> {
    let choice = prompt(|| {
        Select::new()
            .with_prompt("W-Wallet")
            .items(&LOGIN_MENU[..])
            .default(0)
            .interact()
    })
    .await?;

    match choice {
        0 => {
            let (username, password) = prompt(|| {
                let username: String = Input::new().with_prompt("Username").interact_text()?;
                let password = Password::new().with_prompt("Password").interact()?;
                Ok((username, password))
            })
            .await?;
            let _ = ctx.login(&username, &password).await;
            Ok(Step::Stay)
        }
        1 => {
            let form = prompt(|| {
                let username: String = Input::new().with_prompt("Username").interact_text()?;
                let password = Password::new().with_prompt("Password").interact()?;
                let confirm_password = Password::new().with_prompt("Confirm password").interact()?;
                let pin = Password::new().with_prompt("PIN (4 digits)").interact()?;
                let confirm_pin = Password::new().with_prompt("Confirm PIN").interact()?;
                Ok(RegistrationForm {
                    username,
                    password,
                    confirm_password,
                    pin,
                    confirm_pin,
                })
            })
            .await?;
            if let Ok(account_id) = ctx.register(&form).await {
                output::info(&format!("Your account id is {}", account_id));
            }
            Ok(Step::Stay)
        }
        _ => Ok(Step::Quit),
    }
}

async fn dashboard_menu(ctx: &WalletContext) -> Result<Step> {
    let choice = prompt(|| {
        Select::new()
            .items(&DASHBOARD_MENU[..])
            .default(0)
            .interact()
    })
    .await?;

    match choice {
        0 => {
            let (to, amount) = prompt(|| {
                let to: String = Input::new().with_prompt("Recipient account").interact_text()?;
                let amount: String = Input::new().with_prompt("Amount (W)").interact_text()?;
                Ok((to, amount))
            })
            .await?;
            match parse_amount(&amount) {
                Ok(amount) => {
                    let _ = ctx.transfer(&to, amount).await;
                }
                Err(e) => output::error(&e.to_string()),
            }
            Ok(Step::Stay)
        }
        1 => {
            if let Some(session) = ctx.session() {
                output::print_dashboard(&session, &ctx.transactions());
            }
            Ok(Step::Stay)
        }
        2 => {
            ctx.logout();
            Ok(Step::Stay)
        }
        _ => Ok(Step::Quit),
    }
}

async fn pin_prompt(ctx: &WalletContext) -> Result<Step> {
    let pin = prompt(|| {
        Password::new()
            .with_prompt("PIN (empty to cancel)")
            .allow_empty_password(true)
            .interact()
    })
    .await?;

    if pin.is_empty() {
        ctx.cancel_payment();
    } else {
        let _ = ctx.submit_pin(&pin).await;
    }
    Ok(Step::Stay)
}

async fn amount_prompt(ctx: &WalletContext) -> Result<Step> {
    let input: String = prompt(|| {
        Input::new()
            .with_prompt("Amount in W (empty to cancel)")
            .allow_empty(true)
            .interact_text()
    })
    .await?;

    if input.trim().is_empty() {
        ctx.cancel_payment();
        return Ok(Step::Stay);
    }
    match parse_amount(&input) {
        Ok(amount) => {
            let _ = ctx.submit_amount(amount).await;
        }
        Err(e) => output::error(&e.to_string()),
    }
    Ok(Step::Stay)
}
