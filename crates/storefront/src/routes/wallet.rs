//! Wallet connect/disconnect handlers.
//!
//! Each session owns its wallet record; these handlers only ever touch the
//! caller's.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{AppendHeaders, IntoResponse},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb, clear_sentry_wallet, set_sentry_wallet};
use crate::models::{WalletSession, keys};
use crate::solana::{KeypairWallet, Wallet};
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// This session's wallet together with the record it was opened from.
pub struct SessionWallet {
    pub wallet: KeypairWallet,
    record: WalletSession,
}

/// Open the session's wallet, creating its record on first use.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn load_wallet(state: &AppState, session: &Session) -> Result<SessionWallet> {
    let stored = session.get::<WalletSession>(keys::WALLET).await?;
    let mut record = stored
        .clone()
        .unwrap_or_else(|| state.wallets().new_session());
    let wallet = state.wallets().open(&mut record);

    if stored.as_ref() != Some(&record) {
        session.insert(keys::WALLET, &record).await?;
    }
    Ok(SessionWallet { wallet, record })
}

/// Store the wallet's current connection state in the session.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn save_wallet(session: &Session, mut current: SessionWallet) -> Result<()> {
    current.record.connected = current.wallet.is_connected();
    session.insert(keys::WALLET, &current.record).await?;
    Ok(())
}

/// Wallet status display data for templates.
#[derive(Clone)]
pub struct WalletView {
    pub connected: bool,
    pub address: String,
    pub short_address: String,
}

impl WalletView {
    #[must_use]
    pub fn new(wallet: &dyn Wallet) -> Self {
        match wallet.public_key().filter(|_| wallet.is_connected()) {
            Some(pubkey) => {
                let address = pubkey.to_string();
                Self {
                    connected: true,
                    short_address: shorten(&address),
                    address,
                }
            }
            None => Self {
                connected: false,
                address: String::new(),
                short_address: String::new(),
            },
        }
    }
}

/// `63Xc…HLc3` style abbreviation of a base58 address.
fn shorten(address: &str) -> String {
    match (address.get(..4), address.get(address.len().saturating_sub(4)..)) {
        (Some(head), Some(tail)) if address.len() > 8 => format!("{head}…{tail}"),
        _ => address.to_string(),
    }
}

/// Wallet status fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/wallet.html")]
pub struct WalletTemplate {
    pub wallet: WalletView,
}

/// Connect this session's wallet (HTMX).
#[instrument(skip(state, session))]
pub async fn connect(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let current = load_wallet(&state, &session).await?;
    let pubkey = current.wallet.connect()?;
    set_sentry_wallet(&pubkey);
    add_breadcrumb("wallet", "Connected wallet", None);

    let view = WalletView::new(&current.wallet);
    save_wallet(&session, current).await?;

    Ok((
        AppendHeaders([("HX-Trigger", "wallet-changed")]),
        WalletTemplate { wallet: view },
    ))
}

/// Disconnect this session's wallet (HTMX).
#[instrument(skip(state, session))]
pub async fn disconnect(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse> {
    let current = load_wallet(&state, &session).await?;
    current.wallet.disconnect();
    clear_sentry_wallet();
    add_breadcrumb("wallet", "Disconnected wallet", None);

    let view = WalletView::new(&current.wallet);
    save_wallet(&session, current).await?;

    Ok((
        AppendHeaders([("HX-Trigger", "wallet-changed")]),
        WalletTemplate { wallet: view },
    ))
}
