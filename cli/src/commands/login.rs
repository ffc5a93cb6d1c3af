//! `dock login`
//!
//! Browser-based login: a short-lived local HTTP server waits for the web
//! dashboard to redirect back with the token.

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use colored::Colorize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::CliError;
use crate::storage::credentials::{save_credentials, Credentials, User};
use crate::storage::settings::ApiSettings;

const CALLBACK_PORT: u16 = 4242;

const SUCCESS_PAGE: &str = r#"<html>
  <body style="background:#111; color:#fff; font-family:sans-serif; display:flex; align-items:center; justify-content:center; height:100vh;">
    <div style="text-align:center;">
      <h1 style="color:#4ade80;">Login Successful</h1>
      <p>You can close this window and return to the terminal.</p>
    </div>
    <script>setTimeout(() => window.close(), 2000);</script>
  </body>
</html>"#;

/// What the callback handed us.
struct CallbackResult {
    token: Option<String>,
    user: Option<User>,
}

type ResultSender = Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>;

pub async fn run(settings: &ApiSettings) -> Result<ExitCode, CliError> {
    println!("{}", "Initiating login...".blue());

    let (result_tx, result_rx) = oneshot::channel();
    let sender: ResultSender = Arc::new(Mutex::new(Some(result_tx)));

    let app = Router::new()
        .route("/callback", get(callback_handler))
        .with_state(sender)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", CALLBACK_PORT);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| CliError::AuthError(format!("Could not bind {}: {}", addr, e)))?;
    info!("Login callback server listening on {}", addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    let login_url = format!(
        "{}/cli-login?callback=http://localhost:{}/callback",
        settings.web_url.trim_end_matches('/'),
        CALLBACK_PORT
    );
    println!("{}", format!("Open this URL in your browser: {}", login_url).yellow());
    println!("{}", "Waiting for authentication...".dimmed());

    let result = tokio::select! {
        result = result_rx => result.map_err(|_| CliError::AuthError("Login server closed unexpectedly".to_string()))?,
        _ = tokio::signal::ctrl_c() => {
            let _ = shutdown_tx.send(());
            let _ = server.await;
            println!();
            println!("{}", "Login cancelled.".yellow());
            return Ok(ExitCode::from(130));
        }
    };

    let _ = shutdown_tx.send(());
    let _ = server.await;

    match result.token {
        Some(token) => {
            let username = result.user.as_ref().and_then(|u| u.username.clone());
            save_credentials(&Credentials {
                token,
                user: result.user,
            })
            .await?;

            println!();
            match username {
                Some(name) => println!(
                    "{}",
                    format!("Successfully logged in as {}!", name).green()
                ),
                None => println!("{}", "Successfully logged in!".green()),
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!();
            println!("{}", "Login failed: No token received".red());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn callback_handler(
    State(sender): State<ResultSender>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    let token = params.get("token").cloned().filter(|t| !t.is_empty());
    let user = params
        .get("user")
        .and_then(|raw| serde_json::from_str::<User>(raw).ok());

    let failed = token.is_none();
    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(CallbackResult { token, user });
    }

    if failed {
        Html("Login failed: No token received")
    } else {
        Html(SUCCESS_PAGE)
    }
}
