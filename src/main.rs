use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod dashboard;
mod export;
mod models;
mod projection;
mod report;
mod schema;
mod session;

use api::HttpErpClient;
use auth::{AuthState, LoginOutcome, Route};
use config::Config;
use dashboard::{DashboardEvent, DashboardView};
use models::Session;
use session::FileSessionStore;

#[derive(Parser)]
#[command(name = "attendance-dashboard")]
#[command(about = "Attendance statistics and projections from the EduMarshal ERP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session headers
    Login {
        #[arg(long)]
        username: String,
        /// Only needed when a sign-in actually happens
        #[arg(long, env = "ERP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Sign in again even when a session exists
        #[arg(long)]
        force: bool,
    },
    /// Clear the stored session
    Logout,
    /// Show overall attendance, projection and subject breakdown
    Dashboard,
    /// Show daily attendance for one subject
    Subject {
        name: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Page through the records with n/p, q to quit
        #[arg(long)]
        interactive: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "attendance-report.md")]
        out: PathBuf,
    },
    /// Export the subject breakdown as CSV
    Export {
        #[arg(long, default_value = "subjects.csv")]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = FileSessionStore::new(&config.session_path);
    let api = HttpErpClient::new(config.base_url.clone()).context("failed to build HTTP client")?;
    let state = AuthState::from_store(&store)?;

    match cli.command {
        None => match auth::resolve_route(Route::Root, &state) {
            Route::Dashboard => {
                let view = load_dashboard(&api, require_session(&state)?).await;
                print!("{}", report::render_dashboard(&view));
            }
            _ => println!("Not logged in. Run `attendance-dashboard login --username <USERNAME>`."),
        },
        Some(Commands::Login {
            username,
            password,
            force,
        }) => {
            let session = if !force && auth::resolve_route(Route::Login, &state) == Route::Dashboard {
                println!("Already logged in.");
                require_session(&state)?
            } else {
                let password = require_password(password)?;
                match auth::login(&api, &store, &username, &password, &config.context_id).await? {
                    LoginOutcome::LoggedIn(session) => {
                        println!("{}", auth::LOGIN_SUCCESS);
                        session
                    }
                    LoginOutcome::Failed(message) => anyhow::bail!(message),
                }
            };

            let view = load_dashboard(&api, session).await;
            print!("{}", report::render_dashboard(&view));
        }
        Some(Commands::Logout) => {
            auth::logout(&store)?;
            println!("Logged out. Cleared {}.", store.path().display());
        }
        Some(Commands::Dashboard) => {
            let view = load_dashboard(&api, require_session(&state)?).await;
            print!("{}", report::render_dashboard(&view));
        }
        Some(Commands::Subject {
            name,
            page,
            interactive,
        }) => {
            let mut view = load_dashboard(&api, require_session(&state)?).await;
            view.dispatch(&api, DashboardEvent::SelectSubject(name.clone()))
                .await;
            view.dispatch(&api, DashboardEvent::GoToPage(page)).await;

            let Some(pager) = &view.detail else {
                let message = view
                    .status_messages
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "Could not load daily attendance".to_string());
                anyhow::bail!(message);
            };
            print!("{}", report::render_detail(&name, pager));

            if interactive {
                page_interactively(&api, &mut view, &name).await?;
            }
        }
        Some(Commands::Report { out }) => {
            let view = load_dashboard(&api, require_session(&state)?).await;
            let report = report::build_report(&view, chrono::Local::now().date_naive());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Some(Commands::Export { csv }) => {
            let view = load_dashboard(&api, require_session(&state)?).await;
            let written = export::export_subjects_csv(&csv, view.subjects())
                .with_context(|| format!("failed to write {}", csv.display()))?;
            println!("Exported {written} subjects to {}.", csv.display());
        }
    }

    Ok(())
}

/// Dashboard entry without a session sends the user back to login.
fn require_session(state: &AuthState) -> anyhow::Result<Session> {
    match (auth::resolve_route(Route::Dashboard, state), state.session()) {
        (Route::Dashboard, Some(session)) => Ok(session.clone()),
        _ => anyhow::bail!(
            "No headers or user ID available. Run `attendance-dashboard login --username <USERNAME>`."
        ),
    }
}

fn require_password(password: Option<String>) -> anyhow::Result<String> {
    password.context("a password is required to sign in: pass --password or set ERP_PASSWORD")
}

async fn load_dashboard(api: &HttpErpClient, session: Session) -> DashboardView {
    let mut view = DashboardView::new(session);
    view.dispatch(api, DashboardEvent::Load).await;
    view
}

async fn page_interactively(
    api: &HttpErpClient,
    view: &mut DashboardView,
    subject_name: &str,
) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut line = String::new();

    while view.detail.is_some() {
        print!("[n]ext, [p]revious, [q]uit: ");
        std::io::Write::flush(&mut std::io::stdout())?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        let event = match line.trim() {
            "n" => DashboardEvent::NextPage,
            "p" => DashboardEvent::PreviousPage,
            "q" => DashboardEvent::CloseDetail,
            _ => continue,
        };
        view.dispatch(api, event).await;

        if let Some(pager) = &view.detail {
            print!("{}", report::render_detail(subject_name, pager));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_parses_without_a_password() {
        let cli = Cli::try_parse_from(["attendance-dashboard", "login", "--username", "u", "--password", "p"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Login { password: Some(ref password), .. }) if password == "p"
        ));

        let cli = Cli::try_parse_from(["attendance-dashboard", "login", "--username", "u"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Login { force: false, .. })));
    }

    #[test]
    fn sign_in_without_a_password_is_an_error() {
        let err = require_password(None).unwrap_err();
        assert!(err.to_string().contains("ERP_PASSWORD"));
        assert_eq!(require_password(Some("secret".to_string())).unwrap(), "secret");
    }
}
