//! Command-line client for the FluxoÁgil queue service.
//!
//! Stands in for the browser screens at the REST boundary. Session-scoped
//! state the browser kept in `sessionStorage` lives in dotfiles instead:
//! `.fluxo_company` (selected company), `.fluxo_ticket` (held ticket) and
//! `.fluxo_token` (admin session).

use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::fs;

const COMPANY_FILE: &str = ".fluxo_company";
const TICKET_FILE: &str = ".fluxo_ticket";
const TOKEN_FILE: &str = ".fluxo_token";

#[derive(Parser)]
#[command(name = "fluxo-cli")]
#[command(about = "CLI for the FluxoÁgil queue service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Select a company queue (like following a join link); drops any held ticket
    Join {
        company_id: String,
    },
    /// Take the next ticket in the selected company's queue
    Ticket {
        #[arg(short, long)]
        company: Option<String>,
    },
    /// Show the queue from the holder's point of view
    Status {
        #[arg(short, long)]
        company: Option<String>,
    },
    /// Drop the held ticket (it stays in the queue until called)
    Forget,
    /// Show only the ticket being served, like the TV screen
    Tv {
        #[arg(short, long)]
        company: Option<String>,
    },
    /// Print the join link and QR image URL for a company
    Link {
        #[arg(short, long)]
        company: Option<String>,
    },
    /// Admin login; saves a session token
    Login {
        #[arg(short, long)]
        company: String,
        #[arg(short, long)]
        password: String,
    },
    /// Call the next waiting ticket (admin)
    CallNext,
    /// Finish the ticket being served (admin)
    Finish,
    /// Reset the whole queue, history and counter included (admin)
    Reset,
    /// Show the company profile
    Profile {
        #[arg(short, long)]
        company: Option<String>,
    },
    /// Change the admin password (admin)
    SetPassword {
        #[arg(short, long)]
        password: String,
    },
    /// Rename the company id, migrating queue, profile and credential (admin)
    Rename {
        new_id: String,
    },
    Logout,
}

#[derive(Deserialize)]
struct LoginResponse {
    company_id: String,
    token: String,
}

#[derive(Deserialize)]
struct TicketResponse {
    ticket: String,
}

#[derive(Deserialize)]
struct QueueStateResponse {
    current_ticket: Option<String>,
    queue: Vec<String>,
    history: Vec<String>,
}

/// Selected company: explicit flag wins, then the join-file, like the
/// browser app resolving URL parameter before stored selection.
fn resolve_company(flag: Option<String>) -> Option<String> {
    flag.or_else(|| {
        fs::read_to_string(COMPANY_FILE)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Company an admin session was opened for.
fn session_company() -> Option<String> {
    fs::read_to_string(COMPANY_FILE)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Join { company_id } => {
            fs::write(COMPANY_FILE, &company_id)?;
            let _ = fs::remove_file(TICKET_FILE);
            println!("Joined queue of \"{}\". Any held ticket was dropped.", company_id);
        }
        Commands::Ticket { company } => {
            let Some(company) = resolve_company(company) else {
                println!("No company selected. Run `fluxo-cli join <company-id>` first.");
                return Ok(());
            };
            let res = client
                .post(format!("{}/companies/{}/tickets", cli.url, company))
                .send()
                .await?;
            if res.status().is_success() {
                let body: TicketResponse = res.json().await?;
                fs::write(TICKET_FILE, &body.ticket)?;
                println!("Your ticket: {}", body.ticket);
            } else {
                println!("Could not take a ticket: {}", res.text().await?);
            }
        }
        Commands::Status { company } => {
            let Some(company) = resolve_company(company) else {
                println!("No company selected. Run `fluxo-cli join <company-id>` first.");
                return Ok(());
            };
            let state: QueueStateResponse = client
                .get(format!("{}/companies/{}/queue", cli.url, company))
                .send()
                .await?
                .json()
                .await?;
            println!(
                "Now serving: {}",
                state.current_ticket.as_deref().unwrap_or("---")
            );
            println!("Waiting: {}", state.queue.len());

            let mine = fs::read_to_string(TICKET_FILE).unwrap_or_default();
            let mine = mine.trim();
            if mine.is_empty() {
                return Ok(());
            }
            if state.current_ticket.as_deref() == Some(mine) {
                println!("Your ticket {} is being called - it's your turn!", mine);
            } else if let Some(ahead) = state.queue.iter().position(|t| t == mine) {
                println!("Your ticket: {} ({} ahead of you)", mine, ahead);
            } else if state.history.iter().any(|t| t == mine) {
                println!("Your ticket {} was already served.", mine);
            } else {
                println!("Your ticket {} is no longer in this queue.", mine);
            }
        }
        Commands::Forget => {
            let _ = fs::remove_file(TICKET_FILE);
            println!("Ticket forgotten. Take a new one with `fluxo-cli ticket`.");
        }
        Commands::Tv { company } => {
            let Some(company) = resolve_company(company) else {
                println!("No company selected.");
                return Ok(());
            };
            #[derive(Deserialize)]
            struct Display {
                current_ticket: Option<String>,
            }
            let display: Display = client
                .get(format!("{}/companies/{}/display", cli.url, company))
                .send()
                .await?
                .json()
                .await?;
            println!("{}", display.current_ticket.as_deref().unwrap_or("----"));
        }
        Commands::Link { company } => {
            let Some(company) = resolve_company(company) else {
                println!("No company selected.");
                return Ok(());
            };
            let res = client
                .get(format!("{}/companies/{}/join", cli.url, company))
                .send()
                .await?;
            println!("{}", res.text().await?);
        }
        Commands::Login { company, password } => {
            let res = client
                .post(format!("{}/login", cli.url))
                .json(&json!({ "company_id": company, "password": password }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, &body.token)?;
                fs::write(COMPANY_FILE, &body.company_id)?;
                println!("Logged in as \"{}\". Token saved to {}", body.company_id, TOKEN_FILE);
            } else {
                println!("Login failed: {}", res.text().await?);
            }
        }
        Commands::CallNext => {
            let Some(company) = session_company() else {
                println!("Not logged in.");
                return Ok(());
            };
            let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
            let res = client
                .post(format!("{}/companies/{}/call-next", cli.url, company))
                .header("Authorization", format!("Bearer {}", token.trim()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Finish => {
            let Some(company) = session_company() else {
                println!("Not logged in.");
                return Ok(());
            };
            let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
            let res = client
                .post(format!("{}/companies/{}/finish", cli.url, company))
                .header("Authorization", format!("Bearer {}", token.trim()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Reset => {
            let Some(company) = session_company() else {
                println!("Not logged in.");
                return Ok(());
            };
            let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
            let res = client
                .post(format!("{}/companies/{}/reset", cli.url, company))
                .header("Authorization", format!("Bearer {}", token.trim()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Profile { company } => {
            let Some(company) = resolve_company(company) else {
                println!("No company selected.");
                return Ok(());
            };
            let res = client
                .get(format!("{}/companies/{}/profile", cli.url, company))
                .send()
                .await?;
            println!("{}", res.text().await?);
        }
        Commands::SetPassword { password } => {
            let Some(company) = session_company() else {
                println!("Not logged in.");
                return Ok(());
            };
            let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
            let res = client
                .post(format!("{}/companies/{}/password", cli.url, company))
                .header("Authorization", format!("Bearer {}", token.trim()))
                .json(&json!({ "password": password }))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Rename { new_id } => {
            let Some(company) = session_company() else {
                println!("Not logged in.");
                return Ok(());
            };
            let token = fs::read_to_string(TOKEN_FILE).unwrap_or_default();
            let res = client
                .post(format!("{}/companies/{}/rename", cli.url, company))
                .header("Authorization", format!("Bearer {}", token.trim()))
                .json(&json!({ "new_id": new_id }))
                .send()
                .await?;
            if res.status().is_success() {
                let body: LoginResponse = res.json().await?;
                // The old session is for the old id; switch to the re-issued one.
                fs::write(TOKEN_FILE, &body.token)?;
                fs::write(COMPANY_FILE, &body.company_id)?;
                println!("Company renamed to \"{}\".", body.company_id);
            } else {
                println!("Rename failed: {}", res.text().await?);
            }
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
        }
    }

    Ok(())
}
