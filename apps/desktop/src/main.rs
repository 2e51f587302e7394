mod command;
mod config;
mod terminal;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use client_core::{
    HttpChatBackend, OverlayClick, SessionController, SubmitOutcome, UploadFile, Views,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    command::{Command, HELP},
    config::{load_settings, normalize_server_url, CONFIG_FILE},
    terminal::TerminalView,
};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: Option<String>,
    /// Log in right away with this name.
    #[arg(long)]
    username: Option<String>,
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    let server_url = normalize_server_url(&settings.server_url)?;
    info!(server_url = %server_url, "starting chat client");

    let backend = Arc::new(HttpChatBackend::new(server_url)?);
    let view = TerminalView::new(Arc::clone(&backend));
    let controller = SessionController::new(
        backend,
        Views::shared(Arc::clone(&view)),
        settings.to_timings(),
    );
    controller.start().await;

    if let Some(username) = args.username {
        if let Err(err) = controller.login(&username).await {
            debug!("initial login failed: {err}");
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            command => handle(&controller, &view, command).await,
        }
    }

    controller.shutdown().await;
    Ok(())
}

async fn handle(controller: &Arc<SessionController>, view: &TerminalView, command: Command) {
    let logged_in = controller.view_state().await.is_logged_in();
    match command {
        Command::Login(username) => {
            if let Err(err) = controller.login(&username).await {
                debug!("login failed: {err}");
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Invalid(usage) => eprintln!("{usage}"),
        Command::Close => {
            controller.overlay_clicked(OverlayClick::Background).await;
        }
        Command::Open(number) => match view.media(number) {
            Some(media) => {
                if !controller.open_media(&media.url, media.kind).await {
                    println!("Download: {}", view.resolve(&media.url));
                }
            }
            None => eprintln!("no attachment #{number} in the transcript"),
        },
        _ if !logged_in => eprintln!("Log in first with /login <name>"),
        Command::Logout => {
            if let Err(err) = controller.logout().await {
                debug!("logout failed: {err}");
            }
        }
        Command::Upload(path) => match UploadFile::from_path(&path).await {
            Ok(file) => {
                if let Err(err) = controller.select_file(file).await {
                    eprintln!("! {err}");
                }
            }
            Err(err) => eprintln!("! could not read {path}: {err}"),
        },
        Command::Send(text) => match controller.submit_message(&text).await {
            Ok(SubmitOutcome::AwaitingUpload) => {
                eprintln!("Wait for the upload to finish before sending")
            }
            Ok(SubmitOutcome::Empty | SubmitOutcome::Sent) => {}
            Err(err) => debug!("send failed: {err}"),
        },
        Command::Quit => {}
    }
}
