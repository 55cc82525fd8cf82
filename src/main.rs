/*!
 * snip — desktop front end for the snipping tool.
 *
 * Drives the same host/agent/popup components the extension uses, with
 * the primary display standing in for the page.
 *
 * Usage:
 *   snip capture --from 100,100 --to 300,200
 *   snip capture --from 100,100 --to 300,200 --download
 *   snip settings --set format=jpeg --set soundEnabled=false
 *   snip toggle
 */

use clap::{Parser, Subcommand};
use std::time::Duration;

use snipping_tool_lib::agent::{Key, PageEvent};
use snipping_tool_lib::config::SnipConfig;
use snipping_tool_lib::desktop::page::PageNotice;
use snipping_tool_lib::desktop::{self, Desktop, PRIMARY_TAB};
use snipping_tool_lib::geometry::{Point, Selection};
use snipping_tool_lib::protocol::Response;

/// How long to wait for the page to report an outcome.
const NOTICE_TIMEOUT: Duration = Duration::from_secs(15);

/// How long to keep serving a copied image after the command finishes.
const CLIPBOARD_HOLD: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "snip")]
#[command(about = "Snip a region of the screen to the clipboard or a file")]
#[command(version)]
struct Cli {
    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select a region and copy it to the clipboard
    Capture {
        /// Drag start as X,Y in logical pixels
        #[arg(long, value_parser = parse_point)]
        from: Point,

        /// Drag end as X,Y in logical pixels
        #[arg(long, value_parser = parse_point)]
        to: Point,

        /// Also save the capture to the download folder
        #[arg(short, long)]
        download: bool,
    },

    /// Enable or disable snipping
    Toggle,

    /// Show settings, optionally updating fields first
    Settings {
        /// Field update as key=value (value parsed as JSON, else string)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Show recent capture history
    History,

    /// Show usage counters
    Stats,
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {:?}", raw))?;
    let x = x.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok(Point::new(x, y))
}

fn parse_assignment(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.trim().to_string(), value))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    let code = local.block_on(&runtime, async move {
        match run(cli).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        }
    });
    desktop::hand_off_clipboard(CLIPBOARD_HOLD);
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), String> {
    let mut desktop = Desktop::boot(SnipConfig::from_env()).map_err(|e| e.to_string())?;
    let json = cli.json;

    match cli.command {
        Commands::Capture { from, to, download } => {
            cmd_capture(&mut desktop, from, to, download).await
        }
        Commands::Toggle => {
            let response = desktop.popup.toggle().await;
            print_response(&response, json, || desktop.popup.view().status.clone())
        }
        Commands::Settings { set } => {
            for assignment in &set {
                let (key, value) = parse_assignment(assignment)?;
                let response = desktop.popup.update_setting(&key, value).await;
                if !response.success {
                    return Err(response.error_message());
                }
            }
            desktop.popup.load().await;
            let view = desktop.popup.view();
            let body = serde_json::to_string_pretty(&view.settings).map_err(|e| e.to_string())?;
            if !json {
                println!("Snipping {}", if view.enabled { "enabled" } else { "disabled" });
            }
            println!("{}", body);
            Ok(())
        }
        Commands::History => {
            let history = desktop.popup.history().await;
            if json {
                let body = serde_json::to_string_pretty(&history).map_err(|e| e.to_string())?;
                println!("{}", body);
                return Ok(());
            }
            println!("{} recent captures\n", history.len());
            for item in history {
                println!(
                    "  {}  {}x{}  {:?}  {}",
                    item.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    item.width,
                    item.height,
                    item.format,
                    &item.digest[..12.min(item.digest.len())]
                );
            }
            Ok(())
        }
        Commands::Stats => {
            let stats = desktop.popup.stats().await.ok_or("Usage stats unavailable")?;
            let body = serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())?;
            println!("{}", body);
            Ok(())
        }
    }
}

/// Whether a drag from `from` to `to` is large enough to be captured.
fn is_capturable(from: Point, to: Point) -> bool {
    let mut selection = Selection::anchored(from);
    selection.drag_to(to);
    selection.has_selection()
}

async fn cmd_capture(desktop: &mut Desktop, from: Point, to: Point, download: bool) -> Result<(), String> {
    if !is_capturable(from, to) {
        return Err("Select a larger area first".to_string());
    }

    let response = desktop.popup.start_snipping().await;
    if !response.success {
        return Err(response.error_message());
    }
    if response.is_enabled == Some(false) {
        return Err("Snipping is disabled (run `snip toggle`)".to_string());
    }

    let input = desktop
        .browser
        .page_input(PRIMARY_TAB)
        .ok_or("Capture agent is not running")?;

    for event in [
        PageEvent::PointerDown(from),
        PageEvent::PointerMove(to),
        PageEvent::PointerUp(to),
    ] {
        input.send(event).await.map_err(|_| "Capture agent stopped")?;
    }
    let copied = next_notice(desktop).await?;
    println!("{}", copied);

    if download {
        input
            .send(PageEvent::Key(Key::Enter))
            .await
            .map_err(|_| "Capture agent stopped")?;
        println!("{}", next_notice(desktop).await?);
    } else {
        input
            .send(PageEvent::Key(Key::Escape))
            .await
            .map_err(|_| "Capture agent stopped")?;
    }
    Ok(())
}

async fn next_notice(desktop: &mut Desktop) -> Result<String, String> {
    match tokio::time::timeout(NOTICE_TIMEOUT, desktop.notices.recv()).await {
        Ok(Some(PageNotice::Toast(toast))) => Ok(toast.message),
        Ok(Some(PageNotice::Banner(message))) => Err(message),
        Ok(None) => Err("Page closed".to_string()),
        Err(_) => Err("Timed out waiting for the capture".to_string()),
    }
}

fn print_response(response: &Response, json: bool, summary: impl FnOnce() -> String) -> Result<(), String> {
    if json {
        let body = serde_json::to_string_pretty(response).map_err(|e| e.to_string())?;
        println!("{}", body);
    } else {
        println!("{}", summary());
    }
    if response.success {
        Ok(())
    } else {
        Err(response.error_message())
    }
}
