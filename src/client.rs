use anyhow::{Context, Result};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{tcp::OwnedWriteHalf, TcpStream},
    select,
};
use tracing::warn;

use crate::{
    config::ClientConfig,
    message::{read_envelope, write_envelope, Envelope, Kind},
};

/// Runs the console client until the user exits, stdin closes, or the
/// server goes away.
pub async fn run(config: ClientConfig) -> Result<()> {
    let stream = TcpStream::connect(&config.addr)
        .await
        .with_context(|| format!("failed to connect to server at {}", config.addr))?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut stdin = BufReader::new(io::stdin());
    let mut input = String::new();

    write_stdout(&format!("Connected to chat server at {}", config.addr)).await?;
    write_stdout("Type messages (type 'exit' to quit):").await?;
    show_prompt().await?;

    loop {
        input.clear();
        select! {
            server_envelope = read_envelope(&mut reader) => {
                if !handle_server_envelope(server_envelope).await? {
                    break;
                }
                show_prompt().await?;
            }
            bytes_read = stdin.read_line(&mut input) => {
                if !handle_input_line(bytes_read, &input, &mut writer).await? {
                    break;
                }
                show_prompt().await?;
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }

    shutdown_connection(&mut writer).await;
    Ok(())
}

/// Renders one received envelope. EOF and decode errors both mean the
/// server is gone: log it and stop without printing anything further.
async fn handle_server_envelope(envelope: io::Result<Option<Envelope>>) -> Result<bool> {
    match envelope {
        Ok(Some(envelope)) => {
            render_envelope(&envelope).await?;
            Ok(true)
        }
        Ok(None) => Ok(false),
        Err(error) => {
            warn!(?error, "lost connection to server");
            Ok(false)
        }
    }
}

async fn handle_input_line(
    bytes_read: io::Result<usize>,
    input: &str,
    writer: &mut OwnedWriteHalf,
) -> Result<bool> {
    if bytes_read? == 0 {
        return Ok(false);
    }

    let text = input.trim();
    if text.is_empty() {
        return Ok(true);
    }

    if text.eq_ignore_ascii_case("exit") {
        write_stdout("Bye!").await?;
        return Ok(false);
    }

    write_envelope(writer, &Envelope::message(text))
        .await
        .context("failed to send message")?;
    Ok(true)
}

async fn shutdown_connection(writer: &mut OwnedWriteHalf) {
    if let Err(error) = writer.shutdown().await {
        warn!(?error, "failed to shutdown client writer cleanly");
    }
}

async fn render_envelope(envelope: &Envelope) -> io::Result<()> {
    match envelope.kind {
        Kind::System => write_stdout(&format!("\n[system] {}", envelope.text)).await,
        Kind::Message => {
            write_stdout(&format!("\n[{}] {}", envelope.from, envelope.text)).await
        }
    }
}

async fn write_stdout(line: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

async fn show_prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await
}
