// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A collector for debugging, which prints every call it receives.

use crate::errors::{ExpectedError, Result};
use clap::Args;
use serde_json::json;
use std::{future::Future, io};
use testwire_metadata::{CollectorMethod, CollectorRequest};
use testwire_reporter::{errors::DisplayErrorChain, transport::frame};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tracing::{debug, info, warn};

#[derive(Debug, Args)]
pub(crate) struct ListenOpts {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:50051")]
    bind: String,
}

impl ListenOpts {
    pub(crate) async fn exec(self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind)
            .await
            .map_err(|err| ExpectedError::BindError {
                address: self.bind.clone(),
                err,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| ExpectedError::BindError {
                address: self.bind.clone(),
                err,
            })?;
        info!("listening on {local_addr}");

        let shutdown = async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C: {error}");
                std::future::pending::<()>().await;
            }
        };
        serve(listener, tokio::io::stdout(), shutdown).await
    }
}

/// Accepts connections until `shutdown` completes, writing one line per call to `output`.
pub(crate) async fn serve<W>(
    listener: TcpListener,
    mut output: W,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                debug!("shutting down collector");
                break;
            }
            accepted = listener.accept() => {
                let (socket, peer) = accepted.map_err(|err| ExpectedError::AcceptError { err })?;
                debug!("accepted connection from {peer}");
                let sender = sender.clone();
                tokio::spawn(async move {
                    if let Err(error) = handle_connection(socket, sender).await {
                        warn!("connection from {peer} failed: {error}");
                    }
                });
            }
            Some(line) = receiver.recv() => {
                write_line(&mut output, &line).await?;
            }
        }
    }

    // Print whatever has already been received.
    while let Ok(line) = receiver.try_recv() {
        write_line(&mut output, &line).await?;
    }
    Ok(())
}

async fn write_line<W>(output: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    async {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await
    }
    .await
    .map_err(|err| ExpectedError::WriteOutputError { err })
}

/// Serves calls on one connection until the peer disconnects.
///
/// Every call gets an empty ok response, unless its path or payload can't be decoded.
async fn handle_connection(
    mut socket: TcpStream,
    lines: mpsc::UnboundedSender<String>,
) -> io::Result<()> {
    while let Some((path, payload)) = frame::read_request(&mut socket).await? {
        match format_call(&path, &payload) {
            Ok(line) => {
                // The receiver only goes away on shutdown.
                let _ = lines.send(line);
                frame::write_response(&mut socket, frame::STATUS_OK, b"").await?;
            }
            Err(message) => {
                warn!("rejecting call: {message}");
                frame::write_response(&mut socket, frame::STATUS_ERROR, message.as_bytes())
                    .await?;
            }
        }
    }
    Ok(())
}

/// Decodes a call and renders it as a single JSON line.
fn format_call(path: &str, payload: &[u8]) -> Result<String, String> {
    let method = CollectorMethod::from_path(path).map_err(|error| error.to_string())?;
    let request = CollectorRequest::decode(method, payload)
        .map_err(|error| DisplayErrorChain::new(&error).to_string())?;
    let line = json!({
        "method": method.name(),
        "message": request,
    });
    Ok(line.to_string())
}
