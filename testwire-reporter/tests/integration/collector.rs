// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-process collector that speaks the framed protocol.

use color_eyre::eyre::{Result, WrapErr};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use testwire_metadata::{CollectorMethod, CollectorRequest};
use testwire_reporter::transport::frame;
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// How the collector answers requests.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reply {
    Ok,
    /// Reply ok after holding each call for the given time.
    Delayed(Duration),
    Error,
}

#[derive(Debug)]
pub struct Collector {
    address: String,
    received: Arc<Mutex<Vec<CollectorRequest>>>,
    task: JoinHandle<()>,
}

impl Collector {
    pub async fn start(reply: Reply) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .wrap_err("failed to bind collector")?;
        let address = listener.local_addr()?.to_string();
        let received = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let received = received.clone();
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let received = received.clone();
                    tokio::spawn(async move {
                        if let Err(error) = serve(socket, reply, &received).await {
                            eprintln!("collector connection failed: {error:?}");
                        }
                    });
                }
            }
        });

        Ok(Self {
            address,
            received,
            task,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn received(&self) -> Vec<CollectorRequest> {
        self.received.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<CollectorMethod> {
        self.received()
            .iter()
            .map(CollectorRequest::method)
            .collect()
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut socket: TcpStream,
    reply: Reply,
    received: &Mutex<Vec<CollectorRequest>>,
) -> Result<()> {
    while let Some((path, payload)) = frame::read_request(&mut socket).await? {
        let method = CollectorMethod::from_path(&path)?;
        let request = CollectorRequest::decode(method, &payload)
            .wrap_err_with(|| format!("failed to decode {method} payload"))?;
        received.lock().unwrap().push(request);

        match reply {
            Reply::Ok => frame::write_response(&mut socket, frame::STATUS_OK, b"").await?,
            Reply::Delayed(delay) => {
                tokio::time::sleep(delay).await;
                frame::write_response(&mut socket, frame::STATUS_OK, b"").await?
            }
            Reply::Error => {
                frame::write_response(&mut socket, frame::STATUS_ERROR, b"collector unavailable")
                    .await?
            }
        }
    }
    Ok(())
}
