use std::future::Future;
use std::time::Instant;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::commands::{Command, Response};
use crate::db::Store;
use crate::parser::{ParserError, Request};

async fn handle_connection(mut socket: TcpStream, store: Store) {
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        loop {
            let (response, keep_alive) = match Request::parse(&buffer) {
                Ok((request, consumed)) => {
                    buffer.advance(consumed);
                    let started = Instant::now();
                    let response = match Command::from_request(&request) {
                        Ok(command) => command.execute(&store),
                        Err(e) => e.into(),
                    };
                    tracing::info!(
                        method = ?request.method,
                        path = %request.path,
                        status = response.status,
                        elapsed_us = started.elapsed().as_micros() as u64,
                        "request"
                    );
                    (response, request.keep_alive)
                }
                Err(ParserError::Incomplete) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "rejecting request");
                    let status = match e {
                        ParserError::TooLarge => 413,
                        ParserError::Unsupported(_) => 501,
                        _ => 400,
                    };
                    (Response::error(status, e.to_string()), false)
                }
            };

            if let Err(e) = socket.write_all(&response.to_bytes(keep_alive)).await {
                tracing::error!(error = ?e, "failed to write response");
                return;
            }
            if !keep_alive {
                return;
            }
        }

        match socket.read_buf(&mut buffer).await {
            Ok(0) => {
                tracing::debug!("client closed connection");
                return;
            }
            Ok(n) => {
                tracing::trace!(bytes = n, "read from socket");
            }
            Err(e) => {
                tracing::error!(error = ?e, "failed to read from socket");
                return;
            }
        }
    }
}

/// Accepts connections on `listener` until `shutdown` resolves, serving each
/// one on its own task against the shared `store`.
pub async fn serve(listener: TcpListener, store: Store, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    tracing::debug!(%peer, "accepted connection");
                    let store = store.clone();
                    tokio::spawn(async move {
                        handle_connection(socket, store).await;
                    });
                }
                Err(e) => tracing::error!(error = ?e, "failed to establish connection"),
            },
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                return;
            }
        }
    }
}
