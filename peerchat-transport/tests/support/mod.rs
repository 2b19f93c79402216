/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! A minimal routing relay for exercising `WebSocketRelay` end to end.
//!
//! It accepts `?id=<identity>` registrations, answers `OPEN` (or `ID-TAKEN`),
//! stamps `src` on forwarded frames and answers `EXPIRE` for offers to unknown
//! peers. Every frame a client sends is kept in a log for inspection.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Peers = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Message>>>>;
type FrameLog = Arc<Mutex<Vec<Value>>>;

pub struct TestRelay {
    pub url: String,
    frames: FrameLog,
    connections: Arc<Mutex<Vec<AbortHandle>>>,
    handle: JoinHandle<()>,
}

impl TestRelay {
    /// Every frame received from clients so far, before `src` stamping.
    pub fn frames(&self) -> Vec<Value> {
        self.frames.lock().unwrap().clone()
    }

    pub fn frame_types(&self) -> Vec<String> {
        self.frames()
            .iter()
            .filter_map(|frame| frame["type"].as_str().map(str::to_string))
            .collect()
    }

    /// Stop accepting and drop every client connection.
    pub fn shutdown(&self) {
        self.handle.abort();
        for connection in self.connections.lock().unwrap().drain(..) {
            connection.abort();
        }
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub async fn spawn_relay() -> TestRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let peers: Peers = Arc::default();
    let frames: FrameLog = Arc::default();
    let connections: Arc<Mutex<Vec<AbortHandle>>> = Arc::default();

    let handle = {
        let frames = frames.clone();
        let connections = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let task = tokio::spawn(serve(stream, peers.clone(), frames.clone()));
                connections.lock().unwrap().push(task.abort_handle());
            }
        })
    };

    TestRelay {
        url: format!("ws://{addr}/peerchat"),
        frames,
        connections,
        handle,
    }
}

async fn serve(stream: TcpStream, peers: Peers, frames: FrameLog) {
    let requested = Arc::new(Mutex::new(None::<String>));
    let slot = requested.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let id = req.uri().query().and_then(|q| {
            q.split('&')
                .find_map(|pair| pair.strip_prefix("id=").map(str::to_string))
        });
        *slot.lock().unwrap() = id;
        Ok(resp)
    };
    let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
        return;
    };
    let (mut writer, mut reader) = ws.split();

    let Some(id) = requested.lock().unwrap().clone() else {
        return;
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let taken = {
        let mut peers = peers.lock().unwrap();
        if peers.contains_key(&id) {
            true
        } else {
            peers.insert(id.clone(), tx);
            false
        }
    };
    if taken {
        let _ = writer
            .send(Message::Text(json!({"type": "ID-TAKEN"}).to_string()))
            .await;
        return;
    }
    let _ = writer
        .send(Message::Text(json!({"type": "OPEN"}).to_string()))
        .await;

    // Deregisters even when the task is aborted.
    let _registration = Deregister {
        peers: peers.clone(),
        id: id.clone(),
    };
    loop {
        tokio::select! {
            outgoing = rx.recv() => match outgoing {
                Some(msg) => {
                    if writer.send(msg).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = reader.next() => match incoming {
                Some(Ok(Message::Text(text))) => route(&id, &text, &peers, &frames),
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

struct Deregister {
    peers: Peers,
    id: String,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        if let Ok(mut peers) = self.peers.lock() {
            peers.remove(&self.id);
        }
    }
}

fn route(src: &str, text: &str, peers: &Peers, frames: &FrameLog) {
    let Ok(mut frame) = serde_json::from_str::<Value>(text) else {
        return;
    };
    frames.lock().unwrap().push(frame.clone());
    let Some(dst) = frame["dst"].as_str().map(str::to_string) else {
        return;
    };
    frame["src"] = Value::String(src.to_string());

    let peers = peers.lock().unwrap();
    match peers.get(&dst) {
        Some(tx) => {
            let _ = tx.send(Message::Text(frame.to_string()));
        }
        None if frame["type"] == "OFFER" => {
            if let Some(tx) = peers.get(src) {
                let expire = json!({
                    "type": "EXPIRE",
                    "src": dst,
                    "payload": frame["payload"].clone(),
                });
                let _ = tx.send(Message::Text(expire.to_string()));
            }
        }
        None => {}
    }
}

/// A registered endpoint that reads frames but never answers them.
pub struct SilentPeer {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SilentPeer {
    pub async fn join(url: &str, id: &str) -> Self {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("{url}?id={id}"))
            .await
            .unwrap();
        let open = Self::read(&mut ws).await;
        assert_eq!(open["type"], "OPEN");
        Self { ws }
    }

    /// The next frame of `kind`, skipping any others.
    pub async fn expect(&mut self, kind: &str) -> Value {
        loop {
            let frame = Self::read(&mut self.ws).await;
            if frame["type"] == kind {
                return frame;
            }
        }
    }

    async fn read(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>) -> Value {
        loop {
            let next = timeout(Duration::from_secs(10), ws.next())
                .await
                .expect("timed out waiting for a relay frame");
            match next {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("relay connection ended: {other:?}"),
            }
        }
    }
}
