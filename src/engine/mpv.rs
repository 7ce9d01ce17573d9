//! mpv-backed playback handle.
//!
//! mpv is started on the first command with `--input-ipc-server` and driven
//! over its JSON IPC socket. Property observations for `time-pos`,
//! `duration` and `eof-reached` are registered on connect, so mpv pushes
//! position and end-of-file changes without polling.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::{EngineEvent, PlaybackEngine, RequestId};
use crate::error::EngineError;

pub const OBS_TIME_POS: u64 = 1;
pub const OBS_DURATION: u64 = 2;
pub const OBS_EOF_REACHED: u64 = 3;

const CONNECT_ATTEMPTS: u32 = 60;
const CONNECT_RETRY: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, PartialEq)]
enum MpvCommand {
    Load(String),
    Play(RequestId),
    Pause,
    Seek(f64),
    Volume(f64),
}

impl MpvCommand {
    /// IPC messages for this command, in send order.
    fn to_ipc(&self) -> Vec<Value> {
        match self {
            // Paused before loading so the source only starts on an explicit play.
            Self::Load(url) => vec![
                json!({ "command": ["set_property", "pause", true] }),
                json!({ "command": ["loadfile", url, "replace"] }),
            ],
            Self::Play(request) => vec![json!({
                "command": ["set_property", "pause", false],
                "request_id": request,
            })],
            Self::Pause => vec![json!({ "command": ["set_property", "pause", true] })],
            Self::Seek(position) => vec![json!({ "command": ["seek", position, "absolute"] })],
            Self::Volume(level) => {
                vec![json!({ "command": ["set_property", "volume", mpv_volume(*level)] })]
            }
        }
    }
}

fn mpv_volume(level: f64) -> f64 {
    (level * 100.0).round()
}

fn observe_commands() -> Vec<Value> {
    vec![
        json!({ "command": ["observe_property", OBS_TIME_POS, "time-pos"] }),
        json!({ "command": ["observe_property", OBS_DURATION, "duration"] }),
        json!({ "command": ["observe_property", OBS_EOF_REACHED, "eof-reached"] }),
    ]
}

/// Translate one line read from the IPC socket.
pub fn parse_event(line: &str) -> Option<EngineEvent> {
    let v: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "unparseable mpv line");
            return None;
        }
    };

    if let Some(request) = v.get("request_id").and_then(Value::as_u64) {
        // request_id 0 marks commands nobody waits on.
        if request == 0 {
            return None;
        }
        let status = v.get("error").and_then(Value::as_str).unwrap_or("success");
        let result = if status == "success" {
            Ok(())
        } else {
            Err(EngineError::Rejected(status.to_string()))
        };
        return Some(EngineEvent::PlayResolved { request, result });
    }

    match v.get("event")?.as_str()? {
        "start-file" => Some(EngineEvent::LoadStarted),
        "end-file" => {
            let reason = v.get("reason").and_then(Value::as_str).unwrap_or("unknown");
            (reason == "error").then(|| EngineEvent::Failed {
                message: v
                    .get("file_error")
                    .and_then(Value::as_str)
                    .unwrap_or("error")
                    .to_string(),
            })
        }
        "property-change" => {
            let data = v.get("data")?;
            match v.get("id")?.as_u64()? {
                OBS_TIME_POS => data
                    .as_f64()
                    .map(|position| EngineEvent::TimeUpdate { position }),
                OBS_DURATION => data
                    .as_f64()
                    .map(|duration| EngineEvent::MetadataReady { duration }),
                OBS_EOF_REACHED => (data.as_bool() == Some(true)).then_some(EngineEvent::Ended),
                _ => None,
            }
        }
        _ => None,
    }
}

// ── Engine ─────────────────────────────────────────────────────────

pub struct MpvEngine {
    binary: PathBuf,
    events: UnboundedSender<EngineEvent>,
    commands: Option<UnboundedSender<MpvCommand>>,
    volume: f64,
}

impl MpvEngine {
    pub fn new(binary: impl Into<PathBuf>, events: UnboundedSender<EngineEvent>) -> Self {
        Self {
            binary: binary.into(),
            events,
            commands: None,
            volume: crate::player::DEFAULT_VOLUME,
        }
    }

    fn send(&mut self, command: MpvCommand) {
        if self.commands.is_none() {
            self.start();
        }
        if let Some(tx) = &self.commands {
            if tx.send(command.clone()).is_err() {
                warn!(?command, "mpv task is gone; dropping command");
                if let MpvCommand::Play(request) = command {
                    let _ = self.events.send(EngineEvent::PlayResolved {
                        request,
                        result: Err(EngineError::Unavailable("mpv task stopped".into())),
                    });
                }
            }
        }
    }

    /// Spawn the IO task. Called once; the handle is never recreated.
    fn start(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.commands = Some(tx);

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "no async runtime; playback disabled");
                return;
            }
        };
        let binary = self.binary.clone();
        let events = self.events.clone();
        let volume = self.volume;
        runtime.spawn(run(binary, volume, rx, events));
    }
}

impl PlaybackEngine for MpvEngine {
    fn load(&mut self, url: &str) {
        self.send(MpvCommand::Load(url.to_string()));
    }

    fn play(&mut self, request: RequestId) {
        self.send(MpvCommand::Play(request));
    }

    fn pause(&mut self) {
        self.send(MpvCommand::Pause);
    }

    fn seek(&mut self, position: f64) {
        self.send(MpvCommand::Seek(position));
    }

    /// Before the first load the level is only remembered and passed to
    /// mpv on its command line.
    fn set_volume(&mut self, level: f64) {
        self.volume = level;
        if self.commands.is_some() {
            self.send(MpvCommand::Volume(level));
        }
    }
}

// ── IO task ────────────────────────────────────────────────────────

fn socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("tilawa-mpv-{}.sock", std::process::id()))
}

async fn run(
    binary: PathBuf,
    volume: f64,
    mut commands: UnboundedReceiver<MpvCommand>,
    events: UnboundedSender<EngineEvent>,
) {
    let socket = socket_path();
    let outcome = match connect(&binary, &socket, volume).await {
        Ok((child, stream)) => {
            info!(socket = %socket.display(), "connected to mpv");
            serve(child, stream, &mut commands, &events).await
        }
        Err(e) => Err(e),
    };
    let _ = std::fs::remove_file(&socket);

    let reason = match outcome {
        Ok(()) => return,
        Err(e) => e,
    };
    warn!(error = %format!("{:#}", reason), "mpv unavailable");
    let _ = events.send(EngineEvent::Failed {
        message: reason.to_string(),
    });

    // Keep answering play requests so the store never waits on a dead handle.
    while let Some(command) = commands.recv().await {
        if let MpvCommand::Play(request) = command {
            let _ = events.send(EngineEvent::PlayResolved {
                request,
                result: Err(EngineError::Unavailable(reason.to_string())),
            });
        }
    }
}

async fn connect(
    binary: &Path,
    socket: &Path,
    volume: f64,
) -> anyhow::Result<(Child, UnixStream)> {
    let _ = std::fs::remove_file(socket);
    let mut child = Command::new(binary)
        .arg("--idle=yes")
        .arg("--keep-open=yes")
        .arg("--no-video")
        .arg("--no-terminal")
        .arg(format!("--volume={}", mpv_volume(volume)))
        .arg(format!("--input-ipc-server={}", socket.display()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn {}", binary.display()))?;

    for _ in 0..CONNECT_ATTEMPTS {
        if let Some(status) = child.try_wait()? {
            bail!("mpv exited during startup ({})", status);
        }
        match UnixStream::connect(socket).await {
            Ok(stream) => return Ok((child, stream)),
            Err(_) => tokio::time::sleep(CONNECT_RETRY).await,
        }
    }
    bail!("timed out waiting for mpv socket {}", socket.display())
}

async fn write_message(writer: &mut OwnedWriteHalf, message: &Value) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

/// Pump commands and events until the engine is dropped (`Ok`) or mpv goes
/// away (`Err`).
async fn serve(
    mut child: Child,
    stream: UnixStream,
    commands: &mut UnboundedReceiver<MpvCommand>,
    events: &UnboundedSender<EngineEvent>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    for message in observe_commands() {
        write_message(&mut writer, &message).await?;
    }

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    let _ = write_message(&mut writer, &json!({ "command": ["quit"] })).await;
                    let _ = child.wait().await;
                    return Ok(());
                };
                debug!(?command, "mpv command");
                for message in command.to_ipc() {
                    write_message(&mut writer, &message).await?;
                }
            }
            line = lines.next_line() => {
                match line.context("reading mpv socket")? {
                    Some(line) => {
                        if let Some(event) = parse_event(&line) {
                            if !matches!(event, EngineEvent::TimeUpdate { .. }) {
                                debug!(?event, "mpv event");
                            }
                            if events.send(event).is_err() {
                                return Ok(());
                            }
                        }
                    }
                    None => bail!("mpv closed the IPC socket"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_pauses_then_replaces() {
        let msgs = MpvCommand::Load("https://example.org/001.mp3".into()).to_ipc();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["command"], json!(["set_property", "pause", true]));
        assert_eq!(
            msgs[1]["command"],
            json!(["loadfile", "https://example.org/001.mp3", "replace"])
        );
    }

    #[test]
    fn play_carries_request_id() {
        let msgs = MpvCommand::Play(7).to_ipc();
        assert_eq!(msgs[0]["request_id"], json!(7));
        assert_eq!(msgs[0]["command"], json!(["set_property", "pause", false]));
    }

    #[test]
    fn volume_and_seek_messages() {
        let v = MpvCommand::Volume(0.7).to_ipc();
        assert_eq!(v[0]["command"], json!(["set_property", "volume", 70.0]));
        let s = MpvCommand::Seek(45.0).to_ipc();
        assert_eq!(s[0]["command"], json!(["seek", 45.0, "absolute"]));
    }

    #[test]
    fn parses_property_changes() {
        assert_eq!(
            parse_event(r#"{"event":"property-change","id":1,"name":"time-pos","data":12.5}"#),
            Some(EngineEvent::TimeUpdate { position: 12.5 })
        );
        assert_eq!(
            parse_event(r#"{"event":"property-change","id":2,"name":"duration","data":301.2}"#),
            Some(EngineEvent::MetadataReady { duration: 301.2 })
        );
        assert_eq!(
            parse_event(r#"{"event":"property-change","id":2,"name":"duration"}"#),
            None
        );
        assert_eq!(
            parse_event(r#"{"event":"property-change","id":3,"name":"eof-reached","data":true}"#),
            Some(EngineEvent::Ended)
        );
        assert_eq!(
            parse_event(r#"{"event":"property-change","id":3,"name":"eof-reached","data":false}"#),
            None
        );
    }

    #[test]
    fn parses_file_events() {
        assert_eq!(
            parse_event(r#"{"event":"start-file","playlist_entry_id":1}"#),
            Some(EngineEvent::LoadStarted)
        );
        assert_eq!(
            parse_event(r#"{"event":"end-file","reason":"error","file_error":"loading failed"}"#),
            Some(EngineEvent::Failed {
                message: "loading failed".into()
            })
        );
        assert_eq!(parse_event(r#"{"event":"end-file","reason":"stop"}"#), None);
        assert_eq!(parse_event(r#"{"event":"file-loaded"}"#), None);
    }

    #[test]
    fn parses_replies() {
        assert_eq!(
            parse_event(r#"{"request_id":4,"error":"success","data":null}"#),
            Some(EngineEvent::PlayResolved {
                request: 4,
                result: Ok(())
            })
        );
        assert_eq!(
            parse_event(r#"{"request_id":5,"error":"property unavailable"}"#),
            Some(EngineEvent::PlayResolved {
                request: 5,
                result: Err(EngineError::Rejected("property unavailable".into()))
            })
        );
        assert_eq!(parse_event(r#"{"request_id":0,"error":"success"}"#), None);
        assert_eq!(parse_event("not json"), None);
    }

    #[test]
    fn volume_is_deferred_until_started() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut engine = MpvEngine::new("mpv", tx);
        engine.set_volume(0.3);
        assert!(engine.commands.is_none());
        assert_eq!(engine.volume, 0.3);
    }

    #[tokio::test]
    async fn missing_binary_rejects_plays() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = MpvEngine::new("/nonexistent/mpv-binary", tx);
        engine.load("https://example.org/001.mp3");
        engine.play(1);

        let mut rejected = false;
        while let Some(event) = rx.recv().await {
            if let EngineEvent::PlayResolved { request, result } = event {
                assert_eq!(request, 1);
                assert!(matches!(result, Err(EngineError::Unavailable(_))));
                rejected = true;
                break;
            }
        }
        assert!(rejected);
    }
}
