//! Download, share and playlist actions on the current recitation.
//!
//! Each action runs on its own task and reports through a [`Notifier`];
//! failures are logged and never reach the UI loop as errors.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::catalog::Recitation;
use crate::error::ActionError;
use crate::notice::{Notice, Notifier};

const CLIPBOARD_TOOLS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

// ── Download ───────────────────────────────────────────────────────

/// `"{reciter} - {surah}.mp3"` with path separators and control
/// characters replaced.
pub fn download_filename(recitation: &Recitation) -> String {
    let name: String = recitation
        .title()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}.mp3", name.trim())
}

/// Stream `url` into `dest`, going through a `.part` file that is removed
/// if the transfer fails. Returns the byte count.
pub async fn download(url: &str, dest: &Path) -> Result<u64, ActionError> {
    let response = reqwest::get(url).await?.error_for_status()?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = dest.with_extension("mp3.part");
    let total = match write_body(response, &partial).await {
        Ok(total) => total,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };
    tokio::fs::rename(&partial, dest).await?;
    Ok(total)
}

async fn write_body(mut response: reqwest::Response, path: &Path) -> Result<u64, ActionError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut total = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(total)
}

pub fn spawn_download(recitation: &Recitation, dir: PathBuf, notifier: Notifier) {
    let url = recitation.audio_url.clone();
    let dest = dir.join(download_filename(recitation));
    let _ = notifier.send(Notice::info(format!("Downloading {}", recitation.title())));
    info!(%url, dest = %dest.display(), "download started");

    tokio::spawn(async move {
        match download(&url, &dest).await {
            Ok(bytes) => {
                info!(bytes, dest = %dest.display(), "download finished");
                let _ = notifier.send(Notice::success(format!("Saved {}", dest.display())));
            }
            Err(e) => {
                warn!(error = %e, %url, "download failed");
                let _ = notifier.send(Notice::error(format!("Download failed: {}", e)));
            }
        }
    });
}

// ── Share ──────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Copied,
}

pub fn share_text(recitation: &Recitation) -> String {
    format!(
        "استمع إلى تلاوة سورة {} بصوت {}",
        recitation.surah.localized_name,
        recitation.reciter.local_name()
    )
}

async fn run_share(command: &[String], title: &str, text: &str, url: &str) -> Result<(), ActionError> {
    let (program, args) = command.split_first().ok_or(ActionError::ShareUnavailable)?;
    let status = Command::new(program)
        .args(args)
        .args([title, text, url])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(ActionError::ShareFailed(status.to_string()))
    }
}

/// Pipe `text` into the first clipboard tool that can be started.
pub async fn copy_to_clipboard(text: &str, tools: &[(&str, &[&str])]) -> Result<(), ActionError> {
    for (program, args) in tools {
        let mut child = match Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(ActionError::ClipboardWrite(e.to_string())),
        };
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ActionError::ClipboardWrite(e.to_string()))?;
        }
        let status = child
            .wait()
            .await
            .map_err(|e| ActionError::ClipboardWrite(e.to_string()))?;
        return if status.success() {
            Ok(())
        } else {
            Err(ActionError::ClipboardWrite(format!("{} {}", program, status)))
        };
    }
    Err(ActionError::ClipboardUnavailable)
}

/// Native share when a share command is configured, clipboard otherwise.
pub async fn share(
    command: &[String],
    recitation: &Recitation,
    tools: &[(&str, &[&str])],
) -> Result<ShareOutcome, ActionError> {
    if command.is_empty() {
        copy_to_clipboard(&recitation.audio_url, tools).await?;
        return Ok(ShareOutcome::Copied);
    }
    run_share(
        command,
        &recitation.title(),
        &share_text(recitation),
        &recitation.audio_url,
    )
    .await?;
    Ok(ShareOutcome::Shared)
}

pub fn spawn_share(recitation: &Recitation, command: Vec<String>, notifier: Notifier) {
    let recitation = recitation.clone();
    tokio::spawn(async move {
        match share(&command, &recitation, CLIPBOARD_TOOLS).await {
            Ok(ShareOutcome::Shared) => {
                let _ = notifier.send(Notice::success("Recitation shared"));
            }
            Ok(ShareOutcome::Copied) => {
                let _ = notifier.send(Notice::success("Recitation link copied to clipboard"));
            }
            Err(e) => warn!(error = %e, id = %recitation.id, "share failed"),
        }
    });
}

// ── Playlist ───────────────────────────────────────────────────────

/// Confirms only; there is no playlist store yet.
pub fn add_to_playlist(recitation: &Recitation, notifier: &Notifier) {
    info!(id = %recitation.id, "add to playlist");
    let _ = notifier.send(Notice::success("Added to playlist"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::notice::Level;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    const CAT: &[(&str, &[&str])] = &[("cat", &[])];
    const MISSING: &[(&str, &[&str])] = &[("/nonexistent/clip", &[])];

    fn recitation() -> Recitation {
        Catalog::builtin().get(0).unwrap().clone()
    }

    #[test]
    fn filename_from_names() {
        let mut r = recitation();
        assert_eq!(download_filename(&r), "Mishari Rashid al-Afasy - Al-Fatiha.mp3");
        r.surah.name = "A/B: C".into();
        assert_eq!(download_filename(&r), "Mishari Rashid al-Afasy - A_B_ C.mp3");
    }

    #[test]
    fn share_text_uses_localized_names() {
        assert_eq!(
            share_text(&recitation()),
            "استمع إلى تلاوة سورة الفاتحة بصوت مشاري راشد العفاسي"
        );
    }

    async fn serve_once(body: &'static [u8]) -> String {
        serve_truncated(body, body.len()).await
    }

    /// Announce `length` bytes but send only `body`, then hang up.
    async fn serve_truncated(body: &'static [u8], length: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                length
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
        });
        format!("http://{}/001.mp3", addr)
    }

    #[tokio::test]
    async fn download_writes_file() {
        let url = serve_once(b"ID3fakeaudio").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("sub").join("Reciter - Surah.mp3");

        let bytes = download(&url, &dest).await.unwrap();
        assert_eq!(bytes, 12);
        assert_eq!(std::fs::read(&dest).unwrap(), b"ID3fakeaudio");
        assert!(!dest.with_extension("mp3.part").exists());
    }

    #[tokio::test]
    async fn interrupted_download_leaves_no_partial_file() {
        let url = serve_truncated(b"ID3", 4096).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Reciter - Surah.mp3");

        let err = download(&url, &dest).await.unwrap_err();
        assert!(matches!(err, ActionError::Http(_)));
        assert!(!dest.exists());
        assert!(!dest.with_extension("mp3.part").exists());
    }

    #[tokio::test]
    async fn download_reports_unreachable_host() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let dir = tempfile::tempdir().unwrap();
        let err = download(&format!("http://{}/x.mp3", addr), &dir.path().join("x.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Http(_)));
    }

    #[tokio::test]
    async fn share_falls_back_to_clipboard() {
        let r = recitation();
        let outcome = share(&[], &r, CAT).await.unwrap();
        assert_eq!(outcome, ShareOutcome::Copied);

        let err = share(&[], &r, MISSING).await.unwrap_err();
        assert!(matches!(err, ActionError::ClipboardUnavailable));
    }

    #[tokio::test]
    async fn share_uses_configured_command() {
        let r = recitation();
        let outcome = share(&["true".to_string()], &r, MISSING).await.unwrap();
        assert_eq!(outcome, ShareOutcome::Shared);

        let err = share(&["false".to_string()], &r, MISSING).await.unwrap_err();
        assert!(matches!(err, ActionError::ShareFailed(_)));
    }

    #[test]
    fn playlist_stub_confirms() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        add_to_playlist(&recitation(), &tx);
        let notice = rx.try_recv().unwrap();
        assert_eq!(notice.level, Level::Success);
    }
}
