//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds an [`AppContext`] over a temporary
//! directory, with shell scripts standing in for ffmpeg and ffprobe. The
//! [`TestHarness::serve`] constructor starts Axum on a random port for
//! HTTP-level testing.
//!
//! The fake ffmpeg copies its `-i` input to its last argument. When asked for
//! `-progress pipe:1` it also prints `out_time_ms` lines covering 10 seconds.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use timelapse::config::Config;
use timelapse::server::{build_context, create_router, AppContext};

/// Behaviour of the fake tools.
#[derive(Debug, Clone)]
pub struct FakeTools {
    /// What ffprobe prints.
    pub duration: String,
    /// Lines ffmpeg writes to stderr before doing anything else.
    pub stderr_lines: u32,
    /// Pause between two progress updates, as passed to `sleep`.
    pub step_delay: String,
    /// ffmpeg prints an error and exits 1 without writing anything.
    pub ffmpeg_fails: bool,
}

impl Default for FakeTools {
    fn default() -> Self {
        Self {
            duration: "12.5".to_string(),
            stderr_lines: 50,
            step_delay: "0.05".to_string(),
            ffmpeg_fails: false,
        }
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub dir: TempDir,
    pub config: Config,
    pub ctx: AppContext,
}

impl TestHarness {
    /// Harness with the default fake tools.
    pub fn new() -> Self {
        Self::with_tools(FakeTools::default())
    }

    pub fn with_tools(tools: FakeTools) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).expect("failed to create bin dir");

        let ffprobe = write_script(&bin.join("ffprobe"), &ffprobe_script(&tools));
        let ffmpeg = write_script(&bin.join("ffmpeg"), &ffmpeg_script(&tools));

        let mut config = Config::default();
        config.app.output_path = dir.path().join("out").to_string_lossy().into_owned();
        config.app.staging_dir = Some(dir.path().join("staging"));
        config.app.ffmpeg_path = ffmpeg.to_string_lossy().into_owned();
        config.app.ffprobe_path = ffprobe.to_string_lossy().into_owned();
        config.server.progress_interval_ms = 20;
        config.server.progress_timeout_secs = 30;

        let ctx = build_context(&config).expect("failed to build context");
        Self { dir, config, ctx }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.dir.path().join("staging")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Staged files other than the preview.
    pub fn staged_uploads(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.staging_dir())
            .expect("staging dir missing")
            .map(|e| e.expect("bad dir entry").path())
            .filter(|p| p.file_name().map(|n| n != "preview.mp4").unwrap_or(false))
            .collect()
    }
}

fn write_script(path: &Path, body: &str) -> PathBuf {
    std::fs::write(path, body).expect("failed to write script");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path.to_path_buf()
}

fn ffprobe_script(tools: &FakeTools) -> String {
    format!("#!/bin/sh\necho '{}'\n", tools.duration)
}

fn ffmpeg_script(tools: &FakeTools) -> String {
    if tools.ffmpeg_fails {
        return "#!/bin/sh\necho 'Invalid data found when processing input' >&2\nexit 1\n"
            .to_string();
    }
    format!(
        r#"#!/bin/sh
in=""
out=""
prev=""
progress=0
for a in "$@"; do
  if [ "$prev" = "-i" ]; then in="$a"; fi
  if [ "$a" = "pipe:1" ]; then progress=1; fi
  prev="$a"
  out="$a"
done
i=0
while [ $i -lt {lines} ]; do
  echo "frame=$i fps=30.0 q=18.0 size=$i kB time=00:00:00.00 bitrate=N/A speed=1.0x" >&2
  i=$((i+1))
done
if [ $progress -eq 1 ]; then
  for us in N/A 0 2000000 4000000 6000000 8000000 10000000; do
    echo "out_time_ms=$us"
    echo "progress=continue"
    sleep {delay}
  done
  echo "progress=end"
fi
cp "$in" "$out"
"#,
        lines = tools.stderr_lines,
        delay = tools.step_delay,
    )
}

/// POST `bytes` as the multipart `file` field.
pub async fn upload(addr: SocketAddr, name: &str, bytes: &[u8]) -> (u16, serde_json::Value) {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(name.to_string());
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = reqwest::Client::new()
        .post(format!("http://{}/upload", addr))
        .multipart(form)
        .send()
        .await
        .expect("upload request failed");
    let status = resp.status().as_u16();
    (status, resp.json().await.expect("upload reply is not JSON"))
}

/// Read `/progress` until the server ends the stream.
pub async fn collect_progress(addr: SocketAddr) -> Vec<u8> {
    let body = reqwest::get(format!("http://{}/progress", addr))
        .await
        .expect("progress request failed")
        .text()
        .await
        .expect("progress stream broke");

    body.lines()
        .filter_map(|l| l.strip_prefix("data:"))
        .map(|v| v.trim().parse().expect("progress event is not a number"))
        .collect()
}
