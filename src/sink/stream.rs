use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use axum::Json;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tokio::sync::watch;

use crate::assets::store::AssetStore;
use crate::foundation::error::{FogmapError, FogmapResult};
use crate::render::compositor::Compositor;
use crate::render::frame::{ComposedFrame, RenderMode};
use crate::scene::item::{ItemKind, SceneItem};
use crate::session::config::StreamOpts;
use crate::session::document::DocumentSnapshot;

const BOUNDARY: &str = "frame";

/// Latest published document snapshot, shared with background renderers.
///
/// Readers clone the inner `Arc` and release the lock before doing any work.
#[derive(Clone, Debug)]
pub struct SnapshotCell(Arc<RwLock<Arc<DocumentSnapshot>>>);

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new(DocumentSnapshot::empty())
    }
}

impl SnapshotCell {
    /// Cell holding `snap`.
    pub fn new(snap: DocumentSnapshot) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(snap))))
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snap: Arc<DocumentSnapshot>) {
        let mut guard = self.0.write().unwrap_or_else(|e| e.into_inner());
        *guard = snap;
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<DocumentSnapshot> {
        Arc::clone(&self.0.read().unwrap_or_else(|e| e.into_inner()))
    }
}

struct StreamState {
    cell: SnapshotCell,
    compositor: Mutex<Compositor>,
    last_jpeg: Mutex<Option<(Arc<DocumentSnapshot>, Bytes)>>,
    opts: StreamOpts,
}

impl StreamState {
    fn render(&self, snap: &DocumentSnapshot) -> FogmapResult<ComposedFrame> {
        let mut compositor = self.compositor.lock().unwrap_or_else(|e| e.into_inner());
        compositor.compose(snap, &snap.viewport, RenderMode::Player, None)
    }

    fn png(&self) -> FogmapResult<Vec<u8>> {
        let snap = self.cell.load();
        self.render(&snap)?.encode_png()
    }

    /// JPEG of the published snapshot, reused while the same snapshot stays published.
    fn jpeg(&self) -> FogmapResult<Bytes> {
        let snap = self.cell.load();
        if let Some((cached, bytes)) = self
            .last_jpeg
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            && Arc::ptr_eq(cached, &snap)
        {
            return Ok(bytes.clone());
        }
        let jpeg = self
            .render(&snap)?
            .encode_jpeg(self.opts.jpeg_quality)
            .map_err(|e| FogmapError::stream_encode(e.to_string()))?;
        let bytes = Bytes::from(jpeg);
        *self.last_jpeg.lock().unwrap_or_else(|e| e.into_inner()) = Some((snap, bytes.clone()));
        Ok(bytes)
    }
}

async fn blocking<T: Send + 'static>(
    state: &Arc<StreamState>,
    f: impl FnOnce(&StreamState) -> FogmapResult<T> + Send + 'static,
) -> FogmapResult<T> {
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .context("stream render task")?
}

/// Item summary reported by `/api/status`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemSummary {
    /// Variant name.
    pub kind: &'static str,
    /// World x of the bounding box.
    pub x: f64,
    /// World y of the bounding box.
    pub y: f64,
    /// Bounding box width.
    pub width: f64,
    /// Bounding box height.
    pub height: f64,
    /// Token name or annotation text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// JSON body of `/api/status`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusReport {
    /// Map record name.
    pub name: String,
    /// Snapshot revision.
    pub revision: u64,
    /// View zoom.
    pub zoom: f64,
    /// View pan x in screen pixels.
    pub pan_x: f64,
    /// View pan y in screen pixels.
    pub pan_y: f64,
    /// Frame width.
    pub render_width: u32,
    /// Frame height.
    pub render_height: u32,
    /// Base image width.
    pub map_width: u32,
    /// Base image height.
    pub map_height: u32,
    /// Viewer page refresh interval.
    pub refresh_ms: u64,
    /// Player-visible items in z-order.
    pub items: Vec<ItemSummary>,
}

impl StatusReport {
    /// Report for `snap`. Markers are GM-only and left out.
    pub fn from_snapshot(snap: &DocumentSnapshot, refresh_ms: u64) -> Self {
        let (map_width, map_height) = snap.map_size();
        let pan = snap.viewport.pan();
        Self {
            name: snap.name.clone(),
            revision: snap.revision,
            zoom: snap.viewport.zoom(),
            pan_x: pan.x,
            pan_y: pan.y,
            render_width: snap.viewport.width(),
            render_height: snap.viewport.height(),
            map_width,
            map_height,
            refresh_ms,
            items: snap
                .items
                .iter()
                .filter(|it| !it.is_marker())
                .map(summarize)
                .collect(),
        }
    }
}

fn summarize(item: &SceneItem) -> ItemSummary {
    let b = item.bounding_box();
    let label = match &item.kind {
        ItemKind::Token(t) => Some(t.entity_id.clone()),
        ItemKind::TextAnnotation(t) => Some(t.text.clone()),
        _ => None,
    };
    ItemSummary {
        kind: item.type_name(),
        x: b.x0,
        y: b.y0,
        width: b.width(),
        height: b.height(),
        label,
    }
}

/// One part of the `multipart/x-mixed-replace` body.
pub fn multipart_part(jpeg: &[u8]) -> Bytes {
    let head = format!(
        "--{BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    let mut out = Vec::with_capacity(head.len() + jpeg.len() + 2);
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(jpeg);
    out.extend_from_slice(b"\r\n");
    Bytes::from(out)
}

/// Auto-refreshing viewer page.
pub fn viewer_page(refresh_ms: u64) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>fogmap</title>
<style>html,body{{margin:0;background:#000;height:100%}}img{{display:block;width:100%;height:100%;object-fit:contain}}</style>
</head>
<body>
<img id="frame" src="/frame" alt="map">
<script>
const img = document.getElementById("frame");
setInterval(() => {{ img.src = "/frame?t=" + Date.now(); }}, {refresh_ms});
</script>
</body>
</html>
"#
    )
}

fn error_response(e: &FogmapError) -> Response {
    tracing::warn!(error = %e, "stream frame skipped");
    (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
}

async fn index(State(state): State<Arc<StreamState>>) -> Html<String> {
    Html(viewer_page(state.opts.interval_ms))
}

async fn frame(State(state): State<Arc<StreamState>>) -> Response {
    match blocking(&state, StreamState::png).await {
        Ok(png) => (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            png,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn status(State(state): State<Arc<StreamState>>) -> Json<StatusReport> {
    let snap = state.cell.load();
    Json(StatusReport::from_snapshot(&snap, state.opts.interval_ms))
}

async fn stream(
    State(state): State<Arc<StreamState>>,
    State(stop): State<watch::Receiver<bool>>,
) -> Response {
    let mut ticker = tokio::time::interval(Duration::from_millis(state.opts.interval_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let parts = futures_util::stream::unfold(
        (state, ticker, stop),
        |(state, mut ticker, mut stop)| async move {
            loop {
                if *stop.borrow() {
                    return None;
                }
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop.changed() => return None,
                }
                match blocking(&state, StreamState::jpeg).await {
                    Ok(jpeg) => {
                        let part = multipart_part(&jpeg);
                        return Some((Ok::<_, std::convert::Infallible>(part), (state, ticker, stop)));
                    }
                    Err(e) => tracing::warn!(error = %e, "stream frame skipped"),
                }
            }
        },
    );

    (
        [
            (
                header::CONTENT_TYPE,
                format!("multipart/x-mixed-replace; boundary={BOUNDARY}"),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        Body::from_stream(parts),
    )
        .into_response()
}

#[derive(Clone)]
struct AppState {
    stream: Arc<StreamState>,
    stop: watch::Receiver<bool>,
}

impl axum::extract::FromRef<AppState> for Arc<StreamState> {
    fn from_ref(app: &AppState) -> Self {
        Arc::clone(&app.stream)
    }
}

impl axum::extract::FromRef<AppState> for watch::Receiver<bool> {
    fn from_ref(app: &AppState) -> Self {
        app.stop.clone()
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/frame", get(frame))
        .route("/stream", get(stream))
        .route("/api/status", get(status))
        .with_state(state)
}

/// HTTP stream server running on its own thread with a current-thread tokio runtime.
///
/// Serves `GET /frame` (PNG), `GET /stream` (MJPEG), `GET /` (viewer page) and
/// `GET /api/status` from the snapshots published into its [`SnapshotCell`].
pub struct StreamServer {
    addr: SocketAddr,
    stop: watch::Sender<bool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamServer {
    /// Bind `opts.bind` and start serving.
    ///
    /// Binding happens on the calling thread so address errors surface here.
    #[tracing::instrument(skip_all, fields(bind = %opts.bind))]
    pub fn start(opts: &StreamOpts, cell: SnapshotCell, assets: Arc<AssetStore>) -> FogmapResult<Self> {
        let listener = std::net::TcpListener::bind(&opts.bind)
            .with_context(|| format!("bind stream server to {}", opts.bind))?;
        listener
            .set_nonblocking(true)
            .context("configure stream listener")?;
        let addr = listener.local_addr().context("stream listener address")?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let state = AppState {
            stream: Arc::new(StreamState {
                cell,
                compositor: Mutex::new(Compositor::new(assets)),
                last_jpeg: Mutex::new(None),
                opts: opts.clone(),
            }),
            stop: stop_rx.clone(),
        };

        let thread = std::thread::Builder::new()
            .name("fogmap-stream".to_string())
            .spawn(move || serve(listener, state, stop_rx))
            .context("spawn stream server thread")?;

        tracing::info!(%addr, interval_ms = opts.interval_ms, "stream server listening");
        Ok(Self {
            addr,
            stop: stop_tx,
            thread: Some(thread),
        })
    }

    /// Bound address (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections, end open streams and join the server thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.stop.send(true);
        if thread.join().is_err() {
            tracing::warn!("stream server thread panicked");
        }
        tracing::info!(addr = %self.addr, "stream server stopped");
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(listener: std::net::TcpListener, state: AppState, mut stop: watch::Receiver<bool>) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!(error = %e, "stream runtime failed to start");
            return;
        }
    };
    rt.block_on(async move {
        let listener = match tokio::net::TcpListener::from_std(listener) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "stream listener rejected by runtime");
                return;
            }
        };
        let shutdown = async move {
            while !*stop.borrow() {
                if stop.changed().await.is_err() {
                    break;
                }
            }
        };
        if let Err(e) = axum::serve(listener, build_router(state))
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::warn!(error = %e, "stream server exited");
        }
    });
}

#[cfg(test)]
#[path = "../../tests/unit/sink/stream.rs"]
mod tests;
