use crate::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio::time::{Instant, MissedTickBehavior};

pub fn sse_routes() -> Router<AppContext> {
    Router::new().route("/progress", get(progress_handler))
}

/// GET /progress -- the conversion percentage, one event per poll.
///
/// The stream ends after a value of 100 is sent, once its lifetime runs out,
/// or when the client goes away.
pub async fn progress_handler(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let service = ctx.service.clone();
    let interval = ctx.settings.progress_interval;
    let lifetime = ctx.settings.progress_timeout;

    let stream = async_stream::stream! {
        // `None` when the lifetime is too long to represent.
        let deadline = Instant::now().checked_add(lifetime);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::debug!("Progress stream reached its {:?} lifetime", lifetime);
                break;
            }

            let percent = service.progress();
            yield Ok(Event::default().data(percent.to_string()));

            if percent >= 100 {
                break;
            }
        }
    };

    Sse::new(stream)
}

#[cfg(test)]
mod tests {
    use crate::server::{create_router, test_context};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn progress_stream_is_event_stream_and_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let app = create_router(test_context(tmp.path()));

        let response = app
            .oneshot(Request::get("/progress").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        // Nothing converts, so the stream polls 0 until its 2 s lifetime ends.
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let events: Vec<_> = text.lines().filter(|l| l.starts_with("data:")).collect();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.trim_start_matches("data:").trim() == "0"));
    }

    #[tokio::test]
    async fn progress_stream_accepts_unbounded_lifetime() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = test_context(tmp.path());
        ctx.settings.progress_timeout = Duration::from_secs(u64::MAX);
        let app = create_router(ctx);

        let response = app
            .oneshot(Request::get("/progress").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let data = frame.into_data().unwrap();
        let text = std::str::from_utf8(&data).unwrap();
        assert_eq!(text.trim().trim_start_matches("data:").trim(), "0");
    }
}
