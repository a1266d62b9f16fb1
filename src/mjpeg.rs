//! Motion JPEG over `multipart/x-mixed-replace`.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::{BufMut, Bytes, BytesMut};
use emotion::FramePipeline;
use tokio::sync::{mpsc, watch};

pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Encoded frames buffered between the camera thread and the client.
const BUFFERED_FRAMES: usize = 2;

/// Wrap one JPEG in its multipart boundary and headers.
pub fn part(jpeg: &[u8]) -> Bytes {
    const HEAD: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    let mut buf = BytesMut::with_capacity(HEAD.len() + jpeg.len() + 2);
    buf.put_slice(HEAD);
    buf.put_slice(jpeg);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

/// Resolves once `shutdown` turns `true`. Never resolves if its sender is gone.
async fn stopped(mut shutdown: watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

/// Run `pipeline` on a blocking thread and stream its frames to the client
/// until the client leaves, the source ends or `shutdown` turns `true`.
///
/// Dropping the response body closes the channel, which stops the pipeline
/// and releases the camera.
pub fn stream(pipeline: FramePipeline, shutdown: watch::Receiver<bool>) -> Response {
    let (tx, mut rx) = mpsc::channel::<Bytes>(BUFFERED_FRAMES);
    tokio::task::spawn_blocking(move || {
        match pipeline.run(|jpeg| tx.blocking_send(part(&jpeg)).is_ok()) {
            Ok(()) => tracing::info!("video feed closed"),
            Err(e) => tracing::error!(error = ?e, "video feed failed"),
        }
    });
    let body = async_stream::stream! {
        let stop = stopped(shutdown);
        tokio::pin!(stop);
        loop {
            let next = tokio::select! {
                chunk = rx.recv() => chunk,
                _ = &mut stop => {
                    tracing::info!("video feed ended by shutdown");
                    None
                }
            };
            match next {
                Some(chunk) => yield Ok::<Bytes, Infallible>(chunk),
                None => break,
            }
        }
    };
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], Body::from_stream(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_is_framed() {
        let p = part(b"JPEG");
        assert_eq!(
            p.as_ref(),
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n"
        );
    }
}
