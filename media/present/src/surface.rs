/*!
    Display surface for presented video.
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use media_types::VideoFrame;

use crate::error::SinkError;
use crate::sink::PresentationSink;

/**
    A frame currently on screen, with the timestamp it was presented for.
*/
#[derive(Clone, Debug)]
pub struct ShownFrame {
    pub frame: Arc<VideoFrame>,
    pub timestamp: i64,
}

#[derive(Debug, Default)]
struct SurfaceInner {
    current: Mutex<Option<ShownFrame>>,
    generation: AtomicU64,
    closed: AtomicBool,
}

/**
    Holds the most recently presented frame of one video stream.

    A renderer polls [`latest`](Self::latest) and compares
    [`generation`](Self::generation) to skip redraws when nothing changed.
    The paired [`SurfaceSink`] is what a presentation queue writes into.
*/
#[derive(Clone, Debug, Default)]
pub struct FrameSurface {
    inner: Arc<SurfaceInner>,
}

impl FrameSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        A sink that presents frames onto this surface.
    */
    pub fn sink(&self) -> SurfaceSink {
        SurfaceSink {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn latest(&self) -> Option<ShownFrame> {
        self.inner.current.lock().clone()
    }

    /**
        Number of frames presented so far.
    */
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /**
        True once the sink has been released.
    */
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

/**
    Writing half of a [`FrameSurface`].
*/
#[derive(Debug)]
pub struct SurfaceSink {
    inner: Arc<SurfaceInner>,
}

impl PresentationSink<VideoFrame> for SurfaceSink {
    fn dispatch(&mut self, frame: VideoFrame, timestamp: i64) -> Result<(), SinkError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }
        if !frame.is_complete() {
            warn!(
                timestamp,
                width = frame.width,
                height = frame.height,
                len = frame.data.len(),
                "skipping frame with truncated pixel data"
            );
            return Ok(());
        }

        *self.inner.current.lock() = Some(ShownFrame {
            frame: Arc::new(frame),
            timestamp,
        });
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn close(&mut self) {
        self.inner.closed.store(true, Ordering::Release);
    }
}

static_assertions::assert_impl_all!(FrameSurface: Send, Sync);
static_assertions::assert_impl_all!(SurfaceSink: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::PixelFormat;

    fn frame(fill: u8) -> VideoFrame {
        VideoFrame::new(vec![fill; 4 * 2 * 2], 2, 2, PixelFormat::Rgba)
    }

    #[test]
    fn shows_latest_frame() {
        let surface = FrameSurface::new();
        let mut sink = surface.sink();
        assert!(surface.latest().is_none());

        sink.dispatch(frame(1), 0).unwrap();
        sink.dispatch(frame(2), 40_000).unwrap();

        let shown = surface.latest().unwrap();
        assert_eq!(shown.timestamp, 40_000);
        assert_eq!(shown.frame.data[0], 2);
        assert_eq!(surface.generation(), 2);
    }

    #[test]
    fn truncated_frame_is_skipped() {
        let surface = FrameSurface::new();
        let mut sink = surface.sink();
        sink.dispatch(VideoFrame::new(vec![0; 3], 2, 2, PixelFormat::Rgba), 0)
            .unwrap();
        assert_eq!(surface.generation(), 0);
    }

    #[test]
    fn closed_surface_rejects_frames() {
        let surface = FrameSurface::new();
        let mut sink = surface.sink();
        sink.close();
        assert!(surface.is_closed());
        assert!(matches!(sink.dispatch(frame(0), 0), Err(SinkError::Closed)));
    }
}
