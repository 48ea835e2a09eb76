use crate::adapter::SceneFrame;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::ReelResult;
use crate::foundation::math::{premultiply_rgba8, unpremultiply_rgba8};
use std::borrow::Cow;
use std::sync::mpsc;

/// A rendered frame as RGBA8 pixels.
///
/// Renderers hand back **premultiplied alpha** by default; the flag makes it explicit at the
/// encoder boundary.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Solid opaque frame, mostly useful for tests and headless renderers.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let px = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(px * 4);
        for _ in 0..px {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }

    pub(crate) fn straight_rgba8(&self) -> Cow<'_, [u8]> {
        if self.premultiplied {
            Cow::Owned(unpremultiply_rgba8(&self.data))
        } else {
            Cow::Borrowed(&self.data)
        }
    }

    pub(crate) fn premul_rgba8(&self) -> Cow<'_, [u8]> {
        if self.premultiplied {
            Cow::Borrowed(&self.data)
        } else {
            Cow::Owned(premultiply_rgba8(&self.data))
        }
    }
}

/// Completion callback handed to [`Renderer::render`].
///
/// Call [`RenderDone::notify`] once the frame buffer is stable and readable. It is `Send`, so a
/// renderer may finish on another thread. In live playback the token is detached and notifying
/// is a no-op. Clones signal the same frame.
#[derive(Clone, Debug)]
pub struct RenderDone {
    tx: Option<mpsc::Sender<FrameIndex>>,
    frame: FrameIndex,
}

impl RenderDone {
    pub(crate) fn new(tx: mpsc::Sender<FrameIndex>, frame: FrameIndex) -> Self {
        Self {
            tx: Some(tx),
            frame,
        }
    }

    /// A token nobody waits on.
    pub fn detached(frame: FrameIndex) -> Self {
        Self { tx: None, frame }
    }

    /// Frame this token belongs to.
    pub fn frame(&self) -> FrameIndex {
        self.frame
    }

    /// Signal render completion.
    pub fn notify(self) {
        if let Some(tx) = self.tx {
            // The scheduler may have given up (timeout); a closed channel is not an error here.
            let _ = tx.send(self.frame);
        }
    }
}

/// External scene renderer.
///
/// The crate never draws pixels itself. During export the scheduler calls
/// [`Renderer::render`], waits for the [`RenderDone`] signal, and only then reads the buffer.
pub trait Renderer {
    /// Draw `frame`, then notify `done` once the frame buffer may be read.
    fn render(&mut self, frame: &SceneFrame, done: RenderDone) -> ReelResult<()>;

    /// Read the last completed frame.
    fn read_frame_buffer(&mut self) -> ReelResult<FrameRGBA>;
}
