use super::{DeviceError, FrameBuffer, PixelDevice, Rgb};
use std::sync::{Arc, Mutex};

/// Test strip that keeps every committed frame
///
/// Clones share the frame log, so a test can keep one clone while the
/// consumer owns the other.
#[derive(Clone, Debug)]
pub(crate) struct RecordingStrip {
    staged: FrameBuffer,
    frames: Arc<Mutex<Vec<Vec<Rgb>>>>,
}

impl RecordingStrip {
    pub(crate) fn new(led_count: usize) -> Self {
        Self {
            staged: FrameBuffer::new(led_count),
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn frames(&self) -> Vec<Vec<Rgb>> {
        self.frames.lock().unwrap().clone()
    }

    pub(crate) fn last_frame(&self) -> Option<Vec<Rgb>> {
        self.frames.lock().unwrap().last().cloned()
    }

    pub(crate) fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl PixelDevice for RecordingStrip {
    fn led_count(&self) -> usize {
        self.staged.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) -> Result<(), DeviceError> {
        self.staged.set(index, color)
    }

    fn clear(&mut self) -> Result<(), DeviceError> {
        self.staged.clear();
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), DeviceError> {
        self.frames
            .lock()
            .unwrap()
            .push(self.staged.pixels().to_vec());
        Ok(())
    }
}

/// Lit pixel indices of a frame
pub(crate) fn lit(frame: &[Rgb]) -> Vec<usize> {
    frame
        .iter()
        .enumerate()
        .filter(|(_, pixel)| !pixel.is_off())
        .map(|(index, _)| index)
        .collect()
}
