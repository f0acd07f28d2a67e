use super::{DeviceError, FrameBuffer, PixelDevice, Rgb};
use tracing::{debug, info};

/// LED strip stand-in that renders committed frames to the log
///
/// Every refresh is logged at debug level; frames that differ from the
/// previously committed one are also logged at info level.
#[derive(Debug)]
pub struct ConsoleStrip {
    staged: FrameBuffer,
    committed: Vec<Rgb>,
    frames: u64,
}

impl ConsoleStrip {
    pub fn new(led_count: usize) -> Self {
        info!("Creating console LED strip with {} pixels", led_count);
        Self {
            staged: FrameBuffer::new(led_count),
            committed: vec![Rgb::OFF; led_count],
            frames: 0,
        }
    }

    pub fn committed(&self) -> &[Rgb] {
        &self.committed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl PixelDevice for ConsoleStrip {
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
        self.frames += 1;
        let changed = self.committed.as_slice() != self.staged.pixels();
        self.committed.copy_from_slice(self.staged.pixels());

        let rendered = render(&self.committed);
        if changed {
            info!("Strip [{}]", rendered);
        } else {
            debug!("Strip frame {} unchanged [{}]", self.frames, rendered);
        }
        Ok(())
    }
}

// One character per pixel, named after the dominant channel
fn render(pixels: &[Rgb]) -> String {
    pixels
        .iter()
        .map(|pixel| {
            if pixel.is_off() {
                '.'
            } else if pixel.r >= pixel.g && pixel.r >= pixel.b {
                'R'
            } else if pixel.g >= pixel.b {
                'G'
            } else {
                'B'
            }
        })
        .collect()
}
