use super::{DeviceError, Rgb};

/// Staging buffer shared by the strip backends
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    pixels: Vec<Rgb>,
}

impl FrameBuffer {
    pub fn new(led_count: usize) -> Self {
        Self {
            pixels: vec![Rgb::OFF; led_count],
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn set(&mut self, index: usize, color: Rgb) -> Result<(), DeviceError> {
        let len = self.pixels.len();
        match self.pixels.get_mut(index) {
            Some(pixel) => {
                *pixel = color;
                Ok(())
            }
            None => Err(DeviceError::IndexOutOfRange { index, len }),
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(Rgb::OFF);
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn any_lit(&self) -> bool {
        self.pixels.iter().any(|pixel| !pixel.is_off())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_rejects_out_of_range_index() {
        let mut frame = FrameBuffer::new(25);
        assert!(frame.set(24, Rgb::new(1, 2, 3)).is_ok());

        match frame.set(25, Rgb::new(1, 2, 3)) {
            Err(DeviceError::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 25);
                assert_eq!(len, 25);
            }
            other => panic!("expected IndexOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn clear_turns_every_pixel_off() {
        let mut frame = FrameBuffer::new(4);
        frame.set(1, Rgb::new(0, 50, 0)).unwrap();
        assert!(frame.any_lit());

        frame.clear();
        assert!(!frame.any_lit());
        assert!(frame.pixels().iter().all(Rgb::is_off));
    }
}
