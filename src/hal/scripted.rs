use super::{DeviceError, InputSource, Level};
use tracing::debug;

/// Replays a fixed sequence of input levels, one per read
///
/// Once the script is exhausted the last level is held, or the script starts
/// over when `repeat` is set. An empty script reads as released.
#[derive(Clone, Debug)]
pub struct ScriptedInput {
    levels: Vec<Level>,
    position: usize,
    repeat: bool,
}

impl ScriptedInput {
    pub fn new(levels: Vec<Level>, repeat: bool) -> Self {
        Self {
            levels,
            position: 0,
            repeat,
        }
    }

    /// Parses a script such as `"1100011"` where `1` is high and `0` is low
    ///
    /// Whitespace, `_` and `,` are ignored so longer scripts can be grouped.
    pub fn from_pattern(pattern: &str, repeat: bool) -> Result<Self, DeviceError> {
        let levels = pattern
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != ',')
            .map(|c| match c {
                '1' => Ok(Level::High),
                '0' => Ok(Level::Low),
                other => Err(DeviceError::InvalidScript(other)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Parsed input script with {} samples", levels.len());
        Ok(Self::new(levels, repeat))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn read_level(&mut self) -> Level {
        if self.levels.is_empty() {
            return Level::High;
        }

        if self.position >= self.levels.len() {
            if self.repeat {
                self.position = 0;
            } else {
                return self.levels[self.levels.len() - 1];
            }
        }

        let level = self.levels[self.position];
        self.position += 1;
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_maps_digits_to_levels() {
        let mut input = ScriptedInput::from_pattern("1 0_1", false).unwrap();
        assert_eq!(input.len(), 3);
        assert_eq!(input.read_level(), Level::High);
        assert_eq!(input.read_level(), Level::Low);
        assert_eq!(input.read_level(), Level::High);
    }

    #[test]
    fn pattern_rejects_unknown_characters() {
        assert!(matches!(
            ScriptedInput::from_pattern("10x", false),
            Err(DeviceError::InvalidScript('x'))
        ));
    }

    #[test]
    fn exhausted_script_holds_last_level() {
        let mut input = ScriptedInput::from_pattern("10", false).unwrap();
        input.read_level();
        input.read_level();
        assert_eq!(input.read_level(), Level::Low);
        assert_eq!(input.read_level(), Level::Low);
    }

    #[test]
    fn repeating_script_wraps_around() {
        let mut input = ScriptedInput::from_pattern("10", true).unwrap();
        let levels: Vec<Level> = (0..4).map(|_| input.read_level()).collect();
        assert_eq!(levels, vec![Level::High, Level::Low, Level::High, Level::Low]);
    }

    #[test]
    fn empty_script_reads_released() {
        let mut input = ScriptedInput::new(Vec::new(), true);
        assert_eq!(input.read_level(), Level::High);
    }
}
