use crate::registers::SAMPLE_BURST_LEN;

/// Chip-frame sample as read from the output registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl RawSample {
    /// Assemble from an `OutXMsb`-first burst. Each axis is MSB then LSB.
    pub fn from_burst(buf: &[u8; SAMPLE_BURST_LEN]) -> Self {
        Self {
            x: i16::from_be_bytes([buf[0], buf[1]]),
            y: i16::from_be_bytes([buf[2], buf[3]]),
            z: i16::from_be_bytes([buf[4], buf[5]]),
        }
    }

    pub fn axes(&self) -> [i16; 3] {
        [self.x, self.y, self.z]
    }
}

/// Device-frame sample, remapped and scaled down for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectedSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivationState {
    #[default]
    Standby,
    Active,
}
