//! Axis remapping for the physical mounting of the part on a board.

use crate::types::{CorrectedSample, RawSample};

pub type PositionMatrix = [[i8; 3]; 3];

pub const POSITION_COUNT: usize = 8;

/// Raw counts are reported scaled down by this factor.
pub const DATA_DIVIDER: i32 = 16;

pub const POSITION_MATRICES: [PositionMatrix; POSITION_COUNT] = [
    [[ 0, -1,  0], [ 1,  0,  0], [ 0,  0,  1]],
    [[-1,  0,  0], [ 0, -1,  0], [ 0,  0,  1]],
    [[ 0,  1,  0], [-1,  0,  0], [ 0,  0,  1]],
    [[ 1,  0,  0], [ 0,  1,  0], [ 0,  0,  1]],
    [[ 0, -1,  0], [-1,  0,  0], [ 0,  0, -1]],
    [[-1,  0,  0], [ 0,  1,  0], [ 0,  0, -1]],
    [[ 0,  1,  0], [ 1,  0,  0], [ 0,  0, -1]],
    [[ 1,  0,  0], [ 0, -1,  0], [ 0,  0, -1]],
];

/// Positions outside `0..8` fall back to position 0.
pub fn clamp_position(position: i32) -> usize {
    match usize::try_from(position) {
        Ok(index) if index < POSITION_COUNT => index,
        _ => 0,
    }
}

pub fn matrix_for(position: i32) -> &'static PositionMatrix {
    &POSITION_MATRICES[clamp_position(position)]
}

pub fn transform(raw: RawSample, position: i32) -> CorrectedSample {
    let matrix = matrix_for(position);
    let axes = raw.axes();

    let mut out = [0i16; 3];
    for (i, row) in matrix.iter().enumerate() {
        let sum: i32 = row
            .iter()
            .zip(axes.iter())
            .map(|(&m, &a)| i32::from(a) * i32::from(m))
            .sum();
        // |sum| <= 3 * 32768, so the quotient always fits
        out[i] = (sum / DATA_DIVIDER) as i16;
    }

    CorrectedSample { x: out[0], y: out[1], z: out[2] }
}
