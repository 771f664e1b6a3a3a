use heapless::spsc::Producer;
use log::warn;

use crate::types::CorrectedSample;

/// Destination for reported samples. One call carries x, y and z followed by
/// the frame's sync marker.
pub trait SampleSink {
    fn report(&mut self, sample: CorrectedSample);
}

impl<S: SampleSink + ?Sized> SampleSink for &mut S {
    fn report(&mut self, sample: CorrectedSample) {
        (**self).report(sample)
    }
}

impl<const N: usize> SampleSink for Producer<'_, CorrectedSample, N> {
    fn report(&mut self, sample: CorrectedSample) {
        if self.enqueue(sample).is_err() {
            warn!("sample queue full, dropping {:?}", sample);
        }
    }
}
