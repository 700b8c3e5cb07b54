// StimulusBuffer - N-channel synthesized waveform for one trial

use std::path::Path;

use crate::stimulus::warble;

/// Multi-channel stimulus waveform
///
/// Channels are stored one after another (column-major: one column per
/// channel) in the same order as the allocated phases.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusBuffer {
    sample_rate: u32,
    carrier_hz: f64,
    duration_s: f64,
    phases: Vec<f64>,
    channels: Vec<Vec<f32>>,
}

impl StimulusBuffer {
    pub(crate) fn new(
        sample_rate: u32,
        carrier_hz: f64,
        duration_s: f64,
        phases: Vec<f64>,
        channels: Vec<Vec<f32>>,
    ) -> Self {
        debug_assert_eq!(phases.len(), channels.len());
        Self {
            sample_rate,
            carrier_hz,
            duration_s,
            phases,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn carrier_hz(&self) -> f64 {
        self.carrier_hz
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    /// Starting phase (radians) of each channel
    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// (samples, channels)
    pub fn shape(&self) -> (usize, usize) {
        (self.frames(), self.num_channels())
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// RMS level of one channel in dB FS
    pub fn channel_rms_db(&self, index: usize) -> Option<f64> {
        self.channel(index).map(|samples| {
            let as_f64: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
            warble::amplitude_to_db(warble::rms(&as_f64))
        })
    }

    /// Frame-interleaved samples, as expected by audio backends and WAV files
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let mut out = Vec::with_capacity(frames * self.num_channels());
        for frame in 0..frames {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    /// Writes the buffer as a 32-bit float WAV file
    pub fn write_wav<P: AsRef<Path>>(&self, path: P) -> hound::Result<()> {
        let spec = hound::WavSpec {
            channels: self.num_channels() as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for sample in self.interleaved() {
            writer.write_sample(sample)?;
        }
        writer.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel() -> StimulusBuffer {
        StimulusBuffer::new(
            8000,
            1000.0,
            0.0005,
            vec![0.0, 1.0],
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![-1.0, -2.0, -3.0, -4.0]],
        )
    }

    #[test]
    fn test_shape_and_channels() {
        let buffer = two_channel();
        assert_eq!(buffer.shape(), (4, 2));
        assert_eq!(buffer.channel(1), Some(&[-1.0f32, -2.0, -3.0, -4.0][..]));
        assert!(buffer.channel(2).is_none());
    }

    #[test]
    fn test_interleaved_order() {
        let buffer = two_channel();
        assert_eq!(
            buffer.interleaved(),
            vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0, 4.0, -4.0]
        );
    }

    #[test]
    fn test_write_wav_round_trip_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stim.wav");
        let buffer = two_channel();
        buffer.write_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 8000);
        assert_eq!(reader.len(), 8);
    }
}
