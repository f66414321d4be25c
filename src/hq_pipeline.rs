//! Optional high-quality oversampling pipeline.
//!
//! Generates samples at 8x the target output rate, interpolates with a
//! cubic (Catmull-Rom) kernel, decimates through a 192-tap symmetric FIR
//! low-pass filter, and finally removes DC offset. Enabled via
//! [`crate::Config::high_quality`]; the basic [`crate::SampleGenerator`]
//! path skips all of this.

use crate::sample_generator::SampleGenerator;

/// Oversampling factor used by the HQ pipeline.
pub const OVERSAMPLE_FACTOR: usize = 8;

/// Number of taps in the decimation FIR filter.
pub const FIR_TAPS: usize = 192;

/// Cubic (Catmull-Rom style) interpolator over a 4-sample sliding window.
///
/// Used to reconstruct a continuous waveform from the chip's raw sample
/// stream before oversampled decimation.
#[derive(Debug, Clone)]
pub struct CubicInterpolator {
    window: [f32; 4],
}

impl CubicInterpolator {
    /// Creates an interpolator with a silent history window.
    pub fn new() -> Self {
        Self { window: [0.0; 4] }
    }

    /// Pushes a new raw sample into the history window, discarding the
    /// oldest.
    pub fn push(&mut self, sample: f32) {
        self.window.copy_within(1..4, 0);
        self.window[3] = sample;
    }

    /// Interpolates a value at fractional position `x` in `[0.0, 1.0)`
    /// between `window[1]` and `window[2]`, using `window[0]` and
    /// `window[3]` as the surrounding control points.
    ///
    /// Uses the three-coefficient form AYUMI derives from a Catmull-Rom
    /// spline (spec §4.11): `c0 = 0.5*y1 + 0.25*(y0+y2)`,
    /// `c1 = 0.5*(y2-y0)`, `c2 = 0.25*(y3-y1-(y2-y0))`,
    /// `value(x) = (c2*x + c1)*x + c0`.
    pub fn interpolate(&self, x: f32) -> f32 {
        let [y0, y1, y2, y3] = self.window;
        let c0 = 0.5 * y1 + 0.25 * (y0 + y2);
        let c1 = 0.5 * (y2 - y0);
        let c2 = 0.25 * (y3 - y1 - (y2 - y0));
        (c2 * x + c1) * x + c0
    }
}

impl Default for CubicInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates the 192-tap symmetric low-pass FIR used to decimate the 8x
/// oversampled stream back down to the target rate.
///
/// The coefficients are a windowed-sinc low-pass with cutoff at
/// `1 / (2 * OVERSAMPLE_FACTOR)` of the oversampled rate, Hamming-windowed
/// for reasonable stopband attenuation without a steep transition.
fn build_fir_coefficients() -> [f32; FIR_TAPS] {
    let mut coeffs = [0.0f32; FIR_TAPS];
    let cutoff = 1.0 / OVERSAMPLE_FACTOR as f32;
    let center = (FIR_TAPS - 1) as f32 / 2.0;
    let mut sum = 0.0f32;
    for (i, coeff) in coeffs.iter_mut().enumerate() {
        let x = i as f32 - center;
        let sinc = if x.abs() < 1e-6 {
            cutoff
        } else {
            (std::f32::consts::PI * cutoff * x).sin() / (std::f32::consts::PI * x)
        };
        let window = 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / (FIR_TAPS - 1) as f32).cos();
        *coeff = sinc * window;
        sum += *coeff;
    }
    // Normalize to unity DC gain.
    for coeff in &mut coeffs {
        *coeff /= sum;
    }
    coeffs
}

/// Symmetric FIR low-pass decimation filter.
#[derive(Debug, Clone)]
pub struct Decimator {
    coefficients: [f32; FIR_TAPS],
    history: [f32; FIR_TAPS],
    write_pos: usize,
}

impl Decimator {
    /// Creates a decimator with a silent history buffer.
    pub fn new() -> Self {
        Self {
            coefficients: build_fir_coefficients(),
            history: [0.0; FIR_TAPS],
            write_pos: 0,
        }
    }

    /// Pushes one oversampled input sample into the filter's history.
    pub fn push(&mut self, sample: f32) {
        self.history[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % FIR_TAPS;
    }

    /// Convolves the current history against the filter taps, producing one
    /// decimated output sample.
    pub fn output(&self) -> f32 {
        let mut acc = 0.0f32;
        for (i, &coeff) in self.coefficients.iter().enumerate() {
            let idx = (self.write_pos + i) % FIR_TAPS;
            acc += self.history[idx] * coeff;
        }
        acc
    }
}

impl Default for Decimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes DC offset via a running average subtracted from the input,
/// matching the reference implementation's moving-average DC blocker.
#[derive(Debug, Clone)]
pub struct DcBlockingFilter {
    history: Vec<f32>,
    write_pos: usize,
    sum: f32,
}

/// Window length for the moving-average DC estimate.
pub const DC_FILTER_WINDOW: usize = 1024;

impl DcBlockingFilter {
    /// Creates a DC blocking filter with a silent history window.
    pub fn new() -> Self {
        Self {
            history: vec![0.0; DC_FILTER_WINDOW],
            write_pos: 0,
            sum: 0.0,
        }
    }

    /// Processes one sample, returning the DC-blocked output.
    pub fn process(&mut self, sample: f32) -> f32 {
        self.sum -= self.history[self.write_pos];
        self.history[self.write_pos] = sample;
        self.sum += sample;
        self.write_pos = (self.write_pos + 1) % self.history.len();
        let dc_estimate = self.sum / self.history.len() as f32;
        sample - dc_estimate
    }
}

impl Default for DcBlockingFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Full HQ pipeline: oversampled generation, cubic interpolation, FIR
/// decimation, and DC blocking, producing output at the generator's
/// configured target sample rate.
#[derive(Debug)]
pub struct HqPipeline {
    generator: SampleGenerator,
    interpolator: CubicInterpolator,
    decimator: Decimator,
    dc_filter: DcBlockingFilter,
}

impl HqPipeline {
    /// Wraps a [`SampleGenerator`] with the oversampling/decimation chain.
    pub fn new(generator: SampleGenerator) -> Self {
        Self {
            generator,
            interpolator: CubicInterpolator::new(),
            decimator: Decimator::new(),
            dc_filter: DcBlockingFilter::new(),
        }
    }

    /// Returns a mutable reference to the wrapped generator's chip core.
    pub fn core_mut(&mut self) -> &mut crate::chip::Core {
        self.generator.core_mut()
    }

    /// Produces one output sample at the target sample rate: advances the
    /// underlying generator by exactly one raw sample, reconstructs
    /// `OVERSAMPLE_FACTOR` interpolated points between it and its
    /// predecessor, pushes all of them through the decimation FIR, and keeps
    /// only the first filtered value (the same 8x-decimation convention the
    /// AYUMI-derived reference uses), then removes DC offset.
    ///
    /// # Errors
    /// Propagates any error from the underlying [`SampleGenerator`].
    pub fn next_sample(&mut self) -> crate::Result<f32> {
        let raw = self.generator.next_sample()?;
        self.interpolator.push(raw);
        let mut decimated = 0.0;
        for i in 0..OVERSAMPLE_FACTOR {
            let t = i as f32 / OVERSAMPLE_FACTOR as f32;
            let interpolated = self.interpolator.interpolate(t);
            self.decimator.push(interpolated);
            if i == 0 {
                decimated = self.decimator.output();
            }
        }
        Ok(self.dc_filter.process(decimated))
    }

    /// Fills `output` with consecutive HQ-pipeline samples.
    ///
    /// # Errors
    /// Propagates any error from [`HqPipeline::next_sample`].
    pub fn generate(&mut self, output: &mut [f32]) -> crate::Result<()> {
        for slot in output.iter_mut() {
            *slot = self.next_sample()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn fir_coefficients_are_unity_dc_gain() {
        let coeffs = build_fir_coefficients();
        let sum: f32 = coeffs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3);
    }

    #[test]
    fn fir_coefficients_are_symmetric() {
        let coeffs = build_fir_coefficients();
        for i in 0..FIR_TAPS / 2 {
            assert!((coeffs[i] - coeffs[FIR_TAPS - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn cubic_interpolator_passes_through_constant_signal() {
        let mut interp = CubicInterpolator::new();
        for _ in 0..4 {
            interp.push(0.5);
        }
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((interp.interpolate(t) - 0.5).abs() < 1e-4);
        }
    }

    #[test]
    fn dc_blocking_filter_removes_constant_offset() {
        let mut filter = DcBlockingFilter::new();
        let mut last = 0.0;
        for _ in 0..DC_FILTER_WINDOW * 2 {
            last = filter.process(0.3);
        }
        assert!(last.abs() < 0.05, "offset should decay close to zero: {last}");
    }

    #[test]
    fn hq_pipeline_produces_finite_samples() {
        let generator = SampleGenerator::new(Config::default());
        let mut pipeline = HqPipeline::new(generator);
        pipeline.core_mut().write(0, 0x10).unwrap();
        pipeline.core_mut().write(7, 0b0011_1110).unwrap();
        pipeline.core_mut().write(8, 0x0F).unwrap();
        let mut buffer = [0.0f32; 64];
        pipeline.generate(&mut buffer).unwrap();
        for sample in buffer {
            assert!(sample.is_finite());
        }
    }
}
