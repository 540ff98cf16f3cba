use crate::simulation::Simulation;
use crate::sweep::PartitionExecutor;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Calculate autocorrelations of observables sampled from a running simulation.
pub trait MagnetizationAutoCorrelations {
    /// Sample magnetization every `sampling_freq` sweeps and return its normalized circular
    /// autocorrelation, indexed by lag in samples.
    fn magnetization_autocorrelation(
        &mut self,
        sweeps: u64,
        sampling_freq: Option<u64>,
        use_fft: Option<bool>,
    ) -> Vec<f64>;
}

impl<E: PartitionExecutor> MagnetizationAutoCorrelations for Simulation<E> {
    fn magnetization_autocorrelation(
        &mut self,
        sweeps: u64,
        sampling_freq: Option<u64>,
        use_fft: Option<bool>,
    ) -> Vec<f64> {
        let samples = self
            .sweeps_sample(sweeps, sampling_freq)
            .into_iter()
            .map(|m| m.magnetization)
            .collect::<Vec<_>>();
        if use_fft.unwrap_or(true) {
            fft_autocorrelation(&samples)
        } else {
            naive_autocorrelation(&samples)
        }
    }
}

fn centered(samples: &[f64]) -> (Vec<f64>, f64) {
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let centered = samples.iter().map(|s| s - mean).collect::<Vec<_>>();
    let norm = centered.iter().map(|d| d * d).sum::<f64>();
    (centered, norm)
}

/// Circular autocorrelation via FFT, normalized so lag 0 is 1. A constant series gives NaNs.
pub fn fft_autocorrelation(samples: &[f64]) -> Vec<f64> {
    let tmax = samples.len();
    if tmax == 0 {
        return vec![];
    }
    let (centered, norm) = centered(samples);

    let mut buffer = centered
        .into_iter()
        .map(|d| Complex::new(d, 0.0))
        .collect::<Vec<Complex<f64>>>();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(tmax);
    let ifft = planner.plan_fft_inverse(tmax);

    fft.process(&mut buffer);
    buffer
        .iter_mut()
        .for_each(|c| *c = Complex::new(c.norm_sqr(), 0.0));
    ifft.process(&mut buffer);

    // The inverse transform is unnormalized.
    buffer
        .into_iter()
        .map(|c| c.re / (tmax as f64 * norm))
        .collect()
}

/// Circular autocorrelation by direct summation over lags, normalized so lag 0 is 1.
pub fn naive_autocorrelation(samples: &[f64]) -> Vec<f64> {
    let tmax = samples.len();
    if tmax == 0 {
        return vec![];
    }
    let (centered, norm) = centered(samples);
    (0..tmax)
        .into_par_iter()
        .map(|tau| {
            (0..tmax)
                .map(|t| centered[t] * centered[(t + tau) % tmax])
                .sum::<f64>()
                / norm
        })
        .collect()
}
