//! Mean-subtracted normalized cross-correlation over RGB images.
//!
//! Each channel is centered on its own mean and the three channels are
//! normalized together, so a window scores 1 only when it repeats the
//! template's pattern in every channel; flat or merely equally bright
//! regions score near 0. The numerators for every window come from one
//! frequency-domain product; the window energies from running integer sums.
use std::fmt;
use std::sync::Arc;

use image::{ImageBuffer, Luma, RgbImage};
use rayon::prelude::*;
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner, Length};

/// One score per window position, row-major, top-left anchored.
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

const ZERO: Complex32 = Complex32::new(0.0, 0.0);

/// Row and column transforms for one frame size.
#[derive(Clone)]
struct Plan {
    width: usize,
    height: usize,
    row_forward: Arc<dyn Fft<f32>>,
    col_forward: Arc<dyn Fft<f32>>,
    row_inverse: Arc<dyn Fft<f32>>,
    col_inverse: Arc<dyn Fft<f32>>,
}

impl Plan {
    fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            width,
            height,
            row_forward: planner.plan_fft_forward(width),
            col_forward: planner.plan_fft_forward(height),
            row_inverse: planner.plan_fft_inverse(width),
            col_inverse: planner.plan_fft_inverse(height),
        }
    }

    fn len(&self) -> usize {
        self.width * self.height
    }

    /// 2D transform of a row-major buffer in which only the first `rows` rows
    /// may be non-zero. The spectrum is returned column-major.
    fn forward(&self, mut buffer: Vec<Complex32>, rows: usize) -> Vec<Complex32> {
        run(self.row_forward.as_ref(), &mut buffer[..rows * self.width]);
        let mut columns = transpose(&buffer, self.width, self.height);
        run(self.col_forward.as_ref(), &mut columns);
        columns
    }

    /// Scaled inverse of [`forward`](Self::forward), back in row-major order.
    fn inverse(&self, mut spectrum: Vec<Complex32>) -> Vec<Complex32> {
        run(self.col_inverse.as_ref(), &mut spectrum);
        let mut rows = transpose(&spectrum, self.height, self.width);
        run(self.row_inverse.as_ref(), &mut rows);
        let scale = 1.0 / self.len() as f32;
        rows.par_iter_mut().for_each(|value| *value *= scale);
        rows
    }
}

/// Apply `fft` to every consecutive chunk of its length.
fn run(fft: &dyn Fft<f32>, buffer: &mut [Complex32]) {
    let len = fft.len();
    let scratch_len = fft.get_inplace_scratch_len();
    buffer.par_chunks_mut(len).for_each_init(
        || vec![ZERO; scratch_len],
        |scratch, chunk| fft.process_with_scratch(chunk, scratch),
    );
}

/// `src` holds `rows` rows of `cols` values; the result holds `cols` rows of
/// `rows` values.
fn transpose(src: &[Complex32], cols: usize, rows: usize) -> Vec<Complex32> {
    let mut out = vec![ZERO; src.len()];
    out.par_chunks_mut(rows).enumerate().for_each(|(col, line)| {
        for (row, value) in line.iter_mut().enumerate() {
            *value = src[row * cols + col];
        }
    });
    out
}

/// Frame transform computed once per capture and shared by every template
/// lookup against that capture.
#[derive(Clone)]
pub struct FrameSpectrum {
    plan: Plan,
    /// Centered red + i·green.
    red_green: Vec<Complex32>,
    /// Centered blue.
    blue: Vec<Complex32>,
}

impl fmt::Debug for FrameSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSpectrum")
            .field("width", &self.plan.width)
            .field("height", &self.plan.height)
            .finish_non_exhaustive()
    }
}

impl FrameSpectrum {
    pub fn new(frame: &RgbImage) -> Self {
        let (width, height) = (frame.width() as usize, frame.height() as usize);
        let plan = Plan::new(width, height);
        let (red_green, blue) = pack(frame, width, height, channel_means(frame));
        let red_green = plan.forward(red_green, height);
        let blue = plan.forward(blue, height);
        Self {
            plan,
            red_green,
            blue,
        }
    }
}

/// Score every placement of `template` inside `frame`.
///
/// `spectrum` must come from `frame`. Returns `None` when the template is
/// empty or does not fit. Windows or templates without any variation score 0.
pub fn match_color(
    frame: &RgbImage,
    spectrum: &FrameSpectrum,
    template: &RgbImage,
) -> Option<ScoreMap> {
    let (fw, fh) = frame.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > fw || th > fh {
        return None;
    }
    let plan = &spectrum.plan;

    let means = channel_means(template);
    let template_energy: f64 = template
        .pixels()
        .flat_map(|p| (0..3).map(move |c| f64::from(p.0[c]) - means[c]))
        .map(|d| d * d)
        .sum();

    // Re[(fR + i·fG)·conj(tR + i·tG)] = fR·tR + fG·tG, so two products and a
    // single inverse transform give the summed correlation of all channels.
    let (red_green, blue) = pack(template, plan.width, plan.height, means);
    let red_green = plan.forward(red_green, th as usize);
    let mut product: Vec<Complex32> = spectrum
        .red_green
        .par_iter()
        .zip(red_green.par_iter())
        .map(|(f, t)| *f * t.conj())
        .collect();
    drop(red_green);
    let blue = plan.forward(blue, th as usize);
    product
        .par_iter_mut()
        .zip(spectrum.blue.par_iter().zip(blue.par_iter()))
        .for_each(|(p, (f, t))| *p += *f * t.conj());
    drop(blue);
    let numerators = plan.inverse(product);

    let (out_w, out_h) = (fw - tw + 1, fh - th + 1);
    let pixels = f64::from(tw * th);
    let energies = window_energies(frame, tw as usize, th as usize);
    let scores = energies
        .par_iter()
        .enumerate()
        .map(|(i, &energy)| {
            if energy == 0 || template_energy <= f64::EPSILON {
                return 0.0;
            }
            let (x, y) = (i % out_w as usize, i / out_w as usize);
            let numerator = f64::from(numerators[y * plan.width + x].re);
            let denominator = (energy as f64 / pixels * template_energy).sqrt();
            (numerator / denominator).clamp(-1.0, 1.0) as f32
        })
        .collect();

    ScoreMap::from_raw(out_w, out_h, scores)
}

fn channel_means(image: &RgbImage) -> [f64; 3] {
    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, &value) in sums.iter_mut().zip(&pixel.0) {
            *sum += u64::from(value);
        }
    }
    let count = (u64::from(image.width()) * u64::from(image.height())).max(1) as f64;
    sums.map(|sum| sum as f64 / count)
}

/// Place `image` at the origin of a `width × height` plane, each channel
/// shifted by its mean, packed as (red + i·green, blue).
fn pack(
    image: &RgbImage,
    width: usize,
    height: usize,
    means: [f64; 3],
) -> (Vec<Complex32>, Vec<Complex32>) {
    let mut red_green = vec![ZERO; width * height];
    let mut blue = vec![ZERO; width * height];
    let centered = |value: u8, channel: usize| (f64::from(value) - means[channel]) as f32;
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let at = y as usize * width + x as usize;
        red_green[at] = Complex32::new(centered(r, 0), centered(g, 1));
        blue[at] = Complex32::new(centered(b, 2), 0.0);
    }
    (red_green, blue)
}

/// For every `tw × th` window, `Σ_c (n·Σv² − (Σv)²)` over its pixels, which is
/// `n` times the window's centered energy. Exact integer arithmetic with
/// running column sums.
fn window_energies(frame: &RgbImage, tw: usize, th: usize) -> Vec<u64> {
    let (fw, fh) = (frame.width() as usize, frame.height() as usize);
    let (out_w, out_h) = (fw - tw + 1, fh - th + 1);
    let n = (tw * th) as u64;
    let raw = frame.as_raw();

    let mut columns = ColumnSums::new(fw);
    for y in 0..th {
        columns.add_row(raw, y);
    }

    let mut energies = Vec::with_capacity(out_w * out_h);
    for top in 0..out_h {
        if top > 0 {
            columns.remove_row(raw, top - 1);
            columns.add_row(raw, top + th - 1);
        }

        let mut sum = [0u64; 3];
        let mut squares = [0u64; 3];
        for x in 0..tw {
            columns.add_to(x, &mut sum, &mut squares);
        }
        for left in 0..out_w {
            if left > 0 {
                columns.remove_from(left - 1, &mut sum, &mut squares);
                columns.add_to(left + tw - 1, &mut sum, &mut squares);
            }
            energies.push((0..3).map(|c| n * squares[c] - sum[c] * sum[c]).sum());
        }
    }
    energies
}

/// Per-column channel sums over a band of rows.
struct ColumnSums {
    width: usize,
    sum: Vec<[u64; 3]>,
    squares: Vec<[u64; 3]>,
}

impl ColumnSums {
    fn new(width: usize) -> Self {
        Self {
            width,
            sum: vec![[0; 3]; width],
            squares: vec![[0; 3]; width],
        }
    }

    fn row<'a>(&self, raw: &'a [u8], y: usize) -> &'a [u8] {
        &raw[y * self.width * 3..(y + 1) * self.width * 3]
    }

    fn add_row(&mut self, raw: &[u8], y: usize) {
        let row = self.row(raw, y);
        for (x, pixel) in row.chunks_exact(3).enumerate() {
            for c in 0..3 {
                let v = u64::from(pixel[c]);
                self.sum[x][c] += v;
                self.squares[x][c] += v * v;
            }
        }
    }

    fn remove_row(&mut self, raw: &[u8], y: usize) {
        let row = self.row(raw, y);
        for (x, pixel) in row.chunks_exact(3).enumerate() {
            for c in 0..3 {
                let v = u64::from(pixel[c]);
                self.sum[x][c] -= v;
                self.squares[x][c] -= v * v;
            }
        }
    }

    fn add_to(&self, x: usize, sum: &mut [u64; 3], squares: &mut [u64; 3]) {
        for c in 0..3 {
            sum[c] += self.sum[x][c];
            squares[c] += self.squares[x][c];
        }
    }

    fn remove_from(&self, x: usize, sum: &mut [u64; 3], squares: &mut [u64; 3]) {
        for c in 0..3 {
            sum[c] -= self.sum[x][c];
            squares[c] -= self.squares[x][c];
        }
    }
}
