//! Понижение разрешения по частоте и времени усреднением.
//!
//! Каждая операция возвращает новую матрицу и обновляет поля заголовка только
//! после успешного вычисления. Ось интерфейсов не затрагивается.

use std::ops::Range;

use log::debug;
use sigfil_types::{keys, Axis, FilError, FilResult, HeaderDictionary};

use crate::matrix::{Dims, SampleMatrix};

/// Секунд в сутках (tstart хранится в MJD)
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Необязательный поддиапазон осей. `None` — ось целиком.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecimationWindow {
    pub samples: Option<Range<usize>>,
    pub channels: Option<Range<usize>>,
}

/// План децимации: сначала каналы, затем отсчёты.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimationPlan {
    /// Сколько соседних каналов усреднять
    pub channel_factor: usize,
    /// Сколько соседних отсчётов усреднять
    pub sample_factor: usize,
    /// Обрабатываемый поддиапазон
    pub window: DecimationWindow,
}

////////////////////////////////////////////////////////////////////////////////
// DecimationWindow, DecimationPlan
////////////////////////////////////////////////////////////////////////////////

impl DecimationWindow {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn with_samples(
        mut self,
        range: Range<usize>,
    ) -> Self {
        self.samples = Some(range);
        self
    }

    pub fn with_channels(
        mut self,
        range: Range<usize>,
    ) -> Self {
        self.channels = Some(range);
        self
    }

    /// Диапазон по оси `axis` длины `size`.
    pub fn resolve(
        &self,
        axis: Axis,
        size: usize,
    ) -> FilResult<Range<usize>> {
        let range = match axis {
            Axis::Sample => self.samples.clone(),
            Axis::Channel => self.channels.clone(),
            Axis::Interface => None,
        };

        match range {
            None => Ok(0..size),
            Some(r) if r.start <= r.end && r.end <= size => Ok(r),
            Some(r) => Err(FilError::InvalidRange {
                axis,
                start: r.start,
                end: r.end,
                size,
            }),
        }
    }
}

impl DecimationPlan {
    pub fn new(
        channel_factor: usize,
        sample_factor: usize,
    ) -> Self {
        Self {
            channel_factor,
            sample_factor,
            window: DecimationWindow::full(),
        }
    }

    pub fn with_window(
        mut self,
        window: DecimationWindow,
    ) -> Self {
        self.window = window;
        self
    }

    /// Применяет план. Заголовок меняется только при успехе обоих шагов.
    pub fn apply(
        &self,
        matrix: &SampleMatrix,
        header: &mut HeaderDictionary,
    ) -> FilResult<SampleMatrix> {
        let mut staged = header.clone();

        let by_channel = combine_channels_in(matrix, &mut staged, self.channel_factor, &self.window)?;
        let by_sample = combine_samples(&by_channel, &mut staged, self.sample_factor)?;

        *header = staged;

        Ok(by_sample)
    }
}

impl Default for DecimationPlan {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Усреднение каналов
////////////////////////////////////////////////////////////////////////////////

/// Усредняет группы по `factor` соседних каналов по всей матрице.
///
/// `out[s][f][c] = mean(in[s][f][c*factor .. c*factor + factor])`
pub fn combine_channels(
    matrix: &SampleMatrix,
    header: &mut HeaderDictionary,
    factor: usize,
) -> FilResult<SampleMatrix> {
    combine_channels_in(matrix, header, factor, &DecimationWindow::full())
}

/// Как [`combine_channels`], но только внутри окна `window`.
///
/// Результат содержит только окно; `fch1` и `tstart` сдвигаются к его началу,
/// `foff` умножается на `factor`.
pub fn combine_channels_in(
    matrix: &SampleMatrix,
    header: &mut HeaderDictionary,
    factor: usize,
    window: &DecimationWindow,
) -> FilResult<SampleMatrix> {
    let dims = matrix.dims();
    let samples = window.resolve(Axis::Sample, dims.n_samples)?;
    let channels = window.resolve(Axis::Channel, dims.n_channels)?;

    check_factor(Axis::Channel, channels.len(), factor)?;

    let out_dims = Dims::new(samples.len(), dims.n_ifs, channels.len() / factor);
    let mut out = Vec::with_capacity(out_dims.len());

    for s in samples.clone() {
        for f in 0..dims.n_ifs {
            let spectrum = &matrix.spectrum(s, f)[channels.clone()];
            out.extend(spectrum.chunks_exact(factor).map(mean));
        }
    }

    debug!(
        "combine_channels: factor={factor}, {}x{}x{} -> {}x{}x{}",
        dims.n_samples,
        dims.n_ifs,
        dims.n_channels,
        out_dims.n_samples,
        out_dims.n_ifs,
        out_dims.n_channels,
    );

    let result = SampleMatrix::new(out_dims, out)?;

    shift_time_origin(header, samples.start);
    rescale_frequency_axis(header, channels.start, factor);
    header.set_n_channels(out_dims.n_channels);
    header.set_n_samples(out_dims.n_samples);

    Ok(result)
}

////////////////////////////////////////////////////////////////////////////////
// Усреднение отсчётов
////////////////////////////////////////////////////////////////////////////////

/// Усредняет группы по `factor` соседних отсчётов по всей матрице.
///
/// `out[s][f][c] = mean(in[s*factor .. s*factor + factor][f][c])`; `tsamp`
/// умножается на `factor`.
pub fn combine_samples(
    matrix: &SampleMatrix,
    header: &mut HeaderDictionary,
    factor: usize,
) -> FilResult<SampleMatrix> {
    combine_samples_in(matrix, header, factor, &DecimationWindow::full())
}

/// Как [`combine_samples`], но только внутри окна `window`.
pub fn combine_samples_in(
    matrix: &SampleMatrix,
    header: &mut HeaderDictionary,
    factor: usize,
    window: &DecimationWindow,
) -> FilResult<SampleMatrix> {
    let dims = matrix.dims();
    let samples = window.resolve(Axis::Sample, dims.n_samples)?;
    let channels = window.resolve(Axis::Channel, dims.n_channels)?;

    check_factor(Axis::Sample, samples.len(), factor)?;

    let out_dims = Dims::new(samples.len() / factor, dims.n_ifs, channels.len());
    let mut out = Vec::with_capacity(out_dims.len());
    let mut acc = vec![0.0f64; channels.len()];

    for group in 0..out_dims.n_samples {
        let first = samples.start + group * factor;

        for f in 0..dims.n_ifs {
            acc.iter_mut().for_each(|a| *a = 0.0);

            for s in first..first + factor {
                let spectrum = &matrix.spectrum(s, f)[channels.clone()];
                for (a, &v) in acc.iter_mut().zip(spectrum) {
                    *a += v as f64;
                }
            }

            out.extend(acc.iter().map(|&a| (a / factor as f64) as f32));
        }
    }

    debug!(
        "combine_samples: factor={factor}, {}x{}x{} -> {}x{}x{}",
        dims.n_samples,
        dims.n_ifs,
        dims.n_channels,
        out_dims.n_samples,
        out_dims.n_ifs,
        out_dims.n_channels,
    );

    let result = SampleMatrix::new(out_dims, out)?;

    shift_time_origin(header, samples.start);
    rescale_frequency_axis(header, channels.start, 1);
    if factor > 1 && header.contains(keys::TSAMP) {
        header.set_tsamp(header.tsamp() * factor as f64);
    }
    header.set_n_channels(out_dims.n_channels);
    header.set_n_samples(out_dims.n_samples);

    Ok(result)
}

/// Фактор для получения `target` выходных отсчётов из `n_samples`.
///
/// Фактор равен `n_samples / target` и обязан делить `n_samples` нацело.
pub fn sample_factor_for_output(
    n_samples: usize,
    target: usize,
) -> FilResult<usize> {
    let factor = n_samples.checked_div(target).unwrap_or(0);

    check_factor(Axis::Sample, n_samples, factor)?;

    Ok(factor)
}

fn check_factor(
    axis: Axis,
    size: usize,
    factor: usize,
) -> FilResult<()> {
    if factor == 0 || size % factor != 0 {
        return Err(FilError::Dimension { axis, size, factor });
    }

    Ok(())
}

fn mean(group: &[f32]) -> f32 {
    let sum: f64 = group.iter().map(|&v| v as f64).sum();
    (sum / group.len() as f64) as f32
}

// fch1 переносится на среднюю частоту первой группы выходного окна.
fn rescale_frequency_axis(
    header: &mut HeaderDictionary,
    first_channel: usize,
    factor: usize,
) {
    if first_channel == 0 && factor == 1 {
        return;
    }

    let foff = header.foff();

    if header.contains(keys::FCH1) {
        let first_freq = header.channel_freq(first_channel);
        header.set_fch1(first_freq + (factor - 1) as f64 * foff / 2.0);
    }

    if factor > 1 && header.contains(keys::FOFF) {
        header.set_foff(foff * factor as f64);
    }
}

fn shift_time_origin(
    header: &mut HeaderDictionary,
    first_sample: usize,
) {
    if first_sample == 0 || !header.contains(keys::TSTART) {
        return;
    }

    let offset_days = first_sample as f64 * header.tsamp() / SECONDS_PER_DAY;
    header.set_tstart(header.tstart() + offset_days);
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use sigfil_types::ErrorKind;

    use super::*;

    fn header_for(dims: Dims) -> HeaderDictionary {
        let mut h = HeaderDictionary::new();
        h.set("nbits", 32u32).unwrap();
        h.set_n_samples(dims.n_samples);
        h.set_n_ifs(dims.n_ifs);
        h.set_n_channels(dims.n_channels);
        h.set_fch1(1400.0);
        h.set_foff(-1.0);
        h.set_tsamp(64e-6);
        h
    }

    fn ramp(dims: Dims) -> SampleMatrix {
        SampleMatrix::from_fn(dims, |s, f, c| (s * 100 + f * 1000 + c) as f32)
    }

    #[test]
    fn test_combine_channels_concrete_case() {
        let dims = Dims::new(2, 1, 4);
        let m = SampleMatrix::new(dims, vec![1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0]).unwrap();
        let mut h = header_for(dims);

        let out = combine_channels(&m, &mut h, 2).unwrap();

        assert_eq!(out.dims(), Dims::new(2, 1, 2));
        assert_eq!(out.spectrum(0, 0), &[1.5, 3.5]);
        assert_eq!(out.spectrum(1, 0), &[15.0, 35.0]);
        assert_eq!(h.n_channels(), 2);
        assert_eq!(h.n_samples(), 2);
    }

    #[test]
    fn test_combine_channels_updates_frequency_axis() {
        let dims = Dims::new(1, 1, 8);
        let mut h = header_for(dims);
        let band_middle = |h: &HeaderDictionary| h.channel_freq(h.n_channels() - 1) / 2.0 + h.fch1() / 2.0;
        let before = band_middle(&h);

        combine_channels(&ramp(dims), &mut h, 4).unwrap();

        assert_eq!(h.foff(), -4.0);
        assert_eq!(h.fch1(), 1398.5);
        assert_eq!(h.channel_freq(1), 1394.5);
        assert_eq!(band_middle(&h), before, "середина полосы не смещается");
    }

    #[test]
    fn test_factor_one_is_identity() {
        let dims = Dims::new(3, 2, 6);
        let m = ramp(dims);
        let mut h = header_for(dims);
        let before = h.clone();

        assert_eq!(combine_channels(&m, &mut h, 1).unwrap(), m);
        assert_eq!(combine_samples(&m, &mut h, 1).unwrap(), m);
        assert_eq!(h, before);
    }

    #[test]
    fn test_combine_samples_scales_tsamp() {
        let dims = Dims::new(4, 2, 3);
        let m = ramp(dims);
        let mut h = header_for(dims);

        let out = combine_samples(&m, &mut h, 2).unwrap();

        assert_eq!(out.dims(), Dims::new(2, 2, 3));
        // Отсчёты 0 и 1: (0 + 100) / 2
        assert_eq!(out.get(0, 0, 0), 50.0);
        // Отсчёты 2 и 3, интерфейс 1, канал 2: (1202 + 1302) / 2
        assert_eq!(out.get(1, 1, 2), 1252.0);
        assert_eq!(h.n_samples(), 2);
        assert_eq!(h.tsamp(), 128e-6);
        assert_eq!(h.n_ifs(), 2);
    }

    #[test]
    fn test_dimension_errors() {
        let dims = Dims::new(6, 1, 10);
        let m = ramp(dims);
        let mut h = header_for(dims);
        let before = h.clone();

        let err = combine_channels(&m, &mut h, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimension);
        assert!(combine_channels(&m, &mut h, 5).is_ok());

        let mut h = before.clone();
        let err = combine_samples(&m, &mut h, 4).unwrap_err();
        assert!(matches!(
            err,
            FilError::Dimension {
                axis: Axis::Sample,
                size: 6,
                factor: 4
            }
        ));
        assert_eq!(h, before, "заголовок не меняется при ошибке");

        assert!(combine_samples(&m, &mut h, 0).is_err());
    }

    #[test]
    fn test_combinations_commute() {
        let dims = Dims::new(8, 2, 12);
        let m = ramp(dims);

        let mut h1 = header_for(dims);
        let a = combine_channels(&m, &mut h1, 3).unwrap();
        let a = combine_samples(&a, &mut h1, 4).unwrap();

        let mut h2 = header_for(dims);
        let b = combine_samples(&m, &mut h2, 4).unwrap();
        let b = combine_channels(&b, &mut h2, 3).unwrap();

        assert_eq!(a, b);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_window_crops_and_shifts_origin() {
        let dims = Dims::new(6, 1, 8);
        let m = ramp(dims);
        let mut h = header_for(dims);
        h.set_tstart(60_000.0);

        let window = DecimationWindow::full()
            .with_samples(2..6)
            .with_channels(4..8);
        let out = combine_channels_in(&m, &mut h, 2, &window).unwrap();

        assert_eq!(out.dims(), Dims::new(4, 1, 2));
        // Отсчёт 2, каналы 4,5 и 6,7
        assert_eq!(out.spectrum(0, 0), &[204.5, 206.5]);
        assert_eq!(h.n_samples(), 4);
        assert_eq!(h.fch1(), 1400.0 - 4.0 - 0.5);
        assert!(h.tstart() > 60_000.0);
    }

    #[test]
    fn test_sample_window_crops_and_shifts_origin() {
        let dims = Dims::new(8, 1, 8);
        let m = ramp(dims);
        let mut h = header_for(dims);
        h.set_tstart(60_000.0);

        let window = DecimationWindow::full()
            .with_samples(2..6)
            .with_channels(4..8);
        let out = combine_samples_in(&m, &mut h, 2, &window).unwrap();

        assert_eq!(out.dims(), Dims::new(2, 1, 4));
        // Отсчёты 2,3 и 4,5 в каналах 4..8
        assert_eq!(out.spectrum(0, 0), &[254.0, 255.0, 256.0, 257.0]);
        assert_eq!(out.spectrum(1, 0), &[454.0, 455.0, 456.0, 457.0]);

        // Начало окна считается по исходному tsamp
        assert_eq!(h.tstart(), 60_000.0 + 2.0 * 64e-6 / SECONDS_PER_DAY);
        assert_eq!(h.tsamp(), 128e-6);
        assert_eq!(h.fch1(), 1396.0);
        assert_eq!(h.foff(), -1.0);
        assert_eq!(h.n_samples(), 2);
        assert_eq!(h.n_channels(), 4);
    }

    #[test]
    fn test_zero_channels() {
        let dims = Dims::new(2, 1, 0);
        let m = SampleMatrix::zeros(dims);

        let mut h = header_for(dims);
        let out = combine_channels(&m, &mut h, 1).unwrap();
        assert_eq!(out.dims(), dims);

        let mut h = header_for(dims);
        let out = combine_samples(&m, &mut h, 2).unwrap();
        assert_eq!(out.dims(), Dims::new(1, 1, 0));
        assert!(out.is_empty());
    }

    #[test]
    fn test_window_out_of_range() {
        let dims = Dims::new(4, 1, 4);
        let mut h = header_for(dims);
        let window = DecimationWindow::full().with_channels(2..6);

        let err = combine_channels_in(&ramp(dims), &mut h, 2, &window).unwrap_err();
        assert!(matches!(err, FilError::InvalidRange { .. }));
    }

    #[test]
    fn test_plan_and_target_count() {
        let dims = Dims::new(12, 1, 8);
        let m = ramp(dims);
        let mut h = header_for(dims);

        let factor = sample_factor_for_output(12, 3).unwrap();
        assert_eq!(factor, 4);

        let out = DecimationPlan::new(2, factor).apply(&m, &mut h).unwrap();
        assert_eq!(out.dims(), Dims::new(3, 1, 4));
        assert_eq!(h.tsamp(), 256e-6);

        assert!(sample_factor_for_output(12, 0).is_err());
        assert!(sample_factor_for_output(12, 24).is_err());
        // 10 / 4 = 2, 10 % 2 == 0: пять выходных отсчётов
        assert_eq!(sample_factor_for_output(10, 4).unwrap(), 2);
    }

    #[test]
    fn test_plan_failure_leaves_header_untouched() {
        let dims = Dims::new(5, 1, 8);
        let mut h = header_for(dims);
        let before = h.clone();

        assert!(DecimationPlan::new(2, 2).apply(&ramp(dims), &mut h).is_err());
        assert_eq!(h, before);
    }
}
