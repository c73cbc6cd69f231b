//! Коррекция межзвёздной дисперсии.
//!
//! Задержка канала относительно опорной частоты по закону холодной плазмы:
//!
//! ```text
//! delay(f) = K · DM · (f⁻² − f_ref⁻²),   K = 4.148808e3 с·МГц²·см³/пк
//! ```
//!
//! Каналы ниже опорной частоты запаздывают, поэтому их временной ряд
//! циклически сдвигается к началу на `round(delay / tsamp)` отсчётов.
//! Сдвиг целочисленный, без интерполяции и без потери значений.

use log::{debug, info, warn};
use sigfil_types::{keys, Axis, FilError, FilResult, HeaderDictionary};

use crate::{
    decimate::combine_channels,
    matrix::SampleMatrix,
    ridge::{estimate_dispersion_measure, DmEstimate, DmSearch, RidgeTracer},
};

/// Постоянная дисперсии, с·МГц²·см³/пк
pub const DISPERSION_CONSTANT: f64 = 4.148808e3;

/// Сколько самых ярких каналов усреднять при оценке опорной яркости
pub const DEFAULT_HIGHEST: usize = 10;

/// Задержки каналов и соответствующие им целочисленные сдвиги.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayTable {
    delays: Vec<f64>,
    shifts: Vec<i64>,
}

/// Параметры конвейера дедисперсии.
#[derive(Debug, Clone, PartialEq)]
pub struct DedispersionConfig {
    /// Заданная мера дисперсии; `None` — оценить по данным
    pub dm: Option<f64>,
    /// Опорная частота, МГц; `None` — самая высокая частота канала
    pub ref_freq: Option<f64>,
    /// k для оценки опорной яркости
    pub highest: usize,
    /// Явный порог яркости для поиска гребней
    pub threshold: Option<f32>,
    /// Максимальная задержка гребня, отсчёты
    pub max_delay: Option<usize>,
    /// Вычитать среднее по каналам из каждого спектра до коррекции
    pub subtract_mean: bool,
    /// Число выходных поддиапазонов после коррекции
    pub n_bands: Option<usize>,
    /// Новая центральная частота заголовка, МГц (сдвигает `fch1`)
    pub center_freq: Option<f64>,
}

/// Результат конвейера.
#[derive(Debug, Clone, PartialEq)]
pub struct DedispersionOutcome {
    pub matrix: SampleMatrix,
    /// Использованная мера дисперсии
    pub dm: DmEstimate,
    /// Применённая таблица задержек (до объединения поддиапазонов)
    pub delays: DelayTable,
}

////////////////////////////////////////////////////////////////////////////////
// Закон задержки
////////////////////////////////////////////////////////////////////////////////

/// Задержка в секундах на частоте `freq_mhz` относительно `ref_mhz`.
pub fn dispersion_delay(
    dm: f64,
    freq_mhz: f64,
    ref_mhz: f64,
) -> f64 {
    DISPERSION_CONSTANT * dm * (freq_mhz.powi(-2) - ref_mhz.powi(-2))
}

/// Самая высокая частота канала.
pub fn reference_frequency(header: &HeaderDictionary) -> f64 {
    let n = header.n_channels();
    if n == 0 {
        return header.fch1();
    }

    header.fch1().max(header.channel_freq(n - 1))
}

impl DelayTable {
    /// Таблица задержек для всех каналов заголовка.
    ///
    /// При `dm == 0` таблица тождественная. Иначе требуются положительные
    /// `tsamp`, опорная частота и частоты всех каналов.
    pub fn new(
        header: &HeaderDictionary,
        dm: f64,
        ref_freq: Option<f64>,
    ) -> FilResult<Self> {
        let n = header.n_channels();

        if dm == 0.0 {
            return Ok(Self::identity(n));
        }

        if !dm.is_finite() {
            return Err(FilError::format_violation(format!(
                "dispersion measure {dm} is not finite"
            )));
        }

        let tsamp = header.tsamp();
        if tsamp <= 0.0 {
            return Err(FilError::format_violation(format!(
                "tsamp must be positive for delay correction, got {tsamp}"
            )));
        }

        let ref_mhz = ref_freq.unwrap_or_else(|| reference_frequency(header));
        if ref_mhz <= 0.0 {
            return Err(FilError::format_violation(format!(
                "reference frequency must be positive, got {ref_mhz} MHz"
            )));
        }

        let mut delays = Vec::with_capacity(n);
        for c in 0..n {
            let freq = header.channel_freq(c);
            if freq <= 0.0 {
                return Err(FilError::format_violation(format!(
                    "channel {c} has non-positive frequency {freq} MHz"
                )));
            }
            delays.push(dispersion_delay(dm, freq, ref_mhz));
        }

        let shifts = delays.iter().map(|d| (d / tsamp).round() as i64).collect();

        Ok(Self { delays, shifts })
    }

    /// Таблица с заданными сдвигами в отсчётах (задержки не известны).
    pub fn from_shifts(shifts: Vec<i64>) -> Self {
        Self {
            delays: vec![0.0; shifts.len()],
            shifts,
        }
    }

    pub fn identity(n_channels: usize) -> Self {
        Self::from_shifts(vec![0; n_channels])
    }

    /// Сдвиг каждого канала, отсчёты
    pub fn shifts(&self) -> &[i64] {
        &self.shifts
    }

    /// Задержка каждого канала, секунды
    pub fn delays(&self) -> &[f64] {
        &self.delays
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Наибольший по модулю сдвиг.
    pub fn max_shift(&self) -> u64 {
        self.shifts.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0)
    }

    pub fn is_identity(&self) -> bool {
        self.shifts.iter().all(|&s| s == 0)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Коррекция
////////////////////////////////////////////////////////////////////////////////

/// Циклически сдвигает ряд каждого канала к началу на `shifts[c]` отсчётов.
///
/// `out[s][f][c] = in[(s + shifts[c]) mod n_samples][f][c]`
pub fn apply_delay_table(
    matrix: &SampleMatrix,
    table: &DelayTable,
) -> FilResult<SampleMatrix> {
    if table.len() != matrix.n_channels() {
        return Err(FilError::format_violation(format!(
            "delay table has {} channels, matrix has {}",
            table.len(),
            matrix.n_channels()
        )));
    }

    let n = matrix.n_samples();
    if n == 0 || table.is_identity() {
        return Ok(matrix.clone());
    }

    let offsets: Vec<usize> = table
        .shifts()
        .iter()
        .map(|&s| s.rem_euclid(n as i64) as usize)
        .collect();

    debug!("delay correction: max shift {} samples", table.max_shift());

    Ok(SampleMatrix::from_fn(matrix.dims(), |s, f, c| {
        matrix.get((s + offsets[c]) % n, f, c)
    }))
}

/// Коррекция задержки для меры дисперсии `dm` относительно самой высокой
/// частоты. `dm == 0` и неконечные значения дают копию без изменений.
pub fn apply_delay_correction(
    matrix: &SampleMatrix,
    header: &HeaderDictionary,
    dm: f64,
) -> FilResult<SampleMatrix> {
    if !dm.is_finite() {
        warn!("dispersion measure {dm} is not usable, applying zero delay");
        return Ok(matrix.clone());
    }

    let table = DelayTable::new(header, dm, None)?;
    apply_delay_table(matrix, &table)
}

////////////////////////////////////////////////////////////////////////////////
// Вспомогательные преобразования
////////////////////////////////////////////////////////////////////////////////

/// Опорная яркость: сумма `k` самых ярких каналов каждого отсчёта интерфейса
/// `interface`, делённая на `n_samples · k`.
///
/// `k` ограничивается числом каналов. Пустая матрица и `k == 0` дают 0.
pub fn estimate_reference_intensity(
    matrix: &SampleMatrix,
    interface: usize,
    k: usize,
) -> f32 {
    let k = k.min(matrix.n_channels());
    let n = matrix.n_samples();

    if k == 0 || n == 0 || interface >= matrix.n_ifs() {
        return 0.0;
    }

    let mut scratch = Vec::with_capacity(matrix.n_channels());
    let mut total = 0.0f64;

    for s in 0..n {
        scratch.clear();
        scratch.extend_from_slice(matrix.spectrum(s, interface));

        // k наибольших оказываются в начале
        scratch.select_nth_unstable_by(k - 1, |a, b| b.total_cmp(a));
        total += scratch[..k].iter().map(|&v| v as f64).sum::<f64>();
    }

    (total / (n * k) as f64) as f32
}

/// Вычитает из каждого спектра его среднее по каналам.
pub fn subtract_spectrum_mean(matrix: &SampleMatrix) -> SampleMatrix {
    let mut out = matrix.clone();

    for s in 0..matrix.n_samples() {
        for f in 0..matrix.n_ifs() {
            let spectrum = out.spectrum_mut(s, f);
            if spectrum.is_empty() {
                continue;
            }

            let mean = spectrum.iter().map(|&v| v as f64).sum::<f64>() / spectrum.len() as f64;
            for v in spectrum.iter_mut() {
                *v = (*v as f64 - mean) as f32;
            }
        }
    }

    out
}

////////////////////////////////////////////////////////////////////////////////
// Конвейер
////////////////////////////////////////////////////////////////////////////////

impl Default for DedispersionConfig {
    fn default() -> Self {
        Self {
            dm: None,
            ref_freq: None,
            highest: DEFAULT_HIGHEST,
            threshold: None,
            max_delay: None,
            subtract_mean: false,
            n_bands: None,
            center_freq: None,
        }
    }
}

/// Полная дедисперсия: (новая центральная частота) → (вычитание среднего) →
/// мера дисперсии (заданная или оценённая) → коррекция задержек →
/// (поддиапазоны).
///
/// Неизвестная мера дисперсии даёт тождественную коррекцию. При известной
/// ненулевой мере она записывается в поле `refdm`. Заголовок меняется только
/// при успехе.
pub fn dedisperse(
    matrix: &SampleMatrix,
    header: &mut HeaderDictionary,
    config: &DedispersionConfig,
    tracer: &dyn RidgeTracer,
) -> FilResult<DedispersionOutcome> {
    let mut staged = header.clone();

    if let Some(mhz) = config.center_freq {
        info!("center frequency {:.4} -> {mhz:.4} MHz", staged.center_freq());
        staged.set_center_freq(mhz);
    }

    let input = if config.subtract_mean {
        subtract_spectrum_mean(matrix)
    } else {
        matrix.clone()
    };

    let dm = match config.dm {
        Some(dm) => DmEstimate::from(dm),
        None => {
            let threshold = config.threshold.unwrap_or_else(|| {
                estimate_reference_intensity(&input, tracer.interface(), config.highest)
            });
            let mut search = DmSearch::new(threshold);
            if let Some(max_delay) = config.max_delay {
                search = search.with_max_delay(max_delay);
            }

            debug!("searching for dispersed pulses above {threshold}");
            estimate_dispersion_measure(&input, &staged, &search, tracer)
        }
    };

    if !dm.is_known() {
        warn!("dispersion measure unknown, applying zero delay");
    }

    let delays = DelayTable::new(&staged, dm.or_zero(), config.ref_freq)?;
    let mut corrected = apply_delay_table(&input, &delays)?;

    if let Some(n_bands) = config.n_bands {
        let n_channels = corrected.n_channels();
        if n_bands == 0 || n_channels % n_bands != 0 {
            return Err(FilError::Dimension {
                axis: Axis::Channel,
                size: n_channels,
                factor: n_bands,
            });
        }
        corrected = combine_channels(&corrected, &mut staged, n_channels / n_bands)?;
    }

    if let DmEstimate::Known(value) = dm {
        if value != 0.0 {
            staged.set(keys::REFDM, value)?;
        }
    }

    info!("dedispersed at DM {dm}, max shift {} samples", delays.max_shift());

    *header = staged;

    Ok(DedispersionOutcome {
        matrix: corrected,
        dm,
        delays,
    })
}
