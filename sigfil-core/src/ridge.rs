//! Поиск диспергированных импульсов и оценка меры дисперсии.
//!
//! Сканер идёт по отсчётам по возрастанию; отсчёт, в котором хотя бы один
//! канал превышает порог, становится затравкой для [`RidgeTracer`]. По
//! каждому найденному гребню мера дисперсии подбирается МНК по закону
//! `t(f) = t0 + K·DM·f⁻²`, итог — медиана по гребням.
//!
//! Гребень принимается, только если его точки ложатся на закон задержки
//! (остаток не больше `max_residual` отсчётов, задержка по полосе не меньше
//! отсчёта) и заметно ярче шума своих каналов. Шум канала оценивается
//! медианой и MAD по времени.

use log::{debug, info};
use sigfil_types::HeaderDictionary;

use crate::{dedisperse::DISPERSION_CONSTANT, matrix::SampleMatrix};

/// Допустимый СКО-остаток точек гребня от закона задержки, отсчёты.
pub const DEFAULT_MAX_RESIDUAL: f64 = 1.0;

/// Минимальное среднее превышение точек гребня над шумом, в σ.
pub const DEFAULT_MIN_SIGNIFICANCE: f64 = 5.0;

/// Задержка по полосе меньше отсчёта неотличима от округления.
const MIN_DELAY_SPAN: f64 = 1.0;

/// MAD → σ для нормального шума.
const MAD_TO_SIGMA: f64 = 1.4826;

/// Точка гребня: канал и отсчёт, в котором канал превысил порог.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RidgePoint {
    pub channel: usize,
    pub sample: usize,
}

/// След импульса в плоскости отсчёт–канал.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ridge {
    /// Отсчёт на самой высокой частоте гребня
    pub start_sample: usize,
    /// Отсчёт на самой низкой частоте гребня
    pub end_sample: usize,
    /// Точки в порядке убывания частоты
    pub points: Vec<RidgePoint>,
}

/// Стратегия трассировки гребня от затравочного отсчёта.
pub trait RidgeTracer {
    /// Пытается провести гребень от `seed_sample` не дальше `max_delay`
    /// отсчётов, используя ячейки выше `threshold`.
    fn trace_ridge(
        &self,
        matrix: &SampleMatrix,
        header: &HeaderDictionary,
        seed_sample: usize,
        max_delay: usize,
        threshold: f32,
    ) -> Option<Ridge>;

    /// Интерфейс, в котором ищутся затравки.
    fn interface(&self) -> usize {
        0
    }
}

/// Жадный трассировщик.
///
/// Обходит каналы от высокой частоты к низкой и в каждом берёт первый отсчёт
/// выше порога, не раньше отсчёта предыдущего канала. Задержка по каналам
/// поэтому монотонна. Гребень принимается, если найдено не меньше
/// `min_coverage` от числа каналов (и минимум две точки).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreedyRidgeTracer {
    pub interface: usize,
    pub min_coverage: f64,
}

/// Результат оценки меры дисперсии.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DmEstimate {
    /// Мера дисперсии, пк·см⁻³
    Known(f64),
    /// Ни одного подходящего гребня не найдено
    Unknown,
}

/// Параметры сканирования.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DmSearch {
    /// Порог яркости затравки и точек гребня
    pub threshold: f32,
    /// Максимальная задержка гребня в отсчётах
    pub max_delay: usize,
    /// Допустимый СКО-остаток от закона задержки, отсчёты
    pub max_residual: f64,
    /// Минимальное среднее превышение точек над шумом, σ
    pub min_significance: f64,
}

/// МНК-подгонка гребня под `t = t0 + K·DM·f⁻²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeFit {
    /// Мера дисперсии, пк·см⁻³
    pub dm: f64,
    /// СКО точек от подогнанной кривой, отсчёты
    pub residual_rms: f64,
    /// Подогнанная задержка между крайними частотами гребня, отсчёты
    pub delay_span: f64,
}

/// Медиана и σ (по MAD) каждого канала одного интерфейса.
struct ChannelNoise {
    median: Vec<f64>,
    sigma: Vec<f64>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Ridge {
    /// Задержка между крайними точками, в отсчётах.
    pub fn span(&self) -> usize {
        self.end_sample.saturating_sub(self.start_sample)
    }

    /// Все точки лежат внутри матрицы и гребень не идёт назад во времени.
    pub fn is_within(
        &self,
        matrix: &SampleMatrix,
    ) -> bool {
        self.end_sample >= self.start_sample
            && self
                .points
                .iter()
                .all(|p| p.sample < matrix.n_samples() && p.channel < matrix.n_channels())
    }
}

impl GreedyRidgeTracer {
    pub fn new(interface: usize) -> Self {
        Self {
            interface,
            ..Self::default()
        }
    }
}

impl Default for GreedyRidgeTracer {
    fn default() -> Self {
        Self {
            interface: 0,
            min_coverage: 0.5,
        }
    }
}

impl DmEstimate {
    pub fn value(&self) -> Option<f64> {
        match self {
            DmEstimate::Known(dm) => Some(*dm),
            DmEstimate::Unknown => None,
        }
    }

    /// Мера дисперсии или 0 (тождественная коррекция).
    pub fn or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, DmEstimate::Known(_))
    }
}

impl From<f64> for DmEstimate {
    fn from(dm: f64) -> Self {
        if dm.is_finite() {
            DmEstimate::Known(dm)
        } else {
            DmEstimate::Unknown
        }
    }
}

impl std::fmt::Display for DmEstimate {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DmEstimate::Known(dm) => write!(f, "{dm:.3} pc/cm^3"),
            DmEstimate::Unknown => write!(f, "unknown"),
        }
    }
}

impl DmSearch {
    /// Поиск по всей длине записи.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            max_delay: usize::MAX,
            max_residual: DEFAULT_MAX_RESIDUAL,
            min_significance: DEFAULT_MIN_SIGNIFICANCE,
        }
    }

    pub fn with_max_delay(
        mut self,
        max_delay: usize,
    ) -> Self {
        self.max_delay = max_delay;
        self
    }
}

////////////////////////////////////////////////////////////////////////////////
// GreedyRidgeTracer
////////////////////////////////////////////////////////////////////////////////

impl RidgeTracer for GreedyRidgeTracer {
    fn trace_ridge(
        &self,
        matrix: &SampleMatrix,
        header: &HeaderDictionary,
        seed_sample: usize,
        max_delay: usize,
        threshold: f32,
    ) -> Option<Ridge> {
        let n_samples = matrix.n_samples();
        let n_channels = matrix.n_channels();

        if n_channels < 2 || seed_sample >= n_samples || self.interface >= matrix.n_ifs() {
            return None;
        }

        let last = seed_sample.saturating_add(max_delay).min(n_samples - 1);
        let mut cursor = seed_sample;
        let mut points = Vec::new();

        for channel in channels_by_descending_freq(header, n_channels) {
            let hit = (cursor..=last).find(|&s| matrix.get(s, self.interface, channel) > threshold);

            if let Some(sample) = hit {
                points.push(RidgePoint { channel, sample });
                cursor = sample;
            }
        }

        let required = ((self.min_coverage * n_channels as f64).ceil() as usize).max(2);
        if points.len() < required {
            return None;
        }

        let start_sample = points.first()?.sample;
        let end_sample = points.last()?.sample;

        Some(Ridge {
            start_sample,
            end_sample,
            points,
        })
    }

    fn interface(&self) -> usize {
        self.interface
    }
}

/// Каналы от высокой частоты к низкой.
pub fn channels_by_descending_freq(
    header: &HeaderDictionary,
    n_channels: usize,
) -> Box<dyn Iterator<Item = usize>> {
    if header.foff() > 0.0 {
        Box::new((0..n_channels).rev())
    } else {
        Box::new(0..n_channels)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Оценка меры дисперсии
////////////////////////////////////////////////////////////////////////////////

/// МНК-подгонка точек гребня: наклон задержки от f⁻².
///
/// `None`, если точек меньше двух, все они на одной частоте или заголовок не
/// содержит положительных `tsamp` и частот.
pub fn fit_ridge(
    header: &HeaderDictionary,
    ridge: &Ridge,
) -> Option<RidgeFit> {
    let tsamp = header.tsamp();
    if tsamp <= 0.0 || ridge.points.len() < 2 {
        return None;
    }

    let mut xs = Vec::with_capacity(ridge.points.len());
    let mut ts = Vec::with_capacity(ridge.points.len());

    for p in &ridge.points {
        let freq = header.channel_freq(p.channel);
        if freq <= 0.0 {
            return None;
        }
        xs.push(freq.powi(-2));
        ts.push(p.sample as f64);
    }

    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let t_mean = ts.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxt = 0.0;
    for (x, t) in xs.iter().zip(&ts) {
        sxx += (x - x_mean) * (x - x_mean);
        sxt += (x - x_mean) * (t - t_mean);
    }

    if sxx <= 0.0 {
        return None;
    }

    // Отсчётов на единицу f⁻²
    let slope = sxt / sxx;
    let intercept = t_mean - slope * x_mean;

    let residual_sq = xs
        .iter()
        .zip(&ts)
        .map(|(x, t)| (t - intercept - slope * x).powi(2))
        .sum::<f64>();

    let x_min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let x_max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    Some(RidgeFit {
        dm: slope * tsamp / DISPERSION_CONSTANT,
        residual_rms: (residual_sq / n).sqrt(),
        delay_span: slope * (x_max - x_min),
    })
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mid = values.len() / 2;
    values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    values[mid]
}

impl ChannelNoise {
    fn measure(
        matrix: &SampleMatrix,
        interface: usize,
    ) -> Self {
        let n_channels = matrix.n_channels();
        let mut median_by_channel = Vec::with_capacity(n_channels);
        let mut sigma_by_channel = Vec::with_capacity(n_channels);
        let mut series = Vec::with_capacity(matrix.n_samples());

        for c in 0..n_channels {
            series.clear();
            series.extend((0..matrix.n_samples()).map(|s| matrix.get(s, interface, c) as f64));

            let med = median(&mut series);
            for v in series.iter_mut() {
                *v = (*v - med).abs();
            }

            median_by_channel.push(med);
            sigma_by_channel.push(MAD_TO_SIGMA * median(&mut series));
        }

        Self {
            median: median_by_channel,
            sigma: sigma_by_channel,
        }
    }

    /// Среднее превышение точек гребня над медианой канала в единицах σ.
    ///
    /// Для каналов без разброса любое положительное превышение бесконечно
    /// значимо.
    fn significance(
        &self,
        matrix: &SampleMatrix,
        interface: usize,
        ridge: &Ridge,
    ) -> f64 {
        let (excess, spread) = ridge.points.iter().fold((0.0, 0.0), |(e, d), p| {
            let v = matrix.get(p.sample, interface, p.channel) as f64;
            (e + v - self.median[p.channel], d + self.sigma[p.channel])
        });

        if spread > 0.0 {
            excess / spread
        } else if excess > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }
}

/// Мера дисперсии гребня, если он похож на диспергированный импульс.
fn accept_ridge(
    matrix: &SampleMatrix,
    header: &HeaderDictionary,
    interface: usize,
    ridge: &Ridge,
    search: &DmSearch,
    noise: &ChannelNoise,
) -> Option<f64> {
    if !ridge.is_within(matrix) {
        debug!("ridge outside the matrix, skipped");
        return None;
    }

    let fit = fit_ridge(header, ridge)?;
    if fit.dm <= 0.0 || fit.delay_span < MIN_DELAY_SPAN || fit.residual_rms > search.max_residual {
        return None;
    }

    let significance = noise.significance(matrix, interface, ridge);
    if significance < search.min_significance {
        return None;
    }

    debug!(
        "ridge {}..{} ({} points): DM {:.3}, residual {:.2}, {significance:.1} sigma",
        ridge.start_sample,
        ridge.end_sample,
        ridge.points.len(),
        fit.dm,
        fit.residual_rms,
    );

    Some(fit.dm)
}

/// Оценивает меру дисперсии по гребням выше `search.threshold`.
///
/// После принятого гребня сканирование продолжается с отсчёта за его
/// концом. Гребни с неположительной мерой (широкополосные помехи), не
/// следующие закону задержки или не выделяющиеся из шума отбрасываются.
pub fn estimate_dispersion_measure(
    matrix: &SampleMatrix,
    header: &HeaderDictionary,
    search: &DmSearch,
    tracer: &dyn RidgeTracer,
) -> DmEstimate {
    let n_samples = matrix.n_samples();
    let interface = tracer.interface();

    if n_samples == 0 || matrix.n_channels() == 0 || interface >= matrix.n_ifs() {
        return DmEstimate::Unknown;
    }

    let max_delay = search.max_delay.min(n_samples - 1);
    let mut noise: Option<ChannelNoise> = None;
    let mut dms = Vec::new();
    let mut sample = 0;

    while sample < n_samples {
        let seeded = matrix
            .spectrum(sample, interface)
            .iter()
            .any(|&v| v > search.threshold);

        if seeded {
            let traced = tracer.trace_ridge(matrix, header, sample, max_delay, search.threshold);

            if let Some(ridge) = traced {
                let noise = noise.get_or_insert_with(|| ChannelNoise::measure(matrix, interface));

                if let Some(dm) = accept_ridge(matrix, header, interface, &ridge, search, noise) {
                    dms.push(dm);
                    sample = ridge.end_sample.max(sample) + 1;
                    continue;
                }
            }
        }

        sample += 1;
    }

    if dms.is_empty() {
        info!("no dispersed pulse found above threshold {}", search.threshold);
        return DmEstimate::Unknown;
    }

    dms.sort_by(|a, b| a.total_cmp(b));
    let mid = dms.len() / 2;
    let median = if dms.len() % 2 == 0 {
        (dms[mid - 1] + dms[mid]) / 2.0
    } else {
        dms[mid]
    };

    info!("estimated DM {median:.3} from {} ridge(s)", dms.len());

    DmEstimate::Known(median)
}
