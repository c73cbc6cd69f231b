//! Трёхосная матрица интенсивностей `[sample][if][channel]`.
//!
//! Данные хранятся плоским вектором; индекс ячейки
//! `sample * n_ifs * n_channels + if * n_channels + channel`. Длина вектора
//! всегда равна произведению размеров осей, смена размера оси означает новую
//! матрицу.

use sigfil_types::{Axis, FilError, FilResult, HeaderDictionary};

/// Размеры осей матрицы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dims {
    pub n_samples: usize,
    pub n_ifs: usize,
    pub n_channels: usize,
}

/// Матрица выборок filterbank
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMatrix {
    dims: Dims,
    data: Vec<f32>,
}

impl Dims {
    pub fn new(
        n_samples: usize,
        n_ifs: usize,
        n_channels: usize,
    ) -> Self {
        Self {
            n_samples,
            n_ifs,
            n_channels,
        }
    }

    /// Размеры, записанные в заголовке.
    pub fn from_header(header: &HeaderDictionary) -> Self {
        Self::new(header.n_samples(), header.n_ifs(), header.n_channels())
    }

    /// Количество ячеек.
    pub fn len(&self) -> usize {
        self.n_samples * self.n_ifs * self.n_channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Количество ячеек с проверкой переполнения.
    pub fn checked_len(&self) -> Option<usize> {
        self.n_samples
            .checked_mul(self.n_ifs)?
            .checked_mul(self.n_channels)
    }

    pub fn size(
        &self,
        axis: Axis,
    ) -> usize {
        match axis {
            Axis::Sample => self.n_samples,
            Axis::Interface => self.n_ifs,
            Axis::Channel => self.n_channels,
        }
    }
}

impl SampleMatrix {
    /// Оборачивает вектор, проверяя его длину.
    pub fn new(
        dims: Dims,
        data: Vec<f32>,
    ) -> FilResult<Self> {
        if dims.checked_len() != Some(data.len()) {
            return Err(FilError::format_violation(format!(
                "matrix {}x{}x{} needs {} cells, got {}",
                dims.n_samples,
                dims.n_ifs,
                dims.n_channels,
                dims.len(),
                data.len(),
            )));
        }

        Ok(Self { dims, data })
    }

    pub fn zeros(dims: Dims) -> Self {
        Self {
            dims,
            data: vec![0.0; dims.len()],
        }
    }

    /// Строит матрицу, вызывая `f(sample, if, channel)` в порядке хранения.
    pub fn from_fn<F>(
        dims: Dims,
        mut f: F,
    ) -> Self
    where
        F: FnMut(usize, usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(dims.len());

        for s in 0..dims.n_samples {
            for i in 0..dims.n_ifs {
                for c in 0..dims.n_channels {
                    data.push(f(s, i, c));
                }
            }
        }

        Self { dims, data }
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn n_samples(&self) -> usize {
        self.dims.n_samples
    }

    pub fn n_ifs(&self) -> usize {
        self.dims.n_ifs
    }

    pub fn n_channels(&self) -> usize {
        self.dims.n_channels
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(
        &self,
        sample: usize,
        interface: usize,
        channel: usize,
    ) -> usize {
        debug_assert!(sample < self.dims.n_samples);
        debug_assert!(interface < self.dims.n_ifs);
        debug_assert!(channel < self.dims.n_channels);

        (sample * self.dims.n_ifs + interface) * self.dims.n_channels + channel
    }

    #[inline]
    pub fn get(
        &self,
        sample: usize,
        interface: usize,
        channel: usize,
    ) -> f32 {
        self.data[self.index(sample, interface, channel)]
    }

    #[inline]
    pub fn set(
        &mut self,
        sample: usize,
        interface: usize,
        channel: usize,
        value: f32,
    ) {
        let idx = self.index(sample, interface, channel);
        self.data[idx] = value;
    }

    // Начало спектра; при нуле каналов спектр пуст.
    #[inline]
    fn spectrum_start(
        &self,
        sample: usize,
        interface: usize,
    ) -> usize {
        debug_assert!(sample < self.dims.n_samples);
        debug_assert!(interface < self.dims.n_ifs);

        (sample * self.dims.n_ifs + interface) * self.dims.n_channels
    }

    /// Спектр (все каналы) одного отсчёта одного интерфейса.
    pub fn spectrum(
        &self,
        sample: usize,
        interface: usize,
    ) -> &[f32] {
        let start = self.spectrum_start(sample, interface);
        &self.data[start..start + self.dims.n_channels]
    }

    pub fn spectrum_mut(
        &mut self,
        sample: usize,
        interface: usize,
    ) -> &mut [f32] {
        let start = self.spectrum_start(sample, interface);
        let n = self.dims.n_channels;
        &mut self.data[start..start + n]
    }

    /// Временной ряд одного канала одного интерфейса.
    pub fn channel_series(
        &self,
        interface: usize,
        channel: usize,
    ) -> Vec<f32> {
        (0..self.dims.n_samples)
            .map(|s| self.get(s, interface, channel))
            .collect()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}
