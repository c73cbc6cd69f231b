use std::path::PathBuf;

use sigfil_core::{sample_factor_for_output, DecimationPlan};
use sigfil_types::{BitDepth, FilResult};

/// Как уменьшать число отсчётов.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleReduction {
    /// Усреднять по `n` соседних отсчётов (`-t`)
    Factor(usize),
    /// Получить ровно `n` выходных отсчётов (`-T`)
    OutputCount(usize),
}

/// Полная конфигурация запуска децимации.
#[derive(Debug, Clone, PartialEq)]
pub struct DecimateConfig {
    /// Входной файл (None = stdin)
    pub input: Option<PathBuf>,
    /// Выходной файл (None = stdout)
    pub output: Option<PathBuf>,
    /// Сколько соседних каналов усреднять
    pub channel_factor: usize,
    pub samples: SampleReduction,
    /// Разрядность результата (None = как во входном файле)
    pub nbits: Option<BitDepth>,
    /// Не писать заголовок
    pub headerless: bool,
    /// Вывести сводку заголовка в stderr
    pub print_header: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SampleReduction {
    /// Фактор усреднения для записи из `n_samples` отсчётов.
    pub fn factor_for(
        &self,
        n_samples: usize,
    ) -> FilResult<usize> {
        match *self {
            SampleReduction::Factor(f) => Ok(f),
            SampleReduction::OutputCount(n) => sample_factor_for_output(n_samples, n),
        }
    }
}

impl DecimateConfig {
    /// План децимации для записи из `n_samples` отсчётов.
    pub fn plan(
        &self,
        n_samples: usize,
    ) -> FilResult<DecimationPlan> {
        let sample_factor = self.samples.factor_for(n_samples)?;
        Ok(DecimationPlan::new(self.channel_factor, sample_factor))
    }
}

impl Default for DecimateConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            channel_factor: 1,
            samples: SampleReduction::Factor(1),
            nbits: None,
            headerless: false,
            print_header: false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
