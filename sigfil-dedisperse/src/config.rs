use std::path::PathBuf;

use sigfil_core::{DedispersionConfig, DEFAULT_HIGHEST};
use sigfil_types::BitDepth;

/// Полная конфигурация запуска дедисперсии.
#[derive(Debug, Clone, PartialEq)]
pub struct DedisperseConfig {
    /// Входной файл (None = stdin)
    pub input: Option<PathBuf>,
    /// Выходной файл (None = stdout)
    pub output: Option<PathBuf>,
    /// Мера дисперсии, пк/см³ (None = оценить по данным)
    pub dm: Option<f64>,
    /// Опорная частота, МГц (None = верх полосы)
    pub ref_freq_mhz: Option<f64>,
    /// Новая центральная частота для заголовка, МГц
    pub center_freq_mhz: Option<f64>,
    /// Число выходных поддиапазонов
    pub n_bands: Option<usize>,
    /// Разрядность результата
    pub nbits: BitDepth,
    /// k самых ярких каналов для порога
    pub highest: usize,
    /// Явный порог яркости
    pub threshold: Option<f32>,
    /// Максимальная задержка гребня, отсчёты
    pub max_delay: Option<usize>,
    /// Вычесть среднее по каналам из каждого спектра
    pub subtract_mean: bool,
    /// Не писать заголовок
    pub headerless: bool,
    /// Вывести сводку заголовка в stderr
    pub print_header: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl DedisperseConfig {
    /// Параметры конвейера библиотеки.
    pub fn dedispersion(&self) -> DedispersionConfig {
        DedispersionConfig {
            dm: self.dm,
            ref_freq: self.ref_freq_mhz,
            highest: self.highest,
            threshold: self.threshold,
            max_delay: self.max_delay,
            subtract_mean: self.subtract_mean,
            n_bands: self.n_bands,
            center_freq: self.center_freq_mhz,
        }
    }

    /// Проверяет значения, которые не может отсечь разбор аргументов.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(dm) = self.dm {
            if !dm.is_finite() || dm < 0.0 {
                return Err(format!("DM must be a non-negative number, got {dm}"));
            }
        }

        for (name, freq) in [("reference", self.ref_freq_mhz), ("center", self.center_freq_mhz)] {
            if let Some(f) = freq {
                if f.is_nan() || f <= 0.0 {
                    return Err(format!("{name} frequency must be positive, got {f} MHz"));
                }
            }
        }

        if self.n_bands == Some(0) {
            return Err("number of sub-bands must be at least 1".to_string());
        }

        Ok(())
    }
}

impl Default for DedisperseConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            dm: None,
            ref_freq_mhz: None,
            center_freq_mhz: None,
            n_bands: None,
            nbits: BitDepth::Bits32,
            highest: DEFAULT_HIGHEST,
            threshold: None,
            max_delay: None,
            subtract_mean: false,
            headerless: false,
            print_header: false,
        }
    }
}

/// Парсит строку частоты в мегагерцы.
///
/// Поддерживает суффиксы: `GHz`, `MHz`, `kHz` (регистронезависимо). Число без
/// суффикса считается заданным в МГц.
///
/// # Примеры
/// ```
/// use sigfil_dedisperse::config::parse_freq_mhz;
/// assert_eq!(parse_freq_mhz("1400MHz").unwrap(), 1400.0);
/// assert_eq!(parse_freq_mhz("1.4GHz").unwrap(), 1400.0);
/// assert_eq!(parse_freq_mhz("430").unwrap(), 430.0);
/// ```
pub fn parse_freq_mhz(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let lower = s.to_lowercase();

    let (num_str, mult) = if let Some(v) = lower.strip_suffix("ghz") {
        (v.trim(), 1_000_f64)
    } else if let Some(v) = lower.strip_suffix("mhz") {
        (v.trim(), 1_f64)
    } else if let Some(v) = lower.strip_suffix("khz") {
        (v.trim(), 1e-3)
    } else {
        (lower.as_str(), 1_f64)
    };

    let n: f64 = num_str
        .parse()
        .map_err(|e| format!("Invalid frequency '{s}': {e}"))?;

    Ok(n * mult)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_freq_mhz() {
        assert_eq!(parse_freq_mhz("1400MHz").unwrap(), 1400.0);
        assert_eq!(parse_freq_mhz("1.4GHz").unwrap(), 1400.0);
        assert_eq!(parse_freq_mhz("400000kHz").unwrap(), 400.0);
        assert_eq!(parse_freq_mhz(" 327.5 ").unwrap(), 327.5);
        assert!(parse_freq_mhz("abc").is_err());
        assert!(parse_freq_mhz("MHz").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(DedisperseConfig::default().validate().is_ok());

        let negative_dm = DedisperseConfig {
            dm: Some(-1.0),
            ..DedisperseConfig::default()
        };
        assert!(negative_dm.validate().is_err());

        let zero_ref = DedisperseConfig {
            ref_freq_mhz: Some(0.0),
            ..DedisperseConfig::default()
        };
        assert!(zero_ref.validate().is_err());

        let no_bands = DedisperseConfig {
            n_bands: Some(0),
            ..DedisperseConfig::default()
        };
        assert!(no_bands.validate().is_err());
    }

    #[test]
    fn test_defaults_match_library() {
        let config = DedisperseConfig::default().dedispersion();

        assert_eq!(config, DedispersionConfig::default());
        assert_eq!(DedisperseConfig::default().nbits, BitDepth::Bits32);
    }
}
