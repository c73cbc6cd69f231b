use std::{
    fs::File,
    io::{self, Read, Write},
};

use log::warn;
use sigfil_core::{
    read_filterbank, write_filterbank, DmEstimate, Filterbank, GreedyRidgeTracer, HeaderSummary,
    RidgeTracer,
};
use sigfil_types::TelescopeTable;

use crate::{DedisperseConfig, DedisperseError, DedisperseResult};

/// Итог одного запуска.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub dm: DmEstimate,
    pub n_samples: usize,
    pub n_channels: usize,
}

/// Дедисперсия filterbank в памяти с заданным трассировщиком гребней.
pub fn dedisperse_filterbank(
    filterbank: &mut Filterbank,
    config: &DedisperseConfig,
    tracer: &dyn RidgeTracer,
) -> DedisperseResult<DmEstimate> {
    config.validate().map_err(DedisperseError::Config)?;

    let dm = filterbank.dedisperse(&config.dedispersion(), tracer)?;
    if !dm.is_known() {
        warn!("no DM given and none found, output is not dedispersed");
    }

    filterbank.header_mut().set_bit_depth(config.nbits);

    Ok(dm)
}

/// Читает вход, выполняет дедисперсию и пишет результат.
pub fn run(config: &DedisperseConfig) -> DedisperseResult<RunSummary> {
    if let (Some(input), Some(output)) = (&config.input, &config.output) {
        if input == output {
            return Err(DedisperseError::Config(format!(
                "output {output:?} would overwrite the input"
            )));
        }
    }

    let mut filterbank = match &config.input {
        Some(path) => read_from(File::open(path)?)?,
        None => read_from(io::stdin().lock())?,
    };

    if config.print_header {
        let summary = HeaderSummary::new(filterbank.header(), &TelescopeTable::sigproc());
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    }

    let dm = dedisperse_filterbank(&mut filterbank, config, &GreedyRidgeTracer::default())?;

    match &config.output {
        Some(path) => write_to(File::create(path)?, &filterbank, config.headerless)?,
        None => write_to(io::stdout().lock(), &filterbank, config.headerless)?,
    }

    Ok(RunSummary {
        dm,
        n_samples: filterbank.data().n_samples(),
        n_channels: filterbank.data().n_channels(),
    })
}

fn read_from<R: Read>(inner: R) -> DedisperseResult<Filterbank> {
    Ok(read_filterbank(inner)?)
}

fn write_to<W: Write>(
    inner: W,
    filterbank: &Filterbank,
    headerless: bool,
) -> DedisperseResult<()> {
    Ok(write_filterbank(inner, filterbank, headerless)?)
}

#[cfg(test)]
mod tests {
    use sigfil_core::{Dims, SampleMatrix};
    use sigfil_types::{BitDepth, HeaderDictionary};

    use super::*;

    fn sample() -> Filterbank {
        let mut h = HeaderDictionary::new();
        h.set("nbits", 8u32).unwrap();
        h.set_n_samples(32);
        h.set_n_ifs(1);
        h.set_n_channels(8);
        h.set_fch1(1400.0);
        h.set_foff(-4.0);
        h.set_tsamp(1e-4);

        let m = SampleMatrix::from_fn(Dims::new(32, 1, 8), |s, _, c| ((s + c) % 5) as f32);
        Filterbank::new(h, m).unwrap()
    }

    #[test]
    fn test_center_freq_override_and_nbits() {
        let mut fb = sample();
        let config = DedisperseConfig {
            dm: Some(0.0),
            center_freq_mhz: Some(1000.0),
            ..DedisperseConfig::default()
        };

        let dm = dedisperse_filterbank(&mut fb, &config, &GreedyRidgeTracer::default()).unwrap();

        assert_eq!(dm, DmEstimate::Known(0.0));
        assert_eq!(fb.header().center_freq(), 1000.0);
        assert_eq!(fb.header().fch1(), 1016.0);
        assert_eq!(fb.header().bit_depth().unwrap(), BitDepth::Bits32);
    }

    #[test]
    fn test_invalid_config_is_rejected_before_work() {
        let mut fb = sample();
        let before = fb.clone();
        let config = DedisperseConfig {
            ref_freq_mhz: Some(-5.0),
            ..DedisperseConfig::default()
        };

        let err = dedisperse_filterbank(&mut fb, &config, &GreedyRidgeTracer::default()).unwrap_err();

        assert!(matches!(err, DedisperseError::Config(_)));
        assert_eq!(fb, before);
    }

    #[test]
    fn test_failed_dedispersion_keeps_header() {
        let mut fb = sample();
        fb.header_mut().remove("tsamp");
        let before = fb.clone();
        let config = DedisperseConfig {
            dm: Some(30.0),
            center_freq_mhz: Some(1000.0),
            ..DedisperseConfig::default()
        };

        let err = dedisperse_filterbank(&mut fb, &config, &GreedyRidgeTracer::default()).unwrap_err();

        assert!(matches!(err, DedisperseError::Filterbank(_)));
        assert_eq!(fb, before);
        assert_eq!(fb.header().fch1(), 1400.0);
    }

    #[test]
    fn test_sub_bands() {
        let mut fb = sample();
        let config = DedisperseConfig {
            dm: Some(0.0),
            n_bands: Some(2),
            subtract_mean: true,
            ..DedisperseConfig::default()
        };

        dedisperse_filterbank(&mut fb, &config, &GreedyRidgeTracer::default()).unwrap();

        assert_eq!(fb.data().n_channels(), 2);
        assert_eq!(fb.header().foff(), -16.0);
        // После вычитания среднего сумма по поддиапазонам равна нулю
        for s in 0..32 {
            let sum: f32 = fb.data().spectrum(s, 0).iter().sum();
            assert!(sum.abs() < 1e-5);
        }
    }
}
