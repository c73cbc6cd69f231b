use std::{
    fs::File,
    io::{self, Read, Write},
};

use log::info;
use sigfil_core::{read_filterbank, write_filterbank, DecimationPlan, Dims, Filterbank, HeaderSummary};
use sigfil_types::{BitDepth, TelescopeTable};

use crate::{DecimateConfig, DecimateError, DecimateResult};

/// Итог одного запуска.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub input_dims: Dims,
    pub output_dims: Dims,
    pub plan: DecimationPlan,
    pub nbits: BitDepth,
}

/// Применяет децимацию и смену разрядности к filterbank в памяти.
pub fn decimate_filterbank(
    filterbank: &mut Filterbank,
    config: &DecimateConfig,
) -> DecimateResult<DecimationPlan> {
    let plan = config.plan(filterbank.data().n_samples())?;

    filterbank.decimate(&plan)?;

    if let Some(depth) = config.nbits {
        filterbank.header_mut().set_bit_depth(depth);
    }

    Ok(plan)
}

/// Читает вход, децимирует и пишет результат.
///
/// Выходной файл создаётся только после успешной обработки.
pub fn run(config: &DecimateConfig) -> DecimateResult<RunSummary> {
    if let (Some(input), Some(output)) = (&config.input, &config.output) {
        if input == output {
            return Err(DecimateError::Config(format!(
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

    let input_dims = filterbank.data().dims();
    let plan = decimate_filterbank(&mut filterbank, config)?;
    let output_dims = filterbank.data().dims();
    let nbits = filterbank.header().bit_depth()?;

    info!(
        "decimated {}x{}x{} -> {}x{}x{} (channels /{}, samples /{}), {nbits}",
        input_dims.n_samples,
        input_dims.n_ifs,
        input_dims.n_channels,
        output_dims.n_samples,
        output_dims.n_ifs,
        output_dims.n_channels,
        plan.channel_factor,
        plan.sample_factor,
    );

    match &config.output {
        Some(path) => write_to(File::create(path)?, &filterbank, config.headerless)?,
        None => write_to(io::stdout().lock(), &filterbank, config.headerless)?,
    }

    Ok(RunSummary {
        input_dims,
        output_dims,
        plan,
        nbits,
    })
}

fn read_from<R: Read>(inner: R) -> DecimateResult<Filterbank> {
    Ok(read_filterbank(inner)?)
}

fn write_to<W: Write>(
    inner: W,
    filterbank: &Filterbank,
    headerless: bool,
) -> DecimateResult<()> {
    Ok(write_filterbank(inner, filterbank, headerless)?)
}

#[cfg(test)]
mod tests {
    use sigfil_core::SampleMatrix;
    use sigfil_types::HeaderDictionary;

    use super::*;
    use crate::SampleReduction;

    fn sample() -> Filterbank {
        let mut h = HeaderDictionary::new();
        h.set("nbits", 32u32).unwrap();
        h.set_n_samples(8);
        h.set_n_ifs(1);
        h.set_n_channels(4);
        h.set_fch1(1400.0);
        h.set_foff(-1.0);
        h.set_tsamp(1e-3);

        let m = SampleMatrix::from_fn(Dims::new(8, 1, 4), |s, _, c| (s * 4 + c) as f32);
        Filterbank::new(h, m).unwrap()
    }

    #[test]
    fn test_decimate_with_target_count_and_nbits() {
        let mut fb = sample();
        let config = DecimateConfig {
            channel_factor: 2,
            samples: SampleReduction::OutputCount(2),
            nbits: Some(BitDepth::Bits8),
            ..DecimateConfig::default()
        };

        let plan = decimate_filterbank(&mut fb, &config).unwrap();

        assert_eq!(plan.sample_factor, 4);
        assert_eq!(fb.data().dims(), Dims::new(2, 1, 2));
        assert_eq!(fb.header().nbits(), 8);
        // Отсчёты 0..4, каналы 0..2: среднее (0+1+4+5+...+12+13)/8
        assert_eq!(fb.data().get(0, 0, 0), 6.5);
    }

    #[test]
    fn test_uneven_factor_is_dimension_error() {
        let mut fb = sample();
        let config = DecimateConfig {
            channel_factor: 3,
            ..DecimateConfig::default()
        };

        let err = decimate_filterbank(&mut fb, &config).unwrap_err();
        assert!(matches!(err, DecimateError::Filterbank(_)));
        assert_eq!(fb.data().dims(), Dims::new(8, 1, 4));
    }
}
