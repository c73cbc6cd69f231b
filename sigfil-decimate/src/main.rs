use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use sigfil_decimate::{run, DecimateConfig, SampleReduction};
use sigfil_types::BitDepth;

#[derive(Parser, Debug)]
#[command(
    name = "sigfil-decimate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Reduce time and/or frequency resolution of filterbank data",
    long_about = None,
)]
struct Cli {
    /// Входной filterbank файл (по умолчанию stdin)
    input: Option<PathBuf>,
    /// Сколько соседних каналов усреднять
    #[arg(short = 'c', long, default_value = "1")]
    channels: usize,
    /// Сколько соседних отсчётов усреднять
    #[arg(short = 't', long, conflicts_with = "output_samples")]
    samples: Option<usize>,
    /// Число выходных отсчётов (альтернатива -t)
    #[arg(short = 'T', long)]
    output_samples: Option<usize>,
    /// Разрядность результата: 8, 16, 32 (по умолчанию как на входе)
    #[arg(short = 'n', long)]
    nbits: Option<BitDepth>,
    /// Путь к выходному файлу (по умолчанию stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Не писать заголовок
    #[arg(long)]
    headerless: bool,
    /// Вывести сводку заголовка входа в stderr (JSON)
    #[arg(long)]
    print_header: bool,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
    /// Подробный вывод
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let samples = match (cli.samples, cli.output_samples) {
        (_, Some(n)) => SampleReduction::OutputCount(n),
        (Some(f), None) => SampleReduction::Factor(f),
        (None, None) => SampleReduction::Factor(1),
    };

    let config = DecimateConfig {
        input: cli.input,
        output: cli.output,
        channel_factor: cli.channels,
        samples,
        nbits: cli.nbits,
        headerless: cli.headerless,
        print_header: cli.print_header,
    };

    match run(&config) {
        Ok(summary) => {
            info!(
                "done: {} samples x {} channels, {}",
                summary.output_dims.n_samples, summary.output_dims.n_channels, summary.nbits
            );
        }
        Err(e) => {
            error!("Decimation failed: {e}");
            std::process::exit(1);
        }
    }
}
