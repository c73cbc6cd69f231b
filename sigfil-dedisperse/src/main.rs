use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use sigfil_core::DEFAULT_HIGHEST;
use sigfil_dedisperse::{parse_freq_mhz, run, DedisperseConfig};
use sigfil_types::BitDepth;

#[derive(Parser, Debug)]
#[command(
    name = "sigfil-dedisperse",
    version = env!("CARGO_PKG_VERSION"),
    about = "Correct interstellar dispersion in filterbank data",
    long_about = None,
)]
struct Cli {
    /// Входной filterbank файл (по умолчанию stdin)
    input: Option<PathBuf>,
    /// Мера дисперсии, пк/см³. Если не задана, оценивается по данным
    #[arg(short = 'd', long)]
    dm: Option<f64>,
    /// Опорная частота (1400, 1400MHz, 1.4GHz). По умолчанию верх полосы
    #[arg(short = 'f', long, value_parser = parse_freq_mhz)]
    reffreq: Option<f64>,
    /// Новая центральная частота для заголовка
    #[arg(short = 'F', long, value_parser = parse_freq_mhz)]
    newfreq: Option<f64>,
    /// Число выходных поддиапазонов
    #[arg(short = 'b', long)]
    bands: Option<usize>,
    /// Разрядность результата: 8, 16, 32
    #[arg(short = 'n', long, default_value = "32")]
    nbits: BitDepth,
    /// Вычесть среднее по каналам из каждого отсчёта
    #[arg(long)]
    rmean: bool,
    /// k самых ярких каналов для оценки порога
    #[arg(long, default_value_t = DEFAULT_HIGHEST)]
    highest: usize,
    /// Явный порог яркости для поиска импульсов
    #[arg(long)]
    threshold: Option<f32>,
    /// Максимальная задержка импульса по полосе, отсчёты
    #[arg(long)]
    max_delay: Option<usize>,
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

    let config = DedisperseConfig {
        input: cli.input,
        output: cli.output,
        dm: cli.dm,
        ref_freq_mhz: cli.reffreq,
        center_freq_mhz: cli.newfreq,
        n_bands: cli.bands,
        nbits: cli.nbits,
        highest: cli.highest,
        threshold: cli.threshold,
        max_delay: cli.max_delay,
        subtract_mean: cli.rmean,
        headerless: cli.headerless,
        print_header: cli.print_header,
    };

    match run(&config) {
        Ok(summary) => {
            info!(
                "done: DM {}, {} samples x {} channels",
                summary.dm, summary.n_samples, summary.n_channels
            );
        }
        Err(e) => {
            error!("Dedispersion failed: {e}");
            std::process::exit(1);
        }
    }
}
