use std::fs;

use sigfil_core::{
    dispersion_delay, read_filterbank, write_filterbank, Dims, DmEstimate, Filterbank, SampleMatrix,
};
use sigfil_dedisperse::{run, DedisperseConfig};
use sigfil_types::HeaderDictionary;
use tempfile::tempdir;

const DM: f64 = 40.0;

/// 8-битный файл: фон 10, импульс 200 с DM=40 в отсчёте 30 на fch1.
fn write_pulsar(path: &std::path::Path) {
    let mut h = HeaderDictionary::new();
    h.set("source_name", "B0329+54").unwrap();
    h.set("nbits", 8u32).unwrap();
    h.set_n_samples(400);
    h.set_n_ifs(1);
    h.set_n_channels(32);
    h.set_fch1(430.0);
    h.set_foff(-0.5);
    h.set_tsamp(1e-3);

    let mut m = SampleMatrix::from_fn(Dims::new(400, 1, 32), |_, _, _| 10.0);
    for c in 0..32 {
        let delay = dispersion_delay(DM, h.channel_freq(c), h.fch1());
        m.set(30 + (delay / 1e-3).round() as usize, 0, c, 200.0);
    }

    let fb = Filterbank::new(h, m).unwrap();
    write_filterbank(fs::File::create(path).unwrap(), &fb, false).unwrap();
}

#[test]
fn test_run_with_explicit_dm() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.fil");
    let output = dir.path().join("out.fil");
    write_pulsar(&input);

    let config = DedisperseConfig {
        input: Some(input),
        output: Some(output.clone()),
        dm: Some(DM),
        ..DedisperseConfig::default()
    };

    let summary = run(&config).unwrap();
    assert_eq!(summary.dm, DmEstimate::Known(DM));

    let fb = read_filterbank(fs::File::open(&output).unwrap()).unwrap();
    assert_eq!(fb.header().nbits(), 32);
    assert_eq!(fb.header().get("refdm").as_f64(), DM);
    for c in 0..32 {
        assert_eq!(fb.data().get(30, 0, c), 200.0, "channel {c}");
    }
}

#[test]
fn test_run_estimates_dm_into_single_band() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.fil");
    let output = dir.path().join("out.fil");
    write_pulsar(&input);

    let config = DedisperseConfig {
        input: Some(input),
        output: Some(output.clone()),
        n_bands: Some(1),
        ..DedisperseConfig::default()
    };

    let summary = run(&config).unwrap();
    let dm = summary.dm.value().unwrap();
    assert!((dm - DM).abs() / DM < 0.03, "dm = {dm}");
    assert_eq!(summary.n_channels, 1);

    // Сложенный по полосе импульс заметно выше фона
    let fb = read_filterbank(fs::File::open(&output).unwrap()).unwrap();
    let series = fb.data().channel_series(0, 0);
    let peak = series.iter().cloned().fold(f32::MIN, f32::max);
    assert!(peak > 150.0, "peak = {peak}");
}

#[test]
fn test_run_unknown_dm_keeps_data() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.fil");
    let output = dir.path().join("out.fil");
    write_pulsar(&input);

    let config = DedisperseConfig {
        input: Some(input.clone()),
        output: Some(output.clone()),
        threshold: Some(250.0),
        nbits: sigfil_types::BitDepth::Bits8,
        ..DedisperseConfig::default()
    };

    let summary = run(&config).unwrap();
    assert_eq!(summary.dm, DmEstimate::Unknown);
    assert_eq!(fs::read(&output).unwrap(), fs::read(&input).unwrap());
}
