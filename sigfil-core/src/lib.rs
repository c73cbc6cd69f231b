//! Библиотека обработки filterbank-файлов sigproc
//!
//! Кодек формата, понижение разрешения по частоте и времени и коррекция
//! дисперсии для данных наблюдений пульсаров.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use sigfil_core::{read_filterbank, write_filterbank, DecimationPlan};
//! use std::fs::File;
//!
//! let mut fb = read_filterbank(File::open("pulsar.fil")?)?;
//! fb.decimate(&DecimationPlan::new(4, 2))?;
//! write_filterbank(File::create("pulsar_4x2.fil")?, &fb, false)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binary;
pub mod decimate;
pub mod dedisperse;
pub mod filterbank;
pub mod format;
pub mod matrix;
pub mod ridge;
pub mod serialization;
pub mod summary;

pub use binary::*;
pub use decimate::*;
pub use dedisperse::*;
pub use filterbank::*;
pub use format::*;
pub use matrix::*;
pub use ridge::*;
pub use serialization::*;
pub use summary::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
