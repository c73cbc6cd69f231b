use std::io::{BufReader, BufWriter, Read, Write};

use log::debug;
use sigfil_types::FilResult;

use crate::filterbank::Filterbank;

/// Читает поток до конца и декодирует его.
pub fn read_filterbank<R: Read>(inner: R) -> FilResult<Filterbank> {
    let mut reader = BufReader::new(inner);
    let mut bytes = Vec::new();

    reader.read_to_end(&mut bytes)?;
    debug!("read {} bytes", bytes.len());

    Filterbank::decode(&bytes)
}

/// Кодирует filterbank целиком и только затем пишет его в поток.
///
/// Ошибка кодирования не оставляет в потоке частичной записи.
pub fn write_filterbank<W: Write>(
    inner: W,
    filterbank: &Filterbank,
    headerless: bool,
) -> FilResult<()> {
    let bytes = filterbank.encode(headerless)?;
    let mut writer = BufWriter::new(inner);

    writer.write_all(&bytes)?;
    writer.flush()?;

    debug!("wrote {} bytes", bytes.len());

    Ok(())
}
