//! Бинарный формат sigproc filterbank.
//!
//! ```text
//! [u32 len]["HEADER_START"]
//! { [u32 len][key] [typed value] }*
//! [u32 len]["HEADER_END"]
//! <ячейки данных, порядок [sample][if][channel]>
//! ```
//!
//! Все многобайтовые числа хранятся в порядке little-endian. Тип значения
//! поля определяется схемой заголовка по имени ключа. Ширина ячейки
//! nbits/8 байт: 8/16 бит — беззнаковые целые, 32 бита — IEEE-754 float.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use sigfil_types::{classify, BitDepth, FilError, FilResult, HeaderDictionary};

use crate::{
    binary::{write_cells, write_token, write_value, ByteCursor},
    matrix::{Dims, SampleMatrix},
};

/// Маркер начала заголовка
pub const HEADER_START: &str = "HEADER_START";

/// Маркер конца заголовка
pub const HEADER_END: &str = "HEADER_END";

/// Декодирует заголовок.
///
/// Возвращает словарь и длину заголовка в байтах (смещение сразу после
/// `HEADER_END`). Если `nsamples` не задан, он выводится из размера данных.
/// Отсутствующий `nifs` считается равным 1.
pub fn decode_header(bytes: &[u8]) -> FilResult<(HeaderDictionary, usize)> {
    let mut cur = ByteCursor::new(bytes);

    let magic_len = cur
        .read_u32()
        .map_err(|_| FilError::invalid_magic("<stream shorter than 4 bytes>"))?
        as usize;
    if magic_len != HEADER_START.len() {
        return Err(FilError::invalid_magic(format!(
            "<token of {magic_len} bytes>"
        )));
    }

    let magic = cur.take(magic_len)?;
    if magic != HEADER_START.as_bytes() {
        return Err(FilError::invalid_magic(
            String::from_utf8_lossy(magic).into_owned(),
        ));
    }

    let mut header = HeaderDictionary::new();

    loop {
        let token = cur.read_token()?;
        if token == HEADER_END {
            break;
        }

        let kind = classify(&token)?;
        let value = cur.read_value(kind)?;
        header.set(&token, value)?;
    }

    let header_len = cur.offset();

    derive_fields(&mut header, bytes.len(), header_len)?;

    debug!(
        "decoded header: {} fields, {header_len} bytes, {}x{}x{} @ {} bit",
        header.len(),
        header.n_samples(),
        header.n_ifs(),
        header.n_channels(),
        header.nbits(),
    );

    Ok((header, header_len))
}

/// Декодирует данные, начинающиеся со смещения `header_len`.
pub fn decode_data(
    bytes: &[u8],
    header: &HeaderDictionary,
    header_len: usize,
) -> FilResult<SampleMatrix> {
    let depth = header.bit_depth()?;
    let dims = Dims::from_header(header);
    let n_bytes = dims
        .checked_len()
        .and_then(|n| n.checked_mul(depth.cell_size()))
        .ok_or_else(|| FilError::format_violation("data size overflows usize"))?;

    let mut cur = ByteCursor::at(bytes, header_len)?;
    let raw = cur.take(n_bytes)?;

    let data: Vec<f32> = match depth {
        BitDepth::Bits8 => raw.iter().map(|&b| b as f32).collect(),
        BitDepth::Bits16 => raw
            .chunks_exact(2)
            .map(|c| LittleEndian::read_u16(c) as f32)
            .collect(),
        BitDepth::Bits32 => raw.chunks_exact(4).map(LittleEndian::read_f32).collect(),
    };

    SampleMatrix::new(dims, data)
}

/// Декодирует весь поток: заголовок и данные.
pub fn decode(bytes: &[u8]) -> FilResult<(HeaderDictionary, SampleMatrix)> {
    let (header, header_len) = decode_header(bytes)?;
    let matrix = decode_data(bytes, &header, header_len)?;

    Ok((header, matrix))
}

/// Кодирует заголовок и матрицу в байты.
///
/// Поля с нулевым значением считаются незаданными и не пишутся. При
/// `headerless` пишутся только данные. Размеры матрицы обязаны совпадать с
/// заголовком.
pub fn encode(
    header: &HeaderDictionary,
    matrix: &SampleMatrix,
    headerless: bool,
) -> FilResult<Vec<u8>> {
    let depth = header.bit_depth()?;
    let header_dims = Dims::from_header(header);

    if header_dims != matrix.dims() {
        return Err(FilError::format_violation(format!(
            "header declares {}x{}x{}, matrix is {}x{}x{}",
            header_dims.n_samples,
            header_dims.n_ifs,
            header_dims.n_channels,
            matrix.n_samples(),
            matrix.n_ifs(),
            matrix.n_channels(),
        )));
    }

    let mut buf = Vec::with_capacity(matrix.len() * depth.cell_size() + 512);

    if !headerless {
        encode_header(&mut buf, header)?;
    }

    // Блоки по nchans ячеек в порядке [sample][if]
    if matrix.n_channels() > 0 {
        for block in matrix.as_slice().chunks_exact(matrix.n_channels()) {
            write_cells(&mut buf, block, depth)?;
        }
    }

    Ok(buf)
}

fn encode_header(
    buf: &mut Vec<u8>,
    header: &HeaderDictionary,
) -> FilResult<()> {
    write_token(buf, HEADER_START)?;

    for (key, value) in header.iter() {
        if value.is_zero() {
            continue;
        }

        write_token(buf, key)?;
        write_value(buf, value)?;
    }

    write_token(buf, HEADER_END)?;

    Ok(())
}

fn derive_fields(
    header: &mut HeaderDictionary,
    total_len: usize,
    header_len: usize,
) -> FilResult<()> {
    let depth = header.bit_depth()?;

    if header.n_ifs() == 0 {
        header.set_n_ifs(1);
    }

    if header.n_samples() == 0 {
        let frame = depth
            .cell_size()
            .checked_mul(header.n_channels())
            .and_then(|n| n.checked_mul(header.n_ifs()))
            .ok_or_else(|| {
                FilError::format_violation(format!(
                    "frame of {} channels x {} IFs overflows",
                    header.n_channels(),
                    header.n_ifs()
                ))
            })?;
        if frame == 0 {
            return Err(FilError::format_violation(
                "cannot derive nsamples: nchans is 0",
            ));
        }

        header.set_n_samples((total_len - header_len) / frame);
    }

    Ok(())
}
