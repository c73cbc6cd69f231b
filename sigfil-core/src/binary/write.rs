use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use sigfil_types::{BitDepth, FilError, FilResult, HeaderValue};

/// Записывает строку с u32-префиксом длины.
pub fn write_token<W: Write>(
    w: &mut W,
    token: &str,
) -> FilResult<()> {
    let len = u32::try_from(token.len()).map_err(|_| {
        FilError::format_violation(format!("token of {} bytes exceeds u32", token.len()))
    })?;

    w.write_u32::<LittleEndian>(len)?;
    w.write_all(token.as_bytes())?;

    Ok(())
}

/// Записывает значение поля заголовка в его проводном типе.
pub fn write_value<W: Write>(
    w: &mut W,
    value: &HeaderValue,
) -> FilResult<()> {
    match value {
        HeaderValue::Integer(v) => w.write_u32::<LittleEndian>(*v)?,
        HeaderValue::Double(v) => w.write_f64::<LittleEndian>(*v)?,
        HeaderValue::Text(s) => write_token(w, s)?,
    }

    Ok(())
}

/// Записывает ячейки, сужая float до разрядности `depth`.
///
/// Для 8/16 бит используется `as`-приведение: дробная часть отбрасывается,
/// значения вне диапазона насыщаются (отрицательные и NaN дают 0).
pub fn write_cells<W: Write>(
    w: &mut W,
    cells: &[f32],
    depth: BitDepth,
) -> FilResult<()> {
    match depth {
        BitDepth::Bits8 => {
            let narrowed: Vec<u8> = cells.iter().map(|&v| v as u8).collect();
            w.write_all(&narrowed)?;
        }
        BitDepth::Bits16 => {
            for &v in cells {
                w.write_u16::<LittleEndian>(v as u16)?;
            }
        }
        BitDepth::Bits32 => {
            for &v in cells {
                w.write_f32::<LittleEndian>(v)?;
            }
        }
    }

    Ok(())
}
