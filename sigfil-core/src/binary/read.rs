use byteorder::{ByteOrder, LittleEndian};
use sigfil_types::{FieldKind, FilError, FilResult, HeaderValue};

/// Курсор чтения little-endian примитивов из полностью буферизованного потока.
///
/// Любое чтение за концом буфера даёт [`FilError::Truncated`].
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    off: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, off: 0 }
    }

    /// Курсор, установленный на смещение `off`.
    pub fn at(
        buf: &'a [u8],
        off: usize,
    ) -> FilResult<Self> {
        if off > buf.len() {
            return Err(FilError::Truncated {
                offset: buf.len(),
                needed: off - buf.len(),
                available: 0,
            });
        }

        Ok(Self { buf, off })
    }

    pub fn offset(&self) -> usize {
        self.off
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.off
    }

    pub fn take(
        &mut self,
        n: usize,
    ) -> FilResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(FilError::Truncated {
                offset: self.off,
                needed: n,
                available: self.remaining(),
            });
        }

        let bytes = &self.buf[self.off..self.off + n];
        self.off += n;

        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> FilResult<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> FilResult<f64> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    /// Строка с u32-префиксом длины.
    pub fn read_token(&mut self) -> FilResult<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;

        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Значение поля заголовка заданного типа.
    pub fn read_value(
        &mut self,
        kind: FieldKind,
    ) -> FilResult<HeaderValue> {
        match kind {
            FieldKind::Integer => self.read_u32().map(HeaderValue::Integer),
            FieldKind::Double => self.read_f64().map(HeaderValue::Double),
            FieldKind::Text => self.read_token().map(HeaderValue::Text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(&1.5f64.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(b"abc");

        let mut cur = ByteCursor::new(&buf);
        assert_eq!(cur.read_u32().unwrap(), 7);
        assert_eq!(cur.read_f64().unwrap(), 1.5);
        assert_eq!(cur.read_token().unwrap(), "abc");
        assert_eq!(cur.remaining(), 0);
        assert_eq!(cur.offset(), buf.len());
    }

    #[test]
    fn test_truncated_read() {
        let buf = [1u8, 2];
        let mut cur = ByteCursor::new(&buf);

        match cur.read_u32() {
            Err(FilError::Truncated {
                offset,
                needed,
                available,
            }) => {
                assert_eq!((offset, needed, available), (0, 4, 2));
            }
            other => panic!("ожидался Truncated, получено {other:?}"),
        }
    }

    #[test]
    fn test_token_longer_than_stream() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&100u32.to_le_bytes());
        buf.extend_from_slice(b"short");

        let mut cur = ByteCursor::new(&buf);
        assert!(matches!(
            cur.read_token(),
            Err(FilError::Truncated { .. })
        ));
    }

    #[test]
    fn test_cursor_at_past_end() {
        let buf = [0u8; 4];
        assert!(ByteCursor::at(&buf, 4).is_ok());
        assert!(ByteCursor::at(&buf, 5).is_err());
    }
}
