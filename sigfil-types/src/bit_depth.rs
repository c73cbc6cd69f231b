use crate::{FilError, FilResult};

/// Разрядность одной ячейки данных filterbank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BitDepth {
    /// 8-битные беззнаковые целые
    Bits8 = 8,
    /// 16-битные беззнаковые целые
    Bits16 = 16,
    /// 32-битные IEEE-754 float
    Bits32 = 32,
}

impl BitDepth {
    pub fn from_u32(v: u32) -> FilResult<Self> {
        match v {
            8 => Ok(BitDepth::Bits8),
            16 => Ok(BitDepth::Bits16),
            32 => Ok(BitDepth::Bits32),
            _ => Err(FilError::UnsupportedBitDepth(v)),
        }
    }

    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Размер одной ячейки в байтах
    pub fn cell_size(&self) -> usize {
        match self {
            BitDepth::Bits8 => 1,
            BitDepth::Bits16 => 2,
            BitDepth::Bits32 => 4,
        }
    }
}

impl std::fmt::Display for BitDepth {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}-bit", self.as_u32())
    }
}

/// Принимает `8`, `16`, `32`, в том числе с суффиксом `bit` / `-bit`.
impl std::str::FromStr for BitDepth {
    type Err = FilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let digits = lower
            .strip_suffix("-bit")
            .or_else(|| lower.strip_suffix("bit"))
            .unwrap_or(lower.as_str());

        let bits: u32 = digits
            .trim()
            .parse()
            .map_err(|e| FilError::format_violation(format!("Invalid bit depth '{s}': {e}")))?;

        BitDepth::from_u32(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_depth_sizes() {
        assert_eq!(BitDepth::Bits8.cell_size(), 1);
        assert_eq!(BitDepth::Bits16.cell_size(), 2);
        assert_eq!(BitDepth::Bits32.cell_size(), 4);
    }

    #[test]
    fn test_bit_depth_rejects_others() {
        assert!(BitDepth::from_u32(4).is_err());
        assert!(BitDepth::from_u32(64).is_err());
        assert_eq!("16".parse::<BitDepth>().unwrap(), BitDepth::Bits16);
        assert_eq!("8bit".parse::<BitDepth>().unwrap(), BitDepth::Bits8);
        assert_eq!(" 32-bit ".parse::<BitDepth>().unwrap(), BitDepth::Bits32);
        assert!("12".parse::<BitDepth>().is_err());
        assert!("sixteen".parse::<BitDepth>().is_err());
    }
}
