//! Типизированный словарь заголовка filterbank.
//!
//! Тип каждого поля задаётся закрытой схемой [`SCHEMA`] по имени ключа и
//! известен до чтения значения из потока. Ключи вне схемы отклоняются.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{BitDepth, FilError, FilResult};

/// Имена полей заголовка
pub mod keys {
    pub const TELESCOPE_ID: &str = "telescope_id";
    pub const MACHINE_ID: &str = "machine_id";
    pub const DATA_TYPE: &str = "data_type";
    pub const NCHANS: &str = "nchans";
    pub const NBITS: &str = "nbits";
    pub const NIFS: &str = "nifs";
    pub const NSAMPLES: &str = "nsamples";
    pub const BARYCENTRIC: &str = "barycentric";
    pub const PULSARCENTRIC: &str = "pulsarcentric";
    pub const NBEAMS: &str = "nbeams";
    pub const IBEAM: &str = "ibeam";
    pub const NBINS: &str = "nbins";

    pub const FCH1: &str = "fch1";
    pub const FOFF: &str = "foff";
    pub const TSAMP: &str = "tsamp";
    pub const TSTART: &str = "tstart";
    pub const AZ_START: &str = "az_start";
    pub const ZA_START: &str = "za_start";
    pub const SRC_RAJ: &str = "src_raj";
    pub const SRC_DEJ: &str = "src_dej";
    pub const REFDM: &str = "refdm";
    pub const PERIOD: &str = "period";

    pub const SOURCE_NAME: &str = "source_name";
    pub const RAWDATAFILE: &str = "rawdatafile";
}

/// Тип значения поля на проводе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    /// 4-байтовое беззнаковое целое
    Integer,
    /// 8-байтовый IEEE-754 double
    Double,
    /// Строка с u32-префиксом длины
    Text,
}

/// Закрытая схема заголовка: имя → тип.
pub const SCHEMA: &[(&str, FieldKind)] = &[
    (keys::TELESCOPE_ID, FieldKind::Integer),
    (keys::MACHINE_ID, FieldKind::Integer),
    (keys::DATA_TYPE, FieldKind::Integer),
    (keys::NCHANS, FieldKind::Integer),
    (keys::NBITS, FieldKind::Integer),
    (keys::NIFS, FieldKind::Integer),
    (keys::NSAMPLES, FieldKind::Integer),
    (keys::BARYCENTRIC, FieldKind::Integer),
    (keys::PULSARCENTRIC, FieldKind::Integer),
    (keys::NBEAMS, FieldKind::Integer),
    (keys::IBEAM, FieldKind::Integer),
    (keys::NBINS, FieldKind::Integer),
    (keys::FCH1, FieldKind::Double),
    (keys::FOFF, FieldKind::Double),
    (keys::TSAMP, FieldKind::Double),
    (keys::TSTART, FieldKind::Double),
    (keys::AZ_START, FieldKind::Double),
    (keys::ZA_START, FieldKind::Double),
    (keys::SRC_RAJ, FieldKind::Double),
    (keys::SRC_DEJ, FieldKind::Double),
    (keys::REFDM, FieldKind::Double),
    (keys::PERIOD, FieldKind::Double),
    (keys::SOURCE_NAME, FieldKind::Text),
    (keys::RAWDATAFILE, FieldKind::Text),
];

/// Возвращает тип поля по схеме. Неизвестный ключ — ошибка формата.
pub fn classify(key: &str) -> FilResult<FieldKind> {
    SCHEMA
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| FilError::unknown_key(key))
}

/// Значение поля заголовка
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Integer(u32),
    Double(f64),
    Text(String),
}

/// Заголовок filterbank: ключ → типизированное значение.
///
/// Порядок обхода — лексикографический по ключу, поэтому кодирование
/// детерминировано.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HeaderDictionary {
    fields: BTreeMap<String, HeaderValue>,
}

////////////////////////////////////////////////////////////////////////////////
// HeaderValue
////////////////////////////////////////////////////////////////////////////////

impl HeaderValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            HeaderValue::Integer(_) => FieldKind::Integer,
            HeaderValue::Double(_) => FieldKind::Double,
            HeaderValue::Text(_) => FieldKind::Text,
        }
    }

    /// Нулевое значение считается «не задано» и не кодируется.
    pub fn is_zero(&self) -> bool {
        match self {
            HeaderValue::Integer(v) => *v == 0,
            HeaderValue::Double(v) => *v == 0.0,
            HeaderValue::Text(s) => s.is_empty(),
        }
    }

    /// Числовое значение как целое (double усекается, текст даёт 0).
    pub fn as_u32(&self) -> u32 {
        match self {
            HeaderValue::Integer(v) => *v,
            HeaderValue::Double(v) => *v as u32,
            HeaderValue::Text(_) => 0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            HeaderValue::Integer(v) => *v as f64,
            HeaderValue::Double(v) => *v,
            HeaderValue::Text(_) => 0.0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<u32> for HeaderValue {
    fn from(v: u32) -> Self {
        HeaderValue::Integer(v)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Double(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Text(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Text(v)
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            HeaderValue::Integer(v) => write!(f, "{v}"),
            HeaderValue::Double(v) => write!(f, "{v}"),
            HeaderValue::Text(s) => write!(f, "{s}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// HeaderDictionary: общий доступ
////////////////////////////////////////////////////////////////////////////////

impl HeaderDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Тип поля по схеме.
    pub fn classify(key: &str) -> FilResult<FieldKind> {
        classify(key)
    }

    /// Значение поля или `Integer(0)`, если поле не задано.
    pub fn get(
        &self,
        key: &str,
    ) -> HeaderValue {
        self.fields
            .get(key)
            .cloned()
            .unwrap_or(HeaderValue::Integer(0))
    }

    /// Ссылка на значение, если поле задано.
    pub fn value(
        &self,
        key: &str,
    ) -> Option<&HeaderValue> {
        self.fields.get(key)
    }

    /// Записывает значение, проверяя ключ и тип по схеме.
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<HeaderValue>,
    ) -> FilResult<()> {
        let value = value.into();
        let expected = classify(key)?;

        if value.kind() != expected {
            return Err(FilError::TypeMismatch {
                key: key.to_string(),
                expected,
                found: value.kind(),
            });
        }

        self.fields.insert(key.to_string(), value);

        Ok(())
    }

    pub fn remove(
        &mut self,
        key: &str,
    ) -> Option<HeaderValue> {
        self.fields.remove(key)
    }

    pub fn contains(
        &self,
        key: &str,
    ) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    // Ключ из `keys` с верным типом: схема гарантирует успех.
    fn put(
        &mut self,
        key: &'static str,
        value: HeaderValue,
    ) {
        debug_assert_eq!(classify(key).ok(), Some(value.kind()));
        self.fields.insert(key.to_string(), value);
    }
}

////////////////////////////////////////////////////////////////////////////////
// HeaderDictionary: типизированные поля и производные величины
////////////////////////////////////////////////////////////////////////////////

impl HeaderDictionary {
    pub fn n_channels(&self) -> usize {
        self.get(keys::NCHANS).as_u32() as usize
    }

    pub fn n_ifs(&self) -> usize {
        self.get(keys::NIFS).as_u32() as usize
    }

    pub fn n_samples(&self) -> usize {
        self.get(keys::NSAMPLES).as_u32() as usize
    }

    pub fn nbits(&self) -> u32 {
        self.get(keys::NBITS).as_u32()
    }

    pub fn bit_depth(&self) -> FilResult<BitDepth> {
        BitDepth::from_u32(self.nbits())
    }

    /// Байт на одну ячейку (nbits / 8).
    pub fn bytes_per_sample(&self) -> usize {
        (self.nbits() / 8) as usize
    }

    /// Частота первого канала, МГц
    pub fn fch1(&self) -> f64 {
        self.get(keys::FCH1).as_f64()
    }

    /// Шаг по частоте между каналами, МГц (обычно отрицательный)
    pub fn foff(&self) -> f64 {
        self.get(keys::FOFF).as_f64()
    }

    /// Интервал между отсчётами, секунды
    pub fn tsamp(&self) -> f64 {
        self.get(keys::TSAMP).as_f64()
    }

    /// Время первого отсчёта, MJD
    pub fn tstart(&self) -> f64 {
        self.get(keys::TSTART).as_f64()
    }

    pub fn telescope_id(&self) -> u32 {
        self.get(keys::TELESCOPE_ID).as_u32()
    }

    pub fn machine_id(&self) -> u32 {
        self.get(keys::MACHINE_ID).as_u32()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.value(keys::SOURCE_NAME).and_then(HeaderValue::as_text)
    }

    /// Центральная частота: fch1 + nchans·foff/2.
    pub fn center_freq(&self) -> f64 {
        self.fch1() + self.n_channels() as f64 * self.foff() / 2.0
    }

    /// Частота канала `channel`, МГц.
    pub fn channel_freq(
        &self,
        channel: usize,
    ) -> f64 {
        self.fch1() + channel as f64 * self.foff()
    }

    pub fn set_n_channels(
        &mut self,
        n: usize,
    ) {
        self.put(keys::NCHANS, HeaderValue::Integer(to_u32(n)));
    }

    pub fn set_n_ifs(
        &mut self,
        n: usize,
    ) {
        self.put(keys::NIFS, HeaderValue::Integer(to_u32(n)));
    }

    pub fn set_n_samples(
        &mut self,
        n: usize,
    ) {
        self.put(keys::NSAMPLES, HeaderValue::Integer(to_u32(n)));
    }

    pub fn set_bit_depth(
        &mut self,
        bits: BitDepth,
    ) {
        self.put(keys::NBITS, HeaderValue::Integer(bits.as_u32()));
    }

    pub fn set_fch1(
        &mut self,
        mhz: f64,
    ) {
        self.put(keys::FCH1, HeaderValue::Double(mhz));
    }

    pub fn set_foff(
        &mut self,
        mhz: f64,
    ) {
        self.put(keys::FOFF, HeaderValue::Double(mhz));
    }

    pub fn set_tsamp(
        &mut self,
        secs: f64,
    ) {
        self.put(keys::TSAMP, HeaderValue::Double(secs));
    }

    pub fn set_tstart(
        &mut self,
        mjd: f64,
    ) {
        self.put(keys::TSTART, HeaderValue::Double(mjd));
    }

    /// Сдвигает `fch1` так, чтобы центральная частота стала равна `mhz`.
    pub fn set_center_freq(
        &mut self,
        mhz: f64,
    ) {
        let half_band = self.n_channels() as f64 * self.foff() / 2.0;
        self.set_fch1(mhz - half_band);
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
