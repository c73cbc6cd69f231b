/// Ось матрицы выборок `[sample][if][channel]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Временные отсчёты
    Sample,
    /// Интерфейсы (поляризации / поддиапазоны)
    Interface,
    /// Частотные каналы
    Channel,
}

impl Axis {
    /// Имя соответствующего поля заголовка.
    pub fn header_key(&self) -> &'static str {
        match self {
            Axis::Sample => crate::keys::NSAMPLES,
            Axis::Interface => crate::keys::NIFS,
            Axis::Channel => crate::keys::NCHANS,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Axis::Sample => write!(f, "sample"),
            Axis::Interface => write!(f, "interface"),
            Axis::Channel => write!(f, "channel"),
        }
    }
}
