use serde::Serialize;
use sigfil_types::{HeaderDictionary, TelescopeTable};

/// Сводка заголовка для вывода пользователю.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderSummary {
    pub source_name: Option<String>,
    pub telescope: String,
    pub backend: String,
    pub nbits: u32,
    pub n_samples: usize,
    pub n_ifs: usize,
    pub n_channels: usize,
    /// Секунды
    pub tsamp: f64,
    /// МГц
    pub fch1: f64,
    /// МГц
    pub foff: f64,
    /// МГц
    pub center_freq: f64,
    /// Модуль полосы, МГц
    pub bandwidth: f64,
    /// Длительность записи, секунды
    pub duration: f64,
    /// Все поля заголовка как есть
    pub fields: HeaderDictionary,
}

impl HeaderSummary {
    /// Собирает сводку, разрешая имена телескопа и бэкенда через `table`.
    pub fn new(
        header: &HeaderDictionary,
        table: &TelescopeTable,
    ) -> Self {
        let telescope = resolve(header.telescope_id(), table.telescope_name(header.telescope_id()));
        let backend = resolve(header.machine_id(), table.backend_name(header.machine_id()));

        Self {
            source_name: header.source_name().map(str::to_string),
            telescope,
            backend,
            nbits: header.nbits(),
            n_samples: header.n_samples(),
            n_ifs: header.n_ifs(),
            n_channels: header.n_channels(),
            tsamp: header.tsamp(),
            fch1: header.fch1(),
            foff: header.foff(),
            center_freq: header.center_freq(),
            bandwidth: (header.n_channels() as f64 * header.foff()).abs(),
            duration: header.n_samples() as f64 * header.tsamp(),
            fields: header.clone(),
        }
    }
}

fn resolve(
    id: u32,
    name: Option<&str>,
) -> String {
    match name {
        Some(name) => name.to_string(),
        None => format!("unknown ({id})"),
    }
}

impl std::fmt::Display for HeaderSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Source        : {}", self.source_name.as_deref().unwrap_or("-"))?;
        writeln!(f, "  Telescope     : {}", self.telescope)?;
        writeln!(f, "  Backend       : {}", self.backend)?;
        writeln!(f, "  Bits          : {}", self.nbits)?;
        writeln!(
            f,
            "  Shape         : {} samples x {} IF x {} channels",
            self.n_samples, self.n_ifs, self.n_channels
        )?;
        writeln!(f, "  Sample time   : {:.6} ms", self.tsamp * 1e3)?;
        writeln!(f, "  fch1 / foff   : {:.4} / {:.6} MHz", self.fch1, self.foff)?;
        writeln!(f, "  Center freq   : {:.4} MHz", self.center_freq)?;
        writeln!(f, "  Bandwidth     : {:.4} MHz", self.bandwidth)?;
        writeln!(f, "  Duration      : {:.3} s", self.duration)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> HeaderDictionary {
        let mut h = HeaderDictionary::new();
        h.set("telescope_id", 4u32).unwrap();
        h.set("machine_id", 99u32).unwrap();
        h.set("source_name", "J0437-4715").unwrap();
        h.set("nbits", 8u32).unwrap();
        h.set_n_samples(1000);
        h.set_n_ifs(1);
        h.set_n_channels(64);
        h.set_fch1(1500.0);
        h.set_foff(-0.5);
        h.set_tsamp(64e-6);
        h
    }

    #[test]
    fn test_summary_resolves_names() {
        let summary = HeaderSummary::new(&header(), &TelescopeTable::sigproc());

        assert_eq!(summary.telescope, "Parkes");
        assert_eq!(summary.backend, "unknown (99)");
        assert_eq!(summary.source_name.as_deref(), Some("J0437-4715"));
        assert_eq!(summary.bandwidth, 32.0);
        assert_eq!(summary.center_freq, 1484.0);
        assert!((summary.duration - 0.064).abs() < 1e-12);
    }

    #[test]
    fn test_injected_table() {
        const CUSTOM: TelescopeTable = TelescopeTable::new(&[(4, "Murriyang")], &[(99, "UWL")]);

        let summary = HeaderSummary::new(&header(), &CUSTOM);
        assert_eq!(summary.telescope, "Murriyang");
        assert_eq!(summary.backend, "UWL");
    }

    #[test]
    fn test_display_lists_shape() {
        let text = HeaderSummary::new(&header(), &TelescopeTable::sigproc()).to_string();

        assert!(text.contains("1000 samples x 1 IF x 64 channels"));
        assert!(text.contains("Parkes"));
    }
}
