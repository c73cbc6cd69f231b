/// Таблица имён телескопов и бэкендов по их sigproc-идентификаторам.
///
/// Таблица неизменяема и передаётся явно туда, где нужно разрешение имён
/// (например, в сводку заголовка).
#[derive(Debug, Clone, Copy)]
pub struct TelescopeTable {
    telescopes: &'static [(u32, &'static str)],
    backends: &'static [(u32, &'static str)],
}

const SIGPROC_TELESCOPES: &[(u32, &str)] = &[
    (0, "Fake"),
    (1, "Arecibo"),
    (2, "Ooty"),
    (3, "Nancay"),
    (4, "Parkes"),
    (5, "Jodrell"),
    (6, "GBT"),
    (7, "GMRT"),
    (8, "Effelsberg"),
    (9, "ATA"),
    (10, "SRT"),
    (11, "LOFAR"),
    (12, "VLA"),
    (20, "CHIME"),
    (21, "FAST"),
    (64, "MeerKAT"),
    (65, "KAT-7"),
];

const SIGPROC_BACKENDS: &[(u32, &str)] = &[
    (0, "FAKE"),
    (1, "PSPM"),
    (2, "WAPP"),
    (3, "AOFTM"),
    (4, "BPP"),
    (5, "OOTY"),
    (6, "SCAMP"),
    (7, "GMRTFB"),
    (8, "PULSAR2000"),
    (9, "PARSPEC"),
    (10, "BPSR"),
    (14, "GMRTNEW"),
    (20, "CHIME"),
    (64, "KAT"),
    (65, "KAT-DC2"),
];

impl TelescopeTable {
    pub const fn new(
        telescopes: &'static [(u32, &'static str)],
        backends: &'static [(u32, &'static str)],
    ) -> Self {
        Self {
            telescopes,
            backends,
        }
    }

    /// Стандартные идентификаторы sigproc.
    pub const fn sigproc() -> Self {
        Self::new(SIGPROC_TELESCOPES, SIGPROC_BACKENDS)
    }

    pub fn telescope_name(
        &self,
        id: u32,
    ) -> Option<&'static str> {
        lookup(self.telescopes, id)
    }

    pub fn backend_name(
        &self,
        id: u32,
    ) -> Option<&'static str> {
        lookup(self.backends, id)
    }
}

impl Default for TelescopeTable {
    fn default() -> Self {
        Self::sigproc()
    }
}

fn lookup(
    table: &'static [(u32, &'static str)],
    id: u32,
) -> Option<&'static str> {
    table
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, name)| *name)
}
