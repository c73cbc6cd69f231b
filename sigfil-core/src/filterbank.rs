//! Пара заголовок + матрица, которую проходят все преобразования.

use sigfil_types::{FilError, FilResult, HeaderDictionary};

use crate::{
    decimate::{combine_channels, combine_samples, DecimationPlan},
    dedisperse::{dedisperse, DedispersionConfig, DedispersionOutcome},
    format::{decode, encode},
    matrix::{Dims, SampleMatrix},
    ridge::{DmEstimate, RidgeTracer},
};

/// Filterbank в памяти.
///
/// Размеры осей заголовка всегда совпадают с размерами матрицы. Методы
/// преобразований заменяют матрицу целиком и меняют заголовок только при
/// успехе.
#[derive(Debug, Clone, PartialEq)]
pub struct Filterbank {
    header: HeaderDictionary,
    data: SampleMatrix,
}

impl Filterbank {
    /// Связывает заголовок и матрицу, проверяя совпадение размеров.
    pub fn new(
        header: HeaderDictionary,
        data: SampleMatrix,
    ) -> FilResult<Self> {
        let declared = Dims::from_header(&header);
        if declared != data.dims() {
            return Err(FilError::format_violation(format!(
                "header declares {}x{}x{}, matrix is {}x{}x{}",
                declared.n_samples,
                declared.n_ifs,
                declared.n_channels,
                data.n_samples(),
                data.n_ifs(),
                data.n_channels(),
            )));
        }

        Ok(Self { header, data })
    }

    pub fn decode(bytes: &[u8]) -> FilResult<Self> {
        let (header, data) = decode(bytes)?;
        Ok(Self { header, data })
    }

    pub fn encode(
        &self,
        headerless: bool,
    ) -> FilResult<Vec<u8>> {
        encode(&self.header, &self.data, headerless)
    }

    pub fn header(&self) -> &HeaderDictionary {
        &self.header
    }

    /// Изменяемый заголовок. Поля размеров менять нельзя: `encode` проверит
    /// их согласованность с матрицей.
    pub fn header_mut(&mut self) -> &mut HeaderDictionary {
        &mut self.header
    }

    pub fn data(&self) -> &SampleMatrix {
        &self.data
    }

    pub fn into_parts(self) -> (HeaderDictionary, SampleMatrix) {
        (self.header, self.data)
    }

    pub fn combine_channels(
        &mut self,
        factor: usize,
    ) -> FilResult<()> {
        self.data = combine_channels(&self.data, &mut self.header, factor)?;
        Ok(())
    }

    pub fn combine_samples(
        &mut self,
        factor: usize,
    ) -> FilResult<()> {
        self.data = combine_samples(&self.data, &mut self.header, factor)?;
        Ok(())
    }

    pub fn decimate(
        &mut self,
        plan: &DecimationPlan,
    ) -> FilResult<()> {
        self.data = plan.apply(&self.data, &mut self.header)?;
        Ok(())
    }

    /// Дедисперсия на месте. Возвращает использованную меру дисперсии.
    pub fn dedisperse(
        &mut self,
        config: &DedispersionConfig,
        tracer: &dyn RidgeTracer,
    ) -> FilResult<DmEstimate> {
        let DedispersionOutcome { matrix, dm, .. } = dedisperse(&self.data, &mut self.header, config, tracer)?;
        self.data = matrix;
        Ok(dm)
    }
}
