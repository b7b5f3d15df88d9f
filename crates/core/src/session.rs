//! Session-scoped dashboard state and the three events the presentation surface raises.
//!
//! A session owns its dataset handle and its criteria; nothing here is process-global
//! except the immutable fixture the dataset may point at.

use crate::aggregate::{self, Aggregation};
use crate::charts::{self, ChartSpec};
use crate::dispatch::{self, MailTransport, ReportForm};
use crate::domain::criteria::{DashboardOptions, FilterCriteria};
use crate::domain::dataset::Dataset;
use crate::domain::listing::NumericColumn;
use crate::error::Result;
use crate::filter;
use crate::ingest::{self, Source};
use crate::report::{self, ChartLabels, ReportArtifact};
use crate::trend;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Session {
    dataset: Arc<Dataset>,
    options: DashboardOptions,
    criteria: FilterCriteria,
}

impl Session {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let options = DashboardOptions::from_dataset(&dataset);
        let criteria = FilterCriteria::select_all(&dataset);
        Self {
            dataset,
            options,
            criteria,
        }
    }

    pub fn open(source: Source<'_>) -> Result<Self> {
        Ok(Self::new(ingest::load(source)?))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn options(&self) -> &DashboardOptions {
        &self.options
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Replaces the dataset with a new upload and resets the selectors.
    /// On error the session keeps its previous dataset and criteria.
    pub fn file_uploaded(&mut self, bytes: &[u8]) -> Result<()> {
        *self = Self::open(Source::Upload(bytes))?;
        Ok(())
    }

    /// On error the previous criteria stay in effect.
    pub fn filters_changed(&mut self, criteria: FilterCriteria) -> Result<()> {
        criteria.validate_against(&self.options)?;
        self.criteria = criteria;
        Ok(())
    }

    pub fn filtered(&self) -> Dataset {
        filter::apply(&self.dataset, &self.criteria)
    }

    /// Chart specs over the filtered dataset, with a freshly simulated trend.
    pub fn charts(&self) -> Vec<ChartSpec> {
        let trend = trend::simulate(&mut rand::thread_rng());
        charts::dashboard_charts(&self.filtered(), &trend)
    }

    pub fn aggregate(&self, column: NumericColumn) -> Result<Aggregation> {
        aggregate::mean_by_exchange(&self.filtered(), column)
    }

    pub fn render_report(&self) -> Result<ReportArtifact> {
        let aggregation = self.aggregate(NumericColumn::RoundLotSize)?;
        report::render_bar_chart(&aggregation, &ChartLabels::round_lot_report())
    }

    /// Aggregates, renders and sends the report once. The session is left untouched
    /// whatever the outcome.
    pub async fn report_submitted(
        &self,
        transport: &dyn MailTransport,
        form: ReportForm,
        timeout: Duration,
    ) -> Result<()> {
        form.validate()?;
        let artifact = self.render_report()?;
        dispatch::dispatch_report(transport, form, artifact, timeout).await
    }
}
