use std::path::Path;

use chrono::NaiveDate;

use crate::chart::render::{self, ChartArtifact, ChartError};
use crate::chart::request::{ChartKind, ChartRequest};
use crate::chart::resolver::{eligible_name_columns, resolve_axes, AxisChoices, ResolveError};
use crate::chart::summary::{self, KeyStats};
use crate::color::Theme;
use crate::data::detect;
use crate::data::filter::{self, FilterColumns, FilterState};
use crate::data::loader::{self, LoadError};
use crate::data::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Loaded source
// ---------------------------------------------------------------------------

/// A successfully loaded file and the optional columns found in it.
pub struct Source {
    pub file_name: String,
    /// The dataset as loaded; filters never modify it.
    pub dataset: Dataset,
    pub date_columns: Vec<String>,
    pub year_columns: Vec<String>,
    pub category_columns: Vec<String>,
}

impl Source {
    fn new(file_name: String, dataset: Dataset) -> Self {
        let schema = dataset.schema();
        Source {
            file_name,
            date_columns: detect::date_columns(&schema),
            year_columns: detect::year_columns(&schema),
            category_columns: detect::category_columns(&schema),
            dataset,
        }
    }
}

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub text: String,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Status {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    fn warning(text: impl Into<String>) -> Self {
        Status {
            level: StatusLevel::Warning,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Status {
            level: StatusLevel::Error,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chart selection
// ---------------------------------------------------------------------------

/// The user's current chart controls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSelection {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
    pub title: String,
    pub theme: Theme,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full session state, independent of rendering. Every user interaction
/// is a method call on it.
#[derive(Default)]
pub struct AppState {
    /// Loaded file (None until the user opens one).
    pub source: Option<Source>,

    /// Which detected columns the range filters use.
    pub filter_columns: FilterColumns,

    pub filters: FilterState,

    /// The loaded dataset narrowed by the current filters.
    pub view: Option<Dataset>,

    pub selection: ChartSelection,

    /// Last chart successfully generated from the selection.
    pub chart: Option<ChartArtifact>,

    /// Status / error message shown in the UI.
    pub status: Option<Status>,
}

impl AppState {
    // -- File ----------------------------------------------------------------

    /// Parse an opened file and make it the session's data.
    ///
    /// On failure the previous data stays in place and the error is shown.
    pub fn load_bytes(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), LoadError> {
        self.ingest(file_name, loader::load_bytes(bytes))
    }

    /// Read and load a CSV file from disk. Files without a `.csv` extension
    /// are refused with a warning and leave the session untouched.
    pub fn load_path(&mut self, path: &Path) -> Result<(), LoadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if !loader::is_csv_path(path) {
            log::warn!("Ignoring non-CSV file {}", path.display());
            let err = LoadError::NotCsv(file_name);
            self.status = Some(Status::warning(err.to_string()));
            return Err(err);
        }
        self.ingest(&file_name, loader::load_file(path))
    }

    fn ingest(
        &mut self,
        file_name: &str,
        loaded: Result<Dataset, LoadError>,
    ) -> Result<(), LoadError> {
        match loaded {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} rows with columns {:?} from {file_name}",
                    dataset.len(),
                    dataset.column_names()
                );
                self.set_dataset(file_name.to_string(), dataset);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load {file_name}: {e}");
                self.status = Some(Status::error(format!("Error reading {file_name}: {e}")));
                Err(e)
            }
        }
    }

    /// Ingest a newly loaded dataset, reset filters and chart selection.
    pub fn set_dataset(&mut self, file_name: String, dataset: Dataset) {
        let source = Source::new(file_name, dataset);

        self.filter_columns = FilterColumns {
            date: source.date_columns.first().cloned(),
            year: source.year_columns.first().cloned(),
        };
        self.filters = FilterState::default();
        self.status = Some(if source.date_columns.is_empty() {
            Status::warning(format!(
                "Loaded {}. No date column was found in the data.",
                source.file_name
            ))
        } else {
            Status::info(format!("Loaded {}", source.file_name))
        });

        self.selection.x = None;
        self.selection.y = None;
        self.selection.color = None;
        self.chart = None;
        self.source = Some(source);
        self.refilter();
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.source.as_ref().map(|s| &s.dataset)
    }

    // -- Filters -------------------------------------------------------------

    /// Recompute the filtered view and repair selections against it. The
    /// shown chart no longer matches the rows, so it is dropped.
    pub fn refilter(&mut self) {
        self.view = self
            .source
            .as_ref()
            .map(|s| filter::apply(&s.dataset, &self.filters, &self.filter_columns));
        self.repair_selection();
    }

    /// Switch the date filter to another detected date column.
    pub fn set_date_column(&mut self, column: &str) {
        if self.filter_columns.date.as_deref() != Some(column) {
            self.filter_columns.date = Some(column.to_string());
            self.filters.date_range = None;
            self.refilter();
        }
    }

    pub fn set_year_column(&mut self, column: &str) {
        if self.filter_columns.year.as_deref() != Some(column) {
            self.filter_columns.year = Some(column.to_string());
            self.filters.year_range = None;
            self.refilter();
        }
    }

    /// Min/max of the active date column in the loaded data.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let col = self.filter_columns.date.as_deref()?;
        filter::date_bounds(self.dataset()?, col)
    }

    pub fn year_bounds(&self) -> Option<(i64, i64)> {
        let col = self.filter_columns.year.as_deref()?;
        filter::year_bounds(self.dataset()?, col)
    }

    /// Restrict rows to an inclusive date range; `None` clears the filter.
    /// Reversed bounds are swapped.
    pub fn set_date_range(&mut self, range: Option<(NaiveDate, NaiveDate)>) {
        self.filters.date_range = range.map(|(a, b)| (a.min(b), a.max(b)));
        self.refilter();
    }

    pub fn set_year_range(&mut self, range: Option<(i64, i64)>) {
        self.filters.year_range = range.map(|(a, b)| (a.min(b), a.max(b)));
        self.refilter();
    }

    /// Options of a category multiselect, from the loaded data.
    pub fn category_options(&self, column: &str) -> Vec<CellValue> {
        self.dataset()
            .map(|ds| ds.unique_values(column).into_iter().collect())
            .unwrap_or_default()
    }

    /// Toggle a single value in a column's multiselect.
    pub fn toggle_category(&mut self, column: &str, value: &CellValue) {
        let selected = self.filters.categories.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Empty a column's multiselect, which shows every row again.
    pub fn clear_category(&mut self, column: &str) {
        self.filters.categories.remove(column);
        self.refilter();
    }

    // -- Chart controls -------------------------------------------------------

    pub fn set_chart_kind(&mut self, kind: ChartKind) {
        self.selection.kind = kind;
        self.repair_selection();
    }

    pub fn set_x_column(&mut self, column: &str) {
        self.selection.x = Some(column.to_string());
        self.repair_selection();
    }

    pub fn set_y_column(&mut self, column: Option<&str>) {
        self.selection.y = column.map(str::to_string);
        self.chart = None;
    }

    pub fn set_color_column(&mut self, column: Option<&str>) {
        self.selection.color = column.map(str::to_string);
        self.chart = None;
    }

    pub fn set_title(&mut self, title: &str) {
        self.selection.title = title.to_string();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.selection.theme = theme;
    }

    /// Candidates for the X selector. Pie charts take their names field from
    /// the X selector, so only categorical columns are offered there.
    pub fn x_options(&self) -> Vec<String> {
        let Some(view) = &self.view else {
            return Vec::new();
        };
        let schema = view.schema();
        match self.selection.kind {
            ChartKind::Pie => eligible_name_columns(&schema),
            _ => schema.names().map(str::to_string).collect(),
        }
    }

    /// Resolver result for the current kind and X column.
    pub fn axis_choices(&self) -> Option<Result<AxisChoices, ResolveError>> {
        let view = self.view.as_ref()?;
        let schema = view.schema();
        let x = self.selection.x.as_deref().unwrap_or_default();
        Some(resolve_axes(&schema, self.selection.kind, x))
    }

    /// Keep X, Y and colour pointing at columns that are legal for the
    /// current data and kind. Any chart built from the old selection is
    /// discarded until the user generates again.
    fn repair_selection(&mut self) {
        self.chart = None;
        let x_options = self.x_options();
        let x_valid = self
            .selection
            .x
            .as_ref()
            .is_some_and(|x| x_options.contains(x));
        if !x_valid {
            self.selection.x = x_options.first().cloned();
        }

        match self.axis_choices() {
            Some(Ok(AxisChoices::Y { columns, required })) => {
                let y_valid = self.selection.y.as_ref().is_some_and(|y| columns.contains(y));
                if !y_valid {
                    self.selection.y = if required { columns.first().cloned() } else { None };
                }
            }
            _ => self.selection.y = None,
        }

        let color_valid = match (&self.view, &self.selection.color) {
            (Some(view), Some(color)) => view.column(color).is_some(),
            (_, None) => true,
            (None, Some(_)) => false,
        };
        if !color_valid {
            self.selection.color = None;
        }
    }

    /// The request the Generate button would send, if an X column is chosen.
    pub fn chart_request(&self) -> Option<ChartRequest> {
        let sel = &self.selection;
        let mut request = ChartRequest::new(sel.kind, sel.x.clone()?)
            .with_title(sel.title.clone())
            .with_theme(sel.theme);
        if sel.kind != ChartKind::Pie {
            if let Some(y) = &sel.y {
                request = request.with_y(y.clone());
            }
            if let Some(color) = &sel.color {
                request = request.with_color(color.clone());
            }
        }
        Some(request)
    }

    /// Whether the Generate button is enabled.
    pub fn can_generate(&self) -> bool {
        self.chart_request().is_some() && matches!(self.axis_choices(), Some(Ok(_)))
    }

    /// Build the chart for the current selection.
    ///
    /// Any failure is logged and shown in the status line; the previous
    /// chart is dropped so a stale chart is never shown as the new one.
    pub fn generate_chart(&mut self) -> Result<&ChartArtifact, ChartError> {
        self.chart = None;
        let result = self.try_generate();
        match result {
            Ok(artifact) => {
                log::info!("Rendered {} chart '{}'", artifact.kind, artifact.title);
                self.status = None;
                Ok(self.chart.insert(artifact))
            }
            Err(e) => {
                match &e {
                    ChartError::Axis(_) => log::warn!("Chart blocked: {e}"),
                    _ => log::error!("Chart failed: {e}"),
                }
                self.status = Some(match &e {
                    ChartError::Axis(_) => Status::warning(e.to_string()),
                    _ => Status::error(format!("Error processing the data: {e}")),
                });
                Err(e)
            }
        }
    }

    fn try_generate(&self) -> Result<ChartArtifact, ChartError> {
        let view = self.view.as_ref().ok_or(ChartError::NoData)?;
        let request = self.chart_request().ok_or(ChartError::MissingX)?;
        if log::log_enabled!(log::Level::Debug) {
            if let Ok(json) = serde_json::to_string(&request) {
                log::debug!("Chart request: {json}");
            }
        }
        render::render(view, &request)
    }

    // -- Summary -------------------------------------------------------------

    pub fn key_stats(&self) -> Option<KeyStats> {
        self.view.as_ref().map(summary::key_stats)
    }

    /// Accidents-per-day chart over the filtered rows.
    pub fn daily_chart(&self) -> Option<ChartArtifact> {
        let view = self.view.as_ref()?;
        let col = self.filter_columns.date.as_deref()?;
        summary::accidents_per_day(view, col, self.selection.theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const ACCIDENTS: &str = "\
fecha,año,tipo_accidente,ubicacion,heridos
2022-12-30,2022,Choque,Centro,2
2023-01-02,2023,Atropello,Norte,1
2023-01-03,2023,Choque,Sur,0
2024-02-01,2024,Choque,Centro,4
";

    fn loaded() -> Result<AppState> {
        let mut state = AppState::default();
        state.load_bytes("accidentes.csv", ACCIDENTS.as_bytes())?;
        Ok(state)
    }

    #[test]
    fn loading_detects_optional_columns() -> Result<()> {
        let state = loaded()?;
        assert_eq!(state.filter_columns.date.as_deref(), Some("fecha"));
        assert_eq!(state.filter_columns.year.as_deref(), Some("año"));
        let source = state.source.as_ref().unwrap();
        assert_eq!(source.category_columns, vec!["tipo_accidente", "ubicacion"]);
        assert_eq!(state.view.as_ref().map(Dataset::len), Some(4));
        assert_eq!(state.status.as_ref().map(|s| s.level), Some(StatusLevel::Info));
        Ok(())
    }

    #[test]
    fn unreadable_path_reports_error() {
        let mut state = AppState::default();
        let err = state.load_path(Path::new("/no/such/dir/accidentes.csv"));
        assert!(matches!(err, Err(LoadError::Io(_))));
        assert!(state.source.is_none());
        let status = state.status.unwrap();
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.text.contains("accidentes.csv"));
    }

    #[test]
    fn missing_date_column_only_warns() -> Result<()> {
        let mut state = AppState::default();
        state.load_bytes("plain.csv", b"tipo,n\nChoque,1\n")?;
        assert!(state.filter_columns.date.is_none());
        assert!(state.date_bounds().is_none());
        assert!(state.daily_chart().is_none());
        assert_eq!(state.status.as_ref().map(|s| s.level), Some(StatusLevel::Warning));
        Ok(())
    }

    #[test]
    fn failed_load_keeps_previous_data() -> Result<()> {
        let mut state = loaded()?;
        let err = state.load_bytes("broken.csv", b"a,b\n1,2,3\n");
        assert!(err.is_err());
        assert_eq!(state.source.as_ref().map(|s| s.file_name.as_str()), Some("accidentes.csv"));
        assert_eq!(state.status.as_ref().map(|s| s.level), Some(StatusLevel::Error));
        Ok(())
    }

    #[test]
    fn filters_narrow_view_not_source() -> Result<()> {
        let mut state = loaded()?;
        let (start, end) = state.date_bounds().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2022, 12, 30).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        state.set_year_range(Some((2024, 2023)));
        assert_eq!(state.filters.year_range, Some((2023, 2024)));
        assert_eq!(state.view.as_ref().map(Dataset::len), Some(3));

        state.toggle_category("tipo_accidente", &CellValue::Text("Choque".into()));
        assert_eq!(state.view.as_ref().map(Dataset::len), Some(2));

        state.toggle_category("tipo_accidente", &CellValue::Text("Choque".into()));
        assert_eq!(state.view.as_ref().map(Dataset::len), Some(3));

        state.set_year_range(None);
        state.set_date_range(Some((
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )));
        assert_eq!(state.view.as_ref().map(Dataset::len), Some(2));
        assert_eq!(state.dataset().map(Dataset::len), Some(4));
        Ok(())
    }

    #[test]
    fn changing_kind_repairs_axes() -> Result<()> {
        let mut state = loaded()?;
        state.set_x_column("fecha");
        state.set_chart_kind(ChartKind::Bar);
        assert_eq!(state.selection.y.as_deref(), Some("año"));

        state.set_y_column(Some("ubicacion"));
        state.set_chart_kind(ChartKind::Scatter);
        assert_eq!(state.selection.y.as_deref(), Some("año"));

        state.set_chart_kind(ChartKind::Pie);
        assert_eq!(state.selection.x.as_deref(), Some("tipo_accidente"));
        assert_eq!(state.selection.y, None);
        assert_eq!(state.x_options(), vec!["tipo_accidente", "ubicacion"]);
        Ok(())
    }

    #[test]
    fn bar_x_change_drops_y_equal_to_x() -> Result<()> {
        let mut state = loaded()?;
        state.set_chart_kind(ChartKind::Bar);
        state.set_x_column("fecha");
        state.set_y_column(Some("heridos"));
        state.set_x_column("heridos");
        assert_eq!(state.selection.y.as_deref(), Some("fecha"));
        Ok(())
    }

    #[test]
    fn generate_chart_produces_artifact() -> Result<()> {
        let mut state = loaded()?;
        state.set_chart_kind(ChartKind::Line);
        state.set_x_column("fecha");
        state.set_y_column(Some("heridos"));
        state.set_color_column(Some("ubicacion"));
        state.set_theme(Theme::Solid);
        assert!(state.can_generate());

        let artifact = state.generate_chart()?;
        assert_eq!(artifact.title, "Line chart: fecha vs heridos");
        assert_eq!(artifact.theme, Theme::Solid);
        assert!(state.chart.is_some());
        assert!(state.status.is_none());
        Ok(())
    }

    #[test]
    fn selection_and_filter_changes_drop_the_chart() -> Result<()> {
        let mut state = loaded()?;
        state.set_chart_kind(ChartKind::Bar);
        state.set_x_column("tipo_accidente");
        state.set_y_column(Some("heridos"));
        state.generate_chart()?;
        assert!(state.chart.is_some());

        state.set_color_column(Some("ubicacion"));
        assert!(state.chart.is_none());

        state.generate_chart()?;
        state.set_chart_kind(ChartKind::Pie);
        assert!(state.chart.is_none());

        state.generate_chart()?;
        state.toggle_category("ubicacion", &CellValue::Text("Centro".into()));
        assert!(state.chart.is_none());

        state.generate_chart()?;
        state.set_year_range(Some((2024, 2024)));
        assert!(state.chart.is_none());
        assert_eq!(state.view.as_ref().map(Dataset::len), Some(1));
        Ok(())
    }

    #[test]
    fn non_csv_path_is_refused_with_warning() -> Result<()> {
        let mut state = loaded()?;
        let err = state.load_path(Path::new("/tmp/informe.xlsx"));
        assert!(matches!(err, Err(LoadError::NotCsv(_))));
        assert_eq!(
            state.source.as_ref().map(|s| s.file_name.as_str()),
            Some("accidentes.csv")
        );
        let status = state.status.as_ref().unwrap();
        assert_eq!(status.level, StatusLevel::Warning);
        assert!(status.text.contains("informe.xlsx"));
        Ok(())
    }

    #[test]
    fn line_on_categorical_data_is_blocked() -> Result<()> {
        let mut state = AppState::default();
        state.load_bytes("cats.csv", b"tipo,ubicacion\nChoque,Centro\nRoce,Sur\n")?;
        state.set_chart_kind(ChartKind::Line);
        assert!(matches!(state.axis_choices(), Some(Err(ResolveError::NoCompatibleAxis { .. }))));
        assert!(!state.can_generate());

        let result = state.generate_chart();
        assert!(matches!(result, Err(ChartError::Axis(_))));
        assert!(state.chart.is_none());
        assert_eq!(state.status.as_ref().map(|s| s.level), Some(StatusLevel::Warning));
        Ok(())
    }

    #[test]
    fn filtering_everything_out_reports_processing_error() -> Result<()> {
        let mut state = loaded()?;
        state.set_chart_kind(ChartKind::Bar);
        state.set_x_column("ubicacion");
        state.set_year_range(Some((1990, 1991)));
        assert!(matches!(state.generate_chart(), Err(ChartError::NoData)));
        assert_eq!(state.status.as_ref().map(|s| s.level), Some(StatusLevel::Error));
        Ok(())
    }

    #[test]
    fn stats_and_daily_chart_follow_filters() -> Result<()> {
        let mut state = loaded()?;
        state.toggle_category("ubicacion", &CellValue::Text("Centro".into()));
        assert_eq!(state.key_stats().map(|s| s.total_rows), Some(2));
        assert!(state.daily_chart().is_some());
        Ok(())
    }
}
