use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Theme;

/// The five supported chart kinds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    #[default]
    Bar,
    Histogram,
    Line,
    Scatter,
    Pie,
}

impl ChartKind {
    pub const ALL: [Self; 5] = [
        Self::Bar,
        Self::Histogram,
        Self::Line,
        Self::Scatter,
        Self::Pie,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "Bar",
            Self::Histogram => "Histogram",
            Self::Line => "Line",
            Self::Scatter => "Scatter",
            Self::Pie => "Pie",
        }
    }

    /// Whether a chart of this kind can be drawn without a Y column.
    pub fn y_optional(self) -> bool {
        matches!(self, Self::Histogram | Self::Pie)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully specified chart to draw. For pie charts `x` is the names field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub x: String,
    pub y: Option<String>,
    pub color: Option<String>,
    pub title: String,
    pub theme: Theme,
}

impl ChartRequest {
    pub fn new(kind: ChartKind, x: impl Into<String>) -> Self {
        ChartRequest {
            kind,
            x: x.into(),
            y: None,
            color: None,
            title: String::new(),
            theme: Theme::default(),
        }
    }

    pub fn with_y(mut self, y: impl Into<String>) -> Self {
        self.y = Some(y.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// The user's title, or one derived from kind and columns.
    pub fn effective_title(&self) -> String {
        let title = self.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
        let x = &self.x;
        match (self.kind, self.y.as_deref()) {
            (ChartKind::Bar, Some(y)) => format!("Bar chart: {x} vs {y}"),
            (ChartKind::Bar, None) => format!("Bar chart: {x}"),
            (ChartKind::Histogram, _) => format!("Histogram of {x}"),
            (ChartKind::Line, Some(y)) => format!("Line chart: {x} vs {y}"),
            (ChartKind::Line, None) => format!("Line chart: {x}"),
            (ChartKind::Scatter, Some(y)) => format!("Scatter plot: {x} vs {y}"),
            (ChartKind::Scatter, None) => format!("Scatter plot: {x}"),
            (ChartKind::Pie, _) => format!("Pie chart: {x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_titles_follow_kind() {
        let bar = ChartRequest::new(ChartKind::Bar, "fecha").with_y("heridos");
        assert_eq!(bar.effective_title(), "Bar chart: fecha vs heridos");

        let hist = ChartRequest::new(ChartKind::Histogram, "velocidad").with_y("heridos");
        assert_eq!(hist.effective_title(), "Histogram of velocidad");

        let pie = ChartRequest::new(ChartKind::Pie, "ubicacion");
        assert_eq!(pie.effective_title(), "Pie chart: ubicacion");
    }

    #[test]
    fn explicit_title_wins() {
        let req = ChartRequest::new(ChartKind::Line, "fecha")
            .with_y("heridos")
            .with_title("  Injuries over time ");
        assert_eq!(req.effective_title(), "Injuries over time");
    }

    #[test]
    fn request_serializes_to_json() -> anyhow::Result<()> {
        let req = ChartRequest::new(ChartKind::Scatter, "año")
            .with_y("heridos")
            .with_theme(Theme::Muted);
        let json = serde_json::to_string(&req)?;
        assert!(json.contains("\"kind\":\"Scatter\""));
        assert!(json.contains("\"theme\":\"Muted\""));
        let back: ChartRequest = serde_json::from_str(&json)?;
        assert_eq!(back, req);
        Ok(())
    }
}
