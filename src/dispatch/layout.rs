use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;

/// Identity of a Kanban column: one of the five pipeline statuses, or a
/// user-added bucket keyed `custom-<millis>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnId {
    Fixed(Status),
    Custom(String),
}

impl ColumnId {
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Fixed(status) => Some(*status),
            Self::Custom(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Fixed(status) => status.as_str(),
            Self::Custom(key) => key,
        }
    }
}

impl From<String> for ColumnId {
    fn from(raw: String) -> Self {
        match raw.parse::<Status>() {
            Ok(status) => Self::Fixed(status),
            Err(_) => Self::Custom(raw),
        }
    }
}

impl From<ColumnId> for String {
    fn from(id: ColumnId) -> Self {
        id.as_str().to_string()
    }
}

fn default_editable() -> bool {
    true
}

/// One board column. Fixed columns carry a status; custom columns are
/// purely visual buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default = "default_editable")]
    pub editable: bool,
    /// Styling tag ("red", "blue", ...). Unvalidated here; the theme maps
    /// unknown tags to a fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Column {
    fn fixed(status: Status) -> Self {
        Self {
            id: ColumnId::Fixed(status),
            name: status.label().to_string(),
            custom: false,
            editable: status != Status::Cancelled,
            color: Some(default_color(status).to_string()),
        }
    }
}

fn default_color(status: Status) -> &'static str {
    match status {
        Status::Triage => "red",
        Status::Allocated => "blue",
        Status::EnRoute => "purple",
        Status::Completed => "green",
        Status::Cancelled => "gray",
    }
}

/// The ordered column list. Always normalized on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    columns: Vec<Column>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            columns: Status::ALL.into_iter().map(Column::fixed).collect(),
        }
    }
}

impl Layout {
    /// Build a layout from persisted columns, repairing drift: the
    /// Cancelled column is re-injected if missing and force-locked, fixed
    /// columns get their canonical names back, and missing colors are
    /// filled with the defaults. User recolors survive.
    pub fn from_columns(columns: Vec<Column>) -> Self {
        if columns.is_empty() {
            return Self::default();
        }
        let mut columns: Vec<Column> = columns
            .into_iter()
            .map(|mut col| {
                if let ColumnId::Fixed(status) = col.id {
                    col.name = status.label().to_string();
                    col.custom = false;
                    if col.color.is_none() {
                        col.color = Some(default_color(status).to_string());
                    }
                    if status == Status::Cancelled {
                        col.editable = false;
                    }
                }
                col
            })
            .collect();
        if !columns
            .iter()
            .any(|c| c.id == ColumnId::Fixed(Status::Cancelled))
        {
            columns.push(Column::fixed(Status::Cancelled));
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn find(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Statuses currently represented by a column. Used to detect
    /// stranded requests after a column removal.
    pub fn statuses(&self) -> Vec<Status> {
        self.columns.iter().filter_map(|c| c.id.status()).collect()
    }

    /// Append a custom column. Names are not required to be unique.
    pub fn add_custom(&mut self, name: &str, now: DateTime<Utc>) -> Option<&Column> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.columns.push(Column {
            id: ColumnId::Custom(format!("custom-{}", now.timestamp_millis())),
            name: name.to_string(),
            custom: true,
            editable: true,
            color: None,
        });
        self.columns.last()
    }

    /// Rename a column. Locked columns (Cancelled) refuse silently.
    pub fn rename(&mut self, id: &ColumnId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.columns.iter_mut().find(|c| &c.id == id) {
            Some(col) if col.editable => {
                col.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn set_color(&mut self, id: &ColumnId, color: Option<String>) {
        if let Some(col) = self.columns.iter_mut().find(|c| &c.id == id) {
            col.color = color;
        }
    }

    /// Remove a custom column. Fixed columns are never removable.
    pub fn remove_custom(&mut self, id: &ColumnId) -> bool {
        match self.find(id) {
            Some(col) if col.custom => {
                self.columns.retain(|c| &c.id != id);
                true
            }
            _ => false,
        }
    }

    /// Splice the column at `from` out and re-insert it at `to`. A pure
    /// permutation of the same column objects.
    pub fn move_column(&mut self, from: usize, to: usize) {
        if from >= self.columns.len() || to >= self.columns.len() || from == to {
            return;
        }
        let col = self.columns.remove(from);
        self.columns.insert(to, col);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn default_layout_has_one_column_per_status() {
        let layout = Layout::default();
        assert_eq!(layout.len(), 5);
        assert_eq!(layout.statuses(), Status::ALL.to_vec());
        let cancelled = layout.find(&ColumnId::Fixed(Status::Cancelled)).unwrap();
        assert!(!cancelled.editable);
        assert!(!cancelled.custom);
        assert_eq!(cancelled.name, "Cancelado");
    }

    #[test]
    fn column_id_parses_status_keys_and_keeps_custom_keys() {
        assert_eq!(
            ColumnId::from("en_route".to_string()),
            ColumnId::Fixed(Status::EnRoute)
        );
        assert_eq!(
            ColumnId::from("custom-123".to_string()),
            ColumnId::Custom("custom-123".into())
        );
    }

    #[test]
    fn normalization_reinjects_missing_cancelled_column() {
        let columns: Vec<Column> = Status::ALL
            .into_iter()
            .filter(|s| *s != Status::Cancelled)
            .map(Column::fixed)
            .collect();
        let layout = Layout::from_columns(columns);
        assert_eq!(layout.len(), 5);
        let cancelled = layout.find(&ColumnId::Fixed(Status::Cancelled)).unwrap();
        assert!(!cancelled.editable);
    }

    #[test]
    fn normalization_repairs_drifted_cancelled_column() {
        let mut drifted = Column::fixed(Status::Cancelled);
        drifted.name = "Lixeira".into();
        drifted.editable = true;
        drifted.custom = true;
        let layout = Layout::from_columns(vec![drifted]);
        let cancelled = layout.find(&ColumnId::Fixed(Status::Cancelled)).unwrap();
        assert_eq!(cancelled.name, "Cancelado");
        assert!(!cancelled.editable);
        assert!(!cancelled.custom);
    }

    #[test]
    fn normalization_restores_fixed_names_but_keeps_recolors() {
        let mut triage = Column::fixed(Status::Triage);
        triage.name = "Fila".into();
        triage.color = Some("pink".into());
        let mut allocated = Column::fixed(Status::Allocated);
        allocated.color = None;
        let layout = Layout::from_columns(vec![triage, allocated]);
        let triage = layout.find(&ColumnId::Fixed(Status::Triage)).unwrap();
        assert_eq!(triage.name, "Triagem");
        assert_eq!(triage.color.as_deref(), Some("pink"));
        let allocated = layout.find(&ColumnId::Fixed(Status::Allocated)).unwrap();
        assert_eq!(allocated.color.as_deref(), Some("blue"));
    }

    #[test]
    fn empty_persisted_list_falls_back_to_defaults() {
        assert_eq!(Layout::from_columns(Vec::new()), Layout::default());
    }

    #[test]
    fn add_rename_delete_custom_column() {
        let mut layout = Layout::default();
        let id = layout
            .add_custom("Aguardando Família", now())
            .unwrap()
            .id
            .clone();
        let col = layout.find(&id).unwrap();
        assert!(col.custom);
        assert!(col.editable);
        assert_eq!(col.color, None);
        assert_eq!(col.name, "Aguardando Família");
        assert!(matches!(id, ColumnId::Custom(ref key) if key.starts_with("custom-")));

        assert!(layout.rename(&id, "Aguardando Vaga"));
        assert_eq!(layout.find(&id).unwrap().name, "Aguardando Vaga");

        assert!(layout.remove_custom(&id));
        assert!(layout.find(&id).is_none());
        assert_eq!(layout.len(), 5);
    }

    #[test]
    fn blank_custom_name_is_rejected() {
        let mut layout = Layout::default();
        assert!(layout.add_custom("   ", now()).is_none());
        assert_eq!(layout.len(), 5);
    }

    #[test]
    fn cancelled_column_cannot_be_renamed_or_removed() {
        let mut layout = Layout::default();
        let id = ColumnId::Fixed(Status::Cancelled);
        assert!(!layout.rename(&id, "Arquivado"));
        assert!(!layout.remove_custom(&id));
        assert_eq!(layout.find(&id).unwrap().name, "Cancelado");
    }

    #[test]
    fn fixed_columns_are_never_removable() {
        let mut layout = Layout::default();
        assert!(!layout.remove_custom(&ColumnId::Fixed(Status::Triage)));
        assert_eq!(layout.len(), 5);
    }

    #[test]
    fn move_column_is_a_permutation() {
        let mut layout = Layout::default();
        let before: Vec<ColumnId> = layout.columns().iter().map(|c| c.id.clone()).collect();
        layout.move_column(0, 3);
        let after: Vec<ColumnId> = layout.columns().iter().map(|c| c.id.clone()).collect();
        assert_eq!(after.len(), before.len());
        for id in &before {
            assert!(after.contains(id));
        }
        assert_eq!(after[3], before[0]);
        assert_eq!(after[0], before[1]);
    }

    #[test]
    fn move_column_out_of_range_is_noop() {
        let mut layout = Layout::default();
        let before = layout.clone();
        layout.move_column(0, 99);
        layout.move_column(99, 0);
        assert_eq!(layout, before);
    }

    #[test]
    fn recolor_accepts_any_tag() {
        let mut layout = Layout::default();
        let id = ColumnId::Fixed(Status::Triage);
        layout.set_color(&id, Some("chartreuse".into()));
        assert_eq!(layout.find(&id).unwrap().color.as_deref(), Some("chartreuse"));
    }

    #[test]
    fn column_id_serde_roundtrip_through_string() {
        let col = Column::fixed(Status::EnRoute);
        let toml = toml::to_string(&col).unwrap();
        assert!(toml.contains("id = \"en_route\""));
        let back: Column = toml::from_str(&toml).unwrap();
        assert_eq!(back.id, ColumnId::Fixed(Status::EnRoute));
    }
}
