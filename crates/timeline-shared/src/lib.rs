use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TimelineItem {
  pub id:         i64,
  pub group:      String,
  pub name:       String,
  pub start_date: String,
  #[serde(default)]
  pub end_date:   Option<String>
}

impl TimelineItem {
  pub fn is_ongoing(&self) -> bool {
    self.end_date.is_none()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct NewTimelineItem {
  pub group:      String,
  pub name:       String,
  pub start_date: String,
  pub end_date:   Option<String>
}

/// Error payload of a non-2xx API
/// response. `detail` is whatever the
/// server put there: a message string
/// or a list of validation objects.
#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub detail: Option<serde_json::Value>
}

impl ApiErrorBody {
  pub fn detail_text(
    &self
  ) -> Option<String> {
    match self.detail.as_ref()? {
      | serde_json::Value::Null => None,
      | serde_json::Value::String(
        message
      ) => Some(message.clone()),
      | other => Some(other.to_string())
    }
  }
}
