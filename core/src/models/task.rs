//! Tasks attached to contacts and leads.

use std::sync::Arc;

use serde_json::Value;

use crate::batch::{record_id, Endpoint, Entity, Updatable};
use crate::clock::Clock;
use crate::date::IntoTimestamp;
use crate::fields::{Field, FieldBag};

/// What a task is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Contact = 1,
    Lead = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskField {
    ElementId,
    ElementType,
    DateCreate,
    LastModified,
    RequestId,
    TaskType,
    Text,
    ResponsibleUserId,
    CompleteTill,
}

impl Field for TaskField {
    const WHITELIST: &'static [Self] = &[
        TaskField::ElementId,
        TaskField::ElementType,
        TaskField::DateCreate,
        TaskField::LastModified,
        TaskField::RequestId,
        TaskField::TaskType,
        TaskField::Text,
        TaskField::ResponsibleUserId,
        TaskField::CompleteTill,
    ];

    fn name(self) -> &'static str {
        match self {
            TaskField::ElementId => "element_id",
            TaskField::ElementType => "element_type",
            TaskField::DateCreate => "date_create",
            TaskField::LastModified => "last_modified",
            TaskField::RequestId => "request_id",
            TaskField::TaskType => "task_type",
            TaskField::Text => "text",
            TaskField::ResponsibleUserId => "responsible_user_id",
            TaskField::CompleteTill => "complete_till",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    fields: FieldBag<TaskField>,
}

impl Task {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            fields: FieldBag::with_clock(clock),
        }
    }

    /// Attach the task to a contact or lead.
    pub fn set_element(&mut self, element_type: ElementType, element_id: i64) -> &mut Self {
        self.fields.set(TaskField::ElementType, element_type as i64);
        self.fields.set(TaskField::ElementId, element_id);
        self
    }

    pub fn set_date_create(&mut self, date: impl IntoTimestamp) -> &mut Self {
        self.fields.set_date(TaskField::DateCreate, date);
        self
    }

    pub fn set_last_modified(&mut self, date: impl IntoTimestamp) -> &mut Self {
        self.fields.set_date(TaskField::LastModified, date);
        self
    }

    pub fn set_request_id(&mut self, request_id: i64) -> &mut Self {
        self.fields.set(TaskField::RequestId, request_id);
        self
    }

    /// Account-specific task type id (call, meeting, ...).
    pub fn set_task_type(&mut self, task_type: impl Into<Value>) -> &mut Self {
        self.fields.set(TaskField::TaskType, task_type);
        self
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.fields.set(TaskField::Text, text.into());
        self
    }

    pub fn set_responsible_user_id(&mut self, user_id: i64) -> &mut Self {
        self.fields.set(TaskField::ResponsibleUserId, user_id);
        self
    }

    /// Deadline. A time of 23:59 shows as "all day" in the amoCRM UI.
    pub fn set_complete_till(&mut self, date: impl IntoTimestamp) -> &mut Self {
        self.fields.set_date(TaskField::CompleteTill, date);
        self
    }
}

impl Entity for Task {
    type Field = TaskField;
    type Added = i64;

    const ENDPOINT: Endpoint = Endpoint {
        kind: "tasks",
        list_path: "/private/api/v2/json/tasks/list",
        set_path: "/private/api/v2/json/tasks/set",
        list_key: "tasks",
        add_op: "add",
        added_path: &[],
    };

    fn fields(&self) -> &FieldBag<TaskField> {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldBag<TaskField> {
        &mut self.fields
    }

    fn added(record: Value) -> Option<i64> {
        record_id(record)
    }
}

impl Updatable for Task {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::clock::FixedClock;

    // 2024-03-01 10:30:00 UTC
    fn task() -> Task {
        Task::with_clock(Arc::new(FixedClock::at(1_709_289_000)))
    }

    #[test]
    fn date_setters_store_epoch_seconds() {
        let mut t = task();
        t.set_date_create("now")
            .set_complete_till("2024-03-01 23:59")
            .set_last_modified("01.03.2024");
        assert_eq!(
            Value::Object(t.values()),
            json!({
                "date_create": 1_709_289_000,
                "complete_till": 1_709_337_540,
                "last_modified": 1_709_251_200
            })
        );
    }

    #[test]
    fn element_type_maps_to_api_constant() {
        let mut t = task();
        t.set_element(ElementType::Lead, 900).set_text("Call back");
        assert_eq!(t.values().get("element_type"), Some(&json!(2)));
        assert_eq!(t.values().get("element_id"), Some(&json!(900)));
        t.set_element(ElementType::Contact, 901);
        assert_eq!(t.values().get("element_type"), Some(&json!(1)));
    }

    #[test]
    fn every_whitelisted_name_is_settable() {
        let mut t = task();
        for field in TaskField::WHITELIST {
            assert!(t.set_field(field.name(), 1), "{field:?}");
        }
        assert_eq!(t.values().len(), TaskField::WHITELIST.len());
        assert!(!t.set_field("status", 1));
    }
}
