use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::Date;

use super::repo::{NewTodo, TodoChanges, TodoRow};
use crate::{
    error::ApiError,
    subtasks::{
        dto::{subtask_title, SubtaskResponse},
        repo::SubtaskRow,
    },
    wire::{time_of_day, time_of_day_update, ymd, RecordId},
};

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    #[serde(default, with = "ymd::option")]
    pub date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct NewSubtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "ymd")]
    pub date: Date,
    #[serde(default, deserialize_with = "time_of_day")]
    pub time: Option<String>,
    pub group_id: String,
    #[serde(default)]
    pub subtasks: Vec<NewSubtask>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "ymd::option")]
    pub date: Option<Date>,
    #[serde(default, deserialize_with = "time_of_day_update")]
    pub time: Option<Option<String>>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "ymd")]
    pub date: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub group_id: String,
    pub completed: bool,
    pub subtasks: Vec<SubtaskResponse>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: i64,
    pub completed: bool,
}

fn required(field: &str, raw: &str) -> Result<String, ApiError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl CreateTodoRequest {
    pub fn validate(self) -> Result<NewTodo, ApiError> {
        let subtasks = self
            .subtasks
            .into_iter()
            .map(|s| subtask_title(&s.title).map(|t| (t, s.completed)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewTodo {
            title: required("title", &self.title)?,
            description: optional_text(self.description),
            date: self.date,
            time: self.time,
            group_id: required("groupId", &self.group_id)?,
            subtasks,
        })
    }
}

impl UpdateTodoRequest {
    pub fn validate(self) -> Result<(RecordId, TodoChanges), ApiError> {
        let changes = TodoChanges {
            title: self.title.as_deref().map(|t| required("title", t)).transpose()?,
            description: self.description.map(|d| d.trim().to_string()),
            date: self.date,
            time: self.time,
            group_id: self.group_id.as_deref().map(|g| required("groupId", g)).transpose()?,
            completed: self.completed,
        };
        Ok((self.id, changes))
    }
}

impl TodoResponse {
    pub fn new(row: TodoRow, subtasks: Vec<SubtaskResponse>) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            date: row.date,
            time: row.time,
            group_id: row.group_id,
            completed: row.completed,
            subtasks,
        }
    }
}

/// Pairs each todo with its subtasks, keeping the order of `todos`.
pub fn with_subtasks(todos: Vec<TodoRow>, subtasks: Vec<SubtaskRow>) -> Vec<TodoResponse> {
    let mut by_todo: HashMap<i64, Vec<SubtaskResponse>> = HashMap::new();
    for s in subtasks {
        by_todo.entry(s.todo_id).or_default().push(s.into());
    }
    todos
        .into_iter()
        .map(|t| {
            let subs = by_todo.remove(&t.id).unwrap_or_default();
            TodoResponse::new(t, subs)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    fn row(id: i64) -> TodoRow {
        TodoRow {
            id,
            title: format!("todo {id}"),
            description: None,
            date: date!(2024 - 05 - 01),
            time: None,
            group_id: "work".into(),
            completed: false,
        }
    }

    fn sub(id: i64, todo_id: i64) -> SubtaskRow {
        SubtaskRow {
            id,
            todo_id,
            title: format!("step {id}"),
            completed: false,
        }
    }

    #[test]
    fn create_request_from_client_payload() {
        let req: CreateTodoRequest = serde_json::from_value(json!({
            "title": "  Write report ",
            "description": "",
            "date": "2024-05-01",
            "time": "14:30",
            "groupId": "work",
            "subtasks": [{ "title": "outline" }, { "title": "draft", "completed": true }]
        }))
        .unwrap();

        let new = req.validate().unwrap();
        assert_eq!(new.title, "Write report");
        assert_eq!(new.description, None);
        assert_eq!(new.date, date!(2024 - 05 - 01));
        assert_eq!(new.time.as_deref(), Some("14:30"));
        assert_eq!(new.subtasks, vec![("outline".to_string(), false), ("draft".to_string(), true)]);
    }

    #[test]
    fn create_request_rejects_blank_fields() {
        let base = json!({ "title": "x", "date": "2024-05-01", "groupId": "g" });

        let mut blank_title = base.clone();
        blank_title["title"] = json!("  ");
        let mut blank_group = base.clone();
        blank_group["groupId"] = json!("");
        let mut blank_sub = base.clone();
        blank_sub["subtasks"] = json!([{ "title": " " }]);

        for body in [blank_title, blank_group, blank_sub] {
            let req: CreateTodoRequest = serde_json::from_value(body).unwrap();
            assert!(matches!(req.validate(), Err(ApiError::BadRequest(_))));
        }
    }

    #[test]
    fn create_request_rejects_bad_date_and_time() {
        let bad_date = json!({ "title": "x", "date": "2024-13-01", "groupId": "g" });
        let bad_time = json!({ "title": "x", "date": "2024-05-01", "time": "25:00", "groupId": "g" });
        assert!(serde_json::from_value::<CreateTodoRequest>(bad_date).is_err());
        assert!(serde_json::from_value::<CreateTodoRequest>(bad_time).is_err());
    }

    #[test]
    fn update_request_keeps_absent_fields() {
        let req: UpdateTodoRequest =
            serde_json::from_value(json!({ "id": "7", "completed": true })).unwrap();
        let (id, changes) = req.validate().unwrap();
        assert_eq!(id.get(), 7);
        assert_eq!(changes.completed, Some(true));
        assert!(changes.title.is_none() && changes.date.is_none() && changes.time.is_none());
    }

    #[test]
    fn update_request_clears_time() {
        let req: UpdateTodoRequest =
            serde_json::from_value(json!({ "id": 7, "time": "", "date": "2024-06-02" })).unwrap();
        let (_, changes) = req.validate().unwrap();
        assert_eq!(changes.time, Some(None));
        assert_eq!(changes.date, Some(date!(2024 - 06 - 02)));
    }

    #[test]
    fn todo_wire_shape() {
        let todo = TodoResponse::new(row(3), vec![]);
        let v = serde_json::to_value(&todo).unwrap();
        assert_eq!(
            v,
            json!({
                "id": 3,
                "title": "todo 3",
                "date": "2024-05-01",
                "groupId": "work",
                "completed": false,
                "subtasks": []
            })
        );
    }

    #[test]
    fn subtasks_are_grouped_under_their_todo() {
        let todos = with_subtasks(vec![row(2), row(1)], vec![sub(10, 1), sub(11, 2), sub(12, 1)]);
        assert_eq!(todos[0].id, 2);
        assert_eq!(todos[0].subtasks.iter().map(|s| s.id).collect::<Vec<_>>(), vec![11]);
        assert_eq!(todos[1].subtasks.iter().map(|s| s.id).collect::<Vec<_>>(), vec![10, 12]);
    }

    #[test]
    fn date_query_is_optional_at_parse_time() {
        let q: DateQuery = serde_json::from_value(json!({})).unwrap();
        assert!(q.date.is_none());
    }
}
