//! To-do items organised into groups.
//!
//! Items and groups are stored as two JSON arrays, `SavedTodoItems` (newest
//! first) and `SavedTodoGroups` (by `order`). There is always at least one
//! group; a fresh store gets "My Tasks". Deleting a group deletes its items.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::CalendarContext;
use crate::error::{CoreError, ValidationError};
use crate::storage::KvStore;

pub const TODO_ITEMS_KEY: &str = "SavedTodoItems";
pub const TODO_GROUPS_KEY: &str = "SavedTodoGroups";
pub const MAX_GROUPS: usize = 10;
pub const DEFAULT_GROUP_NAME: &str = "My Tasks";
pub const DEFAULT_GROUP_ICON: &str = "folder.fill";
pub const GROUP_COLORS: [&str; 8] = [
    "orange", "blue", "green", "purple", "pink", "red", "yellow", "teal",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: Uuid,
    pub title: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub group_id: Uuid,
}

impl TodoItem {
    pub fn new(
        title: impl Into<String>,
        group_id: Uuid,
        due_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            is_completed: false,
            created_at,
            due_date,
            group_id,
        }
    }

    /// Open and due on the calendar day of `now`.
    pub fn is_due_today(&self, now: DateTime<Utc>, calendar: &CalendarContext) -> bool {
        !self.is_completed
            && self
                .due_date
                .is_some_and(|due| calendar.same_day(due, now))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoGroup {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub color_name: String,
    pub order: usize,
}

impl TodoGroup {
    /// A group with the default icon and color. `order` is assigned when
    /// the group is added.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            icon: DEFAULT_GROUP_ICON.to_string(),
            color_name: GROUP_COLORS[0].to_string(),
            order: 0,
        }
    }

    fn default_group() -> Self {
        Self {
            icon: "checkmark.circle.fill".to_string(),
            ..Self::new(DEFAULT_GROUP_NAME)
        }
    }
}

pub struct TodoList {
    kv: Rc<dyn KvStore>,
    items: Vec<TodoItem>,
    groups: Vec<TodoGroup>,
}

impl TodoList {
    /// Load items and groups. Unreadable blobs load as empty; an empty
    /// group list gets the default group.
    pub fn load(kv: Rc<dyn KvStore>) -> Self {
        let items: Vec<TodoItem> = read_list(kv.as_ref(), TODO_ITEMS_KEY);
        let mut groups: Vec<TodoGroup> = read_list(kv.as_ref(), TODO_GROUPS_KEY);
        groups.sort_by_key(|g| g.order);

        let mut list = Self { kv, items, groups };
        if list.groups.is_empty() {
            list.groups.push(TodoGroup::default_group());
            if let Err(e) = list.persist_groups() {
                warn!(error = %e, "failed to persist default todo group");
            }
        }
        list
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    pub fn groups(&self) -> &[TodoGroup] {
        &self.groups
    }

    pub fn item(&self, id: Uuid) -> Option<&TodoItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn group(&self, id: Uuid) -> Option<&TodoGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Group by id, or by case-insensitive name.
    pub fn find_group(&self, key: &str) -> Option<&TodoGroup> {
        match Uuid::parse_str(key) {
            Ok(id) => self.group(id),
            Err(_) => self
                .groups
                .iter()
                .find(|g| g.name.eq_ignore_ascii_case(key.trim())),
        }
    }

    /// The first group by order. Always present.
    pub fn default_group(&self) -> Option<&TodoGroup> {
        self.groups.first()
    }

    pub fn items_in(&self, group_id: Uuid) -> impl Iterator<Item = &TodoItem> {
        self.items.iter().filter(move |i| i.group_id == group_id)
    }

    pub fn pending_in(&self, group_id: Uuid) -> impl Iterator<Item = &TodoItem> {
        self.items_in(group_id).filter(|i| !i.is_completed)
    }

    pub fn completed_in(&self, group_id: Uuid) -> impl Iterator<Item = &TodoItem> {
        self.items_in(group_id).filter(|i| i.is_completed)
    }

    pub fn pending(&self) -> impl Iterator<Item = &TodoItem> {
        self.items.iter().filter(|i| !i.is_completed)
    }

    pub fn due_today<'a>(
        &'a self,
        now: DateTime<Utc>,
        calendar: &'a CalendarContext,
    ) -> impl Iterator<Item = &'a TodoItem> {
        self.items
            .iter()
            .filter(move |i| i.is_due_today(now, calendar))
    }

    pub fn can_add_group(&self) -> bool {
        self.groups.len() < MAX_GROUPS
    }

    // ── Items ────────────────────────────────────────────────────────

    /// Insert at the front and persist.
    ///
    /// # Errors
    /// Returns an error for a blank title, an unknown group, or a failed
    /// write (the list is left unchanged).
    pub fn add_item(&mut self, mut item: TodoItem) -> Result<(), CoreError> {
        item.title = valid_title(&item.title)?;
        self.require_group(item.group_id)?;
        let id = item.id;
        self.items.insert(0, item);
        if let Err(e) = self.persist_items() {
            self.items.remove(0);
            return Err(e);
        }
        info!(%id, "todo added");
        Ok(())
    }

    /// Replace the item with the same id. Returns whether one was found.
    pub fn update_item(&mut self, mut item: TodoItem) -> Result<bool, CoreError> {
        item.title = valid_title(&item.title)?;
        self.require_group(item.group_id)?;
        let Some(index) = self.items.iter().position(|i| i.id == item.id) else {
            return Ok(false);
        };
        let previous = std::mem::replace(&mut self.items[index], item);
        if let Err(e) = self.persist_items() {
            self.items[index] = previous;
            return Err(e);
        }
        Ok(true)
    }

    pub fn delete_item(&mut self, id: Uuid) -> Result<bool, CoreError> {
        let Some(index) = self.items.iter().position(|i| i.id == id) else {
            return Ok(false);
        };
        let removed = self.items.remove(index);
        if let Err(e) = self.persist_items() {
            self.items.insert(index, removed);
            return Err(e);
        }
        info!(%id, "todo deleted");
        Ok(true)
    }

    /// Flip completion. Returns the new value, or `None` for an unknown id.
    pub fn toggle_complete(&mut self, id: Uuid) -> Result<Option<bool>, CoreError> {
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        item.is_completed = !item.is_completed;
        let done = item.is_completed;
        if let Err(e) = self.persist_items() {
            if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
                item.is_completed = !done;
            }
            return Err(e);
        }
        Ok(Some(done))
    }

    // ── Groups ───────────────────────────────────────────────────────

    /// Append a group, assigning it the next `order`.
    ///
    /// # Errors
    /// Fails at [`MAX_GROUPS`], for a blank name or an unknown color.
    pub fn add_group(&mut self, mut group: TodoGroup) -> Result<TodoGroup, CoreError> {
        if !self.can_add_group() {
            return Err(ValidationError::LimitReached {
                what: "todo groups",
                max: MAX_GROUPS,
            }
            .into());
        }
        group.name = valid_name(&group.name)?;
        valid_color(&group.color_name)?;
        group.order = self.groups.len();
        self.groups.push(group.clone());
        if let Err(e) = self.persist_groups() {
            self.groups.pop();
            return Err(e);
        }
        info!(name = %group.name, "todo group added");
        Ok(group)
    }

    pub fn update_group(&mut self, mut group: TodoGroup) -> Result<bool, CoreError> {
        group.name = valid_name(&group.name)?;
        valid_color(&group.color_name)?;
        let Some(index) = self.groups.iter().position(|g| g.id == group.id) else {
            return Ok(false);
        };
        let previous = std::mem::replace(&mut self.groups[index], group);
        if let Err(e) = self.persist_groups() {
            self.groups[index] = previous;
            return Err(e);
        }
        Ok(true)
    }

    /// Delete a group and every item in it. The last group cannot be
    /// deleted.
    pub fn delete_group(&mut self, id: Uuid) -> Result<bool, CoreError> {
        if self.group(id).is_none() {
            return Ok(false);
        }
        if self.groups.len() == 1 {
            return Err(ValidationError::InvalidValue {
                field: "group".to_string(),
                message: "the last group cannot be deleted".to_string(),
            }
            .into());
        }

        let items = self.items.clone();
        let groups = self.groups.clone();
        self.items.retain(|i| i.group_id != id);
        self.groups.retain(|g| g.id != id);
        if let Err(e) = self.persist_items().and_then(|()| self.persist_groups()) {
            self.items = items;
            self.groups = groups;
            // Put the stored copies back in step with memory.
            self.persist_items().ok();
            self.persist_groups().ok();
            return Err(e);
        }
        info!(%id, "todo group deleted");
        Ok(true)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn require_group(&self, id: Uuid) -> Result<(), ValidationError> {
        match self.group(id) {
            Some(_) => Ok(()),
            None => Err(ValidationError::InvalidValue {
                field: "group_id".to_string(),
                message: format!("no group with id {id}"),
            }),
        }
    }

    fn persist_items(&self) -> Result<(), CoreError> {
        let json = serde_json::to_string(&self.items)?;
        self.kv.set(TODO_ITEMS_KEY, &json)?;
        Ok(())
    }

    fn persist_groups(&self) -> Result<(), CoreError> {
        let json = serde_json::to_string(&self.groups)?;
        self.kv.set(TODO_GROUPS_KEY, &json)?;
        Ok(())
    }
}

fn read_list<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Vec<T> {
    match kv.get(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, error = %e, "discarding undecodable todo data");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(key, error = %e, "failed to read todo data");
            Vec::new()
        }
    }
}

fn valid_title(title: &str) -> Result<String, ValidationError> {
    non_blank("title", title)
}

fn valid_name(name: &str) -> Result<String, ValidationError> {
    non_blank("name", name)
}

fn non_blank(field: &str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "must not be blank".to_string(),
        });
    }
    Ok(value.to_string())
}

fn valid_color(color: &str) -> Result<(), ValidationError> {
    if GROUP_COLORS.contains(&color) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "color".to_string(),
            message: format!("expected one of {}", GROUP_COLORS.join(", ")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKv;
    use chrono::Duration;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn list() -> (Rc<MemoryKv>, TodoList) {
        let kv = Rc::new(MemoryKv::new());
        let list = TodoList::load(kv.clone());
        (kv, list)
    }

    #[test]
    fn fresh_store_gets_default_group() {
        let (kv, list) = list();
        assert_eq!(list.groups().len(), 1);
        let group = list.default_group().unwrap();
        assert_eq!(group.name, "My Tasks");
        assert_eq!(group.icon, "checkmark.circle.fill");
        assert_eq!(group.color_name, "orange");
        assert!(kv.get(TODO_GROUPS_KEY).unwrap().is_some());

        // Reloading keeps the same group instead of adding another.
        let again = TodoList::load(kv);
        assert_eq!(again.groups(), list.groups());
    }

    #[test]
    fn add_toggle_update_delete_item() {
        let (kv, mut list) = list();
        let group = list.default_group().unwrap().id;
        let now = at("2025-03-12T09:00:00Z");

        let item = TodoItem::new("  Write notes ", group, None, now);
        let id = item.id;
        list.add_item(item).unwrap();
        assert_eq!(list.item(id).unwrap().title, "Write notes");

        assert_eq!(list.toggle_complete(id).unwrap(), Some(true));
        assert_eq!(list.completed_in(group).count(), 1);
        assert_eq!(list.toggle_complete(id).unwrap(), Some(false));
        assert_eq!(list.pending_in(group).count(), 1);

        let mut edited = list.item(id).unwrap().clone();
        edited.title = "Write summary".into();
        assert!(list.update_item(edited).unwrap());

        let reloaded = TodoList::load(kv.clone());
        assert_eq!(reloaded.item(id).unwrap().title, "Write summary");

        assert!(list.delete_item(id).unwrap());
        assert!(!list.delete_item(id).unwrap());
        assert_eq!(list.toggle_complete(id).unwrap(), None);
        assert!(TodoList::load(kv).items().is_empty());
    }

    #[test]
    fn newest_item_first() {
        let (_kv, mut list) = list();
        let group = list.default_group().unwrap().id;
        let now = at("2025-03-12T09:00:00Z");
        list.add_item(TodoItem::new("first", group, None, now)).unwrap();
        list.add_item(TodoItem::new("second", group, None, now)).unwrap();
        assert_eq!(list.items()[0].title, "second");
    }

    #[test]
    fn blank_title_and_unknown_group_are_rejected() {
        let (_kv, mut list) = list();
        let group = list.default_group().unwrap().id;
        let now = at("2025-03-12T09:00:00Z");
        assert!(list.add_item(TodoItem::new("   ", group, None, now)).is_err());
        assert!(list
            .add_item(TodoItem::new("x", Uuid::new_v4(), None, now))
            .is_err());
        assert!(list.items().is_empty());
    }

    #[test]
    fn due_today_uses_calendar_and_skips_completed() {
        let (_kv, mut list) = list();
        let group = list.default_group().unwrap().id;
        let now = at("2025-03-12T09:00:00Z");
        let cal = CalendarContext::utc();

        let today = TodoItem::new("today", group, Some(at("2025-03-12T18:00:00Z")), now);
        let done = TodoItem::new("done", group, Some(at("2025-03-12T10:00:00Z")), now);
        let later = TodoItem::new("later", group, Some(now + Duration::days(1)), now);
        let undated = TodoItem::new("undated", group, None, now);
        let done_id = done.id;
        for item in [today, done, later, undated] {
            list.add_item(item).unwrap();
        }
        list.toggle_complete(done_id).unwrap();

        let due: Vec<_> = list.due_today(now, &cal).map(|i| i.title.as_str()).collect();
        assert_eq!(due, vec!["today"]);
        assert_eq!(list.pending().count(), 3);
    }

    #[test]
    fn groups_are_capped_and_ordered() {
        let (_kv, mut list) = list();
        for n in 1..MAX_GROUPS {
            let group = list.add_group(TodoGroup::new(format!("G{n}"))).unwrap();
            assert_eq!(group.order, n);
        }
        assert!(!list.can_add_group());
        let err = list.add_group(TodoGroup::new("one too many")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::LimitReached { max: 10, .. })
        ));
        assert_eq!(list.find_group("g3").unwrap().order, 3);
    }

    #[test]
    fn unknown_color_is_rejected() {
        let (_kv, mut list) = list();
        let mut group = TodoGroup::new("Work");
        group.color_name = "mauve".into();
        assert!(list.add_group(group).is_err());
        assert_eq!(list.groups().len(), 1);
    }

    #[test]
    fn deleting_group_cascades_to_items() {
        let (kv, mut list) = list();
        let home = list.default_group().unwrap().id;
        let work = list.add_group(TodoGroup::new("Work")).unwrap().id;
        let now = at("2025-03-12T09:00:00Z");
        list.add_item(TodoItem::new("report", work, None, now)).unwrap();
        list.add_item(TodoItem::new("laundry", home, None, now)).unwrap();

        assert!(list.delete_group(work).unwrap());
        assert!(list.group(work).is_none());
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].title, "laundry");

        let reloaded = TodoList::load(kv);
        assert_eq!(reloaded.groups().len(), 1);
        assert_eq!(reloaded.items().len(), 1);
    }

    #[test]
    fn last_group_cannot_be_deleted() {
        let (_kv, mut list) = list();
        let only = list.default_group().unwrap().id;
        assert!(list.delete_group(only).is_err());
        assert_eq!(list.groups().len(), 1);
        assert!(!list.delete_group(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn failed_write_leaves_list_unchanged() {
        let (kv, mut list) = list();
        let group = list.default_group().unwrap().id;
        kv.set_read_only(true);
        let now = at("2025-03-12T09:00:00Z");
        assert!(list.add_item(TodoItem::new("x", group, None, now)).is_err());
        assert!(list.items().is_empty());
        assert!(list.add_group(TodoGroup::new("Work")).is_err());
        assert_eq!(list.groups().len(), 1);
    }

    #[test]
    fn blob_uses_camel_case_fields() {
        let (kv, mut list) = list();
        let group = list.default_group().unwrap().id;
        list.add_item(TodoItem::new("x", group, None, at("2025-03-12T09:00:00Z")))
            .unwrap();
        let raw = kv.get(TODO_ITEMS_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["isCompleted"], false);
        assert!(json[0]["dueDate"].is_null());
        assert_eq!(json[0]["groupId"], group.to_string());

        let raw = kv.get(TODO_GROUPS_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["colorName"], "orange");
    }
}
