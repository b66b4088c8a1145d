//! Item tree.
//!
//! The store holds a list of items in one of three complexity modes. Simple
//! items carry only an id and a value; medium and deep items carry a shared
//! detail subtree that no transition ever touches, so the cost of copying a
//! list is independent of the mode while the payload behind each item grows.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Number of items the store starts with.
pub const INITIAL_ITEM_COUNT: usize = 200;

/// Bounds applied by [`Action::SetItemCount`](super::Action::SetItemCount).
pub const MIN_ITEM_COUNT: usize = 1;
pub const MAX_ITEM_COUNT: usize = 10_000;

/// Fixed reference time (milliseconds) used for generated timestamps.
const EPOCH_MS: u64 = 1_700_000_000_000;
const DAY_MS: u64 = 86_400_000;
const HOUR_MS: u64 = 3_600_000;

/// Object complexity of the generated items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemMode {
    #[default]
    Simple,
    Medium,
    Deep,
}

impl ItemMode {
    pub const ALL: [ItemMode; 3] = [ItemMode::Simple, ItemMode::Medium, ItemMode::Deep];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemMode::Simple => "simple",
            ItemMode::Medium => "medium",
            ItemMode::Deep => "deep",
        }
    }
}

impl fmt::Display for ItemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the item list.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: u32,
    pub value: i64,
    /// Present in medium and deep mode.
    pub detail: Option<Arc<ItemDetail>>,
}

impl Item {
    pub fn is_even(&self) -> bool {
        self.value % 2 == 0
    }
}

/// Shared list of shared items.
///
/// Replacing one item produces a new outer `Arc` while every other element
/// keeps its identity.
pub type ItemList = Arc<Vec<Arc<Item>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Active,
    Inactive,
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetail {
    pub name: String,
    pub description: String,
    pub status: ItemStatus,
    pub priority: u8,
    pub metadata: Metadata,
    /// Present in deep mode only.
    pub extended: Option<DeepDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub created: u64,
    pub updated: u64,
    pub version: u32,
    pub author: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub delete: bool,
    pub admin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeepDetail {
    pub analytics: Analytics,
    pub config: ItemConfig,
    pub nested: NestedLevel,
    pub relationships: Relationships,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    pub views: u64,
    pub clicks: u64,
    pub shares: u64,
    pub likes: u64,
    pub comments: u64,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub date: u64,
    pub action: &'static str,
    pub user_id: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemConfig {
    pub theme: &'static str,
    pub language: &'static str,
    pub timezone: &'static str,
    pub features: Vec<String>,
    pub max_storage: u64,
    pub max_requests: u64,
    pub rate_limit: u64,
}

/// One level of the nested payload; deep items are six levels deep.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedLevel {
    pub depth: u8,
    pub data: String,
    pub count: u64,
    pub child: Option<Box<NestedLevel>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationships {
    pub parent: Option<u32>,
    pub children: Vec<u32>,
    pub siblings: Vec<u32>,
    pub references: Vec<u32>,
}

const NESTED_DEPTH: u8 = 6;
const STATUSES: [ItemStatus; 3] = [ItemStatus::Active, ItemStatus::Inactive, ItemStatus::Pending];
const THEMES: [&str; 4] = ["light", "dark", "system", "auto"];
const LANGUAGES: [&str; 4] = ["ko", "en", "ja", "zh"];
const TIMEZONES: [&str; 4] = ["Asia/Seoul", "America/New_York", "Europe/London", "Asia/Tokyo"];
const ACTIONS: [&str; 6] = ["view", "click", "share", "bookmark", "comment", "like"];

/// Generate `count` items in `mode`.
///
/// Generation is deterministic: item `i` has id `i` and value `i`, and every
/// detail field is derived from the index.
pub fn create_items(count: usize, mode: ItemMode) -> ItemList {
    let items = (0..count)
        .map(|i| Arc::new(create_item(i as u32, count as u32, mode)))
        .collect();
    Arc::new(items)
}

fn create_item(i: u32, count: u32, mode: ItemMode) -> Item {
    let detail = match mode {
        ItemMode::Simple => None,
        ItemMode::Medium => Some(Arc::new(medium_detail(i, None))),
        ItemMode::Deep => Some(Arc::new(medium_detail(i, Some(deep_detail(i, count))))),
    };

    Item {
        id: i,
        value: i64::from(i),
        detail,
    }
}

fn medium_detail(i: u32, extended: Option<DeepDetail>) -> ItemDetail {
    let n = u64::from(i);
    ItemDetail {
        name: format!("Item-{i}"),
        description: format!(
            "This is a detailed description for item {i}. It contains various information \
             about the item's purpose, origin, and characteristics."
        ),
        status: STATUSES[(i % 3) as usize],
        priority: (i % 10) as u8 + 1,
        metadata: Metadata {
            created: EPOCH_MS.saturating_sub(n * DAY_MS),
            updated: EPOCH_MS.saturating_sub(n * HOUR_MS),
            version: i / 10 + 1,
            author: format!("user-{}", i % 100),
            tags: vec![
                format!("tag-{}", i % 5),
                format!("category-{}", i % 3),
                format!("type-{}", i % 2),
                format!("group-{}", i % 7),
            ],
            categories: vec![
                format!("cat-{}", i % 4),
                format!("subcat-{}", i % 6),
                format!("region-{}", i % 3),
            ],
            permissions: Permissions {
                read: true,
                write: i % 2 == 0,
                delete: i % 3 == 0,
                admin: i % 10 == 0,
            },
        },
        extended,
    }
}

fn deep_detail(i: u32, count: u32) -> DeepDetail {
    let n = u64::from(i);
    DeepDetail {
        analytics: Analytics {
            views: n * 100,
            clicks: n * 10,
            shares: n,
            likes: n * 5,
            comments: n % 50,
            history: (0..5u32)
                .map(|j| HistoryEntry {
                    date: EPOCH_MS.saturating_sub(u64::from(j) * DAY_MS),
                    action: ACTIONS[j as usize % ACTIONS.len()],
                    user_id: (i * 10 + j) % 1000,
                })
                .collect(),
        },
        config: ItemConfig {
            theme: THEMES[i as usize % THEMES.len()],
            language: LANGUAGES[i as usize % LANGUAGES.len()],
            timezone: TIMEZONES[i as usize % TIMEZONES.len()],
            features: vec![
                format!("feature-{}", i % 3),
                format!("addon-{}", i % 5),
                format!("plugin-{}", i % 7),
                format!("module-{}", i % 4),
            ],
            max_storage: 1024 * (n + 1),
            max_requests: 1000 * (n + 1),
            rate_limit: 100 + n,
        },
        nested: nested_level(i, 1),
        relationships: Relationships {
            parent: (i > 0).then_some(i / 2),
            children: (0..(i % 5).min(3)).map(|j| i * 10 + j).collect(),
            siblings: (1..=2).map(|j| i + j).collect(),
            references: (0..(i % 6).min(4))
                .map(|j| (i + j * 7) % count.max(1))
                .collect(),
        },
    }
}

fn nested_level(i: u32, depth: u8) -> NestedLevel {
    let filler = char::from(b'a' + depth - 1).to_string().repeat(20);
    NestedLevel {
        depth,
        data: format!("L{depth}-data-{i}-{filler}"),
        count: u64::from(i) * u64::from(depth),
        child: (depth < NESTED_DEPTH).then(|| Box::new(nested_level(i, depth + 1))),
    }
}

/// The transition last applied to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    #[default]
    None,
    SetItemCount,
    SetItemMode,
    BumpTick,
    MutateOneItem,
    ToggleFilter,
    RunDraftProbe,
}

crate::impl_ref_eq_by_value!(ItemMode, ActionType);

/// Outcome of the last draft probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftProbeLog {
    pub notes: Vec<String>,
    pub plain_recomputations: usize,
    pub draft_safe_recomputations: usize,
    /// Milliseconds since the Unix epoch; `0` if the probe never ran.
    pub last_run_at: u64,
}

/// The items slice of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsState {
    pub items: ItemList,
    pub item_mode: ItemMode,
    pub tick: u64,
    pub filter_even_only: bool,
    pub last_action: ActionType,
    pub draft_probe_log: Arc<DraftProbeLog>,
}

impl ItemsState {
    /// A slice holding `count` generated items in `mode`.
    pub fn with_items(count: usize, mode: ItemMode) -> Self {
        Self {
            items: create_items(count, mode),
            item_mode: mode,
            tick: 0,
            filter_even_only: false,
            last_action: ActionType::None,
            draft_probe_log: Arc::default(),
        }
    }
}

impl Default for ItemsState {
    fn default() -> Self {
        Self::with_items(INITIAL_ITEM_COUNT, ItemMode::Simple)
    }
}

/// Root of the state tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootState {
    pub items: Arc<ItemsState>,
}

impl RootState {
    pub fn new(items: ItemsState) -> Self {
        Self {
            items: Arc::new(items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let items = create_items(5, ItemMode::Simple);
        let values: Vec<i64> = items.iter().map(|item| item.value).collect();

        assert_eq!(values, vec![0, 1, 2, 3, 4]);
        assert!(items.iter().all(|item| item.detail.is_none()));
        assert_eq!(create_items(5, ItemMode::Deep), create_items(5, ItemMode::Deep));
    }

    #[test]
    fn modes_control_the_payload() {
        let medium = create_items(3, ItemMode::Medium);
        let detail = medium[2].detail.as_ref().unwrap();
        assert_eq!(detail.priority, 3);
        assert_eq!(detail.status, ItemStatus::Pending);
        assert!(detail.extended.is_none());

        let deep = create_items(3, ItemMode::Deep);
        let extended = deep[1].detail.as_ref().unwrap().extended.as_ref().unwrap();

        let mut depth = 1;
        let mut level = &extended.nested;
        while let Some(child) = &level.child {
            depth += 1;
            level = child;
        }
        assert_eq!(depth, 6);
        assert_eq!(extended.relationships.parent, Some(0));
    }

    #[test]
    fn initial_state_matches_defaults() {
        let state = RootState::default();
        assert_eq!(state.items.items.len(), INITIAL_ITEM_COUNT);
        assert_eq!(state.items.item_mode, ItemMode::Simple);
        assert_eq!(state.items.tick, 0);
        assert!(!state.items.filter_even_only);
        assert_eq!(state.items.last_action, ActionType::None);
        assert!(state.items.draft_probe_log.notes.is_empty());
    }

    #[test]
    fn modes_round_trip_through_serde() {
        let json = serde_json::to_string(&ItemMode::ALL).unwrap();
        assert_eq!(json, r#"["simple","medium","deep"]"#);
        let parsed: Vec<ItemMode> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ItemMode::ALL);
    }
}
