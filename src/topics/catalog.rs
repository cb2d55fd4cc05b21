//! Static per-topic table: columns, default sort, and title summary.

#![allow(missing_docs)]

use serde::Serialize;

use crate::topics::TopicId;
use crate::topics::dataset::SortState;
use crate::topics::projection::{
    CellFormat, ColumnSpec, Justify, StyleTag, Summary, TableProjection,
};
use crate::topics::row::ValueKind;

/// Everything static about a topic.
#[derive(Debug, Clone, Copy)]
pub struct TopicDefinition {
    pub id: TopicId,
    pub label: &'static str,
    pub columns: &'static [ColumnSpec],
    pub default_sort: SortState,
    pub summary: Summary,
}

impl TopicDefinition {
    #[must_use]
    pub const fn projection(&self) -> TableProjection<'static> {
        TableProjection {
            label: self.label,
            columns: self.columns,
            summary: self.summary,
        }
    }

    #[must_use]
    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.key == key)
    }

    #[must_use]
    pub fn describe(&self) -> TopicSummary {
        let column = &self.columns[self.default_sort.column];
        TopicSummary {
            topic: self.id,
            label: self.label,
            backend: self.id.backend().label(),
            hotkey: self.id.hotkey(),
            default_sort: column.key,
            ascending: self.default_sort.ascending,
            columns: self.columns.iter().map(|column| column.key).collect(),
        }
    }
}

/// Serializable description used by `squad topics`.
#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub topic: TopicId,
    pub label: &'static str,
    pub backend: &'static str,
    pub hotkey: char,
    pub default_sort: &'static str,
    pub ascending: bool,
    pub columns: Vec<&'static str>,
}

// ──────────────────── style and tag tables ────────────────────

const PHASE_STYLES: &[(&str, StyleTag)] = &[
    ("RUNNING", StyleTag::Active),
    ("COMPLETED", StyleTag::Done),
    ("FAILED", StyleTag::Failed),
];

const STAGE_STYLES: &[(&str, StyleTag)] = &[
    ("FORMATTING", StyleTag::Pending),
    ("LOADING", StyleTag::Pending),
    ("COPYING", StyleTag::Active),
    ("DELETING", StyleTag::Highlight),
    ("DONE", StyleTag::Done),
    ("FAILED", StyleTag::Failed),
];

const SEVERITY_STYLES: &[(&str, StyleTag)] = &[
    ("CRITICAL", StyleTag::Failed),
    ("ERROR", StyleTag::Failed),
    ("WARNING", StyleTag::Pending),
];

const MERCHANT_STYLES: &[(&str, StyleTag)] = &[("DATA_MANAGER", StyleTag::Highlight)];

const SCOPE_STYLES: &[(&str, StyleTag)] = &[
    ("USER", StyleTag::User),
    ("PRODUCT", StyleTag::Done),
    ("UNIT", StyleTag::Active),
    ("ORGANISATION", StyleTag::Highlight),
];

const APP_TAGS: &[(&str, &str)] = &[("jupyternotebooks.squonk.it", "Jupyter Notebook")];

const PRODUCT_TYPE_TAGS: &[(&str, &str)] = &[
    ("DATA_MANAGER_PROJECT_TIER_SUBSCRIPTION", "DM Project Tier"),
    ("DATA_MANAGER_STORAGE_SUBSCRIPTION", "DM Storage"),
];

const NAME_WIDTH: usize = 14;

// ──────────────────── columns ────────────────────

const UUID: ColumnSpec = ColumnSpec::new("id", "UUID", ValueKind::Text).style(StyleTag::ItemKey);

const INSTANCES: &[ColumnSpec] = &[
    UUID,
    ColumnSpec::new("name", "Name", ValueKind::Text)
        .style(StyleTag::Name)
        .format(CellFormat::Shorten(NAME_WIDTH)),
    ColumnSpec::new("owner", "Owner", ValueKind::Text).style(StyleTag::User),
    ColumnSpec::new("launched", "Launched", ValueKind::Timestamp).style(StyleTag::Date),
    ColumnSpec::new("phase", "Phase", ValueKind::Text).styled_by(
        "phase",
        PHASE_STYLES,
        StyleTag::Pending,
    ),
    ColumnSpec::new("app_job", "App/Job", ValueKind::Text)
        .style(StyleTag::App)
        .format(CellFormat::Tag(APP_TAGS)),
];

const DATASETS: &[ColumnSpec] = &[
    UUID,
    ColumnSpec::new("version", "Ver", ValueKind::Integer)
        .style(StyleTag::Name)
        .justify(Justify::Right),
    ColumnSpec::new("owner", "Owner", ValueKind::Text).style(StyleTag::User),
    ColumnSpec::new("stage", "Stage", ValueKind::Text).styled_by(
        "stage",
        STAGE_STYLES,
        StyleTag::Neutral,
    ),
    ColumnSpec::new("filename", "Filename", ValueKind::Text).style(StyleTag::Name),
    ColumnSpec::new("size", "Size", ValueKind::Integer)
        .style(StyleTag::Size)
        .justify(Justify::Right)
        .format(CellFormat::HumanSize { blank_zero: false }),
    ColumnSpec::new("published", "Published (UTC)", ValueKind::Timestamp).style(StyleTag::Date),
    ColumnSpec::new("used", "Used", ValueKind::Integer)
        .style(StyleTag::Used)
        .justify(Justify::Center)
        .format(CellFormat::CountOrCross),
];

const PROJECTS: &[ColumnSpec] = &[
    UUID,
    ColumnSpec::new("name", "Name", ValueKind::Text)
        .style(StyleTag::Name)
        .format(CellFormat::Truncate(NAME_WIDTH)),
    ColumnSpec::new("owner", "Owner", ValueKind::Text).style(StyleTag::User),
    ColumnSpec::new("size", "Size", ValueKind::Integer)
        .style(StyleTag::Size)
        .justify(Justify::Right)
        .format(CellFormat::HumanSize { blank_zero: true }),
];

const PRODUCTS: &[ColumnSpec] = &[
    UUID,
    ColumnSpec::new("type", "Type", ValueKind::Text)
        .style(StyleTag::Type)
        .format(CellFormat::Tag(PRODUCT_TYPE_TAGS)),
    ColumnSpec::new("unit", "Unit", ValueKind::Text).style(StyleTag::Name),
    ColumnSpec::new("name", "Name", ValueKind::Text).style(StyleTag::Name),
    ColumnSpec::new("storage", "Storage", ValueKind::Text)
        .style(StyleTag::Size)
        .justify(Justify::Right),
    ColumnSpec::new("coins", "Coins", ValueKind::Decimal)
        .style(StyleTag::Coin)
        .justify(Justify::Right)
        .format(CellFormat::Coins {
            allowance: "allowance",
            limit: "limit",
        }),
    ColumnSpec::new("allowance", "Allowance", ValueKind::Decimal)
        .style(StyleTag::Coin)
        .justify(Justify::Right)
        .format(CellFormat::IntComma { blank_zero: false }),
    ColumnSpec::new("limit", "Limit", ValueKind::Decimal)
        .style(StyleTag::Coin)
        .justify(Justify::Right)
        .format(CellFormat::IntComma { blank_zero: false }),
];

const MERCHANTS: &[ColumnSpec] = &[
    ColumnSpec::new("id", "ID", ValueKind::Integer)
        .style(StyleTag::User)
        .justify(Justify::Right),
    ColumnSpec::new("kind", "Kind", ValueKind::Text).styled_by(
        "kind",
        MERCHANT_STYLES,
        StyleTag::Merchant,
    ),
    ColumnSpec::new("created", "Created (UTC)", ValueKind::Timestamp).style(StyleTag::Date),
    ColumnSpec::new("hostname", "Hostname", ValueKind::Text).style(StyleTag::ItemKey),
    ColumnSpec::new("name", "Name", ValueKind::Text).style(StyleTag::Merchant),
];

const ASSETS: &[ColumnSpec] = &[
    ColumnSpec::new("name", "Name", ValueKind::Text).style(StyleTag::Name),
    ColumnSpec::new("creator", "Creator", ValueKind::Text).style(StyleTag::User),
    ColumnSpec::new("scope_id", "Scope ID", ValueKind::Text).styled_by(
        "scope",
        SCOPE_STYLES,
        StyleTag::ItemKey,
    ),
    ColumnSpec::new("created", "Created (UTC)", ValueKind::Timestamp).style(StyleTag::Date),
    ColumnSpec::new("disabled", "Disabled", ValueKind::Boolean)
        .justify(Justify::Center)
        .format(CellFormat::TickCross),
    ColumnSpec::new("secret", "Secret", ValueKind::Boolean)
        .justify(Justify::Center)
        .format(CellFormat::TickCross),
    ColumnSpec::new("merchants", "Merchants", ValueKind::Text).style(StyleTag::Merchant),
];

const PRIVATE: ColumnSpec = ColumnSpec::new("private", "Private", ValueKind::Boolean)
    .justify(Justify::Center)
    .format(CellFormat::TickCross);

const CREATED: ColumnSpec =
    ColumnSpec::new("created", "Created (UTC)", ValueKind::Timestamp).style(StyleTag::Date);

const PERSONAL_UNITS: &[ColumnSpec] = &[
    UUID,
    ColumnSpec::new("owner", "Owner", ValueKind::Text).style(StyleTag::Name),
    CREATED,
    PRIVATE,
];

const UNITS: &[ColumnSpec] = &[
    ColumnSpec::new("org", "Org", ValueKind::Text)
        .style(StyleTag::Name)
        .grouped(),
    UUID,
    ColumnSpec::new("name", "Name", ValueKind::Text).style(StyleTag::Name),
    ColumnSpec::new("owner", "Owner", ValueKind::Text).style(StyleTag::User),
    CREATED,
    PRIVATE,
];

const SERVICE_ERRORS: &[ColumnSpec] = &[
    ColumnSpec::new("id", "ID", ValueKind::Integer)
        .style(StyleTag::ItemKey)
        .justify(Justify::Right),
    ColumnSpec::new("created", "Time", ValueKind::Timestamp).style(StyleTag::Date),
    ColumnSpec::new("severity", "Severity", ValueKind::Text).styled_by(
        "severity",
        SEVERITY_STYLES,
        StyleTag::Neutral,
    ),
    ColumnSpec::new("hostname", "Host", ValueKind::Text).style(StyleTag::ItemKey),
    ColumnSpec::new("summary", "Summary", ValueKind::Text).style(StyleTag::Size),
];

const COLLECTION: ColumnSpec = ColumnSpec::new("collection", "Collection", ValueKind::Text)
    .style(StyleTag::Collection)
    .grouped();
const JOB: ColumnSpec = ColumnSpec::new("job", "Job", ValueKind::Text).style(StyleTag::Job);
const VERSION: ColumnSpec =
    ColumnSpec::new("version", "Version", ValueKind::Text).style(StyleTag::Version);

const DEFINED_RATES: &[ColumnSpec] = &[
    COLLECTION,
    JOB,
    VERSION,
    ColumnSpec::new("rate", "Rate", ValueKind::Text)
        .style(StyleTag::Rate)
        .justify(Justify::Right),
];

const UNDEFINED_RATES: &[ColumnSpec] = &[COLLECTION, JOB, VERSION];

// ──────────────────── definitions ────────────────────

const fn define(
    id: TopicId,
    label: &'static str,
    columns: &'static [ColumnSpec],
    default_sort: SortState,
    summary: Summary,
) -> TopicDefinition {
    TopicDefinition {
        id,
        label,
        columns,
        default_sort,
        summary,
    }
}

static DEFINITIONS: [TopicDefinition; 11] = [
    define(
        TopicId::Instances,
        "Instances",
        INSTANCES,
        SortState::descending(3),
        Summary::None,
    ),
    define(
        TopicId::Datasets,
        "Datasets",
        DATASETS,
        SortState::descending(5),
        Summary::TotalSize("size"),
    ),
    define(
        TopicId::Projects,
        "Projects",
        PROJECTS,
        SortState::descending(3),
        Summary::TotalSize("size"),
    ),
    define(
        TopicId::Products,
        "Products",
        PRODUCTS,
        SortState::descending(5),
        Summary::None,
    ),
    define(
        TopicId::Merchants,
        "Merchants",
        MERCHANTS,
        SortState::ascending(0),
        Summary::None,
    ),
    define(
        TopicId::Assets,
        "Assets",
        ASSETS,
        SortState::ascending(0),
        Summary::None,
    ),
    define(
        TopicId::PersonalUnits,
        "Personal units",
        PERSONAL_UNITS,
        SortState::ascending(1),
        Summary::None,
    ),
    define(
        TopicId::Units,
        "Units",
        UNITS,
        SortState::ascending(0),
        Summary::None,
    ),
    define(
        TopicId::ServiceErrors,
        "Service errors",
        SERVICE_ERRORS,
        SortState::descending(1),
        Summary::None,
    ),
    define(
        TopicId::DefinedExchangeRates,
        "Defined exchange rates",
        DEFINED_RATES,
        SortState::ascending(0),
        Summary::None,
    ),
    define(
        TopicId::UndefinedExchangeRates,
        "Undefined exchange rates",
        UNDEFINED_RATES,
        SortState::ascending(0),
        Summary::None,
    ),
];

/// Static definition for `topic`.
#[must_use]
pub fn definition(topic: TopicId) -> &'static TopicDefinition {
    DEFINITIONS
        .iter()
        .find(|definition| definition.id == topic)
        .unwrap_or(&DEFINITIONS[0])
}

/// All definitions in navigation order.
#[must_use]
pub fn definitions() -> &'static [TopicDefinition] {
    &DEFINITIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_topic_has_a_definition_in_navigation_order() {
        let ids: Vec<TopicId> = definitions().iter().map(|d| d.id).collect();
        assert_eq!(ids, TopicId::ALL.to_vec());
        for topic in TopicId::ALL {
            assert_eq!(definition(topic).id, topic);
        }
    }

    #[test]
    fn default_sorts_name_real_columns() {
        for definition in definitions() {
            assert!(
                definition.default_sort.column < definition.columns.len(),
                "{} default sort out of range",
                definition.id
            );
        }
    }

    #[test]
    fn documented_default_sorts() {
        let key = |topic| {
            let d = definition(topic);
            (d.columns[d.default_sort.column].key, d.default_sort.ascending)
        };
        assert_eq!(key(TopicId::Products), ("coins", false));
        assert_eq!(key(TopicId::Instances), ("launched", false));
        assert_eq!(key(TopicId::Datasets), ("size", false));
        assert_eq!(key(TopicId::Projects), ("size", false));
        assert_eq!(key(TopicId::UndefinedExchangeRates), ("collection", true));
    }

    #[test]
    fn column_keys_are_unique_per_topic() {
        for definition in definitions() {
            let mut keys: Vec<&str> = definition.columns.iter().map(|c| c.key).collect();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), definition.columns.len(), "{}", definition.id);
        }
    }

    #[test]
    fn describe_reports_default_sort_key() {
        let summary = definition(TopicId::ServiceErrors).describe();
        assert_eq!(summary.default_sort, "created");
        assert!(!summary.ascending);
        assert_eq!(summary.backend, "DM");
        assert_eq!(definition(TopicId::Units).column_index("private"), Some(5));
    }

    #[test]
    fn long_names_cut_per_topic() {
        let name = |topic: TopicId| {
            let definition = definition(topic);
            let column = definition.columns[definition.column_index("name").unwrap()];
            column
                .render(&crate::topics::row::Row::new().with("name", "abcdefghijklmnopqrst"))
                .0
        };
        assert_eq!(name(TopicId::Instances), "abcdefghijklmn\u{2026}");
        assert_eq!(name(TopicId::Projects), "abcdefghijklm\u{2026}");
    }
}
