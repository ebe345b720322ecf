//! The migrated tables, in migration order.

use super::{SyntheticColumn, SyntheticValue, TableSpec};

/// Tenants (namespaces).
pub const TENANT_INFO: TableSpec = TableSpec {
    name: "tenant_info",
    source_columns: &["tenant_id", "tenant_name", "tenant_desc"],
    synthetic_columns: &[],
};

/// Configuration entries. `version` and `create_time` do not exist at the source.
pub const CONFIG_INFO: TableSpec = TableSpec {
    name: "config_info",
    source_columns: &["data_id", "group_id", "content", "tenant_id", "type"],
    synthetic_columns: &[
        SyntheticColumn {
            name: "version",
            value: SyntheticValue::Constant(1),
        },
        SyntheticColumn {
            name: "create_time",
            value: SyntheticValue::RunTimestamp,
        },
    ],
};

/// Tables migrated by a default run.
pub fn default_tables() -> Vec<TableSpec> {
    vec![TENANT_INFO, CONFIG_INFO]
}
