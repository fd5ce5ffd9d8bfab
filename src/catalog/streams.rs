//! Precoro resource definitions

use super::schemas;
use crate::config::TapConfig;
use crate::error::Result;
use crate::stream::{
    resolve_statuses, ContextMapping, RecordsLocation, StatusFilter, StatusTable,
    StreamDefinition, DOCUMENT_STATUSES, SUPPLIER_STATUSES,
};
use crate::watermark::approval_lower_bound;
use std::sync::Arc;
use tracing::info;

/// Query parameter of the approval-date lower bound
pub const APPROVAL_DATE_PARAM: &str = "approvalLeftDate";

/// Document status fetched when nothing else is configured
pub const DEFAULT_DOCUMENT_STATUS: i64 = 2;

/// Status filter of invoices and expenses
///
/// Approved documents only unless `all_invoices` is set, in which case no
/// filter applies, or `statuses` names another selection.
fn document_status_filter(config: &TapConfig, stream: &str) -> Option<StatusFilter> {
    if config.all_invoices {
        info!("Flag all_invoices on, fetching {stream} in every status");
        return None;
    }

    match config.statuses.as_deref() {
        Some(raw) => configured_status_filter(DOCUMENT_STATUSES, raw, stream),
        None => Some(StatusFilter::new(vec![DEFAULT_DOCUMENT_STATUS])),
    }
}

fn configured_status_filter(table: StatusTable, raw: &str, stream: &str) -> Option<StatusFilter> {
    let names: Vec<&str> = raw.split(',').map(str::trim).collect();
    info!("Status flag found in config, fetching {stream} with status in {names:?}");

    let codes = resolve_statuses(table, raw);
    if codes.is_empty() {
        info!("No known status in {names:?}, {stream} are not filtered by status");
        return None;
    }
    Some(StatusFilter::new(codes))
}

/// Status, approval-date and child-context setup shared by invoices and expenses
fn document_stream(
    config: &TapConfig,
    name: &str,
    path: &str,
    child: ContextMapping,
) -> StreamDefinition {
    let mut definition = StreamDefinition::new(name, path)
        .incremental("updateDate")
        .with_schema(schemas::transactions())
        .with_child_context(child);

    if let Some(filter) = document_status_filter(config, name) {
        definition = definition.with_status_filter(filter);
    }
    if let Some(approved_since) = approval_lower_bound(config.approval_date.as_deref()) {
        definition = definition.with_query(APPROVAL_DATE_PARAM, approved_since);
    }
    definition
}

/// Every Precoro resource, parents before their children
///
/// Fails only when the export condition in `config` is invalid.
pub fn precoro_streams(config: &TapConfig) -> Result<Vec<StreamDefinition>> {
    let taxes = StreamDefinition::new("taxes", "/taxes").with_schema(schemas::taxes());

    let mut invoices = document_stream(
        config,
        "invoices",
        "/invoices",
        ContextMapping::new("invoice_id", "idn"),
    );
    if let Some(condition) = config.export_condition()? {
        info!(
            "Export condition set, keeping invoices whose custom field {} is {:?}",
            condition.field_id, condition.allowed_value
        );
        invoices = invoices.with_filter(Arc::new(condition));
    }

    let invoices_details = StreamDefinition::new("invoices_details", "/invoices/{invoice_id}")
        .with_records(RecordsLocation::WholeBody)
        .with_parent("invoices")
        .with_schema(schemas::invoice_details());

    let mut suppliers = StreamDefinition::new("suppliers", "/suppliers")
        .incremental("updateDate")
        .with_schema(schemas::suppliers());
    if let Some(raw) = config.supplier_status.as_deref() {
        if let Some(filter) = configured_status_filter(SUPPLIER_STATUSES, raw, "suppliers") {
            suppliers = suppliers.with_status_filter(filter);
        }
    }

    let items = StreamDefinition::new("items", "/items")
        .incremental("updateDate")
        .with_schema(schemas::items());

    let expenses = document_stream(
        config,
        "expenses",
        "/expenses",
        ContextMapping::new("expense_idn", "idn"),
    );

    let expenses_details = StreamDefinition::new("expenses_details", "/expenses/{expense_idn}")
        .with_records(RecordsLocation::WholeBody)
        .with_parent("expenses")
        .with_schema(schemas::expense_details());

    Ok(vec![
        taxes,
        invoices,
        invoices_details,
        suppliers,
        items,
        expenses,
        expenses_details,
    ])
}
