//! Account Server topic fetchers.

#![allow(missing_docs)]

use std::sync::Arc;

use serde_json::Value as Json;

use crate::auth::Token;
use crate::backend::{ApiClient, Backend, array, boolean, decimal, integer, pointer, text, timestamp};
use crate::core::errors::Result;
use crate::topics::row::{Row, Value};
use crate::topics::source::TopicFetcher;

const BACKEND: Backend = Backend::AccountServer;

/// Organisation that holds every user's personal unit.
pub const DEFAULT_ORGANISATION: &str = "Default";

/// Declares a fetcher that issues one `GET` and hands the body to an
/// extraction function.
macro_rules! simple_fetcher {
    ($name:ident, $path:literal, $extract:ident) => {
        pub struct $name {
            client: Arc<ApiClient>,
        }

        impl $name {
            #[must_use]
            pub const fn new(client: Arc<ApiClient>) -> Self {
                Self { client }
            }
        }

        impl TopicFetcher for $name {
            fn fetch(&self, token: &Token) -> Result<Vec<Row>> {
                let body = self.client.get(token, $path, &[])?;
                $extract(&body)
            }
        }
    };
}

simple_fetcher!(ProductsFetcher, "product", product_rows);
simple_fetcher!(MerchantsFetcher, "merchant", merchant_rows);
simple_fetcher!(AssetsFetcher, "asset", asset_rows);

/// Units grouped by organisation. `personal` selects only the units of the
/// default organisation; otherwise that organisation is skipped.
pub struct UnitsFetcher {
    client: Arc<ApiClient>,
    personal: bool,
}

impl UnitsFetcher {
    #[must_use]
    pub const fn new(client: Arc<ApiClient>, personal: bool) -> Self {
        Self { client, personal }
    }
}

impl TopicFetcher for UnitsFetcher {
    fn fetch(&self, token: &Token) -> Result<Vec<Row>> {
        let body = self.client.get(token, "unit", &[])?;
        unit_rows(&body, self.personal)
    }
}

pub fn product_rows(body: &Json) -> Result<Vec<Row>> {
    Ok(array(BACKEND, body, "products")?
        .iter()
        .map(|product| {
            let storage = match text(product, "storage/size/current") {
                Value::Text(size) if size == "0 Bytes" => Value::Null,
                other => other,
            };
            Row::new()
                .with("id", text(product, "product/id"))
                .with("type", text(product, "product/type"))
                .with("unit", text(product, "unit/name"))
                .with("name", text(product, "product/name"))
                .with("storage", storage)
                .with("coins", decimal(product, "coins/used"))
                .with("allowance", decimal(product, "coins/allowance"))
                .with("limit", decimal(product, "coins/limit"))
        })
        .collect())
}

pub fn merchant_rows(body: &Json) -> Result<Vec<Row>> {
    Ok(array(BACKEND, body, "merchants")?
        .iter()
        .map(|merchant| {
            Row::new()
                .with("id", integer(merchant, "id"))
                .with("kind", text(merchant, "kind"))
                .with("created", timestamp(merchant, "created"))
                .with("hostname", text(merchant, "api_hostname"))
                .with("name", text(merchant, "name"))
        })
        .collect())
}

/// Assets with their merchant names joined by commas.
pub fn asset_rows(body: &Json) -> Result<Vec<Row>> {
    Ok(array(BACKEND, body, "assets")?
        .iter()
        .map(|asset| {
            let merchants = pointer(asset, "merchants")
                .and_then(Json::as_array)
                .map(|merchants| {
                    merchants
                        .iter()
                        .filter_map(|merchant| merchant.get("name").and_then(Json::as_str))
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_default();
            Row::new()
                .with("name", text(asset, "name"))
                .with("creator", text(asset, "creator"))
                .with("scope", text(asset, "scope"))
                .with("scope_id", text(asset, "scope_id"))
                .with("created", timestamp(asset, "created"))
                .with("disabled", boolean(asset, "disabled"))
                .with("secret", boolean(asset, "secret"))
                .with("merchants", merchants)
        })
        .collect())
}

pub fn unit_rows(body: &Json, personal: bool) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for organisation in array(BACKEND, body, "units")? {
        let org_name = text(organisation, "organisation/name");
        let is_default = org_name.as_str() == Some(DEFAULT_ORGANISATION);
        if is_default != personal {
            continue;
        }
        let units = organisation
            .get("units")
            .and_then(Json::as_array)
            .map_or(&[][..], Vec::as_slice);
        for unit in units {
            rows.push(
                Row::new()
                    .with("org", org_name.clone())
                    .with("id", text(unit, "id"))
                    .with("name", text(unit, "name"))
                    .with("owner", text(unit, "owner_id"))
                    .with("created", timestamp(unit, "created"))
                    .with("private", boolean(unit, "private")),
            );
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn units_body() -> Json {
        json!({"units": [
            {"organisation": {"name": "Default"}, "units": [
                {"id": "unit-personal-1", "name": "alan", "owner_id": "alan",
                 "created": "2023-01-01T00:00:00Z", "private": true}
            ]},
            {"organisation": {"name": "Informatics Matters"}, "units": [
                {"id": "unit-1", "name": "Ops", "owner_id": "dave",
                 "created": "2023-01-02T00:00:00Z", "private": false},
                {"id": "unit-2", "name": "Dev", "owner_id": "sue",
                 "created": "2023-01-03T00:00:00Z", "private": true}
            ]}
        ]})
    }

    #[test]
    fn units_skip_the_default_organisation() {
        let rows = unit_rows(&units_body(), false).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(
            rows.iter()
                .all(|r| r.get("org") == &Value::text("Informatics Matters"))
        );
    }

    #[test]
    fn personal_units_only_cover_the_default_organisation() {
        let rows = unit_rows(&units_body(), true).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("owner"), &Value::text("alan"));
        assert_eq!(rows[0].get("private"), &Value::Bool(true));
    }

    #[test]
    fn products_parse_coins_and_blank_empty_storage() {
        let body = json!({"products": [
            {"product": {"id": "product-1", "type": "DATA_MANAGER_PROJECT_TIER_SUBSCRIPTION",
                         "name": "Evaluation"},
             "unit": {"name": "Ops"},
             "storage": {"size": {"current": "0 Bytes"}},
             "coins": {"used": "1250.5", "allowance": "1000", "limit": "1500"}},
            {"product": {"id": "product-2", "type": "DATA_MANAGER_STORAGE_SUBSCRIPTION",
                         "name": "Storage"},
             "unit": {"name": "Dev"},
             "storage": {"size": {"current": "1.5 GiB"}},
             "coins": {"used": "0", "allowance": "100", "limit": "200"}}
        ]});
        let rows = product_rows(&body).unwrap();
        assert!(rows[0].get("storage").is_null());
        assert_eq!(rows[0].get("coins"), &Value::Decimal(1250.5));
        assert_eq!(rows[1].get("storage"), &Value::text("1.5 GiB"));
        assert_eq!(rows[1].get("limit"), &Value::Decimal(200.0));
    }

    #[test]
    fn assets_join_merchant_names() {
        let body = json!({"assets": [
            {"name": "licence", "creator": "alan", "scope": "UNIT", "scope_id": "unit-1",
             "created": "2023-01-01T00:00:00Z", "disabled": false, "secret": true,
             "merchants": [{"name": "DM-1"}, {"name": "DM-2"}]},
            {"name": "key", "creator": "sue", "scope": "USER", "scope_id": "sue",
             "created": "2023-01-01T00:00:00Z", "disabled": true, "secret": false,
             "merchants": []}
        ]});
        let rows = asset_rows(&body).unwrap();
        assert_eq!(rows[0].get("merchants"), &Value::text("DM-1,DM-2"));
        assert_eq!(rows[1].get("merchants"), &Value::text(""));
        assert_eq!(rows[1].get("disabled"), &Value::Bool(true));
    }

    #[test]
    fn merchants_keep_numeric_ids() {
        let body = json!({"merchants": [
            {"id": 2, "kind": "DATA_MANAGER", "created": "2023-01-01T00:00:00Z",
             "api_hostname": "dm.example.com", "name": "Data Manager"}
        ]});
        let rows = merchant_rows(&body).unwrap();
        assert_eq!(rows[0].get("id"), &Value::Integer(2));
        assert_eq!(rows[0].get("hostname"), &Value::text("dm.example.com"));
    }
}
