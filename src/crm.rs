//! Wire types for the CRM REST endpoints the job talks to: paginated ticket
//! search, batch ticket→deal association read, and flat property patches.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Property names projected by the ticket search.
pub const PROP_PIPELINE: &str = "hs_pipeline";
pub const PROP_PIPELINE_STAGE: &str = "hs_pipeline_stage";
pub const PROP_PRODUCT_ID: &str = "product_id_";

/// Placeholder for a ticket field whose property is absent or null.
pub const FIELD_ABSENT: &str = "N/A";

// -- Ticket search ----------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    pub property_name: String,
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct SearchFilterGroup {
    pub filters: Vec<SearchFilter>,
}

/// Body of the ticket search POST. The cursor is omitted entirely (not sent
/// as null) on the first page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSearchRequest {
    pub filter_groups: Vec<SearchFilterGroup>,
    pub properties: Vec<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl TicketSearchRequest {
    /// Search for tickets associated with one company, projecting exactly the
    /// three classification fields, page size 100.
    pub fn for_company(company_id: &str, after: Option<String>) -> Self {
        TicketSearchRequest {
            filter_groups: vec![SearchFilterGroup {
                filters: vec![SearchFilter {
                    property_name: "associations.company".to_string(),
                    operator: "EQ".to_string(),
                    value: company_id.to_string(),
                }],
            }],
            properties: vec![
                PROP_PIPELINE.to_string(),
                PROP_PIPELINE_STAGE.to_string(),
                PROP_PRODUCT_ID.to_string(),
            ],
            limit: 100,
            after,
        }
    }
}

/// One ticket row from the search response. Properties come back as a flat
/// string map with nullable values.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketRecord {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
}

impl TicketRecord {
    fn prop(&self, name: &str) -> &str {
        self.properties
            .get(name)
            .and_then(|v| v.as_deref())
            .unwrap_or(FIELD_ABSENT)
    }

    pub fn pipeline(&self) -> &str {
        self.prop(PROP_PIPELINE)
    }

    pub fn pipeline_stage(&self) -> &str {
        self.prop(PROP_PIPELINE_STAGE)
    }

    pub fn product_id(&self) -> &str {
        self.prop(PROP_PRODUCT_ID)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagingNext {
    pub after: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    pub next: Option<PagingNext>,
}

#[derive(Debug, Deserialize)]
pub struct TicketSearchResponse {
    #[serde(default)]
    pub results: Vec<TicketRecord>,
    pub paging: Option<Paging>,
}

impl TicketSearchResponse {
    /// Continuation cursor, if the response carries one.
    pub fn next_after(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|n| n.after.as_str())
    }
}

// -- Batch association read -------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AssociationInput {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct AssociationBatchRequest {
    pub inputs: Vec<AssociationInput>,
}

impl AssociationBatchRequest {
    pub fn new(ticket_ids: &[String]) -> Self {
        AssociationBatchRequest {
            inputs: ticket_ids
                .iter()
                .map(|id| AssociationInput { id: id.clone() })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociationResult {
    pub from: ObjectRef,
    #[serde(default)]
    pub to: Vec<ObjectRef>,
}

#[derive(Debug, Deserialize)]
pub struct AssociationBatchResponse {
    #[serde(default)]
    pub results: Vec<AssociationResult>,
}

impl AssociationBatchResponse {
    /// Flatten into a ticket→deal map. Tickets with no association are
    /// dropped; only the first associated deal is kept.
    pub fn into_deal_map(self) -> HashMap<String, String> {
        self.results
            .into_iter()
            .filter_map(|r| r.to.into_iter().next().map(|deal| (r.from.id, deal.id)))
            .collect()
    }
}

// -- Property patches -------------------------------------------------------

/// Flat property patch body shared by the company and deal endpoints. All
/// values are decimal strings; the CRM stores numeric properties as strings.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyPatch {
    pub properties: HashMap<String, String>,
}

impl PropertyPatch {
    pub fn company_credits(pending: u64, purchased: u64, extended: u64) -> Self {
        let mut properties = HashMap::new();
        properties.insert("credits_pending".to_string(), pending.to_string());
        properties.insert("total_credits_purchased".to_string(), purchased.to_string());
        properties.insert("extended_placement_credits".to_string(), extended.to_string());
        PropertyPatch { properties }
    }

    pub fn deal_credits(available: u64, purchased: u64) -> Self {
        let mut properties = HashMap::new();
        properties.insert("credits_available".to_string(), available.to_string());
        properties.insert("credits_purchased".to_string(), purchased.to_string());
        PropertyPatch { properties }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_shape() {
        let req = TicketSearchRequest::for_company("500", None);
        let v: serde_json::Value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(v["filterGroups"][0]["filters"][0]["propertyName"], "associations.company");
        assert_eq!(v["filterGroups"][0]["filters"][0]["operator"], "EQ");
        assert_eq!(v["filterGroups"][0]["filters"][0]["value"], "500");
        assert_eq!(v["limit"], 100);
        assert_eq!(
            v["properties"],
            serde_json::json!(["hs_pipeline", "hs_pipeline_stage", "product_id_"])
        );
    }

    #[test]
    fn test_search_request_omits_absent_cursor() {
        let req = TicketSearchRequest::for_company("500", None);
        let json = serde_json::to_string(&req).expect("serialize");
        assert!(!json.contains("after"), "cursor should be omitted, not null: {json}");
    }

    #[test]
    fn test_search_request_includes_cursor_when_present() {
        let req = TicketSearchRequest::for_company("500", Some("cursor-1".to_string()));
        let v: serde_json::Value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(v["after"], "cursor-1");
    }

    #[test]
    fn test_ticket_record_fields_with_values() {
        let json = r#"{
            "id": "T1",
            "properties": {
                "hs_pipeline": "11082157",
                "hs_pipeline_stage": "61272329",
                "product_id_": "3299780235"
            }
        }"#;
        let t: TicketRecord = serde_json::from_str(json).expect("deser");
        assert_eq!(t.pipeline(), "11082157");
        assert_eq!(t.pipeline_stage(), "61272329");
        assert_eq!(t.product_id(), "3299780235");
    }

    #[test]
    fn test_ticket_record_defaults_absent_and_null_to_na() {
        let json = r#"{"id": "T2", "properties": {"hs_pipeline": null}}"#;
        let t: TicketRecord = serde_json::from_str(json).expect("deser");
        assert_eq!(t.pipeline(), "N/A");
        assert_eq!(t.pipeline_stage(), "N/A");
        assert_eq!(t.product_id(), "N/A");
    }

    #[test]
    fn test_ticket_record_missing_properties_object() {
        let json = r#"{"id": "T3"}"#;
        let t: TicketRecord = serde_json::from_str(json).expect("deser");
        assert_eq!(t.pipeline(), "N/A");
    }

    #[test]
    fn test_search_response_cursor_present() {
        let json = r#"{"results": [{"id": "T1"}], "paging": {"next": {"after": "p2"}}}"#;
        let resp: TicketSearchResponse = serde_json::from_str(json).expect("deser");
        assert_eq!(resp.next_after(), Some("p2"));
    }

    #[test]
    fn test_search_response_cursor_absent() {
        let json = r#"{"results": [{"id": "T1"}]}"#;
        let resp: TicketSearchResponse = serde_json::from_str(json).expect("deser");
        assert_eq!(resp.next_after(), None);

        let json = r#"{"results": [], "paging": {"next": null}}"#;
        let resp: TicketSearchResponse = serde_json::from_str(json).expect("deser");
        assert_eq!(resp.next_after(), None);
    }

    #[test]
    fn test_association_batch_request_shape() {
        let req = AssociationBatchRequest::new(&["T1".to_string(), "T2".to_string()]);
        let v: serde_json::Value = serde_json::to_value(&req).expect("serialize");
        assert_eq!(v["inputs"], serde_json::json!([{"id": "T1"}, {"id": "T2"}]));
    }

    #[test]
    fn test_association_response_first_deal_wins() {
        let json = r#"{"results": [
            {"from": {"id": "T1"}, "to": [{"id": "D1"}, {"id": "D2"}]},
            {"from": {"id": "T2"}, "to": []}
        ]}"#;
        let resp: AssociationBatchResponse = serde_json::from_str(json).expect("deser");
        let map = resp.into_deal_map();
        assert_eq!(map.get("T1").map(String::as_str), Some("D1"));
        assert!(!map.contains_key("T2"));
    }

    #[test]
    fn test_company_patch_serializes_decimal_strings() {
        let patch = PropertyPatch::company_credits(3, 0, 12);
        let v: serde_json::Value = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(v["properties"]["credits_pending"], "3");
        assert_eq!(v["properties"]["total_credits_purchased"], "0");
        assert_eq!(v["properties"]["extended_placement_credits"], "12");
    }

    #[test]
    fn test_deal_patch_serializes_decimal_strings() {
        let patch = PropertyPatch::deal_credits(1, 2);
        let v: serde_json::Value = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(v["properties"]["credits_available"], "1");
        assert_eq!(v["properties"]["credits_purchased"], "2");
    }
}
