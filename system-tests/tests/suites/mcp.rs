// system-tests/tests/suites/mcp.rs
// ============================================================================
// Module: MCP Tests
// Description: MCP tool coverage through the JSON-RPC client.
// Purpose: Validate tool discovery, queries, values, filters, and pagination.
// Dependencies: system-tests helpers, datakwip-clients
// ============================================================================

//! MCP tool functional tests for the DataKwip harness.

use std::collections::BTreeSet;
use std::time::Instant;

use datakwip_clients::EntityQuery;
use datakwip_clients::mcp::GET_CURRENT_VALUES_TOOL;
use datakwip_clients::mcp::QUERY_ENTITIES_TOOL;
use helpers::artifacts::TestReporter;
use helpers::deployment::Deployment;
use helpers::timeouts::ENTITY_LIST_BUDGET;
use helpers::timeouts::TOOL_LIST_BUDGET;
use helpers::timeouts::resolve_timeout;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::helpers;

/// Organization id no deployment is expected to have.
const UNKNOWN_ORG_ID: i64 = 99_999;

fn standard_artifacts() -> Vec<String> {
    vec!["summary.json".to_string(), "summary.md".to_string()]
}

fn entity_ids(entities: &[Value]) -> Vec<i64> {
    entities.iter().filter_map(|entity| entity.get("id").and_then(Value::as_i64)).collect()
}

#[test]
fn mcp_lists_known_tools() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("mcp_lists_known_tools")?;
    let deployment = Deployment::resolve()?;
    reporter.set_target(deployment.label());
    let client = deployment.mcp_client()?;

    let start = Instant::now();
    let tools = client.list_tools()?;
    let elapsed = start.elapsed();

    let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    for expected in [QUERY_ENTITIES_TOOL, GET_CURRENT_VALUES_TOOL] {
        if !names.contains(&expected) {
            return Err(format!("tool {expected} missing from {}", names.join(", ")).into());
        }
    }
    let budget = resolve_timeout(TOOL_LIST_BUDGET)?;
    if elapsed > budget {
        return Err(format!("tools/list took {}ms", elapsed.as_millis()).into());
    }

    reporter.finish(
        "pass",
        vec![format!("tools: {}", names.join(", ")), format!("latency: {}ms", elapsed.as_millis())],
        standard_artifacts(),
    )?;
    Ok(())
}

#[test]
fn mcp_query_entities_respects_limit() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("mcp_query_entities_respects_limit")?;
    let deployment = Deployment::resolve()?;
    reporter.set_target(deployment.label());
    let settings = &deployment.target().settings;
    let client = deployment.mcp_client()?;

    let query = EntityQuery {
        org_id: settings.org_id,
        limit: settings.entity_limit,
        ..EntityQuery::default()
    };
    let start = Instant::now();
    let entities = client.query_entities(&query)?;
    let elapsed = start.elapsed();

    if entities.len() > usize::try_from(settings.entity_limit)? {
        return Err(
            format!("{} entities exceed limit {}", entities.len(), settings.entity_limit).into()
        );
    }
    if let Some(entity) =
        entities.iter().find(|entity| entity.get("id").is_none() && entity.get("key").is_none())
    {
        return Err(format!("entity without id or key: {entity}").into());
    }
    if deployment.stub_handle().is_some() && entities.is_empty() {
        return Err("stub deployment returned no entities".into());
    }
    let budget = resolve_timeout(ENTITY_LIST_BUDGET)?;
    if elapsed > budget {
        return Err(format!("query_entities took {}ms", elapsed.as_millis()).into());
    }

    reporter.finish(
        "pass",
        vec![
            format!("entities: {}", entities.len()),
            format!("latency: {}ms", elapsed.as_millis()),
        ],
        standard_artifacts(),
    )?;
    Ok(())
}

#[test]
fn mcp_current_values_for_discovered_entities() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("mcp_current_values_for_discovered_entities")?;
    let deployment = Deployment::resolve()?;
    reporter.set_target(deployment.label());
    let org_id = deployment.target().settings.org_id;
    let client = deployment.mcp_client()?;

    let entities = client.query_entities(&EntityQuery {
        org_id,
        limit: 3,
        ..EntityQuery::default()
    })?;
    let ids: Vec<i64> = entity_ids(&entities).into_iter().take(3).collect();
    if ids.is_empty() {
        reporter.finish(
            "skipped",
            vec!["no entities available for value query".to_string()],
            standard_artifacts(),
        )?;
        return Ok(());
    }

    let values = client.get_current_values(&ids, org_id)?;
    let returned: BTreeSet<i64> =
        values.iter().filter_map(|value| value.get("entity_id").and_then(Value::as_i64)).collect();
    if let Some(extra) = returned.iter().find(|id| !ids.contains(id)) {
        return Err(format!("value returned for unrequested entity {extra}").into());
    }
    if deployment.stub_handle().is_some() && returned.len() != ids.len() {
        return Err(format!("expected {} values, got {}", ids.len(), returned.len()).into());
    }

    reporter.finish(
        "pass",
        vec![format!("queried entities: {}", ids.len()), format!("values: {}", values.len())],
        standard_artifacts(),
    )?;
    Ok(())
}

#[test]
fn mcp_filtered_query_respects_limit() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("mcp_filtered_query_respects_limit")?;
    let deployment = Deployment::resolve()?;
    reporter.set_target(deployment.label());
    let client = deployment.mcp_client()?;

    let mut filters = Map::new();
    filters.insert("type".to_string(), json!("AHU"));
    let entities = client.query_entities(&EntityQuery {
        org_id: deployment.target().settings.org_id,
        limit: 5,
        filters: Some(filters),
        ..EntityQuery::default()
    })?;

    if entities.len() > 5 {
        return Err(format!("{} filtered entities exceed limit 5", entities.len()).into());
    }
    if deployment.stub_handle().is_some()
        && entities.iter().any(|entity| entity.get("type") != Some(&json!("AHU")))
    {
        return Err("filter was not applied".into());
    }

    reporter.finish(
        "pass",
        vec![format!("filtered entities: {}", entities.len())],
        standard_artifacts(),
    )?;
    Ok(())
}

#[test]
fn mcp_unknown_org_yields_empty_list_or_protocol_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("mcp_unknown_org_yields_empty_list_or_protocol_error")?;
    let deployment = Deployment::resolve()?;
    reporter.set_target(deployment.label());
    let client = deployment.mcp_client()?;

    let query = EntityQuery {
        org_id: UNKNOWN_ORG_ID,
        ..EntityQuery::default()
    };
    let note = match client.query_entities(&query) {
        Ok(entities) => format!("unknown org returned {} entities", entities.len()),
        Err(err) => match err.rpc_error() {
            Some(rpc) if rpc.code != 0 => format!("unknown org raised rpc error {}", rpc.code),
            _ => return Err(format!("unexpected error kind: {err}").into()),
        },
    };

    reporter.finish("pass", vec![note], standard_artifacts())?;
    Ok(())
}

#[test]
fn mcp_pages_do_not_overlap() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("mcp_pages_do_not_overlap")?;
    let deployment = Deployment::resolve()?;
    reporter.set_target(deployment.label());
    let org_id = deployment.target().settings.org_id;
    let client = deployment.mcp_client()?;

    let page = |offset: u32| {
        client.query_entities(&EntityQuery {
            org_id,
            limit: 5,
            offset,
            filters: None,
        })
    };
    let first: BTreeSet<i64> = entity_ids(&page(0)?).into_iter().collect();
    let second: BTreeSet<i64> = entity_ids(&page(5)?).into_iter().collect();

    let overlap: Vec<&i64> = first.intersection(&second).collect();
    if !overlap.is_empty() {
        return Err(format!("pages share {} entity ids", overlap.len()).into());
    }
    if deployment.stub_handle().is_some() && (first.is_empty() || second.is_empty()) {
        return Err("stub deployment should fill both pages".into());
    }

    reporter.finish(
        "pass",
        vec![format!("page sizes: {} and {}", first.len(), second.len())],
        standard_artifacts(),
    )?;
    Ok(())
}

#[test]
fn mcp_unknown_tool_is_protocol_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("mcp_unknown_tool_is_protocol_error")?;
    let deployment = Deployment::resolve()?;
    reporter.set_target(deployment.label());
    let client = deployment.mcp_client()?;

    let outcome = client.call_tool("no_such_tool", json!({"org_id": 1}));
    let Err(err) = outcome else {
        return Err("unknown tool call succeeded".into());
    };
    let Some(rpc) = err.rpc_error() else {
        return Err(format!("expected rpc error, got {err}").into());
    };

    reporter.finish(
        "pass",
        vec![format!("rpc error {}: {}", rpc.code, rpc.message)],
        standard_artifacts(),
    )?;
    Ok(())
}
