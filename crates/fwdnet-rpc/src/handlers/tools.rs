//! Registry of the named tools exposed over JSON-RPC.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "health_check",
        description: "Report server liveness",
        required: &[],
        optional: &[],
    },
    ToolDescriptor {
        name: "list_tools",
        description: "List the available tools and their parameters",
        required: &[],
        optional: &[],
    },
    ToolDescriptor {
        name: "sync_nqe_catalog",
        description: "Incrementally sync the org and fwd NQE query catalogs; org wins on query ID conflicts",
        required: &[],
        optional: &["prior_commits", "sync_id", "timeout_secs"],
    },
    ToolDescriptor {
        name: "cancel_sync",
        description: "Cancel a running catalog sync",
        required: &["sync_id"],
        optional: &[],
    },
    ToolDescriptor {
        name: "list_nqe_catalog",
        description: "List the query catalog of one repository at head",
        required: &["repository"],
        optional: &[],
    },
    ToolDescriptor {
        name: "get_nqe_query",
        description: "Fetch one query at one commit",
        required: &["repository", "commit_id", "path"],
        optional: &[],
    },
    ToolDescriptor {
        name: "run_nqe_query",
        description: "Run an inline or stored NQE query against a network snapshot",
        required: &["network_id"],
        optional: &["snapshot_id", "query", "query_id", "parameters"],
    },
    ToolDescriptor {
        name: "list_networks",
        description: "List networks",
        required: &[],
        optional: &[],
    },
    ToolDescriptor {
        name: "create_network",
        description: "Create a network",
        required: &["name"],
        optional: &[],
    },
    ToolDescriptor {
        name: "delete_network",
        description: "Delete a network",
        required: &["network_id"],
        optional: &[],
    },
    ToolDescriptor {
        name: "list_snapshots",
        description: "List the snapshots of a network",
        required: &["network_id"],
        optional: &[],
    },
    ToolDescriptor {
        name: "latest_snapshot",
        description: "Latest processed snapshot of a network",
        required: &["network_id"],
        optional: &[],
    },
    ToolDescriptor {
        name: "list_devices",
        description: "List devices of a network, or of a specific snapshot",
        required: &["network_id"],
        optional: &["snapshot_id"],
    },
    ToolDescriptor {
        name: "list_locations",
        description: "List the locations of a network",
        required: &["network_id"],
        optional: &[],
    },
    ToolDescriptor {
        name: "create_location",
        description: "Create a location",
        required: &["network_id", "name"],
        optional: &["lat", "lng", "city", "admin_division", "country"],
    },
    ToolDescriptor {
        name: "update_location",
        description: "Update fields of a location",
        required: &["network_id", "location_id"],
        optional: &["name", "lat", "lng", "city", "admin_division", "country"],
    },
    ToolDescriptor {
        name: "delete_location",
        description: "Delete a location",
        required: &["network_id", "location_id"],
        optional: &[],
    },
];

pub(crate) fn find(name: &str) -> Option<&'static ToolDescriptor> {
    TOOLS.iter().find(|tool| tool.name == name)
}

pub(crate) fn list_tools() -> Value {
    serde_json::json!({ "tools": TOOLS })
}
