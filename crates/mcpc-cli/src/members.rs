//! Printable listing of a server's members.

use mcpc_mcp::{MemberDescriptor, MemberKind, ServerMembers};
use std::fmt::Write;

const RULE_WIDTH: usize = 50;
const SECTION_RULE_WIDTH: usize = 30;

/// Render the members report printed by `--members`.
pub fn format_members(members: &ServerMembers) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let _ = writeln!(out, "MCP Server Members");
    let _ = writeln!(out, "{rule}");

    for kind in MemberKind::ALL {
        let items = members.of_kind(kind);
        let title = kind.plural().to_uppercase();
        if items.is_empty() {
            let _ = writeln!(out, "\n{title}: None available");
            continue;
        }
        let _ = writeln!(out, "\n{title} ({}):", items.len());
        let _ = writeln!(out, "{}", "-".repeat(SECTION_RULE_WIDTH));
        for item in items {
            let _ = writeln!(out, "{}", format_item(item));
        }
    }

    let _ = writeln!(out, "\n{rule}");
    out
}

fn format_item(item: &MemberDescriptor) -> String {
    let description = if item.description.trim().is_empty() {
        "No description"
    } else {
        item.description.trim()
    };
    match &item.uri {
        Some(uri) => format!(" > {} - {description} ({uri})", item.name),
        None => format!(" > {} - {description}", item.name),
    }
}
