//! `next-router-state-tree` header for coin page requests
//!
//! The site serves the coin's RSC payload only when the request carries the
//! router state the browser would send for `/coin/<mint>`.

use serde_json::{json, Value};

/// Router state tree for the coin page of `mint`
pub fn router_state_tree(mint: &str) -> Value {
    json!([
        "",
        {
            "children": [
                "(main)",
                {
                    "children": [
                        "coin",
                        {
                            "children": [
                                ["mintId", mint, "d"],
                                {
                                    "children": [
                                        "__PAGE__",
                                        {},
                                        format!("/coin/{}", mint),
                                        "refresh"
                                    ]
                                }
                            ]
                        },
                        null,
                        "refetch"
                    ]
                }
            ]
        }
    ])
}

/// Percent-encoded compact JSON of the router state tree
pub fn encode_router_state_tree(mint: &str) -> String {
    urlencoding::encode(&router_state_tree(mint).to_string()).into_owned()
}
