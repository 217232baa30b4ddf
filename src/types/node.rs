//! Build graph node model.
//!
//! A [`GraphNode`] is one uniquely named unit in the build graph, as
//! reported by the external graph source. The three variants are closed:
//! every consumer matches exhaustively.
//!
//! Opaque digest payloads (`intrinsic_digest`, `identity_digest`) are
//! produced upstream; the kernel never inspects them, it only feeds them
//! into digest composition. In JSON they are carried as hex strings so
//! node lists stay human-readable.

use serde::{Deserialize, Serialize};

/// One node in the build graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphNode {
    /// A buildable unit with intrinsic attributes and input references.
    Rule(Rule),
    /// A checked-in file, digested from on-disk content plus identity.
    SourceFile(SourceFile),
    /// A file produced by a rule; its digest is that rule's digest.
    GeneratedFile(GeneratedFile),
}

impl GraphNode {
    /// The node's globally unique name.
    pub fn name(&self) -> &str {
        match self {
            Self::Rule(rule) => &rule.name,
            Self::SourceFile(file) => &file.name,
            Self::GeneratedFile(file) => &file.name,
        }
    }
}

/// A buildable rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique name, the graph's primary key.
    pub name: String,
    /// Opaque bytes covering the rule's class, identity and attributes.
    #[serde(with = "hex_bytes")]
    pub intrinsic_digest: Vec<u8>,
    /// Referenced input names, in the order the graph source listed them.
    ///
    /// Order is significant for digest composition and is never sorted.
    /// May contain a self-reference, which is ignored during composition.
    #[serde(default)]
    pub inputs: Vec<String>,
}

/// A checked-in source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Unique name (a build label, e.g. `//pkg:file.c`).
    pub name: String,
    /// Opaque identity bytes from the graph source (e.g. covering
    /// auxiliary includes).
    #[serde(with = "hex_bytes")]
    pub identity_digest: Vec<u8>,
}

/// A file produced by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Unique name.
    pub name: String,
    /// Name of the rule (or chained generated file) that produces it.
    pub generating_rule_name: String,
}

/// Serde adapter: opaque byte payloads as hex strings in JSON.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_name_accessor() {
        let rule = GraphNode::Rule(Rule {
            name: "//pkg:lib".to_string(),
            intrinsic_digest: vec![1, 2, 3],
            inputs: vec![],
        });
        assert_eq!(rule.name(), "//pkg:lib");

        let file = GraphNode::SourceFile(SourceFile {
            name: "//pkg:main.c".to_string(),
            identity_digest: vec![],
        });
        assert_eq!(file.name(), "//pkg:main.c");

        let generated = GraphNode::GeneratedFile(GeneratedFile {
            name: "//pkg:out.h".to_string(),
            generating_rule_name: "//pkg:codegen".to_string(),
        });
        assert_eq!(generated.name(), "//pkg:out.h");
    }

    #[test]
    fn test_json_round_trip() {
        let node = GraphNode::Rule(Rule {
            name: "//pkg:lib".to_string(),
            intrinsic_digest: b"attrs".to_vec(),
            inputs: vec!["//pkg:main.c".to_string()],
        });
        let json = serde_json::to_string(&node).unwrap();
        let back: GraphNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }

    #[test]
    fn test_digest_payloads_serialize_as_hex() {
        let node = GraphNode::SourceFile(SourceFile {
            name: "//pkg:a.c".to_string(),
            identity_digest: vec![0xde, 0xad],
        });
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"dead\""));
    }

    #[test]
    fn test_rule_inputs_default_to_empty() {
        let json = r#"{"kind":"rule","name":"//pkg:lib","intrinsic_digest":"00"}"#;
        let node: GraphNode = serde_json::from_str(json).unwrap();
        match node {
            GraphNode::Rule(rule) => assert!(rule.inputs.is_empty()),
            _ => panic!("expected a rule"),
        }
    }
}
