use serde::{Deserialize, Serialize};

use crate::messages::{CHALLENGE_PAYLOAD_KIND, SOLVER_VERSION};

/// Discovery document for the solver API group version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    pub kind: String,
    pub api_version: String,
    pub group_version: String,
    pub resources: Vec<ApiResource>,
}

/// One solver exposed as an API resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    pub name: String,
    pub singular_name: String,
    pub namespaced: bool,
    pub kind: String,
    pub verbs: Vec<String>,
}

impl ApiResourceList {
    /// Build the discovery document for the given group and solver names
    pub fn for_solvers<'a>(group_name: &str, solvers: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            kind: "APIResourceList".to_string(),
            api_version: "v1".to_string(),
            group_version: format!("{}/{}", group_name, SOLVER_VERSION),
            resources: solvers
                .into_iter()
                .map(|name| ApiResource {
                    name: name.to_string(),
                    singular_name: name.to_string(),
                    namespaced: false,
                    kind: CHALLENGE_PAYLOAD_KIND.to_string(),
                    verbs: vec!["create".to_string()],
                })
                .collect(),
        }
    }
}
