use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
const BATCH_API_GROUP: &str = "batch";
const CORE_API_GROUP: &str = "";

fn namespaced_meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

/// Builds the RBAC objects a job runner needs inside one namespace.
#[derive(Debug, Clone)]
pub struct AccessManager {
    namespace: String,
}

impl AccessManager {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Role allowed to create the named job only, plus read access to pods.
    pub fn job_runner_role(&self, role_name: &str, job_name: &str) -> Role {
        Role {
            metadata: namespaced_meta(role_name, &self.namespace),
            rules: Some(vec![
                PolicyRule {
                    api_groups: Some(vec![BATCH_API_GROUP.to_string()]),
                    resources: Some(vec!["jobs".to_string()]),
                    verbs: vec!["create".to_string()],
                    resource_names: Some(vec![job_name.to_string()]),
                    ..Default::default()
                },
                PolicyRule {
                    api_groups: Some(vec![CORE_API_GROUP.to_string()]),
                    resources: Some(vec!["pods".to_string()]),
                    verbs: vec!["get".to_string(), "list".to_string()],
                    ..Default::default()
                },
            ]),
        }
    }

    pub fn job_runner_service_account(&self, name: &str) -> ServiceAccount {
        ServiceAccount {
            metadata: namespaced_meta(name, &self.namespace),
            ..Default::default()
        }
    }

    pub fn role_binding(
        &self,
        binding_name: &str,
        service_account_name: &str,
        role_name: &str,
    ) -> RoleBinding {
        RoleBinding {
            metadata: namespaced_meta(binding_name, &self.namespace),
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: service_account_name.to_string(),
                namespace: Some(self.namespace.clone()),
                api_group: None,
            }]),
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_string(),
                kind: "Role".to_string(),
                name: role_name.to_string(),
            },
        }
    }
}
