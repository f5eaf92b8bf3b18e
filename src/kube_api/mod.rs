use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::DeleteParams;

pub mod access;
pub mod cluster;
pub mod gateway;
pub mod job;
pub mod prune;
pub mod resources;

#[cfg(test)]
pub(crate) mod tests;

pub use access::AccessManager;
pub use cluster::KubeCluster;
pub use gateway::KubeApi;
pub use job::{JobDescriptor, PodPhase};
pub use prune::{PruneReport, PruneStop};

/// A change notification for a watched pod.
#[derive(Debug, Clone)]
pub enum PodEvent {
    Applied(Pod),
    Deleted(Pod),
    /// Anything the watch produced that is not a pod object.
    Unexpected(String),
}

/// Pod notifications. An `Err` item means the server refused the watch and
/// retrying will not help; the subscription is over.
pub type PodEvents = BoxStream<'static, kube::Result<PodEvent>>;

/// Raw calls against the control plane, one per remote operation.
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn create_job(&self, namespace: &str, job: &Job) -> kube::Result<Job>;

    async fn get_job(&self, namespace: &str, name: &str) -> kube::Result<Job>;

    async fn delete_job(&self, namespace: &str, name: &str) -> kube::Result<()>;

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> kube::Result<Pod>;

    async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> kube::Result<Vec<Pod>>;

    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        params: &DeleteParams,
    ) -> kube::Result<()>;

    /// Open a subscription to pod changes. Dropping the stream closes it.
    async fn watch_pods(&self, namespace: &str, selector: &str) -> kube::Result<PodEvents>;

    async fn list_namespaces(&self) -> kube::Result<Vec<Namespace>>;

    async fn create_namespace(&self, namespace: &Namespace) -> kube::Result<Namespace>;

    async fn list_services(&self, namespace: &str) -> kube::Result<Vec<Service>>;

    async fn create_service(&self, namespace: &str, service: &Service) -> kube::Result<Service>;

    async fn list_ingresses(&self, namespace: &str) -> kube::Result<Vec<Ingress>>;

    async fn create_role(&self, namespace: &str, role: &Role) -> kube::Result<Role>;

    async fn create_service_account(
        &self,
        namespace: &str,
        account: &ServiceAccount,
    ) -> kube::Result<ServiceAccount>;

    async fn create_role_binding(
        &self,
        namespace: &str,
        binding: &RoleBinding,
    ) -> kube::Result<RoleBinding>;
}
